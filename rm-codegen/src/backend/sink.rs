//! Append-only log of instructions, labels, and comments.
//!
//! No semantic validation happens here; the sink only records.  Fresh labels
//! are unique per prefix via a monotonically increasing counter.

use super::instruction::{AsmItem, MachineInstr};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Sink {
    items: Vec<AsmItem>,
    label_counters: HashMap<String, u64>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instr: MachineInstr) {
        self.items.push(AsmItem::Instr { instr, comment: None });
    }

    pub fn emit_c(&mut self, instr: MachineInstr, comment: impl Into<String>) {
        self.items.push(AsmItem::Instr {
            instr,
            comment: Some(comment.into()),
        });
    }

    pub fn place_label(&mut self, name: impl Into<String>) {
        self.items.push(AsmItem::Label(name.into()));
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.items.push(AsmItem::Comment(text.into()));
    }

    /// Mint a label that no other `fresh_label` call will return.
    pub fn fresh_label(&mut self, prefix: &str) -> String {
        let counter = self.label_counters.entry(prefix.to_string()).or_insert(0);
        let label = format!("{prefix}_{counter}");
        *counter += 1;
        label
    }

    pub fn into_items(self) -> Vec<AsmItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_labels_count_per_prefix() {
        let mut sink = Sink::new();
        assert_eq!(sink.fresh_label("mul"), "mul_0");
        assert_eq!(sink.fresh_label("mul"), "mul_1");
        assert_eq!(sink.fresh_label("div"), "div_0");
        assert_eq!(sink.fresh_label("mul"), "mul_2");
    }

    #[test]
    fn items_keep_emission_order() {
        let mut sink = Sink::new();
        sink.place_label("entry");
        sink.emit(MachineInstr::Halt);
        let items = sink.into_items();
        assert!(matches!(&items[0], AsmItem::Label(n) if n == "entry"));
        assert!(matches!(&items[1], AsmItem::Instr { instr: MachineInstr::Halt, .. }));
    }
}
