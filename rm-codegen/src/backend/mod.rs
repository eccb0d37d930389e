//! Register-machine back-end — lowers block IR to machine assembly.
//!
//! Module layout:
//! - `abi`         — register names and the working-pool order
//! - `instruction` — typed machine instructions and assembly output items
//! - `sink`        — append-only assembly log and label minting
//! - `analysis`    — block-level liveness and dominator maps
//! - `descriptors` — value location tracking, register selection, spilling
//! - `constants`   — unary/binary constant materialization
//! - `codegen`     — emission driver and lowering macros

pub mod abi;
pub mod analysis;
pub mod constants;
pub mod descriptors;
pub mod instruction;
pub mod sink;

mod codegen;

pub use codegen::Codegen;

use crate::ir::Program;
use crate::symtab::SymbolTable;
use crate::CodegenError;
use analysis::Analyses;
use instruction::AsmItem;
use std::fmt;

/// The finished instruction stream: labels, instructions, and comments in
/// emission order.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub items: Vec<AsmItem>,
}

impl Assembly {
    pub fn to_lines(&self) -> Vec<String> {
        self.items.iter().map(|item| item.to_string()).collect()
    }

    /// Instructions only, labels and comments stripped.
    pub fn instr_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, AsmItem::Instr { .. }))
            .count()
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

pub fn compile(
    program: &Program,
    symtab: &SymbolTable,
    analyses: &Analyses,
) -> Result<Assembly, CodegenError> {
    let mut cg = Codegen::new(symtab, analyses);
    cg.emit_program(program)?;
    Ok(cg.finish())
}
