//! The register/memory descriptor engine.
//!
//! Tracks, for every scalar and temporary, where its current value lives: in
//! a working-pool register, in its home memory cell, or both.  Hands out
//! registers deterministically, spills when the pool is full, flushes
//! live-out values at block boundaries, and forgets all register state after
//! a branch.
//!
//! The machine reaches memory only through the address register `A`, so
//! every load or store is preceded by materializing the cell address into
//! `A`; `A` itself is never cached and never part of the pool.

use super::abi::Register;
use super::constants::emit_constant;
use super::instruction::MachineInstr;
use super::sink::Sink;
use crate::ir::{Operand, Place, TempId};
use crate::symtab::SymbolTable;
use crate::CodegenError;
use log::{debug, trace};
use num_bigint::{BigUint, Sign};
use std::collections::{HashMap, HashSet};

pub struct DescriptorEngine {
    /// Place → register currently holding its value (at most one).
    reg_of: HashMap<Place, Register>,
    /// Register → place bound to it.  A register absent from this map is
    /// free or a scratch holding.
    held: HashMap<Register, Place>,
    /// Places whose home cell currently holds their value.
    in_memory: HashSet<Place>,
    /// Spill homes assigned to temporaries, permanent once allocated.
    temp_homes: HashMap<TempId, u64>,
    /// Registers reserved by the in-progress instruction; never spill
    /// victims.  Cleared before each IR instruction.
    selection: HashSet<Register>,
    /// Next free cell in the spill area.
    next_cell: u64,
    /// Live-out set of the block being emitted.
    live_out: HashSet<Place>,
}

impl DescriptorEngine {
    /// `first_spill_cell` is the first address past the symbol table's
    /// declarations.
    pub fn new(first_spill_cell: u64) -> Self {
        DescriptorEngine {
            reg_of: HashMap::new(),
            held: HashMap::new(),
            in_memory: HashSet::new(),
            temp_homes: HashMap::new(),
            selection: HashSet::new(),
            next_cell: first_spill_cell,
            live_out: HashSet::new(),
        }
    }

    /// Install the live-out set of the block about to be emitted.
    pub fn begin_block(&mut self, live_out: HashSet<Place>) {
        self.live_out = live_out;
    }

    /// Forget the in-progress instruction's register reservations.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Return a register holding `op`, loading or materializing as needed.
    ///
    /// Constants come back in an unbound scratch register; the engine never
    /// caches them.  Scalars and temporaries come back bound, with their
    /// home cell recorded as a second valid location after a load.
    pub fn load(
        &mut self,
        sink: &mut Sink,
        symtab: &SymbolTable,
        op: &Operand,
    ) -> Result<Register, CodegenError> {
        match op {
            Operand::Const(v) => {
                if v.sign() == Sign::Minus {
                    return Err(CodegenError::NegativeConstant(v.clone()));
                }
                let r = self.select(sink, symtab)?;
                emit_constant(sink, r, v.magnitude());
                Ok(r)
            }
            Operand::Var(name) => {
                let addr = symtab.scalar_address(name)?;
                self.load_place(sink, symtab, Place::Var(name.clone()), addr)
            }
            Operand::Temp(id) => {
                let place = Place::Temp(*id);
                if let Some(&r) = self.reg_of.get(&place) {
                    self.selection.insert(r);
                    return Ok(r);
                }
                let addr = *self
                    .temp_homes
                    .get(id)
                    .ok_or(CodegenError::UnwrittenTemp(*id))?;
                self.load_place(sink, symtab, place, addr)
            }
            Operand::Arr(name) => Err(CodegenError::ArrayAsValue(name.clone())),
        }
    }

    fn load_place(
        &mut self,
        sink: &mut Sink,
        symtab: &SymbolTable,
        place: Place,
        addr: u64,
    ) -> Result<Register, CodegenError> {
        if let Some(&r) = self.reg_of.get(&place) {
            trace!("{place} already in {r}");
            self.selection.insert(r);
            return Ok(r);
        }
        let r = self.select(sink, symtab)?;
        emit_constant(sink, Register::ADDRESS, &BigUint::from(addr));
        sink.emit_c(MachineInstr::Load(r), format!("load {place}"));
        self.bind(place.clone(), r);
        self.in_memory.insert(place);
        Ok(r)
    }

    /// Pick a register from the working pool, spilling if none is free.
    ///
    /// Preference order, each scanned in pool order: a free register; a
    /// victim whose value is already memory-backed (costs nothing); a victim
    /// outside the selection set, stored to its home first.  The returned
    /// register joins the selection set.
    pub fn select(
        &mut self,
        sink: &mut Sink,
        symtab: &SymbolTable,
    ) -> Result<Register, CodegenError> {
        for &r in &Register::WORK_REGS {
            if !self.held.contains_key(&r) && !self.selection.contains(&r) {
                trace!("select {r} (free)");
                self.selection.insert(r);
                return Ok(r);
            }
        }

        for &r in &Register::WORK_REGS {
            if self.selection.contains(&r) {
                continue;
            }
            if let Some(place) = self.held.get(&r) {
                if self.in_memory.contains(place) {
                    debug!("reuse {r}: {place} is memory-backed");
                    let place = place.clone();
                    self.unbind(&place, r);
                    self.selection.insert(r);
                    return Ok(r);
                }
            }
        }

        for &r in &Register::WORK_REGS {
            if self.selection.contains(&r) {
                continue;
            }
            if let Some(place) = self.held.get(&r).cloned() {
                debug!("spill {place} out of {r}");
                self.store_home(sink, symtab, r, &place, "spill")?;
                self.in_memory.insert(place.clone());
                self.unbind(&place, r);
                self.selection.insert(r);
                return Ok(r);
            }
        }

        Err(CodegenError::PoolExhausted)
    }

    /// Bind `r` to `place`, making the register the value's only current
    /// location.  Any other register copy of `place` is dropped; a previous
    /// occupant of `r` is demoted to its memory home, stored first when it
    /// has no home copy but is still live out of the block.
    pub fn seize(
        &mut self,
        sink: &mut Sink,
        symtab: &SymbolTable,
        r: Register,
        place: Place,
    ) -> Result<(), CodegenError> {
        if let Some(&old) = self.reg_of.get(&place) {
            if old != r {
                trace!("{place} rebinds {old} -> {r}");
                self.held.remove(&old);
                self.reg_of.remove(&place);
            }
        }
        if let Some(prev) = self.held.get(&r).cloned() {
            if prev != place {
                if !self.in_memory.contains(&prev) && self.live_out.contains(&prev) {
                    self.store_home(sink, symtab, r, &prev, "save")?;
                    self.in_memory.insert(prev.clone());
                }
                self.unbind(&prev, r);
            }
        }
        debug!("seize {r} for {place}");
        self.bind(place.clone(), r);
        self.in_memory.remove(&place);
        self.selection.insert(r);
        Ok(())
    }

    /// Flush every register-only value the block's successors may read.
    /// Values not in the live-out set are simply dropped at the reset that
    /// follows the branch.
    pub fn save_variables(
        &mut self,
        sink: &mut Sink,
        symtab: &SymbolTable,
    ) -> Result<(), CodegenError> {
        for &r in &Register::WORK_REGS {
            let Some(place) = self.held.get(&r).cloned() else {
                continue;
            };
            if !self.live_out.contains(&place) {
                trace!("drop dead {place} in {r}");
                continue;
            }
            if self.in_memory.contains(&place) {
                continue;
            }
            self.store_home(sink, symtab, r, &place, "save")?;
            self.in_memory.insert(place);
        }
        Ok(())
    }

    /// Forget all register bindings; every surviving value is now assumed to
    /// sit in its home cell.  Called right after a branch is emitted.
    pub fn reset(&mut self) {
        debug!("reset register state");
        self.reg_of.clear();
        self.held.clear();
        self.in_memory.clear();
        self.selection.clear();
    }

    /// The register currently bound to `place`, if any.
    pub fn register_of(&self, place: &Place) -> Option<Register> {
        self.reg_of.get(place).copied()
    }

    fn store_home(
        &mut self,
        sink: &mut Sink,
        symtab: &SymbolTable,
        r: Register,
        place: &Place,
        what: &str,
    ) -> Result<(), CodegenError> {
        let addr = self.home_of(symtab, place)?;
        emit_constant(sink, Register::ADDRESS, &BigUint::from(addr));
        sink.emit_c(MachineInstr::Store(r), format!("{what} {place}"));
        Ok(())
    }

    /// The home cell of a place, allocating one for a temporary on first
    /// spill.
    fn home_of(&mut self, symtab: &SymbolTable, place: &Place) -> Result<u64, CodegenError> {
        match place {
            Place::Var(name) => symtab.scalar_address(name),
            Place::Temp(id) => {
                if let Some(&cell) = self.temp_homes.get(id) {
                    return Ok(cell);
                }
                let cell = self.next_cell;
                self.next_cell += 1;
                self.temp_homes.insert(*id, cell);
                trace!("t{id} gets home cell {cell}");
                Ok(cell)
            }
        }
    }

    fn bind(&mut self, place: Place, r: Register) {
        if let Some(old) = self.held.insert(r, place.clone()) {
            self.reg_of.remove(&old);
        }
        if let Some(old_reg) = self.reg_of.insert(place, r) {
            if old_reg != r {
                self.held.remove(&old_reg);
            }
        }
    }

    fn unbind(&mut self, place: &Place, r: Register) {
        self.held.remove(&r);
        self.reg_of.remove(place);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Operand;

    fn setup() -> (DescriptorEngine, Sink, SymbolTable) {
        let mut symtab = SymbolTable::new();
        symtab.declare_scalar("x");
        symtab.declare_scalar("y");
        let engine = DescriptorEngine::new(symtab.high_water());
        (engine, Sink::new(), symtab)
    }

    #[test]
    fn pool_hands_out_registers_in_order() {
        let (mut engine, mut sink, symtab) = setup();
        let r1 = engine.select(&mut sink, &symtab).unwrap();
        let r2 = engine.select(&mut sink, &symtab).unwrap();
        assert_eq!(r1, Register::B);
        assert_eq!(r2, Register::C);
    }

    #[test]
    fn selection_set_exhausts_the_pool() {
        let (mut engine, mut sink, symtab) = setup();
        for _ in 0..Register::WORK_REGS.len() {
            engine.select(&mut sink, &symtab).unwrap();
        }
        assert_eq!(
            engine.select(&mut sink, &symtab),
            Err(CodegenError::PoolExhausted)
        );
    }

    #[test]
    fn repeated_load_reuses_the_register() {
        let (mut engine, mut sink, symtab) = setup();
        let op = Operand::var("x");
        let r1 = engine.load(&mut sink, &symtab, &op).unwrap();
        let r2 = engine.load(&mut sink, &symtab, &op).unwrap();
        assert_eq!(r1, r2);
        // One LOAD, not two.
        let loads = sink
            .into_items()
            .iter()
            .filter(|i| {
                matches!(
                    i,
                    crate::backend::instruction::AsmItem::Instr {
                        instr: MachineInstr::Load(_),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(loads, 1);
    }

    #[test]
    fn memory_backed_victims_are_dropped_without_a_store() {
        let (mut engine, mut sink, symtab) = setup();
        // `x` is loaded, so it is register- and memory-backed.
        engine.load(&mut sink, &symtab, &Operand::var("x")).unwrap();
        engine.clear_selection();
        // Fill the rest of the pool with scratch holdings.
        for _ in 0..Register::WORK_REGS.len() - 1 {
            engine.select(&mut sink, &symtab).unwrap();
        }
        // The next select must evict `x` without emitting anything.
        let mut quiet = Sink::new();
        let r = engine.select(&mut quiet, &symtab).unwrap();
        assert_eq!(r, Register::B);
        assert!(quiet.into_items().is_empty());
    }

    #[test]
    fn seize_drops_the_previous_register_copy() {
        let (mut engine, mut sink, symtab) = setup();
        let x = Place::Var("x".to_string());
        let r1 = engine.load(&mut sink, &symtab, &Operand::var("x")).unwrap();
        let r2 = engine.select(&mut sink, &symtab).unwrap();
        engine.seize(&mut sink, &symtab, r2, x.clone()).unwrap();
        assert_eq!(engine.register_of(&x), Some(r2));
        assert_ne!(engine.register_of(&x), Some(r1));
    }

    #[test]
    fn unread_temporary_is_an_error() {
        let (mut engine, mut sink, symtab) = setup();
        assert_eq!(
            engine.load(&mut sink, &symtab, &Operand::temp(7)),
            Err(CodegenError::UnwrittenTemp(7))
        );
    }
}
