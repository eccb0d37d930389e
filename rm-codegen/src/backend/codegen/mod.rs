//! Code generation driver: dispatches IR instructions to the lowering
//! macros and enforces the branch discipline (flush live values, emit the
//! jumps, forget register state).

mod macros;

use super::abi::Register;
use super::analysis::Analyses;
use super::descriptors::DescriptorEngine;
use super::instruction::MachineInstr;
use super::sink::Sink;
use super::Assembly;
use crate::ir::{BasicBlock, Cond, IrInstr, Operand, Program};
use crate::symtab::SymbolTable;
use crate::CodegenError;
use log::debug;

/// Owns the assembly sink and the descriptor engine; borrows the symbol
/// table and the analysis maps for the whole emission.
pub struct Codegen<'a> {
    sink: Sink,
    regs: DescriptorEngine,
    symtab: &'a SymbolTable,
    analyses: &'a Analyses,
}

impl<'a> Codegen<'a> {
    pub fn new(symtab: &'a SymbolTable, analyses: &'a Analyses) -> Self {
        Codegen {
            sink: Sink::new(),
            regs: DescriptorEngine::new(symtab.high_water()),
            symtab,
            analyses,
        }
    }

    pub fn emit_program(&mut self, program: &Program) -> Result<(), CodegenError> {
        for block in &program.blocks {
            self.emit_block(block)?;
        }
        Ok(())
    }

    fn emit_block(&mut self, block: &BasicBlock) -> Result<(), CodegenError> {
        debug!("block {}", block.name);
        self.sink.place_label(&block.name);
        let live_out = self
            .analyses
            .live_out
            .get(&block.name)
            .cloned()
            .unwrap_or_default();
        self.regs.begin_block(live_out);
        for instr in &block.instrs {
            self.regs.clear_selection();
            self.sink.comment(instr.to_string());
            self.emit_instr(instr)?;
        }
        Ok(())
    }

    fn emit_instr(&mut self, instr: &IrInstr) -> Result<(), CodegenError> {
        match instr {
            IrInstr::Get { dst } => {
                let r = self.get()?;
                self.seize_to(r, dst)?;
            }
            IrInstr::Put { src } => self.put(src)?,
            IrInstr::Move { src, dst } => {
                let r = self.copy(src)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::IndexedLoad { base, index, dst } => {
                let r = self.load_array(base, index)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::IndexedStore { src, base, index } => {
                self.store_array(src, base, index)?;
            }
            IrInstr::Add { left, right, dst } => {
                let r = self.add(left, right)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::Sub { left, right, dst } => {
                let r = self.sub(left, right)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::Mul { left, right, dst } => {
                let r = self.long_mul(left, right)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::Div { left, right, dst } => {
                let r = self.long_div(left, right, false)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::Rem { left, right, dst } => {
                let r = self.long_div(left, right, true)?;
                self.seize_to(r, dst)?;
            }
            IrInstr::Jump { target } => {
                self.regs.save_variables(&mut self.sink, self.symtab)?;
                self.sink.emit(MachineInstr::Jump(target.clone()));
                self.regs.reset();
            }
            IrInstr::JumpIf { cond, left, right, if_true, if_false } => {
                self.regs.save_variables(&mut self.sink, self.symtab)?;
                // Jump to the false block on the negated condition, fall
                // through to the jump to the true block.  `!=` tests both
                // strict orders directly against the true block instead.
                match cond {
                    Cond::Eq => self.jump_ne(left, right, if_false)?,
                    Cond::Ne => self.jump_ne(left, right, if_true)?,
                    Cond::Le => self.jump_gt(left, right, if_false)?,
                    Cond::Ge => self.jump_lt(left, right, if_false)?,
                    Cond::Lt => self.jump_ge(left, right, if_false)?,
                    Cond::Gt => self.jump_le(left, right, if_false)?,
                }
                let fall_through = match cond {
                    Cond::Ne => if_false,
                    _ => if_true,
                };
                self.sink.emit(MachineInstr::Jump(fall_through.clone()));
                self.regs.reset();
            }
            IrInstr::Halt => {
                self.regs.save_variables(&mut self.sink, self.symtab)?;
                self.sink.emit(MachineInstr::Halt);
                self.regs.reset();
            }
        }
        Ok(())
    }

    /// Bind a result register to the destination operand's place.
    fn seize_to(&mut self, r: Register, dst: &Operand) -> Result<(), CodegenError> {
        // Validate scalar destinations eagerly so a bad name fails at the
        // offending instruction, not at the next spill.
        if let Operand::Var(name) = dst {
            self.symtab.scalar_address(name)?;
        }
        let place = dst
            .place()
            .ok_or_else(|| CodegenError::BadDestination(dst.to_string()))?;
        self.regs.seize(&mut self.sink, self.symtab, r, place)
    }

    pub fn finish(self) -> Assembly {
        Assembly {
            items: self.sink.into_items(),
        }
    }
}
