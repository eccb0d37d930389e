//! Lowering macros: each method emits a self-contained instruction sequence
//! for one IR operation, drawing registers from the descriptor engine and
//! labels from the sink.
//!
//! The machine has no multiply or divide, so `long_mul` and `long_div`
//! synthesize them from `ADD`, `SUB`, `HALF`, `JZERO`, and `JODD`.
//! Comparisons ride on the saturating subtract: `a − b = 0` exactly when
//! `a ≤ b`, and `(a + 1) − b = 0` exactly when `a < b`.

use super::super::abi::Register;
use super::super::constants::emit_constant;
use super::super::instruction::MachineInstr;
use super::Codegen;
use crate::ir::Operand;
use crate::CodegenError;
use num_bigint::{BigInt, BigUint, Sign};

impl<'a> Codegen<'a> {
    fn load(&mut self, op: &Operand) -> Result<Register, CodegenError> {
        self.regs.load(&mut self.sink, self.symtab, op)
    }

    fn select(&mut self) -> Result<Register, CodegenError> {
        self.regs.select(&mut self.sink, self.symtab)
    }

    /// Zero a freshly selected register.
    fn select_zeroed(&mut self) -> Result<Register, CodegenError> {
        let r = self.select()?;
        self.sink.emit(MachineInstr::Sub { d: r, s: r });
        Ok(r)
    }

    /// Copy the value of `s` into a fresh register.
    fn copy_reg(&mut self, s: Register) -> Result<Register, CodegenError> {
        let r = self.select()?;
        self.sink.emit(MachineInstr::Copy { d: r, s });
        Ok(r)
    }

    // ── IO and moves ────────────────────────────────────────────────────

    pub(crate) fn get(&mut self) -> Result<Register, CodegenError> {
        let r = self.select()?;
        self.sink.emit(MachineInstr::Get(r));
        Ok(r)
    }

    pub(crate) fn put(&mut self, src: &Operand) -> Result<(), CodegenError> {
        let r = self.load(src)?;
        self.sink.emit(MachineInstr::Put(r));
        Ok(())
    }

    pub(crate) fn copy(&mut self, src: &Operand) -> Result<Register, CodegenError> {
        let s = self.load(src)?;
        self.copy_reg(s)
    }

    // ── Addition and subtraction ────────────────────────────────────────

    pub(crate) fn add(
        &mut self,
        left: &Operand,
        right: &Operand,
    ) -> Result<Register, CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let d = self.select()?;
        self.sink.emit(MachineInstr::Copy { d, s: l });
        self.sink.emit(MachineInstr::Add { d, s: r });
        Ok(d)
    }

    /// Saturating at zero, like the machine's `SUB`.
    pub(crate) fn sub(
        &mut self,
        left: &Operand,
        right: &Operand,
    ) -> Result<Register, CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let d = self.select()?;
        self.sink.emit(MachineInstr::Copy { d, s: l });
        self.sink.emit(MachineInstr::Sub { d, s: r });
        Ok(d)
    }

    // ── Array access ────────────────────────────────────────────────────

    /// Leave the effective address `base + (index − start)` in `A`.
    ///
    /// A constant index folds into one materialization (and surfaces a
    /// negative address at compile time).  A runtime index is adjusted by
    /// the fixed distance `|base − start|`.  Nothing is written to `A`
    /// until all register traffic is done, since spills go through `A`.
    fn lea(&mut self, base: &Operand, index: &Operand) -> Result<(), CodegenError> {
        let name = match base {
            Operand::Arr(name) | Operand::Var(name) => name.clone(),
            other => return Err(CodegenError::NotIndexable(other.to_string())),
        };
        let info = self.symtab.array_info(&name)?.clone();

        match index {
            Operand::Const(c) => {
                let ea = BigInt::from(info.base) + c - BigInt::from(info.start_index);
                if ea.sign() == Sign::Minus {
                    return Err(CodegenError::AddressOverflow {
                        name,
                        index: c.clone(),
                    });
                }
                emit_constant(&mut self.sink, Register::ADDRESS, ea.magnitude());
            }
            _ => {
                let off = self.load(index)?;
                let diff = info.base as i128 - info.start_index as i128;
                if diff == 0 {
                    self.sink.emit(MachineInstr::Copy {
                        d: Register::ADDRESS,
                        s: off,
                    });
                } else {
                    let k = self.select()?;
                    emit_constant(&mut self.sink, k, &BigUint::from(diff.unsigned_abs()));
                    self.sink.emit(MachineInstr::Copy {
                        d: Register::ADDRESS,
                        s: off,
                    });
                    let adjust = if diff > 0 {
                        MachineInstr::Add { d: Register::ADDRESS, s: k }
                    } else {
                        MachineInstr::Sub { d: Register::ADDRESS, s: k }
                    };
                    self.sink.emit(adjust);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn load_array(
        &mut self,
        base: &Operand,
        index: &Operand,
    ) -> Result<Register, CodegenError> {
        // Select the destination before computing the address: a spill here
        // would clobber `A`.
        let r = self.select()?;
        self.lea(base, index)?;
        self.sink.emit(MachineInstr::Load(r));
        Ok(r)
    }

    pub(crate) fn store_array(
        &mut self,
        src: &Operand,
        base: &Operand,
        index: &Operand,
    ) -> Result<(), CodegenError> {
        let v = self.load(src)?;
        self.lea(base, index)?;
        self.sink.emit(MachineInstr::Store(v));
        Ok(())
    }

    // ── Multiplication ──────────────────────────────────────────────────

    /// Shift-and-add product.  Invariant at the loop head:
    /// `res + a·b = x·y`.  The zero test sits at the head, so the doubling
    /// tail can run once past the final useful bit without harm.
    pub(crate) fn long_mul(
        &mut self,
        x: &Operand,
        y: &Operand,
    ) -> Result<Register, CodegenError> {
        let a = self.copy(x)?;
        let b = self.copy(y)?;
        let res = self.select_zeroed()?;

        let head = self.sink.fresh_label("mul_head");
        let odd = self.sink.fresh_label("mul_odd");
        let rest = self.sink.fresh_label("mul_rest");
        let done = self.sink.fresh_label("mul_done");

        self.sink.place_label(&head);
        self.sink.emit(MachineInstr::Jzero(b, done.clone()));
        self.sink.emit(MachineInstr::Jodd(b, odd.clone()));
        self.sink.emit(MachineInstr::Jump(rest.clone()));
        self.sink.place_label(&odd);
        self.sink.emit(MachineInstr::Add { d: res, s: a });
        self.sink.place_label(&rest);
        self.sink.emit(MachineInstr::Add { d: a, s: a });
        self.sink.emit(MachineInstr::Half(b));
        self.sink.emit(MachineInstr::Jump(head));
        self.sink.place_label(&done);

        Ok(res)
    }

    // ── Division and remainder ──────────────────────────────────────────

    /// Long division by doubling.  The range phase doubles the divisor
    /// until it exceeds the dividend, counting in `k`; the second phase
    /// halves it back `k` times, shifting a quotient bit each step and
    /// subtracting where the divisor still fits.  Division by zero yields
    /// zero for both quotient and remainder.
    pub(crate) fn long_div(
        &mut self,
        x: &Operand,
        y: &Operand,
        want_rem: bool,
    ) -> Result<Register, CodegenError> {
        let d = self.copy(x)?; // running remainder
        let s = self.copy(y)?; // doubled divisor
        let q = self.select_zeroed()?;
        let k = self.select_zeroed()?;
        let t = self.select()?; // comparison scratch

        let range = self.sink.fresh_label("div_range");
        let step = self.sink.fresh_label("div_step");
        let sub = self.sink.fresh_label("div_sub");
        let zero = self.sink.fresh_label("div_zero");
        let done = self.sink.fresh_label("div_done");

        self.sink.emit(MachineInstr::Jzero(s, zero.clone()));

        // while s <= d: s += s; k += 1
        self.sink.place_label(&range);
        self.sink.emit(MachineInstr::Copy { d: t, s: d });
        self.sink.emit(MachineInstr::Inc(t));
        self.sink.emit(MachineInstr::Sub { d: t, s });
        self.sink.emit(MachineInstr::Jzero(t, step.clone())); // d < s
        self.sink.emit(MachineInstr::Add { d: s, s });
        self.sink.emit(MachineInstr::Inc(k));
        self.sink.emit(MachineInstr::Jump(range));

        // k times: halve s, shift q, subtract where s still fits.
        self.sink.place_label(&step);
        self.sink.emit(MachineInstr::Jzero(k, done.clone()));
        self.sink.emit(MachineInstr::Dec(k));
        self.sink.emit(MachineInstr::Half(s));
        self.sink.emit(MachineInstr::Add { d: q, s: q });
        self.sink.emit(MachineInstr::Copy { d: t, s });
        self.sink.emit(MachineInstr::Sub { d: t, s: d });
        self.sink.emit(MachineInstr::Jzero(t, sub.clone())); // s <= d
        self.sink.emit(MachineInstr::Jump(step.clone()));
        self.sink.place_label(&sub);
        self.sink.emit(MachineInstr::Sub { d, s });
        self.sink.emit(MachineInstr::Inc(q));
        self.sink.emit(MachineInstr::Jump(step));

        // Divisor was zero: quotient is already zero, zero the remainder.
        self.sink.place_label(&zero);
        self.sink.emit(MachineInstr::Sub { d, s: d });
        self.sink.place_label(&done);

        Ok(if want_rem { d } else { q })
    }

    // ── Comparison jumps ────────────────────────────────────────────────

    /// Jump to `target` when `left <= right`.
    pub(crate) fn jump_le(
        &mut self,
        left: &Operand,
        right: &Operand,
        target: &str,
    ) -> Result<(), CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let c = self.select()?;
        self.sink.emit(MachineInstr::Copy { d: c, s: l });
        self.sink.emit(MachineInstr::Sub { d: c, s: r });
        self.sink.emit(MachineInstr::Jzero(c, target.to_string()));
        Ok(())
    }

    /// Jump to `target` when `left >= right`.
    pub(crate) fn jump_ge(
        &mut self,
        left: &Operand,
        right: &Operand,
        target: &str,
    ) -> Result<(), CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let c = self.select()?;
        self.sink.emit(MachineInstr::Copy { d: c, s: r });
        self.sink.emit(MachineInstr::Sub { d: c, s: l });
        self.sink.emit(MachineInstr::Jzero(c, target.to_string()));
        Ok(())
    }

    /// Jump to `target` when `left > right`, via `(right + 1) − left = 0`.
    pub(crate) fn jump_gt(
        &mut self,
        left: &Operand,
        right: &Operand,
        target: &str,
    ) -> Result<(), CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let c = self.select()?;
        self.sink.emit(MachineInstr::Copy { d: c, s: r });
        self.sink.emit(MachineInstr::Inc(c));
        self.sink.emit(MachineInstr::Sub { d: c, s: l });
        self.sink.emit(MachineInstr::Jzero(c, target.to_string()));
        Ok(())
    }

    /// Jump to `target` when `left < right`, via `(left + 1) − right = 0`.
    pub(crate) fn jump_lt(
        &mut self,
        left: &Operand,
        right: &Operand,
        target: &str,
    ) -> Result<(), CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let c = self.select()?;
        self.sink.emit(MachineInstr::Copy { d: c, s: l });
        self.sink.emit(MachineInstr::Inc(c));
        self.sink.emit(MachineInstr::Sub { d: c, s: r });
        self.sink.emit(MachineInstr::Jzero(c, target.to_string()));
        Ok(())
    }

    /// Jump to `target` when the operands differ: test both strict orders.
    pub(crate) fn jump_ne(
        &mut self,
        left: &Operand,
        right: &Operand,
        target: &str,
    ) -> Result<(), CodegenError> {
        let l = self.load(left)?;
        let r = self.load(right)?;
        let c = self.select()?;
        self.sink.emit(MachineInstr::Copy { d: c, s: r });
        self.sink.emit(MachineInstr::Inc(c));
        self.sink.emit(MachineInstr::Sub { d: c, s: l });
        self.sink.emit(MachineInstr::Jzero(c, target.to_string()));
        self.sink.emit(MachineInstr::Copy { d: c, s: l });
        self.sink.emit(MachineInstr::Inc(c));
        self.sink.emit(MachineInstr::Sub { d: c, s: r });
        self.sink.emit(MachineInstr::Jzero(c, target.to_string()));
        Ok(())
    }
}
