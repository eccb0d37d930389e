//! Constant materialization: place a non-negative integer into a register
//! with the shorter of two constructions.
//!
//! Unary builds the value with `INC` alone; binary rebuilds it bit by bit
//! with `ADD r,r` doublings and `INC` on set bits.  Unary wins for small
//! values, binary for everything else; the crossover uses the cost estimate
//! `5·bitlen + popcount`.

use super::abi::Register;
use super::instruction::MachineInstr;
use super::sink::Sink;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Emit a sequence leaving exactly `v` in `r`.  Always starts with
/// `SUB r,r`, so the sequence is independent of the register's prior value.
pub fn emit_constant(sink: &mut Sink, r: Register, v: &BigUint) {
    sink.emit(MachineInstr::Sub { d: r, s: r });

    let bits = v.bits();
    let ones = v.count_ones();
    let unary = v
        .to_u64()
        .filter(|&n| n <= 5 * bits + ones);

    match unary {
        Some(n) => {
            for _ in 0..n {
                sink.emit(MachineInstr::Inc(r));
            }
        }
        None => {
            for i in (0..bits).rev() {
                if i != bits - 1 {
                    sink.emit(MachineInstr::Add { d: r, s: r });
                }
                if v.bit(i) {
                    sink.emit(MachineInstr::Inc(r));
                }
            }
        }
    }
}
