//! Machine-instruction types and assembly output items.
//!
//! The target is a counter-style register machine: eight named registers
//! holding unbounded non-negative integers, a cell-addressed memory reached
//! through the address register `A`, and conditional transfers that test a
//! register for zero or for oddness.  `SUB` and `DEC` saturate at zero.

use super::abi::Register;
use std::fmt;

/// A typed machine instruction.
///
/// `Load`/`Store` move data between a register and the memory cell whose
/// address is currently in `A`.  Jump targets are symbolic labels resolved
/// by the consumer (assembler or simulator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineInstr {
    /// `GET r` — read one input value into `r`.
    Get(Register),
    /// `PUT r` — write `r` to the output.
    Put(Register),
    /// `LOAD r` — `r := mem[A]`.
    Load(Register),
    /// `STORE r` — `mem[A] := r`.
    Store(Register),
    /// `COPY d,s` — `d := s`.
    Copy { d: Register, s: Register },
    /// `ADD d,s` — `d := d + s`.
    Add { d: Register, s: Register },
    /// `SUB d,s` — `d := max(d − s, 0)`.
    Sub { d: Register, s: Register },
    /// `INC r`
    Inc(Register),
    /// `DEC r` — saturating at zero.
    Dec(Register),
    /// `HALF r` — `r := ⌊r / 2⌋`.
    Half(Register),
    /// `JUMP L`
    Jump(String),
    /// `JZERO r,L` — jump when `r = 0`.
    Jzero(Register, String),
    /// `JODD r,L` — jump when `r` is odd.
    Jodd(Register, String),
    /// `HALT`
    Halt,
}

impl fmt::Display for MachineInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineInstr::Get(r) => write!(f, "  GET {r}"),
            MachineInstr::Put(r) => write!(f, "  PUT {r}"),
            MachineInstr::Load(r) => write!(f, "  LOAD {r}"),
            MachineInstr::Store(r) => write!(f, "  STORE {r}"),
            MachineInstr::Copy { d, s } => write!(f, "  COPY {d},{s}"),
            MachineInstr::Add { d, s } => write!(f, "  ADD {d},{s}"),
            MachineInstr::Sub { d, s } => write!(f, "  SUB {d},{s}"),
            MachineInstr::Inc(r) => write!(f, "  INC {r}"),
            MachineInstr::Dec(r) => write!(f, "  DEC {r}"),
            MachineInstr::Half(r) => write!(f, "  HALF {r}"),
            MachineInstr::Jump(l) => write!(f, "  JUMP {l}"),
            MachineInstr::Jzero(r, l) => write!(f, "  JZERO {r},{l}"),
            MachineInstr::Jodd(r, l) => write!(f, "  JODD {r},{l}"),
            MachineInstr::Halt => write!(f, "  HALT"),
        }
    }
}

/// One element of the emitted assembly stream.
#[derive(Debug, Clone)]
pub enum AsmItem {
    /// A label on its own line.
    Label(String),
    /// An instruction with an optional trailing annotation.
    Instr {
        instr: MachineInstr,
        comment: Option<String>,
    },
    /// A free-standing informational line.
    Comment(String),
}

impl fmt::Display for AsmItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmItem::Label(name) => write!(f, "{name}:"),
            AsmItem::Instr { instr, comment: None } => write!(f, "{instr}"),
            AsmItem::Instr { instr, comment: Some(c) } => write!(f, "{instr}  # {c}"),
            AsmItem::Comment(c) => write!(f, "# {c}"),
        }
    }
}
