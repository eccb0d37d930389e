// A small block-structured IR: named basic blocks of three-address
// instructions, each block ending in an explicit branch.
use num_bigint::BigInt;
use std::fmt;

pub type TempId = usize;

/// An IR operand: a literal, a declared scalar, a declared array base, or a
/// compiler-generated temporary.
///
/// Literals carry a `BigInt` because array indices may be negative within a
/// declared range; machine values themselves are non-negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Const(BigInt),
    Var(String),
    Arr(String),
    Temp(TempId),
}

impl Operand {
    pub fn int(v: i64) -> Self {
        Operand::Const(BigInt::from(v))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Operand::Var(name.into())
    }

    pub fn arr(name: impl Into<String>) -> Self {
        Operand::Arr(name.into())
    }

    pub fn temp(id: TempId) -> Self {
        Operand::Temp(id)
    }

    /// The storable location this operand refers to, if any.  Constants and
    /// array bases have none.
    pub fn place(&self) -> Option<Place> {
        match self {
            Operand::Var(name) => Some(Place::Var(name.clone())),
            Operand::Temp(id) => Some(Place::Temp(*id)),
            Operand::Const(_) | Operand::Arr(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(v) => write!(f, "{v}"),
            Operand::Var(name) => write!(f, "{name}"),
            Operand::Arr(name) => write!(f, "{name}"),
            Operand::Temp(id) => write!(f, "t{id}"),
        }
    }
}

/// A value that can live in a working register or a memory cell: a named
/// scalar or a temporary.  Keys the descriptor engine and the liveness sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Place {
    Var(String),
    Temp(TempId),
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Var(name) => write!(f, "{name}"),
            Place::Temp(id) => write!(f, "t{id}"),
        }
    }
}

/// Comparison condition of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cond::Eq => "==",
            Cond::Ne => "!=",
            Cond::Le => "<=",
            Cond::Ge => ">=",
            Cond::Lt => "<",
            Cond::Gt => ">",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub enum IrInstr {
    /// Read one value from standard input into `dst`.
    Get { dst: Operand },
    /// Write `src` to standard output.
    Put { src: Operand },
    Move { src: Operand, dst: Operand },
    IndexedLoad { base: Operand, index: Operand, dst: Operand },
    IndexedStore { src: Operand, base: Operand, index: Operand },
    Add { left: Operand, right: Operand, dst: Operand },
    Sub { left: Operand, right: Operand, dst: Operand },
    Mul { left: Operand, right: Operand, dst: Operand },
    Div { left: Operand, right: Operand, dst: Operand },
    Rem { left: Operand, right: Operand, dst: Operand },
    Jump { target: String },
    JumpIf {
        cond: Cond,
        left: Operand,
        right: Operand,
        if_true: String,
        if_false: String,
    },
    Halt,
}

impl IrInstr {
    /// Successor block names carried by a terminating branch.
    pub fn branch_targets(&self) -> Vec<&str> {
        match self {
            IrInstr::Jump { target } => vec![target.as_str()],
            IrInstr::JumpIf { if_true, if_false, .. } => {
                vec![if_true.as_str(), if_false.as_str()]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for IrInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrInstr::Get { dst } => write!(f, "get {dst}"),
            IrInstr::Put { src } => write!(f, "put {src}"),
            IrInstr::Move { src, dst } => write!(f, "{dst} := {src}"),
            IrInstr::IndexedLoad { base, index, dst } => {
                write!(f, "{dst} := {base}[{index}]")
            }
            IrInstr::IndexedStore { src, base, index } => {
                write!(f, "{base}[{index}] := {src}")
            }
            IrInstr::Add { left, right, dst } => write!(f, "{dst} := {left} + {right}"),
            IrInstr::Sub { left, right, dst } => write!(f, "{dst} := {left} - {right}"),
            IrInstr::Mul { left, right, dst } => write!(f, "{dst} := {left} * {right}"),
            IrInstr::Div { left, right, dst } => write!(f, "{dst} := {left} / {right}"),
            IrInstr::Rem { left, right, dst } => write!(f, "{dst} := {left} % {right}"),
            IrInstr::Jump { target } => write!(f, "goto {target}"),
            IrInstr::JumpIf { cond, left, right, if_true, if_false } => {
                write!(f, "if {left} {cond} {right} goto {if_true} else {if_false}")
            }
            IrInstr::Halt => write!(f, "halt"),
        }
    }
}

/// A named straight-line instruction sequence ending in a branch.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub name: String,
    pub instrs: Vec<IrInstr>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>, instrs: Vec<IrInstr>) -> Self {
        BasicBlock { name: name.into(), instrs }
    }
}

/// An ordered list of basic blocks; execution starts at the first.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub blocks: Vec<BasicBlock>,
}

impl Program {
    pub fn new(blocks: Vec<BasicBlock>) -> Self {
        Program { blocks }
    }
}
