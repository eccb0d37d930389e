pub mod backend;
pub mod ir;
pub mod symtab;

use num_bigint::BigInt;
use thiserror::Error;

pub use backend::analysis::Analyses;
pub use backend::Assembly;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("undeclared symbol `{0}`")]
    UndeclaredSymbol(String),

    #[error("array `{0}` cannot be used as a scalar value")]
    ArrayAsValue(String),

    #[error("`{0}` is not an array")]
    NotAnArray(String),

    #[error("operand `{0}` cannot be indexed")]
    NotIndexable(String),

    #[error("operand `{0}` cannot be assigned to")]
    BadDestination(String),

    #[error("negative constant {0} used as a value")]
    NegativeConstant(BigInt),

    #[error("temporary t{0} is read before any value reaches it")]
    UnwrittenTemp(usize),

    #[error("working register pool exhausted")]
    PoolExhausted,

    #[error("array access `{name}[{index}]` resolves to a negative address")]
    AddressOverflow { name: String, index: BigInt },
}

/// Compile a block program to machine assembly, computing the block-level
/// analyses internally.
pub fn compile(
    program: &ir::Program,
    symtab: &symtab::SymbolTable,
) -> Result<Assembly, CodegenError> {
    let analyses = Analyses::compute(program);
    compile_with_analyses(program, symtab, &analyses)
}

/// Compile a block program to machine assembly with caller-supplied
/// liveness/dominator maps.
pub fn compile_with_analyses(
    program: &ir::Program,
    symtab: &symtab::SymbolTable,
    analyses: &Analyses,
) -> Result<Assembly, CodegenError> {
    backend::compile(program, symtab, analyses)
}
