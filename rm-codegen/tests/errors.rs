//! Error reporting for IR the dispatcher cannot lower.

use num_bigint::BigInt;
use rm_codegen::ir::{BasicBlock, IrInstr, Operand, Program};
use rm_codegen::symtab::SymbolTable;
use rm_codegen::{compile, CodegenError};

fn single_block(instrs: Vec<IrInstr>) -> Program {
    Program::new(vec![BasicBlock::new("main", instrs)])
}

#[test]
fn undeclared_scalar_is_reported() {
    let symtab = SymbolTable::new();
    let program = single_block(vec![
        IrInstr::Put { src: Operand::var("ghost") },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::UndeclaredSymbol("ghost".to_string())
    );
}

#[test]
fn undeclared_destination_is_reported() {
    let symtab = SymbolTable::new();
    let program = single_block(vec![
        IrInstr::Get { dst: Operand::var("ghost") },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::UndeclaredSymbol("ghost".to_string())
    );
}

#[test]
fn array_used_as_a_value_is_reported() {
    let mut symtab = SymbolTable::new();
    symtab.declare_array("T", 0, 4);
    let program = single_block(vec![
        IrInstr::Put { src: Operand::var("T") },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::ArrayAsValue("T".to_string())
    );
}

#[test]
fn indexing_a_scalar_is_reported() {
    let mut symtab = SymbolTable::new();
    symtab.declare_scalar("x");
    let program = single_block(vec![
        IrInstr::IndexedLoad {
            base: Operand::arr("x"),
            index: Operand::int(0),
            dst: Operand::temp(0),
        },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::NotAnArray("x".to_string())
    );
}

#[test]
fn indexing_a_constant_is_reported() {
    let symtab = SymbolTable::new();
    let program = single_block(vec![
        IrInstr::IndexedLoad {
            base: Operand::int(3),
            index: Operand::int(0),
            dst: Operand::temp(0),
        },
        IrInstr::Halt,
    ]);
    assert!(matches!(
        compile(&program, &symtab),
        Err(CodegenError::NotIndexable(_))
    ));
}

#[test]
fn negative_effective_address_is_reported() {
    let mut symtab = SymbolTable::new();
    symtab.declare_array("T", 0, 4);
    let program = single_block(vec![
        IrInstr::IndexedLoad {
            base: Operand::arr("T"),
            index: Operand::int(-1),
            dst: Operand::temp(0),
        },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::AddressOverflow {
            name: "T".to_string(),
            index: BigInt::from(-1),
        }
    );
}

#[test]
fn negative_constant_as_a_value_is_reported() {
    let symtab = SymbolTable::new();
    let program = single_block(vec![
        IrInstr::Put { src: Operand::int(-5) },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::NegativeConstant(BigInt::from(-5))
    );
}

#[test]
fn reading_an_unwritten_temporary_is_reported() {
    let symtab = SymbolTable::new();
    let program = single_block(vec![
        IrInstr::Put { src: Operand::temp(3) },
        IrInstr::Halt,
    ]);
    assert_eq!(
        compile(&program, &symtab).unwrap_err(),
        CodegenError::UnwrittenTemp(3)
    );
}

#[test]
fn constant_destination_is_reported() {
    let symtab = SymbolTable::new();
    let program = single_block(vec![
        IrInstr::Get { dst: Operand::int(1) },
        IrInstr::Halt,
    ]);
    assert!(matches!(
        compile(&program, &symtab),
        Err(CodegenError::BadDestination(_))
    ));
}

#[test]
fn array_destination_is_reported() {
    let mut symtab = SymbolTable::new();
    symtab.declare_array("T", 0, 4);
    let program = single_block(vec![
        IrInstr::Move {
            src: Operand::int(1),
            dst: Operand::arr("T"),
        },
        IrInstr::Halt,
    ]);
    assert!(matches!(
        compile(&program, &symtab),
        Err(CodegenError::BadDestination(_))
    ));
}
