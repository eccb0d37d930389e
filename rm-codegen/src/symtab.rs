use crate::CodegenError;
use std::collections::HashMap;

/// Layout of a declared array: base cell, the user-declared lower bound of
/// the index range, and the element count.
#[derive(Debug, Clone)]
pub struct ArrayInfo {
    pub base: u64,
    pub start_index: i64,
    pub len: u64,
}

/// Read-only address view consumed by the back-end: every scalar has a
/// stable home cell, every array a base cell and a declared start index.
///
/// Cells are handed out consecutively from zero; `high_water` marks the
/// first cell free for temporary spill homes.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    scalars: HashMap<String, u64>,
    arrays: HashMap<String, ArrayInfo>,
    next_cell: u64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next free cell to a scalar and return its address.
    /// Re-declaring a name returns the address it already has.
    pub fn declare_scalar(&mut self, name: &str) -> u64 {
        if let Some(&addr) = self.scalars.get(name) {
            return addr;
        }
        let addr = self.next_cell;
        self.next_cell += 1;
        self.scalars.insert(name.to_string(), addr);
        addr
    }

    /// Reserve `len` consecutive cells for an array indexed from
    /// `start_index`, returning the base address.
    pub fn declare_array(&mut self, name: &str, start_index: i64, len: u64) -> u64 {
        if let Some(info) = self.arrays.get(name) {
            return info.base;
        }
        let base = self.next_cell;
        self.next_cell += len;
        self.arrays.insert(
            name.to_string(),
            ArrayInfo { base, start_index, len },
        );
        base
    }

    pub fn scalar_address(&self, name: &str) -> Result<u64, CodegenError> {
        if let Some(&addr) = self.scalars.get(name) {
            return Ok(addr);
        }
        if self.arrays.contains_key(name) {
            return Err(CodegenError::ArrayAsValue(name.to_string()));
        }
        Err(CodegenError::UndeclaredSymbol(name.to_string()))
    }

    pub fn array_info(&self, name: &str) -> Result<&ArrayInfo, CodegenError> {
        if let Some(info) = self.arrays.get(name) {
            return Ok(info);
        }
        if self.scalars.contains_key(name) {
            return Err(CodegenError::NotAnArray(name.to_string()));
        }
        Err(CodegenError::UndeclaredSymbol(name.to_string()))
    }

    /// First cell not claimed by any declaration; the spill area for
    /// temporaries starts here.
    pub fn high_water(&self) -> u64 {
        self.next_cell
    }
}
