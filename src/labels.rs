use crate::error::CompileError;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::HashMap;

/// Maps label names to the index of the instruction that follows them.
pub struct LabelTable {
    table: HashMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable {
            table: HashMap::new(),
        }
    }

    /// Binds `name` to the instruction index `target`. `line` is only used
    /// for the error message.
    pub fn define(
        &mut self,
        name: &str,
        target: usize,
        line: usize,
    ) -> Result<(), CompileError> {
        match self.table.entry(name.to_string()) {
            Vacant(e) => {
                e.insert(target);
                Ok(())
            }
            Occupied(_) => Err(CompileError::DuplicateLabel {
                line,
                label: name.to_string(),
            }),
        }
    }

    pub fn resolve(&self, name: &str, line: usize) -> Result<usize, CompileError> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UndefinedLabel {
                line,
                label: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}
