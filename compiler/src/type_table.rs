use std::collections::BTreeSet;

use crate::types::SchemaUnit;

/// Names the emitter treats as known file-scope types, on top of the fixed
/// scalar mapping in [`crate::types::Scalar`].
///
/// Filled once per compilation, after parsing and before emission, with the
/// file's top-level enum names.
#[derive(Debug, Default, Clone)]
pub struct TypeTable {
    enums: BTreeSet<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every top-level enum of `unit`. Calling it again with the
    /// same unit changes nothing.
    pub fn register_enums(&mut self, unit: &SchemaUnit) {
        for name in unit.enums.keys() {
            if self.enums.insert(name.clone()) {
                tracing::trace!(name = %name, "registered enum type");
            }
        }
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.contains(name)
    }
}
