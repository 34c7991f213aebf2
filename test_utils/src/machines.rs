//! Assembly shortcuts and typed value readers.

use cogwork::{AssemblyError, Catalog, EngineConfig, Machine, PlacedBlock, Value};

/// Assemble `blocks` with the standard catalog and default config.
///
/// # Errors
/// Propagates the [`AssemblyError`] from [`Machine::assemble`].
pub fn try_assemble(blocks: &[PlacedBlock]) -> Result<Machine, AssemblyError> {
    Machine::assemble(blocks, Catalog::standard(), &EngineConfig::default())
}

/// Assemble `blocks` with the standard catalog and default config.
///
/// # Panics
/// Panics with the assembly error if the placement is invalid.
#[must_use]
pub fn assemble(blocks: &[PlacedBlock]) -> Machine {
    try_assemble(blocks).unwrap_or_else(|e| panic!("assembly failed: {e}"))
}

/// Boolean value of `port` on `block`, if present and boolean.
#[must_use]
pub fn bool_at(machine: &Machine, block: &str, port: &str) -> Option<bool> {
    machine.value(&block.into(), port).and_then(Value::as_bool)
}

/// Numeric value of `port` on `block`, if present and numeric.
#[must_use]
pub fn number_at(machine: &Machine, block: &str, port: &str) -> Option<f64> {
    machine.value(&block.into(), port).and_then(Value::as_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_see_constant_outputs() {
        let machine = assemble(&[PlacedBlock::new("c", "constant").with_config("value", 3.0)]);
        assert_eq!(number_at(&machine, "c", "value"), Some(3.0));
        assert_eq!(bool_at(&machine, "c", "value"), None);
    }
}
