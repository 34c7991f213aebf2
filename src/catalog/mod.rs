//! Block catalog: maps catalog ids to factories that build block units.
//!
//! [`Catalog::standard`] returns the reference set of leaves shipped with the
//! engine. Hosts with their own blocks start from [`Catalog::new`] or extend
//! a clone of the standard table.

mod control;
mod effectors;
mod logic;
mod memory;

use hashbrown::HashMap;
use once_cell::sync::Lazy;

use crate::unit::{BlockLogic, BuildError, UnitBuilder};

/// Builds the unit for one placed block.
pub type Factory = fn(&mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError>;

/// Static table from catalog id to [`Factory`].
#[derive(Clone, Default)]
pub struct Catalog {
    factories: HashMap<&'static str, Factory>,
}

static STANDARD: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new()
        .with("constant", logic::constant)
        .with("not", logic::not)
        .with("and", logic::and)
        .with("or", logic::or)
        .with("clamp", logic::clamp)
        .with("delay", memory::delay)
        .with("latch", memory::latch)
        .with("counter", memory::counter)
        .with("timer", memory::timer)
        .with("register", memory::register)
        .with("key_button", control::key_button)
        .with("keypad", control::keypad)
        .with("seat", control::seat)
        .with("lamp", control::lamp)
        .with("label", control::label)
        .with("probe", control::probe)
        .with("motor", effectors::motor)
        .with("thruster", effectors::thruster)
        .with("magnet", effectors::magnet)
});

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference catalog, built on first use.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    #[must_use]
    pub fn with(mut self, id: &'static str, factory: Factory) -> Self {
        self.register(id, factory);
        self
    }

    /// Add or replace the factory for `id`.
    pub fn register(&mut self, id: &'static str, factory: Factory) {
        self.factories.insert(id, factory);
    }

    /// Factory for `id`; `None` for unknown ids.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Factory> {
        self.factories.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.factories.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Reactive;
    use rstest::rstest;

    fn noop(_: &mut UnitBuilder<'_>) -> Result<Box<dyn BlockLogic>, BuildError> {
        Ok(Box::new(Reactive))
    }

    #[rstest]
    fn standard_catalog_knows_reference_blocks() {
        let catalog = Catalog::standard();
        for id in ["constant", "not", "clamp", "delay", "seat", "magnet", "timer"] {
            assert!(catalog.contains(id), "missing {id}");
        }
        assert!(catalog.get("warp_drive").is_none());
    }

    #[rstest]
    fn custom_catalogs_extend_the_standard_one() {
        let catalog = Catalog::standard().clone().with("noop", noop);
        assert!(catalog.contains("noop"));
        assert!(catalog.contains("not"));
        assert!(!Catalog::standard().contains("noop"));
    }

    #[rstest]
    fn ids_are_sorted() {
        let ids = Catalog::new().with("b", noop).with("a", noop).ids();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
