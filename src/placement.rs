//! Placement records handed over by the building subsystem.
//!
//! One [`PlacedBlock`] per block: its stable id, the catalog id naming its
//! behaviour, an opaque config object, optional colour, position, and the
//! upstream port feeding each of its inputs.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::value::Color;

/// Raw per-block configuration as authored in the editor.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Stable unique identifier of a placed block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream end of a connection: a block and one of its output ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub block: BlockId,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub id: BlockId,
    pub catalog_id: String,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Input port name to the upstream output feeding it.
    #[serde(default)]
    pub connections: BTreeMap<String, PortRef>,
}

impl PlacedBlock {
    /// A block at the origin with empty config and no connections.
    ///
    /// # Examples
    /// ```
    /// use cogwork::placement::PlacedBlock;
    /// let gate = PlacedBlock::new("g1", "not").connect("in", "src", "value");
    /// assert_eq!(gate.connections["in"].port, "value");
    /// ```
    #[must_use]
    pub fn new(id: impl Into<String>, catalog_id: impl Into<String>) -> Self {
        Self {
            id: BlockId(id.into()),
            catalog_id: catalog_id.into(),
            config: ConfigMap::new(),
            color: None,
            position: [0.0; 3],
            connections: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position.to_array();
        self
    }

    /// Feed input `input` from `upstream`'s output `port`.
    #[must_use]
    pub fn connect(mut self, input: &str, upstream: impl Into<String>, port: &str) -> Self {
        self.connections.insert(
            input.to_owned(),
            PortRef {
                block: BlockId(upstream.into()),
                port: port.to_owned(),
            },
        );
        self
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[must_use]
    pub fn config_f64(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(serde_json::Value::as_f64)
    }

    #[must_use]
    pub fn config_u32(&self, key: &str) -> Option<u32> {
        self.config
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    #[must_use]
    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(serde_json::Value::as_bool)
    }

    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Parse a JSON array of placement records.
///
/// # Errors
/// Returns the underlying `serde_json` error when the document is malformed.
pub fn parse_placements(json: &str) -> Result<Vec<PlacedBlock>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn placements_parse_with_defaults() {
        let blocks = parse_placements(
            r#"[
                {"id": "a", "catalog_id": "constant", "config": {"value": 5}},
                {"id": "b", "catalog_id": "probe",
                 "connections": {"in": {"block": "a", "port": "value"}}}
            ]"#,
        )
        .expect("placements should parse");
        assert_eq!(blocks.len(), 2);
        let first = blocks.first().expect("first block");
        assert_eq!(first.config_f64("value"), Some(5.0));
        assert_eq!(first.position(), Vec3::ZERO);
        let second = blocks.get(1).expect("second block");
        assert_eq!(second.connections.get("in").map(|r| r.block.clone()), Some(BlockId::from("a")));
    }

    #[rstest]
    fn config_accessors_reject_wrong_types() {
        let block = PlacedBlock::new("x", "clamp")
            .with_config("min", "low")
            .with_config("ticks", 3)
            .with_config("enabled", true);
        assert_eq!(block.config_f64("min"), None);
        assert_eq!(block.config_u32("ticks"), Some(3));
        assert_eq!(block.config_bool("enabled"), Some(true));
        assert_eq!(block.config_str("min"), Some("low"));
    }
}
