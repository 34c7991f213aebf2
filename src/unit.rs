//! Block logic units: the per-block behaviour objects driven by a machine.
//!
//! A unit is created by a catalog factory through a [`UnitBuilder`], which
//! declares the block's ports (building each cell through the value type
//! registry) and may subscribe reactions to them. Every tick the machine
//! advances the unit's cell timers and then calls [`BlockLogic::tick`].
//! Leaves can use either mechanism, or both.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use log::debug;
use thiserror::Error;

use crate::cell::{CellGraph, CellId, CellKind, Subscriber, SubscriptionId};
use crate::fault::FaultReason;
use crate::placement::{BlockId, ConfigMap, PlacedBlock};
use crate::registry::{SchemaError, ValueKind};
use crate::value::{KeyCode, Value};

/// Index of a unit inside its machine, in placement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u32);

impl UnitId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Domain error reported by a leaf behaviour. Returning one faults the unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicFault {
    #[error("no output port named '{0}'")]
    UnknownPort(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Domain(String),
}

/// Errors raised while a factory builds a unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("port '{port}' has an invalid schema: {source}")]
    Schema {
        port: String,
        #[source]
        source: SchemaError,
    },
    #[error("port '{0}' declared twice")]
    DuplicatePort(String),
    #[error("config key '{key}' {reason}")]
    Config { key: String, reason: String },
}

/// Keys currently held on the host's input device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyState {
    pressed: HashSet<KeyCode>,
}

impl KeyState {
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self {
            pressed: keys.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }
}

/// Behaviour of one block.
pub trait BlockLogic {
    /// Recompute outputs from inputs. Leaves that react purely through
    /// subscriptions keep the default.
    ///
    /// # Errors
    /// A returned [`LogicFault`] disables the unit.
    fn tick(&mut self, _ctx: &mut TickCtx<'_>) -> Result<(), LogicFault> {
        Ok(())
    }
}

/// Logic for leaves whose behaviour lives entirely in subscriptions.
#[derive(Debug, Default)]
pub struct Reactive;

impl BlockLogic for Reactive {}

#[derive(Debug, Default)]
struct Ports {
    inputs: BTreeMap<String, CellId>,
    outputs: BTreeMap<String, CellId>,
}

/// Machine roles a unit can take on besides ticking.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Roles {
    /// Occupancy output of a seat.
    pub seat: Option<CellId>,
    /// Strength input and force output of a force-field participant.
    pub field: Option<(CellId, CellId)>,
}

/// Construction context handed to catalog factories.
pub struct UnitBuilder<'a> {
    id: UnitId,
    block: &'a PlacedBlock,
    graph: &'a mut CellGraph,
    ports: Ports,
    roles: Roles,
}

impl<'a> UnitBuilder<'a> {
    pub(crate) fn new(id: UnitId, block: &'a PlacedBlock, graph: &'a mut CellGraph) -> Self {
        Self {
            id,
            block,
            graph,
            ports: Ports::default(),
            roles: Roles::default(),
        }
    }

    #[must_use]
    pub const fn block(&self) -> &PlacedBlock {
        self.block
    }

    #[must_use]
    pub fn config(&self) -> &ConfigMap {
        &self.block.config
    }

    /// Read a numeric config value, falling back to `default` when absent.
    ///
    /// # Errors
    /// Returns [`BuildError::Config`] when the key is present but not a
    /// number.
    pub fn number_or(&self, key: &str, default: f64) -> Result<f64, BuildError> {
        match self.block.config.get(key) {
            None => Ok(default),
            Some(_) => self.block.config_f64(key).ok_or_else(|| BuildError::Config {
                key: key.to_owned(),
                reason: "must be a number".to_owned(),
            }),
        }
    }

    /// Read a non-negative integer config value, falling back to `default`.
    ///
    /// # Errors
    /// Returns [`BuildError::Config`] when the key is present but not a
    /// `u32`.
    pub fn count_or(&self, key: &str, default: u32) -> Result<u32, BuildError> {
        match self.block.config.get(key) {
            None => Ok(default),
            Some(_) => self.block.config_u32(key).ok_or_else(|| BuildError::Config {
                key: key.to_owned(),
                reason: "must be a non-negative integer".to_owned(),
            }),
        }
    }

    /// Declare an input port.
    ///
    /// # Errors
    /// Fails when the schema is invalid or the name is already taken.
    pub fn input(&mut self, name: &str, kind: &ValueKind) -> Result<CellId, BuildError> {
        let cell = self.port(name, kind)?;
        self.ports.inputs.insert(name.to_owned(), cell);
        Ok(cell)
    }

    /// Declare an output port.
    ///
    /// # Errors
    /// Fails when the schema is invalid or the name is already taken.
    pub fn output(&mut self, name: &str, kind: &ValueKind) -> Result<CellId, BuildError> {
        let cell = self.port(name, kind)?;
        self.graph.mark_output(cell);
        self.ports.outputs.insert(name.to_owned(), cell);
        Ok(cell)
    }

    fn port(&mut self, name: &str, kind: &ValueKind) -> Result<CellId, BuildError> {
        if self.ports.inputs.contains_key(name) || self.ports.outputs.contains_key(name) {
            return Err(BuildError::DuplicatePort(name.to_owned()));
        }
        let (cell_kind, initial) = kind.instantiate().map_err(|source| BuildError::Schema {
            port: name.to_owned(),
            source,
        })?;
        Ok(self.graph.insert(self.id, name, cell_kind, initial))
    }

    /// Subscribe a reaction to one of this unit's cells. The callback may only
    /// write this unit's outputs.
    pub fn subscribe(
        &mut self,
        cell: CellId,
        fire_immediately: bool,
        callback: Subscriber,
    ) -> Option<SubscriptionId> {
        if self.graph.owner(cell) != Some(self.id) {
            debug!("{} tried to subscribe to a foreign cell", self.block.id);
            return None;
        }
        self.graph
            .subscribe_scoped(cell, fire_immediately, Some(self.id), callback)
    }

    /// Mark this unit as a seat whose occupancy is published on `occupied`.
    pub fn declare_seat(&mut self, occupied: CellId) {
        self.roles.seat = Some(occupied);
    }

    /// Register with the machine's force field.
    pub fn join_force_field(&mut self, strength: CellId, force: CellId) {
        self.roles.field = Some((strength, force));
    }

    pub(crate) fn finish(self, catalog_id: &str, logic: Box<dyn BlockLogic>) -> (BlockUnit, Roles) {
        let cells = self
            .ports
            .inputs
            .values()
            .chain(self.ports.outputs.values())
            .copied()
            .collect();
        let unit = BlockUnit {
            id: self.id,
            block: self.block.id.clone(),
            catalog_id: catalog_id.to_owned(),
            ports: self.ports,
            cells,
            enabled: false,
            controls_enabled: false,
            fault: None,
            logic,
        };
        (unit, self.roles)
    }
}

/// Per-frame inputs shared by every unit tick.
pub(crate) struct Frame<'a> {
    pub tick: u64,
    pub ticks: u32,
    pub keys: &'a KeyState,
}

/// What a leaf sees during [`BlockLogic::tick`]: its own inputs and outputs,
/// with write access to outputs only.
pub struct TickCtx<'a> {
    ports: &'a Ports,
    graph: &'a mut CellGraph,
    tick: u64,
    ticks: u32,
    controls_enabled: bool,
    keys: &'a KeyState,
}

impl TickCtx<'_> {
    /// Machine tick counter.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Ticks elapsed since the previous call, normally one.
    #[must_use]
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Whether a local occupant is piloting the machine.
    #[must_use]
    pub const fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.is_pressed(key)
    }

    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.ports
            .inputs
            .get(name)
            .and_then(|cell| self.graph.get(*cell))
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.ports
            .outputs
            .get(name)
            .and_then(|cell| self.graph.get(*cell))
    }

    #[must_use]
    pub fn input_bool(&self, name: &str) -> bool {
        self.input(name).and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn input_number(&self, name: &str) -> Option<f64> {
        self.input(name).and_then(Value::as_number)
    }

    #[must_use]
    pub fn output_kind(&self, name: &str) -> Option<&CellKind> {
        self.ports
            .outputs
            .get(name)
            .and_then(|cell| self.graph.kind(*cell))
    }

    /// Write one of this unit's outputs and propagate it downstream.
    ///
    /// # Errors
    /// Returns [`LogicFault::UnknownPort`] when no output has that name.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), LogicFault> {
        let cell = *self
            .ports
            .outputs
            .get(name)
            .ok_or_else(|| LogicFault::UnknownPort(name.to_owned()))?;
        self.graph.write(cell, value.into());
        Ok(())
    }
}

/// The behaviour object for one placed block.
pub struct BlockUnit {
    id: UnitId,
    block: BlockId,
    catalog_id: String,
    ports: Ports,
    cells: Vec<CellId>,
    enabled: bool,
    controls_enabled: bool,
    fault: Option<FaultReason>,
    logic: Box<dyn BlockLogic>,
}

impl BlockUnit {
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    #[must_use]
    pub const fn block_id(&self) -> &BlockId {
        &self.block
    }

    #[must_use]
    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    #[must_use]
    pub fn input(&self, name: &str) -> Option<CellId> {
        self.ports.inputs.get(name).copied()
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<CellId> {
        self.ports.outputs.get(name).copied()
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.ports.inputs.keys().map(String::as_str)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.ports.outputs.keys().map(String::as_str)
    }

    /// Every cell owned by the unit, inputs first.
    #[must_use]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    #[must_use]
    pub const fn fault(&self) -> Option<&FaultReason> {
        self.fault.as_ref()
    }

    pub(crate) fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    /// Enable the unit unless it has faulted or been torn down.
    pub(crate) fn enable(&mut self, graph: &CellGraph) {
        let intact = self.cells.iter().all(|cell| graph.is_live(*cell));
        if self.fault.is_none() && intact {
            self.enabled = true;
        }
    }

    /// Advance cell timers, then run the leaf logic. No-op when disabled.
    pub(crate) fn tick(&mut self, graph: &mut CellGraph, frame: &Frame<'_>) -> Result<(), LogicFault> {
        if !self.enabled {
            return Ok(());
        }
        for cell in &self.cells {
            if let Some(key) = graph.kind(*cell).and_then(CellKind::bound_key) {
                let held = self.controls_enabled && frame.keys.is_pressed(key);
                graph.enqueue(*cell, Value::Bool(held));
            }
        }
        graph.advance(&self.cells, frame.ticks);
        let mut ctx = TickCtx {
            ports: &self.ports,
            graph,
            tick: frame.tick,
            ticks: frame.ticks,
            controls_enabled: self.controls_enabled,
            keys: frame.keys,
        };
        self.logic.tick(&mut ctx)
    }

    /// Destroy every owned cell. Safe to call repeatedly.
    pub fn disable(&mut self, graph: &mut CellGraph) {
        for cell in &self.cells {
            graph.destroy(*cell);
        }
        self.enabled = false;
    }

    /// Record `reason` and disable. Returns `false` if the unit had already
    /// faulted, so the fault effect is only emitted once.
    pub(crate) fn fault_with(&mut self, graph: &mut CellGraph, reason: FaultReason) -> bool {
        if self.fault.is_some() {
            return false;
        }
        self.fault = Some(reason);
        self.disable(graph);
        true
    }
}
