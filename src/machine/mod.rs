//! Machine container: every unit of one assembled structure.
//!
//! Assembly builds one unit per placed block through the catalog, wires the
//! declared connections, resolves the execution order once and enables the
//! machine. The host then calls [`Machine::step`] once per simulation frame.

mod error;
mod field;
mod seat;

use std::mem;

use hashbrown::{HashMap, HashSet};
use log::{debug, info, warn};

pub use error::AssemblyError;
pub use seat::BodyState;

use crate::catalog::Catalog;
use crate::cell::{CellGraph, CellId};
use crate::config::EngineConfig;
use crate::fault::{FaultEffect, FaultReason};
use crate::impact::ImpactSubsystem;
use crate::placement::{BlockId, PlacedBlock};
use crate::resolver::{resolve, ExecutionOrder};
use crate::unit::{BlockUnit, Frame, KeyState, UnitBuilder, UnitId};
use crate::value::{KeyCode, Value};

use field::ForceField;
use seat::PilotSeat;

/// One assembled structure and its runtime state.
pub struct Machine {
    units: Vec<BlockUnit>,
    index: HashMap<BlockId, UnitId>,
    graph: CellGraph,
    order: ExecutionOrder,
    seats: Vec<(UnitId, CellId)>,
    pilot: Option<PilotSeat>,
    field: ForceField,
    keys: KeyState,
    occupied: bool,
    tick: u64,
    enabled: bool,
    faults: Vec<FaultEffect>,
    impact: Option<Box<dyn ImpactSubsystem>>,
}

impl Machine {
    /// Assemble a machine from placement data.
    ///
    /// # Errors
    /// Returns an [`AssemblyError`] when a block id repeats, a factory fails
    /// or a declared connection cannot be wired.
    pub fn assemble(
        blocks: &[PlacedBlock],
        catalog: &Catalog,
        config: &EngineConfig,
    ) -> Result<Self, AssemblyError> {
        Self::assemble_with_impact(blocks, catalog, config, None)
    }

    /// Assemble a machine and attach an impact collaborator once assembly
    /// succeeds.
    ///
    /// # Errors
    /// As [`Machine::assemble`]. The collaborator is not attached on error.
    pub fn assemble_with_impact(
        blocks: &[PlacedBlock],
        catalog: &Catalog,
        config: &EngineConfig,
        mut impact: Option<Box<dyn ImpactSubsystem>>,
    ) -> Result<Self, AssemblyError> {
        let mut graph = CellGraph::new(config.propagation_budget);
        let mut units: Vec<BlockUnit> = Vec::new();
        let mut placed: Vec<&PlacedBlock> = Vec::new();
        let mut index = HashMap::new();
        let mut skipped = HashSet::new();
        let mut seats = Vec::new();
        let mut field = ForceField::default();

        for block in blocks {
            if index.contains_key(&block.id) || skipped.contains(&block.id) {
                return Err(AssemblyError::DuplicateBlock(block.id.clone()));
            }
            let Some(factory) = catalog.get(&block.catalog_id) else {
                warn!(
                    "skipping block {}: unknown catalog id '{}'",
                    block.id, block.catalog_id
                );
                skipped.insert(block.id.clone());
                continue;
            };
            let id = UnitId(u32::try_from(units.len()).unwrap_or(u32::MAX));
            let mut builder = UnitBuilder::new(id, block, &mut graph);
            let logic = factory(&mut builder).map_err(|source| AssemblyError::Build {
                block: block.id.clone(),
                catalog_id: block.catalog_id.clone(),
                source,
            })?;
            let (unit, roles) = builder.finish(&block.catalog_id, logic);
            if let Some(occupied) = roles.seat {
                seats.push((id, occupied));
            }
            if let Some((strength, force)) = roles.field {
                field.join(id, block.position(), strength, force);
            }
            index.insert(block.id.clone(), id);
            units.push(unit);
            placed.push(block);
        }

        for (unit, block) in units.iter().zip(&placed) {
            for (input, source) in &block.connections {
                let Some(upstream) = index.get(&source.block) else {
                    if skipped.contains(&source.block) {
                        warn!(
                            "leaving input '{input}' of block {} unwired: block {} was skipped",
                            block.id, source.block
                        );
                        continue;
                    }
                    return Err(AssemblyError::MissingUpstream {
                        block: block.id.clone(),
                        input: input.clone(),
                        upstream: source.block.clone(),
                    });
                };
                let from = units
                    .get(upstream.index())
                    .and_then(|u| u.output(&source.port))
                    .ok_or_else(|| AssemblyError::MissingUpstreamPort {
                        block: block.id.clone(),
                        upstream: source.block.clone(),
                        port: source.port.clone(),
                    })?;
                let to = unit.input(input).ok_or_else(|| AssemblyError::MissingInput {
                    block: block.id.clone(),
                    input: input.clone(),
                })?;
                graph
                    .connect(from, to)
                    .map_err(|err| AssemblyError::Connect {
                        block: block.id.clone(),
                        input: input.clone(),
                        source: err,
                    })?;
                debug!("wired {}.{} -> {}.{input}", source.block, source.port, block.id);
            }
        }

        let order = resolve(&graph, units.len());
        let pilot = seats.first().map(|(unit, _)| PilotSeat::new(*unit, config));

        if let Some(collaborator) = impact.as_mut() {
            collaborator.attach(blocks);
        }

        let mut machine = Self {
            units,
            index,
            graph,
            order,
            seats,
            pilot,
            field,
            keys: KeyState::default(),
            occupied: false,
            tick: 0,
            enabled: true,
            faults: Vec::new(),
            impact,
        };
        for unit in &mut machine.units {
            unit.enable(&machine.graph);
        }
        machine.collect_faults();
        info!(
            "assembled machine: {} units in {} groups, {} seats, {} magnets",
            machine.units.len(),
            machine.order.len(),
            machine.seats.len(),
            machine.field.len()
        );
        Ok(machine)
    }

    /// Run one simulation frame.
    pub fn step(&mut self) {
        self.advance(1);
    }

    /// Run one frame covering `ticks` elapsed ticks. Cell timers advance by
    /// `ticks`; every unit still ticks once. Each cell changes at most once
    /// per frame, so a feedback loop moves one step per call. No-op once
    /// torn down.
    pub fn advance(&mut self, ticks: u32) {
        if !self.enabled || ticks == 0 {
            return;
        }
        self.tick += 1;
        self.graph.begin_frame();
        self.graph.flush();
        self.collect_faults();
        self.field.apply(&mut self.graph);
        self.collect_faults();

        let order = mem::take(&mut self.order);
        for unit_id in order.units() {
            let Some(unit) = self.units.get_mut(unit_id.index()) else {
                continue;
            };
            let frame = Frame {
                tick: self.tick,
                ticks,
                keys: &self.keys,
            };
            if let Err(fault) = unit.tick(&mut self.graph, &frame) {
                self.fault_unit(unit_id, FaultReason::Logic(fault));
            }
            self.graph.flush();
            self.collect_faults();
        }
        self.order = order;

        if let Some(pilot) = self.pilot.as_mut() {
            pilot.clamp();
        }
        self.refresh_occupancy();
    }

    fn fault_unit(&mut self, unit_id: UnitId, reason: FaultReason) {
        let Some(unit) = self.units.get_mut(unit_id.index()) else {
            return;
        };
        if !unit.fault_with(&mut self.graph, reason.clone()) {
            return;
        }
        let effect = FaultEffect {
            block: unit.block_id().clone(),
            catalog_id: unit.catalog_id().to_owned(),
            reason,
            tick: self.tick,
        };
        warn!("{effect}");
        self.faults.push(effect);
    }

    fn collect_faults(&mut self) {
        for (unit, cell) in self.graph.take_faults() {
            let port = self.graph.name(cell).unwrap_or_default().to_owned();
            self.fault_unit(unit, FaultReason::NonFinite { port });
        }
    }

    fn refresh_occupancy(&mut self) {
        let occupied = self.seats.iter().any(|(_, cell)| {
            self.graph
                .get(*cell)
                .and_then(Value::as_bool)
                .unwrap_or(false)
        });
        if occupied != self.occupied {
            info!(
                "machine {}",
                if occupied { "occupied by local player" } else { "vacated" }
            );
        }
        self.occupied = occupied;
        for unit in &mut self.units {
            unit.set_controls_enabled(occupied);
        }
    }

    fn unit_id(&self, block: &BlockId) -> Option<UnitId> {
        self.index.get(block).copied()
    }

    /// Publish the occupancy of the seat placed as `block`. Returns `false`
    /// if `block` is not a live seat.
    pub fn set_seat_occupied(&mut self, block: &BlockId, occupied: bool) -> bool {
        let Some(unit) = self.unit_id(block) else {
            return false;
        };
        let Some(cell) = self
            .seats
            .iter()
            .find(|(seat, _)| *seat == unit)
            .map(|(_, cell)| *cell)
        else {
            return false;
        };
        if !self.graph.is_live(cell) {
            return false;
        }
        self.graph.set(cell, occupied);
        self.collect_faults();
        self.refresh_occupancy();
        true
    }

    /// Whether any live seat reports a local occupant.
    #[must_use]
    pub const fn occupied_by_local_player(&self) -> bool {
        self.occupied
    }

    /// Replace the host key state read by key-driven blocks.
    pub fn set_pressed_keys(&mut self, keys: impl IntoIterator<Item = KeyCode>) {
        self.keys = KeyState::new(keys);
    }

    fn pilot_is_live(&self) -> bool {
        self.pilot.as_ref().is_some_and(|pilot| {
            self.units
                .get(pilot.unit.index())
                .is_some_and(BlockUnit::is_enabled)
        })
    }

    /// Body velocities driven by the pilot seat, if one is still live.
    #[must_use]
    pub fn pilot_body(&self) -> Option<&BodyState> {
        if !self.pilot_is_live() {
            return None;
        }
        self.pilot.as_ref().map(|pilot| &pilot.body)
    }

    pub fn pilot_body_mut(&mut self) -> Option<&mut BodyState> {
        if !self.pilot_is_live() {
            return None;
        }
        self.pilot.as_mut().map(|pilot| &mut pilot.body)
    }

    /// Write `value` into input `port` of `block`, as a sensor or test
    /// harness would. Returns `false` when no such live input exists.
    pub fn set_input(&mut self, block: &BlockId, port: &str, value: impl Into<Value>) -> bool {
        let Some(cell) = self
            .unit(block)
            .and_then(|unit| unit.input(port))
            .filter(|cell| self.graph.is_live(*cell))
        else {
            return false;
        };
        self.graph.set(cell, value);
        self.collect_faults();
        true
    }

    /// Disable one block in place. The execution order is left as is.
    pub fn detach_block(&mut self, block: &BlockId) -> bool {
        let Some(unit) = self.unit_id(block).and_then(|id| self.units.get_mut(id.index())) else {
            return false;
        };
        unit.disable(&mut self.graph);
        info!("detached block {block}");
        self.refresh_occupancy();
        true
    }

    /// Disable every unit and release the impact collaborator. Safe to call
    /// repeatedly; also runs on drop.
    pub fn teardown(&mut self) {
        for unit in &mut self.units {
            unit.disable(&mut self.graph);
        }
        if let Some(mut impact) = self.impact.take() {
            impact.detach();
        }
        if self.enabled {
            info!("machine torn down after {} ticks", self.tick);
        }
        self.enabled = false;
        self.occupied = false;
    }

    /// Fault effects raised since the last call.
    pub fn drain_faults(&mut self) -> Vec<FaultEffect> {
        mem::take(&mut self.faults)
    }

    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub const fn execution_order(&self) -> &ExecutionOrder {
        &self.order
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn unit(&self, block: &BlockId) -> Option<&BlockUnit> {
        self.unit_id(block).and_then(|id| self.units.get(id.index()))
    }

    /// Units in placement order.
    pub fn units(&self) -> impl Iterator<Item = &BlockUnit> {
        self.units.iter()
    }

    /// Current value of output or input `port` of `block`.
    #[must_use]
    pub fn value(&self, block: &BlockId, port: &str) -> Option<&Value> {
        let unit = self.unit(block)?;
        let cell = unit.output(port).or_else(|| unit.input(port))?;
        self.graph.get(cell)
    }

    #[must_use]
    pub const fn cells(&self) -> &CellGraph {
        &self.graph
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.teardown();
    }
}
