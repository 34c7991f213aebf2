//! Bevy plugin stepping machines from the app's frame schedule.
//!
//! Machines are `!Send`, so they live in the [`MachineHost`] non-send
//! resource and are stepped on the main thread during `Update`. Fault
//! effects drained after each step are re-emitted as [`BlockFaulted`]
//! events for presentation and physics observers.

use std::collections::BTreeMap;

use bevy::ecs::prelude::On;
use bevy::prelude::*;
use bevy_app::{App, Plugin, Update};
use bevy_ecs::system::SystemParam;
use log::error;

use crate::fault::FaultEffect;
use crate::machine::Machine;

/// Key of a machine inside [`MachineHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineHandle(u64);

/// Every machine driven by the app, stepped in insertion order.
#[derive(Default)]
pub struct MachineHost {
    machines: BTreeMap<MachineHandle, Machine>,
    next: u64,
}

impl MachineHost {
    pub fn insert(&mut self, machine: Machine) -> MachineHandle {
        let handle = MachineHandle(self.next);
        self.next += 1;
        self.machines.insert(handle, machine);
        handle
    }

    #[must_use]
    pub fn get(&self, handle: MachineHandle) -> Option<&Machine> {
        self.machines.get(&handle)
    }

    pub fn get_mut(&mut self, handle: MachineHandle) -> Option<&mut Machine> {
        self.machines.get_mut(&handle)
    }

    /// Remove a machine. Dropping it tears it down.
    pub fn remove(&mut self, handle: MachineHandle) -> Option<Machine> {
        self.machines.remove(&handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Step every machine once and collect the faults they raised.
    pub fn step_all(&mut self) -> Vec<BlockFaulted> {
        let mut raised = Vec::new();
        for (handle, machine) in &mut self.machines {
            machine.step();
            raised.extend(machine.drain_faults().into_iter().map(|effect| BlockFaulted {
                machine: *handle,
                effect,
            }));
        }
        raised
    }
}

/// A block of a hosted machine disabled itself.
#[derive(Event, Debug, Clone)]
pub struct BlockFaulted {
    pub machine: MachineHandle,
    pub effect: FaultEffect,
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value."
)]
fn log_block_fault(event: On<BlockFaulted>) {
    let BlockFaulted { machine, effect } = event.event();
    error!("machine {}: {effect}", machine.0);
}

#[derive(SystemParam)]
struct StepContext<'w, 's> {
    host: NonSendMut<'w, MachineHost>,
    commands: Commands<'w, 's>,
}

fn step_machines_system(mut ctx: StepContext) {
    for fault in ctx.host.step_all() {
        ctx.commands.trigger(fault);
    }
}

/// Installs [`MachineHost`] and steps it every `Update`.
#[derive(Default)]
pub struct MachinePlugin;

impl Plugin for MachinePlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(log_block_fault);
        app.insert_non_send_resource(MachineHost::default());
        app.add_systems(Update, step_machines_system);
    }
}
