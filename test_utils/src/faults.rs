//! Helpers for observing `BlockFaulted` events in tests.
use bevy::ecs::prelude::On;
use bevy::prelude::*;
use cogwork::BlockFaulted;

/// Fault effects captured during tests, as `(block id, catalog id)`.
#[derive(Resource, Default, Debug)]
pub struct CapturedFaults(pub Vec<(String, String)>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_fault(event: On<BlockFaulted>, mut faults: ResMut<CapturedFaults>) {
    let fault = event.event();
    faults
        .0
        .push((fault.effect.block.0.clone(), fault.effect.catalog_id.clone()));
}

/// Installs the fault-capturing observer and resource on the provided app.
pub fn install_fault_observer(app: &mut App) {
    app.insert_resource(CapturedFaults::default());
    app.world_mut().add_observer(record_fault);
}
