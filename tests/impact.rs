//! The impact collaborator is attached after assembly and detached once.

use cogwork::{Catalog, EngineConfig, ImpactSubsystem, Machine, PlacedBlock};
use mockall::{mock, predicate::function};
use rstest::rstest;

mock! {
    Impact {}

    impl ImpactSubsystem for Impact {
        fn attach(&mut self, blocks: &[PlacedBlock]);
        fn detach(&mut self);
    }
}

fn blocks() -> Vec<PlacedBlock> {
    vec![
        PlacedBlock::new("s", "seat"),
        PlacedBlock::new("m", "magnet"),
    ]
}

#[rstest]
fn collaborator_sees_every_placed_block_and_is_detached_once() {
    let mut impact = MockImpact::new();
    impact
        .expect_attach()
        .with(function(|blocks: &[PlacedBlock]| blocks.len() == 2))
        .times(1)
        .return_const(());
    impact.expect_detach().times(1).return_const(());

    let mut machine = Machine::assemble_with_impact(
        &blocks(),
        Catalog::standard(),
        &EngineConfig::default(),
        Some(Box::new(impact)),
    )
    .expect("assembly should succeed");
    machine.step();
    machine.teardown();
    machine.teardown();
    drop(machine);
}

#[rstest]
fn collaborator_is_not_attached_when_assembly_fails() {
    let mut impact = MockImpact::new();
    impact.expect_attach().never();
    impact.expect_detach().never();

    let broken = [PlacedBlock::new("n", "not").connect("in", "ghost", "out")];
    let result = Machine::assemble_with_impact(
        &broken,
        Catalog::standard(),
        &EngineConfig::default(),
        Some(Box::new(impact)),
    );
    assert!(result.is_err());
}
