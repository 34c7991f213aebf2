//! Fault containment: a faulting unit disables itself and only itself.

use anyhow::{ensure, Result};
use cogwork::{FaultReason, LogicFault, PlacedBlock, Value};
use rstest::rstest;
use test_utils::{assemble, bool_at, number_at, try_assemble};

#[rstest]
fn misconfigured_clamp_faults_on_first_tick() -> Result<()> {
    let blocks = [
        PlacedBlock::new("c", "clamp")
            .with_config("min", 10.0)
            .with_config("max", 0.0),
        PlacedBlock::new("n", "not"),
    ];
    let mut machine = assemble(&blocks);
    ensure!(machine.drain_faults().is_empty(), "no fault before ticking");
    machine.step();
    let faults = machine.drain_faults();
    ensure!(faults.len() == 1, "exactly one fault, got {faults:?}");
    let fault = faults.first().expect("one fault");
    ensure!(fault.block.0 == "c", "clamp faulted");
    ensure!(fault.tick == 1, "fault raised on the first tick");
    ensure!(
        matches!(fault.reason, FaultReason::Logic(LogicFault::InvalidConfig(_))),
        "reason is the invalid bounds"
    );
    let clamp = machine.unit(&"c".into()).expect("clamp unit");
    ensure!(!clamp.is_enabled(), "clamp disabled");
    ensure!(machine.unit(&"n".into()).is_some_and(|u| u.is_enabled()), "neighbour keeps running");
    machine.step();
    ensure!(machine.drain_faults().is_empty(), "fault emitted once");
    Ok(())
}

#[rstest]
#[case::zero_thrust_limit(PlacedBlock::new("bad", "thruster").with_config("max", 0.0))]
#[case::thruster_ramp(PlacedBlock::new("bad", "thruster").with_config("ramp", -0.5))]
#[case::motor_ramp(PlacedBlock::new("bad", "motor").with_config("ramp", 2.0))]
#[case::zero_tick_timer(PlacedBlock::new("bad", "timer").with_config("ticks", 0))]
#[case::oversized_register(PlacedBlock::new("bad", "register").with_config("len", 4_000_000_000_u32))]
fn out_of_range_config_faults_only_its_block(#[case] bad: PlacedBlock) -> Result<()> {
    let blocks = [PlacedBlock::new("n", "not"), bad];
    let mut machine = try_assemble(&blocks)?;
    ensure!(machine.drain_faults().is_empty(), "assembly succeeds without faults");
    machine.step();
    let faults = machine.drain_faults();
    ensure!(faults.len() == 1, "exactly one fault, got {faults:?}");
    ensure!(
        faults.first().is_some_and(|f| f.block.0 == "bad"
            && f.tick == 1
            && matches!(f.reason, FaultReason::Logic(LogicFault::InvalidConfig(_)))),
        "misconfigured block faults on its first tick, got {faults:?}"
    );
    ensure!(
        machine.unit(&"bad".into()).is_some_and(|u| !u.is_enabled()),
        "misconfigured block disabled"
    );
    ensure!(bool_at(&machine, "n", "out") == Some(true), "neighbour keeps running");
    Ok(())
}

#[rstest]
fn oversized_register_never_allocates_its_buffer() {
    let machine = assemble(&[PlacedBlock::new("r", "register").with_config("len", 1_u32 << 31)]);
    assert_eq!(machine.value(&"r".into(), "data"), Some(&Value::Bytes(Vec::new())));
    assert_eq!(machine.value(&"r".into(), "write"), Some(&Value::Bytes(Vec::new())));
}

#[rstest]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn non_finite_inputs_disable_only_their_unit(#[case] bad: f64) -> Result<()> {
    let blocks = [
        PlacedBlock::new("m", "motor"),
        PlacedBlock::new("p", "probe").connect("in", "m", "speed"),
        PlacedBlock::new("n", "not"),
    ];
    let mut machine = assemble(&blocks);
    machine.set_input(&"m".into(), "throttle", bad);
    let faults = machine.drain_faults();
    ensure!(faults.len() == 1, "one fault expected");
    ensure!(
        faults.first().map(|f| &f.reason)
            == Some(&FaultReason::NonFinite {
                port: "throttle".to_owned()
            }),
        "fault names the throttle port"
    );
    machine.step();
    ensure!(number_at(&machine, "p", "out") == Some(0.0), "probe never saw the bad value");
    ensure!(bool_at(&machine, "n", "out") == Some(true), "other units unaffected");
    ensure!(machine.value(&"m".into(), "speed").is_none(), "faulted cells are destroyed");
    Ok(())
}

#[rstest]
fn faulted_unit_ignores_further_writes() {
    let mut machine = assemble(&[PlacedBlock::new("m", "motor")]);
    machine.set_input(&"m".into(), "throttle", f64::NAN);
    assert!(!machine.set_input(&"m".into(), "throttle", 0.5));
    machine.step();
    assert_eq!(machine.drain_faults().len(), 1);
}

#[rstest]
fn teardown_is_idempotent_and_releases_every_subscription() {
    let blocks = [
        PlacedBlock::new("a", "not"),
        PlacedBlock::new("b", "not").connect("in", "a", "out"),
        PlacedBlock::new("t", "timer"),
        PlacedBlock::new("p", "probe").connect("in", "b", "out"),
    ];
    let mut machine = assemble(&blocks);
    assert!(machine.cells().live_subscriptions() > 0);
    machine.teardown();
    machine.teardown();
    assert_eq!(machine.cells().live_subscriptions(), 0);
    assert!(!machine.is_enabled());
    assert!(machine.units().all(|u| !u.is_enabled()));
    assert!(!machine.set_input(&"a".into(), "in", true));
    assert_eq!(machine.value(&"p".into(), "out"), None::<&Value>);
}
