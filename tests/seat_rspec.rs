//! Behaviour-driven tests for seats, occupancy and the pilot body clamp.

#[path = "support/rspec_runner.rs"]
mod rspec_runner;
#[path = "support/thread_safe_machine.rs"]
mod thread_safe_machine;

use std::fmt;

use approx::relative_eq;
use cogwork::{EngineConfig, PlacedBlock};
use glam::Vec3;
use rspec_runner::run_serial;
use test_utils::assemble;
use thread_safe_machine::{lock_machine, share, SharedMachine};

#[derive(Clone)]
struct Cockpit {
    machine: SharedMachine,
}

impl fmt::Debug for Cockpit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let machine = lock_machine(&self.machine);
        f.debug_struct("Cockpit")
            .field("tick", &machine.tick_count())
            .field("occupied", &machine.occupied_by_local_player())
            .finish()
    }
}

impl Default for Cockpit {
    fn default() -> Self {
        let blocks = [
            PlacedBlock::new("pilot", "seat"),
            PlacedBlock::new("passenger", "seat"),
            PlacedBlock::new("horn", "key_button").with_config("key", 72),
        ];
        Self {
            machine: share(assemble(&blocks)),
        }
    }
}

impl Cockpit {
    fn occupy(&self, seat: &str, occupied: bool) {
        let mut machine = lock_machine(&self.machine);
        assert!(machine.set_seat_occupied(&seat.into(), occupied));
    }

    fn step(&self) {
        lock_machine(&self.machine).step();
    }

    fn push_pilot(&self, linear: Vec3, angular: Vec3) {
        let mut machine = lock_machine(&self.machine);
        let body = machine.pilot_body_mut().expect("pilot seat is live");
        body.linear = linear;
        body.angular = angular;
    }

    fn assert_occupied(&self, expected: bool) {
        let machine = lock_machine(&self.machine);
        assert_eq!(machine.occupied_by_local_player(), expected);
        assert!(machine.units().all(|u| u.controls_enabled() == expected));
    }

    fn assert_pilot_speed(&self, linear: f32, angular: f32) {
        let machine = lock_machine(&self.machine);
        let body = machine.pilot_body().expect("pilot seat is live");
        assert!(
            relative_eq!(body.linear.length(), linear, epsilon = 1e-3),
            "linear speed {} != {linear}",
            body.linear.length()
        );
        assert!(
            relative_eq!(body.angular.length(), angular, epsilon = 1e-3),
            "angular speed {} != {angular}",
            body.angular.length()
        );
    }
}

#[test]
fn occupancy_enables_controls() {
    run_serial(&rspec::given("a machine with two seats", Cockpit::default(), |ctx| {
        ctx.then("nobody is aboard", |cockpit| cockpit.assert_occupied(false));

        ctx.when("the passenger seat is occupied", |ctx| {
            ctx.before_each(|cockpit| cockpit.occupy("passenger", true));
            ctx.then("every unit has controls enabled", |cockpit| {
                cockpit.assert_occupied(true);
            });

            ctx.when("the passenger leaves", |ctx| {
                ctx.before_each(|cockpit| {
                    cockpit.occupy("passenger", false);
                    cockpit.step();
                });
                ctx.then("controls are disabled again", |cockpit| {
                    cockpit.assert_occupied(false);
                });
            });
        });
    }));
}

#[test]
fn pilot_body_is_clamped_each_frame() {
    let limits = EngineConfig::default();
    let (max_linear, max_angular) = (limits.max_linear_velocity, limits.max_angular_velocity);
    run_serial(&rspec::given("a piloted machine", Cockpit::default(), move |ctx| {
        ctx.before_each(|cockpit| cockpit.occupy("pilot", true));

        ctx.when("physics reports excessive velocities", |ctx| {
            ctx.before_each(|cockpit| {
                cockpit.push_pilot(Vec3::new(0.0, 1.0e4, 0.0), Vec3::new(1.0e3, 0.0, 0.0));
                cockpit.step();
            });
            ctx.then("both speeds are held at the configured limits", move |cockpit| {
                cockpit.assert_pilot_speed(max_linear, max_angular);
            });
        });

        ctx.when("physics reports modest velocities", |ctx| {
            ctx.before_each(|cockpit| {
                cockpit.push_pilot(Vec3::new(3.0, 4.0, 0.0), Vec3::ZERO);
                cockpit.step();
            });
            ctx.then("they pass through unchanged", |cockpit| {
                cockpit.assert_pilot_speed(5.0, 0.0);
            });
        });
    }));
}
