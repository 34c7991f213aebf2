//! Block logic simulation engine.
//!
//! Player-built machines are made of blocks wired together through typed
//! ports. This crate builds one behaviour unit per placed block, wires their
//! reactive cells, resolves a deterministic execution order once and then
//! ticks every unit each simulation frame, containing numeric faults to the
//! block that produced them.
pub mod catalog;
pub mod cell;
pub mod config;
pub mod constants;
pub mod fault;
pub mod impact;
pub mod logging;
pub mod machine;
pub mod numeric;
pub mod placement;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod unit;
pub mod value;
pub mod vector_math;
pub use constants::*;

pub use catalog::{Catalog, Factory};
pub use cell::{CellGraph, CellId};
pub use config::{ConfigError, EngineConfig};
pub use fault::{FaultEffect, FaultReason};
pub use impact::ImpactSubsystem;
pub use logging::init as init_logging;
pub use machine::{AssemblyError, BodyState, Machine};
pub use placement::{parse_placements, BlockId, PlacedBlock};
pub use plugin::{BlockFaulted, MachineHandle, MachineHost, MachinePlugin};
pub use registry::{PortSchema, ValueKind};
pub use resolver::ExecutionOrder;
pub use unit::{BlockLogic, BlockUnit, BuildError, LogicFault, TickCtx, UnitBuilder, UnitId};
pub use value::{Color, KeyCode, Value, ValueType};

pub mod prelude {
    //! Prelude exports used in documentation examples.
    //!
    //! ```rust
    //! use cogwork::prelude::*;
    //!
    //! let blocks = [
    //!     PlacedBlock::new("src", "constant").with_config("value", 4.0),
    //!     PlacedBlock::new("view", "probe").connect("in", "src", "value"),
    //! ];
    //! let mut machine = Machine::assemble(&blocks, Catalog::standard(), &EngineConfig::default())
    //!     .expect("placement is valid");
    //! machine.step();
    //! assert_eq!(machine.value(&"view".into(), "out"), Some(&Value::Number(4.0)));
    //! ```

    pub use crate::catalog::Catalog;
    pub use crate::config::EngineConfig;
    pub use crate::machine::Machine;
    pub use crate::placement::PlacedBlock;
    pub use crate::value::Value;
}
