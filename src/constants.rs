/// Engine-wide defaults shared by the machine container and its leaves.
///
/// `EngineConfig` starts from these values; a config file can override the
/// ones that are exposed there.
pub const MAX_LINEAR_VELOCITY: f32 = 120.0;
pub const MAX_ANGULAR_VELOCITY: f32 = 18.0;
/// Queued cell writes processed per flush before the rest carry over.
pub const PROPAGATION_BUDGET: usize = 4096;
/// Longest byte buffer a byte-array port may declare.
pub const MAX_BYTE_ARRAY_LEN: usize = 4096;
/// Ticks a `delay` block waits when its config omits `ticks`.
pub const DEFAULT_DELAY_TICKS: u32 = 1;
/// Fraction of the remaining distance a motor or thruster closes per tick
/// when its config omits `ramp`.
pub const DEFAULT_RAMP: f64 = 0.25;
/// Peak force produced by a thruster at full throttle.
pub const DEFAULT_MAX_THRUST: f64 = 100.0;
/// Squared distance added to force-field calculations so coincident
/// magnets never divide by zero.
pub const FIELD_DISTANCE_EPSILON: f32 = 0.01;
/// Distance beyond which magnets stop influencing each other.
pub const FIELD_CUTOFF: f32 = 32.0;
