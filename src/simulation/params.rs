//! Simulation hyperparameters.

// === Integration ===
/// Euler integration step in simulation time units
pub const DT: f64 = 0.1;
/// Default simulation horizon in time units
pub const SIM_TIME: f64 = 300.0;
/// Simulation time after which action controllers start acting
pub const ACT_TIME: f64 = 50.0;

// === Inference ===
/// Learning rate for belief updates via VFE gradient descent
pub const LEARNING_RATE: f64 = 0.1;
/// Variance of the sensory value channel (σ_z0)
pub const SENSORY_VARIANCE: f64 = 0.1;
/// Variance of the sensory rate channel (σ_z1)
pub const SENSORY_RATE_VARIANCE: f64 = 0.1;
/// Variance of the value dynamics channel (σ_w0)
pub const DYNAMICS_VARIANCE: f64 = 0.1;
/// Variance of the rate dynamics channel (σ_w1)
pub const DYNAMICS_RATE_VARIANCE: f64 = 0.1;

// === Action ===
/// Learning rate for action updates
pub const ACTION_LEARNING_RATE: f64 = 0.1;
/// Largest heating/cooling rate the agent can produce per time unit
pub const HEAT_BOUND: f64 = 5.8;
/// Largest swimming speed
pub const LOCOMOTION_BOUND: f64 = 2.0;
/// Standard deviation of the multiplicative action perturbation
pub const ACTION_NOISE_STD: f64 = 0.1;

// === World ===
/// Standard deviation of every sensory channel's noise
pub const SENSOR_NOISE_STD: f64 = 0.1;
/// Body temperature at the start of a run
pub const INITIAL_TEMPERATURE: f64 = 30.0;
/// Homeostatic set-point for body temperature
pub const DESIRED_TEMPERATURE: f64 = 30.0;
/// Half-width of the band of viable body temperatures
pub const VIABLE_RANGE: f64 = 10.0;
/// Ambient warmth at position 0
pub const WARMTH_BASE: f64 = 20.0;
/// Warmth gained per unit of position
pub const WARMTH_SLOPE: f64 = 1.0;
/// Fraction of excess ambient warmth conducted into the body per time unit
pub const EXPOSURE: f64 = 0.1;
/// Scripted environmental warming: `(time, rate)` pairs
pub const SHOCK_EVENTS: [(f64, f64); 5] =
    [(50.0, 2.0), (100.0, 5.0), (150.0, -1.0), (200.0, -6.0), (250.0, 0.0)];
/// Scripted luminance changes: dimming starts before the cold snap and ends after it
pub const LUMINANCE_EVENTS: [(f64, f64); 2] = [(175.0, -0.7), (225.0, 0.0)];

// === Exteroception ===
/// How strongly a unit of desired warming shows up in the luminance cue
pub const CUE_GAIN: f64 = 0.1;
/// Desired temperature the cue is centred on
pub const CUE_BASELINE: f64 = 30.0;
/// Variance of the luminance cue channel
pub const CUE_VARIANCE: f64 = 0.01;
/// Variance of the exteroceptive prior (very weak on purpose)
pub const CUE_PRIOR_VARIANCE: f64 = 100_000.0;

// === Scripted set-point (mock exteroception) ===
/// Amount the scripted set-point is raised ahead of the cold snap
pub const RAISED_SETPOINT_OFFSET: f64 = 7.0;
/// First time unit with a raised set-point
pub const RAISED_SETPOINT_FROM: f64 = 120.0;
/// First time unit after the raised window
pub const RAISED_SETPOINT_UNTIL: f64 = 201.0;

// === Active exteroception and proprioception ===
/// Ambient warmth the agent prefers to sit in
pub const COMFORT_WARMTH: f64 = 20.0;
/// Weight of the interoceptive dynamics error in the felt-warmth error
pub const WARMTH_DRIVE_WEIGHT: f64 = 1.0;
/// Weight of the felt-warmth error in the proprioceptive error
pub const SWIM_DRIVE_WEIGHT: f64 = 1.0;

// === Simple thermostat ===
/// Body temperature and set-point of the simple thermostat
pub const SIMPLE_TEMPERATURE: f64 = 36.0;
/// Shock script of the simple thermostat: earlier and closer together
pub const SIMPLE_SHOCK_EVENTS: [(f64, f64); 5] =
    [(10.0, 2.0), (50.0, 5.0), (100.0, -1.0), (150.0, -6.0), (200.0, 0.0)];
/// Time after which the simple thermostat heats
pub const SIMPLE_ACT_TIME: f64 = 25.0;
/// Horizon of the simple thermostat
pub const SIMPLE_SIM_TIME: f64 = 250.0;

// === Dynamical agent ===
/// Warmth at the centre of the spring; it falls off as `peak / (x² + 1)`
pub const SPRING_PEAK: f64 = 100.0;
/// Where the dynamical agent starts
pub const SPRING_START: f64 = 2.0;
/// Body temperature the dynamical agent wants
pub const SPRING_SETPOINT: f64 = 4.0;
/// Learning rate of swimming along the warmth gradient (higher rates chatter)
pub const SWIM_LEARNING_RATE: f64 = 0.01;
/// Time after which the dynamical agent swims
pub const SPRING_ACT_TIME: f64 = 10.0;
/// Horizon of the dynamical agent
pub const SPRING_SIM_TIME: f64 = 100.0;

// === Diagnostics ===
/// Magnitude above which a series is reported as diverging
pub const DIVERGENCE_CEILING: f64 = 1.0e6;
/// Window of the smoothing running mean
pub const SMOOTHING_WINDOW: usize = 10;
