//! Preset agents.
//!
//! Each variant adds one capability to the previous: a thermostat that only
//! feels its body, one told in advance when to want more warmth, one that
//! infers that from a luminance cue, and one that can also swim along the
//! pond's warmth gradient. Two smaller agents sit beside them: a simple
//! thermostat on a faster shock script, and a dynamical agent that can only
//! swim and finds its temperature in the falloff around a warm spring.

use serde::{Deserialize, Serialize};

use crate::simulation::action::{ActionConfig, ActionGain, Perturbation};
use crate::simulation::config::{SimulationConfig, ViabilityBand};
use crate::simulation::environment::{BodyModel, Effector, Schedule, WarmthProfile, WorldConfig};
use crate::simulation::hierarchy::{CrossRead, LevelKind, LevelSpec, SetpointSource};
use crate::simulation::inference::{
    ChannelVariances, Component, ErrorChannel, LevelConfig, Order, SensoryKind,
};
use crate::simulation::noise::NoiseSpec;
use crate::simulation::params::{
    ACTION_LEARNING_RATE, ACTION_NOISE_STD, ACT_TIME, COMFORT_WARMTH, CUE_BASELINE, CUE_GAIN,
    CUE_PRIOR_VARIANCE, CUE_VARIANCE, DESIRED_TEMPERATURE, DT, HEAT_BOUND, INITIAL_TEMPERATURE,
    LEARNING_RATE, LOCOMOTION_BOUND, RAISED_SETPOINT_FROM, RAISED_SETPOINT_OFFSET,
    RAISED_SETPOINT_UNTIL, SENSOR_NOISE_STD, SIMPLE_ACT_TIME, SIMPLE_SHOCK_EVENTS,
    SIMPLE_SIM_TIME, SIMPLE_TEMPERATURE, SIM_TIME, SPRING_ACT_TIME, SPRING_PEAK, SPRING_SETPOINT,
    SPRING_SIM_TIME, SPRING_START, SWIM_DRIVE_WEIGHT, SWIM_LEARNING_RATE, VIABLE_RANGE,
    WARMTH_BASE, WARMTH_DRIVE_WEIGHT,
};

/// Selectable agent presets.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentVariant {
    /// Interoception only, fixed set-point
    Thermostat,
    /// Interoception with a scripted, temporarily raised set-point
    MockExteroceptive,
    /// Exteroception infers the set-point for interoception
    Exteroceptive,
    /// All four levels: heating and swimming
    #[default]
    Full,
    /// Interoception only, on a shorter and earlier shock script
    SimpleThermostat,
    /// Swims up an inverse-square spring until its body is at 4
    Dynamical,
    /// Single level relaxing onto a still pond at 4
    ScenarioA,
    /// Heating against a constant shock it cannot fully cancel
    ScenarioB,
}

impl AgentVariant {
    /// All presets.
    pub const ALL: [Self; 8] = [
        Self::Thermostat,
        Self::MockExteroceptive,
        Self::Exteroceptive,
        Self::Full,
        Self::SimpleThermostat,
        Self::Dynamical,
        Self::ScenarioA,
        Self::ScenarioB,
    ];

    /// Short name for logs and titles.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Thermostat => "thermostat",
            Self::MockExteroceptive => "mock-exteroceptive",
            Self::Exteroceptive => "exteroceptive",
            Self::Full => "full",
            Self::SimpleThermostat => "simple-thermostat",
            Self::Dynamical => "dynamical",
            Self::ScenarioA => "scenario-a",
            Self::ScenarioB => "scenario-b",
        }
    }

    /// Builds the configuration of this preset.
    #[must_use]
    pub fn config(self) -> SimulationConfig {
        match self {
            Self::Thermostat => thermostat(),
            Self::MockExteroceptive => mock_exteroceptive(),
            Self::Exteroceptive => exteroceptive(),
            Self::Full => full(),
            Self::SimpleThermostat => simple_thermostat(),
            Self::Dynamical => dynamical(),
            Self::ScenarioA => scenario_a(),
            Self::ScenarioB => scenario_b(10.0),
        }
    }
}

fn shocked_pond(levels: Vec<LevelSpec>) -> SimulationConfig {
    SimulationConfig {
        dt: DT,
        sim_time: SIM_TIME,
        act_time: ACT_TIME,
        seed: 0,
        world: WorldConfig::default(),
        levels,
        action_noise: NoiseSpec::Gaussian {
            std_dev: ACTION_NOISE_STD,
        },
        viability: ViabilityBand::default(),
    }
}

fn heating() -> ActionConfig {
    ActionConfig {
        effector: Effector::Heat,
        channel: ErrorChannel::Z1,
        learning_rate: ACTION_LEARNING_RATE,
        bound: HEAT_BOUND,
        gain: ActionGain::default(),
        initial: 0.0,
        perturbation: Perturbation::Disabled,
    }
}

/// Second-order body-temperature level with heating on its rate error.
#[must_use]
pub fn interoception(setpoint: SetpointSource) -> LevelSpec {
    LevelSpec {
        kind: LevelKind::Interoception,
        level: LevelConfig {
            order: Order::Acceleration,
            sensory: SensoryKind::Direct,
            senses_rate: true,
            variances: ChannelVariances::default(),
            learning_rate: LEARNING_RATE,
            initial: INITIAL_TEMPERATURE,
        },
        setpoint,
        cross_reads: Vec::new(),
        action: Some(heating()),
    }
}

/// Level that reads the luminance cue as evidence about the desired temperature.
#[must_use]
pub fn exteroception() -> LevelSpec {
    LevelSpec {
        kind: LevelKind::Exteroception,
        level: LevelConfig {
            order: Order::Velocity,
            sensory: SensoryKind::Cue {
                gain: CUE_GAIN,
                baseline: CUE_BASELINE,
            },
            senses_rate: false,
            variances: ChannelVariances {
                z0: CUE_VARIANCE,
                w0: CUE_PRIOR_VARIANCE,
                ..ChannelVariances::default()
            },
            learning_rate: LEARNING_RATE,
            initial: CUE_BASELINE,
        },
        setpoint: SetpointSource::Constant {
            value: CUE_BASELINE,
        },
        cross_reads: Vec::new(),
        action: None,
    }
}

/// Felt ambient warmth, pushed by the body's dynamics error.
#[must_use]
pub fn active_exteroception() -> LevelSpec {
    LevelSpec {
        kind: LevelKind::ActiveExteroception,
        level: LevelConfig {
            order: Order::Velocity,
            sensory: SensoryKind::Direct,
            senses_rate: true,
            variances: ChannelVariances::default(),
            learning_rate: LEARNING_RATE,
            initial: WARMTH_BASE,
        },
        setpoint: SetpointSource::Constant {
            value: COMFORT_WARMTH,
        },
        cross_reads: vec![CrossRead {
            from: LevelKind::Interoception,
            channel: ErrorChannel::W0,
            weight: WARMTH_DRIVE_WEIGHT,
        }],
        action: None,
    }
}

/// Own swimming velocity, driving locomotion from the felt-warmth error.
#[must_use]
pub fn proprioception() -> LevelSpec {
    LevelSpec {
        kind: LevelKind::Proprioception,
        level: LevelConfig {
            order: Order::Velocity,
            sensory: SensoryKind::Direct,
            senses_rate: false,
            variances: ChannelVariances::default(),
            learning_rate: LEARNING_RATE,
            initial: 0.0,
        },
        setpoint: SetpointSource::Constant { value: 0.0 },
        cross_reads: vec![CrossRead {
            from: LevelKind::ActiveExteroception,
            channel: ErrorChannel::Z0,
            weight: SWIM_DRIVE_WEIGHT,
        }],
        action: Some(ActionConfig {
            effector: Effector::Locomotion,
            channel: ErrorChannel::Z0,
            bound: LOCOMOTION_BOUND,
            ..heating()
        }),
    }
}

/// Set-point that follows the exteroceptive belief.
const fn inferred_setpoint() -> SetpointSource {
    SetpointSource::Level {
        level: LevelKind::Exteroception,
        component: Component::Value,
    }
}

/// Interoception alone with a fixed set-point.
#[must_use]
pub fn thermostat() -> SimulationConfig {
    shocked_pond(vec![interoception(SetpointSource::Constant {
        value: DESIRED_TEMPERATURE,
    })])
}

/// Interoception whose set-point is raised ahead of the cold snap.
#[must_use]
pub fn mock_exteroceptive() -> SimulationConfig {
    let schedule = Schedule::from_events(
        DESIRED_TEMPERATURE,
        &[
            (
                RAISED_SETPOINT_FROM,
                DESIRED_TEMPERATURE + RAISED_SETPOINT_OFFSET,
            ),
            (RAISED_SETPOINT_UNTIL, DESIRED_TEMPERATURE),
        ],
    );
    shocked_pond(vec![interoception(SetpointSource::Scripted { schedule })])
}

/// Exteroception feeding interoception's set-point.
#[must_use]
pub fn exteroceptive() -> SimulationConfig {
    shocked_pond(vec![exteroception(), interoception(inferred_setpoint())])
}

/// Every level; the agent can heat and swim.
#[must_use]
pub fn full() -> SimulationConfig {
    shocked_pond(vec![
        exteroception(),
        interoception(inferred_setpoint()),
        active_exteroception(),
        proprioception(),
    ])
}

/// Interoception at 36 through a shock script that starts at time 10.
#[must_use]
pub fn simple_thermostat() -> SimulationConfig {
    let mut level = interoception(SetpointSource::Constant {
        value: SIMPLE_TEMPERATURE,
    });
    level.level.initial = 0.0;
    SimulationConfig {
        dt: DT,
        sim_time: SIMPLE_SIM_TIME,
        act_time: SIMPLE_ACT_TIME,
        seed: 0,
        world: WorldConfig {
            shock: Schedule::from_events(0.0, &SIMPLE_SHOCK_EVENTS),
            sensor_noise: NoiseSpec::Gaussian {
                std_dev: SENSOR_NOISE_STD,
            },
            ..WorldConfig::still(SIMPLE_TEMPERATURE)
        },
        levels: vec![level],
        action_noise: NoiseSpec::Silent,
        viability: ViabilityBand::new(SIMPLE_TEMPERATURE, VIABLE_RANGE),
    }
}

/// A body that always has the temperature of the water around it.
///
/// The only way to change temperature is to swim, and how much a stroke
/// changes it depends on where the agent is, so the controller's gain is the
/// local warmth gradient, read from the world every tick.
#[must_use]
pub fn dynamical() -> SimulationConfig {
    let mut level = interoception(SetpointSource::Constant {
        value: SPRING_SETPOINT,
    });
    level.level.initial = 0.0;
    level.action = Some(ActionConfig {
        effector: Effector::Locomotion,
        channel: ErrorChannel::Z1,
        learning_rate: SWIM_LEARNING_RATE,
        bound: LOCOMOTION_BOUND,
        gain: ActionGain::WarmthGradient,
        ..heating()
    });
    SimulationConfig {
        dt: DT,
        sim_time: SPRING_SIM_TIME,
        act_time: SPRING_ACT_TIME,
        seed: 0,
        world: WorldConfig {
            initial_position: SPRING_START,
            warmth: WarmthProfile::InverseSquare { peak: SPRING_PEAK },
            body: BodyModel::Immersed,
            sensor_noise: NoiseSpec::Gaussian {
                std_dev: SENSOR_NOISE_STD,
            },
            ..WorldConfig::still(SPRING_SETPOINT)
        },
        levels: vec![level],
        action_noise: NoiseSpec::Silent,
        viability: ViabilityBand::new(SPRING_SETPOINT, VIABLE_RANGE),
    }
}

/// A still pond at 4 sensed by one second-order level starting from 0.
#[must_use]
pub fn scenario_a() -> SimulationConfig {
    let mut level = interoception(SetpointSource::Constant { value: 4.0 });
    level.level.initial = 0.0;
    level.level.variances = ChannelVariances::uniform(0.1);
    level.action = None;
    SimulationConfig {
        dt: 0.005,
        sim_time: 50.0,
        act_time: 50.0,
        seed: 0,
        world: WorldConfig::still(4.0),
        levels: vec![level],
        action_noise: NoiseSpec::Silent,
        viability: ViabilityBand::new(4.0, VIABLE_RANGE),
    }
}

/// Heating from time 10 against a constant `shock`.
#[must_use]
pub fn scenario_b(shock: f64) -> SimulationConfig {
    let mut level = interoception(SetpointSource::Constant {
        value: INITIAL_TEMPERATURE,
    });
    level.level.variances = ChannelVariances::uniform(0.1);
    SimulationConfig {
        dt: 0.1,
        sim_time: 30.0,
        act_time: 10.0,
        seed: 0,
        world: WorldConfig {
            shock: Schedule::constant(shock),
            ..WorldConfig::still(INITIAL_TEMPERATURE)
        },
        levels: vec![level],
        action_noise: NoiseSpec::Silent,
        viability: ViabilityBand::new(INITIAL_TEMPERATURE, VIABLE_RANGE),
    }
}
