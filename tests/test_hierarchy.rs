use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use thermostasis::simulation::action::ActionConfig;
use thermostasis::simulation::agent::full;
use thermostasis::simulation::environment::{
    Effector, Sample, Sensations, StagedActions, TrueState, WorldProcess,
};
use thermostasis::simulation::hierarchy::{
    CrossRead, Hierarchy, LevelKind, LevelSpec, SetpointSource, TickPhase,
};
use thermostasis::simulation::inference::{Component, ErrorChannel, LevelConfig, Order};
use thermostasis::simulation::noise::{NoiseSpec, Silent};
use thermostasis::simulation::params::{SWIM_DRIVE_WEIGHT, WARMTH_BASE, WARMTH_DRIVE_WEIGHT};
use thermostasis::simulation::Simulation;

const EPSILON: f64 = 1e-12;

fn assert_float_eq(a: f64, b: f64, msg: &str) {
    assert!((a - b).abs() < EPSILON, "{msg}: expected {b}, got {a}");
}

/// A world that always reads the same and remembers every action it was given.
struct FixedReading {
    sample: Sample,
    applied: Vec<StagedActions>,
}

impl FixedReading {
    fn new(value: f64, derivative: f64) -> Self {
        Self {
            sample: Sample::new(value, derivative),
            applied: Vec::new(),
        }
    }
}

impl WorldProcess for FixedReading {
    fn advance(&mut self, tick: usize, applied: &StagedActions) -> TrueState {
        self.applied.push(*applied);
        TrueState {
            tick,
            temperature: self.sample.value,
            temperature_change: self.sample.derivative,
            heat: applied.heat,
            velocity: applied.locomotion,
            ..TrueState::default()
        }
    }

    fn sense(&mut self, _state: &TrueState) -> Sensations {
        Sensations {
            interoceptive: self.sample,
            exteroceptive: self.sample,
            thermal: self.sample,
            proprioceptive: self.sample,
        }
    }
}

fn heated_interoception(setpoint: f64) -> LevelSpec {
    LevelSpec {
        kind: LevelKind::Interoception,
        level: LevelConfig {
            initial: setpoint,
            ..LevelConfig::default()
        },
        setpoint: SetpointSource::Constant { value: setpoint },
        cross_reads: Vec::new(),
        action: Some(ActionConfig::default()),
    }
}

#[test]
fn test_action_reaches_world_one_tick_later() {
    let mut hierarchy =
        Hierarchy::new(&[heated_interoception(30.0)], 0.1, 0.0, Box::new(Silent)).unwrap();
    let mut world = FixedReading::new(30.0, 1.0);

    let reports: Vec<_> = (0..20).map(|_| hierarchy.tick(&mut world)).collect();

    assert_float_eq(world.applied[0].heat, 0.0, "nothing staged before the first tick");
    for t in 0..19 {
        assert_float_eq(
            world.applied[t + 1].heat,
            reports[t].staged.heat,
            &format!("action computed at tick {t}"),
        );
        assert_eq!(reports[t + 1].applied, reports[t].staged);
    }
    // Acting starts once tick * dt exceeds the threshold
    assert!(!reports[0].acting);
    assert!(reports[1].acting);
    assert!(reports[5].staged.heat < 0.0, "a rising temperature is cooled");
}

#[test]
fn test_controllers_hold_before_threshold() {
    let mut hierarchy =
        Hierarchy::new(&[heated_interoception(30.0)], 0.1, 5.0, Box::new(Silent)).unwrap();
    let mut world = FixedReading::new(30.0, 1.0);
    for _ in 0..100 {
        hierarchy.tick(&mut world);
    }

    let heat = hierarchy.actions().get(Effector::Heat);
    assert_eq!(heat.len(), 100, "held values are recorded too");
    for tick in 0..50 {
        assert_float_eq(heat.get(tick).unwrap(), 0.0, "held before acting");
    }
    for tick in 52..100 {
        assert!(heat.get(tick).unwrap() < 0.0, "acting at tick {tick}");
    }
    assert!(hierarchy.actions().get(Effector::Locomotion).is_empty());
}

#[test]
fn test_setpoint_reads_same_tick_belief() {
    let exteroception = LevelSpec {
        kind: LevelKind::Exteroception,
        level: LevelConfig {
            order: Order::Velocity,
            senses_rate: false,
            initial: 28.0,
            ..LevelConfig::default()
        },
        setpoint: SetpointSource::Constant { value: 28.0 },
        cross_reads: Vec::new(),
        action: None,
    };
    let interoception = LevelSpec {
        setpoint: SetpointSource::Level {
            level: LevelKind::Exteroception,
            component: Component::Value,
        },
        action: None,
        ..heated_interoception(30.0)
    };
    // Given in reverse; the hierarchy puts them in pipeline order
    let mut hierarchy = Hierarchy::new(
        &[interoception, exteroception],
        0.1,
        0.0,
        Box::new(Silent),
    )
    .unwrap();
    let mut world = FixedReading::new(30.0, 0.0);

    for _ in 0..50 {
        let report = hierarchy.tick(&mut world);
        assert_eq!(report.outputs[0].0, LevelKind::Exteroception);
        let upstream = report.output(LevelKind::Exteroception).unwrap();
        let reader = report.output(LevelKind::Interoception).unwrap();
        assert_float_eq(reader.setpoint, upstream.belief.mu, "same-tick set-point");
    }
}

#[test]
fn test_cross_read_adds_weighted_upstream_error() {
    let interoception = LevelSpec {
        action: None,
        ..heated_interoception(25.0)
    };
    let warmth = LevelSpec {
        kind: LevelKind::ActiveExteroception,
        level: LevelConfig {
            order: Order::Velocity,
            initial: 18.0,
            ..LevelConfig::default()
        },
        setpoint: SetpointSource::Constant { value: 20.0 },
        cross_reads: vec![CrossRead {
            from: LevelKind::Interoception,
            channel: ErrorChannel::W0,
            weight: 2.0,
        }],
        action: None,
    };
    let mut hierarchy =
        Hierarchy::new(&[interoception, warmth], 0.1, 0.0, Box::new(Silent)).unwrap();
    let mut world = FixedReading::new(22.0, 0.5);

    let mut previous_mu = 18.0;
    for _ in 0..30 {
        let report = hierarchy.tick(&mut world);
        let upstream = report.output(LevelKind::Interoception).unwrap();
        let reader = report.output(LevelKind::ActiveExteroception).unwrap();
        let expected = (22.0 - previous_mu) + 2.0 * upstream.errors.w0.unwrap();
        assert_float_eq(reader.errors.z0, expected, "weighted cross read");
        previous_mu = reader.belief.mu;
    }
}

#[test]
fn test_histories_and_phase_after_ticks() {
    let mut hierarchy =
        Hierarchy::new(&[heated_interoception(30.0)], 0.1, 0.0, Box::new(Silent)).unwrap();
    let mut world = FixedReading::new(31.0, 0.0);
    assert_eq!(hierarchy.phase(), TickPhase::Idle);

    for _ in 0..12 {
        hierarchy.tick(&mut world);
    }

    assert_eq!(hierarchy.phase(), TickPhase::Done);
    assert_eq!(hierarchy.ticks(), 12);
    let history = hierarchy
        .level(LevelKind::Interoception)
        .unwrap()
        .history();
    assert_eq!(history.len(), 12);
    assert_eq!(history.belief(Component::Acceleration).len(), 12);
    for channel in ErrorChannel::ALL {
        assert_eq!(history.error(channel).len(), 12, "{channel}");
    }
    assert!(hierarchy.total_vfe(11).unwrap() >= 0.0);
    assert!(hierarchy.total_vfe(12).is_none());
}

fn velocity_level(kind: LevelKind, initial: f64, cross_reads: Vec<CrossRead>) -> LevelSpec {
    LevelSpec {
        kind,
        level: LevelConfig {
            order: Order::Velocity,
            initial,
            ..LevelConfig::default()
        },
        setpoint: SetpointSource::Constant { value: initial },
        cross_reads,
        action: None,
    }
}

const fn read(from: LevelKind, channel: ErrorChannel, weight: f64) -> CrossRead {
    CrossRead {
        from,
        channel,
        weight,
    }
}

#[test]
fn test_cross_reads_skip_intermediate_levels() {
    let exteroception = velocity_level(LevelKind::Exteroception, 10.0, Vec::new());
    let interoception = LevelSpec {
        action: None,
        ..heated_interoception(25.0)
    };
    let warmth = velocity_level(
        LevelKind::ActiveExteroception,
        18.0,
        vec![read(LevelKind::Exteroception, ErrorChannel::W0, 0.5)],
    );
    // Reads past active exteroception, and past two levels to exteroception
    let swimming = velocity_level(
        LevelKind::Proprioception,
        0.0,
        vec![
            read(LevelKind::Interoception, ErrorChannel::W0, 2.0),
            read(LevelKind::Exteroception, ErrorChannel::Z0, -1.0),
        ],
    );
    let mut hierarchy = Hierarchy::new(
        &[swimming, warmth, interoception, exteroception],
        0.1,
        0.0,
        Box::new(Silent),
    )
    .unwrap();
    assert_eq!(
        hierarchy.kinds().collect::<Vec<_>>(),
        LevelKind::PIPELINE.to_vec()
    );
    let mut world = FixedReading::new(22.0, 0.5);

    let mut previous = [10.0, 25.0, 18.0, 0.0];
    let mut largest_w0: f64 = 0.0;
    for _ in 0..40 {
        let report = hierarchy.tick(&mut world);
        let output = |kind| report.output(kind).unwrap();
        let exteroception = output(LevelKind::Exteroception);
        let interoception = output(LevelKind::Interoception);
        let warmth = output(LevelKind::ActiveExteroception);
        let swimming = output(LevelKind::Proprioception);

        assert_float_eq(exteroception.errors.z0, 22.0 - previous[0], "no reads");
        assert_float_eq(interoception.errors.z0, 22.0 - previous[1], "no reads");
        let expected = (22.0 - previous[2]) + 0.5 * exteroception.errors.w0.unwrap();
        assert_float_eq(warmth.errors.z0, expected, "reads two levels back");
        let expected = (22.0 - previous[3]) + 2.0 * interoception.errors.w0.unwrap()
            - exteroception.errors.z0;
        assert_float_eq(swimming.errors.z0, expected, "reads two and three levels back");

        largest_w0 = largest_w0.max(interoception.errors.w0.unwrap().abs());
        previous = [
            exteroception.belief.mu,
            interoception.belief.mu,
            warmth.belief.mu,
            swimming.belief.mu,
        ];
    }
    assert!(largest_w0 > 0.1, "upstream error stayed trivial: {largest_w0}");
}

#[test]
fn test_full_agent_wiring() {
    let mut config = full();
    config.world.sensor_noise = NoiseSpec::Silent;
    config.action_noise = NoiseSpec::Silent;
    let mut sim = Simulation::new(&config).unwrap();

    let mut warmth_mu = WARMTH_BASE;
    let mut swim_mu = 0.0;
    let mut swam = false;
    for _ in 0..800 {
        let report = sim.step().unwrap();
        let output = |kind| report.output(kind).unwrap();
        let exteroception = output(LevelKind::Exteroception);
        let interoception = output(LevelKind::Interoception);
        let warmth = output(LevelKind::ActiveExteroception);
        let swimming = output(LevelKind::Proprioception);

        assert_float_eq(interoception.setpoint, exteroception.belief.mu, "inferred set-point");
        let expected = (report.state.warmth - warmth_mu)
            + WARMTH_DRIVE_WEIGHT * interoception.errors.w0.unwrap();
        assert_float_eq(warmth.errors.z0, expected, "warmth driven by body dynamics");
        let expected =
            (report.state.velocity - swim_mu) + SWIM_DRIVE_WEIGHT * warmth.errors.z0;
        assert_float_eq(swimming.errors.z0, expected, "swimming driven by felt warmth");

        swam |= report.state.velocity != 0.0;
        warmth_mu = warmth.belief.mu;
        swim_mu = swimming.belief.mu;
    }
    assert!(swam, "locomotion never reached the world");
}

/// Records the `phase` field of every event.
#[derive(Clone, Default)]
struct PhaseLog(Arc<Mutex<Vec<String>>>);

struct PhaseField(Option<String>);

impl Visit for PhaseField {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "phase" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for PhaseLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut field = PhaseField(None);
        event.record(&mut field);
        if let Some(phase) = field.0 {
            self.0.lock().unwrap().push(phase);
        }
    }
}

#[test]
fn test_tick_walks_through_every_phase() {
    let warmth = velocity_level(LevelKind::ActiveExteroception, 20.0, Vec::new());
    let mut hierarchy = Hierarchy::new(
        &[heated_interoception(30.0), warmth],
        0.1,
        0.0,
        Box::new(Silent),
    )
    .unwrap();
    let mut world = FixedReading::new(30.0, 0.0);
    assert_eq!(hierarchy.phase(), TickPhase::Idle);

    let log = PhaseLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    tracing::subscriber::with_default(subscriber, || {
        hierarchy.tick(&mut world);
    });

    let phases = log.0.lock().unwrap().clone();
    assert_eq!(
        phases,
        [
            "Sensing",
            "TopDownSetpoint",
            "LevelUpdate(0)",
            "LevelUpdate(1)",
            "ActionApply",
            "Done",
        ]
    );
    assert_eq!(hierarchy.phase(), TickPhase::Done);
}
