//! Composition of free-energy levels into a single-tick pipeline.
//!
//! Levels run in a fixed order; each one sees only what the levels before it
//! published during the same tick. Actions computed at tick `t` are staged
//! and reach the world at tick `t + 1`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::simulation::action::{ActionConfig, ActionController};
use crate::simulation::environment::{Schedule, StagedActions, TrueState, WorldProcess};
use crate::simulation::error::{ensure_finite, ConfigError};
use crate::simulation::inference::{
    Component, ErrorChannel, FreeEnergyLevel, LevelConfig, LevelOutput,
};
use crate::simulation::memory::ActionHistory;
use crate::simulation::noise::NoiseSource;

/// The four kinds of level, listed in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    /// Infers the desired temperature from an external cue
    Exteroception,
    /// Tracks body temperature and drives heating
    Interoception,
    /// Tracks ambient warmth while moving
    ActiveExteroception,
    /// Tracks own velocity and drives locomotion
    Proprioception,
}

impl LevelKind {
    /// Canonical order in which levels update within a tick.
    pub const PIPELINE: [Self; 4] = [
        Self::Exteroception,
        Self::Interoception,
        Self::ActiveExteroception,
        Self::Proprioception,
    ];

    /// Position in [`Self::PIPELINE`].
    #[must_use]
    pub const fn pipeline_rank(self) -> usize {
        match self {
            Self::Exteroception => 0,
            Self::Interoception => 1,
            Self::ActiveExteroception => 2,
            Self::Proprioception => 3,
        }
    }

    /// Short name for logs and dashboards.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exteroception => "exteroception",
            Self::Interoception => "interoception",
            Self::ActiveExteroception => "active-exteroception",
            Self::Proprioception => "proprioception",
        }
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a level takes its prior set-point from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum SetpointSource {
    /// A fixed value
    Constant {
        /// Set-point
        value: f64,
    },
    /// A piecewise-constant script over simulation time
    Scripted {
        /// Set-point over time
        schedule: Schedule,
    },
    /// A belief component an earlier level published this tick
    Level {
        /// Upstream level
        level: LevelKind,
        /// Component of its updated belief
        component: Component,
    },
}

/// A same-tick read of an earlier level's error, added to the reader's `e_z0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossRead {
    /// Upstream level
    pub from: LevelKind,
    /// Which of its error channels
    pub channel: ErrorChannel,
    /// Multiplier applied to the read
    pub weight: f64,
}

/// Declarative description of one level and its wiring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Which level this is
    pub kind: LevelKind,
    /// Belief and channel configuration
    pub level: LevelConfig,
    /// Prior set-point
    pub setpoint: SetpointSource,
    /// Same-tick error reads from earlier levels
    #[serde(default)]
    pub cross_reads: Vec<CrossRead>,
    /// Optional action controller
    #[serde(default)]
    pub action: Option<ActionConfig>,
}

/// Where the orchestrator is within the current tick.
///
/// [`Hierarchy::tick`] runs a whole tick at once, so callers only observe
/// `Idle` before the first tick and `Done` after each one. Every transition
/// is emitted as a `trace!` event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickPhase {
    /// No tick has run yet
    #[default]
    Idle,
    /// World advancing, readings being taken
    Sensing,
    /// Scheduled set-points being resolved
    TopDownSetpoint,
    /// Level at this pipeline position is updating
    LevelUpdate(usize),
    /// Controllers are computing the next actions
    ActionApply,
    /// Tick finished
    Done,
}

/// Set-point source resolved to pipeline positions.
#[derive(Clone, Debug)]
enum Setpoint {
    Fixed(f64),
    Scripted(Schedule),
    Upstream { index: usize, component: Component },
}

impl Setpoint {
    /// Value known before any level updates, if any.
    fn scheduled(&self, time: f64) -> Option<f64> {
        match self {
            Self::Fixed(value) => Some(*value),
            Self::Scripted(schedule) => Some(schedule.value_at(time)),
            Self::Upstream { .. } => None,
        }
    }

    fn resolve(&self, scheduled: Option<f64>, published: &[LevelOutput]) -> f64 {
        match (scheduled, self) {
            (Some(value), _) => value,
            (None, Self::Upstream { index, component }) => {
                published[*index].belief.component(*component)
            }
            (None, _) => 0.0,
        }
    }
}

/// Cross read resolved to a pipeline position.
#[derive(Clone, Copy, Debug)]
struct Tap {
    index: usize,
    channel: ErrorChannel,
    weight: f64,
}

#[derive(Clone, Debug)]
struct Actuator {
    controller: ActionController,
    config: ActionConfig,
}

struct Node {
    kind: LevelKind,
    level: FreeEnergyLevel,
    setpoint: Setpoint,
    taps: Vec<Tap>,
    actuator: Option<Actuator>,
}

impl Node {
    fn cross_drive(&self, published: &[LevelOutput]) -> f64 {
        self.taps
            .iter()
            .map(|tap| tap.weight * published[tap.index].errors.get(tap.channel).unwrap_or(0.0))
            .sum()
    }
}

/// Everything that happened in one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Tick index
    pub tick: usize,
    /// Ground truth after the world update
    pub state: TrueState,
    /// Actions the world applied this tick (computed the tick before)
    pub applied: StagedActions,
    /// Each level's output, in pipeline order
    pub outputs: Vec<(LevelKind, LevelOutput)>,
    /// Actions staged for the next tick
    pub staged: StagedActions,
    /// Whether controllers were past the acting threshold
    pub acting: bool,
}

impl TickReport {
    /// Output of the level of `kind`, if present.
    #[must_use]
    pub fn output(&self, kind: LevelKind) -> Option<&LevelOutput> {
        self.outputs
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, output)| output)
    }

    /// Summed free energy over all levels.
    #[must_use]
    pub fn total_vfe(&self) -> f64 {
        self.outputs.iter().map(|(_, output)| output.vfe).sum()
    }
}

/// An ordered stack of levels with their action controllers.
pub struct Hierarchy {
    nodes: Vec<Node>,
    dt: f64,
    act_time: f64,
    tick: usize,
    phase: TickPhase,
    staged: StagedActions,
    action_noise: Box<dyn NoiseSource>,
    actions: ActionHistory,
}

impl Hierarchy {
    /// Validates the wiring and builds every level and controller.
    ///
    /// Levels are put into pipeline order regardless of the order given.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for invalid parameters, duplicate levels,
    /// reads from missing or later levels, inactive channels, or two
    /// controllers on the same effector.
    pub fn new(
        specs: &[LevelSpec],
        dt: f64,
        act_time: f64,
        action_noise: Box<dyn NoiseSource>,
    ) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::EmptyHierarchy);
        }
        if !act_time.is_finite() || act_time < 0.0 {
            return Err(ConfigError::InvalidDuration {
                name: "act_time",
                expected: "non-negative",
                value: act_time,
            });
        }

        let mut ordered: Vec<&LevelSpec> = specs.iter().collect();
        ordered.sort_by_key(|spec| spec.kind.pipeline_rank());
        for pair in ordered.windows(2) {
            if pair[0].kind == pair[1].kind {
                return Err(ConfigError::DuplicateLevel(pair[0].kind));
            }
        }
        let kinds: Vec<LevelKind> = ordered.iter().map(|spec| spec.kind).collect();

        let mut nodes: Vec<Node> = Vec::with_capacity(ordered.len());
        let mut driven: Vec<ActionConfig> = Vec::new();
        for (position, spec) in ordered.iter().enumerate() {
            let level = FreeEnergyLevel::new(&spec.level, dt)?;

            let setpoint = match &spec.setpoint {
                SetpointSource::Constant { value } => {
                    Setpoint::Fixed(ensure_finite("setpoint", *value)?)
                }
                SetpointSource::Scripted { schedule } => Setpoint::Scripted(schedule.clone()),
                SetpointSource::Level {
                    level: upstream,
                    component,
                } => {
                    let index = upstream_index(&kinds, position, spec.kind, *upstream)?;
                    if !nodes[index].level.order().tracks(*component) {
                        return Err(ConfigError::UntrackedComponent {
                            level: *upstream,
                            component: *component,
                        });
                    }
                    Setpoint::Upstream {
                        index,
                        component: *component,
                    }
                }
            };

            let mut taps = Vec::with_capacity(spec.cross_reads.len());
            for read in &spec.cross_reads {
                let index = upstream_index(&kinds, position, spec.kind, read.from)?;
                if !nodes[index].level.has_channel(read.channel) {
                    return Err(ConfigError::InactiveChannel {
                        level: read.from,
                        channel: read.channel,
                    });
                }
                taps.push(Tap {
                    index,
                    channel: read.channel,
                    weight: ensure_finite("cross read weight", read.weight)?,
                });
            }

            let actuator = match spec.action {
                Some(config) => {
                    let variance = level.variance(config.channel).ok_or(
                        ConfigError::InactiveChannel {
                            level: spec.kind,
                            channel: config.channel,
                        },
                    )?;
                    if driven.iter().any(|other| other.effector == config.effector) {
                        return Err(ConfigError::DuplicateEffector(config.effector.name()));
                    }
                    driven.push(config);
                    Some(Actuator {
                        controller: ActionController::new(&config, variance, dt)?,
                        config,
                    })
                }
                None => None,
            };

            debug!(
                level = %spec.kind,
                position,
                order = ?spec.level.order,
                setpoint = ?spec.setpoint,
                cross_reads = spec.cross_reads.len(),
                action = ?spec.action.map(|a| a.effector),
                "wired level"
            );

            nodes.push(Node {
                kind: spec.kind,
                level,
                setpoint,
                taps,
                actuator,
            });
        }

        let mut staged = StagedActions::default();
        for config in &driven {
            staged.set(config.effector, config.initial);
        }

        Ok(Self {
            nodes,
            dt,
            act_time,
            tick: 0,
            phase: TickPhase::Idle,
            staged,
            action_noise,
            actions: ActionHistory::default(),
        })
    }

    fn enter(&mut self, phase: TickPhase) {
        trace!(tick = self.tick, ?phase, "tick phase");
        self.phase = phase;
    }

    /// Runs one full tick against `world`.
    pub fn tick<W: WorldProcess + ?Sized>(&mut self, world: &mut W) -> TickReport {
        let tick = self.tick;
        let time = tick as f64 * self.dt;
        let applied = self.staged;

        self.enter(TickPhase::Sensing);
        let state = world.advance(tick, &applied);
        let senses = world.sense(&state);

        self.enter(TickPhase::TopDownSetpoint);
        // Scripts are keyed by whole time units, like world events
        let scheduled: Vec<Option<f64>> = self
            .nodes
            .iter()
            .map(|node| node.setpoint.scheduled(time.floor()))
            .collect();

        let mut published: Vec<LevelOutput> = Vec::with_capacity(self.nodes.len());
        for position in 0..self.nodes.len() {
            self.enter(TickPhase::LevelUpdate(position));
            let node = &mut self.nodes[position];
            let setpoint = node.setpoint.resolve(scheduled[position], &published);
            let cross_drive = node.cross_drive(&published);
            let output = node
                .level
                .step(senses.for_level(node.kind), setpoint, cross_drive);
            trace!(
                tick,
                level = %node.kind,
                mu = output.belief.mu,
                e_z0 = output.errors.z0,
                setpoint,
                vfe = output.vfe,
                "level updated"
            );
            published.push(output);
        }

        self.enter(TickPhase::ActionApply);
        let acting = time > self.act_time;
        let mut staged = self.staged;
        for (position, node) in self.nodes.iter_mut().enumerate() {
            let Some(actuator) = node.actuator.as_mut() else {
                continue;
            };
            let effector = actuator.config.effector;
            let gain = actuator.controller.observe(&state);
            let value = if acting {
                let error = published[position]
                    .errors
                    .get(actuator.config.channel)
                    .unwrap_or(0.0);
                actuator.controller.act(error, self.action_noise.as_mut())
            } else {
                actuator.controller.hold()
            };
            trace!(
                tick,
                effector = effector.name(),
                value,
                gain,
                acting,
                "action staged"
            );
            self.actions.record(effector, value);
            staged.set(effector, value);
        }
        self.staged = staged;

        self.enter(TickPhase::Done);
        self.tick += 1;

        TickReport {
            tick,
            state,
            applied,
            outputs: self
                .nodes
                .iter()
                .map(|node| node.kind)
                .zip(published)
                .collect(),
            staged,
            acting,
        }
    }

    /// The level of `kind`, if configured.
    #[must_use]
    pub fn level(&self, kind: LevelKind) -> Option<&FreeEnergyLevel> {
        self.nodes
            .iter()
            .find(|node| node.kind == kind)
            .map(|node| &node.level)
    }

    /// Configured level kinds in pipeline order.
    pub fn kinds(&self) -> impl Iterator<Item = LevelKind> + '_ {
        self.nodes.iter().map(|node| node.kind)
    }

    /// Levels in pipeline order.
    pub fn levels(&self) -> impl Iterator<Item = (LevelKind, &FreeEnergyLevel)> {
        self.nodes.iter().map(|node| (node.kind, &node.level))
    }

    /// Recorded action values.
    #[must_use]
    pub const fn actions(&self) -> &ActionHistory {
        &self.actions
    }

    /// Actions waiting to be applied at the next tick.
    #[must_use]
    pub const fn staged(&self) -> StagedActions {
        self.staged
    }

    /// Phase the last tick ended in.
    #[must_use]
    pub const fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn ticks(&self) -> usize {
        self.tick
    }

    /// Summed free energy of every level at `tick`.
    #[must_use]
    pub fn total_vfe(&self, tick: usize) -> Option<f64> {
        self.nodes
            .iter()
            .map(|node| node.level.history().vfe().get(tick))
            .sum()
    }
}

/// Pipeline position of `upstream`, which must run before `position`.
fn upstream_index(
    kinds: &[LevelKind],
    position: usize,
    reader: LevelKind,
    upstream: LevelKind,
) -> Result<usize, ConfigError> {
    let index = kinds
        .iter()
        .position(|&kind| kind == upstream)
        .ok_or(ConfigError::MissingLevel { reader, upstream })?;
    if index < position {
        Ok(index)
    } else {
        Err(ConfigError::ForwardReference { reader, upstream })
    }
}
