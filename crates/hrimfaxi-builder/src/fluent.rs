//! The fluent construction API.
//!
//! Each builder struct is a typestate over the same (arena, tip) pair:
//! methods append one node and hand back the struct for the states the
//! grammar allows next. The chain itself stays append-only; builders are
//! consumed by value, so an abandoned branch simply leaves dead nodes
//! behind and the parser never sees them.
//!
//! ```rust
//! use hrimfaxi_builder::prelude::*;
//! use hrimfaxi_ir::Register;
//!
//! let program = start(Register::new().add_position((0.0, 0.0)))
//!     .rydberg()
//!     .detuning()
//!     .uniform()
//!     .linear(0.0, 15.0, 0.1)
//!     .constant(15.0, 1.0)
//!     .parse()
//!     .unwrap();
//! assert_eq!(program.sequence.pulses.len(), 1);
//! ```

use hrimfaxi_ir::{AssignedValue, Interpolation, Register, Scalar, Waveform};

use crate::chain::{ChainArena, NodeId, NodeKind};
use crate::error::BuilderResult;
use crate::parser::{Parser, Program};

/// Begin a program on the given register.
pub fn start(register: Register) -> ProgramStart {
    let mut arena = ChainArena::new();
    let tip = arena.push(NodeKind::Register(register), None);
    ProgramStart { arena, tip }
}

/// Access to the underlying (arena, tip) pair.
///
/// Implemented by every builder state; the provided-method traits below
/// use it to append nodes without each state re-implementing the plumbing.
pub trait ChainParts: Sized {
    /// Take the chain out of the builder.
    fn into_parts(self) -> (ChainArena, NodeId);
}

macro_rules! chain_state {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub(crate) arena: ChainArena,
            pub(crate) tip: NodeId,
        }

        impl ChainParts for $name {
            fn into_parts(self) -> (ChainArena, NodeId) {
                (self.arena, self.tip)
            }
        }
    };
}

chain_state!(
    /// A program with a register and nothing else yet.
    ProgramStart
);
chain_state!(
    /// A level coupling has been selected.
    CouplingBuilder
);
chain_state!(
    /// The Rabi drive has been selected; amplitude or phase comes next.
    RabiBuilder
);
chain_state!(
    /// A field channel has been selected; spatial addressing comes next.
    FieldBuilder
);
chain_state!(
    /// One or more sites have been addressed.
    LocationBuilder
);
chain_state!(
    /// The last addressed site has been given a weight.
    ScaledBuilder
);
chain_state!(
    /// All sites addressed uniformly.
    UniformBuilder
);
chain_state!(
    /// Sites addressed through a run-time weight vector.
    VarBuilder
);
chain_state!(
    /// A waveform is being accumulated for the current drive.
    WaveformBuilder
);
chain_state!(
    /// Assignment and parallelization pragmas.
    PragmaBuilder
);

fn push_state(state: impl ChainParts, kind: NodeKind) -> (ChainArena, NodeId) {
    let (mut arena, tip) = state.into_parts();
    let tip = arena.push(kind, Some(tip));
    (arena, tip)
}

/// States that can start or extend a waveform run.
pub trait WaveformAttachable: ChainParts {
    /// Append a linear ramp from `start` to `stop` over `duration`.
    fn linear(
        self,
        start: impl Into<Scalar>,
        stop: impl Into<Scalar>,
        duration: impl Into<Scalar>,
    ) -> WaveformBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Linear {
                start: start.into(),
                stop: stop.into(),
                duration: duration.into(),
            },
        );
        WaveformBuilder { arena, tip }
    }

    /// Append a constant segment.
    fn constant(self, value: impl Into<Scalar>, duration: impl Into<Scalar>) -> WaveformBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Constant {
                value: value.into(),
                duration: duration.into(),
            },
        );
        WaveformBuilder { arena, tip }
    }

    /// Append a polynomial segment, coefficients in ascending power order.
    fn poly(self, coeffs: Vec<Scalar>, duration: impl Into<Scalar>) -> WaveformBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Poly {
                coeffs,
                duration: duration.into(),
            },
        );
        WaveformBuilder { arena, tip }
    }

    /// Append a pre-built waveform expression.
    fn apply(self, waveform: Waveform) -> WaveformBuilder {
        let (arena, tip) = push_state(self, NodeKind::Apply { waveform });
        WaveformBuilder { arena, tip }
    }

    /// Append a piecewise-linear waveform: breakpoints in `values`, ramp
    /// lengths in `durations`.
    fn piecewise_linear(self, durations: Vec<Scalar>, values: Vec<Scalar>) -> WaveformBuilder {
        let (mut arena, mut tip) = self.into_parts();
        for (duration, pair) in durations.into_iter().zip(values.windows(2)) {
            tip = arena.push(
                NodeKind::Linear {
                    start: pair[0].clone(),
                    stop: pair[1].clone(),
                    duration,
                },
                Some(tip),
            );
        }
        WaveformBuilder { arena, tip }
    }

    /// Append a piecewise-constant waveform: one held value per duration.
    fn piecewise_constant(self, durations: Vec<Scalar>, values: Vec<Scalar>) -> WaveformBuilder {
        let (mut arena, mut tip) = self.into_parts();
        for (duration, value) in durations.into_iter().zip(values) {
            tip = arena.push(NodeKind::Constant { value, duration }, Some(tip));
        }
        WaveformBuilder { arena, tip }
    }
}

impl WaveformAttachable for LocationBuilder {}
impl WaveformAttachable for ScaledBuilder {}
impl WaveformAttachable for UniformBuilder {}
impl WaveformAttachable for VarBuilder {}
impl WaveformAttachable for WaveformBuilder {}

/// States that can address sites to begin a new drive.
pub trait SpatialAddressable: ChainParts {
    /// Address every site at weight 1.
    fn uniform(self) -> UniformBuilder {
        let (arena, tip) = push_state(self, NodeKind::Uniform);
        UniformBuilder { arena, tip }
    }

    /// Address one site by index. Chain further `location` calls to
    /// address several.
    fn location(self, index: usize) -> LocationBuilder {
        let (arena, tip) = push_state(self, NodeKind::Location { index });
        LocationBuilder { arena, tip }
    }

    /// Address sites through a run-time weight vector bound to `name` at
    /// assignment time.
    fn var(self, name: impl Into<String>) -> VarBuilder {
        let (arena, tip) = push_state(self, NodeKind::Var { name: name.into() });
        VarBuilder { arena, tip }
    }
}

impl SpatialAddressable for FieldBuilder {}
impl SpatialAddressable for WaveformBuilder {}

/// States that can select a coupling.
pub trait CouplingAddressable: ChainParts {
    /// Drive the ground-Rydberg transition.
    fn rydberg(self) -> CouplingBuilder {
        let (arena, tip) = push_state(self, NodeKind::Rydberg);
        CouplingBuilder { arena, tip }
    }

    /// Drive the hyperfine transition.
    fn hyperfine(self) -> CouplingBuilder {
        let (arena, tip) = push_state(self, NodeKind::Hyperfine);
        CouplingBuilder { arena, tip }
    }
}

impl CouplingAddressable for ProgramStart {}
impl CouplingAddressable for WaveformBuilder {}

/// States that can select a field channel.
pub trait ChannelAddressable: ChainParts {
    /// Drive the detuning channel.
    fn detuning(self) -> FieldBuilder {
        let (arena, tip) = push_state(self, NodeKind::Detuning);
        FieldBuilder { arena, tip }
    }

    /// Drive the Rabi field; choose amplitude or phase next.
    fn rabi(self) -> RabiBuilder {
        let (arena, tip) = self.into_parts();
        // The Rabi drive is a grouping, not a chain node: amplitude() and
        // phase() record the actual channel.
        RabiBuilder { arena, tip }
    }
}

impl ChannelAddressable for CouplingBuilder {}
impl ChannelAddressable for WaveformBuilder {}

impl RabiBuilder {
    /// Drive the real-valued Rabi amplitude.
    pub fn amplitude(self) -> FieldBuilder {
        let (arena, tip) = push_state(self, NodeKind::RabiAmplitude);
        FieldBuilder { arena, tip }
    }

    /// Drive the Rabi phase.
    pub fn phase(self) -> FieldBuilder {
        let (arena, tip) = push_state(self, NodeKind::RabiPhase);
        FieldBuilder { arena, tip }
    }
}

impl LocationBuilder {
    /// Address a further site at weight 1.
    pub fn location(self, index: usize) -> LocationBuilder {
        let (arena, tip) = push_state(self, NodeKind::Location { index });
        LocationBuilder { arena, tip }
    }

    /// Weight the site addressed by the preceding `location` call.
    pub fn scale(self, factor: impl Into<Scalar>) -> ScaledBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Scale {
                factor: factor.into(),
            },
        );
        ScaledBuilder { arena, tip }
    }
}

impl ScaledBuilder {
    /// Address a further site.
    pub fn location(self, index: usize) -> LocationBuilder {
        let (arena, tip) = push_state(self, NodeKind::Location { index });
        LocationBuilder { arena, tip }
    }
}

impl WaveformBuilder {
    /// Cut a time window out of the waveform built so far.
    pub fn slice(
        self,
        start: impl Into<Scalar>,
        stop: impl Into<Scalar>,
    ) -> WaveformBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Slice {
                start: Some(start.into()),
                stop: Some(stop.into()),
            },
        );
        WaveformBuilder { arena, tip }
    }

    /// Cut a window with optional bounds; `None` defaults to the edge.
    pub fn slice_between(
        self,
        start: Option<Scalar>,
        stop: Option<Scalar>,
    ) -> WaveformBuilder {
        let (arena, tip) = push_state(self, NodeKind::Slice { start, stop });
        WaveformBuilder { arena, tip }
    }

    /// Bind the terminal value of the waveform built so far to `name`, for
    /// reuse in later expressions.
    pub fn record(self, name: impl Into<String>) -> WaveformBuilder {
        let (arena, tip) = push_state(self, NodeKind::Record { name: name.into() });
        WaveformBuilder { arena, tip }
    }

    /// Resample the waveform built so far on a fixed grid, interpolating
    /// by the channel default (hold for phase, linear otherwise).
    pub fn sample(self, dt: impl Into<Scalar>) -> WaveformBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Sample {
                dt: dt.into(),
                interpolation: None,
            },
        );
        WaveformBuilder { arena, tip }
    }

    /// Resample with an explicit interpolation rule.
    pub fn sample_with(
        self,
        dt: impl Into<Scalar>,
        interpolation: Interpolation,
    ) -> WaveformBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Sample {
                dt: dt.into(),
                interpolation: Some(interpolation),
            },
        );
        WaveformBuilder { arena, tip }
    }
}

/// States that can attach assignment and parallelization pragmas.
pub trait PragmaAttachable: ChainParts {
    /// Bind a variable to a single value for every compiled program.
    fn assign(self, name: impl Into<String>, value: impl Into<f64>) -> PragmaBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Assign {
                name: name.into(),
                value: AssignedValue::Number(value.into()),
            },
        );
        PragmaBuilder { arena, tip }
    }

    /// Bind a run-time vector variable to one weight per site.
    fn assign_vector(self, name: impl Into<String>, values: Vec<f64>) -> PragmaBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Assign {
                name: name.into(),
                value: AssignedValue::Vector(values),
            },
        );
        PragmaBuilder { arena, tip }
    }

    /// Bind a variable to one value per batch row. Every batched variable
    /// must list the same number of rows; row `i` of each is bound
    /// simultaneously.
    fn batch_assign(self, name: impl Into<String>, values: Vec<f64>) -> PragmaBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::BatchAssign {
                name: name.into(),
                values,
            },
        );
        PragmaBuilder { arena, tip }
    }

    /// Declare the positional order of variables left deliberately
    /// unassigned, for binding at submission time.
    fn flatten(self, order: Vec<String>) -> PragmaBuilder {
        let (arena, tip) = push_state(self, NodeKind::Flatten { order });
        PragmaBuilder { arena, tip }
    }

    /// Replicate the register across a cluster lattice with the given
    /// spacing between cluster bounding boxes.
    fn parallelize(self, cluster_spacing: impl Into<Scalar>) -> PragmaBuilder {
        let (arena, tip) = push_state(
            self,
            NodeKind::Parallelize {
                cluster_spacing: cluster_spacing.into(),
            },
        );
        PragmaBuilder { arena, tip }
    }
}

impl PragmaAttachable for WaveformBuilder {}
impl PragmaAttachable for PragmaBuilder {}

/// States that form a complete program.
pub trait Parseable: ChainParts {
    /// Compile the chain into IR.
    fn parse(self) -> BuilderResult<Program> {
        let (arena, tip) = self.into_parts();
        Parser::new(&arena, tip).parse()
    }
}

impl Parseable for ProgramStart {}
impl Parseable for WaveformBuilder {}
impl Parseable for PragmaBuilder {}
