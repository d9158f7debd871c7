//! Hrimfaxi fluent program builder.
//!
//! Programs are described by chaining fluent calls; every call records a
//! typed node in an append-only [`ChainArena`](chain::ChainArena). The
//! [`Parser`](parser::Parser) walks the finished chain once and compiles
//! it into the nested IR plus an assignment context.
//!
//! # Example
//!
//! ```rust
//! use hrimfaxi_builder::prelude::*;
//! use hrimfaxi_ir::{Register, Scalar};
//!
//! let program = start(
//!     Register::new()
//!         .add_position((0.0, 0.0))
//!         .add_position((0.0, 6.1)),
//! )
//! .rydberg()
//! .rabi()
//! .amplitude()
//! .uniform()
//! .piecewise_linear(
//!     vec![0.1.into(), 3.8.into(), 0.1.into()],
//!     vec![0.0.into(), 15.0.into(), 15.0.into(), 0.0.into()],
//! )
//! .detuning()
//! .uniform()
//! .constant(Scalar::var("delta"), 4.0)
//! .batch_assign("delta", vec![-10.0, 0.0, 10.0])
//! .parse()
//! .unwrap();
//!
//! assert_eq!(program.batch_len(), 3);
//! ```

pub mod chain;
pub mod error;
pub mod fluent;
pub mod parser;

pub use chain::{ChainArena, ChainNode, NodeId, NodeKind};
pub use error::{BuilderError, BuilderResult};
pub use fluent::{
    ChainParts, ChannelAddressable, CouplingAddressable, CouplingBuilder, FieldBuilder,
    LocationBuilder, Parseable, PragmaAttachable, PragmaBuilder, ProgramStart, RabiBuilder,
    ScaledBuilder, SpatialAddressable, UniformBuilder, VarBuilder, WaveformAttachable,
    WaveformBuilder, start,
};
pub use parser::{Parser, Program};

/// One-line import for fluent program construction.
pub mod prelude {
    pub use crate::fluent::{
        ChainParts, ChannelAddressable, CouplingAddressable, Parseable, PragmaAttachable,
        SpatialAddressable, WaveformAttachable, start,
    };
}
