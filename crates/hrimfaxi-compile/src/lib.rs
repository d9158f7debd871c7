//! Hrimfaxi compilation pipeline.
//!
//! Takes a parsed [`Program`](hrimfaxi_builder::Program) through
//! assignment, lattice parallelization, and hardware schedule lowering:
//!
//! ```text
//!   Program ──→ AssignmentContext ──→ (per batch row)
//!                                        ├─→ record scan
//!                                        ├─→ tiling (if parallelized)
//!                                        └─→ SchemaCodeGen ──→ CompiledTask
//! ```
//!
//! The pipeline is pure and synchronous: compiling never blocks, never
//! shares mutable state between invocations, and surfaces exactly one
//! terminal error per attempt.
//!
//! # Example
//!
//! ```rust
//! use hrimfaxi_builder::prelude::*;
//! use hrimfaxi_compile::compile;
//! use hrimfaxi_ir::Register;
//!
//! let program = start(Register::new().add_position((0.0, 0.0)))
//!     .rydberg()
//!     .rabi()
//!     .amplitude()
//!     .uniform()
//!     .linear(0.0, 15.0, 0.1)
//!     .linear(15.0, 0.0, 0.1)
//!     .parse()
//!     .unwrap();
//!
//! let tasks = compile(&program, 100, None).unwrap();
//! assert_eq!(tasks.len(), 1);
//! assert_eq!(tasks[0].specification.shot_count, 100);
//! ```

pub mod assign;
pub mod codegen;
pub mod error;
pub mod tiling;

use tracing::{info, instrument};

use hrimfaxi_builder::Program;

pub use assign::{AssignmentContext, BoundProgram, bind_args, materialize, scan_records};
pub use codegen::{
    CompiledTask, PiecewiseConstantCodeGen, PiecewiseLinearCodeGen, SchemaCodeGen,
};
pub use error::{CompileError, CompileResult};
pub use tiling::{DeviceBounds, TiledLattice, tile};

/// Compile a program into one hardware task per batch row.
///
/// `bounds` is required when the program was parallelized and ignored
/// otherwise. Each row's bindings are resolved independently; the rows
/// are row-aligned, never a Cartesian product.
#[instrument(skip(program, bounds))]
pub fn compile(
    program: &Program,
    shot_count: u32,
    bounds: Option<&DeviceBounds>,
) -> CompileResult<Vec<CompiledTask>> {
    let context = AssignmentContext::from_program(program)?;
    info!(
        rows = context.row_count(),
        sites = program.register.base().n_sites(),
        "compiling program"
    );

    context
        .rows()
        .into_iter()
        .map(|assignments| SchemaCodeGen::new(assignments, bounds).emit(shot_count, program))
        .collect()
}

/// Compile a flattened program, binding `args` positionally by the
/// program's flatten order before lowering each batch row.
#[instrument(skip(program, bounds, args))]
pub fn compile_with_args(
    program: &Program,
    shot_count: u32,
    bounds: Option<&DeviceBounds>,
    args: &[f64],
) -> CompileResult<Vec<CompiledTask>> {
    let bound = bind_args(program, args)?;
    let context = AssignmentContext::from_program(program)?;

    context
        .rows()
        .into_iter()
        .map(|mut assignments| {
            assignments.extend(bound.iter().map(|(k, v)| (k.clone(), v.clone())));
            SchemaCodeGen::new(assignments, bounds).emit(shot_count, program)
        })
        .collect()
}
