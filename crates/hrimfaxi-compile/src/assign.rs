//! The assignment engine.
//!
//! Resolves a program's static and batched bindings into concrete
//! per-row binding environments, and resolves `record` nodes by scanning
//! the sequence for recorded terminal values. Substitution itself is
//! tolerant of missing variables — the unbound-variable error surfaces
//! only when a number is finally demanded, so partially bound programs
//! remain legal intermediates.

use tracing::debug;

use hrimfaxi_builder::Program;
use hrimfaxi_ir::{AssignedValue, Assignments, RegisterExpr, Sequence, Waveform};

use crate::error::{CompileError, CompileResult};

/// Static and batched bindings extracted from a program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentContext {
    /// Bindings applied to every row.
    pub static_params: Assignments,
    /// Row-aligned batch bindings.
    pub batch_params: Vec<(String, Vec<f64>)>,
}

impl AssignmentContext {
    /// Build a context, validating batch row alignment.
    pub fn new(
        static_params: Assignments,
        batch_params: Vec<(String, Vec<f64>)>,
    ) -> CompileResult<Self> {
        if let Some((_, first_values)) = batch_params.first() {
            let expected = first_values.len();
            for (name, values) in &batch_params[1..] {
                if values.len() != expected {
                    return Err(CompileError::BatchLengthMismatch {
                        name: name.clone(),
                        expected,
                        got: values.len(),
                    });
                }
            }
        }
        Ok(Self {
            static_params,
            batch_params,
        })
    }

    /// Extract the context recorded by the parser.
    pub fn from_program(program: &Program) -> CompileResult<Self> {
        Self::new(program.static_params.clone(), program.batch_params.clone())
    }

    /// Number of rows the batch expands to: the batch length, or 1 when
    /// nothing is batched.
    pub fn row_count(&self) -> usize {
        self.batch_params
            .first()
            .map_or(1, |(_, values)| values.len())
    }

    /// The binding environments, one per row.
    ///
    /// Row `i` binds every batched variable to its `i`-th value on top of
    /// the static bindings — a zip across variables, never a Cartesian
    /// product.
    pub fn rows(&self) -> Vec<Assignments> {
        (0..self.row_count())
            .map(|row| {
                let mut assignments = self.static_params.clone();
                for (name, values) in &self.batch_params {
                    assignments.insert(name.clone(), AssignedValue::Number(values[row]));
                }
                assignments
            })
            .collect()
    }
}

/// Bind submission-time positional arguments by the program's flatten
/// order.
///
/// The argument count must match the declared order exactly; flattening
/// exists to remove positional ambiguity, not to tolerate it.
pub fn bind_args(program: &Program, args: &[f64]) -> CompileResult<Assignments> {
    if args.len() != program.flatten_order.len() {
        return Err(CompileError::ArgCountMismatch {
            expected: program.flatten_order.len(),
            got: args.len(),
        });
    }
    Ok(program
        .flatten_order
        .iter()
        .zip(args)
        .map(|(name, value)| (name.clone(), AssignedValue::Number(*value)))
        .collect())
}

/// Resolve `record` bindings: every recorded waveform's terminal value is
/// evaluated under the current bindings and added to the environment.
///
/// Traversal follows construction order, so a record is resolved before
/// any later waveform that references its name.
pub fn scan_records(sequence: &Sequence, assignments: &mut Assignments) -> CompileResult<()> {
    for pulse in sequence.pulses.values() {
        for field in pulse.fields.values() {
            for (_, waveform) in field.drives() {
                scan_waveform(waveform, assignments)?;
            }
        }
    }
    Ok(())
}

fn scan_waveform(waveform: &Waveform, assignments: &mut Assignments) -> CompileResult<()> {
    match waveform {
        Waveform::Linear { .. } | Waveform::Constant { .. } | Waveform::Poly { .. } => Ok(()),
        Waveform::Append { waveforms } => {
            for waveform in waveforms {
                scan_waveform(waveform, assignments)?;
            }
            Ok(())
        }
        Waveform::Slice { waveform, .. }
        | Waveform::Negative { waveform }
        | Waveform::Scale { waveform, .. }
        | Waveform::Aligned { waveform, .. }
        | Waveform::Sample { waveform, .. } => scan_waveform(waveform, assignments),
        Waveform::Add { left, right } => {
            scan_waveform(left, assignments)?;
            scan_waveform(right, assignments)?;
            Ok(())
        }
        Waveform::Record {
            waveform: inner,
            name,
        } => {
            scan_waveform(inner, assignments)?;
            let duration = inner.duration().evaluate(assignments)?;
            let value = inner.at(duration, assignments)?;
            debug!(name, value, "resolved recorded terminal value");
            assignments.insert(name.clone(), AssignedValue::Number(value));
            Ok(())
        }
    }
}

/// One fully bound program instance.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundProgram {
    /// Register with bound positions.
    pub register: RegisterExpr,
    /// Sequence with bound scalars.
    pub sequence: Sequence,
    /// The binding environment, record values included.
    pub assignments: Assignments,
}

/// Expand a program into one bound instance per batch row.
pub fn materialize(program: &Program) -> CompileResult<Vec<BoundProgram>> {
    let context = AssignmentContext::from_program(program)?;
    let rows = context.rows();
    debug!(rows = rows.len(), "materializing batch");

    rows.into_iter()
        .map(|mut assignments| {
            scan_records(&program.sequence, &mut assignments)?;
            let register = match &program.register {
                RegisterExpr::Atoms(register) => {
                    RegisterExpr::Atoms(register.substitute(&assignments))
                }
                RegisterExpr::Parallel(parallel) => {
                    let mut parallel = parallel.clone();
                    parallel.register = parallel.register.substitute(&assignments);
                    RegisterExpr::Parallel(parallel)
                }
            };
            Ok(BoundProgram {
                register,
                sequence: program.sequence.substitute(&assignments),
                assignments,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrimfaxi_ir::{Field, FieldChannel, LevelCoupling, Scalar, SpatialModulation};

    fn context(batch: Vec<(&str, Vec<f64>)>) -> CompileResult<AssignmentContext> {
        AssignmentContext::new(
            Assignments::default(),
            batch
                .into_iter()
                .map(|(name, values)| (name.to_string(), values))
                .collect(),
        )
    }

    #[test]
    fn test_rows_are_zipped_not_crossed() {
        let context = context(vec![("x", vec![1.0, 2.0]), ("y", vec![10.0, 20.0])]).unwrap();
        let rows = context.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["x"], AssignedValue::Number(1.0));
        assert_eq!(rows[0]["y"], AssignedValue::Number(10.0));
        assert_eq!(rows[1]["x"], AssignedValue::Number(2.0));
        assert_eq!(rows[1]["y"], AssignedValue::Number(20.0));
    }

    #[test]
    fn test_unbatched_context_has_one_row() {
        let context = context(vec![]).unwrap();
        assert_eq!(context.rows().len(), 1);
    }

    #[test]
    fn test_mismatched_batch_lengths_rejected() {
        let err = context(vec![("x", vec![1.0, 2.0]), ("y", vec![10.0])]).unwrap_err();
        assert!(matches!(
            err,
            CompileError::BatchLengthMismatch {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_record_scan_binds_terminal_value() {
        let mut sequence = Sequence::new();
        sequence.pulse_mut(LevelCoupling::Rydberg).add_field(
            FieldChannel::Detuning,
            Field::from_drive(
                SpatialModulation::Uniform,
                Waveform::linear(0.0, 7.5, 1.0).record("ramp_end"),
            ),
        );

        let mut assignments = Assignments::default();
        scan_records(&sequence, &mut assignments).unwrap();
        assert_eq!(assignments["ramp_end"], AssignedValue::Number(7.5));
    }

    #[test]
    fn test_record_scan_sees_earlier_records() {
        // The second segment's value references the first record.
        let waveform = Waveform::linear(0.0, 3.0, 1.0)
            .record("first")
            .append(Waveform::constant(Scalar::var("first"), 1.0).record("second"));

        let mut sequence = Sequence::new();
        sequence.pulse_mut(LevelCoupling::Rydberg).add_field(
            FieldChannel::Detuning,
            Field::from_drive(SpatialModulation::Uniform, waveform),
        );

        let mut assignments = Assignments::default();
        scan_records(&sequence, &mut assignments).unwrap();
        assert_eq!(assignments["second"], AssignedValue::Number(3.0));
    }
}
