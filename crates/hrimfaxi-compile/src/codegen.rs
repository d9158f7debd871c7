//! Hardware schedule lowering.
//!
//! Discretizes each channel's waveform expression into piecewise
//! time-value tables, validates channel composition rules, and emits the
//! SI-unit [`TaskSpecification`]. Unit conversion happens here and only
//! here; everything upstream works in program units (µs, MHz, µm).

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use hrimfaxi_builder::Program;
use hrimfaxi_ir::{
    AssignedValue, Assignments, Field, FieldChannel, IrError, LevelCoupling, RegisterExpr,
    Sequence, SpatialModulation, Waveform,
};
use hrimfaxi_task::{
    Channel, EffectiveHamiltonian, GlobalField, Lattice, LocalField, ParallelDecoder,
    TaskSpecification,
};

use crate::assign::scan_records;
use crate::error::{CompileError, CompileResult};
use crate::tiling::{DeviceBounds, tile};

/// Absolute tolerance for continuity checks at segment junctions.
pub const CONTINUITY_TOLERANCE: f64 = 1e-9;

const TIME_TO_SI: f64 = 1e-6;
const ENERGY_TO_SI: f64 = 1e6;
const POSITION_TO_SI: f64 = 1e-6;

fn to_si_times(times: Vec<f64>) -> Vec<f64> {
    times.into_iter().map(|t| t * TIME_TO_SI).collect()
}

fn to_si_energy(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().map(|v| v * ENERGY_TO_SI).collect()
}

/// Value of a piecewise-linear table at `t`.
fn linear_value_at(times: &[f64], values: &[f64], t: f64) -> f64 {
    if times.len() < 2 {
        return values.first().copied().unwrap_or(0.0);
    }
    let index = match times.partition_point(|x| *x <= t) {
        0 => 0,
        i => (i - 1).min(times.len() - 2),
    };
    let (t0, t1) = (times[index], times[index + 1]);
    let (v0, v1) = (values[index], values[index + 1]);
    if t1 == t0 {
        return v1;
    }
    v0 + (v1 - v0) * (t - t0) / (t1 - t0)
}

/// Value of a piecewise-constant table at `t`: hold from the left.
fn hold_value_at(times: &[f64], values: &[f64], t: f64) -> f64 {
    let index = match times.partition_point(|x| *x <= t) {
        0 => 0,
        i => i - 1,
    };
    values[index.min(values.len() - 1)]
}

/// Cut `[start, stop]` out of a table and re-base time to 0, resampling
/// the cut points with the given interpolation rule.
fn slice_table(
    times: &[f64],
    values: &[f64],
    start: f64,
    stop: f64,
    value_at: fn(&[f64], &[f64], f64) -> f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut new_times = vec![start];
    let mut new_values = vec![value_at(times, values, start)];
    for (t, v) in times.iter().zip(values) {
        if *t > start && *t < stop {
            new_times.push(*t);
            new_values.push(*v);
        }
    }
    new_times.push(stop);
    new_values.push(value_at(times, values, stop));

    (
        new_times.into_iter().map(|t| t - start).collect(),
        new_values,
    )
}

/// Pointwise sum of two tables over the union of their breakpoints.
fn add_tables(
    (left_times, left_values): (Vec<f64>, Vec<f64>),
    (right_times, right_values): (Vec<f64>, Vec<f64>),
    value_at: fn(&[f64], &[f64], f64) -> f64,
) -> CompileResult<(Vec<f64>, Vec<f64>)> {
    let left_end = left_times.last().copied().unwrap_or(0.0);
    let right_end = right_times.last().copied().unwrap_or(0.0);
    if (left_end - right_end).abs() > CONTINUITY_TOLERANCE {
        return Err(CompileError::AddDurationMismatch {
            left: left_end,
            right: right_end,
        });
    }

    let mut merged: Vec<f64> = left_times.iter().chain(&right_times).copied().collect();
    merged.sort_by(f64::total_cmp);
    merged.dedup_by(|a, b| (*a - *b).abs() < CONTINUITY_TOLERANCE);

    let values = merged
        .iter()
        .map(|t| {
            value_at(&left_times, &left_values, *t) + value_at(&right_times, &right_values, *t)
        })
        .collect();
    Ok((merged, values))
}

fn evaluate_slice_bounds(
    waveform: &Waveform,
    interval: &hrimfaxi_ir::Interval,
    assignments: &Assignments,
) -> CompileResult<(f64, f64)> {
    let duration = waveform.duration().evaluate(assignments)?;
    let start = match &interval.start {
        Some(scalar) => scalar.evaluate(assignments)?,
        None => 0.0,
    };
    let stop = match &interval.stop {
        Some(scalar) => scalar.evaluate(assignments)?,
        None => duration,
    };
    if start < 0.0 || stop > duration || stop < start {
        return Err(CompileError::SliceOutOfBounds {
            start,
            stop,
            duration,
        });
    }
    Ok((start, stop))
}

/// Lowers a waveform to a piecewise-linear `(times, values)` table.
pub struct PiecewiseLinearCodeGen<'a> {
    assignments: &'a Assignments,
}

impl<'a> PiecewiseLinearCodeGen<'a> {
    /// A lowering pass under the given bindings.
    pub fn new(assignments: &'a Assignments) -> Self {
        Self { assignments }
    }

    /// Lower a waveform tree.
    pub fn visit(&self, waveform: &Waveform) -> CompileResult<(Vec<f64>, Vec<f64>)> {
        match waveform {
            Waveform::Linear {
                start,
                stop,
                duration,
            } => {
                let duration = duration.evaluate(self.assignments)?;
                Ok((
                    vec![0.0, duration],
                    vec![
                        start.evaluate(self.assignments)?,
                        stop.evaluate(self.assignments)?,
                    ],
                ))
            }
            Waveform::Constant { value, duration } => {
                let duration = duration.evaluate(self.assignments)?;
                let value = value.evaluate(self.assignments)?;
                Ok((vec![0.0, duration], vec![value, value]))
            }
            Waveform::Poly { coeffs, duration } => {
                let duration = duration.evaluate(self.assignments)?;
                match coeffs.as_slice() {
                    [] => Ok((vec![0.0, duration], vec![0.0, 0.0])),
                    [constant] => {
                        let value = constant.evaluate(self.assignments)?;
                        Ok((vec![0.0, duration], vec![value, value]))
                    }
                    [constant, slope] => {
                        let start = constant.evaluate(self.assignments)?;
                        let stop = start + slope.evaluate(self.assignments)? * duration;
                        Ok((vec![0.0, duration], vec![start, stop]))
                    }
                    coeffs => Err(CompileError::UnsupportedPolynomial {
                        degree: coeffs.len() - 1,
                    }),
                }
            }
            Waveform::Append { waveforms } => {
                let mut times: Vec<f64> = vec![];
                let mut values: Vec<f64> = vec![];
                for segment in waveforms {
                    let (seg_times, seg_values) = self.visit(segment)?;
                    if times.is_empty() {
                        times = seg_times;
                        values = seg_values;
                        continue;
                    }
                    // Zero-duration segments carry no table rows.
                    if seg_times.last().copied().unwrap_or(0.0) == 0.0 {
                        continue;
                    }
                    let end_value = values.last().copied().unwrap_or(0.0);
                    let start_value = seg_values.first().copied().unwrap_or(0.0);
                    let jump = (end_value - start_value).abs();
                    if jump > CONTINUITY_TOLERANCE {
                        return Err(CompileError::Discontinuity {
                            end_value,
                            start_value,
                            jump,
                        });
                    }
                    let offset = times.last().copied().unwrap_or(0.0);
                    times.extend(seg_times[1..].iter().map(|t| t + offset));
                    values.extend_from_slice(&seg_values[1..]);
                }
                if times.is_empty() {
                    times = vec![0.0, 0.0];
                    values = vec![0.0, 0.0];
                }
                Ok((times, values))
            }
            Waveform::Slice {
                waveform: inner,
                interval,
            } => {
                let (start, stop) = evaluate_slice_bounds(inner, interval, self.assignments)?;
                let (times, values) = self.visit(inner)?;
                Ok(slice_table(&times, &values, start, stop, linear_value_at))
            }
            Waveform::Negative { waveform } => {
                let (times, values) = self.visit(waveform)?;
                Ok((times, values.into_iter().map(|v| -v).collect()))
            }
            Waveform::Scale { scalar, waveform } => {
                let factor = scalar.evaluate(self.assignments)?;
                let (times, values) = self.visit(waveform)?;
                Ok((times, values.into_iter().map(|v| factor * v).collect()))
            }
            Waveform::Add { left, right } => add_tables(
                self.visit(left)?,
                self.visit(right)?,
                linear_value_at,
            ),
            Waveform::Aligned { waveform, .. } | Waveform::Record { waveform, .. } => {
                self.visit(waveform)
            }
            Waveform::Sample { waveform, dt, .. } => {
                let (mut times, mut values) = waveform.resampled(dt, self.assignments)?;
                if times.len() < 2 {
                    times.push(times.last().copied().unwrap_or(0.0));
                    values.push(values.last().copied().unwrap_or(0.0));
                }
                Ok((times, values))
            }
        }
    }
}

/// Lowers a waveform to a piecewise-constant `(times, values)` table.
///
/// Used for channels the hardware drives stepwise, e.g. phase. A true
/// ramp cannot be represented and is rejected.
pub struct PiecewiseConstantCodeGen<'a> {
    assignments: &'a Assignments,
}

impl<'a> PiecewiseConstantCodeGen<'a> {
    /// A lowering pass under the given bindings.
    pub fn new(assignments: &'a Assignments) -> Self {
        Self { assignments }
    }

    /// Lower a waveform tree.
    pub fn visit(&self, waveform: &Waveform) -> CompileResult<(Vec<f64>, Vec<f64>)> {
        match waveform {
            Waveform::Linear {
                start,
                stop,
                duration,
            } => {
                let start = start.evaluate(self.assignments)?;
                let stop = stop.evaluate(self.assignments)?;
                if start != stop {
                    return Err(CompileError::NonConstantRamp { start, stop });
                }
                let duration = duration.evaluate(self.assignments)?;
                Ok((vec![0.0, duration], vec![start, stop]))
            }
            Waveform::Constant { value, duration } => {
                let duration = duration.evaluate(self.assignments)?;
                let value = value.evaluate(self.assignments)?;
                Ok((vec![0.0, duration], vec![value, value]))
            }
            Waveform::Poly { coeffs, duration } => {
                let duration = duration.evaluate(self.assignments)?;
                match coeffs.as_slice() {
                    [] => Ok((vec![0.0, duration], vec![0.0, 0.0])),
                    [constant] => {
                        let value = constant.evaluate(self.assignments)?;
                        Ok((vec![0.0, duration], vec![value, value]))
                    }
                    coeffs => Err(CompileError::UnsupportedPolynomial {
                        degree: coeffs.len() - 1,
                    }),
                }
            }
            Waveform::Append { waveforms } => {
                let mut times: Vec<f64> = vec![];
                let mut values: Vec<f64> = vec![];
                for segment in waveforms {
                    let (seg_times, seg_values) = self.visit(segment)?;
                    if times.is_empty() {
                        times = seg_times;
                        values = seg_values;
                        continue;
                    }
                    if seg_times.last().copied().unwrap_or(0.0) == 0.0 {
                        continue;
                    }
                    // Steps are legal here: the junction takes the value of
                    // the later segment.
                    let offset = times.last().copied().unwrap_or(0.0);
                    if let (Some(last), Some(first)) = (values.last_mut(), seg_values.first()) {
                        *last = *first;
                    }
                    times.extend(seg_times[1..].iter().map(|t| t + offset));
                    values.extend_from_slice(&seg_values[1..]);
                }
                if times.is_empty() {
                    times = vec![0.0, 0.0];
                    values = vec![0.0, 0.0];
                }
                Ok((times, values))
            }
            Waveform::Slice {
                waveform: inner,
                interval,
            } => {
                let (start, stop) = evaluate_slice_bounds(inner, interval, self.assignments)?;
                let (times, values) = self.visit(inner)?;
                Ok(slice_table(&times, &values, start, stop, hold_value_at))
            }
            Waveform::Negative { waveform } => {
                let (times, values) = self.visit(waveform)?;
                Ok((times, values.into_iter().map(|v| -v).collect()))
            }
            Waveform::Scale { scalar, waveform } => {
                let factor = scalar.evaluate(self.assignments)?;
                let (times, values) = self.visit(waveform)?;
                Ok((times, values.into_iter().map(|v| factor * v).collect()))
            }
            Waveform::Add { left, right } => add_tables(
                self.visit(left)?,
                self.visit(right)?,
                hold_value_at,
            ),
            Waveform::Aligned { waveform, .. } | Waveform::Record { waveform, .. } => {
                self.visit(waveform)
            }
            Waveform::Sample { waveform, dt, .. } => {
                let (mut times, mut values) = waveform.resampled(dt, self.assignments)?;
                if times.len() < 2 {
                    times.push(times.last().copied().unwrap_or(0.0));
                    values.push(values.last().copied().unwrap_or(0.0));
                }
                // The last grid cell holds its left value.
                if let [.., previous, last] = values.as_mut_slice() {
                    *last = *previous;
                }
                Ok((times, values))
            }
        }
    }
}

/// A compiled task plus, for tiled registers, its decode mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTask {
    /// The submittable schedule.
    pub specification: TaskSpecification,
    /// Present when the register was parallelized.
    pub decoder: Option<ParallelDecoder>,
}

/// Lowers one bound program to a [`TaskSpecification`].
pub struct SchemaCodeGen<'a> {
    assignments: Assignments,
    bounds: Option<&'a DeviceBounds>,
    decoder: Option<ParallelDecoder>,
    n_sites: usize,
}

impl<'a> SchemaCodeGen<'a> {
    /// A lowering pass under one row's bindings.
    pub fn new(assignments: Assignments, bounds: Option<&'a DeviceBounds>) -> Self {
        Self {
            assignments,
            bounds,
            decoder: None,
            n_sites: 0,
        }
    }

    /// Lower a program.
    #[instrument(skip(self, program))]
    pub fn emit(mut self, shot_count: u32, program: &Program) -> CompileResult<CompiledTask> {
        scan_records(&program.sequence, &mut self.assignments)?;
        let lattice = self.lower_register(&program.register)?;
        let effective_hamiltonian = self.lower_sequence(&program.sequence)?;
        debug!(
            sites = lattice.sites.len(),
            parallel = self.decoder.is_some(),
            "lowered program to task specification"
        );

        Ok(CompiledTask {
            specification: TaskSpecification {
                shot_count,
                lattice,
                effective_hamiltonian,
            },
            decoder: self.decoder,
        })
    }

    fn lower_register(&mut self, register: &RegisterExpr) -> CompileResult<Lattice> {
        match register {
            RegisterExpr::Atoms(register) => {
                let sites = register
                    .sites()
                    .iter()
                    .map(|site| {
                        Ok((
                            site.position.0.evaluate(&self.assignments)? * POSITION_TO_SI,
                            site.position.1.evaluate(&self.assignments)? * POSITION_TO_SI,
                        ))
                    })
                    .collect::<CompileResult<Vec<_>>>()?;
                let filling = register
                    .sites()
                    .iter()
                    .map(|site| site.filling.value())
                    .collect();
                self.n_sites = sites.len();
                Ok(Lattice { sites, filling })
            }
            RegisterExpr::Parallel(parallel) => {
                let bounds = self.bounds.ok_or(CompileError::MissingDeviceBounds)?;
                let tiled = tile(parallel, bounds, &self.assignments)?;
                let sites = tiled
                    .sites
                    .into_iter()
                    .map(|(x, y)| (x * POSITION_TO_SI, y * POSITION_TO_SI))
                    .collect();
                let filling = tiled
                    .filling
                    .into_iter()
                    .map(|filling| filling.value())
                    .collect();
                // Spatial modulations address the base register; the
                // decoder expands their weights onto the tiled lattice.
                self.n_sites = parallel.register.n_sites();
                self.decoder = Some(tiled.decoder);
                Ok(Lattice { sites, filling })
            }
        }
    }

    fn lower_sequence(&self, sequence: &Sequence) -> CompileResult<EffectiveHamiltonian> {
        if sequence.pulses.contains_key(&LevelCoupling::Hyperfine) {
            return Err(CompileError::UnsupportedCoupling(LevelCoupling::Hyperfine));
        }
        let pulse = sequence
            .pulses
            .get(&LevelCoupling::Rydberg)
            .ok_or(CompileError::EmptySequence)?;
        if pulse.fields.is_empty() {
            return Err(CompileError::EmptyPulse);
        }

        let rabi_amplitude = pulse
            .fields
            .get(&FieldChannel::RabiAmplitude)
            .map(|field| self.lower_rabi_amplitude(field))
            .transpose()?;
        let rabi_phase = pulse
            .fields
            .get(&FieldChannel::RabiPhase)
            .map(|field| self.lower_rabi_phase(field))
            .transpose()?;
        let detuning = pulse
            .fields
            .get(&FieldChannel::Detuning)
            .map(|field| self.lower_detuning(field))
            .transpose()?;

        // Missing channels are zero-filled to the longest present one, so
        // a compiled schedule always reports all three.
        let duration = [&rabi_amplitude, &rabi_phase, &detuning]
            .into_iter()
            .flatten()
            .map(Channel::end_time)
            .fold(0.0, f64::max);
        if duration == 0.0 {
            return Err(CompileError::EmptyPulse);
        }

        Ok(EffectiveHamiltonian {
            detuning: detuning.unwrap_or_else(|| Channel::zero(duration)),
            rabi_amplitude: rabi_amplitude.unwrap_or_else(|| Channel::zero(duration)),
            rabi_phase: rabi_phase.unwrap_or_else(|| Channel::zero(duration)),
        })
    }

    fn lower_rabi_amplitude(&self, field: &Field) -> CompileResult<Channel> {
        match field.drives() {
            [(SpatialModulation::Uniform, waveform)] => {
                let (times, values) =
                    PiecewiseLinearCodeGen::new(&self.assignments).visit(waveform)?;
                Ok(Channel {
                    global: GlobalField {
                        times: to_si_times(times),
                        values: to_si_energy(values),
                    },
                    local: None,
                })
            }
            drives => Err(CompileError::UnsupportedComposition {
                channel: FieldChannel::RabiAmplitude,
                reason: format!(
                    "expected a single uniform drive, found {} drive(s)",
                    drives.len()
                ),
            }),
        }
    }

    fn lower_rabi_phase(&self, field: &Field) -> CompileResult<Channel> {
        match field.drives() {
            [(SpatialModulation::Uniform, waveform)] => {
                let (times, values) =
                    PiecewiseConstantCodeGen::new(&self.assignments).visit(waveform)?;
                // Phase is an angle, not an energy: only time converts.
                Ok(Channel {
                    global: GlobalField {
                        times: to_si_times(times),
                        values,
                    },
                    local: None,
                })
            }
            drives => Err(CompileError::UnsupportedComposition {
                channel: FieldChannel::RabiPhase,
                reason: format!(
                    "expected a single uniform drive, found {} drive(s)",
                    drives.len()
                ),
            }),
        }
    }

    fn lower_detuning(&self, field: &Field) -> CompileResult<Channel> {
        let codegen = PiecewiseLinearCodeGen::new(&self.assignments);
        match field.drives() {
            [(SpatialModulation::Uniform, waveform)] => {
                let (times, values) = codegen.visit(waveform)?;
                Ok(Channel {
                    global: GlobalField {
                        times: to_si_times(times),
                        values: to_si_energy(values),
                    },
                    local: None,
                })
            }
            [(modulation, waveform)] => {
                let (times, values) = codegen.visit(waveform)?;
                let site_coefficients = self.site_coefficients(modulation)?;
                let times = to_si_times(times);
                let end = times.last().copied().unwrap_or(0.0);
                Ok(Channel {
                    global: GlobalField {
                        times: vec![0.0, end],
                        values: vec![0.0, 0.0],
                    },
                    local: Some(LocalField {
                        times,
                        values: to_si_energy(values),
                        site_coefficients,
                    }),
                })
            }
            [(first_modulation, first_waveform), (second_modulation, second_waveform)] => {
                let (global_waveform, local_modulation, local_waveform) =
                    match (first_modulation, second_modulation) {
                        (SpatialModulation::Uniform, local) => {
                            (first_waveform, local, second_waveform)
                        }
                        (local, SpatialModulation::Uniform) => {
                            (second_waveform, local, first_waveform)
                        }
                        _ => {
                            return Err(CompileError::UnsupportedComposition {
                                channel: FieldChannel::Detuning,
                                reason: "two local drives without a global drive".to_string(),
                            });
                        }
                    };
                let (global_times, global_values) = codegen.visit(global_waveform)?;
                let (local_times, local_values) = codegen.visit(local_waveform)?;
                let site_coefficients = self.site_coefficients(local_modulation)?;
                Ok(Channel {
                    global: GlobalField {
                        times: to_si_times(global_times),
                        values: to_si_energy(global_values),
                    },
                    local: Some(LocalField {
                        times: to_si_times(local_times),
                        values: to_si_energy(local_values),
                        site_coefficients,
                    }),
                })
            }
            drives => Err(CompileError::UnsupportedComposition {
                channel: FieldChannel::Detuning,
                reason: format!("found {} drives, at most 2 are supported", drives.len()),
            }),
        }
    }

    /// Per-site weights of a local modulation, expanded onto the tiled
    /// lattice when the register was parallelized.
    fn site_coefficients(&self, modulation: &SpatialModulation) -> CompileResult<Vec<f64>> {
        let base = match modulation {
            SpatialModulation::Uniform => {
                return Err(CompileError::UnsupportedComposition {
                    channel: FieldChannel::Detuning,
                    reason: "uniform modulation has no per-site coefficients".to_string(),
                });
            }
            SpatialModulation::ScaledLocations(scales) => {
                for index in scales.keys() {
                    if *index >= self.n_sites {
                        return Err(CompileError::LocationOutOfRange {
                            index: *index,
                            n_sites: self.n_sites,
                        });
                    }
                }
                (0..self.n_sites)
                    .map(|index| match scales.get(&index) {
                        Some(scale) => scale.evaluate(&self.assignments).map_err(Into::into),
                        None => Ok(0.0),
                    })
                    .collect::<CompileResult<Vec<_>>>()?
            }
            SpatialModulation::RunTimeVector(name) => match self.assignments.get(name) {
                Some(AssignedValue::Vector(values)) => {
                    if values.len() != self.n_sites {
                        return Err(CompileError::VectorLengthMismatch {
                            name: name.clone(),
                            expected: self.n_sites,
                            got: values.len(),
                        });
                    }
                    values.clone()
                }
                Some(AssignedValue::Number(_)) => {
                    return Err(CompileError::VectorExpected(name.clone()));
                }
                None => return Err(CompileError::Ir(IrError::UnboundVariable(name.clone()))),
            },
        };

        Ok(match &self.decoder {
            Some(decoder) => decoder
                .mapping
                .iter()
                .map(|info| base[info.local_site_index])
                .collect(),
            None => base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrimfaxi_ir::{Scalar, Waveform};

    fn no_bindings() -> Assignments {
        Assignments::default()
    }

    #[test]
    fn test_constant_lowers_to_two_points() {
        let assignments = no_bindings();
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&Waveform::constant(2.5, 1.5))
            .unwrap();
        assert_eq!(times, vec![0.0, 1.5]);
        assert_eq!(values, vec![2.5, 2.5]);
    }

    #[test]
    fn test_append_concatenates_segments() {
        let assignments = no_bindings();
        let waveform =
            Waveform::linear(0.0, 1.0, 0.5).append(Waveform::linear(1.0, 2.0, 0.25));
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 0.75]);
        assert_eq!(values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_append_discontinuity_is_fatal() {
        let assignments = no_bindings();
        let waveform =
            Waveform::linear(0.0, 1.0, 0.5).append(Waveform::linear(1.001, 2.0, 0.25));
        let err = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap_err();
        match err {
            CompileError::Discontinuity { jump, .. } => assert!((jump - 0.001).abs() < 1e-9),
            other => panic!("expected discontinuity, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_duration_segment_skipped() {
        let assignments = no_bindings();
        let waveform = Waveform::linear(0.0, 1.0, 0.5)
            .append(Waveform::constant(5.0, 0.0))
            .append(Waveform::linear(1.0, 0.0, 0.5));
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert_eq!(values, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_degree_two_polynomial_rejected() {
        let assignments = no_bindings();
        let waveform = Waveform::poly(
            vec![
                Scalar::literal(0.0),
                Scalar::literal(1.0),
                Scalar::literal(2.0),
            ],
            1.0,
        );
        let err = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedPolynomial { degree: 2 }
        ));
    }

    #[test]
    fn test_degree_one_polynomial_is_a_ramp() {
        let assignments = no_bindings();
        let waveform = Waveform::poly(vec![Scalar::literal(1.0), Scalar::literal(2.0)], 2.0);
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 2.0]);
        assert_eq!(values, vec![1.0, 5.0]);
    }

    #[test]
    fn test_slice_rebases_and_interpolates() {
        let assignments = no_bindings();
        let waveform = Waveform::linear(0.0, 2.0, 2.0)
            .slice(Some(0.5), Some(1.5))
            .unwrap();
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 1.0]);
        assert!((values[0] - 0.5).abs() < 1e-12);
        assert!((values[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_slice_keeps_interior_breakpoints() {
        let assignments = no_bindings();
        let waveform = Waveform::linear(0.0, 1.0, 1.0)
            .append(Waveform::linear(1.0, 0.0, 1.0))
            .slice(Some(0.5), Some(1.5))
            .unwrap();
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert!((values[0] - 0.5).abs() < 1e-12);
        assert!((values[1] - 1.0).abs() < 1e-12);
        assert!((values[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_slice_out_of_bounds_rejected() {
        let assignments = no_bindings();
        let waveform = Waveform::linear(0.0, 1.0, 1.0)
            .slice(Some(0.5), Some(1.5))
            .unwrap();
        let err = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap_err();
        assert!(matches!(err, CompileError::SliceOutOfBounds { .. }));
    }

    #[test]
    fn test_add_merges_breakpoints() {
        let assignments = no_bindings();
        let waveform = Waveform::linear(0.0, 1.0, 1.0).add(
            Waveform::constant(1.0, 0.5).append(Waveform::constant(1.0, 0.5)),
        );
        let (times, values) = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert!((values[0] - 1.0).abs() < 1e-12);
        assert!((values[1] - 1.5).abs() < 1e-12);
        assert!((values[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_add_duration_mismatch_rejected() {
        let assignments = no_bindings();
        let waveform = Waveform::constant(1.0, 1.0).add(Waveform::constant(1.0, 2.0));
        let err = PiecewiseLinearCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::AddDurationMismatch {
                left,
                right,
            } if left == 1.0 && right == 2.0
        ));
    }

    #[test]
    fn test_piecewise_constant_accepts_disguised_constant() {
        let assignments = no_bindings();
        let (times, values) = PiecewiseConstantCodeGen::new(&assignments)
            .visit(&Waveform::linear(0.5, 0.5, 1.0))
            .unwrap();
        assert_eq!(times, vec![0.0, 1.0]);
        assert_eq!(values, vec![0.5, 0.5]);
    }

    #[test]
    fn test_piecewise_constant_rejects_true_ramp() {
        let assignments = no_bindings();
        let err = PiecewiseConstantCodeGen::new(&assignments)
            .visit(&Waveform::linear(0.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::NonConstantRamp {
                start,
                stop,
            } if start == 0.0 && stop == 1.0
        ));
    }

    #[test]
    fn test_piecewise_constant_steps_at_junctions() {
        let assignments = no_bindings();
        let waveform = Waveform::constant(1.0, 0.5).append(Waveform::constant(2.0, 0.5));
        let (times, values) = PiecewiseConstantCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert_eq!(values, vec![1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_piecewise_constant_hold_slice() {
        let assignments = no_bindings();
        let waveform = Waveform::constant(1.0, 1.0)
            .append(Waveform::constant(2.0, 1.0))
            .slice(Some(0.5), Some(1.5))
            .unwrap();
        let (times, values) = PiecewiseConstantCodeGen::new(&assignments)
            .visit(&waveform)
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        // Hold from the left at both cut points.
        assert_eq!(values[0], 1.0);
        assert_eq!(values[2], 2.0);
    }
}
