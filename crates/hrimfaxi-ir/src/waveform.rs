//! The waveform algebra.
//!
//! A [`Waveform`] is a symbolic time-function with a structurally defined
//! duration, composed from a small closed set of primitives and
//! combinators. Trees are append-only and immutable; evaluation is defined
//! on `[0, duration]` and zero outside that window.
//!
//! Continuity of appended segments and duration agreement of added
//! operands are deliberately NOT checked at construction time. Checking
//! them requires numeric values, and waveforms are routinely built while
//! still symbolic; the checks happen at hardware lowering instead.

use serde::{Deserialize, Serialize};

use crate::scalar::{Assignments, Interval, Scalar};
use crate::{IrError, IrResult};

/// Interpolation rule used when resampling a waveform on a fixed grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Straight lines between grid samples.
    Linear,
    /// Hold each sample until the next grid point.
    Constant,
}

/// Which edge of a padded waveform the payload is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Payload sits at the start; padding extends the end.
    Left,
    /// Payload sits at the end; padding extends the start.
    Right,
}

/// Value used to pad an aligned waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlignedValue {
    /// Pad with the waveform's value at its left edge.
    LeftEdge,
    /// Pad with the waveform's value at its right edge.
    RightEdge,
    /// Pad with an explicit scalar value.
    Value(Scalar),
}

/// A symbolic time-function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Waveform {
    /// Linear ramp from `start` to `stop` over `duration`.
    Linear {
        /// Value at time 0.
        start: Scalar,
        /// Value at `duration`.
        stop: Scalar,
        /// Length of the ramp.
        duration: Scalar,
    },
    /// Constant value over `duration`.
    Constant {
        /// The held value.
        value: Scalar,
        /// Length of the segment.
        duration: Scalar,
    },
    /// Polynomial in time, `coeffs[i] * t^i`.
    Poly {
        /// Coefficients in ascending power order.
        coeffs: Vec<Scalar>,
        /// Length of the segment.
        duration: Scalar,
    },
    /// Concatenation in time.
    Append {
        /// Segments, earliest first.
        waveforms: Vec<Waveform>,
    },
    /// A time window cut out of another waveform, re-based to start at 0.
    Slice {
        /// The sliced waveform.
        waveform: Box<Waveform>,
        /// The window, in the inner waveform's clock.
        interval: Interval,
    },
    /// Pointwise negation.
    Negative {
        /// The negated waveform.
        waveform: Box<Waveform>,
    },
    /// Pointwise multiplication by a scalar.
    Scale {
        /// The multiplier.
        scalar: Scalar,
        /// The scaled waveform.
        waveform: Box<Waveform>,
    },
    /// Pointwise sum. Operands must share a duration; checked at lowering.
    Add {
        /// Left operand.
        left: Box<Waveform>,
        /// Right operand.
        right: Box<Waveform>,
    },
    /// A waveform padded out to a longer window.
    Aligned {
        /// The payload.
        waveform: Box<Waveform>,
        /// Which edge the payload is aligned to.
        alignment: Alignment,
        /// The padding value.
        value: AlignedValue,
    },
    /// Binds the waveform's terminal value to a named scalar, so later
    /// expressions can reuse a predecessor's end value symbolically.
    Record {
        /// The recorded waveform.
        waveform: Box<Waveform>,
        /// Name the terminal value is bound to.
        name: String,
    },
    /// Resampling of a waveform on a fixed grid with step `dt`.
    Sample {
        /// The resampled waveform.
        waveform: Box<Waveform>,
        /// Interpolation rule between grid points.
        interpolation: Interpolation,
        /// Grid step.
        dt: Scalar,
    },
}

impl Waveform {
    /// Linear ramp.
    pub fn linear(
        start: impl Into<Scalar>,
        stop: impl Into<Scalar>,
        duration: impl Into<Scalar>,
    ) -> Self {
        Waveform::Linear {
            start: start.into(),
            stop: stop.into(),
            duration: duration.into(),
        }
    }

    /// Constant segment.
    pub fn constant(value: impl Into<Scalar>, duration: impl Into<Scalar>) -> Self {
        Waveform::Constant {
            value: value.into(),
            duration: duration.into(),
        }
    }

    /// Polynomial segment with coefficients in ascending power order.
    pub fn poly(coeffs: Vec<Scalar>, duration: impl Into<Scalar>) -> Self {
        Waveform::Poly {
            coeffs,
            duration: duration.into(),
        }
    }

    /// Piecewise-linear waveform: `values` are the breakpoints, `durations`
    /// the ramp lengths between consecutive breakpoints.
    pub fn piecewise_linear(durations: Vec<Scalar>, values: Vec<Scalar>) -> Self {
        let segments = durations
            .into_iter()
            .zip(values.windows(2).map(|pair| (pair[0].clone(), pair[1].clone())))
            .map(|(duration, (start, stop))| Waveform::Linear {
                start,
                stop,
                duration,
            })
            .collect();
        Waveform::Append {
            waveforms: segments,
        }
    }

    /// Piecewise-constant waveform: one held value per duration.
    pub fn piecewise_constant(durations: Vec<Scalar>, values: Vec<Scalar>) -> Self {
        let segments = durations
            .into_iter()
            .zip(values)
            .map(|(duration, value)| Waveform::Constant { value, duration })
            .collect();
        Waveform::Append {
            waveforms: segments,
        }
    }

    /// Concatenate `other` after `self`.
    ///
    /// Flattens nested appends so segment lists stay shallow.
    pub fn append(self, other: Waveform) -> Waveform {
        let mut waveforms = match self {
            Waveform::Append { waveforms } => waveforms,
            head => vec![head],
        };
        match other {
            Waveform::Append {
                waveforms: mut tail,
            } => waveforms.append(&mut tail),
            tail => waveforms.push(tail),
        }
        Waveform::Append { waveforms }
    }

    /// Cut a time window out of this waveform.
    ///
    /// A stop bound preceding the start bound is rejected when both are
    /// literal; symbolic bounds are checked at lowering.
    pub fn slice(
        self,
        start: Option<impl Into<Scalar>>,
        stop: Option<impl Into<Scalar>>,
    ) -> IrResult<Waveform> {
        let start = start.map(Into::into);
        let stop = stop.map(Into::into);
        if let (Some(start_value), Some(stop_value)) = (
            start.as_ref().and_then(Scalar::as_f64),
            stop.as_ref().and_then(Scalar::as_f64),
        ) {
            if stop_value < start_value {
                return Err(IrError::InvalidInterval {
                    start: start_value.to_string(),
                    stop: stop_value.to_string(),
                });
            }
        }
        Ok(Waveform::Slice {
            waveform: Box::new(self),
            interval: Interval::new(start, stop),
        })
    }

    /// Pointwise multiplication by a scalar.
    pub fn scale(self, scalar: impl Into<Scalar>) -> Waveform {
        Waveform::Scale {
            scalar: scalar.into(),
            waveform: Box::new(self),
        }
    }

    /// Pointwise sum with another waveform.
    pub fn add(self, other: Waveform) -> Waveform {
        Waveform::Add {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Pad this waveform to a longer window.
    pub fn align(self, alignment: Alignment, value: AlignedValue) -> Waveform {
        Waveform::Aligned {
            waveform: Box::new(self),
            alignment,
            value,
        }
    }

    /// Bind this waveform's terminal value to `name`.
    pub fn record(self, name: impl Into<String>) -> Waveform {
        Waveform::Record {
            waveform: Box::new(self),
            name: name.into(),
        }
    }

    /// Resample this waveform on a fixed grid with step `dt`.
    pub fn sample(self, dt: impl Into<Scalar>, interpolation: Interpolation) -> Waveform {
        Waveform::Sample {
            waveform: Box::new(self),
            interpolation,
            dt: dt.into(),
        }
    }

    /// Structural duration of the waveform.
    ///
    /// Sum for appends, interval width for slices, pass-through for the
    /// unary wrappers. Never requires evaluating the waveform at a time
    /// point. `Add` reports its left operand's duration; the operands'
    /// agreement is checked at lowering.
    pub fn duration(&self) -> Scalar {
        match self {
            Waveform::Linear { duration, .. }
            | Waveform::Constant { duration, .. }
            | Waveform::Poly { duration, .. } => duration.clone(),
            Waveform::Append { waveforms } => waveforms
                .iter()
                .map(Waveform::duration)
                .fold(Scalar::Literal(0.0), |acc, d| acc + d),
            Waveform::Slice { waveform, interval } => interval.width(&waveform.duration()),
            Waveform::Negative { waveform }
            | Waveform::Scale { waveform, .. }
            | Waveform::Aligned { waveform, .. }
            | Waveform::Record { waveform, .. }
            | Waveform::Sample { waveform, .. } => waveform.duration(),
            Waveform::Add { left, .. } => left.duration(),
        }
    }

    /// Collect every free variable in the tree, scalars included.
    pub fn variables(&self) -> std::collections::HashSet<String> {
        let mut set = std::collections::HashSet::new();
        self.collect_variables(&mut set);
        set
    }

    fn collect_variables(&self, set: &mut std::collections::HashSet<String>) {
        match self {
            Waveform::Linear {
                start,
                stop,
                duration,
            } => {
                set.extend(start.variables());
                set.extend(stop.variables());
                set.extend(duration.variables());
            }
            Waveform::Constant { value, duration } => {
                set.extend(value.variables());
                set.extend(duration.variables());
            }
            Waveform::Poly { coeffs, duration } => {
                for coeff in coeffs {
                    set.extend(coeff.variables());
                }
                set.extend(duration.variables());
            }
            Waveform::Append { waveforms } => {
                for waveform in waveforms {
                    waveform.collect_variables(set);
                }
            }
            Waveform::Slice { waveform, interval } => {
                waveform.collect_variables(set);
                if let Some(start) = &interval.start {
                    set.extend(start.variables());
                }
                if let Some(stop) = &interval.stop {
                    set.extend(stop.variables());
                }
            }
            Waveform::Negative { waveform } | Waveform::Record { waveform, .. } => {
                waveform.collect_variables(set);
            }
            Waveform::Scale { scalar, waveform } => {
                set.extend(scalar.variables());
                waveform.collect_variables(set);
            }
            Waveform::Add { left, right } => {
                left.collect_variables(set);
                right.collect_variables(set);
            }
            Waveform::Aligned {
                waveform, value, ..
            } => {
                waveform.collect_variables(set);
                if let AlignedValue::Value(scalar) = value {
                    set.extend(scalar.variables());
                }
            }
            Waveform::Sample { waveform, dt, .. } => {
                waveform.collect_variables(set);
                set.extend(dt.variables());
            }
        }
    }

    /// Replace bound variables with literals throughout the tree.
    pub fn substitute(&self, assignments: &Assignments) -> Waveform {
        match self {
            Waveform::Linear {
                start,
                stop,
                duration,
            } => Waveform::Linear {
                start: start.substitute(assignments),
                stop: stop.substitute(assignments),
                duration: duration.substitute(assignments),
            },
            Waveform::Constant { value, duration } => Waveform::Constant {
                value: value.substitute(assignments),
                duration: duration.substitute(assignments),
            },
            Waveform::Poly { coeffs, duration } => Waveform::Poly {
                coeffs: coeffs.iter().map(|c| c.substitute(assignments)).collect(),
                duration: duration.substitute(assignments),
            },
            Waveform::Append { waveforms } => Waveform::Append {
                waveforms: waveforms
                    .iter()
                    .map(|w| w.substitute(assignments))
                    .collect(),
            },
            Waveform::Slice { waveform, interval } => Waveform::Slice {
                waveform: Box::new(waveform.substitute(assignments)),
                interval: Interval::new(
                    interval.start.as_ref().map(|s| s.substitute(assignments)),
                    interval.stop.as_ref().map(|s| s.substitute(assignments)),
                ),
            },
            Waveform::Negative { waveform } => Waveform::Negative {
                waveform: Box::new(waveform.substitute(assignments)),
            },
            Waveform::Scale { scalar, waveform } => Waveform::Scale {
                scalar: scalar.substitute(assignments),
                waveform: Box::new(waveform.substitute(assignments)),
            },
            Waveform::Add { left, right } => Waveform::Add {
                left: Box::new(left.substitute(assignments)),
                right: Box::new(right.substitute(assignments)),
            },
            Waveform::Aligned {
                waveform,
                alignment,
                value,
            } => Waveform::Aligned {
                waveform: Box::new(waveform.substitute(assignments)),
                alignment: *alignment,
                value: match value {
                    AlignedValue::Value(scalar) => {
                        AlignedValue::Value(scalar.substitute(assignments))
                    }
                    other => other.clone(),
                },
            },
            Waveform::Record { waveform, name } => Waveform::Record {
                waveform: Box::new(waveform.substitute(assignments)),
                name: name.clone(),
            },
            Waveform::Sample {
                waveform,
                interpolation,
                dt,
            } => Waveform::Sample {
                waveform: Box::new(waveform.substitute(assignments)),
                interpolation: *interpolation,
                dt: dt.substitute(assignments),
            },
        }
    }

    /// Evaluate the waveform at a clock time.
    ///
    /// This is the callable contract consumed by the emulator: defined on
    /// `[0, duration]` (endpoint inclusive), zero outside.
    pub fn at(&self, clock: f64, assignments: &Assignments) -> IrResult<f64> {
        let duration = self.duration().evaluate(assignments)?;
        if clock < 0.0 || clock > duration {
            return Ok(0.0);
        }
        match self {
            Waveform::Linear { start, stop, .. } => {
                let start = start.evaluate(assignments)?;
                let stop = stop.evaluate(assignments)?;
                if duration == 0.0 {
                    return Ok(start);
                }
                Ok(start + (stop - start) * clock / duration)
            }
            Waveform::Constant { value, .. } => value.evaluate(assignments),
            Waveform::Poly { coeffs, .. } => {
                let mut value = 0.0;
                for coeff in coeffs.iter().rev() {
                    value = value * clock + coeff.evaluate(assignments)?;
                }
                Ok(value)
            }
            Waveform::Append { waveforms } => {
                let mut offset = 0.0;
                for waveform in waveforms {
                    let segment = waveform.duration().evaluate(assignments)?;
                    if clock <= offset + segment {
                        return waveform.at(clock - offset, assignments);
                    }
                    offset += segment;
                }
                Ok(0.0)
            }
            Waveform::Slice { waveform, interval } => {
                let start = match &interval.start {
                    Some(scalar) => scalar.evaluate(assignments)?,
                    None => 0.0,
                };
                waveform.at(clock + start, assignments)
            }
            Waveform::Negative { waveform } => Ok(-waveform.at(clock, assignments)?),
            Waveform::Scale { scalar, waveform } => {
                Ok(scalar.evaluate(assignments)? * waveform.at(clock, assignments)?)
            }
            Waveform::Add { left, right } => {
                Ok(left.at(clock, assignments)? + right.at(clock, assignments)?)
            }
            Waveform::Aligned { waveform, .. } | Waveform::Record { waveform, .. } => {
                waveform.at(clock, assignments)
            }
            Waveform::Sample {
                waveform,
                interpolation,
                dt,
            } => {
                let dt = dt.evaluate(assignments)?;
                let index = (clock / dt).floor();
                let left_time = index * dt;
                let left = waveform.at(left_time, assignments)?;
                match interpolation {
                    Interpolation::Constant => Ok(left),
                    Interpolation::Linear => {
                        let right_time = (left_time + dt).min(duration);
                        if right_time <= left_time {
                            return Ok(left);
                        }
                        let right = waveform.at(right_time, assignments)?;
                        Ok(left + (right - left) * (clock - left_time) / (right_time - left_time))
                    }
                }
            }
        }
    }

    /// Sample this waveform on a fixed grid: times at multiples of `dt`
    /// plus the terminal time, and the waveform's values there.
    pub fn resampled(
        &self,
        dt: &Scalar,
        assignments: &Assignments,
    ) -> IrResult<(Vec<f64>, Vec<f64>)> {
        let duration = self.duration().evaluate(assignments)?;
        let dt = dt.evaluate(assignments)?;
        if dt <= 0.0 {
            return Err(IrError::NonPositiveSampleStep(dt));
        }
        let mut times = vec![];
        let mut time = 0.0;
        while time < duration {
            times.push(time);
            time += dt;
        }
        times.push(duration);
        let values = times
            .iter()
            .map(|t| self.at(*t, assignments))
            .collect::<IrResult<Vec<_>>>()?;
        Ok((times, values))
    }
}

impl std::ops::Neg for Waveform {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Waveform::Negative {
            waveform: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::AssignedValue;

    fn no_bindings() -> Assignments {
        Assignments::default()
    }

    #[test]
    fn test_append_duration_is_sum() {
        let w = Waveform::linear(0.0, 1.0, 0.5).append(Waveform::constant(1.0, 1.5));
        assert_eq!(w.duration().simplify().as_f64(), Some(2.0));
    }

    #[test]
    fn test_slice_duration_is_interval_width() {
        let w = Waveform::linear(0.0, 1.0, 2.0)
            .slice(Some(0.5), Some(1.5))
            .unwrap();
        assert_eq!(w.duration().simplify().as_f64(), Some(1.0));
    }

    #[test]
    fn test_slice_reversed_interval_rejected() {
        let err = Waveform::linear(0.0, 1.0, 2.0)
            .slice(Some(1.5), Some(0.5))
            .unwrap_err();
        assert!(matches!(err, IrError::InvalidInterval { .. }));
    }

    #[test]
    fn test_symbolic_duration_without_evaluation() {
        let w = Waveform::linear(0.0, 1.0, Scalar::var("t1"))
            .append(Waveform::constant(1.0, Scalar::var("t2")));
        let duration = w.duration();
        assert!(duration.is_symbolic());
        let mut assignments = no_bindings();
        assignments.insert("t1".into(), AssignedValue::Number(0.25));
        assignments.insert("t2".into(), AssignedValue::Number(0.75));
        assert!((duration.evaluate(&assignments).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_evaluation() {
        let w = Waveform::linear(1.0, 3.0, 2.0);
        let a = no_bindings();
        assert!((w.at(0.0, &a).unwrap() - 1.0).abs() < 1e-12);
        assert!((w.at(1.0, &a).unwrap() - 2.0).abs() < 1e-12);
        assert!((w.at(2.0, &a).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_outside_window() {
        let w = Waveform::constant(5.0, 1.0);
        let a = no_bindings();
        assert_eq!(w.at(-0.1, &a).unwrap(), 0.0);
        assert_eq!(w.at(1.1, &a).unwrap(), 0.0);
        assert!((w.at(1.0, &a).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_append_evaluation_uses_segment_clock() {
        let w = Waveform::linear(0.0, 1.0, 1.0).append(Waveform::linear(1.0, 0.0, 1.0));
        let a = no_bindings();
        assert!((w.at(0.5, &a).unwrap() - 0.5).abs() < 1e-12);
        assert!((w.at(1.5, &a).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_slice_shifts_clock() {
        let w = Waveform::linear(0.0, 2.0, 2.0)
            .slice(Some(1.0), Some(2.0))
            .unwrap();
        let a = no_bindings();
        assert!((w.at(0.0, &a).unwrap() - 1.0).abs() < 1e-12);
        assert!((w.at(1.0, &a).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_and_negative() {
        let w = Waveform::constant(2.0, 1.0).scale(3.0);
        let a = no_bindings();
        assert!((w.at(0.5, &a).unwrap() - 6.0).abs() < 1e-12);
        let w = -Waveform::constant(2.0, 1.0);
        assert!((w.at(0.5, &a).unwrap() + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_poly_horner() {
        // 1 + 2t + 3t^2 at t = 2 -> 17
        let w = Waveform::poly(
            vec![
                Scalar::literal(1.0),
                Scalar::literal(2.0),
                Scalar::literal(3.0),
            ],
            4.0,
        );
        assert!((w.at(2.0, &no_bindings()).unwrap() - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_piecewise_linear_constructor() {
        let w = Waveform::piecewise_linear(
            vec![Scalar::literal(0.1), Scalar::literal(3.8)],
            vec![
                Scalar::literal(0.0),
                Scalar::literal(15.0),
                Scalar::literal(15.0),
            ],
        );
        assert_eq!(w.duration().simplify().as_f64(), Some(3.9));
        let a = no_bindings();
        assert!((w.at(0.1, &a).unwrap() - 15.0).abs() < 1e-12);
        assert!((w.at(2.0, &a).unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_is_transparent_for_evaluation() {
        let w = Waveform::linear(0.0, 1.0, 1.0).record("ramp_end");
        assert!((w.at(1.0, &no_bindings()).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(w.duration().simplify().as_f64(), Some(1.0));
    }

    #[test]
    fn test_align_preserves_payload() {
        let w = Waveform::linear(0.0, 1.0, 1.0)
            .align(Alignment::Left, AlignedValue::RightEdge);
        assert_eq!(w.duration().simplify().as_f64(), Some(1.0));
        assert!((w.at(0.5, &no_bindings()).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sample_grid() {
        let w = Waveform::linear(0.0, 1.0, 1.0);
        let (times, values) = w
            .resampled(&Scalar::literal(0.4), &no_bindings())
            .unwrap();
        assert_eq!(times.len(), 4); // 0.0, 0.4, 0.8, 1.0
        assert!((times[3] - 1.0).abs() < 1e-12);
        assert!((values[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_round_trip_preserves_structure() {
        let w = Waveform::linear(0.0, Scalar::var("peak"), 0.5)
            .append(Waveform::constant(Scalar::var("peak"), 1.0))
            .slice(Some(0.25), Some(1.25))
            .unwrap();
        let json = serde_json::to_string(&w).unwrap();
        let back: Waveform = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
    }

    #[test]
    fn test_substitute_into_tree() {
        let w = Waveform::linear(0.0, Scalar::var("peak"), 1.0);
        let mut assignments = no_bindings();
        assignments.insert("peak".into(), AssignedValue::Number(2.5));
        let bound = w.substitute(&assignments);
        assert!(bound.variables().is_empty());
        assert!((bound.at(1.0, &no_bindings()).unwrap() - 2.5).abs() < 1e-12);
    }
}
