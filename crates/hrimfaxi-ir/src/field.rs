//! Fields: spatial modulations paired with waveforms.
//!
//! A [`Field`] describes one drive quantity over the whole register. It is
//! a sum of drives, each pairing a [`SpatialModulation`] (which sites, at
//! what weight) with a [`Waveform`] (what time-function). A site's
//! effective drive is the weighted sum over every drive that covers it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scalar::{Assignments, Scalar};
use crate::waveform::Waveform;

/// How a waveform's magnitude is distributed across register sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpatialModulation {
    /// Every site, weight 1.
    Uniform,
    /// Explicit per-site weights; unlisted sites weigh 0.
    ScaledLocations(BTreeMap<usize, Scalar>),
    /// A named variable bound at assignment time to one weight per site.
    RunTimeVector(String),
}

impl SpatialModulation {
    /// Explicit per-site weights from (site index, weight) pairs.
    pub fn scaled_locations(
        entries: impl IntoIterator<Item = (usize, Scalar)>,
    ) -> Self {
        SpatialModulation::ScaledLocations(entries.into_iter().collect())
    }

    /// A run-time weight vector bound to `name`.
    pub fn run_time_vector(name: impl Into<String>) -> Self {
        SpatialModulation::RunTimeVector(name.into())
    }
}

/// One drive quantity over the register: a sum of modulated waveforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// The drives being summed. Modulations are unique within a field.
    drives: Vec<(SpatialModulation, Waveform)>,
}

impl Field {
    /// An empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// A field with a single drive.
    pub fn from_drive(modulation: SpatialModulation, waveform: Waveform) -> Self {
        Self {
            drives: vec![(modulation, waveform)],
        }
    }

    /// The drives in insertion order.
    pub fn drives(&self) -> &[(SpatialModulation, Waveform)] {
        &self.drives
    }

    /// Number of drives.
    pub fn len(&self) -> usize {
        self.drives.len()
    }

    /// Whether the field has no drives.
    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    /// Look up the waveform driven with a given modulation.
    pub fn get(&self, modulation: &SpatialModulation) -> Option<&Waveform> {
        self.drives
            .iter()
            .find(|(m, _)| m == modulation)
            .map(|(_, w)| w)
    }

    /// Merge another field into this one.
    ///
    /// Drives with a modulation already present have their waveforms
    /// appended in time — chained drives extend, they never overwrite.
    pub fn add(mut self, other: Field) -> Field {
        for (modulation, waveform) in other.drives {
            match self.drives.iter_mut().find(|(m, _)| *m == modulation) {
                Some((_, existing)) => {
                    let appended = std::mem::replace(
                        existing,
                        Waveform::Append { waveforms: vec![] },
                    )
                    .append(waveform);
                    *existing = appended;
                }
                None => self.drives.push((modulation, waveform)),
            }
        }
        self
    }

    /// The field's duration: the longest drive.
    pub fn duration(&self) -> Scalar {
        self.drives
            .iter()
            .map(|(_, w)| w.duration())
            .fold(Scalar::Literal(0.0), |acc, d| acc.max(d))
    }

    /// Replace bound variables with literals in every drive.
    pub fn substitute(&self, assignments: &Assignments) -> Field {
        Field {
            drives: self
                .drives
                .iter()
                .map(|(m, w)| {
                    let modulation = match m {
                        SpatialModulation::ScaledLocations(scales) => {
                            SpatialModulation::ScaledLocations(
                                scales
                                    .iter()
                                    .map(|(site, scale)| (*site, scale.substitute(assignments)))
                                    .collect(),
                            )
                        }
                        other => other.clone(),
                    };
                    (modulation, w.substitute(assignments))
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_disjoint_modulations() {
        let a = Field::from_drive(SpatialModulation::Uniform, Waveform::constant(1.0, 1.0));
        let b = Field::from_drive(
            SpatialModulation::run_time_vector("mask"),
            Waveform::constant(2.0, 1.0),
        );
        let merged = a.add(b);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_add_same_modulation_appends_in_time() {
        let a = Field::from_drive(SpatialModulation::Uniform, Waveform::linear(0.0, 1.0, 0.5));
        let b = Field::from_drive(SpatialModulation::Uniform, Waveform::linear(1.0, 1.0, 0.5));
        let merged = a.add(b);
        assert_eq!(merged.len(), 1);
        let waveform = merged.get(&SpatialModulation::Uniform).unwrap();
        assert_eq!(waveform.duration().simplify().as_f64(), Some(1.0));
        assert!(matches!(waveform, Waveform::Append { waveforms } if waveforms.len() == 2));
    }

    #[test]
    fn test_scaled_locations_equality_is_structural() {
        let a = SpatialModulation::scaled_locations([(0, Scalar::literal(1.0))]);
        let b = SpatialModulation::scaled_locations([(0, Scalar::literal(1.0))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_field_duration_is_longest_drive() {
        let field = Field::from_drive(SpatialModulation::Uniform, Waveform::constant(1.0, 0.5))
            .add(Field::from_drive(
                SpatialModulation::run_time_vector("mask"),
                Waveform::constant(1.0, 2.0),
            ));
        assert_eq!(field.duration().simplify().as_f64(), Some(2.0));
    }
}
