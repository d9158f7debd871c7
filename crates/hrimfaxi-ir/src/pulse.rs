//! Pulses: the per-channel drive map for one level coupling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::scalar::{Assignments, Scalar};

/// A physically distinct drive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldChannel {
    /// Frequency offset from the driven transition.
    Detuning,
    /// Real-valued Rabi drive amplitude.
    RabiAmplitude,
    /// Rabi drive phase.
    RabiPhase,
}

impl std::fmt::Display for FieldChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldChannel::Detuning => write!(f, "detuning"),
            FieldChannel::RabiAmplitude => write!(f, "rabi_amplitude"),
            FieldChannel::RabiPhase => write!(f, "rabi_phase"),
        }
    }
}

/// The fields driven on one level coupling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    /// Per-channel fields.
    pub fields: BTreeMap<FieldChannel, Field>,
}

impl Pulse {
    /// An empty pulse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a field into a channel, extending any field already there.
    pub fn add_field(&mut self, channel: FieldChannel, field: Field) {
        let existing = self.fields.remove(&channel).unwrap_or_default();
        self.fields.insert(channel, existing.add(field));
    }

    /// The pulse's duration: the longest channel.
    pub fn duration(&self) -> Scalar {
        self.fields
            .values()
            .map(Field::duration)
            .fold(Scalar::Literal(0.0), |acc, d| acc.max(d))
    }

    /// Replace bound variables with literals in every field.
    pub fn substitute(&self, assignments: &Assignments) -> Pulse {
        Pulse {
            fields: self
                .fields
                .iter()
                .map(|(channel, field)| (*channel, field.substitute(assignments)))
                .collect(),
        }
    }
}
