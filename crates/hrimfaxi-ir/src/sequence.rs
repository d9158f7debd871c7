//! Sequences: the top of the control IR.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pulse::Pulse;
use crate::scalar::{Assignments, Scalar};

/// Which internal transition a drive addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelCoupling {
    /// Ground-Rydberg transition.
    Rydberg,
    /// Hyperfine ground-state transition.
    Hyperfine,
}

impl std::fmt::Display for LevelCoupling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelCoupling::Rydberg => write!(f, "rydberg"),
            LevelCoupling::Hyperfine => write!(f, "hyperfine"),
        }
    }
}

/// A full control program: one pulse per driven level coupling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Per-coupling pulses.
    pub pulses: BTreeMap<LevelCoupling, Pulse>,
}

impl Sequence {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pulse for a coupling, creating an empty one if absent.
    pub fn pulse_mut(&mut self, coupling: LevelCoupling) -> &mut Pulse {
        self.pulses.entry(coupling).or_default()
    }

    /// The sequence's duration: the longest pulse.
    pub fn duration(&self) -> Scalar {
        self.pulses
            .values()
            .map(Pulse::duration)
            .fold(Scalar::Literal(0.0), |acc, d| acc.max(d))
    }

    /// Replace bound variables with literals throughout.
    pub fn substitute(&self, assignments: &Assignments) -> Sequence {
        Sequence {
            pulses: self
                .pulses
                .iter()
                .map(|(coupling, pulse)| (*coupling, pulse.substitute(assignments)))
                .collect(),
        }
    }
}
