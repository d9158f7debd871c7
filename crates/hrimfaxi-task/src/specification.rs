//! The hardware task specification.
//!
//! This is the wire shape handed to the submission layer: a discretized,
//! device-unit schedule plus the lattice geometry. All quantities are in
//! SI units — the conversion happens once, at the codegen boundary.

use serde::{Deserialize, Serialize};

/// The site geometry sent to the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// Site coordinates in meters.
    pub sites: Vec<(f64, f64)>,
    /// Occupancy flags, 1 for filled and 0 for vacant.
    pub filling: Vec<u8>,
}

/// A piecewise table driven identically on every site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalField {
    /// Breakpoint times in seconds, starting at 0.
    pub times: Vec<f64>,
    /// Values at the breakpoints, in rad/s for energy-like channels.
    pub values: Vec<f64>,
}

/// A piecewise table modulated per site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalField {
    /// Breakpoint times in seconds, starting at 0.
    pub times: Vec<f64>,
    /// Values at the breakpoints.
    pub values: Vec<f64>,
    /// One weight per lattice site, multiplying `values`.
    #[serde(rename = "per_site_coefficients")]
    pub site_coefficients: Vec<f64>,
}

/// One drive channel of the effective Hamiltonian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// The globally applied component. Always present; a channel the
    /// program never drove carries a zero-valued table.
    pub global: GlobalField,
    /// The per-site component, if the channel supports and uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalField>,
}

impl Channel {
    /// A zero-valued global channel spanning `duration` seconds.
    pub fn zero(duration: f64) -> Self {
        Self {
            global: GlobalField {
                times: vec![0.0, duration],
                values: vec![0.0, 0.0],
            },
            local: None,
        }
    }

    /// The channel's end time in seconds.
    pub fn end_time(&self) -> f64 {
        self.global.times.last().copied().unwrap_or(0.0)
    }
}

/// The three drive channels of the single-transition Hamiltonian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveHamiltonian {
    /// Frequency offset channel.
    pub detuning: Channel,
    /// Rabi drive amplitude channel.
    pub rabi_amplitude: Channel,
    /// Rabi drive phase channel.
    pub rabi_phase: Channel,
}

/// A complete, submittable hardware task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecification {
    /// Number of measurement shots to run.
    pub shot_count: u32,
    /// Site geometry.
    pub lattice: Lattice,
    /// The discretized drive schedule.
    pub effective_hamiltonian: EffectiveHamiltonian,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_channel_shape() {
        let channel = Channel::zero(1.5e-6);
        assert_eq!(channel.global.times, vec![0.0, 1.5e-6]);
        assert_eq!(channel.global.values, vec![0.0, 0.0]);
        assert!(channel.local.is_none());
    }

    #[test]
    fn test_wire_shape_field_names() {
        let task = TaskSpecification {
            shot_count: 10,
            lattice: Lattice {
                sites: vec![(0.0, 0.0)],
                filling: vec![1],
            },
            effective_hamiltonian: EffectiveHamiltonian {
                detuning: Channel {
                    global: GlobalField {
                        times: vec![0.0, 1e-6],
                        values: vec![0.0, 0.0],
                    },
                    local: Some(LocalField {
                        times: vec![0.0, 1e-6],
                        values: vec![0.0, 0.0],
                        site_coefficients: vec![1.0],
                    }),
                },
                rabi_amplitude: Channel::zero(1e-6),
                rabi_phase: Channel::zero(1e-6),
            },
        };

        let json = serde_json::to_value(&task).unwrap();
        assert!(json["effective_hamiltonian"]["detuning"]["local"]["per_site_coefficients"]
            .is_array());
        assert!(json["effective_hamiltonian"]["rabi_amplitude"]["global"]["times"].is_array());
        // An undriven local component is omitted, not serialized as null.
        assert!(json["effective_hamiltonian"]["rabi_phase"]
            .as_object()
            .unwrap()
            .get("local")
            .is_none());
    }
}
