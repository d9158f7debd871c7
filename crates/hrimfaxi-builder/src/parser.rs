//! The chain-to-IR compiler.
//!
//! A single forward pass over the reversed chain, consuming maximal runs
//! in grammar precedence: coupling/channel selectors update the current
//! address, a spatial run plus its waveform run form one drive, and a
//! trailing pragma run configures assignment and parallelization. The
//! chain is never mutated; the only state is the cursor.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, HashSet};

use hrimfaxi_ir::{
    Assignments, Field, FieldChannel, Interpolation, LevelCoupling, ParallelRegister, Register,
    RegisterExpr, Scalar, Sequence, SpatialModulation, Waveform,
};

use crate::chain::{ChainArena, NodeId, NodeKind};
use crate::error::{BuilderError, BuilderResult};

/// A parsed program: the IR plus its assignment context.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The register the sequence drives.
    pub register: RegisterExpr,
    /// The drive sequence.
    pub sequence: Sequence,
    /// Single-valued bindings applied to every compiled program.
    pub static_params: Assignments,
    /// Row-aligned batch bindings: every list has the same length, and
    /// row `i` of each is bound simultaneously.
    pub batch_params: Vec<(String, Vec<f64>)>,
    /// Positional order of variables deferred to submission time.
    pub flatten_order: Vec<String>,
}

impl Program {
    /// Number of concrete programs the batch bindings expand to.
    pub fn batch_len(&self) -> usize {
        self.batch_params
            .first()
            .map_or(1, |(_, values)| values.len())
    }
}

/// Walks a builder chain once and produces a [`Program`].
pub struct Parser<'a> {
    arena: &'a ChainArena,
    nodes: Vec<NodeId>,
    pos: usize,
    coupling: Option<LevelCoupling>,
    channel: Option<FieldChannel>,
    vector_names: HashSet<String>,
}

impl<'a> Parser<'a> {
    /// Prepare a parse starting from the chain's terminal node.
    pub fn new(arena: &'a ChainArena, tip: NodeId) -> Self {
        Self {
            arena,
            nodes: arena.walk(tip),
            pos: 0,
            coupling: None,
            channel: None,
            vector_names: HashSet::new(),
        }
    }

    /// Owned snapshot of the node at the cursor. Cloning keeps the arena
    /// borrow out of the match arms, which mutate parser state.
    fn peek(&self) -> Option<NodeKind> {
        self.nodes
            .get(self.pos)
            .map(|id| self.arena.node(*id).kind.clone())
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Run the parse.
    pub fn parse(mut self) -> BuilderResult<Program> {
        let register = self.read_register()?;
        let sequence = self.read_sequence(&register)?;
        self.skip_to_pragmas();
        let (register, static_params, batch_params, flatten_order) =
            self.read_pragmas(register)?;

        Ok(Program {
            register,
            sequence,
            static_params,
            batch_params,
            flatten_order,
        })
    }

    /// The register is always the chain root.
    fn read_register(&mut self) -> BuilderResult<Register> {
        match self.peek() {
            Some(NodeKind::Register(register)) => {
                self.bump();
                Ok(register)
            }
            _ => Err(BuilderError::MissingRegister),
        }
    }

    fn read_sequence(&mut self, register: &Register) -> BuilderResult<Sequence> {
        let mut sequence = Sequence::new();

        while let Some(kind) = self.peek() {
            match kind {
                NodeKind::Rydberg => {
                    self.coupling = Some(LevelCoupling::Rydberg);
                    self.bump();
                }
                NodeKind::Hyperfine => {
                    self.coupling = Some(LevelCoupling::Hyperfine);
                    self.bump();
                }
                NodeKind::Detuning => {
                    self.channel = Some(FieldChannel::Detuning);
                    self.bump();
                }
                NodeKind::RabiAmplitude => {
                    self.channel = Some(FieldChannel::RabiAmplitude);
                    self.bump();
                }
                NodeKind::RabiPhase => {
                    self.channel = Some(FieldChannel::RabiPhase);
                    self.bump();
                }
                NodeKind::Location { .. }
                | NodeKind::Scale { .. }
                | NodeKind::Uniform
                | NodeKind::Var { .. } => {
                    // A spatial run with no coupling/channel context at all
                    // is a registration-only program: stop here.
                    let (Some(coupling), Some(channel)) = (self.coupling, self.channel) else {
                        break;
                    };
                    let modulation = self.read_spatial_modulation(register)?;
                    let waveform = self.read_waveform(channel)?;
                    sequence
                        .pulse_mut(coupling)
                        .add_field(channel, Field::from_drive(modulation, waveform));
                }
                NodeKind::Assign { .. }
                | NodeKind::BatchAssign { .. }
                | NodeKind::Flatten { .. }
                | NodeKind::Parallelize { .. } => break,
                other => {
                    return Err(BuilderError::UnexpectedNode {
                        kind: other.name(),
                        context: "sequence",
                    });
                }
            }
        }

        Ok(sequence)
    }

    /// Consume a maximal run of spatial nodes.
    ///
    /// Any addressed locations win over a trailing `uniform`/`var`; within
    /// locations, a scale applies to the location it follows.
    fn read_spatial_modulation(
        &mut self,
        register: &Register,
    ) -> BuilderResult<SpatialModulation> {
        let mut scaled: BTreeMap<usize, Scalar> = BTreeMap::new();
        let mut modulation: Option<SpatialModulation> = None;
        let mut last_location: Option<usize> = None;

        while let Some(kind) = self.peek() {
            match kind {
                NodeKind::Location { index } => {
                    if index >= register.n_sites() {
                        return Err(BuilderError::LocationOutOfRange {
                            index,
                            n_sites: register.n_sites(),
                        });
                    }
                    scaled.insert(index, Scalar::Literal(1.0));
                    last_location = Some(index);
                    self.bump();
                }
                NodeKind::Scale { factor } => {
                    let index = last_location.ok_or(BuilderError::ScaleWithoutLocation)?;
                    scaled.insert(index, factor);
                    self.bump();
                }
                NodeKind::Uniform => {
                    modulation = Some(SpatialModulation::Uniform);
                    self.bump();
                }
                NodeKind::Var { name } => {
                    self.vector_names.insert(name.clone());
                    modulation = Some(SpatialModulation::RunTimeVector(name));
                    self.bump();
                }
                _ => break,
            }
        }

        if !scaled.is_empty() {
            Ok(SpatialModulation::ScaledLocations(scaled))
        } else {
            // The run always opens with a spatial node, so one branch holds
            // something; this arm guards direct parser invocations.
            modulation.ok_or(BuilderError::UnexpectedNode {
                kind: "scale",
                context: "spatial modulation",
            })
        }
    }

    /// Consume a maximal run of waveform nodes, folding primitives
    /// left-to-right via append and applying modifiers as they occur.
    fn read_waveform(&mut self, channel: FieldChannel) -> BuilderResult<Waveform> {
        let mut waveform: Option<Waveform> = None;

        while let Some(kind) = self.peek() {
            let segment = match kind {
                NodeKind::Linear {
                    start,
                    stop,
                    duration,
                } => Waveform::Linear {
                    start,
                    stop,
                    duration,
                },
                NodeKind::Constant { value, duration } => Waveform::Constant { value, duration },
                NodeKind::Poly { coeffs, duration } => Waveform::Poly { coeffs, duration },
                NodeKind::Apply { waveform: applied } => applied,
                NodeKind::Slice { start, stop } => {
                    let head = waveform.take().ok_or(BuilderError::EmptyWaveform)?;
                    waveform = Some(head.slice(start, stop)?);
                    self.bump();
                    continue;
                }
                NodeKind::Record { name } => {
                    let head = waveform.take().ok_or(BuilderError::EmptyWaveform)?;
                    waveform = Some(head.record(name));
                    self.bump();
                    continue;
                }
                NodeKind::Sample { dt, interpolation } => {
                    // Phase is driven piecewise-constant on hardware, so
                    // its grid samples hold; other channels interpolate.
                    let interpolation = interpolation.unwrap_or(match channel {
                        FieldChannel::RabiPhase => Interpolation::Constant,
                        _ => Interpolation::Linear,
                    });
                    let head = waveform.take().ok_or(BuilderError::EmptyWaveform)?;
                    waveform = Some(head.sample(dt, interpolation));
                    self.bump();
                    continue;
                }
                _ => break,
            };
            waveform = Some(match waveform.take() {
                Some(head) => head.append(segment),
                None => segment,
            });
            self.bump();
        }

        waveform.ok_or(BuilderError::EmptyWaveform)
    }

    /// Advance to the first pragma node.
    ///
    /// A spatial run with no coupling context ends the sequence read: the
    /// program is registration-only, and the dangling run carries no
    /// drive to attach it to.
    fn skip_to_pragmas(&mut self) {
        while let Some(kind) = self.peek() {
            match kind {
                NodeKind::Assign { .. }
                | NodeKind::BatchAssign { .. }
                | NodeKind::Flatten { .. }
                | NodeKind::Parallelize { .. } => break,
                _ => self.bump(),
            }
        }
    }

    /// Consume the trailing pragma run.
    #[allow(clippy::type_complexity)]
    fn read_pragmas(
        &mut self,
        register: Register,
    ) -> BuilderResult<(RegisterExpr, Assignments, Vec<(String, Vec<f64>)>, Vec<String>)> {
        let mut register = RegisterExpr::Atoms(register);
        let mut static_params: Assignments = FxHashMap::default();
        let mut batch_params: Vec<(String, Vec<f64>)> = vec![];
        let mut flatten_order: Vec<String> = vec![];

        while let Some(kind) = self.peek() {
            match kind {
                NodeKind::Assign { name, value } => {
                    static_params.insert(name, value);
                    self.bump();
                }
                NodeKind::BatchAssign { name, values } => {
                    batch_params.push((name, values));
                    self.bump();
                }
                NodeKind::Flatten { order } => {
                    let mut seen = HashSet::new();
                    for name in &order {
                        if !seen.insert(name.clone()) {
                            return Err(BuilderError::DuplicateFlattenName(name.clone()));
                        }
                        if self.vector_names.contains(name) {
                            return Err(BuilderError::FlattenRunTimeVector(name.clone()));
                        }
                    }
                    flatten_order = order;
                    self.bump();
                }
                NodeKind::Parallelize { cluster_spacing } => {
                    let base = match register {
                        RegisterExpr::Atoms(base) => base,
                        RegisterExpr::Parallel(parallel) => parallel.register,
                    };
                    register =
                        RegisterExpr::Parallel(ParallelRegister::new(base, cluster_spacing)?);
                    self.bump();
                }
                other => {
                    return Err(BuilderError::UnexpectedNode {
                        kind: other.name(),
                        context: "pragmas",
                    });
                }
            }
        }

        // Row alignment: every batched variable lists the same number of
        // rows, checked eagerly rather than truncating to the shortest.
        if let Some((_, first_values)) = batch_params.first() {
            let expected = first_values.len();
            for (name, values) in &batch_params[1..] {
                if values.len() != expected {
                    return Err(BuilderError::BatchLengthMismatch {
                        name: name.clone(),
                        expected,
                        got: values.len(),
                    });
                }
            }
        }

        Ok((register, static_params, batch_params, flatten_order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrimfaxi_ir::AssignedValue;

    use crate::fluent::{
        ChannelAddressable, CouplingAddressable, Parseable, PragmaAttachable, SpatialAddressable,
        WaveformAttachable, start,
    };

    fn two_site_register() -> Register {
        Register::new()
            .add_position((0.0, 0.0))
            .add_position((0.0, 6.0))
    }

    #[test]
    fn test_registration_only_program() {
        let program = start(two_site_register()).parse().unwrap();
        assert!(program.sequence.pulses.is_empty());
        assert_eq!(program.register.base().n_sites(), 2);
    }

    #[test]
    fn test_dangling_spatial_run_terminates_parse() {
        // A hand-built chain can address sites with no coupling context;
        // the run has no drive to attach to, so the program is
        // registration-only and trailing pragmas still apply.
        let mut arena = ChainArena::new();
        let root = arena.push(NodeKind::Register(two_site_register()), None);
        let location = arena.push(NodeKind::Location { index: 0 }, Some(root));
        let tip = arena.push(
            NodeKind::Assign {
                name: "a".to_string(),
                value: AssignedValue::Number(1.0),
            },
            Some(location),
        );

        let program = Parser::new(&arena, tip).parse().unwrap();
        assert!(program.sequence.pulses.is_empty());
        assert_eq!(program.static_params["a"], AssignedValue::Number(1.0));
    }

    #[test]
    fn test_single_uniform_drive() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(0.0, 15.0, 0.5)
            .parse()
            .unwrap();

        let pulse = &program.sequence.pulses[&LevelCoupling::Rydberg];
        let field = &pulse.fields[&FieldChannel::Detuning];
        assert_eq!(field.len(), 1);
        assert!(field.get(&SpatialModulation::Uniform).is_some());
    }

    #[test]
    fn test_chained_primitives_append() {
        let program = start(two_site_register())
            .rydberg()
            .rabi()
            .amplitude()
            .uniform()
            .linear(0.0, 15.0, 0.1)
            .constant(15.0, 1.0)
            .linear(15.0, 0.0, 0.1)
            .parse()
            .unwrap();

        let field = &program.sequence.pulses[&LevelCoupling::Rydberg].fields
            [&FieldChannel::RabiAmplitude];
        let waveform = field.get(&SpatialModulation::Uniform).unwrap();
        assert_eq!(waveform.duration().simplify().as_f64(), Some(1.2));
    }

    #[test]
    fn test_chained_locations_share_waveform() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .location(0)
            .location(1)
            .scale(Scalar::literal(2.0))
            .constant(1.0, 1.0)
            .parse()
            .unwrap();

        let field =
            &program.sequence.pulses[&LevelCoupling::Rydberg].fields[&FieldChannel::Detuning];
        assert_eq!(field.len(), 1);
        let (modulation, _) = &field.drives()[0];
        match modulation {
            SpatialModulation::ScaledLocations(scales) => {
                assert_eq!(scales.len(), 2);
                assert_eq!(scales[&0], Scalar::Literal(1.0));
                assert_eq!(scales[&1], Scalar::Literal(2.0));
            }
            other => panic!("expected scaled locations, got {other:?}"),
        }
    }

    #[test]
    fn test_location_out_of_range_rejected_at_parse() {
        let err = start(two_site_register())
            .rydberg()
            .detuning()
            .location(5)
            .constant(1.0, 1.0)
            .parse()
            .unwrap_err();
        assert!(matches!(
            err,
            BuilderError::LocationOutOfRange { index: 5, n_sites: 2 }
        ));
    }

    #[test]
    fn test_second_drive_same_channel_merges() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(0.0, 1.0, 0.5)
            .uniform()
            .linear(1.0, 1.0, 0.5)
            .parse()
            .unwrap();

        let field =
            &program.sequence.pulses[&LevelCoupling::Rydberg].fields[&FieldChannel::Detuning];
        assert_eq!(field.len(), 1);
        let waveform = field.get(&SpatialModulation::Uniform).unwrap();
        assert_eq!(waveform.duration().simplify().as_f64(), Some(1.0));
    }

    #[test]
    fn test_channel_context_carries_across_runs() {
        // Switching only the spatial modulation keeps the channel.
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .constant(1.0, 0.5)
            .location(0)
            .constant(2.0, 0.5)
            .parse()
            .unwrap();

        let field =
            &program.sequence.pulses[&LevelCoupling::Rydberg].fields[&FieldChannel::Detuning];
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn test_coupling_switch_starts_new_pulse() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .constant(1.0, 0.5)
            .hyperfine()
            .detuning()
            .uniform()
            .constant(2.0, 0.5)
            .parse()
            .unwrap();

        assert_eq!(program.sequence.pulses.len(), 2);
    }

    #[test]
    fn test_static_assignment() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(0.0, Scalar::var("peak"), 0.5)
            .assign("peak", 12.5)
            .parse()
            .unwrap();

        assert_eq!(
            program.static_params["peak"],
            AssignedValue::Number(12.5)
        );
    }

    #[test]
    fn test_batch_assignment_is_row_aligned() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(Scalar::var("a"), Scalar::var("b"), 0.5)
            .batch_assign("a", vec![1.0, 2.0])
            .batch_assign("b", vec![10.0, 20.0])
            .parse()
            .unwrap();

        assert_eq!(program.batch_len(), 2);
    }

    #[test]
    fn test_batch_length_mismatch_rejected() {
        let err = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(Scalar::var("a"), Scalar::var("b"), 0.5)
            .batch_assign("a", vec![1.0, 2.0])
            .batch_assign("b", vec![10.0])
            .parse()
            .unwrap_err();

        assert!(matches!(
            err,
            BuilderError::BatchLengthMismatch {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_flatten_names_rejected() {
        let err = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(Scalar::var("a"), 0.0, 0.5)
            .flatten(vec!["a".to_string(), "a".to_string()])
            .parse()
            .unwrap_err();

        assert!(matches!(err, BuilderError::DuplicateFlattenName(name) if name == "a"));
    }

    #[test]
    fn test_flatten_of_run_time_vector_rejected() {
        let err = start(two_site_register())
            .rydberg()
            .detuning()
            .var("mask")
            .constant(1.0, 0.5)
            .flatten(vec!["mask".to_string()])
            .parse()
            .unwrap_err();

        assert!(matches!(err, BuilderError::FlattenRunTimeVector(name) if name == "mask"));
    }

    #[test]
    fn test_parallelize_wraps_register() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .constant(1.0, 0.5)
            .parallelize(20.0)
            .parse()
            .unwrap();

        assert!(matches!(program.register, RegisterExpr::Parallel(_)));
    }

    #[test]
    fn test_record_wraps_waveform() {
        let program = start(two_site_register())
            .rydberg()
            .detuning()
            .uniform()
            .linear(0.0, 7.0, 0.5)
            .record("ramp_end")
            .constant(Scalar::var("ramp_end"), 0.5)
            .parse()
            .unwrap();

        let field =
            &program.sequence.pulses[&LevelCoupling::Rydberg].fields[&FieldChannel::Detuning];
        let waveform = field.get(&SpatialModulation::Uniform).unwrap();
        // record(linear).append(constant)
        assert!(matches!(waveform, Waveform::Append { waveforms } if waveforms.len() == 2));
    }

    #[test]
    fn test_phase_sample_defaults_to_hold() {
        let program = start(two_site_register())
            .rydberg()
            .rabi()
            .phase()
            .uniform()
            .constant(1.0, 1.0)
            .sample(0.1)
            .parse()
            .unwrap();

        let field =
            &program.sequence.pulses[&LevelCoupling::Rydberg].fields[&FieldChannel::RabiPhase];
        let waveform = field.get(&SpatialModulation::Uniform).unwrap();
        assert!(matches!(
            waveform,
            Waveform::Sample {
                interpolation: Interpolation::Constant,
                ..
            }
        ));
    }
}
