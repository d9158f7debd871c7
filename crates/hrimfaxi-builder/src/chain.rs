//! The builder chain: an append-only arena of typed nodes.
//!
//! Every fluent call records one node. Nodes hold a handle to their
//! parent; the parent never references its children, so the chain is a
//! backward-linked list read by walking from the terminal node to the
//! root and reversing. Handles are plain indices into the arena — the
//! structure is acyclic by construction and needs no reference counting.

use serde::{Deserialize, Serialize};

use hrimfaxi_ir::{AssignedValue, Interpolation, Register, Scalar, Waveform};

/// Handle to a node in a [`ChainArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// One recorded fluent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The register the program starts from. Always the chain root.
    Register(Register),

    /// Select the ground-Rydberg coupling.
    Rydberg,
    /// Select the hyperfine coupling.
    Hyperfine,

    /// Select the detuning channel.
    Detuning,
    /// Select the Rabi amplitude channel.
    RabiAmplitude,
    /// Select the Rabi phase channel.
    RabiPhase,

    /// Address one site.
    Location {
        /// Site index in the base register.
        index: usize,
    },
    /// Scale the previously addressed site's weight.
    Scale {
        /// The weight.
        factor: Scalar,
    },
    /// Address every site at weight 1.
    Uniform,
    /// Address sites through a run-time weight vector.
    Var {
        /// Name the weight vector binds to.
        name: String,
    },

    /// Append a linear ramp segment.
    Linear {
        /// Value at segment start.
        start: Scalar,
        /// Value at segment end.
        stop: Scalar,
        /// Segment length.
        duration: Scalar,
    },
    /// Append a constant segment.
    Constant {
        /// The held value.
        value: Scalar,
        /// Segment length.
        duration: Scalar,
    },
    /// Append a polynomial segment.
    Poly {
        /// Coefficients in ascending power order.
        coeffs: Vec<Scalar>,
        /// Segment length.
        duration: Scalar,
    },
    /// Append a pre-built waveform.
    Apply {
        /// The waveform to append.
        waveform: Waveform,
    },
    /// Cut a time window out of the waveform built so far.
    Slice {
        /// Window start; `None` means 0.
        start: Option<Scalar>,
        /// Window stop; `None` means the full duration.
        stop: Option<Scalar>,
    },
    /// Bind the terminal value of the waveform built so far to a name.
    Record {
        /// The name to bind.
        name: String,
    },
    /// Resample the waveform built so far on a fixed grid.
    Sample {
        /// Grid step.
        dt: Scalar,
        /// Interpolation rule; `None` defers to the channel's default.
        interpolation: Option<Interpolation>,
    },

    /// Bind one variable statically.
    Assign {
        /// Variable name.
        name: String,
        /// The bound value.
        value: AssignedValue,
    },
    /// Bind one variable to a value per batch row.
    BatchAssign {
        /// Variable name.
        name: String,
        /// One value per row.
        values: Vec<f64>,
    },
    /// Declare the positional argument order for deferred variables.
    Flatten {
        /// Variable names in positional order.
        order: Vec<String>,
    },
    /// Replicate the register across a cluster lattice.
    Parallelize {
        /// Gap between adjacent cluster bounding boxes.
        cluster_spacing: Scalar,
    },
}

impl NodeKind {
    /// Short name used in parse errors.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Register(_) => "register",
            NodeKind::Rydberg => "rydberg",
            NodeKind::Hyperfine => "hyperfine",
            NodeKind::Detuning => "detuning",
            NodeKind::RabiAmplitude => "rabi_amplitude",
            NodeKind::RabiPhase => "rabi_phase",
            NodeKind::Location { .. } => "location",
            NodeKind::Scale { .. } => "scale",
            NodeKind::Uniform => "uniform",
            NodeKind::Var { .. } => "var",
            NodeKind::Linear { .. } => "linear",
            NodeKind::Constant { .. } => "constant",
            NodeKind::Poly { .. } => "poly",
            NodeKind::Apply { .. } => "apply",
            NodeKind::Slice { .. } => "slice",
            NodeKind::Record { .. } => "record",
            NodeKind::Sample { .. } => "sample",
            NodeKind::Assign { .. } => "assign",
            NodeKind::BatchAssign { .. } => "batch_assign",
            NodeKind::Flatten { .. } => "flatten",
            NodeKind::Parallelize { .. } => "parallelize",
        }
    }
}

/// A node plus its parent handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainNode {
    /// What the call recorded.
    pub kind: NodeKind,
    /// The preceding call, if any.
    pub parent: Option<NodeId>,
}

/// Append-only storage for chain nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainArena {
    nodes: Vec<ChainNode>,
}

impl ChainArena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its handle.
    pub fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ChainNode { kind, parent });
        id
    }

    /// Look up a node by handle.
    pub fn node(&self, id: NodeId) -> &ChainNode {
        &self.nodes[id.0 as usize]
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk from `tip` back to the root and return handles in
    /// root-to-tip order.
    pub fn walk(&self, tip: NodeId) -> Vec<NodeId> {
        let mut ids = vec![tip];
        let mut current = tip;
        while let Some(parent) = self.node(current).parent {
            ids.push(parent);
            current = parent;
        }
        ids.reverse();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_reverses_parent_links() {
        let mut arena = ChainArena::new();
        let a = arena.push(NodeKind::Register(Register::new()), None);
        let b = arena.push(NodeKind::Rydberg, Some(a));
        let c = arena.push(NodeKind::Detuning, Some(b));

        assert_eq!(arena.walk(c), vec![a, b, c]);
        assert_eq!(arena.walk(a), vec![a]);
    }

    #[test]
    fn test_parent_never_references_children() {
        let mut arena = ChainArena::new();
        let a = arena.push(NodeKind::Register(Register::new()), None);
        let _b = arena.push(NodeKind::Rydberg, Some(a));
        assert_eq!(arena.node(a).parent, None);
    }
}
