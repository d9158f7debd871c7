//! Registers: the addressable site geometry.

use serde::{Deserialize, Serialize};

use crate::scalar::{Assignments, Scalar};
use crate::{IrError, IrResult};

/// Whether a trap site holds an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteFilling {
    /// Site holds an atom.
    Filled,
    /// Site is an empty trap.
    Vacant,
}

impl SiteFilling {
    /// Wire encoding: 1 for filled, 0 for vacant.
    pub fn value(self) -> u8 {
        match self {
            SiteFilling::Filled => 1,
            SiteFilling::Vacant => 0,
        }
    }
}

/// One trap site: a symbolic 2-D position and a fill flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Position in the register plane.
    pub position: (Scalar, Scalar),
    /// Whether the site holds an atom.
    pub filling: SiteFilling,
}

impl SiteInfo {
    /// A site at `position`, filled or vacant.
    pub fn new<X, Y>(position: (X, Y), filled: bool) -> Self
    where
        X: Into<Scalar>,
        Y: Into<Scalar>,
    {
        Self {
            position: (position.0.into(), position.1.into()),
            filling: if filled {
                SiteFilling::Filled
            } else {
                SiteFilling::Vacant
            },
        }
    }
}

/// An ordered collection of trap sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    sites: Vec<SiteInfo>,
    /// Interaction cutoff consumed by the emulator; zero disables it.
    pub blockade_radius: Scalar,
}

impl Default for Register {
    fn default() -> Self {
        Self {
            sites: vec![],
            blockade_radius: Scalar::Literal(0.0),
        }
    }
}

impl Register {
    /// An empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// A register from explicit sites.
    pub fn from_sites(sites: Vec<SiteInfo>) -> Self {
        Self {
            sites,
            blockade_radius: Scalar::Literal(0.0),
        }
    }

    /// Append one filled site.
    pub fn add_position<X, Y>(mut self, position: (X, Y)) -> Self
    where
        X: Into<Scalar>,
        Y: Into<Scalar>,
    {
        self.sites.push(SiteInfo::new(position, true));
        self
    }

    /// Append several sites, all filled unless a filling list is given.
    pub fn add_positions(
        mut self,
        positions: Vec<(Scalar, Scalar)>,
        filling: Option<Vec<bool>>,
    ) -> Self {
        match filling {
            Some(filling) => {
                for (position, filled) in positions.into_iter().zip(filling) {
                    self.sites.push(SiteInfo::new(position, filled));
                }
            }
            None => {
                for position in positions {
                    self.sites.push(SiteInfo::new(position, true));
                }
            }
        }
        self
    }

    /// Set the blockade radius consumed by the emulator.
    pub fn with_blockade_radius(mut self, radius: impl Into<Scalar>) -> Self {
        self.blockade_radius = radius.into();
        self
    }

    /// The sites in order.
    pub fn sites(&self) -> &[SiteInfo] {
        &self.sites
    }

    /// Number of sites.
    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    /// Position-tuple arity of the sites.
    ///
    /// Errors on an empty register, which has no dimensionality.
    pub fn n_dims(&self) -> IrResult<usize> {
        if self.sites.is_empty() {
            return Err(IrError::EmptyRegister);
        }
        Ok(2)
    }

    /// Replace bound variables with literals in every site position.
    pub fn substitute(&self, assignments: &Assignments) -> Register {
        Register {
            sites: self
                .sites
                .iter()
                .map(|site| SiteInfo {
                    position: (
                        site.position.0.substitute(assignments),
                        site.position.1.substitute(assignments),
                    ),
                    filling: site.filling,
                })
                .collect(),
            blockade_radius: self.blockade_radius.substitute(assignments),
        }
    }
}

/// A tiling seed: a base register replicated across a 2-D shift lattice.
///
/// The shift vectors span the base register's bounding box plus the
/// cluster spacing, computed symbolically so the base positions may still
/// contain free variables. Expansion into a flat site list happens in the
/// compiler, under concrete device bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelRegister {
    /// The replicated register.
    pub register: Register,
    /// Gap between adjacent cluster bounding boxes.
    pub cluster_spacing: Scalar,
    /// Lattice basis vectors.
    pub shift_vectors: [(Scalar, Scalar); 2],
}

impl ParallelRegister {
    /// Wrap a base register for tiling with the given cluster spacing.
    pub fn new(register: Register, cluster_spacing: impl Into<Scalar>) -> IrResult<Self> {
        let mut sites = register.sites().iter();
        let first = sites.next().ok_or(IrError::EmptyRegister)?;

        let (mut x_min, mut y_min) = first.position.clone();
        let (mut x_max, mut y_max) = first.position.clone();
        for site in sites {
            let (x, y) = &site.position;
            x_min = x_min.min(x.clone());
            x_max = x_max.max(x.clone());
            y_min = y_min.min(y.clone());
            y_max = y_max.max(y.clone());
        }

        let cluster_spacing = cluster_spacing.into();
        let shift_x = (x_max - x_min) + cluster_spacing.clone();
        let shift_y = (y_max - y_min) + cluster_spacing.clone();

        Ok(Self {
            register,
            cluster_spacing,
            shift_vectors: [
                (shift_x, Scalar::Literal(0.0)),
                (Scalar::Literal(0.0), shift_y),
            ],
        })
    }
}

/// A register expression: flat, or a tiling seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegisterExpr {
    /// A flat list of sites.
    Atoms(Register),
    /// A base register awaiting lattice expansion.
    Parallel(ParallelRegister),
}

impl RegisterExpr {
    /// The underlying base register.
    pub fn base(&self) -> &Register {
        match self {
            RegisterExpr::Atoms(register) => register,
            RegisterExpr::Parallel(parallel) => &parallel.register,
        }
    }
}
