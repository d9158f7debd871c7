//! The lattice parallelization engine.
//!
//! Expands a [`ParallelRegister`] seed into a flat site list by replicating
//! the base register across an integer shift lattice, bounded by the
//! device's usable area and site budget. The search is a stack-based
//! frontier expansion from the origin cluster with a fixed neighbor order,
//! so the set of clusters dropped when the site budget runs out is
//! reproducible.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hrimfaxi_ir::{Assignments, ParallelRegister, SiteFilling};
use hrimfaxi_task::{ParallelDecoder, SiteClusterInfo};

use crate::error::{CompileError, CompileResult};

/// Device limits the expansion must respect, in register position units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceBounds {
    /// Usable width: site x-coordinates stay in `[0, max_width]`.
    pub max_width: f64,
    /// Usable height: site y-coordinates stay in `[0, max_height]`.
    pub max_height: f64,
    /// Maximum total number of sites.
    pub max_sites: usize,
}

/// The expanded lattice plus its decode mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledLattice {
    /// Flat site positions, in register position units.
    pub sites: Vec<(f64, f64)>,
    /// Per-site fill flags, cluster by cluster.
    pub filling: Vec<SiteFilling>,
    /// Mapping from flat sites back to (cluster, base-site) pairs.
    pub decoder: ParallelDecoder,
}

/// Expand a parallel register under device bounds.
pub fn tile(
    parallel: &ParallelRegister,
    bounds: &DeviceBounds,
    assignments: &Assignments,
) -> CompileResult<TiledLattice> {
    let base = parallel.register.sites();
    if base.is_empty() {
        return Err(CompileError::Ir(hrimfaxi_ir::IrError::EmptyRegister));
    }

    let base_positions: Vec<(f64, f64)> = base
        .iter()
        .map(|site| {
            Ok((
                site.position.0.evaluate(assignments)?,
                site.position.1.evaluate(assignments)?,
            ))
        })
        .collect::<CompileResult<_>>()?;
    let shifts: [(f64, f64); 2] = [
        (
            parallel.shift_vectors[0].0.evaluate(assignments)?,
            parallel.shift_vectors[0].1.evaluate(assignments)?,
        ),
        (
            parallel.shift_vectors[1].0.evaluate(assignments)?,
            parallel.shift_vectors[1].1.evaluate(assignments)?,
        ),
    ];

    let mut stack: Vec<(i32, i32)> = vec![(0, 0)];
    let mut visited: FxHashSet<(i32, i32)> = FxHashSet::default();
    visited.insert((0, 0));

    let mut sites = vec![];
    let mut filling = vec![];
    let mut mapping = vec![];
    let mut global_site_index = 0;

    while let Some(cluster) = stack.pop() {
        // Stop once another full cluster would blow the site budget.
        if mapping.len() + base.len() > bounds.max_sites {
            break;
        }

        let shift = (
            shifts[0].0 * f64::from(cluster.0) + shifts[1].0 * f64::from(cluster.1),
            shifts[0].1 * f64::from(cluster.0) + shifts[1].1 * f64::from(cluster.1),
        );
        let cluster_positions: Vec<(f64, f64)> = base_positions
            .iter()
            .map(|(x, y)| (x + shift.0, y + shift.1))
            .collect();

        // Prune clusters that leave the usable area; their neighbors are
        // not explored either.
        let out_of_bounds = cluster_positions.iter().any(|(x, y)| {
            *x < 0.0 || *y < 0.0 || *x > bounds.max_width || *y > bounds.max_height
        });
        if out_of_bounds {
            continue;
        }

        // Fixed orthogonal neighbor order: +x, +y, -x, -y.
        for neighbor in [
            (cluster.0 + 1, cluster.1),
            (cluster.0, cluster.1 + 1),
            (cluster.0 - 1, cluster.1),
            (cluster.0, cluster.1 - 1),
        ] {
            if visited.insert(neighbor) {
                stack.push(neighbor);
            }
        }

        for (local_site_index, (position, site)) in
            cluster_positions.into_iter().zip(base).enumerate()
        {
            sites.push(position);
            filling.push(site.filling);
            mapping.push(SiteClusterInfo {
                cluster_index: cluster,
                global_site_index,
                local_site_index,
            });
            global_site_index += 1;
        }
    }

    let decoder = ParallelDecoder::new(mapping)?;
    debug!(
        clusters = decoder.cluster_count,
        sites = sites.len(),
        "expanded parallel register"
    );

    Ok(TiledLattice {
        sites,
        filling,
        decoder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrimfaxi_ir::Register;

    fn one_site_parallel(spacing: f64) -> ParallelRegister {
        ParallelRegister::new(Register::new().add_position((0.0, 0.0)), spacing).unwrap()
    }

    #[test]
    fn test_single_site_fills_budgeted_grid() {
        // Spacing 10 in a 20x20 area: 3x3 grid of clusters fits.
        let parallel = one_site_parallel(10.0);
        let bounds = DeviceBounds {
            max_width: 20.0,
            max_height: 20.0,
            max_sites: 100,
        };
        let tiled = tile(&parallel, &bounds, &Assignments::default()).unwrap();
        assert_eq!(tiled.sites.len(), 9);
        assert_eq!(tiled.decoder.cluster_count, 9);
        assert_eq!(tiled.decoder.sites_per_cluster, 1);
    }

    #[test]
    fn test_site_budget_truncates_expansion() {
        let parallel = one_site_parallel(10.0);
        let bounds = DeviceBounds {
            max_width: 100.0,
            max_height: 100.0,
            max_sites: 4,
        };
        let tiled = tile(&parallel, &bounds, &Assignments::default()).unwrap();
        assert_eq!(tiled.sites.len(), 4);
        let globals: std::collections::BTreeSet<usize> = tiled
            .decoder
            .mapping
            .iter()
            .map(|info| info.global_site_index)
            .collect();
        assert_eq!(globals.len(), 4);
    }

    #[test]
    fn test_multi_site_cluster_never_split() {
        // 2-site base, budget 5: only 2 whole clusters fit.
        let register = Register::new()
            .add_position((0.0, 0.0))
            .add_position((0.0, 4.0));
        let parallel = ParallelRegister::new(register, 6.0).unwrap();
        let bounds = DeviceBounds {
            max_width: 100.0,
            max_height: 100.0,
            max_sites: 5,
        };
        let tiled = tile(&parallel, &bounds, &Assignments::default()).unwrap();
        assert_eq!(tiled.sites.len(), 4);
        assert_eq!(tiled.decoder.cluster_count, 2);
    }

    #[test]
    fn test_out_of_area_clusters_pruned() {
        let parallel = one_site_parallel(10.0);
        let bounds = DeviceBounds {
            max_width: 5.0,
            max_height: 5.0,
            max_sites: 100,
        };
        let tiled = tile(&parallel, &bounds, &Assignments::default()).unwrap();
        // Only the origin cluster fits.
        assert_eq!(tiled.sites.len(), 1);
        assert_eq!(tiled.decoder.mapping[0].cluster_index, (0, 0));
    }

    #[test]
    fn test_search_terminates_with_generous_budget() {
        // Area-bounded: the frontier stops at the pruned ring.
        let parallel = one_site_parallel(1.0);
        let bounds = DeviceBounds {
            max_width: 10.0,
            max_height: 10.0,
            max_sites: usize::MAX,
        };
        let tiled = tile(&parallel, &bounds, &Assignments::default()).unwrap();
        assert_eq!(tiled.sites.len(), 121);
    }
}
