//! Decoding of tiled-register measurements.
//!
//! When a base register is replicated across a cluster lattice, the device
//! sees one flat site list and returns one flat occupancy record per shot.
//! The [`ParallelDecoder`] carries the mapping needed to fold those
//! records back into per-cluster shots indexed like the base register.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};
use crate::results::{ShotResult, TaskResults};

/// Lattice coordinates of a cluster.
pub type ClusterIndex = (i32, i32);

/// Where one flat-lattice site came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteClusterInfo {
    /// The cluster the site belongs to.
    pub cluster_index: ClusterIndex,
    /// The site's index in the flat, tiled lattice.
    pub global_site_index: usize,
    /// The site's index within the base register.
    pub local_site_index: usize,
}

/// The flat-lattice → (cluster, base-site) mapping for a tiled register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelDecoder {
    /// One record per flat-lattice site.
    pub mapping: Vec<SiteClusterInfo>,
    /// Sites in the base register.
    pub sites_per_cluster: usize,
    /// Number of instantiated clusters.
    pub cluster_count: usize,
}

impl ParallelDecoder {
    /// Build a decoder, validating that no flat-lattice site is claimed by
    /// two clusters.
    pub fn new(mapping: Vec<SiteClusterInfo>) -> TaskResult<Self> {
        let mut seen_globals = FxHashMap::default();
        let mut local_indices = std::collections::BTreeSet::new();
        let mut clusters = std::collections::BTreeSet::new();

        for site in &mapping {
            if seen_globals
                .insert(site.global_site_index, site.cluster_index)
                .is_some()
            {
                return Err(TaskError::DuplicateGlobalSite(site.global_site_index));
            }
            local_indices.insert(site.local_site_index);
            clusters.insert(site.cluster_index);
        }

        Ok(Self {
            sites_per_cluster: local_indices.len(),
            cluster_count: clusters.len(),
            mapping,
        })
    }

    /// Per-cluster flat-site lists, each ordered by base-register index.
    pub fn cluster_sites(&self) -> Vec<(ClusterIndex, Vec<usize>)> {
        let mut clusters: Vec<(ClusterIndex, Vec<(usize, usize)>)> = vec![];
        for site in &self.mapping {
            match clusters
                .iter_mut()
                .find(|(index, _)| *index == site.cluster_index)
            {
                Some((_, sites)) => {
                    sites.push((site.local_site_index, site.global_site_index));
                }
                None => clusters.push((
                    site.cluster_index,
                    vec![(site.local_site_index, site.global_site_index)],
                )),
            }
        }
        clusters
            .into_iter()
            .map(|(index, mut sites)| {
                sites.sort_by_key(|(local, _)| *local);
                (index, sites.into_iter().map(|(_, global)| global).collect())
            })
            .collect()
    }

    /// Fold flat-lattice shot records into per-cluster records.
    ///
    /// Each device shot becomes one decoded shot per selected cluster,
    /// with occupancy lists re-indexed to the base register. An empty
    /// `clusters` filter selects every cluster.
    pub fn decode_results(
        &self,
        results: &TaskResults,
        clusters: &[ClusterIndex],
    ) -> TaskResult<TaskResults> {
        let selected: Vec<(ClusterIndex, Vec<usize>)> = self
            .cluster_sites()
            .into_iter()
            .filter(|(index, _)| clusters.is_empty() || clusters.contains(index))
            .collect();

        let mut shot_outputs = vec![];
        for shot in &results.shot_outputs {
            for (_, site_indices) in &selected {
                let max_index = site_indices.iter().copied().max().unwrap_or(0);
                if shot.pre_sequence.len() <= max_index || shot.post_sequence.len() <= max_index {
                    return Err(TaskError::ShortShotRecord {
                        got: shot.pre_sequence.len().min(shot.post_sequence.len()),
                        required: max_index + 1,
                    });
                }
                shot_outputs.push(ShotResult {
                    shot_status: shot.shot_status,
                    pre_sequence: site_indices.iter().map(|i| shot.pre_sequence[*i]).collect(),
                    post_sequence: site_indices
                        .iter()
                        .map(|i| shot.post_sequence[*i])
                        .collect(),
                });
            }
        }

        Ok(TaskResults {
            task_status: results.task_status,
            shot_outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ShotStatus, TaskStatus};

    fn two_cluster_decoder() -> ParallelDecoder {
        ParallelDecoder::new(vec![
            SiteClusterInfo {
                cluster_index: (0, 0),
                global_site_index: 0,
                local_site_index: 0,
            },
            SiteClusterInfo {
                cluster_index: (0, 0),
                global_site_index: 1,
                local_site_index: 1,
            },
            SiteClusterInfo {
                cluster_index: (1, 0),
                global_site_index: 2,
                local_site_index: 0,
            },
            SiteClusterInfo {
                cluster_index: (1, 0),
                global_site_index: 3,
                local_site_index: 1,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_decoder_counts() {
        let decoder = two_cluster_decoder();
        assert_eq!(decoder.sites_per_cluster, 2);
        assert_eq!(decoder.cluster_count, 2);
    }

    #[test]
    fn test_duplicate_global_site_rejected() {
        let err = ParallelDecoder::new(vec![
            SiteClusterInfo {
                cluster_index: (0, 0),
                global_site_index: 0,
                local_site_index: 0,
            },
            SiteClusterInfo {
                cluster_index: (1, 0),
                global_site_index: 0,
                local_site_index: 0,
            },
        ])
        .unwrap_err();
        assert!(matches!(err, TaskError::DuplicateGlobalSite(0)));
    }

    #[test]
    fn test_decode_folds_shots_per_cluster() {
        let decoder = two_cluster_decoder();
        let results = TaskResults {
            task_status: TaskStatus::Completed,
            shot_outputs: vec![ShotResult {
                shot_status: ShotStatus::Completed,
                pre_sequence: vec![1, 1, 1, 1],
                post_sequence: vec![0, 1, 1, 0],
            }],
        };

        let decoded = decoder.decode_results(&results, &[]).unwrap();
        assert_eq!(decoded.shot_outputs.len(), 2);
        assert_eq!(decoded.shot_outputs[0].post_sequence, vec![0, 1]);
        assert_eq!(decoded.shot_outputs[1].post_sequence, vec![1, 0]);
    }

    #[test]
    fn test_decode_with_cluster_filter() {
        let decoder = two_cluster_decoder();
        let results = TaskResults {
            task_status: TaskStatus::Completed,
            shot_outputs: vec![ShotResult {
                shot_status: ShotStatus::Completed,
                pre_sequence: vec![1, 1, 1, 1],
                post_sequence: vec![0, 1, 1, 0],
            }],
        };

        let decoded = decoder.decode_results(&results, &[(1, 0)]).unwrap();
        assert_eq!(decoded.shot_outputs.len(), 1);
        assert_eq!(decoded.shot_outputs[0].post_sequence, vec![1, 0]);
    }
}
