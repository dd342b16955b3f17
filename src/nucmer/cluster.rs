//! Filtering, clustering and chaining of match anchors.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::nucmer::mum::Anchor;

/// An ordered chain of non-overlapping anchors, increasing in both sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    anchors: SmallVec<[Anchor; 4]>,
}

impl Cluster {
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn first(&self) -> &Anchor {
        &self.anchors[0]
    }

    pub fn last(&self) -> &Anchor {
        &self.anchors[self.anchors.len() - 1]
    }

    /// Sum of the anchor lengths
    pub fn match_length(&self) -> usize {
        self.anchors.iter().map(|a| a.length).sum()
    }
}

/// Parameters controlling which anchors are grouped and which chains are kept
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClusterParams {
    pub fixed_separation: i64,
    pub maximum_separation: i64,
    pub separation_factor: f32,
    pub minimum_score: i64,
}

/// Sort anchors by query position and remove redundant ones: anchors on the same
/// diagonal that overlap are merged, and of two anchors starting at the same reference or
/// query position that overlap by at least half the shorter one, the shorter is dropped.
pub(crate) fn filter_anchors(anchors: &mut Vec<Anchor>) {
    anchors.sort_unstable_by_key(|a| (a.query_start, a.reference_start));

    let n = anchors.len();
    let mut removed = vec![false; n];
    let mut tentative = vec![false; n];

    for i in 0..n {
        if removed[i] {
            continue;
        }

        let mut end = anchors[i].query_end();
        let mut j = i + 1;

        while j < n && anchors[j].query_start <= end {
            if removed[j] {
                j += 1;
                continue;
            }

            let (a, b) = (anchors[i], anchors[j]);

            if a.diagonal() == b.diagonal() {
                let extent = b.query_end() - a.query_start;
                if extent > a.length {
                    anchors[i].length = extent;
                    end = anchors[i].query_end();
                }

                removed[j] = true;
            } else if a.reference_start == b.reference_start || a.query_start == b.query_start {
                let overlap = if a.reference_start == b.reference_start {
                    a.query_end() as i64 - b.query_start as i64
                } else {
                    a.reference_end() as i64 - b.reference_start as i64
                };

                match a.length.cmp(&b.length) {
                    Ordering::Less if overlap >= (a.length / 2) as i64 => {
                        removed[i] = true;
                        break;
                    },
                    Ordering::Greater if overlap >= (b.length / 2) as i64 => {
                        removed[j] = true;
                    },
                    Ordering::Equal if overlap >= (a.length / 2) as i64 => {
                        tentative[j] = true;
                        if tentative[i] {
                            removed[i] = true;
                            break;
                        }
                    },
                    _ => (),
                }
            }

            j += 1;
        }
    }

    let mut keep = removed.into_iter().map(|r| !r);
    anchors.retain(|_| keep.next().unwrap_or(false));
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }

        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }

        let (large, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = large;
        self.size[large] += self.size[small];
    }
}

/// Groups filtered anchors into clusters of nearby anchors on similar diagonals and
/// extracts chains from each group.
pub(crate) struct ClusterBuilder {
    params: ClusterParams,
}

impl ClusterBuilder {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    pub fn build(&self, mut anchors: Vec<Anchor>) -> Vec<Cluster> {
        filter_anchors(&mut anchors);

        let mut clusters = Vec::new();
        for group in self.group(&anchors) {
            self.extract_chains(group, &mut clusters);
        }

        clusters
    }

    /// Anchors must be sorted by query position. Groups are returned in order of their
    /// first anchor, each sorted by query position.
    fn group(&self, anchors: &[Anchor]) -> Vec<Vec<Anchor>> {
        let mut sets = UnionFind::new(anchors.len());

        for (i, a) in anchors.iter().enumerate() {
            for (j, b) in anchors.iter().enumerate().skip(i + 1) {
                let separation = b.query_start as i64 - a.query_end() as i64;
                if separation > self.params.maximum_separation {
                    break;
                }

                let diagonal_difference = (b.diagonal() - a.diagonal()).abs();
                let allowed = (self.params.fixed_separation as f64)
                    .max(self.params.separation_factor as f64 * separation as f64);

                if diagonal_difference as f64 <= allowed {
                    sets.union(i, j);
                }
            }
        }

        let mut group_index: FxHashMap<usize, usize> = FxHashMap::default();
        let mut groups: Vec<Vec<Anchor>> = Vec::new();

        for (i, anchor) in anchors.iter().enumerate() {
            let root = sets.find(i);
            let index = *group_index.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });

            groups[index].push(*anchor);
        }

        groups
    }

    /// Repeatedly take the best scoring chain out of `members`, keeping the chains whose
    /// total match length reaches the minimum score.
    fn extract_chains(&self, mut members: Vec<Anchor>, clusters: &mut Vec<Cluster>) {
        while !members.is_empty() {
            let n = members.len();
            let mut score: Vec<i64> = members.iter().map(|a| a.length as i64).collect();
            let mut from: Vec<Option<usize>> = vec![None; n];
            let mut adjacent = vec![0usize; n];

            for i in 0..n {
                let current = members[i];

                for j in 0..i {
                    let previous = members[j];
                    let overlap = 0i64
                        .max(previous.reference_end() as i64 - current.reference_start as i64)
                        .max(previous.query_end() as i64 - current.query_start as i64);
                    let cost = overlap + (current.diagonal() - previous.diagonal()).abs();

                    let candidate = score[j] + current.length as i64 - cost;
                    if candidate > score[i] {
                        score[i] = candidate;
                        from[i] = Some(j);
                        adjacent[i] = overlap as usize;
                    }
                }
            }

            let mut best = 0;
            for i in 1..n {
                if score[i] > score[best] {
                    best = i;
                }
            }

            let mut in_chain = vec![false; n];
            let mut total = 0;
            let mut next = Some(best);
            while let Some(i) = next {
                in_chain[i] = true;
                total += members[i].length;
                next = from[i];
            }

            if total as i64 >= self.params.minimum_score {
                let anchors: SmallVec<[Anchor; 4]> = (0..n)
                    .filter(|&i| in_chain[i] && members[i].length > adjacent[i])
                    .map(|i| {
                        let a = members[i];
                        let cut = adjacent[i];
                        Anchor::new(a.reference_start + cut, a.query_start + cut, a.length - cut)
                    })
                    .collect();

                if !anchors.is_empty() {
                    trace!(anchors = anchors.len(), match_length = total, "chain");
                    clusters.push(Cluster { anchors });
                }
            }

            let mut keep = in_chain.into_iter().map(|c| !c);
            members.retain(|_| keep.next().unwrap_or(false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{filter_anchors, ClusterBuilder, ClusterParams};
    use crate::nucmer::mum::Anchor;

    fn params(fixed_separation: i64, minimum_score: i64) -> ClusterParams {
        ClusterParams {
            fixed_separation,
            maximum_separation: 1000,
            separation_factor: 0.05,
            minimum_score,
        }
    }

    #[test]
    fn test_filter_merges_same_diagonal() {
        let mut anchors = vec![Anchor::new(14, 4, 6), Anchor::new(10, 0, 8)];
        filter_anchors(&mut anchors);

        assert_eq!(anchors, vec![Anchor::new(10, 0, 10)]);
    }

    #[test]
    fn test_filter_drops_shorter_shared_start() {
        let mut anchors = vec![Anchor::new(5, 0, 10), Anchor::new(5, 4, 20)];
        filter_anchors(&mut anchors);
        assert_eq!(anchors, vec![Anchor::new(5, 4, 20)]);

        let mut anchors = vec![Anchor::new(5, 0, 10), Anchor::new(5, 9, 20)];
        filter_anchors(&mut anchors);
        assert_eq!(anchors.len(), 2);

        let mut anchors = vec![Anchor::new(0, 3, 20), Anchor::new(10, 3, 4)];
        filter_anchors(&mut anchors);
        assert_eq!(anchors, vec![Anchor::new(0, 3, 20)]);
    }

    #[test]
    fn test_clusters_by_diagonal() {
        let anchors = vec![
            Anchor::new(3, 1, 3),
            Anchor::new(2, 2, 4),
            Anchor::new(8, 5, 4),
            Anchor::new(8, 6, 4),
        ];

        let clusters = ClusterBuilder::new(params(0, 2)).build(anchors);

        let chains: Vec<Vec<Anchor>> = clusters.iter().map(|c| c.anchors().to_vec()).collect();
        assert_eq!(chains, vec![
            vec![Anchor::new(3, 1, 3), Anchor::new(8, 6, 4)],
            vec![Anchor::new(2, 2, 4)],
            vec![Anchor::new(8, 5, 4)],
        ]);
    }

    #[test]
    fn test_minimum_score() {
        let anchors = vec![Anchor::new(0, 0, 10), Anchor::new(12, 12, 10), Anchor::new(500, 40, 5)];

        let clusters = ClusterBuilder::new(params(5, 15)).build(anchors);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].anchors(), &[Anchor::new(0, 0, 10), Anchor::new(12, 12, 10)]);
        assert_eq!(clusters[0].match_length(), 20);
    }

    #[test]
    fn test_chain_trims_overlap() {
        let anchors = vec![Anchor::new(0, 0, 10), Anchor::new(12, 8, 10)];

        let clusters = ClusterBuilder::new(params(5, 1)).build(anchors);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].anchors(), &[Anchor::new(0, 0, 10), Anchor::new(14, 10, 8)]);
        assert_eq!(clusters[0].last().reference_end(), 22);
    }
}
