//! Maximal matches between a reference and a query, found through a suffix array of the
//! reference.
//!
//! The longest match of each query suffix is computed left to right. The match found at
//! one query position, minus its first symbol, is a match of the next position, and its
//! suffix array interval is recovered from the LCP array instead of matching from the
//! root again. Each query symbol is therefore matched against the index a bounded number
//! of times.

use std::ops::Range;

use bio::data_structures::suffix_array::{lcp, suffix_array, RawSuffixArray};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::errors::AlignError;

/// Terminates the indexed reference text. Must sort before every reference symbol.
const SENTINEL: u8 = b'$';

/// An exact match between the reference and the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Anchor {
    pub reference_start: usize,
    pub query_start: usize,
    pub length: usize,
}

impl Anchor {
    pub fn new(reference_start: usize, query_start: usize, length: usize) -> Self {
        Self { reference_start, query_start, length }
    }

    #[inline]
    pub fn reference_end(&self) -> usize {
        self.reference_start + self.length
    }

    #[inline]
    pub fn query_end(&self) -> usize {
        self.query_start + self.length
    }

    /// Diagonal of the match in the (reference, query) dot plot
    #[inline]
    pub fn diagonal(&self) -> i64 {
        self.query_start as i64 - self.reference_start as i64
    }
}

/// Which matches are reported as anchors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum MatchUniqueness {
    /// Maximal matches occurring once in the reference and once in the query
    Mum,

    /// Maximal matches occurring once in the reference
    #[default]
    MumReference,

    /// Every maximal match, however often it occurs
    MaxMatch,
}

/// Minimum segment tree over the LCP array, answering nearest smaller value queries.
struct LcpTree {
    leaves: usize,
    nodes: Vec<usize>,
}

impl LcpTree {
    fn new(values: &[usize]) -> Self {
        let leaves = values.len().next_power_of_two();
        let mut nodes = vec![usize::MAX; 2 * leaves];
        nodes[leaves..leaves + values.len()].copy_from_slice(values);

        for node in (1..leaves).rev() {
            nodes[node] = nodes[2 * node].min(nodes[2 * node + 1]);
        }

        Self { leaves, nodes }
    }

    #[inline]
    fn value(&self, index: usize) -> usize {
        self.nodes[self.leaves + index]
    }

    /// Rightmost index not after `end` holding a value below `bound`
    fn last_below(&self, end: usize, bound: usize) -> Option<usize> {
        self.last_below_in(1, 0, self.leaves, end, bound)
    }

    fn last_below_in(
        &self,
        node: usize,
        lo: usize,
        hi: usize,
        end: usize,
        bound: usize,
    ) -> Option<usize> {
        if lo > end || self.nodes[node] >= bound {
            return None;
        }

        if hi - lo == 1 {
            return Some(lo);
        }

        let mid = lo + (hi - lo) / 2;
        self.last_below_in(2 * node + 1, mid, hi, end, bound)
            .or_else(|| self.last_below_in(2 * node, lo, mid, end, bound))
    }

    /// Leftmost index not before `start` holding a value below `bound`
    fn first_below(&self, start: usize, bound: usize) -> Option<usize> {
        self.first_below_in(1, 0, self.leaves, start, bound)
    }

    fn first_below_in(
        &self,
        node: usize,
        lo: usize,
        hi: usize,
        start: usize,
        bound: usize,
    ) -> Option<usize> {
        if hi <= start || self.nodes[node] >= bound {
            return None;
        }

        if hi - lo == 1 {
            return Some(lo);
        }

        let mid = lo + (hi - lo) / 2;
        self.first_below_in(2 * node, lo, mid, start, bound)
            .or_else(|| self.first_below_in(2 * node + 1, mid, hi, start, bound))
    }
}

/// Suffix array of the reference together with its inverse and LCP array.
struct SuffixIndex {
    text: Vec<u8>,
    suffix_array: RawSuffixArray,
    ranks: Vec<usize>,

    /// `lcp[i]` is the common prefix length of the suffixes of rank `i - 1` and `i`, zero
    /// at both ends
    lcp: LcpTree,
}

impl SuffixIndex {
    fn new(text: Vec<u8>) -> Self {
        let suffix_array = suffix_array(&text);

        let mut ranks = vec![0; text.len()];
        for (rank, &pos) in suffix_array.iter().enumerate() {
            ranks[pos] = rank;
        }

        let lcp_array = lcp(&text, &suffix_array);
        let values: Vec<usize> = (0..=text.len())
            .map(|i| match lcp_array.get(i) {
                Some(value) if value > 0 => value as usize,
                _ => 0,
            })
            .collect();

        Self {
            text,
            suffix_array,
            ranks,
            lcp: LcpTree::new(&values),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.suffix_array.len()
    }

    /// Narrow a suffix array interval, whose suffixes share their first `depth` symbols,
    /// to the suffixes continuing with `symbol`.
    fn narrow(&self, range: Range<usize>, depth: usize, symbol: u8) -> Range<usize> {
        let suffixes = &self.suffix_array[range.clone()];

        let lo = suffixes.partition_point(|&pos| self.text[pos + depth] < symbol);
        let hi = suffixes.partition_point(|&pos| self.text[pos + depth] <= symbol);

        range.start + lo..range.start + hi
    }

    /// Interval of the suffixes sharing their first `depth` symbols with the suffix of
    /// rank `rank`.
    fn interval(&self, rank: usize, depth: usize) -> Range<usize> {
        if depth == 0 {
            return 0..self.len();
        }

        let start = self.lcp.last_below(rank, depth).unwrap_or(0);
        let end = self.lcp.first_below(rank + 1, depth).unwrap_or(self.len());

        start..end
    }
}

/// Longest prefix of a query suffix occurring in the reference
struct QueryMatch {
    query_start: usize,
    length: usize,
    interval: Range<usize>,
}

/// Iterator over the longest reference match of every query suffix, in query order.
struct MatchingStatistics<'f, 'q> {
    index: &'f SuffixIndex,
    query: &'q [u8],
    position: usize,
    length: usize,
    interval: Range<usize>,

    /// Number of symbol lookups in the index so far
    steps: usize,
}

impl<'f, 'q> MatchingStatistics<'f, 'q> {
    fn new(index: &'f SuffixIndex, query: &'q [u8]) -> Self {
        Self {
            index,
            query,
            position: 0,
            length: 0,
            interval: 0..index.len(),
            steps: 0,
        }
    }
}

impl Iterator for MatchingStatistics<'_, '_> {
    type Item = QueryMatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.query.len() {
            return None;
        }

        let query_start = self.position;

        while query_start + self.length < self.query.len() {
            let symbol = self.query[query_start + self.length].to_ascii_uppercase();
            if symbol <= SENTINEL {
                break;
            }

            self.steps += 1;
            let next = self.index.narrow(self.interval.clone(), self.length, symbol);
            if next.is_empty() {
                break;
            }

            self.interval = next;
            self.length += 1;
        }

        let found = QueryMatch {
            query_start,
            length: self.length,
            interval: self.interval.clone(),
        };

        // Drop the first symbol, the rest matches at the next query position
        if self.length > 0 {
            let next_suffix = self.index.suffix_array[self.interval.start] + 1;
            self.length -= 1;
            self.interval = self.index.interval(self.index.ranks[next_suffix], self.length);
        }

        self.position += 1;

        Some(found)
    }
}

/// Suffix array index over one reference sequence.
pub struct MumFinder {
    index: SuffixIndex,
    min_length: usize,
    uniqueness: MatchUniqueness,
}

impl MumFinder {
    /// Index `reference`. Matching is case-insensitive.
    pub fn new(reference: &[u8], min_length: usize) -> Result<Self, AlignError> {
        if min_length < 1 {
            return Err(AlignError::InvalidLengthOfMum(min_length));
        }

        if let Some(position) = reference.iter().position(|&c| c <= SENTINEL) {
            return Err(AlignError::InvalidReferenceSymbol { position });
        }

        let mut text = reference.to_ascii_uppercase();
        text.push(SENTINEL);

        Ok(Self {
            index: SuffixIndex::new(text),
            min_length,
            uniqueness: MatchUniqueness::default(),
        })
    }

    pub fn with_uniqueness(self, uniqueness: MatchUniqueness) -> Self {
        Self { uniqueness, ..self }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn uniqueness(&self) -> MatchUniqueness {
        self.uniqueness
    }

    /// Lazily report the matches of `query` against the indexed reference, in order of
    /// query position.
    ///
    /// With [`MatchUniqueness::Mum`] the query is scanned once up front to find the
    /// matches repeated within the query.
    pub fn matches<'f, 'q>(&'f self, query: &'q [u8]) -> MumIter<'f, 'q> {
        let query_hits = (self.uniqueness == MatchUniqueness::Mum)
            .then(|| self.reference_unique_hits(query));

        MumIter {
            finder: self,
            statistics: MatchingStatistics::new(&self.index, query),
            query_hits,
            pending: Vec::new(),
            last_end: 0,
            done: false,
        }
    }

    /// For each reference position, the two longest reference-unique matches starting
    /// there. A query repeat of a reference-unique match hits the same reference position.
    fn reference_unique_hits(&self, query: &[u8]) -> FxHashMap<usize, (usize, usize)> {
        let mut hits: FxHashMap<usize, (usize, usize)> = FxHashMap::default();

        let unique = MatchingStatistics::new(&self.index, query)
            .filter(|m| m.length >= self.min_length && m.interval.len() == 1);

        for m in unique {
            let reference_start = self.index.suffix_array[m.interval.start];
            let (best, second) = hits.entry(reference_start).or_insert((0, 0));

            if m.length > *best {
                *second = *best;
                *best = m.length;
            } else if m.length > *second {
                *second = m.length;
            }
        }

        hits
    }
}

/// Iterator over the anchors of one query, see [`MumFinder::matches`].
///
/// For the unique modes, a match is reported when the longest prefix of the query suffix
/// found in the reference occurs exactly once, is at least the minimum length long and
/// reaches past the end of the previously reported match. For
/// [`MatchUniqueness::MaxMatch`] every left and right maximal match is reported.
pub struct MumIter<'f, 'q> {
    finder: &'f MumFinder,
    statistics: MatchingStatistics<'f, 'q>,
    query_hits: Option<FxHashMap<usize, (usize, usize)>>,
    pending: Vec<Anchor>,
    last_end: usize,
    done: bool,
}

impl MumIter<'_, '_> {
    fn is_query_unique(&self, reference_start: usize, length: usize) -> bool {
        self.query_hits.as_ref()
            .and_then(|hits| hits.get(&reference_start))
            .map_or(true, |&(_, second)| second < length)
    }

    /// Queue every maximal match starting at the query position of `found`, walking up
    /// from its interval to enclosing intervals at least the minimum length deep.
    fn queue_maximal_matches(&mut self, found: &QueryMatch) {
        let finder = self.finder;
        let index = &finder.index;
        let query = self.statistics.query;
        let p = found.query_start;

        let is_left_maximal = |r: usize| {
            p == 0 || r == 0 || query[p - 1].to_ascii_uppercase() != index.text[r - 1]
        };

        let mut depth = found.length;
        let mut inner = found.interval.start..found.interval.start;
        let mut interval = found.interval.clone();

        loop {
            for rank in interval.start..inner.start {
                let r = index.suffix_array[rank];
                if is_left_maximal(r) {
                    self.pending.push(Anchor::new(r, p, depth));
                }
            }

            for rank in inner.end..interval.end {
                let r = index.suffix_array[rank];
                if is_left_maximal(r) {
                    self.pending.push(Anchor::new(r, p, depth));
                }
            }

            let parent_depth = index.lcp.value(interval.start).max(index.lcp.value(interval.end));
            if parent_depth < finder.min_length {
                break;
            }

            inner = interval;
            interval = index.interval(inner.start, parent_depth);
            depth = parent_depth;
        }

        self.pending.sort_unstable_by(|a, b| b.reference_start.cmp(&a.reference_start));
    }
}

impl Iterator for MumIter<'_, '_> {
    type Item = Anchor;

    fn next(&mut self) -> Option<Self::Item> {
        let min_length = self.finder.min_length;

        loop {
            if let Some(anchor) = self.pending.pop() {
                return Some(anchor);
            }

            if self.done || self.statistics.position + min_length > self.statistics.query.len() {
                return None;
            }

            let found = self.statistics.next()?;
            if found.length < min_length {
                continue;
            }

            if self.finder.uniqueness == MatchUniqueness::MaxMatch {
                self.queue_maximal_matches(&found);
                continue;
            }

            let end = found.query_start + found.length;
            if found.interval.len() != 1 || end <= self.last_end {
                continue;
            }

            let reference_start = self.finder.index.suffix_array[found.interval.start];
            if !self.is_query_unique(reference_start, found.length) {
                continue;
            }

            self.last_end = end;
            if end == self.statistics.query.len() {
                self.done = true;
            }

            return Some(Anchor::new(reference_start, found.query_start, found.length));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Anchor, MatchUniqueness, MumFinder};
    use crate::errors::AlignError;

    /// Deterministic pseudo-random DNA
    fn random_dna(seed: u64, len: usize) -> Vec<u8> {
        let mut state = seed;

        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                b"ACGT"[((state >> 33) % 4) as usize]
            })
            .collect()
    }

    /// Longest match of every query suffix by comparing against every reference position
    fn unique_matches_by_scan(reference: &[u8], query: &[u8], min_length: usize) -> Vec<Anchor> {
        let mut anchors = Vec::new();
        let mut last_end = 0;

        for p in 0..query.len() {
            if p + min_length > query.len() {
                break;
            }

            let lengths: Vec<usize> = (0..reference.len())
                .map(|r| reference[r..].iter().zip(&query[p..]).take_while(|(a, b)| a == b).count())
                .collect();

            let best = lengths.iter().copied().max().unwrap_or(0);
            let hits: Vec<usize> = (0..reference.len()).filter(|&r| lengths[r] == best).collect();

            if best >= min_length && hits.len() == 1 && p + best > last_end {
                last_end = p + best;
                anchors.push(Anchor::new(hits[0], p, best));

                if last_end == query.len() {
                    break;
                }
            }
        }

        anchors
    }

    #[test]
    fn test_unique_matches() {
        let finder = MumFinder::new(b"ATGCGCATCCCC", 3).unwrap();
        let anchors: Vec<Anchor> = finder.matches(b"CCGCGCCCCCTCAGCT").collect();

        assert_eq!(anchors, vec![
            Anchor::new(3, 1, 3),
            Anchor::new(2, 2, 4),
            Anchor::new(8, 5, 4),
            Anchor::new(8, 6, 4),
        ]);
    }

    #[test]
    fn test_match_reaching_query_end() {
        let finder = MumFinder::new(b"TAGCT", 3).unwrap();
        let anchors: Vec<Anchor> = finder.matches(b"ccgcgcccccTCAGCT").collect();

        assert_eq!(anchors, vec![Anchor::new(1, 12, 4)]);
    }

    #[test]
    fn test_repeats_are_not_unique() {
        let finder = MumFinder::new(b"ACGTTTACGT", 2).unwrap();

        assert_eq!(finder.matches(b"ACGT").count(), 0);
        assert_eq!(finder.matches(b"GTTTA").collect::<Vec<_>>(), vec![Anchor::new(2, 0, 5)]);
    }

    #[test]
    fn test_anchors_match_exactly() {
        let reference = b"TTGACCGATAGGCATTACGGATCCAGTAGCA";
        let query = b"GGCATTACGTTTGACCGAAAGCAGTAGC";
        let finder = MumFinder::new(reference, 4).unwrap();

        for anchor in finder.matches(query) {
            assert!(anchor.length >= 4);
            assert_eq!(
                &reference[anchor.reference_start..anchor.reference_end()],
                &query[anchor.query_start..anchor.query_end()]
            );
        }
    }

    #[test]
    fn test_matches_agree_with_scan() {
        for seed in 1..6 {
            let reference = random_dna(seed, 300);

            let mut query = random_dna(seed + 100, 20);
            query.extend_from_slice(&reference[40..160]);
            query.extend_from_slice(&reference[100..130]);
            query.extend(random_dna(seed + 200, 15));
            query.extend_from_slice(&reference[200..290]);
            for pos in (7..query.len()).step_by(23) {
                query[pos] = if query[pos] == b'A' { b'G' } else { b'A' };
            }

            let finder = MumFinder::new(&reference, 5).unwrap();
            let anchors: Vec<Anchor> = finder.matches(&query).collect();

            assert_eq!(anchors, unique_matches_by_scan(&reference, &query, 5), "seed {seed}");
        }
    }

    #[test]
    fn test_work_is_linear_in_query_length() {
        let reference = random_dna(42, 20_000);
        let mut query = reference.clone();
        for pos in (250..query.len()).step_by(500) {
            query[pos] = if query[pos] == b'C' { b'T' } else { b'C' };
        }

        let finder = MumFinder::new(&reference, 20).unwrap();
        let mut matches = finder.matches(&query);
        let anchors: Vec<Anchor> = matches.by_ref().collect();

        assert_eq!(anchors.len(), 41);
        assert!(anchors.iter().all(|a| a.reference_start == a.query_start));
        assert!(
            matches.statistics.steps <= 2 * query.len(),
            "{} index lookups for {} query symbols",
            matches.statistics.steps,
            query.len()
        );
    }

    #[test]
    fn test_mum_requires_unique_query_match() {
        let reference = b"TTTTTGATTACAGGCCCCC";
        let query = b"AAGATTACAGGAAAAGATTACAGGAA";

        let finder = MumFinder::new(reference, 6).unwrap();
        assert_eq!(
            finder.matches(query).collect::<Vec<_>>(),
            vec![Anchor::new(5, 2, 9), Anchor::new(5, 15, 9)]
        );

        let finder = MumFinder::new(reference, 5).unwrap().with_uniqueness(MatchUniqueness::Mum);
        assert_eq!(finder.uniqueness(), MatchUniqueness::Mum);
        assert_eq!(finder.matches(query).count(), 0);

        let query = b"AAGATTACAGGAAAAGATTCCCCCAA";
        assert_eq!(
            finder.matches(query).collect::<Vec<_>>(),
            vec![Anchor::new(5, 2, 9), Anchor::new(14, 19, 5)]
        );
    }

    #[test]
    fn test_max_match_reports_every_occurrence() {
        let finder = MumFinder::new(b"ACGTTTACGT", 2)
            .unwrap()
            .with_uniqueness(MatchUniqueness::MaxMatch);

        assert_eq!(
            finder.matches(b"ACGT").collect::<Vec<_>>(),
            vec![Anchor::new(0, 0, 4), Anchor::new(6, 0, 4)]
        );

        // "TT" at 3 and "AC" at 0 are shorter maximal matches next to "TTAC" at 4
        assert_eq!(
            finder.matches(b"TTACCC").collect::<Vec<_>>(),
            vec![Anchor::new(3, 0, 2), Anchor::new(4, 0, 4), Anchor::new(0, 2, 2)]
        );
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(MumFinder::new(b"ACGT", 0), Err(AlignError::InvalidLengthOfMum(0))));
        assert!(matches!(
            MumFinder::new(b"AC$GT", 2),
            Err(AlignError::InvalidReferenceSymbol { position: 2 })
        ));
    }
}
