/// An aligned pair of residues. The first element represents the position in the first
/// sequence, the second element the position in the second sequence.
///
/// In case of an insertion or deletion, one of the elements is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair(pub(crate) Option<usize>, pub(crate) Option<usize>);

impl AlignedPair {
    pub fn new(first_pos: Option<usize>, second_pos: Option<usize>) -> Self {
        AlignedPair(first_pos, second_pos)
    }

    #[inline(always)]
    pub fn first_pos(&self) -> Option<usize> {
        self.0
    }

    #[inline(always)]
    pub fn second_pos(&self) -> Option<usize> {
        self.1
    }

    pub fn is_aligned(&self) -> bool {
        self.0.is_some() && self.1.is_some()
    }
}

/// Render two gapped, equal-length sequences as three lines: the first sequence, a match
/// line (`|` identical, `*` mismatch, blank for gaps) and the second sequence.
pub fn print_alignment(first: &[u8], second: &[u8], gap: u8) -> String {
    let aln_chars: Vec<u8> = first.iter()
        .zip(second)
        .map(|(&a, &b)| {
            if a == gap || b == gap {
                b' '
            } else if a.eq_ignore_ascii_case(&b) {
                b'|'
            } else {
                b'*'
            }
        })
        .collect();

    format!(
        "{}\n{}\n{}",
        String::from_utf8_lossy(first),
        String::from_utf8_lossy(&aln_chars),
        String::from_utf8_lossy(second),
    )
}

#[cfg(test)]
mod tests {
    use super::{print_alignment, AlignedPair};

    #[test]
    fn test_print_alignment() {
        let out = print_alignment(b"GCGCATCCCC", b"GCGC--CCAC", b'-');
        assert_eq!(out, "GCGCATCCCC\n||||  ||*|\nGCGC--CCAC");
    }

    #[test]
    fn test_aligned_pair() {
        assert!(AlignedPair::new(Some(1), Some(3)).is_aligned());
        assert!(!AlignedPair::new(None, Some(3)).is_aligned());
        assert_eq!(AlignedPair::new(Some(4), None).first_pos(), Some(4));
    }
}
