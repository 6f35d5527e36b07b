//! In-repeat read-pair detector (C10): recovers read pairs whose mates fail
//! to align to the graph because they consist entirely of repeat motif
//! copies, by tiling cyclic rotations of the motif (and its reverse
//! complement) against the read and measuring coverage.

use gapped_graph_aligner::reverse_complement;

/// Default fraction of a read's bases a tiled motif must cover for the read
/// to be called in-repeat: high enough to reject random sequence, low enough
/// that a handful of sequencing errors in an otherwise pure expansion still
/// passes.
pub const DEFAULT_MIN_COVERAGE_FRACTION: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct IrrFinder {
    motif: String,
    min_coverage_fraction: f64,
}

impl IrrFinder {
    pub fn new(motif: impl Into<String>, min_coverage_fraction: f64) -> Self {
        Self {
            motif: motif.into(),
            min_coverage_fraction,
        }
    }

    pub fn motif(&self) -> &str {
        &self.motif
    }

    /// Whether `sequence` is covered by a tiling of some cyclic rotation of
    /// the motif or its reverse complement, past the configured threshold.
    pub fn is_in_repeat(&self, sequence: &[u8]) -> bool {
        if sequence.is_empty() || self.motif.is_empty() {
            return false;
        }
        best_coverage_fraction(sequence, self.motif.as_bytes()) >= self.min_coverage_fraction
    }

    /// Whether both mates of a pair are individually in-repeat.
    pub fn is_in_repeat_pair(&self, mate1: &[u8], mate2: &[u8]) -> bool {
        self.is_in_repeat(mate1) && self.is_in_repeat(mate2)
    }
}

fn best_coverage_fraction(sequence: &[u8], motif: &[u8]) -> f64 {
    candidate_patterns(motif)
        .iter()
        .map(|pattern| coverage_fraction(sequence, pattern))
        .fold(0.0, f64::max)
}

/// Every cyclic rotation of `motif` and of its reverse complement, deduped.
fn candidate_patterns(motif: &[u8]) -> Vec<Vec<u8>> {
    let rc = reverse_complement(motif);
    let mut patterns: Vec<Vec<u8>> = Vec::new();
    for base in [motif, rc.as_slice()] {
        for i in 0..base.len() {
            let mut rotated = base[i..].to_vec();
            rotated.extend_from_slice(&base[..i]);
            if !patterns.contains(&rotated) {
                patterns.push(rotated);
            }
        }
    }
    patterns
}

/// Best fraction of `sequence` matched by an infinite tiling of `pattern`,
/// maximized over the tiling's phase.
fn coverage_fraction(sequence: &[u8], pattern: &[u8]) -> f64 {
    if pattern.is_empty() {
        return 0.0;
    }
    let best_matches = (0..pattern.len())
        .map(|phase| {
            sequence
                .iter()
                .enumerate()
                .filter(|&(i, &b)| b.eq_ignore_ascii_case(&pattern[(i + phase) % pattern.len()]))
                .count()
        })
        .max()
        .unwrap_or(0);
    best_matches as f64 / sequence.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_pure_repeat_expansion_passes() {
        let finder = IrrFinder::new("CAG", DEFAULT_MIN_COVERAGE_FRACTION);
        assert!(finder.is_in_repeat(b"CAGCAGCAGCAGCAGCAGCAG"));
    }

    #[test]
    fn a_rotated_tiling_still_passes() {
        let finder = IrrFinder::new("CAG", DEFAULT_MIN_COVERAGE_FRACTION);
        assert!(finder.is_in_repeat(b"AGCAGCAGCAGCAGCAGCAGC"));
    }

    #[test]
    fn the_reverse_complement_tiling_passes() {
        let finder = IrrFinder::new("CAG", DEFAULT_MIN_COVERAGE_FRACTION);
        assert!(finder.is_in_repeat(b"CTGCTGCTGCTGCTGCTGCTG"));
    }

    #[test]
    fn random_sequence_fails() {
        let finder = IrrFinder::new("CAG", DEFAULT_MIN_COVERAGE_FRACTION);
        assert!(!finder.is_in_repeat(b"ATTACAGATTACAGGATTACA"));
    }

    #[test]
    fn a_pair_is_in_repeat_only_if_both_mates_pass() {
        let finder = IrrFinder::new("CAG", DEFAULT_MIN_COVERAGE_FRACTION);
        let repeat = b"CAGCAGCAGCAGCAGCAGCAG";
        let random = b"ATTACAGATTACAGGATTACA";
        assert!(finder.is_in_repeat_pair(repeat, repeat));
        assert!(!finder.is_in_repeat_pair(repeat, random));
    }
}
