//! Orientation predictor (`4.9`): decides whether a read should be aligned as
//! given or reverse-complemented against a locus graph, by a k-mer vote
//! against the graph's [`kmer_index::KmerIndex`] built once per orientation.

use kmer_index::KmerIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Original,
    ReverseComplement,
    DoesNotAlign,
}

/// Counts how many overlapping length-`k` windows of `read` are present in
/// `index`, used as the vote weight for one orientation.
pub fn count_kmer_matches(index: &KmerIndex, read: &[u8], k: usize) -> usize {
    if read.len() < k {
        return 0;
    }
    read.windows(k)
        .filter_map(|window| std::str::from_utf8(window).ok())
        .filter(|window| index.contains(window))
        .count()
}

/// Predicts the orientation of `read` against a graph's k-mer index: counts
/// how many of the read's own k-mers are present in `index` against how many
/// of its reverse complement's k-mers are. A read whose best vote does not
/// reach `min_kmer_matches_to_pass` does not align at all.
pub fn predict_orientation(
    index: &KmerIndex,
    read: &[u8],
    k: usize,
    min_kmer_matches_to_pass: usize,
) -> Orientation {
    let forward_votes = count_kmer_matches(index, read, k);
    let reverse_complement = reverse_complement(read);
    let reverse_votes = count_kmer_matches(index, &reverse_complement, k);

    if forward_votes < min_kmer_matches_to_pass && reverse_votes < min_kmer_matches_to_pass {
        Orientation::DoesNotAlign
    } else if forward_votes >= reverse_votes {
        Orientation::Original
    } else {
        Orientation::ReverseComplement
    }
}

/// Reverse-complements a DNA sequence; any byte other than `ACGTacgt` maps to
/// `N`, which is its own complement.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        _ => b'N',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_complement_is_involutive() {
        let seq = b"ACGTN";
        let rc = reverse_complement(seq);
        assert_eq!(rc, b"NACGT");
        assert_eq!(reverse_complement(&rc), seq);
    }

    #[test]
    fn reverse_complement_maps_unknown_bases_to_n() {
        assert_eq!(reverse_complement(b"ACGW"), b"NCGT");
    }
}
