//! Gapped graph aligner pipeline (C8): seed search against a [`KmerIndex`],
//! seed-affix trimming, prefix/suffix extension through the affine DAG
//! aligner, and stitching into one [`GraphAlignment`] per co-optimal result.

use graph_align_core::{GraphAlignment, LinearAlignment, Operation, OperationKind, Score, score::NMatchPolicy};
use graph_model::{Graph, Path};
use kmer_index::KmerIndex;
use log::debug;

use crate::{
    dag_aligner::{AffineScores, DagAligner, DEFAULT_MAX_REPEATS, NodeSegment, TargetStartPolicy},
    error::{Error, Result},
    unrolled::{unroll_backward, unroll_forward},
};

#[derive(Debug, Clone, Copy)]
pub struct HeuristicParameters {
    pub kmer_len: usize,
    pub seed_affix_trim_length: usize,
    pub scores: AffineScores,
    pub n_match_policy: NMatchPolicy,
    /// Bound on the number of co-optimal DAG-aligner tracebacks enumerated per
    /// prefix/suffix extension; see [`crate::dag_aligner::DEFAULT_MAX_REPEATS`].
    pub max_repeats: usize,
}

impl HeuristicParameters {
    pub fn with_default_max_repeats(
        kmer_len: usize,
        seed_affix_trim_length: usize,
        scores: AffineScores,
        n_match_policy: NMatchPolicy,
    ) -> Self {
        Self {
            kmer_len,
            seed_affix_trim_length,
            scores,
            n_match_policy,
            max_repeats: DEFAULT_MAX_REPEATS,
        }
    }
}

/// One read aligned against the graph, found by seeding then extending.
pub struct GappedAligner {
    dag_aligner: DagAligner,
}

impl GappedAligner {
    pub fn new() -> Self {
        Self {
            dag_aligner: DagAligner::new(),
        }
    }

    /// Aligns `read` against `graph`. Returns an empty vector rather than an
    /// error when no usable seed exists (`NoSeed`): the read simply does not
    /// align to this locus.
    pub fn align<'g>(
        &mut self,
        graph: &'g Graph,
        index: &KmerIndex<'g>,
        read: &[u8],
        params: HeuristicParameters,
    ) -> Result<Vec<GraphAlignment<'g>>> {
        let Some((seed_path, seed_start_in_read)) = find_seed(index, read, params.kmer_len)? else {
            debug!("no seed found for read of length {}", read.len());
            return Ok(Vec::new());
        };

        let trimmed = trim_seed(seed_path, params.seed_affix_trim_length)?;
        let seed_alignments = seed_node_spans(graph, &trimmed)?
            .into_iter()
            .map(|span| LinearAlignment::new(0, vec![Operation { kind: OperationKind::Match, length: span }]))
            .collect::<graph_align_core::Result<Vec<_>>>()?;
        let seed_alignment = GraphAlignment::new(trimmed, seed_alignments)?;

        let prefix = &read[..seed_start_in_read];
        let suffix_start = seed_start_in_read + params.kmer_len;
        let suffix = if suffix_start < read.len() { &read[suffix_start..] } else { &[] };

        let suffix_options = self.extend_suffix(graph, &seed_alignment, suffix, params)?;
        debug!("{} co-optimal suffix extension(s)", suffix_options.len());

        let mut combined = Vec::new();
        for (suffix_score, with_suffix) in &suffix_options {
            let prefix_options = self.extend_prefix(graph, with_suffix, prefix, params)?;
            debug!("{} co-optimal prefix extension(s)", prefix_options.len());
            for (prefix_score, with_prefix) in prefix_options {
                combined.push((*suffix_score + prefix_score, with_prefix));
            }
        }

        let Some(best) = combined.iter().map(|(score, _)| *score).max() else {
            return Ok(Vec::new());
        };
        let mut results: Vec<GraphAlignment<'g>> = combined
            .into_iter()
            .filter(|(score, _)| *score == best)
            .map(|(_, alignment)| alignment)
            .collect();
        results.sort();
        results.dedup();
        debug!("retained {} co-optimal alignment(s) at score {best}", results.len());
        Ok(results)
    }

    /// Every co-optimal way to extend `seed`'s suffix, paired with the DAG
    /// score it contributed (uniform across the set, since all are tied).
    fn extend_suffix<'g>(
        &mut self,
        graph: &'g Graph,
        seed: &GraphAlignment<'g>,
        suffix: &[u8],
        params: HeuristicParameters,
    ) -> Result<Vec<(Score, GraphAlignment<'g>)>> {
        if suffix.is_empty() {
            return Ok(vec![(Score::ZERO, seed.clone())]);
        }
        let target = unroll_forward(graph, seed.path().last_node(), suffix.len())?;
        let result = self.dag_aligner.align(
            suffix,
            &target,
            params.scores,
            params.n_match_policy,
            TargetStartPolicy::Free,
            params.max_repeats,
        );
        result
            .alignments
            .into_iter()
            .map(|segments| stitch_suffix(seed, segments).map(|a| (result.best_score, a)))
            .collect()
    }

    /// Every co-optimal way to extend `seed`'s prefix, paired with the DAG
    /// score it contributed.
    fn extend_prefix<'g>(
        &mut self,
        graph: &'g Graph,
        seed: &GraphAlignment<'g>,
        prefix: &[u8],
        params: HeuristicParameters,
    ) -> Result<Vec<(Score, GraphAlignment<'g>)>> {
        if prefix.is_empty() {
            return Ok(vec![(Score::ZERO, seed.clone())]);
        }
        let reversed_prefix: Vec<u8> = prefix.iter().rev().copied().collect();
        let target = unroll_backward(graph, seed.path().first_node(), reversed_prefix.len())?;
        let result = self.dag_aligner.align(
            &reversed_prefix,
            &target,
            params.scores,
            params.n_match_policy,
            TargetStartPolicy::Free,
            params.max_repeats,
        );
        result
            .alignments
            .into_iter()
            .map(|segments| stitch_prefix(seed, segments).map(|a| (result.best_score, a)))
            .collect()
    }
}

impl Default for GappedAligner {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds a k-mer window of `read` with a unique graph location, or else the
/// window with the fewest (but nonzero) candidate locations. Returns the
/// matched [`Path`] and the read offset the window started at.
fn find_seed<'g>(
    index: &KmerIndex<'g>,
    read: &[u8],
    k: usize,
) -> Result<Option<(Path<'g>, usize)>> {
    if read.len() < k {
        return Ok(None);
    }

    let mut best: Option<(usize, usize, Path<'g>)> = None; // (path_count, read_offset, path)
    for (offset, window) in read.windows(k).enumerate() {
        let Ok(kmer) = std::str::from_utf8(window) else {
            continue;
        };
        let candidates = index.paths(kmer);
        if candidates.is_empty() {
            continue;
        }
        if candidates.len() == 1 {
            return Ok(Some((candidates[0].clone(), offset)));
        }
        let is_better = match &best {
            Some((count, _, _)) => candidates.len() < *count,
            None => true,
        };
        if is_better {
            best = Some((candidates.len(), offset, candidates[0].clone()));
        }
    }

    Ok(best.map(|(_, offset, path)| (path, offset)))
}

/// The per-node span lengths a seed path covers, in path order: the whole
/// node length except for the first and last, which may be partial.
fn seed_node_spans(graph: &Graph, path: &Path) -> Result<Vec<usize>> {
    let node_ids = path.node_ids();
    let mut spans = Vec::with_capacity(node_ids.len());
    for (i, &node) in node_ids.iter().enumerate() {
        let node_len = graph.node_seq(node)?.len();
        let start = if i == 0 { path.start_offset() } else { 0 };
        let end = if i == node_ids.len() - 1 { path.end_offset() } else { node_len };
        spans.push(end - start);
    }
    Ok(spans)
}

/// Trims `trim` bases off each end of the seed, provided the seed is long
/// enough to survive it; otherwise the seed is kept untrimmed.
fn trim_seed<'g>(seed: Path<'g>, trim: usize) -> Result<Path<'g>> {
    if trim == 0 {
        return Ok(seed);
    }
    let len = seed.len()?;
    if len <= trim * 2 {
        return Ok(seed);
    }
    let mut trimmed = seed;
    trimmed.shrink_start_by(trim)?;
    trimmed.shrink_end_by(trim)?;
    Ok(trimmed)
}

/// Appends `segments` (in increasing-query order) onto the end of `seed`'s
/// path and alignments. Each [`NodeSegment`] becomes its own path node, since
/// the DP never revisits a node's target range once left. The unrolled target
/// always re-includes the seed's own last node fresh from its own start, so a
/// segment landing back on that node is a genuine earlier or later pass of it
/// (e.g. another loop of a repeat), not a duplicate of the seed's own
/// alignment there: `extend_suffix`/`extend_prefix` only run the DP at all
/// when there is a non-empty suffix/prefix to place, so every segment they
/// return carries real query content and is kept. `extend_end_node_to` always
/// opens the new node at `end_offset` zero; only the very last segment in the
/// chain may cover less than the whole node, so its end is moved out to the
/// segment's own reference length on every iteration (a no-op span-wise for
/// every earlier segment, which stops being the path's last node once a
/// later one is appended).
fn stitch_suffix<'g>(seed: &GraphAlignment<'g>, segments: Vec<NodeSegment>) -> Result<GraphAlignment<'g>> {
    let mut path = seed.path().clone();
    let mut alignments = seed.alignments().to_vec();

    for seg in segments {
        let seg_len = seg.alignment.reference_length();
        path = path.extend_end_node_to(seg.node)?;
        path.move_end_by(seg_len as isize)?;
        alignments.push(seg.alignment);
    }

    GraphAlignment::new(path, alignments).map_err(Error::from)
}

/// Prepends `segments` (in closest-to-seed-first order, as produced by
/// aligning the reversed prefix) onto the start of `seed`'s path and
/// alignments, reversing each segment's operations back into genomic order.
/// See [`stitch_suffix`] for why every returned segment is kept.
/// `extend_start_node_to` always opens the new node at `start_offset` zero,
/// i.e. covering it in full; the last segment in the chain (the farthest from
/// the seed) may instead cover only its tail, the part nearest its successor,
/// so its start is moved in to `node_len - seg_len` on every iteration.
fn stitch_prefix<'g>(seed: &GraphAlignment<'g>, segments: Vec<NodeSegment>) -> Result<GraphAlignment<'g>> {
    let mut path = seed.path().clone();
    let mut alignments = seed.alignments().to_vec();

    for seg in segments {
        let forward_alignment = seg.alignment.reverse(seg.alignment.reference_length()).map_err(Error::from)?;
        let seg_len = forward_alignment.reference_length();
        path = path.extend_start_node_to(seg.node)?;
        let node_len = path.graph().node_seq(seg.node)?.len();
        path.move_start_by((node_len - seg_len) as isize)?;
        alignments.insert(0, forward_alignment);
    }

    GraphAlignment::new(path, alignments).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_graph() -> Graph {
        let mut graph = Graph::new(0);
        graph.add_node("left", "GATTACAGATTACA").unwrap();
        graph.add_node("repeat", "CAG").unwrap();
        graph.add_node("right", "TTTTACGGGCATTA").unwrap();
        graph.add_edge(0, 1).unwrap();
        graph.mark_repeat_node(1).unwrap();
        graph.add_edge(1, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph
    }

    fn scores() -> AffineScores {
        AffineScores {
            match_score: 2,
            mismatch_score: -3,
            gap_open_score: -2,
            gap_extend_score: -1,
        }
    }

    #[test]
    fn finds_a_seed_and_produces_a_non_empty_alignment() {
        let graph = str_graph();
        let index = KmerIndex::build(&graph, 6).unwrap();
        let read = b"ATTACAGATTACACAGCAGTTTTACGGGC";
        let mut aligner = GappedAligner::new();
        let params = HeuristicParameters {
            kmer_len: 6,
            seed_affix_trim_length: 2,
            scores: scores(),
            n_match_policy: NMatchPolicy::Neither,
            max_repeats: DEFAULT_MAX_REPEATS,
        };
        let results = aligner.align(&graph, &index, read, params).unwrap();
        assert!(!results.is_empty());
        assert!(results[0].query_length() > 0);
    }

    #[test]
    fn a_read_with_no_shared_kmer_produces_no_alignment() {
        let graph = str_graph();
        let index = KmerIndex::build(&graph, 8).unwrap();
        let read = b"GGGGGGGGGGGGGGGGGGGG";
        let mut aligner = GappedAligner::new();
        let params = HeuristicParameters {
            kmer_len: 8,
            seed_affix_trim_length: 0,
            scores: scores(),
            n_match_policy: NMatchPolicy::Neither,
            max_repeats: DEFAULT_MAX_REPEATS,
        };
        let results = aligner.align(&graph, &index, read, params).unwrap();
        assert!(results.is_empty());
    }
}
