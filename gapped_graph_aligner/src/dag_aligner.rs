//! Pinned DAG aligner (C7): affine-gap DP over an unrolled target built by
//! [`crate::unrolled`]. Four score matrices (`V`, `G`, `E`, `F`) are evaluated
//! per the standard affine-gap recurrences, generalized so each target position
//! may have more than one predecessor at a node boundary. Traceback is a
//! bounded depth-first enumeration of every co-optimal path rather than a
//! single best pointer, since a repeat node's self-loop routinely ties several
//! pass counts against each other.

use graph_align_core::{
    LinearAlignment, Operation, OperationKind, Score,
    score::NMatchPolicy,
};
use graph_model::NodeId;
use log::warn;
use ndarray::Array2;

use crate::unrolled::UnrolledGraph;

/// Default cap on the number of co-optimal alignments [`DagAligner::align`]
/// will enumerate before collapsing further ties and giving up.
pub const DEFAULT_MAX_REPEATS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffineScores {
    pub match_score: i64,
    pub mismatch_score: i64,
    pub gap_open_score: i64,
    pub gap_extend_score: i64,
}

/// Whether the DP's target-start column is free (local alignment) or charges
/// cumulative deletion cost to reach later columns (global to the target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStartPolicy {
    Free,
    Penalized,
}

/// A predecessor reference used by traceback: either the implicit boundary
/// cell (no in-edge, i.e. a fresh local start at this target position) or one
/// of the entries in `target.predecessors[t - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PredRef {
    Boundary,
    Index(usize),
}

/// Which of the three combinators achieved a cell's `v` score; traceback
/// branches over every tied source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VSource {
    Diagonal,
    Deletion,
    Insertion,
}

#[derive(Debug, Clone, Default)]
struct Cell {
    v: Score,
    g: Score,
    e: Score,
    f: Score,
    g_preds: Vec<PredRef>,
    e_preds: Vec<PredRef>,
    v_sources: Vec<VSource>,
}

/// One node-bracketed segment of a DAG-aligner traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSegment {
    pub node: NodeId,
    pub pass: usize,
    pub alignment: LinearAlignment,
}

/// The outcome of one [`DagAligner::align`] call: the best score, the next
/// distinct lower score among candidate endpoints (for tie reporting), and
/// every co-optimal traceback tied at the best score, bounded by `max_repeats`.
#[derive(Debug, Clone)]
pub struct DagAlignmentResult {
    pub best_score: Score,
    pub second_best_score: Option<Score>,
    pub alignments: Vec<Vec<NodeSegment>>,
    pub truncated: bool,
}

/// A reusable DP buffer, one per worker thread: `align` resizes but does not
/// reallocate once a thread's matrices have grown to their working size.
#[derive(Debug, Default)]
pub struct DagAligner {
    matrix: Array2<Cell>,
}

const MIN: Score = Score::MIN;

impl DagAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aligns `query` against `target`, returning the best score, the
    /// second-best score, and every co-optimal traceback (bounded by
    /// `max_repeats`).
    pub fn align(
        &mut self,
        query: &[u8],
        target: &UnrolledGraph,
        scores: AffineScores,
        n_policy: NMatchPolicy,
        start_policy: TargetStartPolicy,
        max_repeats: usize,
    ) -> DagAlignmentResult {
        let rows = query.len() + 1;
        let cols = target.len() + 1;
        if self.matrix.dim() != (rows, cols) {
            self.matrix = Array2::default((rows, cols));
        }

        self.matrix[[0, 0]] = Cell {
            v: Score::ZERO,
            g: MIN,
            e: Score::ZERO,
            f: MIN,
            g_preds: Vec::new(),
            e_preds: Vec::new(),
            v_sources: Vec::new(),
        };

        for t in 1..cols {
            self.matrix[[0, t]] = self.compute_cell(0, t, query, target, scores, n_policy, start_policy);
        }
        for q in 1..rows {
            self.matrix[[q, 0]] = self.compute_cell(q, 0, query, target, scores, n_policy, start_policy);
        }
        for q in 1..rows {
            for t in 1..cols {
                self.matrix[[q, t]] = self.compute_cell(q, t, query, target, scores, n_policy, start_policy);
            }
        }

        let best_score = (0..cols).map(|t| self.matrix[[rows - 1, t]].v).max().unwrap();
        let second_best_score = (0..cols)
            .map(|t| self.matrix[[rows - 1, t]].v)
            .filter(|&v| v < best_score)
            .max();
        let end_points: Vec<usize> = (0..cols).filter(|&t| self.matrix[[rows - 1, t]].v == best_score).collect();

        let mut alignments = Vec::new();
        let mut truncated = false;
        for &t in &end_points {
            let mut current = Vec::new();
            self.collect_paths(
                rows - 1,
                t,
                query,
                target,
                n_policy,
                max_repeats,
                &mut alignments,
                &mut current,
                &mut truncated,
            );
            if alignments.len() >= max_repeats {
                break;
            }
        }

        if truncated {
            warn!(
                "DAG aligner traceback truncated at {max_repeats} co-optimal alignments (score {best_score})"
            );
        }

        DagAlignmentResult {
            best_score,
            second_best_score,
            alignments,
            truncated,
        }
    }

    /// Computes the DP quantities for a single cell from its already-computed
    /// neighbors. `q == 0` excludes the diagonal and insertion sources; `t ==
    /// 0` excludes the diagonal and deletion sources; `(0, 0)` is seeded by the
    /// caller before this is ever invoked.
    #[allow(clippy::too_many_arguments)]
    fn compute_cell(
        &self,
        q: usize,
        t: usize,
        query: &[u8],
        target: &UnrolledGraph,
        scores: AffineScores,
        n_policy: NMatchPolicy,
        start_policy: TargetStartPolicy,
    ) -> Cell {
        let gap_extend = Score::new(scores.gap_extend_score);
        let gap_open_extend = Score::new(scores.gap_open_score + scores.gap_extend_score);

        let (g, g_preds) = if q == 0 || t == 0 {
            (MIN, Vec::new())
        } else {
            let preds = &target.predecessors[t - 1];
            let base = target.bases[t - 1].base;
            let match_score = match_score(query[q - 1], base, scores, n_policy);
            if preds.is_empty() {
                (self.matrix[[q - 1, 0]].v + match_score, vec![PredRef::Boundary])
            } else {
                tied_max(preds.iter().map(|&p| self.matrix[[q - 1, p + 1]].v + match_score))
            }
        };

        let (e, e_preds) = if t == 0 {
            (MIN, Vec::new())
        } else {
            let preds = &target.predecessors[t - 1];
            if preds.is_empty() {
                if q == 0 {
                    let free_entry = match start_policy {
                        TargetStartPolicy::Free => Score::ZERO,
                        TargetStartPolicy::Penalized => gap_open_extend,
                    };
                    (free_entry, vec![PredRef::Boundary])
                } else {
                    (MIN, Vec::new())
                }
            } else {
                tied_max(preds.iter().map(|&p| {
                    let pred_cell = &self.matrix[[q, p + 1]];
                    std::cmp::max(pred_cell.e + gap_extend, pred_cell.v + gap_open_extend)
                }))
            }
        };

        let f = if q == 0 {
            MIN
        } else {
            let up = &self.matrix[[q - 1, t]];
            std::cmp::max(up.f + gap_extend, up.v + gap_open_extend)
        };

        let mut v_sources = Vec::new();
        let mut v = MIN;
        for (score, source) in [(g, VSource::Diagonal), (e, VSource::Deletion), (f, VSource::Insertion)] {
            if score > v {
                v = score;
                v_sources.clear();
                v_sources.push(source);
            } else if score == v && score > MIN {
                v_sources.push(source);
            }
        }

        Cell { v, g, e, f, g_preds, e_preds, v_sources }
    }

    /// Depth-first enumeration of every co-optimal traceback starting at
    /// `(q, t)`. Stops adding to `out` once it reaches `max_repeats`, setting
    /// `truncated`. Identical segment sequences reached via different tie
    /// branches are collapsed.
    #[allow(clippy::too_many_arguments)]
    fn collect_paths(
        &self,
        q: usize,
        t: usize,
        query: &[u8],
        target: &UnrolledGraph,
        n_policy: NMatchPolicy,
        max_repeats: usize,
        out: &mut Vec<Vec<NodeSegment>>,
        current: &mut Vec<(NodeId, usize, OperationKind)>,
        truncated: &mut bool,
    ) {
        if out.len() >= max_repeats {
            *truncated = true;
            return;
        }
        if q == 0 && t == 0 {
            let segments = assemble_segments(current);
            if !out.contains(&segments) {
                out.push(segments);
            }
            return;
        }

        let cell = &self.matrix[[q, t]];
        let sources = cell.v_sources.clone();
        let g_preds = cell.g_preds.clone();
        let e_preds = cell.e_preds.clone();

        for source in sources {
            match source {
                VSource::Diagonal => {
                    let base = target.bases[t - 1];
                    let kind = if n_policy.bases_match(query[q - 1], base.base) {
                        OperationKind::Match
                    } else {
                        OperationKind::Mismatch
                    };
                    for pred in &g_preds {
                        let (nq, nt) = match pred {
                            PredRef::Boundary => (q - 1, 0),
                            PredRef::Index(i) => (q - 1, target.predecessors[t - 1][*i] + 1),
                        };
                        current.push((base.node, base.pass, kind));
                        self.collect_paths(nq, nt, query, target, n_policy, max_repeats, out, current, truncated);
                        current.pop();
                        if out.len() >= max_repeats {
                            *truncated = true;
                            return;
                        }
                    }
                }
                VSource::Deletion => {
                    let base = target.bases[t - 1];
                    for pred in &e_preds {
                        let (nq, nt) = match pred {
                            PredRef::Boundary => (q, 0),
                            PredRef::Index(i) => (q, target.predecessors[t - 1][*i] + 1),
                        };
                        current.push((base.node, base.pass, OperationKind::Deletion));
                        self.collect_paths(nq, nt, query, target, n_policy, max_repeats, out, current, truncated);
                        current.pop();
                        if out.len() >= max_repeats {
                            *truncated = true;
                            return;
                        }
                    }
                }
                VSource::Insertion => {
                    if t == 0 {
                        current.push((LEADING_INSERTION_NODE, 0, OperationKind::Insertion));
                    } else {
                        let base = target.bases[t - 1];
                        current.push((base.node, base.pass, OperationKind::Insertion));
                    }
                    self.collect_paths(q - 1, t, query, target, n_policy, max_repeats, out, current, truncated);
                    current.pop();
                    if out.len() >= max_repeats {
                        *truncated = true;
                        return;
                    }
                }
            }
        }
    }
}

/// Sentinel node id used to tag insertions encountered before the traceback
/// has entered any real node (`t` still 0); dropped during assembly and
/// folded into the first real segment as a leading softclip-free insertion.
const LEADING_INSERTION_NODE: NodeId = usize::MAX;

/// Turns a flat, reverse-order (end-to-start) op trace into node-bracketed
/// segments in genomic order, merging consecutive same-kind ops.
fn assemble_segments(current: &[(NodeId, usize, OperationKind)]) -> Vec<NodeSegment> {
    let mut ops_by_segment: Vec<(NodeId, usize, Vec<Operation>)> = Vec::new();
    let mut leading_insertions = 0usize;

    for &(node, pass, kind) in current.iter().rev() {
        if node == LEADING_INSERTION_NODE {
            leading_insertions += 1;
            continue;
        }
        match ops_by_segment.last_mut() {
            Some((last_node, last_pass, ops)) if *last_node == node && *last_pass == pass => {
                match ops.last_mut() {
                    Some(last_op) if last_op.kind == kind => last_op.length += 1,
                    _ => ops.push(Operation { kind, length: 1 }),
                }
            }
            _ => {
                let mut ops = Vec::new();
                if leading_insertions > 0 {
                    ops.push(Operation { kind: OperationKind::Insertion, length: leading_insertions });
                    leading_insertions = 0;
                }
                ops.push(Operation { kind, length: 1 });
                ops_by_segment.push((node, pass, ops));
            }
        }
    }

    ops_by_segment
        .into_iter()
        .map(|(node, pass, ops)| NodeSegment {
            node,
            pass,
            alignment: LinearAlignment::new(0, ops).expect("traceback always yields a valid alignment"),
        })
        .collect()
}

fn match_score(query_base: u8, target_base: u8, scores: AffineScores, n_policy: NMatchPolicy) -> Score {
    Score::new(if n_policy.bases_match(query_base, target_base) {
        scores.match_score
    } else {
        scores.mismatch_score
    })
}

/// Folds an iterator of scores into the maximum value plus the indices (in
/// iteration order) that tie it.
fn tied_max(scores: impl Iterator<Item = Score>) -> (Score, Vec<PredRef>) {
    let mut best = MIN;
    let mut ties = Vec::new();
    for (i, score) in scores.enumerate() {
        if score > best {
            best = score;
            ties.clear();
            ties.push(PredRef::Index(i));
        } else if score == best {
            ties.push(PredRef::Index(i));
        }
    }
    (best, ties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unrolled::unroll_forward;
    use graph_model::Graph;

    fn str_graph(left: &str, repeat: &str, right: &str) -> Graph {
        let mut graph = Graph::new(0);
        let l = graph.add_node("left", left).unwrap();
        let r = graph.add_node("repeat", repeat).unwrap();
        let right_id = graph.add_node("right", right).unwrap();
        graph.add_edge(l, r).unwrap();
        graph.mark_repeat_node(r).unwrap();
        graph.add_edge(r, r).unwrap();
        graph.add_edge(r, right_id).unwrap();
        graph
    }

    #[test]
    fn walks_the_repeat_node_twice_for_a_doubled_query() {
        let graph = str_graph("G", "TCC", "AAAAA");
        let unrolled = unroll_forward(&graph, 0, 8).unwrap();
        let mut aligner = DagAligner::new();
        let scores = AffineScores {
            match_score: 1,
            mismatch_score: -1,
            gap_open_score: 0,
            gap_extend_score: -2,
        };
        let result = aligner.align(
            b"TCCTCCAA",
            &unrolled,
            scores,
            NMatchPolicy::Neither,
            TargetStartPolicy::Penalized,
            DEFAULT_MAX_REPEATS,
        );
        assert_eq!(result.best_score.as_i64(), 6, "score was {}", result.best_score);
        assert!(!result.alignments.is_empty());
        let repeat_passes: std::collections::HashSet<_> = result.alignments[0]
            .iter()
            .filter(|s| s.node == 1)
            .map(|s| s.pass)
            .collect();
        assert!(repeat_passes.len() >= 2, "expected at least two repeat passes, got {repeat_passes:?}");
    }

    #[test]
    fn matches_the_affine_scoring_example() {
        let mut graph = Graph::new(0);
        let target = graph.add_node("target", "TGCAGTCCCGCCCCGTCCC").unwrap();
        let unrolled = unroll_forward(&graph, target, 18).unwrap();
        let mut aligner = DagAligner::new();
        let scores = AffineScores {
            match_score: 5,
            mismatch_score: -4,
            gap_open_score: 0,
            gap_extend_score: -8,
        };
        let result = aligner.align(
            b"tgCccgcCCcCCCCcccC".to_ascii_uppercase().as_slice(),
            &unrolled,
            scores,
            NMatchPolicy::Neither,
            TargetStartPolicy::Free,
            DEFAULT_MAX_REPEATS,
        );
        assert_eq!(result.best_score.as_i64(), 37);
    }
}
