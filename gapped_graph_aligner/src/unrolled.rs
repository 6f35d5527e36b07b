//! Unrolls the self-loops of a subgraph reachable from a given start node into
//! an acyclic target sequence, bounded by how many loop passes a query of a
//! given length could plausibly need.

use graph_model::{Graph, NodeId};

/// One position of the unrolled target sequence. `node` and `pass` identify
/// which repeat of the original node this base came from, for mapping a
/// traceback back onto the original [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBase {
    pub node: NodeId,
    pub pass: usize,
    pub base: u8,
}

/// A flattened, acyclic unrolling of the nodes reachable forward from `start`.
/// `predecessors[t]` holds every flat position that may precede target
/// position `t` (1-based; position 0 is the virtual entry before any base).
/// Every position has exactly one predecessor except node-start positions
/// reached from more than one original predecessor instance, where the set
/// can be empty (a free local entry point) or hold several.
pub struct UnrolledGraph {
    pub bases: Vec<TargetBase>,
    pub predecessors: Vec<Vec<usize>>,
}

impl UnrolledGraph {
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Builds the unrolled target reachable forward from `start`, deep enough that
/// a query of length `query_len` could be consumed by repeatedly looping a
/// repeat node.
pub fn unroll_forward(graph: &Graph, start: NodeId, query_len: usize) -> graph_model::Result<UnrolledGraph> {
    let reachable = reachable_from(graph, start)?;
    unroll(graph, start, &reachable, query_len)
}

/// Builds the unrolled target reachable *backward* from `end` (walking
/// predecessors), used by the suffix extension. The resulting bases read in
/// forward (5'->3') order even though traversal walked backward.
pub fn unroll_backward(graph: &Graph, end: NodeId, query_len: usize) -> graph_model::Result<UnrolledGraph> {
    let reverse = graph.reversed();
    let reachable = reachable_from_reverse(&reverse, end)?;
    unroll_reverse(graph, end, &reachable, query_len)
}

fn reachable_from(graph: &Graph, start: NodeId) -> graph_model::Result<Vec<NodeId>> {
    let mut seen = vec![start];
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        for &succ in graph.successors(node)? {
            if succ != node && !seen.contains(&succ) {
                seen.push(succ);
                stack.push(succ);
            }
        }
    }
    seen.sort_unstable();
    Ok(seen)
}

fn reachable_from_reverse(reverse: &graph_model::graph::ReverseGraph, end: NodeId) -> graph_model::Result<Vec<NodeId>> {
    let mut seen = vec![end];
    let mut stack = vec![end];
    while let Some(node) = stack.pop() {
        for &succ in reverse.successors(node)? {
            if succ != node && !seen.contains(&succ) {
                seen.push(succ);
                stack.push(succ);
            }
        }
    }
    seen.sort_unstable();
    Ok(seen)
}

fn repeat_passes(graph: &Graph, node: NodeId, query_len: usize) -> graph_model::Result<usize> {
    if !graph.is_repeat_node(node) {
        return Ok(1);
    }
    let node_len = graph.node_seq(node)?.len().max(1);
    Ok(query_len.div_ceil(node_len) + 1)
}

fn unroll(
    graph: &Graph,
    start: NodeId,
    reachable: &[NodeId],
    query_len: usize,
) -> graph_model::Result<UnrolledGraph> {
    let mut bases = Vec::new();
    let mut predecessors = Vec::new();
    // instances[node] = flat positions of that node's last base, one per pass
    let mut last_positions: std::collections::HashMap<NodeId, Vec<usize>> = std::collections::HashMap::new();

    for &node in reachable {
        let seq = graph.node_seq(node)?.as_bytes();
        let passes = repeat_passes(graph, node, query_len)?;
        let mut this_node_last_positions = Vec::with_capacity(passes);

        let external_predecessor_ends: Vec<usize> = graph
            .predecessors(node)?
            .iter()
            .filter(|&&p| p != node)
            .filter_map(|p| last_positions.get(p))
            .flatten()
            .copied()
            .collect();
        let has_external_predecessor = graph.predecessors(node)?.iter().any(|&p| p != node);
        let is_subgraph_start = node == start;

        let pass_start_preds = if is_subgraph_start {
            Vec::new()
        } else if has_external_predecessor {
            external_predecessor_ends.clone()
        } else {
            Vec::new()
        };

        for pass in 0..passes {
            let mut preds_for_first_base = if pass == 0 {
                pass_start_preds.clone()
            } else {
                vec![*this_node_last_positions.last().unwrap()]
            };

            for (offset, &b) in seq.iter().enumerate() {
                let flat = bases.len();
                bases.push(TargetBase { node, pass, base: b });
                let preds = if offset == 0 {
                    std::mem::take(&mut preds_for_first_base)
                } else {
                    vec![flat - 1]
                };
                predecessors.push(preds);
            }

            if !seq.is_empty() {
                this_node_last_positions.push(bases.len() - 1);
            }
        }

        last_positions.insert(node, this_node_last_positions);
    }

    Ok(UnrolledGraph { bases, predecessors })
}

fn unroll_reverse(
    graph: &Graph,
    end: NodeId,
    reachable: &[NodeId],
    query_len: usize,
) -> graph_model::Result<UnrolledGraph> {
    // Walk in decreasing NodeId order (the reverse graph's topological order)
    // so predecessors-in-the-reverse-graph (== successors in the original) are
    // already built.
    let mut order = reachable.to_vec();
    order.sort_unstable_by(|a, b| b.cmp(a));

    let mut bases = Vec::new();
    let mut predecessors = Vec::new();
    let mut last_positions: std::collections::HashMap<NodeId, Vec<usize>> = std::collections::HashMap::new();

    for &node in &order {
        let seq: Vec<u8> = graph.node_seq(node)?.bytes().rev().collect();
        let passes = repeat_passes(graph, node, query_len)?;
        let mut this_node_last_positions = Vec::with_capacity(passes);

        let successors: Vec<NodeId> = graph.successors(node)?.iter().filter(|&&s| s != node).copied().collect();
        let external_ends: Vec<usize> = successors
            .iter()
            .filter_map(|s| last_positions.get(s))
            .flatten()
            .copied()
            .collect();
        let is_subgraph_start = node == end;

        let pass_start_preds_base = if is_subgraph_start {
            Vec::new()
        } else if !successors.is_empty() {
            external_ends
        } else {
            Vec::new()
        };

        for pass in 0..passes {
            let mut preds_for_first_base = if pass == 0 {
                pass_start_preds_base.clone()
            } else {
                vec![*this_node_last_positions.last().unwrap()]
            };

            for (offset, &b) in seq.iter().enumerate() {
                let flat = bases.len();
                bases.push(TargetBase { node, pass, base: b });
                let preds = if offset == 0 {
                    std::mem::take(&mut preds_for_first_base)
                } else {
                    vec![flat - 1]
                };
                predecessors.push(preds);
            }

            if !seq.is_empty() {
                this_node_last_positions.push(bases.len() - 1);
            }
        }

        last_positions.insert(node, this_node_last_positions);
    }

    Ok(UnrolledGraph { bases, predecessors })
}
