//! Alignment classifier (C9): decides, for one aligned mate, whether it spans
//! a target variant's node bundle, flanks it on either side, bypasses it
//! entirely, or lies inside it, and aggregates per-allele count tables.

use std::collections::BTreeMap;

use graph_align_core::GraphAlignment;
use graph_model::NodeId;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationBucket {
    Spanning,
    Bypassing,
    UpstreamFlanking,
    DownstreamFlanking,
    /// Overlaps the bundle but neither starts upstream nor ends downstream.
    /// Not counted anywhere; kept as a named variant rather than silently
    /// dropped.
    Inside,
}

/// Classifies alignments against one variant's contiguous node bundle
/// `[first_bundle_node, last_bundle_node]` and accumulates per-allele counts.
#[derive(Debug, Clone)]
pub struct AlignmentClassifier {
    first_bundle_node: NodeId,
    last_bundle_node: NodeId,
    upstream_counts: BTreeMap<NodeId, u64>,
    downstream_counts: BTreeMap<NodeId, u64>,
    spanning_counts: BTreeMap<NodeId, u64>,
    bypass_count: u64,
}

impl AlignmentClassifier {
    /// Fails with [`Error::InvalidBundle`] unless `bundle_nodes` is a
    /// non-empty, strictly consecutive ascending run of node ids.
    pub fn new(bundle_nodes: &[NodeId]) -> Result<Self> {
        let Some((&first, rest)) = bundle_nodes.split_first() else {
            return Err(Error::InvalidBundle("node bundle must not be empty".into()));
        };
        let mut previous = first;
        for &node in rest {
            if node != previous + 1 {
                return Err(Error::InvalidBundle(format!(
                    "node bundle must be strictly consecutive ascending ids, got {previous} then {node}"
                )));
            }
            previous = node;
        }

        Ok(Self {
            first_bundle_node: first,
            last_bundle_node: previous,
            upstream_counts: BTreeMap::new(),
            downstream_counts: BTreeMap::new(),
            spanning_counts: BTreeMap::new(),
            bypass_count: 0,
        })
    }

    /// Classifies `alignment` and increments the corresponding count table.
    pub fn classify(&mut self, alignment: &GraphAlignment<'_>) -> ClassificationBucket {
        let mut starts_upstream = false;
        let mut ends_downstream = false;
        let mut target_node_overlapped = None;

        for &node in alignment.path().node_ids() {
            if node < self.first_bundle_node {
                starts_upstream = true;
            }
            if node > self.last_bundle_node {
                ends_downstream = true;
            }
            if target_node_overlapped.is_none()
                && node >= self.first_bundle_node
                && node <= self.last_bundle_node
            {
                target_node_overlapped = Some(node);
            }
        }

        match (starts_upstream, ends_downstream, target_node_overlapped) {
            (true, true, Some(node)) => {
                *self.spanning_counts.entry(node).or_insert(0) += 1;
                ClassificationBucket::Spanning
            }
            (true, true, None) => {
                self.bypass_count += 1;
                ClassificationBucket::Bypassing
            }
            (true, false, overlap) => {
                let node = overlap.unwrap_or(self.first_bundle_node);
                *self.upstream_counts.entry(node).or_insert(0) += 1;
                ClassificationBucket::UpstreamFlanking
            }
            (false, true, overlap) => {
                let node = overlap.unwrap_or(self.last_bundle_node);
                *self.downstream_counts.entry(node).or_insert(0) += 1;
                ClassificationBucket::DownstreamFlanking
            }
            _ => ClassificationBucket::Inside,
        }
    }

    pub fn upstream_counts(&self) -> &BTreeMap<NodeId, u64> {
        &self.upstream_counts
    }

    pub fn downstream_counts(&self) -> &BTreeMap<NodeId, u64> {
        &self.downstream_counts
    }

    pub fn spanning_counts(&self) -> &BTreeMap<NodeId, u64> {
        &self.spanning_counts
    }

    pub fn bypass_count(&self) -> u64 {
        self.bypass_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_align_core::LinearAlignment;
    use graph_model::{Graph, Path};

    fn deletion_graph() -> Graph {
        let mut graph = Graph::new(0);
        graph.add_node("LF", "AAAA").unwrap();
        graph.add_node("DEL", "CCCC").unwrap();
        graph.add_node("RF", "GGGG").unwrap();
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(0, 2).unwrap();
        graph
    }

    fn full_match(graph: &Graph, node_ids: Vec<NodeId>, start: usize, end: usize) -> GraphAlignment<'_> {
        let path = Path::new(graph, start, node_ids.clone(), end).unwrap();
        let alignments = node_ids
            .iter()
            .enumerate()
            .map(|(i, &node)| {
                let node_len = graph.node_seq(node).unwrap().len();
                let s = if i == 0 { start } else { 0 };
                let e = if i == node_ids.len() - 1 { end } else { node_len };
                LinearAlignment::parse(0, &format!("{}M", e - s)).unwrap()
            })
            .collect();
        GraphAlignment::new(path, alignments).unwrap()
    }

    #[test]
    fn rejects_an_empty_bundle() {
        assert!(AlignmentClassifier::new(&[]).is_err());
    }

    #[test]
    fn rejects_a_non_consecutive_bundle() {
        assert!(AlignmentClassifier::new(&[0, 2]).is_err());
    }

    #[test]
    fn a_read_spanning_the_bundle_increments_the_spanning_table() {
        let graph = deletion_graph();
        let mut classifier = AlignmentClassifier::new(&[1]).unwrap();
        let alignment = full_match(&graph, vec![0, 1, 2], 0, 4);
        assert_eq!(classifier.classify(&alignment), ClassificationBucket::Spanning);
        assert_eq!(classifier.spanning_counts().get(&1), Some(&1));
    }

    #[test]
    fn a_read_bypassing_the_bundle_increments_the_scalar_counter() {
        let graph = deletion_graph();
        let mut classifier = AlignmentClassifier::new(&[1]).unwrap();
        let alignment = full_match(&graph, vec![0, 2], 0, 4);
        assert_eq!(classifier.classify(&alignment), ClassificationBucket::Bypassing);
        assert_eq!(classifier.bypass_count(), 1);
    }

    #[test]
    fn a_read_entirely_inside_the_bundle_is_ignored() {
        let graph = deletion_graph();
        let mut classifier = AlignmentClassifier::new(&[1]).unwrap();
        let alignment = full_match(&graph, vec![1], 0, 4);
        assert_eq!(classifier.classify(&alignment), ClassificationBucket::Inside);
        assert!(classifier.spanning_counts().is_empty());
        assert!(classifier.upstream_counts().is_empty());
        assert!(classifier.downstream_counts().is_empty());
        assert_eq!(classifier.bypass_count(), 0);
    }

    #[test]
    fn a_read_entirely_before_the_bundle_still_counts_as_upstream_flanking() {
        let graph = deletion_graph();
        let mut classifier = AlignmentClassifier::new(&[2]).unwrap();
        let alignment = full_match(&graph, vec![0], 0, 4);
        assert_eq!(classifier.classify(&alignment), ClassificationBucket::UpstreamFlanking);
        assert_eq!(classifier.upstream_counts().get(&2), Some(&1));
    }

    #[test]
    fn a_read_entirely_after_the_bundle_still_counts_as_downstream_flanking() {
        let graph = deletion_graph();
        let mut classifier = AlignmentClassifier::new(&[0]).unwrap();
        let alignment = full_match(&graph, vec![2], 0, 4);
        assert_eq!(classifier.classify(&alignment), ClassificationBucket::DownstreamFlanking);
        assert_eq!(classifier.downstream_counts().get(&0), Some(&1));
    }

    #[test]
    fn records_the_first_overlapped_node_when_the_bundle_spans_several() {
        let mut graph = Graph::new(0);
        graph.add_node("LF", "AAAA").unwrap();
        graph.add_node("R1", "CAG").unwrap();
        graph.add_node("R2", "CAG").unwrap();
        graph.add_node("RF", "GGGG").unwrap();
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(2, 3).unwrap();

        let mut classifier = AlignmentClassifier::new(&[1, 2]).unwrap();
        let alignment = full_match(&graph, vec![0, 1, 2, 3], 0, 4);
        classifier.classify(&alignment);
        assert_eq!(classifier.spanning_counts().get(&1), Some(&1));
        assert!(classifier.spanning_counts().get(&2).is_none());
    }
}
