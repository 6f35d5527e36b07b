//! `GraphAlignment` (C4): a [`Path`] plus one [`LinearAlignment`] per node on
//! that path.

use graph_model::{Graph, NodeId, Path};

use crate::{
    cigar::{LinearAlignment, Operation, OperationKind},
    error::{Error, Result},
};

#[derive(Debug, Clone)]
pub struct GraphAlignment<'graph> {
    path: Path<'graph>,
    alignments: Vec<LinearAlignment>,
}

impl<'graph> GraphAlignment<'graph> {
    /// Validates that each per-node alignment's reference span equals the
    /// path's overlap length on that node before accepting the pair.
    pub fn new(path: Path<'graph>, alignments: Vec<LinearAlignment>) -> Result<Self> {
        if path.node_ids().len() != alignments.len() {
            return Err(Error::AlignmentInconsistent(format!(
                "path has {} nodes but {} per-node alignments were given",
                path.node_ids().len(),
                alignments.len()
            )));
        }

        for (i, &node) in path.node_ids().iter().enumerate() {
            let node_len = path.graph().node_seq(node)?.len();
            let start = if i == 0 { path.start_offset() } else { 0 };
            let end = if i == path.node_ids().len() - 1 {
                path.end_offset()
            } else {
                node_len
            };
            let expected_span = end - start;
            if alignments[i].reference_length() != expected_span {
                return Err(Error::AlignmentInconsistent(format!(
                    "node {node} overlap length {expected_span} disagrees with alignment reference length {}",
                    alignments[i].reference_length()
                )));
            }
        }

        Ok(Self { path, alignments })
    }

    pub fn path(&self) -> &Path<'graph> {
        &self.path
    }

    pub fn alignments(&self) -> &[LinearAlignment] {
        &self.alignments
    }

    pub fn graph(&self) -> &'graph Graph {
        self.path.graph()
    }

    pub fn query_length(&self) -> usize {
        self.alignments.iter().map(LinearAlignment::query_length).sum()
    }

    pub fn reference_length(&self) -> usize {
        self.alignments.iter().map(LinearAlignment::reference_length).sum()
    }

    pub fn num_matches(&self) -> usize {
        self.alignments.iter().map(|a| a.counters().matched).sum()
    }

    pub fn overlaps_node(&self, id: NodeId) -> bool {
        self.path.node_ids().contains(&id)
    }

    pub fn indexes_of_node(&self, id: NodeId) -> Vec<usize> {
        self.path
            .node_ids()
            .iter()
            .enumerate()
            .filter(|(_, &n)| n == id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Removes `k` reference bases from the start by soft-clipping the query
    /// bases that aligned to them and trimming the path to match.
    pub fn shrink_start(&self, k: usize) -> Result<Self> {
        if k == 0 {
            return Ok(self.clone());
        }

        let mut remaining = k;
        let mut softclip_len = 0usize;
        let mut first_keep = None;
        let mut first_suffix = None;

        for (i, alignment) in self.alignments.iter().enumerate() {
            let ref_len = alignment.reference_length();
            if remaining >= ref_len {
                softclip_len += alignment.query_length();
                remaining -= ref_len;
                continue;
            }
            if remaining > 0 {
                let (prefix, suffix) = alignment.split_at_reference_position(remaining)?;
                softclip_len += prefix.query_length();
                first_suffix = Some(suffix);
            }
            first_keep = Some(i);
            break;
        }

        let first_keep = first_keep
            .ok_or_else(|| Error::AlignmentInconsistent("shrink_start exceeds alignment length".into()))?;

        let base = first_suffix.unwrap_or_else(|| self.alignments[first_keep].clone());
        let mut ops = Vec::new();
        if softclip_len > 0 {
            ops.push(Operation {
                kind: OperationKind::Softclip,
                length: softclip_len,
            });
        }
        ops.extend(base.operations().iter().copied());

        let mut new_alignments = vec![LinearAlignment::new(0, ops)?];
        new_alignments.extend(self.alignments[first_keep + 1..].iter().cloned());

        let mut new_path = self.path.clone();
        new_path.shrink_start_by(k)?;

        Self::new(new_path, new_alignments)
    }

    /// Removes `k` reference bases from the end by soft-clipping the query
    /// bases that aligned to them and trimming the path to match.
    pub fn shrink_end(&self, k: usize) -> Result<Self> {
        if k == 0 {
            return Ok(self.clone());
        }

        let mut remaining = k;
        let mut softclip_len = 0usize;
        let mut last_keep = None;
        let mut last_prefix = None;

        for (i, alignment) in self.alignments.iter().enumerate().rev() {
            let ref_len = alignment.reference_length();
            if remaining >= ref_len {
                softclip_len += alignment.query_length();
                remaining -= ref_len;
                continue;
            }
            if remaining > 0 {
                let split_at = ref_len - remaining;
                let (prefix, suffix) = alignment.split_at_reference_position(split_at)?;
                softclip_len += suffix.query_length();
                last_prefix = Some(prefix);
            }
            last_keep = Some(i);
            break;
        }

        let last_keep = last_keep
            .ok_or_else(|| Error::AlignmentInconsistent("shrink_end exceeds alignment length".into()))?;

        let base = last_prefix.unwrap_or_else(|| self.alignments[last_keep].clone());
        let mut ops: Vec<Operation> = base.operations().to_vec();
        if softclip_len > 0 {
            ops.push(Operation {
                kind: OperationKind::Softclip,
                length: softclip_len,
            });
        }

        let mut new_alignments = self.alignments[..last_keep].to_vec();
        new_alignments.push(LinearAlignment::new(base.reference_start(), ops)?);

        let mut new_path = self.path.clone();
        new_path.shrink_end_by(k)?;

        Self::new(new_path, new_alignments)
    }

    /// Emits `nodeId[perNodeCigar]...` for every node on the path, in order.
    pub fn generate_cigar(&self) -> String {
        let mut s = String::new();
        for (node, alignment) in self.path.node_ids().iter().zip(&self.alignments) {
            s.push_str(&node.to_string());
            s.push('[');
            s.push_str(&alignment.generate_cigar());
            s.push(']');
        }
        s
    }
}

impl PartialEq for GraphAlignment<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.path.node_ids() == other.path.node_ids()
            && self.path.start_offset() == other.path.start_offset()
            && self.path.end_offset() == other.path.end_offset()
            && self.alignments == other.alignments
    }
}
impl Eq for GraphAlignment<'_> {}

impl PartialOrd for GraphAlignment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order by path (node list, then offsets) then by per-node alignments'
/// CIGAR text; used to deduplicate co-optimal alignments.
impl Ord for GraphAlignment<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path
            .node_ids()
            .cmp(other.path.node_ids())
            .then_with(|| self.path.start_offset().cmp(&other.path.start_offset()))
            .then_with(|| self.path.end_offset().cmp(&other.path.end_offset()))
            .then_with(|| {
                self.alignments
                    .iter()
                    .map(LinearAlignment::generate_cigar)
                    .cmp(other.alignments.iter().map(LinearAlignment::generate_cigar))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_model::Graph;

    fn small_graph() -> Graph {
        let mut graph = Graph::new(0);
        graph.add_node("a", "ACGT").unwrap();
        graph.add_node("b", "GGCC").unwrap();
        graph.add_edge(0, 1).unwrap();
        graph
    }

    #[test]
    fn generates_bracketed_cigar_per_node() {
        let graph = small_graph();
        let path = Path::new(&graph, 1, vec![0, 1], 2).unwrap();
        let alignments = vec![
            LinearAlignment::parse(0, "3M").unwrap(),
            LinearAlignment::parse(0, "2M").unwrap(),
        ];
        let alignment = GraphAlignment::new(path, alignments).unwrap();
        assert_eq!(alignment.generate_cigar(), "0[3M]1[2M]");
        assert_eq!(alignment.query_length(), 5);
    }

    #[test]
    fn rejects_mismatched_reference_span() {
        let graph = small_graph();
        let path = Path::new(&graph, 1, vec![0, 1], 2).unwrap();
        let alignments = vec![
            LinearAlignment::parse(0, "4M").unwrap(),
            LinearAlignment::parse(0, "2M").unwrap(),
        ];
        assert!(GraphAlignment::new(path, alignments).is_err());
    }

    #[test]
    fn shrink_start_softclips_and_trims_dropped_node() {
        let graph = small_graph();
        let path = Path::new(&graph, 1, vec![0, 1], 2).unwrap();
        let alignments = vec![
            LinearAlignment::parse(0, "3M").unwrap(),
            LinearAlignment::parse(0, "2M").unwrap(),
        ];
        let alignment = GraphAlignment::new(path, alignments).unwrap();
        let shrunk = alignment.shrink_start(3).unwrap();
        assert_eq!(shrunk.path().node_ids(), &[1]);
        assert_eq!(shrunk.alignments()[0].generate_cigar(), "3S2M");
    }

    #[test]
    fn shrink_end_softclips_and_trims_dropped_node() {
        let graph = small_graph();
        let path = Path::new(&graph, 1, vec![0, 1], 2).unwrap();
        let alignments = vec![
            LinearAlignment::parse(0, "3M").unwrap(),
            LinearAlignment::parse(0, "2M").unwrap(),
        ];
        let alignment = GraphAlignment::new(path, alignments).unwrap();
        let shrunk = alignment.shrink_end(2).unwrap();
        assert_eq!(shrunk.path().node_ids(), &[0]);
        assert_eq!(shrunk.alignments()[0].generate_cigar(), "3M2S");
    }
}
