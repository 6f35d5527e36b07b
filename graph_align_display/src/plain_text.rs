//! Plain-text dump of a [`GraphAlignment`] against its originating read: one
//! wrapped three-row block (node sequence, match markers, read sequence) per
//! node the path touches, the minimum legible output when no VCF/JSON sink is
//! in scope.

use std::io::Write;

use graph_align_core::{GraphAlignment, OperationKind};
use log::debug;

use crate::error::Result;

const LINE_WIDTH: usize = 60;

/// Which read of a pair an alignment belongs to; printed in the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mate {
    First,
    Second,
}

impl std::fmt::Display for Mate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mate::First => write!(f, "1"),
            Mate::Second => write!(f, "2"),
        }
    }
}

/// Writes one alignment block: a header naming the read and its graph-CIGAR,
/// followed by a wrapped three-row rendering per node on the path.
pub fn write_alignment(
    mut writer: impl Write,
    read_id: &str,
    mate: Mate,
    read: &[u8],
    alignment: &GraphAlignment,
) -> Result<()> {
    debug!("Rendering alignment of read {read_id}/{mate}");

    writeln!(writer, "{read_id}/{mate}  {}", alignment.generate_cigar())?;

    let path = alignment.path();
    let node_ids = path.node_ids();

    let mut query_pos = 0usize;
    for (i, &node) in node_ids.iter().enumerate() {
        let node_seq = path.graph().node_seq(node)?;
        let start = if i == 0 { path.start_offset() } else { 0 };
        let end = if i == node_ids.len() - 1 {
            path.end_offset()
        } else {
            node_seq.len()
        };
        let target_seq = &node_seq[start..end];
        let linear = &alignment.alignments()[i];

        let query_len = linear.query_length();
        let query_seq = &read[query_pos..query_pos + query_len];
        query_pos += query_len;

        writeln!(writer, "node {node}: {}", linear.generate_cigar())?;
        write_rows(&mut writer, target_seq, query_seq, linear.operations())?;
    }

    Ok(())
}

fn write_rows(
    writer: &mut impl Write,
    target_seq: &str,
    query_seq: &[u8],
    operations: &[graph_align_core::Operation],
) -> Result<()> {
    let mut target_chars = target_seq.chars();
    let mut query_chars = query_seq.iter().map(|&b| b as char);

    let mut target_row = Vec::new();
    let mut marker_row = Vec::new();
    let mut query_row = Vec::new();

    for op in operations {
        let marker = match op.kind {
            OperationKind::Match => '|',
            OperationKind::Mismatch => 'x',
            _ => ' ',
        };
        for _ in 0..op.length {
            match op.kind {
                OperationKind::Match | OperationKind::Mismatch => {
                    target_row.push(target_chars.next().unwrap_or('?'));
                    query_row.push(query_chars.next().unwrap_or('?'));
                    marker_row.push(marker);
                }
                OperationKind::Insertion => {
                    target_row.push('-');
                    query_row.push(query_chars.next().unwrap_or('?'));
                    marker_row.push(' ');
                }
                OperationKind::Softclip => {
                    target_row.push('-');
                    query_row.push(query_chars.next().unwrap_or('?').to_ascii_lowercase());
                    marker_row.push(' ');
                }
                OperationKind::Deletion | OperationKind::MissingBases => {
                    target_row.push(target_chars.next().unwrap_or('?'));
                    query_row.push('-');
                    marker_row.push(' ');
                }
            }
        }
    }

    for (target_chunk, (marker_chunk, query_chunk)) in target_row
        .chunks(LINE_WIDTH)
        .zip(marker_row.chunks(LINE_WIDTH).zip(query_row.chunks(LINE_WIDTH)))
    {
        writeln!(writer, "  target: {}", target_chunk.iter().collect::<String>())?;
        writeln!(writer, "          {}", marker_chunk.iter().collect::<String>())?;
        writeln!(writer, "  query:  {}", query_chunk.iter().collect::<String>())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_align_core::LinearAlignment;
    use graph_model::{Graph, Path};

    fn small_graph() -> Graph {
        let mut graph = Graph::new(0);
        graph.add_node("a", "ACGT").unwrap();
        graph.add_node("b", "GGCC").unwrap();
        graph.add_edge(0, 1).unwrap();
        graph
    }

    #[test]
    fn renders_a_two_node_alignment_with_a_mismatch() {
        let graph = small_graph();
        let path = Path::new(&graph, 1, vec![0, 1], 2).unwrap();
        let alignments = vec![
            LinearAlignment::parse(0, "1M1X1M").unwrap(),
            LinearAlignment::parse(0, "2M").unwrap(),
        ];
        let alignment = GraphAlignment::new(path, alignments).unwrap();
        let mut out = Vec::new();
        write_alignment(&mut out, "read1", Mate::First, b"ATGGC", &alignment).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("read1/1"));
        assert!(text.contains("x"));
    }

    #[test]
    fn renders_a_single_node_seed_alignment() {
        let graph = small_graph();
        let path = Path::new(&graph, 0, vec![0], 4).unwrap();
        let alignments = vec![LinearAlignment::parse(0, "4M").unwrap()];
        let alignment = GraphAlignment::new(path, alignments).unwrap();
        let mut out = Vec::new();
        write_alignment(&mut out, "read2", Mate::Second, b"ACGT", &alignment).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("read2/2"));
        assert!(text.contains("0[4M]"));
    }
}
