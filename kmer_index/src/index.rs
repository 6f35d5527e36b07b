use std::collections::HashMap;

use deterministic_default_hasher::DeterministicDefaultHasher;
use graph_model::{Graph, NodeId, Path};
use log::debug;

use crate::{
    error::Result,
    kmer::Kmer,
};

type Map<K, V> = HashMap<K, V, DeterministicDefaultHasher>;

/// Maps every concrete length-`k` substring reachable on some path through a
/// [`Graph`] to the list of [`Path`]s whose sequence realizes it.
pub struct KmerIndex<'graph> {
    k: usize,
    paths: Map<Kmer, Vec<Path<'graph>>>,
    unique_count_on_node: Map<NodeId, usize>,
    unique_count_on_edge: Map<(NodeId, NodeId), usize>,
}

impl<'graph> KmerIndex<'graph> {
    pub fn build(graph: &'graph Graph, k: usize) -> Result<Self> {
        Kmer::check_k(k)?;

        let mut paths: Map<Kmer, Vec<Path<'graph>>> = Map::default();

        for node in 0..graph.num_nodes() {
            let node_len = graph.node_seq(node)?.len();
            for offset in 0..node_len {
                let seed = Path::seed_at(graph, node, offset)?;
                for extended in seed.extend_end_by(k)? {
                    insert_path(graph, &mut paths, k, extended)?;
                }
            }
        }

        let (unique_count_on_node, unique_count_on_edge) = count_uniques(&paths);

        debug!(
            "built k-mer index: k={k}, distinct k-mers={}, total path entries={}",
            paths.len(),
            paths.values().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            k,
            paths,
            unique_count_on_node,
            unique_count_on_edge,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn contains(&self, kmer: &str) -> bool {
        match Kmer::encode(kmer, self.k) {
            Some(key) => self.paths.contains_key(&key),
            None => false,
        }
    }

    pub fn paths(&self, kmer: &str) -> &[Path<'graph>] {
        match Kmer::encode(kmer, self.k) {
            Some(key) => self.paths.get(&key).map_or(&[], Vec::as_slice),
            None => &[],
        }
    }

    pub fn unique_kmer_count_on_node(&self, id: NodeId) -> usize {
        self.unique_count_on_node.get(&id).copied().unwrap_or(0)
    }

    pub fn unique_kmer_count_on_edge(&self, u: NodeId, v: NodeId) -> usize {
        self.unique_count_on_edge.get(&(u, v)).copied().unwrap_or(0)
    }
}

fn insert_path<'graph>(
    graph: &'graph Graph,
    paths: &mut Map<Kmer, Vec<Path<'graph>>>,
    k: usize,
    path: Path<'graph>,
) -> Result<()> {
    let concrete_seqs = concrete_expansions(graph, &path)?;
    for seq in concrete_seqs {
        if let Some(key) = Kmer::encode(&seq, k) {
            paths.entry(key).or_default().push(path.clone());
        }
    }
    Ok(())
}

/// Expands every node along `path` under IUPAC ambiguity and forms the Cartesian
/// product of per-node concrete substrings, respecting the path's offsets.
fn concrete_expansions(graph: &Graph, path: &Path) -> Result<Vec<String>> {
    let mut expansions = vec![String::new()];
    let node_ids = path.node_ids();

    for (i, &node) in node_ids.iter().enumerate() {
        let node_len = graph.node_seq(node)?.len();
        let start = if i == 0 { path.start_offset() } else { 0 };
        let end = if i == node_ids.len() - 1 { path.end_offset() } else { node_len };

        let node_expansion = graph.node(node)?.sequence_expansion();
        let mut next = Vec::with_capacity(expansions.len() * node_expansion.len().max(1));
        for prefix in &expansions {
            for full in node_expansion {
                next.push(format!("{prefix}{}", &full[start..end]));
            }
        }
        expansions = next;
    }

    expansions.sort();
    expansions.dedup();
    Ok(expansions)
}

fn count_uniques<'graph>(
    paths: &Map<Kmer, Vec<Path<'graph>>>,
) -> (Map<NodeId, usize>, Map<(NodeId, NodeId), usize>) {
    let mut on_node: Map<NodeId, usize> = Map::default();
    let mut on_edge: Map<(NodeId, NodeId), usize> = Map::default();

    for entries in paths.values() {
        if entries.len() != 1 {
            continue;
        }
        let path = &entries[0];
        let mut touched_nodes: Vec<NodeId> = path.node_ids().to_vec();
        touched_nodes.sort_unstable();
        touched_nodes.dedup();
        for node in touched_nodes {
            *on_node.entry(node).or_insert(0) += 1;
        }
        for pair in path.node_ids().windows(2) {
            *on_edge.entry((pair[0], pair[1])).or_insert(0) += 1;
        }
    }

    (on_node, on_edge)
}
