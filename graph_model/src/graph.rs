use std::collections::{BTreeSet, HashMap, HashSet};

use log::trace;

use crate::{
    error::{Error, Result},
    node::Node,
};

pub type NodeId = usize;

/// A labeled DAG of sequence nodes. Edges always run from a lower [`NodeId`] to a
/// higher one, except self-loops, which are only permitted on nodes marked as
/// repeat nodes at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<Node>,
    repeat_nodes: HashSet<NodeId>,
    adjacency: Vec<BTreeSet<NodeId>>,
    reverse_adjacency: Vec<BTreeSet<NodeId>>,
    edge_labels: HashMap<(NodeId, NodeId), HashSet<String>>,
}

impl Graph {
    /// Creates a graph with `num_nodes` placeholder nodes, each initialised to a
    /// single-base wildcard sequence; callers are expected to call
    /// [`Graph::set_node_seq`] to give each one its real sequence before use.
    pub fn new(num_nodes: usize) -> Self {
        let nodes = (0..num_nodes)
            .map(|_| Node::new("", "N").expect("\"N\" is a valid placeholder sequence"))
            .collect();
        Self {
            nodes,
            repeat_nodes: HashSet::new(),
            adjacency: vec![BTreeSet::new(); num_nodes],
            reverse_adjacency: vec![BTreeSet::new(); num_nodes],
            edge_labels: HashMap::new(),
        }
    }

    /// Appends a node, returning its freshly assigned [`NodeId`].
    pub fn add_node(&mut self, name: impl Into<String>, sequence: impl Into<String>) -> Result<NodeId> {
        let node = Node::new(name, sequence)?;
        let id = self.nodes.len();
        self.nodes.push(node);
        self.adjacency.push(BTreeSet::new());
        self.reverse_adjacency.push(BTreeSet::new());
        Ok(id)
    }

    /// Marks a node as eligible for self-loops (a "repeat" node).
    pub fn mark_repeat_node(&mut self, id: NodeId) -> Result<()> {
        self.assert_node_exists(id)?;
        self.repeat_nodes.insert(id);
        Ok(())
    }

    pub fn is_repeat_node(&self, id: NodeId) -> bool {
        self.repeat_nodes.contains(&id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(Error::UnknownNode(id))
    }

    pub fn node_seq(&self, id: NodeId) -> Result<&str> {
        Ok(self.node(id)?.sequence())
    }

    pub fn set_node_seq(&mut self, id: NodeId, sequence: impl Into<String>) -> Result<()> {
        self.assert_node_exists(id)?;
        self.nodes[id].set_sequence(sequence)
    }

    fn assert_node_exists(&self, id: NodeId) -> Result<()> {
        if id >= self.nodes.len() {
            Err(Error::UnknownNode(id))
        } else {
            Ok(())
        }
    }

    pub fn add_edge(&mut self, source: NodeId, sink: NodeId) -> Result<()> {
        self.assert_node_exists(source)?;
        self.assert_node_exists(sink)?;

        if source > sink || (source == sink && !self.repeat_nodes.contains(&source)) {
            return Err(Error::EdgeOrder { edge_source: source, sink });
        }

        if self.adjacency[source].contains(&sink) {
            return Err(Error::DuplicateEdge(source, sink));
        }

        trace!("adding edge ({source}, {sink})");
        self.adjacency[source].insert(sink);
        self.reverse_adjacency[sink].insert(source);
        Ok(())
    }

    pub fn has_edge(&self, source: NodeId, sink: NodeId) -> bool {
        self.adjacency
            .get(source)
            .is_some_and(|successors| successors.contains(&sink))
    }

    pub fn successors(&self, id: NodeId) -> Result<&BTreeSet<NodeId>> {
        self.assert_node_exists(id)?;
        Ok(&self.adjacency[id])
    }

    pub fn predecessors(&self, id: NodeId) -> Result<&BTreeSet<NodeId>> {
        self.assert_node_exists(id)?;
        Ok(&self.reverse_adjacency[id])
    }

    pub fn add_label_to_edge(&mut self, source: NodeId, sink: NodeId, label: impl Into<String>) -> Result<()> {
        if !self.has_edge(source, sink) {
            return Err(Error::UnknownNode(sink));
        }
        self.edge_labels
            .entry((source, sink))
            .or_default()
            .insert(label.into());
        Ok(())
    }

    pub fn edge_labels(&self, source: NodeId, sink: NodeId) -> impl Iterator<Item = &str> {
        self.edge_labels
            .get(&(source, sink))
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn edges_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = (NodeId, NodeId)> + 'a {
        self.edge_labels
            .iter()
            .filter(move |(_, labels)| labels.contains(label))
            .map(|(edge, _)| *edge)
    }

    pub fn erase_label(&mut self, label: &str) {
        for labels in self.edge_labels.values_mut() {
            labels.remove(label);
        }
    }

    /// A non-owning view of this graph with adjacency swapped and node sequences
    /// yielded reversed (not complemented). Lets the suffix aligner reuse the
    /// prefix-alignment code without duplicating it.
    pub fn reversed(&self) -> ReverseGraph<'_> {
        ReverseGraph { graph: self }
    }
}

/// A reversed view over a [`Graph`]: successors/predecessors are swapped, and node
/// sequences are read back to front.
pub struct ReverseGraph<'a> {
    graph: &'a Graph,
}

impl ReverseGraph<'_> {
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn node_seq_reversed(&self, id: NodeId) -> Result<String> {
        Ok(self.graph.node_seq(id)?.chars().rev().collect())
    }

    pub fn successors(&self, id: NodeId) -> Result<&BTreeSet<NodeId>> {
        self.graph.predecessors(id)
    }

    pub fn predecessors(&self, id: NodeId) -> Result<&BTreeSet<NodeId>> {
        self.graph.successors(id)
    }

    pub fn has_edge(&self, source: NodeId, sink: NodeId) -> bool {
        self.graph.has_edge(sink, source)
    }
}
