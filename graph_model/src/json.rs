//! Loads a [`Graph`] from the JSON schema described under the external-interfaces
//! section: a `nodes` array of `{name, sequence}` objects and an `edges` array of
//! `{from, to, labels?}` objects, referencing nodes by position in `nodes`.

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    graph::Graph,
};

#[derive(Debug, Deserialize)]
struct JsonNode {
    name: String,
    #[serde(alias = "reference")]
    sequence: String,
    #[serde(default)]
    repeat: bool,
}

#[derive(Debug, Deserialize)]
struct JsonEdge {
    from: usize,
    to: usize,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JsonGraph {
    #[serde(default)]
    graph_id: Option<String>,
    nodes: Vec<JsonNode>,
    edges: Vec<JsonEdge>,
}

pub struct LoadedGraph {
    pub graph_id: Option<String>,
    pub graph: Graph,
}

pub fn from_str(contents: &str) -> Result<LoadedGraph> {
    let parsed: JsonGraph = serde_json::from_str(contents)?;
    from_parsed(parsed)
}

pub fn from_reader(reader: impl std::io::Read) -> Result<LoadedGraph> {
    let parsed: JsonGraph = serde_json::from_reader(reader)?;
    from_parsed(parsed)
}

fn from_parsed(parsed: JsonGraph) -> Result<LoadedGraph> {
    let mut graph = Graph::new(0);

    for node in &parsed.nodes {
        graph.add_node(node.name.clone(), node.sequence.clone())?;
    }

    for (id, node) in parsed.nodes.iter().enumerate() {
        if node.repeat {
            graph.mark_repeat_node(id)?;
        }
    }

    for edge in &parsed.edges {
        if edge.from >= graph.num_nodes() {
            return Err(Error::UnknownNode(edge.from));
        }
        if edge.to >= graph.num_nodes() {
            return Err(Error::UnknownNode(edge.to));
        }
        graph.add_edge(edge.from, edge.to)?;
        for label in &edge.labels {
            graph.add_label_to_edge(edge.from, edge.to, label.clone())?;
        }
    }

    Ok(LoadedGraph {
        graph_id: parsed.graph_id,
        graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_deletion_graph() {
        let json = r#"{
            "graph_id": "deletion",
            "nodes": [
                {"name": "LF", "sequence": "AAAA"},
                {"name": "DEL", "sequence": "CCCC", "repeat": false},
                {"name": "RF", "sequence": "GGGG"}
            ],
            "edges": [
                {"from": 0, "to": 1},
                {"from": 1, "to": 2},
                {"from": 0, "to": 2, "labels": ["deletion"]}
            ]
        }"#;

        let loaded = from_str(json).unwrap();
        assert_eq!(loaded.graph_id.as_deref(), Some("deletion"));
        assert_eq!(loaded.graph.num_nodes(), 3);
        assert!(loaded.graph.has_edge(0, 2));
        assert_eq!(loaded.graph.edge_labels(0, 2).collect::<Vec<_>>(), vec!["deletion"]);
    }
}
