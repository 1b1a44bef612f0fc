use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// A node of the ROS graph: a node or a topic, keyed by its name.
///
/// `pos` and `color` stay `None` until the group placer has run.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub pos: Option<[f32; 2]>,
    pub color: Option<[u8; 3]>,
}

impl Node {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            pos: None,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Topic name carried by the edge, when the source provides one.
    pub label: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelabelError {
    #[error("cannot relabel `{from}` to `{to}`: a node with that name already exists")]
    Collision { from: String, to: String },
}

/// Directed simple graph: at most one edge per ordered node pair.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: BTreeMap<String, Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_node(&mut self, id: &str) -> &mut Node {
        self.nodes
            .entry(id.to_string())
            .or_insert_with(|| Node::new(id))
    }

    /// Adds `from -> to`, creating missing endpoints. An existing edge
    /// between the same pair keeps its slot and takes the new label.
    pub fn add_edge(&mut self, from: &str, to: &str, label: Option<String>) {
        self.ensure_node(from);
        self.ensure_node(to);
        if let Some(existing) = self
            .edges
            .iter_mut()
            .find(|edge| edge.from == from && edge.to == to)
        {
            existing.label = label;
            return;
        }
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            label,
        });
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.from == from && edge.to == to)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Induced subgraph over the nodes accepted by `keep`. Edges survive
    /// only when both endpoints are kept. Positions and colors are not
    /// carried over.
    pub fn induced_subgraph<F>(&self, keep: F) -> Graph
    where
        F: Fn(&str) -> bool,
    {
        let mut sub = Graph::new();
        for id in self.nodes.keys() {
            if keep(id) {
                sub.ensure_node(id);
            }
        }
        for edge in &self.edges {
            if keep(&edge.from) && keep(&edge.to) {
                sub.add_edge(&edge.from, &edge.to, edge.label.clone());
            }
        }
        sub
    }

    /// Renames nodes according to `mapping`; names absent from the mapping
    /// are kept. Fails if two nodes would end up with the same name.
    pub fn relabel(&mut self, mapping: &HashMap<String, String>) -> Result<(), RelabelError> {
        let rename = |id: &str| -> String {
            mapping
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_string())
        };

        let mut renamed: BTreeMap<String, &str> = BTreeMap::new();
        for id in self.nodes.keys() {
            let new_id = rename(id);
            if renamed.contains_key(&new_id) {
                return Err(RelabelError::Collision {
                    from: id.clone(),
                    to: new_id,
                });
            }
            renamed.insert(new_id, id);
        }
        let renamed: Vec<(String, String)> = renamed
            .into_iter()
            .map(|(new_id, old_id)| (new_id, old_id.to_string()))
            .collect();

        let mut old_nodes = std::mem::take(&mut self.nodes);
        for (new_id, old_id) in renamed {
            if let Some(mut node) = old_nodes.remove(&old_id) {
                node.id = new_id.clone();
                self.nodes.insert(new_id, node);
            }
        }

        for edge in &mut self.edges {
            edge.from = rename(&edge.from);
            edge.to = rename(&edge.to);
        }
        Ok(())
    }
}
