//! Reader for CARET architecture files.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::SourceError;
use crate::graph::Graph;

/// `--target_path` value that selects the whole node graph instead of a
/// named path.
pub const ALL_GRAPH: &str = "all_graph";

#[derive(Debug, Deserialize)]
struct Architecture {
    #[serde(default)]
    named_paths: Vec<NamedPath>,
    #[serde(default)]
    nodes: Vec<ArchNode>,
}

#[derive(Debug, Deserialize)]
struct NamedPath {
    path_name: String,
    #[serde(default)]
    node_chain: Vec<ChainNode>,
}

#[derive(Debug, Deserialize)]
struct ChainNode {
    node_name: String,
    #[serde(default)]
    publish_topic_name: Option<String>,
    #[serde(default)]
    subscribe_topic_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArchNode {
    node_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    publishes: Vec<TopicRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    subscribes: Vec<TopicRef>,
}

#[derive(Debug, Deserialize)]
struct TopicRef {
    topic_name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TopicRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<TopicRef>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Builds the node graph described by a CARET architecture file.
///
/// With [`ALL_GRAPH`] every publisher is connected to every subscriber of
/// the same topic and the edge is labelled with the topic name. Any other
/// `target_path` selects that named path and chains its nodes in order.
pub fn parse_architecture(input: &str, target_path: &str) -> Result<Graph, SourceError> {
    let architecture: Architecture = serde_yaml::from_str(input)?;
    if target_path == ALL_GRAPH {
        Ok(full_graph(&architecture))
    } else {
        named_path_graph(&architecture, target_path)
    }
}

fn full_graph(architecture: &Architecture) -> Graph {
    let mut graph = Graph::new();
    let mut publishers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut subscribers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for node in &architecture.nodes {
        graph.ensure_node(&node.node_name);
        for topic in &node.publishes {
            publishers
                .entry(topic.topic_name.as_str())
                .or_default()
                .push(&node.node_name);
        }
        for topic in &node.subscribes {
            subscribers
                .entry(topic.topic_name.as_str())
                .or_default()
                .push(&node.node_name);
        }
    }

    for (topic, pubs) in &publishers {
        let Some(subs) = subscribers.get(topic) else {
            continue;
        };
        for publisher in pubs {
            for subscriber in subs {
                graph.add_edge(publisher, subscriber, Some(topic.to_string()));
            }
        }
    }
    graph
}

fn named_path_graph(architecture: &Architecture, target_path: &str) -> Result<Graph, SourceError> {
    let path = architecture
        .named_paths
        .iter()
        .find(|path| path.path_name == target_path)
        .ok_or_else(|| SourceError::UnknownPath {
            path: target_path.to_string(),
            available: architecture
                .named_paths
                .iter()
                .map(|path| path.path_name.clone())
                .collect(),
        })?;

    let mut graph = Graph::new();
    for node in &path.node_chain {
        graph.ensure_node(&node.node_name);
    }
    for pair in path.node_chain.windows(2) {
        let label = pair[0]
            .publish_topic_name
            .clone()
            .or_else(|| pair[1].subscribe_topic_name.clone());
        graph.add_edge(&pair[0].node_name, &pair[1].node_name, label);
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHITECTURE: &str = r#"
named_paths:
- path_name: target
  node_chain:
  - node_name: /sensor
    publish_topic_name: /points
    subscribe_topic_name: UNDEFINED
  - node_name: /filter
    publish_topic_name: /points_filtered
    subscribe_topic_name: /points
  - node_name: /planner
    publish_topic_name: UNDEFINED
    subscribe_topic_name: /points_filtered
nodes:
- node_name: /sensor
  publishes:
  - topic_name: /points
    callback_names: [timer_callback_0]
- node_name: /filter
  publishes:
  - topic_name: /points_filtered
  subscribes:
  - topic_name: /points
    callback_name: subscription_callback_0
- node_name: /planner
  subscribes:
  - topic_name: /points_filtered
  - topic_name: /points
- node_name: /idle
  publishes: null
"#;

    #[test]
    fn all_graph_connects_publishers_to_subscribers() {
        let graph = parse_architecture(ARCHITECTURE, ALL_GRAPH).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert!(graph.has_node("/idle"));
        assert!(graph.has_edge("/sensor", "/filter"));
        assert!(graph.has_edge("/sensor", "/planner"));
        assert!(graph.has_edge("/filter", "/planner"));
        let edge = graph
            .edges
            .iter()
            .find(|e| e.from == "/filter")
            .unwrap();
        assert_eq!(edge.label.as_deref(), Some("/points_filtered"));
    }

    #[test]
    fn named_path_chains_nodes() {
        let graph = parse_architecture(ARCHITECTURE, "target").unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge("/sensor", "/filter"));
        assert!(!graph.has_edge("/sensor", "/planner"));
        assert_eq!(graph.edges[0].label.as_deref(), Some("/points"));
    }

    #[test]
    fn unknown_path_lists_available_ones() {
        let err = parse_architecture(ARCHITECTURE, "missing").unwrap_err();
        match err {
            SourceError::UnknownPath { path, available } => {
                assert_eq!(path, "missing");
                assert_eq!(available, vec!["target".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
