//! Layout backends. Every engine takes a (sub)graph and returns one position
//! per node, in points, with y growing upward the way Graphviz reports it.

use std::io::Write;
use std::process::{Command, Stdio};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::LayoutMap;
use super::error::LayoutError;
use crate::graph::Graph;

const POINTS_PER_INCH: f32 = 72.0;

static PLAIN_NODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^node\s+n(?P<idx>\d+)\s+(?P<x>[-+0-9.eE]+)\s+(?P<y>[-+0-9.eE]+)\s").unwrap()
});

pub trait GraphLayoutEngine {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    fn layout(&self, graph: &Graph) -> Result<LayoutMap, LayoutError>;
}

/// Graphviz layout programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LayoutProgram {
    #[default]
    Dot,
    Neato,
    Twopi,
    Fdp,
    Sfdp,
    Circo,
}

impl LayoutProgram {
    pub fn command(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Neato => "neato",
            Self::Twopi => "twopi",
            Self::Fdp => "fdp",
            Self::Sfdp => "sfdp",
            Self::Circo => "circo",
        }
    }
}

/// Runs a Graphviz program once per call and reads its `-Tplain` output.
#[derive(Debug, Clone, Default)]
pub struct GraphvizEngine {
    pub program: LayoutProgram,
}

impl GraphvizEngine {
    pub fn new(program: LayoutProgram) -> Self {
        Self { program }
    }
}

impl GraphLayoutEngine for GraphvizEngine {
    fn name(&self) -> &str {
        self.program.command()
    }

    fn layout(&self, graph: &Graph) -> Result<LayoutMap, LayoutError> {
        let program = self.program.command();
        let (source, ids) = graph_to_dot(graph);

        let mut child = Command::new(program)
            .arg("-Tplain")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LayoutError::Spawn {
                program: program.to_string(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(LayoutError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_plain(program, &stdout, &ids)
    }
}

/// Serializes `graph` as DOT. Nodes get synthetic ids (`n0`, `n1`, ...) so
/// that any node name survives the trip; the name is kept as the label so
/// node sizes match what Graphviz would compute for the real name.
fn graph_to_dot(graph: &Graph) -> (String, Vec<String>) {
    let ids: Vec<String> = graph.nodes.keys().cloned().collect();
    let mut out = String::from("digraph G {\n");
    for (idx, id) in ids.iter().enumerate() {
        out.push_str(&format!("  n{idx} [label=\"{}\"];\n", escape_dot(id)));
    }
    for edge in &graph.edges {
        let (Some(from), Some(to)) = (
            ids.iter().position(|id| id == &edge.from),
            ids.iter().position(|id| id == &edge.to),
        ) else {
            continue;
        };
        out.push_str(&format!("  n{from} -> n{to};\n"));
    }
    out.push_str("}\n");
    (out, ids)
}

fn escape_dot(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

fn parse_plain(program: &str, output: &str, ids: &[String]) -> Result<LayoutMap, LayoutError> {
    let mut layout = LayoutMap::new();
    for line in output.lines() {
        if !line.starts_with("node ") {
            continue;
        }
        let malformed = || LayoutError::MalformedOutput {
            program: program.to_string(),
            line: line.to_string(),
        };
        let caps = PLAIN_NODE_RE.captures(line).ok_or_else(malformed)?;
        let idx: usize = caps["idx"].parse().map_err(|_| malformed())?;
        let x: f32 = caps["x"].parse().map_err(|_| malformed())?;
        let y: f32 = caps["y"].parse().map_err(|_| malformed())?;
        let id = ids.get(idx).ok_or_else(malformed)?;
        layout.insert(id.clone(), [x * POINTS_PER_INCH, y * POINTS_PER_INCH]);
    }

    if let Some(missing) = ids.iter().find(|id| !layout.contains_key(*id)) {
        return Err(LayoutError::MissingNode {
            node: missing.clone(),
        });
    }
    Ok(layout)
}

/// In-process layered layout. Needs no external program.
#[derive(Debug, Clone)]
pub struct DagreEngine {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub font_size: f32,
}

impl Default for DagreEngine {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 50.0,
            font_size: 14.0,
        }
    }
}

impl DagreEngine {
    fn node_size(&self, id: &str) -> (f32, f32) {
        let chars = id.trim_matches('"').chars().count() as f32;
        let width = (chars * self.font_size * 0.56 + 16.0).max(54.0);
        let height = self.font_size * 2.6;
        (width, height)
    }
}

impl GraphLayoutEngine for DagreEngine {
    fn name(&self) -> &str {
        "dagre"
    }

    fn layout(&self, graph: &Graph) -> Result<LayoutMap, LayoutError> {
        let mut layout = LayoutMap::new();
        if graph.nodes.is_empty() {
            return Ok(layout);
        }

        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some("tb".to_string());
        graph_config.nodesep = Some(self.node_spacing);
        graph_config.ranksep = Some(self.rank_spacing);
        graph_config.marginx = Some(8.0);
        graph_config.marginy = Some(8.0);
        dagre_graph.set_graph(graph_config);

        for node_id in graph.nodes.keys() {
            let (width, height) = self.node_size(node_id);
            let mut node = DagreNode::default();
            node.width = width;
            node.height = height;
            dagre_graph.set_node(node_id.clone(), Some(node));
        }

        let mut edge_set: HashSet<(String, String)> = HashSet::new();
        for edge in &graph.edges {
            let from = edge.from.clone();
            let to = edge.to.clone();
            if from == to || !edge_set.insert((from.clone(), to.clone())) {
                continue;
            }
            let edge_label = DagreEdge::default();
            let _ = dagre_graph.set_edge(&from, &to, Some(edge_label), None);
        }

        dagre_layout::run_layout(&mut dagre_graph);

        for node_id in graph.nodes.keys() {
            let Some(dagre_node) = dagre_graph.node(node_id) else {
                return Err(LayoutError::MissingNode {
                    node: node_id.clone(),
                });
            };
            // dagre grows y downward
            layout.insert(node_id.clone(), [dagre_node.x, -dagre_node.y]);
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_source_uses_synthetic_ids_and_escapes_labels() {
        let mut graph = Graph::new();
        graph.add_edge("\"/node_src\"", "/node_dst", None);
        let (dot, ids) = graph_to_dot(&graph);
        assert_eq!(ids, vec!["\"/node_src\"".to_string(), "/node_dst".to_string()]);
        assert!(dot.contains("n0 [label=\"\\\"/node_src\\\"\"];"));
        assert!(dot.contains("n1 [label=\"/node_dst\"];"));
        assert!(dot.contains("n0 -> n1;"));
    }

    #[test]
    fn plain_output_is_mapped_back_to_names() {
        let ids = vec!["\"/a\"".to_string(), "/b".to_string()];
        let output = "graph 1 0.75 1.5\n\
node n0 0.375 1.25 0.75 0.5 \"/a\" solid ellipse black lightgrey\n\
node n1 0.375 0.25 0.75 0.5 /b solid ellipse black lightgrey\n\
edge n0 n1 4 0.375 0.99 0.375 0.8 0.375 0.7 0.375 0.6 solid black\n\
stop\n";
        let layout = parse_plain("dot", output, &ids).unwrap();
        assert_eq!(layout["\"/a\""], [27.0, 90.0]);
        assert_eq!(layout["/b"], [27.0, 18.0]);
    }

    #[test]
    fn plain_output_missing_a_node_is_an_error() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let output = "graph 1 1 1\nnode n0 0.5 0.5 0.75 0.5 a solid ellipse black lightgrey\nstop\n";
        let err = parse_plain("dot", output, &ids).unwrap_err();
        assert!(matches!(err, LayoutError::MissingNode { ref node } if node == "b"));
    }

    #[test]
    fn dagre_places_every_node_with_sources_on_top() {
        let mut graph = Graph::new();
        graph.add_edge("A", "B", None);
        graph.add_edge("B", "C", None);
        let layout = DagreEngine::default().layout(&graph).unwrap();
        assert_eq!(layout.len(), 3);
        assert!(layout["A"][1] > layout["B"][1]);
        assert!(layout["B"][1] > layout["C"][1]);
    }
}
