use crate::graph::Graph;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Placed graph as written by `--dump_layout`.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub pos: Option<[f32; 2]>,
    pub color: Option<[u8; 3]>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

impl LayoutDump {
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.id.trim_matches('"').to_string(),
                pos: node.pos,
                color: node.color,
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                label: edge.label.clone(),
            })
            .collect();

        LayoutDump {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            nodes,
            edges,
        }
    }
}

pub fn write_layout_dump(path: &Path, graph: &Graph) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_graph(graph);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_contains_positions_and_colors() {
        let mut graph = Graph::new();
        graph.add_edge("\"/a\"", "/b", Some("/topic".to_string()));
        graph.nodes.get_mut("\"/a\"").unwrap().pos = Some([0.25, 0.5]);
        graph.nodes.get_mut("\"/a\"").unwrap().color = Some([255, 0, 0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        write_layout_dump(&path, &graph).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["node_count"], 2);
        let first = &value["nodes"][0];
        assert_eq!(first["id"], "\"/a\"");
        assert_eq!(first["label"], "/a");
        assert_eq!(first["pos"][0], 0.25);
        assert_eq!(first["color"][0], 255);
        assert!(value["nodes"][1]["pos"].is_null());
        assert_eq!(value["edges"][0]["label"], "/topic");
    }
}
