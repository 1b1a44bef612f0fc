use std::path::{Path, PathBuf};

use ros_node_viewer::config::{ConfigError, RenderConfig};
use ros_node_viewer::layout::{GraphLayoutEngine, LayoutError, LayoutMap};
use ros_node_viewer::render::render_svg;
use ros_node_viewer::source::{ALL_GRAPH, SourceError};
use ros_node_viewer::theme::Theme;
use ros_node_viewer::view::ViewModel;
use ros_node_viewer::{Graph, align_layout, load_graph, load_settings, place_node_by_group};

/// Puts the n-th node (in name order) at `(10 n, 7 (n mod 3))`.
struct GridEngine;

impl GraphLayoutEngine for GridEngine {
    fn name(&self) -> &str {
        "grid"
    }

    fn layout(&self, graph: &Graph) -> Result<LayoutMap, LayoutError> {
        Ok(graph
            .nodes
            .keys()
            .enumerate()
            .map(|(idx, id)| (id.clone(), [idx as f32 * 10.0, (idx % 3) as f32 * 7.0]))
            .collect())
    }
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn assert_within(pos: [f32; 2], offset: [f32; 4], node: &str) {
    let [x, y, sx, sy] = offset;
    let eps = 1e-4;
    assert!(
        pos[0] >= x - eps && pos[0] <= x + sx + eps && pos[1] >= y - eps && pos[1] <= y + sy + eps,
        "{node}: {pos:?} outside {offset:?}"
    );
}

#[test]
fn rqt_graph_dumps_contain_node_src() {
    for name in ["rosgraph_nodeonly.dot", "rosgraph_nodetopic.dot"] {
        let graph = load_graph(&fixture(name), ALL_GRAPH).expect("fixture parse failed");
        assert!(graph.has_node("\"/node_src\""), "{name}: /node_src missing");
    }
}

#[test]
fn node_topic_dump_keeps_topic_nodes() {
    let graph = load_graph(&fixture("rosgraph_nodetopic.dot"), ALL_GRAPH).unwrap();
    assert_eq!(graph.node_count(), 5);
    assert!(graph.has_edge("\"/node_src\"", "n___topic_a"));
    assert!(graph.has_edge("n___topic_a", "\"/node_dst\""));
}

#[test]
fn places_rqt_graph_by_group() {
    let settings = load_settings(&fixture("setting.json")).unwrap();
    assert_eq!(
        settings.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
        vec!["__others__", "/sensing", "/node_dst"]
    );
    let mut graph = load_graph(&fixture("rosgraph_nodeonly.dot"), ALL_GRAPH).unwrap();
    let ids: Vec<String> = graph.nodes.keys().cloned().collect();

    place_node_by_group(&mut graph, &settings.groups, &GridEngine).unwrap();

    // names survive the catch-all relabelling
    assert_eq!(graph.nodes.keys().cloned().collect::<Vec<_>>(), ids);
    for node in graph.nodes.values() {
        assert!(node.pos.is_some(), "{} has no position", node.id);
        assert!(node.color.is_some(), "{} has no color", node.id);
    }

    let style_of = |name: &str| {
        settings
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.style.clone())
            .unwrap()
    };
    let cases = [
        ("\"/node_src\"", "__others__"),
        ("\"/sensing/lidar_driver\"", "/sensing"),
        ("\"/node_dst\"", "/node_dst"),
    ];
    for (id, group) in cases {
        let node = &graph.nodes[id];
        let style = style_of(group);
        assert_eq!(node.color, Some(style.color), "{id}");
        assert_within(node.pos.unwrap(), style.offset, id);
    }
}

#[test]
fn aligned_layout_is_centered() {
    let settings = load_settings(&fixture("setting.json")).unwrap();
    let mut graph = load_graph(&fixture("architecture.yaml"), ALL_GRAPH).unwrap();
    place_node_by_group(&mut graph, &settings.groups, &GridEngine).unwrap();
    align_layout(&mut graph);

    let positions: Vec<[f32; 2]> = graph.nodes.values().filter_map(|n| n.pos).collect();
    assert_eq!(positions.len(), 4);
    for axis in 0..2 {
        let min = positions.iter().map(|p| p[axis]).fold(f32::MAX, f32::min);
        let max = positions.iter().map(|p| p[axis]).fold(f32::MIN, f32::max);
        assert!(((max + min) / 2.0).abs() < 1e-4, "axis {axis} not centered");
    }
}

#[test]
fn architecture_full_graph_connects_publishers_to_subscribers() {
    let graph = load_graph(&fixture("architecture.yaml"), ALL_GRAPH).unwrap();
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);
    assert!(graph.has_edge("/sensing/lidar_driver", "/rviz"));
    let edge = graph
        .edges
        .iter()
        .find(|e| e.from == "/node_src" && e.to == "/node_dst")
        .unwrap();
    assert_eq!(edge.label.as_deref(), Some("/topic_a"));
}

#[test]
fn architecture_named_path_is_a_chain() {
    let graph = load_graph(&fixture("architecture.yaml"), "target_path_0").unwrap();
    assert_eq!(graph.node_count(), 3);
    let labels: Vec<_> = graph.edges.iter().map(|e| e.label.clone()).collect();
    assert_eq!(
        labels,
        vec![Some("/sensing/points".to_string()), Some("/topic_a".to_string())]
    );

    let err = load_graph(&fixture("architecture.yaml"), "missing").unwrap_err();
    assert!(matches!(err, SourceError::UnknownPath { .. }));
    assert!(err.to_string().contains("target_path_0"));
}

#[test]
fn wildcard_group_scales_into_its_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("setting.json");
    std::fs::write(
        &path,
        r#"{"group_setting": {"*": {"direction": "vertical", "offset": [0, 0, 100, 100], "color": [1, 2, 3]}}}"#,
    )
    .unwrap();
    let settings = load_settings(&path).unwrap();

    let mut graph = Graph::new();
    graph.add_edge("A", "B", None);
    place_node_by_group(&mut graph, &settings.groups, &GridEngine).unwrap();
    for node in graph.nodes.values() {
        assert_eq!(node.color, Some([1, 2, 3]));
        assert_within(node.pos.unwrap(), [0.0, 0.0, 100.0, 100.0], &node.id);
    }
    assert!(matches!(
        settings.app.window_size(),
        Err(ConfigError::MissingWindowSize)
    ));
}

#[test]
fn placed_graph_renders_to_svg() {
    let settings = load_settings(&fixture("setting.json")).unwrap();
    let mut graph = load_graph(&fixture("rosgraph_nodeonly.dot"), ALL_GRAPH).unwrap();
    place_node_by_group(&mut graph, &settings.groups, &GridEngine).unwrap();
    align_layout(&mut graph);

    let config = RenderConfig::default();
    let view = ViewModel::new(graph, Theme::node_editor(), [config.width, config.height]);
    let svg = render_svg(&view, &config, None);
    assert!(svg.contains("<svg"));
    assert!(svg.contains(">/node_dst</tspan>"));
    assert!(svg.contains(">/sensing/points</tspan>"));
    assert_eq!(svg.matches("<path").count(), 2);
}
