//! Viewer state that does not depend on the GUI toolkit: display names,
//! node ports, zoom levels and selection highlighting.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{Edge, Graph};
use crate::theme::Theme;

/// Column at which node and topic names are wrapped.
pub const WRAP_WIDTH: usize = 60;

pub const DEFAULT_INPUT_PORT: &str = "in";
pub const DEFAULT_OUTPUT_PORT: &str = "out";

/// `(font size, fraction of the window size)` per zoom level.
const ZOOM_STEPS: [(f32, f32); 27] = [
    (10.0, 0.20),
    (10.0, 0.25),
    (11.0, 0.30),
    (11.0, 0.35),
    (12.0, 0.40),
    (12.0, 0.45),
    (13.0, 0.50),
    (13.0, 0.55),
    (14.0, 0.60),
    (14.0, 0.65),
    (14.0, 0.70),
    (15.0, 0.75),
    (15.0, 0.80),
    (15.0, 0.85),
    (16.0, 0.90),
    (16.0, 0.95),
    (16.0, 1.00),
    (17.0, 1.10),
    (17.0, 1.15),
    (17.0, 1.20),
    (17.0, 1.25),
    (17.0, 1.30),
    (17.0, 1.35),
    (18.0, 1.40),
    (18.0, 1.45),
    (18.0, 1.50),
    (18.0, 1.60),
];
const DEFAULT_ZOOM_LEVEL: usize = 2;

/// Strips the quotes DOT sources leave on names and wraps the result.
pub fn display_name(name: &str) -> String {
    wrap_text(name.trim_matches('"'), WRAP_WIDTH).join("\n")
}

/// Greedy word wrap on character count. Words longer than `width` are
/// broken, ROS names rarely contain spaces.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        let current_len = current.chars().count();
        if !current.is_empty() && current_len + 1 + word.len() <= width {
            current.push(' ');
            current.extend(word.iter());
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        while word.len() > width {
            let rest = word.split_off(width);
            lines.push(word.iter().collect());
            word = rest;
        }
        current.extend(word.iter());
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Output port label and input port label an edge attaches to.
pub fn edge_ports(edge: &Edge) -> (&str, &str) {
    match edge.label.as_deref() {
        Some(label) => (label, label),
        None => (DEFAULT_OUTPUT_PORT, DEFAULT_INPUT_PORT),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ports {
    pub inputs: BTreeSet<String>,
    pub outputs: BTreeSet<String>,
}

pub fn collect_ports(graph: &Graph) -> BTreeMap<String, Ports> {
    let mut ports: BTreeMap<String, Ports> = graph
        .nodes
        .keys()
        .map(|id| (id.clone(), Ports::default()))
        .collect();
    for edge in &graph.edges {
        let (output, input) = edge_ports(edge);
        if let Some(from) = ports.get_mut(&edge.from) {
            from.outputs.insert(output.to_string());
        }
        if let Some(to) = ports.get_mut(&edge.to) {
            to.inputs.insert(input.to_string());
        }
    }
    ports
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLevel {
    pub font_size: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Discrete zoom steps. Canvas coordinates are multiplied by the current
/// step's scale to get screen coordinates.
#[derive(Debug, Clone)]
pub struct ZoomTable {
    levels: Vec<ZoomLevel>,
    current: usize,
}

impl ZoomTable {
    pub fn new(window_size: [f32; 2]) -> Self {
        let levels = ZOOM_STEPS
            .iter()
            .map(|&(font_size, factor)| ZoomLevel {
                font_size,
                scale_x: window_size[0] * factor,
                scale_y: window_size[1] * factor,
            })
            .collect();
        Self {
            levels,
            current: DEFAULT_ZOOM_LEVEL,
        }
    }

    pub fn level(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn current(&self) -> ZoomLevel {
        self.levels[self.current]
    }

    /// Steps one level in the direction of `wheel` (positive zooms in).
    /// Returns whether the level changed.
    pub fn step(&mut self, wheel: f32) -> bool {
        let before = self.current;
        if wheel > 0.0 && self.current + 1 < self.levels.len() {
            self.current += 1;
        } else if wheel < 0.0 && self.current > 0 {
            self.current -= 1;
        }
        before != self.current
    }

    pub fn to_screen(&self, pos: [f32; 2]) -> [f32; 2] {
        let level = self.current();
        [pos[0] * level.scale_x, pos[1] * level.scale_y]
    }
}

/// Placed graph plus what the viewer shows on top of it.
#[derive(Debug, Clone)]
pub struct ViewModel {
    pub graph: Graph,
    pub theme: Theme,
    pub zoom: ZoomTable,
    ports: BTreeMap<String, Ports>,
    selected: Option<String>,
}

impl ViewModel {
    pub fn new(graph: Graph, theme: Theme, window_size: [f32; 2]) -> Self {
        let ports = collect_ports(&graph);
        Self {
            graph,
            theme,
            zoom: ZoomTable::new(window_size),
            ports,
            selected: None,
        }
    }

    pub fn ports(&self, id: &str) -> Option<&Ports> {
        self.ports.get(id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Clicking the selected node clears the selection, clicking any other
    /// node selects it instead.
    pub fn click(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        } else if self.graph.has_node(id) {
            self.selected = Some(id.to_string());
        }
    }

    pub fn title_color(&self, id: &str) -> [u8; 3] {
        self.graph
            .nodes
            .get(id)
            .and_then(|node| node.color)
            .unwrap_or(self.theme.title_bar)
    }

    pub fn node_background(&self, id: &str) -> [u8; 3] {
        let Some(selected) = self.selected.as_deref() else {
            return self.theme.node_background;
        };
        if self.graph.has_edge(id, selected) {
            self.theme.highlight_subscribe
        } else if self.graph.has_edge(selected, id) {
            self.theme.highlight_publish
        } else {
            self.theme.node_background
        }
    }

    /// Links take the publisher's color unless they touch the selection.
    pub fn edge_color(&self, edge: &Edge) -> [u8; 3] {
        if let Some(selected) = self.selected.as_deref()
            && (edge.from == selected || edge.to == selected)
        {
            return self.theme.highlight_edge;
        }
        self.title_color(&edge.from)
    }

    pub fn screen_pos(&self, id: &str) -> Option<[f32; 2]> {
        let pos = self.graph.nodes.get(id)?.pos?;
        Some(self.zoom.to_screen(pos))
    }

    /// Moves a node by a screen-space delta.
    pub fn drag_node(&mut self, id: &str, delta: [f32; 2]) {
        let level = self.zoom.current();
        if let Some(pos) = self.graph.nodes.get_mut(id).and_then(|node| node.pos.as_mut()) {
            pos[0] += delta[0] / level.scale_x;
            pos[1] += delta[1] / level.scale_y;
        }
    }

    pub fn font_size(&self) -> f32 {
        self.zoom.current().font_size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortRow {
    pub label: String,
    pub lines: Vec<String>,
    /// Top of the row.
    pub top: f32,
    /// Where links attach: left edge for inputs, right edge for outputs.
    pub anchor: [f32; 2],
}

/// Screen geometry of one node: a title bar with the wrapped name followed
/// by one row per input port and one row per output port.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub title_height: f32,
    pub title_lines: Vec<String>,
    pub inputs: Vec<PortRow>,
    pub outputs: Vec<PortRow>,
    pub line_height: f32,
    pub padding: f32,
}

impl NodeBox {
    pub fn input_anchor(&self, label: &str) -> Option<[f32; 2]> {
        self.inputs
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.anchor)
    }

    pub fn output_anchor(&self, label: &str) -> Option<[f32; 2]> {
        self.outputs
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.anchor)
    }

    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.x
            && point[0] <= self.x + self.width
            && point[1] >= self.y
            && point[1] <= self.y + self.height
    }
}

/// Lays out the box of node `id` with its top-left corner at `top_left`.
/// `measure` returns the rendered width of one line of text.
pub fn node_box<F>(
    id: &str,
    ports: Option<&Ports>,
    top_left: [f32; 2],
    font_size: f32,
    measure: F,
) -> NodeBox
where
    F: Fn(&str) -> f32,
{
    let line_height = font_size * 1.4;
    let padding = font_size * 0.6;
    let title_lines: Vec<String> = display_name(id).lines().map(str::to_string).collect();
    let title_height = title_lines.len().max(1) as f32 * line_height + padding;

    let mut widest = title_lines.iter().map(|line| measure(line)).fold(0.0f32, f32::max);
    let mut rows: Vec<(bool, String, Vec<String>)> = Vec::new();
    if let Some(ports) = ports {
        for label in &ports.inputs {
            rows.push((true, label.clone(), display_lines(label)));
        }
        for label in &ports.outputs {
            rows.push((false, label.clone(), display_lines(label)));
        }
    }
    for (_, _, lines) in &rows {
        for line in lines {
            widest = widest.max(measure(line));
        }
    }
    let width = (widest + padding * 2.0).max(font_size * 6.0);

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut cursor = top_left[1] + title_height + padding * 0.5;
    for (is_input, label, lines) in rows {
        let height = lines.len().max(1) as f32 * line_height;
        let anchor_x = if is_input {
            top_left[0]
        } else {
            top_left[0] + width
        };
        let row = PortRow {
            label,
            lines,
            top: cursor,
            anchor: [anchor_x, cursor + height / 2.0],
        };
        if is_input {
            inputs.push(row);
        } else {
            outputs.push(row);
        }
        cursor += height;
    }
    let height = cursor + padding * 0.5 - top_left[1];

    NodeBox {
        id: id.to_string(),
        x: top_left[0],
        y: top_left[1],
        width,
        height,
        title_height,
        title_lines,
        inputs,
        outputs,
        line_height,
        padding,
    }
}

fn display_lines(label: &str) -> Vec<String> {
    display_name(label).lines().map(str::to_string).collect()
}

/// Corner overview of the canvas. Content coordinates are fitted into
/// `frame` (`[x, y, width, height]`) with one uniform scale and centred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimap {
    pub frame: [f32; 4],
    content_min: [f32; 2],
    scale: f32,
    inset: [f32; 2],
}

impl Minimap {
    pub fn fit(content_min: [f32; 2], content_max: [f32; 2], frame: [f32; 4]) -> Self {
        let width = (content_max[0] - content_min[0]).max(1.0);
        let height = (content_max[1] - content_min[1]).max(1.0);
        let scale = (frame[2] / width).min(frame[3] / height);
        let inset = [
            (frame[2] - width * scale) / 2.0,
            (frame[3] - height * scale) / 2.0,
        ];
        Self {
            frame,
            content_min,
            scale,
            inset,
        }
    }

    pub fn project(&self, point: [f32; 2]) -> [f32; 2] {
        [
            self.frame[0] + self.inset[0] + (point[0] - self.content_min[0]) * self.scale,
            self.frame[1] + self.inset[1] + (point[1] - self.content_min[1]) * self.scale,
        ]
    }

    /// Content point shown at `point` of the minimap.
    pub fn unproject(&self, point: [f32; 2]) -> [f32; 2] {
        [
            self.content_min[0] + (point[0] - self.frame[0] - self.inset[0]) / self.scale,
            self.content_min[1] + (point[1] - self.frame[1] - self.inset[1]) / self.scale,
        ]
    }

    pub fn contains(&self, point: [f32; 2]) -> bool {
        let [x, y, w, h] = self.frame;
        point[0] >= x && point[0] <= x + w && point[1] >= y && point[1] <= y + h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ViewModel {
        let mut graph = Graph::new();
        graph.add_edge("/a", "/b", Some("/ab".to_string()));
        graph.add_edge("/b", "/c", None);
        graph.add_edge("/d", "/b", Some("/db".to_string()));
        for (idx, node) in graph.nodes.values_mut().enumerate() {
            node.pos = Some([idx as f32 * 0.1, 0.5]);
        }
        graph.nodes.get_mut("/a").unwrap().color = Some([1, 2, 3]);
        ViewModel::new(graph, Theme::default(), [1000.0, 500.0])
    }

    #[test]
    fn display_name_strips_quotes_and_wraps() {
        assert_eq!(display_name("\"/node_src\""), "/node_src");
        let long = format!("/{}", "x".repeat(70));
        let wrapped = display_name(&long);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), WRAP_WIDTH);
    }

    #[test]
    fn wrap_keeps_words_together_when_they_fit() {
        assert_eq!(wrap_text("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap_text("", 5), Vec::<String>::new());
    }

    #[test]
    fn ports_use_labels_or_defaults() {
        let view = sample();
        let b = view.ports("/b").unwrap();
        assert_eq!(
            b.inputs.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["/ab", "/db"]
        );
        assert_eq!(
            b.outputs.iter().map(String::as_str).collect::<Vec<_>>(),
            vec![DEFAULT_OUTPUT_PORT]
        );
        assert!(view.ports("/c").unwrap().inputs.contains(DEFAULT_INPUT_PORT));
    }

    #[test]
    fn zoom_starts_at_default_and_clamps() {
        let mut zoom = ZoomTable::new([1000.0, 500.0]);
        assert_eq!(zoom.len(), 27);
        assert_eq!(zoom.level(), 2);
        assert_eq!(zoom.current().scale_x, 300.0);
        assert_eq!(zoom.current().font_size, 11.0);
        assert!(zoom.step(-1.0));
        assert!(zoom.step(-1.0));
        assert!(!zoom.step(-1.0));
        assert_eq!(zoom.level(), 0);
        for _ in 0..40 {
            zoom.step(1.0);
        }
        assert_eq!(zoom.level(), 26);
        assert_eq!(zoom.current().font_size, 18.0);
        assert!(!zoom.step(0.0));
    }

    #[test]
    fn selection_highlights_neighbours() {
        let mut view = sample();
        assert_eq!(view.node_background("/a"), view.theme.node_background);

        view.click("/b");
        assert_eq!(view.selected(), Some("/b"));
        assert_eq!(view.node_background("/a"), view.theme.highlight_subscribe);
        assert_eq!(view.node_background("/c"), view.theme.highlight_publish);
        assert_eq!(view.node_background("/b"), view.theme.node_background);
        let ab = view.graph.edges[0].clone();
        assert_eq!(view.edge_color(&ab), view.theme.highlight_edge);

        view.click("/b");
        assert_eq!(view.selected(), None);
        assert_eq!(view.edge_color(&ab), [1, 2, 3]);
        assert_eq!(view.node_background("/c"), view.theme.node_background);
    }

    #[test]
    fn clicking_another_node_moves_the_selection() {
        let mut view = sample();
        view.click("/a");
        view.click("/d");
        assert_eq!(view.selected(), Some("/d"));
        view.click("/unknown");
        assert_eq!(view.selected(), Some("/d"));
    }

    #[test]
    fn node_box_stacks_inputs_before_outputs() {
        let view = sample();
        let measure = |text: &str| text.chars().count() as f32 * 5.0;
        let node = node_box("/b", view.ports("/b"), [100.0, 50.0], 10.0, measure);
        assert_eq!(node.title_lines, vec!["/b".to_string()]);
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.outputs.len(), 1);
        assert!(node.inputs[1].top > node.inputs[0].top);
        assert!(node.outputs[0].top > node.inputs[1].top);
        assert_eq!(node.input_anchor("/ab").unwrap()[0], 100.0);
        assert_eq!(node.output_anchor("out").unwrap()[0], 100.0 + node.width);
        assert!(node.contains([101.0, 51.0]));
        assert!(!node.contains([99.0, 51.0]));
        assert!(node.height > node.title_height);
    }

    #[test]
    fn dragging_survives_zoom() {
        let mut view = sample();
        let before = view.screen_pos("/a").unwrap();
        view.drag_node("/a", [30.0, 15.0]);
        let after = view.screen_pos("/a").unwrap();
        assert!((after[0] - before[0] - 30.0).abs() < 1e-3);
        view.zoom.step(1.0);
        let pos = view.graph.nodes["/a"].pos.unwrap();
        assert!((pos[0] - 0.1).abs() < 1e-4);
        assert!((pos[1] - 0.6).abs() < 1e-4);
        let zoomed = view.screen_pos("/a").unwrap();
        assert!((zoomed[0] - 35.0).abs() < 1e-3);
        assert!((zoomed[1] - 105.0).abs() < 1e-3);
    }

    #[test]
    fn minimap_fits_content_with_uniform_scale() {
        let map = Minimap::fit([-100.0, 0.0], [300.0, 100.0], [10.0, 500.0, 200.0, 150.0]);
        // 400x100 content in a 200x150 frame: scale 0.5, centred vertically
        assert_eq!(map.project([-100.0, 0.0]), [10.0, 550.0]);
        assert_eq!(map.project([300.0, 100.0]), [210.0, 600.0]);
        assert_eq!(map.unproject([110.0, 575.0]), [100.0, 50.0]);
        assert!(map.contains([10.0, 500.0]));
        assert!(!map.contains([9.0, 500.0]));
    }

    #[test]
    fn minimap_of_a_single_point_does_not_divide_by_zero() {
        let map = Minimap::fit([5.0, 5.0], [5.0, 5.0], [0.0, 0.0, 100.0, 50.0]);
        let centre = map.project([5.0, 5.0]);
        assert!(centre[0].is_finite() && centre[1].is_finite());
    }
}
