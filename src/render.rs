use crate::config::RenderConfig;
use crate::theme::hex;
use crate::text_metrics::text_width;
use crate::view::{NodeBox, ViewModel, edge_ports, node_box};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Canvas coordinates are multiplied by the configured size; the node's
/// position is its top-left corner.
pub fn layout_boxes(
    view: &ViewModel,
    config: &RenderConfig,
    font_file: Option<&Path>,
) -> BTreeMap<String, NodeBox> {
    let font_size = config.font_size;
    let measure = |text: &str| text_width(text, font_size, font_file);
    view.graph
        .nodes
        .values()
        .filter_map(|node| {
            let pos = node.pos?;
            let top_left = [pos[0] * config.width, pos[1] * config.height];
            Some((
                node.id.clone(),
                node_box(&node.id, view.ports(&node.id), top_left, font_size, &measure),
            ))
        })
        .collect()
}

pub fn render_svg(view: &ViewModel, config: &RenderConfig, font_file: Option<&Path>) -> String {
    let boxes = layout_boxes(view, config, font_file);
    let (min_x, min_y, max_x, max_y) = boxes.values().fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), node| {
            (
                min_x.min(node.x),
                min_y.min(node.y),
                max_x.max(node.x + node.width),
                max_y.max(node.y + node.height),
            )
        },
    );
    let (origin_x, origin_y, content_w, content_h) = if boxes.is_empty() {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        (min_x, min_y, max_x - min_x, max_y - min_y)
    };
    let margin = config.margin;
    let width = (content_w + margin * 2.0).max(200.0);
    let height = (content_h + margin * 2.0).max(200.0);
    let shift = |p: [f32; 2]| [p[0] - origin_x + margin, p[1] - origin_y + margin];

    let theme = &view.theme;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        hex(theme.canvas_background)
    ));

    for edge in &view.graph.edges {
        let (output, input) = edge_ports(edge);
        let (Some(from), Some(to)) = (boxes.get(&edge.from), boxes.get(&edge.to)) else {
            continue;
        };
        let (Some(start), Some(end)) = (from.output_anchor(output), to.input_anchor(input)) else {
            continue;
        };
        let start = shift(start);
        let end = shift(end);
        let handle = ((end[0] - start[0]).abs() * 0.5).max(40.0);
        svg.push_str(&format!(
            "<path d=\"M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
            start[0],
            start[1],
            start[0] + handle,
            start[1],
            end[0] - handle,
            end[1],
            end[0],
            end[1],
            hex(view.edge_color(edge))
        ));
    }

    for node in boxes.values() {
        svg.push_str(&node_svg(view, node, shift([node.x, node.y]), config));
    }

    svg.push_str("</svg>");
    svg
}

fn node_svg(view: &ViewModel, node: &NodeBox, origin: [f32; 2], config: &RenderConfig) -> String {
    let theme = &view.theme;
    let dx = origin[0] - node.x;
    let dy = origin[1] - node.y;
    let mut out = String::new();
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\"/>",
        origin[0],
        origin[1],
        node.width,
        node.height,
        hex(view.node_background(&node.id))
    ));
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\"/>",
        origin[0],
        origin[1],
        node.width,
        node.title_height,
        hex(view.title_color(&node.id))
    ));

    let text_x = origin[0] + node.padding;
    let first_baseline = origin[1] + node.padding * 0.5 + config.font_size;
    out.push_str(&text_svg(
        text_x,
        first_baseline,
        "start",
        &node.title_lines,
        node.line_height,
        theme.text,
        config,
    ));

    for row in &node.inputs {
        let baseline = row.top + dy + config.font_size;
        out.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"3\" fill=\"{}\"/>",
            row.anchor[0] + dx,
            row.anchor[1] + dy,
            hex(theme.highlight_edge)
        ));
        out.push_str(&text_svg(
            text_x,
            baseline,
            "start",
            &row.lines,
            node.line_height,
            theme.text,
            config,
        ));
    }
    for row in &node.outputs {
        let baseline = row.top + dy + config.font_size;
        out.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"3\" fill=\"{}\"/>",
            row.anchor[0] + dx,
            row.anchor[1] + dy,
            hex(theme.highlight_edge)
        ));
        let right = origin[0] + node.width - node.padding;
        out.push_str(&text_svg(
            right,
            baseline,
            "end",
            &row.lines,
            node.line_height,
            theme.text,
            config,
        ));
    }
    out
}

fn text_svg(
    x: f32,
    y: f32,
    anchor: &str,
    lines: &[String],
    line_height: f32,
    color: [u8; 3],
    config: &RenderConfig,
) -> String {
    let mut text = String::new();
    text.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&config.font_family),
        config.font_size,
        hex(color)
    ));
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: &Path) -> Result<()> {
    std::fs::write(output, svg)?;
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// Writes an SVG or PNG snapshot depending on the extension of `output`.
pub fn export_snapshot(
    view: &ViewModel,
    config: &RenderConfig,
    font_file: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let svg = render_svg(view, config, font_file);
    let is_png = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if is_png {
        write_output_png(&svg, output, config)?;
    } else {
        write_output_svg(&svg, output)?;
    }
    log::info!("wrote {}", output.display());
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::theme::Theme;

    fn placed_view() -> ViewModel {
        let mut graph = Graph::new();
        graph.add_edge("\"/talker\"", "\"/listener\"", Some("/chatter".to_string()));
        graph.nodes.get_mut("\"/talker\"").unwrap().pos = Some([0.0, 0.0]);
        graph.nodes.get_mut("\"/talker\"").unwrap().color = Some([0, 0, 64]);
        graph.nodes.get_mut("\"/listener\"").unwrap().pos = Some([0.2, 0.1]);
        ViewModel::new(graph, Theme::default(), [1920.0, 1080.0])
    }

    #[test]
    fn render_svg_basic() {
        let view = placed_view();
        let svg = render_svg(&view, &RenderConfig::default(), None);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">/talker</tspan>"));
        assert!(svg.contains(">/chatter</tspan>"));
        assert!(svg.contains("fill=\"#000040\""));
        // one link between the two ports, colored like the publisher
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains("stroke=\"#000040\""));
    }

    #[test]
    fn unplaced_nodes_are_skipped() {
        let mut view = placed_view();
        view.graph.ensure_node("/orphan");
        let boxes = layout_boxes(&view, &RenderConfig::default(), None);
        assert_eq!(boxes.len(), 2);
        let listener = &boxes["\"/listener\""];
        assert_eq!(listener.x, 384.0);
        assert_eq!(listener.y, 108.0);
    }

    #[test]
    fn export_writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.svg");
        export_snapshot(&placed_view(), &RenderConfig::default(), None, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("/listener"));
    }

    #[test]
    fn escapes_markup_in_names() {
        assert_eq!(escape_xml("<a&b>"), "&lt;a&amp;b&gt;");
    }
}
