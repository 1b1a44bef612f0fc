//! Interactive node editor window.

use anyhow::Result;
use eframe::egui::{
    self, Align2, Color32, FontId, Painter, PointerButton, Pos2, Rect, Sense, Stroke, Ui, Vec2,
    epaint::CubicBezierShape, vec2,
};
use std::path::Path;

use crate::config::AppSetting;
use crate::graph::Graph;
use crate::theme::Theme;
use crate::view::{Minimap, NodeBox, ViewModel, edge_ports, node_box};

const WINDOW_TITLE: &str = "Dear ROS Node Viewer";
const FONT_NAME: &str = "node-viewer";
const GRID_STEP: f32 = 64.0;
const MINIMAP_SIZE: Vec2 = vec2(200.0, 140.0);
const MINIMAP_MARGIN: f32 = 12.0;

/// Opens the viewer window and blocks until it is closed.
pub fn run_viewer(graph: Graph, app: &AppSetting) -> Result<()> {
    let [width, height] = app.window_size()?;
    let size = [width as f32, height as f32];
    let view = ViewModel::new(graph, Theme::node_editor(), size);
    let font = app.font.as_deref().and_then(load_font);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(size)
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            if let Some(bytes) = font {
                install_font(&cc.egui_ctx, bytes);
            }
            Ok(Box::new(NodeViewerApp::new(view)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("viewer failed: {err}"))
}

fn load_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("cannot read font {}: {err}, using the built-in font", path.display());
            return None;
        }
    };
    if ttf_parser::Face::parse(&bytes, 0).is_err() {
        log::warn!("{} is not a usable font, using the built-in font", path.display());
        return None;
    }
    Some(bytes)
}

fn install_font(ctx: &egui::Context, bytes: Vec<u8>) {
    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert(FONT_NAME.to_owned(), egui::FontData::from_owned(bytes));
    fonts
        .families
        .entry(egui::FontFamily::Proportional)
        .or_default()
        .insert(0, FONT_NAME.to_owned());
    ctx.set_fonts(fonts);
}

pub struct NodeViewerApp {
    view: ViewModel,
    pan: Vec2,
    dragging: Option<String>,
}

impl NodeViewerApp {
    pub fn new(view: ViewModel) -> Self {
        Self {
            view,
            pan: Vec2::ZERO,
            dragging: None,
        }
    }

    fn node_boxes(&self, ui: &Ui, origin: Pos2) -> Vec<NodeBox> {
        let font_size = self.view.font_size();
        let font_id = FontId::proportional(font_size);
        let measure = |text: &str| {
            ui.fonts(|fonts| {
                fonts
                    .layout_no_wrap(text.to_owned(), font_id.clone(), Color32::WHITE)
                    .size()
                    .x
            })
        };
        self.view
            .graph
            .nodes
            .keys()
            .filter_map(|id| {
                let pos = self.view.screen_pos(id)?;
                let top_left = [origin.x + pos[0], origin.y + pos[1]];
                Some(node_box(id, self.view.ports(id), top_left, font_size, &measure))
            })
            .collect()
    }

    fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let origin = rect.center() + self.pan;
        draw_background(&painter, rect, origin, &self.view.theme);

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON && self.view.zoom.step(scroll) {
                log::debug!("zoom level {}", self.view.zoom.level());
            }
        }

        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }

        let boxes = self.node_boxes(ui, origin);
        let minimap = fit_minimap(rect, &boxes);
        let pointer = response.interact_pointer_pos();
        let on_minimap = pointer.is_some_and(|pos| minimap.contains([pos.x, pos.y]));
        let hit = |pos: Option<Pos2>| {
            let pos = pos.filter(|_| !on_minimap)?;
            boxes
                .iter()
                .rev()
                .find(|node| node.contains([pos.x, pos.y]))
                .map(|node| node.id.clone())
        };

        if response.drag_started_by(PointerButton::Primary) {
            self.dragging = hit(pointer);
        }
        if response.dragged_by(PointerButton::Primary)
            && let Some(id) = self.dragging.as_deref()
        {
            let delta = response.drag_delta();
            self.view.drag_node(id, [delta.x, delta.y]);
        }
        if response.drag_stopped() {
            self.dragging = None;
        }
        if response.clicked_by(PointerButton::Primary) {
            if on_minimap && let Some(pos) = pointer {
                let target = minimap.unproject([pos.x, pos.y]);
                self.pan += rect.center() - Pos2::new(target[0], target[1]);
            } else if let Some(id) = hit(pointer) {
                self.view.click(&id);
            }
        }

        let origin = rect.center() + self.pan;
        let boxes = self.node_boxes(ui, origin);
        self.draw_links(&painter, &boxes);
        for node in &boxes {
            self.draw_node(&painter, node);
        }
        self.draw_minimap(&painter, rect, &boxes);
    }

    /// Overview in the bottom-left corner: every node in its group color and
    /// the visible part of the canvas as an outline. Clicking it recentres
    /// the view.
    fn draw_minimap(&self, painter: &Painter, rect: Rect, boxes: &[NodeBox]) {
        let theme = &self.view.theme;
        let map = fit_minimap(rect, boxes);
        let [x, y, w, h] = map.frame;
        let frame = Rect::from_min_size(Pos2::new(x, y), vec2(w, h));
        painter.rect_filled(frame, 2.0, color32(theme.canvas_background));
        painter.rect_stroke(frame, 2.0, Stroke::new(1.0, color32(theme.grid)));

        let project = |x: f32, y: f32| {
            let [px, py] = map.project([x, y]);
            Pos2::new(px, py)
        };
        for node in boxes {
            let min = project(node.x, node.y);
            let max = project(node.x + node.width, node.y + node.height);
            let color = color32(self.view.title_color(&node.id));
            painter.rect_filled(Rect::from_min_max(min, max), 0.0, color);
        }
        let viewport = Rect::from_min_max(
            project(rect.left(), rect.top()),
            project(rect.right(), rect.bottom()),
        );
        painter.rect_stroke(viewport, 0.0, Stroke::new(1.0, color32(theme.text)));
    }

    fn draw_links(&self, painter: &Painter, boxes: &[NodeBox]) {
        for edge in &self.view.graph.edges {
            let (output, input) = edge_ports(edge);
            let from = boxes.iter().find(|node| node.id == edge.from);
            let to = boxes.iter().find(|node| node.id == edge.to);
            let (Some(start), Some(end)) = (
                from.and_then(|node| node.output_anchor(output)),
                to.and_then(|node| node.input_anchor(input)),
            ) else {
                continue;
            };
            let start = Pos2::new(start[0], start[1]);
            let end = Pos2::new(end[0], end[1]);
            let handle = ((end.x - start.x).abs() * 0.5).max(40.0);
            let curve = CubicBezierShape::from_points_stroke(
                [start, start + vec2(handle, 0.0), end - vec2(handle, 0.0), end],
                false,
                Color32::TRANSPARENT,
                Stroke::new(2.0, color32(self.view.edge_color(edge))),
            );
            painter.add(curve);
        }
    }

    fn draw_node(&self, painter: &Painter, node: &NodeBox) {
        let theme = &self.view.theme;
        let font = FontId::proportional(self.view.font_size());
        let text_color = color32(theme.text);
        let body = Rect::from_min_size(Pos2::new(node.x, node.y), vec2(node.width, node.height));
        let title = Rect::from_min_size(body.min, vec2(node.width, node.title_height));

        painter.rect_filled(body, 4.0, color32(self.view.node_background(&node.id)));
        painter.rect_filled(title, 4.0, color32(self.view.title_color(&node.id)));
        if self.view.selected() == Some(node.id.as_str()) {
            painter.rect_stroke(body, 4.0, Stroke::new(1.5, color32(theme.highlight_edge)));
        }

        let mut y = node.y + node.padding * 0.5;
        for line in &node.title_lines {
            painter.text(
                Pos2::new(node.x + node.padding, y),
                Align2::LEFT_TOP,
                line,
                font.clone(),
                text_color,
            );
            y += node.line_height;
        }

        let port_color = color32(theme.highlight_edge);
        for row in &node.inputs {
            painter.circle_filled(Pos2::new(row.anchor[0], row.anchor[1]), 3.0, port_color);
            for (idx, line) in row.lines.iter().enumerate() {
                painter.text(
                    Pos2::new(node.x + node.padding, row.top + idx as f32 * node.line_height),
                    Align2::LEFT_TOP,
                    line,
                    font.clone(),
                    text_color,
                );
            }
        }
        for row in &node.outputs {
            painter.circle_filled(Pos2::new(row.anchor[0], row.anchor[1]), 3.0, port_color);
            for (idx, line) in row.lines.iter().enumerate() {
                painter.text(
                    Pos2::new(
                        node.x + node.width - node.padding,
                        row.top + idx as f32 * node.line_height,
                    ),
                    Align2::RIGHT_TOP,
                    line,
                    font.clone(),
                    text_color,
                );
            }
        }
    }
}

impl eframe::App for NodeViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.draw_canvas(ui));
    }
}

/// Fits the node boxes and the visible canvas into the minimap frame.
fn fit_minimap(rect: Rect, boxes: &[NodeBox]) -> Minimap {
    let content = boxes.iter().fold(rect, |acc, node| {
        acc.union(Rect::from_min_size(
            Pos2::new(node.x, node.y),
            vec2(node.width, node.height),
        ))
    });
    let frame = Rect::from_min_size(
        Pos2::new(
            rect.left() + MINIMAP_MARGIN,
            rect.bottom() - MINIMAP_MARGIN - MINIMAP_SIZE.y,
        ),
        MINIMAP_SIZE,
    );
    Minimap::fit(
        [content.left(), content.top()],
        [content.right(), content.bottom()],
        [frame.left(), frame.top(), frame.width(), frame.height()],
    )
}

fn color32(color: [u8; 3]) -> Color32 {
    Color32::from_rgb(color[0], color[1], color[2])
}

fn draw_background(painter: &Painter, rect: Rect, origin: Pos2, theme: &Theme) {
    painter.rect_filled(rect, 0.0, color32(theme.canvas_background));
    let stroke = Stroke::new(1.0, color32(theme.grid));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(GRID_STEP);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += GRID_STEP;
    }
    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(GRID_STEP);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += GRID_STEP;
    }
}
