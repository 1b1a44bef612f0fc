use crate::config::{RenderConfig, load_settings};
use crate::layout::{
    DagreEngine, GraphLayoutEngine, GraphvizEngine, LayoutProgram, align_layout,
    place_node_by_group,
};
use crate::layout_dump::write_layout_dump;
use crate::render::export_snapshot;
use crate::source::{ALL_GRAPH, load_graph};
use crate::theme::Theme;
use crate::view::ViewModel;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ros-node-viewer",
    version,
    about = "Lay out a ROS node/topic graph by group and show it as a node editor"
)]
pub struct Args {
    /// CARET architecture file, or a DOT file (.dot/.gv) from rqt_graph
    #[arg(long = "architecture_yaml_file", default_value = "architecture.yaml")]
    pub architecture_yaml_file: PathBuf,

    /// Named path of the architecture file to show, or all_graph
    #[arg(long = "target_path", default_value = ALL_GRAPH)]
    pub target_path: String,

    /// Group and window settings (JSON)
    #[arg(long = "setting_file", default_value = "setting.json")]
    pub setting_file: PathBuf,

    /// Layout backend
    #[arg(long = "engine", value_enum, default_value = "graphviz")]
    pub engine: EngineKind,

    /// Graphviz program used by the graphviz engine
    #[arg(long = "prog", value_enum, default_value = "dot")]
    pub prog: LayoutProgram,

    /// Write an SVG or PNG snapshot instead of opening the window
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Write the placed graph as JSON
    #[arg(long = "dump_layout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Graphviz,
    Dagre,
}

impl EngineKind {
    fn build(self, prog: LayoutProgram) -> Box<dyn GraphLayoutEngine> {
        match self {
            Self::Graphviz => Box::new(GraphvizEngine::new(prog)),
            Self::Dagre => Box::new(DagreEngine::default()),
        }
    }
}

pub fn run() -> Result<()> {
    env_logger::builder().format_timestamp(None).init();
    let args = Args::parse();

    let settings = load_settings(&args.setting_file)?;
    let mut graph = load_graph(&args.architecture_yaml_file, &args.target_path)?;

    let engine = args.engine.build(args.prog);
    log::info!("placing {} node(s) with {}", graph.node_count(), engine.name());
    place_node_by_group(&mut graph, &settings.groups, engine.as_ref())?;
    align_layout(&mut graph);

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &graph)?;
        log::info!("wrote layout to {}", path.display());
    }

    if let Some(output) = args.output.as_deref() {
        let config = RenderConfig::default();
        let view = ViewModel::new(graph, Theme::node_editor(), [config.width, config.height]);
        return export_snapshot(&view, &config, settings.app.font.as_deref(), output);
    }

    open_viewer(graph, &settings.app)
}

#[cfg(feature = "gui")]
fn open_viewer(graph: crate::graph::Graph, app: &crate::config::AppSetting) -> Result<()> {
    crate::gui::run_viewer(graph, app)
}

#[cfg(not(feature = "gui"))]
fn open_viewer(_graph: crate::graph::Graph, _app: &crate::config::AppSetting) -> Result<()> {
    Err(anyhow::anyhow!(
        "built without the `gui` feature, pass --output to export a snapshot"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arguments() {
        let args = Args::parse_from(["ros-node-viewer"]);
        assert_eq!(args.architecture_yaml_file, PathBuf::from("architecture.yaml"));
        assert_eq!(args.target_path, "all_graph");
        assert_eq!(args.setting_file, PathBuf::from("setting.json"));
        assert_eq!(args.engine, EngineKind::Graphviz);
        assert_eq!(args.prog, LayoutProgram::Dot);
        assert!(args.output.is_none());
    }

    #[test]
    fn parses_underscore_flags() {
        let args = Args::parse_from([
            "ros-node-viewer",
            "--architecture_yaml_file",
            "rosgraph.dot",
            "--target_path",
            "target_path_0",
            "--engine",
            "dagre",
            "--prog",
            "neato",
            "--dump_layout",
            "layout.json",
        ]);
        assert_eq!(args.architecture_yaml_file, PathBuf::from("rosgraph.dot"));
        assert_eq!(args.target_path, "target_path_0");
        assert_eq!(args.engine, EngineKind::Dagre);
        assert_eq!(args.prog, LayoutProgram::Neato);
        assert_eq!(args.dump_layout, Some(PathBuf::from("layout.json")));
    }
}
