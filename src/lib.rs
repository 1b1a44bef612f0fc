#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod graph;
#[cfg(feature = "gui")]
pub mod gui;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod source;
pub mod text_metrics;
pub mod theme;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Settings, load_settings};
pub use graph::{Edge, Graph, Node};
pub use layout::{align_layout, normalize_layout, place_node, place_node_by_group};
pub use source::load_graph;
