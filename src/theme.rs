use serde::{Deserialize, Serialize};

/// Colors shared by the GUI and the snapshot export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Title bar of a node that carries no group color.
    pub title_bar: [u8; 3],
    pub node_background: [u8; 3],
    /// Background of nodes downstream of the selection.
    pub highlight_publish: [u8; 3],
    /// Background of nodes upstream of the selection.
    pub highlight_subscribe: [u8; 3],
    pub highlight_edge: [u8; 3],
    pub text: [u8; 3],
    pub canvas_background: [u8; 3],
    pub grid: [u8; 3],
}

impl Theme {
    pub fn node_editor() -> Self {
        Self {
            title_bar: [32, 32, 32],
            node_background: [64, 64, 64],
            highlight_publish: [64, 0, 0],
            highlight_subscribe: [0, 64, 0],
            highlight_edge: [196, 196, 196],
            text: [255, 255, 255],
            canvas_background: [30, 30, 38],
            grid: [44, 44, 54],
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::node_editor()
    }
}

pub fn hex(color: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}
