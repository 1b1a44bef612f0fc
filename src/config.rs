use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the catch-all group that claims nodes no other group matches.
pub const OTHERS_GROUP: &str = "__others__";

/// Group name that matches every node.
pub const WILDCARD_GROUP: &str = "*";

const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/ubuntu/Ubuntu-C.ttf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid group setting `{name}`: {source}")]
    InvalidGroup {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("app_setting.window_size is not configured")]
    MissingWindowSize,
}

/// Which canvas axis the layout engine's rank direction is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutDirection {
    /// Engine x/y swapped before scaling, so ranks run left to right.
    Horizontal,
    #[default]
    Vertical,
}

impl From<String> for LayoutDirection {
    fn from(value: String) -> Self {
        if value == "horizontal" {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }
}

impl From<LayoutDirection> for String {
    fn from(value: LayoutDirection) -> Self {
        match value {
            LayoutDirection::Horizontal => "horizontal".to_string(),
            LayoutDirection::Vertical => "vertical".to_string(),
        }
    }
}

/// Placement and styling of one group on the shared canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStyle {
    #[serde(default)]
    pub direction: LayoutDirection,
    /// `[x, y, scale_x, scale_y]`: the group's normalized layout is scaled by
    /// the last two values and then translated by the first two.
    pub offset: [f32; 4],
    pub color: [u8; 3],
}

impl GroupStyle {
    /// Canvas position of a normalized, already y-flipped layout point.
    pub fn project(&self, pos: [f32; 2]) -> [f32; 2] {
        let [x, y, scale_x, scale_y] = self.offset;
        match self.direction {
            LayoutDirection::Horizontal => [x + pos[1] * scale_x, y + pos[0] * scale_y],
            LayoutDirection::Vertical => [x + pos[0] * scale_x, y + pos[1] * scale_y],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMatcher {
    Any,
    Substring(String),
}

impl GroupMatcher {
    pub fn from_name(name: &str) -> Self {
        if name == WILDCARD_GROUP {
            Self::Any
        } else {
            Self::Substring(name.to_string())
        }
    }

    pub fn matches(&self, node_id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Substring(needle) => node_id.contains(needle.as_str()),
        }
    }
}

/// One entry of the ordered group list. When several rules match a node the
/// last one in the list decides its position and color.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRule {
    pub name: String,
    pub matcher: GroupMatcher,
    pub style: GroupStyle,
}

impl GroupRule {
    pub fn new(name: &str, style: GroupStyle) -> Self {
        Self {
            name: name.to_string(),
            matcher: GroupMatcher::from_name(name),
            style,
        }
    }

    /// The rule used when nothing else claims a node.
    pub fn default_others() -> Self {
        Self::new(
            OTHERS_GROUP,
            GroupStyle {
                direction: LayoutDirection::Vertical,
                offset: [0.0, 0.0, 1.0, 1.0],
                color: [0, 0, 0],
            },
        )
    }

    pub fn matches(&self, node_id: &str) -> bool {
        self.matcher.matches(node_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSetting {
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub window_size: Option<[u32; 2]>,
}

impl AppSetting {
    pub fn window_size(&self) -> Result<[u32; 2], ConfigError> {
        self.window_size.ok_or(ConfigError::MissingWindowSize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app: AppSetting,
    pub groups: Vec<GroupRule>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSetting {
                font: Some(PathBuf::from(DEFAULT_FONT)),
                window_size: None,
            },
            groups: vec![GroupRule::default_others()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    app_setting: AppSetting,
    group_setting: serde_json::Map<String, serde_json::Value>,
}

/// Loads the JSON settings file. A missing file yields [`Settings::default`].
/// Files that are not strict JSON are retried as JSON5 so hand-edited
/// settings with comments or trailing commas still load.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    if !path.is_file() {
        log::warn!(
            "settings file {} not found, using the default group setting",
            path.display()
        );
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_settings(&contents).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    let settings = settings_from_file(parsed)?;
    log::info!(
        "loaded {} group(s) from {}",
        settings.groups.len(),
        path.display()
    );
    Ok(settings)
}

fn parse_settings(contents: &str) -> Result<SettingsFile, String> {
    match serde_json::from_str::<SettingsFile>(contents) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => {
            let value = json5::from_str::<serde_json::Value>(contents)
                .map_err(|_| json_err.to_string())?;
            serde_json::from_value(value).map_err(|err| err.to_string())
        }
    }
}

fn settings_from_file(file: SettingsFile) -> Result<Settings, ConfigError> {
    let mut groups = Vec::with_capacity(file.group_setting.len());
    for (name, value) in file.group_setting {
        let style: GroupStyle = serde_json::from_value(value).map_err(|source| {
            ConfigError::InvalidGroup {
                name: name.clone(),
                source,
            }
        })?;
        groups.push(GroupRule::new(&name, style));
    }
    Ok(Settings {
        app: file.app_setting,
        groups,
    })
}

/// Canvas and styling used by the headless SVG/PNG export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Size that normalized canvas coordinates are multiplied by.
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub font_family: String,
    pub margin: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            font_size: 13.0,
            font_family: "Ubuntu, DejaVu Sans, sans-serif".to_string(),
            margin: 40.0,
        }
    }
}
