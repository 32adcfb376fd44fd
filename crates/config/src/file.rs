use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{LayoutError, LayoutNode};

/// The layout file compiled into the binary
pub const DEFAULT_LAYOUT: &str = include_str!("default_layout.json");

pub const DEFAULT_LAYOUT_NAME: &str = "default";
pub const DEBUG_LAYOUT_NAME: &str = "debug";

/// Where a layout file was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSource {
    Embedded,
    File(PathBuf),
}

/// Contents of a layout file
///
/// A file holds either one layout tree, or an object mapping layout names to trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutFile {
    Single(LayoutNode),
    Named(Vec<(String, LayoutNode)>),
}

impl LayoutFile {
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, LayoutError> {
        let Value::Object(map) = value else {
            // let the tree parser describe the problem
            return LayoutNode::from_value(value).map(LayoutFile::Single);
        };

        if map.contains_key("rows") || map.contains_key("cols") {
            return LayoutNode::from_value(value).map(LayoutFile::Single);
        }

        if map.is_empty() {
            return Err(LayoutError::MultipleKeys { count: 0 });
        }

        let layouts = map
            .iter()
            .map(|(name, tree)| Ok((name.clone(), LayoutNode::from_value(tree)?)))
            .collect::<Result<Vec<_>, LayoutError>>()?;
        Ok(LayoutFile::Named(layouts))
    }

    /// The embedded default layout file
    pub fn embedded() -> Result<Self, LayoutError> {
        Self::parse(DEFAULT_LAYOUT)
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            LayoutFile::Single(_) => vec![DEFAULT_LAYOUT_NAME],
            LayoutFile::Named(layouts) => layouts.iter().map(|(name, _)| name.as_str()).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LayoutNode> {
        match self {
            LayoutFile::Single(node) => Some(node),
            LayoutFile::Named(layouts) => layouts
                .iter()
                .find(|(candidate, _)| candidate == name)
                .map(|(_, node)| node),
        }
    }

    /// Pick the tree to display
    ///
    /// An explicit name must exist. Without one, the debug layout is used when `debug` is
    /// set and the file has one, otherwise the default layout.
    pub fn select(&self, name: Option<&str>, debug: bool) -> Result<&LayoutNode, LayoutError> {
        let name = match name {
            Some(name) => name,
            None if debug && self.has(DEBUG_LAYOUT_NAME) => DEBUG_LAYOUT_NAME,
            None => DEFAULT_LAYOUT_NAME,
        };
        tracing::debug!(%name, "selecting layout");

        self.get(name).ok_or_else(|| LayoutError::MissingLayout {
            name: name.to_string(),
            available: self.names().into_iter().map(str::to_string).collect(),
        })
    }

    fn has(&self, name: &str) -> bool {
        matches!(self, LayoutFile::Named(layouts) if layouts.iter().any(|(n, _)| n == name))
    }
}

/// `<config dir>/lui/layout.json`, if the platform has a config directory
pub fn user_layout_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lui").join("layout.json"))
}

/// Load the layout file
///
/// An explicit path must be readable. Otherwise the user layout file is used when it
/// exists, falling back to the embedded default.
pub fn load(path: Option<&Path>) -> Result<(LayoutFile, LayoutSource), LayoutError> {
    if let Some(path) = path {
        return read(path).map(|file| (file, LayoutSource::File(path.to_path_buf())));
    }

    match user_layout_path() {
        Some(path) if path.is_file() => {
            read(&path).map(|file| (file, LayoutSource::File(path)))
        }
        _ => {
            tracing::debug!("no user layout file, using the embedded default");
            LayoutFile::embedded().map(|file| (file, LayoutSource::Embedded))
        }
    }
}

fn read(path: &Path) -> Result<LayoutFile, LayoutError> {
    tracing::debug!(path = %path.display(), "reading layout file");
    let text = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    LayoutFile::parse(&text)
}
