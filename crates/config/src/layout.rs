use serde_json::{Map, Value};

use crate::{LayoutError, error::kind_of};

/// Direction a container lays its children out in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rows,
    Columns,
}

impl Direction {
    pub fn key(self) -> &'static str {
        match self {
            Direction::Rows => "rows",
            Direction::Columns => "cols",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "rows" => Some(Direction::Rows),
            "cols" => Some(Direction::Columns),
            _ => None,
        }
    }
}

/// Declarative layout tree
///
/// Containers split their area evenly between their children. Leaves name a pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutNode {
    Rows(Vec<LayoutNode>),
    Columns(Vec<LayoutNode>),
    Leaf(String),
}

impl LayoutNode {
    /// Parse a layout tree
    ///
    /// The root must be an object with a single `rows` or `cols` key. Below the root,
    /// strings are pane names and objects are nested containers.
    pub fn from_value(value: &Value) -> Result<Self, LayoutError> {
        match value {
            Value::Object(map) => Self::container(map),
            other => Err(LayoutError::NotAnObject {
                found: kind_of(other),
            }),
        }
    }

    fn container(map: &Map<String, Value>) -> Result<Self, LayoutError> {
        let mut entries = map.iter();
        let (key, children) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(LayoutError::MultipleKeys { count: map.len() }),
        };
        let direction =
            Direction::from_key(key).ok_or_else(|| LayoutError::UnexpectedKey { key: key.clone() })?;

        let Value::Array(children) = children else {
            return Err(LayoutError::ChildrenNotAList {
                key: direction.key(),
            });
        };
        if children.is_empty() {
            return Err(LayoutError::EmptyChildren {
                key: direction.key(),
            });
        }

        let children = children
            .iter()
            .map(|child| match child {
                Value::String(name) => Ok(LayoutNode::Leaf(name.clone())),
                Value::Object(map) => Self::container(map),
                other => Err(LayoutError::UnexpectedValue {
                    found: kind_of(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match direction {
            Direction::Rows => LayoutNode::Rows(children),
            Direction::Columns => LayoutNode::Columns(children),
        })
    }

    /// Pane names in document order
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LayoutNode::Leaf(name) => out.push(name),
            LayoutNode::Rows(children) | LayoutNode::Columns(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}
