use std::path::PathBuf;

/// Problems with a layout description
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("layout object must have exactly one of `rows` or `cols`, found {count} keys")]
    MultipleKeys { count: usize },

    #[error("unexpected layout key `{key}`, expected `rows` or `cols`")]
    UnexpectedKey { key: String },

    #[error("children of `{key}` must be a list")]
    ChildrenNotAList { key: &'static str },

    #[error("`{key}` must have at least one child")]
    EmptyChildren { key: &'static str },

    #[error("layout entries must be pane names or objects, found {found}")]
    UnexpectedValue { found: &'static str },

    #[error("unknown pane `{name}`")]
    UnknownPane { name: String },

    #[error("a single pane cannot be the top of a layout, wrap `{name}` in `rows` or `cols`")]
    TopLevelLeaf { name: String },

    #[error("no layout named `{name}` (available: {})", available.join(", "))]
    MissingLayout { name: String, available: Vec<String> },

    #[error("invalid JSON")]
    Parse(#[from] serde_json::Error),

    #[error("reading layout file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
