//! Layout configuration
//!
//! Layouts are JSON trees of nested `rows` and `cols` containers whose leaves name panes.
//! A layout file is either one tree or an object of named trees; a default file is
//! compiled in and can be overridden by a file in the user's config directory.
mod error;
mod file;
mod layout;

pub use error::LayoutError;
pub use file::{
    DEBUG_LAYOUT_NAME, DEFAULT_LAYOUT, DEFAULT_LAYOUT_NAME, LayoutFile, LayoutSource, load,
    user_layout_path,
};
pub use layout::{Direction, LayoutNode};
