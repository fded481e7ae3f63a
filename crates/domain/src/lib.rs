mod error;
mod models;
pub mod tree;
mod viewer;

pub use error::ValidationError;
pub use models::{Comment, NewComment, Post, ViewEvent};
pub use tree::CommentPath;
pub use viewer::{ViewerKey, UNKNOWN_VIEWER};
