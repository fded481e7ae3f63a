pub mod comments;
pub mod likes;
pub mod meta;
pub mod views;
