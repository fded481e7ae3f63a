mod comments;
mod posts;
mod views;
