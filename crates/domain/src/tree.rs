//! Walks over a post's comment tree.
//!
//! A comment is addressed by its [`CommentPath`]: the index into the
//! top-level sequence followed by one index per level of `replies`.
//! Comments are only ever appended, so a path stays valid for the
//! lifetime of the post.

use crate::Comment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPath(Vec<usize>);

impl CommentPath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Top-level comments have depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Dotted document path of the addressed comment, e.g. `comments.2.replies.0`.
    pub fn document_path(&self) -> String {
        let mut path = String::from("comments");
        for (level, idx) in self.0.iter().enumerate() {
            if level > 0 {
                path.push_str(".replies");
            }
            path.push('.');
            path.push_str(&idx.to_string());
        }
        path
    }

    pub fn id_field(&self) -> String {
        format!("{}.id", self.document_path())
    }

    pub fn replies_field(&self) -> String {
        format!("{}.replies", self.document_path())
    }
}

/// Depth-first search over every branch; returns the first match.
pub fn locate(comments: &[Comment], id: &str) -> Option<CommentPath> {
    let mut trail = Vec::new();
    if locate_in(comments, id, &mut trail) {
        Some(CommentPath(trail))
    } else {
        None
    }
}

fn locate_in(nodes: &[Comment], id: &str, trail: &mut Vec<usize>) -> bool {
    for (idx, node) in nodes.iter().enumerate() {
        trail.push(idx);
        if node.id == id || locate_in(&node.replies, id, trail) {
            return true;
        }
        trail.pop();
    }
    false
}

pub fn node_at<'a>(comments: &'a [Comment], path: &CommentPath) -> Option<&'a Comment> {
    let (first, rest) = path.0.split_first()?;
    let mut node = comments.get(*first)?;
    for &idx in rest {
        node = node.replies.get(idx)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(comments: &'a mut [Comment], path: &CommentPath) -> Option<&'a mut Comment> {
    let (first, rest) = path.0.split_first()?;
    let mut node = comments.get_mut(*first)?;
    for &idx in rest {
        node = node.replies.get_mut(idx)?;
    }
    Some(node)
}

/// Appends `reply` under the comment with `parent_id`.
///
/// Hands the reply back untouched when no comment in the tree carries that id.
pub fn attach_reply(
    comments: &mut [Comment],
    parent_id: &str,
    reply: Comment,
) -> Result<CommentPath, Comment> {
    let Some(path) = locate(comments, parent_id) else {
        return Err(reply);
    };
    match node_at_mut(comments, &path) {
        Some(parent) => {
            parent.replies.push(reply);
            Ok(path)
        }
        None => Err(reply),
    }
}
