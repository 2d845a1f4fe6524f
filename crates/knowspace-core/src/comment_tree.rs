//! Threaded comment reconstruction.
//!
//! Comments are stored flat, each optionally pointing at the comment it
//! replies to. The thread view nests replies under their parent.

use std::collections::HashMap;

use crate::model::Comment;

/// Turn a flat, ordered comment list into a forest of root comments.
///
/// - Roots are the comments without a `reply_id`, in input order.
/// - Replies are attached under their parent at every depth, keeping their
///   relative input order.
/// - A reply whose `reply_id` matches no comment in `flat` is dropped.
pub fn build_comment_tree(flat: Vec<Comment>) -> Vec<Comment> {
  let mut roots = Vec::new();
  let mut replies: HashMap<i64, Vec<Comment>> = HashMap::new();

  for comment in flat {
    match comment.reply_id {
      None => roots.push(comment),
      Some(parent) => replies.entry(parent).or_default().push(comment),
    }
  }

  for root in &mut roots {
    attach_replies(root, &mut replies);
  }

  roots
}

// Each reply group is removed from the map when attached, so a group is
// placed at most once and the walk terminates even on malformed input.
fn attach_replies(node: &mut Comment, replies: &mut HashMap<i64, Vec<Comment>>) {
  if let Some(mut children) = replies.remove(&node.id) {
    for child in &mut children {
      attach_replies(child, replies);
    }
    node.children = children;
  }
}
