//! # Structurally shared comment trees
//!
//! Cached comment pages are held as `Arc`-linked trees so that an optimistic
//! patch can rebuild exactly the path from a root to the target node while
//! every untouched subtree keeps its reference identity — consumers watching
//! for identity changes see precisely the nodes that changed.

use std::sync::Arc;

use cm_core::{Comment, CommentNode};
use uuid::Uuid;

/// One cached comment with its reply subtrees.
#[derive(Debug, Clone)]
pub struct SharedNode {
    pub comment: Comment,
    pub replies: Vec<Arc<SharedNode>>,
}

/// Converts a fetched page of eager nodes into the shared representation.
pub fn share(nodes: Vec<CommentNode>) -> Vec<Arc<SharedNode>> {
    nodes
        .into_iter()
        .map(|node| {
            Arc::new(SharedNode {
                comment: node.comment,
                replies: share(node.replies),
            })
        })
        .collect()
}

/// Pure tree rewrite: returns new roots with `patch` applied to the node
/// carrying `target`, or `None` when the target is not in this tree.
///
/// The returned tree shares every subtree that does not sit on the
/// root-to-target path.
pub fn patch_tree<F>(
    roots: &[Arc<SharedNode>],
    target: Uuid,
    patch: &F,
) -> Option<Vec<Arc<SharedNode>>>
where
    F: Fn(&Comment) -> Comment,
{
    let mut hit = false;
    let rebuilt: Vec<Arc<SharedNode>> = roots
        .iter()
        .map(|root| match patch_node(root, target, patch) {
            Some(new_root) => {
                hit = true;
                new_root
            }
            None => Arc::clone(root),
        })
        .collect();
    hit.then_some(rebuilt)
}

fn patch_node<F>(node: &Arc<SharedNode>, target: Uuid, patch: &F) -> Option<Arc<SharedNode>>
where
    F: Fn(&Comment) -> Comment,
{
    if node.comment.id == target {
        return Some(Arc::new(SharedNode {
            comment: patch(&node.comment),
            replies: node.replies.clone(),
        }));
    }
    for (i, child) in node.replies.iter().enumerate() {
        if let Some(new_child) = patch_node(child, target, patch) {
            let mut replies = node.replies.clone();
            replies[i] = new_child;
            return Some(Arc::new(SharedNode {
                comment: node.comment.clone(),
                replies,
            }));
        }
    }
    None
}

/// The single reply-composition slot shared across a whole comment tree:
/// at most one "currently composing under node X" at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeSlot(Option<Uuid>);

impl ComposeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opening under a new node closes whatever was open before.
    pub fn open(&mut self, under: Uuid) {
        self.0 = Some(under);
    }

    pub fn close(&mut self) {
        self.0 = None;
    }

    pub fn is_open(&self, under: Uuid) -> bool {
        self.0 == Some(under)
    }

    pub fn current(&self) -> Option<Uuid> {
        self.0
    }
}
