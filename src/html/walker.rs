use ego_tree::NodeRef;
use scraper::Node;

/// Maximum nesting depth the walker descends into. Deeper subtrees are pruned
/// so that hostile markup cannot exhaust the stack.
pub const MAX_DEPTH: usize = 512;

/// Event delivered to a [`Visitor`] during traversal.
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    /// A node is about to be traversed (pre-order).
    Enter(NodeRef<'a, Node>),
    /// All children of the most recently entered node have been traversed.
    Leave,
}

/// What the walker should do with the children of the node just entered.
pub enum Continue<'v, 'a> {
    /// Skip the subtree. No `Leave` is delivered for the pruned node.
    Prune,
    /// Visit the children with the same visitor.
    Descend,
    /// Visit the children with a different visitor owned by the current one.
    /// The current visitor still receives the `Leave` for this node.
    Delegate(&'v mut (dyn Visitor<'a> + 'v)),
}

/// A traversal behavior over a parsed HTML tree.
///
/// Visitors are stateful: the walker hands every event to `visit` and the
/// visitor accumulates whatever it needs. Returning [`Continue::Delegate`]
/// swaps in another visitor for the descendants of the current node, which
/// is how a link collector hands anchor contents to a text flattener.
pub trait Visitor<'a> {
    fn visit(&mut self, event: Visit<'a>) -> Continue<'_, 'a>;
}

/// Pre-order depth-first traversal of `node` and its descendants.
pub fn walk<'a>(node: NodeRef<'a, Node>, visitor: &mut dyn Visitor<'a>) {
    walk_at(node, visitor, 0);
}

fn walk_at<'a, 'v>(node: NodeRef<'a, Node>, visitor: &mut (dyn Visitor<'a> + 'v), depth: usize) {
    if depth > MAX_DEPTH {
        tracing::debug!(depth = depth, "Pruning HTML subtree beyond maximum depth");
        return;
    }

    match visitor.visit(Visit::Enter(node)) {
        Continue::Prune => return,
        Continue::Descend => {
            for child in node.children() {
                walk_at(child, &mut *visitor, depth + 1);
            }
        }
        Continue::Delegate(inner) => {
            for child in node.children() {
                walk_at(child, &mut *inner, depth + 1);
            }
        }
    }

    visitor.visit(Visit::Leave);
}
