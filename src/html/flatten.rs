use ego_tree::NodeRef;
use scraper::Node;

use super::walker::{walk, Continue, Visit, Visitor};

/// Concatenates the text nodes of a subtree in document order, each followed
/// by a single space.
///
/// The accumulator survives across walks until drained with [`take`], so one
/// flattener can collect several sibling subtrees.
///
/// [`take`]: TextFlattener::take
#[derive(Debug, Default)]
pub struct TextFlattener {
    out: String,
}

impl TextFlattener {
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Drain the accumulated text, leaving the flattener empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

impl<'a> Visitor<'a> for TextFlattener {
    fn visit(&mut self, event: Visit<'a>) -> Continue<'_, 'a> {
        if let Visit::Enter(node) = event {
            if let Node::Text(text) = node.value() {
                self.out.push_str(text);
                self.out.push(' ');
            }
        }
        Continue::Descend
    }
}

/// Flatten all text under `node` into one string.
pub fn flatten(node: NodeRef<'_, Node>) -> String {
    let mut flattener = TextFlattener::default();
    walk(node, &mut flattener);
    flattener.take()
}
