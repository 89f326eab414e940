//! Plain text from HTML bodies.
//!
//! Text collection works over any document tree that implements
//! [`DocumentNode`]; the parser-backed implementation is for the
//! `markup5ever_rcdom` tree produced by `html5ever`.

use crate::error::Result;
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Elements whose content is never user-visible text.
const SKIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// The capabilities text collection needs from a document tree node.
pub trait DocumentNode: Sized {
    /// Element tag name, `None` for non-element nodes.
    fn tag_name(&self) -> Option<&str>;

    /// Text content, `None` for non-text nodes.
    fn text(&self) -> Option<String>;

    /// Child nodes in document order.
    fn child_nodes(&self) -> Vec<Self>;
}

/// Collects the text of `root` in document order.
///
/// Each non-blank text node is trimmed and appended after a single space;
/// subtrees of `script` and `style` elements are skipped. The result is
/// trimmed.
pub fn collect_text<N: DocumentNode>(root: N) -> String {
    let mut text = String::new();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if node
            .tag_name()
            .is_some_and(|tag| SKIPPED_ELEMENTS.iter().any(|s| tag.eq_ignore_ascii_case(s)))
        {
            continue;
        }

        if let Some(content) = node.text() {
            let content = content.trim();
            if !content.is_empty() {
                text.push(' ');
                text.push_str(content);
            }
        }

        // Reversed so the first child is popped next.
        pending.extend(node.child_nodes().into_iter().rev());
    }

    text.trim().to_string()
}

/// Parses `html` and returns its visible text.
///
/// # Errors
///
/// Returns an error if the document cannot be read.
pub fn html_to_text(html: &str) -> Result<String> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(collect_text(dom.document))
}

impl DocumentNode for Handle {
    fn tag_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        match &self.data {
            NodeData::Text { contents } => Some(String::from(&**contents.borrow())),
            _ => None,
        }
    }

    fn child_nodes(&self) -> Vec<Self> {
        self.children.borrow().clone()
    }
}
