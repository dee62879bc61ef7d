use gslang_common::position::Span;
use serde::Serialize;

use super::NodeId;

/// A leading comment attached to a node, merged from adjacent comment
/// tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

impl Comment {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    /// Chain an adjacent comment onto this one.
    pub fn append(&mut self, text: &str, span: Span) {
        self.text.push('\n');
        self.text.push_str(text);
        self.span = self.span.merge(span);
    }
}

/// Non-structural metadata carried by every AST node.
///
/// The compiler records everything that is not grammar-shaped here: the
/// node's source range, its attached leading comment, the annotations that
/// decorate it, the unwind memo used by contract linearization, and -- for
/// scripts -- the path of the file they were read from. Keeping this out of
/// the node payloads lets later passes annotate the tree without
/// restructuring it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extras {
    pub span: Option<Span>,
    pub comment: Option<Comment>,
    pub annotations: Vec<NodeId>,
    pub unwound: bool,
    pub file_path: Option<String>,
}

impl Extras {
    /// Remove one annotation from the list. Used by annotation migration,
    /// the single licensed post-parse mutation of attachment state.
    pub fn remove_annotation(&mut self, annotation: NodeId) {
        self.annotations.retain(|&a| a != annotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gslang_common::position::Pos;

    fn span(a: u32, b: u32) -> Span {
        Span::new(
            Pos {
                offset: a,
                line: 1,
                column: a + 1,
            },
            Pos {
                offset: b,
                line: 1,
                column: b + 1,
            },
        )
    }

    #[test]
    fn comment_append_merges_span() {
        let mut comment = Comment::new("first", span(0, 5));
        comment.append("second", span(6, 12));
        assert_eq!(comment.text, "first\nsecond");
        assert_eq!(comment.span.start.offset, 0);
        assert_eq!(comment.span.end.offset, 12);
    }

    #[test]
    fn remove_annotation_keeps_others() {
        let mut extras = Extras::default();
        extras.annotations = vec![NodeId::from_raw(1), NodeId::from_raw(2), NodeId::from_raw(3)];
        extras.remove_annotation(NodeId::from_raw(2));
        assert_eq!(
            extras.annotations,
            vec![NodeId::from_raw(1), NodeId::from_raw(3)]
        );
    }
}
