//! Byte ranges and range-based text edits.
//!
//! Two range types keep absolute and declaration-relative offsets apart:
//! a `Span` always measures from the start of a file's source, while a
//! `LocalSpan` has been rebased into one declaration's body slice. Mixing
//! the two is the classic splicing bug, so the conversion is explicit.

use serde::Serialize;

/// Absolute byte range within one file's source. End-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Rebase this absolute span into the slice that starts at `base.start`.
    pub fn rebase(&self, base: Span) -> LocalSpan {
        LocalSpan {
            start: self.start - base.start,
            end: self.end - base.start,
        }
    }
}

/// Byte range relative to a declaration's body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalSpan {
    pub start: usize,
    pub end: usize,
}

/// A pending substitution inside one declaration's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub span: LocalSpan,
    pub text: String,
}

/// A substitution against the original file source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEdit {
    pub span: Span,
    pub text: String,
}

/// Apply edits to `source`, highest offset first so earlier spans stay valid.
///
/// Spans must not overlap; callers construct them from disjoint syntax nodes.
pub fn apply_edits(source: &str, edits: &[SourceEdit]) -> String {
    let mut out = source.to_string();
    let mut sorted: Vec<&SourceEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    for edit in sorted {
        out.replace_range(edit.span.start..edit.span.end, &edit.text);
    }
    out
}

/// Same as [`apply_edits`] for body-relative replacements.
pub fn apply_replacements(body: &str, replacements: &[Replacement]) -> String {
    let mut out = body.to_string();
    let mut sorted: Vec<&Replacement> = replacements.iter().collect();
    sorted.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    for rep in sorted {
        out.replace_range(rep.span.start..rep.span.end, &rep.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rebase_into_body() {
        let body = Span::new(100, 160);
        let inner = Span::new(110, 115);
        assert_eq!(inner.rebase(body), LocalSpan { start: 10, end: 15 });
    }

    #[test]
    fn edits_apply_back_to_front() {
        let source = "type A = B; type C = D;";
        let edits = vec![
            SourceEdit {
                span: Span::new(9, 10),
                text: "_ITA_B".into(),
            },
            SourceEdit {
                span: Span::new(21, 22),
                text: "_ITA_D".into(),
            },
        ];
        assert_eq!(
            apply_edits(source, &edits),
            "type A = _ITA_B; type C = _ITA_D;"
        );
    }

    #[test]
    fn edit_order_does_not_matter() {
        let source = "abcdef";
        let forward = vec![
            SourceEdit {
                span: Span::new(0, 1),
                text: "X".into(),
            },
            SourceEdit {
                span: Span::new(5, 6),
                text: "Y".into(),
            },
        ];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(apply_edits(source, &forward), apply_edits(source, &backward));
        assert_eq!(apply_edits(source, &forward), "XbcdeY");
    }

    #[test]
    fn deletion_is_empty_text() {
        // Statement is bytes 0..24, its trailing newline makes 0..25.
        let source = "import { A } from './a';\nconst x = 1;\n";
        let edits = vec![SourceEdit {
            span: Span::new(0, 25),
            text: String::new(),
        }];
        assert_eq!(apply_edits(source, &edits), "const x = 1;\n");
    }

    #[test]
    fn replacements_in_body() {
        let body = "{ foo: Bar; baz: Qux }";
        let reps = vec![
            Replacement {
                span: LocalSpan { start: 7, end: 10 },
                text: "_ITA_Bar".into(),
            },
            Replacement {
                span: LocalSpan { start: 17, end: 20 },
                text: "_ITA_Qux".into(),
            },
        ];
        assert_eq!(
            apply_replacements(body, &reps),
            "{ foo: _ITA_Bar; baz: _ITA_Qux }"
        );
    }
}
