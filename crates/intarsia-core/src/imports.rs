//! Import statement records shared between the scanner and the splicer.

use serde::Serialize;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecifierKind {
    Default,
    Named,
    Namespace,
}

/// One binding introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpecifier {
    /// Name the binding is visible under in the importing file.
    pub local: String,
    /// Name on the exporting side. `"default"` for default imports, equal
    /// to `local` for namespace imports.
    pub imported: String,
    /// Verbatim specifier text, e.g. `Foo as Bar`.
    pub text: String,
    pub kind: SpecifierKind,
}

/// One import statement, enough to rewrite it with fewer specifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    /// Whole statement, semicolon included when present.
    pub span: Span,
    /// Unquoted module specifier, e.g. `./types`.
    pub specifier: String,
    /// Verbatim source token, quotes included, e.g. `'./types'`.
    pub source_text: String,
    /// `import type { ... }`.
    pub type_only: bool,
    pub trailing_semi: bool,
    pub specifiers: Vec<ImportSpecifier>,
}

impl ImportStatement {
    /// Local names bound by this statement.
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.specifiers.iter().map(|s| s.local.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement() -> ImportStatement {
        ImportStatement {
            span: Span::new(0, 40),
            specifier: "./types".into(),
            source_text: "'./types'".into(),
            type_only: false,
            trailing_semi: true,
            specifiers: vec![
                ImportSpecifier {
                    local: "Props".into(),
                    imported: "Props".into(),
                    text: "Props".into(),
                    kind: SpecifierKind::Named,
                },
                ImportSpecifier {
                    local: "Shape".into(),
                    imported: "default".into(),
                    text: "Shape".into(),
                    kind: SpecifierKind::Default,
                },
            ],
        }
    }

    #[test]
    fn locals_are_the_bound_names() {
        let stmt = statement();
        let locals: Vec<&str> = stmt.locals().collect();
        assert_eq!(locals, vec!["Props", "Shape"]);
    }
}
