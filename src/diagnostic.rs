//! Per-run error sink shared by the parser and the analyser.

use std::fmt::{Display, Write};

use ansi_term::{Colour, Style};

use crate::{ast::Span, error::SemanticError};

/// Which phase rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Severity {
    Syntax,
    Semantic,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Syntax => write!(f, "syntax"),
            Severity::Semantic => write!(f, "semantic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Syntax(String),
    Semantic(SemanticError),
}

/// Secondary location attached to a diagnostic, e.g. a prior definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub kind: DiagnosticKind,
    pub note: Option<Note>,
}

impl Diagnostic {
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            kind: DiagnosticKind::Syntax(message.into()),
            note: None,
        }
    }

    pub fn semantic(span: Span, error: SemanticError) -> Self {
        Self {
            span,
            kind: DiagnosticKind::Semantic(error),
            note: None,
        }
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Span) -> Self {
        self.note = Some(Note {
            message: message.into(),
            span,
        });
        self
    }

    pub fn severity(&self) -> Severity {
        match self.kind {
            DiagnosticKind::Syntax(_) => Severity::Syntax,
            DiagnosticKind::Semantic(_) => Severity::Semantic,
        }
    }

    pub fn semantic_error(&self) -> Option<&SemanticError> {
        match &self.kind {
            DiagnosticKind::Semantic(err) => Some(err),
            DiagnosticKind::Syntax(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::Syntax(msg) => msg.clone(),
            DiagnosticKind::Semantic(err) => err.to_string(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error at {}: {}", self.severity(), self.span, self.message())?;
        if let Some(note) = &self.note {
            write!(f, " (note at {}: {})", note.span, note.message)?;
        }
        Ok(())
    }
}

/// Ordered list of diagnostics. A run succeeded iff it stays empty.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "reported");
        self.items.push(diagnostic)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_syntax_errors(&self) -> bool {
        self.items
            .iter()
            .any(|d| d.severity() == Severity::Syntax)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn semantic_errors(&self) -> impl Iterator<Item = &SemanticError> {
        self.items.iter().filter_map(Diagnostic::semantic_error)
    }

    /// Render every diagnostic with the offending source line and a caret
    /// marker, rustc style.
    pub fn render(&self, src: &str, path: &str, color: bool) -> String {
        let paint = |style: Style, text: &str| {
            if color {
                style.paint(text).to_string()
            } else {
                text.to_string()
            }
        };
        let error_style = Colour::Red.bold();
        let note_style = Colour::Cyan.bold();
        let gutter = |s: &str| paint(Colour::Blue.bold(), s);
        let error_marker = |s: &str| paint(error_style, s);
        let note_marker = |s: &str| paint(note_style, s);

        let mut out = String::new();
        for diag in &self.items {
            let _ = writeln!(
                out,
                "{}: {}",
                paint(error_style, &format!("{} error", diag.severity())),
                paint(Style::new().bold(), &diag.message())
            );
            render_snippet(&mut out, src, path, diag.span, &gutter, &error_marker);
            if let Some(note) = &diag.note {
                let _ = writeln!(out, "{}: {}", paint(note_style, "note"), note.message);
                render_snippet(&mut out, src, path, note.span, &gutter, &note_marker);
            }
        }
        out
    }
}

fn render_snippet(
    out: &mut String,
    src: &str,
    path: &str,
    span: Span,
    gutter: &dyn Fn(&str) -> String,
    marker: &dyn Fn(&str) -> String,
) {
    let number = span.line.to_string();
    let pad = " ".repeat(number.len());
    let _ = writeln!(out, "{pad}{} {path}:{span}", gutter("-->"));
    let Some(text) = src.lines().nth(span.line.saturating_sub(1)) else {
        return;
    };
    let indent: String = text
        .chars()
        .take(span.column.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let available = text.len().saturating_sub(indent.len()).max(1);
    let carets = "^".repeat(span.len.clamp(1, available));
    let _ = writeln!(out, "{pad} {}", gutter("|"));
    let _ = writeln!(out, "{} {} {text}", gutter(&number), gutter("|"));
    let _ = writeln!(out, "{pad} {} {indent}{}", gutter("|"), marker(&carets));
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
