//! Unified diagnostics
//!
//! The trackers report typed violations; the driver folds them into this
//! flat, serializable form keyed by the closed taxonomy of
//! [`DiagnosticCode`]s. Hosts that kept real source text around can render
//! a diagnostic through `codespan-reporting` for rustc-style output.

use jd_ir::PlaceId;
use jd_span::{FileSpan, ProgramPoint};
use serde::{Deserialize, Serialize};

/// The closed set of semantic violation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// Same-scope rebinding of a live name without an explicit shadow
    DuplicateBinding,
    /// Use of a place whose value was moved away or dropped
    UseAfterMove,
    /// Use of a declared place that was never initialized
    UseOfUninitialized,
    /// Move of a place with a live borrow
    MoveWhileBorrowed,
    /// An access denied by a live borrow
    ConflictingBorrow,
    /// A borrow outliving, or used beyond, its referent
    DanglingReference,
}

impl DiagnosticCode {
    /// Stable kebab-case name, used as the rendered diagnostic code
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateBinding => "duplicate-binding",
            Self::UseAfterMove => "use-after-move",
            Self::UseOfUninitialized => "use-of-uninitialized",
            Self::MoveWhileBorrowed => "move-while-borrowed",
            Self::ConflictingBorrow => "conflicting-borrow",
            Self::DanglingReference => "dangling-reference",
        }
    }
}

/// A single semantic violation
///
/// Immutable once emitted. `place` is the offending binding (the moved-from
/// place, the rejected borrow's binding, the escaping holder); `point` is
/// the statement where the rule broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Violation category
    pub code: DiagnosticCode,
    /// Statement where the violation occurred
    pub point: ProgramPoint,
    /// The offending place
    pub place: PlaceId,
    /// Its source name
    pub place_name: String,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Convert to a codespan diagnostic for rustc-style output
    ///
    /// `span` is the source attribution of the offending statement, when the
    /// front end recorded one ([`jd_ir::Unit::span_at`]).
    pub fn to_codespan_diagnostic(
        &self,
        file_id: usize,
        span: Option<FileSpan>,
    ) -> codespan_reporting::diagnostic::Diagnostic<usize> {
        use codespan_reporting::diagnostic::{Diagnostic as RenderedDiagnostic, Label};

        let rendered = RenderedDiagnostic::error()
            .with_message(&self.message)
            .with_code(self.code.as_str());
        match span {
            Some(span) => rendered.with_labels(vec![
                Label::primary(file_id, span.range()).with_message(format!("`{}`", self.place_name)),
            ]),
            None => rendered.with_notes(vec![format!("at statement {}", self.point)]),
        }
    }
}

/// Ordered accumulation of diagnostics for one unit
///
/// The sink never rejects or reorders reports; checking continues after
/// every violation so a single run surfaces everything it can.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// All diagnostics reported so far, in program order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the sink, returning the collected diagnostics
    pub fn take_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Number of diagnostics collected
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostic {
        Diagnostic {
            code: DiagnosticCode::UseAfterMove,
            point: ProgramPoint(2),
            place: PlaceId(0),
            place_name: "x".to_string(),
            message: "use of moved place `x`".to_string(),
        }
    }

    #[test]
    fn codes_serialize_as_kebab_case() {
        let encoded = serde_json::to_string(&DiagnosticCode::DanglingReference)
            .expect("code must serialize");
        assert_eq!(encoded, "\"dangling-reference\"");
    }

    #[test]
    fn sink_preserves_report_order() {
        let mut sink = DiagnosticSink::new();
        assert!(sink.is_empty());
        sink.report(sample());
        sink.report(Diagnostic {
            point: ProgramPoint(5),
            ..sample()
        });
        let diagnostics = sink.take_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].point < diagnostics[1].point);
    }

    #[test]
    fn rendering_without_source_adds_a_point_note() {
        let rendered = sample().to_codespan_diagnostic(0, None);
        assert_eq!(rendered.code.as_deref(), Some("use-after-move"));
        assert!(rendered.notes.iter().any(|note| note.contains("statement 2")));
    }
}
