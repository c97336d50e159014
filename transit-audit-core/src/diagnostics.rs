//! Append-only error and warning log.
//!
//! Diagnostics are kept as structured records and only rendered to text at
//! the report boundary through [`std::fmt::Display`].

use std::fmt;

use crate::element::{Element, ElementId, Member};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The city fails validation.
    Error,
    /// Noted but never fatal.
    Warning,
}

/// The element a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// Element identity.
    pub id: ElementId,
    /// `name`, else `ref`, else empty.
    pub label: String,
}

impl From<&Element> for ElementRef {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id,
            label: element.tags.label().to_owned(),
        }
    }
}

impl From<&Member> for ElementRef {
    fn from(member: &Member) -> Self {
        Self {
            id: member.target,
            label: String::new(),
        }
    }
}

impl From<ElementId> for ElementRef {
    fn from(id: ElementId) -> Self {
        Self {
            id,
            label: String::new(),
        }
    }
}

/// One error or warning.
///
/// # Examples
/// ```
/// use transit_audit_core::{Diagnostic, ElementId, ElementRef, Severity};
///
/// let diagnostic = Diagnostic {
///     severity: Severity::Warning,
///     message: "Missing ref on a route".into(),
///     element: Some(ElementRef { id: ElementId::relation(5), label: "Red".into() }),
/// };
/// assert_eq!(diagnostic.to_string(), "Missing ref on a route (relation 5, \"Red\")");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Offending element, when there is one.
    pub element: Option<ElementRef>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(element) = &self.element {
            write!(
                f,
                " ({} {}, \"{}\")",
                element.id.kind, element.id.id, element.label
            )?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics for one city.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// An empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>, element: Option<ElementRef>) {
        self.push(Severity::Error, message.into(), element);
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>, element: Option<ElementRef>) {
        self.push(Severity::Warning, message.into(), element);
    }

    /// Record an error when `is_error` holds, a warning otherwise.
    pub fn error_if(
        &mut self,
        is_error: bool,
        message: impl Into<String>,
        element: Option<ElementRef>,
    ) {
        let severity = if is_error {
            Severity::Error
        } else {
            Severity::Warning
        };
        self.push(severity, message.into(), element);
    }

    /// Append a diagnostic produced elsewhere.
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    fn push(&mut self, severity: Severity, message: String, element: Option<ElementRef>) {
        self.entries.push(Diagnostic {
            severity,
            message,
            element,
        });
    }

    /// All diagnostics in recording order.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Errors in recording order.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    /// Warnings in recording order.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(move |entry| entry.severity == severity)
    }

    /// True when no error was recorded; warnings never matter.
    #[must_use]
    pub fn is_good(&self) -> bool {
        self.errors().next().is_none()
    }
}

/// Render element ids as a sorted, comma-separated list.
pub(crate) fn format_id_list<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a ElementId>,
{
    let mut ids: Vec<&ElementId> = ids.into_iter().collect();
    ids.sort();
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
