//! Compiler diagnostics.

use std::fmt;

/// TS1204: ES module output requested for an ES3/ES5 target. Bundlers
/// consume the module syntax themselves, so the plugin never surfaces it.
pub const MODULES_BELOW_ES2015_DIAGNOSTIC: u32 = 1204;

/// Severity of a diagnostic, mirroring TypeScript's `DiagnosticCategory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

impl DiagnosticCategory {
    pub fn is_error(self) -> bool {
        self == DiagnosticCategory::Error
    }

    fn as_str(self) -> &'static str {
        match self {
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Suggestion => "suggestion",
            DiagnosticCategory::Message => "message",
        }
    }
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic text, either a single message or a chain of nested messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticMessage {
    Text(String),
    Chain(DiagnosticMessageChain),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessageChain {
    pub text: String,
    pub next: Vec<DiagnosticMessageChain>,
}

impl From<String> for DiagnosticMessage {
    fn from(text: String) -> Self {
        DiagnosticMessage::Text(text)
    }
}

impl From<&str> for DiagnosticMessage {
    fn from(text: &str) -> Self {
        DiagnosticMessage::Text(text.to_string())
    }
}

/// Where a diagnostic was reported. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub message: DiagnosticMessage,
    pub location: Option<DiagnosticLocation>,
}

impl Diagnostic {
    pub fn error(code: u32, message: impl Into<DiagnosticMessage>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(code: u32, message: impl Into<DiagnosticMessage>) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: usize, column: usize) -> Self {
        self.location = Some(DiagnosticLocation {
            file: file.into(),
            line,
            column,
        });
        self
    }

    /// Formats the diagnostic the way `tsc` prints it, using an already
    /// flattened message.
    pub fn format_with(&self, message: &str) -> String {
        match &self.location {
            Some(loc) => format!(
                "{}({},{}): {} TS{}: {}",
                loc.file, loc.line, loc.column, self.category, self.code, message
            ),
            None => {
                let mut category = self.category.as_str().to_string();
                if let Some(first) = category.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{category}: {message}")
            }
        }
    }
}

/// Flattens a message chain into a single string, indenting each nested
/// level by two spaces.
pub fn flatten_message(message: &DiagnosticMessage, new_line: &str) -> String {
    match message {
        DiagnosticMessage::Text(text) => text.clone(),
        DiagnosticMessage::Chain(chain) => {
            let mut result = String::new();
            flatten_chain(chain, new_line, 0, &mut result);
            result
        }
    }
}

fn flatten_chain(chain: &DiagnosticMessageChain, new_line: &str, depth: usize, out: &mut String) {
    if depth > 0 {
        out.push_str(new_line);
        out.push_str(&"  ".repeat(depth));
    }
    out.push_str(&chain.text);
    for next in &chain.next {
        flatten_chain(next, new_line, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_plain_text() {
        let message = DiagnosticMessage::from("Cannot find name 'foo'.");
        assert_eq!(flatten_message(&message, "\n"), "Cannot find name 'foo'.");
    }

    #[test]
    fn test_flatten_chain_indents_nested_messages() {
        let message = DiagnosticMessage::Chain(DiagnosticMessageChain {
            text: "Type 'A' is not assignable to type 'B'.".to_string(),
            next: vec![DiagnosticMessageChain {
                text: "Property 'x' is missing.".to_string(),
                next: vec![DiagnosticMessageChain {
                    text: "Deeper.".to_string(),
                    next: vec![],
                }],
            }],
        });
        assert_eq!(
            flatten_message(&message, "\n"),
            "Type 'A' is not assignable to type 'B'.\n  Property 'x' is missing.\n    Deeper."
        );
    }

    #[test]
    fn test_format_located_diagnostic() {
        let diagnostic = Diagnostic::error(1005, "';' expected.").with_location("main.ts", 3, 14);
        assert_eq!(
            diagnostic.format_with("';' expected."),
            "main.ts(3,14): error TS1005: ';' expected."
        );
    }

    #[test]
    fn test_format_unlocated_diagnostic() {
        let diagnostic = Diagnostic::warning(6059, "rootDir is ignored");
        assert_eq!(
            diagnostic.format_with("rootDir is ignored"),
            "Warning: rootDir is ignored"
        );
    }
}
