//! Validation report types for schema graphs
//!
//! Severity levels, individual messages and the report that collects them.
//! The checks themselves live in the service crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity level for validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidationSeverity {
    /// Informational message
    Info,
    /// Suspicious but usable schema
    Warning,
    /// The schema cannot be used as is
    Error,
    /// Structural damage such as an inheritance cycle
    Critical,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: ValidationSeverity,
    pub message: String,
    /// Full name of the offending item, with member names appended after `/`
    pub path: Option<String>,
    /// Check that produced the message
    pub rule: Option<String>,
    pub context: HashMap<String, String>,
}

impl ValidationMessage {
    pub fn new(severity: ValidationSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            path: None,
            rule: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;

        if let Some(path) = &self.path {
            write!(f, " at {path}")?;
        }

        if let Some(rule) = &self.rule {
            write!(f, " [rule: {rule}]")?;
        }

        Ok(())
    }
}

/// Per-severity message counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub info_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub critical_count: usize,
}

/// Messages collected by one validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// No error or critical message was recorded
    pub is_valid: bool,
    pub messages: Vec<ValidationMessage>,
    pub summary: ValidationSummary,
    /// Messages past `max_messages` were counted but not kept
    pub truncated: bool,
    max_messages: usize,
}

impl ValidationReport {
    /// Empty report keeping at most `max_messages` messages
    #[must_use]
    pub fn new(max_messages: usize) -> Self {
        Self {
            is_valid: true,
            messages: Vec::new(),
            summary: ValidationSummary::default(),
            truncated: false,
            max_messages,
        }
    }

    pub fn add_message(&mut self, message: ValidationMessage) {
        if matches!(
            message.severity,
            ValidationSeverity::Error | ValidationSeverity::Critical
        ) {
            self.is_valid = false;
        }

        match message.severity {
            ValidationSeverity::Info => self.summary.info_count += 1,
            ValidationSeverity::Warning => self.summary.warning_count += 1,
            ValidationSeverity::Error => self.summary.error_count += 1,
            ValidationSeverity::Critical => self.summary.critical_count += 1,
        }

        if self.messages.len() < self.max_messages {
            self.messages.push(message);
        } else {
            self.truncated = true;
        }
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.add_message(ValidationMessage::new(ValidationSeverity::Warning, message));
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.add_message(ValidationMessage::new(ValidationSeverity::Error, message));
    }

    #[must_use]
    pub fn messages_by_severity(&self, severity: ValidationSeverity) -> Vec<&ValidationMessage> {
        self.messages
            .iter()
            .filter(|msg| msg.severity == severity)
            .collect()
    }

    /// Messages produced by `rule`
    #[must_use]
    pub fn messages_for_rule(&self, rule: &str) -> Vec<&ValidationMessage> {
        self.messages
            .iter()
            .filter(|msg| msg.rule.as_deref() == Some(rule))
            .collect()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.is_valid
    }

    /// Highest severity among the kept messages
    #[must_use]
    pub fn max_severity(&self) -> Option<ValidationSeverity> {
        self.messages.iter().map(|msg| msg.severity).max()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Validation Result: {}",
            if self.is_valid { "VALID" } else { "INVALID" }
        )?;
        writeln!(
            f,
            "Summary: {} info, {} warnings, {} errors, {} critical",
            self.summary.info_count,
            self.summary.warning_count,
            self.summary.error_count,
            self.summary.critical_count
        )?;

        if !self.messages.is_empty() {
            writeln!(f, "Messages:")?;
            for message in &self.messages {
                writeln!(f, "  {message}")?;
            }
        }
        if self.truncated {
            writeln!(f, "  ... further messages omitted")?;
        }

        Ok(())
    }
}
