//! Structured error types shared across VFI crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`VfiError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (opcodes, parameter names, counts).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the VFI engine.
///
/// Classified glitch outcomes are experimental data and are never reported
/// through this type; only device, configuration, and storage failures are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum VfiError {
    /// Probe device did not respond, or broke the wire framing.
    #[error("protocol error: {0}")]
    Protocol(ErrorInfo),
    /// Target stayed silent through a full recovery cycle.
    #[error("target unresponsive: {0}")]
    TargetUnresponsive(ErrorInfo),
    /// Configured ranges cannot achieve the required voltage transitions.
    #[error("infeasible parameters: {0}")]
    Infeasible(ErrorInfo),
    /// Requested target operation is not registered.
    #[error("unknown target: {0}")]
    UnknownTarget(ErrorInfo),
    /// Requested glitch parameter does not exist.
    #[error("unknown parameter: {0}")]
    UnknownParameter(ErrorInfo),
    /// The device offers no command for the requested operation.
    #[error("not supported: {0}")]
    NotSupported(ErrorInfo),
    /// Invalid configuration detected before or during a campaign.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Result store failures.
    #[error("store error: {0}")]
    Store(ErrorInfo),
    /// Serial or filesystem I/O failures below the protocol layer.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl VfiError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            VfiError::Protocol(info)
            | VfiError::TargetUnresponsive(info)
            | VfiError::Infeasible(info)
            | VfiError::UnknownTarget(info)
            | VfiError::UnknownParameter(info)
            | VfiError::NotSupported(info)
            | VfiError::Config(info)
            | VfiError::Store(info)
            | VfiError::Io(info) => info,
        }
    }
}
