//! Emitter error taxonomy.
//!
//! Errors abort the current unit; they are not recovered from within the
//! emitter. The driver decides whether to continue with other units.

use cslua_common::{Diagnostic, Range};
use cslua_syntax::{Ast, NodeIndex};

/// Category of an emitter error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitErrorKind {
    /// An accepted-kind node whose content falls outside the supported subset.
    Unsupported,
    /// A structural or semantic error not tied to a single construct rule
    /// (data-flow failure, dedup impossibility, missing constructor target).
    Compilation,
    /// An invariant violation inside the emitter itself.
    Internal,
}

/// An error raised during constraint checking or emission.
#[derive(Clone, Debug)]
pub struct EmitError {
    pub kind: EmitErrorKind,
    /// The offending source node, for line/column recovery.
    pub node: NodeIndex,
    pub message: String,
}

impl EmitError {
    pub fn unsupported(node: NodeIndex, message: impl Into<String>) -> Self {
        Self {
            kind: EmitErrorKind::Unsupported,
            node,
            message: message.into(),
        }
    }

    pub fn compilation(node: NodeIndex, message: impl Into<String>) -> Self {
        Self {
            kind: EmitErrorKind::Compilation,
            node,
            message: message.into(),
        }
    }

    pub fn internal(node: NodeIndex, message: impl Into<String>) -> Self {
        Self {
            kind: EmitErrorKind::Internal,
            node,
            message: message.into(),
        }
    }

    /// Convert to a renderable diagnostic, recovering the source range from
    /// the offending node.
    #[must_use]
    pub fn to_diagnostic(&self, ast: &Ast, file: &str) -> Diagnostic {
        let range = ast
            .get(self.node)
            .map(|n| n.range)
            .unwrap_or_else(Range::default);
        Diagnostic::error(file, range, self.message.clone())
    }
}

impl std::fmt::Display for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            EmitErrorKind::Unsupported => "unsupported",
            EmitErrorKind::Compilation => "compilation error",
            EmitErrorKind::Internal => "internal error",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

impl std::error::Error for EmitError {}

/// Result alias used across the emitter.
pub type EmitResult<T = ()> = Result<T, EmitError>;
