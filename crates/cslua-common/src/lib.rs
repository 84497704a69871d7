//! Common types and utilities for the cslua compiler.
//!
//! This crate provides foundational types used across all cslua crates:
//! - Source spans (`Span`) as byte ranges
//! - Line/column positions (`Position`, `Range`, `LineMap`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCategory`)
//! - Comment scanning utilities (`CommentRange`, `CommentKind`)
//! - Centralized limits and thresholds
//! - Shared output options (`NewLineKind`)

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Position/Range types for line/column source locations
pub mod position;
pub use position::{LineMap, Position, Range};

// Diagnostics
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory};

// Comment scanning utilities
pub mod comments;
pub use comments::{CommentKind, CommentRange};

// Centralized limits and thresholds
pub mod limits;

// Shared option enums
pub mod common;
pub use common::NewLineKind;
