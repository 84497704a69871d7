//! Emit options.
//!
//! One `EmitOptions` value configures an emitter context for a unit. The
//! conditional-compilation symbol set comes from `#define` directives at the
//! head of the unit and from driver configuration.

use cslua_common::NewLineKind;
use rustc_hash::FxHashSet;

/// Options controlling emission for one compilation unit.
#[derive(Clone, Debug)]
pub struct EmitOptions {
    /// Newline sequence written by the output engine.
    pub new_line: NewLineKind,
    /// Strip source comments from the output.
    pub remove_comments: bool,
    /// Conditional-compilation symbols in effect for the unit.
    pub defines: FxHashSet<String>,
}

impl EmitOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            new_line: NewLineKind::LineFeed,
            remove_comments: false,
            defines: FxHashSet::default(),
        }
    }

    /// Options for release script builds: comments stripped.
    #[must_use]
    pub fn stripped() -> Self {
        Self {
            remove_comments: true,
            ..Self::new()
        }
    }

    /// Add a conditional-compilation symbol.
    #[must_use]
    pub fn define(mut self, symbol: impl Into<String>) -> Self {
        self.defines.insert(symbol.into());
        self
    }

    /// Whether a conditional-compilation symbol is defined.
    #[must_use]
    pub fn is_defined(&self, symbol: &str) -> bool {
        self.defines.contains(symbol)
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self::new()
    }
}
