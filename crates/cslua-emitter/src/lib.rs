//! CS-dialect to Lua emitter core.
//!
//! Given one compilation unit's syntax tree plus a pre-built semantic model,
//! [`compile_unit`] produces a single Lua chunk whose runtime behavior
//! mirrors the source and whose line numbering matches the source
//! line-for-line wherever physically possible.
//!
//! The core comprises the output engine ([`writer`]), the scope and
//! deduplication engine ([`scopes`]), the constraint checker
//! ([`constraints`]), and the AST-directed emitter ([`emitter`]).

pub mod constraints;
pub mod emitter;
pub mod error;
pub mod options;
pub mod scopes;
pub mod vocab;
pub mod writer;

pub use emitter::{Emitter, compile_unit};
pub use error::{EmitError, EmitErrorKind, EmitResult};
pub use options::EmitOptions;
pub use writer::{LuaComment, LuaWriter};
