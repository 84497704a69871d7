//! Semantic model surface for the cslua compiler.
//!
//! The emitter never resolves names or infers types itself; it queries a
//! pre-built [`SemanticModel`] populated by an external provider (or, in
//! tests, by [`ModelBuilder`]). This crate defines the queried surface:
//! symbols, type shapes, method shapes, constant folds, and data-flow
//! records. All queries are `&self`; the model is shared read-only across
//! concurrently compiled units.

pub mod model;
pub mod symbols;

pub use model::{DataFlow, ModelBuilder, SemanticModel, TypeInfo};
pub use symbols::{
    MethodData, MethodKind, ParamData, SpecialType, Symbol, SymbolArena, SymbolFlags, SymbolId,
    SymbolKind, TypeData, TypeKind,
};
