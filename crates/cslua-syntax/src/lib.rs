//! Arena-allocated syntax tree for the cslua compiler.
//!
//! The tree is immutable once built: nodes are appended through
//! [`AstBuilder`] and addressed by [`NodeIndex`]. Each node carries a kind
//! from the closed [`SyntaxKind`] enumeration, a line/column [`Range`], a
//! set of [`NodeFlags`], and a typed payload retrieved through the accessor
//! methods on [`Ast`].
//!
//! [`Range`]: cslua_common::Range

pub mod ast;
pub mod builder;
pub mod kind;
pub mod node;
pub mod ops;

pub use ast::{Ast, NodeIndex, NodeList};
pub use builder::AstBuilder;
pub use kind::SyntaxKind;
pub use node::{
    AccessorKind, GotoTarget, InitializerKind, Modifiers, Node, NodeData, NodeFlags,
};
pub use ops::{AssignOp, BinaryOp, LiteralValue, UnaryOp};
