//! The semantic model: node-keyed query tables over the symbol arena.
//!
//! All tables are keyed by [`NodeIndex`] into the unit's syntax tree.
//! Queries take `&self` only; a model may be shared across units compiled
//! in parallel.

use crate::symbols::{
    MethodData, MethodKind, SpecialType, Symbol, SymbolArena, SymbolFlags, SymbolId, SymbolKind,
    TypeData, TypeKind,
};
use cslua_syntax::{LiteralValue, NodeIndex};
use rustc_hash::FxHashMap;

/// Result of a type query: the expression's natural type and the type it is
/// converted to in context.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeInfo {
    pub ty: Option<SymbolId>,
    pub converted: Option<SymbolId>,
}

impl TypeInfo {
    /// The converted type when present, else the natural type.
    #[must_use]
    pub fn effective(&self) -> Option<SymbolId> {
        self.converted.or(self.ty)
    }
}

/// Result of a region data-flow analysis.
#[derive(Clone, Debug, Default)]
pub struct DataFlow {
    pub succeeded: bool,
    pub variables_declared: Vec<SymbolId>,
    pub data_flows_in: Vec<SymbolId>,
    pub read_inside: Vec<SymbolId>,
    pub written_inside: Vec<SymbolId>,
}

/// The pre-built semantic model for one (or more) compilation units.
#[derive(Debug, Default)]
pub struct SemanticModel {
    symbols: SymbolArena,
    symbol_of_node: FxHashMap<NodeIndex, SymbolId>,
    declared_symbol_of_node: FxHashMap<NodeIndex, SymbolId>,
    type_of_node: FxHashMap<NodeIndex, TypeInfo>,
    constants: FxHashMap<NodeIndex, LiteralValue>,
    data_flow: FxHashMap<NodeIndex, DataFlow>,
    visible_of_node: FxHashMap<NodeIndex, Vec<SymbolId>>,
    output_ids: FxHashMap<SymbolId, String>,
}

impl SemanticModel {
    // =========================================================================
    // Core queries (§6 surface)
    // =========================================================================

    /// Resolved symbol of a name reference.
    #[must_use]
    pub fn symbol_info(&self, node: NodeIndex) -> Option<SymbolId> {
        self.symbol_of_node.get(&node).copied()
    }

    /// Symbol introduced by a declaration node.
    #[must_use]
    pub fn declared_symbol(&self, node: NodeIndex) -> Option<SymbolId> {
        self.declared_symbol_of_node.get(&node).copied()
    }

    /// Natural and converted type of an expression node.
    #[must_use]
    pub fn type_info(&self, node: NodeIndex) -> TypeInfo {
        self.type_of_node.get(&node).copied().unwrap_or_default()
    }

    /// Constant-folded value of an expression, if the fold succeeded.
    #[must_use]
    pub fn constant_value(&self, node: NodeIndex) -> Option<&LiteralValue> {
        self.constants.get(&node)
    }

    /// Data-flow analysis of a region; `None` means analysis failed.
    #[must_use]
    pub fn analyze_data_flow(&self, node: NodeIndex) -> Option<&DataFlow> {
        self.data_flow.get(&node).filter(|flow| flow.succeeded)
    }

    /// Namespace and type symbols visible at a position.
    #[must_use]
    pub fn lookup_namespaces_and_types(&self, node: NodeIndex) -> &[SymbolId] {
        self.visible_of_node
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The deduped identifier the emitter uses for a symbol.
    #[must_use]
    pub fn output_id(&self, id: SymbolId) -> &str {
        if let Some(mapped) = self.output_ids.get(&id) {
            return mapped;
        }
        self.symbols.get(id).map(|s| s.name.as_str()).unwrap_or("")
    }

    // =========================================================================
    // Symbol table access
    // =========================================================================

    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    #[must_use]
    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols.get(id).map(|s| s.name.as_str()).unwrap_or("")
    }

    #[must_use]
    pub fn symbol_kind(&self, id: SymbolId) -> Option<SymbolKind> {
        self.symbols.get(id).map(|s| s.kind)
    }

    #[must_use]
    pub fn symbol_flags(&self, id: SymbolId) -> SymbolFlags {
        self.symbols
            .get(id)
            .map(|s| s.flags)
            .unwrap_or(SymbolFlags::empty())
    }

    #[must_use]
    pub fn method_shape(&self, id: SymbolId) -> Option<&MethodData> {
        self.symbols.get(id)?.method()
    }

    #[must_use]
    pub fn type_shape(&self, id: SymbolId) -> Option<&TypeData> {
        self.symbols.get(id)?.type_shape()
    }

    // =========================================================================
    // Derived type predicates
    // =========================================================================

    /// The special-type tag of a type symbol.
    #[must_use]
    pub fn special_type(&self, id: SymbolId) -> SpecialType {
        self.type_shape(id)
            .map(|t| t.special)
            .unwrap_or(SpecialType::None)
    }

    /// Whether the type is `Nullable<T>`.
    #[must_use]
    pub fn is_nullable_type(&self, id: SymbolId) -> bool {
        self.special_type(id) == SpecialType::Nullable
    }

    /// The `T` of `Nullable<T>`, or the type itself.
    #[must_use]
    pub fn strip_nullable(&self, id: SymbolId) -> SymbolId {
        match self.type_shape(id) {
            Some(t) if t.special == SpecialType::Nullable && t.element_type.is_some() => {
                t.element_type
            }
            _ => id,
        }
    }

    /// Whether the type (after stripping `Nullable`) is a 32-bit integer.
    #[must_use]
    pub fn is_int32_type(&self, id: SymbolId) -> bool {
        self.special_type(self.strip_nullable(id)).is_int32()
    }

    /// Whether the type involves `bool` (directly or through `Nullable`).
    #[must_use]
    pub fn is_boolean_like(&self, id: SymbolId) -> bool {
        self.special_type(self.strip_nullable(id)) == SpecialType::Boolean
    }

    /// Whether the type is the string type.
    #[must_use]
    pub fn is_string_type(&self, id: SymbolId) -> bool {
        self.special_type(id) == SpecialType::String
    }

    /// Whether the type is a single-dimensional array.
    #[must_use]
    pub fn is_array_type(&self, id: SymbolId) -> bool {
        self.type_shape(id)
            .map(|t| t.type_kind == TypeKind::Array)
            .unwrap_or(false)
    }

    /// Whether an array's elements are of reference type (unset slots need
    /// the `false` placeholder).
    #[must_use]
    pub fn array_needs_placeholder(&self, array_ty: SymbolId) -> bool {
        let Some(shape) = self.type_shape(array_ty) else {
            return false;
        };
        if shape.type_kind != TypeKind::Array {
            return false;
        }
        self.is_reference_type(shape.element_type)
    }

    /// Whether a type is a reference type (class/interface/delegate/array/
    /// string/object).
    #[must_use]
    pub fn is_reference_type(&self, id: SymbolId) -> bool {
        let Some(shape) = self.type_shape(id) else {
            return false;
        };
        match shape.special {
            SpecialType::String | SpecialType::Object | SpecialType::Delegate
            | SpecialType::Array => true,
            SpecialType::None => matches!(
                shape.type_kind,
                TypeKind::Class | TypeKind::Interface | TypeKind::Delegate | TypeKind::Array
            ),
            _ => false,
        }
    }

    /// Whether the type is a delegate type.
    #[must_use]
    pub fn is_delegate_type(&self, id: SymbolId) -> bool {
        let Some(shape) = self.type_shape(id) else {
            return false;
        };
        shape.special == SpecialType::Delegate || shape.type_kind == TypeKind::Delegate
    }

    /// The invoke method of a delegate type.
    #[must_use]
    pub fn delegate_invoke_method(&self, id: SymbolId) -> Option<SymbolId> {
        let shape = self.type_shape(id)?;
        if shape.type_kind != TypeKind::Delegate && shape.special != SpecialType::Delegate {
            return None;
        }
        // The invoke method is interned as a member of the delegate type.
        self.members_of(id)
            .into_iter()
            .find(|&m| {
                self.method_shape(m)
                    .map(|md| md.method_kind == MethodKind::DelegateInvoke)
                    .unwrap_or(false)
            })
    }

    /// All symbols whose containing type is `ty`, in interning order.
    #[must_use]
    pub fn members_of(&self, ty: SymbolId) -> Vec<SymbolId> {
        (0..self.symbols.len() as u32)
            .map(SymbolId)
            .filter(|&id| {
                self.symbols
                    .get(id)
                    .map(|s| s.containing_type == ty)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Walk base types from `ty` to the nearest ancestor with an explicit or
    /// required-default constructor. Returns that ancestor, if any.
    #[must_use]
    pub fn nearest_constructed_base(&self, ty: SymbolId) -> Option<SymbolId> {
        let mut current = self.type_shape(ty)?.base_type;
        while current.is_some() {
            let shape = self.type_shape(current)?;
            if shape.is_from_source {
                return Some(current);
            }
            current = shape.base_type;
        }
        None
    }

    /// Whether `member` implements a member of some interface the containing
    /// type declares.
    #[must_use]
    pub fn implements_interface_member(&self, member: SymbolId) -> bool {
        self.symbols
            .get(member)
            .map(|s| !s.implements.is_empty())
            .unwrap_or(false)
    }
}

/// Mutating construction surface for [`SemanticModel`].
///
/// External providers and test suites populate the model through the
/// builder; the emitter only ever sees the finished, immutable model.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: SemanticModel,
}

impl ModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn finish(self) -> SemanticModel {
        self.model
    }

    /// Intern a symbol.
    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        self.model.symbols.alloc(symbol)
    }

    /// Re-open an interned symbol for amendment (builder-only).
    pub fn amend(&mut self, id: SymbolId, f: impl FnOnce(&mut Symbol)) {
        if let Some(symbol) = self.model.symbols.get_mut(id) {
            f(symbol);
        }
    }

    pub fn set_symbol(&mut self, node: NodeIndex, id: SymbolId) {
        self.model.symbol_of_node.insert(node, id);
    }

    pub fn set_declared_symbol(&mut self, node: NodeIndex, id: SymbolId) {
        self.model.declared_symbol_of_node.insert(node, id);
    }

    pub fn set_type_info(&mut self, node: NodeIndex, info: TypeInfo) {
        self.model.type_of_node.insert(node, info);
    }

    pub fn set_type(&mut self, node: NodeIndex, ty: SymbolId) {
        self.model.type_of_node.insert(
            node,
            TypeInfo {
                ty: Some(ty),
                converted: None,
            },
        );
    }

    pub fn set_constant(&mut self, node: NodeIndex, value: LiteralValue) {
        self.model.constants.insert(node, value);
    }

    pub fn set_data_flow(&mut self, node: NodeIndex, flow: DataFlow) {
        self.model.data_flow.insert(node, flow);
    }

    pub fn set_visible(&mut self, node: NodeIndex, symbols: Vec<SymbolId>) {
        self.model.visible_of_node.insert(node, symbols);
    }

    pub fn set_output_id(&mut self, id: SymbolId, output: impl Into<String>) {
        self.model.output_ids.insert(id, output.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_id_falls_back_to_name() {
        let mut b = ModelBuilder::new();
        let id = b.alloc(Symbol::new(SymbolKind::Local, "count"));
        let other = b.alloc(Symbol::new(SymbolKind::Local, "idx"));
        b.set_output_id(other, "idx0");
        let model = b.finish();
        assert_eq!(model.output_id(id), "count");
        assert_eq!(model.output_id(other), "idx0");
    }

    #[test]
    fn test_strip_nullable() {
        let mut b = ModelBuilder::new();
        let int32 = b.alloc({
            let mut s = Symbol::new(SymbolKind::NamedType, "int");
            s.type_data = Some(TypeData {
                special: SpecialType::Int32,
                type_kind: TypeKind::Struct,
                ..TypeData::default()
            });
            s
        });
        let nullable = b.alloc({
            let mut s = Symbol::new(SymbolKind::NamedType, "int?");
            s.type_data = Some(TypeData {
                special: SpecialType::Nullable,
                type_kind: TypeKind::Struct,
                element_type: int32,
                ..TypeData::default()
            });
            s
        });
        let model = b.finish();
        assert_eq!(model.strip_nullable(nullable), int32);
        assert!(model.is_int32_type(nullable));
        assert!(!model.is_boolean_like(nullable));
    }

    #[test]
    fn test_data_flow_failure_is_none() {
        let mut b = ModelBuilder::new();
        b.set_data_flow(
            NodeIndex(0),
            DataFlow {
                succeeded: false,
                ..DataFlow::default()
            },
        );
        let model = b.finish();
        assert!(model.analyze_data_flow(NodeIndex(0)).is_none());
    }
}
