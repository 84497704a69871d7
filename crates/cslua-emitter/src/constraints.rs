//! The constraint checker.
//!
//! Rejects, before emission, any accepted-node-kind whose contents fall
//! outside the supported subset. Every rejection carries the offending node
//! so the driver can render a `file:line:column` diagnostic.

use crate::error::{EmitError, EmitResult};
use cslua_sema::{SemanticModel, SpecialType, SymbolFlags, SymbolKind, TypeKind};
use cslua_syntax::{Ast, Modifiers, NodeData, NodeIndex, SyntaxKind};

/// Position context threaded through the walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// Any position with no special allowance.
    Expression,
    /// Direct child of an expression statement, for-initializer/incrementor,
    /// or object-initializer entry: assignment is permitted here.
    AssignmentTarget,
    /// Operand of an explicit cast to a 32-bit int or 64-bit float.
    NumericCast,
}

/// Pre-emit validation of the accepted subset.
pub struct ConstraintChecker<'a> {
    ast: &'a Ast,
    model: &'a SemanticModel,
}

impl<'a> ConstraintChecker<'a> {
    #[must_use]
    pub fn new(ast: &'a Ast, model: &'a SemanticModel) -> Self {
        Self { ast, model }
    }

    /// Check one compilation unit.
    pub fn check_unit(&self, root: NodeIndex) -> EmitResult {
        self.check(root, Slot::Expression)
    }

    fn check(&self, idx: NodeIndex, slot: Slot) -> EmitResult {
        let Some(node) = self.ast.get(idx) else {
            return Ok(());
        };

        match &node.data {
            NodeData::MethodDecl(decl) => {
                self.reject_async(idx, decl.modifiers)?;
                if let Some(sym) = self.model.declared_symbol(idx) {
                    if self
                        .model
                        .symbol_flags(sym)
                        .contains(SymbolFlags::PURE)
                    {
                        self.check_purity(idx, decl.body)?;
                        self.check_purity(idx, decl.expr_body)?;
                    }
                }
            }
            NodeData::ConstructorDecl(decl) => {
                self.reject_async(idx, decl.modifiers)?;
            }
            NodeData::AccessorDecl(decl) => {
                self.reject_async(idx, decl.modifiers)?;
            }
            NodeData::Parameter(param) => {
                if param.modifiers.intersects(Modifiers::REF | Modifiers::OUT) {
                    return Err(EmitError::unsupported(
                        idx,
                        "ref and out parameters are not supported",
                    ));
                }
            }
            NodeData::ArrayType(array) => {
                if array.rank != 1 {
                    return Err(EmitError::unsupported(
                        idx,
                        "multi-dimensional arrays are not supported",
                    ));
                }
                if let Some(pre) = self.ast.predefined_type(array.element) {
                    if pre.keyword == "object" || pre.keyword == "dynamic" {
                        return Err(EmitError::unsupported(
                            idx,
                            format!("arrays of {} are not supported", pre.keyword),
                        ));
                    }
                }
            }
            NodeData::CheckedExpr(checked) => {
                if checked.is_checked {
                    return Err(EmitError::unsupported(
                        idx,
                        "checked arithmetic is not supported",
                    ));
                }
                // `unchecked` is a pass-through.
                return self.check(checked.expr, slot);
            }
            NodeData::Literal(lit) => {
                self.check_literal(idx, lit, slot)?;
            }
            NodeData::LocalDecl(decl) => {
                for &declarator in &decl.declarators {
                    if let Some(sym) = self.model.declared_symbol(declarator) {
                        let ty = self
                            .model
                            .symbol(sym)
                            .map(|s| s.ty)
                            .unwrap_or(cslua_sema::SymbolId::NONE);
                        if self
                            .model
                            .type_shape(ty)
                            .map(|t| t.type_kind == TypeKind::Tuple)
                            .unwrap_or(false)
                        {
                            return Err(EmitError::unsupported(
                                declarator,
                                "tuple-typed variable declarations are not supported",
                            ));
                        }
                    }
                }
            }
            NodeData::AssignmentExpr(_) => {
                if slot != Slot::AssignmentTarget {
                    return Err(EmitError::unsupported(
                        idx,
                        "assignments are only supported in statement positions",
                    ));
                }
            }
            NodeData::PropertyDecl(decl) => {
                if decl.expr_body.is_some() {
                    return Err(EmitError::unsupported(
                        idx,
                        "expression-bodied properties are not supported",
                    ));
                }
            }
            NodeData::IndexerDecl(decl) => {
                if decl.expr_body.is_some() {
                    return Err(EmitError::unsupported(
                        idx,
                        "expression-bodied indexers are not supported",
                    ));
                }
            }
            NodeData::CastExpr(cast) => {
                if let Some(pre) = self.ast.predefined_type(cast.ty) {
                    if pre.keyword == "dynamic" {
                        return Err(EmitError::unsupported(
                            idx,
                            "casts to dynamic are not supported",
                        ));
                    }
                }
                self.check(cast.ty, Slot::Expression)?;
                let operand_slot = if self.is_numeric_cast_target(cast.ty) {
                    Slot::NumericCast
                } else {
                    Slot::Expression
                };
                return self.check(cast.expr, operand_slot);
            }
            NodeData::LambdaExpr(_) => {
                // Lambda bodies are ordinary statement/expression positions.
            }
            _ => {}
        }

        // Recurse with slot context for the children that admit assignments.
        match &node.data {
            NodeData::ExpressionStatement(stmt) => {
                self.check(stmt.expr, Slot::AssignmentTarget)?;
            }
            NodeData::ForStatement(stmt) => {
                self.check(stmt.decl, Slot::Expression)?;
                for &init in &stmt.initializers {
                    self.check(init, Slot::AssignmentTarget)?;
                }
                self.check(stmt.cond, Slot::Expression)?;
                for &inc in &stmt.incrementors {
                    self.check(inc, Slot::AssignmentTarget)?;
                }
                self.check(stmt.body, Slot::Expression)?;
            }
            NodeData::InitializerExpr(init) => {
                for &entry in &init.exprs {
                    self.check(entry, Slot::AssignmentTarget)?;
                }
            }
            _ => {
                for child in self.ast.children(idx) {
                    self.check(child, Slot::Expression)?;
                }
            }
        }

        Ok(())
    }

    fn reject_async(&self, idx: NodeIndex, modifiers: Modifiers) -> EmitResult {
        if modifiers.contains(Modifiers::ASYNC) {
            return Err(EmitError::unsupported(
                idx,
                "async members are not supported",
            ));
        }
        Ok(())
    }

    fn is_numeric_cast_target(&self, ty: NodeIndex) -> bool {
        self.ast
            .predefined_type(ty)
            .map(|pre| pre.keyword == "int" || pre.keyword == "double")
            .unwrap_or(false)
    }

    fn check_literal(
        &self,
        idx: NodeIndex,
        lit: &cslua_syntax::node::LiteralData,
        slot: Slot,
    ) -> EmitResult {
        use cslua_syntax::LiteralValue;
        let LiteralValue::Int(value) = lit.value else {
            return Ok(());
        };
        // Integral literals wider than 32 bits are only accepted inside an
        // explicit cast to int or double. Literals typed uint are accepted
        // and overflow-converted at write time.
        let special = self
            .model
            .type_info(idx)
            .effective()
            .map(|ty| self.model.special_type(ty))
            .unwrap_or(SpecialType::None);
        let fits_i32 = value >= i64::from(i32::MIN) && value <= i64::from(i32::MAX);
        let fits_u32 = value >= 0 && value <= i64::from(u32::MAX);
        let accepted = match special {
            SpecialType::Int64 | SpecialType::UInt64 => slot == Slot::NumericCast,
            SpecialType::UInt32 => fits_u32,
            _ => fits_i32 || slot == Slot::NumericCast,
        };
        if !accepted {
            return Err(EmitError::unsupported(
                idx,
                "integral literal is outside the supported range; cast to int or double",
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Purity verification
    // =========================================================================

    /// Verify a pure-marked body contains no impure invocations, no
    /// non-local writes, and no impure property accesses.
    fn check_purity(&self, decl: NodeIndex, body: NodeIndex) -> EmitResult {
        if body.is_none() {
            return Ok(());
        }
        let mut result = Ok(());
        self.ast.walk(body, &mut |idx| {
            if result.is_err() {
                return;
            }
            let Some(node) = self.ast.get(idx) else {
                return;
            };
            match &node.data {
                NodeData::Invocation(inv) => {
                    if !self.invocation_is_pure(inv.callee) {
                        result = Err(EmitError::unsupported(
                            idx,
                            "pure member invokes an impure method",
                        ));
                    }
                }
                NodeData::AssignmentExpr(assign) => {
                    if !self.write_target_is_local(assign.left) {
                        result = Err(EmitError::unsupported(
                            idx,
                            "pure member writes non-local state",
                        ));
                    }
                }
                NodeData::UnaryExpr(unary)
                    if node.kind == SyntaxKind::PrefixUnary
                        || node.kind == SyntaxKind::PostfixUnary =>
                {
                    use cslua_syntax::UnaryOp;
                    if matches!(unary.op, UnaryOp::Increment | UnaryOp::Decrement)
                        && !self.write_target_is_local(unary.operand)
                    {
                        result = Err(EmitError::unsupported(
                            idx,
                            "pure member writes non-local state",
                        ));
                    }
                }
                NodeData::MemberAccess(_) => {
                    if !self.property_access_is_pure(idx) {
                        result = Err(EmitError::unsupported(
                            idx,
                            "pure member reads an impure property",
                        ));
                    }
                }
                _ => {}
            }
        });
        let _ = decl;
        result
    }

    fn invocation_is_pure(&self, callee: NodeIndex) -> bool {
        let name = self.callee_name_node(callee);
        let Some(sym) = self.model.symbol_info(name) else {
            return false;
        };
        let flags = self.model.symbol_flags(sym);
        if flags.contains(SymbolFlags::PURE) {
            return true;
        }
        // Accessors of pure properties qualify through their property.
        if let Some(method) = self.model.method_shape(sym) {
            if method.associated.is_some() {
                return self
                    .model
                    .symbol_flags(method.associated)
                    .contains(SymbolFlags::PURE);
            }
        }
        false
    }

    fn property_access_is_pure(&self, access: NodeIndex) -> bool {
        let Some(data) = self.ast.member_access(access) else {
            return true;
        };
        let Some(sym) = self.model.symbol_info(data.name) else {
            return true;
        };
        if self.model.symbol_kind(sym) != Some(SymbolKind::Property) {
            return true;
        }
        let flags = self.model.symbol_flags(sym);
        flags.contains(SymbolFlags::PURE) || flags.contains(SymbolFlags::AUTO)
    }

    fn write_target_is_local(&self, target: NodeIndex) -> bool {
        let target = self.ast.skip_parens(target);
        let Some(sym) = self.model.symbol_info(target) else {
            return false;
        };
        matches!(
            self.model.symbol_kind(sym),
            Some(SymbolKind::Local | SymbolKind::Parameter | SymbolKind::Discard)
        )
    }

    fn callee_name_node(&self, callee: NodeIndex) -> NodeIndex {
        match self.ast.get(callee).map(|n| &n.data) {
            Some(NodeData::MemberAccess(access)) => access.name,
            Some(NodeData::MemberBinding(binding)) => binding.name,
            _ => callee,
        }
    }
}
