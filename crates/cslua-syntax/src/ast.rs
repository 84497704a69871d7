//! The node arena.
//!
//! Nodes are appended once and never mutated; `NodeIndex` is a 4-byte handle
//! with a `NONE` sentinel for absent children.

use crate::kind::SyntaxKind;
use crate::node::*;
use cslua_common::Range;

/// Index of a node in the arena. `NodeIndex::NONE` marks an absent child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

/// An ordered list of child node indices.
pub type NodeList = Vec<NodeIndex>;

/// The arena holding one compilation unit's syntax tree.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

macro_rules! typed_accessor {
    ($name:ident, $variant:ident, $data:ty) => {
        #[must_use]
        pub fn $name(&self, idx: NodeIndex) -> Option<&$data> {
            match &self.get(idx)?.data {
                NodeData::$variant(data) => Some(data),
                _ => None,
            }
        }
    };
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its index.
    pub(crate) fn push(&mut self, node: Node) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(node);
        idx
    }

    /// Mutable access for the builder only.
    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        if idx.is_none() {
            return None;
        }
        self.nodes.get_mut(idx.0 as usize)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node, or `None` for the `NONE` sentinel or an out-of-range index.
    #[must_use]
    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        if idx.is_none() {
            return None;
        }
        self.nodes.get(idx.0 as usize)
    }

    /// Kind of a node; `None` sentinel yields `None`.
    #[must_use]
    pub fn kind(&self, idx: NodeIndex) -> Option<SyntaxKind> {
        self.get(idx).map(|n| n.kind)
    }

    /// Source range of a node. Synthesized nodes report their parent's range.
    #[must_use]
    pub fn range(&self, idx: NodeIndex) -> Range {
        self.get(idx).map(|n| n.range).unwrap_or_default()
    }

    /// Line the node starts on.
    #[must_use]
    pub fn start_line(&self, idx: NodeIndex) -> u32 {
        self.range(idx).start.line
    }

    /// Line the node ends on.
    #[must_use]
    pub fn end_line(&self, idx: NodeIndex) -> u32 {
        self.range(idx).end.line
    }

    /// Identifier text of an `Identifier` or `GenericName` node.
    #[must_use]
    pub fn identifier_text(&self, idx: NodeIndex) -> Option<&str> {
        match &self.get(idx)?.data {
            NodeData::Identifier(data) => Some(&data.text),
            NodeData::GenericName(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Strip parentheses, returning the innermost expression index.
    #[must_use]
    pub fn skip_parens(&self, mut idx: NodeIndex) -> NodeIndex {
        while let Some(node) = self.get(idx) {
            match &node.data {
                NodeData::ParenthesizedExpr(data) => idx = data.expr,
                _ => break,
            }
        }
        idx
    }

    // =========================================================================
    // Typed payload accessors
    // =========================================================================

    typed_accessor!(compilation_unit, CompilationUnit, CompilationUnitData);
    typed_accessor!(namespace_decl, NamespaceDecl, NamespaceDeclData);
    typed_accessor!(type_decl, TypeDecl, TypeDeclData);
    typed_accessor!(enum_member, EnumMember, EnumMemberData);
    typed_accessor!(delegate_decl, DelegateDecl, DelegateDeclData);
    typed_accessor!(field_decl, FieldDecl, FieldDeclData);
    typed_accessor!(property_decl, PropertyDecl, PropertyDeclData);
    typed_accessor!(indexer_decl, IndexerDecl, IndexerDeclData);
    typed_accessor!(event_decl, EventDecl, EventDeclData);
    typed_accessor!(method_decl, MethodDecl, MethodDeclData);
    typed_accessor!(constructor_decl, ConstructorDecl, ConstructorDeclData);
    typed_accessor!(ctor_initializer, CtorInitializer, CtorInitializerData);
    typed_accessor!(accessor_decl, AccessorDecl, AccessorDeclData);
    typed_accessor!(parameter, Parameter, ParameterData);
    typed_accessor!(variable_declarator, VariableDeclarator, VariableDeclaratorData);
    typed_accessor!(local_decl, LocalDecl, LocalDeclData);
    typed_accessor!(predefined_type, PredefinedType, PredefinedTypeData);
    typed_accessor!(named_type, NamedType, NamedTypeData);
    typed_accessor!(qualified_type, QualifiedType, QualifiedTypeData);
    typed_accessor!(array_type, ArrayType, ArrayTypeData);
    typed_accessor!(nullable_type, NullableType, NullableTypeData);
    typed_accessor!(block, Block, BlockData);
    typed_accessor!(expression_statement, ExpressionStatement, ExpressionStatementData);
    typed_accessor!(if_statement, IfStatement, IfStatementData);
    typed_accessor!(while_statement, WhileStatement, WhileStatementData);
    typed_accessor!(do_statement, DoStatement, DoStatementData);
    typed_accessor!(for_statement, ForStatement, ForStatementData);
    typed_accessor!(foreach_statement, ForEachStatement, ForEachStatementData);
    typed_accessor!(switch_statement, SwitchStatement, SwitchStatementData);
    typed_accessor!(switch_section, SwitchSection, SwitchSectionData);
    typed_accessor!(case_label, CaseLabel, CaseLabelData);
    typed_accessor!(try_statement, TryStatement, TryStatementData);
    typed_accessor!(catch_clause, CatchClause, CatchClauseData);
    typed_accessor!(using_statement, UsingStatement, UsingStatementData);
    typed_accessor!(return_statement, ReturnStatement, ReturnStatementData);
    typed_accessor!(goto_statement, GotoStatement, GotoStatementData);
    typed_accessor!(labeled_statement, LabeledStatement, LabeledStatementData);
    typed_accessor!(throw_statement, ThrowStatement, ThrowStatementData);
    typed_accessor!(identifier, Identifier, IdentifierData);
    typed_accessor!(generic_name, GenericName, GenericNameData);
    typed_accessor!(literal, Literal, LiteralData);
    typed_accessor!(interpolated_string, InterpolatedString, InterpolatedStringData);
    typed_accessor!(interpolated_text, InterpolatedText, InterpolatedTextData);
    typed_accessor!(interpolation, Interpolation, InterpolationData);
    typed_accessor!(member_access, MemberAccess, MemberAccessData);
    typed_accessor!(conditional_access, ConditionalAccess, ConditionalAccessData);
    typed_accessor!(member_binding, MemberBinding, MemberBindingData);
    typed_accessor!(invocation, Invocation, InvocationData);
    typed_accessor!(argument, Argument, ArgumentData);
    typed_accessor!(element_access, ElementAccess, ElementAccessData);
    typed_accessor!(binary_expr, BinaryExpr, BinaryExprData);
    typed_accessor!(assignment_expr, AssignmentExpr, AssignmentExprData);
    typed_accessor!(unary_expr, UnaryExpr, UnaryExprData);
    typed_accessor!(conditional_expr, ConditionalExpr, ConditionalExprData);
    typed_accessor!(cast_expr, CastExpr, CastExprData);
    typed_accessor!(checked_expr, CheckedExpr, CheckedExprData);
    typed_accessor!(parenthesized_expr, ParenthesizedExpr, ParenthesizedExprData);
    typed_accessor!(object_creation, ObjectCreation, ObjectCreationData);
    typed_accessor!(array_creation, ArrayCreation, ArrayCreationData);
    typed_accessor!(initializer_expr, InitializerExpr, InitializerExprData);
    typed_accessor!(lambda_expr, LambdaExpr, LambdaExprData);
    typed_accessor!(tuple_expr, TupleExpr, TupleExprData);

    /// Iterate the direct children of a node, in source order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let Some(node) = self.get(idx) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut push = |i: NodeIndex| {
            if i.is_some() {
                out.push(i);
            }
        };
        match &node.data {
            NodeData::None => {}
            NodeData::CompilationUnit(d) => d.members.iter().copied().for_each(&mut push),
            NodeData::NamespaceDecl(d) => d.members.iter().copied().for_each(&mut push),
            NodeData::TypeDecl(d) => {
                push(d.name);
                d.type_params.iter().copied().for_each(&mut push);
                d.base_types.iter().copied().for_each(&mut push);
                d.members.iter().copied().for_each(&mut push);
            }
            NodeData::EnumMember(d) => {
                push(d.name);
                push(d.value);
            }
            NodeData::DelegateDecl(d) => {
                push(d.name);
                d.params.iter().copied().for_each(&mut push);
                push(d.return_type);
            }
            NodeData::FieldDecl(d) => {
                push(d.ty);
                d.declarators.iter().copied().for_each(&mut push);
            }
            NodeData::PropertyDecl(d) => {
                push(d.ty);
                push(d.name);
                d.accessors.iter().copied().for_each(&mut push);
                push(d.initializer);
                push(d.expr_body);
            }
            NodeData::IndexerDecl(d) => {
                push(d.ty);
                d.params.iter().copied().for_each(&mut push);
                d.accessors.iter().copied().for_each(&mut push);
                push(d.expr_body);
            }
            NodeData::EventDecl(d) => {
                push(d.ty);
                push(d.name);
                d.accessors.iter().copied().for_each(&mut push);
            }
            NodeData::MethodDecl(d) => {
                push(d.return_type);
                push(d.name);
                d.type_params.iter().copied().for_each(&mut push);
                d.params.iter().copied().for_each(&mut push);
                push(d.body);
                push(d.expr_body);
            }
            NodeData::ConstructorDecl(d) => {
                push(d.name);
                d.params.iter().copied().for_each(&mut push);
                push(d.initializer);
                push(d.body);
            }
            NodeData::CtorInitializer(d) => d.args.iter().copied().for_each(&mut push),
            NodeData::AccessorDecl(d) => {
                push(d.body);
                push(d.expr_body);
            }
            NodeData::Parameter(d) => {
                push(d.ty);
                push(d.name);
                push(d.default);
            }
            NodeData::VariableDeclarator(d) => {
                push(d.name);
                push(d.init);
            }
            NodeData::LocalDecl(d) => {
                push(d.ty);
                d.declarators.iter().copied().for_each(&mut push);
            }
            NodeData::PredefinedType(_) => {}
            NodeData::NamedType(d) => {
                push(d.name);
                d.type_args.iter().copied().for_each(&mut push);
            }
            NodeData::QualifiedType(d) => {
                push(d.left);
                push(d.right);
            }
            NodeData::ArrayType(d) => push(d.element),
            NodeData::NullableType(d) => push(d.inner),
            NodeData::Block(d) => d.statements.iter().copied().for_each(&mut push),
            NodeData::ExpressionStatement(d) => push(d.expr),
            NodeData::IfStatement(d) => {
                push(d.cond);
                push(d.then_branch);
                push(d.else_branch);
            }
            NodeData::WhileStatement(d) => {
                push(d.cond);
                push(d.body);
            }
            NodeData::DoStatement(d) => {
                push(d.body);
                push(d.cond);
            }
            NodeData::ForStatement(d) => {
                push(d.decl);
                d.initializers.iter().copied().for_each(&mut push);
                push(d.cond);
                d.incrementors.iter().copied().for_each(&mut push);
                push(d.body);
            }
            NodeData::ForEachStatement(d) => {
                push(d.ty);
                push(d.name);
                push(d.expr);
                push(d.body);
            }
            NodeData::SwitchStatement(d) => {
                push(d.expr);
                d.sections.iter().copied().for_each(&mut push);
            }
            NodeData::SwitchSection(d) => {
                d.labels.iter().copied().for_each(&mut push);
                d.statements.iter().copied().for_each(&mut push);
            }
            NodeData::CaseLabel(d) => push(d.expr),
            NodeData::TryStatement(d) => {
                push(d.block);
                d.catches.iter().copied().for_each(&mut push);
                push(d.finally_block);
            }
            NodeData::CatchClause(d) => {
                push(d.ty);
                push(d.ident);
                push(d.when);
                push(d.block);
            }
            NodeData::UsingStatement(d) => {
                push(d.decl);
                push(d.expr);
                push(d.body);
            }
            NodeData::ReturnStatement(d) => push(d.expr),
            NodeData::GotoStatement(d) => match d.target {
                GotoTarget::Label(i) | GotoTarget::Case(i) => push(i),
                GotoTarget::Default => {}
            },
            NodeData::LabeledStatement(d) => {
                push(d.label);
                push(d.statement);
            }
            NodeData::ThrowStatement(d) => push(d.expr),
            NodeData::Identifier(_)
            | NodeData::Literal(_)
            | NodeData::InterpolatedText(_) => {}
            NodeData::GenericName(d) => d.type_args.iter().copied().for_each(&mut push),
            NodeData::InterpolatedString(d) => d.parts.iter().copied().for_each(&mut push),
            NodeData::Interpolation(d) => {
                push(d.expr);
                push(d.alignment);
            }
            NodeData::MemberAccess(d) => {
                push(d.expr);
                push(d.name);
            }
            NodeData::ConditionalAccess(d) => {
                push(d.expr);
                push(d.when_not_null);
            }
            NodeData::MemberBinding(d) => push(d.name),
            NodeData::Invocation(d) => {
                push(d.callee);
                d.args.iter().copied().for_each(&mut push);
            }
            NodeData::Argument(d) => push(d.expr),
            NodeData::ElementAccess(d) => {
                push(d.expr);
                d.args.iter().copied().for_each(&mut push);
            }
            NodeData::BinaryExpr(d) => {
                push(d.left);
                push(d.right);
            }
            NodeData::AssignmentExpr(d) => {
                push(d.left);
                push(d.right);
            }
            NodeData::UnaryExpr(d) => push(d.operand),
            NodeData::ConditionalExpr(d) => {
                push(d.cond);
                push(d.when_true);
                push(d.when_false);
            }
            NodeData::CastExpr(d) => {
                push(d.ty);
                push(d.expr);
            }
            NodeData::CheckedExpr(d) => push(d.expr),
            NodeData::ParenthesizedExpr(d) => push(d.expr),
            NodeData::ObjectCreation(d) => {
                push(d.ty);
                d.args.iter().copied().for_each(&mut push);
                push(d.initializer);
            }
            NodeData::ArrayCreation(d) => {
                push(d.ty);
                push(d.size);
                push(d.initializer);
            }
            NodeData::InitializerExpr(d) => d.exprs.iter().copied().for_each(&mut push),
            NodeData::LambdaExpr(d) => {
                d.params.iter().copied().for_each(&mut push);
                push(d.body);
            }
            NodeData::TupleExpr(d) => d.args.iter().copied().for_each(&mut push),
        }
        out
    }

    /// Walk the subtree rooted at `idx` in preorder, calling `visit` on each
    /// node index (including `idx` itself).
    pub fn walk(&self, idx: NodeIndex, visit: &mut impl FnMut(NodeIndex)) {
        if idx.is_none() {
            return;
        }
        visit(idx);
        for child in self.children(idx) {
            self.walk(child, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AstBuilder;
    use crate::ops::{BinaryOp, LiteralValue};
    use cslua_common::Range;

    #[test]
    fn test_none_sentinel() {
        assert!(NodeIndex::NONE.is_none());
        assert!(!NodeIndex(0).is_none());
        let ast = Ast::new();
        assert!(ast.get(NodeIndex::NONE).is_none());
    }

    #[test]
    fn test_typed_accessors_and_children() {
        let mut b = AstBuilder::new();
        let range = Range::on_line(0);
        let left = b.literal(range, LiteralValue::Int(1));
        let right = b.literal(range, LiteralValue::Int(2));
        let sum = b.binary(range, left, BinaryOp::Add, right);
        let ast = b.finish();

        let data = ast.binary_expr(sum).unwrap();
        assert_eq!(data.op, BinaryOp::Add);
        assert_eq!(ast.children(sum), vec![left, right]);
        assert!(ast.literal(sum).is_none());
    }

    #[test]
    fn test_skip_parens() {
        let mut b = AstBuilder::new();
        let range = Range::on_line(0);
        let inner = b.identifier(range, "x");
        let once = b.parenthesized(range, inner);
        let twice = b.parenthesized(range, once);
        let ast = b.finish();

        assert_eq!(ast.skip_parens(twice), inner);
        assert_eq!(ast.identifier_text(ast.skip_parens(twice)), Some("x"));
    }

    #[test]
    fn test_walk_visits_preorder() {
        let mut b = AstBuilder::new();
        let range = Range::on_line(0);
        let left = b.literal(range, LiteralValue::Int(1));
        let right = b.literal(range, LiteralValue::Int(2));
        let sum = b.binary(range, left, BinaryOp::Add, right);
        let ast = b.finish();

        let mut seen = Vec::new();
        ast.walk(sum, &mut |idx| seen.push(idx));
        assert_eq!(seen, vec![sum, left, right]);
    }
}
