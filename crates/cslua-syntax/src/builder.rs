//! Construction surface for the node arena.
//!
//! The parser layer (and the test suites) build trees through `AstBuilder`;
//! once `finish` is called the tree is immutable.

use crate::ast::{Ast, NodeIndex, NodeList};
use crate::kind::SyntaxKind;
use crate::node::*;
use crate::ops::{AssignOp, BinaryOp, LiteralValue, UnaryOp};
use cslua_common::Range;

/// Incrementally builds an [`Ast`].
#[derive(Debug, Default)]
pub struct AstBuilder {
    ast: Ast,
}

impl AstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish building, returning the immutable tree.
    #[must_use]
    pub fn finish(self) -> Ast {
        self.ast
    }

    /// Append a node with explicit kind, range, and payload.
    pub fn node(&mut self, kind: SyntaxKind, range: Range, data: NodeData) -> NodeIndex {
        self.ast.push(Node {
            kind,
            range,
            flags: NodeFlags::empty(),
            data,
        })
    }

    /// Add flags to an already-built node.
    pub fn add_flags(&mut self, idx: NodeIndex, flags: NodeFlags) {
        if let Some(node) = self.ast_node_mut(idx) {
            node.flags |= flags;
        }
    }

    fn ast_node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        if idx.is_none() {
            return None;
        }
        // The arena is only mutable through the builder.
        let nodes = &mut self.ast;
        nodes.node_mut(idx)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn identifier(&mut self, range: Range, text: impl Into<String>) -> NodeIndex {
        self.node(
            SyntaxKind::Identifier,
            range,
            NodeData::Identifier(IdentifierData { text: text.into() }),
        )
    }

    pub fn generic_name(
        &mut self,
        range: Range,
        text: impl Into<String>,
        type_args: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::GenericName,
            range,
            NodeData::GenericName(GenericNameData {
                text: text.into(),
                type_args,
            }),
        )
    }

    pub fn literal(&mut self, range: Range, value: LiteralValue) -> NodeIndex {
        self.node(
            SyntaxKind::Literal,
            range,
            NodeData::Literal(LiteralData { value }),
        )
    }

    pub fn this_expr(&mut self, range: Range) -> NodeIndex {
        self.node(SyntaxKind::ThisExpr, range, NodeData::None)
    }

    pub fn base_expr(&mut self, range: Range) -> NodeIndex {
        self.node(SyntaxKind::BaseExpr, range, NodeData::None)
    }

    pub fn binary(
        &mut self,
        range: Range,
        left: NodeIndex,
        op: BinaryOp,
        right: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::BinaryExpr,
            range,
            NodeData::BinaryExpr(BinaryExprData { left, op, right }),
        )
    }

    pub fn assignment(
        &mut self,
        range: Range,
        left: NodeIndex,
        op: AssignOp,
        right: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::AssignmentExpr,
            range,
            NodeData::AssignmentExpr(AssignmentExprData { left, op, right }),
        )
    }

    pub fn prefix_unary(&mut self, range: Range, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::PrefixUnary,
            range,
            NodeData::UnaryExpr(UnaryExprData { op, operand }),
        )
    }

    pub fn postfix_unary(&mut self, range: Range, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::PostfixUnary,
            range,
            NodeData::UnaryExpr(UnaryExprData { op, operand }),
        )
    }

    pub fn conditional(
        &mut self,
        range: Range,
        cond: NodeIndex,
        when_true: NodeIndex,
        when_false: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ConditionalExpr,
            range,
            NodeData::ConditionalExpr(ConditionalExprData {
                cond,
                when_true,
                when_false,
            }),
        )
    }

    pub fn member_access(&mut self, range: Range, expr: NodeIndex, name: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::MemberAccess,
            range,
            NodeData::MemberAccess(MemberAccessData { expr, name }),
        )
    }

    pub fn conditional_access(
        &mut self,
        range: Range,
        expr: NodeIndex,
        when_not_null: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ConditionalAccess,
            range,
            NodeData::ConditionalAccess(ConditionalAccessData {
                expr,
                when_not_null,
            }),
        )
    }

    pub fn member_binding(&mut self, range: Range, name: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::MemberBinding,
            range,
            NodeData::MemberBinding(MemberBindingData { name }),
        )
    }

    pub fn invocation(&mut self, range: Range, callee: NodeIndex, args: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::Invocation,
            range,
            NodeData::Invocation(InvocationData { callee, args }),
        )
    }

    pub fn argument(&mut self, range: Range, name: Option<String>, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::Argument,
            range,
            NodeData::Argument(ArgumentData { name, expr }),
        )
    }

    pub fn element_access(&mut self, range: Range, expr: NodeIndex, args: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::ElementAccess,
            range,
            NodeData::ElementAccess(ElementAccessData { expr, args }),
        )
    }

    pub fn cast(&mut self, range: Range, ty: NodeIndex, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::CastExpr,
            range,
            NodeData::CastExpr(CastExprData { ty, expr }),
        )
    }

    pub fn checked(&mut self, range: Range, is_checked: bool, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::CheckedExpr,
            range,
            NodeData::CheckedExpr(CheckedExprData { is_checked, expr }),
        )
    }

    pub fn parenthesized(&mut self, range: Range, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::ParenthesizedExpr,
            range,
            NodeData::ParenthesizedExpr(ParenthesizedExprData { expr }),
        )
    }

    pub fn object_creation(
        &mut self,
        range: Range,
        ty: NodeIndex,
        args: NodeList,
        initializer: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ObjectCreation,
            range,
            NodeData::ObjectCreation(ObjectCreationData {
                ty,
                args,
                initializer,
            }),
        )
    }

    pub fn array_creation(
        &mut self,
        range: Range,
        ty: NodeIndex,
        size: NodeIndex,
        initializer: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ArrayCreation,
            range,
            NodeData::ArrayCreation(ArrayCreationData {
                ty,
                size,
                initializer,
            }),
        )
    }

    pub fn initializer_expr(
        &mut self,
        range: Range,
        kind: InitializerKind,
        exprs: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::InitializerExpr,
            range,
            NodeData::InitializerExpr(InitializerExprData { kind, exprs }),
        )
    }

    pub fn lambda(
        &mut self,
        range: Range,
        params: NodeList,
        body: NodeIndex,
        is_parenthesized: bool,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::LambdaExpr,
            range,
            NodeData::LambdaExpr(LambdaExprData {
                params,
                body,
                is_parenthesized,
            }),
        )
    }

    pub fn tuple(&mut self, range: Range, args: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::TupleExpr,
            range,
            NodeData::TupleExpr(TupleExprData { args }),
        )
    }

    pub fn interpolated_string(&mut self, range: Range, parts: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::InterpolatedString,
            range,
            NodeData::InterpolatedString(InterpolatedStringData { parts }),
        )
    }

    pub fn interpolated_text(&mut self, range: Range, text: impl Into<String>) -> NodeIndex {
        self.node(
            SyntaxKind::InterpolatedText,
            range,
            NodeData::InterpolatedText(InterpolatedTextData { text: text.into() }),
        )
    }

    pub fn interpolation(
        &mut self,
        range: Range,
        expr: NodeIndex,
        alignment: NodeIndex,
        format: Option<String>,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::Interpolation,
            range,
            NodeData::Interpolation(InterpolationData {
                expr,
                alignment,
                format,
            }),
        )
    }

    // =========================================================================
    // Type syntax
    // =========================================================================

    pub fn predefined_type(&mut self, range: Range, keyword: impl Into<String>) -> NodeIndex {
        self.node(
            SyntaxKind::PredefinedType,
            range,
            NodeData::PredefinedType(PredefinedTypeData {
                keyword: keyword.into(),
            }),
        )
    }

    pub fn named_type(&mut self, range: Range, name: NodeIndex, type_args: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::NamedType,
            range,
            NodeData::NamedType(NamedTypeData { name, type_args }),
        )
    }

    pub fn qualified_type(&mut self, range: Range, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::QualifiedType,
            range,
            NodeData::QualifiedType(QualifiedTypeData { left, right }),
        )
    }

    pub fn array_type(&mut self, range: Range, element: NodeIndex, rank: u32) -> NodeIndex {
        self.node(
            SyntaxKind::ArrayType,
            range,
            NodeData::ArrayType(ArrayTypeData { element, rank }),
        )
    }

    pub fn nullable_type(&mut self, range: Range, inner: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::NullableType,
            range,
            NodeData::NullableType(NullableTypeData { inner }),
        )
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn block(&mut self, range: Range, statements: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::Block,
            range,
            NodeData::Block(BlockData { statements }),
        )
    }

    pub fn expression_statement(&mut self, range: Range, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::ExpressionStatement,
            range,
            NodeData::ExpressionStatement(ExpressionStatementData { expr }),
        )
    }

    pub fn local_decl(
        &mut self,
        range: Range,
        ty: NodeIndex,
        declarators: NodeList,
        is_const: bool,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::LocalDecl,
            range,
            NodeData::LocalDecl(LocalDeclData {
                ty,
                declarators,
                is_const,
            }),
        )
    }

    pub fn local_decl_statement(&mut self, range: Range, decl: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::LocalDeclStatement,
            range,
            NodeData::ExpressionStatement(ExpressionStatementData { expr: decl }),
        )
    }

    pub fn variable_declarator(&mut self, range: Range, name: NodeIndex, init: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::VariableDeclarator,
            range,
            NodeData::VariableDeclarator(VariableDeclaratorData { name, init }),
        )
    }

    pub fn if_statement(
        &mut self,
        range: Range,
        cond: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::IfStatement,
            range,
            NodeData::IfStatement(IfStatementData {
                cond,
                then_branch,
                else_branch,
            }),
        )
    }

    pub fn while_statement(&mut self, range: Range, cond: NodeIndex, body: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::WhileStatement,
            range,
            NodeData::WhileStatement(WhileStatementData { cond, body }),
        )
    }

    pub fn do_statement(&mut self, range: Range, body: NodeIndex, cond: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::DoStatement,
            range,
            NodeData::DoStatement(DoStatementData { body, cond }),
        )
    }

    pub fn for_statement(
        &mut self,
        range: Range,
        decl: NodeIndex,
        initializers: NodeList,
        cond: NodeIndex,
        incrementors: NodeList,
        body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ForStatement,
            range,
            NodeData::ForStatement(ForStatementData {
                decl,
                initializers,
                cond,
                incrementors,
                body,
            }),
        )
    }

    pub fn foreach_statement(
        &mut self,
        range: Range,
        ty: NodeIndex,
        name: NodeIndex,
        expr: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ForEachStatement,
            range,
            NodeData::ForEachStatement(ForEachStatementData {
                ty,
                name,
                expr,
                body,
            }),
        )
    }

    pub fn switch_statement(&mut self, range: Range, expr: NodeIndex, sections: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::SwitchStatement,
            range,
            NodeData::SwitchStatement(SwitchStatementData { expr, sections }),
        )
    }

    pub fn switch_section(&mut self, range: Range, labels: NodeList, statements: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::SwitchSection,
            range,
            NodeData::SwitchSection(SwitchSectionData { labels, statements }),
        )
    }

    pub fn case_label(&mut self, range: Range, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::CaseLabel,
            range,
            NodeData::CaseLabel(CaseLabelData { expr }),
        )
    }

    pub fn default_label(&mut self, range: Range) -> NodeIndex {
        self.node(SyntaxKind::DefaultLabel, range, NodeData::None)
    }

    pub fn try_statement(
        &mut self,
        range: Range,
        block: NodeIndex,
        catches: NodeList,
        finally_block: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::TryStatement,
            range,
            NodeData::TryStatement(TryStatementData {
                block,
                catches,
                finally_block,
            }),
        )
    }

    pub fn catch_clause(
        &mut self,
        range: Range,
        ty: NodeIndex,
        ident: NodeIndex,
        when: NodeIndex,
        block: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::CatchClause,
            range,
            NodeData::CatchClause(CatchClauseData {
                ty,
                ident,
                when,
                block,
            }),
        )
    }

    pub fn using_statement(
        &mut self,
        range: Range,
        decl: NodeIndex,
        expr: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::UsingStatement,
            range,
            NodeData::UsingStatement(UsingStatementData { decl, expr, body }),
        )
    }

    pub fn return_statement(&mut self, range: Range, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::ReturnStatement,
            range,
            NodeData::ReturnStatement(ReturnStatementData { expr }),
        )
    }

    pub fn break_statement(&mut self, range: Range) -> NodeIndex {
        self.node(SyntaxKind::BreakStatement, range, NodeData::None)
    }

    pub fn continue_statement(&mut self, range: Range) -> NodeIndex {
        self.node(SyntaxKind::ContinueStatement, range, NodeData::None)
    }

    pub fn empty_statement(&mut self, range: Range) -> NodeIndex {
        self.node(SyntaxKind::EmptyStatement, range, NodeData::None)
    }

    pub fn goto_statement(&mut self, range: Range, target: GotoTarget) -> NodeIndex {
        self.node(
            SyntaxKind::GotoStatement,
            range,
            NodeData::GotoStatement(GotoStatementData { target }),
        )
    }

    pub fn labeled_statement(
        &mut self,
        range: Range,
        label: NodeIndex,
        statement: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::LabeledStatement,
            range,
            NodeData::LabeledStatement(LabeledStatementData { label, statement }),
        )
    }

    pub fn throw_statement(&mut self, range: Range, expr: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::ThrowStatement,
            range,
            NodeData::ThrowStatement(ThrowStatementData { expr }),
        )
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub fn compilation_unit(&mut self, range: Range, members: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::CompilationUnit,
            range,
            NodeData::CompilationUnit(CompilationUnitData { members }),
        )
    }

    pub fn namespace_decl(
        &mut self,
        range: Range,
        name: impl Into<String>,
        members: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::NamespaceDecl,
            range,
            NodeData::NamespaceDecl(NamespaceDeclData {
                name: name.into(),
                members,
            }),
        )
    }

    pub fn class_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        name: NodeIndex,
        type_params: NodeList,
        base_types: NodeList,
        members: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ClassDecl,
            range,
            NodeData::TypeDecl(TypeDeclData {
                modifiers,
                name,
                type_params,
                base_types,
                members,
            }),
        )
    }

    pub fn interface_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        name: NodeIndex,
        base_types: NodeList,
        members: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::InterfaceDecl,
            range,
            NodeData::TypeDecl(TypeDeclData {
                modifiers,
                name,
                type_params: Vec::new(),
                base_types,
                members,
            }),
        )
    }

    pub fn enum_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        name: NodeIndex,
        members: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::EnumDecl,
            range,
            NodeData::TypeDecl(TypeDeclData {
                modifiers,
                name,
                type_params: Vec::new(),
                base_types: Vec::new(),
                members,
            }),
        )
    }

    pub fn enum_member(&mut self, range: Range, name: NodeIndex, value: NodeIndex) -> NodeIndex {
        self.node(
            SyntaxKind::EnumMember,
            range,
            NodeData::EnumMember(EnumMemberData { name, value }),
        )
    }

    pub fn delegate_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        name: NodeIndex,
        params: NodeList,
        return_type: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::DelegateDecl,
            range,
            NodeData::DelegateDecl(DelegateDeclData {
                modifiers,
                name,
                params,
                return_type,
            }),
        )
    }

    pub fn field_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        ty: NodeIndex,
        declarators: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::FieldDecl,
            range,
            NodeData::FieldDecl(FieldDeclData {
                modifiers,
                ty,
                declarators,
            }),
        )
    }

    pub fn property_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        ty: NodeIndex,
        name: NodeIndex,
        accessors: NodeList,
        initializer: NodeIndex,
        expr_body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::PropertyDecl,
            range,
            NodeData::PropertyDecl(PropertyDeclData {
                modifiers,
                ty,
                name,
                accessors,
                initializer,
                expr_body,
            }),
        )
    }

    pub fn indexer_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        ty: NodeIndex,
        params: NodeList,
        accessors: NodeList,
        expr_body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::IndexerDecl,
            range,
            NodeData::IndexerDecl(IndexerDeclData {
                modifiers,
                ty,
                params,
                accessors,
                expr_body,
            }),
        )
    }

    pub fn event_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        ty: NodeIndex,
        name: NodeIndex,
        accessors: NodeList,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::EventDecl,
            range,
            NodeData::EventDecl(EventDeclData {
                modifiers,
                ty,
                name,
                accessors,
            }),
        )
    }

    pub fn method_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        return_type: NodeIndex,
        name: NodeIndex,
        type_params: NodeList,
        params: NodeList,
        body: NodeIndex,
        expr_body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::MethodDecl,
            range,
            NodeData::MethodDecl(MethodDeclData {
                modifiers,
                return_type,
                name,
                type_params,
                params,
                body,
                expr_body,
            }),
        )
    }

    pub fn constructor_decl(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        name: NodeIndex,
        params: NodeList,
        initializer: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::ConstructorDecl,
            range,
            NodeData::ConstructorDecl(ConstructorDeclData {
                modifiers,
                name,
                params,
                initializer,
                body,
            }),
        )
    }

    pub fn ctor_initializer(&mut self, range: Range, is_this: bool, args: NodeList) -> NodeIndex {
        self.node(
            SyntaxKind::CtorInitializer,
            range,
            NodeData::CtorInitializer(CtorInitializerData { is_this, args }),
        )
    }

    pub fn accessor_decl(
        &mut self,
        range: Range,
        kind: AccessorKind,
        modifiers: Modifiers,
        body: NodeIndex,
        expr_body: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::AccessorDecl,
            range,
            NodeData::AccessorDecl(AccessorDeclData {
                kind,
                modifiers,
                body,
                expr_body,
            }),
        )
    }

    pub fn parameter(
        &mut self,
        range: Range,
        modifiers: Modifiers,
        ty: NodeIndex,
        name: NodeIndex,
        default: NodeIndex,
    ) -> NodeIndex {
        self.node(
            SyntaxKind::Parameter,
            range,
            NodeData::Parameter(ParameterData {
                modifiers,
                ty,
                name,
                default,
            }),
        )
    }

    pub fn type_parameter(&mut self, range: Range, text: impl Into<String>) -> NodeIndex {
        self.node(
            SyntaxKind::TypeParameter,
            range,
            NodeData::Identifier(IdentifierData { text: text.into() }),
        )
    }
}
