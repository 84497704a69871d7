//! Node representation and typed payloads.
//!
//! A `Node` pairs a [`SyntaxKind`] with its source [`Range`], flag set, and
//! a payload variant. Payload structs hold child indices only; the arena in
//! [`crate::ast`] owns all nodes.

use crate::ast::{NodeIndex, NodeList};
use crate::kind::SyntaxKind;
use crate::ops::{AssignOp, BinaryOp, LiteralValue, UnaryOp};
use cslua_common::Range;

bitflags::bitflags! {
    /// Per-node flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// The node was fabricated by the emitter and has no source position.
        const SYNTHESIZED = 1 << 0;
        /// The node is exempt from the line-for-line debug contract.
        const LINE_MISMATCH_ALLOWED = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Syntactic modifiers on declarations and parameters.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const CONST = 1 << 5;
        const READONLY = 1 << 6;
        const ABSTRACT = 1 << 7;
        const VIRTUAL = 1 << 8;
        const OVERRIDE = 1 << 9;
        const SEALED = 1 << 10;
        const PARTIAL = 1 << 11;
        const EXTERN = 1 << 12;
        const ASYNC = 1 << 13;
        const NEW = 1 << 14;
        const REF = 1 << 15;
        const OUT = 1 << 16;
        const PARAMS = 1 << 17;
    }
}

/// Property/indexer/event accessor kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
    Add,
    Remove,
}

impl AccessorKind {
    /// The identifier prefix an accessor method is emitted under.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            AccessorKind::Get => "get_",
            AccessorKind::Set => "set_",
            AccessorKind::Add => "add_",
            AccessorKind::Remove => "remove_",
        }
    }
}

/// The target of a `goto` statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GotoTarget {
    /// `goto name;` - index of the label identifier
    Label(NodeIndex),
    /// `goto case <const>;` - index of the case expression
    Case(NodeIndex),
    /// `goto default;`
    Default,
}

/// Flavor of an initializer expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitializerKind {
    /// `{ 1, 2, 3 }` - positional values only
    Collection,
    /// `{ A = 1, B = 2 }` - named member assignments
    Object,
}

// =============================================================================
// Payload structs
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct CompilationUnitData {
    pub members: NodeList,
}

#[derive(Clone, Debug)]
pub struct NamespaceDeclData {
    pub name: String,
    pub members: NodeList,
}

#[derive(Clone, Debug)]
pub struct TypeDeclData {
    pub modifiers: Modifiers,
    pub name: NodeIndex,
    pub type_params: NodeList,
    /// Base class and/or interfaces, in source order.
    pub base_types: NodeList,
    pub members: NodeList,
}

#[derive(Clone, Debug)]
pub struct EnumMemberData {
    pub name: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct DelegateDeclData {
    pub modifiers: Modifiers,
    pub name: NodeIndex,
    pub params: NodeList,
    pub return_type: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct FieldDeclData {
    pub modifiers: Modifiers,
    pub ty: NodeIndex,
    pub declarators: NodeList,
}

#[derive(Clone, Debug)]
pub struct PropertyDeclData {
    pub modifiers: Modifiers,
    pub ty: NodeIndex,
    pub name: NodeIndex,
    pub accessors: NodeList,
    pub initializer: NodeIndex,
    /// Expression body (`=> expr`); rejected by the constraint checker.
    pub expr_body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct IndexerDeclData {
    pub modifiers: Modifiers,
    pub ty: NodeIndex,
    pub params: NodeList,
    pub accessors: NodeList,
    pub expr_body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct EventDeclData {
    pub modifiers: Modifiers,
    pub ty: NodeIndex,
    pub name: NodeIndex,
    /// Empty for field-like events.
    pub accessors: NodeList,
}

#[derive(Clone, Debug)]
pub struct MethodDeclData {
    pub modifiers: Modifiers,
    pub return_type: NodeIndex,
    pub name: NodeIndex,
    pub type_params: NodeList,
    pub params: NodeList,
    pub body: NodeIndex,
    /// Expression body (`=> expr`).
    pub expr_body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ConstructorDeclData {
    pub modifiers: Modifiers,
    pub name: NodeIndex,
    pub params: NodeList,
    pub initializer: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CtorInitializerData {
    /// true for `: this(…)`, false for `: base(…)`.
    pub is_this: bool,
    pub args: NodeList,
}

#[derive(Clone, Debug)]
pub struct AccessorDeclData {
    pub kind: AccessorKind,
    pub modifiers: Modifiers,
    pub body: NodeIndex,
    pub expr_body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ParameterData {
    pub modifiers: Modifiers,
    pub ty: NodeIndex,
    pub name: NodeIndex,
    pub default: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct VariableDeclaratorData {
    pub name: NodeIndex,
    pub init: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct LocalDeclData {
    pub ty: NodeIndex,
    pub declarators: NodeList,
    pub is_const: bool,
}

// Type syntax ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct PredefinedTypeData {
    pub keyword: String,
}

#[derive(Clone, Debug)]
pub struct NamedTypeData {
    pub name: NodeIndex,
    pub type_args: NodeList,
}

#[derive(Clone, Debug)]
pub struct QualifiedTypeData {
    pub left: NodeIndex,
    pub right: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ArrayTypeData {
    pub element: NodeIndex,
    pub rank: u32,
}

#[derive(Clone, Debug)]
pub struct NullableTypeData {
    pub inner: NodeIndex,
}

// Statements -----------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub statements: NodeList,
}

#[derive(Clone, Debug)]
pub struct IfStatementData {
    pub cond: NodeIndex,
    pub then_branch: NodeIndex,
    pub else_branch: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct WhileStatementData {
    pub cond: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct DoStatementData {
    pub body: NodeIndex,
    pub cond: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ForStatementData {
    /// Loop-scoped declaration, if the initializer declares variables.
    pub decl: NodeIndex,
    /// Expression initializers (mutually exclusive with `decl`).
    pub initializers: NodeList,
    pub cond: NodeIndex,
    pub incrementors: NodeList,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ForEachStatementData {
    pub ty: NodeIndex,
    pub name: NodeIndex,
    pub expr: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct SwitchStatementData {
    pub expr: NodeIndex,
    pub sections: NodeList,
}

#[derive(Clone, Debug)]
pub struct SwitchSectionData {
    pub labels: NodeList,
    pub statements: NodeList,
}

#[derive(Clone, Debug)]
pub struct CaseLabelData {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct TryStatementData {
    pub block: NodeIndex,
    pub catches: NodeList,
    pub finally_block: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CatchClauseData {
    pub ty: NodeIndex,
    pub ident: NodeIndex,
    pub when: NodeIndex,
    pub block: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct UsingStatementData {
    pub decl: NodeIndex,
    pub expr: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ReturnStatementData {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct GotoStatementData {
    pub target: GotoTarget,
}

#[derive(Clone, Debug)]
pub struct LabeledStatementData {
    pub label: NodeIndex,
    pub statement: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ThrowStatementData {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ExpressionStatementData {
    pub expr: NodeIndex,
}

// Expressions ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct IdentifierData {
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct GenericNameData {
    pub text: String,
    pub type_args: NodeList,
}

#[derive(Clone, Debug)]
pub struct LiteralData {
    pub value: LiteralValue,
}

#[derive(Clone, Debug)]
pub struct InterpolatedStringData {
    pub parts: NodeList,
}

#[derive(Clone, Debug)]
pub struct InterpolatedTextData {
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct InterpolationData {
    pub expr: NodeIndex,
    pub alignment: NodeIndex,
    pub format: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MemberAccessData {
    pub expr: NodeIndex,
    pub name: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ConditionalAccessData {
    pub expr: NodeIndex,
    pub when_not_null: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct MemberBindingData {
    pub name: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct InvocationData {
    pub callee: NodeIndex,
    pub args: NodeList,
}

#[derive(Clone, Debug)]
pub struct ArgumentData {
    /// Named-argument label, if present.
    pub name: Option<String>,
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ElementAccessData {
    pub expr: NodeIndex,
    pub args: NodeList,
}

#[derive(Clone, Debug)]
pub struct BinaryExprData {
    pub left: NodeIndex,
    pub op: BinaryOp,
    pub right: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct AssignmentExprData {
    pub left: NodeIndex,
    pub op: AssignOp,
    pub right: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct UnaryExprData {
    pub op: UnaryOp,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ConditionalExprData {
    pub cond: NodeIndex,
    pub when_true: NodeIndex,
    pub when_false: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CastExprData {
    pub ty: NodeIndex,
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct CheckedExprData {
    pub is_checked: bool,
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ParenthesizedExprData {
    pub expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ObjectCreationData {
    pub ty: NodeIndex,
    pub args: NodeList,
    pub initializer: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct ArrayCreationData {
    pub ty: NodeIndex,
    pub size: NodeIndex,
    pub initializer: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct InitializerExprData {
    pub kind: InitializerKind,
    pub exprs: NodeList,
}

#[derive(Clone, Debug)]
pub struct LambdaExprData {
    pub params: NodeList,
    /// Block or expression body.
    pub body: NodeIndex,
    pub is_parenthesized: bool,
}

#[derive(Clone, Debug)]
pub struct TupleExprData {
    pub args: NodeList,
}

// =============================================================================
// NodeData
// =============================================================================

/// The typed payload of a node.
#[derive(Clone, Debug)]
pub enum NodeData {
    None,
    CompilationUnit(CompilationUnitData),
    NamespaceDecl(NamespaceDeclData),
    TypeDecl(TypeDeclData),
    EnumMember(EnumMemberData),
    DelegateDecl(DelegateDeclData),
    FieldDecl(FieldDeclData),
    PropertyDecl(PropertyDeclData),
    IndexerDecl(IndexerDeclData),
    EventDecl(EventDeclData),
    MethodDecl(MethodDeclData),
    ConstructorDecl(ConstructorDeclData),
    CtorInitializer(CtorInitializerData),
    AccessorDecl(AccessorDeclData),
    Parameter(ParameterData),
    VariableDeclarator(VariableDeclaratorData),
    LocalDecl(LocalDeclData),
    PredefinedType(PredefinedTypeData),
    NamedType(NamedTypeData),
    QualifiedType(QualifiedTypeData),
    ArrayType(ArrayTypeData),
    NullableType(NullableTypeData),
    Block(BlockData),
    ExpressionStatement(ExpressionStatementData),
    IfStatement(IfStatementData),
    WhileStatement(WhileStatementData),
    DoStatement(DoStatementData),
    ForStatement(ForStatementData),
    ForEachStatement(ForEachStatementData),
    SwitchStatement(SwitchStatementData),
    SwitchSection(SwitchSectionData),
    CaseLabel(CaseLabelData),
    TryStatement(TryStatementData),
    CatchClause(CatchClauseData),
    UsingStatement(UsingStatementData),
    ReturnStatement(ReturnStatementData),
    GotoStatement(GotoStatementData),
    LabeledStatement(LabeledStatementData),
    ThrowStatement(ThrowStatementData),
    Identifier(IdentifierData),
    GenericName(GenericNameData),
    Literal(LiteralData),
    InterpolatedString(InterpolatedStringData),
    InterpolatedText(InterpolatedTextData),
    Interpolation(InterpolationData),
    MemberAccess(MemberAccessData),
    ConditionalAccess(ConditionalAccessData),
    MemberBinding(MemberBindingData),
    Invocation(InvocationData),
    Argument(ArgumentData),
    ElementAccess(ElementAccessData),
    BinaryExpr(BinaryExprData),
    AssignmentExpr(AssignmentExprData),
    UnaryExpr(UnaryExprData),
    ConditionalExpr(ConditionalExprData),
    CastExpr(CastExprData),
    CheckedExpr(CheckedExprData),
    ParenthesizedExpr(ParenthesizedExprData),
    ObjectCreation(ObjectCreationData),
    ArrayCreation(ArrayCreationData),
    InitializerExpr(InitializerExprData),
    LambdaExpr(LambdaExprData),
    TupleExpr(TupleExprData),
}

/// A syntax node: kind, source range, flags, payload.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: SyntaxKind,
    pub range: Range,
    pub flags: NodeFlags,
    pub data: NodeData,
}

impl Node {
    /// Whether the node is exempt from line tracking.
    #[must_use]
    pub const fn line_mismatch_allowed(&self) -> bool {
        self.flags.contains(NodeFlags::LINE_MISMATCH_ALLOWED)
    }

    /// Whether the node was fabricated by the emitter.
    #[must_use]
    pub const fn is_synthesized(&self) -> bool {
        self.flags.contains(NodeFlags::SYNTHESIZED)
    }
}
