//! The closed enumeration of syntax node kinds.
//!
//! The emitter dispatches over this enum with a tagged-sum match; there is
//! no subtype polymorphism anywhere in the pipeline.

use serde::{Deserialize, Serialize};

/// Kind of a syntax node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    // Top level
    CompilationUnit,
    NamespaceDecl,

    // Type declarations
    ClassDecl,
    InterfaceDecl,
    EnumDecl,
    EnumMember,
    DelegateDecl,

    // Members
    FieldDecl,
    PropertyDecl,
    IndexerDecl,
    EventDecl,
    MethodDecl,
    ConstructorDecl,
    CtorInitializer,
    AccessorDecl,
    Parameter,
    TypeParameter,
    VariableDeclarator,
    LocalDecl,

    // Type syntax
    PredefinedType,
    NamedType,
    QualifiedType,
    ArrayType,
    NullableType,

    // Statements
    Block,
    LocalDeclStatement,
    ExpressionStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ForStatement,
    ForEachStatement,
    SwitchStatement,
    SwitchSection,
    CaseLabel,
    DefaultLabel,
    TryStatement,
    CatchClause,
    UsingStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    GotoStatement,
    LabeledStatement,
    ThrowStatement,
    EmptyStatement,

    // Expressions
    Identifier,
    GenericName,
    Literal,
    InterpolatedString,
    InterpolatedText,
    Interpolation,
    MemberAccess,
    ConditionalAccess,
    MemberBinding,
    Invocation,
    Argument,
    ElementAccess,
    BinaryExpr,
    AssignmentExpr,
    PrefixUnary,
    PostfixUnary,
    ConditionalExpr,
    CastExpr,
    CheckedExpr,
    ParenthesizedExpr,
    ObjectCreation,
    ArrayCreation,
    InitializerExpr,
    ThisExpr,
    BaseExpr,
    LambdaExpr,
    TupleExpr,
}

impl SyntaxKind {
    /// Whether this kind is a statement.
    #[must_use]
    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            SyntaxKind::Block
                | SyntaxKind::LocalDeclStatement
                | SyntaxKind::ExpressionStatement
                | SyntaxKind::IfStatement
                | SyntaxKind::WhileStatement
                | SyntaxKind::DoStatement
                | SyntaxKind::ForStatement
                | SyntaxKind::ForEachStatement
                | SyntaxKind::SwitchStatement
                | SyntaxKind::TryStatement
                | SyntaxKind::UsingStatement
                | SyntaxKind::ReturnStatement
                | SyntaxKind::BreakStatement
                | SyntaxKind::ContinueStatement
                | SyntaxKind::GotoStatement
                | SyntaxKind::LabeledStatement
                | SyntaxKind::ThrowStatement
                | SyntaxKind::EmptyStatement
        )
    }

    /// Whether this kind is a loop statement.
    #[must_use]
    pub const fn is_loop(self) -> bool {
        matches!(
            self,
            SyntaxKind::WhileStatement
                | SyntaxKind::DoStatement
                | SyntaxKind::ForStatement
                | SyntaxKind::ForEachStatement
        )
    }

    /// Whether this kind is type syntax.
    #[must_use]
    pub const fn is_type_syntax(self) -> bool {
        matches!(
            self,
            SyntaxKind::PredefinedType
                | SyntaxKind::NamedType
                | SyntaxKind::QualifiedType
                | SyntaxKind::ArrayType
                | SyntaxKind::NullableType
        )
    }
}
