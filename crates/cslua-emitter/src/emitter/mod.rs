//! The AST-directed emitter.
//!
//! One `Emitter` owns all mutable emission state for a single compilation
//! unit: the output writer, the scope stacks, and the binding-target stack.
//! Traversal is a closed dispatch over [`SyntaxKind`]; visits return
//! `Result` and propagate failures, which abort the unit.

mod declarations;
mod expressions;
mod functions;
mod helpers;
mod identifiers;
mod loops;
mod statements;

use crate::constraints::ConstraintChecker;
use crate::error::{EmitError, EmitResult};
use crate::options::EmitOptions;
use crate::scopes::{BlockScope, ScopeKind, ScopeStack};
use crate::writer::{LuaComment, LuaWriter};
use cslua_sema::{SemanticModel, SymbolId};
use cslua_syntax::{Ast, NodeIndex, SyntaxKind};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Compile one unit to Lua text.
///
/// `comments` is the unit's trivia list, discovered once by the driver and
/// sorted by start position.
#[tracing::instrument(level = "debug", skip_all)]
pub fn compile_unit(
    ast: &Ast,
    root: NodeIndex,
    model: &SemanticModel,
    options: &EmitOptions,
    comments: Vec<LuaComment>,
) -> EmitResult<String> {
    ConstraintChecker::new(ast, model).check_unit(root)?;
    let mut emitter = Emitter::new(ast, model, options);
    emitter.writer.set_comments(comments, options.remove_comments);
    emitter.emit_unit(root)?;
    Ok(emitter.writer.finish())
}

/// The per-unit emission context.
pub struct Emitter<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) model: &'a SemanticModel,
    pub(crate) options: &'a EmitOptions,
    pub(crate) writer: LuaWriter,
    pub(crate) scopes: ScopeStack,
    /// Receivers captured across nested conditional-access chains.
    pub(crate) binding_targets: SmallVec<[NodeIndex; 4]>,
    /// Parameters rewritten to the variadic token inside the current body.
    pub(crate) variadic_params: FxHashSet<SymbolId>,
    /// Type parameters of the method currently being emitted (passed as
    /// explicit type-value parameters).
    pub(crate) method_type_params: FxHashSet<SymbolId>,
    /// The type declaration currently being emitted.
    pub(crate) current_type: SymbolId,
    /// Whether the member currently being emitted is static.
    pub(crate) in_static_member: bool,
    /// Locals hoisted to a switch prologue; their declarations emit as
    /// plain assignments.
    pub(crate) hoisted_locals: FxHashSet<SymbolId>,
    /// Exception identifiers of enclosing catch handlers, for bare `throw`.
    pub(crate) catch_idents: Vec<String>,
    /// Whether the current class has already received its synthesized
    /// constructor.
    pub(crate) synthesized_ctor_done: bool,
    /// Set after a statement finishes on a line; the next same-line
    /// statement is separated with `;`.
    pub(crate) pending_semicolon: bool,
    /// The next return is not the last statement of its block and must be
    /// wrapped in `do ... end`.
    pub(crate) nonterminal_return: bool,
    /// Output id of the last emitted class, for the trailing `return`.
    pub(crate) last_class: Option<String>,
}

impl<'a> Emitter<'a> {
    #[must_use]
    pub fn new(ast: &'a Ast, model: &'a SemanticModel, options: &'a EmitOptions) -> Self {
        Self {
            ast,
            model,
            options,
            writer: LuaWriter::with_new_line(options.new_line),
            scopes: ScopeStack::new(),
            binding_targets: SmallVec::new(),
            variadic_params: FxHashSet::default(),
            method_type_params: FxHashSet::default(),
            current_type: SymbolId::NONE,
            in_static_member: false,
            hoisted_locals: FxHashSet::default(),
            catch_idents: Vec::new(),
            synthesized_ctor_done: false,
            pending_semicolon: false,
            nonterminal_return: false,
            last_class: None,
        }
    }

    /// Drive the traversal of one compilation unit.
    pub fn emit_unit(&mut self, root: NodeIndex) -> EmitResult {
        let start_depth = self.scopes.depth();
        let mut chunk = BlockScope::new(ScopeKind::TopLevelChunk, root);
        chunk.globals = self.compute_globals(root);
        if let Some(flow) = self.model.analyze_data_flow(root) {
            chunk.flow = flow.clone();
        }
        self.scopes.push_block(chunk, self.model)?;

        let members = self
            .ast
            .compilation_unit(root)
            .map(|unit| unit.members.clone())
            .unwrap_or_default();
        for member in members {
            self.emit_declaration(member)?;
        }

        // The file ends with `return <last class>` when the unit's final
        // declaration is a class.
        if let Some(last) = self.last_class.take() {
            self.writer.newline();
            self.writer.write("return ");
            self.writer.write(&last);
        }

        self.scopes.pop_block(ScopeKind::TopLevelChunk)?;
        if self.scopes.depth() != start_depth {
            return Err(EmitError::internal(
                root,
                "scope stack depth mismatch at unit end",
            ));
        }
        self.writer.newline();
        Ok(())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Emit a declaration-category node.
    pub(crate) fn emit_declaration(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(kind) = self.ast.kind(idx) else {
            return Ok(());
        };
        match kind {
            SyntaxKind::NamespaceDecl => self.emit_namespace(idx),
            SyntaxKind::ClassDecl => self.emit_class(idx),
            SyntaxKind::InterfaceDecl => self.emit_interface(idx),
            SyntaxKind::EnumDecl => self.emit_enum(idx),
            // Delegate declarations are consulted by binding logic only.
            SyntaxKind::DelegateDecl => Ok(()),
            SyntaxKind::FieldDecl
            | SyntaxKind::PropertyDecl
            | SyntaxKind::IndexerDecl
            | SyntaxKind::EventDecl
            | SyntaxKind::MethodDecl
            | SyntaxKind::ConstructorDecl => Err(EmitError::internal(
                idx,
                "member declaration emitted outside a type scope",
            )),
            _ => Err(EmitError::internal(
                idx,
                format!("unexpected declaration kind {kind:?}"),
            )),
        }
    }

    /// Emit a statement-category node.
    pub(crate) fn emit_statement(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(kind) = self.ast.kind(idx) else {
            return Ok(());
        };
        let result = match kind {
            SyntaxKind::Block => self.emit_nested_block(idx),
            SyntaxKind::LocalDeclStatement => self.emit_local_decl_statement(idx),
            SyntaxKind::ExpressionStatement => self.emit_expression_statement(idx),
            SyntaxKind::IfStatement => self.emit_if(idx, false),
            SyntaxKind::WhileStatement => self.emit_while(idx),
            SyntaxKind::DoStatement => self.emit_do(idx),
            SyntaxKind::ForStatement => self.emit_for(idx),
            SyntaxKind::ForEachStatement => self.emit_foreach(idx),
            SyntaxKind::SwitchStatement => self.emit_switch(idx),
            SyntaxKind::TryStatement => self.emit_try(idx),
            SyntaxKind::UsingStatement => self.emit_using(idx),
            SyntaxKind::ReturnStatement => self.emit_return(idx),
            SyntaxKind::BreakStatement => self.emit_break(idx),
            SyntaxKind::ContinueStatement => self.emit_continue(idx),
            SyntaxKind::GotoStatement => self.emit_goto(idx),
            SyntaxKind::LabeledStatement => self.emit_labeled(idx),
            SyntaxKind::ThrowStatement => self.emit_throw(idx),
            SyntaxKind::EmptyStatement => Ok(()),
            _ => Err(EmitError::internal(
                idx,
                format!("unexpected statement kind {kind:?}"),
            )),
        };
        self.pending_semicolon = true;
        result
    }

    /// Emit an expression-category node.
    pub(crate) fn emit_expr(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(node) = self.ast.get(idx) else {
            return Ok(());
        };

        // Method references converted to a delegate type become bound
        // callable values wherever they occur.
        if self.needs_delegate_binding(idx) {
            return self.emit_delegate_binding(idx);
        }

        // Simple constant folding: a folded non-literal expression emits its
        // value. Folding a literal is the identity (no double-folding).
        if matches!(
            node.kind,
            SyntaxKind::BinaryExpr | SyntaxKind::PrefixUnary | SyntaxKind::ConditionalExpr
        ) && let Some(value) = self.model.constant_value(idx)
        {
            let value = value.clone();
            self.writer.write_constant(&value);
            return Ok(());
        }

        match node.kind {
            SyntaxKind::Identifier | SyntaxKind::GenericName => self.emit_identifier(idx),
            SyntaxKind::Literal => self.emit_literal(idx),
            SyntaxKind::InterpolatedString => self.emit_interpolated_string(idx),
            SyntaxKind::MemberAccess => self.emit_member_access(idx),
            SyntaxKind::ConditionalAccess => self.emit_conditional_access_expr(idx),
            SyntaxKind::MemberBinding => self.emit_member_binding(idx),
            SyntaxKind::Invocation => self.emit_invocation(idx),
            SyntaxKind::ElementAccess => self.emit_element_access(idx),
            SyntaxKind::BinaryExpr => self.emit_binary(idx),
            SyntaxKind::AssignmentExpr => self.emit_assignment(idx),
            SyntaxKind::PrefixUnary => self.emit_prefix_unary(idx),
            SyntaxKind::PostfixUnary => self.emit_postfix_unary(idx),
            SyntaxKind::ConditionalExpr => self.emit_ternary(idx),
            SyntaxKind::CastExpr => self.emit_cast(idx),
            SyntaxKind::CheckedExpr => {
                let expr = self.ast.checked_expr(idx).map(|d| d.expr);
                match expr {
                    Some(inner) => self.emit_expr(inner),
                    None => Ok(()),
                }
            }
            SyntaxKind::ParenthesizedExpr => {
                let inner = self.ast.parenthesized_expr(idx).map(|d| d.expr);
                self.writer.write("(");
                if let Some(inner) = inner {
                    self.emit_expr(inner)?;
                }
                self.writer.write(")");
                Ok(())
            }
            SyntaxKind::ObjectCreation => self.emit_object_creation(idx),
            SyntaxKind::ArrayCreation => self.emit_array_creation(idx),
            SyntaxKind::InitializerExpr => self.emit_initializer_values(idx),
            SyntaxKind::ThisExpr => {
                self.writer.write(crate::vocab::SELF);
                Ok(())
            }
            SyntaxKind::BaseExpr => {
                // Base references are resolved by their enclosing member
                // access; a bare `base` emits the receiver.
                self.writer.write(crate::vocab::SELF);
                Ok(())
            }
            SyntaxKind::LambdaExpr => self.emit_lambda(idx),
            SyntaxKind::TupleExpr => self.emit_tuple(idx),
            SyntaxKind::Argument => {
                let expr = self.ast.argument(idx).map(|d| d.expr);
                match expr {
                    Some(inner) => self.emit_expr(inner),
                    None => Ok(()),
                }
            }
            kind if kind.is_type_syntax() => self.emit_type_syntax(idx),
            kind => Err(EmitError::internal(
                idx,
                format!("unexpected expression kind {kind:?}"),
            )),
        }
    }

    // =========================================================================
    // Scoped guards
    // =========================================================================

    /// Run `f` with line advancement disabled; drift is a compiler bug.
    pub(crate) fn with_fixed_line<T>(
        &mut self,
        site: NodeIndex,
        f: impl FnOnce(&mut Self) -> EmitResult<T>,
    ) -> EmitResult<T> {
        let captured = self.writer.begin_fixed_line();
        let result = f(self);
        self.writer.end_fixed_line();
        let value = result?;
        if !self.writer.is_locked() && self.writer.current_line() != captured {
            return Err(EmitError::internal(
                site,
                "output line drifted under a fixed-line guard",
            ));
        }
        Ok(value)
    }

    /// Run `f` with all byte emission suppressed (dry-run traversal).
    pub(crate) fn with_output_lock<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> EmitResult<T>,
    ) -> EmitResult<T> {
        self.writer.lock_output();
        let result = f(self);
        self.writer.unlock_output();
        result
    }
}
