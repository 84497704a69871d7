use super::Emitter;
use super::expressions::ArgSlot;
use crate::error::{EmitError, EmitResult};
use crate::scopes::ScopeKind;
use crate::vocab;
use cslua_sema::{MethodKind, SymbolId};
use cslua_syntax::node::{AccessorKind, MethodDeclData};
use cslua_syntax::{Modifiers, NodeData, NodeIndex, SyntaxKind};
use rustc_hash::FxHashSet;

/// One member initialization woven into a constructor body.
#[derive(Clone, Debug)]
pub(super) struct MemberInit {
    /// Output id of the member slot.
    pub name: String,
    pub init: NodeIndex,
    pub is_static: bool,
    /// Source line of the member declaration.
    pub line: u32,
}

impl<'a> Emitter<'a> {
    // =========================================================================
    // Methods
    // =========================================================================

    #[tracing::instrument(level = "trace", skip(self))]
    pub(super) fn emit_method(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(method) = self.ast.method_decl(idx).cloned() else {
            return Ok(());
        };
        if method
            .modifiers
            .intersects(Modifiers::ABSTRACT | Modifiers::EXTERN)
        {
            return Ok(());
        }
        let sym = self.model.declared_symbol(idx).unwrap_or(SymbolId::NONE);
        let is_static = method.modifiers.contains(Modifiers::STATIC);
        let promoted = self
            .scopes
            .current_type()
            .map(|t| t.promoted_symbols.contains(&sym))
            .unwrap_or(false);

        self.writer.newline_to_target(self.ast.start_line(idx));

        // A promoted body referencing later-declared promoted members needs
        // their locals pre-declared first.
        if promoted {
            self.write_local_top_level_dependencies(method.body, sym)?;
        }

        let name = self.method_output_name(sym, &method);
        let type_name = self.model.output_id(self.current_type).to_string();

        let pre_declared = promoted
            && self
                .scopes
                .current_type()
                .and_then(|t| t.promoted_decls.get(&idx).copied())
                .unwrap_or(false);
        if promoted {
            if let Some(scope) = self.scopes.current_type_mut() {
                scope.promoted_decls.insert(idx, true);
            }
            if pre_declared {
                self.writer.write(&name);
                self.writer.write(" = function(");
            } else {
                self.writer.write("local function ");
                self.writer.write(&name);
                self.writer.write("(");
            }
        } else {
            self.writer.write("function ");
            self.writer.write(&type_name);
            // Metamethods bind through the metatable with explicit
            // parameters; ordinary members use colon binding.
            let is_metamethod = name.starts_with("__") && name != "__tostring";
            if is_static || is_metamethod {
                self.writer.write(".");
            } else {
                self.writer.write(":");
            }
            self.writer.write(&name);
            self.writer.write("(");
        }

        self.emit_function_signature_and_body(
            idx,
            sym,
            &method.type_params,
            &method.params,
            method.body,
            method.expr_body,
            is_static,
            promoted && !is_static,
        )?;
        Ok(())
    }

    /// Operator methods map to the metamethod protocol; `ToString`
    /// overrides become `__tostring`.
    fn method_output_name(&self, sym: SymbolId, method: &MethodDeclData) -> String {
        let source_name = self
            .ast
            .identifier_text(method.name)
            .unwrap_or_default()
            .to_string();
        if let Some(meta) = vocab::metamethod_for_operator(&source_name) {
            return meta.to_string();
        }
        if source_name == "ToString" && method.modifiers.contains(Modifiers::OVERRIDE) {
            return vocab::TOSTRING_METAMETHOD.to_string();
        }
        if sym.is_some() {
            return self.model.output_id(sym).to_string();
        }
        source_name
    }

    /// Parameters (generic type parameters prepended as explicit type-value
    /// parameters), then the body, then `end`.
    fn emit_function_signature_and_body(
        &mut self,
        site: NodeIndex,
        sym: SymbolId,
        type_params: &[NodeIndex],
        params: &[NodeIndex],
        body: NodeIndex,
        expr_body: NodeIndex,
        is_static: bool,
        promoted_instance: bool,
    ) -> EmitResult {
        let region = if body.is_some() { body } else { expr_body };
        self.push_function_frame(ScopeKind::Function, site, region)?;

        let saved_static = self.in_static_member;
        let saved_type_params = std::mem::take(&mut self.method_type_params);
        let saved_variadic = self.variadic_params.clone();
        self.in_static_member = is_static;

        let result = (|| -> EmitResult {
            let mut first = true;
            if promoted_instance {
                // Promoted instance methods receive the receiver explicitly.
                self.writer.write(vocab::SELF);
                first = false;
            }
            for &tp in type_params {
                if !first {
                    self.writer.write(", ");
                }
                first = false;
                let tp_sym = self
                    .model
                    .declared_symbol(tp)
                    .or_else(|| self.model.symbol_info(tp));
                match tp_sym {
                    Some(tp_sym) => {
                        self.method_type_params.insert(tp_sym);
                        let name = self.scopes.claim_symbol(tp_sym, self.model);
                        self.writer.write(&name);
                    }
                    None => {
                        let text = self
                            .ast
                            .identifier_text(tp)
                            .unwrap_or_default()
                            .to_string();
                        self.writer.write(&text);
                    }
                }
            }
            self.emit_parameters(params, &mut first)?;
            self.writer.write(")");
            self.pending_semicolon = false;

            if body.is_some() {
                self.emit_block_body(body)?;
                self.write_end_at(self.ast.end_line(body));
            } else if expr_body.is_some() {
                self.writer.write(" return ");
                self.emit_expr(expr_body)?;
                self.writer.write(" end");
            } else {
                self.writer.write(" end");
            }
            Ok(())
        })();

        self.in_static_member = saved_static;
        self.method_type_params = saved_type_params;
        self.variadic_params = saved_variadic;
        self.scopes.pop_block(ScopeKind::Function)?;
        let _ = sym;
        result
    }

    /// Emit a parameter list; a trailing `params`-decorated parameter
    /// becomes the variadic token and its references are rewritten.
    pub(super) fn emit_parameters(
        &mut self,
        params: &[NodeIndex],
        first: &mut bool,
    ) -> EmitResult {
        for &param in params {
            if !*first {
                self.writer.write(", ");
            }
            *first = false;
            let Some(data) = self.ast.parameter(param).cloned() else {
                continue;
            };
            let sym = self
                .model
                .declared_symbol(param)
                .or_else(|| self.model.declared_symbol(data.name));
            if data.modifiers.contains(Modifiers::PARAMS) {
                if let Some(sym) = sym {
                    self.variadic_params.insert(sym);
                }
                self.writer.write(vocab::VARARG);
                continue;
            }
            match sym {
                Some(sym) => {
                    let name = self.scopes.claim_symbol(sym, self.model);
                    self.writer.write(&name);
                }
                None => {
                    let text = self
                        .ast
                        .identifier_text(data.name)
                        .unwrap_or(vocab::DISCARD)
                        .to_string();
                    self.writer.write(&text);
                }
            }
        }
        Ok(())
    }

    /// Pre-declare later-declared promoted members the body references.
    fn write_local_top_level_dependencies(
        &mut self,
        body: NodeIndex,
        current: SymbolId,
    ) -> EmitResult {
        if body.is_none() {
            return Ok(());
        }
        let mut referenced: Vec<SymbolId> = Vec::new();
        let mut seen: FxHashSet<SymbolId> = FxHashSet::default();
        self.ast.walk(body, &mut |idx| {
            if let Some(sym) = self.model.symbol_info(idx) {
                if sym != current && seen.insert(sym) {
                    referenced.push(sym);
                }
            }
        });
        for sym in referenced {
            let Some(scope) = self.scopes.current_type() else {
                break;
            };
            if !scope.promoted_symbols.contains(&sym) {
                continue;
            }
            let Some(&decl) = scope.promoted_by_symbol.get(&sym) else {
                continue;
            };
            if scope.promoted_decls.get(&decl).copied().unwrap_or(false) {
                continue;
            }
            if let Some(scope) = self.scopes.current_type_mut() {
                scope.promoted_decls.insert(decl, true);
            }
            let name = self.model.output_id(sym).to_string();
            self.writer.write("local ");
            self.writer.write(&name);
            self.writer.write("; ");
        }
        Ok(())
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub(super) fn emit_constructor(
        &mut self,
        idx: NodeIndex,
        instance_inits: &[MemberInit],
        static_inits: &[MemberInit],
    ) -> EmitResult {
        let Some(ctor) = self.ast.constructor_decl(idx).cloned() else {
            return Ok(());
        };
        let is_static = ctor.modifiers.contains(Modifiers::STATIC);
        let sym = self.model.declared_symbol(idx).unwrap_or(SymbolId::NONE);
        let type_name = self.model.output_id(self.current_type).to_string();

        self.writer.newline_to_target(self.ast.start_line(idx));
        self.writer.write("function ");
        self.writer.write(&type_name);
        if is_static {
            self.writer.write(".");
            self.writer.write(vocab::CCTOR_NAME);
            self.writer.write("(");
        } else {
            self.writer.write(":");
            let name = if sym.is_some() {
                self.model.output_id(sym).to_string()
            } else {
                vocab::CTOR_NAME.to_string()
            };
            self.writer.write(&name);
            self.writer.write("(");
        }

        self.push_constructor_frame(idx, &ctor)?;
        let saved_static = self.in_static_member;
        self.in_static_member = is_static;

        let result = (|| -> EmitResult {
            let mut first = true;
            self.emit_parameters(&ctor.params, &mut first)?;
            self.writer.write(")");
            self.pending_semicolon = false;

            let initializer = self.ast.ctor_initializer(ctor.initializer).cloned();
            let inits = if is_static { static_inits } else { instance_inits };

            match initializer {
                Some(init) if init.is_this => {
                    // The innermost constructor emits the member inits.
                    self.emit_chained_this_call(ctor.initializer, &init.args)?;
                }
                Some(init) => {
                    // Inline initializers run before the base call so virtual
                    // calls from the base constructor observe them.
                    self.emit_member_inits(idx, inits)?;
                    self.emit_base_call(ctor.initializer, &init.args)?;
                }
                None => {
                    self.emit_member_inits(idx, inits)?;
                    if !is_static {
                        if let Some(base) =
                            self.model.nearest_constructed_base(self.current_type)
                        {
                            self.writer.write(" ");
                            let base_name = self.model.output_id(base).to_string();
                            self.writer.write(&base_name);
                            self.writer.write(".");
                            self.writer.write(vocab::CTOR_NAME);
                            self.writer.write("(");
                            self.writer.write(vocab::SELF);
                            self.writer.write(")");
                            self.pending_semicolon = true;
                        }
                    }
                }
            }

            if ctor.body.is_some() {
                self.emit_block_body(ctor.body)?;
                self.write_end_at(self.ast.end_line(ctor.body));
            } else {
                self.writer.write(" end");
            }
            Ok(())
        })();

        self.in_static_member = saved_static;
        self.scopes.pop_block(ScopeKind::Function)?;
        result
    }

    /// Constructor frames carry the supplementary read/write sets.
    fn push_constructor_frame(
        &mut self,
        idx: NodeIndex,
        ctor: &cslua_syntax::node::ConstructorDeclData,
    ) -> EmitResult {
        use crate::scopes::BlockScope;
        let mut frame = BlockScope::new(ScopeKind::Function, idx);
        frame.globals = self.compute_globals(idx);
        if ctor.body.is_some() && !self.block_is_empty(ctor.body) {
            match self.model.analyze_data_flow(ctor.body) {
                Some(flow) => frame.flow = flow.clone(),
                None => {
                    return Err(EmitError::compilation(
                        ctor.body,
                        "data-flow analysis of the constructor body failed",
                    ));
                }
            }
        }

        // Reads inside base/this initializer arguments.
        if let Some(init) = self.ast.ctor_initializer(ctor.initializer) {
            for &arg in &init.args.clone() {
                self.ast.walk(arg, &mut |node| {
                    if let Some(sym) = self.model.symbol_info(node) {
                        frame.extra_read.insert(sym);
                    }
                });
            }
        }

        // Without a base call: assignment targets of immediate-child
        // expression statements of the body.
        let has_base_call = ctor.initializer.is_some();
        if !has_base_call {
            if let Some(block) = self.ast.block(ctor.body) {
                for &stmt in &block.statements.clone() {
                    let Some(expr_stmt) = self.ast.expression_statement(stmt) else {
                        continue;
                    };
                    if self.ast.kind(stmt) != Some(SyntaxKind::ExpressionStatement) {
                        continue;
                    }
                    if let Some(NodeData::AssignmentExpr(assign)) =
                        self.ast.get(expr_stmt.expr).map(|n| &n.data)
                    {
                        let target = self.ast.skip_parens(assign.left);
                        if let Some(sym) = self.symbol_of(target) {
                            frame.extra_write.insert(sym);
                        }
                    }
                }
            }
        }

        self.scopes.push_block(frame, self.model)?;
        self.dedup_region_labels(ctor.body);
        Ok(())
    }

    fn block_is_empty(&self, block: NodeIndex) -> bool {
        self.ast
            .block(block)
            .map(|b| b.statements.is_empty())
            .unwrap_or(true)
    }

    /// Member initializers may be physically re-ordered, so they emit under
    /// a fixed-line guard.
    pub(super) fn emit_member_inits(
        &mut self,
        site: NodeIndex,
        inits: &[MemberInit],
    ) -> EmitResult {
        if inits.is_empty() {
            return Ok(());
        }
        let type_name = self.model.output_id(self.current_type).to_string();
        let inits = inits.to_vec();
        self.with_fixed_line(site, |e| {
            for init in &inits {
                e.writer.write(" ");
                if init.is_static {
                    e.writer.write(&type_name);
                } else {
                    e.writer.write(vocab::SELF);
                }
                e.writer.write(".");
                e.writer.write(&init.name);
                e.writer.write(" = ");
                e.emit_expr(init.init)?;
                e.writer.write(";");
            }
            Ok(())
        })?;
        self.pending_semicolon = false;
        Ok(())
    }

    fn emit_chained_this_call(&mut self, init: NodeIndex, args: &[NodeIndex]) -> EmitResult {
        let target = self.model.symbol_info(init);
        let name = match target {
            Some(sym) => self.model.output_id(sym).to_string(),
            None => vocab::CTOR_NAME.to_string(),
        };
        self.writer.write(" ");
        self.writer.write(vocab::SELF);
        self.writer.write(":");
        self.writer.write(&name);
        self.writer.write("(");
        let slots = match target {
            Some(sym) => self.normalize_arguments(sym, args)?,
            None => args.iter().map(|&a| ArgSlot::Expr(a)).collect(),
        };
        self.emit_slots_inline(&slots)?;
        self.writer.write(")");
        self.pending_semicolon = true;
        Ok(())
    }

    fn emit_base_call(&mut self, init: NodeIndex, args: &[NodeIndex]) -> EmitResult {
        let target = self.model.symbol_info(init);
        let (owner, name) = match target {
            Some(sym) => (
                self.containing_type_name(sym),
                self.model.output_id(sym).to_string(),
            ),
            None => {
                let base = self
                    .model
                    .nearest_constructed_base(self.current_type)
                    .map(|b| self.model.output_id(b).to_string())
                    .unwrap_or_default();
                (base, vocab::CTOR_NAME.to_string())
            }
        };
        self.writer.write(" ");
        self.writer.write(&owner);
        self.writer.write(".");
        self.writer.write(&name);
        self.writer.write("(");
        self.writer.write(vocab::SELF);
        let slots = match target {
            Some(sym) => self.normalize_arguments(sym, args)?,
            None => args.iter().map(|&a| ArgSlot::Expr(a)).collect(),
        };
        if !slots.is_empty() {
            self.writer.write(", ");
            self.emit_slots_inline(&slots)?;
        }
        self.writer.write(")");
        self.pending_semicolon = true;
        Ok(())
    }

    fn emit_slots_inline(&mut self, slots: &[ArgSlot]) -> EmitResult {
        for (pos, slot) in slots.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            match slot {
                ArgSlot::SelfReceiver => self.writer.write(vocab::SELF),
                ArgSlot::Receiver(idx) => self.emit_expr(*idx)?,
                ArgSlot::Expr(idx) => self.emit_call_argument_expr(*idx)?,
                ArgSlot::Const(value) => self.writer.write_constant(value),
                ArgSlot::Unpack(idx) => {
                    self.writer.write(vocab::RT_UNPACK);
                    self.writer.write("(");
                    self.emit_expr(*idx)?;
                    self.writer.write(")");
                }
            }
        }
        Ok(())
    }

    /// Synthesize a constructor when inline initialization is required but
    /// no explicit constructor of the needed flavor exists. Emitted once at
    /// the position of the last initialized member.
    pub(super) fn emit_synthesized_constructor(
        &mut self,
        site: NodeIndex,
        inits: &[MemberInit],
        is_static: bool,
    ) -> EmitResult {
        let Some(last) = inits.last() else {
            return Ok(());
        };
        let type_name = self.model.output_id(self.current_type).to_string();
        self.writer.newline_to_target(last.line);
        self.writer.write("function ");
        self.writer.write(&type_name);
        if is_static {
            self.writer.write(".");
            self.writer.write(vocab::CCTOR_NAME);
            self.writer.write("()");
        } else {
            self.writer.write(":");
            self.writer.write(vocab::CTOR_NAME);
            self.writer.write("()");
        }
        let saved_static = self.in_static_member;
        self.in_static_member = is_static;
        let result = (|| -> EmitResult {
            self.emit_member_inits(site, inits)?;
            if !is_static {
                if let Some(base) = self.model.nearest_constructed_base(self.current_type) {
                    self.writer.write(" ");
                    let base_name = self.model.output_id(base).to_string();
                    self.writer.write(&base_name);
                    self.writer.write(".");
                    self.writer.write(vocab::CTOR_NAME);
                    self.writer.write("(");
                    self.writer.write(vocab::SELF);
                    self.writer.write(")");
                }
            }
            self.writer.write(" end");
            Ok(())
        })();
        self.in_static_member = saved_static;
        result
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Property/indexer/event accessors emit as methods named with the
    /// accessor prefix. Parameter lists are re-ordered to a canonical shape,
    /// so they emit under a fixed-line guard.
    pub(super) fn emit_accessor(
        &mut self,
        accessor: NodeIndex,
        owner: SymbolId,
        owner_name: &str,
        owner_is_static: bool,
        indexer_params: &[NodeIndex],
    ) -> EmitResult {
        let Some(data) = self.ast.accessor_decl(accessor).cloned() else {
            return Ok(());
        };
        let type_name = self.model.output_id(self.current_type).to_string();
        let accessor_sym = self.model.declared_symbol(accessor);
        let name = match accessor_sym {
            Some(sym) => self.model.output_id(sym).to_string(),
            None => format!("{}{}", data.kind.prefix(), owner_name),
        };

        self.writer.newline_to_target(self.ast.start_line(accessor));
        self.writer.write("function ");
        self.writer.write(&type_name);
        self.writer
            .write(if owner_is_static { "." } else { ":" });
        self.writer.write(&name);
        self.writer.write("(");

        self.push_function_frame(ScopeKind::Function, accessor, data.body)?;
        let saved_static = self.in_static_member;
        self.in_static_member = owner_is_static;

        let result = (|| -> EmitResult {
            let params = indexer_params.to_vec();
            self.with_fixed_line(accessor, |e| {
                let mut first = true;
                e.emit_parameters(&params, &mut first)?;
                if matches!(
                    data.kind,
                    AccessorKind::Set | AccessorKind::Add | AccessorKind::Remove
                ) {
                    if !first {
                        e.writer.write(", ");
                    }
                    e.writer.write(vocab::VALUE_PARAM);
                }
                Ok(())
            })?;
            self.writer.write(")");
            self.pending_semicolon = false;

            if data.body.is_some() {
                self.emit_block_body(data.body)?;
                self.write_end_at(self.ast.end_line(data.body));
            } else if data.expr_body.is_some() {
                self.writer.write(" return ");
                self.emit_expr(data.expr_body)?;
                self.writer.write(" end");
            } else {
                // Empty automatic accessor: direct backing-slot access.
                let owner_id = self.model.output_id(owner).to_string();
                let receiver = if owner_is_static {
                    type_name.clone()
                } else {
                    vocab::SELF.to_string()
                };
                match data.kind {
                    AccessorKind::Get => {
                        self.writer.write(" return ");
                        self.writer.write(&receiver);
                        self.writer.write(".");
                        self.writer.write(&owner_id);
                        self.writer.write(" end");
                    }
                    _ => {
                        self.writer.write(" ");
                        self.writer.write(&receiver);
                        self.writer.write(".");
                        self.writer.write(&owner_id);
                        self.writer.write(" = ");
                        self.writer.write(vocab::VALUE_PARAM);
                        self.writer.write(" end");
                    }
                }
            }
            Ok(())
        })();

        self.in_static_member = saved_static;
        self.scopes.pop_block(ScopeKind::Function)?;
        result
    }

    /// Synthesized getter/setter for an automatic property that implements
    /// an interface member or overrides a base virtual.
    pub(super) fn emit_synthesized_auto_accessors(
        &mut self,
        property: NodeIndex,
        owner: SymbolId,
        owner_is_static: bool,
    ) -> EmitResult {
        let type_name = self.model.output_id(self.current_type).to_string();
        let owner_id = self.model.output_id(owner).to_string();
        let receiver = if owner_is_static {
            type_name.clone()
        } else {
            vocab::SELF.to_string()
        };
        let getter = self.accessor_name(owner, MethodKind::PropertyGet);
        let setter = self.accessor_name(owner, MethodKind::PropertySet);
        let sep = if owner_is_static { "." } else { ":" };

        self.with_fixed_line(property, |e| {
            e.writer.write(" function ");
            e.writer.write(&type_name);
            e.writer.write(sep);
            e.writer.write(&getter);
            e.writer.write("() return ");
            e.writer.write(&receiver);
            e.writer.write(".");
            e.writer.write(&owner_id);
            e.writer.write(" end");
            e.writer.write(" function ");
            e.writer.write(&type_name);
            e.writer.write(sep);
            e.writer.write(&setter);
            e.writer.write("(");
            e.writer.write(vocab::VALUE_PARAM);
            e.writer.write(") ");
            e.writer.write(&receiver);
            e.writer.write(".");
            e.writer.write(&owner_id);
            e.writer.write(" = ");
            e.writer.write(vocab::VALUE_PARAM);
            e.writer.write(" end");
            Ok(())
        })
    }

    // =========================================================================
    // Lambdas
    // =========================================================================

    pub(super) fn emit_lambda(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(lambda) = self.ast.lambda_expr(idx).cloned() else {
            return Ok(());
        };
        self.writer.write("function(");
        self.push_function_frame(ScopeKind::Lambda, idx, lambda.body)?;
        let saved_variadic = self.variadic_params.clone();

        let result = (|| -> EmitResult {
            // Variadic-ness is inferred from the delegate type the lambda is
            // converted to.
            let variadic_last = self.lambda_is_variadic(idx, &lambda);
            let mut first = true;
            for (pos, &param) in lambda.params.iter().enumerate() {
                let is_last = pos + 1 == lambda.params.len();
                if !first {
                    self.writer.write(", ");
                }
                first = false;
                let sym = self
                    .model
                    .declared_symbol(param)
                    .or_else(|| {
                        self.ast
                            .parameter(param)
                            .and_then(|p| self.model.declared_symbol(p.name))
                    });
                if is_last && variadic_last {
                    if let Some(sym) = sym {
                        self.variadic_params.insert(sym);
                    }
                    self.writer.write(vocab::VARARG);
                    continue;
                }
                match sym {
                    Some(sym) => {
                        let name = self.scopes.claim_symbol(sym, self.model);
                        self.writer.write(&name);
                    }
                    None => {
                        let text = self.lambda_param_text(param);
                        self.writer.write(&text);
                    }
                }
            }
            self.writer.write(")");
            self.pending_semicolon = false;

            if self.ast.kind(lambda.body) == Some(SyntaxKind::Block) {
                self.emit_block_body(lambda.body)?;
                self.write_end_at(self.ast.end_line(lambda.body));
            } else {
                // Expression-bodied lambdas prepend `return`.
                self.writer.write(" return ");
                self.emit_expr(lambda.body)?;
                self.writer.write(" end");
            }
            Ok(())
        })();

        self.variadic_params = saved_variadic;
        self.scopes.pop_block(ScopeKind::Lambda)?;
        result
    }

    fn lambda_param_text(&self, param: NodeIndex) -> String {
        if let Some(data) = self.ast.parameter(param) {
            if let Some(text) = self.ast.identifier_text(data.name) {
                return text.to_string();
            }
        }
        self.ast
            .identifier_text(param)
            .unwrap_or(vocab::DISCARD)
            .to_string()
    }

    fn lambda_is_variadic(
        &self,
        idx: NodeIndex,
        lambda: &cslua_syntax::node::LambdaExprData,
    ) -> bool {
        if lambda.params.is_empty() {
            return false;
        }
        let Some(converted) = self.converted_type(idx) else {
            return false;
        };
        let Some(invoke) = self.model.delegate_invoke_method(converted) else {
            return false;
        };
        self.model
            .method_shape(invoke)
            .map(|m| m.params.last().map(|p| p.is_params).unwrap_or(false))
            .unwrap_or(false)
    }
}
