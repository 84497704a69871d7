use super::Emitter;
use crate::error::{EmitError, EmitResult};
use crate::scopes::{BlockScope, ScopeKind};
use crate::vocab;
use cslua_sema::{MethodKind, SymbolFlags, SymbolId, SymbolKind, TypeKind};
use cslua_syntax::{NodeData, NodeIndex, SyntaxKind};
use rustc_hash::FxHashSet;

impl<'a> Emitter<'a> {
    // =========================================================================
    // Statement separation and line discipline
    // =========================================================================

    /// Position the writer for a statement: advance to its line, or
    /// separate same-line statements with `;`.
    pub(super) fn separate_statement(&mut self, idx: NodeIndex) {
        let line = self.ast.start_line(idx);
        if line > self.writer.current_line() && !self.node_allows_line_mismatch(idx) {
            self.writer.newline_to_target(line);
            self.pending_semicolon = false;
        } else if self.pending_semicolon && !self.writer.at_line_start() {
            self.writer.write("; ");
            self.pending_semicolon = false;
        } else if !self.writer.at_line_start() {
            self.writer.write_space();
        }
    }

    /// Emit a statement list, tracking whether each return is terminal.
    pub(super) fn emit_statements(&mut self, statements: &[NodeIndex]) -> EmitResult {
        for (pos, &stmt) in statements.iter().enumerate() {
            let prev = self.nonterminal_return;
            self.nonterminal_return = pos + 1 != statements.len();
            self.separate_statement(stmt);
            let result = self.emit_statement(stmt);
            self.nonterminal_return = prev;
            result?;
        }
        Ok(())
    }

    pub(super) fn node_allows_line_mismatch(&self, idx: NodeIndex) -> bool {
        self.ast
            .get(idx)
            .map(|n| n.line_mismatch_allowed() || n.is_synthesized())
            .unwrap_or(true)
    }

    /// Open a delimiter keyword (`do`, `then`, `else`, `repeat`): the next
    /// statement needs no `;` separator.
    pub(super) fn write_opener(&mut self, text: &str) {
        self.writer.write(text);
        self.pending_semicolon = false;
    }

    // =========================================================================
    // Scope push protocol
    // =========================================================================

    /// Identifiers visible from a node: types and namespaces via the model
    /// plus already-promoted top-level locals.
    pub(super) fn compute_globals(&self, site: NodeIndex) -> FxHashSet<String> {
        let mut globals: FxHashSet<String> = self
            .model
            .lookup_namespaces_and_types(site)
            .iter()
            .map(|&sym| self.model.output_id(sym).to_string())
            .collect();
        for frame in self.scopes.type_frames() {
            for &sym in &frame.promoted_symbols {
                globals.insert(self.model.output_id(sym).to_string());
            }
        }
        globals
    }

    /// Push a function-kind frame for `site` whose analyzed region is
    /// `body`, running label dedup for the region's labelled statements.
    pub(super) fn push_function_frame(
        &mut self,
        kind: ScopeKind,
        site: NodeIndex,
        body: NodeIndex,
    ) -> EmitResult {
        let mut frame = BlockScope::new(kind, site);
        frame.globals = self.compute_globals(site);
        if body.is_some() && !self.node_is_empty_block(body) {
            match self.model.analyze_data_flow(body) {
                Some(flow) => frame.flow = flow.clone(),
                None => {
                    return Err(EmitError::compilation(
                        body,
                        "data-flow analysis of the region failed",
                    ));
                }
            }
        }
        self.scopes.push_block(frame, self.model)?;
        if kind.owns_labels() {
            self.dedup_region_labels(body);
        }
        Ok(())
    }

    /// Push a non-function frame (loop, switch, try/using); the data-flow
    /// record is optional for these.
    pub(super) fn push_plain_frame(
        &mut self,
        kind: ScopeKind,
        site: NodeIndex,
        region: NodeIndex,
    ) -> EmitResult {
        let mut frame = BlockScope::new(kind, site);
        frame.globals = self.compute_globals(site);
        if let Some(flow) = self.model.analyze_data_flow(region) {
            frame.flow = flow.clone();
        }
        self.scopes.push_block(frame, self.model)
    }

    fn node_is_empty_block(&self, body: NodeIndex) -> bool {
        self.ast
            .block(body)
            .map(|b| b.statements.is_empty())
            .unwrap_or(false)
    }

    /// Walk the region's labelled statements (not descending into nested
    /// lambdas) and dedup their label names.
    pub(super) fn dedup_region_labels(&mut self, body: NodeIndex) {
        let mut labeled = Vec::new();
        self.collect_labels(body, &mut labeled);
        for stmt in labeled {
            let Some(data) = self.ast.labeled_statement(stmt) else {
                continue;
            };
            let Some(sym) = self
                .model
                .declared_symbol(stmt)
                .or_else(|| self.model.symbol_info(data.label))
            else {
                continue;
            };
            let base = self.model.output_id(sym).to_string();
            let chosen = self.scopes.define_label(&base);
            self.scopes.record_label_symbol(sym, chosen);
        }
    }

    fn collect_labels(&self, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
        let Some(node) = self.ast.get(idx) else {
            return;
        };
        if node.kind == SyntaxKind::LambdaExpr {
            return;
        }
        if node.kind == SyntaxKind::LabeledStatement {
            out.push(idx);
        }
        for child in self.ast.children(idx) {
            self.collect_labels(child, out);
        }
    }

    // =========================================================================
    // Symbol and type queries
    // =========================================================================

    /// The resolved symbol of an expression, looking through parentheses
    /// and to the name part of member accesses.
    pub(super) fn symbol_of(&self, idx: NodeIndex) -> Option<SymbolId> {
        let idx = self.ast.skip_parens(idx);
        if let Some(sym) = self.model.symbol_info(idx) {
            return Some(sym);
        }
        match self.ast.get(idx).map(|n| &n.data) {
            Some(NodeData::MemberAccess(access)) => self.model.symbol_info(access.name),
            Some(NodeData::MemberBinding(binding)) => self.model.symbol_info(binding.name),
            _ => None,
        }
    }

    /// The natural type of an expression.
    pub(super) fn expr_type(&self, idx: NodeIndex) -> Option<SymbolId> {
        self.model.type_info(idx).ty
    }

    /// The converted (contextual) type of an expression.
    pub(super) fn converted_type(&self, idx: NodeIndex) -> Option<SymbolId> {
        self.model.type_info(idx).converted
    }

    pub(super) fn effective_type(&self, idx: NodeIndex) -> Option<SymbolId> {
        self.model.type_info(idx).effective()
    }

    /// Whether an expression's natural type is `Nullable<T>`.
    pub(super) fn is_nullable_expr(&self, idx: NodeIndex) -> bool {
        self.expr_type(idx)
            .map(|ty| self.model.is_nullable_type(ty))
            .unwrap_or(false)
    }

    /// Whether an operand contributes 32-bit integer semantics.
    pub(super) fn is_i32_operand(&self, idx: NodeIndex) -> bool {
        self.effective_type(idx)
            .map(|ty| self.model.is_int32_type(ty))
            .unwrap_or(false)
    }

    /// Whether an expression is string-typed.
    pub(super) fn is_string_expr(&self, idx: NodeIndex) -> bool {
        self.effective_type(idx)
            .map(|ty| self.model.is_string_type(ty))
            .unwrap_or(false)
    }

    /// A *simple* operand can be re-evaluated without side effects:
    /// identifiers, `this`, and member-access chains over them.
    pub(super) fn is_simple_operand(&self, idx: NodeIndex) -> bool {
        let idx = self.ast.skip_parens(idx);
        match self.ast.get(idx).map(|n| &n.data) {
            Some(NodeData::Identifier(_)) => true,
            Some(NodeData::None) => matches!(
                self.ast.kind(idx),
                Some(SyntaxKind::ThisExpr | SyntaxKind::BaseExpr)
            ),
            Some(NodeData::MemberAccess(access)) => {
                // Property reads lower to getter calls; only plain
                // field/local chains are side-effect free.
                let is_property = self
                    .model
                    .symbol_info(access.name)
                    .and_then(|s| self.model.symbol_kind(s))
                    == Some(SymbolKind::Property);
                !is_property && self.is_simple_operand(access.expr)
            }
            _ => false,
        }
    }

    /// Whether the expression can never evaluate to a falsy Lua value:
    /// numerics, strings, creations, arithmetic results, and non-null
    /// non-false literals qualify.
    pub(super) fn is_never_falsy(&self, idx: NodeIndex) -> bool {
        let idx = self.ast.skip_parens(idx);
        let Some(node) = self.ast.get(idx) else {
            return false;
        };
        match &node.data {
            NodeData::Literal(lit) => lit.value.is_always_truthy(),
            NodeData::ObjectCreation(_) | NodeData::ArrayCreation(_) => true,
            NodeData::InterpolatedString(_) => true,
            NodeData::BinaryExpr(binary) if binary.op.is_arithmetic() => true,
            _ => {
                let Some(ty) = self.expr_type(idx) else {
                    return false;
                };
                if self.model.is_nullable_type(ty) {
                    return false;
                }
                // String-typed expressions may still be null; only literal
                // and interpolated forms above are proof.
                self.model.special_type(ty).is_numeric()
            }
        }
    }

    /// Whether a method reference at `idx` must become a bound callable.
    pub(super) fn needs_delegate_binding(&self, idx: NodeIndex) -> bool {
        let Some(converted) = self.converted_type(idx) else {
            return false;
        };
        if !self.model.is_delegate_type(converted) {
            return false;
        }
        matches!(
            self.ast.kind(idx),
            Some(SyntaxKind::Identifier | SyntaxKind::MemberAccess)
        ) && self
            .symbol_of(idx)
            .and_then(|s| self.model.symbol_kind(s))
            == Some(SymbolKind::Method)
    }

    /// Emit a receiver expression. A receiver naming a type writes the type
    /// name itself (static access), never the runtime type value.
    pub(super) fn emit_receiver(&mut self, idx: NodeIndex) -> EmitResult {
        let stripped = self.ast.skip_parens(idx);
        if let Some(sym) = self.model.symbol_info(stripped) {
            if self.model.symbol_kind(sym) == Some(SymbolKind::NamedType) {
                let name = self.model.output_id(sym).to_string();
                self.writer.write(&name);
                return Ok(());
            }
        }
        self.emit_expr(idx)
    }

    /// Output id for a symbol, honoring scope renames and variadic rewrites.
    pub(super) fn output_name_of(&self, sym: SymbolId) -> String {
        if self.variadic_params.contains(&sym) {
            return vocab::VARARG.to_string();
        }
        if let Some(renamed) = self.scopes.resolve_output_id(sym) {
            return renamed.to_string();
        }
        self.model.output_id(sym).to_string()
    }

    /// Output id of the type containing a member symbol.
    pub(super) fn containing_type_name(&self, member: SymbolId) -> String {
        let containing = self
            .model
            .symbol(member)
            .map(|s| s.containing_type)
            .unwrap_or(SymbolId::NONE);
        self.model.output_id(containing).to_string()
    }

    /// Find the accessor of a property or event symbol by method kind.
    pub(super) fn find_accessor(&self, owner: SymbolId, kind: MethodKind) -> Option<SymbolId> {
        let containing = self.model.symbol(owner)?.containing_type;
        self.model.members_of(containing).into_iter().find(|&m| {
            self.model
                .method_shape(m)
                .map(|md| md.method_kind == kind && md.associated == owner)
                .unwrap_or(false)
        })
    }

    /// Whether a property symbol is automatically implemented (reads and
    /// writes go to the backing slot directly).
    pub(super) fn is_auto_property(&self, sym: SymbolId) -> bool {
        self.model.symbol_flags(sym).contains(SymbolFlags::AUTO)
    }

    // =========================================================================
    // Type references
    // =========================================================================

    /// Emit the runtime value denoting a type symbol: the class identifier
    /// for source types, a string literal for externals, a lookup call for
    /// constructed generics.
    pub(super) fn emit_type_symbol_value(&mut self, sym: SymbolId) -> EmitResult {
        let Some(shape) = self.model.type_shape(sym).cloned() else {
            let name = self.model.output_id(sym).to_string();
            self.writer.write(&name);
            return Ok(());
        };
        if !shape.type_args.is_empty() && shape.original_definition.is_some() {
            return self.emit_generic_lookup(sym, &shape);
        }
        if shape.is_from_source {
            let name = self.model.output_id(sym).to_string();
            self.writer.write(&name);
        } else {
            let name = self
                .model
                .symbol(sym)
                .map(|s| s.qualified_name())
                .unwrap_or_default();
            let escaped = crate::writer::escape_string(&name);
            self.writer.write(&escaped);
        }
        Ok(())
    }

    /// `genericlookup("baseId", "mangled", "TPrm1", TArg1, ...)`
    pub(super) fn emit_generic_lookup(
        &mut self,
        sym: SymbolId,
        shape: &cslua_sema::TypeData,
    ) -> EmitResult {
        let definition = shape.original_definition;
        let base = self.model.output_id(definition).to_string();
        let mangled = format!("{}_{}", base, shape.type_args.len());
        self.writer.write(vocab::RT_GENERIC_LOOKUP);
        self.writer.write("(");
        self.writer
            .write(&crate::writer::escape_string(&base));
        self.writer.write(", ");
        self.writer
            .write(&crate::writer::escape_string(&mangled));
        let params = self
            .model
            .type_shape(definition)
            .map(|d| d.type_params.clone())
            .unwrap_or_default();
        for (pos, &arg) in shape.type_args.iter().enumerate() {
            self.writer.write(", ");
            let param_name = params
                .get(pos)
                .map(|&p| self.model.symbol_name(p).to_string())
                .unwrap_or_else(|| format!("T{pos}"));
            self.writer
                .write(&crate::writer::escape_string(&param_name));
            self.writer.write(", ");
            self.emit_type_symbol_value(arg)?;
        }
        self.writer.write(")");
        let _ = sym;
        Ok(())
    }

    /// Emit type syntax appearing in expression position (cast targets).
    pub(super) fn emit_type_syntax(&mut self, idx: NodeIndex) -> EmitResult {
        if let Some(sym) = self
            .model
            .type_info(idx)
            .effective()
            .or_else(|| self.model.symbol_info(idx))
        {
            return self.emit_type_symbol_value(sym);
        }
        match self.ast.get(idx).map(|n| &n.data) {
            Some(NodeData::PredefinedType(pre)) => {
                let text = match pre.keyword.as_str() {
                    "string" => vocab::RT_STRING_LIB.to_string(),
                    other => crate::writer::escape_string(other),
                };
                self.writer.write(&text);
                Ok(())
            }
            Some(NodeData::NamedType(named)) => self.emit_expr(named.name),
            Some(NodeData::QualifiedType(qual)) => {
                self.emit_type_syntax(qual.left)?;
                self.writer.write(".");
                self.emit_type_syntax(qual.right)
            }
            _ => Ok(()),
        }
    }

    /// Whether the type named by a cast-target syntax node is an interface.
    pub(super) fn type_syntax_is_interface(&self, ty: NodeIndex) -> bool {
        self.resolved_type_of_syntax(ty)
            .and_then(|sym| self.model.type_shape(sym))
            .map(|shape| shape.type_kind == TypeKind::Interface)
            .unwrap_or(false)
    }

    pub(super) fn resolved_type_of_syntax(&self, ty: NodeIndex) -> Option<SymbolId> {
        self.model
            .type_info(ty)
            .effective()
            .or_else(|| self.model.symbol_info(ty))
            .or_else(|| match self.ast.get(ty).map(|n| &n.data) {
                Some(NodeData::NamedType(named)) => self.model.symbol_info(named.name),
                _ => None,
            })
    }
}
