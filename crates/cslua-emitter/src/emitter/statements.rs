use super::Emitter;
use crate::error::{EmitError, EmitResult};
use crate::scopes::{BlockScope, CaseKey, ControlOptions, ScopeKind};
use crate::vocab;
use cslua_sema::SymbolId;
use cslua_syntax::node::{CatchClauseData, TryStatementData, UsingStatementData};
use cslua_syntax::{GotoTarget, LiteralValue, NodeIndex, SyntaxKind};

impl<'a> Emitter<'a> {
    // =========================================================================
    // Blocks
    // =========================================================================

    /// A block nested directly inside another block (or a switch section)
    /// must be delimited in the target grammar.
    pub(super) fn emit_nested_block(&mut self, idx: NodeIndex) -> EmitResult {
        self.write_opener("do");
        self.emit_block_body(idx)?;
        self.write_end_at(self.ast.end_line(idx));
        Ok(())
    }

    /// The statements of a block, indented one level.
    pub(super) fn emit_block_body(&mut self, block: NodeIndex) -> EmitResult {
        let statements = self
            .ast
            .block(block)
            .map(|b| b.statements.clone())
            .unwrap_or_default();
        self.writer.increase_indent();
        let result = self.emit_statements(&statements);
        self.writer.decrease_indent();
        result
    }

    /// A branch that may be a block or a single statement.
    pub(super) fn emit_branch(&mut self, stmt: NodeIndex) -> EmitResult {
        if self.ast.kind(stmt) == Some(SyntaxKind::Block) {
            return self.emit_block_body(stmt);
        }
        self.writer.increase_indent();
        self.separate_statement(stmt);
        let result = self.emit_statement(stmt);
        self.writer.decrease_indent();
        result
    }

    /// Write a closing keyword at its source line (or inline after a space).
    pub(super) fn write_end_at(&mut self, line: u32) {
        if line > self.writer.current_line() {
            self.writer.newline_to_target(line);
        } else {
            self.writer.write_space();
        }
        self.writer.write("end");
    }

    // =========================================================================
    // Simple statements
    // =========================================================================

    pub(super) fn emit_expression_statement(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.expression_statement(idx).cloned() else {
            return Ok(());
        };
        if self.ast.kind(stmt.expr) == Some(SyntaxKind::ConditionalAccess) {
            return self.emit_conditional_access_statement(stmt.expr);
        }
        // Calls to members excluded by conditional compilation remain as a
        // block comment.
        if self.invocation_is_condition_excluded(stmt.expr) {
            self.writer.write("--[[ ");
            self.emit_expr(stmt.expr)?;
            self.writer.write(" ]]");
            return Ok(());
        }
        self.emit_expr(stmt.expr)
    }

    pub(super) fn emit_local_decl_statement(&mut self, idx: NodeIndex) -> EmitResult {
        let decl_idx = self
            .ast
            .expression_statement(idx)
            .map(|d| d.expr)
            .unwrap_or(NodeIndex::NONE);
        let Some(decl) = self.ast.local_decl(decl_idx).cloned() else {
            return Ok(());
        };

        // Locals hoisted to a switch prologue re-emit as plain assignments.
        let all_hoisted = decl.declarators.iter().all(|&d| {
            self.model
                .declared_symbol(d)
                .map(|s| self.hoisted_locals.contains(&s))
                .unwrap_or(false)
        });
        if all_hoisted && !decl.declarators.is_empty() {
            let mut first = true;
            for &declarator in &decl.declarators {
                let Some(var) = self.ast.variable_declarator(declarator).cloned() else {
                    continue;
                };
                if var.init.is_none() {
                    continue;
                }
                if !first {
                    self.writer.write("; ");
                }
                first = false;
                let name = self.declarator_name(declarator);
                self.writer.write(&name);
                self.writer.write(" = ");
                self.emit_expr(var.init)?;
            }
            return Ok(());
        }

        self.writer.write("local ");
        let mut has_init = false;
        for (pos, &declarator) in decl.declarators.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            let name = self.declarator_name(declarator);
            self.writer.write(&name);
            if self
                .ast
                .variable_declarator(declarator)
                .map(|v| v.init.is_some())
                .unwrap_or(false)
            {
                has_init = true;
            }
        }
        // An all-null initializer set is omitted; unset locals are nil.
        let all_null = decl.declarators.iter().all(|&d| {
            self.ast
                .variable_declarator(d)
                .map(|v| {
                    v.init.is_none()
                        || matches!(
                            self.ast.literal(v.init).map(|l| &l.value),
                            Some(LiteralValue::Null)
                        )
                })
                .unwrap_or(true)
        });
        if has_init && !all_null {
            self.writer.write(" = ");
            for (pos, &declarator) in decl.declarators.iter().enumerate() {
                if pos > 0 {
                    self.writer.write(", ");
                }
                let init = self
                    .ast
                    .variable_declarator(declarator)
                    .map(|v| v.init)
                    .unwrap_or(NodeIndex::NONE);
                if init.is_none() {
                    self.writer.write("nil");
                } else {
                    self.emit_expr(init)?;
                }
            }
        }
        Ok(())
    }

    /// Output name of a declarator: its deduped id, or the discard token
    /// for discard symbols.
    pub(super) fn declarator_name(&mut self, declarator: NodeIndex) -> String {
        let name_node = self
            .ast
            .variable_declarator(declarator)
            .map(|v| v.name)
            .unwrap_or(NodeIndex::NONE);
        let sym = self
            .model
            .declared_symbol(declarator)
            .or_else(|| self.model.declared_symbol(name_node));
        match sym {
            Some(sym) => self.output_name_of(sym),
            None => self
                .ast
                .identifier_text(name_node)
                .unwrap_or(vocab::DISCARD)
                .to_string(),
        }
    }

    pub(super) fn emit_if(&mut self, idx: NodeIndex, as_elseif: bool) -> EmitResult {
        let Some(stmt) = self.ast.if_statement(idx).cloned() else {
            return Ok(());
        };
        self.write_opener(if as_elseif { "elseif " } else { "if " });
        self.emit_expr(stmt.cond)?;
        self.write_opener(" then");
        self.emit_branch(stmt.then_branch)?;

        if stmt.else_branch.is_none() {
            self.write_end_at(self.ast.end_line(idx));
            return Ok(());
        }

        let else_line = self.ast.start_line(stmt.else_branch);
        if self.ast.kind(stmt.else_branch) == Some(SyntaxKind::IfStatement) {
            if else_line > self.writer.current_line() {
                self.writer.newline_to_target(else_line);
            } else {
                self.writer.write_space();
            }
            self.pending_semicolon = false;
            return self.emit_if(stmt.else_branch, true);
        }

        if else_line > self.writer.current_line() {
            self.writer.newline_to_target(else_line);
        } else {
            self.writer.write_space();
        }
        self.write_opener("else");
        self.emit_branch(stmt.else_branch)?;
        self.write_end_at(self.ast.end_line(idx));
        Ok(())
    }

    // =========================================================================
    // Control transfer
    // =========================================================================

    pub(super) fn emit_break(&mut self, _idx: NodeIndex) -> EmitResult {
        if self.scopes.crosses_protected_region_to_loop() {
            self.scopes.record_control_option(ControlOptions::BREAK);
            self.writer.write("return 0");
            return Ok(());
        }
        self.writer.write("break");
        Ok(())
    }

    pub(super) fn emit_continue(&mut self, idx: NodeIndex) -> EmitResult {
        if self.scopes.crosses_protected_region_to_loop() {
            self.scopes.record_control_option(ControlOptions::CONTINUE);
            self.writer.write("return 1");
            return Ok(());
        }
        let Some(label) = self.scopes.ensure_continue_label() else {
            return Err(EmitError::compilation(
                idx,
                "continue statement outside of a loop",
            ));
        };
        self.writer.write("goto ");
        self.writer.write(&label);
        Ok(())
    }

    pub(super) fn emit_return(&mut self, idx: NodeIndex) -> EmitResult {
        let expr = self
            .ast
            .return_statement(idx)
            .map(|r| r.expr)
            .unwrap_or(NodeIndex::NONE);
        let is_tuple = self.ast.kind(self.ast.skip_parens(expr)) == Some(SyntaxKind::TupleExpr);

        // The target language forbids non-terminal returns.
        let wrap = self.nonterminal_return;
        if wrap {
            self.write_opener("do ");
        }

        if self.scopes.crosses_protected_region_to_function() {
            self.scopes.record_control_option(ControlOptions::RETURN);
            if is_tuple {
                self.scopes
                    .record_control_option(ControlOptions::RETURN_MULTIPLE);
            }
            self.writer.write("return 2");
            if expr.is_some() {
                self.writer.write(", ");
                if is_tuple {
                    self.writer.write("{ ");
                    self.emit_expr(self.ast.skip_parens(expr))?;
                    self.writer.write(" }");
                } else {
                    self.emit_expr(expr)?;
                }
            }
        } else {
            self.writer.write("return");
            if expr.is_some() {
                self.writer.write(" ");
                if is_tuple {
                    self.emit_expr(self.ast.skip_parens(expr))?;
                } else {
                    self.emit_expr(expr)?;
                }
            }
        }

        if wrap {
            self.writer.write(" end");
        }
        Ok(())
    }

    pub(super) fn emit_goto(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.goto_statement(idx).cloned() else {
            return Ok(());
        };
        match stmt.target {
            GotoTarget::Label(label) => {
                let name = match self.model.symbol_info(label) {
                    Some(sym) => self.output_name_of(sym),
                    None => self
                        .ast
                        .identifier_text(label)
                        .unwrap_or_default()
                        .to_string(),
                };
                self.writer.write("goto ");
                self.writer.write(&name);
                Ok(())
            }
            GotoTarget::Case(expr) => {
                let key = self.case_key_of(expr)?;
                let label = self
                    .scopes
                    .nearest_switch()
                    .and_then(|f| f.switch_labels.get(&key).cloned());
                let Some(label) = label else {
                    return Err(EmitError::compilation(
                        idx,
                        "goto case matches no section of the enclosing switch",
                    ));
                };
                self.writer.write("goto ");
                self.writer.write(&label);
                Ok(())
            }
            GotoTarget::Default => {
                let label = self
                    .scopes
                    .nearest_switch()
                    .and_then(|f| f.switch_default_label.clone());
                let Some(label) = label else {
                    return Err(EmitError::compilation(
                        idx,
                        "goto default in a switch without a default section",
                    ));
                };
                self.writer.write("goto ");
                self.writer.write(&label);
                Ok(())
            }
        }
    }

    pub(super) fn emit_labeled(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.labeled_statement(idx).cloned() else {
            return Ok(());
        };
        let sym = self
            .model
            .declared_symbol(idx)
            .or_else(|| self.model.symbol_info(stmt.label));
        let name = match sym {
            Some(sym) => self.output_name_of(sym),
            None => self
                .ast
                .identifier_text(stmt.label)
                .unwrap_or_default()
                .to_string(),
        };
        self.writer.write("::");
        self.writer.write(&name);
        self.writer.write("::");
        self.pending_semicolon = false;
        if stmt.statement.is_some() {
            self.separate_statement(stmt.statement);
            self.emit_statement(stmt.statement)?;
        }
        Ok(())
    }

    pub(super) fn emit_throw(&mut self, idx: NodeIndex) -> EmitResult {
        let expr = self
            .ast
            .throw_statement(idx)
            .map(|t| t.expr)
            .unwrap_or(NodeIndex::NONE);
        self.writer.write(vocab::RT_ERROR);
        self.writer.write("(");
        if expr.is_none() {
            // Bare rethrow inside a catch handler.
            let ident = self.catch_idents.last().cloned();
            let Some(ident) = ident else {
                return Err(EmitError::compilation(
                    idx,
                    "rethrow outside of a catch handler",
                ));
            };
            self.writer.write(&ident);
        } else if matches!(
            self.ast.literal(self.ast.skip_parens(expr)).map(|l| &l.value),
            Some(LiteralValue::Null)
        ) {
            self.writer.write(vocab::RT_NULL_REF_EXCEPTION);
            self.writer.write(":");
            self.writer.write(vocab::RT_NEW);
            self.writer.write("()");
        } else {
            self.emit_expr(expr)?;
        }
        self.writer.write(")");
        Ok(())
    }

    // =========================================================================
    // Switch
    // =========================================================================

    pub(super) fn emit_switch(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(switch) = self.ast.switch_statement(idx).cloned() else {
            return Ok(());
        };

        // Collect every local declared textually inside any case; the target
        // rejects gotos jumping over local declarations, so they are hoisted.
        let mut section_locals: Vec<(NodeIndex, SymbolId)> = Vec::new();
        for &section in &switch.sections {
            self.collect_section_locals(section, &mut section_locals);
        }

        let mut frame = BlockScope::new(ScopeKind::Switch, idx);
        frame.globals = self.compute_globals(idx);
        // The subject local reserves `_` before nested discards dedup.
        frame.dedup_by_id.insert(vocab::DISCARD.to_string(), SymbolId::NONE);
        frame.flow.succeeded = true;
        frame.flow.variables_declared = section_locals.iter().map(|&(_, s)| s).collect();
        self.scopes.push_block(frame, self.model)?;

        let saved_hoisted = std::mem::take(&mut self.hoisted_locals);
        self.hoisted_locals = section_locals.iter().map(|&(_, s)| s).collect();

        let result = self.emit_switch_inner(idx, &switch, &section_locals);

        self.hoisted_locals = saved_hoisted;
        self.scopes.pop_block(ScopeKind::Switch)?;
        result
    }

    fn emit_switch_inner(
        &mut self,
        idx: NodeIndex,
        switch: &cslua_syntax::node::SwitchStatementData,
        section_locals: &[(NodeIndex, SymbolId)],
    ) -> EmitResult {
        // Lowered to `repeat ... until true` so `break` exits correctly.
        self.write_opener("repeat");
        self.writer.increase_indent();
        self.writer.write(" local ");
        self.writer.write(vocab::DISCARD);
        self.writer.write(" = ");
        self.emit_expr(switch.expr)?;

        // Hoisted pre-declarations.
        if !section_locals.is_empty() {
            self.writer.write("; local ");
            for (pos, &(_, sym)) in section_locals.iter().enumerate() {
                if pos > 0 {
                    self.writer.write(", ");
                }
                let name = self.output_name_of(sym);
                self.writer.write(&name);
            }
        }

        // Allocate one label per section, default moved to the end of the
        // dispatch chain but keeping its allocation order.
        let mut labels: Vec<String> = Vec::with_capacity(switch.sections.len());
        let mut default_pos: Option<usize> = None;
        for (pos, &section) in switch.sections.iter().enumerate() {
            let base = section_label_base(pos);
            let label = self.scopes.alloc_utility_label(&base);
            labels.push(label.clone());
            let Some(data) = self.ast.switch_section(section).cloned() else {
                continue;
            };
            for &case in &data.labels {
                match self.ast.kind(case) {
                    Some(SyntaxKind::CaseLabel) => {
                        let expr = self.ast.case_label(case).map(|c| c.expr).unwrap_or(NodeIndex::NONE);
                        let key = self.case_key_of(expr)?;
                        if let Some(frame) = self.scopes.top_mut() {
                            frame.switch_labels.insert(key, label.clone());
                        }
                    }
                    Some(SyntaxKind::DefaultLabel) => {
                        default_pos = Some(pos);
                        if let Some(frame) = self.scopes.top_mut() {
                            frame.switch_default_label = Some(label.clone());
                        }
                    }
                    _ => {}
                }
            }
        }

        // Dispatch chain; a switch with only a default section emits none.
        let has_cases = switch
            .sections
            .iter()
            .enumerate()
            .any(|(pos, _)| default_pos != Some(pos));
        if has_cases {
            let mut first = true;
            for (pos, &section) in switch.sections.iter().enumerate() {
                if default_pos == Some(pos) {
                    continue;
                }
                let Some(data) = self.ast.switch_section(section).cloned() else {
                    continue;
                };
                self.writer.write(if first { " if " } else { " elseif " });
                first = false;
                let mut first_case = true;
                for &case in &data.labels {
                    if self.ast.kind(case) != Some(SyntaxKind::CaseLabel) {
                        continue;
                    }
                    if !first_case {
                        self.writer.write(" or ");
                    }
                    first_case = false;
                    self.writer.write(vocab::DISCARD);
                    self.writer.write(" == ");
                    let expr = self.ast.case_label(case).map(|c| c.expr).unwrap_or(NodeIndex::NONE);
                    self.emit_case_constant(expr)?;
                }
                self.writer.write(" then goto ");
                self.writer.write(&labels[pos]);
            }
            match default_pos {
                Some(pos) => {
                    self.writer.write(" else goto ");
                    self.writer.write(&labels[pos]);
                    self.writer.write(" end");
                }
                None => {
                    self.writer.write(" else break end");
                }
            }
        }

        // Section bodies, each preceded by its label.
        for (pos, &section) in switch.sections.iter().enumerate() {
            let Some(data) = self.ast.switch_section(section).cloned() else {
                continue;
            };
            if has_cases {
                let line = self.ast.start_line(section);
                if line > self.writer.current_line() {
                    self.writer.newline_to_target(line);
                } else {
                    self.writer.write_space();
                }
                self.writer.write("::");
                self.writer.write(&labels[pos]);
                self.writer.write("::");
                self.pending_semicolon = false;
            }
            self.emit_statements(&data.statements)?;
        }

        self.writer.decrease_indent();
        let end = self.ast.end_line(idx);
        if end > self.writer.current_line() {
            self.writer.newline_to_target(end);
        } else {
            self.writer.write_space();
        }
        self.writer.write("until true");
        Ok(())
    }

    fn collect_section_locals(&self, idx: NodeIndex, out: &mut Vec<(NodeIndex, SymbolId)>) {
        let Some(node) = self.ast.get(idx) else {
            return;
        };
        if node.kind == SyntaxKind::LambdaExpr {
            return;
        }
        if node.kind == SyntaxKind::LocalDeclStatement {
            if let Some(decl_idx) = self.ast.expression_statement(idx).map(|d| d.expr) {
                if let Some(decl) = self.ast.local_decl(decl_idx) {
                    for &declarator in &decl.declarators {
                        if let Some(sym) = self.model.declared_symbol(declarator) {
                            out.push((declarator, sym));
                        }
                    }
                }
            }
        }
        for child in self.ast.children(idx) {
            self.collect_section_locals(child, out);
        }
    }

    /// Case expressions must fold to constants.
    fn case_key_of(&self, expr: NodeIndex) -> EmitResult<CaseKey> {
        let value = self
            .model
            .constant_value(expr)
            .cloned()
            .or_else(|| self.ast.literal(expr).map(|l| l.value.clone()));
        let Some(value) = value else {
            return Err(EmitError::unsupported(
                expr,
                "case expressions must be compile-time constants",
            ));
        };
        Ok(match value {
            LiteralValue::Null => CaseKey::Null,
            LiteralValue::Bool(b) => CaseKey::Bool(b),
            LiteralValue::Int(v) => CaseKey::Int(v),
            LiteralValue::Char(c) => CaseKey::Int(i64::from(c as u32)),
            LiteralValue::Str(s) => CaseKey::Str(s),
            LiteralValue::Float(f) if f.fract() == 0.0 => CaseKey::Int(f as i64),
            LiteralValue::Float(_) => {
                return Err(EmitError::unsupported(
                    expr,
                    "fractional case constants are not supported",
                ));
            }
        })
    }

    fn emit_case_constant(&mut self, expr: NodeIndex) -> EmitResult {
        let value = self
            .model
            .constant_value(expr)
            .cloned()
            .or_else(|| self.ast.literal(expr).map(|l| l.value.clone()))
            .unwrap_or(LiteralValue::Null);
        self.writer.write_constant(&value);
        Ok(())
    }

    // =========================================================================
    // Try / using
    // =========================================================================

    pub(super) fn emit_try(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.try_statement(idx).cloned() else {
            return Ok(());
        };

        // Dry run under an output lock to accumulate control options.
        let options = self.dry_run_protected(idx, |e| e.emit_try_lambdas(&stmt))?;

        let has_options = !options.is_empty();
        let (res_name, ret_name) = if has_options {
            (self.scopes.claim_name("res"), self.scopes.claim_name("ret"))
        } else {
            (String::new(), String::new())
        };

        self.push_plain_frame(ScopeKind::TryOrUsing, idx, stmt.block)?;
        if let Some(frame) = self.scopes.top_mut() {
            frame.control_options = options;
        }

        if has_options {
            self.write_opener("do ");
            self.writer.write("local ");
            self.writer.write(&res_name);
            self.writer.write(", ");
            self.writer.write(&ret_name);
            self.writer.write(" = ");
        }

        let result = self.emit_try_lambdas(&stmt);
        self.scopes.pop_block(ScopeKind::TryOrUsing)?;
        result?;

        if has_options {
            self.emit_control_dispatch(idx, options, &res_name, &ret_name)?;
            self.writer.write(" end");
        }
        Ok(())
    }

    /// `try(bodyFn, filter1, catch1, ...)` or `tryfinally(..., finallyFn)`.
    fn emit_try_lambdas(&mut self, stmt: &TryStatementData) -> EmitResult {
        self.writer.write(if stmt.finally_block.is_some() {
            vocab::RT_TRYFINALLY
        } else {
            vocab::RT_TRY
        });
        self.writer.write("(function()");
        self.pending_semicolon = false;
        self.emit_block_body(stmt.block)?;
        self.write_end_at(self.ast.end_line(stmt.block));

        for &catch in &stmt.catches {
            let Some(clause) = self.ast.catch_clause(catch).cloned() else {
                continue;
            };
            self.writer.write(", ");
            let line = self.ast.start_line(catch);
            if line > self.writer.current_line() {
                self.writer.newline_to_target(line);
            }
            self.emit_catch_filter(&clause)?;
            self.writer.write(", ");
            self.emit_catch_handler(&clause)?;
        }

        if stmt.finally_block.is_some() {
            self.writer.write(", ");
            let line = self.ast.start_line(stmt.finally_block);
            if line > self.writer.current_line() {
                self.writer.newline_to_target(line);
            }
            self.writer.write("function()");
            self.pending_semicolon = false;
            self.emit_block_body(stmt.finally_block)?;
            self.write_end_at(self.ast.end_line(stmt.finally_block));
        }

        self.writer.write(")");
        Ok(())
    }

    /// The synthesized predicate for a catch clause.
    fn emit_catch_filter(&mut self, clause: &CatchClauseData) -> EmitResult {
        let ident = self.catch_ident_name(clause);
        if clause.ty.is_none() && clause.when.is_none() {
            self.writer.write("function() return true end");
            return Ok(());
        }
        self.writer.write("function(");
        self.writer.write(&ident);
        self.writer.write(")");
        match (clause.ty.is_some(), clause.when.is_some()) {
            (true, true) => {
                self.writer.write(" if ");
                self.writer.write(vocab::RT_IS);
                self.writer.write("(");
                self.writer.write(&ident);
                self.writer.write(", ");
                self.emit_catch_type(clause.ty)?;
                self.writer.write(") then return true end return ");
                self.emit_expr(clause.when)?;
                self.writer.write(" end");
            }
            (true, false) => {
                self.writer.write(" return ");
                self.writer.write(vocab::RT_IS);
                self.writer.write("(");
                self.writer.write(&ident);
                self.writer.write(", ");
                self.emit_catch_type(clause.ty)?;
                self.writer.write(") end");
            }
            (false, true) => {
                self.writer.write(" return ");
                self.emit_expr(clause.when)?;
                self.writer.write(" end");
            }
            (false, false) => {
                self.writer.write(" return true end");
            }
        }
        Ok(())
    }

    fn emit_catch_type(&mut self, ty: NodeIndex) -> EmitResult {
        match self.resolved_type_of_syntax(ty) {
            Some(sym) => self.emit_type_symbol_value(sym),
            None => self.emit_type_syntax(ty),
        }
    }

    fn emit_catch_handler(&mut self, clause: &CatchClauseData) -> EmitResult {
        let ident = self.catch_ident_name(clause);
        self.writer.write("function(");
        if clause.ident.is_some() || clause.when.is_some() {
            self.writer.write(&ident);
        }
        self.writer.write(")");
        self.pending_semicolon = false;
        self.catch_idents.push(ident);
        let result = self.emit_block_body(clause.block);
        self.catch_idents.pop();
        result?;
        self.write_end_at(self.ast.end_line(clause.block));
        Ok(())
    }

    fn catch_ident_name(&mut self, clause: &CatchClauseData) -> String {
        if clause.ident.is_some() {
            if let Some(sym) = self
                .model
                .declared_symbol(clause.ident)
                .or_else(|| self.model.symbol_info(clause.ident))
            {
                return self.scopes.claim_symbol(sym, self.model);
            }
            if let Some(text) = self.ast.identifier_text(clause.ident) {
                return text.to_string();
            }
        }
        "e".to_string()
    }

    pub(super) fn emit_using(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.using_statement(idx).cloned() else {
            return Ok(());
        };

        let options = self.dry_run_protected(idx, |e| e.emit_using_lambda(&stmt))?;

        let has_options = !options.is_empty();
        let (res_name, ret_name) = if has_options {
            (self.scopes.claim_name("res"), self.scopes.claim_name("ret"))
        } else {
            (String::new(), String::new())
        };

        self.push_plain_frame(ScopeKind::TryOrUsing, idx, stmt.body)?;
        if let Some(frame) = self.scopes.top_mut() {
            frame.control_options = options;
        }

        if has_options {
            self.write_opener("do ");
            self.writer.write("local ");
            self.writer.write(&res_name);
            self.writer.write(", ");
            self.writer.write(&ret_name);
            self.writer.write(" = ");
        }

        let result = self.emit_using_lambda(&stmt);
        self.scopes.pop_block(ScopeKind::TryOrUsing)?;
        result?;

        if has_options {
            self.emit_control_dispatch(idx, options, &res_name, &ret_name)?;
            self.writer.write(" end");
        }
        Ok(())
    }

    /// `using(resource..., function(resource...) body end)`.
    fn emit_using_lambda(&mut self, stmt: &UsingStatementData) -> EmitResult {
        self.writer.write(vocab::RT_USING);
        self.writer.write("(");

        let mut names: Vec<String> = Vec::new();
        if stmt.decl.is_some() {
            let declarators = self
                .ast
                .local_decl(stmt.decl)
                .map(|d| d.declarators.clone())
                .unwrap_or_default();
            for (pos, &declarator) in declarators.iter().enumerate() {
                if pos > 0 {
                    self.writer.write(", ");
                }
                let init = self
                    .ast
                    .variable_declarator(declarator)
                    .map(|v| v.init)
                    .unwrap_or(NodeIndex::NONE);
                self.emit_expr(init)?;
                match self.model.declared_symbol(declarator) {
                    Some(sym) => names.push(self.scopes.claim_symbol(sym, self.model)),
                    None => names.push(self.declarator_name(declarator)),
                }
            }
        } else if stmt.expr.is_some() {
            self.emit_expr(stmt.expr)?;
            names.push(self.scopes.claim_name("res"));
        }

        self.writer.write(", function(");
        self.writer.write(&names.join(", "));
        self.writer.write(")");
        self.pending_semicolon = false;
        if self.ast.kind(stmt.body) == Some(SyntaxKind::Block) {
            self.emit_block_body(stmt.body)?;
        } else {
            self.writer.increase_indent();
            self.separate_statement(stmt.body);
            let result = self.emit_statement(stmt.body);
            self.writer.decrease_indent();
            result?;
        }
        self.write_end_at(self.ast.end_line(stmt.body));
        self.writer.write(")");
        Ok(())
    }

    /// Run a protected-region traversal under an output lock, returning the
    /// accumulated control options.
    fn dry_run_protected(
        &mut self,
        idx: NodeIndex,
        f: impl FnOnce(&mut Self) -> EmitResult,
    ) -> EmitResult<ControlOptions> {
        let label_snapshot = self.scopes.utility_label_snapshot();
        self.push_plain_frame(ScopeKind::TryOrUsing, idx, NodeIndex::NONE)?;
        let saved_hoisted = self.hoisted_locals.clone();
        let dry = self.with_output_lock(f);
        self.hoisted_locals = saved_hoisted;
        let frame = self.scopes.pop_block(ScopeKind::TryOrUsing)?;
        self.scopes.restore_utility_labels(label_snapshot);
        dry?;
        Ok(frame.control_options)
    }

    /// The result-dispatch epilogue: one arm per recorded control option,
    /// in break/continue/return order.
    fn emit_control_dispatch(
        &mut self,
        idx: NodeIndex,
        options: ControlOptions,
        res: &str,
        ret: &str,
    ) -> EmitResult {
        if options.contains(ControlOptions::BREAK) {
            self.writer.write(&format!(" if {} == {res} then ", vocab::CTL_BREAK));
            if self.scopes.crosses_protected_region_to_loop() {
                self.scopes.record_control_option(ControlOptions::BREAK);
                self.writer.write("return 0");
            } else {
                self.writer.write("break");
            }
            self.writer.write(" end");
        }
        if options.contains(ControlOptions::CONTINUE) {
            self.writer
                .write(&format!(" if {} == {res} then ", vocab::CTL_CONTINUE));
            if self.scopes.crosses_protected_region_to_loop() {
                self.scopes.record_control_option(ControlOptions::CONTINUE);
                self.writer.write("return 1");
            } else {
                let Some(label) = self.scopes.ensure_continue_label() else {
                    return Err(EmitError::compilation(
                        idx,
                        "continue dispatched outside of a loop",
                    ));
                };
                self.writer.write("goto ");
                self.writer.write(&label);
            }
            self.writer.write(" end");
        }
        if options.contains(ControlOptions::RETURN) {
            self.writer
                .write(&format!(" if {} == {res} then ", vocab::CTL_RETURN));
            if self.scopes.crosses_protected_region_to_function() {
                self.scopes.record_control_option(ControlOptions::RETURN);
                if options.contains(ControlOptions::RETURN_MULTIPLE) {
                    self.scopes
                        .record_control_option(ControlOptions::RETURN_MULTIPLE);
                }
                self.writer.write(&format!("return 2, {ret}"));
            } else if options.contains(ControlOptions::RETURN_MULTIPLE) {
                self.writer.write(&format!(
                    "return {}({ret})",
                    vocab::RT_UNPACK
                ));
            } else {
                self.writer.write(&format!("return {ret}"));
            }
            self.writer.write(" end");
        }
        Ok(())
    }
}

/// Label base for the section at `pos`: `CASE_A`, `CASE_B`, ...
fn section_label_base(pos: usize) -> String {
    if pos < 26 {
        let letter = (b'A' + pos as u8) as char;
        format!("{}{letter}", vocab::CASE_LABEL_PREFIX)
    } else {
        format!("{}{pos}", vocab::CASE_LABEL_PREFIX)
    }
}
