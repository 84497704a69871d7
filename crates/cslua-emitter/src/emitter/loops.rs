use super::Emitter;
use crate::error::EmitResult;
use crate::scopes::ScopeKind;
use crate::vocab;
use cslua_sema::SymbolId;
use cslua_syntax::node::ForStatementData;
use cslua_syntax::{AssignOp, BinaryOp, LiteralValue, NodeData, NodeIndex, UnaryOp};

/// A for-loop recognized as the target's native numeric form.
struct SimpleFor {
    counter: SymbolId,
    init: NodeIndex,
    bound: NodeIndex,
    /// `<`/`>` bounds need a one-off correction.
    strict: bool,
    /// Negative for downward loops.
    step: i64,
}

impl<'a> Emitter<'a> {
    // =========================================================================
    // Loops
    // =========================================================================

    pub(super) fn emit_while(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.while_statement(idx).cloned() else {
            return Ok(());
        };
        self.push_plain_frame(ScopeKind::Loop, idx, stmt.body)?;
        self.write_opener("while ");
        let result = (|| -> EmitResult {
            self.emit_expr(stmt.cond)?;
            self.write_opener(" do");
            self.emit_branch(stmt.body)?;
            self.emit_loop_tail(self.ast.end_line(idx))?;
            self.writer.write("end");
            Ok(())
        })();
        self.scopes.pop_block(ScopeKind::Loop)?;
        result
    }

    /// do-while translates to `repeat ... until not (cond)`, preserving the
    /// source's positive-condition semantics.
    pub(super) fn emit_do(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.do_statement(idx).cloned() else {
            return Ok(());
        };
        self.push_plain_frame(ScopeKind::Loop, idx, stmt.body)?;
        self.write_opener("repeat");
        let result = (|| -> EmitResult {
            self.emit_branch(stmt.body)?;
            self.emit_loop_tail(self.ast.end_line(idx))?;
            self.writer.write("until not (");
            self.emit_expr(stmt.cond)?;
            self.writer.write(")");
            Ok(())
        })();
        self.scopes.pop_block(ScopeKind::Loop)?;
        result
    }

    pub(super) fn emit_for(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.for_statement(idx).cloned() else {
            return Ok(());
        };
        self.push_plain_frame(ScopeKind::Loop, idx, idx)?;
        let result = match self.recognize_simple_for(&stmt) {
            Some(simple) => self.emit_simple_for(idx, &stmt, &simple),
            None => self.emit_complex_for(idx, &stmt),
        };
        self.scopes.pop_block(ScopeKind::Loop)?;
        result
    }

    /// A for-loop is simple iff it declares one counter, has no extra
    /// initializers, exactly one incrementor, a `counter <op> bound`
    /// condition, and the body never writes the counter.
    fn recognize_simple_for(&self, stmt: &ForStatementData) -> Option<SimpleFor> {
        if !stmt.initializers.is_empty() || stmt.incrementors.len() != 1 {
            return None;
        }
        let decl = self.ast.local_decl(stmt.decl)?;
        if decl.declarators.len() != 1 {
            return None;
        }
        let declarator = decl.declarators[0];
        let var = self.ast.variable_declarator(declarator)?;
        if var.init.is_none() {
            return None;
        }
        let counter = self.model.declared_symbol(declarator)?;

        let cond = self.ast.binary_expr(stmt.cond)?;
        if !cond.op.is_ordering() {
            return None;
        }
        if self.model.symbol_info(self.ast.skip_parens(cond.left)) != Some(counter) {
            return None;
        }

        let step = self.incrementor_step(stmt.incrementors[0], counter)?;
        let upward = matches!(cond.op, BinaryOp::Lt | BinaryOp::Le);
        if (upward && step <= 0) || (!upward && step >= 0) {
            return None;
        }

        // The counter must not be written in the body.
        let body_flow = self.model.analyze_data_flow(stmt.body)?;
        if body_flow.written_inside.contains(&counter) {
            return None;
        }

        Some(SimpleFor {
            counter,
            init: var.init,
            bound: cond.right,
            strict: matches!(cond.op, BinaryOp::Lt | BinaryOp::Gt),
            step,
        })
    }

    /// The step derived from the single incrementor: `++`/`--`, `+=`/`-=`
    /// with a constant, or `c = c +/- k`.
    fn incrementor_step(&self, inc: NodeIndex, counter: SymbolId) -> Option<i64> {
        let node = self.ast.get(inc)?;
        match &node.data {
            NodeData::UnaryExpr(unary) => {
                if self.model.symbol_info(self.ast.skip_parens(unary.operand)) != Some(counter) {
                    return None;
                }
                match unary.op {
                    UnaryOp::Increment => Some(1),
                    UnaryOp::Decrement => Some(-1),
                    _ => None,
                }
            }
            NodeData::AssignmentExpr(assign) => {
                if self.model.symbol_info(self.ast.skip_parens(assign.left)) != Some(counter) {
                    return None;
                }
                match assign.op {
                    AssignOp::Add => self.constant_int(assign.right),
                    AssignOp::Sub => self.constant_int(assign.right).map(|k| -k),
                    AssignOp::Assign => {
                        let binary = self.ast.binary_expr(assign.right)?;
                        if self.model.symbol_info(self.ast.skip_parens(binary.left))
                            != Some(counter)
                        {
                            return None;
                        }
                        match binary.op {
                            BinaryOp::Add => self.constant_int(binary.right),
                            BinaryOp::Sub => self.constant_int(binary.right).map(|k| -k),
                            _ => None,
                        }
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub(super) fn constant_int(&self, idx: NodeIndex) -> Option<i64> {
        match self
            .model
            .constant_value(idx)
            .cloned()
            .or_else(|| self.ast.literal(idx).map(|l| l.value.clone()))
        {
            Some(LiteralValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    fn emit_simple_for(
        &mut self,
        idx: NodeIndex,
        stmt: &ForStatementData,
        simple: &SimpleFor,
    ) -> EmitResult {
        self.write_opener("for ");
        let name = self.output_name_of(simple.counter);
        self.writer.write(&name);
        self.writer.write(" = ");
        self.emit_expr(simple.init)?;
        self.writer.write(", ");

        // Strict bounds apply a one-off correction: folded into a constant
        // bound, appended at runtime otherwise.
        let correction = if simple.step > 0 { -1 } else { 1 };
        if simple.strict {
            if let Some(bound) = self.constant_int(simple.bound) {
                let text = (bound + correction).to_string();
                self.writer.write(&text);
            } else {
                self.writer.write("(");
                self.emit_expr(simple.bound)?;
                self.writer
                    .write(if correction < 0 { ") - 1" } else { ") + 1" });
            }
        } else {
            self.emit_expr(simple.bound)?;
        }

        if simple.step != 1 {
            self.writer.write(", ");
            let text = simple.step.to_string();
            self.writer.write(&text);
        }
        self.write_opener(" do");
        self.emit_branch(stmt.body)?;
        self.emit_loop_tail(self.ast.end_line(idx))?;
        self.writer.write("end");
        Ok(())
    }

    /// Everything else lowers to a scoped declaration plus a while loop,
    /// incrementors re-ordered to the loop tail.
    fn emit_complex_for(&mut self, idx: NodeIndex, stmt: &ForStatementData) -> EmitResult {
        self.write_opener("do ");
        if stmt.decl.is_some() {
            self.emit_local_decl_core(stmt.decl)?;
        } else {
            for (pos, &init) in stmt.initializers.iter().enumerate() {
                if pos > 0 {
                    self.writer.write("; ");
                }
                self.emit_expr(init)?;
            }
        }
        self.writer.write_space();
        self.writer.write("while ");
        if stmt.cond.is_some() {
            self.emit_expr(stmt.cond)?;
        } else {
            self.writer.write("true");
        }
        self.write_opener(" do");
        self.emit_branch(stmt.body)?;
        self.emit_loop_tail(self.ast.end_line(idx))?;

        // Incrementors belong to the header, not their textual position.
        if !stmt.incrementors.is_empty() {
            let incrementors = stmt.incrementors.clone();
            self.with_fixed_line(idx, |e| {
                for (pos, &inc) in incrementors.iter().enumerate() {
                    if pos > 0 {
                        e.writer.write("; ");
                    }
                    e.emit_expr(inc)?;
                }
                Ok(())
            })?;
            self.writer.write(" ");
        }
        self.writer.write("end end");
        Ok(())
    }

    /// Shared emission for a local declaration outside statement position.
    pub(super) fn emit_local_decl_core(&mut self, decl_idx: NodeIndex) -> EmitResult {
        let Some(decl) = self.ast.local_decl(decl_idx).cloned() else {
            return Ok(());
        };
        self.writer.write("local ");
        for (pos, &declarator) in decl.declarators.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            let name = self.declarator_name(declarator);
            self.writer.write(&name);
        }
        let has_init = decl.declarators.iter().any(|&d| {
            self.ast
                .variable_declarator(d)
                .map(|v| v.init.is_some())
                .unwrap_or(false)
        });
        if has_init {
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

    // =========================================================================
    // foreach
    // =========================================================================

    pub(super) fn emit_foreach(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(stmt) = self.ast.foreach_statement(idx).cloned() else {
            return Ok(());
        };
        self.push_plain_frame(ScopeKind::Loop, idx, idx)?;
        let result = (|| -> EmitResult {
            let name = match self
                .model
                .declared_symbol(idx)
                .or_else(|| self.model.declared_symbol(stmt.name))
            {
                Some(sym) => self.scopes.claim_symbol(sym, self.model),
                None => self
                    .ast
                    .identifier_text(stmt.name)
                    .unwrap_or(vocab::DISCARD)
                    .to_string(),
            };

            // `range(...)` pseudo-calls compile as native numeric loops.
            if let Some(range_args) = self.range_pseudo_args(stmt.expr) {
                self.write_opener("for ");
                self.writer.write(&name);
                self.writer.write(" = ");
                for (pos, arg) in range_args.iter().enumerate() {
                    if pos > 0 {
                        self.writer.write(", ");
                    }
                    self.emit_call_argument_expr(*arg)?;
                }
                self.write_opener(" do");
                self.emit_branch(stmt.body)?;
                self.emit_loop_tail(self.ast.end_line(idx))?;
                self.writer.write("end");
                return Ok(());
            }

            let source_ty = self.effective_type(stmt.expr);
            let is_array = source_ty
                .map(|ty| self.model.is_array_type(ty))
                .unwrap_or(false);

            if is_array {
                let needs_unwrap = source_ty
                    .map(|ty| self.model.array_needs_placeholder(ty))
                    .unwrap_or(false);
                self.write_opener("for ");
                self.writer.write(vocab::DISCARD);
                self.writer.write(", ");
                self.writer.write(&name);
                self.writer.write(" in ");
                self.writer.write(vocab::RT_IPAIRS);
                self.writer.write("(");
                self.emit_expr(stmt.expr)?;
                self.writer.write(")");
                self.write_opener(" do");
                if needs_unwrap {
                    // Placeholder slots read back as nil.
                    self.writer.write(" ");
                    self.writer.write(&name);
                    self.writer.write(" = ");
                    self.writer.write(&name);
                    self.writer.write(" or nil;");
                    self.pending_semicolon = false;
                }
                self.emit_branch(stmt.body)?;
                self.emit_loop_tail(self.ast.end_line(idx))?;
                self.writer.write("end");
                return Ok(());
            }

            // Enumerable sources iterate directly.
            self.write_opener("for ");
            self.writer.write(&name);
            self.writer.write(" in ");
            self.emit_expr(stmt.expr)?;
            self.write_opener(" do");
            self.emit_branch(stmt.body)?;
            self.emit_loop_tail(self.ast.end_line(idx))?;
            self.writer.write("end");
            Ok(())
        })();
        self.scopes.pop_block(ScopeKind::Loop)?;
        result
    }

    /// Arguments of a `range(start, stop[, step])` pseudo-call, when the
    /// foreach source is one.
    fn range_pseudo_args(&self, expr: NodeIndex) -> Option<Vec<NodeIndex>> {
        let inv = self.ast.invocation(self.ast.skip_parens(expr))?;
        let name_node = self.invocation_name_node(inv.callee);
        let method = self.model.symbol_info(name_node)?;
        let shape = self.model.method_shape(method)?;
        if !shape.is_range_pseudo {
            return None;
        }
        Some(inv.args.clone())
    }

    // =========================================================================
    // Loop tail
    // =========================================================================

    /// Before each loop's closer: the continue-label marker, when the scope
    /// allocated one.
    pub(super) fn emit_loop_tail(&mut self, end_line: u32) -> EmitResult {
        let label = self
            .scopes
            .frames()
            .find(|f| f.kind == ScopeKind::Loop)
            .and_then(|f| f.continue_label.clone());
        if end_line > self.writer.current_line() {
            self.writer.newline_to_target(end_line);
        } else {
            self.writer.write_space();
        }
        if let Some(label) = label {
            self.writer.write("::");
            self.writer.write(&label);
            self.writer.write(":: ");
        }
        Ok(())
    }
}
