use super::Emitter;
use crate::error::{EmitError, EmitResult};
use crate::vocab;
use crate::writer::escape_string;
use cslua_sema::{MethodKind, SpecialType, SymbolFlags, SymbolId, SymbolKind};
use cslua_syntax::node::{AssignmentExprData, BinaryExprData};
use cslua_syntax::{
    AssignOp, BinaryOp, InitializerKind, LiteralValue, NodeData, NodeIndex, SyntaxKind, UnaryOp,
};

/// One normalized argument slot after named/default/params resolution.
#[derive(Clone, Debug)]
pub(super) enum ArgSlot {
    /// The receiver token `self`.
    SelfReceiver,
    /// A receiver taken from the call syntax.
    Receiver(NodeIndex),
    Expr(NodeIndex),
    Const(LiteralValue),
    /// A `params` array flattened at the call site.
    Unpack(NodeIndex),
}

impl<'a> Emitter<'a> {
    // =========================================================================
    // Literals
    // =========================================================================

    pub(super) fn emit_literal(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(lit) = self.ast.literal(idx).cloned() else {
            return Ok(());
        };
        // An integer literal outside the int32 range but typed as uint32 is
        // converted to its signed overflow value before being written.
        if let LiteralValue::Int(v) = lit.value {
            let special = self
                .effective_type(idx)
                .map(|ty| self.model.special_type(ty))
                .unwrap_or(SpecialType::None);
            if special == SpecialType::UInt32 && v > i64::from(i32::MAX) {
                let wrapped = i64::from(v as u32 as i32);
                self.writer.write_constant(&LiteralValue::Int(wrapped));
                return Ok(());
            }
        }
        self.writer.write_constant(&lit.value);
        Ok(())
    }

    // =========================================================================
    // Binary expressions
    // =========================================================================

    pub(super) fn emit_binary(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(binary) = self.ast.binary_expr(idx).cloned() else {
            return Ok(());
        };

        match binary.op {
            BinaryOp::Coalesce => self.emit_coalesce(idx, binary.left, binary.right),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                self.emit_expr(binary.left)?;
                self.writer.write(if binary.op == BinaryOp::LogicalAnd {
                    " and "
                } else {
                    " or "
                });
                self.emit_expr(binary.right)
            }
            op if op.is_bitwise() => self.emit_bitwise(&binary),
            BinaryOp::Add if self.is_string_concat(&binary) => self.emit_string_concat(&binary),
            op if op.is_arithmetic() && self.is_i32_arithmetic(&binary) => {
                self.emit_i32_arithmetic(&binary)
            }
            op if op.is_ordering() && self.has_nullable_operand(&binary) => {
                self.emit_nullable_comparison(&binary)
            }
            op => {
                self.emit_expr(binary.left)?;
                if let Some(text) = vocab::operator_text(op) {
                    self.writer.write(" ");
                    self.writer.write(text);
                    self.writer.write(" ");
                }
                self.emit_expr(binary.right)
            }
        }
    }

    fn is_i32_arithmetic(&self, binary: &BinaryExprData) -> bool {
        self.is_i32_operand(binary.left) || self.is_i32_operand(binary.right)
    }

    fn has_nullable_operand(&self, binary: &BinaryExprData) -> bool {
        self.is_nullable_expr(binary.left) || self.is_nullable_expr(binary.right)
    }

    fn is_string_concat(&self, binary: &BinaryExprData) -> bool {
        self.is_string_expr(binary.left) || self.is_string_expr(binary.right)
    }

    /// 32-bit semantics: `+`/`-` narrow the whole expression, `*`, `/`, `%`
    /// dispatch to runtime helpers.
    fn emit_i32_arithmetic(&mut self, binary: &BinaryExprData) -> EmitResult {
        match binary.op {
            BinaryOp::Add | BinaryOp::Sub => {
                self.writer.write(vocab::RT_I32NARROW);
                self.writer.write("(");
                self.emit_expr(binary.left)?;
                self.writer
                    .write(if binary.op == BinaryOp::Add { " + " } else { " - " });
                self.emit_expr(binary.right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Mul => {
                self.writer.write(vocab::RT_I32MUL);
                self.writer.write("(");
                self.emit_expr(binary.left)?;
                self.writer.write(", ");
                self.emit_expr(binary.right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Div => {
                self.writer.write(vocab::RT_I32TRUNCATE);
                self.writer.write("(");
                self.emit_expr(binary.left)?;
                self.writer.write(" / ");
                self.emit_expr(binary.right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Mod => {
                self.writer.write(vocab::RT_I32MOD);
                self.writer.write("(");
                self.emit_expr(binary.left)?;
                self.writer.write(", ");
                self.emit_expr(binary.right)?;
                self.writer.write(")");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Bitwise operators dispatch to the bit library; on booleans, `&`, `|`
    /// and `^` dispatch to the boolean variants instead.
    fn emit_bitwise(&mut self, binary: &BinaryExprData) -> EmitResult {
        let boolean = self
            .effective_type(binary.left)
            .map(|ty| self.model.is_boolean_like(ty))
            .unwrap_or(false);
        let unsigned_shift = self
            .effective_type(binary.left)
            .map(|ty| self.model.special_type(ty) == SpecialType::UInt32)
            .unwrap_or(false);
        let helper = match binary.op {
            BinaryOp::BitAnd if boolean => vocab::BOOL_AND,
            BinaryOp::BitOr if boolean => vocab::BOOL_OR,
            BinaryOp::BitXor if boolean => vocab::BOOL_XOR,
            BinaryOp::BitAnd => vocab::BIT_AND,
            BinaryOp::BitOr => vocab::BIT_OR,
            BinaryOp::BitXor => vocab::BIT_XOR,
            BinaryOp::Shl => vocab::BIT_LSHIFT,
            BinaryOp::Shr if unsigned_shift => vocab::BIT_RSHIFT,
            BinaryOp::Shr => vocab::BIT_ARSHIFT,
            _ => return Ok(()),
        };
        self.writer.write(helper);
        self.writer.write("(");
        self.emit_expr(binary.left)?;
        self.writer.write(", ");
        self.emit_expr(binary.right)?;
        self.writer.write(")");
        Ok(())
    }

    /// `+` on strings maps to `..`; operands not provably non-null strings
    /// are wrapped in `tostring` (numbers are coerced by the target).
    fn emit_string_concat(&mut self, binary: &BinaryExprData) -> EmitResult {
        self.emit_concat_operand(binary.left)?;
        self.writer.write(" .. ");
        self.emit_concat_operand(binary.right)
    }

    pub(super) fn emit_concat_operand(&mut self, idx: NodeIndex) -> EmitResult {
        let stripped = self.ast.skip_parens(idx);
        // Nested concatenations chain without rewrapping.
        if let Some(inner) = self.ast.binary_expr(stripped) {
            if inner.op == BinaryOp::Add && self.is_string_concat(inner) {
                return self.emit_expr(idx);
            }
        }
        if self.concat_operand_is_safe(stripped) {
            return self.emit_expr(idx);
        }
        self.writer.write(vocab::RT_TOSTRING);
        self.writer.write("(");
        self.emit_expr(idx)?;
        self.writer.write(")");
        Ok(())
    }

    fn concat_operand_is_safe(&self, idx: NodeIndex) -> bool {
        match self.ast.get(idx).map(|n| &n.data) {
            Some(NodeData::Literal(lit)) => {
                matches!(
                    lit.value,
                    LiteralValue::Str(_) | LiteralValue::Int(_) | LiteralValue::Float(_)
                )
            }
            Some(NodeData::InterpolatedString(_)) => true,
            _ => {
                // Numbers coerce implicitly; everything else might be nil.
                let Some(ty) = self.effective_type(idx) else {
                    return false;
                };
                !self.model.is_nullable_type(ty) && self.model.special_type(ty).is_numeric()
            }
        }
    }

    /// Nullable ordering comparison: simple operands get a `~= nil` guard,
    /// complex ones are wrapped so NaN propagates a false result.
    fn emit_nullable_comparison(&mut self, binary: &BinaryExprData) -> EmitResult {
        self.writer.write("(");
        for operand in [binary.left, binary.right] {
            if self.is_nullable_expr(operand) && self.is_simple_operand(operand) {
                self.emit_expr(operand)?;
                self.writer.write(" ~= nil and ");
            }
        }
        self.emit_comparison_operand(binary.left)?;
        if let Some(text) = vocab::operator_text(binary.op) {
            self.writer.write(" ");
            self.writer.write(text);
            self.writer.write(" ");
        }
        self.emit_comparison_operand(binary.right)?;
        self.writer.write(")");
        Ok(())
    }

    fn emit_comparison_operand(&mut self, idx: NodeIndex) -> EmitResult {
        if self.is_nullable_expr(idx) && !self.is_simple_operand(idx) {
            self.writer.write("((");
            self.emit_expr(idx)?;
            self.writer.write(") or (0/0))");
            return Ok(());
        }
        self.emit_expr(idx)
    }

    /// `a ?? b`: table-indexed ternary when the result may be a null-or-false
    /// boolean, else the simple `and`/`or` form.
    fn emit_coalesce(&mut self, idx: NodeIndex, left: NodeIndex, right: NodeIndex) -> EmitResult {
        let boolean_result = self
            .effective_type(idx)
            .map(|ty| self.model.is_boolean_like(ty))
            .unwrap_or(false)
            || self
                .expr_type(left)
                .map(|ty| self.model.is_boolean_like(ty))
                .unwrap_or(false);
        if boolean_result {
            self.writer.write("((");
            self.emit_expr(left)?;
            self.writer.write(" == nil) and { ");
            self.emit_expr(right)?;
            self.writer.write(" } or { ");
            self.emit_expr(left)?;
            self.writer.write(" })[1]");
            return Ok(());
        }
        self.writer.write("(");
        self.emit_expr(left)?;
        self.writer.write(") and (");
        self.emit_expr(left)?;
        self.writer.write(") or (");
        self.emit_expr(right)?;
        self.writer.write(")");
        Ok(())
    }

    // =========================================================================
    // Unary expressions
    // =========================================================================

    pub(super) fn emit_prefix_unary(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(unary) = self.ast.unary_expr(idx).cloned() else {
            return Ok(());
        };
        match unary.op {
            UnaryOp::Not => {
                self.writer.write("not ");
                self.emit_expr(unary.operand)
            }
            UnaryOp::Neg => {
                self.writer.write("-");
                self.emit_expr(unary.operand)
            }
            UnaryOp::Plus => self.emit_expr(unary.operand),
            UnaryOp::BitNot => {
                self.writer.write(vocab::BIT_NOT);
                self.writer.write("(");
                self.emit_expr(unary.operand)?;
                self.writer.write(")");
                Ok(())
            }
            UnaryOp::Increment | UnaryOp::Decrement => self.emit_increment(idx, &unary),
        }
    }

    pub(super) fn emit_postfix_unary(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(unary) = self.ast.unary_expr(idx).cloned() else {
            return Ok(());
        };
        match unary.op {
            UnaryOp::Increment | UnaryOp::Decrement => self.emit_increment(idx, &unary),
            _ => Ok(()),
        }
    }

    /// `++`/`--` occur in statement positions only; both forms expand to a
    /// plain counter assignment.
    fn emit_increment(
        &mut self,
        _idx: NodeIndex,
        unary: &cslua_syntax::node::UnaryExprData,
    ) -> EmitResult {
        self.emit_expr(unary.operand)?;
        self.writer.write(" = ");
        self.emit_expr(unary.operand)?;
        self.writer
            .write(if unary.op == UnaryOp::Increment { " + 1" } else { " - 1" });
        Ok(())
    }

    // =========================================================================
    // Ternary
    // =========================================================================

    pub(super) fn emit_ternary(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(cond) = self.ast.conditional_expr(idx).cloned() else {
            return Ok(());
        };
        if self.is_never_falsy(cond.when_true) {
            self.writer.write("(");
            self.emit_expr(cond.cond)?;
            self.writer.write(") and (");
            self.emit_expr(cond.when_true)?;
            self.writer.write(") or (");
            self.emit_expr(cond.when_false)?;
            self.writer.write(")");
            return Ok(());
        }
        self.writer.write("((");
        self.emit_expr(cond.cond)?;
        self.writer.write(") and { ");
        self.emit_expr(cond.when_true)?;
        self.writer.write(" } or { ");
        self.emit_expr(cond.when_false)?;
        self.writer.write(" })[1]");
        Ok(())
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    pub(super) fn emit_assignment(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(assign) = self.ast.assignment_expr(idx).cloned() else {
            return Ok(());
        };
        let left = self.ast.skip_parens(assign.left);
        let left_sym = self.symbol_of(left);

        // Event `+=`/`-=` expand to the add/remove accessor.
        if let Some(sym) = left_sym {
            if self.model.symbol_kind(sym) == Some(SymbolKind::Event)
                && matches!(assign.op, AssignOp::Add | AssignOp::Sub)
            {
                return self.emit_event_accessor_call(&assign, left, sym);
            }
            if self.model.symbol_kind(sym) == Some(SymbolKind::Property)
                && !self.is_auto_property(sym)
            {
                return self.emit_property_assignment(&assign, left, sym);
            }
        }

        if self.ast.kind(left) == Some(SyntaxKind::ElementAccess) {
            return self.emit_element_assignment(&assign, left);
        }

        if self.ast.kind(left) == Some(SyntaxKind::TupleExpr) {
            return self.emit_tuple_assignment(&assign, left);
        }

        // Plain store: locals, fields, auto properties.
        self.emit_expr(left)?;
        self.writer.write(" = ");
        let right = assign.right;
        self.emit_assignment_value(assign.op, left, right, None)
    }

    fn emit_event_accessor_call(
        &mut self,
        assign: &AssignmentExprData,
        left: NodeIndex,
        event: SymbolId,
    ) -> EmitResult {
        let kind = if assign.op == AssignOp::Add {
            MethodKind::EventAdd
        } else {
            MethodKind::EventRemove
        };
        let accessor = self.accessor_name(event, kind);
        let is_static = self.model.symbol_flags(event).contains(SymbolFlags::STATIC);
        self.emit_accessor_receiver(left, event, is_static)?;
        self.writer.write(&accessor);
        self.writer.write("(");
        if !is_static && self.assignment_target_is_base(left) {
            self.writer.write(vocab::SELF);
            self.writer.write(", ");
        }
        self.emit_expr(assign.right)?;
        self.writer.write(")");
        Ok(())
    }

    fn assignment_target_is_base(&self, left: NodeIndex) -> bool {
        self.ast
            .member_access(left)
            .map(|access| self.ast.kind(access.expr) == Some(SyntaxKind::BaseExpr))
            .unwrap_or(false)
    }

    /// Property assignment on a non-auto property: the setter is opened,
    /// the value (expanded for compound forms) is spliced in, and the call
    /// is closed once the right-hand side completes.
    fn emit_property_assignment(
        &mut self,
        assign: &AssignmentExprData,
        left: NodeIndex,
        property: SymbolId,
    ) -> EmitResult {
        let setter_sym = self.find_accessor(property, MethodKind::PropertySet);
        let setter = self.accessor_name(property, MethodKind::PropertySet);
        let is_static = self
            .model
            .symbol_flags(property)
            .contains(SymbolFlags::STATIC);

        self.scopes.push_lhs(setter_sym.unwrap_or(SymbolId::NONE));
        self.emit_accessor_receiver(left, property, is_static)?;
        self.writer.write(&setter);
        self.writer.write("(");
        if !is_static && self.assignment_target_is_base(left) {
            // Base accessor calls pass the receiver explicitly.
            self.writer.write(vocab::SELF);
            self.writer.write(", ");
        }
        let result = (|| -> EmitResult {
            if let Some(op) = assign.op.expansion() {
                let getter = self.accessor_name(property, MethodKind::PropertyGet);
                let read = ReadForm::PropertyGetter {
                    target: left,
                    getter,
                    is_static,
                };
                self.emit_expanded_value(op, read, assign.right)?;
            } else {
                self.emit_expr(assign.right)?;
            }
            Ok(())
        })();
        self.scopes.pop_lhs();
        result?;
        self.writer.write(")");
        Ok(())
    }

    /// Emit the receiver (and `.`/`:` separator) of an accessor call for an
    /// assignment target.
    fn emit_accessor_receiver(
        &mut self,
        left: NodeIndex,
        member: SymbolId,
        is_static: bool,
    ) -> EmitResult {
        if is_static {
            let owner = self.containing_type_name(member);
            self.writer.write(&owner);
            self.writer.write(".");
            return Ok(());
        }
        match self.ast.get(left).map(|n| &n.data) {
            Some(NodeData::MemberAccess(access)) => {
                let access = access.clone();
                if self.ast.kind(access.expr) == Some(SyntaxKind::BaseExpr) {
                    // Base accessor calls pass self explicitly; the caller
                    // has already resolved the accessor name.
                    let owner = self.containing_type_name(member);
                    self.writer.write(&owner);
                    self.writer.write(".");
                    return Ok(());
                }
                self.emit_expr(access.expr)?;
                self.writer.write(":");
                Ok(())
            }
            _ => {
                self.writer.write(vocab::SELF);
                self.writer.write(":");
                Ok(())
            }
        }
    }

    fn emit_element_assignment(
        &mut self,
        assign: &AssignmentExprData,
        left: NodeIndex,
    ) -> EmitResult {
        let Some(element) = self.ast.element_access(left).cloned() else {
            return Ok(());
        };
        let recv_ty = self.effective_type(element.expr);
        let is_array = recv_ty
            .map(|ty| self.model.is_array_type(ty))
            .unwrap_or(false);

        if is_array {
            let needs_placeholder = recv_ty
                .map(|ty| self.model.array_needs_placeholder(ty))
                .unwrap_or(false);
            self.emit_expr(element.expr)?;
            self.writer.write("[");
            if let Some(&index) = element.args.first() {
                self.emit_index_rebased(index)?;
            }
            self.writer.write("] = ");
            let wrap = needs_placeholder.then_some(ValueWrap::OrFalse);
            return self.emit_assignment_value(assign.op, left, assign.right, wrap);
        }

        // Indexer: setter call with the index arguments then the value.
        let Some(indexer) = self.symbol_of(left) else {
            return Err(EmitError::compilation(
                left,
                "element assignment target did not resolve to an indexer",
            ));
        };
        let setter = self.accessor_name(indexer, MethodKind::PropertySet);
        self.emit_expr(element.expr)?;
        self.writer.write(":");
        self.writer.write(&setter);
        self.writer.write("(");
        for &arg in &element.args {
            self.emit_call_argument_expr(arg)?;
            self.writer.write(", ");
        }
        if let Some(op) = assign.op.expansion() {
            let getter = self.accessor_name(indexer, MethodKind::PropertyGet);
            let read = ReadForm::IndexerGetter {
                element: left,
                getter,
            };
            self.emit_expanded_value(op, read, assign.right)?;
        } else {
            self.emit_expr(assign.right)?;
        }
        self.writer.write(")");
        Ok(())
    }

    fn emit_tuple_assignment(
        &mut self,
        assign: &AssignmentExprData,
        left: NodeIndex,
    ) -> EmitResult {
        let Some(tuple) = self.ast.tuple_expr(left).cloned() else {
            return Ok(());
        };
        for (pos, &element) in tuple.args.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            self.emit_expr(element)?;
        }
        self.writer.write(" = ");
        self.emit_expr(assign.right)
    }

    /// Emit the assignment's value, expanding compound forms to
    /// `a = a <op> b` with the binary lowerings applied.
    fn emit_assignment_value(
        &mut self,
        op: AssignOp,
        left: NodeIndex,
        right: NodeIndex,
        wrap: Option<ValueWrap>,
    ) -> EmitResult {
        if let Some(ValueWrap::OrFalse) = wrap {
            self.writer.write("(");
            self.emit_compound_or_plain(op, left, right)?;
            self.writer.write(" or false)");
            return Ok(());
        }
        self.emit_compound_or_plain(op, left, right)
    }

    fn emit_compound_or_plain(
        &mut self,
        op: AssignOp,
        left: NodeIndex,
        right: NodeIndex,
    ) -> EmitResult {
        match op.expansion() {
            None => self.emit_expr(right),
            Some(bop) => self.emit_expanded_value(bop, ReadForm::Node(left), right),
        }
    }

    /// The expansion of a compound assignment's value, reusing the binary
    /// lowerings with `read` standing in for the left operand.
    fn emit_expanded_value(
        &mut self,
        op: BinaryOp,
        read: ReadForm,
        right: NodeIndex,
    ) -> EmitResult {
        let left_node = read.node();
        let left_is_i32 = left_node.map(|n| self.is_i32_operand(n)).unwrap_or(false);
        let i32_semantics = left_is_i32 || self.is_i32_operand(right);
        let string_concat = left_node.map(|n| self.is_string_expr(n)).unwrap_or(false)
            || self.is_string_expr(right);
        let boolean = left_node
            .and_then(|n| self.effective_type(n))
            .map(|ty| self.model.is_boolean_like(ty))
            .unwrap_or(false);

        match op {
            BinaryOp::Coalesce => {
                self.writer.write("(");
                self.emit_read_form(&read)?;
                self.writer.write(") and (");
                self.emit_read_form(&read)?;
                self.writer.write(") or (");
                self.emit_expr(right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Add if string_concat => {
                self.emit_read_form(&read)?;
                self.writer.write(" .. ");
                self.emit_concat_operand(right)
            }
            BinaryOp::Add | BinaryOp::Sub if i32_semantics => {
                self.writer.write(vocab::RT_I32NARROW);
                self.writer.write("(");
                self.emit_read_form(&read)?;
                self.writer
                    .write(if op == BinaryOp::Add { " + " } else { " - " });
                self.emit_expr(right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Mul if i32_semantics => {
                self.writer.write(vocab::RT_I32MUL);
                self.writer.write("(");
                self.emit_read_form(&read)?;
                self.writer.write(", ");
                self.emit_expr(right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Div if i32_semantics => {
                self.writer.write(vocab::RT_I32TRUNCATE);
                self.writer.write("(");
                self.emit_read_form(&read)?;
                self.writer.write(" / ");
                self.emit_expr(right)?;
                self.writer.write(")");
                Ok(())
            }
            BinaryOp::Mod if i32_semantics => {
                self.writer.write(vocab::RT_I32MOD);
                self.writer.write("(");
                self.emit_read_form(&read)?;
                self.writer.write(", ");
                self.emit_expr(right)?;
                self.writer.write(")");
                Ok(())
            }
            op if op.is_bitwise() => {
                let helper = match op {
                    BinaryOp::BitAnd if boolean => vocab::BOOL_AND,
                    BinaryOp::BitOr if boolean => vocab::BOOL_OR,
                    BinaryOp::BitXor if boolean => vocab::BOOL_XOR,
                    BinaryOp::BitAnd => vocab::BIT_AND,
                    BinaryOp::BitOr => vocab::BIT_OR,
                    BinaryOp::BitXor => vocab::BIT_XOR,
                    BinaryOp::Shl => vocab::BIT_LSHIFT,
                    _ => vocab::BIT_ARSHIFT,
                };
                self.writer.write(helper);
                self.writer.write("(");
                self.emit_read_form(&read)?;
                self.writer.write(", ");
                self.emit_expr(right)?;
                self.writer.write(")");
                Ok(())
            }
            op => {
                self.emit_read_form(&read)?;
                if let Some(text) = vocab::operator_text(op) {
                    self.writer.write(" ");
                    self.writer.write(text);
                    self.writer.write(" ");
                }
                self.emit_expr(right)
            }
        }
    }

    fn emit_read_form(&mut self, read: &ReadForm) -> EmitResult {
        match read {
            ReadForm::Node(idx) => self.emit_expr(*idx),
            ReadForm::PropertyGetter {
                target,
                getter,
                is_static,
            } => {
                let getter = getter.clone();
                if *is_static {
                    let Some(sym) = self.symbol_of(*target) else {
                        return Ok(());
                    };
                    let owner = self.containing_type_name(sym);
                    self.writer.write(&owner);
                    self.writer.write(".");
                } else {
                    match self.ast.get(*target).map(|n| &n.data) {
                        Some(NodeData::MemberAccess(access)) => {
                            let receiver = access.expr;
                            self.emit_expr(receiver)?;
                            self.writer.write(":");
                        }
                        _ => {
                            self.writer.write(vocab::SELF);
                            self.writer.write(":");
                        }
                    }
                }
                self.writer.write(&getter);
                self.writer.write("()");
                Ok(())
            }
            ReadForm::IndexerGetter { element, getter } => {
                let getter = getter.clone();
                let Some(data) = self.ast.element_access(*element).cloned() else {
                    return Ok(());
                };
                self.emit_expr(data.expr)?;
                self.writer.write(":");
                self.writer.write(&getter);
                self.writer.write("(");
                for (pos, &arg) in data.args.iter().enumerate() {
                    if pos > 0 {
                        self.writer.write(", ");
                    }
                    self.emit_call_argument_expr(arg)?;
                }
                self.writer.write(")");
                Ok(())
            }
        }
    }

    // =========================================================================
    // Element access (read position)
    // =========================================================================

    pub(super) fn emit_element_access(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(element) = self.ast.element_access(idx).cloned() else {
            return Ok(());
        };
        let recv_ty = self.effective_type(element.expr);
        let is_array = recv_ty
            .map(|ty| self.model.is_array_type(ty))
            .unwrap_or(false);

        if is_array {
            let needs_placeholder = recv_ty
                .map(|ty| self.model.array_needs_placeholder(ty))
                .unwrap_or(false);
            if needs_placeholder {
                self.writer.write("(");
            }
            self.emit_expr(element.expr)?;
            self.writer.write("[");
            if let Some(&index) = element.args.first() {
                self.emit_index_rebased(index)?;
            }
            self.writer.write("]");
            if needs_placeholder {
                self.writer.write(" or nil)");
            }
            return Ok(());
        }

        let Some(indexer) = self.symbol_of(idx) else {
            return Err(EmitError::compilation(
                idx,
                "element access did not resolve to an indexer",
            ));
        };
        let getter = self.accessor_name(indexer, MethodKind::PropertyGet);
        self.emit_expr(element.expr)?;
        self.writer.write(":");
        self.writer.write(&getter);
        self.writer.write("(");
        for (pos, &arg) in element.args.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            self.emit_call_argument_expr(arg)?;
        }
        self.writer.write(")");
        Ok(())
    }

    /// Array indices are rebased from 0 to 1: constants fold inline, other
    /// expressions append `+ 1`.
    pub(super) fn emit_index_rebased(&mut self, index: NodeIndex) -> EmitResult {
        let index = match self.ast.get(index).map(|n| &n.data) {
            Some(NodeData::Argument(arg)) => arg.expr,
            _ => index,
        };
        let constant = self
            .model
            .constant_value(index)
            .cloned()
            .or_else(|| self.ast.literal(index).map(|l| l.value.clone()));
        if let Some(LiteralValue::Int(v)) = constant {
            let text = (v + 1).to_string();
            self.writer.write(&text);
            return Ok(());
        }
        self.emit_expr(index)?;
        self.writer.write(" + 1");
        Ok(())
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    pub(super) fn emit_invocation(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(inv) = self.ast.invocation(idx).cloned() else {
            return Ok(());
        };
        let callee_kind = self.ast.kind(inv.callee);
        let name_node = self.invocation_name_node(inv.callee);
        let method = self
            .model
            .symbol_info(name_node)
            .filter(|&sym| self.model.symbol_kind(sym) == Some(SymbolKind::Method));

        let Some(method) = method else {
            // Delegate value invocation: call the value directly.
            self.emit_expr(inv.callee)?;
            self.writer.write("(");
            self.emit_plain_arguments(&inv.args)?;
            self.writer.write(")");
            return Ok(());
        };

        let flags = self.model.symbol_flags(method);
        let is_static = flags.contains(SymbolFlags::STATIC);
        let is_extension = self
            .model
            .method_shape(method)
            .map(|m| m.is_extension)
            .unwrap_or(false);
        let promoted = self.scopes.is_promoted(method);
        let name = self.model.output_id(method).to_string();
        let slots = self.normalize_arguments(method, &inv.args)?;

        match callee_kind {
            Some(SyntaxKind::MemberAccess) => {
                let receiver = self
                    .ast
                    .member_access(inv.callee)
                    .map(|a| a.expr)
                    .unwrap_or(NodeIndex::NONE);
                if self.ast.kind(receiver) == Some(SyntaxKind::BaseExpr) {
                    // Base dispatch: `TYPE.name(self, args)`.
                    let owner = self.containing_type_name(method);
                    self.writer.write(&owner);
                    self.writer.write(".");
                    self.writer.write(&name);
                    return self.emit_argument_list(slots, Some(ArgSlot::SelfReceiver));
                }
                if is_extension || (promoted && !is_static) {
                    // Extension dispatch: bare name, receiver first.
                    self.writer.write(&name);
                    return self.emit_argument_list(slots, Some(ArgSlot::Receiver(receiver)));
                }
                if promoted {
                    self.writer.write(&name);
                    return self.emit_argument_list(slots, None);
                }
                self.emit_receiver(receiver)?;
                self.writer.write(if is_static { "." } else { ":" });
                self.writer.write(&name);
                self.emit_argument_list(slots, None)
            }
            Some(SyntaxKind::MemberBinding) => {
                self.emit_binding_receiver()?;
                self.writer.write(if is_static { "." } else { ":" });
                self.writer.write(&name);
                self.emit_argument_list(slots, None)
            }
            _ => {
                // Bare name: implicit receiver.
                if promoted && !is_static {
                    self.writer.write(&name);
                    return self.emit_argument_list(slots, Some(ArgSlot::SelfReceiver));
                }
                if promoted || is_extension {
                    self.writer.write(&name);
                    return self.emit_argument_list(slots, None);
                }
                if is_static {
                    let owner = self.containing_type_name(method);
                    self.writer.write(&owner);
                    self.writer.write(".");
                    self.writer.write(&name);
                    return self.emit_argument_list(slots, None);
                }
                self.writer.write(vocab::SELF);
                self.writer.write(":");
                self.writer.write(&name);
                self.emit_argument_list(slots, None)
            }
        }
    }

    pub(super) fn invocation_name_node(&self, callee: NodeIndex) -> NodeIndex {
        match self.ast.get(callee).map(|n| &n.data) {
            Some(NodeData::MemberAccess(access)) => access.name,
            Some(NodeData::MemberBinding(binding)) => binding.name,
            _ => callee,
        }
    }

    /// Whether an invocation's target method is excluded by an undefined
    /// conditional-compilation symbol.
    pub(super) fn invocation_is_condition_excluded(&self, expr: NodeIndex) -> bool {
        let Some(inv) = self.ast.invocation(expr) else {
            return false;
        };
        let name_node = self.invocation_name_node(inv.callee);
        let Some(method) = self.model.symbol_info(name_node) else {
            return false;
        };
        let Some(shape) = self.model.method_shape(method) else {
            return false;
        };
        !shape.conditional_symbols.is_empty()
            && !shape
                .conditional_symbols
                .iter()
                .any(|sym| self.options.is_defined(sym))
    }

    /// Normalize arguments: named arguments into positional slots, optional
    /// parameters backfilled with their defaults, trailing null defaults
    /// dropped, `params` arrays flattened.
    pub(super) fn normalize_arguments(
        &self,
        method: SymbolId,
        args: &[NodeIndex],
    ) -> EmitResult<Vec<ArgSlot>> {
        let Some(shape) = self.model.method_shape(method) else {
            return Ok(args.iter().map(|&a| ArgSlot::Expr(a)).collect());
        };
        let params = &shape.params;
        let params_pos = params.iter().position(|p| p.is_params);
        let fixed_count = params_pos.unwrap_or(params.len());

        let mut positional: Vec<Option<ArgSlot>> = vec![None; fixed_count];
        let mut rest: Vec<NodeIndex> = Vec::new();
        let mut next = 0usize;

        for &arg in args {
            let (name, expr) = match self.ast.get(arg).map(|n| &n.data) {
                Some(NodeData::Argument(data)) => (data.name.clone(), data.expr),
                _ => (None, arg),
            };
            if let Some(label) = name {
                let Some(slot) = params.iter().position(|p| p.name == label) else {
                    return Err(EmitError::compilation(
                        arg,
                        format!("named argument `{label}` matches no parameter"),
                    ));
                };
                if slot < fixed_count {
                    positional[slot] = Some(ArgSlot::Expr(expr));
                } else {
                    rest.push(expr);
                }
                continue;
            }
            if next >= fixed_count && params_pos.is_some() {
                rest.push(expr);
            } else if next < fixed_count {
                positional[next] = Some(ArgSlot::Expr(expr));
                next += 1;
            } else {
                rest.push(expr);
            }
        }

        // Backfill optional parameters with their explicit default literal.
        let mut slots: Vec<ArgSlot> = Vec::with_capacity(positional.len() + rest.len());
        for (pos, slot) in positional.into_iter().enumerate() {
            match slot {
                Some(filled) => slots.push(filled),
                None => {
                    let param = &params[pos];
                    if param.is_optional || param.has_explicit_default {
                        let default = param
                            .default_value
                            .clone()
                            .unwrap_or(LiteralValue::Null);
                        slots.push(ArgSlot::Const(default));
                    }
                }
            }
        }

        // Trailing null-valued defaults are dropped (null is implicit).
        while matches!(slots.last(), Some(ArgSlot::Const(LiteralValue::Null))) {
            slots.pop();
        }

        // A `params` parameter receiving an existing array is flattened.
        if params_pos.is_some() {
            if rest.len() == 1
                && self
                    .effective_type(rest[0])
                    .map(|ty| self.model.is_array_type(ty))
                    .unwrap_or(false)
            {
                slots.push(ArgSlot::Unpack(rest[0]));
            } else {
                slots.extend(rest.into_iter().map(ArgSlot::Expr));
            }
        } else {
            slots.extend(rest.into_iter().map(ArgSlot::Expr));
        }

        Ok(slots)
    }

    pub(super) fn emit_argument_list(
        &mut self,
        slots: Vec<ArgSlot>,
        receiver: Option<ArgSlot>,
    ) -> EmitResult {
        self.writer.write("(");
        let mut first = true;
        if let Some(recv) = receiver {
            self.emit_argument_slot(&recv)?;
            first = false;
        }
        for slot in &slots {
            if !first {
                self.writer.write(", ");
            }
            first = false;
            self.emit_argument_slot(slot)?;
        }
        self.writer.write(")");
        Ok(())
    }

    fn emit_argument_slot(&mut self, slot: &ArgSlot) -> EmitResult {
        match slot {
            ArgSlot::SelfReceiver => {
                self.writer.write(vocab::SELF);
                Ok(())
            }
            ArgSlot::Receiver(idx) => self.emit_expr(*idx),
            ArgSlot::Expr(idx) => {
                let line = self.ast.start_line(*idx);
                if line > self.writer.current_line() && !self.node_allows_line_mismatch(*idx) {
                    self.writer.newline_to_target(line);
                }
                self.emit_call_argument_expr(*idx)
            }
            ArgSlot::Const(value) => {
                self.writer.write_constant(value);
                Ok(())
            }
            ArgSlot::Unpack(idx) => {
                self.writer.write(vocab::RT_UNPACK);
                self.writer.write("(");
                self.emit_expr(*idx)?;
                self.writer.write(")");
                Ok(())
            }
        }
    }

    fn emit_plain_arguments(&mut self, args: &[NodeIndex]) -> EmitResult {
        for (pos, &arg) in args.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            self.emit_call_argument_expr(arg)?;
        }
        Ok(())
    }

    /// Arguments may be wrapped in `Argument` nodes.
    pub(super) fn emit_call_argument_expr(&mut self, arg: NodeIndex) -> EmitResult {
        match self.ast.get(arg).map(|n| &n.data) {
            Some(NodeData::Argument(data)) => {
                let expr = data.expr;
                self.emit_expr(expr)
            }
            _ => self.emit_expr(arg),
        }
    }

    // =========================================================================
    // Object and array creation
    // =========================================================================

    pub(super) fn emit_object_creation(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(creation) = self.ast.object_creation(idx).cloned() else {
            return Ok(());
        };

        let initializer = self
            .ast
            .initializer_expr(creation.initializer)
            .cloned();

        if let Some(init) = &initializer {
            let all_sequential = init.kind == InitializerKind::Collection
                && !init
                    .exprs
                    .iter()
                    .any(|&e| self.ast.kind(e) == Some(SyntaxKind::AssignmentExpr));
            self.writer.write(if all_sequential {
                vocab::RT_INITARR
            } else {
                vocab::RT_INITLIST
            });
            self.writer.write("(");
            self.emit_creation_call(idx, &creation)?;
            if all_sequential {
                for &entry in &init.exprs {
                    self.writer.write(", ");
                    self.emit_expr(entry)?;
                }
            } else {
                for &entry in &init.exprs {
                    self.writer.write(", ");
                    self.emit_initlist_entry(entry)?;
                }
            }
            self.writer.write(")");
            return Ok(());
        }

        self.emit_creation_call(idx, &creation)
    }

    fn emit_creation_call(
        &mut self,
        idx: NodeIndex,
        creation: &cslua_syntax::node::ObjectCreationData,
    ) -> EmitResult {
        let Some(ty) = self.resolved_type_of_syntax(creation.ty) else {
            return Err(EmitError::compilation(
                idx,
                "object creation target type did not resolve",
            ));
        };
        self.emit_type_symbol_value(ty)?;

        let ctor = self.model.symbol_info(idx);
        let slots = match ctor {
            Some(ctor) => self.normalize_arguments(ctor, &creation.args)?,
            None => creation.args.iter().map(|&a| ArgSlot::Expr(a)).collect(),
        };

        let ctor_id = ctor.map(|c| self.model.output_id(c).to_string());
        match ctor_id {
            Some(id) if id != vocab::CTOR_NAME && !id.is_empty() => {
                // Overloaded constructor: dispatch through its id.
                self.writer.write(":");
                self.writer.write(vocab::RT_ONEW);
                self.writer.write("(");
                self.writer.write(&escape_string(&id));
                for slot in &slots {
                    self.writer.write(", ");
                    self.emit_argument_slot(slot)?;
                }
                self.writer.write(")");
                Ok(())
            }
            _ => {
                self.writer.write(":");
                self.writer.write(vocab::RT_NEW);
                self.emit_argument_list(slots, None)
            }
        }
    }

    /// One `initlist` entry: named assignments carry a setter flag and key
    /// literal, positional values pass through.
    fn emit_initlist_entry(&mut self, entry: NodeIndex) -> EmitResult {
        let Some(assign) = self.ast.assignment_expr(entry).cloned() else {
            self.writer.write("false, ");
            return self.emit_expr(entry);
        };
        let target = self.ast.skip_parens(assign.left);
        let sym = self.symbol_of(target);
        let needs_setter = sym
            .map(|s| {
                self.model.symbol_kind(s) == Some(SymbolKind::Property)
                    && !self.is_auto_property(s)
            })
            .unwrap_or(false);
        if needs_setter {
            let sym = sym.unwrap_or(SymbolId::NONE);
            let setter = self.accessor_name(sym, MethodKind::PropertySet);
            self.writer.write("true, ");
            self.writer.write(&escape_string(&setter));
        } else {
            let name = sym
                .map(|s| self.model.output_id(s).to_string())
                .or_else(|| self.ast.identifier_text(target).map(str::to_string))
                .unwrap_or_default();
            self.writer.write("false, ");
            self.writer.write(&escape_string(&name));
        }
        self.writer.write(", ");
        self.emit_expr(assign.right)
    }

    pub(super) fn emit_array_creation(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(creation) = self.ast.array_creation(idx).cloned() else {
            return Ok(());
        };
        let needs_placeholder = self
            .effective_type(idx)
            .map(|ty| self.model.array_needs_placeholder(ty))
            .unwrap_or(false);

        if creation.initializer.is_some() {
            return self.emit_array_table(creation.initializer, needs_placeholder);
        }

        // Sized creation: reference arrays pre-fill the placeholder so the
        // length operator sees every slot.
        self.writer.write("{");
        if needs_placeholder {
            let size = self
                .model
                .constant_value(creation.size)
                .cloned()
                .or_else(|| self.ast.literal(creation.size).map(|l| l.value.clone()));
            if let Some(LiteralValue::Int(n)) = size {
                for pos in 0..n.max(0) {
                    if pos > 0 {
                        self.writer.write(", ");
                    }
                    self.writer.write("false");
                }
            }
        }
        self.writer.write("}");
        Ok(())
    }

    fn emit_array_table(&mut self, initializer: NodeIndex, placeholder: bool) -> EmitResult {
        let Some(init) = self.ast.initializer_expr(initializer).cloned() else {
            self.writer.write("{}");
            return Ok(());
        };
        self.writer.write("{ ");
        for (pos, &value) in init.exprs.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            if placeholder && !self.is_never_falsy(value) {
                if matches!(
                    self.ast.literal(value).map(|l| &l.value),
                    Some(LiteralValue::Null)
                ) {
                    self.writer.write("false");
                } else {
                    self.writer.write("(");
                    self.emit_expr(value)?;
                    self.writer.write(" or false)");
                }
            } else {
                self.emit_expr(value)?;
            }
        }
        self.writer.write(" }");
        Ok(())
    }

    /// A bare initializer expression in value position emits a table.
    pub(super) fn emit_initializer_values(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(init) = self.ast.initializer_expr(idx).cloned() else {
            return Ok(());
        };
        self.writer.write("{ ");
        for (pos, &value) in init.exprs.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            self.emit_expr(value)?;
        }
        self.writer.write(" }");
        Ok(())
    }

    // =========================================================================
    // Casts
    // =========================================================================

    pub(super) fn emit_cast(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(cast) = self.ast.cast_expr(idx).cloned() else {
            return Ok(());
        };
        let target = self.resolved_type_of_syntax(cast.ty);
        let source = self.effective_type(cast.expr);

        // Delegate targets bind the operand.
        if let Some(target_ty) = target {
            if self.model.is_delegate_type(target_ty) {
                return self.emit_expr(cast.expr);
            }
        }

        let target_special = target
            .map(|t| self.model.special_type(self.model.strip_nullable(t)))
            .unwrap_or(SpecialType::None);
        let source_special = source
            .map(|t| self.model.special_type(self.model.strip_nullable(t)))
            .unwrap_or(SpecialType::None);

        // Widening numeric casts are no-ops.
        if target_special.is_numeric() && source_special.is_numeric() {
            if numeric_widens(source_special, target_special) {
                return self.emit_expr(cast.expr);
            }
            if target_special.is_integral() {
                self.writer.write(vocab::RT_CASTINT);
                self.writer.write("(");
                self.emit_expr(cast.expr)?;
                self.writer.write(")");
                return Ok(());
            }
            return self.emit_expr(cast.expr);
        }

        // Tuple and table pseudo-types pass through.
        if let Some(target_ty) = target {
            let is_pseudo = self
                .model
                .type_shape(target_ty)
                .map(|s| s.type_kind == cslua_sema::TypeKind::Tuple)
                .unwrap_or(false)
                || self.model.symbol_name(target_ty) == "Table";
            if is_pseudo {
                return self.emit_expr(cast.expr);
            }
        }

        // Interface targets pass the interface name literal.
        if self.type_syntax_is_interface(cast.ty) {
            let name = target
                .map(|t| self.model.output_id(t).to_string())
                .unwrap_or_default();
            self.writer.write(vocab::RT_CAST);
            self.writer.write("(");
            self.emit_expr(cast.expr)?;
            self.writer.write(", ");
            self.writer.write(&escape_string(&name));
            self.writer.write(")");
            return Ok(());
        }

        self.writer.write(vocab::RT_CAST);
        self.writer.write("(");
        self.emit_expr(cast.expr)?;
        self.writer.write(", ");
        self.emit_type_syntax(cast.ty)?;
        self.writer.write(")");
        Ok(())
    }

    // =========================================================================
    // Interpolated strings
    // =========================================================================

    pub(super) fn emit_interpolated_string(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(interp) = self.ast.interpolated_string(idx).cloned() else {
            return Ok(());
        };
        if interp.parts.is_empty() {
            self.writer.write("''");
            return Ok(());
        }
        for (pos, &part) in interp.parts.iter().enumerate() {
            if pos > 0 {
                self.writer.write(" .. ");
            }
            match self.ast.get(part).map(|n| &n.data) {
                Some(NodeData::InterpolatedText(text)) => {
                    let literal = escape_string(&text.text.clone());
                    self.writer.write(&literal);
                }
                Some(NodeData::Interpolation(hole)) => {
                    let hole = hole.clone();
                    if hole.format.is_some() {
                        return Err(EmitError::unsupported(
                            part,
                            "format clauses in interpolations are not supported",
                        ));
                    }
                    if hole.alignment.is_some() {
                        // Alignment goes through the runtime align helper,
                        // which already stringifies.
                        self.writer.write(vocab::RT_STRING_ALIGN);
                        self.writer.write("(");
                        self.emit_expr(hole.expr)?;
                        self.writer.write(", ");
                        self.emit_expr(hole.alignment)?;
                        self.writer.write(")");
                    } else if self.is_string_expr(hole.expr)
                        && self.concat_operand_is_safe(self.ast.skip_parens(hole.expr))
                    {
                        self.emit_expr(hole.expr)?;
                    } else {
                        self.writer.write(vocab::RT_TOSTRING);
                        self.writer.write("(");
                        self.emit_expr(hole.expr)?;
                        self.writer.write(")");
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // =========================================================================
    // Tuples
    // =========================================================================

    pub(super) fn emit_tuple(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(tuple) = self.ast.tuple_expr(idx).cloned() else {
            return Ok(());
        };
        for (pos, &element) in tuple.args.iter().enumerate() {
            if pos > 0 {
                self.writer.write(", ");
            }
            self.emit_call_argument_expr(element)?;
        }
        Ok(())
    }

    // =========================================================================
    // Conditional access
    // =========================================================================

    /// `a?.b` in expression position: `(a and a.b)`.
    pub(super) fn emit_conditional_access_expr(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(access) = self.ast.conditional_access(idx).cloned() else {
            return Ok(());
        };
        self.writer.write("(");
        self.emit_expr(access.expr)?;
        self.writer.write(" and ");
        self.binding_targets.push(access.expr);
        let result = self.emit_expr(access.when_not_null);
        self.binding_targets.pop();
        result?;
        self.writer.write(")");
        Ok(())
    }

    /// `a?.b()` in statement position: `if a then a.b() end`.
    pub(super) fn emit_conditional_access_statement(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(access) = self.ast.conditional_access(idx).cloned() else {
            return Ok(());
        };
        self.write_opener("if ");
        self.emit_expr(access.expr)?;
        self.writer.write(" then ");
        self.binding_targets.push(access.expr);
        let result = self.emit_expr(access.when_not_null);
        self.binding_targets.pop();
        result?;
        self.writer.write(" end");
        Ok(())
    }

    // =========================================================================
    // Delegate binding
    // =========================================================================

    /// A method reference converted to a delegate type becomes a bound
    /// callable value.
    pub(super) fn emit_delegate_binding(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(method) = self.symbol_of(idx) else {
            return Err(EmitError::compilation(
                idx,
                "delegate conversion target did not resolve to a method",
            ));
        };
        let flags = self.model.symbol_flags(method);
        let is_static = flags.contains(SymbolFlags::STATIC);
        let owner = self.containing_type_name(method);
        let name = self.model.output_id(method).to_string();
        let promoted = self.scopes.is_promoted(method);

        let has_optional = self
            .model
            .method_shape(method)
            .map(|m| m.params.iter().any(|p| p.is_optional))
            .unwrap_or(false);

        let receiver = self
            .ast
            .member_access(idx)
            .map(|a| a.expr)
            .filter(|r| self.ast.kind(*r) != Some(SyntaxKind::BaseExpr));

        if has_optional {
            return self.emit_default_filling_closure(method, receiver, is_static);
        }

        if is_static {
            if promoted {
                self.writer.write(&name);
            } else {
                self.writer.write(&owner);
                self.writer.write(".");
                self.writer.write(&name);
            }
            return Ok(());
        }

        // Bound instance delegate: memoized by the runtime for equality.
        self.writer.write(vocab::RT_BIND_DELEGATE);
        self.writer.write("(");
        match receiver {
            Some(recv) => self.emit_expr(recv)?,
            None => self.writer.write(vocab::SELF),
        }
        self.writer.write(", ");
        if promoted {
            self.writer.write(&name);
        } else {
            self.writer.write(&owner);
            self.writer.write(".");
            self.writer.write(&name);
        }
        self.writer.write(")");
        Ok(())
    }

    /// Inline closure that backfills optional parameters before forwarding.
    fn emit_default_filling_closure(
        &mut self,
        method: SymbolId,
        receiver: Option<NodeIndex>,
        is_static: bool,
    ) -> EmitResult {
        let Some(shape) = self.model.method_shape(method).cloned() else {
            return Ok(());
        };
        let name = self.model.output_id(method).to_string();
        let owner = self.containing_type_name(method);

        // Parameter names deduped against the surrounding scope.
        let mut params: Vec<String> = Vec::with_capacity(shape.params.len());
        for param in &shape.params {
            let mut chosen = param.name.clone();
            let mut n = 0u32;
            while self.scopes.is_taken(&chosen) || params.contains(&chosen) {
                chosen = format!("{}{n}", param.name);
                n += 1;
            }
            params.push(chosen);
        }

        self.writer.write("function(");
        self.writer.write(&params.join(", "));
        self.writer.write(")");
        for (pos, param) in shape.params.iter().enumerate() {
            if param.is_optional {
                let default = param.default_value.clone().unwrap_or(LiteralValue::Null);
                self.writer.write(" if ");
                self.writer.write(&params[pos]);
                self.writer.write(" == nil then ");
                self.writer.write(&params[pos]);
                self.writer.write(" = ");
                self.writer.write_constant(&default);
                self.writer.write(" end");
            }
        }
        self.writer.write(" return ");
        if is_static {
            self.writer.write(&owner);
            self.writer.write(".");
        } else {
            match receiver {
                Some(recv) => {
                    self.emit_expr(recv)?;
                }
                None => self.writer.write(vocab::SELF),
            }
            self.writer.write(":");
        }
        self.writer.write(&name);
        self.writer.write("(");
        self.writer.write(&params.join(", "));
        self.writer.write(") end");
        Ok(())
    }
}

/// Whether a numeric cast from `source` to `target` loses nothing and can
/// be elided.
fn numeric_widens(source: SpecialType, target: SpecialType) -> bool {
    const fn rank(special: SpecialType) -> u8 {
        match special {
            SpecialType::Byte | SpecialType::SByte => 1,
            SpecialType::Int16 | SpecialType::UInt16 => 2,
            SpecialType::Int32 | SpecialType::UInt32 => 3,
            SpecialType::Int64 | SpecialType::UInt64 => 4,
            SpecialType::Single => 5,
            SpecialType::Double => 6,
            _ => 0,
        }
    }
    let float_target = matches!(target, SpecialType::Single | SpecialType::Double);
    let float_source = matches!(source, SpecialType::Single | SpecialType::Double);
    if float_target {
        return true;
    }
    if float_source {
        return false;
    }
    rank(target) >= rank(source)
}

/// Value-wrapping applied to assignment right-hand sides.
enum ValueWrap {
    /// Reference-type array slot: `(v or false)`.
    OrFalse,
}

/// How the left operand of a compound assignment is re-read.
enum ReadForm {
    Node(NodeIndex),
    PropertyGetter {
        target: NodeIndex,
        getter: String,
        is_static: bool,
    },
    IndexerGetter {
        element: NodeIndex,
        getter: String,
    },
}

impl ReadForm {
    fn node(&self) -> Option<NodeIndex> {
        match self {
            ReadForm::Node(idx) => Some(*idx),
            ReadForm::PropertyGetter { target, .. } => Some(*target),
            ReadForm::IndexerGetter { element, .. } => Some(*element),
        }
    }
}
