use super::Emitter;
use crate::error::EmitResult;
use crate::vocab;
use cslua_sema::{MethodKind, SymbolFlags, SymbolId, SymbolKind};
use cslua_syntax::{NodeIndex, SyntaxKind};

impl<'a> Emitter<'a> {
    // =========================================================================
    // Identifier resolution
    // =========================================================================

    /// Emit a bare name reference, deciding qualification per its symbol:
    /// dedup lookup for locals, implicit-`self` fix-up for instance members,
    /// type prefixing for statics, bare ids for promoted members.
    pub(super) fn emit_identifier(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(sym) = self.model.symbol_info(idx) else {
            // Unresolved names pass through verbatim.
            let text = self
                .ast
                .identifier_text(idx)
                .unwrap_or_default()
                .to_string();
            self.writer.write(&text);
            return Ok(());
        };

        match self.model.symbol_kind(sym) {
            Some(SymbolKind::Local | SymbolKind::Parameter | SymbolKind::Discard) => {
                let name = self.output_name_of(sym);
                self.writer.write(&name);
                Ok(())
            }
            Some(SymbolKind::Label) => {
                let name = self.output_name_of(sym);
                self.writer.write(&name);
                Ok(())
            }
            Some(SymbolKind::NamedType) => self.emit_type_symbol_value(sym),
            Some(SymbolKind::Namespace | SymbolKind::Alias) => {
                let name = self.model.output_id(sym).to_string();
                self.writer.write(&name);
                Ok(())
            }
            Some(SymbolKind::TypeParameter) => {
                if self.method_type_params.contains(&sym) {
                    let name = self.output_name_of(sym);
                    self.writer.write(&name);
                } else if self.in_static_member {
                    let owner = self.model.output_id(self.current_type).to_string();
                    self.writer.write(&owner);
                    self.writer.write(".");
                    let name = self.model.output_id(sym).to_string();
                    self.writer.write(&name);
                } else {
                    self.writer.write(vocab::SELF);
                    self.writer.write(".");
                    let name = self.model.output_id(sym).to_string();
                    self.writer.write(&name);
                }
                Ok(())
            }
            Some(
                SymbolKind::Field | SymbolKind::Property | SymbolKind::Event | SymbolKind::Method,
            ) => self.emit_bare_member_reference(idx, sym),
            _ => {
                let name = self.output_name_of(sym);
                self.writer.write(&name);
                Ok(())
            }
        }
    }

    /// Implicit-this fix-up: a bare name referring to a member is rewritten
    /// to `self.name`, `TYPE.name`, or left bare when promoted.
    fn emit_bare_member_reference(&mut self, idx: NodeIndex, sym: SymbolId) -> EmitResult {
        if self.scopes.is_promoted(sym) {
            let name = self.model.output_id(sym).to_string();
            self.writer.write(&name);
            return Ok(());
        }
        let flags = self.model.symbol_flags(sym);
        let is_static = flags.intersects(SymbolFlags::STATIC | SymbolFlags::CONST);
        let kind = self.model.symbol_kind(sym);

        if kind == Some(SymbolKind::Property) && !self.is_auto_property(sym) {
            let getter = self.accessor_name(sym, MethodKind::PropertyGet);
            if is_static {
                let owner = self.containing_type_name(sym);
                self.writer.write(&owner);
                self.writer.write(".");
                self.writer.write(&getter);
            } else {
                self.writer.write(vocab::SELF);
                self.writer.write(":");
                self.writer.write(&getter);
            }
            self.writer.write("()");
            let _ = idx;
            return Ok(());
        }

        if is_static {
            let owner = self.containing_type_name(sym);
            self.writer.write(&owner);
        } else {
            self.writer.write(vocab::SELF);
        }
        self.writer.write(".");
        let name = self.model.output_id(sym).to_string();
        self.writer.write(&name);
        Ok(())
    }

    /// The emitted identifier of a property/event accessor.
    pub(super) fn accessor_name(&self, owner: SymbolId, kind: MethodKind) -> String {
        if let Some(accessor) = self.find_accessor(owner, kind) {
            return self.model.output_id(accessor).to_string();
        }
        let prefix = match kind {
            MethodKind::PropertyGet => "get_",
            MethodKind::PropertySet => "set_",
            MethodKind::EventAdd => "add_",
            MethodKind::EventRemove => "remove_",
            MethodKind::EventRaise => "raise_",
            _ => "",
        };
        format!("{prefix}{}", self.model.output_id(owner))
    }

    // =========================================================================
    // Member access
    // =========================================================================

    /// Emit a member access in read position.
    pub(super) fn emit_member_access(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(access) = self.ast.member_access(idx).cloned() else {
            return Ok(());
        };

        if self.ast.kind(access.expr) == Some(SyntaxKind::BaseExpr) {
            return self.emit_base_member_access(access.expr, access.name);
        }

        // Array `Length` becomes the length operator.
        if self.member_is_array_length(access.expr, access.name) {
            self.writer.write("#");
            return self.emit_expr(access.expr);
        }

        let name_sym = self.model.symbol_info(access.name);
        if let Some(sym) = name_sym {
            if self.model.symbol_kind(sym) == Some(SymbolKind::Property)
                && !self.is_auto_property(sym)
            {
                let getter = self.accessor_name(sym, MethodKind::PropertyGet);
                let is_static = self
                    .model
                    .symbol_flags(sym)
                    .contains(SymbolFlags::STATIC);
                self.emit_receiver(access.expr)?;
                self.writer.write(if is_static { "." } else { ":" });
                self.writer.write(&getter);
                self.writer.write("()");
                return Ok(());
            }
            if self.scopes.is_promoted(sym) {
                let name = self.model.output_id(sym).to_string();
                self.writer.write(&name);
                return Ok(());
            }
        }

        self.emit_receiver(access.expr)?;
        self.writer.write(".");
        self.emit_member_name(access.name)?;
        Ok(())
    }

    /// `base.X`: invocable members become `TYPE.X(self, ...)`; otherwise
    /// the receiver expression is replaced by `self`.
    fn emit_base_member_access(&mut self, _base: NodeIndex, name: NodeIndex) -> EmitResult {
        let Some(sym) = self.model.symbol_info(name) else {
            self.writer.write(vocab::SELF);
            self.writer.write(".");
            return self.emit_member_name(name);
        };
        match self.model.symbol_kind(sym) {
            Some(SymbolKind::Property) if !self.is_auto_property(sym) => {
                let owner = self.containing_type_name(sym);
                let getter = self.accessor_name(sym, MethodKind::PropertyGet);
                self.writer.write(&owner);
                self.writer.write(".");
                self.writer.write(&getter);
                self.writer.write("(");
                self.writer.write(vocab::SELF);
                self.writer.write(")");
                Ok(())
            }
            _ => {
                self.writer.write(vocab::SELF);
                self.writer.write(".");
                self.emit_member_name(name)
            }
        }
    }

    /// Member binding inside a conditional-access chain: the receiver is the
    /// binding target captured by the enclosing chain link.
    pub(super) fn emit_member_binding(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(binding) = self.ast.member_binding(idx).cloned() else {
            return Ok(());
        };
        let getter_owner = self.model.symbol_info(binding.name).filter(|&sym| {
            self.model.symbol_kind(sym) == Some(SymbolKind::Property)
                && !self.is_auto_property(sym)
        });

        self.emit_binding_receiver()?;
        if let Some(sym) = getter_owner {
            let getter = self.accessor_name(sym, MethodKind::PropertyGet);
            self.writer.write(":");
            self.writer.write(&getter);
            self.writer.write("()");
        } else {
            self.writer.write(".");
            self.emit_member_name(binding.name)?;
        }
        Ok(())
    }

    /// Re-emit the current binding target, keeping stack discipline for
    /// nested chains.
    pub(super) fn emit_binding_receiver(&mut self) -> EmitResult {
        let Some(target) = self.binding_targets.pop() else {
            self.writer.write(vocab::SELF);
            return Ok(());
        };
        let result = self.emit_expr(target);
        self.binding_targets.push(target);
        result
    }

    /// Write a member's resolved name with no receiver handling.
    pub(super) fn emit_member_name(&mut self, name: NodeIndex) -> EmitResult {
        if let Some(sym) = self.model.symbol_info(name) {
            let text = self.model.output_id(sym).to_string();
            self.writer.write(&text);
        } else {
            let text = self
                .ast
                .identifier_text(name)
                .unwrap_or_default()
                .to_string();
            self.writer.write(&text);
        }
        Ok(())
    }

    fn member_is_array_length(&self, receiver: NodeIndex, name: NodeIndex) -> bool {
        let receiver_is_array = self
            .effective_type(receiver)
            .map(|ty| self.model.is_array_type(ty))
            .unwrap_or(false);
        receiver_is_array && self.ast.identifier_text(name) == Some("Length")
    }
}
