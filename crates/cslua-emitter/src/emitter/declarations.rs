use super::Emitter;
use super::functions::MemberInit;
use crate::error::EmitResult;
use crate::scopes::{BlockScope, ScopeKind, TypeScope};
use crate::vocab;
use crate::writer::escape_string;
use cslua_sema::{SpecialType, SymbolFlags, SymbolId};
use cslua_syntax::node::TypeDeclData;
use cslua_syntax::{LiteralValue, Modifiers, NodeIndex, SyntaxKind};

impl<'a> Emitter<'a> {
    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Namespaces contribute qualified names only; their members emit at
    /// their own positions.
    pub(super) fn emit_namespace(&mut self, idx: NodeIndex) -> EmitResult {
        let members = self
            .ast
            .namespace_decl(idx)
            .map(|ns| ns.members.clone())
            .unwrap_or_default();
        for member in members {
            self.emit_declaration(member)?;
        }
        Ok(())
    }

    // =========================================================================
    // Classes
    // =========================================================================

    #[tracing::instrument(level = "trace", skip(self))]
    pub(super) fn emit_class(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(decl) = self.ast.type_decl(idx).cloned() else {
            return Ok(());
        };
        let sym = self.model.declared_symbol(idx).unwrap_or(SymbolId::NONE);
        let saved_type = self.current_type;
        let saved_ctor_done = self.synthesized_ctor_done;
        self.current_type = sym;
        self.synthesized_ctor_done = false;

        let mut type_scope = TypeScope::new(sym);
        type_scope.globals = self.compute_globals(idx);
        self.scopes.push_type(type_scope);

        let mut frame = BlockScope::new(ScopeKind::Type, idx);
        frame.globals = self.compute_globals(idx);
        self.scopes.push_block(frame, self.model)?;

        let result = self.emit_class_inner(idx, &decl, sym);

        self.scopes.pop_block(ScopeKind::Type)?;
        self.scopes.pop_type()?;
        self.current_type = saved_type;
        self.synthesized_ctor_done = saved_ctor_done;
        result
    }

    fn emit_class_inner(
        &mut self,
        idx: NodeIndex,
        decl: &TypeDeclData,
        sym: SymbolId,
    ) -> EmitResult {
        // Decide promotion before any member emits, so references resolve.
        self.register_promotions(decl);

        let name = self.model.output_id(sym).to_string();
        let source_name = self.model.symbol_name(sym).to_string();
        let qualified = self
            .model
            .symbol(sym)
            .map(|s| s.qualified_name())
            .unwrap_or_else(|| name.clone());
        let needs_qualified = qualified != name;
        let needs_orig = source_name != name;
        let is_static_class = decl.modifiers.contains(Modifiers::STATIC);
        let has_members = !decl.members.is_empty();

        let shape = self.model.type_shape(sym).cloned();
        let base = shape
            .as_ref()
            .map(|s| s.base_type)
            .unwrap_or(SymbolId::NONE);
        let interfaces = shape.map(|s| s.interfaces).unwrap_or_default();

        self.writer.newline_to_target(self.ast.start_line(idx));

        // A class with no members skips the local binding to conserve the
        // target's local-register budget.
        if has_members {
            self.writer.write("local ");
            self.writer.write(&name);
            self.writer.write(" = ");
        }
        self.writer.write(if is_static_class {
            vocab::RT_CLASS_STATIC
        } else {
            vocab::RT_CLASS
        });
        self.writer.write("(");
        self.writer.write(&escape_string(&name));

        let needs_interfaces = !interfaces.is_empty();
        let needs_base = base.is_some();
        if needs_base || needs_qualified || needs_orig || needs_interfaces {
            self.writer.write(", ");
            if needs_base {
                self.emit_type_symbol_value(base)?;
            } else {
                self.writer.write("nil");
            }
        }
        if needs_qualified || needs_orig || needs_interfaces {
            self.writer.write(", ");
            if needs_qualified {
                self.writer.write(&escape_string(&qualified));
            } else {
                self.writer.write("nil");
            }
        }
        if needs_orig || needs_interfaces {
            self.writer.write(", ");
            if needs_orig {
                self.writer.write(&escape_string(&source_name));
            } else {
                self.writer.write("nil");
            }
        }
        for &iface in &interfaces {
            self.writer.write(", ");
            let iface_name = self.model.output_id(iface).to_string();
            self.writer.write(&escape_string(&iface_name));
        }
        self.writer.write(")");
        self.pending_semicolon = true;

        // Pre-declare promoted static fields at the fixed line of the type
        // declaration, so forward references resolve to locals.
        self.predeclare_promoted_fields(idx)?;

        // Gather members whose initialization moves into a constructor.
        let (instance_inits, static_inits) = self.gather_member_inits(decl);
        let has_instance_ctor = decl.members.iter().any(|&m| {
            self.ast.kind(m) == Some(SyntaxKind::ConstructorDecl)
                && self
                    .ast
                    .constructor_decl(m)
                    .map(|c| !c.modifiers.contains(Modifiers::STATIC))
                    .unwrap_or(false)
        });
        let last_init_member = instance_inits.last().map(|init| init.line);

        for &member in &decl.members {
            match self.ast.kind(member) {
                Some(SyntaxKind::FieldDecl) => self.emit_field(member)?,
                Some(SyntaxKind::PropertyDecl) => self.emit_property(member)?,
                Some(SyntaxKind::IndexerDecl) => self.emit_indexer(member)?,
                Some(SyntaxKind::EventDecl) => self.emit_event(member)?,
                Some(SyntaxKind::MethodDecl) => self.emit_method(member)?,
                Some(SyntaxKind::ConstructorDecl) => {
                    let is_static = self
                        .ast
                        .constructor_decl(member)
                        .map(|c| c.modifiers.contains(Modifiers::STATIC))
                        .unwrap_or(false);
                    if is_static {
                        self.emit_constructor(member, &[], &static_inits)?;
                    } else {
                        self.emit_constructor(member, &instance_inits, &[])?;
                    }
                }
                Some(SyntaxKind::ClassDecl) => self.emit_class(member)?,
                Some(SyntaxKind::InterfaceDecl) => self.emit_interface(member)?,
                Some(SyntaxKind::EnumDecl) => self.emit_enum(member)?,
                Some(SyntaxKind::DelegateDecl) => {}
                _ => {}
            }

            // Synthesize the constructor once, at the position of the last
            // member requiring initialization.
            if !has_instance_ctor && self.synthesized_ctor_pending(last_init_member, member) {
                self.emit_synthesized_constructor(idx, &instance_inits, false)?;
                self.synthesized_ctor_done = true;
            }
        }

        // Auto-properties that implement an interface member or override a
        // base virtual get synthesized accessors.
        for &member in &decl.members {
            if self.ast.kind(member) != Some(SyntaxKind::PropertyDecl) {
                continue;
            }
            let Some(prop_sym) = self.model.declared_symbol(member) else {
                continue;
            };
            if !self.is_auto_property(prop_sym) {
                continue;
            }
            let overridden = self
                .model
                .symbol(prop_sym)
                .map(|s| s.overridden.is_some())
                .unwrap_or(false);
            if overridden || self.model.implements_interface_member(prop_sym) {
                let is_static = self
                    .model
                    .symbol_flags(prop_sym)
                    .contains(SymbolFlags::STATIC);
                self.emit_synthesized_auto_accessors(member, prop_sym, is_static)?;
            }
        }

        self.last_class = Some(name);
        Ok(())
    }

    /// The synthesized constructor emits right after the last member that
    /// requires initialization, exactly once per class.
    fn synthesized_ctor_pending(&self, last_line: Option<u32>, member: NodeIndex) -> bool {
        let Some(last_line) = last_line else {
            return false;
        };
        !self.synthesized_ctor_done && self.ast.end_line(member) >= last_line
    }

    // =========================================================================
    // Promotion
    // =========================================================================

    /// At the outermost type scope of a unit, private methods and private
    /// static-or-const fields of a non-partial, non-nested class become
    /// file-level locals.
    fn register_promotions(&mut self, decl: &TypeDeclData) {
        if self.scopes.type_depth() != 1 {
            return;
        }
        if decl.modifiers.contains(Modifiers::PARTIAL) {
            return;
        }
        let globals = self
            .scopes
            .current_type()
            .map(|t| t.globals.clone())
            .unwrap_or_default();

        for &member in &decl.members {
            match self.ast.kind(member) {
                Some(SyntaxKind::MethodDecl) => {
                    let Some(sym) = self.model.declared_symbol(member) else {
                        continue;
                    };
                    let flags = self.model.symbol_flags(sym);
                    if !flags.contains(SymbolFlags::PRIVATE) {
                        continue;
                    }
                    if flags.intersects(SymbolFlags::ENTRY_POINT | SymbolFlags::CLASS_INIT) {
                        continue;
                    }
                    let name = self.model.output_id(sym);
                    if globals.contains(name) || vocab::is_reserved(name) {
                        continue;
                    }
                    if let Some(scope) = self.scopes.current_type_mut() {
                        scope.promote(member, sym);
                    }
                }
                Some(SyntaxKind::FieldDecl) => {
                    let Some(field) = self.ast.field_decl(member).cloned() else {
                        continue;
                    };
                    for &declarator in &field.declarators {
                        let Some(sym) = self.model.declared_symbol(declarator) else {
                            continue;
                        };
                        let flags = self.model.symbol_flags(sym);
                        if !flags.contains(SymbolFlags::PRIVATE)
                            || !flags.intersects(SymbolFlags::STATIC | SymbolFlags::CONST)
                        {
                            continue;
                        }
                        let name = self.model.output_id(sym);
                        if globals.contains(name) || vocab::is_reserved(name) {
                            continue;
                        }
                        if let Some(scope) = self.scopes.current_type_mut() {
                            scope.promote(declarator, sym);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// `local a; local b;` pre-declarations for promoted static fields, on
    /// the class-declaration line.
    fn predeclare_promoted_fields(&mut self, site: NodeIndex) -> EmitResult {
        let pending: Vec<(NodeIndex, SymbolId)> = self
            .scopes
            .current_type()
            .map(|scope| {
                scope
                    .promoted_decls
                    .keys()
                    .filter_map(|&decl| {
                        if self.ast.kind(decl) != Some(SyntaxKind::VariableDeclarator) {
                            return None;
                        }
                        let sym = self.model.declared_symbol(decl)?;
                        Some((decl, sym))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if pending.is_empty() {
            return Ok(());
        }
        self.with_fixed_line(site, |e| {
            for &(decl, sym) in &pending {
                let name = e.model.output_id(sym).to_string();
                e.writer.write(" local ");
                e.writer.write(&name);
                e.writer.write(";");
                if let Some(scope) = e.scopes.current_type_mut() {
                    scope.promoted_decls.insert(decl, true);
                }
            }
            Ok(())
        })?;
        self.pending_semicolon = false;
        Ok(())
    }

    // =========================================================================
    // Member initialization gathering
    // =========================================================================

    fn gather_member_inits(&mut self, decl: &TypeDeclData) -> (Vec<MemberInit>, Vec<MemberInit>) {
        let mut instance = Vec::new();
        let statics = Vec::new();
        for &member in &decl.members {
            match self.ast.kind(member) {
                Some(SyntaxKind::FieldDecl) => {
                    let Some(field) = self.ast.field_decl(member).cloned() else {
                        continue;
                    };
                    if field
                        .modifiers
                        .intersects(Modifiers::STATIC | Modifiers::CONST)
                    {
                        continue;
                    }
                    for &declarator in &field.declarators {
                        let Some(var) = self.ast.variable_declarator(declarator).cloned() else {
                            continue;
                        };
                        if var.init.is_none() || self.initializer_is_null(var.init) {
                            continue;
                        }
                        let Some(sym) = self.model.declared_symbol(declarator) else {
                            continue;
                        };
                        if self.scopes.is_promoted(sym) {
                            continue;
                        }
                        instance.push(MemberInit {
                            name: self.model.output_id(sym).to_string(),
                            init: var.init,
                            is_static: false,
                            line: self.ast.start_line(declarator),
                        });
                    }
                }
                Some(SyntaxKind::PropertyDecl) => {
                    let Some(prop) = self.ast.property_decl(member).cloned() else {
                        continue;
                    };
                    if prop.initializer.is_none()
                        || prop.modifiers.contains(Modifiers::STATIC)
                    {
                        continue;
                    }
                    let Some(sym) = self.model.declared_symbol(member) else {
                        continue;
                    };
                    if !self.is_auto_property(sym) {
                        continue;
                    }
                    instance.push(MemberInit {
                        name: self.model.output_id(sym).to_string(),
                        init: prop.initializer,
                        is_static: false,
                        line: self.ast.start_line(member),
                    });
                }
                _ => {}
            }
        }
        (instance, statics)
    }

    fn initializer_is_null(&self, init: NodeIndex) -> bool {
        matches!(
            self.ast
                .literal(self.ast.skip_parens(init))
                .map(|l| &l.value),
            Some(LiteralValue::Null)
        )
    }

    // =========================================================================
    // Fields
    // =========================================================================

    pub(super) fn emit_field(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(field) = self.ast.field_decl(idx).cloned() else {
            return Ok(());
        };
        let is_static = field
            .modifiers
            .intersects(Modifiers::STATIC | Modifiers::CONST);

        for &declarator in &field.declarators {
            let Some(var) = self.ast.variable_declarator(declarator).cloned() else {
                continue;
            };
            let Some(sym) = self.model.declared_symbol(declarator) else {
                continue;
            };

            if self.scopes.is_promoted(sym) {
                self.emit_promoted_field(declarator, sym, var.init)?;
                continue;
            }

            // Instance field initialization is woven into the constructor.
            if !is_static {
                continue;
            }

            // A reference-type field with an all-null initializer is omitted
            // entirely; the target treats unset entries as nil.
            let field_ty = self.model.symbol(sym).map(|s| s.ty).unwrap_or(SymbolId::NONE);
            let is_reference = self.model.is_reference_type(field_ty);
            if (var.init.is_none() || self.initializer_is_null(var.init)) && is_reference {
                continue;
            }

            self.writer
                .newline_to_target(self.ast.start_line(declarator));
            let type_name = self.model.output_id(self.current_type).to_string();
            let name = self.model.output_id(sym).to_string();
            self.writer.write(&type_name);
            self.writer.write(".");
            self.writer.write(&name);
            self.writer.write(" = ");
            if var.init.is_some() {
                self.emit_expr(var.init)?;
            } else {
                self.emit_value_type_default(field_ty);
            }
            self.pending_semicolon = true;
        }
        Ok(())
    }

    fn emit_value_type_default(&mut self, ty: SymbolId) {
        let special = self.model.special_type(ty);
        if special == SpecialType::Boolean {
            self.writer.write("false");
        } else if special.is_numeric() {
            self.writer.write("0");
        } else {
            self.writer.write("nil");
        }
    }

    fn emit_promoted_field(
        &mut self,
        declarator: NodeIndex,
        sym: SymbolId,
        init: NodeIndex,
    ) -> EmitResult {
        self.writer
            .newline_to_target(self.ast.start_line(declarator));
        let pre_declared = self
            .scopes
            .current_type()
            .and_then(|t| t.promoted_decls.get(&declarator).copied())
            .unwrap_or(false);
        let name = self.model.output_id(sym).to_string();
        if pre_declared {
            if init.is_none() {
                return Ok(());
            }
            self.writer.write(&name);
        } else {
            if let Some(scope) = self.scopes.current_type_mut() {
                scope.promoted_decls.insert(declarator, true);
            }
            self.writer.write("local ");
            self.writer.write(&name);
            if init.is_none() {
                self.pending_semicolon = true;
                return Ok(());
            }
        }
        self.writer.write(" = ");
        self.emit_expr(init)?;
        self.pending_semicolon = true;
        Ok(())
    }

    // =========================================================================
    // Properties, indexers, events
    // =========================================================================

    pub(super) fn emit_property(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(prop) = self.ast.property_decl(idx).cloned() else {
            return Ok(());
        };
        let Some(sym) = self.model.declared_symbol(idx) else {
            return Ok(());
        };
        // Auto properties are backing slots; any required accessors are
        // synthesized at the end of the class.
        if self.is_auto_property(sym) {
            return Ok(());
        }
        let is_static = prop.modifiers.contains(Modifiers::STATIC);
        let name = self.model.output_id(sym).to_string();
        for &accessor in &prop.accessors {
            if self.accessor_is_abstract(accessor, &prop.modifiers) {
                continue;
            }
            self.emit_accessor(accessor, sym, &name, is_static, &[])?;
        }
        Ok(())
    }

    pub(super) fn emit_indexer(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(indexer) = self.ast.indexer_decl(idx).cloned() else {
            return Ok(());
        };
        let Some(sym) = self.model.declared_symbol(idx) else {
            return Ok(());
        };
        let is_static = indexer.modifiers.contains(Modifiers::STATIC);
        let name = self.model.output_id(sym).to_string();
        for &accessor in &indexer.accessors {
            if self.accessor_is_abstract(accessor, &indexer.modifiers) {
                continue;
            }
            self.emit_accessor(accessor, sym, &name, is_static, &indexer.params)?;
        }
        Ok(())
    }

    pub(super) fn emit_event(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(event) = self.ast.event_decl(idx).cloned() else {
            return Ok(());
        };
        // Field-like events are slots plus runtime-combined delegates.
        if event.accessors.is_empty() {
            return Ok(());
        }
        let Some(sym) = self.model.declared_symbol(idx) else {
            return Ok(());
        };
        let is_static = event.modifiers.contains(Modifiers::STATIC);
        let name = self.model.output_id(sym).to_string();
        for &accessor in &event.accessors {
            self.emit_accessor(accessor, sym, &name, is_static, &[])?;
        }
        Ok(())
    }

    fn accessor_is_abstract(&self, accessor: NodeIndex, owner_modifiers: &Modifiers) -> bool {
        if owner_modifiers.intersects(Modifiers::ABSTRACT | Modifiers::EXTERN) {
            return true;
        }
        let _ = accessor;
        false
    }

    // =========================================================================
    // Enums and interfaces
    // =========================================================================

    /// Enums emit a table literal with auto-incremented members.
    pub(super) fn emit_enum(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(decl) = self.ast.type_decl(idx).cloned() else {
            return Ok(());
        };
        let sym = self.model.declared_symbol(idx).unwrap_or(SymbolId::NONE);
        let name = if sym.is_some() {
            self.model.output_id(sym).to_string()
        } else {
            self.ast
                .identifier_text(decl.name)
                .unwrap_or_default()
                .to_string()
        };

        self.writer.newline_to_target(self.ast.start_line(idx));
        self.writer.write(&name);
        self.writer.write(" = {");

        let mut next_value: i64 = 0;
        for (pos, &member) in decl.members.iter().enumerate() {
            let Some(data) = self.ast.enum_member(member).cloned() else {
                continue;
            };
            let line = self.ast.start_line(member);
            if line > self.writer.current_line() {
                self.writer.newline_to_target(line);
            } else {
                self.writer.write_space();
            }
            let member_name = match self.model.declared_symbol(member) {
                Some(msym) => self.model.output_id(msym).to_string(),
                None => self
                    .ast
                    .identifier_text(data.name)
                    .unwrap_or_default()
                    .to_string(),
            };
            self.writer.write(&member_name);
            self.writer.write(" = ");
            let value = self
                .model
                .constant_value(data.value)
                .cloned()
                .or_else(|| self.ast.literal(data.value).map(|l| l.value.clone()));
            let value = match value {
                Some(LiteralValue::Int(v)) => v,
                _ => next_value,
            };
            next_value = value + 1;
            let text = value.to_string();
            self.writer.write(&text);
            if pos + 1 != decl.members.len() {
                self.writer.write(",");
            }
        }

        let end = self.ast.end_line(idx);
        if end > self.writer.current_line() {
            self.writer.newline_to_target(end);
        } else {
            self.writer.write_space();
        }
        self.writer.write("}");
        self.pending_semicolon = true;
        self.last_class = None;
        Ok(())
    }

    /// `interface("Name", [qualified], [orig], parents...)`.
    pub(super) fn emit_interface(&mut self, idx: NodeIndex) -> EmitResult {
        let Some(_decl) = self.ast.type_decl(idx) else {
            return Ok(());
        };
        let sym = self.model.declared_symbol(idx).unwrap_or(SymbolId::NONE);
        let name = self.model.output_id(sym).to_string();
        let source_name = self.model.symbol_name(sym).to_string();
        let qualified = self
            .model
            .symbol(sym)
            .map(|s| s.qualified_name())
            .unwrap_or_else(|| name.clone());
        let needs_qualified = qualified != name;
        let needs_orig = source_name != name;
        let parents = self
            .model
            .type_shape(sym)
            .map(|s| s.interfaces.clone())
            .unwrap_or_default();

        self.writer.newline_to_target(self.ast.start_line(idx));
        self.writer.write(vocab::RT_INTERFACE);
        self.writer.write("(");
        self.writer.write(&escape_string(&name));
        if needs_qualified || needs_orig || !parents.is_empty() {
            self.writer.write(", ");
            if needs_qualified {
                self.writer.write(&escape_string(&qualified));
            } else {
                self.writer.write("nil");
            }
        }
        if needs_orig || !parents.is_empty() {
            self.writer.write(", ");
            if needs_orig {
                self.writer.write(&escape_string(&source_name));
            } else {
                self.writer.write("nil");
            }
        }
        for &parent in &parents {
            self.writer.write(", ");
            let parent_name = self.model.output_id(parent).to_string();
            self.writer.write(&escape_string(&parent_name));
        }
        self.writer.write(")");
        self.pending_semicolon = true;
        self.last_class = None;
        Ok(())
    }
}
