//! Shared fixture for emitter integration tests.
//!
//! Builds small trees and models the way an external provider would, then
//! drives `compile_unit` over them.

use cslua_common::Range;
use cslua_emitter::{EmitOptions, compile_unit};
use cslua_sema::{
    DataFlow, MethodData, MethodKind, ModelBuilder, SpecialType, Symbol, SymbolFlags, SymbolId,
    SymbolKind, TypeData, TypeKind,
};
use cslua_syntax::{AstBuilder, Modifiers, NodeIndex, NodeList};

pub fn line(n: u32) -> Range {
    Range::on_line(n)
}

pub fn lines(a: u32, b: u32) -> Range {
    Range::lines(a, b)
}

pub struct Fixture {
    pub b: AstBuilder,
    pub m: ModelBuilder,
    pub int32: SymbolId,
    pub double: SymbolId,
    pub boolean: SymbolId,
    pub string_ty: SymbolId,
    pub nullable_bool: SymbolId,
    pub nullable_int: SymbolId,
    pub string_array: SymbolId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut m = ModelBuilder::new();
        let int32 = builtin(&mut m, "int", SpecialType::Int32, TypeKind::Struct);
        let double = builtin(&mut m, "double", SpecialType::Double, TypeKind::Struct);
        let boolean = builtin(&mut m, "bool", SpecialType::Boolean, TypeKind::Struct);
        let string_ty = builtin(&mut m, "string", SpecialType::String, TypeKind::Class);
        let nullable_bool = nullable(&mut m, "bool?", boolean);
        let nullable_int = nullable(&mut m, "int?", int32);
        let string_array = array(&mut m, "string[]", string_ty);
        Self {
            b: AstBuilder::new(),
            m,
            int32,
            double,
            boolean,
            string_ty,
            nullable_bool,
            nullable_int,
            string_array,
        }
    }

    /// Intern a local variable symbol with a declared type.
    pub fn local(&mut self, name: &str, ty: SymbolId) -> SymbolId {
        let mut sym = Symbol::new(SymbolKind::Local, name);
        sym.ty = ty;
        self.m.alloc(sym)
    }

    /// Intern a named class type declared in source.
    pub fn source_class(&mut self, name: &str) -> SymbolId {
        let mut sym = Symbol::new(SymbolKind::NamedType, name);
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Class,
            is_from_source: true,
            ..TypeData::default()
        });
        self.m.alloc(sym)
    }

    /// Wrap a method body into `class C { void Run() { ... } }`.
    ///
    /// `class_line` is the class-declaration line; the method occupies the
    /// following line through `body_end + 1`.
    pub fn unit_with_method(
        &mut self,
        body: NodeIndex,
        declared: Vec<SymbolId>,
        class_line: u32,
        class_end: u32,
    ) -> NodeIndex {
        let class_sym = self.source_class("C");
        let mut method_sym = Symbol::new(SymbolKind::Method, "Run");
        method_sym.flags = SymbolFlags::PUBLIC;
        method_sym.containing_type = class_sym;
        method_sym.method_data = Some(MethodData::default());
        let method_sym = self.m.alloc(method_sym);

        let method_line = class_line + 1;
        let cname = self.b.identifier(line(class_line), "C");
        let mname = self.b.identifier(line(method_line), "Run");
        let method = self.b.method_decl(
            lines(method_line, class_end.saturating_sub(1)),
            Modifiers::PUBLIC,
            NodeIndex::NONE,
            mname,
            NodeList::new(),
            NodeList::new(),
            body,
            NodeIndex::NONE,
        );
        let class = self.b.class_decl(
            lines(class_line, class_end),
            Modifiers::PUBLIC,
            cname,
            NodeList::new(),
            NodeList::new(),
            vec![method],
        );
        let root = self
            .b
            .compilation_unit(lines(class_line, class_end), vec![class]);

        self.m.set_declared_symbol(class, class_sym);
        self.m.set_declared_symbol(method, method_sym);
        self.m.set_data_flow(
            body,
            DataFlow {
                succeeded: true,
                variables_declared: declared,
                ..DataFlow::default()
            },
        );
        root
    }

    pub fn emit(self, root: NodeIndex) -> String {
        self.emit_with(root, EmitOptions::new())
    }

    pub fn emit_with(self, root: NodeIndex, options: EmitOptions) -> String {
        let ast = self.b.finish();
        let model = self.m.finish();
        compile_unit(&ast, root, &model, &options, Vec::new()).expect("emission failed")
    }

    pub fn try_emit(self, root: NodeIndex) -> Result<String, cslua_emitter::EmitError> {
        let ast = self.b.finish();
        let model = self.m.finish();
        compile_unit(&ast, root, &model, &EmitOptions::new(), Vec::new())
    }
}

pub fn builtin(
    m: &mut ModelBuilder,
    name: &str,
    special: SpecialType,
    kind: TypeKind,
) -> SymbolId {
    let mut sym = Symbol::new(SymbolKind::NamedType, name);
    sym.type_data = Some(TypeData {
        special,
        type_kind: kind,
        ..TypeData::default()
    });
    m.alloc(sym)
}

pub fn nullable(m: &mut ModelBuilder, name: &str, inner: SymbolId) -> SymbolId {
    let mut sym = Symbol::new(SymbolKind::NamedType, name);
    sym.type_data = Some(TypeData {
        special: SpecialType::Nullable,
        type_kind: TypeKind::Struct,
        element_type: inner,
        ..TypeData::default()
    });
    m.alloc(sym)
}

pub fn array(m: &mut ModelBuilder, name: &str, element: SymbolId) -> SymbolId {
    let mut sym = Symbol::new(SymbolKind::NamedType, name);
    sym.type_data = Some(TypeData {
        special: SpecialType::Array,
        type_kind: TypeKind::Array,
        element_type: element,
        ..TypeData::default()
    });
    m.alloc(sym)
}

/// Intern a property and its accessor pair on `owner`, returning
/// `(property, getter, setter)`.
pub fn property_with_accessors(
    m: &mut ModelBuilder,
    owner: SymbolId,
    name: &str,
    ty: SymbolId,
) -> (SymbolId, SymbolId, SymbolId) {
    let mut prop = Symbol::new(SymbolKind::Property, name);
    prop.containing_type = owner;
    prop.ty = ty;
    prop.flags = SymbolFlags::PUBLIC;
    let prop = m.alloc(prop);

    let mut getter = Symbol::new(SymbolKind::Method, format!("get_{name}"));
    getter.containing_type = owner;
    getter.method_data = Some(MethodData {
        method_kind: MethodKind::PropertyGet,
        associated: prop,
        ..MethodData::default()
    });
    let getter = m.alloc(getter);

    let mut setter = Symbol::new(SymbolKind::Method, format!("set_{name}"));
    setter.containing_type = owner;
    setter.method_data = Some(MethodData {
        method_kind: MethodKind::PropertySet,
        associated: prop,
        ..MethodData::default()
    });
    let setter = m.alloc(setter);

    (prop, getter, setter)
}
