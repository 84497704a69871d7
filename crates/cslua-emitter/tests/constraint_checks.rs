//! Rejection coverage for the accepted-subset checker.

mod support;

use cslua_emitter::EmitErrorKind;
use cslua_sema::{Symbol, SymbolKind, TypeData, TypeKind};
use cslua_syntax::{AssignOp, BinaryOp, LiteralValue, Modifiers, NodeIndex, NodeList};
use support::{Fixture, line, lines};

fn expect_unsupported(f: Fixture, root: NodeIndex, needle: &str) {
    let err = f.try_emit(root).expect_err("expected a constraint rejection");
    assert_eq!(err.kind, EmitErrorKind::Unsupported);
    assert!(
        err.message.contains(needle),
        "unexpected message: {}",
        err.message
    );
}

#[test]
fn async_method_is_rejected() {
    let mut f = Fixture::new();
    let class_sym = f.source_class("C");
    let mname = f.b.identifier(line(1), "RunAsync");
    let body = f.b.block(lines(1, 2), vec![]);
    let method = f.b.method_decl(
        lines(1, 2),
        Modifiers::PUBLIC | Modifiers::ASYNC,
        NodeIndex::NONE,
        mname,
        NodeList::new(),
        NodeList::new(),
        body,
        NodeIndex::NONE,
    );
    let cname = f.b.identifier(line(0), "C");
    let class = f.b.class_decl(
        lines(0, 3),
        Modifiers::PUBLIC,
        cname,
        NodeList::new(),
        NodeList::new(),
        vec![method],
    );
    f.m.set_declared_symbol(class, class_sym);
    let root = f.b.compilation_unit(lines(0, 3), vec![class]);
    expect_unsupported(f, root, "async");
}

#[test]
fn ref_parameter_is_rejected() {
    let mut f = Fixture::new();
    let pname = f.b.identifier(line(2), "value");
    let int_ty = f.b.predefined_type(line(2), "int");
    let param = f
        .b
        .parameter(line(2), Modifiers::REF, int_ty, pname, NodeIndex::NONE);
    let mname = f.b.identifier(line(1), "Run");
    let body = f.b.block(lines(1, 2), vec![]);
    let method = f.b.method_decl(
        lines(1, 2),
        Modifiers::PUBLIC,
        NodeIndex::NONE,
        mname,
        NodeList::new(),
        vec![param],
        body,
        NodeIndex::NONE,
    );
    let cname = f.b.identifier(line(0), "C");
    let class_sym = f.source_class("C");
    let class = f.b.class_decl(
        lines(0, 3),
        Modifiers::PUBLIC,
        cname,
        NodeList::new(),
        NodeList::new(),
        vec![method],
    );
    f.m.set_declared_symbol(class, class_sym);
    let root = f.b.compilation_unit(lines(0, 3), vec![class]);
    expect_unsupported(f, root, "ref and out parameters");
}

#[test]
fn checked_expression_is_rejected() {
    let mut f = Fixture::new();
    let a = f.local("a", f.int32);
    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let sum = f.b.binary(line(2), a_ref, BinaryOp::Add, one);
    let checked = f.b.checked(line(2), true, sum);
    let stmt = f.b.expression_statement(line(2), checked);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a], 0, 4);
    expect_unsupported(f, root, "checked arithmetic");
}

#[test]
fn multi_dimensional_array_is_rejected() {
    let mut f = Fixture::new();
    let int_ty = f.b.predefined_type(line(2), "int");
    let array_ty = f.b.array_type(line(2), int_ty, 2);
    let name = f.b.identifier(line(2), "grid");
    let decl = f.b.variable_declarator(line(2), name, NodeIndex::NONE);
    let local = f.b.local_decl(line(2), array_ty, vec![decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![], 0, 4);
    expect_unsupported(f, root, "multi-dimensional");
}

#[test]
fn object_array_is_rejected() {
    let mut f = Fixture::new();
    let object_ty = f.b.predefined_type(line(2), "object");
    let array_ty = f.b.array_type(line(2), object_ty, 1);
    let name = f.b.identifier(line(2), "stuff");
    let decl = f.b.variable_declarator(line(2), name, NodeIndex::NONE);
    let local = f.b.local_decl(line(2), array_ty, vec![decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![], 0, 4);
    expect_unsupported(f, root, "arrays of object");
}

#[test]
fn assignment_outside_statement_position_is_rejected() {
    let mut f = Fixture::new();
    let a = f.local("a", f.int32);
    let z = f.local("z", f.int32);
    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let assign = f.b.assignment(line(2), a_ref, AssignOp::Assign, one);
    let paren = f.b.parenthesized(line(2), assign);
    let two = f.b.literal(line(2), LiteralValue::Int(2));
    let sum = f.b.binary(line(2), paren, BinaryOp::Add, two);
    let z_name = f.b.identifier(line(2), "z");
    let z_decl = f.b.variable_declarator(line(2), z_name, sum);
    f.m.set_declared_symbol(z_decl, z);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![z_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a, z], 0, 4);
    expect_unsupported(f, root, "statement positions");
}

#[test]
fn tuple_typed_local_is_rejected() {
    let mut f = Fixture::new();
    let tuple_ty = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "(int, int)");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Tuple,
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };
    let pair = {
        let mut sym = Symbol::new(SymbolKind::Local, "pair");
        sym.ty = tuple_ty;
        f.m.alloc(sym)
    };
    let name = f.b.identifier(line(2), "pair");
    let decl = f.b.variable_declarator(line(2), name, NodeIndex::NONE);
    f.m.set_declared_symbol(decl, pair);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![pair], 0, 4);
    expect_unsupported(f, root, "tuple-typed");
}

#[test]
fn expression_bodied_property_is_rejected() {
    let mut f = Fixture::new();
    let class_sym = f.source_class("C");
    let one = f.b.literal(line(1), LiteralValue::Int(1));
    let pname = f.b.identifier(line(1), "Value");
    let int_ty = f.b.predefined_type(line(1), "int");
    let prop = f.b.property_decl(
        line(1),
        Modifiers::PUBLIC,
        int_ty,
        pname,
        NodeList::new(),
        NodeIndex::NONE,
        one,
    );
    let cname = f.b.identifier(line(0), "C");
    let class = f.b.class_decl(
        lines(0, 2),
        Modifiers::PUBLIC,
        cname,
        NodeList::new(),
        NodeList::new(),
        vec![prop],
    );
    f.m.set_declared_symbol(class, class_sym);
    let root = f.b.compilation_unit(lines(0, 2), vec![class]);
    expect_unsupported(f, root, "expression-bodied properties");
}

#[test]
fn unchecked_expression_passes_through() {
    let mut f = Fixture::new();
    let a = f.local("a", f.int32);
    let t = f.local("t", f.int32);
    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let sum = f.b.binary(line(2), a_ref, BinaryOp::Add, one);
    let unchecked = f.b.checked(line(2), false, sum);
    let t_name = f.b.identifier(line(2), "t");
    let t_decl = f.b.variable_declarator(line(2), t_name, unchecked);
    f.m.set_declared_symbol(t_decl, t);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![t_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a, t], 0, 4);
    let out = f.emit(root);
    assert!(out.contains("local t = a + 1"), "unexpected output:\n{out}");
}
