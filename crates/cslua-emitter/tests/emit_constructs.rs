//! Construct-by-construct emission coverage: loops, conditional access,
//! protected regions, creations, casts, declarations.

mod support;

use cslua_sema::{
    DataFlow, MethodData, MethodKind, Symbol, SymbolFlags, SymbolKind, TypeData, TypeInfo,
    TypeKind,
};
use cslua_syntax::{
    AssignOp, BinaryOp, InitializerKind, LiteralValue, Modifiers, NodeIndex, NodeList, UnaryOp,
};
use support::{Fixture, line, lines};

fn empty_flow() -> DataFlow {
    DataFlow {
        succeeded: true,
        ..DataFlow::default()
    }
}

#[test]
fn while_loop_with_continue_allocates_label() {
    let mut f = Fixture::new();
    let go = f.local("go", f.boolean);
    let go_ref = f.b.identifier(line(2), "go");
    f.m.set_symbol(go_ref, go);
    let cont = f.b.continue_statement(line(3));
    let loop_body = f.b.block(lines(2, 4), vec![cont]);
    let while_stmt = f.b.while_statement(lines(2, 4), go_ref, loop_body);
    let body = f.b.block(lines(1, 5), vec![while_stmt]);
    let root = f.unit_with_method(body, vec![go], 0, 6);
    let out = f.emit(root);

    assert!(out.contains("while go do"), "unexpected output:\n{out}");
    assert!(out.contains("goto continue"), "unexpected output:\n{out}");
    assert!(out.contains("::continue:: end"), "unexpected output:\n{out}");
}

#[test]
fn do_while_negates_condition() {
    let mut f = Fixture::new();
    let go = f.local("go", f.boolean);
    let go_ref = f.b.identifier(line(4), "go");
    f.m.set_symbol(go_ref, go);
    let loop_body = f.b.block(lines(2, 4), vec![]);
    let do_stmt = f.b.do_statement(lines(2, 4), loop_body, go_ref);
    let body = f.b.block(lines(1, 5), vec![do_stmt]);
    let root = f.unit_with_method(body, vec![go], 0, 6);
    let out = f.emit(root);

    assert!(out.contains("repeat"), "unexpected output:\n{out}");
    assert!(out.contains("until not (go)"), "unexpected output:\n{out}");
}

#[test]
fn simple_for_with_strict_constant_bound() {
    let mut f = Fixture::new();
    let i = f.local("i", f.int32);

    let zero = f.b.literal(line(2), LiteralValue::Int(0));
    let i_name = f.b.identifier(line(2), "i");
    let i_decl = f.b.variable_declarator(line(2), i_name, zero);
    f.m.set_declared_symbol(i_decl, i);
    let decl = f.b.local_decl(line(2), NodeIndex::NONE, vec![i_decl], false);

    let i_ref = f.b.identifier(line(2), "i");
    f.m.set_symbol(i_ref, i);
    f.m.set_type(i_ref, f.int32);
    let ten = f.b.literal(line(2), LiteralValue::Int(10));
    let cond = f.b.binary(line(2), i_ref, BinaryOp::Lt, ten);

    let i_ref2 = f.b.identifier(line(2), "i");
    f.m.set_symbol(i_ref2, i);
    let inc = f.b.postfix_unary(line(2), UnaryOp::Increment, i_ref2);

    let loop_body = f.b.block(lines(2, 3), vec![]);
    f.m.set_data_flow(loop_body, empty_flow());
    let for_stmt = f
        .b
        .for_statement(lines(2, 3), decl, NodeList::new(), cond, vec![inc], loop_body);

    let body = f.b.block(lines(1, 4), vec![for_stmt]);
    let root = f.unit_with_method(body, vec![], 0, 5);
    let out = f.emit(root);

    assert!(out.contains("for i = 0, 9 do"), "unexpected output:\n{out}");
}

#[test]
fn downward_for_keeps_negative_step() {
    let mut f = Fixture::new();
    let i = f.local("i", f.int32);

    let start = f.b.literal(line(2), LiteralValue::Int(10));
    let i_name = f.b.identifier(line(2), "i");
    let i_decl = f.b.variable_declarator(line(2), i_name, start);
    f.m.set_declared_symbol(i_decl, i);
    let decl = f.b.local_decl(line(2), NodeIndex::NONE, vec![i_decl], false);

    let i_ref = f.b.identifier(line(2), "i");
    f.m.set_symbol(i_ref, i);
    let zero = f.b.literal(line(2), LiteralValue::Int(0));
    let cond = f.b.binary(line(2), i_ref, BinaryOp::Ge, zero);

    let i_ref2 = f.b.identifier(line(2), "i");
    f.m.set_symbol(i_ref2, i);
    let dec = f.b.postfix_unary(line(2), UnaryOp::Decrement, i_ref2);

    let loop_body = f.b.block(lines(2, 3), vec![]);
    f.m.set_data_flow(loop_body, empty_flow());
    let for_stmt = f
        .b
        .for_statement(lines(2, 3), decl, NodeList::new(), cond, vec![dec], loop_body);

    let body = f.b.block(lines(1, 4), vec![for_stmt]);
    let root = f.unit_with_method(body, vec![], 0, 5);
    let out = f.emit(root);

    assert!(out.contains("for i = 10, 0, -1 do"), "unexpected output:\n{out}");
}

#[test]
fn condition_only_for_lowers_to_while() {
    let mut f = Fixture::new();
    let go = f.local("go", f.boolean);
    let go_ref = f.b.identifier(line(2), "go");
    f.m.set_symbol(go_ref, go);
    let loop_body = f.b.block(lines(2, 3), vec![]);
    let for_stmt = f.b.for_statement(
        lines(2, 3),
        NodeIndex::NONE,
        NodeList::new(),
        go_ref,
        NodeList::new(),
        loop_body,
    );
    let body = f.b.block(lines(1, 4), vec![for_stmt]);
    let root = f.unit_with_method(body, vec![go], 0, 5);
    let out = f.emit(root);

    assert!(out.contains("do while go do"), "unexpected output:\n{out}");
    assert!(out.contains("end end"), "unexpected output:\n{out}");
}

#[test]
fn foreach_over_range_pseudo_function() {
    let mut f = Fixture::new();
    let i = f.local("i", f.int32);
    let range = {
        let mut sym = Symbol::new(SymbolKind::Method, "range");
        sym.flags = SymbolFlags::PUBLIC | SymbolFlags::STATIC;
        sym.method_data = Some(MethodData {
            is_range_pseudo: true,
            ..MethodData::default()
        });
        f.m.alloc(sym)
    };

    let range_ref = f.b.identifier(line(2), "range");
    f.m.set_symbol(range_ref, range);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let five = f.b.literal(line(2), LiteralValue::Int(5));
    let call = f.b.invocation(line(2), range_ref, vec![one, five]);

    let i_name = f.b.identifier(line(2), "i");
    let loop_body = f.b.block(lines(2, 3), vec![]);
    let foreach = f
        .b
        .foreach_statement(lines(2, 3), NodeIndex::NONE, i_name, call, loop_body);
    f.m.set_declared_symbol(foreach, i);

    let body = f.b.block(lines(1, 4), vec![foreach]);
    let root = f.unit_with_method(body, vec![], 0, 5);
    let out = f.emit(root);

    assert!(out.contains("for i = 1, 5 do"), "unexpected output:\n{out}");
}

#[test]
fn conditional_access_in_expression_position() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let a = f.local("a", widget);
    let field = {
        let mut sym = Symbol::new(SymbolKind::Field, "b");
        sym.containing_type = widget;
        sym.flags = SymbolFlags::PUBLIC;
        f.m.alloc(sym)
    };
    let t = f.local("t", f.string_ty);

    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    let b_name = f.b.identifier(line(2), "b");
    f.m.set_symbol(b_name, field);
    let binding = f.b.member_binding(line(2), b_name);
    let access = f.b.conditional_access(line(2), a_ref, binding);

    let t_name = f.b.identifier(line(2), "t");
    let t_decl = f.b.variable_declarator(line(2), t_name, access);
    f.m.set_declared_symbol(t_decl, t);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![t_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a, t], 0, 4);
    let out = f.emit(root);

    assert!(out.contains("local t = (a and a.b)"), "unexpected output:\n{out}");
}

#[test]
fn nested_conditional_access_chains_with_and() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let a = f.local("a", widget);
    let field_b = {
        let mut sym = Symbol::new(SymbolKind::Field, "b");
        sym.containing_type = widget;
        f.m.alloc(sym)
    };
    let field_c = {
        let mut sym = Symbol::new(SymbolKind::Field, "c");
        sym.containing_type = widget;
        f.m.alloc(sym)
    };
    let t = f.local("t", f.string_ty);

    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    let b_name = f.b.identifier(line(2), "b");
    f.m.set_symbol(b_name, field_b);
    let b_binding = f.b.member_binding(line(2), b_name);
    let c_name = f.b.identifier(line(2), "c");
    f.m.set_symbol(c_name, field_c);
    let c_binding = f.b.member_binding(line(2), c_name);
    let inner = f.b.conditional_access(line(2), b_binding, c_binding);
    let outer = f.b.conditional_access(line(2), a_ref, inner);

    let t_name = f.b.identifier(line(2), "t");
    let t_decl = f.b.variable_declarator(line(2), t_name, outer);
    f.m.set_declared_symbol(t_decl, t);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![t_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a, t], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("local t = (a and (a.b and a.b.c))"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn conditional_access_statement_position_uses_if() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let a = f.local("a", widget);
    let ping = {
        let mut sym = Symbol::new(SymbolKind::Method, "Ping");
        sym.containing_type = widget;
        sym.flags = SymbolFlags::PUBLIC;
        sym.method_data = Some(MethodData::default());
        f.m.alloc(sym)
    };

    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    let ping_name = f.b.identifier(line(2), "Ping");
    f.m.set_symbol(ping_name, ping);
    let binding = f.b.member_binding(line(2), ping_name);
    let call = f.b.invocation(line(2), binding, vec![]);
    let access = f.b.conditional_access(line(2), a_ref, call);
    let stmt = f.b.expression_statement(line(2), access);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("if a then a:Ping() end"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn break_inside_try_dispatches_code_zero() {
    let mut f = Fixture::new();
    let go = f.local("go", f.boolean);
    let go_ref = f.b.identifier(line(2), "go");
    f.m.set_symbol(go_ref, go);

    let brk = f.b.break_statement(line(4));
    let try_block = f.b.block(lines(3, 5), vec![brk]);
    let catch_block = f.b.block(lines(5, 5), vec![]);
    let catch = f.b.catch_clause(
        line(5),
        NodeIndex::NONE,
        NodeIndex::NONE,
        NodeIndex::NONE,
        catch_block,
    );
    let try_stmt = f
        .b
        .try_statement(lines(3, 5), try_block, vec![catch], NodeIndex::NONE);

    let loop_body = f.b.block(lines(2, 6), vec![try_stmt]);
    let while_stmt = f.b.while_statement(lines(2, 6), go_ref, loop_body);
    let body = f.b.block(lines(1, 7), vec![while_stmt]);
    let root = f.unit_with_method(body, vec![go], 0, 8);
    let out = f.emit(root);

    assert!(out.contains("return 0"), "unexpected output:\n{out}");
    assert!(
        out.contains("if 0 == res then break end"),
        "unexpected output:\n{out}"
    );
    assert!(
        out.contains("function() return true end"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn using_lowered_to_combinator() {
    let mut f = Fixture::new();
    let res_class = f.source_class("Res");
    let open = {
        let mut sym = Symbol::new(SymbolKind::Method, "Open");
        sym.containing_type = res_class;
        sym.flags = SymbolFlags::PUBLIC | SymbolFlags::STATIC;
        sym.method_data = Some(MethodData::default());
        f.m.alloc(sym)
    };
    let use_method = {
        let mut sym = Symbol::new(SymbolKind::Method, "Use");
        sym.containing_type = res_class;
        sym.flags = SymbolFlags::PUBLIC;
        sym.method_data = Some(MethodData::default());
        f.m.alloc(sym)
    };
    let r = f.local("r", res_class);

    let res_ref = f.b.identifier(line(2), "Res");
    f.m.set_symbol(res_ref, res_class);
    let open_name = f.b.identifier(line(2), "Open");
    f.m.set_symbol(open_name, open);
    let callee = f.b.member_access(line(2), res_ref, open_name);
    let open_call = f.b.invocation(line(2), callee, vec![]);

    let r_name = f.b.identifier(line(2), "r");
    let r_decl = f.b.variable_declarator(line(2), r_name, open_call);
    f.m.set_declared_symbol(r_decl, r);
    let decl = f.b.local_decl(line(2), NodeIndex::NONE, vec![r_decl], false);

    let r_ref = f.b.identifier(line(3), "r");
    f.m.set_symbol(r_ref, r);
    let use_name = f.b.identifier(line(3), "Use");
    f.m.set_symbol(use_name, use_method);
    let use_callee = f.b.member_access(line(3), r_ref, use_name);
    let use_call = f.b.invocation(line(3), use_callee, vec![]);
    let use_stmt = f.b.expression_statement(line(3), use_call);

    let using_body = f.b.block(lines(2, 4), vec![use_stmt]);
    let using_stmt = f
        .b
        .using_statement(lines(2, 4), decl, NodeIndex::NONE, using_body);

    let body = f.b.block(lines(1, 5), vec![using_stmt]);
    let root = f.unit_with_method(body, vec![r], 0, 6);
    let out = f.emit(root);

    assert!(
        out.contains("using(Res.Open(), function(r)"),
        "unexpected output:\n{out}"
    );
    assert!(out.contains("r:Use()"), "unexpected output:\n{out}");
}

#[test]
fn interpolated_string_concatenates_fragments() {
    let mut f = Fixture::new();
    let name = f.local("name", f.string_ty);
    let hello = f.b.interpolated_text(line(2), "Hello ");
    let name_ref = f.b.identifier(line(2), "name");
    f.m.set_symbol(name_ref, name);
    f.m.set_type(name_ref, f.string_ty);
    let hole = f
        .b
        .interpolation(line(2), name_ref, NodeIndex::NONE, None);
    let bang = f.b.interpolated_text(line(2), "!");
    let interp = f.b.interpolated_string(line(2), vec![hello, hole, bang]);

    let t = f.local("t", f.string_ty);
    let t_name = f.b.identifier(line(2), "t");
    let t_decl = f.b.variable_declarator(line(2), t_name, interp);
    f.m.set_declared_symbol(t_decl, t);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![t_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![name, t], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("'Hello ' .. tostring(name) .. '!'"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn method_reference_binds_delegate() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let action = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "Action");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Delegate,
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };
    let handle = {
        let mut sym = Symbol::new(SymbolKind::Method, "Handle");
        sym.containing_type = widget;
        sym.flags = SymbolFlags::PUBLIC;
        sym.method_data = Some(MethodData::default());
        f.m.alloc(sym)
    };
    let obj = f.local("obj", widget);
    let target = f.local("cb", action);

    let obj_ref = f.b.identifier(line(2), "obj");
    f.m.set_symbol(obj_ref, obj);
    let handle_name = f.b.identifier(line(2), "Handle");
    f.m.set_symbol(handle_name, handle);
    let access = f.b.member_access(line(2), obj_ref, handle_name);
    f.m.set_type_info(
        access,
        TypeInfo {
            ty: None,
            converted: Some(action),
        },
    );

    let cb_name = f.b.identifier(line(2), "cb");
    let cb_decl = f.b.variable_declarator(line(2), cb_name, access);
    f.m.set_declared_symbol(cb_decl, target);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![cb_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![obj, target], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("local cb = bind_delegate(obj, Widget.Handle)"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn object_creation_with_collection_initializer() {
    let mut f = Fixture::new();
    let point = f.source_class("Point");
    let p = f.local("p", point);

    let pt_name = f.b.identifier(line(2), "Point");
    let ty = f.b.named_type(line(2), pt_name, NodeList::new());
    f.m.set_symbol(ty, point);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let two = f.b.literal(line(2), LiteralValue::Int(2));
    let init = f
        .b
        .initializer_expr(line(2), InitializerKind::Collection, vec![one, two]);
    let creation = f.b.object_creation(line(2), ty, NodeList::new(), init);

    let p_name = f.b.identifier(line(2), "p");
    let p_decl = f.b.variable_declarator(line(2), p_name, creation);
    f.m.set_declared_symbol(p_decl, p);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![p_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![p], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("local p = initarr(Point:New(), 1, 2)"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn cast_to_interface_passes_name_literal() {
    let mut f = Fixture::new();
    let drawable = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "IDrawable");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Interface,
            is_from_source: true,
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };
    let v = f.local("v", f.string_ty);
    let t = f.local("t", drawable);

    let v_ref = f.b.identifier(line(2), "v");
    f.m.set_symbol(v_ref, v);
    let iface_name = f.b.identifier(line(2), "IDrawable");
    let ty = f.b.named_type(line(2), iface_name, NodeList::new());
    f.m.set_symbol(ty, drawable);
    let cast = f.b.cast(line(2), ty, v_ref);

    let t_name = f.b.identifier(line(2), "t");
    let t_decl = f.b.variable_declarator(line(2), t_name, cast);
    f.m.set_declared_symbol(t_decl, t);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![t_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![v, t], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("cast(v, 'IDrawable')"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn narrowing_cast_uses_castint() {
    let mut f = Fixture::new();
    let d = f.local("d", f.double);
    let n = f.local("n", f.int32);

    let d_ref = f.b.identifier(line(2), "d");
    f.m.set_symbol(d_ref, d);
    f.m.set_type(d_ref, f.double);
    let int_ty = f.b.predefined_type(line(2), "int");
    f.m.set_type(int_ty, f.int32);
    let cast = f.b.cast(line(2), int_ty, d_ref);

    let n_name = f.b.identifier(line(2), "n");
    let n_decl = f.b.variable_declarator(line(2), n_name, cast);
    f.m.set_declared_symbol(n_decl, n);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![n_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![d, n], 0, 4);
    let out = f.emit(root);

    assert!(out.contains("castint(d)"), "unexpected output:\n{out}");
}

#[test]
fn element_access_rebases_indices() {
    let mut f = Fixture::new();
    let int_array = support::array(&mut f.m, "int[]", f.int32);
    let items = f.local("items", int_array);
    let i = f.local("i", f.int32);
    let v = f.local("v", f.int32);

    let items_ref = f.b.identifier(line(2), "items");
    f.m.set_symbol(items_ref, items);
    f.m.set_type(items_ref, int_array);
    let i_ref = f.b.identifier(line(2), "i");
    f.m.set_symbol(i_ref, i);
    let access = f.b.element_access(line(2), items_ref, vec![i_ref]);

    let v_name = f.b.identifier(line(2), "v");
    let v_decl = f.b.variable_declarator(line(2), v_name, access);
    f.m.set_declared_symbol(v_decl, v);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![v_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![items, i, v], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("local v = items[i + 1]"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn reference_array_reads_and_writes_wrap_placeholders() {
    let mut f = Fixture::new();
    let names = f.local("names", f.string_array);
    let s = f.local("s", f.string_ty);

    // Read: var s = names[0];
    let names_ref = f.b.identifier(line(2), "names");
    f.m.set_symbol(names_ref, names);
    f.m.set_type(names_ref, f.string_array);
    let zero = f.b.literal(line(2), LiteralValue::Int(0));
    let read = f.b.element_access(line(2), names_ref, vec![zero]);
    let s_name = f.b.identifier(line(2), "s");
    let s_decl = f.b.variable_declarator(line(2), s_name, read);
    f.m.set_declared_symbol(s_decl, s);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![s_decl], false);
    let read_stmt = f.b.local_decl_statement(line(2), local);

    // Write: names[1] = s;
    let names_ref2 = f.b.identifier(line(3), "names");
    f.m.set_symbol(names_ref2, names);
    f.m.set_type(names_ref2, f.string_array);
    let one = f.b.literal(line(3), LiteralValue::Int(1));
    let target = f.b.element_access(line(3), names_ref2, vec![one]);
    let s_ref = f.b.identifier(line(3), "s");
    f.m.set_symbol(s_ref, s);
    f.m.set_type(s_ref, f.string_ty);
    let assign = f.b.assignment(line(3), target, AssignOp::Assign, s_ref);
    let write_stmt = f.b.expression_statement(line(3), assign);

    let body = f.b.block(lines(1, 4), vec![read_stmt, write_stmt]);
    let root = f.unit_with_method(body, vec![names, s], 0, 5);
    let out = f.emit(root);

    assert!(
        out.contains("local s = (names[1] or nil)"),
        "unexpected output:\n{out}"
    );
    assert!(
        out.contains("names[2] = (s or false)"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn array_length_uses_length_operator() {
    let mut f = Fixture::new();
    let names = f.local("names", f.string_array);
    let n = f.local("n", f.int32);

    let names_ref = f.b.identifier(line(2), "names");
    f.m.set_symbol(names_ref, names);
    f.m.set_type(names_ref, f.string_array);
    let length = f.b.identifier(line(2), "Length");
    let access = f.b.member_access(line(2), names_ref, length);

    let n_name = f.b.identifier(line(2), "n");
    let n_decl = f.b.variable_declarator(line(2), n_name, access);
    f.m.set_declared_symbol(n_decl, n);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![n_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![names, n], 0, 4);
    let out = f.emit(root);

    assert!(out.contains("local n = #names"), "unexpected output:\n{out}");
}

#[test]
fn ternary_forms_follow_truthiness() {
    let mut f = Fixture::new();
    let flag = f.local("flag", f.boolean);
    let t = f.local("t", f.int32);

    let flag_ref = f.b.identifier(line(2), "flag");
    f.m.set_symbol(flag_ref, flag);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let two = f.b.literal(line(2), LiteralValue::Int(2));
    let ternary = f.b.conditional(line(2), flag_ref, one, two);

    let t_name = f.b.identifier(line(2), "t");
    let t_decl = f.b.variable_declarator(line(2), t_name, ternary);
    f.m.set_declared_symbol(t_decl, t);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![t_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![flag, t], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("local t = (flag) and (1) or (2)"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn nullable_comparison_guards_simple_operand() {
    let mut f = Fixture::new();
    let x = f.local("x", f.nullable_int);
    let y = f.local("y", f.int32);

    let x_ref = f.b.identifier(line(2), "x");
    f.m.set_symbol(x_ref, x);
    f.m.set_type(x_ref, f.nullable_int);
    let y_ref = f.b.identifier(line(2), "y");
    f.m.set_symbol(y_ref, y);
    f.m.set_type(y_ref, f.int32);
    let cmp = f.b.binary(line(2), x_ref, BinaryOp::Lt, y_ref);

    let then_block = f.b.block(lines(2, 3), vec![]);
    let if_stmt = f.b.if_statement(lines(2, 3), cmp, then_block, NodeIndex::NONE);

    let body = f.b.block(lines(1, 4), vec![if_stmt]);
    let root = f.unit_with_method(body, vec![x, y], 0, 5);
    let out = f.emit(root);

    assert!(
        out.contains("if (x ~= nil and x < y) then"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn event_subscription_goes_through_accessors() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let clicked = {
        let mut sym = Symbol::new(SymbolKind::Event, "Clicked");
        sym.containing_type = widget;
        sym.flags = SymbolFlags::PUBLIC;
        f.m.alloc(sym)
    };
    let _adder = {
        let mut sym = Symbol::new(SymbolKind::Method, "add_Clicked");
        sym.containing_type = widget;
        sym.method_data = Some(MethodData {
            method_kind: MethodKind::EventAdd,
            associated: clicked,
            ..MethodData::default()
        });
        f.m.alloc(sym)
    };
    let obj = f.local("obj", widget);
    let handler = f.local("handler", f.string_ty);

    let obj_ref = f.b.identifier(line(2), "obj");
    f.m.set_symbol(obj_ref, obj);
    let clicked_name = f.b.identifier(line(2), "Clicked");
    f.m.set_symbol(clicked_name, clicked);
    let target = f.b.member_access(line(2), obj_ref, clicked_name);
    let handler_ref = f.b.identifier(line(2), "handler");
    f.m.set_symbol(handler_ref, handler);
    let assign = f.b.assignment(line(2), target, AssignOp::Add, handler_ref);
    let stmt = f.b.expression_statement(line(2), assign);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![obj, handler], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("obj:add_Clicked(handler)"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn excluded_conditional_invocation_is_commented_out() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let log = {
        let mut sym = Symbol::new(SymbolKind::Method, "Log");
        sym.containing_type = widget;
        sym.flags = SymbolFlags::PUBLIC | SymbolFlags::STATIC;
        sym.method_data = Some(MethodData {
            conditional_symbols: vec!["DEBUG".to_string()],
            ..MethodData::default()
        });
        f.m.alloc(sym)
    };

    let widget_ref = f.b.identifier(line(2), "Widget");
    f.m.set_symbol(widget_ref, widget);
    let log_name = f.b.identifier(line(2), "Log");
    f.m.set_symbol(log_name, log);
    let callee = f.b.member_access(line(2), widget_ref, log_name);
    let call = f.b.invocation(line(2), callee, vec![]);
    let stmt = f.b.expression_statement(line(2), call);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("--[[ Widget.Log() ]]"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn enum_emits_auto_incremented_table() {
    let mut f = Fixture::new();
    let color = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "Color");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Enum,
            is_from_source: true,
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };

    let name = f.b.identifier(line(0), "Color");
    let red_name = f.b.identifier(line(1), "Red");
    let red = f.b.enum_member(line(1), red_name, NodeIndex::NONE);
    let five = f.b.literal(line(2), LiteralValue::Int(5));
    let green_name = f.b.identifier(line(2), "Green");
    let green = f.b.enum_member(line(2), green_name, five);
    let blue_name = f.b.identifier(line(3), "Blue");
    let blue = f.b.enum_member(line(3), blue_name, NodeIndex::NONE);

    let decl = f
        .b
        .enum_decl(lines(0, 4), Modifiers::PUBLIC, name, vec![red, green, blue]);
    f.m.set_declared_symbol(decl, color);
    let root = f.b.compilation_unit(lines(0, 4), vec![decl]);
    let out = f.emit(root);

    assert!(out.contains("Color = {"), "unexpected output:\n{out}");
    assert!(out.contains("Red = 0,"), "unexpected output:\n{out}");
    assert!(out.contains("Green = 5,"), "unexpected output:\n{out}");
    assert!(out.contains("Blue = 6"), "unexpected output:\n{out}");
    assert!(!out.contains("return Color"), "unexpected output:\n{out}");
}

#[test]
fn interface_emits_registration_call() {
    let mut f = Fixture::new();
    let thing = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "IThing");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Interface,
            is_from_source: true,
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };
    let drawable = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "IDrawable");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Interface,
            is_from_source: true,
            interfaces: vec![thing],
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };

    let name = f.b.identifier(line(0), "IDrawable");
    let decl = f
        .b
        .interface_decl(lines(0, 1), Modifiers::PUBLIC, name, NodeList::new(), NodeList::new());
    f.m.set_declared_symbol(decl, drawable);
    let root = f.b.compilation_unit(lines(0, 1), vec![decl]);
    let out = f.emit(root);

    assert!(
        out.contains("interface('IDrawable', nil, nil, 'IThing')"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn private_statics_promote_to_file_locals() {
    let mut f = Fixture::new();
    let class_sym = f.source_class("C");
    let counter = {
        let mut sym = Symbol::new(SymbolKind::Field, "counter");
        sym.containing_type = class_sym;
        sym.flags = SymbolFlags::PRIVATE | SymbolFlags::STATIC;
        sym.ty = f.int32;
        f.m.alloc(sym)
    };
    let tick = {
        let mut sym = Symbol::new(SymbolKind::Method, "Tick");
        sym.containing_type = class_sym;
        sym.flags = SymbolFlags::PRIVATE | SymbolFlags::STATIC;
        sym.method_data = Some(MethodData::default());
        f.m.alloc(sym)
    };

    // static int counter = 3;
    let three = f.b.literal(line(1), LiteralValue::Int(3));
    let counter_name = f.b.identifier(line(1), "counter");
    let counter_decl = f.b.variable_declarator(line(1), counter_name, three);
    f.m.set_declared_symbol(counter_decl, counter);
    let int_ty = f.b.predefined_type(line(1), "int");
    let field = f.b.field_decl(
        line(1),
        Modifiers::PRIVATE | Modifiers::STATIC,
        int_ty,
        vec![counter_decl],
    );

    // static void Tick() { counter = counter + 1; }
    let counter_ref = f.b.identifier(line(2), "counter");
    f.m.set_symbol(counter_ref, counter);
    let counter_ref2 = f.b.identifier(line(2), "counter");
    f.m.set_symbol(counter_ref2, counter);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let sum = f.b.binary(line(2), counter_ref2, BinaryOp::Add, one);
    let assign = f.b.assignment(line(2), counter_ref, AssignOp::Assign, sum);
    let assign_stmt = f.b.expression_statement(line(2), assign);
    let tick_body = f.b.block(line(2), vec![assign_stmt]);
    f.m.set_data_flow(
        tick_body,
        DataFlow {
            succeeded: true,
            ..DataFlow::default()
        },
    );
    let tick_name = f.b.identifier(line(2), "Tick");
    let method = f.b.method_decl(
        line(2),
        Modifiers::PRIVATE | Modifiers::STATIC,
        NodeIndex::NONE,
        tick_name,
        NodeList::new(),
        NodeList::new(),
        tick_body,
        NodeIndex::NONE,
    );
    f.m.set_declared_symbol(method, tick);

    let cname = f.b.identifier(line(0), "C");
    let class = f.b.class_decl(
        lines(0, 3),
        Modifiers::PUBLIC,
        cname,
        NodeList::new(),
        NodeList::new(),
        vec![field, method],
    );
    f.m.set_declared_symbol(class, class_sym);
    let root = f.b.compilation_unit(lines(0, 3), vec![class]);
    let out = f.emit(root);

    assert!(out.contains("local counter;"), "unexpected output:\n{out}");
    assert!(out.contains("counter = 3"), "unexpected output:\n{out}");
    assert!(out.contains("local function Tick()"), "unexpected output:\n{out}");
    assert!(out.contains("counter = counter + 1"), "unexpected output:\n{out}");
}

#[test]
fn instance_field_initializer_weaves_synthesized_constructor() {
    let mut f = Fixture::new();
    let class_sym = f.source_class("C");
    let x = {
        let mut sym = Symbol::new(SymbolKind::Field, "x");
        sym.containing_type = class_sym;
        sym.flags = SymbolFlags::PRIVATE;
        sym.ty = f.int32;
        f.m.alloc(sym)
    };

    let five = f.b.literal(line(1), LiteralValue::Int(5));
    let x_name = f.b.identifier(line(1), "x");
    let x_decl = f.b.variable_declarator(line(1), x_name, five);
    f.m.set_declared_symbol(x_decl, x);
    let int_ty = f.b.predefined_type(line(1), "int");
    let field = f.b.field_decl(line(1), Modifiers::PRIVATE, int_ty, vec![x_decl]);

    let cname = f.b.identifier(line(0), "C");
    let class = f.b.class_decl(
        lines(0, 2),
        Modifiers::PUBLIC,
        cname,
        NodeList::new(),
        NodeList::new(),
        vec![field],
    );
    f.m.set_declared_symbol(class, class_sym);
    let root = f.b.compilation_unit(lines(0, 2), vec![class]);
    let out = f.emit(root);

    assert!(
        out.contains("function C:Constructor() self.x = 5; end"),
        "unexpected output:\n{out}"
    );
}

#[test]
fn default_only_switch_emits_no_dispatch_chain() {
    let mut f = Fixture::new();
    let x = f.local("x", f.int32);
    let x_ref = f.b.identifier(line(2), "x");
    f.m.set_symbol(x_ref, x);

    let default = f.b.default_label(line(3));
    let brk = f.b.break_statement(line(3));
    let section = f.b.switch_section(line(3), vec![default], vec![brk]);
    let switch = f.b.switch_statement(lines(2, 4), x_ref, vec![section]);

    let body = f.b.block(lines(1, 5), vec![switch]);
    let root = f.unit_with_method(body, vec![x], 0, 6);
    let out = f.emit(root);

    assert!(out.contains("repeat local _ = x"), "unexpected output:\n{out}");
    assert!(!out.contains("goto CASE"), "unexpected output:\n{out}");
    assert!(!out.contains("::CASE"), "unexpected output:\n{out}");
    assert!(out.contains("until true"), "unexpected output:\n{out}");
}

#[test]
fn empty_class_skips_local_binding() {
    let mut f = Fixture::new();
    let class_sym = f.source_class("Marker");
    let cname = f.b.identifier(line(0), "Marker");
    let class = f.b.class_decl(
        lines(0, 0),
        Modifiers::PUBLIC,
        cname,
        NodeList::new(),
        NodeList::new(),
        NodeList::new(),
    );
    f.m.set_declared_symbol(class, class_sym);
    let root = f.b.compilation_unit(lines(0, 0), vec![class]);
    let out = f.emit(root);

    assert!(
        !out.contains("local Marker ="),
        "unexpected output:\n{out}"
    );
    assert!(out.contains("class('Marker')"), "unexpected output:\n{out}");
}
