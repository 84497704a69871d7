//! End-to-end lowering scenarios with literal expected output.

mod support;

use cslua_sema::{MethodData, Symbol, SymbolFlags, SymbolKind, TypeData, TypeKind};
use cslua_syntax::{AssignOp, BinaryOp, GotoTarget, LiteralValue, NodeIndex, SyntaxKind};
use support::{Fixture, line, lines};

/// `bool? x = null; var y = x ?? false;` — the boolean result forces the
/// table-indexed coalesce form.
#[test]
fn null_coalesce_on_boolean_uses_table_form() {
    let mut f = Fixture::new();
    let x = f.local("x", f.nullable_bool);
    let y = f.local("y", f.boolean);

    let x_ref = f.b.identifier(line(3), "x");
    f.m.set_symbol(x_ref, x);
    f.m.set_type(x_ref, f.nullable_bool);
    let false_lit = f.b.literal(line(3), LiteralValue::Bool(false));
    let coalesce = f.b.binary(line(3), x_ref, BinaryOp::Coalesce, false_lit);
    f.m.set_type(coalesce, f.boolean);

    let y_name = f.b.identifier(line(3), "y");
    let y_decl = f.b.variable_declarator(line(3), y_name, coalesce);
    f.m.set_declared_symbol(y_decl, y);
    let local = f.b.local_decl(line(3), NodeIndex::NONE, vec![y_decl], false);
    let stmt = f.b.local_decl_statement(line(3), local);

    let body = f.b.block(lines(1, 4), vec![stmt]);
    let root = f.unit_with_method(body, vec![x, y], 0, 5);
    let out = f.emit(root);

    assert!(
        out.contains("(x == nil) and { false } or { x })[1]"),
        "unexpected output:\n{out}"
    );
}

/// `int c = a + b;` on 32-bit operands narrows the whole expression.
#[test]
fn i32_addition_narrows() {
    let mut f = Fixture::new();
    let a = f.local("a", f.int32);
    let b_sym = f.local("b", f.int32);
    let c = f.local("c", f.int32);

    let a_ref = f.b.identifier(line(2), "a");
    f.m.set_symbol(a_ref, a);
    f.m.set_type(a_ref, f.int32);
    let b_ref = f.b.identifier(line(2), "b");
    f.m.set_symbol(b_ref, b_sym);
    f.m.set_type(b_ref, f.int32);
    let sum = f.b.binary(line(2), a_ref, BinaryOp::Add, b_ref);

    let c_name = f.b.identifier(line(2), "c");
    let c_decl = f.b.variable_declarator(line(2), c_name, sum);
    f.m.set_declared_symbol(c_decl, c);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![c_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![a, b_sym, c], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("local c = __i32narrow__(a + b)"),
        "unexpected output:\n{out}"
    );
}

/// `foreach (var s in strings)` over a reference array: ipairs plus the
/// placeholder unwrap at the top of the body.
#[test]
fn foreach_over_reference_array() {
    let mut f = Fixture::new();
    let strings = f.local("strings", f.string_array);
    let s = f.local("s", f.string_ty);
    let console = {
        let mut sym = Symbol::new(SymbolKind::NamedType, "Console");
        sym.type_data = Some(TypeData {
            type_kind: TypeKind::Class,
            ..TypeData::default()
        });
        f.m.alloc(sym)
    };
    let write = {
        let mut sym = Symbol::new(SymbolKind::Method, "Write");
        sym.containing_type = console;
        sym.flags = SymbolFlags::PUBLIC | SymbolFlags::STATIC;
        sym.method_data = Some(MethodData::default());
        f.m.alloc(sym)
    };

    let strings_ref = f.b.identifier(line(2), "strings");
    f.m.set_symbol(strings_ref, strings);
    f.m.set_type(strings_ref, f.string_array);

    let console_ref = f.b.identifier(line(3), "Console");
    f.m.set_symbol(console_ref, console);
    let write_name = f.b.identifier(line(3), "Write");
    f.m.set_symbol(write_name, write);
    let callee = f.b.member_access(line(3), console_ref, write_name);
    let s_ref = f.b.identifier(line(3), "s");
    f.m.set_symbol(s_ref, s);
    let call = f.b.invocation(line(3), callee, vec![s_ref]);
    let call_stmt = f.b.expression_statement(line(3), call);

    let loop_body = f.b.block(lines(2, 4), vec![call_stmt]);
    let s_name = f.b.identifier(line(2), "s");
    let foreach = f
        .b
        .foreach_statement(lines(2, 4), NodeIndex::NONE, s_name, strings_ref, loop_body);
    f.m.set_declared_symbol(foreach, s);

    let body = f.b.block(lines(1, 5), vec![foreach]);
    let root = f.unit_with_method(body, vec![strings], 0, 6);
    let out = f.emit(root);

    assert!(
        out.contains("for _, s in ipairs(strings) do"),
        "unexpected output:\n{out}"
    );
    assert!(out.contains("s = s or nil;"), "unexpected output:\n{out}");
    assert!(out.contains("Console.Write(s)"), "unexpected output:\n{out}");
}

/// Switch lowering: subject capture, dispatch chain, labels, goto case.
#[test]
fn switch_with_goto_case() {
    let mut f = Fixture::new();
    let x = f.local("x", f.int32);
    let x_ref = f.b.identifier(line(2), "x");
    f.m.set_symbol(x_ref, x);
    f.m.set_type(x_ref, f.int32);

    let one = f.b.literal(line(3), LiteralValue::Int(1));
    let two = f.b.literal(line(4), LiteralValue::Int(2));
    let goto_target = f.b.literal(line(3), LiteralValue::Int(2));

    let case1 = f.b.case_label(line(3), one);
    let goto_case = f
        .b
        .goto_statement(line(3), GotoTarget::Case(goto_target));
    let section1 = f.b.switch_section(line(3), vec![case1], vec![goto_case]);

    let case2 = f.b.case_label(line(4), two);
    let brk1 = f.b.break_statement(line(4));
    let section2 = f.b.switch_section(line(4), vec![case2], vec![brk1]);

    let default = f.b.default_label(line(5));
    let brk2 = f.b.break_statement(line(5));
    let section3 = f.b.switch_section(line(5), vec![default], vec![brk2]);

    let switch = f
        .b
        .switch_statement(lines(2, 6), x_ref, vec![section1, section2, section3]);

    let body = f.b.block(lines(1, 7), vec![switch]);
    let root = f.unit_with_method(body, vec![x], 0, 8);
    let out = f.emit(root);

    assert!(out.contains("local _ = x"), "unexpected output:\n{out}");
    assert!(
        out.contains("if _ == 1 then goto CASE_A elseif _ == 2 then goto CASE_B else goto CASE_C end"),
        "unexpected output:\n{out}"
    );
    assert!(out.contains("::CASE_A:: goto CASE_B"), "unexpected output:\n{out}");
    assert!(out.contains("::CASE_B:: break"), "unexpected output:\n{out}");
    assert!(out.contains("::CASE_C:: break"), "unexpected output:\n{out}");
    assert!(out.contains("until true"), "unexpected output:\n{out}");
}

/// Compound assignment through a non-auto property goes through both
/// accessors.
#[test]
fn property_compound_assignment_uses_accessors() {
    let mut f = Fixture::new();
    let widget = f.source_class("Widget");
    let (count_prop, _getter, _setter) =
        support::property_with_accessors(&mut f.m, widget, "Count", f.int32);
    let obj = f.local("obj", widget);

    let obj_ref = f.b.identifier(line(2), "obj");
    f.m.set_symbol(obj_ref, obj);
    let count_name = f.b.identifier(line(2), "Count");
    f.m.set_symbol(count_name, count_prop);
    let target = f.b.member_access(line(2), obj_ref, count_name);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let assign = f.b.assignment(line(2), target, AssignOp::Add, one);
    let stmt = f.b.expression_statement(line(2), assign);

    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![obj], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains("obj:set_Count(obj:get_Count() + 1)"),
        "unexpected output:\n{out}"
    );
}

/// `try { return 7; } catch (IOException e) when (...) { return 0; }` —
/// the combinator form with filter synthesis and result dispatch.
#[test]
fn try_with_return_dispatches_through_result_capture() {
    let mut f = Fixture::new();
    let ioex = f.source_class("IOException");
    let e_sym = {
        let mut sym = Symbol::new(SymbolKind::Local, "e");
        sym.ty = ioex;
        f.m.alloc(sym)
    };

    let seven = f.b.literal(line(2), LiteralValue::Int(7));
    let ret7 = f.b.return_statement(line(2), seven);
    let try_block = f.b.block(lines(2, 2), vec![ret7]);

    let e_ident = f.b.identifier(line(2), "e");
    f.m.set_declared_symbol(e_ident, e_sym);
    let ty_name = f.b.identifier(line(2), "IOException");
    let catch_ty = f.b.named_type(line(2), ty_name, Vec::new());
    f.m.set_symbol(catch_ty, ioex);

    let e_ref = f.b.identifier(line(2), "e");
    f.m.set_symbol(e_ref, e_sym);
    let message = f.b.identifier(line(2), "Message");
    let msg_access = f.b.member_access(line(2), e_ref, message);
    let null_lit = f.b.literal(line(2), LiteralValue::Null);
    let when = f.b.binary(line(2), msg_access, BinaryOp::Ne, null_lit);

    let zero = f.b.literal(line(2), LiteralValue::Int(0));
    let ret0 = f.b.return_statement(line(2), zero);
    let catch_block = f.b.block(lines(2, 2), vec![ret0]);
    let catch = f
        .b
        .catch_clause(line(2), catch_ty, e_ident, when, catch_block);

    let try_stmt = f
        .b
        .try_statement(lines(2, 2), try_block, vec![catch], NodeIndex::NONE);

    let body = f.b.block(lines(1, 3), vec![try_stmt]);
    let root = f.unit_with_method(body, vec![], 0, 4);
    let out = f.emit(root);

    assert!(
        out.contains(
            "do local res, ret = try(function() return 2, 7 end, \
             function(e) if is(e, IOException) then return true end return e.Message ~= nil end, \
             function(e) return 2, 0 end) if 2 == res then return ret end end"
        ),
        "unexpected output:\n{out}"
    );
}

/// A second pass over the same tree produces byte-identical output.
#[test]
fn emission_is_deterministic() {
    let build = || {
        let mut f = Fixture::new();
        let a = f.local("item", f.int32);
        let b_sym = f.local("item", f.int32);
        let a_name = f.b.identifier(line(2), "item");
        let a_decl = f.b.variable_declarator(line(2), a_name, NodeIndex::NONE);
        f.m.set_declared_symbol(a_decl, a);
        let la = f.b.local_decl(line(2), NodeIndex::NONE, vec![a_decl], false);
        let sa = f.b.local_decl_statement(line(2), la);
        let b_name = f.b.identifier(line(3), "item");
        let b_decl = f.b.variable_declarator(line(3), b_name, NodeIndex::NONE);
        f.m.set_declared_symbol(b_decl, b_sym);
        let lb = f.b.local_decl(line(3), NodeIndex::NONE, vec![b_decl], false);
        let sb = f.b.local_decl_statement(line(3), lb);
        let body = f.b.block(lines(1, 4), vec![sa, sb]);
        let root = f.unit_with_method(body, vec![a, b_sym], 0, 5);
        (f, root)
    };
    let (f1, root1) = build();
    let (f2, root2) = build();
    assert_eq!(f1.emit(root1), f2.emit(root2));
}

/// Line-for-line debug contract on a small unit.
#[test]
fn line_preservation_for_simple_unit() {
    let mut f = Fixture::new();
    let x = f.local("x", f.int32);
    let one = f.b.literal(line(2), LiteralValue::Int(1));
    let x_name = f.b.identifier(line(2), "x");
    let x_decl = f.b.variable_declarator(line(2), x_name, one);
    f.m.set_declared_symbol(x_decl, x);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![x_decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![x], 0, 4);
    let out = f.emit(root);

    assert_eq!(
        out,
        "local C = class('C')\nfunction C:Run()\n\tlocal x = 1\nend\nreturn C\n"
    );
}

/// Dedup renames pick the smallest free suffix, deterministically.
#[test]
fn colliding_locals_get_suffixes() {
    let mut f = Fixture::new();
    let first = f.local("v", f.int32);
    let second = f.local("v", f.int32);

    let n1 = f.b.identifier(line(2), "v");
    let d1 = f.b.variable_declarator(line(2), n1, NodeIndex::NONE);
    f.m.set_declared_symbol(d1, first);
    let l1 = f.b.local_decl(line(2), NodeIndex::NONE, vec![d1], false);
    let s1 = f.b.local_decl_statement(line(2), l1);

    let n2 = f.b.identifier(line(3), "v");
    let d2 = f.b.variable_declarator(line(3), n2, NodeIndex::NONE);
    f.m.set_declared_symbol(d2, second);
    let l2 = f.b.local_decl(line(3), NodeIndex::NONE, vec![d2], false);
    let s2 = f.b.local_decl_statement(line(3), l2);

    let body = f.b.block(lines(1, 4), vec![s1, s2]);
    let root = f.unit_with_method(body, vec![first, second], 0, 5);
    let out = f.emit(root);

    assert!(out.contains("local v\n"), "unexpected output:\n{out}");
    assert!(out.contains("local v0"), "unexpected output:\n{out}");
}

/// A reserved target word used as a local is renamed.
#[test]
fn reserved_word_local_is_renamed() {
    let mut f = Fixture::new();
    let sym = f.local("end", f.int32);
    let name = f.b.identifier(line(2), "end");
    let decl = f.b.variable_declarator(line(2), name, NodeIndex::NONE);
    f.m.set_declared_symbol(decl, sym);
    let local = f.b.local_decl(line(2), NodeIndex::NONE, vec![decl], false);
    let stmt = f.b.local_decl_statement(line(2), local);
    let body = f.b.block(lines(1, 3), vec![stmt]);
    let root = f.unit_with_method(body, vec![sym], 0, 4);
    let out = f.emit(root);

    assert!(out.contains("local end0"), "unexpected output:\n{out}");
}

/// Kind helper coverage for the closed statement set.
#[test]
fn syntax_kind_statement_predicate() {
    assert!(SyntaxKind::IfStatement.is_statement());
    assert!(SyntaxKind::SwitchStatement.is_statement());
    assert!(!SyntaxKind::BinaryExpr.is_statement());
    assert!(SyntaxKind::ForEachStatement.is_loop());
}
