use super::*;
use cslua_common::Position;

#[test]
fn test_basic_write() {
    let mut writer = LuaWriter::new();
    writer.write("hello");
    writer.write(" ");
    writer.write("world");
    assert_eq!(writer.get_output(), "hello world");
}

#[test]
fn test_newline_tracking() {
    let mut writer = LuaWriter::new();
    writer.write("line 1");
    writer.newline();
    writer.write("line 2");

    assert_eq!(writer.current_line(), 1);
    assert_eq!(writer.get_output(), "line 1\nline 2");
}

#[test]
fn test_indentation() {
    let mut writer = LuaWriter::new();
    writer.write("start");
    writer.newline();
    writer.increase_indent();
    writer.write("indented");
    writer.newline();
    writer.decrease_indent();
    writer.write("back");

    assert_eq!(writer.get_output(), "start\n\tindented\nback");
}

#[test]
fn test_newline_to_target() {
    let mut writer = LuaWriter::new();
    writer.write("a");
    writer.newline_to_target(3);
    writer.write("b");

    assert_eq!(writer.current_line(), 3);
    assert_eq!(writer.get_output(), "a\n\n\nb");
}

#[test]
fn test_advance_or_space_when_past() {
    let mut writer = LuaWriter::new();
    writer.write("x");
    writer.advance_or_space(0);
    writer.write("y");
    assert_eq!(writer.get_output(), "x y");
}

#[test]
fn test_output_lock_suppresses_bytes() {
    let mut writer = LuaWriter::new();
    writer.write("kept ");
    writer.lock_output();
    writer.write("dropped");
    writer.newline();
    writer.unlock_output();
    writer.write("kept");

    assert_eq!(writer.get_output(), "kept kept");
    assert_eq!(writer.current_line(), 0);
}

#[test]
fn test_fixed_line_drops_newlines() {
    let mut writer = LuaWriter::new();
    writer.write("a");
    let captured = writer.begin_fixed_line();
    writer.newline();
    writer.newline_to_target(5);
    writer.write(" b");
    writer.end_fixed_line();

    assert_eq!(writer.current_line(), captured);
    assert_eq!(writer.get_output(), "a b");
}

#[test]
fn test_comment_interleaving() {
    let mut writer = LuaWriter::new();
    writer.set_comments(
        vec![LuaComment {
            start: Position::new(1, 0),
            end_line: 1,
            kind: cslua_common::CommentKind::SingleLine,
            text: " a note".to_string(),
        }],
        false,
    );
    writer.write("first");
    writer.newline_to_target(2);
    writer.write("third");

    assert_eq!(writer.get_output(), "first\n-- a note\nthird");
}

#[test]
fn test_doc_comment_reformatted() {
    let mut writer = LuaWriter::new();
    writer.set_comments(
        vec![LuaComment {
            start: Position::new(0, 0),
            end_line: 0,
            kind: cslua_common::CommentKind::Doc,
            text: " Summary of Game.cs".to_string(),
        }],
        false,
    );
    writer.newline_to_target(1);
    writer.write("decl");

    assert_eq!(writer.get_output(), "--- Summary of Game.lua\ndecl");
}

#[test]
fn test_remove_comments_mode() {
    let mut writer = LuaWriter::new();
    writer.set_comments(
        vec![LuaComment {
            start: Position::new(0, 0),
            end_line: 0,
            kind: cslua_common::CommentKind::SingleLine,
            text: " stripped".to_string(),
        }],
        true,
    );
    writer.newline_to_target(1);
    writer.write("x");
    assert_eq!(writer.get_output(), "\nx");
}

#[test]
fn test_escape_string_smaller_quote_rule() {
    assert_eq!(escape_string("plain"), "'plain'");
    assert_eq!(escape_string("it's"), "\"it's\"");
    assert_eq!(escape_string("say \"hi\""), "'say \"hi\"'");
    assert_eq!(escape_string("line\nbreak"), "'line\\nbreak'");
}

#[test]
fn test_write_constant() {
    let mut writer = LuaWriter::new();
    writer.write_constant(&LiteralValue::Null);
    writer.write(" ");
    writer.write_constant(&LiteralValue::Bool(true));
    writer.write(" ");
    writer.write_constant(&LiteralValue::Int(-42));
    writer.write(" ");
    writer.write_constant(&LiteralValue::Float(2.0));
    writer.write(" ");
    writer.write_constant(&LiteralValue::Float(0.5));
    writer.write(" ");
    writer.write_constant(&LiteralValue::Char('A'));
    assert_eq!(writer.get_output(), "nil true -42 2 0.5 65");
}

#[test]
fn test_sanitize_comment_text() {
    assert_eq!(sanitize_comment_text("see Foo.cs"), "see Foo.lua");
    assert_eq!(sanitize_comment_text("a ]] b"), "a ] ] b");
}

#[test]
fn test_statement_indent_on_wrap() {
    let mut writer = LuaWriter::new();
    writer.begin_statement();
    writer.write("local x =");
    writer.newline();
    writer.write("1");
    writer.end_statement();
    writer.newline();
    writer.write("next");

    assert_eq!(writer.get_output(), "local x =\n\t1\nnext");
}
