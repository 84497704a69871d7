//! Target-language vocabulary.
//!
//! Lua keyword set, reserved runtime identifiers, operator spellings, and
//! the runtime-helper names referenced by the lowerings. The emitted file,
//! when tokenized, reproduces a valid program in this closed vocabulary.

use cslua_syntax::BinaryOp;
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// The Lua keyword set.
pub const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Runtime globals the emitter's output relies on. Locals must not shadow
/// these.
pub const RUNTIME_GLOBALS: &[&str] = &[
    "self", "bit", "math", "string", "table", "ipairs", "pairs", "error", "tostring", "type",
    "select", "class", "class_static", "interface", "try", "tryfinally", "using", "bind_delegate",
    "genericlookup", "cast", "castint", "is", "initarr", "initlist", "i32mul", "i32mod",
    "i32truncate", "__i32narrow__", "booland", "boolor", "boolxor",
    "NullReferenceException",
];

static RESERVED: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    LUA_KEYWORDS
        .iter()
        .chain(RUNTIME_GLOBALS.iter())
        .copied()
        .collect()
});

/// Whether `name` is a Lua keyword.
#[must_use]
pub fn is_lua_keyword(name: &str) -> bool {
    LUA_KEYWORDS.contains(&name)
}

/// Whether `name` collides with the target-language reserved vocabulary
/// (keywords plus runtime globals).
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

// =============================================================================
// Synthesized names
// =============================================================================

/// The receiver of instance members.
pub const SELF: &str = "self";
/// Conventional setter value parameter.
pub const VALUE_PARAM: &str = "value";
/// The discard identifier.
pub const DISCARD: &str = "_";
/// The variadic token.
pub const VARARG: &str = "...";
/// Base name for synthesized continue labels.
pub const CONTINUE_LABEL_BASE: &str = "continue";
/// Prefix for synthesized switch-section labels.
pub const CASE_LABEL_PREFIX: &str = "CASE_";
/// Instance constructor method name.
pub const CTOR_NAME: &str = "Constructor";
/// Static constructor method name.
pub const CCTOR_NAME: &str = "cctor";

// =============================================================================
// Runtime helpers
// =============================================================================

pub const RT_CLASS: &str = "class";
pub const RT_CLASS_STATIC: &str = "class_static";
pub const RT_INTERFACE: &str = "interface";
pub const RT_NEW: &str = "New";
pub const RT_ONEW: &str = "ONew";
pub const RT_TRY: &str = "try";
pub const RT_TRYFINALLY: &str = "tryfinally";
pub const RT_USING: &str = "using";
pub const RT_BIND_DELEGATE: &str = "bind_delegate";
pub const RT_GENERIC_LOOKUP: &str = "genericlookup";
pub const RT_CAST: &str = "cast";
pub const RT_CASTINT: &str = "castint";
pub const RT_IS: &str = "is";
pub const RT_INITARR: &str = "initarr";
pub const RT_INITLIST: &str = "initlist";
pub const RT_I32NARROW: &str = "__i32narrow__";
pub const RT_I32MUL: &str = "i32mul";
pub const RT_I32TRUNCATE: &str = "i32truncate";
pub const RT_I32MOD: &str = "i32mod";
pub const RT_STRING_ALIGN: &str = "string.align";
pub const RT_TOSTRING: &str = "tostring";
pub const RT_ERROR: &str = "error";
pub const RT_IPAIRS: &str = "ipairs";
pub const RT_UNPACK: &str = "table.unpack";
pub const RT_NULL_REF_EXCEPTION: &str = "NullReferenceException";
pub const RT_STRING_LIB: &str = "String";

pub const BIT_AND: &str = "bit.band";
pub const BIT_OR: &str = "bit.bor";
pub const BIT_XOR: &str = "bit.bxor";
pub const BIT_NOT: &str = "bit.bnot";
pub const BIT_LSHIFT: &str = "bit.lshift";
pub const BIT_ARSHIFT: &str = "bit.arshift";
pub const BIT_RSHIFT: &str = "bit.rshift";
pub const BOOL_AND: &str = "booland";
pub const BOOL_OR: &str = "boolor";
pub const BOOL_XOR: &str = "boolxor";

/// Control codes returned from try/using body lambdas.
pub const CTL_BREAK: u8 = 0;
pub const CTL_CONTINUE: u8 = 1;
pub const CTL_RETURN: u8 = 2;

// =============================================================================
// Operator spellings
// =============================================================================

/// Lua spelling of a binary operator, for operators with a direct spelling.
/// Bitwise and coalesce operators dispatch to runtime helpers instead.
#[must_use]
pub fn operator_text(op: BinaryOp) -> Option<&'static str> {
    Some(match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "~=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::LogicalAnd => "and",
        BinaryOp::LogicalOr => "or",
        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::Coalesce => return None,
    })
}

/// The Lua metamethod implementing a user-defined operator method, keyed by
/// the operator method's source name. `ToString` overrides map separately.
#[must_use]
pub fn metamethod_for_operator(name: &str) -> Option<&'static str> {
    Some(match name {
        "op_Addition" => "__add",
        "op_Subtraction" => "__sub",
        "op_Multiply" => "__mul",
        "op_Division" => "__div",
        "op_Modulus" => "__mod",
        "op_LessThan" => "__lt",
        "op_LessThanOrEqual" => "__le",
        "op_UnaryNegation" => "__unm",
        _ => return None,
    })
}

/// Metamethod for `ToString` overrides.
pub const TOSTRING_METAMETHOD: &str = "__tostring";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_reserved() {
        assert!(is_lua_keyword("and"));
        assert!(is_lua_keyword("until"));
        assert!(!is_lua_keyword("And"));
        assert!(is_reserved("end"));
        assert!(is_reserved("bind_delegate"));
        assert!(!is_reserved("count"));
    }

    #[test]
    fn test_operator_text() {
        assert_eq!(operator_text(BinaryOp::Ne), Some("~="));
        assert_eq!(operator_text(BinaryOp::LogicalAnd), Some("and"));
        assert_eq!(operator_text(BinaryOp::BitAnd), None);
    }

    #[test]
    fn test_metamethods() {
        assert_eq!(metamethod_for_operator("op_Addition"), Some("__add"));
        assert_eq!(metamethod_for_operator("op_Equality"), None);
    }
}
