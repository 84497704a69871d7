//! Symbols - resolved identities of names.
//!
//! Symbols are interned in a [`SymbolArena`] and addressed by [`SymbolId`].
//! Identities are immutable once built; the emitter holds ids, never
//! references, so symbol graphs (override chains, interface-implementation
//! relations) are consulted through non-owning lookups.

use cslua_syntax::LiteralValue;

/// Index of a symbol in the arena. `SymbolId::NONE` marks an absent relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const NONE: SymbolId = SymbolId(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

/// Kind of a symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Namespace,
    NamedType,
    Method,
    Field,
    Property,
    Event,
    Parameter,
    Local,
    Label,
    TypeParameter,
    Discard,
    Alias,
}

bitflags::bitflags! {
    /// Accessibility and modifier flags on a symbol.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SymbolFlags: u32 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const CONST = 1 << 5;
        const READONLY = 1 << 6;
        const ABSTRACT = 1 << 7;
        const VIRTUAL = 1 << 8;
        const OVERRIDE = 1 << 9;
        const SEALED = 1 << 10;
        const PARTIAL = 1 << 11;
        const EXTERN = 1 << 12;
        /// Carries the pure attribute; verified side-effect-free.
        const PURE = 1 << 13;
        /// The program's main entry method.
        const ENTRY_POINT = 1 << 14;
        /// The class-initialization pseudo-method.
        const CLASS_INIT = 1 << 15;
        /// An automatically-implemented property (direct backing slot).
        const AUTO = 1 << 16;
    }
}

/// The special-type tag of a type symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpecialType {
    #[default]
    None,
    Boolean,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Object,
    String,
    Delegate,
    Nullable,
    Array,
}

impl SpecialType {
    /// Whether this tag names a 32-bit integer type.
    #[must_use]
    pub const fn is_int32(self) -> bool {
        matches!(self, SpecialType::Int32 | SpecialType::UInt32)
    }

    /// Whether this tag names any integral type.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            SpecialType::Byte
                | SpecialType::SByte
                | SpecialType::Int16
                | SpecialType::UInt16
                | SpecialType::Int32
                | SpecialType::UInt32
                | SpecialType::Int64
                | SpecialType::UInt64
        )
    }

    /// Whether this tag names a numeric type.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, SpecialType::Single | SpecialType::Double)
    }
}

/// Kind of a type symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
    TypeParameter,
    Array,
    Tuple,
    Error,
    Dynamic,
}

/// Kind of a method symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Constructor,
    StaticConstructor,
    Destructor,
    #[default]
    Ordinary,
    PropertyGet,
    PropertySet,
    EventAdd,
    EventRaise,
    EventRemove,
    UserDefinedOperator,
    BuiltinOperator,
    DelegateInvoke,
    ReducedExtension,
    AnonymousFunction,
    LocalFunction,
    ExplicitInterfaceImpl,
}

impl MethodKind {
    /// Whether this kind is a property or event accessor.
    #[must_use]
    pub const fn is_accessor(self) -> bool {
        matches!(
            self,
            MethodKind::PropertyGet
                | MethodKind::PropertySet
                | MethodKind::EventAdd
                | MethodKind::EventRaise
                | MethodKind::EventRemove
        )
    }

    /// Whether this accessor kind receives a value and is spliced into
    /// assignments (setter/adder/remover).
    #[must_use]
    pub const fn is_assignment_accessor(self) -> bool {
        matches!(
            self,
            MethodKind::PropertySet | MethodKind::EventAdd | MethodKind::EventRemove
        )
    }
}

/// Additional shape of a type symbol.
#[derive(Clone, Debug)]
pub struct TypeData {
    pub special: SpecialType,
    pub type_kind: TypeKind,
    /// Element type for arrays and the wrapped type for `Nullable<T>`.
    pub element_type: SymbolId,
    pub base_type: SymbolId,
    pub interfaces: Vec<SymbolId>,
    pub type_params: Vec<SymbolId>,
    /// Non-empty for constructed generic types.
    pub type_args: Vec<SymbolId>,
    /// The open definition a constructed generic was built from.
    pub original_definition: SymbolId,
    /// Whether the type has declaring references in source
    /// (false for system built-ins).
    pub is_from_source: bool,
    /// Whether the declaration is nested inside another type.
    pub is_nested: bool,
}

impl Default for TypeData {
    fn default() -> Self {
        Self {
            special: SpecialType::None,
            type_kind: TypeKind::Class,
            element_type: SymbolId::NONE,
            base_type: SymbolId::NONE,
            interfaces: Vec::new(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            original_definition: SymbolId::NONE,
            is_from_source: false,
            is_nested: false,
        }
    }
}

/// A parameter of a method symbol.
#[derive(Clone, Debug)]
pub struct ParamData {
    pub name: String,
    pub ty: SymbolId,
    pub is_optional: bool,
    pub has_explicit_default: bool,
    pub default_value: Option<LiteralValue>,
    pub is_params: bool,
}

impl ParamData {
    /// A plain required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, ty: SymbolId) -> Self {
        Self {
            name: name.into(),
            ty,
            is_optional: false,
            has_explicit_default: false,
            default_value: None,
            is_params: false,
        }
    }

    /// An optional parameter with an explicit default literal.
    #[must_use]
    pub fn optional(name: impl Into<String>, ty: SymbolId, default: LiteralValue) -> Self {
        Self {
            name: name.into(),
            ty,
            is_optional: true,
            has_explicit_default: true,
            default_value: Some(default),
            is_params: false,
        }
    }

    /// A `params`-decorated trailing parameter.
    #[must_use]
    pub fn params(name: impl Into<String>, ty: SymbolId) -> Self {
        Self {
            name: name.into(),
            ty,
            is_optional: false,
            has_explicit_default: false,
            default_value: None,
            is_params: true,
        }
    }
}

/// Additional shape of a method symbol.
#[derive(Clone, Debug)]
pub struct MethodData {
    pub method_kind: MethodKind,
    pub params: Vec<ParamData>,
    pub type_params: Vec<SymbolId>,
    pub return_type: SymbolId,
    pub is_extension: bool,
    /// Calls compile to native numeric for-loops inside foreach headers.
    pub is_range_pseudo: bool,
    /// Conditional-compilation symbols gating calls to this method.
    pub conditional_symbols: Vec<String>,
    /// The property or event an accessor belongs to.
    pub associated: SymbolId,
    /// The generic definition a constructed method was built from.
    pub original_definition: SymbolId,
}

impl Default for MethodData {
    fn default() -> Self {
        Self {
            method_kind: MethodKind::Ordinary,
            params: Vec::new(),
            type_params: Vec::new(),
            return_type: SymbolId::NONE,
            is_extension: false,
            is_range_pseudo: false,
            conditional_symbols: Vec::new(),
            associated: SymbolId::NONE,
            original_definition: SymbolId::NONE,
        }
    }
}

/// Resolved identity of a name.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub containing_type: SymbolId,
    pub containing_namespace: Option<String>,
    pub flags: SymbolFlags,
    /// Declared type of a field/local/parameter/property/event.
    pub ty: SymbolId,
    pub type_data: Option<TypeData>,
    pub method_data: Option<MethodData>,
    /// The member this one overrides, if any.
    pub overridden: SymbolId,
    /// Interface members this one implements.
    pub implements: Vec<SymbolId>,
}

impl Symbol {
    #[must_use]
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            containing_type: SymbolId::NONE,
            containing_namespace: None,
            flags: SymbolFlags::empty(),
            ty: SymbolId::NONE,
            type_data: None,
            method_data: None,
            overridden: SymbolId::NONE,
            implements: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.flags.contains(SymbolFlags::STATIC)
    }

    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.flags.contains(SymbolFlags::PRIVATE)
    }

    #[must_use]
    pub const fn is_const(&self) -> bool {
        self.flags.contains(SymbolFlags::CONST)
    }

    /// The fully-qualified source name, `Namespace.Type` style.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.containing_namespace {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.name),
            _ => self.name.clone(),
        }
    }

    /// Method shape, if this is a method symbol.
    #[must_use]
    pub fn method(&self) -> Option<&MethodData> {
        self.method_data.as_ref()
    }

    /// Type shape, if this is a type symbol.
    #[must_use]
    pub fn type_shape(&self) -> Option<&TypeData> {
        self.type_data.as_ref()
    }
}

/// The interning arena for symbols.
#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        if id.is_none() {
            return None;
        }
        self.symbols.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        if id.is_none() {
            return None;
        }
        self.symbols.get_mut(id.0 as usize)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
