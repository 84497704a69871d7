//! The scope and deduplication engine.
//!
//! Block scope frames are pushed on entry to their construct and popped on
//! exit; push order equals source order. Each frame carries the data-flow
//! record of its region, the globals visible from it, and the two dedup
//! maps used to rewrite colliding names. Type scope frames track top-level
//! local promotion.

use crate::error::{EmitError, EmitResult};
use crate::vocab;
use cslua_common::limits;
use cslua_sema::{DataFlow, SemanticModel, SymbolId, SymbolKind};
use cslua_syntax::NodeIndex;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

bitflags::bitflags! {
    /// Non-local control transfers observed inside a try/using body.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ControlOptions: u8 {
        const BREAK = 1 << 0;
        const CONTINUE = 1 << 1;
        const RETURN = 1 << 2;
        const RETURN_MULTIPLE = 1 << 3;
    }
}

/// Kind of a block scope frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Function,
    Lambda,
    TopLevelChunk,
    Type,
    Loop,
    Switch,
    TryOrUsing,
}

impl ScopeKind {
    /// Whether the frame owns goto labels (functions and the chunk do).
    #[must_use]
    pub const fn owns_labels(self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Lambda | ScopeKind::TopLevelChunk
        )
    }
}

/// Hashable key of a switch case constant. A null case key is normalized to
/// the dedicated sentinel variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CaseKey {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// One entered lexical region.
#[derive(Debug)]
pub struct BlockScope {
    pub kind: ScopeKind,
    pub site: NodeIndex,
    pub flow: DataFlow,
    /// Identifiers reachable in the enclosing type scope.
    pub globals: FxHashSet<String>,
    /// Reads inside base-call arguments of a constructor.
    pub extra_read: FxHashSet<SymbolId>,
    /// Assignment targets of immediate-child statements of a base-less
    /// constructor body.
    pub extra_write: FxHashSet<SymbolId>,
    /// Name -> owning symbol, for every name claimed in this frame.
    pub dedup_by_id: FxHashMap<String, SymbolId>,
    /// Symbol -> rewritten name, for symbols this frame renamed.
    pub dedup_by_symbol: FxHashMap<SymbolId, String>,
    /// Synthesized label implementing `continue` inside this loop.
    pub continue_label: Option<String>,
    pub control_options: ControlOptions,
    /// The assignment-target accessor (setter/adder/remover) in effect.
    pub lhs: SymbolId,
    /// Labels of user labelled statements (function-kind frames).
    pub labels: FxHashSet<String>,
    /// Labels synthesized for continue and switch dispatch.
    pub utility_goto_labels: FxHashSet<String>,
    /// Case constant -> section label (switch frames, lazily filled).
    pub switch_labels: FxHashMap<CaseKey, String>,
    pub switch_default_label: Option<String>,
}

impl BlockScope {
    #[must_use]
    pub fn new(kind: ScopeKind, site: NodeIndex) -> Self {
        Self {
            kind,
            site,
            flow: DataFlow::default(),
            globals: FxHashSet::default(),
            extra_read: FxHashSet::default(),
            extra_write: FxHashSet::default(),
            dedup_by_id: FxHashMap::default(),
            dedup_by_symbol: FxHashMap::default(),
            continue_label: None,
            control_options: ControlOptions::empty(),
            lhs: SymbolId::NONE,
            labels: FxHashSet::default(),
            utility_goto_labels: FxHashSet::default(),
            switch_labels: FxHashMap::default(),
            switch_default_label: None,
        }
    }

    /// Whether the symbol is read anywhere in the region (including the
    /// constructor-supplementary set).
    #[must_use]
    pub fn is_read(&self, sym: SymbolId) -> bool {
        self.extra_read.contains(&sym) || self.flow.read_inside.contains(&sym)
    }

    /// Whether the symbol is written anywhere in the region (including the
    /// constructor-supplementary set).
    #[must_use]
    pub fn is_written(&self, sym: SymbolId) -> bool {
        self.extra_write.contains(&sym) || self.flow.written_inside.contains(&sym)
    }
}

/// A type declaration in progress.
#[derive(Debug)]
pub struct TypeScope {
    pub symbol: SymbolId,
    pub globals: FxHashSet<String>,
    /// Member declarations emitted as file-level locals, in declaration
    /// order, with a flag marking whether the local has been pre-declared.
    pub promoted_decls: IndexMap<NodeIndex, bool>,
    pub promoted_symbols: FxHashSet<SymbolId>,
    /// Symbol -> declaration node, for dependency pre-declaration.
    pub promoted_by_symbol: FxHashMap<SymbolId, NodeIndex>,
}

impl TypeScope {
    #[must_use]
    pub fn new(symbol: SymbolId) -> Self {
        Self {
            symbol,
            globals: FxHashSet::default(),
            promoted_decls: IndexMap::new(),
            promoted_symbols: FxHashSet::default(),
            promoted_by_symbol: FxHashMap::default(),
        }
    }

    /// Register a member declaration for promotion.
    pub fn promote(&mut self, decl: NodeIndex, sym: SymbolId) {
        self.promoted_decls.insert(decl, false);
        self.promoted_symbols.insert(sym);
        self.promoted_by_symbol.insert(sym, decl);
    }
}

/// The block-scope and type-scope stacks.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<BlockScope>,
    type_frames: Vec<TypeScope>,
    lhs_stack: Vec<SymbolId>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn type_depth(&self) -> usize {
        self.type_frames.len()
    }

    // =========================================================================
    // Block scopes
    // =========================================================================

    /// Push a prepared frame and run the top-frame dedup pass.
    pub fn push_block(&mut self, mut frame: BlockScope, model: &SemanticModel) -> EmitResult {
        self.dedup_top(&mut frame, model)?;
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the top frame, checking the expected kind.
    pub fn pop_block(&mut self, kind: ScopeKind) -> EmitResult<BlockScope> {
        match self.frames.pop() {
            Some(frame) if frame.kind == kind => Ok(frame),
            Some(frame) => Err(EmitError::internal(
                frame.site,
                format!("popped scope of kind {:?}, expected {:?}", frame.kind, kind),
            )),
            None => Err(EmitError::internal(
                NodeIndex::NONE,
                "popped an empty scope stack",
            )),
        }
    }

    #[must_use]
    pub fn top(&self) -> Option<&BlockScope> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut BlockScope> {
        self.frames.last_mut()
    }

    /// Frames from innermost to outermost.
    pub fn frames(&self) -> impl Iterator<Item = &BlockScope> {
        self.frames.iter().rev()
    }

    /// Run the dedup pass for a frame about to be pushed: every declared
    /// variable and every inflowing parameter is checked against the live
    /// maps, the globals, and the reserved vocabulary.
    fn dedup_top(&self, frame: &mut BlockScope, model: &SemanticModel) -> EmitResult {
        let mut pending: Vec<SymbolId> = Vec::new();
        for &sym in &frame.flow.variables_declared {
            pending.push(sym);
        }
        for &sym in &frame.flow.data_flows_in {
            if model.symbol_kind(sym) == Some(SymbolKind::Parameter) {
                pending.push(sym);
            }
        }
        for sym in pending {
            let base = model.output_id(sym).to_string();
            if base.is_empty() {
                continue;
            }
            if !self.collides(&base, frame) {
                frame.dedup_by_id.insert(base, sym);
                continue;
            }
            let renamed = self.smallest_free_suffix(&base, frame, frame.site)?;
            frame.dedup_by_id.insert(renamed.clone(), sym);
            frame.dedup_by_symbol.insert(sym, renamed);
        }
        Ok(())
    }

    fn collides(&self, name: &str, pending: &BlockScope) -> bool {
        if vocab::is_reserved(name) {
            return true;
        }
        if pending.dedup_by_id.contains_key(name) || pending.globals.contains(name) {
            return true;
        }
        self.frames
            .iter()
            .any(|f| f.dedup_by_id.contains_key(name) || f.globals.contains(name))
    }

    fn smallest_free_suffix(
        &self,
        base: &str,
        pending: &BlockScope,
        site: NodeIndex,
    ) -> EmitResult<String> {
        for n in 0..limits::MAX_DEDUP_SUFFIX {
            let candidate = format!("{base}{n}");
            if !self.collides(&candidate, pending) {
                return Ok(candidate);
            }
        }
        Err(EmitError::compilation(
            site,
            format!("unable to allocate a non-colliding name for `{base}`"),
        ))
    }

    /// The emitted identifier for a symbol: the innermost rename, if any.
    #[must_use]
    pub fn resolve_output_id(&self, sym: SymbolId) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.dedup_by_symbol.get(&sym).map(String::as_str))
    }

    /// Whether a symbol was promoted to a file-level local in any open type
    /// scope.
    #[must_use]
    pub fn is_promoted(&self, sym: SymbolId) -> bool {
        self.type_frames
            .iter()
            .any(|t| t.promoted_symbols.contains(&sym))
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Record a user label on the innermost label-owning frame, deduping
    /// against labels already defined there.
    pub fn define_label(&mut self, name: &str) -> String {
        let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.kind.owns_labels())
        else {
            return name.to_string();
        };
        let mut chosen = name.to_string();
        let mut n = 0u32;
        while frame.labels.contains(&chosen) || frame.utility_goto_labels.contains(&chosen) {
            chosen = format!("{name}{n}");
            n += 1;
        }
        frame.labels.insert(chosen.clone());
        chosen
    }

    /// Allocate a synthesized goto label on the innermost label-owning
    /// frame, starting from `base` then `base0`, `base1`, ...
    pub fn alloc_utility_label(&mut self, base: &str) -> String {
        let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.kind.owns_labels())
        else {
            return base.to_string();
        };
        let taken = |frame: &BlockScope, name: &str| {
            frame.labels.contains(name) || frame.utility_goto_labels.contains(name)
        };
        let mut chosen = base.to_string();
        let mut n = 0u32;
        while taken(frame, &chosen) {
            chosen = format!("{base}{n}");
            n += 1;
        }
        frame.utility_goto_labels.insert(chosen.clone());
        chosen
    }

    /// On first encountering `continue` inside a loop: walk outward to the
    /// nearest loop and allocate its continue label if empty.
    pub fn ensure_continue_label(&mut self) -> Option<String> {
        let loop_pos = self.frames.iter().rposition(|f| f.kind == ScopeKind::Loop)?;
        if let Some(existing) = &self.frames[loop_pos].continue_label {
            return Some(existing.clone());
        }
        let label = self.alloc_utility_label(vocab::CONTINUE_LABEL_BASE);
        self.frames[loop_pos].continue_label = Some(label.clone());
        Some(label)
    }

    // =========================================================================
    // Control options
    // =========================================================================

    /// Try/using frames crossed when transferring control out to the
    /// nearest loop or switch. Empty when no such frame intervenes.
    #[must_use]
    pub fn protected_frames_to_loop(&self) -> Vec<usize> {
        let mut crossed = Vec::new();
        for (pos, frame) in self.frames.iter().enumerate().rev() {
            match frame.kind {
                ScopeKind::TryOrUsing => crossed.push(pos),
                ScopeKind::Loop | ScopeKind::Switch => return crossed,
                _ => {}
            }
        }
        crossed
    }

    /// Try/using frames crossed when returning from the current function.
    #[must_use]
    pub fn protected_frames_to_function(&self) -> Vec<usize> {
        let mut crossed = Vec::new();
        for (pos, frame) in self.frames.iter().enumerate().rev() {
            match frame.kind {
                ScopeKind::TryOrUsing => crossed.push(pos),
                k if k.owns_labels() => return crossed,
                _ => {}
            }
        }
        crossed
    }

    /// Record a control option on the innermost try/using frame.
    pub fn record_control_option(&mut self, option: ControlOptions) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.kind == ScopeKind::TryOrUsing)
        {
            frame.control_options |= option;
        }
    }

    /// Whether a break/continue from the current position crosses a
    /// try/using frame before reaching a loop or switch.
    #[must_use]
    pub fn crosses_protected_region_to_loop(&self) -> bool {
        !self.protected_frames_to_loop().is_empty()
    }

    /// Whether a return from the current position crosses a try/using frame.
    #[must_use]
    pub fn crosses_protected_region_to_function(&self) -> bool {
        !self.protected_frames_to_function().is_empty()
    }

    /// The continue label of the nearest loop, if already allocated.
    #[must_use]
    pub fn nearest_loop_continue_label(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.kind == ScopeKind::Loop)
            .and_then(|f| f.continue_label.as_deref())
    }

    // =========================================================================
    // LHS accessor tracking
    // =========================================================================

    pub fn push_lhs(&mut self, accessor: SymbolId) {
        self.lhs_stack.push(accessor);
    }

    pub fn pop_lhs(&mut self) {
        self.lhs_stack.pop();
    }

    /// The setter/adder/remover currently in effect, across frames.
    #[must_use]
    pub fn current_lhs(&self) -> SymbolId {
        self.lhs_stack.last().copied().unwrap_or(SymbolId::NONE)
    }

    // =========================================================================
    // Type scopes
    // =========================================================================

    pub fn push_type(&mut self, frame: TypeScope) {
        self.type_frames.push(frame);
    }

    pub fn pop_type(&mut self) -> EmitResult<TypeScope> {
        self.type_frames.pop().ok_or_else(|| {
            EmitError::internal(NodeIndex::NONE, "popped an empty type scope stack")
        })
    }

    #[must_use]
    pub fn current_type(&self) -> Option<&TypeScope> {
        self.type_frames.last()
    }

    pub fn current_type_mut(&mut self) -> Option<&mut TypeScope> {
        self.type_frames.last_mut()
    }

    /// The outermost type scope of the unit (promotion happens there only).
    #[must_use]
    pub fn outermost_type(&self) -> Option<&TypeScope> {
        self.type_frames.first()
    }

    pub fn outermost_type_mut(&mut self) -> Option<&mut TypeScope> {
        self.type_frames.first_mut()
    }

    /// Type frames from outermost to innermost.
    pub fn type_frames(&self) -> impl Iterator<Item = &TypeScope> {
        self.type_frames.iter()
    }

    /// Whether a name is already claimed anywhere (reserved vocabulary,
    /// any frame's claims, or any frame's globals).
    #[must_use]
    pub fn is_taken(&self, name: &str) -> bool {
        vocab::is_reserved(name)
            || self
                .frames
                .iter()
                .any(|f| f.dedup_by_id.contains_key(name) || f.globals.contains(name))
    }

    /// Claim a synthesized name on the top frame, suffixing until free.
    pub fn claim_name(&mut self, base: &str) -> String {
        let mut chosen = base.to_string();
        let mut n = 0u32;
        while self.is_taken(&chosen) {
            chosen = format!("{base}{n}");
            n += 1;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.dedup_by_id.insert(chosen.clone(), SymbolId::NONE);
        }
        chosen
    }

    /// Claim a symbol's name on the top frame, deduping on collision, and
    /// record the rename so later references resolve to it.
    pub fn claim_symbol(&mut self, sym: SymbolId, model: &SemanticModel) -> String {
        if let Some(existing) = self.resolve_output_id(sym) {
            return existing.to_string();
        }
        // The dedup pass may already have claimed the symbol's own name.
        for frame in self.frames.iter().rev() {
            if let Some((name, _)) = frame.dedup_by_id.iter().find(|&(_, &owner)| owner == sym) {
                return name.clone();
            }
        }
        let base = model.output_id(sym).to_string();
        if !self.is_taken(&base) {
            if let Some(frame) = self.frames.last_mut() {
                frame.dedup_by_id.insert(base.clone(), sym);
            }
            return base;
        }
        let chosen = self.claim_name(&base);
        if let Some(frame) = self.frames.last_mut() {
            frame.dedup_by_id.insert(chosen.clone(), sym);
            frame.dedup_by_symbol.insert(sym, chosen.clone());
        }
        chosen
    }

    /// The innermost switch frame, for goto-case resolution.
    #[must_use]
    pub fn nearest_switch(&self) -> Option<&BlockScope> {
        self.frames.iter().rev().find(|f| f.kind == ScopeKind::Switch)
    }

    /// Snapshot the innermost label-owning frame's synthesized labels, so a
    /// dry-run traversal can be rolled back before the real pass repeats
    /// the same allocations.
    #[must_use]
    pub fn utility_label_snapshot(&self) -> Option<(usize, FxHashSet<String>)> {
        self.frames
            .iter()
            .rposition(|f| f.kind.owns_labels())
            .map(|pos| (pos, self.frames[pos].utility_goto_labels.clone()))
    }

    pub fn restore_utility_labels(&mut self, snapshot: Option<(usize, FxHashSet<String>)>) {
        if let Some((pos, labels)) = snapshot {
            if let Some(frame) = self.frames.get_mut(pos) {
                frame.utility_goto_labels = labels;
            }
        }
    }

    /// Record the chosen name for a label symbol on the label-owning frame.
    pub fn record_label_symbol(&mut self, sym: SymbolId, name: String) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.kind.owns_labels())
        {
            frame.dedup_by_symbol.insert(sym, name);
        }
    }
}

#[cfg(test)]
#[path = "tests/scopes.rs"]
mod tests;
