//! Local scope management for method compilation.
//!
//! This module provides `LocalScope` for tracking locals while a method body
//! is resolved. It handles:
//! - Variable declaration with frame slot allocation
//! - Nested block scopes, with slot reuse once a block closes
//! - Variable shadowing with proper restoration on scope exit
//! - Hidden temporaries for lowered statements (`for` over arrays,
//!   `synchronized`, `try`)

use rustc_hash::FxHashMap;
use tern_ast::LocalSlot;
use tern_core::{CompilationError, DataType, LocalId, Span, StorageClass};

// ============================================================================
// Types
// ============================================================================

/// Information about a local variable or parameter.
#[derive(Debug, Clone)]
pub struct LocalVar {
    /// Variable name
    pub name: String,
    /// Variable type
    pub data_type: DataType,
    /// Identity and frame position
    pub slot: LocalSlot,
    /// `Local` or `Parameter`
    pub storage: StorageClass,
    /// Scope depth where declared
    pub depth: u32,
    /// Loop nesting at the declaration
    pub loop_depth: u32,
    pub is_final: bool,
    /// Source location of declaration
    pub span: Span,
}

// ============================================================================
// LocalScope
// ============================================================================

/// Locals of the method being resolved.
#[derive(Debug)]
pub struct LocalScope {
    /// Variables by name in current scope chain
    variables: FxHashMap<String, LocalVar>,

    /// Current scope depth (0 = method scope)
    scope_depth: u32,

    /// Stack of shadowed variables (shadowing_depth, name, old_var)
    shadowed: Vec<(u32, String, LocalVar)>,

    /// First free word at each open scope, restored when it closes.
    saved_words: Vec<u32>,

    /// Next free frame word
    next_word: u32,

    /// Maximum frame words in use at any point
    max_words: u32,

    /// Words taken by parameters so far
    param_words: u32,

    next_id: u32,
}

impl LocalScope {
    /// Create a new local scope for a method.
    pub fn new() -> Self {
        Self {
            variables: FxHashMap::default(),
            scope_depth: 0,
            shadowed: Vec::new(),
            saved_words: Vec::new(),
            next_word: 0,
            max_words: 0,
            param_words: 0,
            next_id: 0,
        }
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a new scope (block, loop body, catch clause, etc.).
    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
        self.saved_words.push(self.next_word);
    }

    /// Exit the current scope, removing variables declared in it.
    pub fn pop_scope(&mut self) {
        self.variables.retain(|_, var| var.depth < self.scope_depth);

        while let Some((shadowing_depth, _, _)) = self.shadowed.last() {
            if *shadowing_depth != self.scope_depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        // Words of the closed block are free again; max_words keeps the peak.
        if let Some(words) = self.saved_words.pop() {
            self.next_word = words;
        }
        self.scope_depth = self.scope_depth.saturating_sub(1);
    }

    /// Get current scope depth.
    pub fn depth(&self) -> u32 {
        self.scope_depth
    }

    // ==========================================================================
    // Variable Declaration
    // ==========================================================================

    /// Declare a new local variable of `words` frame words.
    ///
    /// Returns an error if the name is already declared at the same depth.
    pub fn declare(
        &mut self,
        name: &str,
        data_type: DataType,
        words: u32,
        is_final: bool,
        loop_depth: u32,
        span: Span,
    ) -> Result<LocalSlot, CompilationError> {
        if let Some(existing) = self.variables.get(name) {
            if existing.depth == self.scope_depth {
                return Err(CompilationError::VariableRedeclaration {
                    name: name.to_string(),
                    original_span: existing.span,
                    new_span: span,
                });
            }
            self.shadowed
                .push((self.scope_depth, name.to_string(), existing.clone()));
        }

        let slot = self.alloc_temp(words);
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                data_type,
                slot,
                storage: StorageClass::Local,
                depth: self.scope_depth,
                loop_depth,
                is_final,
                span,
            },
        );
        Ok(slot)
    }

    /// Declare a method parameter. Parameters live below the frame base.
    pub fn declare_param(
        &mut self,
        name: &str,
        data_type: DataType,
        words: u32,
        span: Span,
    ) -> Result<LocalSlot, CompilationError> {
        if let Some(existing) = self.variables.get(name) {
            return Err(CompilationError::VariableRedeclaration {
                name: name.to_string(),
                original_span: existing.span,
                new_span: span,
            });
        }

        self.param_words += words;
        let slot = LocalSlot {
            id: self.fresh_id(),
            offset: -(self.param_words as i32),
        };
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                data_type,
                slot,
                storage: StorageClass::Parameter,
                depth: 0,
                loop_depth: 0,
                is_final: false,
                span,
            },
        );
        Ok(slot)
    }

    /// Reserve `words` frame words for a hidden temporary of the current scope.
    pub fn alloc_temp(&mut self, words: u32) -> LocalSlot {
        let offset = self.next_word as i32;
        self.next_word += words.max(1);
        self.max_words = self.max_words.max(self.next_word);
        LocalSlot {
            id: self.fresh_id(),
            offset,
        }
    }

    fn fresh_id(&mut self) -> LocalId {
        let id = LocalId(self.next_id);
        self.next_id += 1;
        id
    }

    // ==========================================================================
    // Variable Lookup
    // ==========================================================================

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    /// Iterate over all variables in scope.
    pub fn iter(&self) -> impl Iterator<Item = &LocalVar> {
        self.variables.values()
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    /// Frame words needed by locals and temporaries.
    pub fn frame_words(&self) -> u32 {
        self.max_words
    }

    pub fn param_words(&self) -> u32 {
        self.param_words
    }
}

impl Default for LocalScope {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
