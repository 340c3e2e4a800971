//! Definite-assignment state carried through a method body.
//!
//! A [`WriteStates`] maps each tracked variable (locals, and the blank final
//! fields of the class under construction) to a [`WriteState`]. States are
//! copied at every branch and joined where paths meet. A path that cannot
//! complete (after `return`, `throw`, `break` or `continue`) is *dead*: it is
//! neutral in a join, since nothing flows out of it.

use rustc_hash::FxHashMap;
use tern_core::{LocalId, TypeHash, WriteState};

/// A variable whose writes are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKey {
    Local(LocalId),
    /// Instance field of the class being constructed.
    Field(TypeHash),
}

/// Write state of every tracked variable on one path.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteStates {
    states: FxHashMap<VarKey, WriteState>,
    alive: bool,
}

impl Default for WriteStates {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteStates {
    /// A live path with nothing written.
    pub fn new() -> Self {
        Self {
            states: FxHashMap::default(),
            alive: true,
        }
    }

    /// A path that never completes.
    pub fn dead() -> Self {
        Self {
            states: FxHashMap::default(),
            alive: false,
        }
    }

    pub fn get(&self, key: VarKey) -> WriteState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    pub fn write(&mut self, key: VarKey) {
        self.states.insert(key, WriteState::Definitely);
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Mark this path as never completing.
    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Whether reads of `key` are safe: written on every path, or the path
    /// is dead.
    pub fn is_definite(&self, key: VarKey) -> bool {
        !self.alive || self.get(key).is_definite()
    }

    /// State where this path and `other` meet.
    pub fn join(&self, other: &WriteStates) -> WriteStates {
        if !self.alive {
            return other.clone();
        }
        if !other.alive {
            return self.clone();
        }
        let mut states = FxHashMap::default();
        for key in self.states.keys().chain(other.states.keys()) {
            states.insert(*key, self.get(*key).join(other.get(*key)));
        }
        WriteStates { states, alive: true }
    }

    /// Join of several paths; dead if there are none.
    pub fn join_all<'a>(paths: impl IntoIterator<Item = &'a WriteStates>) -> WriteStates {
        paths
            .into_iter()
            .fold(WriteStates::dead(), |acc, path| acc.join(path))
    }

    /// Apply the definite writes of a path that always runs afterwards,
    /// such as a `finally` block.
    pub fn overlay_definite(&mut self, after: &WriteStates) {
        for (key, state) in &after.states {
            if state.is_definite() {
                self.states.insert(*key, WriteState::Definitely);
            }
        }
    }
}

/// Paths leaving a loop or switch early.
#[derive(Debug, Clone)]
pub struct JumpFlow {
    /// `continue` applies here; switches only take `break`.
    pub is_loop: bool,
    pub breaks: Vec<WriteStates>,
    pub continues: Vec<WriteStates>,
}

impl JumpFlow {
    pub fn new(is_loop: bool) -> Self {
        Self {
            is_loop,
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }
}
