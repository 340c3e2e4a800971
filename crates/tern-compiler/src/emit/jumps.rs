//! Jump targets for `break` and `continue`.
//!
//! Loops and switches push a context holding the labels their exits jump to.
//! Each context also records how many cleanups (throw frames, finally blocks,
//! monitors) were open when it was entered, so an exit knows which ones it
//! leaves.

use thiserror::Error;

use super::backend::Label;

/// Error when a jump has no enclosing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BreakError {
    #[error("break outside of a loop or switch")]
    NotInBreakable,
    #[error("continue outside of a loop")]
    NotInLoop,
}

/// Where a `break` or `continue` goes, and what it leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    pub label: Label,
    /// Cleanups open at the target; deeper ones run before the jump.
    pub cleanup_depth: usize,
}

/// Manages jump targets for control flow.
///
/// Tracks a stack of loop and switch contexts, innermost last.
#[derive(Debug, Default)]
pub struct JumpManager {
    contexts: Vec<JumpContext>,
}

#[derive(Debug)]
struct JumpContext {
    break_label: Label,
    /// `None` for a switch.
    continue_label: Option<Label>,
    cleanup_depth: usize,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_loop(&mut self, break_label: Label, continue_label: Label, cleanup_depth: usize) {
        self.contexts.push(JumpContext {
            break_label,
            continue_label: Some(continue_label),
            cleanup_depth,
        });
    }

    pub fn enter_switch(&mut self, break_label: Label, cleanup_depth: usize) {
        self.contexts.push(JumpContext {
            break_label,
            continue_label: None,
            cleanup_depth,
        });
    }

    /// Leave the innermost loop or switch.
    pub fn exit(&mut self) {
        self.contexts.pop();
    }

    pub fn break_target(&self) -> Result<JumpTarget, BreakError> {
        self.contexts
            .last()
            .map(|ctx| JumpTarget {
                label: ctx.break_label,
                cleanup_depth: ctx.cleanup_depth,
            })
            .ok_or(BreakError::NotInBreakable)
    }

    /// The innermost loop; switches are skipped.
    pub fn continue_target(&self) -> Result<JumpTarget, BreakError> {
        self.contexts
            .iter()
            .rev()
            .find_map(|ctx| {
                ctx.continue_label.map(|label| JumpTarget {
                    label,
                    cleanup_depth: ctx.cleanup_depth,
                })
            })
            .ok_or(BreakError::NotInLoop)
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_has_no_targets() {
        let manager = JumpManager::new();
        assert_eq!(manager.depth(), 0);
        assert_eq!(manager.break_target(), Err(BreakError::NotInBreakable));
        assert_eq!(manager.continue_target(), Err(BreakError::NotInLoop));
    }

    #[test]
    fn nested_loops() {
        let mut manager = JumpManager::new();
        manager.enter_loop(Label(1), Label(2), 0);
        manager.enter_loop(Label(3), Label(4), 1);

        assert_eq!(manager.continue_target().map(|t| t.label), Ok(Label(4)));
        assert_eq!(manager.break_target().map(|t| t.cleanup_depth), Ok(1));

        manager.exit();
        assert_eq!(manager.continue_target().map(|t| t.label), Ok(Label(2)));
    }

    #[test]
    fn continue_skips_switches() {
        let mut manager = JumpManager::new();
        manager.enter_loop(Label(1), Label(2), 0);
        manager.enter_switch(Label(5), 0);

        assert_eq!(manager.break_target().map(|t| t.label), Ok(Label(5)));
        assert_eq!(manager.continue_target().map(|t| t.label), Ok(Label(2)));
    }

    #[test]
    fn exit_empty_is_harmless() {
        let mut manager = JumpManager::new();
        manager.exit();
        assert_eq!(manager.depth(), 0);
    }
}
