//! `if`, `switch` and `assert`.

use rustc_hash::FxHashSet;
use tern_ast::{AssertStmt, IfStmt, SwitchStmt};
use tern_core::{CompilationError, ConstValue, DataType, FlowResult, PrimitiveKind, Span};

use super::Result;
use crate::flow::{JumpFlow, WriteStates};
use crate::resolve::{ResolveFlags, Resolver};

impl<'r> Resolver<'r> {
    pub(super) fn resolve_if(&mut self, stmt: &mut IfStmt) -> Result<FlowResult> {
        let cond = self.resolve_condition(&mut stmt.cond)?;
        let before = self.flow.clone();

        let then_flow = self.resolve_stmt(&mut stmt.then_branch)?;
        let after_then = std::mem::replace(&mut self.flow, before);

        let else_flow = match &mut stmt.else_branch {
            Some(branch) => self.resolve_stmt(branch)?,
            None => FlowResult::NO_CHANGE,
        };
        let after_else = std::mem::take(&mut self.flow);

        // a constant condition decides the write state, but the statement
        // still completes unless both branches end abruptly
        self.flow = match cond {
            Some(true) if after_then.is_alive() => after_then,
            Some(false) if after_else.is_alive() => after_else,
            _ => after_then.join(&after_else),
        };

        Ok((then_flow | else_flow) & FlowResult::HAS_SHORTCUT)
    }

    pub(super) fn resolve_switch(&mut self, stmt: &mut SwitchStmt, span: Span) -> Result<FlowResult> {
        let selector = self.resolve_expr(&mut stmt.selector, ResolveFlags::READ, None)?;
        if self.promote(&mut stmt.selector)? != Some(PrimitiveKind::Int) {
            return Err(CompilationError::TypeMismatch {
                message: format!(
                    "switch selector must be an int, found '{}'",
                    self.display(&selector.data_type)
                ),
                span: stmt.selector.span,
            });
        }

        let mut seen = FxHashSet::default();
        let mut has_default = false;
        for case in &mut stmt.cases {
            if case.is_default {
                if has_default {
                    return Err(CompilationError::Other {
                        message: "switch has more than one default label".to_string(),
                        span: case.span,
                    });
                }
                has_default = true;
            }
            for label in &mut case.labels {
                self.resolve_expr(label, ResolveFlags::READ, Some(&DataType::INT))?;
                self.coerce(label, &DataType::INT, true)?;
                let Some(ConstValue::Int(value)) = label.constant() else {
                    return Err(CompilationError::TypeMismatch {
                        message: "case label must be a constant int".to_string(),
                        span: label.span,
                    });
                };
                if !seen.insert(value) {
                    return Err(CompilationError::DuplicateCase {
                        value: value.to_string(),
                        span: label.span,
                    });
                }
            }
        }

        let selected = self.flow.clone();
        self.jumps.push(JumpFlow::new(false));
        self.scope.push_scope();

        let mut result = FlowResult::NO_CHANGE;
        let mut fallthrough = WriteStates::dead();
        let mut body = Ok(());
        for case in &mut stmt.cases {
            self.flow = selected.join(&fallthrough);
            match self.resolve_stmts(&mut case.body) {
                Ok(flow) => result |= flow & FlowResult::HAS_SHORTCUT,
                Err(err) => {
                    body = Err(err);
                    break;
                }
            }
            fallthrough = std::mem::take(&mut self.flow);
        }

        self.scope.pop_scope();
        let jumps = self.jumps.pop();
        body?;
        let jumps = jumps.ok_or_else(|| CompilationError::internal(format!("switch jump frame lost at {span}")))?;

        let mut exits: Vec<&WriteStates> = jumps.breaks.iter().collect();
        exits.push(&fallthrough);
        if !has_default {
            exits.push(&selected);
        }
        self.flow = WriteStates::join_all(exits);
        Ok(result)
    }

    pub(super) fn resolve_assert(&mut self, stmt: &mut AssertStmt) -> Result<FlowResult> {
        let before = self.flow.clone();
        self.resolve_condition(&mut stmt.cond)?;
        if let Some(message) = &mut stmt.message {
            self.resolve_expr(message, ResolveFlags::READ, None)?;
        }
        // assertions may be compiled out, so nothing they write counts
        let after = std::mem::replace(&mut self.flow, before);
        self.flow = self.flow.join(&after);
        Ok(FlowResult::NO_CHANGE)
    }
}
