//! `return`, `break`, `continue` and `throw`.

use tern_ast::Expr;
use tern_core::{CompilationError, FlowResult, Span};

use super::Result;
use crate::resolve::{ResolveFlags, Resolver};

impl<'r> Resolver<'r> {
    pub(super) fn resolve_return(&mut self, value: Option<&mut Expr>, span: Span) -> Result<FlowResult> {
        let return_type = self.method.return_type;
        let returns_value = !return_type.is_void() && !self.is_constructor();

        match value {
            Some(value) if returns_value => {
                self.resolve_expr(value, ResolveFlags::READ, Some(&return_type))?;
                self.coerce(value, &return_type, true)?;
            }
            Some(value) => {
                return Err(CompilationError::TypeMismatch {
                    message: format!("'{}' cannot return a value", self.method.name),
                    span: value.span,
                });
            }
            None if returns_value => {
                return Err(CompilationError::TypeMismatch {
                    message: format!(
                        "'{}' must return a value of type '{}'",
                        self.method.name,
                        self.display(&return_type)
                    ),
                    span,
                });
            }
            None => {}
        }

        self.check_finals_written(span)?;
        self.flow.kill();
        Ok(FlowResult::NEXT_UNREACHABLE | FlowResult::HAS_SHORTCUT)
    }

    pub(super) fn resolve_break(&mut self, span: Span) -> Result<FlowResult> {
        let state = self.flow.clone();
        let target = self
            .jumps
            .last_mut()
            .ok_or(CompilationError::InvalidJump { keyword: "break", span })?;
        target.breaks.push(state);
        self.flow.kill();
        Ok(FlowResult::NEXT_UNREACHABLE | FlowResult::HAS_SHORTCUT)
    }

    pub(super) fn resolve_continue(&mut self, span: Span) -> Result<FlowResult> {
        let state = self.flow.clone();
        let target = self
            .jumps
            .iter_mut()
            .rev()
            .find(|jump| jump.is_loop)
            .ok_or(CompilationError::InvalidJump {
                keyword: "continue",
                span,
            })?;
        target.continues.push(state);
        self.flow.kill();
        Ok(FlowResult::NEXT_UNREACHABLE | FlowResult::HAS_SHORTCUT)
    }

    pub(super) fn resolve_throw(&mut self, value: &mut Expr, span: Span) -> Result<FlowResult> {
        let thrown = self.resolve_expr(value, ResolveFlags::READ, None)?.data_type;
        let throwable = thrown
            .class_hash()
            .filter(|hash| !thrown.is_array() && self.ctx.registry.is_throwable(*hash));
        if throwable.is_none() {
            return Err(CompilationError::TypeMismatch {
                message: format!("cannot throw '{}': not a throwable class", self.display(&thrown)),
                span,
            });
        }
        self.flow.kill();
        Ok(FlowResult::NEXT_UNREACHABLE)
    }
}
