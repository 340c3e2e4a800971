//! Expression resolution.
//!
//! Each node kind lives in its own submodule as a free function taking the
//! [`Resolver`]; [`Resolver::resolve_expr`] dispatches on the node and stores
//! the resulting [`ExprInfo`] on it.

mod assignment;
mod binary;
mod calls;
mod cast;
mod identifiers;
mod intrinsics;
mod literals;
mod member;
mod ternary;
mod unary;

pub(crate) use calls::instance_dispatch;

use tern_ast::{Expr, ExprInfo, ExprKind};
use tern_core::{CompilationError, DataType};

use super::{ResolveFlags, Resolver};

type Result<T> = std::result::Result<T, CompilationError>;

impl<'r> Resolver<'r> {
    /// Resolve `expr` in place and return its annotation.
    ///
    /// `preferred` is a hint for literal typing: it decides the pointer width
    /// of `null` and which side of a ternary the other converts to.
    pub fn resolve_expr(
        &mut self,
        expr: &mut Expr,
        flags: ResolveFlags,
        preferred: Option<&DataType>,
    ) -> Result<ExprInfo> {
        self.enter(expr.span)?;
        let result = self.resolve_expr_kind(expr, flags, preferred);
        self.leave();
        let info = result?;

        if info.data_type.is_void() && !flags.contains(ResolveFlags::STATEMENT) {
            return Err(CompilationError::TypeMismatch {
                message: "a void value cannot be used in an expression".to_string(),
                span: expr.span,
            });
        }
        expr.info = Some(info);
        Ok(info)
    }

    fn resolve_expr_kind(
        &mut self,
        expr: &mut Expr,
        flags: ResolveFlags,
        preferred: Option<&DataType>,
    ) -> Result<ExprInfo> {
        let span = expr.span;
        let previous = expr.info;
        match &mut expr.kind {
            ExprKind::Literal(lit) => literals::resolve_literal(self, lit, span, preferred),
            ExprKind::Var(var) => identifiers::resolve_var(self, var, span, flags),
            ExprKind::This => identifiers::resolve_this(self, span),
            ExprKind::Binary(bin) => binary::resolve_binary(self, bin, span),
            ExprKind::Unary(un) => unary::resolve_unary(self, un, span),
            ExprKind::Postfix(post) => unary::resolve_postfix(self, post, span),
            ExprKind::Assign(assign) => assignment::resolve_assign(self, assign, span),
            ExprKind::Ternary(ternary) => ternary::resolve_ternary(self, ternary, span, preferred),
            ExprKind::Call(call) => calls::resolve_call(self, call, span),
            ExprKind::New(new) => calls::resolve_new(self, new, span),
            ExprKind::Deref(deref) => member::resolve_deref(self, deref, span, flags),
            ExprKind::Index(index) => member::resolve_index(self, index, span),
            ExprKind::Cast(cast) => cast::resolve_cast(self, cast, span),
            ExprKind::Convert(convert) => cast::resolve_convert(self, convert, previous, span),
            ExprKind::InstanceOf(test) => cast::resolve_instance_of(self, test, span),
            ExprKind::Enclosure(inner) => self.resolve_expr(inner, flags, preferred),
            ExprKind::Intrinsic(call) => intrinsics::resolve_intrinsic(self, call, span),
        }
    }

    /// Resolve `expr` as a condition.
    pub(crate) fn resolve_condition(&mut self, expr: &mut Expr) -> Result<Option<bool>> {
        self.resolve_expr(expr, ResolveFlags::READ, Some(&DataType::BOOL))?;
        self.coerce(expr, &DataType::BOOL, false)?;
        Ok(expr.constant().and_then(|value| value.as_bool()))
    }

    /// Type of the root class, for conversions of interface references to
    /// plain object pointers.
    pub(crate) fn root_type(&self, span: tern_core::Span) -> Result<DataType> {
        self.ctx
            .root_class()
            .map(DataType::class)
            .ok_or_else(|| CompilationError::Other {
                message: "no root class: the unit registry has no throwable type".to_string(),
                span,
            })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixture registry and a resolver over a throwaway method.

    use tern_ast::{MethodDecl, Param, build};
    use tern_core::{ArraySpecial, ConstValue, DataType, Modifiers, TypeHash};
    use tern_registry::UnitRegistry;

    use crate::context::CompileContext;
    use crate::options::{ArchConstants, CompileOptions};
    use crate::resolve::Resolver;

    pub fn registry() -> UnitRegistry {
        let mut reg = UnitRegistry::new();
        reg.class("Object")
            .method("hashCode", &[], DataType::INT)
            .build()
            .unwrap();
        reg.class("Throwable").extends("Object").build().unwrap();
        reg.class("Error").extends("Throwable").build().unwrap();
        reg.class("String").extends("Object").build().unwrap();
        reg.interface("Shape")
            .method("area", &[], DataType::INT)
            .build()
            .unwrap();
        reg.class("Box")
            .extends("Object")
            .implements("Shape")
            .field("width", DataType::INT)
            .field_with("height", DataType::INT, Modifiers::FINAL)
            .field("data", DataType::INT.array_of())
            .field("buf", DataType::BYTE.array_of().with_special(ArraySpecial::Inline(4)))
            .field_with("count", DataType::INT, Modifiers::STATIC)
            .constant("SIZE", DataType::INT, ConstValue::Int(16))
            .method("area", &[], DataType::INT)
            .method("scale", &[DataType::INT], DataType::VOID)
            .static_method("make", &[DataType::INT], DataType::class(TypeHash::from_name("Box")))
            .constructor(&[DataType::INT])
            .build()
            .unwrap();
        reg.class("Big").extends("Box").build().unwrap();
        reg.class("Plain").extends("Object").field("v", DataType::LONG).build().unwrap();
        reg.class("Cursor")
            .extends("Object")
            .method("hasNext", &[], DataType::BOOL)
            .method("next", &[], DataType::class(TypeHash::from_name("Object")))
            .build()
            .unwrap();
        reg.set_throwable("Throwable").unwrap();
        reg.set_string_class("String").unwrap();

        reg.class("Main")
            .extends("Object")
            .static_method("run", &[DataType::INT], DataType::VOID)
            .method("work", &[DataType::INT], DataType::INT)
            .build()
            .unwrap();
        reg
    }

    pub fn ctx(reg: &UnitRegistry) -> CompileContext<'_> {
        CompileContext::new(reg, CompileOptions::default(), ArchConstants::ia32())
    }

    /// Resolver inside `Main.work(int n)`.
    pub fn instance_resolver<'r>(ctx: &CompileContext<'r>) -> Resolver<'r> {
        let main = TypeHash::from_name("Main");
        let work = TypeHash::from_method(main, "work", &[DataType::INT.type_hash()]);
        let decl = MethodDecl::new(main, work, vec![Param::new("n")], build::block_of(vec![]));
        Resolver::new(ctx, &decl).unwrap()
    }

    /// Resolver inside `static Main.run(int n)`.
    pub fn static_resolver<'r>(ctx: &CompileContext<'r>) -> Resolver<'r> {
        let main = TypeHash::from_name("Main");
        let run = TypeHash::from_method(main, "run", &[DataType::INT.type_hash()]);
        let decl = MethodDecl::new(main, run, vec![Param::new("n")], build::block_of(vec![]));
        Resolver::new(ctx, &decl).unwrap()
    }

    /// Resolver inside the `Box(int w)` constructor, which has to write the
    /// blank final `height`.
    pub fn ctor_resolver<'r>(ctx: &CompileContext<'r>) -> Resolver<'r> {
        let owner = TypeHash::from_name("Box");
        let ctor = TypeHash::from_constructor(owner, &[DataType::INT.type_hash()]);
        let decl = MethodDecl::new(owner, ctor, vec![Param::new("w")], build::block_of(vec![]));
        Resolver::new(ctx, &decl).unwrap()
    }
}
