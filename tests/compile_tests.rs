//! Integration tests for the whole pipeline: registry, resolve and code
//! generation of complete method bodies through `compile_unit`.

use tern::ast::{AssignOp, BinaryOp, MethodDecl, Param, Stmt, build};
use tern::prelude::*;

fn registry() -> UnitRegistry {
    let mut reg = UnitRegistry::new();
    reg.class("Object").build().unwrap();
    reg.class("Throwable").extends("Object").build().unwrap();
    reg.class("Error").extends("Throwable").build().unwrap();
    reg.class("String").extends("Object").build().unwrap();
    reg.set_throwable("Throwable").unwrap();
    reg.set_string_class("String").unwrap();

    reg.interface("Counter")
        .method("next", &[], DataType::INT)
        .build()
        .unwrap();
    reg.class("Ticker")
        .extends("Object")
        .implements("Counter")
        .field("count", DataType::INT)
        .method("next", &[], DataType::INT)
        .constructor(&[])
        .build()
        .unwrap();
    reg.class("Main")
        .extends("Object")
        .static_method("sum", &[DataType::INT.array_of()], DataType::INT)
        .static_method("main", &[DataType::INT], DataType::VOID)
        .static_method("pick", &[DataType::INT], DataType::INT)
        .build()
        .unwrap();
    reg
}

fn main_method(name: &str, params: &[DataType], body: Vec<Stmt>) -> MethodDecl {
    let main = TypeHash::from_name("Main");
    let hashes: Vec<TypeHash> = params.iter().map(|p| p.type_hash()).collect();
    let method = TypeHash::from_method(main, name, &hashes);
    let names = ["n", "m", "k"];
    let params = params.iter().zip(names).map(|(_, name)| Param::new(name)).collect();
    MethodDecl::new(main, method, params, build::block_of(body))
}

fn compile(decls: &mut [MethodDecl]) -> Result<CompiledUnit, Diagnostics> {
    compile_with(decls, CompileOptions::default())
}

fn compile_with(decls: &mut [MethodDecl], options: CompileOptions) -> Result<CompiledUnit, Diagnostics> {
    let reg = registry();
    let ctx = CompileContext::new(&reg, options, ArchConstants::ia32());
    compile_unit(&ctx, decls)
}

fn int() -> tern::ast::TypeRef {
    build::prim(PrimitiveKind::Int)
}

// =============================================================================
// Whole methods
// =============================================================================

#[test]
fn test_sum_over_array() {
    // int total = 0; for (int v : n) total += v; return total;
    let body = vec![
        build::local(int(), "total", Some(build::int(0))),
        build::for_each(
            int(),
            "v",
            build::var("n"),
            build::expr_stmt(build::compound(AssignOp::AddAssign, build::var("total"), build::var("v"))),
        ),
        build::ret(Some(build::var("total"))),
    ];
    let mut decls = [main_method("sum", &[DataType::INT.array_of()], body)];
    let unit = compile(&mut decls).unwrap();
    let code = &unit.methods[0].code;
    assert!(code.instrs().iter().any(|i| matches!(i, Instr::CondJump { cond: Cond::Ge, .. })));
    assert!(code.instrs().iter().any(|i| matches!(i, Instr::Load { addr: Addr::Indexed { .. }, .. })));
    // total, v, hidden array and index
    assert!(unit.methods[0].frame_words >= 4);
}

#[test]
fn test_interface_call_dispatch() {
    // Counter c = new Ticker(); int k = c.next();
    let body = vec![
        build::local(build::named("Counter"), "c", Some(build::new_object("Ticker", vec![]))),
        build::local(int(), "k", Some(build::method_call(build::var("c"), "next", vec![]))),
    ];
    let mut decls = [main_method("main", &[DataType::INT], body)];
    let unit = compile(&mut decls).unwrap();
    let code = &unit.methods[0].code;
    assert!(code.calls().any(|c| matches!(c, Callee::Interface { .. })));
    assert!(code.calls().any(|c| matches!(c, Callee::Runtime(Runtime::FindInterface { .. }))));
    // the interface reference is two words wide
    let call = code
        .instrs()
        .iter()
        .find_map(|i| match i {
            Instr::Call { callee: Callee::Interface { .. }, arg_words } => Some(*arg_words),
            _ => None,
        })
        .unwrap();
    assert_eq!(call, 2);
}

#[test]
fn test_exceptions_and_monitors() {
    // try { synchronized (new Ticker()) { if (n > 0) throw new Error(); } }
    // catch (Error e) { n = 1; } finally { n = 2; }
    let body = vec![build::try_stmt(
        vec![build::synchronized(
            build::new_object("Ticker", vec![]),
            vec![build::if_stmt(
                build::bin(BinaryOp::Greater, build::var("n"), build::int(0)),
                build::throw(build::new_object("Error", vec![])),
                None,
            )],
        )],
        vec![build::catch("Error", "e", vec![build::expr_stmt(build::assign(build::var("n"), build::int(1)))])],
        Some(vec![build::expr_stmt(build::assign(build::var("n"), build::int(2)))]),
    )];
    let mut decls = [main_method("main", &[DataType::INT], body)];
    let unit = compile(&mut decls).unwrap();
    let code = &unit.methods[0].code;
    let count = |routine: Runtime| code.calls().filter(|c| **c == Callee::Runtime(routine)).count();
    assert_eq!(count(Runtime::MonitorEnter), 1);
    assert_eq!(count(Runtime::MonitorExit), 1);
    // the explicit throw and one rethrow per protected region
    assert_eq!(count(Runtime::Throw), 3);
}

#[test]
fn test_switch_with_return() {
    // switch (n) { case 1: return 10; case 2: case 3: return 20; default: return 0; }
    let body = vec![build::switch(
        build::var("n"),
        vec![
            build::case(vec![build::int(1)], vec![build::ret(Some(build::int(10)))]),
            build::case(vec![build::int(2), build::int(3)], vec![build::ret(Some(build::int(20)))]),
            build::default_case(vec![build::ret(Some(build::int(0)))]),
        ],
    )];
    let mut decls = [main_method("pick", &[DataType::INT], body)];
    let unit = compile(&mut decls).unwrap();
    let results = unit.methods[0]
        .code
        .instrs()
        .iter()
        .filter(|i| matches!(i, Instr::SetResult { .. }))
        .count();
    assert_eq!(results, 3);
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn test_errors_are_collected_per_method() {
    let mut decls = [
        // reads x before any write
        main_method(
            "pick",
            &[DataType::INT],
            vec![build::local(int(), "x", None), build::ret(Some(build::var("x")))],
        ),
        main_method("main", &[DataType::INT], vec![build::expr_stmt(build::assign(build::var("y"), build::int(1)))]),
        main_method("sum", &[DataType::INT.array_of()], vec![build::ret(Some(build::int(0)))]),
    ];
    let diagnostics = compile(&mut decls).unwrap_err();
    let categories: Vec<_> = diagnostics.errors().iter().map(|e| e.category()).collect();
    assert_eq!(categories, [ErrorCategory::Flow, ErrorCategory::Type]);
}

#[test]
fn test_missing_return() {
    let mut decls = [main_method(
        "pick",
        &[DataType::INT],
        vec![build::if_stmt(
            build::bin(BinaryOp::Greater, build::var("n"), build::int(0)),
            build::ret(Some(build::int(1))),
            None,
        )],
    )];
    let diagnostics = compile(&mut decls).unwrap_err();
    assert!(matches!(diagnostics.errors()[0], CompilationError::MissingReturn { .. }));
}

#[test]
fn test_internal_error_stops_the_unit() {
    let main = TypeHash::from_name("Main");
    let mut decls = [
        MethodDecl::new(
            main,
            TypeHash::from_method(main, "missing", &[]),
            vec![],
            build::block_of(vec![]),
        ),
        main_method("pick", &[DataType::INT], vec![build::local(int(), "x", None), build::ret(Some(build::var("x")))]),
    ];
    let diagnostics = compile(&mut decls).unwrap_err();
    assert_eq!(diagnostics.errors().len(), 1);
    assert!(diagnostics.errors()[0].is_internal());
}

#[test]
fn test_constant_narrowing_warns() {
    // byte b = 300;
    let body = vec![build::local(build::prim(PrimitiveKind::Byte), "b", Some(build::int(300)))];
    let mut decls = [main_method("main", &[DataType::INT], body)];
    let unit = compile(&mut decls).unwrap();
    assert!(unit.diagnostics.has_warning(WarningKind::ValueTruncated));
    let stored = unit.methods[0].code.instrs().iter().find_map(|i| match i {
        Instr::LoadConst { value, .. } => Some(*value),
        _ => None,
    });
    assert_eq!(stored, Some(ConstValue::Int(44)));

    let mut decls = [main_method(
        "main",
        &[DataType::INT],
        vec![build::local(build::prim(PrimitiveKind::Byte), "b", Some(build::int(300)))],
    )];
    let strict = CompileOptions::default().with_warnings_as_errors(true);
    assert!(compile_with(&mut decls, strict).is_err());
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn test_checks_follow_the_options() {
    // n[0] = 1; return 0;
    let body = || {
        vec![
            build::expr_stmt(build::assign(build::index(build::var("n"), build::int(0)), build::int(1))),
            build::ret(Some(build::int(0))),
        ]
    };
    let traps = |unit: &CompiledUnit| {
        unit.methods[0]
            .code
            .calls()
            .filter(|c| matches!(c, Callee::Runtime(Runtime::NullPointer | Runtime::IndexOutOfBounds)))
            .count()
    };

    let mut decls = [main_method("sum", &[DataType::INT.array_of()], body())];
    assert_eq!(traps(&compile(&mut decls).unwrap()), 2);

    let mut decls = [main_method("sum", &[DataType::INT.array_of()], body())];
    let options = CompileOptions::default()
        .with_null_checks(false)
        .with_array_bound_checks(false);
    assert_eq!(traps(&compile_with(&mut decls, options).unwrap()), 0);
}
