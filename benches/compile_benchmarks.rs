//! Performance benchmarks for resolve and code generation.
//!
//! Workloads are built with the AST builders, so only the compiler itself
//! is measured:
//! - Expressions: long arithmetic chains under register pressure
//! - Control flow: nested loops with conditions
//! - Exceptions: nested try/finally regions with early exits
//!
//! ```bash
//! cargo bench --bench compile_benchmarks
//! ```

use std::hint::black_box;

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use tern::ast::{BinaryOp, MethodDecl, Param, Stmt, build};
use tern::prelude::*;

fn registry() -> UnitRegistry {
    let mut reg = UnitRegistry::new();
    reg.class("Object").build().unwrap();
    reg.class("Throwable").extends("Object").build().unwrap();
    reg.set_throwable("Throwable").unwrap();
    reg.class("Bench")
        .extends("Object")
        .static_method("run", &[DataType::INT], DataType::INT)
        .build()
        .unwrap();
    reg
}

fn method(body: Vec<Stmt>) -> MethodDecl {
    let owner = TypeHash::from_name("Bench");
    let run = TypeHash::from_method(owner, "run", &[DataType::INT.type_hash()]);
    MethodDecl::new(owner, run, vec![Param::new("n")], build::block_of(body))
}

/// `return n * (n + (n * (n + ...)));`
fn arithmetic(depth: usize) -> Vec<Stmt> {
    let mut expr = build::var("n");
    for i in 0..depth {
        let op = if i % 2 == 0 { BinaryOp::Add } else { BinaryOp::Mul };
        expr = build::bin(op, build::var("n"), build::paren(expr));
    }
    vec![build::ret(Some(expr))]
}

/// Nested counting loops summing into `total`.
fn loops(depth: usize) -> Vec<Stmt> {
    let int = || build::prim(PrimitiveKind::Int);
    let mut body = build::expr_stmt(build::compound(
        tern::ast::AssignOp::AddAssign,
        build::var("total"),
        build::var("n"),
    ));
    for level in 0..depth {
        let name = format!("i{level}");
        body = build::for_stmt(
            vec![build::local(int(), &name, Some(build::int(0)))],
            Some(build::bin(BinaryOp::Less, build::var(&name), build::var("n"))),
            vec![build::postfix(tern::ast::PostfixOp::PostInc, build::var(&name))],
            body,
        );
    }
    vec![
        build::local(int(), "total", Some(build::int(0))),
        body,
        build::ret(Some(build::var("total"))),
    ]
}

/// try/finally regions nested `depth` deep around an early return.
fn exceptions(depth: usize) -> Vec<Stmt> {
    let mut body = vec![build::if_stmt(
        build::bin(BinaryOp::Greater, build::var("n"), build::int(0)),
        build::ret(Some(build::var("n"))),
        None,
    )];
    for _ in 0..depth {
        body = vec![build::try_stmt(
            body,
            vec![],
            Some(vec![build::expr_stmt(build::compound(
                tern::ast::AssignOp::SubAssign,
                build::var("n"),
                build::int(1),
            ))]),
        )];
    }
    body.push(build::ret(Some(build::int(0))));
    body
}

fn bench_workload(c: &mut Criterion, group: &str, make: fn(usize) -> Vec<Stmt>, sizes: &[usize]) {
    let reg = registry();
    let ctx = CompileContext::new(&reg, CompileOptions::default(), ArchConstants::ia32());
    let mut group = c.benchmark_group(group);
    for &size in sizes {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("depth_{size}"), |b| {
            b.iter_batched(
                || vec![method(make(size))],
                |mut decls| black_box(compile_unit(&ctx, &mut decls).unwrap()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_arithmetic(c: &mut Criterion) {
    bench_workload(c, "arithmetic", arithmetic, &[8, 32, 64]);
}

fn bench_loops(c: &mut Criterion) {
    bench_workload(c, "loops", loops, &[2, 8, 32]);
}

fn bench_exceptions(c: &mut Criterion) {
    bench_workload(c, "exceptions", exceptions, &[1, 4, 16]);
}

criterion_group!(benches, bench_arithmetic, bench_loops, bench_exceptions);
criterion_main!(benches);
