use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use formloom::{Form, Template};
use serde_json::{json, Value};

fn rows_template() -> Template {
    Template::group(vec![
        Template::string("title"),
        Template::array(
            "rows",
            vec![
                Template::string("name"),
                Template::number("qty"),
                Template::checkbox("done"),
                Template::object("meta", vec![Template::datetime("at")]),
            ],
        ),
    ])
}

fn rows_value(count: usize) -> Value {
    let rows: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "name": format!("row {}", i),
                "qty": i,
                "done": i % 2 == 0,
                "meta": {"at": "2024-05-01T10:00:00Z"}
            })
        })
        .collect();
    json!({"title": "bench", "rows": rows})
}

fn benchmark_json(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("json");

    for count in [10usize, 100, 1000] {
        let form = Form::new(rows_template());
        rt.block_on(form.build(rows_value(count))).unwrap();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &form, |b, form| {
            b.to_async(&rt).iter(|| async { black_box(form.json(false).await) });
        });
    }

    group.finish();
}

fn benchmark_build(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let value = rows_value(100);

    c.bench_function("build_100_rows", |b| {
        b.to_async(&rt).iter(|| async {
            let form = Form::new(rows_template());
            form.build(black_box(value.clone())).await.unwrap();
        });
    });
}

fn benchmark_edit_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let form = Form::new(rows_template());
    rt.block_on(form.build(rows_value(100))).unwrap();

    c.bench_function("edit_cycle_100_rows", |b| {
        b.to_async(&rt)
            .iter(|| async { form.edit("rows[50].name", black_box("edited")).await.unwrap() });
    });
}

criterion_group!(benches, benchmark_json, benchmark_build, benchmark_edit_cycle);
criterion_main!(benches);
