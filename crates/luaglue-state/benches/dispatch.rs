use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use luaglue_sdk::{dynamic, MethodTable, NativeObjectHandle, ScriptClass, ScriptStack};
use luaglue_state::{LuaValue, MemoryState};
use serde_json::json;

#[derive(Default)]
struct Accumulator {
    total: i64,
}

impl ScriptClass for Accumulator {
    const CLASS_NAME: &'static str = "Accumulator";
}

impl Accumulator {
    fn add(&mut self, amount: i32) -> i64 {
        self.total += amount as i64;
        self.total
    }

    fn describe(&self, prefix: String, scale: f64) -> String {
        format!("{prefix}{}", self.total as f64 * scale)
    }
}

fn setup() -> (MemoryState, NativeObjectHandle<Accumulator>) {
    let mut state = MemoryState::default();
    state.register_class(
        MethodTable::builder::<Accumulator>()
            .method("add", Accumulator::add)
            .method("describe", Accumulator::describe)
            .build()
            .unwrap(),
    );
    (state, NativeObjectHandle::new(Accumulator::default()))
}

fn bench_method_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("method_call");

    group.bench_function("add_i32", |b| {
        let (mut state, acc) = setup();
        b.iter(|| {
            acc.push(&mut state);
            state.push_integer(black_box(3));
            state.call_method("Accumulator", "add", 2).unwrap();
            state.pop(1);
        });
    });

    group.bench_function("describe_string_f64", |b| {
        let (mut state, acc) = setup();
        b.iter(|| {
            acc.push(&mut state);
            state.push_string(black_box("total="));
            state.push_number(black_box(0.5));
            state.call_method("Accumulator", "describe", 3).unwrap();
            state.pop(1);
        });
    });

    group.bench_function("nil_receiver", |b| {
        let (mut state, _acc) = setup();
        b.iter(|| {
            state.push_nil();
            state.push_integer(black_box(3));
            state.call_method("Accumulator", "add", 2).unwrap()
        });
    });

    group.finish();
}

fn bench_dynamic_bridge(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic");

    for size in [8usize, 64, 512] {
        let list = LuaValue::list((0..size as i64).map(LuaValue::Integer));
        group.bench_with_input(BenchmarkId::new("list_to_dynamic", size), &list, |b, list| {
            let mut state = MemoryState::default();
            state.push_value(list.clone());
            b.iter(|| dynamic::to_dynamic(&mut state, -1));
        });
    }

    let doc = json!({
        "name": "widget",
        "tags": ["a", "b", "c"],
        "dims": { "w": 3, "h": 4.5 },
        "parts": [{ "id": 1 }, { "id": 2 }, { "id": 3 }]
    });
    group.bench_function("document_from_dynamic", |b| {
        let mut state = MemoryState::default();
        b.iter(|| {
            dynamic::from_dynamic(&mut state, black_box(&doc));
            state.pop(1);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_method_calls, bench_dynamic_bridge);
criterion_main!(benches);
