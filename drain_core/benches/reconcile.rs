use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use drain_core::actuator::ActuatorState;
use drain_core::config::{EngineCfg, NormalizeCfg};
use drain_core::{normalize, reconcile, select_latest};
use serde_json::{Value, json};

// A sensor node shaped like a day of pushes from the rig.
fn synth_node(n: usize) -> Value {
    let mut map = serde_json::Map::with_capacity(n);
    for i in 0..n {
        let level = |k: usize| u8::from((i + k) % 4 != 0);
        map.insert(
            format!("-N{i:08}"),
            json!({
                "data": {
                    "water_levels": [level(0), level(1), level(2)],
                    "distance1": (i % 40) as f64 * 0.5,
                    "distance2": 30.0,
                    "mq8": 0.4,
                    "temp": 27.0,
                    "ir": i % 2,
                    "flame": 0,
                },
                "gps": "23.811855,90.357140",
                "alert": if i % 7 == 0 { "Gas leak" } else { "None" },
                "timestamp": 1_718_000_000 + i as u64,
            }),
        );
    }
    Value::Object(map)
}

pub fn bench_reconcile(c: &mut Criterion) {
    let mut g = c.benchmark_group("reconcile");
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p drain_core --bench reconcile
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let ncfg = NormalizeCfg::default();
    let ecfg = EngineCfg::default();
    let state = ActuatorState {
        auto_mode: true,
        ..ActuatorState::default()
    };

    for &n in &[1usize, 100, 5_000] {
        let node = synth_node(n);
        g.bench_function(format!("select_normalize_reconcile_{n}"), |b| {
            b.iter_batched(
                || node.clone(),
                |node| {
                    if let Some(rec) = select_latest(black_box(&node)) {
                        let snap = normalize(rec, &ncfg);
                        black_box(reconcile(&snap, &state, &ecfg));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(reconcile_path, bench_reconcile);
criterion_main!(reconcile_path);
