use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::time::Duration;
use zoe_core::{World, ZoeConfig};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn seeded_world(bugs: u32, founders: &[(&str, &str)]) -> World {
    let config = ZoeConfig {
        seed: Some(0xBEEF),
        world_width: 800,
        world_height: 800,
        initial_bug_count: Some(bugs),
        history_capacity: 1,
        ..ZoeConfig::default()
    };
    let mut world = World::new(config).expect("world");
    for (name, source) in founders {
        world.found_species(name, source).expect("founder");
    }
    world.seed_population();
    world
}

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    group.sample_size(env_or("ZOE_BENCH_SAMPLES", 20_usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("ZOE_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("ZOE_BENCH_MEASURE_SECS", 10)));
    let steps = env_or("ZOE_BENCH_STEPS", 32_usize).max(1);

    for bugs in [100_u32, 500, 1000] {
        group.bench_function(format!("steps{steps}_random_species_{bugs}"), |b| {
            b.iter_batched(
                || seeded_world(bugs, &[]),
                |mut world| {
                    for _ in 0..steps {
                        world.step();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }

    // Hunters look and bite every turn, which stresses perception.
    let hunters = [(
        "Hunter",
        "When { Me.FeelSomething } Do { Turn It.Location, Bite } \
         Do { Move, SenseFarther }",
    )];
    group.bench_function(format!("steps{steps}_hunters_500"), |b| {
        b.iter_batched(
            || seeded_world(500, &hunters),
            |mut world| {
                for _ in 0..steps {
                    world.step();
                }
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
