use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use autoorganize_core::{ActorId, LocationKey};
use autoorganize_engine::{AlwaysPresent, Executor, Planner};
use autoorganize_inventory::{ContainerRegistry, ItemStack};
use autoorganize_rules::{CategoryRule, Predicate, RuleSet, RuleTable};

const ITEMS: [&str; 6] = [
    "cobblestone",
    "oak_log",
    "birch_log",
    "iron_ingot",
    "wheat",
    "diamond",
];

fn rules() -> RuleTable {
    RuleTable::load(RuleSet {
        rules: vec![
            CategoryRule::new(Predicate::Item("cobblestone".into()), "stone"),
            CategoryRule::new(Predicate::Pattern("*_log".into()), "wood"),
            CategoryRule::new(Predicate::Pattern("*_ingot".into()), "metal"),
            CategoryRule::new(Predicate::Item("wheat".into()), "farm"),
        ],
        ..RuleSet::default()
    })
    .unwrap()
}

/// One full staging chest plus `destinations` category chests.
fn world(destinations: usize) -> ContainerRegistry {
    let categories = ["stone", "wood", "metal", "farm"];
    let mut registry = ContainerRegistry::default();
    let source = LocationKey::new("world", 0, 64, 0);
    registry.register(source.clone(), None, None, 27).unwrap();

    for i in 0..destinations {
        registry
            .register(
                LocationKey::new("world", i as i32 + 1, 64, 0),
                None,
                Some(categories[i % categories.len()].into()),
                27,
            )
            .unwrap();
    }

    let contents = (0..27)
        .map(|slot| ItemStack::new(ITEMS[slot % ITEMS.len()], 1 + (slot as u32 * 7) % 64))
        .collect();
    registry.replace_contents(&source, contents).unwrap();
    registry
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    let table = rules();
    let planner = Planner::default();
    let actor = ActorId::new();
    let source = LocationKey::new("world", 0, 64, 0);

    for destinations in [4usize, 64, 512] {
        let registry = world(destinations);
        group.throughput(Throughput::Elements(27));
        group.bench_with_input(
            BenchmarkId::from_parameter(destinations),
            &registry,
            |b, registry| {
                b.iter(|| {
                    planner
                        .plan(black_box(registry), &table, 1, actor, &source)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_plan_and_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_and_execute");
    let table = rules();
    let planner = Planner::default();
    let actor = ActorId::new();
    let source = LocationKey::new("world", 0, 64, 0);

    group.bench_function("staging_chest_64_destinations", |b| {
        b.iter_batched(
            || world(64),
            |mut registry| {
                let plan = planner.plan(&registry, &table, 1, actor, &source).unwrap();
                Executor::new(&AlwaysPresent).execute(&mut registry, &plan)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_plan, bench_plan_and_execute);
criterion_main!(benches);
