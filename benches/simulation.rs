//! Performance benchmarks for FLAPPY-EVO

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flappy_evo::controller::Observation;
use flappy_evo::mask;
use flappy_evo::{Config, Population, World};

fn hover(o: &Observation) -> bool {
    o.dist_to_gap_bottom < o.dist_to_gap_top + 40.0
}

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for population in [10, 100, 500].iter() {
        let mut config = Config::default();
        config.safety.max_ticks_per_episode = u64::MAX;

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, &population| {
                let mut controllers = vec![hover as fn(&Observation) -> bool; population];
                let mut world = World::new_with_seed(config.clone(), population, 42);
                b.iter(|| {
                    if world.is_ended() {
                        world = World::new_with_seed(config.clone(), population, 42);
                    }
                    world.step(&mut controllers).ok();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.sample_size(20);

    for population in [10, 50].iter() {
        let mut config = Config::default();
        config.evolution.population_size = *population;
        config.safety.max_ticks_per_episode = 2_000;

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                let mut pop = match Population::new_with_seed(config.clone(), 42) {
                    Ok(pop) => pop,
                    Err(e) => panic!("invalid bench config: {}", e),
                };
                b.iter(|| {
                    pop.evaluate_generation().ok();
                    pop.reproduce().ok();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_mask_overlap(c: &mut Criterion) {
    let bird = mask::bird_mask();
    let pipe = mask::pipe_bottom_mask();

    c.bench_function("mask_overlap_hit", |b| {
        b.iter(|| bird.overlap(black_box(pipe), black_box((10, 20))))
    });

    c.bench_function("mask_overlap_miss", |b| {
        b.iter(|| bird.overlap(black_box(pipe), black_box((0, 60))))
    });
}

criterion_group!(benches, benchmark_world_step, benchmark_generation, benchmark_mask_overlap);
criterion_main!(benches);
