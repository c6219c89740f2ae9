use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fixed_step_physics::*;
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;

fn prepare_sandbox(layers: u32, workers: usize) -> Sandbox {
    let mut sandbox = Sandbox::new(SandboxSettings {
        worker_count: Some(workers),
        ..SandboxSettings::headless()
    })
    .expect("sandbox");
    sandbox
        .handle(UiEvent::SpawnGrid {
            layers: Some(layers),
        })
        .expect("grid fits");
    sandbox
}

fn prepare_world(side: usize) -> Simulation {
    let mut simulation = Simulation::new(SimulationSettings::headless()).expect("simulation");
    let floor = simulation
        .add_shape(Shape::cuboid(200.0, 20.0, 200.0))
        .expect("floor shape");
    simulation
        .add_static(StaticDescription::new(
            Pose::from_position(Vec3::new(0.0, -10.0, 0.0)),
            floor,
        ))
        .expect("floor");
    let cube = simulation
        .add_shape(Shape::cuboid(0.5, 0.5, 0.5))
        .expect("cube shape");
    let mut lifecycle = BodyLifecycleManager::new();
    lifecycle
        .spawn_grid(
            &mut simulation,
            cube,
            (side, side, side),
            Vec3::splat(0.75),
            Vec3::new(-(side as f32) * 0.375, 1.0, -(side as f32) * 0.375),
            0.01,
        )
        .expect("grid fits");
    simulation
}

fn bench_timestep(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestep");
    for &side in &[4usize, 8, 12] {
        let body_count = side * side * side;
        for &workers in &[1usize, 4] {
            let pool = WorkerPool::new(workers).expect("pool");
            group.bench_with_input(
                BenchmarkId::new(format!("{workers}_workers"), body_count),
                &side,
                |b, &side| {
                    b.iter(|| {
                        let mut simulation = prepare_world(side);
                        for _ in 0..10 {
                            black_box(simulation.timestep(black_box(DT), &pool));
                        }
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_catch_up(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_catch_up");
    for &layers in &[2u32, 6, 10] {
        group.bench_with_input(BenchmarkId::new("one_second", layers), &layers, |b, &layers| {
            b.iter(|| {
                let mut sandbox = prepare_sandbox(layers, 4);
                black_box(sandbox.frame(black_box(1.0)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_timestep, bench_catch_up);
criterion_main!(benches);
