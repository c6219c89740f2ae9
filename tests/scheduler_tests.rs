use approx::assert_abs_diff_eq;
use fixed_step_physics::*;

const STEP: f64 = 1.0 / 60.0;

fn world() -> (Simulation, WorkerPool) {
    (
        Simulation::new(SimulationSettings::default()).unwrap(),
        WorkerPool::new(2).unwrap(),
    )
}

#[test]
fn whole_steps_leave_no_remainder() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();

    let report = scheduler.advance_to(10.0 * STEP, &mut simulation, &pool);

    assert_eq!(report.steps_run(), 10);
    assert!(!report.capped);
    assert_abs_diff_eq!(report.remainder, 0.0, epsilon = 1e-9);
    assert_eq!(simulation.step_count(), 10);
    assert!(report.steps.iter().all(|step| (step.dt - STEP as f32).abs() < 1e-9));
}

#[test]
fn fractional_step_is_kept_for_the_next_frame() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();

    let report = scheduler.advance_to(7.5 * STEP, &mut simulation, &pool);

    assert_eq!(report.steps_run(), 7);
    assert_abs_diff_eq!(report.remainder, 0.5 * STEP, epsilon = 1e-9);
    assert_abs_diff_eq!(scheduler.simulated_time(), 7.0 * STEP, epsilon = 1e-9);
}

#[test]
fn no_time_elapsed_runs_nothing() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();

    scheduler.advance_to(3.0 * STEP, &mut simulation, &pool);
    let report = scheduler.advance_to(3.0 * STEP, &mut simulation, &pool);

    assert_eq!(report.steps_run(), 0);
}

#[test]
fn stall_is_caught_up_one_fixed_step_at_a_time() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();

    let report = scheduler.advance_by(2.0, &mut simulation, &pool);

    assert_eq!(report.steps_run(), 120);
    assert!(report.steps.iter().all(|step| (step.dt - STEP as f32).abs() < 1e-9));
}

#[test]
fn iteration_change_applies_from_the_next_step() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();

    let before = scheduler.advance_to(2.0 * STEP, &mut simulation, &pool);
    simulation
        .solver_config_mut()
        .set_velocity_iteration_count(5)
        .unwrap();
    simulation.solver_config_mut().set_substep_count(3).unwrap();
    let after = scheduler.advance_to(4.0 * STEP, &mut simulation, &pool);

    assert!(before.steps.iter().all(|step| step.velocity_iterations == 2));
    assert!(before.steps.iter().all(|step| step.substeps == 1));
    assert_eq!(after.steps_run(), 2);
    assert!(after.steps.iter().all(|step| step.velocity_iterations == 5));
    assert!(after.steps.iter().all(|step| step.substeps == 3));
}

#[test]
fn rate_change_changes_the_step_length() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();
    simulation
        .solver_config_mut()
        .set_simulation_rate(30.0)
        .unwrap();

    let report = scheduler.advance_to(0.5, &mut simulation, &pool);

    assert_eq!(report.steps_run(), 15);
    assert_abs_diff_eq!(report.steps[0].dt, 1.0 / 30.0, epsilon = 1e-7);
}

#[test]
fn capped_frame_keeps_the_backlog() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new().with_max_steps_per_frame(Some(4));

    let first = scheduler.advance_to(10.0 * STEP, &mut simulation, &pool);
    assert_eq!(first.steps_run(), 4);
    assert!(first.capped);
    assert_abs_diff_eq!(first.remainder, 6.0 * STEP, epsilon = 1e-9);

    let second = scheduler.advance_to(10.0 * STEP, &mut simulation, &pool);
    let third = scheduler.advance_to(10.0 * STEP, &mut simulation, &pool);
    assert_eq!(second.steps_run(), 4);
    assert_eq!(third.steps_run(), 2);
    assert!(!third.capped);
    assert_eq!(simulation.step_count(), 10);
}

#[test]
fn reset_drops_the_backlog() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new().with_max_steps_per_frame(Some(1));

    scheduler.advance_to(1.0, &mut simulation, &pool);
    assert!(scheduler.backlog() > 0.9);

    scheduler.reset(1.0);
    let report = scheduler.advance_to(1.0, &mut simulation, &pool);
    assert_eq!(report.steps_run(), 0);
    assert_abs_diff_eq!(scheduler.backlog(), 0.0);
}

#[test]
fn non_finite_presentation_time_is_ignored() {
    let (mut simulation, pool) = world();
    let mut scheduler = FixedStepScheduler::new();
    scheduler.advance_to(2.5 * STEP, &mut simulation, &pool);

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let report = scheduler.advance_to(bad, &mut simulation, &pool);
        assert_eq!(report.steps_run(), 0);
        assert!(!report.capped);
        assert_abs_diff_eq!(report.remainder, 0.5 * STEP, epsilon = 1e-9);
    }
    assert_eq!(simulation.step_count(), 2);
    assert_abs_diff_eq!(scheduler.presentation_time(), 2.5 * STEP, epsilon = 1e-12);

    let report = scheduler.advance_by(f64::INFINITY, &mut simulation, &pool);
    assert_eq!(report.steps_run(), 0);

    let report = scheduler.advance_to(3.0 * STEP, &mut simulation, &pool);
    assert_eq!(report.steps_run(), 1);
}
