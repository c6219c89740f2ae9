use fixed_step_physics::*;

fn main() -> Result<()> {
    let mut sandbox = Sandbox::new(SandboxSettings::headless())?;
    sandbox.handle(UiEvent::SpawnGrid { layers: None })?;

    // Three seconds of 60 Hz frames, then a one-second stall.
    let mut elapsed = 0.0;
    for _ in 0..180 {
        elapsed += 1.0 / 60.0;
        sandbox.frame(elapsed);
    }
    elapsed += 1.0;
    let stall = sandbox.frame(elapsed);
    println!("Caught up {} steps after the stall", stall.steps_run());
    stall.profile().report();

    let diagnostics = sandbox.diagnostics();
    println!(
        "{} active, {} sleeping after {:.2} s",
        diagnostics.active_bodies, diagnostics.sleeping_bodies, diagnostics.simulated_time
    );
    for instance in sandbox.body_instances().iter().take(3) {
        println!("box at {:?}", instance.pose.position);
    }

    sandbox.handle(UiEvent::ClearAll)?;
    println!(
        "after clear: {} active, {} sleeping slots",
        sandbox.diagnostics().active_bodies,
        sandbox.diagnostics().sleeping_bodies
    );
    Ok(())
}
