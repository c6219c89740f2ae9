//! Fixed-step catch-up loop that decouples simulation time from frame time.

use std::time::{Duration, Instant};

use crate::{
    collision::policy::NarrowPhaseCallbacks,
    dynamics::integrator::PoseIntegratorCallbacks,
    utils::{
        dispatcher::WorkerPool,
        logging::{warn_if_frame_budget_exceeded, ScopedTimer},
        profiling::StepProfile,
    },
    world::{Simulation, StepStats},
};

/// Slack that absorbs rounding when elapsed time lands exactly on a step boundary.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Steps run by one call to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub steps: Vec<StepStats>,
    /// Presentation time not yet simulated, in seconds. Below one step unless `capped`.
    pub remainder: f64,
    /// The per-frame step cap stopped the loop with backlog left over.
    pub capped: bool,
    pub frame_time: Duration,
}

impl FrameReport {
    pub fn steps_run(&self) -> usize {
        self.steps.len()
    }

    /// Phase timings summed over every step of the frame.
    pub fn profile(&self) -> StepProfile {
        let mut total = StepProfile::default();
        for step in &self.steps {
            total.merge(&step.profile);
        }
        total
    }
}

/// Runs as many fixed steps as it takes for simulated time to catch up with presentation time.
///
/// Every step is exactly `1 / simulation_rate` long, read from the simulation's
/// solver config before each step. Poses are never interpolated.
#[derive(Debug, Clone, Default)]
pub struct FixedStepScheduler {
    simulated_time: f64,
    presentation_time: f64,
    max_steps_per_frame: Option<usize>,
    frame_budget_ms: Option<f32>,
}

impl FixedStepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops a frame after `cap` steps; the backlog carries over to later frames.
    pub fn with_max_steps_per_frame(mut self, cap: Option<usize>) -> Self {
        self.max_steps_per_frame = cap;
        self
    }

    /// Warns whenever a frame's catch-up loop takes longer than `budget_ms`.
    pub fn with_frame_budget(mut self, budget_ms: Option<f32>) -> Self {
        self.frame_budget_ms = budget_ms;
        self
    }

    pub fn set_max_steps_per_frame(&mut self, cap: Option<usize>) {
        self.max_steps_per_frame = cap;
    }

    pub fn max_steps_per_frame(&self) -> Option<usize> {
        self.max_steps_per_frame
    }

    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    /// Presentation time handed in last, in seconds.
    pub fn presentation_time(&self) -> f64 {
        self.presentation_time
    }

    /// Presentation time not yet simulated.
    pub fn backlog(&self) -> f64 {
        (self.presentation_time - self.simulated_time).max(0.0)
    }

    /// Re-bases both clocks, dropping any backlog.
    pub fn reset(&mut self, time: f64) {
        log::info!("Scheduler reset to {time:.3} s");
        self.simulated_time = time;
        self.presentation_time = time;
    }

    /// Catches up to `total_elapsed` seconds of presentation time.
    ///
    /// A NaN or infinite time is ignored with a warning and runs no steps.
    pub fn advance_to<N, P>(
        &mut self,
        total_elapsed: f64,
        simulation: &mut Simulation<N, P>,
        pool: &WorkerPool,
    ) -> FrameReport
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        if !total_elapsed.is_finite() {
            log::warn!("Ignoring non-finite presentation time {total_elapsed}");
            return FrameReport {
                remainder: self.backlog(),
                ..FrameReport::default()
            };
        }

        let _timer = ScopedTimer::new("scheduler::catch_up");
        let frame_start = Instant::now();
        self.presentation_time = total_elapsed;

        let mut report = FrameReport::default();
        loop {
            let step = 1.0 / f64::from(simulation.solver_config().simulation_rate());
            if total_elapsed - self.simulated_time + BOUNDARY_EPSILON < step {
                break;
            }
            if let Some(cap) = self.max_steps_per_frame {
                if report.steps.len() >= cap {
                    report.capped = true;
                    log::warn!(
                        "Catch-up capped at {cap} steps; {:.3} s of backlog carried over",
                        total_elapsed - self.simulated_time
                    );
                    break;
                }
            }

            report.steps.push(simulation.timestep(step as f32, pool));
            self.simulated_time += step;
        }

        report.remainder = self.backlog();
        report.frame_time = frame_start.elapsed();
        if let Some(budget) = self.frame_budget_ms {
            warn_if_frame_budget_exceeded(report.frame_time, budget);
        }
        report
    }

    /// Catches up after `delta` more seconds of presentation time.
    pub fn advance_by<N, P>(
        &mut self,
        delta: f64,
        simulation: &mut Simulation<N, P>,
        pool: &WorkerPool,
    ) -> FrameReport
    where
        N: NarrowPhaseCallbacks,
        P: PoseIntegratorCallbacks,
    {
        let target = self.presentation_time + delta.max(0.0);
        self.advance_to(target, simulation, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationSettings;
    use approx::assert_abs_diff_eq;

    #[test]
    fn half_step_is_carried_over() {
        let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
        let pool = WorkerPool::new(1).unwrap();
        let mut scheduler = FixedStepScheduler::new();
        let step = 1.0 / 60.0;

        let report = scheduler.advance_to(2.5 * step, &mut simulation, &pool);
        assert_eq!(report.steps_run(), 2);
        assert_abs_diff_eq!(report.remainder, 0.5 * step, epsilon = 1e-6);

        let report = scheduler.advance_to(3.0 * step, &mut simulation, &pool);
        assert_eq!(report.steps_run(), 1);
        assert_abs_diff_eq!(report.remainder, 0.0, epsilon = 1e-6);
    }
}
