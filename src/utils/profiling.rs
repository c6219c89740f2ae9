use std::time::Duration;

/// Wall-clock time spent in each phase of a single timestep.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub reclaim_time: Duration,
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub integrator_time: Duration,
    pub solver_time: Duration,
    pub sleeper_time: Duration,
    pub total_time: Duration,
}

impl StepProfile {
    pub fn merge(&mut self, other: &Self) {
        self.reclaim_time += other.reclaim_time;
        self.broad_phase_time += other.broad_phase_time;
        self.narrow_phase_time += other.narrow_phase_time;
        self.integrator_time += other.integrator_time;
        self.solver_time += other.solver_time;
        self.sleeper_time += other.sleeper_time;
        self.total_time += other.total_time;
    }

    /// Logs the breakdown at debug level.
    pub fn report(&self) {
        let total_us = self.total_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }
        let share = |d: Duration| (d.as_micros() as f32 / total_us) * 100.0;

        log::debug!(
            "step {:.2} ms | broad {:.1}% narrow {:.1}% integrate {:.1}% solve {:.1}% sleep {:.1}%",
            self.total_time.as_secs_f32() * 1000.0,
            share(self.broad_phase_time),
            share(self.narrow_phase_time),
            share(self.integrator_time),
            share(self.solver_time),
            share(self.sleeper_time),
        );
    }
}
