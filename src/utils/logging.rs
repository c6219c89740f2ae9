use log::{log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Times a stretch of a step until dropped.
///
/// Always traces start and end under `label`. A timer made with
/// [`ScopedTimer::phase`] also adds its elapsed time to one slot of the
/// step's [`StepProfile`](crate::utils::profiling::StepProfile).
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    phase: Option<&'a mut Duration>,
}

impl ScopedTimer<'static> {
    pub fn new(label: &'static str) -> Self {
        Self::start(label, None)
    }
}

impl<'a> ScopedTimer<'a> {
    pub fn phase(label: &'static str, slot: &'a mut Duration) -> Self {
        Self::start(label, Some(slot))
    }

    fn start(label: &'static str, phase: Option<&'a mut Duration>) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            phase,
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Some(slot) = self.phase.as_deref_mut() {
            *slot += elapsed;
        }
        if log_enabled!(Level::Trace) {
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when a frame's catch-up loop ran longer than `budget_ms`.
///
/// Returns whether the budget was exceeded.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!("Frame exceeded budget: {elapsed_ms:.2} ms > {budget_ms:.2} ms");
        return true;
    }
    false
}
