use log::{Level, log_enabled, trace, warn};
use std::time::{Duration, Instant};

/// Traces the wall time of one step phase when dropped.
pub struct ScopedTimer<'a> {
    phase: &'a str,
    start: Option<Instant>,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(phase: &'a str) -> Self {
        let start = log_enabled!(Level::Trace).then(Instant::now);
        Self { phase, start }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            trace!("{} took {} µs", self.phase, start.elapsed().as_micros());
        }
    }
}

/// Warns when a world step overruns `budget_ms`. Returns whether it did.
pub fn warn_if_step_over_budget(elapsed: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!("step took {elapsed_ms:.2} ms, budget is {budget_ms:.2} ms");
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_check_compares_milliseconds() {
        assert!(warn_if_step_over_budget(Duration::from_millis(20), 16.0));
        assert!(!warn_if_step_over_budget(Duration::from_millis(2), 16.0));
    }
}
