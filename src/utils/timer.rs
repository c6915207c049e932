//! Stage timing with structured log output

use std::time::{Duration, Instant};
use tracing::info;

/// Wall-clock timer for one pipeline stage, with optional named laps
#[derive(Debug)]
pub struct Timer {
    stage: String,
    start: Instant,
    laps: Vec<(String, Duration)>,
}

impl Timer {
    pub fn start(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            start: Instant::now(),
            laps: Vec::new(),
        }
    }

    /// Record the time since start under `name`
    pub fn lap(&mut self, name: impl Into<String>) {
        self.laps.push((name.into(), self.start.elapsed()));
    }

    pub fn laps(&self) -> &[(String, Duration)] {
        &self.laps
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the total and every lap delta, returning the total
    pub fn finish(self) -> Duration {
        let total = self.start.elapsed();
        let mut previous = Duration::ZERO;
        for (name, at) in &self.laps {
            info!(
                stage = %self.stage,
                lap = %name,
                at_secs = at.as_secs_f64(),
                delta_secs = (*at - previous).as_secs_f64(),
                "Lap"
            );
            previous = *at;
        }
        info!(stage = %self.stage, secs = total.as_secs_f64(), "Stage completed");
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laps_are_monotonic() {
        let mut timer = Timer::start("sweep");
        timer.lap("first");
        std::thread::sleep(Duration::from_millis(2));
        timer.lap("second");
        let laps = timer.laps();
        assert_eq!(laps.len(), 2);
        assert!(laps[1].1 >= laps[0].1);
        assert!(timer.finish() >= Duration::from_millis(2));
    }
}
