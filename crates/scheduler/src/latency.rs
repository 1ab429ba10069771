use std::time::Duration;

use rand::Rng;

use cobra_core::TaskType;

/// Execution latency range for a task type, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub min_ms: u64,
    /// Exclusive upper bound.
    pub max_ms: u64,
}

impl LatencyProfile {
    pub fn for_task(task_type: TaskType) -> Self {
        let (min_ms, max_ms) = match task_type {
            TaskType::IC => (850, 1100),
            TaskType::HRLLC => (50, 150),
            TaskType::UC => (700, 900),
            TaskType::MC => (550, 700),
            TaskType::AIC => (1400, 2100),
            TaskType::ISC => (400, 650),
        };
        Self { min_ms, max_ms }
    }

    /// Midpoint plus 10%, in whole milliseconds.
    pub fn deadline_ms(&self) -> u64 {
        let avg = (self.min_ms + self.max_ms) / 2;
        avg + avg / 10
    }

    pub fn is_on_time(&self, latency_ms: u64) -> bool {
        latency_ms <= self.deadline_ms()
    }

    /// Uniform draw from `[min_ms, max_ms)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min_ms..self.max_ms)
    }
}

/// Real time to block for a drawn latency. Non-positive or non-finite
/// scales disable the wait.
pub fn scaled_wait(latency_ms: u64, scale: f64) -> Option<Duration> {
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(latency_ms as f64 * scale / 1000.0))
}
