//! Auto-advance timer.
//!
//! Holds at most one armed interval. The engine says what it wants through
//! [`TimerDemand`]; re-arming drops the previous interval before creating
//! the next, so a stale countdown can never fire.

use crate::engine::TimerDemand;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub struct RotationTimer {
    period: Duration,
    demand: TimerDemand,
    interval: Option<Interval>,
    arms: u64,
}

impl RotationTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            demand: TimerDemand::Disarmed,
            interval: None,
            arms: 0,
        }
    }

    /// Bring the timer in line with `demand`.
    ///
    /// Unchanged demand leaves a running countdown alone; any change cancels
    /// it, and an armed demand starts a fresh one a full period out.
    pub fn sync(&mut self, demand: TimerDemand) {
        if demand == self.demand {
            return;
        }

        self.interval = None;

        if matches!(demand, TimerDemand::Armed { .. }) {
            let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
            self.arms += 1;
            tracing::debug!(
                "Rotation timer armed (#{}), next advance in {:?}",
                self.arms,
                self.period
            );
        } else {
            tracing::debug!("Rotation timer disarmed");
        }

        self.demand = demand;
    }

    /// Cancel any countdown (teardown)
    pub fn disarm(&mut self) {
        self.sync(TimerDemand::Disarmed);
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// How many times a countdown has been started
    #[cfg(test)]
    pub fn arm_count(&self) -> u64 {
        self.arms
    }

    /// Wait for the next advance. Never resolves while disarmed.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
