//! Process-wide pacing of monitor iterations.
//!
//! Every active monitor holds a [`MonitorPermit`]. The delay between two iterations of a
//! monitor grows linearly with the number of permits so the provider's hourly budget is
//! shared evenly across all tracked transactions.

use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use crate::utils::metrics::ACTIVE_MONITORS;

/// Share of the budget kept in reserve
const BUDGET_SAFETY_MARGIN: f64 = 0.10;

/// Provider requests a single iteration may spend (status plus height)
const REQUESTS_PER_ITERATION: f64 = 2.0;

/// Shortest throttling delay for budgeted providers
const MIN_THROTTLED_DELAY: Duration = Duration::from_secs(1);

/// Throttling delay for one iteration, before the minimum poll interval is applied
///
/// # Arguments
/// * `budget` - Hourly request budget, 0 for unlimited
/// * `active` - Number of active monitors (treated as at least 1)
///
/// # Returns
/// * `Duration` - Zero for unlimited budgets, otherwise at least one second
pub fn compute_delay(budget: u32, active: usize) -> Duration {
	if budget == 0 {
		return Duration::ZERO;
	}

	let per_minute = budget as f64 * (1.0 - BUDGET_SAFETY_MARGIN) / REQUESTS_PER_ITERATION;
	let seconds = 60.0 / (per_minute / active.max(1) as f64);

	Duration::from_secs_f64(seconds).max(MIN_THROTTLED_DELAY)
}

/// Counts active monitors and paces them against the provider budget
#[derive(Debug)]
pub struct RateGovernor {
	active: Arc<AtomicUsize>,
	budget: u32,
	minimum_interval: Duration,
}

impl RateGovernor {
	/// Creates a governor for an effective hourly budget
	///
	/// # Arguments
	/// * `budget` - Effective hourly budget across all egress paths, 0 for unlimited
	/// * `minimum_interval` - Floor applied to every delay
	pub fn new(budget: u32, minimum_interval: Duration) -> Self {
		Self {
			active: Arc::new(AtomicUsize::new(0)),
			budget,
			minimum_interval,
		}
	}

	/// Registers a monitor; the returned permit unregisters it when dropped
	pub fn acquire(&self) -> MonitorPermit {
		let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		ACTIVE_MONITORS.set(active as f64);
		MonitorPermit {
			active: self.active.clone(),
		}
	}

	pub fn active(&self) -> usize {
		self.active.load(Ordering::SeqCst)
	}

	pub fn budget(&self) -> u32 {
		self.budget
	}

	/// Delay to apply after the current iteration of any monitor
	pub fn delay(&self) -> Duration {
		compute_delay(self.budget, self.active()).max(self.minimum_interval)
	}
}

/// Proof of one active monitor
#[derive(Debug)]
pub struct MonitorPermit {
	active: Arc<AtomicUsize>,
}

impl Drop for MonitorPermit {
	fn drop(&mut self) {
		let remaining = self.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
		ACTIVE_MONITORS.set(remaining as f64);
	}
}
