//! Metrics module for the application.
//!
//! - This module contains the global Prometheus registry.
//! - Defines specific metrics for the application.

pub mod server;
use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use sysinfo::{Disks, System};

use crate::models::TrackedTransaction;

lazy_static! {
	/// Global Prometheus registry.
	///
	/// This registry holds all metrics defined in this module and is used
	/// to gather metrics for exposure via the metrics endpoint.
	pub static ref REGISTRY: Registry = Registry::new();

	/// Gauge for CPU usage percentage.
	pub static ref CPU_USAGE: Gauge = {
		let gauge = Gauge::new("cpu_usage_percentage", "Current CPU usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for memory usage percentage.
	pub static ref MEMORY_USAGE_PERCENT: Gauge = {
		let gauge = Gauge::new("memory_usage_percentage", "Memory usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for memory usage in bytes.
	pub static ref MEMORY_USAGE: Gauge = {
		let gauge = Gauge::new("memory_usage_bytes", "Memory usage in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for total memory in bytes.
	pub static ref TOTAL_MEMORY: Gauge = {
		let gauge = Gauge::new("total_memory_bytes", "Total memory in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for used disk space in bytes, summed over all mounted filesystems.
	pub static ref DISK_USAGE: Gauge = {
		let gauge = Gauge::new("disk_usage_bytes", "Used disk space in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for disk usage percentage.
	pub static ref DISK_USAGE_PERCENT: Gauge = {
		let gauge = Gauge::new("disk_usage_percentage", "Disk usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for the number of monitor loops currently running.
	///
	/// Mirrors the rate governor's active counter, so it moves with every permit
	/// acquired or released.
	pub static ref ACTIVE_MONITORS: Gauge = {
		let gauge = Gauge::new("active_monitors", "Number of running transaction monitors").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for the number of entries in the persistent registry.
	pub static ref TRACKED_TRANSACTIONS: Gauge = {
		let gauge = Gauge::new("tracked_transactions", "Number of tracked transactions").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge Vector for tracked transactions per chain.
	pub static ref TRACKED_TRANSACTIONS_BY_CHAIN: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("tracked_transactions_by_chain", "Number of tracked transactions per chain"),
			&["chain"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge Vector counting how monitors terminated (confirmed, double_spent, abandoned).
	pub static ref MONITOR_OUTCOMES: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("monitor_outcomes", "Number of monitors finished per outcome"),
			&["outcome"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge Vector counting notifications delivered per notification kind.
	pub static ref NOTIFICATIONS_SENT: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("notifications_sent", "Number of notifications sent per kind"),
			&["kind"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};
}

/// Gather all metrics and encode into the provided format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let encoder = TextEncoder::new();
	let metric_families = REGISTRY.gather();
	let mut buffer = Vec::new();
	encoder.encode(&metric_families, &mut buffer)?;
	Ok(buffer)
}

/// Updates the system metrics for CPU, memory and disk usage.
pub fn update_system_metrics() {
	let mut sys = System::new_all();
	sys.refresh_all();

	CPU_USAGE.set(sys.global_cpu_usage() as f64);

	let total_memory = sys.total_memory();
	let memory_usage = sys.used_memory();
	TOTAL_MEMORY.set(total_memory as f64);
	MEMORY_USAGE.set(memory_usage as f64);
	MEMORY_USAGE_PERCENT.set(percentage(memory_usage, total_memory));

	let disks = Disks::new_with_refreshed_list();
	let (total_disk_space, total_disk_available) = disks
		.list()
		.iter()
		.fold((0u64, 0u64), |(total, available), disk| {
			(total + disk.total_space(), available + disk.available_space())
		});
	let used_disk_space = total_disk_space.saturating_sub(total_disk_available);
	DISK_USAGE.set(used_disk_space as f64);
	DISK_USAGE_PERCENT.set(percentage(used_disk_space, total_disk_space));
}

fn percentage(part: u64, total: u64) -> f64 {
	if total > 0 {
		(part as f64 / total as f64) * 100.0
	} else {
		0.0
	}
}

/// Updates the registry-derived gauges from a snapshot of tracked transactions.
///
/// # Arguments
/// * `transactions` - Every entry currently held by the persistent registry
pub fn update_tracking_metrics(transactions: &[TrackedTransaction]) {
	TRACKED_TRANSACTIONS.set(transactions.len() as f64);

	let mut per_chain = HashMap::<&str, usize>::new();
	for tx in transactions {
		*per_chain.entry(tx.identity.chain.as_str()).or_insert(0) += 1;
	}

	TRACKED_TRANSACTIONS_BY_CHAIN.reset();
	for (chain, count) in per_chain {
		TRACKED_TRANSACTIONS_BY_CHAIN
			.with_label_values(&[chain])
			.set(count as f64);
	}
}

/// Records a finished monitor under its outcome label
pub fn record_monitor_outcome(outcome: &str) {
	MONITOR_OUTCOMES.with_label_values(&[outcome]).inc();
}

/// Records a delivered notification under its kind label
pub fn record_notification_sent(kind: &str) {
	NOTIFICATIONS_SENT.with_label_values(&[kind]).inc();
}
