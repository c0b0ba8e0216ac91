//! Metrics module for the gateway.
//!
//! - This module contains the global Prometheus registry.
//! - Defines the ingestion, election and broker metrics plus host metrics.

pub mod server;
use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use sysinfo::{Disks, System};

lazy_static! {
	/// Global Prometheus registry.
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

	/// Gauge for disk usage percentage across all mounted filesystems.
	pub static ref DISK_USAGE_PERCENT: Gauge = {
		let gauge = Gauge::new("disk_usage_percentage", "Disk usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Events handed to the broker, by blockchain and kind (`block` / `tx`).
	pub static ref EVENTS_PUBLISHED: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("events_published_total", "Events published to the broker"),
			&["blockchain", "kind"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Publishes that failed on at least one exchange.
	pub static ref PUBLISH_FAILURES: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("publish_failures_total", "Events that could not be published"),
			&["blockchain", "kind"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Block numbers recorded for backfill after a failed publish or a detected gap.
	pub static ref BLOCKS_DEFERRED: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("blocks_deferred_total", "Block numbers recorded for backfill"),
			&["blockchain"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// References that could not be resolved when first seen.
	pub static ref UNRESOLVED_MARKERS: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("unresolved_markers_total", "References marked for a later retry"),
			&["blockchain", "kind"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Election rounds by outcome (`changed`, `unchanged`, `unreachable`).
	pub static ref ELECTIONS: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("node_elections_total", "Node election rounds"),
			&["blockchain", "outcome"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Height reported by the elected node in the last round.
	pub static ref ELECTED_HEIGHT: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("elected_node_height", "Block height of the elected node"),
			&["blockchain", "node"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Broker (re)connection attempts that were started.
	pub static ref BROKER_RECONNECTS: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("broker_reconnects_total", "Broker connection attempts"),
			&["outcome"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
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

/// Updates the host metrics for CPU, memory and disk usage.
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
	DISK_USAGE_PERCENT.set(percentage(used_disk_space, total_disk_space));
}

fn percentage(used: u64, total: u64) -> f64 {
	if total > 0 {
		(used as f64 / total as f64) * 100.0
	} else {
		0.0
	}
}

/// Records the node chosen by an election round.
pub fn record_election(blockchain: &str, node: &str, height: u64, changed: bool) {
	let outcome = if changed { "changed" } else { "unchanged" };
	ELECTIONS.with_label_values(&[blockchain, outcome]).inc();
	ELECTED_HEIGHT.reset();
	ELECTED_HEIGHT
		.with_label_values(&[blockchain, node])
		.set(height as f64);
}
