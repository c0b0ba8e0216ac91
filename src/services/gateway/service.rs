//! Gateway service.
//!
//! Owns the scheduled jobs (election, unresolved retry, gap backfill) and the
//! ingestion listener task for one blockchain.

use anyhow::Context;
use std::{collections::HashMap, sync::Arc};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
	models::ScheduleConfig,
	services::{
		blockchain::ChainAdapter,
		election::NodeSelectorTrait,
		gateway::error::GatewayError,
		ingestion::IngestionListener,
		publisher::EventPublisher,
		recovery::RecoverySweeper,
	},
};

/// Trait for job scheduler
///
/// Abstracts the job scheduler so the gateway can be driven by a test double.
#[async_trait::async_trait]
pub trait JobSchedulerTrait: Send + Sync + Sized {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Implementation of the job scheduler trait for the JobScheduler struct
#[async_trait::async_trait]
impl JobSchedulerTrait for JobScheduler {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		Self::new().await.map_err(Into::into)
	}

	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.add(job).await.map(|_| ()).map_err(Into::into)
	}

	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.start().await.map(|_| ()).map_err(Into::into)
	}

	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.shutdown().await.map(|_| ()).map_err(Into::into)
	}
}

/// Gateway components for one blockchain
pub struct GatewayComponents<A> {
	pub adapter: Arc<A>,
	pub selector: Arc<dyn NodeSelectorTrait>,
	pub publisher: Arc<dyn EventPublisher>,
	pub listener: Arc<IngestionListener<A>>,
	pub sweeper: Arc<RecoverySweeper<A>>,
}

pub struct GatewayService<A, J>
where
	J: JobSchedulerTrait,
{
	blockchain: String,
	schedules: ScheduleConfig,
	components: GatewayComponents<A>,
	scheduler: J,
	shutdown: CancellationToken,
	listener_task: Option<JoinHandle<()>>,
}

impl<A, J> GatewayService<A, J>
where
	A: ChainAdapter + 'static,
	J: JobSchedulerTrait,
{
	pub async fn new(
		schedules: ScheduleConfig,
		components: GatewayComponents<A>,
	) -> Result<Self, GatewayError> {
		let blockchain = components.adapter.blockchain();
		let scheduler = J::new().await.map_err(|e| {
			GatewayError::scheduler_error(
				e.to_string(),
				Some(e),
				Some(HashMap::from([(
					"blockchain".to_string(),
					blockchain.clone(),
				)])),
			)
		})?;

		Ok(Self {
			blockchain,
			schedules,
			components,
			scheduler,
			shutdown: CancellationToken::new(),
			listener_task: None,
		})
	}

	fn metadata(&self, job: &str) -> Option<HashMap<String, String>> {
		Some(HashMap::from([
			("blockchain".to_string(), self.blockchain.clone()),
			("job".to_string(), job.to_string()),
		]))
	}

	async fn add_job(&self, name: &str, job: Job) -> Result<(), GatewayError> {
		self.scheduler.add(job).await.map_err(|e| {
			GatewayError::scheduler_error(e.to_string(), Some(e), self.metadata(name))
		})
	}

	fn election_job(&self) -> Result<Job, GatewayError> {
		let selector = self.components.selector.clone();
		Job::new_async(self.schedules.node_selection.as_str(), move |_uuid, _l| {
			let selector = selector.clone();
			Box::pin(async move {
				selector.select_node().await;
			})
		})
		.with_context(|| "Failed to create node selection job")
		.map_err(Into::into)
	}

	fn unresolved_job(&self) -> Result<Job, GatewayError> {
		let sweeper = self.components.sweeper.clone();
		Job::new_async(self.schedules.unresolved_retry.as_str(), move |_uuid, _l| {
			let sweeper = sweeper.clone();
			Box::pin(async move {
				sweeper.retry_unresolved().await;
			})
		})
		.with_context(|| "Failed to create unresolved retry job")
		.map_err(Into::into)
	}

	fn backfill_job(&self) -> Result<Job, GatewayError> {
		let sweeper = self.components.sweeper.clone();
		Job::new_async(self.schedules.gap_backfill.as_str(), move |_uuid, _l| {
			let sweeper = sweeper.clone();
			Box::pin(async move {
				sweeper.backfill_gaps().await;
			})
		})
		.with_context(|| "Failed to create gap backfill job")
		.map_err(Into::into)
	}

	/// Elects a node, connects the publisher, starts the listener and the jobs
	pub async fn start(&mut self) -> Result<(), GatewayError> {
		if self.listener_task.is_some() {
			info!(blockchain = %self.blockchain, "Gateway already running");
			return Ok(());
		}

		if self.components.selector.select_node().await.is_none() {
			warn!(blockchain = %self.blockchain, "No node elected at startup");
		}

		// Failures schedule their own retry
		if let Err(e) = self.components.publisher.connect().await {
			warn!(error = %e, "Initial broker connect failed");
		}

		self.add_job("node_selection", self.election_job()?).await?;
		self.add_job("unresolved_retry", self.unresolved_job()?)
			.await?;
		if self.components.adapter.tracks_block_gaps() {
			self.add_job("gap_backfill", self.backfill_job()?).await?;
		}

		self.scheduler.start().await.map_err(|e| {
			GatewayError::scheduler_error(e.to_string(), Some(e), self.metadata("scheduler"))
		})?;

		let listener = self.components.listener.clone();
		let shutdown = self.shutdown.clone();
		self.listener_task = Some(tokio::spawn(listener.run(shutdown)));

		info!(blockchain = %self.blockchain, "Gateway started");
		Ok(())
	}

	/// Stops the jobs, the subscription and the broker connections
	pub async fn stop(&mut self) -> Result<(), GatewayError> {
		self.shutdown.cancel();

		let scheduler_result = self.scheduler.shutdown().await.map_err(|e| {
			GatewayError::scheduler_error(e.to_string(), Some(e), self.metadata("scheduler"))
		});

		if let Some(task) = self.listener_task.take() {
			if let Err(e) = task.await {
				warn!(error = %e, "Listener task ended abnormally");
			}
		}

		self.components.publisher.close().await;
		info!(blockchain = %self.blockchain, "Gateway stopped");
		scheduler_result
	}

	pub fn is_running(&self) -> bool {
		self.listener_task.is_some()
	}
}
