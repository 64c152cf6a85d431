#[allow(unused_imports)]
use crate::_prelude::*;
use crate::{
	config,
	delay::Delay,
	fetcher::Fetcher,
	result_sink::ResultSink,
	status_store::StatusStore,
	task_processor::*,
	task_scheduler::*,
	types::*,
};

pub struct Crawler {
	networking_profile: config::NetworkingProfile,
	parse_tx:           Sender<ParserTask>,
}

impl Crawler {
	pub fn new(networking_profile: config::NetworkingProfile, tx_pp: Sender<ParserTask>) -> Crawler {
		Crawler { networking_profile, parse_tx: tx_pp }
	}

	/// Runs `job` to completion: the result table at `output` gets one row per url and the status
	/// document at `status` ends in `COMPLETED`. Per-url failures become `Error` rows; only
	/// startup and result table I/O errors are returned.
	pub async fn go(&self, job: Job, output: &Path, status: &Path) -> anyhow::Result<CrawlSummary> {
		let sink = ResultSink::open(output)?;
		let status = StatusStore::new(status);

		let scheduler = TaskScheduler::new(&job, sink, status);
		scheduler.start()?;
		info!(keyword = %job.keyword, urls = job.urls.len(), "crawl started - {}", job.settings);

		let keyword: Arc<str> = Arc::from(job.keyword.as_str());
		let delay = Delay::from_settings(&job.settings);
		let fetcher = Fetcher::new(&self.networking_profile, Arc::clone(&job.settings));
		let update_tx = scheduler.update_tx().context("scheduler is already running")?;

		let mut processor_handles = vec![];
		for i in 0..job.settings.concurrency.max(1) {
			let processor = TaskProcessor::new(
				Arc::clone(&keyword),
				delay.clone(),
				fetcher.clone(),
				update_tx.clone(),
				scheduler.tasks_rx.clone(),
				self.parse_tx.clone(),
			);

			processor_handles.push(tokio::spawn(async move { processor.go(i).await }));
		}
		drop(update_tx);

		let summary = scheduler.go().await;

		trace!("Waiting for workers to finish...");
		for h in processor_handles {
			if let Err(err) = h.await.context("worker task failed")? {
				warn!("worker exited with error: {:#}", err);
			}
		}

		let summary = summary?;
		info!("crawl completed - {}", summary);
		Ok(summary)
	}

	/// Loads the keyword config and url list from `paths` and runs them.
	pub async fn run(&self, paths: &config::Paths, settings: config::CrawlingSettings) -> anyhow::Result<CrawlSummary> {
		let job = Job::load(paths, settings)?;
		self.go(job, &paths.output, &paths.status).await
	}
}
