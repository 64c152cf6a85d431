#[allow(unused_imports)]
use crate::_prelude::*;
use crate::{result_sink::ResultSink, status_store::StatusStore, types::*};

/// One stdout line per finished url: `[<processed>/<total>] <url> | Found: <found>`.
pub(crate) struct Progress<'a> {
	pub(crate) processed: usize,
	pub(crate) total:     usize,
	pub(crate) url:       &'a str,
	pub(crate) found:     usize,
}

impl fmt::Display for Progress<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}/{}] {} | Found: {}", self.processed, self.total, self.url, self.found)
	}
}

/// Owns the work queue and is the only writer of the result table and the status document.
pub(crate) struct TaskScheduler {
	keyword: String,
	total:   usize,
	sink:    ResultSink,
	status:  StatusStore,

	processed:  usize,
	found:      usize,
	per_worker: Vec<usize>,

	pub(crate) tasks_rx: Receiver<String>,
	update_tx:           Option<Sender<TaskUpdate>>,
	update_rx:           Receiver<TaskUpdate>,
}

impl TaskScheduler {
	/// Seeds the queue with every url. The sender is dropped right away, so workers see a
	/// disconnected channel (and exit) as soon as the last url has been taken.
	pub(crate) fn new(job: &Job, sink: ResultSink, status: StatusStore) -> TaskScheduler {
		let (tasks_tx, tasks_rx) = unbounded_ch::<String>();
		let (update_tx, update_rx) = unbounded_ch::<TaskUpdate>();

		for url in &job.urls {
			if tasks_tx.send(url.clone()).is_err() {
				panic!("cannot send task to tasks_tx! should never ever happen!")
			}
		}

		TaskScheduler {
			keyword: job.keyword.clone(),
			total: job.urls.len(),
			sink,
			status,
			processed: 0,
			found: 0,
			per_worker: vec![0; job.settings.concurrency.max(1)],
			tasks_rx,
			update_tx: Some(update_tx),
			update_rx,
		}
	}

	pub(crate) fn update_tx(&self) -> Option<Sender<TaskUpdate>> {
		self.update_tx.clone()
	}

	pub(crate) fn start(&self) -> anyhow::Result<()> {
		self.status.update(&StatusUpdate::started(&self.keyword, self.total)).context("cannot initialize status document")
	}

	fn process_task_response(&mut self, update: TaskUpdate) -> anyhow::Result<()> {
		let record = update.record;

		self.sink.append(&record)?;

		self.processed += 1;
		if record.found {
			self.found += 1;
		}
		if let Some(count) = self.per_worker.get_mut(update.worker) {
			*count += 1;
		}

		if let Err(err) = self.status.update(&StatusUpdate::progress(self.processed, self.found, &record.url)) {
			warn!("cannot update status document: {:#}", err);
		}

		println!("{}", Progress { processed: self.processed, total: self.total, url: &record.url, found: self.found });
		Ok(())
	}

	pub(crate) async fn go(mut self) -> anyhow::Result<CrawlSummary> {
		// only the workers' clones keep the update stream alive
		self.update_tx.take();

		while let Ok(update) = self.update_rx.recv_async().await {
			if let Err(err) = self.process_task_response(update) {
				error!("aborting crawl: {:#}", err);
				return Err(err)
			}
		}

		trace!("all workers are done - marking crawl as completed");
		self.status.update(&StatusUpdate::completed()).context("cannot finalize status document")?;

		Ok(CrawlSummary { total: self.total, processed: self.processed, found: self.found, per_worker: self.per_worker })
	}
}
