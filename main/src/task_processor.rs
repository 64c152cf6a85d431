#[allow(unused_imports)]
use crate::_prelude::*;
use crate::{delay::Delay, extractor, fetcher::Fetcher, matcher, types::*};

pub(crate) struct TaskProcessor {
	keyword:  Arc<str>,
	delay:    Delay,
	fetcher:  Fetcher,
	tx:       Sender<TaskUpdate>,
	tasks_rx: Receiver<String>,
	parse_tx: Sender<ParserTask>,
}

impl TaskProcessor {
	pub(crate) fn new(
		keyword: Arc<str>,
		delay: Delay,
		fetcher: Fetcher,
		tx: Sender<TaskUpdate>,
		tasks_rx: Receiver<String>,
		parse_tx: Sender<ParserTask>,
	) -> TaskProcessor {
		TaskProcessor { keyword, delay, fetcher, tx, tasks_rx, parse_tx }
	}

	async fn parse(&self, fetched: FetchData) -> Result<ParsedPage> {
		let (parse_res_tx, parse_res_rx) = bounded_ch::<ParserResponse>(1);

		let keyword = Arc::clone(&self.keyword);
		let payload = move || -> Result<ParsedPage> {
			let extracted =
				extractor::extract(&fetched.bytes, &fetched.content_type, &[&fetched.url, &fetched.effective_url])?;
			let matched = matcher::scan(&extracted.text, &keyword);
			Ok(ParsedPage { kind: extracted.kind, matched })
		};

		self.parse_tx
			.send_async(ParserTask { payload: Box::new(payload), time: Instant::now(), res_tx: parse_res_tx })
			.await
			.map_err(|_| anyhow!("parser processor is gone"))?;

		let parser_response = parse_res_rx.recv_async().await.context("cannot parse fetched document")?;
		trace!(
			wait_ms = parser_response.wait_duration.as_millis() as u64,
			work_ms = parser_response.work_duration.as_millis() as u64,
			"parsed"
		);
		parser_response.payload
	}

	async fn process_task(&self, url: &str) -> Result<ResultRecord> {
		let fetched = self.fetcher.fetch(url).await?;
		debug!("{}", fetched);

		let page = self.parse(fetched).await?;
		Ok(ResultRecord::matched(url, page.kind, &page.matched))
	}

	pub(crate) fn go<'a>(self, n: usize) -> TaskFut<'a> {
		TracingTask::new(span!(n = n), async move {
			while let Ok(url) = self.tasks_rx.recv_async().await {
				self.delay.wait().await;

				let record = match self.process_task(&url).await {
					Ok(record) => record,
					Err(err) => {
						warn!(url = %url, "{:#}", err);
						ResultRecord::failed(&url, &err)
					}
				};
				trace!("{}", record);

				if self.tx.send_async(TaskUpdate { worker: n, record }).await.is_err() {
					// scheduler stopped (fatal sink error), nothing left to report to
					break
				}
			}

			trace!("queue drained, worker {} exits", n);
			Ok(())
		})
		.instrument()
	}
}
