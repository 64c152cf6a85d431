pub use crate::{
	config,
	config::{Config, CrawlingSettings, KeywordConfig, NetworkingProfile, ParserProfile, Paths},
	extractor, matcher,
	result_sink::ResultSink,
	status_store::StatusStore,
	types::{CrawlState, CrawlStatus, CrawlSummary, Job, ResourceKind, ResultRecord, StatusUpdate},
	Crawler, Delay, Fetcher, ParserProcessor,
};
