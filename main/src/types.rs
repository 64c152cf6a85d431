use bytes::Bytes;
use humansize::{format_size, DECIMAL};
use serde::{Deserialize, Serialize};
use thiserror::{self, Error};

#[allow(unused_imports)]
use crate::_prelude::*;
use crate::config;

/// Per-url failure. Every variant ends up as an `Error` row in the result table, never as a crash.
#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Other(#[from] anyhow::Error),
	#[error("timeout of {}ms exceeded", .0.as_millis())]
	FetchTimeout(Duration),
	#[error("request failed with status code {0}")]
	HttpStatus(u16),
	#[error("maximum number of redirects exceeded: {0}")]
	TooManyRedirects(usize),
	#[error("max response size reached: {0}")]
	ResponseTooLarge(usize),
	#[error("cannot parse pdf: {0}")]
	Pdf(String),
	#[error("panic during extraction: {0}")]
	Panic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum ResourceKind {
	#[strum(serialize = "HTML")]
	Html,
	#[strum(serialize = "PDF")]
	Pdf,
	#[strum(serialize = "Error")]
	Error,
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s: &'static str = self.into();
		write!(f, "{}", s)
	}
}

impl FromStr for ResourceKind {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		match s {
			"HTML" => Ok(ResourceKind::Html),
			"PDF" => Ok(ResourceKind::Pdf),
			"Error" => Ok(ResourceKind::Error),
			_ => Err(anyhow!("unknown resource type {:?}", s)),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrawlState {
	Running,
	Completed,
}

/// The whole status document as an external observer sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrawlStatus {
	pub state:        CrawlState,
	pub keyword:      String,
	pub total_urls:   usize,
	pub processed:    usize,
	pub found:        usize,
	pub current_url:  String,
	pub last_updated: String,
}

/// A partial status document; `None` fields keep whatever is already persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatusUpdate {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub state:       Option<CrawlState>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keyword:     Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_urls:  Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub processed:   Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub found:       Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub current_url: Option<String>,
}

impl StatusUpdate {
	pub fn started(keyword: &str, total_urls: usize) -> Self {
		Self {
			state:       Some(CrawlState::Running),
			keyword:     Some(keyword.to_string()),
			total_urls:  Some(total_urls),
			processed:   Some(0),
			found:       Some(0),
			current_url: Some(String::new()),
		}
	}

	pub fn progress(processed: usize, found: usize, current_url: &str) -> Self {
		Self {
			processed: Some(processed),
			found: Some(found),
			current_url: Some(current_url.to_string()),
			..Self::default()
		}
	}

	pub fn completed() -> Self {
		Self { state: Some(CrawlState::Completed), ..Self::default() }
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRecord {
	pub url:     String,
	pub kind:    ResourceKind,
	pub found:   bool,
	pub details: String,
}

impl ResultRecord {
	pub fn matched(url: &str, kind: ResourceKind, m: &MatchResult) -> Self {
		let details = if m.found { format!("Found {} times", m.occurrences) } else { String::from("Not found") };
		Self { url: url.to_string(), kind, found: m.found, details }
	}

	pub fn failed(url: &str, err: &Error) -> Self {
		Self { url: url.to_string(), kind: ResourceKind::Error, found: false, details: format!("{:#}", err) }
	}

	pub fn found_str(&self) -> &'static str {
		if self.found {
			"YES"
		} else {
			"NO"
		}
	}
}

impl fmt::Display for ResultRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}] {} {} ({})", self.kind, self.url, self.found_str(), self.details)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchResult {
	pub found:       bool,
	pub occurrences: usize,
}

#[derive(Clone, Debug)]
pub struct Extracted {
	pub text: String,
	pub kind: ResourceKind,
}

#[derive(Clone, Default)]
pub struct FetchMetrics {
	pub duration:  Duration,
	pub redirects: usize,
}

#[derive(Clone)]
pub struct FetchData {
	/// as dequeued, before any redirect
	pub url:           Url,
	pub effective_url: Url,
	pub code:          u16,
	pub content_type:  String,
	pub bytes:         Bytes,
	pub metrics:       FetchMetrics,
}

impl fmt::Display for FetchData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"[{}] {} {:?} loaded {}ms / {} / redirects {}",
			self.code,
			self.effective_url,
			self.content_type,
			self.metrics.duration.as_millis(),
			format_size(self.bytes.len(), DECIMAL),
			self.metrics.redirects
		)
	}
}

/// Outcome of extraction + matching for one fetched payload.
#[derive(Clone, Debug)]
pub struct ParsedPage {
	pub kind:    ResourceKind,
	pub matched: MatchResult,
}

pub struct ParserTask {
	pub payload: Box<dyn FnOnce() -> Result<ParsedPage> + Send + 'static>,
	pub time:    Instant,
	pub res_tx:  Sender<ParserResponse>,
}

pub struct ParserResponse {
	pub payload:       Result<ParsedPage>,
	pub wait_duration: Duration,
	pub work_duration: Duration,
}

/// Worker -> scheduler message, one per dequeued url.
pub struct TaskUpdate {
	pub worker: usize,
	pub record: ResultRecord,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrawlSummary {
	pub total:      usize,
	pub processed:  usize,
	pub found:      usize,
	pub per_worker: Vec<usize>,
}

impl fmt::Display for CrawlSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "processed {}/{} urls, found {} matches", self.processed, self.total, self.found)
	}
}

pub struct Job {
	pub keyword:  String,
	pub urls:     Vec<String>,
	pub settings: Arc<config::CrawlingSettings>,
}

impl Job {
	pub fn new(keyword: &str, urls: Vec<String>, settings: config::CrawlingSettings) -> Self {
		Self::new_with_shared_settings(keyword, urls, Arc::new(settings))
	}

	/// Urls are trimmed; blank and repeated entries are dropped.
	pub fn new_with_shared_settings(keyword: &str, urls: Vec<String>, settings: Arc<config::CrawlingSettings>) -> Self {
		let urls = urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).map(String::from).collect();
		Self { keyword: keyword.to_string(), urls: dedup_urls(urls), settings }
	}

	/// Startup loading: a missing keyword config or url list aborts before anything is written.
	pub fn load(paths: &config::Paths, settings: config::CrawlingSettings) -> anyhow::Result<Self> {
		let keyword = config::KeywordConfig::load(&paths.keyword_config)?.search_keyword;
		let urls = load_url_list(&paths.input)?;
		let mut job = Self::new(&keyword, urls, settings);

		if job.settings.skip_processed {
			let done = crate::result_sink::ResultSink::processed_urls(&paths.output)?;
			let before = job.urls.len();
			job.urls.retain(|u| !done.contains(u));
			info!(skipped = before - job.urls.len(), "skipping previously processed urls");
		}

		if let Some(limit) = job.settings.limit {
			job.urls.truncate(limit);
		}
		Ok(job)
	}
}

/// Reads one url per line, trimming whitespace and dropping blanks and duplicates.
pub fn load_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
	if !path.exists() {
		bail!("url list {} not found", path.display())
	}
	let raw = fs::read_to_string(path).with_context(|| format!("cannot read url list {}", path.display()))?;
	let lines: Vec<String> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect();

	let total = lines.len();
	let urls = dedup_urls(lines);
	if urls.len() < total {
		info!("removed {} duplicate urls from input list", total - urls.len());
	}
	Ok(urls)
}

fn dedup_urls(urls: Vec<String>) -> Vec<String> {
	let mut seen = HashSet::with_capacity(urls.len());
	urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}
