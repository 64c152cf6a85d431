use serde::{de, Deserialize, Deserializer};

use crate::_prelude::*;

#[derive(Clone, Debug)]
pub struct CLevel(pub Level);

impl Deref for CLevel {
	type Target = Level;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'de> Deserialize<'de> for CLevel {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<CLevel, D::Error> {
		let s: String = Deserialize::deserialize(deserializer)?;
		Level::from_str(&s).map(CLevel).map_err(de::Error::custom)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct CBytes(pub usize);

impl Deref for CBytes {
	type Target = usize;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'de> Deserialize<'de> for CBytes {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<CBytes, D::Error> {
		let s: String = Deserialize::deserialize(deserializer)?;
		let s = s.replace('_', "");
		let v = s.parse::<humanize_rs::bytes::Bytes>();
		let r = v.map_err(de::Error::custom)?;
		Ok(CBytes(r.size()))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct CDuration(Duration);

impl Deref for CDuration {
	type Target = Duration;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl CDuration {
	pub fn from_secs(secs: u64) -> Self {
		CDuration(Duration::from_secs(secs))
	}

	pub fn from_millis(millis: u64) -> Self {
		CDuration(Duration::from_millis(millis))
	}
}

impl<'de> Deserialize<'de> for CDuration {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<CDuration, D::Error> {
		let s: String = Deserialize::deserialize(deserializer)?;
		let s = s.replace('_', "");
		let v = humanize_rs::duration::parse(&s);
		let r = v.map_err(de::Error::custom)?;
		Ok(CDuration(r))
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct ParserProfile {
	pub concurrency: usize,
	pub pin:         usize,
	pub stack_size:  Option<CBytes>,
	pub buffer_size: usize,
}

impl Default for ParserProfile {
	fn default() -> Self {
		let physical_cores = num_cpus::get_physical();
		Self { concurrency: physical_cores, pin: 0, stack_size: Some(CBytes(1024 * 1024 * 8)), buffer_size: physical_cores * 4 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct NetworkingProfile {
	pub connect_timeout:          Option<CDuration>,
	pub socket_read_buffer_size:  Option<CBytes>,
	pub socket_write_buffer_size: Option<CBytes>,
}

impl Default for NetworkingProfile {
	fn default() -> Self {
		Self {
			connect_timeout:          Some(CDuration::from_secs(5)),
			socket_write_buffer_size: Some(CBytes(32 * 1024)),
			socket_read_buffer_size:  Some(CBytes(32 * 1024)),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct CrawlingSettings {
	pub concurrency:               usize,
	pub internal_read_buffer_size: CBytes,
	pub max_response_size:         CBytes,
	pub delay:                     CDuration,
	pub delay_jitter:              CDuration,
	pub fetch_timeout:             CDuration,
	pub max_redirect:              usize,
	pub custom_headers:            HashMap<String, Vec<String>>,
	pub user_agent:                Option<String>,
	pub compression:               bool,
	pub skip_processed:            bool,
	pub limit:                     Option<usize>,
}

impl fmt::Display for CrawlingSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"concurrency: {}, delay: {:?}+~{:?}, fetch timeout: {:?}, max redirect: {}, irbs: {:?}, max_response_size: {:?}, custom headers: {:?}",
			self.concurrency, *self.delay, *self.delay_jitter, *self.fetch_timeout, self.max_redirect, *self.internal_read_buffer_size, *self.max_response_size, self.custom_headers,
		)
	}
}

impl Default for CrawlingSettings {
	fn default() -> Self {
		Self {
			concurrency:               5,
			internal_read_buffer_size: CBytes(32 * 1024),
			max_response_size:         CBytes(1024 * 1024 * 64),
			delay:                     CDuration::from_millis(300),
			delay_jitter:              CDuration::from_millis(500),
			fetch_timeout:             CDuration::from_secs(20),
			max_redirect:              5,
			user_agent:                Some(String::from("Mozilla/5.0 (compatible; KeywordCrawler/1.0)")),
			compression:               true,
			custom_headers:            HashMap::new(),
			skip_processed:            false,
			limit:                     None,
		}
	}
}

impl CrawlingSettings {
	/// Folds `user_agent`, `compression` and a default `Accept` into `custom_headers`.
	pub fn build_headers(mut self) -> Self {
		if let Some(user_agent) = &self.user_agent {
			self.custom_headers.insert(http::header::USER_AGENT.to_string(), vec![user_agent.clone()]);
		}
		if self.compression {
			self.custom_headers.insert(http::header::ACCEPT_ENCODING.to_string(), vec!["gzip, deflate".into()]);
		}
		self.custom_headers
			.entry(http::header::ACCEPT.to_string())
			.or_insert_with(|| vec!["text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8".into()]);
		self
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct Paths {
	pub input:          PathBuf,
	pub keyword_config: PathBuf,
	pub status:         PathBuf,
	pub output:         PathBuf,
}

impl Default for Paths {
	fn default() -> Self {
		Self {
			input:          PathBuf::from("crawler/repo.txt"),
			keyword_config: PathBuf::from("crawler/search_config.json"),
			status:         PathBuf::from("crawler/crawl_status.json"),
			output:         PathBuf::from("crawler/keyword_search_results.csv"),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub log_level:  CLevel,
	pub paths:      Paths,
	pub crawling:   CrawlingSettings,
	pub networking: NetworkingProfile,
	pub parser:     ParserProfile,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			log_level:  CLevel(Level::INFO),
			paths:      Paths::default(),
			crawling:   CrawlingSettings::default(),
			networking: NetworkingProfile::default(),
			parser:     ParserProfile::default(),
		}
	}
}

impl Config {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let raw = fs::read_to_string(path).with_context(|| format!("cannot read config {}", path.display()))?;
		serde_json::from_str(&raw).with_context(|| format!("cannot parse config {}", path.display()))
	}
}

/// The `search_keyword` document an operator drops next to the url list.
#[derive(Clone, Debug, Deserialize)]
pub struct KeywordConfig {
	pub search_keyword: String,
}

impl KeywordConfig {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		if !path.exists() {
			bail!("keyword config {} not found", path.display())
		}
		let raw = fs::read_to_string(path).with_context(|| format!("cannot read keyword config {}", path.display()))?;
		let config: KeywordConfig =
			serde_json::from_str(&raw).with_context(|| format!("cannot parse keyword config {}", path.display()))?;

		if config.search_keyword.is_empty() {
			bail!("search_keyword in {} is empty", path.display())
		}
		Ok(config)
	}
}
