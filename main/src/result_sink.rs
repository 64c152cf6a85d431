//! Append-only csv result table. The file is owned by a single writer (the task scheduler),
//! each row is flushed on its own so a crash loses at most the row in flight.

use std::fs::{File, OpenOptions};

#[allow(unused_imports)]
use crate::_prelude::*;
use crate::types::ResultRecord;

pub const HEADER: [&str; 4] = ["URL", "Type", "Found", "Details"];

pub struct ResultSink {
	path:   PathBuf,
	writer: csv::Writer<File>,
}

impl ResultSink {
	/// Creates the table with a header, or reopens an existing one for appending.
	pub fn open(path: &Path) -> anyhow::Result<Self> {
		let resume = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);

		if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
			fs::create_dir_all(dir).with_context(|| format!("cannot create directory {}", dir.display()))?;
		}
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(path)
			.with_context(|| format!("cannot open result table {}", path.display()))?;

		let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
		if resume {
			debug!(path = %path.display(), "appending to existing result table");
		} else {
			writer.write_record(HEADER).context("cannot write result table header")?;
			writer.flush().context("cannot flush result table header")?;
		}

		Ok(Self { path: path.to_path_buf(), writer })
	}

	pub fn append(&mut self, record: &ResultRecord) -> anyhow::Result<()> {
		let kind: &'static str = record.kind.into();
		self.writer
			.write_record([record.url.as_str(), kind, record.found_str(), record.details.as_str()])
			.with_context(|| format!("cannot append {} to {}", record.url, self.path.display()))?;
		self.writer.flush().with_context(|| format!("cannot flush {}", self.path.display()))?;
		Ok(())
	}

	/// Urls already recorded in an existing table, used to skip finished work on resume.
	pub fn processed_urls(path: &Path) -> anyhow::Result<HashSet<String>> {
		if !path.exists() {
			return Ok(HashSet::new())
		}
		let mut reader = csv::ReaderBuilder::new()
			.has_headers(true)
			.flexible(true)
			.from_path(path)
			.with_context(|| format!("cannot open result table {}", path.display()))?;

		let mut urls = HashSet::new();
		for row in reader.records() {
			match row {
				Ok(row) => {
					if let Some(url) = row.get(0).filter(|u| !u.is_empty()) {
						urls.insert(url.to_string());
					}
				}
				Err(err) => warn!("skipping unreadable row in {}: {}", path.display(), err),
			}
		}
		Ok(urls)
	}
}
