//! The status document polled by external observers (dashboards, `watch cat ...`).
//!
//! Every update is a read-modify-write of the whole json object followed by an atomic replace
//! (temp file in the same directory, then rename), so a reader sees either the previous or the
//! next document, never a torn one. The crawler routes every update through one owner, which
//! rules out lost updates between workers.

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

#[allow(unused_imports)]
use crate::_prelude::*;
use crate::types::{CrawlStatus, StatusUpdate};

#[derive(Clone, Debug)]
pub struct StatusStore {
	path: PathBuf,
}

impl StatusStore {
	pub fn new(path: &Path) -> Self {
		Self { path: path.to_path_buf() }
	}

	/// Merges `update` into the persisted document and stamps `last_updated`.
	pub fn update(&self, update: &StatusUpdate) -> anyhow::Result<()> {
		let mut doc = self.read_raw();

		if let Value::Object(fields) = serde_json::to_value(update).context("cannot serialize status update")? {
			doc.extend(fields);
		}
		doc.insert(
			String::from("last_updated"),
			Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
		);

		self.write(&doc)
	}

	/// Typed view of the current document, `None` while it is missing or incomplete.
	pub fn read(&self) -> Option<CrawlStatus> {
		serde_json::from_value(Value::Object(self.read_raw())).ok()
	}

	// missing or unparsable means "no prior status"
	fn read_raw(&self) -> Map<String, Value> {
		let raw = match fs::read_to_string(&self.path) {
			Ok(raw) => raw,
			Err(_) => return Map::new(),
		};
		if raw.trim().is_empty() {
			return Map::new()
		}

		match serde_json::from_str::<Value>(&raw) {
			Ok(Value::Object(map)) => map,
			Ok(_) | Err(_) => {
				debug!(path = %self.path.display(), "status document unreadable, starting from scratch");
				Map::new()
			}
		}
	}

	fn write(&self, doc: &Map<String, Value>) -> anyhow::Result<()> {
		let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
			Some(dir) => {
				fs::create_dir_all(dir).with_context(|| format!("cannot create directory {}", dir.display()))?;
				dir
			}
			None => Path::new("."),
		};

		let mut tmp = NamedTempFile::new_in(dir).context("cannot create temporary status file")?;
		serde_json::to_writer_pretty(&mut tmp, doc).context("cannot serialize status document")?;
		tmp.flush().context("cannot flush status document")?;
		tmp.as_file().sync_all().context("cannot sync status document")?;
		tmp.persist(&self.path).with_context(|| format!("cannot replace {}", self.path.display()))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::CrawlState;

	#[test]
	fn update_merges_partial_fields() {
		let dir = tempfile::tempdir().unwrap();
		let store = StatusStore::new(&dir.path().join("crawl_status.json"));

		store.update(&StatusUpdate::started("invoice", 3)).unwrap();
		store.update(&StatusUpdate::progress(1, 1, "https://a.test/")).unwrap();

		let status = store.read().unwrap();
		assert_eq!(status.state, CrawlState::Running);
		assert_eq!(status.keyword, "invoice");
		assert_eq!(status.total_urls, 3);
		assert_eq!(status.processed, 1);
		assert_eq!(status.found, 1);
		assert_eq!(status.current_url, "https://a.test/");
		assert!(chrono::DateTime::parse_from_rfc3339(&status.last_updated).is_ok());

		store.update(&StatusUpdate::completed()).unwrap();
		let status = store.read().unwrap();
		assert_eq!(status.state, CrawlState::Completed);
		assert_eq!(status.processed, 1);
	}

	#[test]
	fn corrupt_document_is_treated_as_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crawl_status.json");
		fs::write(&path, "{\"state\": \"RUNN").unwrap();

		let store = StatusStore::new(&path);
		assert!(store.read().is_none());

		store.update(&StatusUpdate::progress(2, 0, "https://b.test/")).unwrap();
		let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(raw["processed"], 2);
		assert!(raw.get("state").is_none());
	}

	#[test]
	fn foreign_fields_survive_updates() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crawl_status.json");
		fs::write(&path, r#"{"operator": "night shift"}"#).unwrap();

		let store = StatusStore::new(&path);
		store.update(&StatusUpdate::started("k", 1)).unwrap();

		let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(raw["operator"], "night shift");
		assert_eq!(raw["state"], "RUNNING");
	}

	#[test]
	fn persisted_document_is_complete_json() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crawl_status.json");
		let store = StatusStore::new(&path);
		store.update(&StatusUpdate::started("k", 2)).unwrap();

		let raw = fs::read_to_string(&path).unwrap();
		let doc: Value = serde_json::from_str(&raw).unwrap();
		assert_eq!(doc["total_urls"], 2);
		assert_eq!(fs::metadata(&path).unwrap().len() as usize, raw.len());
	}

	#[test]
	fn no_temporary_files_left_behind() {
		let dir = tempfile::tempdir().unwrap();
		let store = StatusStore::new(&dir.path().join("crawl_status.json"));
		for i in 0..10 {
			store.update(&StatusUpdate::progress(i, 0, "u")).unwrap();
		}
		let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
		assert_eq!(entries.len(), 1);
	}
}
