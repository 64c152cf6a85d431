use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use keyword_crawler::prelude::*;
use tracing::Level;

type Result<T> = anyhow::Result<T>;

#[derive(Debug, Parser)]
#[command(name = "keyword-crawler", version, about = "Searches a list of HTML/PDF urls for a keyword")]
struct Cli {
	/// JSON settings file; every field is optional
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	/// url list, one per line
	#[arg(short, long, value_name = "FILE")]
	input: Option<PathBuf>,

	/// json file holding `search_keyword`
	#[arg(short, long, value_name = "FILE")]
	keyword_config: Option<PathBuf>,

	#[arg(short, long, value_name = "FILE")]
	status: Option<PathBuf>,

	/// csv result table, appended to when it already exists
	#[arg(short, long, value_name = "FILE")]
	output: Option<PathBuf>,

	#[arg(short, long, value_name = "N")]
	workers: Option<usize>,

	/// only process the first N urls
	#[arg(long, value_name = "N")]
	limit: Option<usize>,

	/// skip urls already present in the result table
	#[arg(long, default_value_t = false)]
	skip_processed: bool,
}

impl Cli {
	fn into_config(self) -> Result<Config> {
		let mut config = match &self.config {
			Some(path) => Config::load(path)?,
			None => Config::default(),
		};

		if let Some(v) = self.input {
			config.paths.input = v;
		}
		if let Some(v) = self.keyword_config {
			config.paths.keyword_config = v;
		}
		if let Some(v) = self.status {
			config.paths.status = v;
		}
		if let Some(v) = self.output {
			config.paths.output = v;
		}
		if let Some(v) = self.workers {
			config.crawling.concurrency = v;
		}
		if self.limit.is_some() {
			config.crawling.limit = self.limit;
		}
		if self.skip_processed {
			config.crawling.skip_processed = true;
		}
		Ok(config)
	}
}

fn configure_tracing(level: Level) -> Result<()> {
	let collector = tracing_subscriber::fmt()
		.with_target(false)
		.with_max_level(level)
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(collector)?;
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let config = Cli::parse().into_config()?;
	configure_tracing(*config.log_level)?;

	let tx_pp = ParserProcessor::spawn(config.parser.clone())?;
	let crawler = Crawler::new(config.networking.clone(), tx_pp);

	let summary = crawler.run(&config.paths, config.crawling.clone()).await.context("crawl failed")?;

	println!("Crawl completed: {}", summary);
	println!("Results saved to {}", config.paths.output.display());
	Ok(())
}
