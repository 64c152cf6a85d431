#[allow(unused_imports)]
use crate::_prelude::*;
use crate::config;

/// Randomized pause taken by a worker before every fetch, uniform in `[delay, delay + jitter]`.
#[derive(Clone, Debug)]
pub struct Delay {
	delay:  Duration,
	jitter: Duration,
}

impl Delay {
	pub fn new(delay: Duration, jitter: Duration) -> Self {
		Self { delay, jitter }
	}

	pub fn from_settings(settings: &config::CrawlingSettings) -> Self {
		Self::new(*settings.delay, *settings.delay_jitter)
	}

	pub fn next(&self) -> Duration {
		if self.jitter.is_zero() {
			return self.delay
		}
		let jitter_ms = {
			let mut rng = thread_rng();
			rng.gen_range(0..=self.jitter.as_millis() as u64)
		};
		self.delay + Duration::from_millis(jitter_ms)
	}

	pub async fn wait(&self) {
		let d = self.next();
		if d.is_zero() {
			return
		}
		trace!(delay_ms = d.as_millis() as u64, "delaying fetch");
		time::sleep(d).await;
	}
}
