use std::panic;

use crate::{_prelude::*, config, extractor::panic_message, types::*};

/// Dedicated threads for the CPU-bound part of the pipeline (pdf/html extraction and matching),
/// fed over a bounded channel so async workers never block the runtime on parsing.
#[derive(Clone)]
pub struct ParserProcessor {
	profile: config::ParserProfile,
	rx:      Receiver<ParserTask>,
}

impl ParserProcessor {
	/// Threads exit once every returned sender (and its clones) is dropped.
	pub fn spawn(profile: config::ParserProfile) -> anyhow::Result<Sender<ParserTask>> {
		let (tx, rx) = bounded_ch::<ParserTask>(profile.buffer_size.max(1));

		let s = Self { profile, rx };
		s.go()?;
		Ok(tx)
	}

	fn process(&self, n: usize) {
		let _span = span!(n = n).entered();

		while let Ok(task) = self.rx.recv() {
			if task.res_tx.is_disconnected() {
				continue
			}

			let wait_time = task.time.elapsed();
			let t = Instant::now();
			let res = match panic::catch_unwind(panic::AssertUnwindSafe(task.payload)) {
				Ok(res) => res,
				Err(payload) => {
					let msg = panic_message(payload.as_ref());
					warn!("parser task panicked: {}", msg);
					Err(Error::Panic(msg))
				}
			};
			let work_time = t.elapsed();

			let _ = task.res_tx.send(ParserResponse { payload: res, wait_duration: wait_time, work_duration: work_time });
		}
		trace!("parser processor {} is done", n);
	}

	fn go(self) -> anyhow::Result<()> {
		let mut core_ids = core_affinity::get_core_ids().unwrap_or_default().into_iter();

		let mut pin = self.profile.pin;
		for n in 0..self.profile.concurrency.max(1) {
			let p = self.clone();
			let mut thread_builder = std::thread::Builder::new().name(format!("parser processor {}", n));
			if let Some(stack_size) = &self.profile.stack_size {
				thread_builder = thread_builder.stack_size(**stack_size);
			}

			let id = if pin > 0 {
				pin -= 1;
				core_ids.next()
			} else {
				None
			};
			let _ = thread_builder
				.spawn(move || {
					if let Some(id) = id {
						core_affinity::set_for_current(id);
					}
					p.process(n);
				})
				.context("cannot spawn parser processor thread")?;
		}
		Ok(())
	}
}
