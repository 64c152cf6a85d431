mod _prelude;
pub mod prelude;

mod task_processor;
mod task_scheduler;

pub mod config;
pub mod types;

mod crawler;
pub use crawler::*;
mod delay;
pub use delay::*;
mod fetcher;
pub use fetcher::*;
mod parser_processor;
pub use parser_processor::*;

pub mod extractor;
pub mod matcher;
pub mod result_sink;
pub mod status_store;
