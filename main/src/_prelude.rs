pub use std::{
	collections::{HashMap, HashSet},
	fmt,
	fmt::Debug,
	fs,
	io,
	ops::Deref,
	path::{Path, PathBuf},
	str::FromStr,
	sync::Arc,
};

pub use anyhow::{anyhow, bail, Context as _};
pub use derivative::Derivative;
pub use flume::{bounded as bounded_ch, unbounded as unbounded_ch, Receiver, Sender};
pub use rand::{thread_rng, Rng};
pub use strum::IntoStaticStr;
pub use tokio::time::{self, timeout, Duration, Instant};
pub use tracing::{debug, error, info, trace, warn, Level};
pub use tracing_tools::{span, TaskFut, TracingTask};
pub use url::Url;
