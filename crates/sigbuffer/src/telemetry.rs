//! Diagnostics setup.
//!
//! The supervisor's stderr doubles as the child's live stderr, so the default
//! filter is quiet and a log file can take diagnostics out of that stream.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
	pub filter: String,
	pub file: Option<PathBuf>,
}

impl Default for LogSettings {
	fn default() -> Self {
		Self {
			filter: "warn".to_string(),
			file: None,
		}
	}
}

#[derive(Debug, Error)]
pub enum TelemetryError {
	#[error("invalid log filter '{filter}': {message}")]
	Filter { filter: String, message: String },
	#[error("failed to open log file '{path}': {source}")]
	File {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

/// Install the global subscriber. Calling it again after a subscriber is
/// already installed leaves the existing one in place.
pub fn init(settings: &LogSettings) -> Result<(), TelemetryError> {
	let subscriber = build(settings)?;
	if tracing::subscriber::set_global_default(subscriber).is_err() {
		tracing::debug!("subscriber already installed");
	}
	Ok(())
}

fn build(settings: &LogSettings) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
	let filter = EnvFilter::try_new(&settings.filter).map_err(|e| TelemetryError::Filter {
		filter: settings.filter.clone(),
		message: e.to_string(),
	})?;

	let builder = fmt::Subscriber::builder()
		.with_env_filter(filter)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false);

	let subscriber: Box<dyn Subscriber + Send + Sync> = match &settings.file {
		Some(path) => {
			let file = open_log(path)?;
			Box::new(builder.with_ansi(false).with_writer(Mutex::new(file)).finish())
		}
		None => Box::new(
			builder
				.with_ansi(io::stderr().is_terminal())
				.with_writer(io::stderr)
				.finish(),
		),
	};
	Ok(subscriber)
}

fn open_log(path: &Path) -> Result<File, TelemetryError> {
	OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.map_err(|source| TelemetryError::File {
			path: path.to_path_buf(),
			source,
		})
}
