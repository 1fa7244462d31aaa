//! # sigbuffer
//!
//! Run one child process and mirror its stdout/stderr to our own while
//! attached. While detached, hold its output in memory and replay it, in
//! order, the moment we reattach. Mode switches arrive as Unix signals
//! (`SIGUSR1` attaches, `SIGUSR2` detaches by default) and are picked up by a
//! single-threaded event loop, never inside a signal handler.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sigbuffer::{supervise, ChildSpec, SupervisorOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let spec = ChildSpec::new("sh", ["-c", "while true; do date; sleep 1; done"]);
//! let outcome = supervise(&spec, &SupervisorOptions::default()).await.unwrap();
//! std::process::exit(outcome.code().into());
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod launch;
pub mod router;
pub mod signals;
pub mod supervisor;
pub mod telemetry;
pub mod types;

pub use buffer::SpillBuffer;
pub use error::{ConfigError, SupervisorError};
pub use launch::{launch, ChildSpec, LaunchedChild};
pub use router::{Channel, Router};
pub use signals::{ControlSource, SignalControl};
pub use supervisor::{supervise, Supervisor, SupervisorOptions};
pub use types::*;
