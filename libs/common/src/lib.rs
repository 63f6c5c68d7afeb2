//! Shared bootstrap pieces for the NM2 bridge binaries
//!
//! - `logging`: tracing subscriber setup with bracketed levels
//! - `bootstrap_args`: common command-line arguments
//! - `shutdown`: signal handling for the streaming loop

pub mod bootstrap_args;
pub mod logging;
pub mod shutdown;

pub use bootstrap_args::{OutputFormat, ServiceArgs};
pub use logging::{LogConfig, LoggingError};
pub use shutdown::ShutdownSignal;
