// Allow unused code for items that are part of the public API
#![allow(dead_code)]

pub mod config;
pub mod queue;
pub mod reassembly;
pub mod receiver;
pub mod server;
pub mod supervisor;
pub mod worker;

// Re-export commonly used types
pub use config::{SyslogConfig, load_config, validate_config, write_config};
pub use server::SyslogServer;

/// Largest datagram read from the socket. ISE fragments its own payloads
/// above this, so anything longer is another sender's problem.
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// IANA syslog port.
pub const DEFAULT_SYSLOG_PORT: u16 = 514;

/// Bounded wait on every blocking primitive so each task observes shutdown
/// within a few seconds.
pub const DEQUEUE_WAIT_SECS: u64 = 1;
