//! Host integration surface: a line-oriented JSON command bridge.

pub mod contract;
pub mod handler;
pub mod stdio;

pub use contract::{CommandEnvelope, CommandName, ResponseEnvelope};
pub use handler::HostHandler;
pub use stdio::{run_bridge, run_stdio_bridge};
