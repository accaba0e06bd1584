//! Wi-SUN SoC border router bridge agent
//!
//! The agent sits between a Wi-SUN SoC border router and the host: it
//! accepts frames the SoC pushes over TCP (topology updates, configuration
//! installs, configuration queries), mirrors that state in a locked session,
//! drives the SoC over an outbound control link, and exposes the state to
//! the host message bus.

pub mod bus;
pub mod config;
pub mod error;
pub mod msg;
pub mod server;
pub mod session;
pub mod settings;
pub mod soc_client;
pub mod topology;

pub use error::{AgentError, Result};
pub use msg::{Msg, MsgCode};
pub use session::{Session, SessionSnapshot};
pub use settings::Settings;
pub use soc_client::SocClient;

/// Daemon name used in logs and the startup banner
pub const APP_NAME: &str = "bragentd";

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
