pub mod config;
pub mod error;
pub mod json_proxy;
pub mod logging;
pub mod relay;
pub mod server;
pub mod upstream;

pub use config::{Credential, ProxyConfig};
pub use error::{ErrorEnvelope, ProxyError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
