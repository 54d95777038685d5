pub mod config;
pub mod core;
pub mod utils;

pub use config::{ApiVariant, CliConfig, NodeProfile, PanelConfig, Protocol, RunConfig, SshConfig};
pub use core::{BootstrapRunner, Orchestrator, PanelClient};
pub use utils::error::{EnrollError, Result};
