pub mod bootstrap;
pub mod orchestrator;
pub mod panel;
pub mod ssh;

pub use crate::utils::error::Result;
pub use bootstrap::{BootstrapRunner, CommandOutput, CommandSession, ComposeTemplate};
pub use orchestrator::{Orchestrator, SessionFactory, SshFactory};
pub use panel::{PanelClient, PanelSession};
