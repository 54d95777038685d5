use std::io::Write;

use crate::config::{RunConfig, SshConfig};
use crate::core::bootstrap::{BootstrapRunner, CommandSession};
use crate::core::panel::PanelClient;
use crate::core::ssh::SshSession;
use crate::utils::error::Result;

/// Opens a command session to the node host. The seam lets tests substitute
/// a scripted session for the real SSH transport.
pub trait SessionFactory: Clone + Send + 'static {
    type Session: CommandSession;

    fn connect(&self, config: &SshConfig) -> Result<Self::Session>;
}

#[derive(Debug, Clone)]
pub struct SshFactory;

impl SessionFactory for SshFactory {
    type Session = SshSession;

    fn connect(&self, config: &SshConfig) -> Result<SshSession> {
        SshSession::connect(config)
    }
}

/// Drives one enrollment run: login, fetch certificate, register, and
/// optionally bootstrap the node host. Strictly ordered, first failure wins.
pub struct Orchestrator<F = SshFactory> {
    config: RunConfig,
    sessions: F,
}

impl Orchestrator<SshFactory> {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            sessions: SshFactory,
        }
    }
}

impl<F: SessionFactory> Orchestrator<F> {
    pub fn with_session_factory(config: RunConfig, sessions: F) -> Self {
        Self { config, sessions }
    }

    /// `cert_out` is the primary output channel (stdout in production). It
    /// receives the certificate byte-for-byte and nothing else.
    pub async fn run<W: Write>(&self, cert_out: &mut W) -> Result<()> {
        let client = PanelClient::new(&self.config.panel)?;

        let session = client
            .login(&self.config.panel.username, &self.config.panel.password)
            .await?;

        let certificate = client.fetch_certificate(&session).await?;

        // 證書先於註冊輸出，供調用腳本捕獲
        cert_out.write_all(certificate.as_bytes())?;
        cert_out.flush()?;

        client.register_node(&session, &self.config.node).await?;

        if let Some(ssh) = &self.config.ssh {
            let runner = BootstrapRunner::new(
                self.config.node.service_port,
                self.config.node.api_port,
                ssh.disable_firewall,
            );
            let ssh = ssh.clone();
            let sessions = self.sessions.clone();
            tokio::task::spawn_blocking(move || {
                let mut session = sessions.connect(&ssh)?;
                runner.run(&mut session, &certificate)
            })
            .await
            .map_err(std::io::Error::other)??;
        }

        Ok(())
    }
}
