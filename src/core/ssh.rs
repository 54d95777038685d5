use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use ssh2::Session;

use crate::config::SshConfig;
use crate::core::bootstrap::{CommandOutput, CommandSession};
use crate::utils::error::{EnrollError, Result};

/// Password-authenticated SSH session over libssh2. Blocking on purpose:
/// bootstrap is strictly sequential, callers run it on a blocking task.
pub struct SshSession {
    session: Session,
}

impl SshSession {
    pub fn connect(config: &SshConfig) -> Result<Self> {
        let connect_err = |reason: String| EnrollError::SshConnect {
            host: config.host.clone(),
            port: config.port,
            reason,
        };

        let addr = format!("{}:{}", config.host, config.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(format!("address resolution failed: {}", e)))?
            .next()
            .ok_or_else(|| connect_err("address resolved to nothing".to_string()))?;

        tracing::info!("Connecting to node server {} via SSH...", addr);
        let tcp = TcpStream::connect_timeout(
            &addr,
            Duration::from_secs(config.connect_timeout_secs),
        )
        .map_err(|e| connect_err(e.to_string()))?;

        let mut session = Session::new().map_err(|e| connect_err(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| connect_err(format!("handshake failed: {}", e)))?;

        session
            .userauth_password(&config.user, &config.password)
            .map_err(|_| EnrollError::SshAuth {
                user: config.user.clone(),
                host: config.host.clone(),
            })?;
        if !session.authenticated() {
            return Err(EnrollError::SshAuth {
                user: config.user.clone(),
                host: config.host.clone(),
            });
        }

        tracing::info!("SSH connection established");
        Ok(Self { session })
    }
}

impl CommandSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let channel_err = |reason: String| EnrollError::Command {
            command: command.to_string(),
            exit_code: -1,
            stderr: reason,
        };

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| channel_err(format!("could not open channel: {}", e)))?;
        channel
            .exec(command)
            .map_err(|e| channel_err(format!("exec failed: {}", e)))?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        channel
            .wait_close()
            .map_err(|e| channel_err(format!("wait_close failed: {}", e)))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| channel_err(format!("exit status unavailable: {}", e)))?;

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    fn close(&mut self) {
        if let Err(e) = self
            .session
            .disconnect(None, "node bootstrap finished", None)
        {
            tracing::debug!("SSH disconnect: {}", e);
        } else {
            tracing::info!("SSH connection closed");
        }
    }
}
