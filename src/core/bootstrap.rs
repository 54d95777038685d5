use crate::utils::error::{EnrollError, Result};

pub const AGENT_REPO_URL: &str = "https://github.com/Gozargah/Marzban-node";
pub const AGENT_DIR: &str = "$HOME/Marzban-node";
pub const AGENT_IMAGE: &str = "gozargah/marzban-node:latest";
pub const CERT_DIR: &str = "/var/lib/marzban-node";
pub const CERT_PATH: &str = "/var/lib/marzban-node/ssl_client_cert.pem";

/// One executed remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the bootstrap sequence and the transport that runs it.
/// Production uses an SSH session; tests use a scripted fake.
pub trait CommandSession {
    fn exec(&mut self, command: &str) -> Result<CommandOutput>;
    fn close(&mut self);
}

/// The regenerated single-service compose file, rendered from explicit
/// fields instead of spliced-together shell strings.
#[derive(Debug, Clone)]
pub struct ComposeTemplate<'a> {
    pub cert_path: &'a str,
    pub service_port: u16,
    pub api_port: u16,
}

impl ComposeTemplate<'_> {
    pub fn render(&self) -> String {
        format!(
            "services:\n\
             \x20 marzban-node:\n\
             \x20   image: {image}\n\
             \x20   restart: always\n\
             \x20   network_mode: host\n\
             \x20   environment:\n\
             \x20     SSL_CLIENT_CERT_FILE: \"{cert_path}\"\n\
             \x20     SERVICE_PORT: \"{service_port}\"\n\
             \x20     XRAY_API_PORT: \"{api_port}\"\n\
             \x20   volumes:\n\
             \x20     - /var/lib/marzban-node:/var/lib/marzban-node\n\
             \x20     - /var/lib/marzban:/var/lib/marzban\n",
            image = AGENT_IMAGE,
            cert_path = self.cert_path,
            service_port = self.service_port,
            api_port = self.api_port,
        )
    }
}

/// Wrap arbitrary content in single quotes so the remote shell passes it
/// through byte-for-byte. PEM blobs contain no single quotes, but the
/// escaping keeps this safe for anything.
fn shell_quote(content: &str) -> String {
    format!("'{}'", content.replace('\'', "'\\''"))
}

fn write_remote_file(content: &str, path: &str) -> String {
    format!(
        "printf '%s' {} | sudo tee {} > /dev/null",
        shell_quote(content),
        path
    )
}

/// Runs the fixed node install sequence over a command session, stopping at
/// the first non-zero exit.
pub struct BootstrapRunner {
    service_port: u16,
    api_port: u16,
    disable_firewall: bool,
}

impl BootstrapRunner {
    pub fn new(service_port: u16, api_port: u16, disable_firewall: bool) -> Self {
        Self {
            service_port,
            api_port,
            disable_firewall,
        }
    }

    /// The ordered command plan. Fixed at build time, parameterized only by
    /// the certificate content and the two ports.
    pub fn plan(&self, certificate: &str) -> Vec<String> {
        let compose = ComposeTemplate {
            cert_path: CERT_PATH,
            service_port: self.service_port,
            api_port: self.api_port,
        }
        .render();

        let mut commands = Vec::new();
        if self.disable_firewall {
            commands.push("sudo ufw disable".to_string());
        }
        commands.push("curl -fsSL https://get.docker.com | sh".to_string());
        // rm -rf 本身就是冪等的
        commands.push(format!("sudo rm -rf {}", AGENT_DIR));
        commands.push(format!("git clone {} {}", AGENT_REPO_URL, AGENT_DIR));
        // up 再 down：只為了預拉鏡像，不留運行中的容器
        commands.push(format!(
            "cd {} && sudo docker compose up -d && sudo docker compose down",
            AGENT_DIR
        ));
        commands.push(format!("sudo rm -f {}/docker-compose.yml", AGENT_DIR));
        commands.push(format!("sudo mkdir -p {}", CERT_DIR));
        commands.push(write_remote_file(certificate, CERT_PATH));
        commands.push(format!(
            "{} && cd {} && sudo docker compose up -d",
            write_remote_file(&compose, &format!("{}/docker-compose.yml", AGENT_DIR)),
            AGENT_DIR
        ));
        commands
    }

    pub fn run<S: CommandSession>(&self, session: &mut S, certificate: &str) -> Result<()> {
        let result = self.run_sequence(session, certificate);
        session.close();
        result
    }

    fn run_sequence<S: CommandSession>(&self, session: &mut S, certificate: &str) -> Result<()> {
        for command in self.plan(certificate) {
            tracing::info!("Executing remote command: {}", summarize(&command));
            let output = session.exec(&command)?;
            if output.exit_code != 0 {
                tracing::error!(
                    "Remote command failed with exit status {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                );
                return Err(EnrollError::Command {
                    command,
                    exit_code: output.exit_code,
                    stderr: output.stderr,
                });
            }
            tracing::debug!("Command output: {}", output.stdout.trim());
        }
        tracing::info!("Node bootstrap completed");
        Ok(())
    }
}

/// Certificate bodies make for unreadable log lines.
fn summarize(command: &str) -> &str {
    match command.find('\n') {
        Some(idx) => &command[..idx],
        None => command,
    }
}
