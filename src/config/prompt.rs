use std::io::{BufRead, Write};

use crate::config::{
    CliConfig, NodeProfile, PanelConfig, Protocol, RunConfig, SshConfig, DEFAULT_API_PORT,
    DEFAULT_SERVICE_PORT,
};
use crate::utils::error::{EnrollError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_port, Validate};

/// Interactive configuration collection. Questions go to `output` (stderr in
/// production, stdout stays reserved for the certificate) and answers come
/// from `input`, so the whole dialogue is testable with in-memory buffers.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(EnrollError::ConfigError {
                message: "unexpected end of input".to_string(),
            });
        }
        Ok(line.trim().to_string())
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        // 空白輸入會重問
        loop {
            write!(self.output, "{}: ", question)?;
            self.output.flush()?;
            let answer = self.read_line()?;
            if validate_non_empty_string("answer", &answer).is_ok() {
                return Ok(answer);
            }
            writeln!(self.output, "invalid value, try again...")?;
        }
    }

    fn ask_with_default(&mut self, question: &str, default: &str) -> Result<String> {
        write!(self.output, "{} (default: {}): ", question, default)?;
        self.output.flush()?;
        let answer = self.read_line()?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        loop {
            write!(self.output, "{} (y/n): ", question)?;
            self.output.flush()?;
            match self.read_line()?.to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => writeln!(self.output, "invalid value, try again...")?,
            }
        }
    }

    fn ask_port(&mut self, question: &str, field: &str) -> Result<u16> {
        loop {
            write!(self.output, "{}: ", question)?;
            self.output.flush()?;
            let answer = self.read_line()?;
            match validate_port(field, &answer) {
                Ok(port) => return Ok(port),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
    }

    /// Walk the operator through every field a full run needs. Fields with
    /// no prompt (API variant, timeouts, the firewall step) come from the
    /// flag surface so both entry modes honor them.
    pub fn collect(&mut self, cli: &CliConfig) -> Result<RunConfig> {
        writeln!(self.output, "--- Panel information ---")?;
        let panel_host = self.ask("Please enter your panel domain/IP")?;
        let panel_port = self.ask_port("Please enter your panel port", "panel_port")?;
        let username = self.ask("Please enter your panel username")?;
        let password = self.ask("Please enter your panel password")?;
        let https = self.ask_yes_no("Are you using HTTPS/SSL?")?;
        let insecure = if https {
            self.ask_yes_no("Skip TLS certificate verification (self-signed panel)?")?
        } else {
            false
        };
        let add_as_new_host =
            self.ask_yes_no("Add this node as a new host for every inbound?")?;

        let ssh = if cli.bootstrap {
            writeln!(self.output, "--- Node server information (SSH) ---")?;
            let host = self.ask("Please enter your node server domain/IP")?;
            let port_raw = self.ask_with_default("Please enter your node server SSH port", "22")?;
            let port = validate_port("ssh_port", &port_raw)?;
            let user = self.ask_with_default("Please enter your node server SSH user", "root")?;
            let ssh_password = self.ask("Please enter your node server SSH password")?;
            Some((host, port, user, ssh_password))
        } else {
            None
        };

        writeln!(self.output, "--- Node details for the panel ---")?;
        let node_name = self.ask("Enter a unique name for this node")?;
        let default_address = ssh
            .as_ref()
            .map(|(host, _, _, _)| host.clone())
            .unwrap_or_default();
        let node_address = if default_address.is_empty() {
            self.ask("Enter the node's public address")?
        } else {
            self.ask_with_default("Enter the node's public address", &default_address)?
        };

        let auto_ports = self.ask_yes_no(&format!(
            "Auto-assign service/api ports ({}, {})?",
            DEFAULT_SERVICE_PORT, DEFAULT_API_PORT
        ))?;
        let (service_port, api_port) = if auto_ports {
            (DEFAULT_SERVICE_PORT, DEFAULT_API_PORT)
        } else {
            (
                self.ask_port("Enter the service port for this node", "service_port")?,
                self.ask_port("Enter the API port for this node", "api_port")?,
            )
        };

        let config = RunConfig {
            panel: PanelConfig {
                protocol: if https { Protocol::Https } else { Protocol::Http },
                host: panel_host,
                port: panel_port,
                username,
                password,
                api_variant: cli.api_variant,
                insecure,
                http_timeout_secs: cli.http_timeout_secs,
            },
            node: NodeProfile {
                name: node_name,
                address: node_address,
                service_port,
                api_port,
                add_as_new_host,
            },
            ssh: ssh.map(|(host, port, user, password)| SshConfig {
                host,
                port,
                user,
                password,
                connect_timeout_secs: cli.ssh_timeout_secs,
                disable_firewall: !cli.keep_firewall,
            }),
        };
        config.validate()?;
        Ok(config)
    }
}
