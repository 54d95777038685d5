pub mod prompt;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::utils::error::{EnrollError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};

pub const DEFAULT_SERVICE_PORT: u16 = 62050;
pub const DEFAULT_API_PORT: u16 = 62051;

/// The panel API grew a second, incompatible set of paths. Both are still
/// deployed in the wild, so the variant is operator-selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiVariant {
    /// `/api/node` + `/api/node/settings`
    Legacy,
    /// `/api/admin/nodes` + `/api/admin/nodes/certificate`
    Current,
}

impl ApiVariant {
    pub fn token_path(&self) -> &'static str {
        "/api/admin/token"
    }

    pub fn certificate_path(&self) -> &'static str {
        match self {
            ApiVariant::Legacy => "/api/node/settings",
            ApiVariant::Current => "/api/admin/nodes/certificate",
        }
    }

    pub fn register_path(&self) -> &'static str {
        match self {
            ApiVariant::Legacy => "/api/node",
            ApiVariant::Current => "/api/admin/nodes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "node-enroll")]
#[command(about = "Enroll a relay node into a proxy panel and optionally bootstrap it over SSH")]
pub struct CliConfig {
    /// Panel domain or IP
    #[arg(long)]
    pub panel_host: Option<String>,

    #[arg(long, default_value = "443")]
    pub panel_port: u16,

    #[arg(long, value_enum, default_value = "https")]
    pub protocol: Protocol,

    /// Which panel API path set to talk to
    #[arg(long, value_enum, default_value = "current")]
    pub api_variant: ApiVariant,

    /// Skip TLS certificate verification (self-signed panels)
    #[arg(long)]
    pub insecure: bool,

    #[arg(long, default_value = "30")]
    pub http_timeout_secs: u64,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Unique node name shown in the panel
    #[arg(long)]
    pub node_name: Option<String>,

    /// Public address the panel will reach the node at
    #[arg(long)]
    pub node_address: Option<String>,

    #[arg(long, default_value = "62050")]
    pub service_port: u16,

    #[arg(long, default_value = "62051")]
    pub api_port: u16,

    /// Expose the node as a host for every configured inbound
    #[arg(long)]
    pub add_as_new_host: bool,

    /// Also SSH into the node host and install the agent
    #[arg(long)]
    pub bootstrap: bool,

    /// Node host to SSH into (defaults to --node-address)
    #[arg(long)]
    pub ssh_host: Option<String>,

    #[arg(long, default_value = "22")]
    pub ssh_port: u16,

    #[arg(long, default_value = "root")]
    pub ssh_user: String,

    #[arg(long)]
    pub ssh_password: Option<String>,

    #[arg(long, default_value = "10")]
    pub ssh_timeout_secs: u64,

    /// Leave the remote firewall alone during bootstrap
    #[arg(long)]
    pub keep_firewall: bool,

    /// Collect configuration through prompts instead of flags
    #[arg(long)]
    pub interactive: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub api_variant: ApiVariant,
    pub insecure: bool,
    pub http_timeout_secs: u64,
}

impl PanelConfig {
    /// 與原腳本一致：協議默認端口不寫進 URL。
    pub fn base_url(&self) -> String {
        if self.port == self.protocol.default_port() {
            format!("{}://{}", self.protocol.scheme(), self.host)
        } else {
            format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeProfile {
    pub name: String,
    pub address: String,
    pub service_port: u16,
    pub api_port: u16,
    pub add_as_new_host: bool,
}

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub connect_timeout_secs: u64,
    pub disable_firewall: bool,
}

/// Everything one run needs, resolved from either flags or prompts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub panel: PanelConfig,
    pub node: NodeProfile,
    pub ssh: Option<SshConfig>,
}

impl CliConfig {
    fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
        value.as_deref().ok_or_else(|| EnrollError::ConfigError {
            message: format!("missing required flag --{}", flag),
        })
    }

    /// Resolve the flag surface into a RunConfig. Interactive mode goes
    /// through `prompt::Prompter` instead.
    pub fn into_run_config(self) -> Result<RunConfig> {
        let panel = PanelConfig {
            protocol: self.protocol,
            host: Self::required(&self.panel_host, "panel-host")?.to_string(),
            port: self.panel_port,
            username: Self::required(&self.username, "username")?.to_string(),
            password: Self::required(&self.password, "password")?.to_string(),
            api_variant: self.api_variant,
            insecure: self.insecure,
            http_timeout_secs: self.http_timeout_secs,
        };

        let node = NodeProfile {
            name: Self::required(&self.node_name, "node-name")?.to_string(),
            address: Self::required(&self.node_address, "node-address")?.to_string(),
            service_port: self.service_port,
            api_port: self.api_port,
            add_as_new_host: self.add_as_new_host,
        };

        let ssh = if self.bootstrap {
            Some(SshConfig {
                host: self
                    .ssh_host
                    .unwrap_or_else(|| node.address.clone()),
                port: self.ssh_port,
                user: self.ssh_user,
                password: Self::required(&self.ssh_password, "ssh-password")?.to_string(),
                connect_timeout_secs: self.ssh_timeout_secs,
                disable_firewall: !self.keep_firewall,
            })
        } else {
            None
        };

        let config = RunConfig { panel, node, ssh };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("panel_host", &self.panel.host)?;
        validate_url("panel_url", &self.panel.base_url())?;
        validate_non_empty_string("username", &self.panel.username)?;
        validate_non_empty_string("password", &self.panel.password)?;
        validate_non_empty_string("node_name", &self.node.name)?;
        validate_non_empty_string("node_address", &self.node.address)?;

        if self.node.service_port == self.node.api_port {
            return Err(EnrollError::ValidationError {
                field: "api_port".to_string(),
                reason: "Service port and API port must differ".to_string(),
            });
        }

        if let Some(ssh) = &self.ssh {
            validate_non_empty_string("ssh_host", &ssh.host)?;
            validate_non_empty_string("ssh_user", &ssh.user)?;
            validate_non_empty_string("ssh_password", &ssh.password)?;
        }

        Ok(())
    }
}
