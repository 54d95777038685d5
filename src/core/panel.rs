use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::{ApiVariant, NodeProfile, PanelConfig};
use crate::utils::error::{EnrollError, Result};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CertificateResponse {
    certificate: Option<String>,
}

#[derive(Debug, Serialize)]
struct NodeRegistration<'a> {
    name: &'a str,
    address: &'a str,
    port: u16,
    api_port: u16,
    add_as_new_host: bool,
    usage_coefficient: u32,
}

/// Auth token for one run. Never persisted anywhere.
#[derive(Debug, Clone)]
pub struct PanelSession {
    token: String,
}

impl PanelSession {
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Thin client over the panel admin API. Holds its own reqwest client so no
/// process-wide session state exists.
pub struct PanelClient {
    base_url: String,
    variant: ApiVariant,
    http: Client,
}

impl PanelClient {
    pub fn new(config: &PanelConfig) -> Result<Self> {
        if config.insecure {
            tracing::warn!(
                "TLS certificate verification is DISABLED for {}",
                config.base_url()
            );
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| EnrollError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: config.base_url(),
            variant: config.api_variant,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<PanelSession> {
        let url = self.url(self.variant.token_path());
        tracing::info!("Logging in to {}...", url);

        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| EnrollError::Auth {
                reason: format!("request to {} failed: {}", url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrollError::Auth {
                reason: format!("{} returned {}: {}", url, status, body),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| EnrollError::Auth {
            reason: format!("could not parse token response: {}", e),
        })?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                tracing::info!("Logged in successfully");
                Ok(PanelSession { token })
            }
            _ => Err(EnrollError::Auth {
                reason: "response carried no access_token".to_string(),
            }),
        }
    }

    pub async fn fetch_certificate(&self, session: &PanelSession) -> Result<String> {
        let url = self.url(self.variant.certificate_path());
        tracing::info!("Retrieving client certificate from {}...", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(session.token())
            .send()
            .await
            .map_err(|e| EnrollError::Fetch {
                reason: format!("request to {} failed: {}", url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrollError::Fetch {
                reason: format!("{} returned {}: {}", url, status, body),
            });
        }

        let body: CertificateResponse =
            response.json().await.map_err(|e| EnrollError::Fetch {
                reason: format!("could not parse certificate response: {}", e),
            })?;

        body.certificate.ok_or_else(|| EnrollError::Fetch {
            reason: "response carried no certificate".to_string(),
        })
    }

    pub async fn register_node(&self, session: &PanelSession, node: &NodeProfile) -> Result<()> {
        let url = self.url(self.variant.register_path());
        tracing::info!("Adding node '{}' via {}...", node.name, url);

        let registration = NodeRegistration {
            name: &node.name,
            address: &node.address,
            port: node.service_port,
            api_port: node.api_port,
            add_as_new_host: node.add_as_new_host,
            usage_coefficient: 1,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(session.token())
            .json(&registration)
            .send()
            .await
            .map_err(|e| EnrollError::Register {
                status: 0,
                body: format!("request to {} failed: {}", url, e),
            })?;

        let status = response.status();
        // 200 = 更新既有節點，201 = 新建
        if status == StatusCode::OK || status == StatusCode::CREATED {
            tracing::info!("Node '{}' added to panel", node.name);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EnrollError::Register {
                status: status.as_u16(),
                body,
            })
        }
    }
}
