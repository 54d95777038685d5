use anyhow::Result;
use httpmock::prelude::*;
use node_enroll::core::{CommandOutput, CommandSession, SessionFactory};
use node_enroll::{
    ApiVariant, EnrollError, NodeProfile, Orchestrator, PanelConfig, Protocol, RunConfig,
    SshConfig,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

const CERT: &str = "-----BEGIN CERT-----abc-----END CERT-----";

/// Scripted stand-in for the SSH transport, shared log of executed commands.
#[derive(Clone)]
struct RecordingFactory {
    executed: Arc<Mutex<Vec<String>>>,
}

impl RecordingFactory {
    fn new() -> Self {
        Self {
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

struct RecordingSession {
    executed: Arc<Mutex<Vec<String>>>,
}

impl CommandSession for RecordingSession {
    fn exec(&mut self, command: &str) -> node_enroll::Result<CommandOutput> {
        self.executed.lock().unwrap().push(command.to_string());
        Ok(CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn close(&mut self) {}
}

impl SessionFactory for RecordingFactory {
    type Session = RecordingSession;

    fn connect(&self, _config: &SshConfig) -> node_enroll::Result<RecordingSession> {
        Ok(RecordingSession {
            executed: self.executed.clone(),
        })
    }
}

fn ssh_config() -> SshConfig {
    SshConfig {
        host: "1.2.3.4".to_string(),
        port: 22,
        user: "root".to_string(),
        password: "secret".to_string(),
        connect_timeout_secs: 1,
        disable_firewall: true,
    }
}

fn run_config(server: &MockServer) -> RunConfig {
    RunConfig {
        panel: PanelConfig {
            protocol: Protocol::Http,
            host: "127.0.0.1".to_string(),
            port: server.port(),
            username: "admin".to_string(),
            password: "pw".to_string(),
            api_variant: ApiVariant::Current,
            insecure: false,
            http_timeout_secs: 5,
        },
        node: NodeProfile {
            name: "node1".to_string(),
            address: "1.2.3.4".to_string(),
            service_port: 62050,
            api_port: 62051,
            add_as_new_host: false,
        },
        ssh: None,
    }
}

fn mock_panel(
    server: &MockServer,
    register_status: u16,
) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/admin/token")
            .json_body(serde_json::json!({"username": "admin", "password": "pw"}));
        then.status(200)
            .json_body(serde_json::json!({"access_token": "tok123"}));
    });
    let cert_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/admin/nodes/certificate")
            .header("authorization", "Bearer tok123");
        then.status(200)
            .json_body(serde_json::json!({"certificate": CERT}));
    });
    let register_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/admin/nodes")
            .header("authorization", "Bearer tok123");
        then.status(register_status)
            .json_body(serde_json::json!({"id": 1}));
    });
    (cert_mock, register_mock)
}

#[tokio::test]
async fn test_end_to_end_success_prints_exact_certificate() -> Result<()> {
    let server = MockServer::start();
    let (cert_mock, register_mock) = mock_panel(&server, 201);

    let mut sink: Vec<u8> = Vec::new();
    Orchestrator::new(run_config(&server))
        .run(&mut sink)
        .await?;

    cert_mock.assert();
    register_mock.assert();
    // 主輸出通道與取回的證書逐字節相同
    assert_eq!(sink, CERT.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_registration_failure_is_terminal() -> Result<()> {
    let server = MockServer::start();
    let (cert_mock, register_mock) = mock_panel(&server, 500);

    let mut config = run_config(&server);
    config.ssh = Some(ssh_config());
    let sessions = RecordingFactory::new();

    let mut sink: Vec<u8> = Vec::new();
    let err = Orchestrator::with_session_factory(config, sessions.clone())
        .run(&mut sink)
        .await
        .unwrap_err();

    cert_mock.assert();
    register_mock.assert();
    assert!(matches!(err, EnrollError::Register { status: 500, .. }));
    assert_ne!(err.exit_code(), 0);
    // 註冊失敗後不得進入引導階段
    assert!(sessions.executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_bootstrap_runs_full_plan() -> Result<()> {
    let server = MockServer::start();
    mock_panel(&server, 201);

    let mut config = run_config(&server);
    config.ssh = Some(ssh_config());
    let sessions = RecordingFactory::new();

    let mut sink: Vec<u8> = Vec::new();
    Orchestrator::with_session_factory(config, sessions.clone())
        .run(&mut sink)
        .await?;

    let executed = sessions.executed();
    assert_eq!(executed.len(), 9);
    assert_eq!(executed[0], "sudo ufw disable");
    assert!(executed[7].contains(CERT));
    assert_eq!(sink, CERT.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_login_failure_stops_before_certificate_fetch() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/admin/token");
        then.status(401).body("bad credentials");
    });
    let cert_mock = server.mock(|when, then| {
        when.method(GET).path("/api/admin/nodes/certificate");
        then.status(200)
            .json_body(serde_json::json!({"certificate": CERT}));
    });

    let mut sink: Vec<u8> = Vec::new();
    let err = Orchestrator::new(run_config(&server))
        .run(&mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrollError::Auth { .. }));
    assert!(sink.is_empty());
    cert_mock.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_certificate_round_trip_through_file_sink() -> Result<()> {
    let server = MockServer::start();
    mock_panel(&server, 200);

    let mut file = NamedTempFile::new()?;
    Orchestrator::new(run_config(&server))
        .run(file.as_file_mut())
        .await?;
    file.flush()?;

    let written = std::fs::read(file.path())?;
    assert_eq!(written, CERT.as_bytes());
    Ok(())
}
