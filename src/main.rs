use clap::Parser;
use node_enroll::config::prompt::Prompter;
use node_enroll::utils::logger;
use node_enroll::{CliConfig, Orchestrator};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting node-enroll");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let run_config = if cli.interactive {
        let stdin = std::io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), std::io::stderr());
        prompter.collect(&cli)
    } else {
        cli.into_run_config()
    };

    let run_config = match run_config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    };

    // stdout 只輸出證書
    let mut stdout = std::io::stdout();
    match Orchestrator::new(run_config).run(&mut stdout).await {
        Ok(()) => {
            tracing::info!("✅ Node enrollment completed successfully!");
            eprintln!("✅ Node enrollment completed successfully!");
            eprintln!("📋 Verify the node status in your panel.");
        }
        Err(e) => {
            tracing::error!("❌ Node enrollment failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
