use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures::future::join_all;
use iac_image_scan::app::{Config, component_factory::ComponentFactory};
use iac_image_scan::domain::image_identity::ImageIdentity;
use iac_image_scan::infra::{ConcreteComponentFactory, load_tfplan_file};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan container images, reusing backend results that are still fresh.
    ScanImage {
        /// Config file (.toml or .json). Defaults to the user config directory.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Registry-qualified image references, e.g. 123.dkr.ecr.us-east-2.amazonaws.com/app:v1
        #[arg(required = true)]
        images: Vec<String>,
    },

    /// Print the managed resources of a terraform plan JSON file, grouped by type.
    ParsePlan { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::ScanImage { config, images } => scan_images(config, images).await,
        Command::ParsePlan { path } => parse_plan(path),
    }
}

async fn scan_images(config_path: Option<PathBuf>, images: Vec<String>) -> ExitCode {
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let components = match ConcreteComponentFactory.create_components(&config) {
        Ok(components) => components,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let orchestrator = components.orchestrator(&config);

    let cancellation = CancellationToken::new();
    tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, no longer waiting for scans");
                cancellation.cancel();
            }
        }
    });

    let scans = images.iter().map(|image| {
        let orchestrator = orchestrator.clone();
        let cancellation = cancellation.clone();
        async move {
            let identity = ImageIdentity::parse(image);
            let result = orchestrator
                .get_scan_result_until_cancelled(&identity, &cancellation)
                .await;
            (image, result)
        }
    });

    let mut all_succeeded = true;
    for (image, result) in join_all(scans).await {
        let report = match result {
            Ok(scan_result) => {
                let counts = scan_result.findings().severity_counts();
                json!({ "image": image, "result": scan_result, "summary": counts })
            }
            Err(e) => {
                error!("{image}: {e}");
                all_succeeded = false;
                json!({ "image": image, "error": e.to_string() })
            }
        };
        println!("{report}");
    }

    if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn parse_plan(path: PathBuf) -> ExitCode {
    let resources = match load_tfplan_file(&path) {
        Ok(resources) => resources,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&resources) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("unable to render resources: {e}");
            ExitCode::FAILURE
        }
    }
}
