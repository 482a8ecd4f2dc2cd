use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use oralscan::cli::{Cli, Command, DiagnoseArgs, ModelArgs, ServeArgs};
use oralscan::server::{AppState, HttpServer};
use oralscan::{load_classifier, report, Classifier, ClassifierError, ModelManager};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    oralscan::init_logger();
    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        Command::Serve(args) => serve(&cli.model, args).await,
        Command::Diagnose(args) => diagnose(&cli.model, args).await,
    }
}

async fn load(model: &ModelArgs) -> Result<Classifier, ClassifierError> {
    let classifier = match &model.model_dir {
        Some(dir) => {
            info!("Loading model from {:?}", dir);
            Classifier::builder()
                .with_runtime_config(model.runtime_config())
                .with_model_dir(dir, &model.model_file)?
                .build()?
        }
        None => {
            let manager = match model.models_dir() {
                Some(dir) => ModelManager::new(dir),
                None => ModelManager::new_default(),
            }
            .map_err(|e| ClassifierError::LoadError(format!("Failed to create model cache: {}", e)))?
            .with_endpoint(model.hub_endpoint.clone());

            let info = model.model_info();
            info!(
                "Loading model: {} from folder {:?} via {}...",
                info.repo_id,
                info.subfolder,
                manager.endpoint()
            );
            load_classifier(&manager, &info, model.runtime_config(), model.fresh).await?
        }
    };

    let summary = classifier.info()?;
    info!(
        "Model ready: {} ({} labels, inputs {:?})",
        summary.model_path, summary.num_labels, summary.input_names
    );
    Ok(classifier)
}

async fn serve(model: &ModelArgs, args: ServeArgs) -> anyhow::Result<()> {
    let state = match load(model).await {
        Ok(classifier) => {
            info!("Model loaded successfully");
            AppState::ready(Arc::new(classifier))
        }
        Err(e) => {
            error!("Error loading model: {}", e);
            error!("Predictions will fail until the service is restarted with a reachable model");
            AppState::unavailable(e.to_string())
        }
    }
    .with_raw_label(!args.no_raw_label);

    let server = HttpServer::new(state, &args.server_config()).await?;
    server.run(shutdown_signal()).await
}

async fn diagnose(model: &ModelArgs, args: DiagnoseArgs) -> anyhow::Result<()> {
    match report::run_diagnosis(&args.image, || load(model)).await {
        Ok(text) => {
            println!("\n{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(tip) = e.tip() {
                eprintln!("Tip: {}", tip);
            }
            process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, starting graceful shutdown.");
}
