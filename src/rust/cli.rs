use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::{BuiltinModel, ModelInfo, DEFAULT_HUB_ENDPOINT};
use crate::runtime::RuntimeConfig;
use crate::server::ServerConfig;

pub const DEFAULT_IMAGE_PATH: &str = "backend/test-image.jpeg";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP prediction service
    Serve(ServeArgs),
    /// Classify a single local image and print a report
    Diagnose(DiagnoseArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Diagnose(DiagnoseArgs::default())
    }
}

/// Where the model comes from and how it runs
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Hub repository holding the model
    #[arg(long, global = true, env = "ORALSCAN_REPO")]
    pub repo: Option<String>,

    /// Folder inside the repository
    #[arg(long, global = true, env = "ORALSCAN_SUBFOLDER")]
    pub subfolder: Option<String>,

    #[arg(long, global = true, env = "ORALSCAN_REVISION", default_value = "main")]
    pub revision: String,

    /// ONNX file name inside the artifact
    #[arg(long, global = true, env = "ORALSCAN_MODEL_FILE", default_value = "model.onnx")]
    pub model_file: String,

    /// Load from a local directory instead of the hub
    #[arg(long, global = true, env = "ORALSCAN_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Models cache directory
    #[arg(long, global = true, env = "ORALSCAN_CACHE")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "ORALSCAN_HUB_ENDPOINT", default_value = DEFAULT_HUB_ENDPOINT)]
    pub hub_endpoint: String,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, global = true, default_value_t = 0)]
    pub intra_threads: usize,

    /// Force a fresh download of the model files
    #[arg(short, long, global = true)]
    pub fresh: bool,
}

impl ModelArgs {
    /// Artifact description; the built-in model fills whatever was not given
    pub fn model_info(&self) -> ModelInfo {
        let builtin = BuiltinModel::OralCancerVit.get_model_info();
        let info = match &self.repo {
            Some(repo) => ModelInfo::new(repo.clone()),
            None => ModelInfo::new(builtin.repo_id.clone())
                .with_subfolder(builtin.subfolder.clone().unwrap_or_default()),
        };
        let info = match &self.subfolder {
            Some(subfolder) => info.with_subfolder(subfolder.clone()),
            None => info,
        };
        info.with_revision(self.revision.clone())
            .with_model_file(self.model_file.clone())
    }

    /// Cache directory under which `models/` lives, if overridden
    pub fn models_dir(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join("models"))
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            intra_threads: self.intra_threads,
            ..RuntimeConfig::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "ORALSCAN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "ORALSCAN_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Largest accepted request body
    #[arg(long, env = "ORALSCAN_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Leave the model's raw label out of prediction responses
    #[arg(long)]
    pub no_raw_label: bool,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DiagnoseArgs {
    /// Image to classify
    #[arg(default_value = DEFAULT_IMAGE_PATH)]
    pub image: PathBuf,
}

impl Default for DiagnoseArgs {
    fn default() -> Self {
        Self {
            image: PathBuf::from(DEFAULT_IMAGE_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_runs_diagnose() {
        let cli = Cli::try_parse_from(["oralscan"]).unwrap();
        assert!(cli.command.is_none());
        match cli.command.unwrap_or_default() {
            Command::Diagnose(args) => assert_eq!(args.image, PathBuf::from(DEFAULT_IMAGE_PATH)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_model_info() {
        let cli = Cli::try_parse_from(["oralscan", "diagnose"]).unwrap();
        assert_eq!(cli.model.model_info(), BuiltinModel::OralCancerVit.get_model_info());
        assert!(!cli.model.fresh);
    }

    #[test]
    fn test_serve_arguments() {
        let cli = Cli::try_parse_from([
            "oralscan", "serve", "--port", "9090", "--no-raw-label", "--repo", "me/model", "--fresh",
        ])
        .unwrap();
        let info = cli.model.model_info();
        assert_eq!(info.repo_id, "me/model");
        assert_eq!(info.subfolder, None);
        assert!(cli.model.fresh);
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.server_config().get_address(), "0.0.0.0:9090");
                assert!(args.no_raw_label);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
