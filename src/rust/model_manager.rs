use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use std::ffi::OsString;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

use crate::models::{ArtifactKind, ModelInfo, DEFAULT_HUB_ENDPOINT};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("{} file not found at {url}", .kind.as_str())]
    ArtifactNotFound { kind: ArtifactKind, url: String },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Local cache of classifier artifacts fetched from a model hub.
#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    endpoint: String,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        Self::resolve_models_dir(env::var_os("ORALSCAN_CACHE"))
    }

    /// Resolves the models directory from an explicit cache root, falling
    /// back to the platform cache directory.
    fn resolve_models_dir(cache_root: Option<OsString>) -> PathBuf {
        if let Some(path) = cache_root.filter(|p| !p.is_empty()) {
            return PathBuf::from(path).join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("oralscan").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("oralscan").join("models");
        }

        env::temp_dir().join("oralscan").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Points the manager at another hub, e.g. a mirror or a local test server
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_dir(&self, info: &ModelInfo) -> PathBuf {
        self.models_dir.join(info.cache_key())
    }

    pub fn get_artifact_path(&self, info: &ModelInfo, kind: ArtifactKind) -> PathBuf {
        self.get_model_dir(info).join(kind.file_name(info))
    }

    pub fn get_model_path(&self, info: &ModelInfo) -> PathBuf {
        self.get_artifact_path(info, ArtifactKind::Model)
    }

    pub fn get_preprocessor_path(&self, info: &ModelInfo) -> PathBuf {
        self.get_artifact_path(info, ArtifactKind::Preprocessor)
    }

    pub fn get_config_path(&self, info: &ModelInfo) -> PathBuf {
        self.get_artifact_path(info, ArtifactKind::Config)
    }

    pub fn is_model_downloaded(&self, info: &ModelInfo) -> bool {
        log::debug!("Checking if {} is downloaded:", info.repo_id);
        ArtifactKind::ALL.iter().all(|kind| {
            let path = self.get_artifact_path(info, *kind);
            let exists = path.exists();
            log::debug!("  {} path: {:?} (exists: {})", kind.as_str(), path, exists);
            exists
        })
    }

    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.get_model_dir(info);
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        for kind in ArtifactKind::ALL {
            if let Err(e) = self.fetch_artifact(info, kind).await {
                log::error!("Failed to setup {} file: {}", kind.as_str(), e);
                if let Err(cleanup) = self.remove_download(info) {
                    log::warn!("Failed to clean up partial download of {}: {}", info.repo_id, cleanup);
                }
                return Err(e);
            }
        }

        log::info!("Artifacts for {} ready to use", info.repo_id);
        Ok(())
    }

    async fn fetch_artifact(&self, info: &ModelInfo, kind: ArtifactKind) -> Result<(), ModelError> {
        let path = self.get_artifact_path(info, kind);
        let expected = kind.expected_hash(info);

        if path.exists() {
            let valid = match expected {
                Some(hash) => self.verify_file(&path, hash)?,
                None => true,
            };
            if valid {
                log::info!("Reusing cached {} file at {:?}", kind.as_str(), path);
                return Ok(());
            }
            log::warn!("{} file verification failed, redownloading", kind.as_str());
        }

        let url = info.file_url(&self.endpoint, kind);
        self.download_and_verify_file(&url, &path, expected, kind).await
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks that every artifact file exists and, where a digest is
    /// configured, that its content matches.
    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        for kind in ArtifactKind::ALL {
            let path = self.get_artifact_path(info, kind);
            if !path.exists() {
                log::info!("{} file missing at {:?}", kind.as_str(), path);
                return Ok(false);
            }
            if let Some(hash) = kind.expected_hash(info) {
                if !self.verify_file(&path, hash)? {
                    log::info!("{} hash verification failed", kind.as_str());
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        kind: ArtifactKind,
    ) -> Result<(), ModelError> {
        let file_type = kind.as_str();
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ModelError::ArtifactNotFound {
                kind,
                url: url.to_string(),
            });
        }
        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        match expected_hash {
            Some(expected) => {
                let hash = sha256_hex(&bytes);
                if !hash.eq_ignore_ascii_case(expected) {
                    log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, hash);
                    return Err(ModelError::HashMismatch {
                        file_type: file_type.to_string(),
                        expected: expected.to_string(),
                        actual: hash,
                    });
                }
            }
            None => log::warn!("No digest configured for {} file, skipping verification", file_type),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Only complete, verified files ever appear at the final path
        let partial = partial_path(path);
        fs::write(&partial, &bytes)?;

        if let Some(expected) = expected_hash {
            if !self.verify_file(&partial, expected)? {
                if let Err(e) = fs::remove_file(&partial) {
                    log::warn!("Failed to remove {:?}: {}", partial, e);
                }
                return Err(ModelError::VerificationFailed);
            }
        }
        fs::rename(&partial, path)?;

        log::info!("{} file downloaded successfully", file_type);
        Ok(())
    }

    pub fn remove_download(&self, info: &ModelInfo) -> Result<(), ModelError> {
        for kind in ArtifactKind::ALL {
            let path = self.get_artifact_path(info, kind);
            for file in [partial_path(&path), path] {
                if file.exists() {
                    fs::remove_file(&file)?;
                }
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// Missing files are downloaded; files failing verification are
    /// downloaded again.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<(), ModelError> {
        if !self.is_model_downloaded(info) {
            log::info!("Model {} not found in cache, downloading...", info.repo_id);
            self.download_model(info).await?;
        } else if !self.verify_model(info)? {
            log::info!("Model verification failed, re-downloading...");
            self.remove_download(info)?;
            self.download_model(info).await?;
        } else {
            log::info!("Using cached model at {:?}", self.get_model_dir(info));
        }
        Ok(())
    }
}

/// Staging path a download is written to before it is moved into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuiltinModel;

    #[test]
    fn test_default_models_dir() {
        let path = ModelManager::resolve_models_dir(Some("/tmp/oralscan-test-cache".into()));
        assert_eq!(path, PathBuf::from("/tmp/oralscan-test-cache/models"));

        let path = ModelManager::resolve_models_dir(None);
        assert!(path.ends_with("oralscan/models"));

        let path = ModelManager::resolve_models_dir(Some(OsString::new()));
        assert!(path.ends_with("oralscan/models"));
    }

    #[test]
    fn test_artifact_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let info = BuiltinModel::OralCancerVit.get_model_info();

        assert!(manager
            .get_model_path(&info)
            .ends_with("ankon1--oral-cancer-classifer/vit_model_directory/main/model.onnx"));
        assert!(manager.get_preprocessor_path(&info).ends_with("main/preprocessor_config.json"));
        assert!(manager.get_config_path(&info).ends_with("main/config.json"));
        assert!(!manager.is_model_downloaded(&info));
        assert!(!manager.verify_model(&info).unwrap());
    }

    #[test]
    fn test_partial_path() {
        let path = Path::new("/cache/models/vit/model.onnx");
        assert_eq!(partial_path(path), PathBuf::from("/cache/models/vit/model.onnx.part"));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
