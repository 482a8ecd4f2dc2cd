/// Default hub the artifacts are fetched from
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

/// Represents the available built-in models in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// Vision transformer fine-tuned to separate healthy oral tissue from
    /// cancerous lesions.
    ///
    /// Characteristics:
    /// - Input: 224x224 RGB (per its preprocessor config)
    /// - Labels: `LABEL_0` (negative), `LABEL_1` (positive)
    OralCancerVit,
}

/// Location of a pretrained artifact in the hub plus optional digests
/// used to verify the cached files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub repo_id: String,
    pub subfolder: Option<String>,
    pub revision: String,
    pub model_file: String,
    pub model_hash: Option<String>,
    pub preprocessor_hash: Option<String>,
    pub config_hash: Option<String>,
}

/// The three files a classifier artifact is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Model,
    Preprocessor,
    Config,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Model, Self::Preprocessor, Self::Config];

    pub fn file_name<'a>(&self, info: &'a ModelInfo) -> &'a str {
        match self {
            Self::Model => &info.model_file,
            Self::Preprocessor => "preprocessor_config.json",
            Self::Config => "config.json",
        }
    }

    pub fn expected_hash<'a>(&self, info: &'a ModelInfo) -> Option<&'a str> {
        match self {
            Self::Model => info.model_hash.as_deref(),
            Self::Preprocessor => info.preprocessor_hash.as_deref(),
            Self::Config => info.config_hash.as_deref(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Preprocessor => "preprocessor",
            Self::Config => "config",
        }
    }
}

impl ModelInfo {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            subfolder: None,
            revision: "main".to_string(),
            model_file: "model.onnx".to_string(),
            model_hash: None,
            preprocessor_hash: None,
            config_hash: None,
        }
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        let subfolder = subfolder.into();
        self.subfolder = if subfolder.is_empty() { None } else { Some(subfolder) };
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn with_model_file(mut self, model_file: impl Into<String>) -> Self {
        self.model_file = model_file.into();
        self
    }

    /// Directory name used for this artifact inside the models cache.
    ///
    /// `owner/repo` with subfolder `vit` at revision `main` becomes
    /// `owner--repo/vit/main`.
    pub fn cache_key(&self) -> String {
        let repo = self.repo_id.replace('/', "--");
        match &self.subfolder {
            Some(subfolder) => format!("{}/{}/{}", repo, subfolder, self.revision),
            None => format!("{}/{}", repo, self.revision),
        }
    }

    /// Download URL of one artifact file relative to a hub endpoint.
    pub fn file_url(&self, endpoint: &str, kind: ArtifactKind) -> String {
        let endpoint = endpoint.trim_end_matches('/');
        let file = kind.file_name(self);
        match &self.subfolder {
            Some(subfolder) => format!(
                "{}/{}/resolve/{}/{}/{}",
                endpoint, self.repo_id, self.revision, subfolder, file
            ),
            None => format!("{}/{}/resolve/{}/{}", endpoint, self.repo_id, self.revision, file),
        }
    }
}

impl BuiltinModel {
    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            Self::OralCancerVit => ModelInfo::new("ankon1/oral-cancer-classifer")
                .with_subfolder("vit_model_directory"),
        }
    }
}
