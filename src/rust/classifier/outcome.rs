use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use super::error::ClassifierError;
use super::utils::{argmax, round_to, softmax};

/// Index to raw label table declared by the model's `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<usize, String>,
}

#[derive(Deserialize)]
struct ModelConfigFile {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

impl LabelMap {
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let config: ModelConfigFile = serde_json::from_str(json)
            .map_err(|e| ClassifierError::LoadError(format!("Invalid model config: {}", e)))?;

        let mut labels = BTreeMap::new();
        for (id, label) in config.id2label {
            let index = id.parse::<usize>().map_err(|_| {
                ClassifierError::LoadError(format!("Invalid label index '{}' in model config", id))
            })?;
            labels.insert(index, label);
        }
        Ok(Self { labels })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::LoadError(format!("Failed to read model config {:?}: {}", path, e))
        })?;
        Self::from_json(&json)
    }

    /// Raw label for an index, `LABEL_<index>` when the table has none.
    pub fn raw_label(&self, index: usize) -> String {
        self.labels
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{}", index))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(i, l)| (*i, l.as_str()))
    }
}

/// Human-readable outcome of a prediction, derived from the class index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    Negative,
    Positive,
    Unknown(usize),
}

impl Diagnosis {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Negative,
            1 => Self::Positive,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "Cancer Negative"),
            Self::Positive => write!(f, "Cancer Positive"),
            Self::Unknown(index) => write!(f, "Unknown (LABEL_{})", index),
        }
    }
}

/// Decision taken from one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Index of the highest raw score
    pub index: usize,
    /// Label the model config gives that index
    pub raw_label: String,
    pub diagnosis: Diagnosis,
    /// Probability of `index` as a percentage, rounded to two decimals
    pub confidence: f64,
    /// Unrounded per-class probabilities as percentages
    pub probabilities: Vec<f64>,
}

impl Prediction {
    pub fn from_logits(logits: &[f32], labels: &LabelMap) -> Result<Self, ClassifierError> {
        if logits.is_empty() {
            return Err(ClassifierError::PredictionError("Model returned no scores".into()));
        }
        if let Some(pos) = logits.iter().position(|x| !x.is_finite()) {
            return Err(ClassifierError::PredictionError(format!(
                "Model returned a non-finite score at index {}",
                pos
            )));
        }

        let index = argmax(logits)
            .ok_or_else(|| ClassifierError::PredictionError("Model returned no scores".into()))?;
        let probabilities: Vec<f64> = softmax(logits).into_iter().map(|p| p * 100.0).collect();
        let confidence = round_to(probabilities[index], 2);

        Ok(Self {
            index,
            raw_label: labels.raw_label(index),
            diagnosis: Diagnosis::from_index(index),
            confidence,
            probabilities,
        })
    }

    pub fn result(&self) -> String {
        self.diagnosis.to_string()
    }
}
