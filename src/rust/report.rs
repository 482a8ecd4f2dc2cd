use std::future::Future;
use std::path::Path;

use thiserror::Error;

use crate::classifier::{ClassifierError, ImageClassifier, Prediction};
use crate::image_io;

const RULE_WIDTH: usize = 40;

/// Printed after a load failure in `diagnose` mode.
pub const LOAD_TIP: &str = "Check internet connection or folder name.";

/// Why a `diagnose` run ended without a report. Every variant maps to exit
/// status 1.
#[derive(Debug, Error)]
pub enum DiagnoseError {
    #[error("{0}")]
    MissingImage(ClassifierError),
    #[error("{0}")]
    Load(ClassifierError),
    #[error("{0}")]
    Classify(ClassifierError),
}

impl DiagnoseError {
    pub fn tip(&self) -> Option<&'static str> {
        match self {
            DiagnoseError::Load(_) => Some(LOAD_TIP),
            _ => None,
        }
    }
}

/// Classifies one local image and returns the report text.
///
/// The image path is checked before `load` is called.
pub async fn run_diagnosis<C, F, Fut>(image_path: &Path, load: F) -> Result<String, DiagnoseError>
where
    C: ImageClassifier,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<C, ClassifierError>>,
{
    if !image_path.exists() {
        return Err(DiagnoseError::MissingImage(ClassifierError::MissingFile(
            image_path.to_path_buf(),
        )));
    }

    let classifier = load().await.map_err(DiagnoseError::Load)?;

    log::info!("Analyzing {:?}...", image_path);
    let image = image_io::open_image(image_path).map_err(DiagnoseError::Classify)?;
    let prediction = classifier.classify(&image).map_err(DiagnoseError::Classify)?;
    Ok(format_report(&prediction))
}

/// Plain-text report printed by the `diagnose` command.
pub fn format_report(prediction: &Prediction) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\nDIAGNOSIS REPORT\n{rule}\nPrediction : {}\nConfidence : {:.2}%\n{rule}\n",
        prediction.diagnosis, prediction.confidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::LabelMap;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Canned(Vec<f32>);

    impl ImageClassifier for Canned {
        fn classify(&self, _image: &RgbImage) -> Result<Prediction, ClassifierError> {
            Prediction::from_logits(&self.0, &LabelMap::default())
        }
    }

    #[tokio::test]
    async fn test_missing_image_skips_loading() {
        let loaded = AtomicBool::new(false);
        let result = run_diagnosis(Path::new("no/such/image.jpeg"), || async {
            loaded.store(true, Ordering::SeqCst);
            Ok(Canned(vec![1.0, 0.0]))
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DiagnoseError::MissingImage(_)));
        assert_eq!(err.to_string(), "Could not find image at 'no/such/image.jpeg'");
        assert!(err.tip().is_none());
        assert!(!loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_load_failure_carries_tip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(8, 8, Rgb([180, 60, 60])).save(&path).unwrap();

        let result = run_diagnosis(&path, || async {
            Err::<Canned, _>(ClassifierError::LoadError("hub unreachable".to_string()))
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DiagnoseError::Load(_)));
        assert_eq!(err.to_string(), "Load error: hub unreachable");
        assert_eq!(err.tip(), Some(LOAD_TIP));
    }

    #[tokio::test]
    async fn test_diagnosis_prints_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(8, 8, Rgb([180, 60, 60])).save(&path).unwrap();

        let report = run_diagnosis(&path, || async { Ok(Canned(vec![2.0, -1.0])) })
            .await
            .unwrap();
        assert!(report.contains("Prediction : Cancer Negative"));
        assert!(report.contains("Confidence : 95.26%"));
    }

    #[tokio::test]
    async fn test_unreadable_image_is_classify_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpeg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let result = run_diagnosis(&path, || async { Ok(Canned(vec![2.0, -1.0])) }).await;
        assert!(matches!(result, Err(DiagnoseError::Classify(_))));
    }

    #[test]
    fn test_report_layout() {
        let prediction = Prediction::from_logits(&[-0.5, 1.5], &LabelMap::default()).unwrap();
        let report = format_report(&prediction);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "=".repeat(40));
        assert_eq!(lines[1], "DIAGNOSIS REPORT");
        assert_eq!(lines[3], "Prediction : Cancer Positive");
        assert_eq!(lines[4], "Confidence : 88.08%");
    }
}
