use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use serde::Deserialize;

use super::error::ClassifierError;

/// Target size as written in `preprocessor_config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    HeightWidth { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
    Square(u32),
}

/// Image processor settings declared by the model artifact.
///
/// Keys missing from the file take the defaults of the standard ViT
/// image processor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default)]
    pub size: Option<SizeSpec>,
    #[serde(default = "default_resample")]
    pub resample: u8,
    #[serde(default)]
    pub do_center_crop: bool,
    #[serde(default)]
    pub crop_size: Option<SizeSpec>,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_image_stats")]
    pub image_mean: Vec<f32>,
    #[serde(default = "default_image_stats")]
    pub image_std: Vec<f32>,
}

fn default_true() -> bool {
    true
}

fn default_resample() -> u8 {
    2 // bilinear
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_image_stats() -> Vec<f32> {
    vec![0.5, 0.5, 0.5]
}

const DEFAULT_SIZE: SizeSpec = SizeSpec::HeightWidth { height: 224, width: 224 };

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: Some(DEFAULT_SIZE),
            resample: default_resample(),
            do_center_crop: false,
            crop_size: None,
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: default_image_stats(),
            image_std: default_image_stats(),
        }
    }
}

impl PreprocessorConfig {
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClassifierError::LoadError(format!("Invalid preprocessor config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::LoadError(format!("Failed to read preprocessor config {:?}: {}", path, e))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        if self.image_mean.len() != 3 || self.image_std.len() != 3 {
            return Err(ClassifierError::LoadError(format!(
                "image_mean and image_std must have 3 entries, found {} and {}",
                self.image_mean.len(),
                self.image_std.len()
            )));
        }
        if self.image_std.iter().any(|s| *s == 0.0) {
            return Err(ClassifierError::LoadError("image_std must not contain zero".into()));
        }
        let zero_size = |spec: &Option<SizeSpec>| match spec {
            Some(SizeSpec::HeightWidth { height, width }) => *height == 0 || *width == 0,
            Some(SizeSpec::ShortestEdge { shortest_edge }) => *shortest_edge == 0,
            Some(SizeSpec::Square(side)) => *side == 0,
            None => false,
        };
        if zero_size(&self.size) || zero_size(&self.crop_size) {
            return Err(ClassifierError::LoadError("Target sizes must be non-zero".into()));
        }
        Ok(())
    }

    /// Resampling filter matching the PIL code in `resample`
    pub fn filter(&self) -> FilterType {
        match self.resample {
            0 => FilterType::Nearest,
            1 => FilterType::Lanczos3,
            3 => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }
}

/// Turns RGB images into the NCHW tensor the classifier expects.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessorConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Produces a `[1, 3, H, W]` tensor after resize, optional center crop,
    /// rescale and normalization.
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::ValidationError("Image has no pixels".into()));
        }

        let mut image = if self.config.do_resize {
            let (width, height) = target_size(
                self.config.size.unwrap_or(DEFAULT_SIZE),
                image.width(),
                image.height(),
            );
            imageops::resize(image, width, height, self.config.filter())
        } else {
            image.clone()
        };

        if self.config.do_center_crop {
            if let Some(crop) = self.config.crop_size {
                image = center_crop(&image, crop);
            }
        }

        let (width, height) = (image.width() as usize, image.height() as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));
        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                let mut value = pixel.0[c] as f32;
                if self.config.do_rescale {
                    value *= self.config.rescale_factor;
                }
                if self.config.do_normalize {
                    value = (value - self.config.image_mean[c]) / self.config.image_std[c];
                }
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }

        Ok(tensor)
    }
}

/// Output (width, height) for a resize request against the source dimensions.
fn target_size(spec: SizeSpec, width: u32, height: u32) -> (u32, u32) {
    match spec {
        SizeSpec::HeightWidth { height, width } => (width, height),
        SizeSpec::Square(side) => (side, side),
        SizeSpec::ShortestEdge { shortest_edge } => {
            // Long side is truncated, not rounded
            let short = width.min(height).max(1) as u64;
            let scaled = |side: u32| ((shortest_edge as u64 * side as u64 / short) as u32).max(1);
            if width <= height {
                (shortest_edge, scaled(height))
            } else {
                (scaled(width), shortest_edge)
            }
        }
    }
}

fn center_crop(image: &RgbImage, crop: SizeSpec) -> RgbImage {
    let (crop_w, crop_h) = match crop {
        SizeSpec::HeightWidth { height, width } => (width, height),
        SizeSpec::Square(side) => (side, side),
        SizeSpec::ShortestEdge { shortest_edge } => (shortest_edge, shortest_edge),
    };
    let crop_w = crop_w.min(image.width());
    let crop_h = crop_h.min(image.height());
    let x = (image.width() - crop_w) / 2;
    let y = (image.height() - crop_h) / 2;
    imageops::crop_imm(image, x, y, crop_w, crop_h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const VIT_PREPROCESSOR: &str = r#"{
        "do_normalize": true,
        "do_rescale": true,
        "do_resize": true,
        "image_mean": [0.5, 0.5, 0.5],
        "image_processor_type": "ViTImageProcessor",
        "image_std": [0.5, 0.5, 0.5],
        "resample": 2,
        "rescale_factor": 0.00392156862745098,
        "size": {"height": 224, "width": 224}
    }"#;

    #[test]
    fn test_parse_vit_config() {
        let config = PreprocessorConfig::from_json(VIT_PREPROCESSOR).unwrap();
        assert_eq!(config.size, Some(SizeSpec::HeightWidth { height: 224, width: 224 }));
        assert_eq!(config.filter(), FilterType::Triangle);
        assert!(!config.do_center_crop);
    }

    #[test]
    fn test_parse_size_variants() {
        let config = PreprocessorConfig::from_json(r#"{"size": 384}"#).unwrap();
        assert_eq!(config.size, Some(SizeSpec::Square(384)));

        let config = PreprocessorConfig::from_json(
            r#"{"size": {"shortest_edge": 256}, "do_center_crop": true, "crop_size": {"height": 224, "width": 224}, "resample": 3}"#,
        )
        .unwrap();
        assert_eq!(config.size, Some(SizeSpec::ShortestEdge { shortest_edge: 256 }));
        assert_eq!(config.filter(), FilterType::CatmullRom);
        assert_eq!(config.image_mean, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(PreprocessorConfig::from_json(r#"{"image_mean": [0.5]}"#).is_err());
        assert!(PreprocessorConfig::from_json(r#"{"image_std": [0.5, 0.0, 0.5]}"#).is_err());
        assert!(PreprocessorConfig::from_json(r#"{"size": 0}"#).is_err());
        assert!(PreprocessorConfig::from_json("[]").is_err());
    }

    #[test]
    fn test_tensor_shape_and_values() {
        let preprocessor = Preprocessor::new(PreprocessorConfig::from_json(VIT_PREPROCESSOR).unwrap());
        let image = RgbImage::from_pixel(64, 32, Rgb([255, 0, 255]));
        let tensor = preprocessor.preprocess(&image).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!((tensor[[0, 0, 100, 100]] - 1.0).abs() < 1e-5);
        assert!((tensor[[0, 1, 100, 100]] + 1.0).abs() < 1e-5);
        assert!((tensor[[0, 2, 0, 223]] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shortest_edge_with_crop() {
        let config = PreprocessorConfig::from_json(
            r#"{"size": {"shortest_edge": 32}, "do_center_crop": true, "crop_size": 24}"#,
        )
        .unwrap();
        let image = RgbImage::from_pixel(100, 50, Rgb([10, 20, 30]));
        let tensor = Preprocessor::new(config).preprocess(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 24, 24]);
    }

    #[test]
    fn test_target_size() {
        assert_eq!(target_size(SizeSpec::ShortestEdge { shortest_edge: 32 }, 100, 50), (64, 32));
        assert_eq!(target_size(SizeSpec::ShortestEdge { shortest_edge: 32 }, 50, 100), (32, 64));
        assert_eq!(target_size(SizeSpec::ShortestEdge { shortest_edge: 32 }, 101, 50), (64, 32));
        assert_eq!(target_size(SizeSpec::ShortestEdge { shortest_edge: 224 }, 300, 479), (224, 357));
        assert_eq!(target_size(SizeSpec::HeightWidth { height: 10, width: 20 }, 5, 5), (20, 10));
    }

    #[test]
    fn test_without_resize_keeps_dimensions() {
        let config = PreprocessorConfig {
            do_resize: false,
            do_normalize: false,
            ..PreprocessorConfig::default()
        };
        let image = RgbImage::from_pixel(5, 7, Rgb([51, 102, 255]));
        let tensor = Preprocessor::new(config).preprocess(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 7, 5]);
        assert!((tensor[[0, 0, 0, 0]] - 0.2).abs() < 1e-5);
        assert!((tensor[[0, 2, 6, 4]] - 1.0).abs() < 1e-5);
    }
}
