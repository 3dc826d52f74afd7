//! Building edit requests from assets.
//!
//! The orchestrator never looks inside a [`ProcessingRequest`]; it only asks
//! a [`RequestBuilder`] for one and hands it to the service. The builder is
//! where prompt wording and output configuration are decided.

use std::sync::Arc;

use crate::asset::{AssetId, EncodedImage, ImageAsset};
use crate::mask::{GeometrySyncError, MaskOverlay};
use crate::options::{ProcessingOptions, Resolution, TargetAspect};
use crate::prompt::{batch_prompt, masked_prompt, ProjectNotes};

/// An inline image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

impl From<&EncodedImage> for ImagePart {
    fn from(image: &EncodedImage) -> Self {
        Self {
            bytes: Arc::clone(&image.bytes),
            mime: image.mime.clone(),
        }
    }
}

/// Everything needed for one call to the edit service.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub asset: AssetId,
    pub source: ImagePart,
    /// PNG overlay; red pixels mark the region to edit.
    pub mask: Option<ImagePart>,
    pub replacement_text: Option<String>,
    /// Options snapshot taken when the request was built.
    pub options: ProcessingOptions,
    pub prompt: String,
    pub resolution: Resolution,
    pub aspect: TargetAspect,
}

impl ProcessingRequest {
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }
}

/// Turns an asset plus options into a request.
pub trait RequestBuilder: Send + Sync {
    /// Request for a whole-image batch edit of the asset's source.
    fn batch(
        &self,
        asset: &ImageAsset,
        options: &ProcessingOptions,
        notes: &ProjectNotes,
    ) -> ProcessingRequest;

    /// Request for a masked edit of the image the user drew on.
    ///
    /// # Errors
    ///
    /// Returns `GeometrySyncError` if the mask does not match that image.
    fn masked(
        &self,
        asset: &ImageAsset,
        options: &ProcessingOptions,
        mask: &MaskOverlay,
        replacement: Option<&str>,
    ) -> Result<ProcessingRequest, GeometrySyncError>;
}

/// The builder used unless a caller supplies its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRequestBuilder;

impl RequestBuilder for StandardRequestBuilder {
    fn batch(
        &self,
        asset: &ImageAsset,
        options: &ProcessingOptions,
        notes: &ProjectNotes,
    ) -> ProcessingRequest {
        let source = asset.source();
        ProcessingRequest {
            asset: asset.id(),
            source: source.into(),
            mask: None,
            replacement_text: None,
            options: options.clone(),
            prompt: batch_prompt(options, notes),
            resolution: options.resolution,
            aspect: options.aspect_ratio.resolve(source.width, source.height),
        }
    }

    fn masked(
        &self,
        asset: &ImageAsset,
        options: &ProcessingOptions,
        mask: &MaskOverlay,
        replacement: Option<&str>,
    ) -> Result<ProcessingRequest, GeometrySyncError> {
        let target = asset.displayed_image();
        mask.ensure_matches(target.width, target.height)?;

        let replacement = replacement
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        Ok(ProcessingRequest {
            asset: asset.id(),
            source: target.into(),
            mask: Some(ImagePart {
                bytes: mask.png_shared(),
                mime: "image/png".to_string(),
            }),
            prompt: masked_prompt(replacement.as_deref()),
            replacement_text: replacement,
            options: options.clone(),
            resolution: options.resolution,
            aspect: options.aspect_ratio.resolve(target.width, target.height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::fixtures::{encoded, imported};
    use crate::asset::{AssetRegistry, AssetStatus};
    use crate::mask::MaskSurface;
    use crate::geometry::{Point, Rect};
    use crate::options::AspectRatio;
    use crate::prompt::SYSTEM_INSTRUCTIONS;

    fn mask_for(width: u32, height: u32) -> MaskOverlay {
        let mut surface = MaskSurface::new();
        surface.resize(width, height, Rect::new(0.0, 0.0, width as f64, height as f64));
        surface.begin_stroke(Point::new(10.0, 10.0), 30.0);
        surface.end_stroke();
        surface.serialize().unwrap()
    }

    #[test]
    fn test_batch_request_uses_source_and_snapshot() {
        let mut registry = AssetRegistry::new();
        let id = registry.add(imported("a.jpg"));
        let options = ProcessingOptions::default();
        let request = StandardRequestBuilder.batch(
            registry.get(id).unwrap(),
            &options,
            &ProjectNotes::default(),
        );

        assert_eq!(request.asset, id);
        assert!(!request.is_masked());
        assert_eq!(request.source.mime, "image/jpeg");
        assert_eq!(request.options, options);
        assert_eq!(request.resolution, Resolution::TwoK);
        // 400x300 source
        assert_eq!(request.aspect, TargetAspect::Landscape);
        assert!(request.prompt.contains("TASKS:"));
    }

    #[test]
    fn test_batch_request_fixed_aspect() {
        let mut registry = AssetRegistry::new();
        let id = registry.add(imported("a.jpg"));
        let options = ProcessingOptions {
            aspect_ratio: AspectRatio::Fixed(TargetAspect::Tall),
            resolution: Resolution::FourK,
            ..Default::default()
        };
        let request =
            StandardRequestBuilder.batch(registry.get(id).unwrap(), &options, &ProjectNotes::default());
        assert_eq!(request.aspect, TargetAspect::Tall);
        assert_eq!(request.resolution.as_str(), "4K");
    }

    #[test]
    fn test_masked_request_targets_source_when_pending() {
        let mut registry = AssetRegistry::new();
        let id = registry.add(imported("a.jpg"));
        let mask = mask_for(400, 300);
        let request = StandardRequestBuilder
            .masked(
                registry.get(id).unwrap(),
                &ProcessingOptions::default(),
                &mask,
                Some(" a bench "),
            )
            .unwrap();

        assert!(request.is_masked());
        assert_eq!(request.mask.as_ref().unwrap().mime, "image/png");
        assert_eq!(&*request.mask.as_ref().unwrap().bytes, mask.png());
        assert_eq!(request.replacement_text.as_deref(), Some("a bench"));
        assert!(request.prompt.starts_with(SYSTEM_INSTRUCTIONS));
        assert!(request.prompt.contains("GENERATIVE FILL"));
    }

    #[test]
    fn test_masked_request_targets_result_when_completed() {
        let mut registry = AssetRegistry::new();
        let id = registry.add(imported("a.jpg"));
        registry.begin_processing(id).unwrap();
        let mut result = encoded(800, 600);
        result.mime = "image/png".to_string();
        registry
            .transition(id, AssetStatus::Completed(result))
            .unwrap();

        let request = StandardRequestBuilder
            .masked(
                registry.get(id).unwrap(),
                &ProcessingOptions::default(),
                &mask_for(800, 600),
                None,
            )
            .unwrap();
        assert_eq!(request.source.mime, "image/png");
        assert!(request.replacement_text.is_none());
        assert!(request.prompt.contains("REMOVE OBJECT"));
    }

    #[test]
    fn test_masked_request_rejects_mismatched_mask() {
        let mut registry = AssetRegistry::new();
        let id = registry.add(imported("a.jpg"));
        let err = StandardRequestBuilder
            .masked(
                registry.get(id).unwrap(),
                &ProcessingOptions::default(),
                &mask_for(200, 150),
                None,
            )
            .unwrap_err();
        assert_eq!((err.mask_width, err.image_width), (200, 400));
    }
}
