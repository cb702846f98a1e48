//! Landmark recognition from photos

use serde::Serialize;
use tracing::{info, instrument};

use crate::backend::GenerationRequest;
use crate::catalog::Catalog;
use crate::generation::StructuredGenerationClient;
use crate::models::Landmark;
use crate::{LandmarkAiError, Result};

/// Returned when the backend cannot confidently name a landmark
pub const UNKNOWN_LANDMARK: &str = "Unknown Monument";

const IDENTIFY_PROMPT: &str = "Identify the Indian monument in this image. Respond with only the name of the monument. \
If it's not a famous Indian monument, say 'Unknown Monument'.";

/// A recognized name reconciled against the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recognition {
    pub name: String,
    pub landmark: Landmark,
    pub in_catalog: bool,
}

#[derive(Clone)]
pub struct RecognitionPipeline {
    generator: StructuredGenerationClient,
    max_image_bytes: usize,
}

impl RecognitionPipeline {
    pub fn new(generator: StructuredGenerationClient, max_image_bytes: usize) -> Self {
        Self {
            generator,
            max_image_bytes,
        }
    }

    /// Name the landmark in a photo, or [`UNKNOWN_LANDMARK`]
    #[instrument(skip(self, image), fields(bytes = image.len(), mime = %mime_type))]
    pub async fn identify(&self, image: &[u8], mime_type: &str) -> Result<String> {
        self.check_image(image, mime_type)?;

        let request = GenerationRequest::text(IDENTIFY_PROMPT).with_image(mime_type, image.to_vec());
        let name = self.generator.generate_text(request).await?;
        info!("Photo identified as '{}'", name);
        Ok(name)
    }

    /// Identify, then map the name onto the catalog
    pub async fn recognize(&self, image: &[u8], mime_type: &str, catalog: &Catalog) -> Result<Recognition> {
        let name = self.identify(image, mime_type).await?;
        let (landmark, in_catalog) = catalog.reconcile(&name);
        Ok(Recognition {
            name,
            landmark,
            in_catalog,
        })
    }

    fn check_image(&self, image: &[u8], mime_type: &str) -> Result<()> {
        if image.is_empty() {
            return Err(LandmarkAiError::validation("image is empty"));
        }
        if !mime_type.to_ascii_lowercase().starts_with("image/") {
            return Err(LandmarkAiError::validation(format!(
                "'{mime_type}' is not an image type"
            )));
        }
        if image.len() > self.max_image_bytes {
            return Err(LandmarkAiError::validation(format!(
                "image is {} bytes, the limit is {} bytes",
                image.len(),
                self.max_image_bytes
            )));
        }
        Ok(())
    }
}
