//! Prompt and user-facing copy.
//!
//! Every string the service or the user sees lives here so that changing the
//! restoration instruction (or a message the tests assert on) means editing
//! exactly one place. Callers can override the prompt via
//! [`crate::config::RestoreConfig::prompt`].

/// Instruction sent alongside the uploaded photo.
///
/// Asks for damage removal and detail/colour enhancement while forbidding any
/// change to the scene content.
pub const RESTORATION_PROMPT: &str = "Restore this old, damaged, vintage photo. \
Remove all scratches, tears, folds, and discoloration. Enhance the details, improve \
sharpness, and correct the colors to create a clean, clear, high-definition version of \
the original image. Do not add or remove any elements from the original scene. The \
output should be a photorealistic restoration.";

/// Shown when the service completed but produced no image.
pub const NO_IMAGE_MESSAGE: &str = "The AI model did not return an image. Please try again.";

/// Shown when a file read fails without a more specific message.
pub const READ_FAILED_MESSAGE: &str = "Failed to read image file.";

/// Shown while a restoration request is in flight.
pub const RESTORING_MESSAGE: &str = "Restoring your photo, please wait...";

/// Secondary line under [`RESTORING_MESSAGE`].
pub const RESTORING_HINT: &str = "This may take a moment as the AI enhances every detail.";

/// Application title.
pub const TITLE: &str = "Vintage Photo Restorer";

/// Tagline under the title.
pub const TAGLINE: &str = "Breathe new life into your old memories. Our AI meticulously \
removes damages and enhances details to restore your photos to HD quality.";

/// Upload guidance. Only enforced when [`crate::config::UploadLimits::Enforced`] is set.
pub const UPLOAD_GUIDANCE: &str = "PNG, JPG, GIF up to 10MB";

/// Footer line.
pub const FOOTER: &str = "Powered by Gemini AI. Images are not stored.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_forbids_scene_changes() {
        assert!(RESTORATION_PROMPT.contains("Do not add or remove any elements"));
        assert!(RESTORATION_PROMPT.contains("photorealistic"));
    }
}
