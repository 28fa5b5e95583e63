//! # photo-restore
//!
//! Restore old, damaged photos with a generative image model and compare the
//! result against the original with a draggable before/after divider.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo file
//!  │
//!  ├─ 1. Input     read bytes, sniff MIME, optional upload limits
//!  ├─ 2. Encode    bytes → base64 EncodedImage (data URI helpers)
//!  ├─ 3. Restore   one Gemini generateContent call, first inline image wins
//!  ├─ 4. Compare   Comparator: reveal fraction driven by press/move/release
//!  └─ 5. Output    restored bytes written atomically as restored-photo.jpg
//! ```
//!
//! The interactive flow (upload → restore → compare → download → start over)
//! is a pure state machine in [`workflow`], driven asynchronously by
//! [`session::RestoreSession`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_restore::{restore_to_file, RestoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key taken from API_KEY or GEMINI_API_KEY
//!     let config = RestoreConfig::default();
//!     let photo = restore_to_file("grandma.jpg", "restored-photo.jpg", &config).await?;
//!     eprintln!("restored in {}ms", photo.duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `photo-restore` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `viewer` | on      | Native before/after window (minifb) |
//!
//! Disable both when using only the library:
//! ```toml
//! photo-restore = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod comparator;
pub mod config;
pub mod draw;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod restore;
pub mod session;
#[cfg(feature = "viewer")]
pub mod viewer;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use comparator::{
    compute_reveal, Comparator, ComparisonPair, ListenerSet, PointerSample, RevealFraction,
    SurfaceBounds,
};
pub use config::{RestoreConfig, RestoreConfigBuilder, UploadLimits};
pub use error::RestoreError;
pub use pipeline::encode::EncodedImage;
pub use pipeline::restore::{GeminiClient, RestorationClient, RestoreOutcome};
pub use restore::{
    restore, restore_sync, restore_to_file, restore_with_client, write_image, RestoredPhoto,
};
pub use session::RestoreSession;
pub use workflow::{transition, Effect, Event, Phase, WorkflowState};
