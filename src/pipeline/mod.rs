//! Pipeline stages for photo restoration.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the service can be swapped without touching file handling.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ restore ──▶ encode (decode)
//! (file)    (base64)   (service)   (result bytes / pixels)
//! ```
//!
//! 1. [`input`]   - read the selected file, sniff its MIME type, optionally
//!    enforce upload limits
//! 2. [`encode`]  - base64-wrap the bytes as an [`encode::EncodedImage`]
//! 3. [`restore`] - one call to the generative service, classified into a
//!    [`restore::RestoreOutcome`]

pub mod encode;
pub mod input;
pub mod restore;
