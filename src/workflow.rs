//! Page-level workflow state machine.
//!
//! The whole UI state is one [`WorkflowState`] value. Every user action or
//! async completion is an [`Event`]; [`transition`] is a pure function that
//! returns the replacement state plus, at most, one [`Effect`] for the driver
//! ([`crate::session::RestoreSession`]) to run.
//!
//! ```text
//!  Idle ──upload──▶ Reading ──read ok──▶ Loaded ──restore──▶ Restoring
//!   ▲                  │                   ▲  ▲                  │
//!   │◀──read failed────┘                   │  └─failed/no image──┤
//!   │                                      │                     ▼
//!   └────────────── clear (from any) ──────┴─────────────── Restored
//! ```
//!
//! Uploading or clearing bumps [`WorkflowState::generation`]. Completions
//! carry the generation they were started under and are dropped if it no
//! longer matches, so a late answer can never overwrite newer state.

use crate::error::RestoreError;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::restore::RestoreOutcome;
use crate::prompts::{NO_IMAGE_MESSAGE, READ_FAILED_MESSAGE};
use std::path::PathBuf;
use tracing::{debug, info};

/// Where the workflow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing loaded.
    #[default]
    Idle,
    /// A file is being read and encoded.
    Reading,
    /// Original available; restoration may be requested.
    Loaded,
    /// A restoration request is in flight.
    Restoring,
    /// A restored image is available.
    Restored,
}

/// Complete UI state, replaced wholesale on every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub phase: Phase,
    /// Bumped by every upload and clear.
    pub generation: u64,
    /// The file the user picked, once an upload has started.
    pub source: Option<PathBuf>,
    pub original: Option<EncodedImage>,
    pub restored: Option<EncodedImage>,
    /// Message for the most recent failure, cleared when a new action starts.
    pub error: Option<String>,
}

/// Things that happen to the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user picked or dropped a file.
    UploadStarted { source: PathBuf },
    /// Reading the upload finished.
    UploadRead {
        generation: u64,
        result: Result<EncodedImage, String>,
    },
    /// The user pressed "Restore".
    RestoreRequested,
    /// The restoration call finished.
    RestoreFinished {
        generation: u64,
        outcome: RestoreOutcome,
    },
    /// "Start over".
    Cleared,
}

/// Work the driver must start after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ReadUpload { generation: u64, source: PathBuf },
    Restore { generation: u64, image: EncodedImage },
}

/// Result of [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: WorkflowState,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(state: WorkflowState) -> Self {
        Self { state, effect: None }
    }
}

/// What the comparator should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparatorProps<'a> {
    pub original: &'a EncodedImage,
    /// The restored image, or the original until one exists.
    pub after: &'a EncodedImage,
    /// Only once a restored image exists.
    pub interactive: bool,
}

/// The restored file, ready to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl WorkflowState {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Reading | Phase::Restoring)
    }

    /// Whether a restore request would be accepted now.
    pub fn can_restore(&self) -> bool {
        self.phase == Phase::Loaded && self.original.is_some()
    }

    /// Comparator inputs, when there is something to show and nothing pending.
    pub fn comparator_props(&self) -> Option<ComparatorProps<'_>> {
        if self.is_loading() {
            return None;
        }
        let original = self.original.as_ref()?;
        Some(ComparatorProps {
            original,
            after: self.restored.as_ref().unwrap_or(original),
            interactive: self.restored.is_some(),
        })
    }

    /// Decode the restored image for saving under `file_name`.
    pub fn download(&self, file_name: &str) -> Option<Result<Download, RestoreError>> {
        let restored = self.restored.as_ref()?;
        Some(restored.decode_bytes().map(|bytes| Download {
            file_name: file_name.to_string(),
            mime_type: restored.mime_type.clone(),
            bytes,
        }))
    }
}

/// Apply `event` to `state`.
pub fn transition(state: &WorkflowState, event: Event) -> Transition {
    match event {
        Event::UploadStarted { source } => {
            let generation = state.generation + 1;
            info!("Upload started: {}", source.display());
            Transition {
                state: WorkflowState {
                    phase: Phase::Reading,
                    generation,
                    source: Some(source.clone()),
                    ..WorkflowState::default()
                },
                effect: Some(Effect::ReadUpload { generation, source }),
            }
        }

        Event::UploadRead { generation, result } => {
            if generation != state.generation || state.phase != Phase::Reading {
                debug!(
                    "Dropping stale upload read (gen {generation}, current {})",
                    state.generation
                );
                return Transition::to(state.clone());
            }
            match result {
                Ok(image) => Transition::to(WorkflowState {
                    phase: Phase::Loaded,
                    original: Some(image),
                    error: None,
                    ..state.clone()
                }),
                Err(message) => Transition::to(WorkflowState {
                    phase: Phase::Idle,
                    generation: state.generation,
                    error: Some(if message.is_empty() {
                        READ_FAILED_MESSAGE.to_string()
                    } else {
                        message
                    }),
                    ..WorkflowState::default()
                }),
            }
        }

        Event::RestoreRequested => {
            let Some(image) = state.original.clone().filter(|_| state.can_restore()) else {
                debug!("Restore ignored in phase {:?}", state.phase);
                return Transition::to(state.clone());
            };
            Transition {
                state: WorkflowState {
                    phase: Phase::Restoring,
                    restored: None,
                    error: None,
                    ..state.clone()
                },
                effect: Some(Effect::Restore {
                    generation: state.generation,
                    image,
                }),
            }
        }

        Event::RestoreFinished { generation, outcome } => {
            if generation != state.generation || state.phase != Phase::Restoring {
                debug!(
                    "Dropping stale restoration result (gen {generation}, current {})",
                    state.generation
                );
                return Transition::to(state.clone());
            }
            let next = match outcome {
                RestoreOutcome::Restored(image) => WorkflowState {
                    phase: Phase::Restored,
                    restored: Some(image),
                    error: None,
                    ..state.clone()
                },
                RestoreOutcome::NoImage => WorkflowState {
                    phase: Phase::Loaded,
                    error: Some(NO_IMAGE_MESSAGE.to_string()),
                    ..state.clone()
                },
                RestoreOutcome::Failed(message) => WorkflowState {
                    phase: Phase::Loaded,
                    error: Some(message),
                    ..state.clone()
                },
            };
            Transition::to(next)
        }

        Event::Cleared => Transition::to(WorkflowState {
            generation: state.generation + 1,
            ..WorkflowState::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(tag: &str) -> EncodedImage {
        EncodedImage::new(tag, "image/png")
    }

    fn loaded(tag: &str) -> WorkflowState {
        let t = transition(
            &WorkflowState::default(),
            Event::UploadStarted {
                source: PathBuf::from(format!("{tag}.png")),
            },
        );
        transition(
            &t.state,
            Event::UploadRead {
                generation: t.state.generation,
                result: Ok(img(tag)),
            },
        )
        .state
    }

    fn restoring(tag: &str) -> (WorkflowState, Effect) {
        let t = transition(&loaded(tag), Event::RestoreRequested);
        (t.state, t.effect.expect("restore effect"))
    }

    #[test]
    fn upload_reads_then_loads() {
        let t = transition(
            &WorkflowState::default(),
            Event::UploadStarted {
                source: PathBuf::from("a.png"),
            },
        );
        assert_eq!(t.state.phase, Phase::Reading);
        assert!(t.state.is_loading());
        assert_eq!(
            t.effect,
            Some(Effect::ReadUpload {
                generation: 1,
                source: PathBuf::from("a.png")
            })
        );

        let s = loaded("a");
        assert_eq!(s.phase, Phase::Loaded);
        let props = s.comparator_props().expect("props");
        assert_eq!(props.after, props.original);
        assert!(!props.interactive);
    }

    #[test]
    fn second_upload_discards_first() {
        let first = transition(
            &WorkflowState::default(),
            Event::UploadStarted {
                source: PathBuf::from("first.png"),
            },
        );
        let second = transition(
            &first.state,
            Event::UploadStarted {
                source: PathBuf::from("second.png"),
            },
        );

        // The first read lands late.
        let s = transition(
            &second.state,
            Event::UploadRead {
                generation: first.state.generation,
                result: Ok(img("first")),
            },
        )
        .state;
        assert_eq!(s.phase, Phase::Reading);
        assert!(s.original.is_none());

        let s = transition(
            &s,
            Event::UploadRead {
                generation: second.state.generation,
                result: Ok(img("second")),
            },
        )
        .state;
        assert_eq!(s.original, Some(img("second")));
        assert_eq!(s.source, Some(PathBuf::from("second.png")));
    }

    #[test]
    fn read_failure_resets_with_message() {
        let t = transition(
            &WorkflowState::default(),
            Event::UploadStarted {
                source: PathBuf::from("x.png"),
            },
        );
        let s = transition(
            &t.state,
            Event::UploadRead {
                generation: t.state.generation,
                result: Err("Permission denied reading 'x.png'".into()),
            },
        )
        .state;
        assert_eq!(s.phase, Phase::Idle);
        assert!(s.original.is_none());
        assert!(s.source.is_none());
        assert_eq!(s.error.as_deref(), Some("Permission denied reading 'x.png'"));
        assert!(s.comparator_props().is_none());
    }

    #[test]
    fn restore_only_from_loaded() {
        let idle = transition(&WorkflowState::default(), Event::RestoreRequested);
        assert!(idle.effect.is_none());

        let (s, effect) = restoring("a");
        assert_eq!(s.phase, Phase::Restoring);
        assert_eq!(
            effect,
            Effect::Restore {
                generation: s.generation,
                image: img("a")
            }
        );
        assert!(s.comparator_props().is_none());

        // Trigger is disabled while loading.
        let again = transition(&s, Event::RestoreRequested);
        assert!(again.effect.is_none());
        assert_eq!(again.state, s);
    }

    #[test]
    fn restored_enables_interactive_compare_and_download() {
        let (s, _) = restoring("a");
        let s = transition(
            &s,
            Event::RestoreFinished {
                generation: s.generation,
                outcome: RestoreOutcome::Restored(EncodedImage::from_bytes(b"jpeg!", "image/jpeg")),
            },
        )
        .state;
        assert_eq!(s.phase, Phase::Restored);
        let props = s.comparator_props().unwrap();
        assert!(props.interactive);
        assert_ne!(props.after, props.original);

        let dl = s.download("restored-photo.jpg").unwrap().unwrap();
        assert_eq!(dl.file_name, "restored-photo.jpg");
        assert_eq!(dl.bytes, b"jpeg!");
        assert!(!s.can_restore());
    }

    #[test]
    fn no_image_keeps_original_viewable() {
        let (s, _) = restoring("a");
        let s = transition(
            &s,
            Event::RestoreFinished {
                generation: s.generation,
                outcome: RestoreOutcome::NoImage,
            },
        )
        .state;
        assert_eq!(s.phase, Phase::Loaded);
        assert_eq!(s.error.as_deref(), Some(NO_IMAGE_MESSAGE));
        let props = s.comparator_props().unwrap();
        assert!(!props.interactive);
        assert_eq!(props.original, &img("a"));
        assert!(s.download("restored-photo.jpg").is_none());
    }

    #[test]
    fn failure_keeps_upload_for_retry() {
        let (s, _) = restoring("a");
        let s = transition(
            &s,
            Event::RestoreFinished {
                generation: s.generation,
                outcome: RestoreOutcome::Failed("AI service failed: network timeout".into()),
            },
        )
        .state;
        assert!(s.error.as_deref().unwrap().contains("network timeout"));
        assert_eq!(s.source, Some(PathBuf::from("a.png")));
        assert!(s.can_restore());

        let retry = transition(&s, Event::RestoreRequested);
        assert!(matches!(retry.effect, Some(Effect::Restore { .. })));
        assert!(retry.state.error.is_none());
    }

    #[test]
    fn clear_drops_late_result() {
        let (s, _) = restoring("a");
        let cleared = transition(&s, Event::Cleared).state;
        assert_eq!(cleared.phase, Phase::Idle);
        assert!(cleared.original.is_none());

        let late = transition(
            &cleared,
            Event::RestoreFinished {
                generation: s.generation,
                outcome: RestoreOutcome::Restored(img("late")),
            },
        )
        .state;
        assert_eq!(late, cleared);
    }
}
