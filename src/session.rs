//! Async driver for the workflow state machine.
//!
//! [`RestoreSession`] owns the current [`WorkflowState`], feeds events through
//! [`transition`], and runs the resulting [`Effect`]s as Tokio tasks. Task
//! completions come back over an mpsc channel as ordinary events, so stale
//! results are filtered by the same generation check as everything else.
//!
//! Two ways to consume completions:
//!
//! * [`RestoreSession::settle`] - `await` until nothing is loading (CLI).
//! * [`RestoreSession::poll`] - non-blocking drain, for a frame loop that
//!   runs outside the async context (the viewer).

use crate::config::RestoreConfig;
use crate::error::RestoreError;
use crate::pipeline::{encode, input, restore};
use crate::pipeline::restore::{GeminiClient, RestorationClient};
use crate::workflow::{transition, Download, Effect, Event, WorkflowState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

/// One user's restoration workflow.
pub struct RestoreSession {
    state: WorkflowState,
    config: RestoreConfig,
    client: Arc<dyn RestorationClient>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    runtime: Handle,
}

impl RestoreSession {
    /// Create a session using `client`. Must be called inside a Tokio runtime.
    pub fn new(
        config: RestoreConfig,
        client: Arc<dyn RestorationClient>,
    ) -> Result<Self, RestoreError> {
        let runtime = Handle::try_current()
            .map_err(|e| RestoreError::Internal(format!("no Tokio runtime: {e}")))?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            state: WorkflowState::default(),
            config,
            client,
            tx,
            rx,
            runtime,
        })
    }

    /// Create a session talking to Gemini as configured.
    pub fn with_gemini(config: RestoreConfig) -> Result<Self, RestoreError> {
        let client = GeminiClient::from_config(&config)?;
        Self::new(config, Arc::new(client))
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn config(&self) -> &RestoreConfig {
        &self.config
    }

    /// Apply an event and start whatever work it implies.
    pub fn dispatch(&mut self, event: Event) {
        let t = transition(&self.state, event);
        self.state = t.state;
        if let Some(effect) = t.effect {
            self.spawn(effect);
        }
    }

    /// Start loading `path` as the new original, abandoning anything pending.
    pub fn upload(&mut self, path: impl Into<PathBuf>) {
        self.dispatch(Event::UploadStarted {
            source: path.into(),
        });
    }

    /// Request restoration. Returns `false` if the request was not accepted
    /// (nothing loaded, or already busy).
    pub fn request_restore(&mut self) -> bool {
        if !self.state.can_restore() {
            return false;
        }
        self.dispatch(Event::RestoreRequested);
        true
    }

    /// Start over.
    pub fn clear(&mut self) {
        self.dispatch(Event::Cleared);
    }

    /// Start over and reload the last uploaded file. Returns `false` when
    /// nothing has been uploaded yet.
    pub fn start_over(&mut self) -> bool {
        let Some(source) = self.state.source.clone() else {
            return false;
        };
        self.clear();
        self.upload(source);
        true
    }

    /// The restored file under the configured name, if one exists.
    pub fn download(&self) -> Option<Result<Download, RestoreError>> {
        self.state.download(&self.config.output_file_name)
    }

    /// Apply every completion that has already arrived. Returns how many.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event);
            applied += 1;
        }
        applied
    }

    /// Wait until no read or restoration is pending.
    pub async fn settle(&mut self) {
        while self.state.is_loading() {
            match self.rx.recv().await {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }
    }

    fn spawn(&self, effect: Effect) {
        let tx = self.tx.clone();
        match effect {
            Effect::ReadUpload { generation, source } => {
                let limits = self.config.upload_limits;
                self.runtime.spawn(async move {
                    let result = input::read_upload(&source, limits)
                        .await
                        .map(|upload| encode::encode_upload(&upload))
                        .map_err(|e| e.to_string());
                    // The receiver lives as long as the session; a send error
                    // only means the session is gone.
                    let _ = tx.send(Event::UploadRead { generation, result });
                });
            }
            Effect::Restore { generation, image } => {
                let client = Arc::clone(&self.client);
                let prompt = self.config.prompt().to_string();
                debug!("Spawning restoration (gen {generation})");
                self.runtime.spawn(async move {
                    let outcome = restore::restore_photo(client.as_ref(), &image, &prompt).await;
                    let _ = tx.send(Event::RestoreFinished { generation, outcome });
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedImage;
    use crate::prompts::NO_IMAGE_MESSAGE;
    use crate::workflow::Phase;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl RestorationClient for Echo {
        async fn generate(
            &self,
            image: &EncodedImage,
            _prompt: &str,
        ) -> Result<Option<EncodedImage>, RestoreError> {
            Ok(Some(EncodedImage::new(image.data.clone(), "image/jpeg")))
        }
    }

    struct Empty;

    #[async_trait]
    impl RestorationClient for Empty {
        async fn generate(
            &self,
            _image: &EncodedImage,
            _prompt: &str,
        ) -> Result<Option<EncodedImage>, RestoreError> {
            Ok(None)
        }
    }

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, bytes).unwrap();
        p
    }

    #[tokio::test]
    async fn upload_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.png", b"\x89PNG\r\n\x1a\nabc");

        let mut s = RestoreSession::new(RestoreConfig::default(), Arc::new(Echo)).unwrap();
        s.upload(&path);
        s.settle().await;
        assert_eq!(s.state().phase, Phase::Loaded);
        assert_eq!(s.state().original.as_ref().unwrap().mime_type, "image/png");

        assert!(s.request_restore());
        assert!(!s.request_restore());
        s.settle().await;
        assert_eq!(s.state().phase, Phase::Restored);

        let dl = s.download().unwrap().unwrap();
        assert_eq!(dl.file_name, "restored-photo.jpg");
        assert_eq!(dl.bytes, b"\x89PNG\r\n\x1a\nabc");
    }

    #[tokio::test]
    async fn empty_result_sets_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.png", b"\x89PNG\r\n\x1a\nabc");

        let mut s = RestoreSession::new(RestoreConfig::default(), Arc::new(Empty)).unwrap();
        s.upload(&path);
        s.settle().await;
        s.request_restore();
        s.settle().await;

        assert_eq!(s.state().phase, Phase::Loaded);
        assert_eq!(s.state().error.as_deref(), Some(NO_IMAGE_MESSAGE));
    }

    #[tokio::test]
    async fn missing_file_surfaces_read_error() {
        let mut s = RestoreSession::new(RestoreConfig::default(), Arc::new(Echo)).unwrap();
        s.upload("/no/such/photo.jpg");
        s.settle().await;
        assert_eq!(s.state().phase, Phase::Idle);
        assert!(s.state().error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn start_over_reloads_source_and_drops_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.png", b"\x89PNG\r\n\x1a\nabc");

        let mut s = RestoreSession::new(RestoreConfig::default(), Arc::new(Echo)).unwrap();
        assert!(!s.start_over());

        s.upload(&path);
        s.settle().await;
        s.request_restore();
        s.settle().await;
        assert_eq!(s.state().phase, Phase::Restored);
        let before = s.state().generation;

        assert!(s.start_over());
        s.settle().await;
        assert_eq!(s.state().phase, Phase::Loaded);
        assert!(s.state().restored.is_none());
        assert_eq!(s.state().source.as_deref(), Some(path.as_path()));
        assert!(s.state().generation > before);
    }

    #[test]
    fn new_outside_runtime_is_an_error() {
        let r = RestoreSession::new(RestoreConfig::default(), Arc::new(Echo));
        assert!(matches!(r, Err(RestoreError::Internal(_))));
    }
}
