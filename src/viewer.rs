//! Native before/after window.
//!
//! The photo fills the window. Once a restored version exists the left part
//! shows it and the right part the original; drag anywhere to move the split.
//! `R` asks for a restoration, `S` saves the restored photo, `C` starts over
//! from the original file and `ESC` quits. While a request is running the
//! photo is hidden behind a status line.

use crate::comparator::{Comparator, ComparisonPair, ListenerSet, PointerSample, SurfaceBounds};
use crate::draw::{self, FrameBuffer};
use crate::error::RestoreError;
use crate::prompts::{RESTORING_HINT, RESTORING_MESSAGE, TITLE};
use crate::restore::write_atomic;
use crate::session::RestoreSession;
use crate::workflow::{ComparatorProps, Phase, WorkflowState};
use image::RgbaImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const BACKGROUND: u32 = 0x00_0F_17_2A;
const TEXT: u32 = 0x00_E2_E8_F0;
const DIM: u32 = 0x00_94_A3_B8;
const ERROR_TEXT: u32 = 0x00_FC_A5_A5;

/// Window placement and save target.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub title: String,
    /// The window is scaled down (never up) to fit these.
    pub max_width: usize,
    pub max_height: usize,
    /// Where `S` writes the restored photo.
    pub save_path: PathBuf,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: TITLE.to_string(),
            max_width: 1200,
            max_height: 800,
            save_path: PathBuf::from(crate::config::DEFAULT_OUTPUT_FILE_NAME),
        }
    }
}

/// Thin wrapper over the minifb window.
struct Surface {
    window: Window,
    frame: FrameBuffer,
    was_down: bool,
}

impl Surface {
    fn open(title: &str, width: usize, height: usize) -> Result<Self, RestoreError> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| RestoreError::Window(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self {
            window,
            frame: FrameBuffer::new(width, height),
            was_down: false,
        })
    }

    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    fn pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    fn present(&mut self) -> Result<(), RestoreError> {
        self.window
            .update_with_buffer(&self.frame.pixels, self.frame.width, self.frame.height)
            .map_err(|e| RestoreError::Window(e.to_string()))
    }

    /// Forward this frame's mouse state to the comparator.
    ///
    /// Presses only count inside the window; while a drag holds the viewport
    /// listeners, positions outside it are forwarded too.
    fn pump_pointer(&mut self, comparator: &mut Comparator, listeners: &ListenerSet) {
        let down = self.window.get_mouse_down(MouseButton::Left);
        let bounds = SurfaceBounds::new(0.0, self.frame.width as f64);
        match (self.was_down, down) {
            (false, true) => {
                if let Some((x, _)) = self.window.get_mouse_pos(MouseMode::Discard) {
                    comparator.on_press_start(PointerSample::new(x as f64, bounds));
                }
            }
            (true, true) if listeners.is_tracking() => {
                if let Some((x, _)) = self.window.get_mouse_pos(MouseMode::Pass) {
                    comparator.on_pointer_move(x as f64);
                }
            }
            (true, false) => comparator.on_press_end(),
            _ => {}
        }
        self.was_down = down;
    }
}

/// Largest size ≤ the limits with the image's aspect ratio; never upscales.
pub fn fit_window(
    width: u32,
    height: u32,
    max_width: usize,
    max_height: usize,
) -> (usize, usize) {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let scale = (max_width as f64 / w).min(max_height as f64 / h).min(1.0);
    let fit = |v: f64| ((v * scale).round() as usize).max(1);
    (fit(w), fit(h))
}

/// Changes whenever the comparator's inputs change.
fn view_key(state: &WorkflowState) -> (u64, bool, bool) {
    (
        state.generation,
        state.comparator_props().is_some(),
        state.restored.is_some(),
    )
}

fn build_comparator(
    props: ComparatorProps<'_>,
    listeners: &ListenerSet,
) -> Result<Comparator, RestoreError> {
    let original = Arc::new(props.original.decode_image()?.to_rgba8());
    let after = if props.after == props.original {
        Arc::clone(&original)
    } else {
        Arc::new(props.after.decode_image()?.to_rgba8())
    };
    Ok(Comparator::new(
        ComparisonPair::new(original, after),
        props.interactive,
        listeners,
    ))
}

/// Show the session's photo and drive it from the keyboard and mouse until
/// the window closes.
///
/// Runs a blocking frame loop; call it from `block_in_place` (or any thread
/// that may block) inside the session's runtime.
pub fn run_session(
    session: &mut RestoreSession,
    options: &ViewerOptions,
) -> Result<(), RestoreError> {
    let first = session
        .state()
        .original
        .as_ref()
        .ok_or_else(|| RestoreError::Internal("nothing loaded to show".into()))?
        .decode_image()?;
    let (w, h) = fit_window(
        first.width(),
        first.height(),
        options.max_width,
        options.max_height,
    );
    drop(first);

    let mut surface = Surface::open(&options.title, w, h)?;
    let listeners = ListenerSet::new();
    let mut comparator: Option<Comparator> = None;
    let mut shown_key = None;
    let mut notice: Option<String> = None;

    while surface.is_open() {
        session.poll();

        let key = view_key(session.state());
        if shown_key != Some(key) {
            shown_key = Some(key);
            // Dropping the old comparator releases any drag it held.
            comparator = match session.state().comparator_props() {
                Some(props) => match build_comparator(props, &listeners) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!("Cannot display image: {e}");
                        notice = Some(e.to_string());
                        None
                    }
                },
                None => None,
            };
        }

        if surface.pressed(Key::R) && session.request_restore() {
            info!("Restoration requested from viewer");
            notice = None;
        }
        if surface.pressed(Key::C) && session.start_over() {
            info!("Started over from viewer");
            notice = None;
        }
        if surface.pressed(Key::S) {
            notice = Some(save(session, &options.save_path));
        }

        if let Some(ref mut c) = comparator {
            surface.pump_pointer(c, &listeners);
            c.render(&mut surface.frame);
        } else {
            surface.frame.fill(BACKGROUND);
        }

        draw_hud(&mut surface.frame, session.state(), notice.as_deref());
        surface.present()?;
    }

    Ok(())
}

/// Compare two already-decoded images.
pub fn run_compare(
    original: RgbaImage,
    restored: RgbaImage,
    options: &ViewerOptions,
) -> Result<(), RestoreError> {
    let (w, h) = fit_window(
        original.width(),
        original.height(),
        options.max_width,
        options.max_height,
    );
    let mut surface = Surface::open(&options.title, w, h)?;
    let listeners = ListenerSet::new();
    let pair = ComparisonPair::new(Arc::new(original), Arc::new(restored));
    let mut comparator = Comparator::new(pair, true, &listeners);

    while surface.is_open() {
        surface.pump_pointer(&mut comparator, &listeners);
        comparator.render(&mut surface.frame);
        let y = surface.frame.height as i32 - 16;
        draw::draw_label(&mut surface.frame, 10, y, "DRAG TO COMPARE | ESC QUIT", DIM);
        surface.present()?;
    }
    Ok(())
}

fn save(session: &RestoreSession, path: &Path) -> String {
    let Some(download) = session.download() else {
        return "NOTHING TO SAVE YET".to_string();
    };
    let result = download.and_then(|d| {
        tokio::runtime::Handle::current().block_on(write_atomic(path, &d.bytes))
    });
    match result {
        Ok(()) => format!("SAVED {}", path.display()),
        Err(e) => {
            warn!("Save failed: {e}");
            e.to_string()
        }
    }
}

/// Key hints for the bottom bar.
fn hud_hint(phase: Phase) -> &'static str {
    match phase {
        Phase::Loaded => "R RESTORE | C START OVER | ESC QUIT",
        Phase::Restored => "DRAG TO COMPARE | S SAVE | C START OVER | ESC QUIT",
        _ => "ESC QUIT",
    }
}

fn draw_hud(fb: &mut FrameBuffer, state: &WorkflowState, notice: Option<&str>) {
    let (w, h) = (fb.width as i32, fb.height as i32);

    if state.is_loading() {
        let line = if state.phase == Phase::Reading {
            "LOADING..."
        } else {
            RESTORING_MESSAGE
        };
        let x = (w - draw::text_width(line)) / 2;
        draw::draw_text_5x7(fb, x.max(4), h / 2 - 10, line, TEXT);
        if state.phase == Phase::Restoring {
            let x = (w - draw::text_width(RESTORING_HINT)) / 2;
            draw::draw_text_5x7(fb, x.max(4), h / 2 + 4, RESTORING_HINT, DIM);
        }
    }

    let mut y = h - 16;
    draw::draw_label(fb, 10, y, hud_hint(state.phase), DIM);

    if let Some(ref err) = state.error {
        y -= 18;
        draw::draw_label(fb, 10, y, err, ERROR_TEXT);
    }
    if let Some(n) = notice {
        y -= 18;
        draw::draw_label(fb, 10, y, n, TEXT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedImage;

    #[test]
    fn fit_keeps_aspect_and_never_upscales() {
        assert_eq!(fit_window(2400, 1600, 1200, 800), (1200, 800));
        assert_eq!(fit_window(4000, 1000, 1200, 800), (1200, 300));
        assert_eq!(fit_window(300, 200, 1200, 800), (300, 200));
        assert_eq!(fit_window(0, 0, 1200, 800), (1, 1));
    }

    #[test]
    fn view_key_changes_when_result_arrives() {
        let loaded = WorkflowState {
            phase: Phase::Loaded,
            generation: 1,
            original: Some(EncodedImage::new("QQ==", "image/png")),
            ..WorkflowState::default()
        };
        let restored = WorkflowState {
            phase: Phase::Restored,
            restored: Some(EncodedImage::new("Qg==", "image/png")),
            ..loaded.clone()
        };
        assert_ne!(view_key(&loaded), view_key(&restored));
    }

    #[test]
    fn start_over_is_offered_once_a_photo_is_loaded() {
        assert!(hud_hint(Phase::Loaded).contains("C START OVER"));
        assert!(hud_hint(Phase::Restored).contains("C START OVER"));
        assert!(!hud_hint(Phase::Restoring).contains("START OVER"));
    }
}
