//! Before/after drag comparator.
//!
//! Two images share one surface: the original fills it, and the "after"
//! image is revealed from the left edge up to [`RevealFraction`] percent of
//! the width. Pressing on the surface starts a drag that moves the split;
//! releasing anywhere ends it.
//!
//! ```text
//!            press                 move
//!   Idle ───────────▶ Dragging ◀──────────┐
//!    ▲  │               │  └──────────────┘
//!    │  │ release       │ release
//!    │  └──(no-op)──┐   │
//!    └──────────────┴───┘
//! ```
//!
//! While dragging, the comparator holds a [`ListenerGuard`] so the host keeps
//! forwarding pointer events from the whole viewport; the guard goes away on
//! release or when the comparator is dropped.

pub mod listeners;
pub mod render;

pub use listeners::{ListenerGuard, ListenerSet};
pub use render::ScaledPair;

use crate::draw::FrameBuffer;
use image::RgbaImage;
use std::sync::Arc;
use tracing::debug;

/// Horizontal extent of the comparison surface, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBounds {
    pub left: f64,
    pub width: f64,
}

impl SurfaceBounds {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }
}

/// One pointer/touch coordinate together with the surface it was taken on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub bounds: SurfaceBounds,
}

impl PointerSample {
    pub fn new(x: f64, bounds: SurfaceBounds) -> Self {
        Self { x, bounds }
    }

    pub fn reveal(&self) -> RevealFraction {
        compute_reveal(self.x, self.bounds)
    }
}

/// Percentage of the surface width showing the "after" image.
///
/// Always within [0, 100] and never NaN.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RevealFraction(f64);

impl RevealFraction {
    pub const MIN: RevealFraction = RevealFraction(0.0);
    pub const MAX: RevealFraction = RevealFraction(100.0);
    pub const DEFAULT: RevealFraction = RevealFraction(50.0);

    /// Clamp `percent` into range; NaN becomes 0.
    pub fn new(percent: f64) -> Self {
        if percent.is_nan() {
            return Self::MIN;
        }
        RevealFraction(percent.clamp(0.0, 100.0))
    }

    pub fn percent(self) -> f64 {
        self.0
    }

    /// Pixel column of the split on a surface `width` pixels wide.
    pub fn split_column(self, width: usize) -> usize {
        ((self.0 / 100.0 * width as f64).round() as usize).min(width)
    }
}

impl Default for RevealFraction {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Map a horizontal pointer coordinate to a reveal fraction.
///
/// A surface with no usable width (zero, negative, or non-finite) reports 0.
pub fn compute_reveal(x: f64, bounds: SurfaceBounds) -> RevealFraction {
    let usable = bounds.width.is_finite() && bounds.width > 0.0;
    if !usable || !x.is_finite() || !bounds.left.is_finite() {
        return RevealFraction::MIN;
    }
    let offset = (x - bounds.left).clamp(0.0, bounds.width);
    RevealFraction::new(offset / bounds.width * 100.0)
}

/// The two images being compared. The comparator only reads them.
#[derive(Debug, Clone)]
pub struct ComparisonPair {
    pub original: Arc<RgbaImage>,
    pub after: Arc<RgbaImage>,
}

impl ComparisonPair {
    pub fn new(original: Arc<RgbaImage>, after: Arc<RgbaImage>) -> Self {
        Self { original, after }
    }

    /// Same image on both sides, for showing a photo before any result exists.
    pub fn single(image: Arc<RgbaImage>) -> Self {
        Self {
            after: Arc::clone(&image),
            original: image,
        }
    }
}

#[derive(Debug)]
enum DragState {
    Idle,
    Dragging {
        bounds: SurfaceBounds,
        _listeners: ListenerGuard,
    },
}

/// Interactive before/after comparison.
pub struct Comparator {
    pair: ComparisonPair,
    interactive: bool,
    reveal: RevealFraction,
    drag: DragState,
    listeners: ListenerSet,
    layers: Option<ScaledPair>,
}

impl Comparator {
    /// Bind `pair` to a surface.
    ///
    /// A non-interactive comparator ignores presses and shows the whole
    /// "after" image.
    pub fn new(pair: ComparisonPair, interactive: bool, listeners: &ListenerSet) -> Self {
        Self {
            pair,
            interactive,
            reveal: if interactive {
                RevealFraction::DEFAULT
            } else {
                RevealFraction::MAX
            },
            drag: DragState::Idle,
            listeners: listeners.clone(),
            layers: None,
        }
    }

    pub fn pair(&self) -> &ComparisonPair {
        &self.pair
    }

    pub fn reveal(&self) -> RevealFraction {
        self.reveal
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Start a drag and move the split to `x` immediately, so a plain click
    /// or tap also repositions it.
    pub fn on_press_start(&mut self, sample: PointerSample) {
        if !self.interactive {
            return;
        }
        let bounds = sample.bounds;
        self.reveal = sample.reveal();
        match self.drag {
            DragState::Dragging {
                bounds: ref mut current,
                ..
            } => *current = bounds,
            DragState::Idle => {
                self.drag = DragState::Dragging {
                    bounds,
                    _listeners: self.listeners.attach(),
                };
            }
        }
        debug!("drag start at {:.1} → {:.1}%", sample.x, self.reveal.percent());
    }

    /// Follow the pointer while dragging; ignored otherwise.
    pub fn on_pointer_move(&mut self, x: f64) {
        if let DragState::Dragging { bounds, .. } = self.drag {
            self.reveal = compute_reveal(x, bounds);
        }
    }

    /// End the drag, if any.
    pub fn on_press_end(&mut self) {
        if self.is_dragging() {
            debug!("drag end at {:.1}%", self.reveal.percent());
        }
        self.drag = DragState::Idle;
    }

    /// Centre of the drag handle on a `width × height` surface, when interactive.
    pub fn handle_position(&self, width: usize, height: usize) -> Option<(usize, usize)> {
        self.interactive
            .then(|| render::handle_centre(self.reveal, width, height))
    }

    /// Compose the current view into `out`, scaling both images to its size.
    ///
    /// The scaled layers are cached until the output size changes.
    pub fn render(&mut self, out: &mut FrameBuffer) {
        let stale = self
            .layers
            .as_ref()
            .is_none_or(|l| l.width() != out.width || l.height() != out.height);
        if stale {
            self.layers = Some(ScaledPair::fit(&self.pair, out.width, out.height));
        }
        if let Some(ref layers) = self.layers {
            render::compose(layers, self.reveal, self.interactive, out);
        }
    }
}
