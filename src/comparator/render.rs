//! Frame composition for the comparator.
//!
//! Both images are scaled once to the surface size and then copied row by
//! row: columns left of the split come from the "after" layer, the rest from
//! the original. The clip happens only in the output frame; the source images
//! are never written to.

use super::{ComparisonPair, RevealFraction};
use crate::draw::{self, FrameBuffer};
use image::imageops::{self, FilterType};
use image::RgbaImage;

const HANDLE_COLOR: u32 = 0x00_FF_FF_FF;
const HANDLE_ARROW: u32 = 0x00_1E_29_3B;
const HANDLE_RADIUS: i32 = 18;

/// Both images resized to one surface size.
pub struct ScaledPair {
    original: RgbaImage,
    after: RgbaImage,
}

impl ScaledPair {
    /// Scale `pair` to exactly `width × height`.
    pub fn fit(pair: &ComparisonPair, width: usize, height: usize) -> Self {
        Self {
            original: scale(&pair.original, width, height),
            after: scale(&pair.after, width, height),
        }
    }

    pub fn width(&self) -> usize {
        self.original.width() as usize
    }

    pub fn height(&self) -> usize {
        self.original.height() as usize
    }
}

fn scale(src: &RgbaImage, width: usize, height: usize) -> RgbaImage {
    if src.width() as usize == width && src.height() as usize == height {
        return src.clone();
    }
    imageops::resize(src, width as u32, height as u32, FilterType::Triangle)
}

/// Centre of the drag handle: on the split column, halfway down.
pub fn handle_centre(reveal: RevealFraction, width: usize, height: usize) -> (usize, usize) {
    (reveal.split_column(width), height / 2)
}

/// Draw the split view (and the handle when interactive) into `out`.
pub fn compose(
    layers: &ScaledPair,
    reveal: RevealFraction,
    interactive: bool,
    out: &mut FrameBuffer,
) {
    let width = out.width.min(layers.width());
    let height = out.height.min(layers.height());
    let split = reveal.split_column(width);

    for y in 0..height {
        draw::copy_row_span(out, &layers.after, y, 0, split);
        draw::copy_row_span(out, &layers.original, y, split, width);
    }

    if interactive && width > 0 && height > 0 {
        let (cx, cy) = handle_centre(reveal, width, height);
        draw_handle(out, cx as i32, cy as i32, height as i32);
        draw::draw_label(out, 10, 10, "RESTORED", HANDLE_COLOR);
        let right = width as i32 - 10 - draw::text_width("ORIGINAL");
        draw::draw_label(out, right, 10, "ORIGINAL", HANDLE_COLOR);
    }
}

/// Divider line plus a round grip with left/right chevrons.
fn draw_handle(out: &mut FrameBuffer, x: i32, cy: i32, height: i32) {
    draw::fill_rect_blend(out, x - 2, 0, 4, height, HANDLE_COLOR, 0.5);
    draw::fill_disc_blend(out, x, cy, HANDLE_RADIUS, HANDLE_COLOR, 0.7);

    // ‹ and ›
    for (tip, dir) in [(x - 10, 1), (x + 10, -1)] {
        draw::draw_line(out, tip, cy, tip + 5 * dir, cy - 5, HANDLE_ARROW);
        draw::draw_line(out, tip, cy, tip + 5 * dir, cy + 5, HANDLE_ARROW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Arc;

    const RED: u32 = 0x00_FF_00_00;
    const BLUE: u32 = 0x00_00_00_FF;

    fn pair(w: u32, h: u32) -> ComparisonPair {
        ComparisonPair::new(
            Arc::new(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]))),
            Arc::new(RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 255]))),
        )
    }

    #[test]
    fn split_is_at_reveal_fraction() {
        let p = pair(8, 2);
        let layers = ScaledPair::fit(&p, 8, 2);
        let mut out = FrameBuffer::new(8, 2);
        compose(&layers, RevealFraction::new(25.0), false, &mut out);

        for y in 0..2 {
            for x in 0..8 {
                let want = if x < 2 { BLUE } else { RED };
                assert_eq!(out.get(x, y), Some(want), "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn extremes_show_one_layer() {
        let p = pair(5, 1);
        let layers = ScaledPair::fit(&p, 5, 1);
        let mut out = FrameBuffer::new(5, 1);

        compose(&layers, RevealFraction::MIN, false, &mut out);
        assert!(out.pixels.iter().all(|&px| px == RED));

        compose(&layers, RevealFraction::MAX, false, &mut out);
        assert!(out.pixels.iter().all(|&px| px == BLUE));
    }

    #[test]
    fn sources_are_not_modified() {
        let p = pair(6, 6);
        let before = (p.original.as_ref().clone(), p.after.as_ref().clone());
        let mut c = super::super::Comparator::new(p, true, &super::super::ListenerSet::new());
        let mut out = FrameBuffer::new(60, 60);
        c.render(&mut out);

        assert_eq!(c.pair().original.as_ref(), &before.0);
        assert_eq!(c.pair().after.as_ref(), &before.1);
    }

    #[test]
    fn layers_scale_to_surface() {
        let p = ComparisonPair::new(
            Arc::new(RgbaImage::from_pixel(10, 5, Rgba([1, 2, 3, 255]))),
            Arc::new(RgbaImage::from_pixel(40, 20, Rgba([4, 5, 6, 255]))),
        );
        let layers = ScaledPair::fit(&p, 20, 10);
        assert_eq!((layers.width(), layers.height()), (20, 10));
        assert_eq!(layers.after.dimensions(), (20, 10));
    }

    #[test]
    fn interactive_frame_has_handle_at_split() {
        let p = pair(100, 60);
        let layers = ScaledPair::fit(&p, 100, 60);
        let mut out = FrameBuffer::new(100, 60);
        compose(&layers, RevealFraction::new(50.0), true, &mut out);

        // Far from the handle and labels the layers are untouched.
        assert_eq!(out.get(5, 55), Some(BLUE));
        assert_eq!(out.get(95, 55), Some(RED));
        // On the divider the colour is blended towards white.
        let on_line = out.get(50, 55).unwrap();
        assert_ne!(on_line, BLUE);
        assert_ne!(on_line, RED);
    }

    #[test]
    fn grip_follows_handle_centre() {
        let p = pair(100, 100);
        let layers = ScaledPair::fit(&p, 100, 100);
        let mut out = FrameBuffer::new(100, 100);
        let reveal = RevealFraction::new(25.0);
        compose(&layers, reveal, true, &mut out);

        let (cx, cy) = handle_centre(reveal, 100, 100);
        assert_eq!((cx, cy), (25, 50));
        let green = |px: u32| (px >> 8) & 0xFF;
        // Inside the grip disc, clear of the divider and chevrons.
        assert!(green(out.get(cx + 8, cy + 12).unwrap()) > 0);
        // Same column, below the grip: plain layer.
        assert_eq!(green(out.get(cx + 8, 95).unwrap()), 0);
        // Where a centred grip would have been: plain layer.
        assert_eq!(green(out.get(58, cy + 12).unwrap()), 0);
    }
}
