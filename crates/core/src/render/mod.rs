use image::{Rgb, RgbImage};

use crate::{
    record::FrameSink,
    scene::SceneInstance,
    timeline::{PlaybackClock, Timeline},
    Result,
};

pub mod font;

/// A single video raster.
pub type Frame = RgbImage;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Creates a black frame of the given size.
pub fn blank_frame(width: u32, height: u32) -> Frame {
    RgbImage::from_pixel(width, height, BLACK)
}

/// Fills an axis-aligned rectangle, clipped to the frame.
pub fn fill_rect(frame: &mut Frame, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(width).min(frame.width());
    let y_end = y.saturating_add(height).min(frame.height());
    for py in y..y_end {
        for px in x..x_end {
            frame.put_pixel(px, py, color);
        }
    }
}

/// Draws `text` with its top-left corner at (`x`, `y`). Each font pixel
/// becomes a `scale`×`scale` block.
pub fn draw_text(frame: &mut Frame, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    for (index, ch) in text.chars().enumerate() {
        let origin_x = x.saturating_add(index as u32 * font::ADVANCE * scale);
        for col in 0..font::GLYPH_WIDTH {
            for row in 0..font::GLYPH_HEIGHT {
                if font::is_lit(ch, col, row) {
                    fill_rect(
                        frame,
                        origin_x + col * scale,
                        y + row * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

/// Walks a [`Timeline`] clip by clip and streams every frame into a sink.
#[derive(Debug)]
pub struct RenderGraph<'a> {
    scene: &'a SceneInstance,
    timeline: &'a Timeline,
    clock: PlaybackClock,
}

impl<'a> RenderGraph<'a> {
    pub fn new(scene: &'a SceneInstance, timeline: &'a Timeline, fps: u32) -> Self {
        Self {
            scene,
            timeline,
            clock: PlaybackClock::new(fps),
        }
    }

    /// Pushes all frames in order and returns how many were written.
    pub fn draw<S: FrameSink + ?Sized>(&self, sink: &mut S) -> Result<usize> {
        let mut written = 0;
        for (index, clip) in self.timeline.clips().iter().enumerate() {
            let frames = self.clock.frames_in(clip.duration);
            tracing::debug!(clip = index, scene = ?clip.scene, frames, "rendering clip");
            for frame_index in 0..frames {
                let local = self.clock.time_of(frame_index);
                sink.push_frame(&self.scene.render(clip.scene, local))?;
                written += 1;
            }
        }
        Ok(written)
    }
}
