use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::{
    mapping::color_for,
    render::{blank_frame, draw_text, fill_rect, Frame, RED, WHITE},
    AppConfig, LegendConfig, VideoConfig,
};

/// Glyph scale used for the REPEAT and END cards.
const TITLE_SCALE: u32 = 4;
/// Glyph scale used for legend labels.
const LABEL_SCALE: u32 = 2;
/// Slack added before flooring elapsed time into a character index, so that
/// frame timestamps like `0.3` land on index 3 rather than 2.
const INDEX_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneKind {
    /// Squares appear one per character as the tones play.
    Reveal,
    /// Red REPEAT card shown before the replay.
    Repeat,
    /// White END card.
    End,
    /// Decoding table of unique characters and their swatches.
    Legend,
}

/// Static text card drawn on a black background.
#[derive(Debug, Clone)]
pub struct TitleCard {
    pub text: &'static str,
    pub color: Rgb<u8>,
    /// Offset of the text's left edge from the horizontal centre.
    pub left_of_center: u32,
}

impl TitleCard {
    pub fn repeat() -> Self {
        Self {
            text: "REPEAT",
            color: RED,
            left_of_center: 100,
        }
    }

    pub fn end() -> Self {
        Self {
            text: "END",
            color: WHITE,
            left_of_center: 50,
        }
    }
}

/// Every frame of the video is a pure function of the scene kind and the
/// time elapsed inside that clip; `SceneInstance` holds the per-run data
/// those functions read.
#[derive(Debug, Clone)]
pub struct SceneInstance {
    chars: Vec<char>,
    unique: Vec<char>,
    char_duration: f64,
    video: VideoConfig,
    legend: LegendConfig,
}

impl SceneInstance {
    pub fn new(text: &str, config: &AppConfig) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut unique = chars.clone();
        unique.sort_unstable();
        unique.dedup();

        Self {
            chars,
            unique,
            char_duration: config.audio.char_duration,
            video: config.video.clone(),
            legend: config.legend.clone(),
        }
    }

    pub fn render(&self, kind: SceneKind, seconds: f64) -> Frame {
        match kind {
            SceneKind::Reveal => self.render_reveal(seconds),
            SceneKind::Repeat => self.render_title(&TitleCard::repeat()),
            SceneKind::End => self.render_title(&TitleCard::end()),
            SceneKind::Legend => self.render_legend(),
        }
    }

    /// Number of squares visible at `seconds` into the reveal clip.
    ///
    /// The index wraps modulo the text length, so a clip played past its
    /// natural end starts revealing from the beginning again.
    pub fn revealed_count(&self, seconds: f64) -> usize {
        if self.chars.is_empty() {
            return 0;
        }
        let steps = (seconds.max(0.0) / self.char_duration + INDEX_EPSILON).floor() as usize;
        steps % self.chars.len() + 1
    }

    /// Top-left corner of the reveal square for character `index`.
    pub fn reveal_cell(&self, index: usize) -> (u32, u32) {
        let size = self.video.square_size;
        let per_row = (self.video.width / size).max(1) as usize;
        let col = (index % per_row) as u32;
        let row = (index / per_row) as u32;
        (col * size, row.saturating_mul(size))
    }

    pub fn render_reveal(&self, seconds: f64) -> Frame {
        let mut frame = blank_frame(self.video.width, self.video.height);
        let size = self.video.square_size;
        for (index, ch) in self.chars.iter().take(self.revealed_count(seconds)).enumerate() {
            let (x, y) = self.reveal_cell(index);
            if y >= self.video.height {
                break;
            }
            fill_rect(&mut frame, x, y, size, size, color_for(*ch));
        }
        frame
    }

    pub fn render_title(&self, card: &TitleCard) -> Frame {
        let mut frame = blank_frame(self.video.width, self.video.height);
        let glyph_height = crate::render::font::GLYPH_HEIGHT * TITLE_SCALE;
        let x = (self.video.width / 2).saturating_sub(card.left_of_center);
        let y = (self.video.height / 2).saturating_sub(glyph_height);
        draw_text(&mut frame, card.text, x, y, TITLE_SCALE, card.color);
        frame
    }

    fn legend_pitch(&self) -> u32 {
        self.legend.square_size + self.legend.padding
    }

    /// Columns and rows of the legend grid.
    pub fn legend_grid(&self) -> (usize, usize) {
        let pitch = self.legend_pitch();
        let columns = self.video.width.saturating_sub(self.legend.x_offset) / pitch;
        let rows = self.video.height.saturating_sub(self.legend.y_offset) / pitch;
        (columns as usize, rows as usize)
    }

    pub fn legend_capacity(&self) -> usize {
        let (columns, rows) = self.legend_grid();
        columns * rows
    }

    /// Sorted unique characters that fit on the legend. The rest are dropped.
    pub fn legend_entries(&self) -> &[char] {
        let shown = self.unique.len().min(self.legend_capacity());
        &self.unique[..shown]
    }

    pub fn unique_chars(&self) -> &[char] {
        &self.unique
    }

    /// Top-left corner of the legend swatch for entry `index`.
    pub fn legend_cell(&self, index: usize) -> (u32, u32) {
        let (columns, _) = self.legend_grid();
        let columns = columns.max(1);
        let pitch = self.legend_pitch();
        let col = (index % columns) as u32;
        let row = (index / columns) as u32;
        (
            self.legend.x_offset + col * pitch,
            self.legend.y_offset + row * pitch,
        )
    }

    pub fn render_legend(&self) -> Frame {
        let mut frame = blank_frame(self.video.width, self.video.height);
        let size = self.legend.square_size;
        let label_height = crate::render::font::GLYPH_HEIGHT * LABEL_SCALE;

        for (index, ch) in self.legend_entries().iter().enumerate() {
            let (x, y) = self.legend_cell(index);
            fill_rect(&mut frame, x, y, size, size, color_for(*ch));

            let label_y = (y + size).saturating_sub(5 + label_height).max(y);
            draw_text(&mut frame, &ch.to_string(), x + 5, label_y, LABEL_SCALE, WHITE);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BLACK;

    fn scene(text: &str) -> SceneInstance {
        SceneInstance::new(text, &AppConfig::default())
    }

    #[test]
    fn reveals_one_square_per_tenth_of_a_second() {
        let scene = scene("ABCD");
        assert_eq!(scene.revealed_count(0.0), 1);
        assert_eq!(scene.revealed_count(0.1), 2);
        assert_eq!(scene.revealed_count(0.3), 4);
        // Wraps once the text is exhausted.
        assert_eq!(scene.revealed_count(0.4), 1);
    }

    #[test]
    fn reveal_squares_use_character_colors() {
        let scene = scene("AB");
        let first = scene.render_reveal(0.0);
        assert_eq!(*first.get_pixel(5, 5), color_for('A'));
        assert_eq!(*first.get_pixel(25, 5), BLACK);

        let second = scene.render_reveal(0.1);
        assert_eq!(*second.get_pixel(25, 5), color_for('B'));
        assert_eq!(second.dimensions(), (1280, 720));
    }

    #[test]
    fn reveal_wraps_rows_at_canvas_width() {
        let scene = scene("x");
        assert_eq!(scene.reveal_cell(63), (1260, 0));
        assert_eq!(scene.reveal_cell(64), (0, 20));
    }

    #[test]
    fn title_cards_draw_in_their_color() {
        let scene = scene("A");
        let repeat = scene.render(SceneKind::Repeat, 0.0);
        assert!(repeat.pixels().any(|p| *p == RED));
        assert!(repeat.pixels().all(|p| *p == RED || *p == BLACK));

        let end = scene.render(SceneKind::End, 1.5);
        assert!(end.pixels().any(|p| *p == WHITE));
        assert!(end.pixels().all(|p| *p == WHITE || *p == BLACK));
    }

    #[test]
    fn legend_lists_unique_sorted_characters() {
        let scene = scene("banana");
        assert_eq!(scene.legend_entries(), &['a', 'b', 'n']);

        let frame = scene.render_legend();
        for (index, ch) in scene.legend_entries().iter().enumerate() {
            let (x, y) = scene.legend_cell(index);
            // The swatch corner is never covered by the label.
            assert_eq!(*frame.get_pixel(x + 1, y + 1), color_for(*ch));
        }
    }

    #[test]
    fn legend_drops_characters_beyond_capacity() {
        let text: String = (0x100u32..0x300).filter_map(char::from_u32).collect();
        let scene = scene(&text);
        assert_eq!(scene.legend_grid(), (24, 13));
        assert_eq!(scene.legend_capacity(), 312);
        assert_eq!(scene.unique_chars().len(), 512);
        assert_eq!(scene.legend_entries().len(), 312);

        let (x, y) = scene.legend_cell(311);
        assert_eq!((x, y), (50 + 23 * 50, 50 + 12 * 50));
    }
}
