//! Terminal timeline rendering
//!
//! Paints each scene as one overwritten status line: the envelope curve as
//! a column of gain glyphs, dimmed cells outside the active region, and a
//! playhead marker. Repeated identical frames are skipped so an idle
//! session leaves the cursor alone.

use std::io::{self, Write};

use excerpt_core::render::{Scene, Surface};

const TIMELINE_WIDTH: usize = 64;

/// Gain levels from silent to full
const GAIN_GLYPHS: [char; 5] = [' ', '.', '-', '=', '#'];

pub struct TermSurface {
    out: io::Stdout,
    last_line: Option<String>,
}

impl TermSurface {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            last_line: None,
        }
    }

    /// Finish the overwritten line so later prints start fresh
    pub fn release_line(&mut self) {
        if self.last_line.take().is_some() {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
    }

    fn compose(scene: &Scene) -> String {
        let mut cells = [' '; TIMELINE_WIDTH];

        for &(x, gain) in &scene.curve {
            let cell = &mut cells[cell_index(x)];
            let glyph = gain_glyph(gain);
            // Several curve samples can share a cell; keep the loudest
            if glyph_level(*cell) <= glyph_level(glyph) {
                *cell = glyph;
            }
        }
        for &(from, to) in &scene.dim_spans {
            for cell in &mut cells[cell_index(from)..=cell_index(to)] {
                *cell = '.';
            }
        }
        cells[cell_index(scene.playhead)] = '|';

        format!(
            "[{}] {:5.1}%",
            cells.iter().collect::<String>(),
            scene.playhead * 100.0
        )
    }
}

impl Surface for TermSurface {
    fn paint(&mut self, scene: &Scene) {
        let line = Self::compose(scene);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        let _ = write!(self.out, "\r{}", line);
        let _ = self.out.flush();
        self.last_line = Some(line);
    }
}

fn cell_index(x: f64) -> usize {
    ((x.clamp(0.0, 1.0) * (TIMELINE_WIDTH - 1) as f64).round() as usize).min(TIMELINE_WIDTH - 1)
}

fn gain_glyph(gain: f64) -> char {
    let level = (gain.clamp(0.0, 1.0) * (GAIN_GLYPHS.len() - 1) as f64).round() as usize;
    GAIN_GLYPHS[level.min(GAIN_GLYPHS.len() - 1)]
}

fn glyph_level(glyph: char) -> usize {
    GAIN_GLYPHS.iter().position(|&g| g == glyph).unwrap_or(0)
}
