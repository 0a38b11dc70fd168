//! Wave texture synthesis
//!
//! One tile of the fill pattern: a translucent "trailing" sine wave with an
//! opaque copy of the same wave shifted a quarter wavelength on top. The tile
//! repeats horizontally; the renderer clamps it vertically.

use std::f32::consts::PI;
use std::sync::Arc;

use thiserror::Error;
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Wave height as a fraction of the tile height
pub const AMPLITUDE_RATIO: f32 = 0.05;
/// Baseline of the wave as a fraction of the tile height
pub const WATER_LEVEL_RATIO: f32 = 0.5;

/// Opacity of the trailing wave layer
const TRAILING_ALPHA: f32 = 0.3;
const STROKE_WIDTH: f32 = 2.0;

/// Texture generation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("Cannot allocate a {width}x{height} wave texture")]
    InvalidSize { width: u32, height: u32 },
}

/// Vertical proportions of the wave inside a tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveGeometry {
    pub amplitude_ratio: f32,
    pub water_level_ratio: f32,
}

impl Default for WaveGeometry {
    fn default() -> Self {
        Self {
            amplitude_ratio: AMPLITUDE_RATIO,
            water_level_ratio: WATER_LEVEL_RATIO,
        }
    }
}

/// Everything a texture depends on; a new key means a new texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub width: u32,
    pub height: u32,
    /// Straight (non-premultiplied) RGBA
    pub rgba: [u8; 4],
}

impl TextureKey {
    pub fn new(width: u32, height: u32, color: Color) -> Self {
        let c = color.to_color_u8();
        Self {
            width,
            height,
            rgba: [c.red(), c.green(), c.blue(), c.alpha()],
        }
    }

    pub fn color(&self) -> Color {
        let [r, g, b, a] = self.rgba;
        Color::from_rgba8(r, g, b, a)
    }
}

/// An immutable tile of the wave fill pattern
pub struct WaveTexture {
    key: TextureKey,
    geometry: WaveGeometry,
    pixmap: Pixmap,
    /// Trailing wave y-coordinate per column, `width + 1` samples
    crest: Vec<f32>,
    /// Column offset of the foreground wave
    shift: usize,
}

impl std::fmt::Debug for WaveTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveTexture")
            .field("key", &self.key)
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

impl WaveTexture {
    pub fn key(&self) -> TextureKey {
        self.key
    }

    pub fn width(&self) -> u32 {
        self.key.width
    }

    pub fn height(&self) -> u32 {
        self.key.height
    }

    pub fn geometry(&self) -> WaveGeometry {
        self.geometry
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Baseline y-coordinate in tile pixels
    pub fn water_level(&self) -> f32 {
        self.key.height as f32 * self.geometry.water_level_ratio
    }

    /// Peak deviation from the baseline in tile pixels
    pub fn amplitude(&self) -> f32 {
        self.key.height as f32 * self.geometry.amplitude_ratio
    }

    /// Trailing wave y-coordinate at column `x`
    pub fn background_y(&self, x: usize) -> Option<f32> {
        self.crest.get(x).copied()
    }

    /// Foreground wave y-coordinate at column `x`
    pub fn foreground_y(&self, x: usize) -> Option<f32> {
        if x >= self.crest.len() {
            return None;
        }
        self.crest.get((x + self.shift) % self.crest.len()).copied()
    }

    /// Colour of the last row, used to extend the tile downward
    pub fn bottom_color(&self) -> Color {
        let bottom = self.key.height.saturating_sub(1);
        match self.pixmap.pixel(0, bottom) {
            Some(pixel) => {
                let c = pixel.demultiply();
                Color::from_rgba8(c.red(), c.green(), c.blue(), c.alpha())
            }
            None => self.key.color(),
        }
    }
}

/// Synthesize one wave tile of `width` x `height` pixels in `color`
pub fn generate(
    width: u32,
    height: u32,
    color: Color,
    geometry: &WaveGeometry,
) -> Result<WaveTexture, TextureError> {
    let mut pixmap = Pixmap::new(width, height).ok_or(TextureError::InvalidSize { width, height })?;

    let angular_frequency = 2.0 * PI / width as f32;
    let amplitude = height as f32 * geometry.amplitude_ratio;
    let water_level = height as f32 * geometry.water_level_ratio;
    let bottom = (height + 1) as f32;

    let stroke = Stroke {
        width: STROKE_WIDTH,
        ..Stroke::default()
    };
    let mut paint = Paint::default();
    paint.anti_alias = true;

    // Trailing layer
    let trailing = Color::from_rgba(
        color.red(),
        color.green(),
        color.blue(),
        color.alpha() * TRAILING_ALPHA,
    )
    .unwrap_or(color);
    paint.set_color(trailing);

    let columns = width as usize + 1;
    let mut crest = Vec::with_capacity(columns);
    for x in 0..columns {
        let y = water_level + amplitude * (x as f32 * angular_frequency).sin();
        draw_column(&mut pixmap, x as f32, y, bottom, &paint, &stroke);
        crest.push(y);
    }

    // Foreground layer, a quarter wavelength ahead
    paint.set_color(color);
    let shift = width as usize / 4;
    for x in 0..columns {
        let y = crest[(x + shift) % columns];
        draw_column(&mut pixmap, x as f32, y, bottom, &paint, &stroke);
    }

    log::debug!("Generated {}x{} wave texture", width, height);

    Ok(WaveTexture {
        key: TextureKey::new(width, height, color),
        geometry: *geometry,
        pixmap,
        crest,
        shift,
    })
}

/// Each column is its own stroke so overlapping translucent lines blend
fn draw_column(pixmap: &mut Pixmap, x: f32, top: f32, bottom: f32, paint: &Paint, stroke: &Stroke) {
    let mut pb = PathBuilder::new();
    pb.move_to(x, top);
    pb.line_to(x, bottom);
    let Some(path) = pb.finish() else {
        return;
    };
    pixmap.stroke_path(&path, paint, stroke, Transform::identity(), None);
}

/// Keeps the texture for the most recent key
#[derive(Debug, Default)]
pub struct TextureCache {
    current: Option<Arc<WaveTexture>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached texture if it was generated for `key`
    pub fn get(&self, key: &TextureKey) -> Option<Arc<WaveTexture>> {
        self.current
            .as_ref()
            .filter(|texture| texture.key() == *key)
            .cloned()
    }

    /// Most recent texture regardless of key
    pub fn latest(&self) -> Option<Arc<WaveTexture>> {
        self.current.clone()
    }

    pub fn insert(&mut self, texture: WaveTexture) -> Arc<WaveTexture> {
        let texture = Arc::new(texture);
        self.current = Some(Arc::clone(&texture));
        texture
    }

    /// Return the cached texture for `key`, generating it on a miss
    pub fn get_or_generate(
        &mut self,
        key: TextureKey,
        geometry: &WaveGeometry,
    ) -> Result<Arc<WaveTexture>, TextureError> {
        if let Some(texture) = self.get(&key) {
            log::trace!("Texture cache hit for {:?}", key);
            return Ok(texture);
        }
        log::debug!("Texture cache miss for {:?}", key);
        let texture = generate(key.width, key.height, key.color(), geometry)?;
        Ok(self.insert(texture))
    }
}
