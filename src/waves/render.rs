//! tiny-skia rendering of the wave fill

use tiny_skia::{
    Color, FilterQuality, Paint, Pattern, Pixmap, Rect, Shader, SpreadMode, Transform,
};

use super::oscillator::OscillatorRatios;
use super::texture::{WaveGeometry, WaveTexture};

/// Keeps a sliver of the wave visible at the very start of a countdown
pub const MAX_PROGRESS: f32 = 0.99;

/// Per-frame placement of the wave tile inside the viewport
///
/// Scales the tile vertically around the water level, then translates it by
/// the phase shift and the progress-driven water height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveTransform {
    pub scale_y: f32,
    pub pivot_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl WaveTransform {
    pub fn new(
        ratios: OscillatorRatios,
        progress: f32,
        width: f32,
        height: f32,
        geometry: &WaveGeometry,
    ) -> Self {
        let progress = progress.min(MAX_PROGRESS);
        Self {
            scale_y: ratios.amplitude_scale / geometry.amplitude_ratio,
            pivot_y: geometry.water_level_ratio * height,
            translate_x: ratios.phase_shift * width,
            translate_y: (geometry.water_level_ratio - progress) * height,
        }
    }

    /// Where tile row `y` lands in the viewport
    pub fn map_y(&self, y: f32) -> f32 {
        self.scale_y * (y - self.pivot_y) + self.pivot_y + self.translate_y
    }

    pub fn to_skia(&self) -> Transform {
        Transform::from_row(
            1.0,
            0.0,
            0.0,
            self.scale_y,
            self.translate_x,
            self.pivot_y * (1.0 - self.scale_y) + self.translate_y,
        )
    }
}

/// Paint one frame of the wave fill into `pixmap`
///
/// The viewport is the pixmap, shifted down by `offset_y`. Returns false when
/// nothing was drawn: the countdown is empty or the texture is not ready yet.
pub fn render_frame(
    pixmap: &mut Pixmap,
    texture: Option<&WaveTexture>,
    ratios: OscillatorRatios,
    progress: f32,
    offset_y: f32,
) -> bool {
    if progress <= 0.0 {
        return false;
    }
    let Some(texture) = texture else {
        log::trace!("Render: no texture yet, skipping frame");
        return false;
    };

    let width = pixmap.width() as f32;
    let height = pixmap.height() as f32;
    let transform = WaveTransform::new(ratios, progress, width, height, &texture.geometry());
    let local = transform.to_skia().post_translate(0.0, offset_y);

    // The pattern repeats on both axes; limit it to the tile's own rows and
    // extend the last row downward to get repeat-x / clamp-y.
    let tile_height = texture.height() as f32;
    let tile_top = transform.map_y(0.0) + offset_y;
    let tile_bottom = transform.map_y(tile_height) + offset_y;
    let clamp_top = transform.map_y(tile_height - 1.0) + offset_y;

    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.shader = Pattern::new(
        texture.pixmap().as_ref(),
        SpreadMode::Repeat,
        FilterQuality::Bilinear,
        1.0,
        local,
    );
    fill_band(pixmap, &paint, tile_top, tile_bottom);

    paint.shader = Shader::SolidColor(texture.bottom_color());
    fill_band(pixmap, &paint, clamp_top, height);

    true
}

/// Fill the full-width band between `top` and `bottom`, clipped to the pixmap
fn fill_band(pixmap: &mut Pixmap, paint: &Paint, top: f32, bottom: f32) {
    let top = top.max(0.0);
    let bottom = bottom.min(pixmap.height() as f32);
    if bottom <= top {
        return;
    }
    let Some(rect) = Rect::from_ltrb(0.0, top, pixmap.width() as f32, bottom) else {
        return;
    };
    pixmap.fill_rect(rect, paint, Transform::identity(), None);
}

/// Clear the pixmap to a background colour before a frame
pub fn clear(pixmap: &mut Pixmap, background: Color) {
    pixmap.fill(background);
}
