use crate::WatermarkConfig;
use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Brand gold used for the text stamp.
const STAMP_COLOR: Rgba<u8> = Rgba([212, 175, 55, 255]);
const STAMP_ANGLE: f32 = -std::f32::consts::FRAC_PI_6;
const TILE_SPACING_FRACTION: f32 = 0.3;
const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampPosition {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl StampPosition {
    fn fractions(self) -> (f32, f32) {
        match self {
            StampPosition::Center => (0.5, 0.5),
            StampPosition::TopLeft => (0.1, 0.1),
            StampPosition::TopRight => (0.9, 0.1),
            StampPosition::BottomLeft => (0.1, 0.9),
            StampPosition::BottomRight => (0.9, 0.9),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StampOptions {
    pub position: StampPosition,
    pub opacity: f32,
    pub size_fraction: f32,
    pub tiled: bool,
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            position: StampPosition::Center,
            opacity: 0.3,
            size_fraction: 0.15,
            tiled: true,
        }
    }
}

/// Stamps a logo bitmap or a rotated text label onto images served to
/// visitors. Both the logo and the font load best-effort; with neither
/// available the renderer passes images through untouched.
pub struct WatermarkRenderer {
    text: String,
    font: Option<FontVec>,
    logo: Option<RgbaImage>,
    defaults: StampOptions,
}

impl WatermarkRenderer {
    pub async fn load(config: &WatermarkConfig, static_dir: &Path) -> Self {
        let font = match std::fs::read(static_dir.join("DejaVuSans.ttf")) {
            Ok(data) => match FontVec::try_from_vec(data) {
                Ok(font) => Some(font),
                Err(_) => {
                    warn!("Failed to parse watermark font, text stamp disabled");
                    None
                }
            },
            Err(e) => {
                warn!("No watermark font available: {}", e);
                None
            }
        };

        let logo = match &config.logo_path {
            Some(path) => {
                let path = path.clone();
                let timeout = std::time::Duration::from_secs(config.logo_load_timeout_secs);
                let loaded = tokio::time::timeout(
                    timeout,
                    tokio::task::spawn_blocking(move || image::open(&path)),
                )
                .await;

                match loaded {
                    Ok(Ok(Ok(img))) => {
                        debug!("Watermark logo loaded");
                        Some(img.to_rgba8())
                    }
                    Ok(Ok(Err(e))) => {
                        warn!("Failed to load watermark logo, using text: {}", e);
                        None
                    }
                    Ok(Err(e)) => {
                        warn!("Watermark logo load task failed: {}", e);
                        None
                    }
                    Err(_) => {
                        warn!("Watermark logo load timed out, using text");
                        None
                    }
                }
            }
            None => None,
        };

        Self {
            text: config.text.clone(),
            font,
            logo,
            defaults: StampOptions {
                position: StampPosition::Center,
                opacity: config.opacity,
                size_fraction: config.size_fraction,
                tiled: config.tiled,
            },
        }
    }

    /// Renderer with no external assets; images pass through unstamped.
    pub fn disabled(text: &str) -> Self {
        Self {
            text: text.to_string(),
            font: None,
            logo: None,
            defaults: StampOptions::default(),
        }
    }

    pub fn defaults(&self) -> StampOptions {
        self.defaults
    }

    /// Decode, stamp with the configured defaults, re-encode as JPEG.
    pub fn stamp_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, WatermarkError> {
        let image = image::load_from_memory(bytes)?;
        self.render(&image, &self.defaults)
    }

    /// Stamp an image at its native resolution and return JPEG bytes. A
    /// renderer without assets returns the image unstamped rather than
    /// failing the gallery.
    pub fn render(
        &self,
        image: &DynamicImage,
        options: &StampOptions,
    ) -> Result<Vec<u8>, WatermarkError> {
        let mut canvas = image.to_rgba8();

        if let Some(stamp) = self.build_stamp(canvas.width(), options.size_fraction) {
            if options.tiled {
                self.stamp_tiled(&mut canvas, &stamp, options.opacity);
            } else {
                let (fx, fy) = options.position.fractions();
                let cx = canvas.width() as f32 * fx;
                let cy = canvas.height() as f32 * fy;
                blend_stamp(&mut canvas, &stamp, cx, cy, options.opacity);
            }
        }

        encode_jpeg(canvas)
    }

    fn stamp_tiled(&self, canvas: &mut RgbaImage, stamp: &RgbaImage, opacity: f32) {
        // Tiles are subtler than the single stamp.
        let opacity = opacity * 0.5;
        let spacing =
            (canvas.width().min(canvas.height()) as f32 * TILE_SPACING_FRACTION).max(1.0);
        let rows = (canvas.height() as f32 / spacing).ceil() as u32 + 1;
        let cols = (canvas.width() as f32 / spacing).ceil() as u32 + 1;

        for row in 0..rows {
            for col in 0..cols {
                let cx = col as f32 * spacing - spacing * 0.5;
                let cy = row as f32 * spacing - spacing * 0.5;
                blend_stamp(canvas, stamp, cx, cy, opacity);
            }
        }
    }

    /// The stamp bitmap: the logo scaled to a fraction of the target width,
    /// or the rotated text label.
    fn build_stamp(&self, canvas_width: u32, size_fraction: f32) -> Option<RgbaImage> {
        if let Some(logo) = &self.logo {
            let width = ((canvas_width as f32 * size_fraction) as u32).max(1);
            let height =
                ((width as f32 * logo.height() as f32 / logo.width() as f32) as u32).max(1);
            return Some(imageops::resize(
                logo,
                width,
                height,
                imageops::FilterType::Triangle,
            ));
        }

        let font = self.font.as_ref()?;
        if self.text.is_empty() {
            return None;
        }

        let font_size = (canvas_width as f32 * size_fraction * 0.1).max(12.0);
        let scale = PxScale::from(font_size);
        let (text_width, text_height) = text_size(scale, font, &self.text);
        if text_width == 0 || text_height == 0 {
            return None;
        }

        // Draw into a square large enough that rotation clips nothing.
        let side = (((text_width * text_width + text_height * text_height) as f32).sqrt()
            .ceil() as u32)
            .max(1);
        let mut stamp = RgbaImage::from_pixel(side, side, Rgba([0, 0, 0, 0]));
        let x = ((side - text_width) / 2) as i32;
        let y = ((side - text_height) / 2) as i32;
        draw_text_mut(&mut stamp, STAMP_COLOR, x, y, scale, font, &self.text);

        Some(rotate_about_center(
            &stamp,
            STAMP_ANGLE,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        ))
    }
}

/// Alpha-blend a stamp centered at (cx, cy), scaling its alpha by `opacity`.
fn blend_stamp(canvas: &mut RgbaImage, stamp: &RgbaImage, cx: f32, cy: f32, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    let left = cx - stamp.width() as f32 / 2.0;
    let top = cy - stamp.height() as f32 / 2.0;

    for (sx, sy, pixel) in stamp.enumerate_pixels() {
        let alpha = (pixel[3] as f32 / 255.0) * opacity;
        if alpha <= 0.0 {
            continue;
        }

        let x = left + sx as f32;
        let y = top + sy as f32;
        if x < 0.0 || y < 0.0 || x >= canvas.width() as f32 || y >= canvas.height() as f32 {
            continue;
        }

        let dest = canvas.get_pixel_mut(x as u32, y as u32);
        for channel in 0..3 {
            dest[channel] = (dest[channel] as f32 * (1.0 - alpha)
                + pixel[channel] as f32 * alpha) as u8;
        }
    }
}

fn encode_jpeg(canvas: RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer_with_font(text: &str) -> Option<WatermarkRenderer> {
        let font_path = std::path::Path::new("static/DejaVuSans.ttf");
        let data = std::fs::read(font_path).ok()?;
        let font = FontVec::try_from_vec(data).ok()?;
        Some(WatermarkRenderer {
            text: text.to_string(),
            font: Some(font),
            logo: None,
            defaults: StampOptions::default(),
        })
    }

    #[test]
    fn stamp_options_default() {
        let options = StampOptions::default();
        assert_eq!(options.position, StampPosition::Center);
        assert_eq!(options.opacity, 0.3);
        assert_eq!(options.size_fraction, 0.15);
        assert!(options.tiled);
    }

    #[test]
    fn render_without_assets_passes_image_through() {
        let renderer = WatermarkRenderer::disabled("TEST");
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            64,
            48,
            Rgba([200, 100, 50, 255]),
        ));

        let bytes = renderer.render(&image, &StampOptions::default()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn text_stamp_changes_pixels() {
        // Can't test the stamp without the font file
        let Some(renderer) = renderer_with_font("STUDIO") else {
            return;
        };

        let image =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 400, Rgba([255, 255, 255, 255])));
        let options = StampOptions {
            tiled: true,
            ..StampOptions::default()
        };

        let bytes = renderer.render(&image, &options).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let changed = decoded
            .pixels()
            .any(|p| p[0] < 250 || p[1] < 250 || p[2] < 250);
        assert!(changed, "expected the stamp to darken some pixels");
    }

    #[test]
    fn logo_stamp_scales_to_size_fraction() {
        let logo = RgbaImage::from_pixel(100, 50, Rgba([10, 20, 30, 255]));
        let renderer = WatermarkRenderer {
            text: String::new(),
            font: None,
            logo: Some(logo),
            defaults: StampOptions::default(),
        };

        let stamp = renderer.build_stamp(1000, 0.15).unwrap();
        assert_eq!(stamp.width(), 150);
        assert_eq!(stamp.height(), 75);
    }

    #[test]
    fn blend_respects_bounds() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let stamp = RgbaImage::from_pixel(6, 6, Rgba([255, 255, 255, 255]));

        // Centered beyond the corner, most of the stamp falls outside.
        blend_stamp(&mut canvas, &stamp, 0.0, 0.0, 1.0);
        assert_eq!(canvas.get_pixel(0, 0)[0], 255);
        assert_eq!(canvas.get_pixel(9, 9)[0], 0);
    }
}
