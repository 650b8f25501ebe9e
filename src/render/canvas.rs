use std::path::Path;

use crate::error::Result;

pub type Rgb = [u8; 3];

/// Opaque RGBA8 raster, row-major, origin at the top-left corner.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut canvas = Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        };
        canvas.clear(background);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(px)
    }

    pub fn clear(&mut self, color: Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px[..3].copy_from_slice(&color);
            px[3] = 255;
        }
    }

    /// Blend `color` over the rectangle at the given opacity.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb, alpha: f32) {
        let Some((x0, x1, y0, y1)) = self.clip(x, y, w, h) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color, alpha);
            }
        }
    }

    /// Fill a rectangle with a vertical gradient running from `bottom` at the
    /// rectangle's lower edge to `top` at its upper edge.
    pub fn fill_rect_vertical_gradient(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        bottom: Rgb,
        top: Rgb,
    ) {
        let Some((x0, x1, y0, y1)) = self.clip(x, y, w, h) else {
            return;
        };
        let lower = y + h;
        for py in y0..y1 {
            // Sample at the pixel centre
            let t = ((lower - (py as f32 + 0.5)) / h).clamp(0.0, 1.0);
            let color = lerp_rgb(bottom, top, t);
            for px in x0..x1 {
                self.blend(px, py, color, 1.0);
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    /// Covered pixel range: pixels whose centres fall inside the rectangle
    fn clip(&self, x: f32, y: f32, w: f32, h: f32) -> Option<(u32, u32, u32, u32)> {
        if !(w > 0.0 && h > 0.0) {
            return None;
        }
        let edge = |v: f32, max: u32| (v - 0.5).ceil().clamp(0.0, max as f32) as u32;
        let (x0, x1) = (edge(x, self.width), edge(x + w, self.width));
        let (y0, y1) = (edge(y, self.height), edge(y + h, self.height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, x1, y0, y1))
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgb, alpha: f32) {
        let idx = self.index(x, y);
        let a = alpha.clamp(0.0, 1.0);
        let inv_a = 1.0 - a;
        for c in 0..3 {
            let dst = self.pixels[idx + c] as f32;
            self.pixels[idx + c] = (color[c] as f32 * a + dst * inv_a).round() as u8;
        }
        self.pixels[idx + 3] = 255;
    }
}

pub fn lerp_rgb(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    [mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])]
}

/// CSS-style `hsl(h, s%, l%)` with `s` and `l` in 0.0-1.0
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
