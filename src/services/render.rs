//! Minimal chart rasteriser producing PNG bytes.
//!
//! Draws directly onto an `RgbImage`: axes, light grid lines, polylines,
//! bars and dots. There is no text rendering, so charts carry no labels.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::error::{ServiceError, ServiceResult};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
const MARGIN: i64 = 50;
const GRID_LINES: i64 = 5;

pub const RED: Rgb<u8> = Rgb([220, 50, 47]);
pub const GREEN: Rgb<u8> = Rgb([40, 160, 60]);
pub const BLUE: Rgb<u8> = Rgb([38, 110, 200]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// One polyline in a line chart, plotted against its index.
pub struct Series<'a> {
    pub values: &'a [f64],
    pub color: Rgb<u8>,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn from_points(points: impl Iterator<Item = (f64, f64)>) -> Self {
        let mut b = Bounds {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in points.filter(|(x, y)| x.is_finite() && y.is_finite()) {
            b.min_x = b.min_x.min(x);
            b.max_x = b.max_x.max(x);
            b.min_y = b.min_y.min(y);
            b.max_y = b.max_y.max(y);
        }
        if !b.min_x.is_finite() {
            return Bounds {
                min_x: 0.0,
                max_x: 1.0,
                min_y: 0.0,
                max_y: 1.0,
            };
        }
        let (min_x, max_x) = widen(b.min_x, b.max_x);
        let (min_y, max_y) = widen(b.min_y, b.max_y);
        Bounds {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }
}

/// Avoid a zero-width range.
fn widen(min: f64, max: f64) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.5 };
        (min - pad, max + pad)
    } else {
        (min, max)
    }
}

struct Canvas {
    img: RgbImage,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Canvas {
    fn new() -> Self {
        let img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);
        let mut canvas = Canvas {
            img,
            left: MARGIN,
            top: MARGIN / 2,
            right: WIDTH as i64 - MARGIN / 2,
            bottom: HEIGHT as i64 - MARGIN,
        };
        for i in 1..=GRID_LINES {
            let y = canvas.bottom - (canvas.bottom - canvas.top) * i / GRID_LINES;
            canvas.line((canvas.left, y), (canvas.right, y), GRID);
        }
        canvas.line((canvas.left, canvas.bottom), (canvas.right, canvas.bottom), BLACK);
        canvas.line((canvas.left, canvas.top), (canvas.left, canvas.bottom), BLACK);
        canvas
    }

    fn map(&self, b: &Bounds, x: f64, y: f64) -> (i64, i64) {
        let w = (self.right - self.left) as f64;
        let h = (self.bottom - self.top) as f64;
        let px = self.left as f64 + (x - b.min_x) / (b.max_x - b.min_x) * w;
        let py = self.bottom as f64 - (y - b.min_y) / (b.max_y - b.min_y) * h;
        (px.round() as i64, py.round() as i64)
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Bresenham line.
    fn line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x, y, color);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn thick_line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
        for offset in [-1, 0, 1] {
            self.line((from.0, from.1 + offset), (to.0, to.1 + offset), color);
        }
    }

    fn fill_rect(&mut self, a: (i64, i64), b: (i64, i64), color: Rgb<u8>) {
        for x in a.0.min(b.0)..=a.0.max(b.0) {
            for y in a.1.min(b.1)..=a.1.max(b.1) {
                self.put(x, y, color);
            }
        }
    }

    fn dot(&mut self, center: (i64, i64), radius: i64, color: Rgb<u8>) {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    fn encode(self) -> ServiceResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.img
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| ServiceError::upstream("Failed to render chart", e))?;
        Ok(buf)
    }
}

/// Plot each series as a polyline over its index.
pub fn line_chart(series: &[Series<'_>]) -> ServiceResult<Vec<u8>> {
    let bounds = Bounds::from_points(
        series
            .iter()
            .flat_map(|s| s.values.iter().enumerate().map(|(i, v)| (i as f64, *v))),
    );
    let mut canvas = Canvas::new();
    for s in series {
        let points: Vec<(i64, i64)> = s
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| canvas.map(&bounds, i as f64, *v))
            .collect();
        for pair in points.windows(2) {
            canvas.thick_line(pair[0], pair[1], s.color);
        }
    }
    canvas.encode()
}

/// One bar per value, drawn up (or down) from zero.
pub fn bar_chart(values: &[f64]) -> ServiceResult<Vec<u8>> {
    let n = values.len().max(1) as f64;
    let bounds = Bounds::from_points(
        values
            .iter()
            .map(|v| (0.0, *v))
            .chain([(0.0, 0.0), (n, 0.0)]),
    );
    let mut canvas = Canvas::new();
    for (i, v) in values.iter().enumerate().filter(|(_, v)| v.is_finite()) {
        let x = i as f64;
        let a = canvas.map(&bounds, x + 0.1, 0.0);
        let b = canvas.map(&bounds, x + 0.9, *v);
        canvas.fill_rect(a, b, BLUE);
    }
    canvas.encode()
}

/// Scatter plot of 2-D points.
pub fn scatter_plot(points: &[(f64, f64)]) -> ServiceResult<Vec<u8>> {
    let bounds = Bounds::from_points(points.iter().copied());
    let mut canvas = Canvas::new();
    for (x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        let p = canvas.map(&bounds, *x, *y);
        canvas.dot(p, 5, BLUE);
    }
    canvas.encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> RgbImage {
        image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    #[test]
    fn test_bar_chart_is_png_of_fixed_size() {
        let img = decode(&bar_chart(&[1.0, 3.0, 2.0]).unwrap());
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        assert!(img.pixels().any(|p| *p == BLUE));
    }

    #[test]
    fn test_line_chart_draws_each_color() {
        let red = [0.0, 5.0, 2.0];
        let green = [1.0, 1.0, 1.0];
        let img = decode(
            &line_chart(&[
                Series {
                    values: &red,
                    color: RED,
                },
                Series {
                    values: &green,
                    color: GREEN,
                },
            ])
            .unwrap(),
        );
        assert!(img.pixels().any(|p| *p == RED));
        assert!(img.pixels().any(|p| *p == GREEN));
    }

    #[test]
    fn test_degenerate_inputs_still_render() {
        assert!(scatter_plot(&[]).is_ok());
        assert!(scatter_plot(&[(1.0, 1.0)]).is_ok());
        assert!(bar_chart(&[f64::NAN]).is_ok());
    }
}
