//! Image transforms: resize, crop, format conversion and colour histograms.
//!
//! All functions take the stored payload bytes and return freshly encoded
//! output; the stored file is never modified.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use serde::Serialize;

use super::render::{self, Series};
use crate::error::{ServiceError, ServiceResult};

/// Upper bound on either output dimension of a resize.
pub const MAX_DIMENSION: u32 = 10_000;

/// Output formats accepted by `convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Tga,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        Self::Png,
        Self::Jpeg,
        Self::Gif,
        Self::Bmp,
        Self::Tiff,
        Self::WebP,
        Self::Tga,
    ];

    /// Parse a client-supplied format name (case-insensitive).
    pub fn parse(name: &str) -> ServiceResult<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "PNG" => Ok(Self::Png),
            "JPEG" | "JPG" => Ok(Self::Jpeg),
            "GIF" => Ok(Self::Gif),
            "BMP" => Ok(Self::Bmp),
            "TIFF" | "TIF" => Ok(Self::Tiff),
            "WEBP" => Ok(Self::WebP),
            "TGA" => Ok(Self::Tga),
            _ => Err(ServiceError::UnsupportedFormat(format!(
                "{} (expected one of {})",
                name.trim(),
                Self::ALL
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
            Self::WebP => "WEBP",
            Self::Tga => "TGA",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
            Self::WebP => ImageFormat::WebP,
            Self::Tga => ImageFormat::Tga,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.image_format().to_mime_type()
    }
}

/// Per-channel pixel counts over 256 bins.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram {
    pub red: Vec<u64>,
    pub green: Vec<u64>,
    pub blue: Vec<u64>,
}

pub fn decode(bytes: &[u8]) -> ServiceResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| ServiceError::upstream("Failed to decode image", e))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> ServiceResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| ServiceError::upstream("Failed to encode image", e))?;
    Ok(buf)
}

/// Resize to exactly `width` x `height` and encode as PNG.
pub fn resize(bytes: &[u8], width: u32, height: u32) -> ServiceResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(ServiceError::invalid_parameter(
            "Width and height must be positive integers",
        ));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ServiceError::invalid_parameter(format!(
            "Width and height must not exceed {}",
            MAX_DIMENSION
        )));
    }
    let img = decode(bytes)?;
    let resized = img.resize_exact(width, height, FilterType::CatmullRom);
    encode(&resized, ImageFormat::Png)
}

/// Crop box in pixel coordinates; right and bottom are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Crop to `area` and encode as PNG. The box must lie inside the image.
pub fn crop(bytes: &[u8], area: CropBox) -> ServiceResult<Vec<u8>> {
    if area.left >= area.right || area.top >= area.bottom {
        return Err(ServiceError::invalid_parameter(
            "Crop box must satisfy left < right and top < bottom",
        ));
    }
    let img = decode(bytes)?;
    if area.right > img.width() || area.bottom > img.height() {
        return Err(ServiceError::invalid_parameter(format!(
            "Crop box exceeds image bounds ({}x{})",
            img.width(),
            img.height()
        )));
    }
    let cropped = img.crop_imm(
        area.left,
        area.top,
        area.right - area.left,
        area.bottom - area.top,
    );
    encode(&cropped, ImageFormat::Png)
}

/// Re-encode into `format`. Returns the bytes and their MIME type.
pub fn convert(bytes: &[u8], format: OutputFormat) -> ServiceResult<(Vec<u8>, &'static str)> {
    let img = decode(bytes)?;
    // Normalise to 8-bit so every encoder on the allow-list accepts it.
    let normalised = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };
    let out = encode(&normalised, format.image_format())?;
    Ok((out, format.mime_type()))
}

/// Count R, G and B values. Only colour images are accepted.
pub fn histogram(bytes: &[u8]) -> ServiceResult<Histogram> {
    let img = decode(bytes)?;
    match img.color() {
        ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::Rgb16
        | ColorType::Rgba16
        | ColorType::Rgb32F
        | ColorType::Rgba32F => {}
        other => {
            return Err(ServiceError::invalid_parameter(format!(
                "Histogram requires an RGB image, got {:?}",
                other
            )))
        }
    }

    let mut hist = Histogram {
        red: vec![0; 256],
        green: vec![0; 256],
        blue: vec![0; 256],
    };
    for pixel in img.to_rgb8().pixels() {
        hist.red[pixel[0] as usize] += 1;
        hist.green[pixel[1] as usize] += 1;
        hist.blue[pixel[2] as usize] += 1;
    }
    Ok(hist)
}

/// Render a histogram as a three-line PNG plot.
pub fn histogram_plot(hist: &Histogram) -> ServiceResult<Vec<u8>> {
    let to_f64 = |v: &[u64]| v.iter().map(|c| *c as f64).collect::<Vec<_>>();
    let (red, green, blue) = (to_f64(&hist.red), to_f64(&hist.green), to_f64(&hist.blue));
    render::line_chart(&[
        Series {
            values: &red,
            color: render::RED,
        },
        Series {
            values: &green,
            color: render::GREEN,
        },
        Series {
            values: &blue,
            color: render::BLUE,
        },
    ])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn dims(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_resize_exact_dimensions() {
        let src = sample_png(40, 30);
        for (w, h) in [(1, 1), (10, 90), (80, 60), (33, 7)] {
            let out = resize(&src, w, h).unwrap();
            assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
            assert_eq!(dims(&out), (w, h));
        }
    }

    #[test]
    fn test_resize_rejects_zero() {
        let src = sample_png(4, 4);
        assert!(matches!(
            resize(&src, 0, 10),
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_crop_dimensions_and_bounds() {
        let src = sample_png(40, 30);
        let out = crop(
            &src,
            CropBox {
                left: 5,
                top: 2,
                right: 25,
                bottom: 30,
            },
        )
        .unwrap();
        assert_eq!(dims(&out), (20, 28));

        let too_wide = CropBox {
            left: 0,
            top: 0,
            right: 41,
            bottom: 10,
        };
        assert!(matches!(
            crop(&src, too_wide),
            Err(ServiceError::InvalidParameter(_))
        ));

        let inverted = CropBox {
            left: 10,
            top: 0,
            right: 10,
            bottom: 10,
        };
        assert!(matches!(
            crop(&src, inverted),
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_convert_png_then_jpeg() {
        let src = sample_png(16, 16);
        let (png, mime) = convert(&src, OutputFormat::parse("png").unwrap()).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);

        let (jpeg, mime) = convert(&src, OutputFormat::parse("JPEG").unwrap()).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_convert_rgba_to_jpeg_drops_alpha() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 100]));
        let mut src = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut src), ImageFormat::Png)
            .unwrap();
        let (jpeg, _) = convert(&src, OutputFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_format_allow_list() {
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse(" WebP ").unwrap(), OutputFormat::WebP);
        assert!(matches!(
            OutputFormat::parse("exe"),
            Err(ServiceError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            OutputFormat::parse("image/png; x"),
            Err(ServiceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_histogram_counts_every_pixel() {
        let src = sample_png(10, 5);
        let hist = histogram(&src).unwrap();
        assert_eq!(hist.red.len(), 256);
        assert_eq!(hist.red.iter().sum::<u64>(), 50);
        assert_eq!(hist.blue[128], 50);
        assert_eq!(hist.green[0], 10);
        assert!(!histogram_plot(&hist).unwrap().is_empty());
    }

    #[test]
    fn test_histogram_rejects_grayscale() {
        let img = GrayImage::from_pixel(4, 4, Luma([9]));
        let mut src = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut src), ImageFormat::Png)
            .unwrap();
        assert!(matches!(
            histogram(&src),
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_decode_garbage_is_sanitised() {
        let err = resize(b"not an image", 10, 10).unwrap_err();
        assert_eq!(err.to_string(), "Failed to decode image");
    }
}
