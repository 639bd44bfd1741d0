//! Image XObjects.
//!
//! JPEG data is embedded as-is with `/DCTDecode`. PNG data is decoded with
//! the `image` crate and re-encoded as Flate-compressed samples, with any
//! alpha channel split into a soft mask.

use super::filters::{self, Filter};
use super::resources::Fingerprint;
use crate::object::{Dictionary, Object, ObjectRef};

/// How the sample data of an image is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG stream (DCTDecode)
    Jpeg,
    /// Flate-compressed samples (FlateDecode)
    Flate,
    /// Uncompressed samples
    Raw,
}

/// Color space for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB color (3 components per pixel)
    DeviceRGB,
    /// CMYK color (4 components per pixel)
    DeviceCMYK,
}

impl ColorSpace {
    /// Get the number of color components.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRGB => 3,
            ColorSpace::DeviceCMYK => 4,
        }
    }

    /// Get the PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// Image embedding error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Unsupported image format
    #[error("Unsupported image format")]
    UnsupportedFormat,

    /// Failed to decode image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Failed to compress image data
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),
}

/// Image ready to be registered as a page resource.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per component (usually 8)
    pub bits_per_component: u8,
    /// Color space
    pub color_space: ColorSpace,
    /// Storage format of `data`
    pub format: ImageFormat,
    /// Encoded sample data
    pub data: bytes::Bytes,
    /// Flate-compressed alpha channel, if any
    pub soft_mask: Option<bytes::Bytes>,
}

impl ImageData {
    /// Wrap uncompressed 8-bit samples.
    pub fn from_raw(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        samples: Vec<u8>,
    ) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * color_space.components() as usize;
        if samples.len() != expected {
            return Err(ImageError::InvalidData(format!(
                "expected {} sample bytes for {}x{} {}, got {}",
                expected,
                width,
                height,
                color_space.pdf_name(),
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            format: ImageFormat::Raw,
            data: samples.into(),
            soft_mask: None,
        })
    }

    /// Load a JPEG image; the stream is embedded without transcoding.
    pub fn from_jpeg(data: Vec<u8>) -> Result<Self, ImageError> {
        let (width, height, color_space) = parse_jpeg_header(&data)?;

        Ok(Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            format: ImageFormat::Jpeg,
            data: data.into(),
            soft_mask: None,
        })
    }

    /// Load a PNG image.
    pub fn from_png(data: &[u8]) -> Result<Self, ImageError> {
        use image::GenericImageView;

        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| ImageError::DecodeError(e.to_string()))?;
        let (width, height) = img.dimensions();

        let (color_space, pixels, alpha) = match img.color() {
            image::ColorType::L8 | image::ColorType::L16 => {
                (ColorSpace::DeviceGray, img.to_luma8().into_raw(), None)
            },
            image::ColorType::La8 | image::ColorType::La16 => {
                let la = img.to_luma_alpha8();
                let (gray, alpha): (Vec<u8>, Vec<u8>) =
                    la.pixels().map(|p| (p.0[0], p.0[1])).unzip();
                (ColorSpace::DeviceGray, gray, Some(alpha))
            },
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
                let mut alpha = Vec::with_capacity(width as usize * height as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }
                (ColorSpace::DeviceRGB, rgb, Some(alpha))
            },
            _ => (ColorSpace::DeviceRGB, img.to_rgb8().into_raw(), None),
        };

        // Fully opaque alpha channels carry no information
        let alpha = alpha.filter(|a| a.iter().any(|&v| v != 255));

        Ok(Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            format: ImageFormat::Flate,
            data: compress(&pixels)?.into(),
            soft_mask: alpha.map(|a| compress(&a)).transpose()?.map(Into::into),
        })
    }

    /// Load an image from raw bytes, detecting JPEG or PNG by signature.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ImageError> {
        if data.starts_with(&[0xFF, 0xD8]) {
            return Self::from_jpeg(data.to_vec());
        }
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Self::from_png(data);
        }
        Err(ImageError::UnsupportedFormat)
    }

    /// Load an image from a file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Ok(Self::from_bytes(&data)?)
    }

    /// Resource fingerprint over geometry, color space, depth, format and payload.
    pub fn fingerprint(&self) -> Fingerprint {
        let geometry = [
            self.width.to_le_bytes(),
            self.height.to_le_bytes(),
        ]
        .concat();
        let format: &[u8] = match self.format {
            ImageFormat::Jpeg => b"jpeg",
            ImageFormat::Flate => b"flate",
            ImageFormat::Raw => b"raw",
        };
        let mask: &[u8] = self.soft_mask.as_deref().unwrap_or(&[]);
        Fingerprint::of(&[
            b"image",
            &geometry,
            self.color_space.pdf_name().as_bytes(),
            &[self.bits_per_component],
            format,
            &self.data,
            mask,
        ])
    }

    /// The image XObject stream, pointing at its soft mask when there is one.
    pub fn xobject(&self, soft_mask: Option<ObjectRef>) -> Object {
        let mut dict = self.base_dict(self.color_space);
        match self.format {
            ImageFormat::Jpeg => {
                dict.insert("Filter".to_string(), Object::Name("DCTDecode".to_string()));
            },
            ImageFormat::Flate => {
                if let Some(filter) = filters::filter_entry(&[Filter::Flate]) {
                    dict.insert("Filter".to_string(), filter);
                }
            },
            ImageFormat::Raw => {},
        }
        if let Some(mask) = soft_mask {
            dict.insert("SMask".to_string(), Object::Reference(mask));
        }
        Object::Stream {
            dict,
            data: self.data.clone(),
        }
    }

    /// The soft-mask XObject stream, if the image has alpha.
    pub fn soft_mask_xobject(&self) -> Option<Object> {
        self.soft_mask.as_ref().map(|mask| {
            let mut dict = self.base_dict(ColorSpace::DeviceGray);
            dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
            Object::Stream {
                dict,
                data: mask.clone(),
            }
        })
    }

    fn base_dict(&self, color_space: ColorSpace) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
        dict.insert("Width".to_string(), Object::Integer(self.width as i64));
        dict.insert("Height".to_string(), Object::Integer(self.height as i64));
        dict.insert("ColorSpace".to_string(), Object::Name(color_space.pdf_name().to_string()));
        dict.insert(
            "BitsPerComponent".to_string(),
            Object::Integer(self.bits_per_component as i64),
        );
        dict
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Largest size with this aspect ratio that fits in the box.
    pub fn fit_to_box(&self, max_width: f64, max_height: f64) -> (f64, f64) {
        let aspect = self.aspect_ratio();
        if max_height <= 0.0 || max_width <= 0.0 {
            return (0.0, 0.0);
        }
        if aspect > max_width / max_height {
            (max_width, max_width / aspect)
        } else {
            (max_height * aspect, max_height)
        }
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    filters::encode(data, &[Filter::Flate]).map_err(|e| ImageError::CompressionError(e.to_string()))
}

/// Read width, height and component count from the first SOF marker.
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace), ImageError> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return Err(ImageError::InvalidData("Not a valid JPEG".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        // Fill bytes and standalone markers carry no length
        if marker == 0xFF || marker == 0x00 || (0xD0..=0xD9).contains(&marker) {
            continue;
        }

        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            if pos + 8 > data.len() {
                return Err(ImageError::InvalidData("Truncated JPEG header".to_string()));
            }
            let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
            let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
            let color_space = match data[pos + 7] {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceRGB,
            };
            return Ok((width, height, color_space));
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if length < 2 {
            return Err(ImageError::InvalidData("Corrupt JPEG segment length".to_string()));
        }
        pos += length;
    }

    Err(ImageError::InvalidData("Could not find JPEG dimensions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // SOI, APP0 stub, SOF0 for a 3x2 RGB image, EOI
    const MINIMAL_JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x02,
        0x00, 0x03, 0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01, 0xFF, 0xD9,
    ];

    #[test]
    fn test_parse_jpeg_header() {
        let img = ImageData::from_jpeg(MINIMAL_JPEG.to_vec()).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.color_space, ColorSpace::DeviceRGB);
        assert_eq!(img.format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_reject_non_image() {
        assert!(matches!(
            ImageData::from_bytes(b"GIF89a"),
            Err(ImageError::UnsupportedFormat)
        ));
        assert!(ImageData::from_jpeg(vec![0xFF, 0xD8, 0xFF]).is_err());
    }

    #[test]
    fn test_raw_sample_count_is_checked() {
        assert!(ImageData::from_raw(2, 2, ColorSpace::DeviceRGB, vec![0; 12]).is_ok());
        assert!(ImageData::from_raw(2, 2, ColorSpace::DeviceRGB, vec![0; 11]).is_err());
    }

    #[test]
    fn test_xobject_dictionary() {
        let img = ImageData::from_jpeg(MINIMAL_JPEG.to_vec()).unwrap();
        let obj = img.xobject(Some(ObjectRef::new(9, 0)));
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Subtype").and_then(|o| o.as_name()), Some("Image"));
        assert_eq!(dict.get("Filter").and_then(|o| o.as_name()), Some("DCTDecode"));
        assert_eq!(dict.get("SMask").and_then(|o| o.as_reference()), Some(ObjectRef::new(9, 0)));
        assert_eq!(dict.get("Width").and_then(|o| o.as_integer()), Some(3));
    }

    #[test]
    fn test_fingerprint_tracks_payload() {
        let a = ImageData::from_raw(1, 1, ColorSpace::DeviceGray, vec![0]).unwrap();
        let b = ImageData::from_raw(1, 1, ColorSpace::DeviceGray, vec![255]).unwrap();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fit_to_box_keeps_aspect() {
        let img = ImageData::from_raw(200, 100, ColorSpace::DeviceGray, vec![0; 20000]).unwrap();
        assert_eq!(img.fit_to_box(100.0, 100.0), (100.0, 50.0));
        assert_eq!(img.fit_to_box(400.0, 50.0), (100.0, 50.0));
    }
}
