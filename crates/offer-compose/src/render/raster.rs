//! Raster image decoding and embedding as Image XObjects

use crate::types::Result;
use image::ImageReader;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

/// Image pixels ready to embed: 8-bit RGB plus an optional alpha mask
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Decode PNG/JPEG (or any format the `image` crate recognizes)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;

        let width = decoded.width();
        let height = decoded.height();

        if decoded.color().has_alpha() {
            let rgba = decoded.to_rgba8();
            let mut rgb = Vec::with_capacity((width * height * 3) as usize);
            let mut alpha = Vec::with_capacity((width * height) as usize);
            for px in rgba.pixels() {
                rgb.extend_from_slice(&px.0[..3]);
                alpha.push(px.0[3]);
            }
            // Fully opaque masks only cost space
            let alpha = if alpha.iter().all(|a| *a == 255) {
                None
            } else {
                Some(alpha)
            };
            Ok(Self {
                width,
                height,
                rgb,
                alpha,
            })
        } else {
            Ok(Self {
                width,
                height,
                rgb: decoded.to_rgb8().into_raw(),
                alpha: None,
            })
        }
    }

    /// Add this image to `doc` as an Image XObject, returning its id
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let smask = self.alpha.as_ref().map(|alpha| {
            let mut dict = Dictionary::new();
            dict.set("Type", Object::Name(b"XObject".to_vec()));
            dict.set("Subtype", Object::Name(b"Image".to_vec()));
            dict.set("Width", Object::Integer(self.width as i64));
            dict.set("Height", Object::Integer(self.height as i64));
            dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            dict.set("BitsPerComponent", Object::Integer(8));
            doc.add_object(Stream::new(dict, alpha.clone()))
        });

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(self.width as i64));
        dict.set("Height", Object::Integer(self.height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        if let Some(smask_id) = smask {
            dict.set("SMask", Object::Reference(smask_id));
        }
        doc.add_object(Stream::new(dict, self.rgb.clone()))
    }
}

/// Pixel dimensions without decoding the full image
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let dims = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dims)
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png_dimensions() {
        let png = test_png(4, 2);
        let decoded = DecodedImage::decode(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.rgb.len(), 4 * 2 * 3);
        assert!(decoded.alpha.is_none());
        assert_eq!(image_dimensions(&png).unwrap(), (4, 2));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(DecodedImage::decode(b"not an image").is_err());
    }
}
