//! Encoded PNG / JPEG images embedded as PDF image XObjects

use crate::types::*;
use image::{ColorType, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Image XObject added to a document
#[derive(Debug, Clone, Copy)]
pub(crate) struct EmbeddedImage {
    pub id: ObjectId,
    /// Size in pixels
    pub width: u32,
    pub height: u32,
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn flate_stream(dict: Dictionary, samples: Vec<u8>) -> Stream {
    let mut stream = Stream::new(dict, samples);
    // Left uncompressed if flate fails; the samples are still valid
    let _ = stream.compress();
    stream
}

/// Decode `bytes` and add them to `doc` as an image XObject.
///
/// RGB and greyscale JPEGs are embedded as-is. Anything else is stored as
/// 8-bit samples, with a soft mask when the image has transparency.
pub(crate) fn embed_image(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(PlannerError::TransformFailure(
            "Image has no pixels".to_string(),
        ));
    }

    if format == ImageFormat::Jpeg {
        let color_space = match decoded.color() {
            ColorType::L8 => Some("DeviceGray"),
            ColorType::Rgb8 => Some("DeviceRGB"),
            _ => None,
        };
        if let Some(color_space) = color_space {
            let mut dict = image_dictionary(width, height, color_space);
            dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
            let id = doc.add_object(Stream::new(dict, bytes.to_vec()));
            log::trace!("Embedded {}x{} JPEG as-is", width, height);
            return Ok(EmbeddedImage { id, width, height });
        }
    }

    let mut dict = image_dictionary(width, height, "DeviceRGB");
    let samples = if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        if alpha.iter().any(|&a| a != u8::MAX) {
            let mask = flate_stream(image_dictionary(width, height, "DeviceGray"), alpha);
            let mask_id = doc.add_object(mask);
            dict.set("SMask", Object::Reference(mask_id));
        }
        rgb
    } else {
        decoded.to_rgb8().into_raw()
    };

    let id = doc.add_object(flate_stream(dict, samples));
    log::trace!("Embedded {}x{} {:?} image", width, height, format);
    Ok(EmbeddedImage { id, width, height })
}
