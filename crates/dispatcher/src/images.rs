//! JPEG + base64 encoding of operator images

use std::io::Cursor;

use base64::Engine;
use contracts::OperatorMessage;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::DispatcherError;

/// Encode an RGB image as base64 JPEG
pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String, DispatcherError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    image
        .write_with_encoder(encoder)
        .map_err(|e| DispatcherError::Encode(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(buf.into_inner()))
}

/// `image_raw` message for the camera frame
pub fn raw_image_message(image: &RgbImage, quality: u8) -> Result<OperatorMessage, DispatcherError> {
    Ok(OperatorMessage::ImageRaw {
        data: encode_jpeg_base64(image, quality)?,
        width: image.width(),
        height: image.height(),
    })
}

/// `image_processed` message for the annotated overlay
pub fn processed_image_message(
    image: &RgbImage,
    quality: u8,
) -> Result<OperatorMessage, DispatcherError> {
    Ok(OperatorMessage::ImageProcessed {
        data: encode_jpeg_base64(image, quality)?,
        width: image.width(),
        height: image.height(),
    })
}
