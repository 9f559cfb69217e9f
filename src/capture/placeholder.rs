//! Fixed stand-in image for the "camera not working" escape hatch, stored as a
//! `data:` URL and decoded on use.

use super::frame::CapturedFrame;
use base64ct::{Base64, Encoding};
use thiserror::Error;

/// 1x1 baseline JPEG.
pub const PLACEHOLDER_DATA_URL: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAAYEBQYFBAYGBQYHBwYIChAKCgkJChQODwwQFxQYGBcUFhYaHSUfGhsjHBYWICwgIyYnKSopGR8tMC0oMCUoKSj/2wBDAQcHBwoIChMKChMoGhYaKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCgoKCj/wAARCAABAAEDASIAAhEBAxEB/8QAFQABAQAAAAAAAAAAAAAAAAAAAAv/xAAUEAEAAAAAAAAAAAAAAAAAAAAA/8QAFQEBAQAAAAAAAAAAAAAAAAAAAAX/xAAUEQEAAAAAAAAAAAAAAAAAAAAA/9oADAMBAAIRAxEAPwCdABmX/9k=";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,
    #[error("data URL has no payload separator")]
    MissingPayload,
    #[error("only base64 data URLs are supported")]
    NotBase64,
    #[error("invalid base64 payload")]
    Base64,
}

/// Splits `data:<mime>;base64,<payload>` into its media type and decoded bytes.
/// A missing media type defaults to `image/jpeg`.
///
/// # Errors
/// Returns an error for anything that is not a base64 `data:` URL.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), DataUrlError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUrlError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(DataUrlError::NotBase64)?;

    let media_type = if media_type.is_empty() {
        super::frame::JPEG_MIME
    } else {
        media_type
    };

    let bytes = Base64::decode_vec(payload).map_err(|_| DataUrlError::Base64)?;

    Ok((media_type.to_string(), bytes))
}

/// The placeholder as a frame ready for submission.
///
/// # Errors
/// Only fails if the embedded data URL is corrupt.
pub fn placeholder_frame() -> Result<CapturedFrame, DataUrlError> {
    let (media_type, bytes) = decode_data_url(PLACEHOLDER_DATA_URL)?;
    Ok(CapturedFrame::placeholder(bytes, &media_type))
}
