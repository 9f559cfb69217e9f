use super::Orientation;
use bytes::Bytes;

pub const JPEG_MIME: &str = "image/jpeg";

/// Where a frame came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSource {
    Camera(Orientation),
    /// Fixed stand-in image used when the camera is visibly broken.
    Placeholder,
}

/// Encoded still image taken from one stream read. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedFrame {
    bytes: Bytes,
    content_type: String,
    source: FrameSource,
}

impl CapturedFrame {
    #[must_use]
    pub fn from_camera(bytes: impl Into<Bytes>, orientation: Orientation) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: JPEG_MIME.to_string(),
            source: FrameSource::Camera(orientation),
        }
    }

    #[must_use]
    pub fn placeholder(bytes: impl Into<Bytes>, content_type: &str) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.to_string(),
            source: FrameSource::Placeholder,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub const fn source(&self) -> FrameSource {
        self.source
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self.source, FrameSource::Placeholder)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
