//! Camera stand-in backed by JPEG files, one per orientation. Used by the CLI
//! to run the workflow headless.

use super::{CaptureDevice, Constraints, DeviceError, MediaStream, Orientation};
use bytes::Bytes;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

#[derive(Debug)]
pub struct FileStream {
    id: String,
    path: PathBuf,
    bytes: Bytes,
}

impl FileStream {
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl MediaStream for FileStream {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default)]
pub struct FileCaptureDevice {
    front: Option<PathBuf>,
    rear: Option<PathBuf>,
    streams: AtomicU64,
}

impl FileCaptureDevice {
    #[must_use]
    pub fn new(front: Option<PathBuf>, rear: Option<PathBuf>) -> Self {
        Self {
            front,
            rear,
            streams: AtomicU64::new(0),
        }
    }

    fn source(&self, orientation: Orientation) -> Option<&PathBuf> {
        match orientation {
            Orientation::Front => self.front.as_ref(),
            Orientation::Rear => self.rear.as_ref(),
        }
    }
}

impl CaptureDevice for FileCaptureDevice {
    type Stream = FileStream;

    async fn enumerate(&self) -> Result<usize, DeviceError> {
        Ok(usize::from(self.front.is_some()) + usize::from(self.rear.is_some()))
    }

    #[instrument(skip(self))]
    async fn acquire(&self, constraints: &Constraints) -> Result<FileStream, DeviceError> {
        let path = self
            .source(constraints.orientation)
            .ok_or(DeviceError::Overconstrained)?
            .clone();

        let bytes = tokio::fs::read(&path).await.map_err(map_io_error)?;
        if !bytes.starts_with(&JPEG_MAGIC) {
            return Err(DeviceError::NotSupported);
        }

        let id = format!("file-{}", self.streams.fetch_add(1, Ordering::Relaxed));
        debug!(id = %id, path = %path.display(), bytes = bytes.len(), "file stream opened");

        Ok(FileStream {
            id,
            path,
            bytes: Bytes::from(bytes),
        })
    }

    fn read_frame(&self, stream: &FileStream) -> Result<Bytes, DeviceError> {
        if stream.bytes.is_empty() {
            return Err(DeviceError::FrameUnavailable);
        }
        Ok(stream.bytes.clone())
    }

    fn release(&self, stream: FileStream) {
        debug!(id = %stream.id, "file stream closed");
    }
}

fn map_io_error(err: io::Error) -> DeviceError {
    match err.kind() {
        io::ErrorKind::NotFound => DeviceError::NotFound,
        io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied,
        _ => DeviceError::Unknown(err.to_string()),
    }
}
