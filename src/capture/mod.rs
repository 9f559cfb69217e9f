//! Camera acquisition, capture and submission.
//!
//! The camera is an external collaborator behind [`CaptureDevice`]. Whatever
//! stream it hands out is wrapped in a [`MediaHandle`] owned by
//! [`CaptureWorkflow`], which is the only place streams are released.

pub mod error;
pub mod file;
pub mod frame;
pub mod placeholder;
pub mod workflow;

pub use self::error::DeviceError;
pub use self::file::FileCaptureDevice;
pub use self::frame::{CapturedFrame, FrameSource};
pub use self::workflow::{
    Advisory, CaptureState, CaptureWorkflow, Failure, TransitionError, UserAction, WorkflowConfig,
};

use bytes::Bytes;
use std::fmt;
use std::future::Future;
use tracing::info;

/// Which way the camera faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Facing the user (`facingMode: "user"`).
    #[default]
    Front,
    /// Facing away from the user (`facingMode: "environment"`).
    Rear,
}

impl Orientation {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Front => Self::Rear,
            Self::Rear => Self::Front,
        }
    }

    /// Value of the `facingMode` media constraint.
    #[must_use]
    pub const fn facing_mode(self) -> &'static str {
        match self {
            Self::Front => "user",
            Self::Rear => "environment",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Rear => write!(f, "rear"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub ideal: u32,
    pub min: u32,
}

/// Stream request passed to the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constraints {
    pub orientation: Orientation,
    pub width: Resolution,
    pub height: Resolution,
    pub audio: bool,
}

impl Constraints {
    /// Video only, ideally 1280x720 and never below 640x480.
    #[must_use]
    pub const fn for_orientation(orientation: Orientation) -> Self {
        Self {
            orientation,
            width: Resolution {
                ideal: 1280,
                min: 640,
            },
            height: Resolution {
                ideal: 720,
                min: 480,
            },
            audio: false,
        }
    }
}

/// A live stream handed out by a device.
pub trait MediaStream: Send {
    /// Identifier used to match track events to the stream that raised them.
    fn id(&self) -> &str;
}

/// Boundary to the camera.
pub trait CaptureDevice: Send + Sync {
    type Stream: MediaStream;

    /// Number of video inputs present.
    fn enumerate(&self) -> impl Future<Output = Result<usize, DeviceError>> + Send;

    fn acquire(
        &self,
        constraints: &Constraints,
    ) -> impl Future<Output = Result<Self::Stream, DeviceError>> + Send;

    /// Reads one encoded frame from the live stream.
    ///
    /// # Errors
    /// Returns [`DeviceError::FrameUnavailable`] when nothing can be read.
    fn read_frame(&self, stream: &Self::Stream) -> Result<Bytes, DeviceError>;

    /// Stops every track of the stream.
    fn release(&self, stream: Self::Stream);
}

/// Notifications pushed by a device adapter while a stream is live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    TrackEnded { stream_id: String },
}

/// Exclusive ownership of the active camera stream.
#[derive(Debug)]
pub struct MediaHandle<S> {
    orientation: Orientation,
    stream: S,
}

impl<S: MediaStream> MediaHandle<S> {
    pub(crate) fn new(orientation: Orientation, stream: S) -> Self {
        Self {
            orientation,
            stream,
        }
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub const fn stream(&self) -> &S {
        &self.stream
    }

    #[must_use]
    pub fn stream_id(&self) -> &str {
        self.stream.id()
    }

    pub(crate) fn into_stream(self) -> S {
        self.stream
    }
}

/// Route changes requested by the workflow.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that only logs the route, for headless runs.
#[derive(Clone, Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!(route, "navigating");
    }
}
