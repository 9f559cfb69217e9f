use thiserror::Error;

/// Why the camera could not be used. The display text is what the user sees.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Camera access requires HTTPS. Please use a secure connection.")]
    InsecureContext,
    #[error("No camera devices found on your system.")]
    NoDevices,
    #[error(
        "Camera permission denied. Please allow camera access in your browser settings and try again."
    )]
    PermissionDenied,
    #[error("No camera found on your device. Please connect a camera and try again.")]
    NotFound,
    #[error("Camera not supported on this device or browser.")]
    NotSupported,
    #[error(
        "Camera is already in use by another application. Please close other camera apps and try again."
    )]
    InUse,
    #[error("Camera constraints not met. Please try switching cameras.")]
    Overconstrained,
    #[error(
        "Camera access not supported in this browser. Please use a modern browser with camera support."
    )]
    ApiUnsupported,
    #[error("Could not read an image from the camera. Please try again.")]
    FrameUnavailable,
    #[error("Unable to access camera. Please check your permissions and try again.")]
    Unknown(String),
}

impl DeviceError {
    /// Maps a browser media error name (`DOMException.name`) to a cause.
    #[must_use]
    pub fn from_dom_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => Self::NotFound,
            "NotSupportedError" => Self::NotSupported,
            "NotReadableError" | "TrackStartError" => Self::InUse,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => Self::Overconstrained,
            "TypeError" => Self::ApiUnsupported,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
