//! Attendance endpoint boundary.
//!
//! A confirmed frame is posted once as a multipart body and the service answers
//! with `{"success": bool, "message": string?}`. Every way that can go wrong
//! becomes a [`SubmissionError`] whose display text is shown to the user.

pub mod client;

pub use self::client::AttendanceClient;

use crate::capture::CapturedFrame;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Body returned by the attendance service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Acknowledgement {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error(
        "Unable to connect to the server. Please check your internet connection and try again."
    )]
    Unreachable { detail: String },
    #[error("Backend server is not available. Please contact support.")]
    NotFound,
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("{message}")]
    Rejected { message: String },
    #[error("Invalid response from attendance server: {0}")]
    InvalidResponse(String),
    #[error("Failed to send image to server. Please try again.")]
    Request(String),
}

impl SubmissionError {
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Remote service that marks attendance from a photo.
pub trait AttendanceEndpoint: Send + Sync {
    /// Posts the frame. `Ok` only for a positive acknowledgement.
    fn mark_attendance(
        &self,
        frame: &CapturedFrame,
    ) -> impl Future<Output = Result<Acknowledgement, SubmissionError>> + Send;
}
