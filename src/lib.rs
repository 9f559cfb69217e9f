//! # attendance-capture
//!
//! Domain-restricted sign-in followed by a camera capture that is posted to a
//! remote attendance-marking service.
//!
//! ## Session Guard
//!
//! [`session::SessionGuard`] wraps an [`session::IdentityProvider`] and only
//! accepts identities whose email ends with the organizational domain
//! (`@iiitdm.ac.in` by default). Anything else is signed out on the spot and
//! reported as a [`session::SessionNotice::DomainRejected`]. The session stays
//! in a loading state until the provider has reported once, and nothing that
//! depends on it should render before that.
//!
//! ## Capture Workflow
//!
//! [`capture::CaptureWorkflow`] is the state machine that owns the camera:
//!
//! ```text
//! Idle -> AcquiringDevice -> Previewing -> Captured -> Submitting -> Succeeded
//!              |                 |  ^          |            |
//!              v                 |  '- retake -'            v
//!           Failed <-------------'                       Failed
//! ```
//!
//! - **One handle:** at most one [`capture::MediaHandle`] is alive; it is
//!   released before every re-acquisition, right after a capture, on go-back
//!   and on drop.
//! - **One submission:** a confirmed frame is posted once. Retaking is the only
//!   way to produce another frame.
//! - **No escaping errors:** device and submission failures end in
//!   [`capture::CaptureState::Failed`] carrying the user-facing reason.
//!
//! ## Attendance endpoint
//!
//! [`submit::AttendanceClient`] posts the frame as a multipart body with a
//! single `image` file field to `{base_url}/api/mark-attendance` and expects
//! `{"success": bool, "message": string?}` back.

pub mod capture;
pub mod cli;
pub mod config;
pub mod session;
pub mod submit;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
