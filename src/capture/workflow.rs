//! Capture workflow state machine.
//!
//! All transitions go through `&mut self`, so at most one acquisition and at
//! most one submission can be pending at a time. Acquisition always releases
//! the current [`MediaHandle`] before asking the device for a new stream, and
//! a failed state never holds one.
//!
//! Device failures and submission failures are folded into
//! [`CaptureState::Failed`]; the only error returned to callers is a
//! [`TransitionError`] for an action the current state does not accept.

use super::{
    placeholder, CaptureDevice, CapturedFrame, Constraints, DeviceError, DeviceEvent, MediaHandle,
    Navigator, Orientation,
};
use crate::config::{AppConfig, ACQUISITION_ADVISORY_TIMEOUT, HOME_ROUTE, SUCCESS_DISPLAY_DELAY};
use crate::submit::{AttendanceEndpoint, SubmissionError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    Device(DeviceError),
    Submission(SubmissionError),
    /// The live stream stopped on its own while previewing.
    StreamEnded,
}

impl Failure {
    /// Human-readable reason shown on the failure view.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Device(err) => err.user_message(),
            Self::Submission(err) => err.user_message(),
            Self::StreamEnded => "Camera stream ended unexpectedly. Please try again.".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    AcquiringDevice { orientation: Orientation },
    Previewing { orientation: Orientation },
    Captured(CapturedFrame),
    Submitting,
    Succeeded,
    Failed(Failure),
}

impl CaptureState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringDevice { .. } => "acquiring device",
            Self::Previewing { .. } => "previewing",
            Self::Captured(_) => "captured",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Failed(failure) => Some(failure.reason()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn frame(&self) -> Option<&CapturedFrame> {
        match self {
            Self::Captured(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Soft warnings that never change the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    /// Acquisition is taking longer than the advisory timeout.
    SlowFeed,
}

impl Advisory {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SlowFeed => {
                "Camera feed appears to be black. You can still try to capture an image or proceed without camera."
            }
        }
    }
}

/// Inputs the user can give the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    Start,
    Retry,
    Capture,
    UsePlaceholder,
    SwitchCamera,
    Retake,
    Confirm,
    GoBack,
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Retry => "retry",
            Self::Capture => "capture",
            Self::UsePlaceholder => "use placeholder",
            Self::SwitchCamera => "switch camera",
            Self::Retake => "retake",
            Self::Confirm => "confirm",
            Self::GoBack => "go back",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{action} is not allowed while {state}")]
pub struct TransitionError {
    pub action: UserAction,
    pub state: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Whether the page runs in a secure context; capture is refused otherwise.
    pub secure_context: bool,
    pub advisory_timeout: Duration,
    pub success_delay: Duration,
    pub exit_route: String,
    pub orientation: Orientation,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

impl WorkflowConfig {
    #[must_use]
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            secure_context: config.is_secure_context(),
            advisory_timeout: ACQUISITION_ADVISORY_TIMEOUT,
            success_delay: SUCCESS_DISPLAY_DELAY,
            exit_route: HOME_ROUTE.to_string(),
            orientation: Orientation::Front,
        }
    }
}

pub struct CaptureWorkflow<D: CaptureDevice, E: AttendanceEndpoint> {
    device: D,
    endpoint: E,
    navigator: Arc<dyn Navigator>,
    config: WorkflowConfig,
    state: CaptureState,
    orientation: Orientation,
    handle: Option<MediaHandle<D::Stream>>,
    observers: watch::Sender<CaptureState>,
    advisories: watch::Sender<Option<Advisory>>,
    events_tx: mpsc::UnboundedSender<DeviceEvent>,
    events: mpsc::UnboundedReceiver<DeviceEvent>,
    exit: Option<JoinHandle<()>>,
}

impl<D: CaptureDevice, E: AttendanceEndpoint> CaptureWorkflow<D, E> {
    #[must_use]
    pub fn new(
        device: D,
        endpoint: E,
        navigator: Arc<dyn Navigator>,
        config: WorkflowConfig,
    ) -> Self {
        let (observers, _) = watch::channel(CaptureState::Idle);
        let (advisories, _) = watch::channel(None);
        let (events_tx, events) = mpsc::unbounded_channel();
        let orientation = config.orientation;

        Self {
            device,
            endpoint,
            navigator,
            config,
            state: CaptureState::Idle,
            orientation,
            handle: None,
            observers,
            advisories,
            events_tx,
            events,
            exit: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &CaptureState {
        &self.state
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn advisory(&self) -> Option<Advisory> {
        *self.advisories.borrow()
    }

    #[must_use]
    pub const fn active_handle(&self) -> Option<&MediaHandle<D::Stream>> {
        self.handle.as_ref()
    }

    /// Receiver that sees every state the workflow enters.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CaptureState> {
        self.observers.subscribe()
    }

    /// Receiver for advisories. A slow-feed warning is published as soon as
    /// the advisory timeout passes, while the acquisition is still pending.
    #[must_use]
    pub fn subscribe_advisory(&self) -> watch::Receiver<Option<Advisory>> {
        self.advisories.subscribe()
    }

    /// Sender a device adapter uses to report track events.
    #[must_use]
    pub fn device_events(&self) -> mpsc::UnboundedSender<DeviceEvent> {
        self.events_tx.clone()
    }

    /// Transition function: applies pending device events, then the action.
    ///
    /// # Errors
    /// Returns [`TransitionError`] when the current state does not accept `action`.
    pub async fn dispatch(&mut self, action: UserAction) -> Result<(), TransitionError> {
        self.process_device_events();

        match action {
            UserAction::Start => self.start().await,
            UserAction::Retry => self.retry().await,
            UserAction::Capture => self.capture(),
            UserAction::UsePlaceholder => self.use_placeholder(),
            UserAction::SwitchCamera => self.switch_orientation().await,
            UserAction::Retake => self.retake().await,
            UserAction::Confirm => self.confirm().await,
            UserAction::GoBack => {
                self.go_back();
                Ok(())
            }
        }
    }

    /// `Idle -> AcquiringDevice`.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless idle.
    pub async fn start(&mut self) -> Result<(), TransitionError> {
        self.ensure(UserAction::Start, matches!(self.state, CaptureState::Idle))?;
        self.acquire().await;
        Ok(())
    }

    /// `Failed -> AcquiringDevice`.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless failed.
    pub async fn retry(&mut self) -> Result<(), TransitionError> {
        self.ensure(
            UserAction::Retry,
            matches!(self.state, CaptureState::Failed(_)),
        )?;
        self.acquire().await;
        Ok(())
    }

    /// `Previewing -> Captured`: reads one frame, then releases the stream.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless previewing.
    pub fn capture(&mut self) -> Result<(), TransitionError> {
        self.ensure(UserAction::Capture, self.is_previewing())?;

        let Some(handle) = self.handle.take() else {
            self.fail(Failure::Device(DeviceError::FrameUnavailable));
            return Ok(());
        };

        let orientation = handle.orientation();
        let read = self.device.read_frame(handle.stream());
        self.release(handle);

        match read {
            Ok(bytes) if !bytes.is_empty() => {
                info!(bytes = bytes.len(), %orientation, "Image captured");
                self.set_state(CaptureState::Captured(CapturedFrame::from_camera(
                    bytes,
                    orientation,
                )));
            }
            Ok(_) => {
                error!("camera returned an empty frame");
                self.fail(Failure::Device(DeviceError::FrameUnavailable));
            }
            Err(err) => {
                error!(%err, "frame read failed");
                self.fail(Failure::Device(err));
            }
        }

        Ok(())
    }

    /// `Previewing -> Captured` with the placeholder image, whatever the
    /// camera is doing.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless previewing.
    pub fn use_placeholder(&mut self) -> Result<(), TransitionError> {
        self.ensure(UserAction::UsePlaceholder, self.is_previewing())?;

        warn!("Proceeding without camera");
        self.release_active();

        match placeholder::placeholder_frame() {
            Ok(frame) => self.set_state(CaptureState::Captured(frame)),
            Err(err) => {
                error!(%err, "placeholder image is corrupt");
                self.fail(Failure::Device(DeviceError::FrameUnavailable));
            }
        }

        Ok(())
    }

    /// `Previewing -> AcquiringDevice` with the opposite orientation.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless previewing.
    pub async fn switch_orientation(&mut self) -> Result<(), TransitionError> {
        self.ensure(UserAction::SwitchCamera, self.is_previewing())?;
        self.orientation = self.orientation.toggled();
        self.acquire().await;
        Ok(())
    }

    /// `Captured -> AcquiringDevice`: drops the frame and restores the preview.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless a frame is captured.
    pub async fn retake(&mut self) -> Result<(), TransitionError> {
        self.ensure(
            UserAction::Retake,
            matches!(self.state, CaptureState::Captured(_)),
        )?;
        self.acquire().await;
        Ok(())
    }

    /// `Captured -> Submitting -> Succeeded | Failed`.
    ///
    /// The frame leaves the state when submission starts, so it can only be
    /// sent once; a failed submission needs a new capture.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless a frame is captured.
    pub async fn confirm(&mut self) -> Result<(), TransitionError> {
        let CaptureState::Captured(frame) = &self.state else {
            return Err(self.reject(UserAction::Confirm));
        };
        let frame = frame.clone();
        self.set_state(CaptureState::Submitting);

        let outcome = self.endpoint.mark_attendance(&frame).await;
        match outcome {
            Ok(acknowledgement) => {
                info!(message = ?acknowledgement.message, "Attendance marked");
                self.set_state(CaptureState::Succeeded);
                self.schedule_exit();
            }
            Err(err) => {
                error!(%err, "Error sending image to backend");
                self.fail(Failure::Submission(err));
            }
        }

        Ok(())
    }

    /// Abandons the workflow: releases the camera and navigates away.
    pub fn go_back(&mut self) {
        self.release_active();
        if let Some(exit) = self.exit.take() {
            exit.abort();
        }
        self.clear_advisory();
        self.set_state(CaptureState::Idle);
        self.navigator.navigate(&self.config.exit_route);
    }

    /// Applies every device event queued so far.
    pub fn process_device_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_device_event(event);
        }
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::TrackEnded { stream_id } => {
                let is_active = self
                    .handle
                    .as_ref()
                    .is_some_and(|handle| handle.stream_id() == stream_id);
                if !is_active {
                    debug!(%stream_id, "ignoring track event for a released stream");
                    return;
                }

                warn!(%stream_id, "camera track ended while previewing");
                self.fail(Failure::StreamEnded);
            }
        }
    }

    /// Waits for the delayed navigation scheduled after a success.
    pub async fn wait_for_exit(&mut self) {
        if let Some(exit) = self.exit.take() {
            if let Err(err) = exit.await {
                debug!(%err, "exit task did not complete");
            }
        }
    }

    async fn acquire(&mut self) {
        self.release_active();
        self.clear_advisory();

        let orientation = self.orientation;
        self.set_state(CaptureState::AcquiringDevice { orientation });

        if !self.config.secure_context {
            self.fail(Failure::Device(DeviceError::InsecureContext));
            return;
        }

        let enumerated = self.device.enumerate().await;
        match enumerated {
            Ok(0) => {
                self.fail(Failure::Device(DeviceError::NoDevices));
                return;
            }
            Err(err) => {
                warn!(%err, "Error enumerating devices");
                self.fail(Failure::Device(DeviceError::NoDevices));
                return;
            }
            Ok(count) => debug!(count, "video inputs available"),
        }

        let constraints = Constraints::for_orientation(orientation);
        debug!(
            facing_mode = orientation.facing_mode(),
            ?constraints,
            "Requesting camera access"
        );

        let result = {
            let acquisition = self.device.acquire(&constraints);
            tokio::pin!(acquisition);

            match timeout(self.config.advisory_timeout, &mut acquisition).await {
                Ok(result) => result,
                Err(_) => {
                    // advisory only, keep waiting for the device
                    warn!("Camera timeout - video feed may be black");
                    self.advisories.send_replace(Some(Advisory::SlowFeed));
                    acquisition.await
                }
            }
        };

        match result {
            Ok(stream) => {
                let handle = MediaHandle::new(orientation, stream);
                info!(stream_id = handle.stream_id(), %orientation, "Camera stream obtained");
                self.handle = Some(handle);
                self.set_state(CaptureState::Previewing { orientation });
            }
            Err(err) => {
                error!(%err, "Error accessing camera");
                self.fail(Failure::Device(err));
            }
        }
    }

    fn clear_advisory(&self) {
        self.advisories.send_if_modified(|advisory| advisory.take().is_some());
    }

    fn is_previewing(&self) -> bool {
        matches!(self.state, CaptureState::Previewing { .. })
    }

    fn ensure(&self, action: UserAction, allowed: bool) -> Result<(), TransitionError> {
        if allowed {
            Ok(())
        } else {
            Err(self.reject(action))
        }
    }

    fn reject(&self, action: UserAction) -> TransitionError {
        debug!(%action, state = self.state.name(), "action rejected");
        TransitionError {
            action,
            state: self.state.name(),
        }
    }

    fn release_active(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.release(handle);
        }
    }

    fn release(&self, handle: MediaHandle<D::Stream>) {
        debug!(stream_id = handle.stream_id(), "releasing camera stream");
        self.device.release(handle.into_stream());
    }

    fn fail(&mut self, failure: Failure) {
        self.release_active();
        warn!(reason = %failure.reason(), "capture failed");
        self.set_state(CaptureState::Failed(failure));
    }

    fn set_state(&mut self, state: CaptureState) {
        debug!(from = self.state.name(), to = state.name(), "transition");
        self.state = state;
        self.observers.send_replace(self.state.clone());
    }

    fn schedule_exit(&mut self) {
        let navigator = Arc::clone(&self.navigator);
        let delay = self.config.success_delay;
        let route = self.config.exit_route.clone();

        debug!(?delay, %route, "scheduling exit");
        self.exit = Some(tokio::spawn(async move {
            sleep(delay).await;
            navigator.navigate(&route);
        }));
    }
}

impl<D: CaptureDevice, E: AttendanceEndpoint> Drop for CaptureWorkflow<D, E> {
    fn drop(&mut self) {
        self.release_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_use_user_messages() {
        assert!(Failure::Device(DeviceError::PermissionDenied)
            .reason()
            .starts_with("Camera permission denied"));
        assert_eq!(
            Failure::Submission(SubmissionError::NotFound).reason(),
            "Backend server is not available. Please contact support."
        );
        assert_eq!(
            CaptureState::Failed(Failure::StreamEnded).reason(),
            Some("Camera stream ended unexpectedly. Please try again.".to_string())
        );
        assert_eq!(CaptureState::Idle.reason(), None);
    }

    #[test]
    fn transition_error_reads_naturally() {
        let err = TransitionError {
            action: UserAction::Confirm,
            state: CaptureState::Previewing {
                orientation: Orientation::Front,
            }
            .name(),
        };
        assert_eq!(err.to_string(), "confirm is not allowed while previewing");
    }

    #[test]
    fn default_config_uses_fixed_timings() {
        let config = WorkflowConfig::default();
        assert!(config.secure_context);
        assert_eq!(config.advisory_timeout, Duration::from_secs(5));
        assert_eq!(config.success_delay, Duration::from_millis(2000));
        assert_eq!(config.exit_route, "/home");
    }
}
