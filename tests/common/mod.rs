#![allow(dead_code)]

use attendance_capture::capture::{
    CaptureDevice, CapturedFrame, Constraints, DeviceError, MediaStream, Navigator, Orientation,
};
use attendance_capture::submit::{Acknowledgement, AttendanceEndpoint, SubmissionError};
use bytes::Bytes;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const FRAME: [u8; 6] = [0xFF, 0xD8, 0x10, 0x20, 0xFF, 0xD9];

#[derive(Debug)]
pub struct MockStream {
    id: String,
}

impl MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Default)]
struct Probe {
    acquisitions: Vec<Orientation>,
    releases: Vec<String>,
    active: HashSet<String>,
    max_active: usize,
    next_id: u64,
}

/// Shared view of what the mock device was asked to do.
#[derive(Clone, Default)]
pub struct DeviceProbe {
    inner: Arc<Mutex<Probe>>,
}

impl DeviceProbe {
    fn lock(&self) -> MutexGuard<'_, Probe> {
        self.inner.lock().unwrap()
    }

    pub fn acquisitions(&self) -> Vec<Orientation> {
        self.lock().acquisitions.clone()
    }

    pub fn releases(&self) -> Vec<String> {
        self.lock().releases.clone()
    }

    pub fn active(&self) -> usize {
        self.lock().active.len()
    }

    pub fn max_active(&self) -> usize {
        self.lock().max_active
    }
}

pub struct MockDevice {
    probe: DeviceProbe,
    inputs: usize,
    acquire_errors: Mutex<VecDeque<DeviceError>>,
    acquire_delay: Duration,
    frame: Result<Bytes, DeviceError>,
}

impl MockDevice {
    pub fn new() -> (Self, DeviceProbe) {
        let probe = DeviceProbe::default();
        let device = Self {
            probe: probe.clone(),
            inputs: 2,
            acquire_errors: Mutex::new(VecDeque::new()),
            acquire_delay: Duration::ZERO,
            frame: Ok(Bytes::from_static(&FRAME)),
        };
        (device, probe)
    }

    pub fn with_inputs(mut self, inputs: usize) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn failing_with(self, error: DeviceError) -> Self {
        self.acquire_errors.lock().unwrap().push_back(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn with_frame(mut self, frame: Result<Bytes, DeviceError>) -> Self {
        self.frame = frame;
        self
    }
}

impl CaptureDevice for MockDevice {
    type Stream = MockStream;

    async fn enumerate(&self) -> Result<usize, DeviceError> {
        Ok(self.inputs)
    }

    async fn acquire(&self, constraints: &Constraints) -> Result<MockStream, DeviceError> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        let mut probe = self.probe.lock();
        probe.acquisitions.push(constraints.orientation);

        if let Some(error) = self.acquire_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        let id = format!("mock-{}", probe.next_id);
        probe.next_id += 1;
        probe.active.insert(id.clone());
        probe.max_active = probe.max_active.max(probe.active.len());

        Ok(MockStream { id })
    }

    fn read_frame(&self, _stream: &MockStream) -> Result<Bytes, DeviceError> {
        self.frame.clone()
    }

    fn release(&self, stream: MockStream) {
        let mut probe = self.probe.lock();
        probe.active.remove(&stream.id);
        probe.releases.push(stream.id);
    }
}

/// Endpoint that records every frame and answers from a script.
#[derive(Clone)]
pub struct MockEndpoint {
    calls: Arc<Mutex<Vec<CapturedFrame>>>,
    outcome: Result<Acknowledgement, SubmissionError>,
}

impl MockEndpoint {
    pub fn accepting() -> Self {
        Self {
            calls: Arc::default(),
            outcome: Ok(Acknowledgement {
                success: true,
                message: Some("Attendance marked".to_string()),
            }),
        }
    }

    pub fn failing(error: SubmissionError) -> Self {
        Self {
            calls: Arc::default(),
            outcome: Err(error),
        }
    }

    pub fn calls(&self) -> Vec<CapturedFrame> {
        self.calls.lock().unwrap().clone()
    }
}

impl AttendanceEndpoint for MockEndpoint {
    async fn mark_attendance(
        &self,
        frame: &CapturedFrame,
    ) -> Result<Acknowledgement, SubmissionError> {
        self.calls.lock().unwrap().push(frame.clone());
        self.outcome.clone()
    }
}

#[derive(Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}
