//! reqwest client for `POST {base_url}/api/mark-attendance`.
//!
//! The frame goes out as a single `image` file field. The multipart boundary
//! and content type are left to reqwest; the only header the client adds is
//! its `User-Agent`. No timeout is applied to the
//! submission; the caller waits for the service to answer.

use super::{Acknowledgement, AttendanceEndpoint, SubmissionError};
use crate::{
    capture::CapturedFrame,
    config::AppConfig,
    APP_USER_AGENT,
};
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use tracing::{debug, error, instrument, warn};

/// Form field the service reads the photo from.
pub const IMAGE_FIELD: &str = "image";
pub const IMAGE_FILE_NAME: &str = "photo.jpg";
/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;
const DEFAULT_REJECTION: &str = "Failed to mark attendance";

#[derive(Clone, Debug)]
pub struct AttendanceClient {
    client: Client,
    endpoint_url: String,
}

impl AttendanceClient {
    /// Client for the endpoint under the configured API base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| SubmissionError::Request(err.to_string()))?;

        Ok(Self {
            client,
            endpoint_url: config.mark_attendance_url(),
        })
    }

    /// Client for `base_url`, keeping the other settings at their defaults.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, SubmissionError> {
        Self::new(&AppConfig {
            api_base_url: base_url.to_string(),
            ..AppConfig::default()
        })
    }

    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn form(frame: &CapturedFrame) -> Result<Form, SubmissionError> {
        let part = Part::bytes(frame.bytes().to_vec())
            .file_name(IMAGE_FILE_NAME)
            .mime_str(frame.content_type())
            .map_err(|err| SubmissionError::Request(err.to_string()))?;

        Ok(Form::new().part(IMAGE_FIELD, part))
    }
}

impl AttendanceEndpoint for AttendanceClient {
    #[instrument(skip_all)]
    async fn mark_attendance(
        &self,
        frame: &CapturedFrame,
    ) -> Result<Acknowledgement, SubmissionError> {
        if frame.is_placeholder() {
            warn!("submitting placeholder image instead of a camera capture");
        }

        let form = Self::form(frame)?;

        debug!(bytes = frame.len(), "Sending request to: {}", self.endpoint_url);

        let response = self
            .client
            .post(&self.endpoint_url)
            .multipart(form)
            .send()
            .await
            .map_err(map_request_error)?;

        debug!("Response status: {}", response.status());

        handle_response(response).await
    }
}

/// Every transport failure means the service could not be reached.
fn map_request_error(err: reqwest::Error) -> SubmissionError {
    if err.is_builder() {
        SubmissionError::Request(err.to_string())
    } else {
        SubmissionError::Unreachable {
            detail: err.to_string(),
        }
    }
}

async fn handle_response(response: Response) -> Result<Acknowledgement, SubmissionError> {
    let status = response.status();

    if !status.is_success() {
        let body = sanitize_body(&response.text().await.unwrap_or_default());
        error!(%status, %body, "Backend error response");
        return Err(status_error(status, body));
    }

    let text = response.text().await.map_err(map_request_error)?;
    let acknowledgement: Acknowledgement = serde_json::from_str(&text)
        .map_err(|err| SubmissionError::InvalidResponse(err.to_string()))?;

    debug!(?acknowledgement, "Backend response data");

    if !acknowledgement.success {
        let message = acknowledgement
            .message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_REJECTION)
            .to_string();
        return Err(SubmissionError::Rejected { message });
    }

    Ok(acknowledgement)
}

fn status_error(status: StatusCode, body: String) -> SubmissionError {
    match status.as_u16() {
        404 => SubmissionError::NotFound,
        code @ 500..=599 => SubmissionError::Server { status: code, body },
        code => SubmissionError::Http { status: code, body },
    }
}

/// Trims and truncates an error body for display.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{placeholder::placeholder_frame, Orientation};
    use mockito::{Matcher, Server};

    fn frame() -> CapturedFrame {
        CapturedFrame::from_camera(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9], Orientation::Front)
    }

    #[tokio::test]
    async fn posts_single_image_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/mark-attendance")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data; boundary=.*".to_string()),
            )
            .match_body(Matcher::Regex(
                r#"name="image"; filename="photo\.jpg""#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"success": true, "message": "Attendance marked"}"#)
            .create_async()
            .await;

        let client = AttendanceClient::with_base_url(&server.url()).unwrap();
        let result = client.mark_attendance(&frame()).await;

        mock.assert_async().await;
        assert_eq!(
            result,
            Ok(Acknowledgement {
                success: true,
                message: Some("Attendance marked".to_string())
            })
        );
    }

    #[test]
    fn endpoint_url_comes_from_config() {
        let config = AppConfig {
            api_base_url: "https://attendance.example/".to_string(),
            ..AppConfig::default()
        };
        let client = AttendanceClient::new(&config).unwrap();
        assert_eq!(client.endpoint_url(), config.mark_attendance_url());
        assert_eq!(
            client.endpoint_url(),
            "https://attendance.example/api/mark-attendance"
        );
    }

    #[tokio::test]
    async fn only_user_agent_is_added() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/mark-attendance")
            .match_header("user-agent", APP_USER_AGENT)
            .match_header("authorization", Matcher::Missing)
            .match_header("x-requested-with", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let client = AttendanceClient::with_base_url(&server.url()).unwrap();
        let result = client.mark_attendance(&frame()).await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn negative_acknowledgement_is_rejected() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/mark-attendance")
            .with_status(200)
            .with_body(r#"{"success": false, "message": "Face not recognized"}"#)
            .create_async()
            .await;

        let client = AttendanceClient::with_base_url(&server.url()).unwrap();
        let result = client.mark_attendance(&frame()).await;

        mock.assert_async().await;
        assert_eq!(
            result,
            Err(SubmissionError::Rejected {
                message: "Face not recognized".to_string()
            })
        );
    }

    #[tokio::test]
    async fn negative_acknowledgement_without_message_uses_default() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/mark-attendance")
            .with_status(200)
            .with_body(r#"{"success": false}"#)
            .create_async()
            .await;

        let client = AttendanceClient::with_base_url(&server.url()).unwrap();
        let result = client.mark_attendance(&frame()).await;

        assert_eq!(
            result.map_err(|err| err.user_message()),
            Err("Failed to mark attendance".to_string())
        );
    }

    #[tokio::test]
    async fn status_codes_map_to_categories() {
        let mut server = Server::new_async().await;
        let client = AttendanceClient::with_base_url(&server.url()).unwrap();

        let cases = [
            (
                500,
                "internal",
                SubmissionError::Server {
                    status: 500,
                    body: "internal".to_string(),
                },
            ),
            (
                503,
                "  ",
                SubmissionError::Server {
                    status: 503,
                    body: "Request failed.".to_string(),
                },
            ),
            (404, "nope", SubmissionError::NotFound),
            (
                413,
                "too large",
                SubmissionError::Http {
                    status: 413,
                    body: "too large".to_string(),
                },
            ),
        ];

        for (status, body, expected) in cases {
            let mock = server
                .mock("POST", "/api/mark-attendance")
                .with_status(status)
                .with_body(body)
                .create_async()
                .await;

            let result = client.mark_attendance(&frame()).await;

            mock.assert_async().await;
            mock.remove_async().await;
            assert_eq!(result, Err(expected), "status {status}");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/mark-attendance")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let client = AttendanceClient::with_base_url(&server.url()).unwrap();
        let result = client.mark_attendance(&placeholder_frame().unwrap()).await;

        assert!(matches!(result, Err(SubmissionError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn unreachable_server() {
        let client = AttendanceClient::with_base_url("http://127.0.0.1:1").unwrap();
        let result = client.mark_attendance(&frame()).await;

        assert!(matches!(result, Err(SubmissionError::Unreachable { .. })));
    }

    #[test]
    fn sanitize_body_truncates() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_body(&long).len(), MAX_ERROR_CHARS);
        assert_eq!(sanitize_body(" \n"), "Request failed.");
    }
}
