use crate::{
    capture::{
        Advisory, CaptureState, CaptureWorkflow, FileCaptureDevice, LogNavigator, UserAction,
        WorkflowConfig,
    },
    config::AppConfig,
    session::{DomainPolicy, Gate, Identity, LocalIdentityProvider, SessionGuard, SessionNotice},
    submit::AttendanceClient,
};
use anyhow::{anyhow, bail, Context, Result};
use std::{path::PathBuf, sync::Arc};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub email: String,
    pub image: PathBuf,
    pub rear_image: Option<PathBuf>,
    pub rear: bool,
    pub without_camera: bool,
    pub config: AppConfig,
}

/// Execute the mark action.
/// # Errors
/// Returns an error if sign-in is refused, the camera cannot be used, or the
/// attendance service does not acknowledge the photo.
pub async fn execute(args: Args) -> Result<()> {
    let identity = sign_in(&args).await?;
    info!(email = ?identity.email, "signed in");

    let device = FileCaptureDevice::new(Some(args.image.clone()), args.rear_image.clone());
    let client = AttendanceClient::new(&args.config)?;
    debug!(endpoint = %client.endpoint_url(), "attendance endpoint");

    let mut workflow = CaptureWorkflow::new(
        device,
        client,
        Arc::new(LogNavigator),
        WorkflowConfig::from_app(&args.config),
    );

    let advisories = report_advisories(workflow.subscribe_advisory());

    for action in steps(&args) {
        workflow.dispatch(action).await?;

        if let CaptureState::Failed(failure) = workflow.state() {
            advisories.abort();
            bail!(failure.reason());
        }
    }

    workflow.wait_for_exit().await;
    advisories.abort();
    println!("Attendance marked successfully!");

    Ok(())
}

/// Prints each advisory as soon as the workflow raises it.
fn report_advisories(mut advisories: watch::Receiver<Option<Advisory>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while advisories.changed().await.is_ok() {
            let advisory = *advisories.borrow_and_update();
            if let Some(advisory) = advisory {
                warn!("{}", advisory.message());
                eprintln!("{}", advisory.message());
            }
        }
    })
}

fn steps(args: &Args) -> Vec<UserAction> {
    let mut steps = vec![UserAction::Start];
    if args.rear {
        steps.push(UserAction::SwitchCamera);
    }
    steps.push(if args.without_camera {
        UserAction::UsePlaceholder
    } else {
        UserAction::Capture
    });
    steps.push(UserAction::Confirm);
    steps
}

/// Runs the redirect sign-in against the local provider and returns the
/// identity the guard admitted.
async fn sign_in(args: &Args) -> Result<Identity> {
    let staged = Identity::new(format!("local:{}", args.email), args.email.as_str());
    let provider = Arc::new(LocalIdentityProvider::new(Some(staged)));
    let (mut guard, mut notices) = SessionGuard::new(
        provider,
        DomainPolicy::new(&args.config.required_domain),
    );

    let mut changes = guard.initialize().await;
    if guard.session().identity().is_none() {
        guard.sign_in().await.context("sign-in failed")?;
        guard.resolve_redirect().await;
        guard.drain(&mut changes).await;
    }

    let notice = first_notice(&mut notices);
    match guard.session().gate() {
        Gate::Authorized(identity) => Ok(identity.clone()),
        Gate::Loading | Gate::SignedOut => Err(anyhow!(notice
            .map_or_else(|| "Not signed in".to_string(), |n| n.message().to_string()))),
    }
}

fn first_notice(notices: &mut mpsc::UnboundedReceiver<SessionNotice>) -> Option<SessionNotice> {
    let first = notices.try_recv().ok();
    while let Ok(notice) = notices.try_recv() {
        debug!(message = notice.message(), "additional session notice");
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(email: &str, image: PathBuf) -> Args {
        Args {
            email: email.to_string(),
            image,
            rear_image: None,
            rear: false,
            without_camera: false,
            config: AppConfig::default(),
        }
    }

    #[test]
    fn steps_follow_flags() {
        let mut args = args("student@iiitdm.ac.in", PathBuf::from("front.jpg"));
        assert_eq!(
            steps(&args),
            vec![UserAction::Start, UserAction::Capture, UserAction::Confirm]
        );

        args.rear = true;
        args.without_camera = true;
        assert_eq!(
            steps(&args),
            vec![
                UserAction::Start,
                UserAction::SwitchCamera,
                UserAction::UsePlaceholder,
                UserAction::Confirm
            ]
        );
    }

    #[tokio::test]
    async fn foreign_domain_is_refused_before_capture() {
        let err = execute(args("student@gmail.com", PathBuf::from("missing.jpg")))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Access Denied: Please sign in with your @iiitdm.ac.in email address."
        );
    }

    #[tokio::test]
    async fn marks_attendance_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("front.jpg");
        fs::write(&image, [0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]).unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/mark-attendance")
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let mut args = args("student@iiitdm.ac.in", image);
        args.config.api_base_url = server.url();

        execute(args).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("front.jpg");
        fs::write(&image, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/mark-attendance")
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let mut args = args("student@iiitdm.ac.in", image);
        args.config.api_base_url = server.url();

        let err = execute(args).await.unwrap_err();
        assert_eq!(err.to_string(), "Server error (500): internal");
    }
}
