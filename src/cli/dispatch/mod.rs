use crate::cli::{
    actions::{check, mark, Action},
    commands::{
        self, endpoint, ARG_EMAIL, ARG_IMAGE, ARG_REAR, ARG_REAR_IMAGE, ARG_WITHOUT_CAMERA,
    },
};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// # Errors
/// Returns an error if the subcommand or its required arguments are missing,
/// or if the endpoint configuration is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config = endpoint::config(matches);
    config.validate().context("invalid configuration")?;

    match matches.subcommand() {
        Some((commands::CMD_CHECK, sub)) => Ok(Action::Check(check::Args {
            email: sub
                .get_one::<String>(ARG_EMAIL)
                .cloned()
                .context("missing required argument: <EMAIL>")?,
            config,
        })),
        Some((commands::CMD_MARK, sub)) => Ok(Action::Mark(mark::Args {
            email: sub
                .get_one::<String>(ARG_EMAIL)
                .cloned()
                .context("missing required argument: --email")?,
            image: sub
                .get_one::<PathBuf>(ARG_IMAGE)
                .cloned()
                .context("missing required argument: --image")?,
            rear_image: sub.get_one::<PathBuf>(ARG_REAR_IMAGE).cloned(),
            rear: sub.get_flag(ARG_REAR),
            without_camera: sub.get_flag(ARG_WITHOUT_CAMERA),
            config,
        })),
        _ => Err(anyhow!("missing subcommand")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Action> {
        let matches = commands::new().get_matches_from(args);
        handler(&matches)
    }

    #[test]
    fn check_action() {
        temp_env::with_vars([("ATTENDANCE_DOMAIN", None::<&str>)], || {
            let action = parse(&["attendance-capture", "check", "student@iiitdm.ac.in"]).unwrap();
            match action {
                Action::Check(args) => {
                    assert_eq!(args.email, "student@iiitdm.ac.in");
                    assert_eq!(args.config.required_domain, "iiitdm.ac.in");
                }
                Action::Mark(_) => panic!("expected check action"),
            }
        });
    }

    #[test]
    fn mark_action() {
        let action = parse(&[
            "attendance-capture",
            "mark",
            "--email",
            "student@iiitdm.ac.in",
            "--image",
            "front.jpg",
            "--without-camera",
        ])
        .unwrap();

        match action {
            Action::Mark(args) => {
                assert_eq!(args.image, PathBuf::from("front.jpg"));
                assert_eq!(args.rear_image, None);
                assert!(args.without_camera);
                assert!(!args.rear);
            }
            Action::Check(_) => panic!("expected mark action"),
        }
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        let result = parse(&[
            "attendance-capture",
            "--api-url",
            "ftp://files.example",
            "check",
            "student@iiitdm.ac.in",
        ]);
        assert!(result.is_err());
    }
}
