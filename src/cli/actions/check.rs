use crate::{config::AppConfig, session::DomainPolicy};
use anyhow::{bail, Result};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub email: String,
    pub config: AppConfig,
}

/// Execute the check action.
/// # Errors
/// Returns an error carrying the rejection message when the email is not allowed.
pub async fn execute(args: Args) -> Result<()> {
    let policy = DomainPolicy::new(&args.config.required_domain);
    debug!(email = %args.email, domain = %policy.domain(), "checking email");

    if !policy.permits(Some(&args.email)) {
        bail!(policy.rejection_message());
    }

    println!("{} may sign in", args.email);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(email: &str) -> Args {
        Args {
            email: email.to_string(),
            config: AppConfig::default(),
        }
    }

    #[tokio::test]
    async fn accepts_domain_email() {
        assert!(execute(args("student@iiitdm.ac.in")).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_foreign_email() {
        let err = execute(args("student@gmail.com")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Access Denied: Please sign in with your @iiitdm.ac.in email address."
        );
    }
}
