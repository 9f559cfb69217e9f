use crate::config::{
    apply_overrides, normalize_value, AppConfig, Overrides, DEFAULT_API_BASE_URL, DEFAULT_ORIGIN,
    DEFAULT_REQUIRED_DOMAIN, ENV_API_URL, ENV_DOMAIN, ENV_ORIGIN,
};
use clap::{Arg, ArgMatches, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_DOMAIN: &str = "domain";
pub const ARG_ORIGIN: &str = "origin";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long("api-url")
                .help("Base URL of the attendance service")
                .env(ENV_API_URL)
                .default_value(DEFAULT_API_BASE_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_DOMAIN)
                .long("domain")
                .help("Email domain allowed to sign in")
                .env(ENV_DOMAIN)
                .default_value(DEFAULT_REQUIRED_DOMAIN)
                .global(true),
        )
        .arg(
            Arg::new(ARG_ORIGIN)
                .long("origin")
                .help("Origin the capture runs under; camera access needs https or localhost")
                .env(ENV_ORIGIN)
                .default_value(DEFAULT_ORIGIN)
                .global(true),
        )
}

/// Builds the runtime config from the parsed arguments. Blank values keep
/// the defaults.
#[must_use]
pub fn config(matches: &ArgMatches) -> AppConfig {
    let value = |id: &str| {
        matches
            .get_one::<String>(id)
            .and_then(|raw| normalize_value(raw))
    };

    let mut config = AppConfig::default();
    apply_overrides(
        &mut config,
        Overrides {
            api_base_url: value(ARG_API_URL),
            required_domain: value(ARG_DOMAIN),
            origin: value(ARG_ORIGIN),
        },
    );
    config
}
