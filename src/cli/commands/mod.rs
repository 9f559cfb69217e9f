pub mod endpoint;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};
use std::path::PathBuf;

pub const CMD_CHECK: &str = "check";
pub const CMD_MARK: &str = "mark";

pub const ARG_EMAIL: &str = "email";
pub const ARG_IMAGE: &str = "image";
pub const ARG_REAR_IMAGE: &str = "rear-image";
pub const ARG_REAR: &str = "rear";
pub const ARG_WITHOUT_CAMERA: &str = "without-camera";

fn check() -> Command {
    Command::new(CMD_CHECK)
        .about("Check whether an email address may sign in")
        .arg(
            Arg::new(ARG_EMAIL)
                .help("Email address to check")
                .required(true),
        )
}

fn mark() -> Command {
    Command::new(CMD_MARK)
        .about("Sign in, capture a photo and mark attendance")
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long("email")
                .help("Account to sign in with")
                .env("ATTENDANCE_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_IMAGE)
                .short('i')
                .long("image")
                .help("JPEG served by the front camera")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new(ARG_REAR_IMAGE)
                .long("rear-image")
                .help("JPEG served by the rear camera")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_REAR)
                .long("rear")
                .help("Switch to the rear camera before capturing")
                .requires(ARG_REAR_IMAGE)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_WITHOUT_CAMERA)
                .long("without-camera")
                .help("Submit the placeholder image instead of a capture")
                .action(ArgAction::SetTrue),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("attendance-capture")
        .about("Domain-restricted attendance marking with a camera capture")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(check())
        .subcommand(mark());

    let command = endpoint::with_args(command);
    logging::with_args(command)
}
