use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use user_policy::{user_url, USERNAME_MAX_LENGTH, USER_DISPLAY_NAME_MAX_LENGTH, VALID_USERNAME_REGEXP};

#[derive(Parser)]
#[command(name = "user_policy")]
#[command(about = "Check usernames and display names against the account policy")]
struct Args {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check one or more usernames
    Check {
        /// Print results as a JSON array; must come before the usernames
        #[arg(long)]
        json: bool,

        /// Usernames to check; a leading hyphen is part of the name
        #[arg(required = true, allow_hyphen_values = true)]
        usernames: Vec<String>,
    },
    /// Check a display name against its length limit
    CheckDisplayName {
        #[arg(allow_hyphen_values = true)]
        name: String,
    },
    /// Print the profile path for a username
    Url {
        #[arg(allow_hyphen_values = true)]
        username: String,
    },
    /// Print the policy pattern and limits
    Policy {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
enum Violation {
    #[error("username is {len} characters, maximum is {max}")]
    UsernameTooLong { len: usize, max: usize },
    #[error("username must be letters or digits, optionally joined by single '-' or '.'")]
    UsernameShape,
    #[error("display name is {len} characters, maximum is {max}")]
    DisplayNameTooLong { len: usize, max: usize },
}

#[derive(Debug, Serialize)]
struct CheckReport {
    username: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_path: Option<String>,
}

impl CheckReport {
    fn new(username: &str, outcome: Result<(), Violation>) -> Self {
        match outcome {
            Ok(()) => CheckReport {
                username: username.to_string(),
                valid: true,
                reason: None,
                profile_path: Some(user_url(username)),
            },
            Err(violation) => CheckReport {
                username: username.to_string(),
                valid: false,
                reason: Some(violation.to_string()),
                profile_path: None,
            },
        }
    }
}

static USERNAME_RE: OnceCell<Regex> = OnceCell::new();

fn username_regex() -> anyhow::Result<&'static Regex> {
    USERNAME_RE
        .get_or_try_init(|| Regex::new(VALID_USERNAME_REGEXP))
        .with_context(|| format!("invalid username pattern: {}", VALID_USERNAME_REGEXP))
}

/// Length first, then shape, so an oversized name reports its length.
fn check_username(re: &Regex, username: &str) -> Result<(), Violation> {
    let len = username.chars().count();
    if len > USERNAME_MAX_LENGTH {
        return Err(Violation::UsernameTooLong { len, max: USERNAME_MAX_LENGTH });
    }
    if !re.is_match(username) {
        return Err(Violation::UsernameShape);
    }
    Ok(())
}

fn check_display_name(name: &str) -> Result<(), Violation> {
    let len = name.chars().count();
    if len > USER_DISPLAY_NAME_MAX_LENGTH {
        return Err(Violation::DisplayNameTooLong { len, max: USER_DISPLAY_NAME_MAX_LENGTH });
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "user_policy=warn",
        1 => "user_policy=info",
        _ => "user_policy=debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Check { usernames, json } => {
            let re = username_regex()?;
            let reports: Vec<CheckReport> = usernames
                .iter()
                .map(|name| {
                    let outcome = check_username(re, name);
                    debug!(username = %name, ok = outcome.is_ok(), "checked username");
                    CheckReport::new(name, outcome)
                })
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    if report.valid {
                        println!("ok {} {}", report.username, user_url(&report.username));
                    } else {
                        println!(
                            "invalid {}: {}",
                            report.username,
                            report.reason.as_deref().unwrap_or_default()
                        );
                    }
                }
            }

            let rejected = reports.iter().filter(|r| !r.valid).count();
            info!(checked = reports.len(), rejected, "username check finished");
            Ok(if rejected == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::CheckDisplayName { name } => match check_display_name(&name) {
            Ok(()) => {
                println!("ok");
                Ok(ExitCode::SUCCESS)
            }
            Err(violation) => {
                println!("invalid: {}", violation);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Url { username } => {
            println!("{}", user_url(&username));
            Ok(ExitCode::SUCCESS)
        }
        Command::Policy { json: as_json } => {
            if as_json {
                let policy = json!({
                    "valid_username_regexp": VALID_USERNAME_REGEXP,
                    "username_max_length": USERNAME_MAX_LENGTH,
                    "user_display_name_max_length": USER_DISPLAY_NAME_MAX_LENGTH,
                });
                println!("{}", serde_json::to_string_pretty(&policy)?);
            } else {
                println!("valid_username_regexp: {}", VALID_USERNAME_REGEXP);
                println!("username_max_length: {}", USERNAME_MAX_LENGTH);
                println!("user_display_name_max_length: {}", USER_DISPLAY_NAME_MAX_LENGTH);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_username_accepts_policy_examples() {
        let re = username_regex().unwrap();
        assert_eq!(check_username(re, "alice"), Ok(()));
        assert_eq!(check_username(re, "alice.bob"), Ok(()));
        assert_eq!(check_username(re, "alice-bob"), Ok(()));
        assert_eq!(check_username(re, &"a".repeat(USERNAME_MAX_LENGTH)), Ok(()));
    }

    #[test]
    fn test_check_username_rejects_shape() {
        let re = username_regex().unwrap();
        for name in ["", "-alice", "alice-", "alice--bob"] {
            assert_eq!(check_username(re, name), Err(Violation::UsernameShape), "{:?}", name);
        }
    }

    #[test]
    fn test_check_username_length_before_shape() {
        let re = username_regex().unwrap();
        let name = "-".repeat(USERNAME_MAX_LENGTH + 1);
        assert_eq!(
            check_username(re, &name),
            Err(Violation::UsernameTooLong { len: 256, max: 255 })
        );
    }

    #[test]
    fn test_check_display_name() {
        assert_eq!(check_display_name("Alice Bob 🦀"), Ok(()));
        assert_eq!(check_display_name(&"é".repeat(USER_DISPLAY_NAME_MAX_LENGTH)), Ok(()));
        assert_eq!(
            check_display_name(&"x".repeat(300)),
            Err(Violation::DisplayNameTooLong { len: 300, max: 255 })
        );
    }

    #[test]
    fn test_violation_messages() {
        let msg = Violation::UsernameTooLong { len: 256, max: 255 }.to_string();
        assert_eq!(msg, "username is 256 characters, maximum is 255");
        let msg = Violation::DisplayNameTooLong { len: 300, max: 255 }.to_string();
        assert_eq!(msg, "display name is 300 characters, maximum is 255");
    }

    #[test]
    fn test_check_report_serialization() {
        let ok = serde_json::to_value(CheckReport::new("alice", Ok(()))).unwrap();
        assert_eq!(ok["valid"], true);
        assert_eq!(ok["profile_path"], "/users/alice");
        assert!(ok.get("reason").is_none());

        let bad = serde_json::to_value(CheckReport::new("-x", Err(Violation::UsernameShape))).unwrap();
        assert_eq!(bad["valid"], false);
        assert!(bad["reason"].is_string());
        assert!(bad.get("profile_path").is_none());
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["user_policy", "-vv", "check", "--json", "alice", "bob"]).unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Check { usernames, json } => {
                assert_eq!(usernames, vec!["alice", "bob"]);
                assert!(json);
            }
            _ => panic!("expected check"),
        }

        assert!(Args::try_parse_from(["user_policy", "check"]).is_err());

        let args = Args::try_parse_from(["user_policy", "url", "alice"]).unwrap();
        assert!(matches!(args.command, Command::Url { ref username } if username == "alice"));
    }

    #[test]
    fn test_args_accept_leading_hyphen_values() {
        let args = Args::try_parse_from(["user_policy", "check", "-alice", "alice-", "-.x"]).unwrap();
        match args.command {
            Command::Check { usernames, json } => {
                assert_eq!(usernames, vec!["-alice", "alice-", "-.x"]);
                assert!(!json);
            }
            _ => panic!("expected check"),
        }

        let args = Args::try_parse_from(["user_policy", "check", "--json", "alice", "-alice"]).unwrap();
        match args.command {
            Command::Check { usernames, json } => {
                assert_eq!(usernames, vec!["alice", "-alice"]);
                assert!(json);
            }
            _ => panic!("expected check"),
        }

        let args = Args::try_parse_from(["user_policy", "check-display-name", "-foo"]).unwrap();
        assert!(matches!(args.command, Command::CheckDisplayName { ref name } if name == "-foo"));

        let args = Args::try_parse_from(["user_policy", "url", "-x"]).unwrap();
        assert!(matches!(args.command, Command::Url { ref username } if username == "-x"));
    }
}
