//! Command-line argument parsing for memberpass.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Log in and persist the session token
    Login { username: String },
    /// Log out and forget the token
    Logout,
    /// Print the logged-in member's profile
    Profile,
    /// Show the rotating member pass (default)
    Pass,
    /// Encrypt a pass offline, optionally for a given `YYYYMMDDHHmm` minute
    Encrypt {
        worship_id: String,
        at: Option<String>,
    },
    /// Check a pass against the recent time window
    Verify {
        ciphertext: String,
        worship_id: String,
    },
    /// Arguments that could not be understood; carries the reason
    Invalid(String),
}

pub const USAGE: &str = "\
Usage: memberpass [COMMAND]

Commands:
  pass                              Show the rotating member pass (default)
  login <username>                  Log in; the password is prompted
  logout                            Log out and forget the saved session
  profile                           Show the logged-in member
  encrypt <worship_id> [YYYYMMDDHHmm]
                                    Encrypt a pass offline
  verify <ciphertext> <worship_id>  Check a pass against the last minutes

Options:
  -V, --version                     Print version
  -h, --help                        Print this help";

/// Parse command-line arguments and return the appropriate command.
///
/// # Examples
///
/// ```
/// use memberpass::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["memberpass".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let args: Vec<String> = args.skip(1).collect();

    if args.iter().any(|a| a == "--version" || a == "-V") {
        return CliCommand::Version;
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return CliCommand::Help;
    }

    let Some((command, rest)) = args.split_first() else {
        return CliCommand::Pass;
    };

    match (command.as_str(), rest) {
        ("pass", []) => CliCommand::Pass,
        ("logout", []) => CliCommand::Logout,
        ("profile", []) => CliCommand::Profile,
        ("login", [username]) => CliCommand::Login {
            username: username.clone(),
        },
        ("login", _) => CliCommand::Invalid("login expects exactly one <username>".to_string()),
        ("encrypt", [worship_id]) => CliCommand::Encrypt {
            worship_id: worship_id.clone(),
            at: None,
        },
        ("encrypt", [worship_id, at]) => CliCommand::Encrypt {
            worship_id: worship_id.clone(),
            at: Some(at.clone()),
        },
        ("encrypt", _) => {
            CliCommand::Invalid("encrypt expects <worship_id> [YYYYMMDDHHmm]".to_string())
        }
        ("verify", [ciphertext, worship_id]) => CliCommand::Verify {
            ciphertext: ciphertext.clone(),
            worship_id: worship_id.clone(),
        },
        ("verify", _) => {
            CliCommand::Invalid("verify expects <ciphertext> <worship_id>".to_string())
        }
        ("pass" | "logout" | "profile", _) => {
            CliCommand::Invalid(format!("{} takes no arguments", command))
        }
        (other, _) => CliCommand::Invalid(format!("unknown command '{}'", other)),
    }
}
