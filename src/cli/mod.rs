//! CLI module for memberpass.
//!
//! - Argument parsing
//! - Version display
//! - Login / logout / profile
//! - The live member pass and offline encrypt/verify
//!
//! # Usage
//!
//! ```ignore
//! use memberpass::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command)?;
//! ```

pub mod args;
pub mod pass;
pub mod session;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use pass::{handle_encrypt_command, handle_pass_command, handle_verify_command};
pub use session::{handle_login_command, handle_logout_command, handle_profile_command};
pub use version::{handle_version_command, VERSION};

use color_eyre::eyre::eyre;
use color_eyre::Result;

/// Run a parsed command to completion.
pub fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            handle_version_command();
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Login { username } => handle_login_command(&username),
        CliCommand::Logout => handle_logout_command(),
        CliCommand::Profile => handle_profile_command(),
        CliCommand::Pass => handle_pass_command(),
        CliCommand::Encrypt { worship_id, at } => {
            handle_encrypt_command(&worship_id, at.as_deref())
        }
        CliCommand::Verify {
            ciphertext,
            worship_id,
        } => handle_verify_command(&ciphertext, &worship_id),
        CliCommand::Invalid(reason) => Err(eyre!("{}\n\n{}", reason, USAGE)),
    }
}
