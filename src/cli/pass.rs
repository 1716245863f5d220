//! Member pass commands: the live rotating pass and the offline
//! encrypt/verify helpers used at the gate.

use chrono::Local;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::time::Duration;

use crate::credential::PassDisplay;
use crate::crypto::{PassPlaintext, PASS_DATETIME_FORMAT};
use crate::invalidation::{NavigationEvent, NoticeState};
use crate::startup::config::MAX_INTERVAL_SECS;
use crate::startup::{Portal, PortalConfig};

/// Show the pass and keep it rotating until Ctrl-C, a logout, or an expired
/// session.
pub fn handle_pass_command() -> Result<()> {
    let config = PortalConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_pass(config))
}

async fn run_pass(config: PortalConfig) -> Result<()> {
    // Profile is re-checked once the cached copy is stale, so an expired
    // session surfaces while the pass is on screen.
    let recheck_every = config
        .query_ttl
        .clamp(Duration::from_secs(1), Duration::from_secs(MAX_INTERVAL_SECS));
    let (portal, mut navigation) = Portal::build(config)?;
    portal.start().await;

    if !portal.session().is_authenticated() {
        println!("Not logged in. Run `memberpass login <username>` first.");
        return Ok(());
    }

    load_profile(&portal).await;
    portal.start_member_pass();

    let mut pass_rx = portal.subscribe_member_pass();
    let mut notice_rx = portal.subscribe_notice();
    let mut recheck = tokio::time::interval_at(
        tokio::time::Instant::now() + recheck_every,
        recheck_every,
    );
    render_pass(&portal.member_pass());

    loop {
        tokio::select! {
            changed = pass_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                render_pass(&portal.member_pass());
            }
            changed = notice_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let notice = notice_rx.borrow_and_update().clone();
                if let NoticeState::Visible { message } = notice {
                    println!();
                    println!("{}", message);
                    println!("Press Enter to continue.");
                    wait_for_enter().await?;
                    portal.acknowledge_notice();
                }
            }
            event = navigation.recv() => {
                if let Some(NavigationEvent::ResetToEntry) = event {
                    println!("Log in again with `memberpass login <username>`.");
                }
                break;
            }
            _ = recheck.tick() => {
                load_profile(&portal).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    portal.shutdown();
    Ok(())
}

async fn load_profile(portal: &Portal) {
    match portal.refresh_profile().await {
        Ok(identity) => {
            tracing::debug!(member_id = %identity.member_id, "Profile loaded");
        }
        // Expired sessions are reported through the notice.
        Err(e) if e.requires_login() => {}
        Err(e) => eprintln!("Could not load profile: {}", e.user_message()),
    }
}

fn render_pass(display: &PassDisplay) {
    match display {
        PassDisplay::Loading => println!("Loading member pass..."),
        PassDisplay::Ready(ciphertext) => {
            println!("[{}] {}", Local::now().format("%H:%M"), ciphertext)
        }
    }
}

async fn wait_for_enter() -> Result<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await??;
    Ok(())
}

/// Encrypt a pass without touching the network.
pub fn handle_encrypt_command(worship_id: &str, at: Option<&str>) -> Result<()> {
    let config = PortalConfig::from_env()?;
    let plaintext = match at {
        Some(at) => {
            let plaintext = PassPlaintext::new(worship_id, at);
            if plaintext.minute().is_none() {
                return Err(eyre!("'{}' is not a YYYYMMDDHHmm timestamp", at));
            }
            plaintext
        }
        None => PassPlaintext::at_minute(worship_id, Local::now().naive_local()),
    };

    let ciphertext = config.codec().encrypt(&plaintext)?;
    println!("{}", ciphertext);
    Ok(())
}

/// Check `ciphertext` against every minute of the current rotation window.
pub fn handle_verify_command(ciphertext: &str, worship_id: &str) -> Result<()> {
    let config = PortalConfig::from_env()?;
    let lookback = lookback_minutes(config.rotation_interval);
    let codec = config.codec();

    if let Ok(decoded) = codec.decrypt(ciphertext) {
        tracing::debug!(
            worship_id = %decoded.worship_id,
            minute = %decoded.current_datetime,
            "Decoded pass"
        );
    }

    if codec.matches_window(ciphertext, worship_id, Local::now().naive_local(), lookback) {
        println!("valid");
        Ok(())
    } else {
        Err(eyre!(
            "pass is not valid for worship id {} within the last {} minutes ({})",
            worship_id,
            lookback,
            Local::now().format(PASS_DATETIME_FORMAT)
        ))
    }
}

/// Whole minutes covered by one rotation, at least one.
fn lookback_minutes(rotation: Duration) -> u32 {
    let minutes = rotation.as_secs().div_ceil(60).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback_minutes() {
        assert_eq!(lookback_minutes(Duration::from_secs(300)), 5);
        assert_eq!(lookback_minutes(Duration::from_secs(90)), 2);
        assert_eq!(lookback_minutes(Duration::from_secs(1)), 1);
    }
}
