//! Login, logout and profile commands.

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::session::Identity;
use crate::startup::{Portal, PortalConfig};

/// Prompt for the password, log in, and persist the token.
pub fn handle_login_command(username: &str) -> Result<()> {
    let config = PortalConfig::from_env()?;
    let password = rpassword::prompt_password(format!("Password for {}: ", username))?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(login(config, username, &password))
}

pub fn handle_logout_command() -> Result<()> {
    let config = PortalConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(logout(config))
}

pub fn handle_profile_command() -> Result<()> {
    let config = PortalConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(profile(config))
}

async fn login(config: PortalConfig, username: &str, password: &str) -> Result<()> {
    let (portal, _navigation) = Portal::build(config)?;
    portal.start().await;

    let identity = portal
        .login(username, password)
        .await
        .map_err(|e| eyre!("{}", e.user_message()))?;
    println!("Logged in as {}", display_name(&identity));
    println!("Worship ID: {}", identity.worship_id_label());
    Ok(())
}

async fn logout(config: PortalConfig) -> Result<()> {
    let (portal, _navigation) = Portal::build(config)?;
    portal.start().await;
    portal.logout().await;
    println!("Logged out.");
    Ok(())
}

async fn profile(config: PortalConfig) -> Result<()> {
    let (portal, _navigation) = Portal::build(config)?;
    portal.start().await;

    if !portal.session().is_authenticated() {
        println!("Not logged in. Run `memberpass login <username>` first.");
        return Ok(());
    }

    match portal.refresh_profile().await {
        Ok(identity) => {
            print_profile(&identity);
            Ok(())
        }
        Err(e) if e.requires_login() => {
            // The coordinator already logged the member out.
            if let Some(message) = portal.notice().message() {
                println!("{}", message);
            }
            portal.acknowledge_notice();
            Ok(())
        }
        Err(e) => Err(eyre!("{}", e.user_message())),
    }
}

fn display_name(identity: &Identity) -> &str {
    if identity.display_name.is_empty() {
        &identity.member_id
    } else {
        &identity.display_name
    }
}

fn print_profile(identity: &Identity) {
    println!("Name:       {}", display_name(identity));
    println!("Member ID:  {}", identity.member_id);
    if let Some(email) = &identity.email {
        println!("Email:      {}", email);
    }
    if let Some(role) = &identity.role {
        println!("Role:       {}", role);
    }
    println!("Worship ID: {}", identity.worship_id_label());
}
