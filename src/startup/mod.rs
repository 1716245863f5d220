//! Process startup with dependency injection.
//!
//! # Components
//!
//! - [`config`] - `PortalConfig`, defaults and `MEMBERPASS_*` overrides
//! - [`portal`] - composition root wiring every component together
//!
//! # Usage
//!
//! ```ignore
//! use memberpass::startup::{Portal, PortalConfig};
//!
//! let (portal, mut navigation) = Portal::build(PortalConfig::from_env()?)?;
//! portal.start().await;
//! ```

pub mod config;
pub mod portal;

pub use config::PortalConfig;
pub use portal::{Portal, PortalDeps};
