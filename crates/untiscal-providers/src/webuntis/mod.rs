//! WebUntis timetable source.
//!
//! This module provides a [`WebUntisSource`] that fetches raw timetable
//! records over the WebUntis JSON-RPC API.
//!
//! # Features
//!
//! - Session login with username/password, shared by concurrent fetches
//! - Class or student auto-detection when no class id is configured
//! - `getTimetable` in fixed-size date chunks
//!
//! # Example
//!
//! ```ignore
//! use untiscal_providers::webuntis::{WebUntisConfig, WebUntisSource};
//!
//! let config = WebUntisConfig::new("mese.webuntis.com", "demo-school")?
//!     .with_credentials("user", "password");
//!
//! let source = WebUntisSource::new(config)?;
//! let entity = source.resolve_entity(None).await?;
//! let records = source.fetch_lessons(entity, range).await?;
//! source.close().await?;
//! ```

mod client;
mod config;
mod provider;

pub use client::{NamedElement, Session, WebUntisClient};
pub use config::WebUntisConfig;
pub use provider::WebUntisSource;
