//! Types shared between the referral portal server, its handlers and tests.
//!
//! `types` holds every JSON shape that crosses the HTTP boundary plus the
//! session claims carried inside the `auth_token` cookie.  `config` holds the
//! TOML configuration model and its loader.

pub mod config;
pub mod types;
