//! # warden-core
//!
//! Core types for the warden page agents.
//!
//! Warden keeps an external browser session alive across two steps of a web
//! onboarding flow. Each step has an agent that samples the page, drives it
//! forward, and falls back to a rate-limited full reload when it stalls.
//!
//! ## Core Paradigm
//!
//! - Observations are snapshots, taken fresh on every probe and never cached
//! - Absence is a value, not an error
//! - A reload is the only hard reset, and it is rate limited
//! - Agent state lives exactly as long as one page load

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{
    AgentTimings, ControlTexts, MineTimings, RunnerConfig, SelectorConfig, SiteConfig,
    WalletTimings, WardenConfig,
};
pub use error::{Result, WardenError};
pub use types::*;
