//! Observed conditions and page-level value types
//!
//! Every observation is an immutable snapshot produced by a probe. Nothing
//! here is cached across heartbeat ticks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An interactive control located on the page
///
/// `index` is the control's position among all `<button>` elements in
/// document order at lookup time. It is only meaningful until the page
/// re-renders, so controls are re-located on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub index: usize,
    pub text: String,
    pub enabled: bool,
}

impl Control {
    pub fn new(index: usize, text: impl Into<String>, enabled: bool) -> Self {
        Self {
            index,
            text: text.into(),
            enabled,
        }
    }
}

/// An installed wallet entry in the wallet-selection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletOption {
    pub control: Control,
    /// Human-readable wallet name, when the entry carries one
    pub name: Option<String>,
}

impl WalletOption {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Countdown to the next challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownStatus {
    pub is_zero: bool,
    pub raw_text: String,
}

/// Whether the mining session is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub started: bool,
}

/// Why no installed wallet was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletAbsence {
    /// The page explicitly says no supported wallets are installed
    NoSupportedNotice,
    /// Nothing marked installed, and no notice either
    NotListed,
}

/// Installed-wallet availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAvailability {
    pub found: bool,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absence: Option<WalletAbsence>,
}

impl WalletAvailability {
    pub fn found(name: impl Into<String>) -> Self {
        Self {
            found: true,
            name: Some(name.into()),
            absence: None,
        }
    }

    pub fn missing(absence: WalletAbsence) -> Self {
        Self {
            found: false,
            name: None,
            absence: Some(absence),
        }
    }
}

/// Current navigation location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationStatus {
    pub current_path: String,
}

/// One step of the onboarding flow that has an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Wallet,
    Mine,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Wallet => "wallet",
            Step::Mine => "mine",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
