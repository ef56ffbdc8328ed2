//! Configuration management for warden
//!
//! Every timing constant, page location, selector and control text the agents
//! depend on lives here so it can be tuned without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Result, Step, WardenError};

/// Top-level warden configuration
///
/// Loaded from `.warden/config.toml` in the working directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Site locations for each step
    #[serde(default)]
    pub site: SiteConfig,

    /// Mine agent timings
    #[serde(default)]
    pub mine: MineTimings,

    /// Wallet agent timings
    #[serde(default)]
    pub wallet: WalletTimings,

    /// Structural lookups on the page
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Visible texts used to locate controls
    #[serde(default)]
    pub controls: ControlTexts,

    /// Re-injection runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Site and step locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path suffix identifying the mining step
    #[serde(default = "default_mine_path")]
    pub mine_path: String,

    /// Path suffix identifying the wallet step
    #[serde(default = "default_wallet_path")]
    pub wallet_path: String,
}

/// Mine agent timings, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineTimings {
    #[serde(default = "default_mine_boot_grace_ms")]
    pub boot_grace_ms: u64,

    #[serde(default = "default_mine_heartbeat_ms")]
    pub heartbeat_ms: u64,

    #[serde(default = "default_reload_guard_ms")]
    pub reload_guard_ms: u64,

    #[serde(default = "default_confirm_step_ms")]
    pub confirm_step_ms: u64,

    #[serde(default = "default_mine_confirm_attempts")]
    pub confirm_attempts: u32,
}

/// Wallet agent timings, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTimings {
    #[serde(default = "default_wallet_boot_grace_ms")]
    pub boot_grace_ms: u64,

    #[serde(default = "default_wallet_heartbeat_ms")]
    pub heartbeat_ms: u64,

    #[serde(default = "default_reload_guard_ms")]
    pub reload_guard_ms: u64,

    /// Settle delay between selecting a wallet and checking "continue"
    #[serde(default = "default_confirm_step_ms")]
    pub confirm_step_ms: u64,

    #[serde(default = "default_wallet_confirm_attempts")]
    pub confirm_attempts: u32,

    /// One-shot delay before reloading the mining step after handoff
    #[serde(default = "default_handoff_reload_delay_ms")]
    pub handoff_reload_delay_ms: u64,
}

/// Timings shared by both agents, as durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentTimings {
    pub boot_grace: Duration,
    pub heartbeat: Duration,
    pub reload_guard: Duration,
    pub confirm_step: Duration,
    pub confirm_attempts: u32,
}

/// Structural lookups used by the page driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// CSS path to the "next challenge in" countdown span
    #[serde(default = "default_countdown_selector")]
    pub countdown: String,

    /// Countdown text meaning "expired"
    #[serde(default = "default_countdown_zero")]
    pub countdown_zero: String,

    /// Countdown prefix meaning "unavailable"
    #[serde(default = "default_countdown_unavailable")]
    pub countdown_unavailable: String,

    /// Text of the badge marking an installed wallet
    #[serde(default = "default_installed_marker")]
    pub installed_marker: String,

    /// Child of a wallet entry holding its name
    #[serde(default = "default_wallet_name_selector")]
    pub wallet_name: String,

    /// Container of the "no supported wallets" notice
    #[serde(default = "default_wallet_notice_selector")]
    pub wallet_notice: String,

    #[serde(default = "default_wallet_notice_text")]
    pub wallet_notice_text: String,
}

/// Visible texts of the controls the agents drive
///
/// Matching is a case-insensitive substring test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlTexts {
    #[serde(default = "default_start_session")]
    pub start_session: String,

    #[serde(default = "default_stop_session")]
    pub stop_session: String,

    #[serde(default = "default_continue")]
    pub proceed: String,

    #[serde(default = "default_advance")]
    pub advance: String,
}

/// Re-injection runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// How often to look for a page an agent should be attached to
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// Default value providers
fn default_base_url() -> String {
    "https://sm.midnight.gd".to_string()
}

fn default_mine_path() -> String {
    "/wizard/mine".to_string()
}

fn default_wallet_path() -> String {
    "/wizard/wallet".to_string()
}

fn default_mine_boot_grace_ms() -> u64 {
    5_000
}

fn default_mine_heartbeat_ms() -> u64 {
    10 * 60 * 1000
}

fn default_wallet_boot_grace_ms() -> u64 {
    30_000
}

fn default_wallet_heartbeat_ms() -> u64 {
    10_000
}

fn default_reload_guard_ms() -> u64 {
    60_000
}

fn default_confirm_step_ms() -> u64 {
    500
}

fn default_mine_confirm_attempts() -> u32 {
    16
}

fn default_wallet_confirm_attempts() -> u32 {
    1
}

fn default_handoff_reload_delay_ms() -> u64 {
    10_000
}

fn default_countdown_selector() -> String {
    r"div.flex-grow.flex.md\:justify-end.self-center.text-text-text-secondary span.text-text-text-primary"
        .to_string()
}

fn default_countdown_zero() -> String {
    "00:00:00:00".to_string()
}

fn default_countdown_unavailable() -> String {
    "--".to_string()
}

fn default_installed_marker() -> String {
    "INSTALLED".to_string()
}

fn default_wallet_name_selector() -> String {
    "div.flex-1".to_string()
}

fn default_wallet_notice_selector() -> String {
    "div.flex.gap-2.p-4.rounded-sm.border".to_string()
}

fn default_wallet_notice_text() -> String {
    "No supported Cardano wallets".to_string()
}

fn default_start_session() -> String {
    "start session".to_string()
}

fn default_stop_session() -> String {
    "stop session".to_string()
}

fn default_continue() -> String {
    "continue".to_string()
}

fn default_advance() -> String {
    "next".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

impl WardenConfig {
    /// Load configuration from `.warden/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".warden/config.toml");

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| WardenError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write default configuration to `.warden/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".warden");
        std::fs::create_dir_all(&config_dir)?;

        let content = Self::default().to_toml()?;
        std::fs::write(config_dir.join("config.toml"), content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| WardenError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject timings that would spin or never confirm
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, u64); 7] = [
            ("mine.heartbeat_ms", self.mine.heartbeat_ms),
            ("mine.confirm_step_ms", self.mine.confirm_step_ms),
            ("mine.confirm_attempts", self.mine.confirm_attempts as u64),
            ("wallet.heartbeat_ms", self.wallet.heartbeat_ms),
            ("wallet.confirm_step_ms", self.wallet.confirm_step_ms),
            ("wallet.confirm_attempts", self.wallet.confirm_attempts as u64),
            ("runner.poll_interval_ms", self.runner.poll_interval_ms),
        ];

        for (name, value) in checks {
            if value == 0 {
                return Err(WardenError::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }
}

impl SiteConfig {
    /// Which step, if any, a location path belongs to
    pub fn step_for_path(&self, path: &str) -> Option<Step> {
        if path.ends_with(&self.mine_path) {
            Some(Step::Mine)
        } else if path.ends_with(&self.wallet_path) {
            Some(Step::Wallet)
        } else {
            None
        }
    }

    pub fn url_for(&self, step: Step) -> String {
        let path = match step {
            Step::Mine => &self.mine_path,
            Step::Wallet => &self.wallet_path,
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl MineTimings {
    pub fn timings(&self) -> AgentTimings {
        AgentTimings {
            boot_grace: Duration::from_millis(self.boot_grace_ms),
            heartbeat: Duration::from_millis(self.heartbeat_ms),
            reload_guard: Duration::from_millis(self.reload_guard_ms),
            confirm_step: Duration::from_millis(self.confirm_step_ms),
            confirm_attempts: self.confirm_attempts,
        }
    }
}

impl WalletTimings {
    pub fn timings(&self) -> AgentTimings {
        AgentTimings {
            boot_grace: Duration::from_millis(self.boot_grace_ms),
            heartbeat: Duration::from_millis(self.heartbeat_ms),
            reload_guard: Duration::from_millis(self.reload_guard_ms),
            confirm_step: Duration::from_millis(self.confirm_step_ms),
            confirm_attempts: self.confirm_attempts,
        }
    }

    pub fn handoff_reload_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_reload_delay_ms)
    }
}

impl RunnerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mine_path: default_mine_path(),
            wallet_path: default_wallet_path(),
        }
    }
}

impl Default for MineTimings {
    fn default() -> Self {
        Self {
            boot_grace_ms: default_mine_boot_grace_ms(),
            heartbeat_ms: default_mine_heartbeat_ms(),
            reload_guard_ms: default_reload_guard_ms(),
            confirm_step_ms: default_confirm_step_ms(),
            confirm_attempts: default_mine_confirm_attempts(),
        }
    }
}

impl Default for WalletTimings {
    fn default() -> Self {
        Self {
            boot_grace_ms: default_wallet_boot_grace_ms(),
            heartbeat_ms: default_wallet_heartbeat_ms(),
            reload_guard_ms: default_reload_guard_ms(),
            confirm_step_ms: default_confirm_step_ms(),
            confirm_attempts: default_wallet_confirm_attempts(),
            handoff_reload_delay_ms: default_handoff_reload_delay_ms(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            countdown: default_countdown_selector(),
            countdown_zero: default_countdown_zero(),
            countdown_unavailable: default_countdown_unavailable(),
            installed_marker: default_installed_marker(),
            wallet_name: default_wallet_name_selector(),
            wallet_notice: default_wallet_notice_selector(),
            wallet_notice_text: default_wallet_notice_text(),
        }
    }
}

impl Default for ControlTexts {
    fn default() -> Self {
        Self {
            start_session: default_start_session(),
            stop_session: default_stop_session(),
            proceed: default_continue(),
            advance: default_advance(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
