//! Wallet agent
//!
//! Drives the wallet step: selects the first installed wallet, clicks
//! "continue", then keeps clicking "next" on every heartbeat until the page
//! leaves the wallet step. Arriving on the mining step schedules a single
//! delayed reload so the mine agent starts on a fresh page.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument, Span};
use warden_core::fail_open::fail_open;
use warden_core::{AgentTimings, ControlTexts, SelectorConfig, Step, WalletAbsence, WardenConfig};

use crate::action::{trigger_and_confirm, trigger_once, Action, ConfirmPolicy, Locator, Postcondition};
use crate::agent::Agent;
use crate::clock::Clock;
use crate::handoff::{Handoff, HandoffDetector};
use crate::page::Page;
use crate::probe;
use crate::state::{AgentExit, AgentState, TickOutcome};

/// Reload reason when boot finds no installed wallet
pub const NO_WALLET_DETECTED: &str = "no wallet detected";

pub struct WalletAgent {
    page: Arc<dyn Page>,
    clock: Arc<dyn Clock>,
    timings: AgentTimings,
    handoff_reload_delay: Duration,
    selectors: SelectorConfig,
    controls: ControlTexts,
    detector: HandoffDetector,
    state: AgentState,
    handoff_reload: Option<JoinHandle<()>>,
}

impl WalletAgent {
    pub fn new(page: Arc<dyn Page>, clock: Arc<dyn Clock>, config: &WardenConfig) -> Self {
        let timings = config.wallet.timings();
        Self {
            page,
            clock,
            timings,
            handoff_reload_delay: config.wallet.handoff_reload_delay(),
            selectors: config.selectors.clone(),
            controls: config.controls.clone(),
            detector: HandoffDetector::for_wallet(&config.site),
            state: AgentState::new(Step::Wallet, timings.reload_guard),
            handoff_reload: None,
        }
    }

    /// Whether the post-handoff reload has been scheduled
    pub fn handoff_scheduled(&self) -> bool {
        self.handoff_reload.is_some()
    }

    fn select_wallet(&self) -> Action {
        Action::new(
            "select wallet",
            Locator::InstalledWallet(self.selectors.clone()),
            Postcondition::ControlEnabled(self.controls.proceed.clone()),
        )
    }

    /// Any advance control that is not also the continue control
    async fn advance_visible(&self) -> bool {
        let advance = self.controls.advance.to_lowercase();
        let proceed = self.controls.proceed.to_lowercase();
        fail_open("button scan", || self.page.buttons())
            .await
            .unwrap_or_default()
            .iter()
            .map(|c| c.text.to_lowercase())
            .any(|text| text.contains(&advance) && !text.contains(&proceed))
    }

    async fn reload(&mut self, reason: &str) -> TickOutcome {
        let now = self.clock.now();
        if self
            .state
            .guard_mut()
            .request_reload(self.page.as_ref(), now, reason)
            .await
        {
            TickOutcome::Reloaded {
                reason: reason.to_string(),
            }
        } else {
            TickOutcome::Continue
        }
    }

    /// One-shot reload of the destination step, independent of the guard
    fn schedule_handoff_reload(&mut self) {
        if self.handoff_reload.is_some() {
            return;
        }

        let page = Arc::clone(&self.page);
        let clock = Arc::clone(&self.clock);
        let delay = self.handoff_reload_delay;
        info!("Reloading the mining step in {:?} so its agent starts clean", delay);

        let task = async move {
            clock.sleep(delay).await;
            info!("Forcing reload of the mining step");
            if let Err(e) = page.reload().await {
                warn!("Handoff reload failed: {}", e);
            }
        };
        self.handoff_reload = Some(tokio::spawn(task.instrument(Span::current())));
    }

    async fn advance(&self) {
        match probe::find_control(self.page.as_ref(), &self.controls.advance).await {
            Some(control) if control.enabled => {
                if let Err(e) = self.page.activate(&control).await {
                    warn!("Failed to click '{}': {}", self.controls.advance, e);
                } else {
                    info!("Clicked '{}', moving to the next step", control.text);
                }
            }
            Some(_) => info!("'{}' is disabled, waiting for next heartbeat", self.controls.advance),
            None => info!("No '{}' control, waiting for next heartbeat", self.controls.advance),
        }
    }
}

#[async_trait]
impl Agent for WalletAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn timings(&self) -> AgentTimings {
        self.timings
    }

    async fn boot(&mut self) -> TickOutcome {
        if self.state.initial_run_complete() {
            debug!("Boot already ran for this page load");
            return TickOutcome::Continue;
        }

        let outcome = if self.advance_visible().await {
            info!("'{}' already visible, leaving it to the heartbeat", self.controls.advance);
            TickOutcome::Continue
        } else {
            let availability = probe::wallet_availability(self.page.as_ref(), &self.selectors).await;
            if !availability.found {
                match availability.absence {
                    Some(WalletAbsence::NoSupportedNotice) => {
                        warn!("Page reports no supported wallets installed")
                    }
                    _ => warn!("No installed wallet listed"),
                }
                self.reload(NO_WALLET_DETECTED).await
            } else {
                info!(
                    "Installed wallet found ({}), selecting",
                    availability.name.as_deref().unwrap_or("Unknown")
                );
                let ready = trigger_and_confirm(
                    self.page.as_ref(),
                    self.clock.as_ref(),
                    &self.select_wallet(),
                    ConfirmPolicy::new(self.timings.confirm_step, self.timings.confirm_attempts),
                )
                .await;

                if ready {
                    trigger_once(
                        self.page.as_ref(),
                        &Locator::ButtonText(self.controls.proceed.clone()),
                        &self.controls.proceed,
                    )
                    .await;
                } else {
                    info!(
                        "'{}' not clickable, leaving it to the heartbeat",
                        self.controls.proceed
                    );
                }
                TickOutcome::Continue
            }
        };

        self.state.mark_initial_run_complete();
        outcome
    }

    async fn tick(&mut self) -> TickOutcome {
        let n = self.state.next_tick();

        let navigation = probe::navigation_status(self.page.as_ref()).await;
        match self.detector.inspect(navigation.as_ref()) {
            Handoff::Destination => {
                self.state.cancel_heartbeat();
                self.schedule_handoff_reload();
                return TickOutcome::HandedOff;
            }
            Handoff::Elsewhere => {
                self.state.cancel_heartbeat();
                return TickOutcome::Yielded;
            }
            Handoff::Stay => {}
        }

        info!("Heartbeat #{} ({:?} period)", n, self.timings.heartbeat);
        self.advance().await;
        TickOutcome::Continue
    }

    /// Wait for a scheduled handoff reload before the instance ends
    async fn finish(&mut self, exit: AgentExit) -> AgentExit {
        if let Some(task) = self.handoff_reload.take() {
            if let Err(e) = task.await {
                warn!("Handoff reload task did not complete: {}", e);
            }
        }
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::page::{MockPage, MockReaction};

    fn agent(page: &Arc<MockPage>, clock: &Arc<ManualClock>) -> WalletAgent {
        WalletAgent::new(page.clone(), clock.clone(), &WardenConfig::default())
    }

    #[tokio::test]
    async fn test_boot_selects_wallet_and_continues() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_path("/wizard/wallet")
                .with_installed_wallet(Some("Lace"))
                .with_button("Continue", false)
                .on_activate("installed", MockReaction::Enable("continue".to_string())),
        );
        let mut wallet = agent(&page, &clock);

        assert_eq!(wallet.boot().await, TickOutcome::Continue);
        assert_eq!(
            page.activations(),
            vec!["Lace INSTALLED".to_string(), "Continue".to_string()]
        );
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
        assert!(wallet.state().initial_run_complete());
    }

    #[tokio::test]
    async fn test_boot_leaves_disabled_continue_to_heartbeat() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_installed_wallet(None)
                .with_button("Continue", false),
        );
        let mut wallet = agent(&page, &clock);

        assert_eq!(wallet.boot().await, TickOutcome::Continue);
        assert_eq!(page.activations(), vec!["Wallet INSTALLED".to_string()]);
    }

    #[tokio::test]
    async fn test_boot_defers_when_next_visible() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(MockPage::new().with_button("Next", true));
        let mut wallet = agent(&page, &clock);

        assert_eq!(wallet.boot().await, TickOutcome::Continue);
        assert!(page.activations().is_empty());
        assert!(page.reloads().is_empty());
        assert!(wallet.state().initial_run_complete());
    }

    #[tokio::test]
    async fn test_boot_defers_when_next_follows_continue_to_next() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_button("Continue to next", false)
                .with_button("Next", true),
        );
        let mut wallet = agent(&page, &clock);

        assert_eq!(wallet.boot().await, TickOutcome::Continue);
        assert!(page.reloads().is_empty());
        assert!(page.activations().is_empty());
    }

    #[tokio::test]
    async fn test_boot_ignores_next_inside_continue() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(MockPage::new().with_button("Continue to next", false));
        let mut wallet = agent(&page, &clock);

        assert_eq!(
            wallet.boot().await,
            TickOutcome::Reloaded {
                reason: NO_WALLET_DETECTED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_boot_reloads_on_no_supported_notice() {
        let clock = Arc::new(ManualClock::new());
        let notice = SelectorConfig::default().wallet_notice;
        let page = Arc::new(MockPage::new().with_text(&notice, "No supported Cardano wallets found"));
        let mut wallet = agent(&page, &clock);

        assert_eq!(
            wallet.boot().await,
            TickOutcome::Reloaded {
                reason: NO_WALLET_DETECTED.to_string()
            }
        );
        assert!(wallet.state().initial_run_complete());
    }

    #[tokio::test]
    async fn test_tick_clicks_enabled_next() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_path("/wizard/wallet")
                .with_button("Next", true),
        );
        let mut wallet = agent(&page, &clock);

        assert_eq!(wallet.tick().await, TickOutcome::Continue);
        assert_eq!(page.activation_count("next"), 1);
    }

    #[tokio::test]
    async fn test_tick_waits_on_disabled_next() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_path("/wizard/wallet")
                .with_button("Next", false),
        );
        let mut wallet = agent(&page, &clock);

        assert_eq!(wallet.tick().await, TickOutcome::Continue);
        assert!(page.activations().is_empty());
    }

    #[tokio::test]
    async fn test_tick_yields_on_unmanaged_step() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_path("/wizard/terms")
                .with_button("Next", true),
        );
        let mut wallet = agent(&page, &clock);
        wallet.state_mut().arm_heartbeat(clock.now(), Duration::from_secs(10));

        assert_eq!(wallet.tick().await, TickOutcome::Yielded);
        assert!(!wallet.state().heartbeat_active());
        assert!(!wallet.handoff_scheduled());
        assert!(page.activations().is_empty());
    }
}
