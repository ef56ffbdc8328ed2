//! Mine agent
//!
//! Keeps an already-started mining session up. The session is considered
//! stalled when the "next challenge" countdown reads zero, which the
//! heartbeat answers with a guarded reload. A running countdown with no
//! session gets the start control clicked and confirmed.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_core::{
    AgentTimings, ControlTexts, CountdownStatus, SelectorConfig, SessionStatus, Step,
    WardenConfig,
};

use crate::action::{trigger_and_confirm, Action, ConfirmPolicy, Locator, Postcondition};
use crate::agent::Agent;
use crate::clock::Clock;
use crate::page::Page;
use crate::probe;
use crate::state::{AgentState, TickOutcome};

/// Reload reason when the countdown reads zero on a heartbeat
pub const STALLED_SESSION: &str = "stalled session";

pub struct MineAgent {
    page: Arc<dyn Page>,
    clock: Arc<dyn Clock>,
    timings: AgentTimings,
    selectors: SelectorConfig,
    controls: ControlTexts,
    state: AgentState,
}

impl MineAgent {
    pub fn new(page: Arc<dyn Page>, clock: Arc<dyn Clock>, config: &WardenConfig) -> Self {
        let timings = config.mine.timings();
        Self {
            page,
            clock,
            timings,
            selectors: config.selectors.clone(),
            controls: config.controls.clone(),
            state: AgentState::new(Step::Mine, timings.reload_guard),
        }
    }

    fn start_session(&self) -> Action {
        Action::new(
            "start session",
            Locator::ButtonText(self.controls.start_session.clone()),
            Postcondition::ControlPresent(self.controls.stop_session.clone()),
        )
    }

    fn confirm_policy(&self) -> ConfirmPolicy {
        ConfirmPolicy::new(self.timings.confirm_step, self.timings.confirm_attempts)
    }

    async fn observe(&self) -> (CountdownStatus, SessionStatus) {
        let countdown = probe::countdown_status(self.page.as_ref(), &self.selectors).await;
        let session = probe::session_status(self.page.as_ref(), &self.controls).await;
        info!(
            "Countdown {} ({}), session {}",
            if countdown.is_zero { "zero" } else { "running" },
            countdown.raw_text,
            if session.started { "started" } else { "not started" }
        );
        (countdown, session)
    }

    async fn start(&self) -> bool {
        trigger_and_confirm(
            self.page.as_ref(),
            self.clock.as_ref(),
            &self.start_session(),
            self.confirm_policy(),
        )
        .await
    }
}

#[async_trait]
impl Agent for MineAgent {
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

    /// Start the session if the countdown runs but nothing is mining
    ///
    /// A zero countdown on arrival is left to the heartbeat.
    async fn boot(&mut self) -> TickOutcome {
        if self.state.initial_run_complete() {
            debug!("Boot already ran for this page load");
            return TickOutcome::Continue;
        }

        let (countdown, session) = self.observe().await;
        if !countdown.is_zero && !session.started {
            info!("Countdown running and session not started, starting session");
            self.start().await;
        } else if countdown.is_zero {
            info!(
                "Countdown is zero on arrival, deferring to the {:?} heartbeat",
                self.timings.heartbeat
            );
        }

        self.state.mark_initial_run_complete();
        TickOutcome::Continue
    }

    async fn tick(&mut self) -> TickOutcome {
        let n = self.state.next_tick();
        info!("Heartbeat #{} ({:?} period)", n, self.timings.heartbeat);

        let (countdown, session) = self.observe().await;

        if countdown.is_zero {
            warn!("Countdown is zero, session looks stalled");
            let now = self.clock.now();
            let reloaded = self
                .state
                .guard_mut()
                .request_reload(self.page.as_ref(), now, STALLED_SESSION)
                .await;
            return if reloaded {
                TickOutcome::Reloaded {
                    reason: STALLED_SESSION.to_string(),
                }
            } else {
                TickOutcome::Continue
            };
        }

        if !session.started {
            info!("Session not started while countdown runs, starting session");
            self.start().await;
        }

        TickOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::page::{MockPage, MockReaction};
    use std::time::Duration;

    fn countdown_selector() -> String {
        SelectorConfig::default().countdown
    }

    fn agent(page: &Arc<MockPage>, clock: &Arc<ManualClock>) -> MineAgent {
        MineAgent::new(page.clone(), clock.clone(), &WardenConfig::default())
    }

    #[tokio::test]
    async fn test_boot_starts_session_when_countdown_runs() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_text(&countdown_selector(), "00:04:10:00")
                .with_button("Start session", true)
                .on_activate(
                    "start session",
                    MockReaction::Reveal {
                        text: "Stop session".to_string(),
                        enabled: true,
                        after_lookups: 1,
                    },
                ),
        );
        let mut mine = agent(&page, &clock);

        assert_eq!(mine.boot().await, TickOutcome::Continue);
        assert!(mine.state().initial_run_complete());
        assert_eq!(page.activation_count("start session"), 1);
    }

    #[tokio::test]
    async fn test_boot_defers_zero_countdown() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_text(&countdown_selector(), "00:00:00:00")
                .with_button("Start session", true),
        );
        let mut mine = agent(&page, &clock);

        assert_eq!(mine.boot().await, TickOutcome::Continue);
        assert!(page.reloads().is_empty());
        assert!(page.activations().is_empty());
        assert!(mine.state().initial_run_complete());
    }

    #[tokio::test]
    async fn test_boot_leaves_running_session_alone() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_text(&countdown_selector(), "00:04:10:00")
                .with_button("Start session", true)
                .with_button("Stop session", true),
        );
        let mut mine = agent(&page, &clock);

        assert_eq!(mine.boot().await, TickOutcome::Continue);
        assert!(page.activations().is_empty());
        assert!(page.reloads().is_empty());
        assert!(clock.sleeps().is_empty());
        assert!(mine.state().initial_run_complete());
    }

    #[tokio::test]
    async fn test_boot_runs_once() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_text(&countdown_selector(), "00:04:10:00")
                .with_button("Start session", true),
        );
        let mut mine = agent(&page, &clock);

        mine.boot().await;
        mine.boot().await;
        assert_eq!(page.activation_count("start session"), 1);
    }

    #[tokio::test]
    async fn test_tick_with_running_session_does_nothing() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(
            MockPage::new()
                .with_text(&countdown_selector(), "00:04:10:00")
                .with_button("Stop session", true),
        );
        let mut mine = agent(&page, &clock);

        assert_eq!(mine.tick().await, TickOutcome::Continue);
        assert_eq!(mine.state().heartbeat_count(), 1);
        assert!(page.activations().is_empty());
        assert!(page.reloads().is_empty());
    }

    #[tokio::test]
    async fn test_tick_reloads_on_zero_countdown() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(MockPage::new().with_text(&countdown_selector(), "--:--:--:--"));
        let mut mine = agent(&page, &clock);

        assert_eq!(
            mine.tick().await,
            TickOutcome::Reloaded {
                reason: STALLED_SESSION.to_string()
            }
        );
        assert_eq!(page.reloads().len(), 1);
        assert_eq!(mine.state().last_reload_at(), Some(clock.now()));
    }

    #[tokio::test]
    async fn test_tick_missing_countdown_is_stalled() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(MockPage::new().with_button("Stop session", true));
        let mut mine = agent(&page, &clock);

        assert!(matches!(mine.tick().await, TickOutcome::Reloaded { .. }));
        clock.advance(Duration::from_secs(30));
        assert_eq!(mine.tick().await, TickOutcome::Continue);
        assert_eq!(page.reloads().len(), 1);
    }
}
