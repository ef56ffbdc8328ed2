//! Action trigger and confirm loop
//!
//! An [`Action`] names a control, how to find it, and what should be true
//! on the page once it has taken effect. Triggering activates the control
//! exactly once; confirming polls the postcondition on a fixed cadence for
//! a bounded number of attempts.

use std::time::Duration;
use tracing::{debug, info, warn};
use warden_core::{Control, Result, SelectorConfig, WardenError};

use crate::clock::Clock;
use crate::page::Page;
use crate::probe;

/// How an action's control is found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// First button whose text contains this (case-insensitive)
    ButtonText(String),
    /// The selection button of the installed wallet
    InstalledWallet(SelectorConfig),
}

impl Locator {
    pub async fn resolve(&self, page: &dyn Page) -> Option<Control> {
        match self {
            Locator::ButtonText(text) => probe::find_control(page, text).await,
            Locator::InstalledWallet(selectors) => probe::installed_wallet(page, selectors)
                .await
                .map(|wallet| wallet.control),
        }
    }
}

/// What must hold on the page once an action has taken effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postcondition {
    /// A control with this text is present
    ControlPresent(String),
    /// A control with this text is present and enabled
    ControlEnabled(String),
}

impl Postcondition {
    pub async fn holds(&self, page: &dyn Page) -> bool {
        match self {
            Postcondition::ControlPresent(text) => probe::find_control(page, text).await.is_some(),
            Postcondition::ControlEnabled(text) => probe::find_control(page, text)
                .await
                .map(|c| c.enabled)
                .unwrap_or(false),
        }
    }
}

/// A named interactive operation
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub locator: Locator,
    pub postcondition: Postcondition,
}

impl Action {
    pub fn new(name: impl Into<String>, locator: Locator, postcondition: Postcondition) -> Self {
        Self {
            name: name.into(),
            locator,
            postcondition,
        }
    }
}

/// Polling cadence after an action is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub step: Duration,
    pub max_attempts: u32,
}

impl ConfirmPolicy {
    pub fn new(step: Duration, max_attempts: u32) -> Self {
        Self { step, max_attempts }
    }

    /// Upper bound on the time spent confirming
    pub fn budget(&self) -> Duration {
        self.step * self.max_attempts
    }
}

/// Locate a control and activate it once if it is enabled
///
/// Returns whether the control was activated. Used for fire-and-forget
/// progress clicks that the next heartbeat re-evaluates.
pub async fn trigger_once(page: &dyn Page, locator: &Locator, name: &str) -> bool {
    let Some(control) = locator.resolve(page).await else {
        debug!("'{}' control not found", name);
        return false;
    };
    if !control.enabled {
        debug!("'{}' control is disabled", name);
        return false;
    }

    match page.activate(&control).await {
        Ok(()) => {
            info!("Clicked '{}'", name);
            true
        }
        Err(e) => {
            warn!("Failed to click '{}': {}", name, e);
            false
        }
    }
}

/// Trigger an action once and wait for its postcondition
///
/// Returns `false` immediately, without touching the page, when the control
/// is missing or disabled. Otherwise the control is activated exactly once
/// and the postcondition is polled every `policy.step` up to
/// `policy.max_attempts` times, followed by one final immediate check whose
/// value is returned.
pub async fn trigger_and_confirm(
    page: &dyn Page,
    clock: &dyn Clock,
    action: &Action,
    policy: ConfirmPolicy,
) -> bool {
    if !trigger_once(page, &action.locator, &action.name).await {
        return false;
    }

    match confirm(page, clock, action, policy).await {
        Ok(()) => {
            info!("'{}' confirmed", action.name);
            true
        }
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}

async fn confirm(
    page: &dyn Page,
    clock: &dyn Clock,
    action: &Action,
    policy: ConfirmPolicy,
) -> Result<()> {
    for attempt in 1..=policy.max_attempts {
        clock.sleep(policy.step).await;
        if action.postcondition.holds(page).await {
            debug!("'{}' confirmed on attempt {}", action.name, attempt);
            return Ok(());
        }
    }

    let settled = action.postcondition.holds(page).await;
    debug!(
        "'{}' final check after timeout: {}",
        action.name,
        if settled { "holds" } else { "does not hold" }
    );
    if settled {
        Ok(())
    } else {
        Err(WardenError::ActionNotConfirmed {
            action: action.name.clone(),
            attempts: policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::page::{MockPage, MockReaction};

    fn start_session() -> Action {
        Action::new(
            "start session",
            Locator::ButtonText("start session".to_string()),
            Postcondition::ControlPresent("stop session".to_string()),
        )
    }

    fn policy() -> ConfirmPolicy {
        ConfirmPolicy::new(Duration::from_millis(500), 16)
    }

    #[tokio::test]
    async fn test_missing_control_has_no_side_effects() {
        let page = MockPage::new();
        let clock = ManualClock::new();

        assert!(!trigger_and_confirm(&page, &clock, &start_session(), policy()).await);
        assert!(page.activations().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_control_not_activated() {
        let page = MockPage::new().with_button("Start session", false);
        let clock = ManualClock::new();

        assert!(!trigger_and_confirm(&page, &clock, &start_session(), policy()).await);
        assert!(page.activations().is_empty());
    }

    #[tokio::test]
    async fn test_confirms_when_postcondition_appears() {
        let page = MockPage::new().with_button("Start session", true).on_activate(
            "start session",
            MockReaction::Reveal {
                text: "Stop session".to_string(),
                enabled: true,
                after_lookups: 3,
            },
        );
        let clock = ManualClock::new();

        assert!(trigger_and_confirm(&page, &clock, &start_session(), policy()).await);
        assert_eq!(page.activation_count("start session"), 1);
        assert_eq!(clock.total_slept(), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_unconfirmed_is_bounded_and_single_click() {
        let page = MockPage::new().with_button("Start session", true);
        let clock = ManualClock::new();

        assert!(!trigger_and_confirm(&page, &clock, &start_session(), policy()).await);
        assert_eq!(page.activation_count("start session"), 1);
        assert_eq!(clock.sleeps().len(), 16);
        assert!(clock.total_slept() <= policy().budget());
    }

    #[tokio::test]
    async fn test_final_check_returns_observed_value() {
        // Visible only on the 17th scan: after all 16 polls, on the final check
        let page = MockPage::new().with_button("Start session", true).on_activate(
            "start",
            MockReaction::Reveal {
                text: "Stop session".to_string(),
                enabled: true,
                after_lookups: 16,
            },
        );
        let clock = ManualClock::new();

        assert!(trigger_and_confirm(&page, &clock, &start_session(), policy()).await);
        assert_eq!(clock.total_slept(), policy().budget());
    }

    #[tokio::test]
    async fn test_trigger_once_skips_disabled() {
        let page = MockPage::new().with_button("Next", false);
        let locator = Locator::ButtonText("next".to_string());

        assert!(!trigger_once(&page, &locator, "next").await);
        assert!(page.activations().is_empty());
    }
}
