//! Condition probes
//!
//! Read-only translation of raw page structure into observed conditions.
//! Probes never fail: a missing element or a driver error is an observed
//! value, and it always leans toward the condition that triggers recovery.

use tracing::debug;
use warden_core::fail_open::fail_open;
use warden_core::{
    Control, ControlTexts, CountdownStatus, NavigationStatus, SelectorConfig, SessionStatus,
    WalletAbsence, WalletAvailability, WalletOption, WardenError,
};

use crate::page::Page;

/// First control, in document order, whose text contains `needle`
/// (case-insensitive)
pub async fn find_control(page: &dyn Page, needle: &str) -> Option<Control> {
    let buttons = fail_open("button scan", || page.buttons()).await?;
    let needle = needle.to_lowercase();
    buttons
        .into_iter()
        .find(|b| b.text.to_lowercase().contains(&needle))
}

/// Countdown to the next challenge
///
/// A missing countdown reads as zero.
pub async fn countdown_status(page: &dyn Page, selectors: &SelectorConfig) -> CountdownStatus {
    let text = fail_open("countdown read", || page.text_of(&selectors.countdown))
        .await
        .flatten();

    match text {
        Some(text) => {
            let raw_text = text.trim().to_string();
            let is_zero = raw_text.starts_with(&selectors.countdown_zero)
                || raw_text.starts_with(&selectors.countdown_unavailable);
            CountdownStatus { is_zero, raw_text }
        }
        None => {
            debug!(
                "{}",
                WardenError::StructureMissing("countdown display".to_string())
            );
            CountdownStatus {
                is_zero: true,
                raw_text: selectors.countdown_zero.clone(),
            }
        }
    }
}

/// The session counts as started only while a "stop session" control is
/// present
pub async fn session_status(page: &dyn Page, controls: &ControlTexts) -> SessionStatus {
    SessionStatus {
        started: find_control(page, &controls.stop_session).await.is_some(),
    }
}

/// Locate the installed wallet's selection control
pub async fn installed_wallet(page: &dyn Page, selectors: &SelectorConfig) -> Option<WalletOption> {
    fail_open("installed wallet lookup", || {
        page.installed_wallet(&selectors.installed_marker, &selectors.wallet_name)
    })
    .await
    .flatten()
}

/// Whether an installed wallet is offered, and if not, why
pub async fn wallet_availability(
    page: &dyn Page,
    selectors: &SelectorConfig,
) -> WalletAvailability {
    if let Some(wallet) = installed_wallet(page, selectors).await {
        debug!("Wallet selector: installed wallet found: {}", wallet.display_name());
        return WalletAvailability::found(wallet.display_name());
    }

    let notice = fail_open("wallet notice lookup", || {
        page.contains_text(&selectors.wallet_notice, &selectors.wallet_notice_text)
    })
    .await
    .unwrap_or(false);

    if notice {
        debug!("Wallet selector: page reports no supported wallets installed");
        WalletAvailability::missing(WalletAbsence::NoSupportedNotice)
    } else {
        debug!("Wallet selector: no installed wallet listed");
        WalletAvailability::missing(WalletAbsence::NotListed)
    }
}

/// Current location path, or `None` when it cannot be read
pub async fn navigation_status(page: &dyn Page) -> Option<NavigationStatus> {
    fail_open("location read", || page.current_path())
        .await
        .map(|current_path| NavigationStatus { current_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MockPage;

    fn selectors() -> SelectorConfig {
        SelectorConfig::default()
    }

    #[tokio::test]
    async fn test_find_control_case_insensitive_first_match() {
        let page = MockPage::new()
            .with_button("Connect", true)
            .with_button("NEXT step", false)
            .with_button("Next", true);

        let control = find_control(&page, "next").await.unwrap();
        assert_eq!(control.index, 1);
        assert_eq!(control.text, "NEXT step");
        assert!(!control.enabled);
    }

    #[tokio::test]
    async fn test_countdown_running() {
        let sel = selectors();
        let page = MockPage::new().with_text(&sel.countdown, "  05:12:33:01 ");

        let status = countdown_status(&page, &sel).await;
        assert!(!status.is_zero);
        assert_eq!(status.raw_text, "05:12:33:01");
    }

    #[tokio::test]
    async fn test_countdown_zero_and_unavailable() {
        let sel = selectors();
        let page = MockPage::new().with_text(&sel.countdown, "00:00:00:00");
        assert!(countdown_status(&page, &sel).await.is_zero);

        page.set_text(&sel.countdown, Some("--:--:--:--"));
        assert!(countdown_status(&page, &sel).await.is_zero);
    }

    #[tokio::test]
    async fn test_missing_countdown_reads_as_zero() {
        let sel = selectors();
        let status = countdown_status(&MockPage::new(), &sel).await;
        assert!(status.is_zero);
        assert_eq!(status.raw_text, "00:00:00:00");

        let status = countdown_status(&MockPage::new().with_failing_reads(), &sel).await;
        assert!(status.is_zero);
    }

    #[tokio::test]
    async fn test_session_started_requires_stop_control() {
        let controls = ControlTexts::default();
        let page = MockPage::new().with_button("Start session", true);
        assert!(!session_status(&page, &controls).await.started);

        let page = MockPage::new().with_button("Stop Session", false);
        assert!(session_status(&page, &controls).await.started);
    }

    #[tokio::test]
    async fn test_wallet_absence_reasons() {
        let sel = selectors();

        let page = MockPage::new().with_installed_wallet(Some("Lace"));
        assert_eq!(wallet_availability(&page, &sel).await, WalletAvailability::found("Lace"));

        let page = MockPage::new().with_text(
            &sel.wallet_notice,
            "No supported Cardano wallets detected in this browser",
        );
        assert_eq!(
            wallet_availability(&page, &sel).await.absence,
            Some(WalletAbsence::NoSupportedNotice)
        );

        let availability = wallet_availability(&MockPage::new(), &sel).await;
        assert!(!availability.found);
        assert_eq!(availability.absence, Some(WalletAbsence::NotListed));
    }

    #[tokio::test]
    async fn test_navigation_status() {
        let page = MockPage::new().with_path("/wizard/wallet");
        assert_eq!(
            navigation_status(&page).await.unwrap().current_path,
            "/wizard/wallet"
        );
        assert!(navigation_status(&MockPage::new().with_failing_reads())
            .await
            .is_none());
    }
}
