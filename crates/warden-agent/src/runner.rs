//! Agent runner
//!
//! Stands in for the script manager that injects an agent into every page
//! load. A reload ends an agent instance; the runner waits for the next
//! load, works out which step it is on from the location path, and starts a
//! fresh agent with fresh state. The URL is the only thing carried over.

use std::sync::Arc;
use tracing::{debug, info};
use warden_core::fail_open::fail_open;
use warden_core::{Step, WardenConfig};

use crate::agent::run_agent;
use crate::clock::Clock;
use crate::mine::MineAgent;
use crate::page::Page;
use crate::probe;
use crate::state::AgentExit;
use crate::wallet::WalletAgent;

/// One finished agent instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub step: Step,
    pub exit: AgentExit,
}

pub struct Runner {
    page: Arc<dyn Page>,
    clock: Arc<dyn Clock>,
    config: WardenConfig,
}

impl Runner {
    pub fn new(page: Arc<dyn Page>, clock: Arc<dyn Clock>, config: WardenConfig) -> Self {
        Self {
            page,
            clock,
            config,
        }
    }

    /// Supervise the page forever
    pub async fn run(&self) {
        info!(
            "Watching {} and {}",
            self.config.site.wallet_path, self.config.site.mine_path
        );
        loop {
            if let Some(session) = self.run_once().await {
                info!("{} agent {}", session.step, session.exit);
            }
        }
    }

    /// Run the agent for the current page, if any
    ///
    /// Returns `None` after one poll interval when the page is still loading
    /// or belongs to no managed step.
    pub async fn run_once(&self) -> Option<Session> {
        let Some(step) = self.current_step().await else {
            self.clock.sleep(self.config.runner.poll_interval()).await;
            return None;
        };

        info!("Attaching {} agent", step);
        let exit = self.run_step(step).await;

        // Let the reload (or navigation) that ended the agent take effect
        // before the next readiness check.
        self.clock.sleep(self.config.runner.poll_interval()).await;
        Some(Session { step, exit })
    }

    /// Run one fresh agent instance for `step`
    pub async fn run_step(&self, step: Step) -> AgentExit {
        let page = Arc::clone(&self.page);
        let clock = Arc::clone(&self.clock);
        match step {
            Step::Mine => run_agent(&mut MineAgent::new(page, clock, &self.config)).await,
            Step::Wallet => run_agent(&mut WalletAgent::new(page, clock, &self.config)).await,
        }
    }

    async fn current_step(&self) -> Option<Step> {
        let ready = fail_open("readiness check", || self.page.ready())
            .await
            .unwrap_or(false);
        if !ready {
            debug!("Page still loading");
            return None;
        }

        let navigation = probe::navigation_status(self.page.as_ref()).await?;
        let step = self.config.site.step_for_path(&navigation.current_path);
        if step.is_none() {
            debug!("No agent for {}", navigation.current_path);
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::page::MockPage;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unmanaged_page_polls() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(MockPage::new().with_path("/wizard/terms"));
        let runner = Runner::new(page.clone(), clock.clone(), WardenConfig::default());

        assert_eq!(runner.run_once().await, None);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
        assert!(page.activations().is_empty());
    }

    #[tokio::test]
    async fn test_loading_page_not_attached() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(MockPage::new().with_path("/wizard/mine"));
        page.set_ready(false);
        let runner = Runner::new(page.clone(), clock.clone(), WardenConfig::default());

        assert_eq!(runner.run_once().await, None);
        assert!(!page.calls().contains(&"text_of".to_string()));
    }

    #[tokio::test]
    async fn test_attaches_wallet_agent_by_path() {
        let clock = Arc::new(ManualClock::new());
        // No wallet listed: the wallet agent's boot reloads
        let page = Arc::new(MockPage::new().with_path("/en/wizard/wallet"));
        let runner = Runner::new(page.clone(), clock.clone(), WardenConfig::default());

        let session = runner.run_once().await.unwrap();
        assert_eq!(session.step, Step::Wallet);
        assert_eq!(
            session.exit,
            AgentExit::Reloaded {
                reason: "no wallet detected".to_string()
            }
        );
        assert_eq!(page.reloads().len(), 1);
    }
}
