//! Agent lifecycle shared by every step
//!
//! Lifecycle of one agent instance (one page load):
//! 1. Wait the boot grace delay so the page can settle
//! 2. Run the boot sequence once
//! 3. Arm the heartbeat, due one period after the grace delay ended
//! 4. Tick until a tick ends the instance (reload, handoff, yield)
//!
//! Everything runs in a single task, so boot and ticks never overlap.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use warden_core::AgentTimings;

use crate::clock::Clock;
use crate::state::{AgentExit, AgentState, TickOutcome};

/// One step's automaton
#[async_trait]
pub trait Agent: Send {
    fn state(&self) -> &AgentState;

    fn state_mut(&mut self) -> &mut AgentState;

    fn clock(&self) -> &Arc<dyn Clock>;

    fn timings(&self) -> AgentTimings;

    /// One-time initial check; later calls are no-ops
    async fn boot(&mut self) -> TickOutcome;

    /// One heartbeat tick
    async fn tick(&mut self) -> TickOutcome;

    /// Last chance to finish scheduled work before the instance ends
    async fn finish(&mut self, exit: AgentExit) -> AgentExit {
        exit
    }
}

/// Drive an agent through its whole lifecycle
pub async fn run_agent<A: Agent + ?Sized>(agent: &mut A) -> AgentExit {
    let span = info_span!(
        "agent",
        step = %agent.state().step(),
        id = %agent.state().instance_id()
    );

    async move {
        let clock = Arc::clone(agent.clock());
        let timings = agent.timings();

        info!("Page loaded, first check in {:?}", timings.boot_grace);
        clock.sleep(timings.boot_grace).await;
        let armed_at = clock.now();

        if let Some(exit) = agent.boot().await.into_exit() {
            return agent.finish(exit).await;
        }

        agent.state_mut().arm_heartbeat(armed_at, timings.heartbeat);
        info!("Heartbeat armed ({:?} period)", timings.heartbeat);

        while agent.state_mut().wait_heartbeat(clock.as_ref()).await {
            if let Some(exit) = agent.tick().await.into_exit() {
                let exit = agent.finish(exit).await;
                info!("Agent finished: {}", exit);
                return exit;
            }
        }

        agent.finish(AgentExit::Stopped).await
    }
    .instrument(span)
    .await
}
