//! Per-agent volatile state
//!
//! One `AgentState` exists per agent instance, which is one page load. A
//! reload discards it; the next instance starts from scratch.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use warden_core::Step;

use crate::clock::Clock;
use crate::heartbeat::HeartbeatHandle;
use crate::reload_guard::ReloadGuard;

/// Mutable state of one agent instance
#[derive(Debug)]
pub struct AgentState {
    instance_id: Uuid,
    step: Step,
    guard: ReloadGuard,
    heartbeat_count: u64,
    initial_run_complete: bool,
    heartbeat: Option<HeartbeatHandle>,
}

impl AgentState {
    pub fn new(step: Step, reload_guard_interval: Duration) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            step,
            guard: ReloadGuard::new(reload_guard_interval),
            heartbeat_count: 0,
            initial_run_complete: false,
            heartbeat: None,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn last_reload_at(&self) -> Option<Instant> {
        self.guard.last_reload_at()
    }

    pub fn guard(&self) -> &ReloadGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut ReloadGuard {
        &mut self.guard
    }

    pub fn heartbeat_count(&self) -> u64 {
        self.heartbeat_count
    }

    /// Count a tick and return its ordinal
    pub fn next_tick(&mut self) -> u64 {
        self.heartbeat_count += 1;
        self.heartbeat_count
    }

    pub fn initial_run_complete(&self) -> bool {
        self.initial_run_complete
    }

    /// Latch the boot sequence as done
    ///
    /// Returns `true` only on the first call.
    pub fn mark_initial_run_complete(&mut self) -> bool {
        !std::mem::replace(&mut self.initial_run_complete, true)
    }

    /// Arm the heartbeat; a second call keeps the existing handle
    pub fn arm_heartbeat(&mut self, armed_at: Instant, period: Duration) -> bool {
        if self.heartbeat.is_some() {
            return false;
        }
        self.heartbeat = Some(HeartbeatHandle::arm(armed_at, period));
        true
    }

    pub fn heartbeat_active(&self) -> bool {
        self.heartbeat
            .as_ref()
            .map(|h| !h.is_cancelled())
            .unwrap_or(false)
    }

    /// Cancel the heartbeat; a no-op if absent or already cancelled
    pub fn cancel_heartbeat(&mut self) -> bool {
        self.heartbeat
            .as_mut()
            .map(HeartbeatHandle::cancel)
            .unwrap_or(false)
    }

    /// Wait for the next heartbeat tick; `false` if there is none to wait for
    pub async fn wait_heartbeat(&mut self, clock: &dyn Clock) -> bool {
        match self.heartbeat.as_mut() {
            Some(heartbeat) => heartbeat.wait_next(clock).await,
            None => false,
        }
    }
}

/// Result of a boot sequence or a heartbeat tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing terminal happened; wait for the next tick
    Continue,
    /// The page was reloaded and this instance is finished
    Reloaded { reason: String },
    /// The next step was reached and its reload is scheduled
    HandedOff,
    /// The page moved to a step this agent does not manage
    Yielded,
}

impl TickOutcome {
    /// The exit this outcome ends the agent with, if it is terminal
    pub fn into_exit(self) -> Option<AgentExit> {
        match self {
            TickOutcome::Continue => None,
            TickOutcome::Reloaded { reason } => Some(AgentExit::Reloaded { reason }),
            TickOutcome::HandedOff => Some(AgentExit::HandedOff),
            TickOutcome::Yielded => Some(AgentExit::Yielded),
        }
    }
}

/// Why an agent instance stopped running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentExit {
    Reloaded { reason: String },
    HandedOff,
    Yielded,
    /// The heartbeat was cancelled without a terminal outcome
    Stopped,
}

impl fmt::Display for AgentExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentExit::Reloaded { reason } => write!(f, "reloaded ({})", reason),
            AgentExit::HandedOff => write!(f, "handed off"),
            AgentExit::Yielded => write!(f, "yielded"),
            AgentExit::Stopped => write!(f, "stopped"),
        }
    }
}
