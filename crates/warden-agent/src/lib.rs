//! # warden-agent
//!
//! State-detection-and-recovery automata for the two agent steps.
//!
//! An agent samples imprecise, possibly-absent signals from a page it does
//! not control and turns them into a bounded sequence of corrective actions:
//! click a control and confirm it took, wait for the next tick, or reload.
//!
//! ## Building blocks
//!
//! - [`probe`]: read-only page conditions; absence is a value
//! - [`action`]: trigger a control once, then poll its postcondition
//! - [`ReloadGuard`]: the only path to a reload, rate limited
//! - [`HeartbeatHandle`]: the recurring supervisory tick
//! - [`HandoffDetector`]: wallet step noticing it reached the mining step
//!
//! ## Agents
//!
//! - [`MineAgent`]: keeps a started mining session alive
//! - [`WalletAgent`]: drives wallet onboarding and hands off to mining
//! - [`Runner`]: attaches a fresh agent to every page load

pub mod action;
mod agent;
pub mod clock;
mod handoff;
mod heartbeat;
mod mine;
pub mod page;
pub mod probe;
mod reload_guard;
mod runner;
mod state;
mod wallet;

pub use action::{trigger_and_confirm, trigger_once, Action, ConfirmPolicy, Locator, Postcondition};
pub use agent::{run_agent, Agent};
pub use clock::{Clock, ManualClock, TokioClock};
pub use handoff::{Handoff, HandoffDetector};
pub use heartbeat::HeartbeatHandle;
pub use mine::{MineAgent, STALLED_SESSION};
pub use page::{MockPage, MockReaction, Page};
pub use reload_guard::ReloadGuard;
pub use runner::{Runner, Session};
pub use state::{AgentExit, AgentState, TickOutcome};
pub use wallet::{WalletAgent, NO_WALLET_DETECTED};
