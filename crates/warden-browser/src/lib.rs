//! Browser driver for warden agents
//!
//! Connects to (or launches) Chrome over the DevTools Protocol and exposes
//! the tab as a [`warden_agent::Page`], so the same agents that run against
//! [`warden_agent::MockPage`] in tests drive the live wizard.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_agent::{Runner, TokioClock};
//! use warden_browser::{BrowserConfig, BrowserSession, CdpPage};
//! use warden_core::WardenConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WardenConfig::default();
//!     let session = BrowserSession::connect(
//!         "ws://127.0.0.1:9222/devtools/browser/<id>",
//!         &config.site.base_url,
//!         &BrowserConfig::default(),
//!     )
//!     .await?;
//!
//!     let page = Arc::new(CdpPage::new(Arc::new(session)));
//!     Runner::new(page, Arc::new(TokioClock), config).run().await;
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod page;

pub use browser::{BrowserConfig, BrowserSession};
pub use page::CdpPage;
