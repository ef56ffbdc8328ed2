//! Browser lifecycle management using Chrome DevTools Protocol

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use warden_core::{Result, WardenError};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: false, wallets need a real profile)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// How long the DevTools connection may stay silent before it is
    /// considered dead. Must comfortably exceed the longest heartbeat.
    pub idle_timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1280,
            window_height: 900,
            idle_timeout_seconds: 3600,
        }
    }
}

/// Browser session bound to one tab
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Tab the agents drive
    tab: Arc<Tab>,
}

/// Run a blocking DevTools call on the blocking pool
///
/// The headless_chrome client waits on its websocket synchronously, so every
/// call that talks to the browser goes through here.
async fn run_blocking<T, E, F>(what: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| WardenError::Browser(format!("{} task failed: {}", what, e)))?
        .map_err(|e| WardenError::Browser(format!("{}: {}", what, e)))
}

impl BrowserSession {
    /// Launch a new browser instance
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .build()
            .map_err(|e| WardenError::Browser(format!("Failed to launch browser: {}", e)))?;

        let browser = run_blocking("Failed to launch browser", move || {
            Browser::new(launch_options)
        })
        .await?;

        let handle = browser.clone();
        let tab = run_blocking("Failed to create tab", move || handle.new_tab()).await?;

        info!("Browser launched successfully");

        Ok(Self { browser, tab })
    }

    /// Connect to an existing browser and attach to the tab showing `site`
    ///
    /// # Arguments
    /// * `ws_url` - DevTools websocket URL, as printed by
    ///   `chrome --remote-debugging-port=9222`
    /// * `site` - URL prefix of the tab to attach to; a new tab is opened if
    ///   none matches
    pub async fn connect(ws_url: &str, site: &str, config: &BrowserConfig) -> Result<Self> {
        info!("Connecting to existing browser at {}", ws_url);

        let ws_url = ws_url.to_string();
        let idle_timeout = Duration::from_secs(config.idle_timeout_seconds);
        let browser = run_blocking("Failed to connect to browser", move || {
            Browser::connect_with_timeout(ws_url, idle_timeout)
        })
        .await?;

        let existing = {
            let tabs = browser
                .get_tabs()
                .lock()
                .map_err(|e| WardenError::Browser(format!("Tab list unavailable: {}", e)))?;
            tabs.iter().find(|t| t.get_url().starts_with(site)).cloned()
        };

        let tab = match existing {
            Some(tab) => {
                info!("Attached to open tab {}", tab.get_url());
                tab
            }
            None => {
                info!("No open tab on {}, opening one", site);
                let handle = browser.clone();
                run_blocking("Failed to create tab", move || handle.new_tab()).await?
            }
        };

        Ok(Self { browser, tab })
    }

    /// Navigate to a URL and wait for the load to finish
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        run_blocking("Navigation failed", move || {
            tab.navigate_to(&target)?.wait_until_navigated().map(|_| ())
        })
        .await?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    /// Execute JavaScript in the page context
    ///
    /// The DevTools client is blocking, so evaluation runs on the blocking
    /// pool.
    ///
    /// # Returns
    /// JSON result from JavaScript execution
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript ({} bytes)", script.len());

        let tab = Arc::clone(&self.tab);
        let script = script.to_string();
        let result = run_blocking("JavaScript evaluation failed", move || {
            tab.evaluate(&script, false)
        })
        .await?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Get the current URL
    pub fn url(&self) -> String {
        self.tab.get_url()
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(!config.headless);
        assert_eq!(config.window_width, 1280);
        assert!(config.idle_timeout_seconds > 600);
    }

    #[tokio::test]
    async fn test_run_blocking_leaves_runtime_thread() {
        let caller = std::thread::current().id();
        let worker = run_blocking("noop", move || {
            Ok::<_, String>(std::thread::current().id())
        })
        .await
        .unwrap();
        assert_ne!(worker, caller);
    }

    #[tokio::test]
    async fn test_run_blocking_maps_errors() {
        let result: Result<()> =
            run_blocking("Failed to connect to browser", || Err("refused")).await;
        match result {
            Err(WardenError::Browser(msg)) => {
                assert_eq!(msg, "Failed to connect to browser: refused")
            }
            other => panic!("expected browser error, got {:?}", other),
        }
    }
}
