//! Page capability abstraction
//!
//! Agents never touch a browser directly. They read and drive the page
//! through [`Page`], which has a real implementation in `warden-browser`
//! and a scripted double, [`MockPage`], for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use warden_core::{Control, Result, WalletOption, WardenError};

use crate::clock::Clock;

/// Trait for reading and driving one page (allows mocking in tests)
///
/// Reads return raw page structure. Interpreting it (text matching, zero
/// detection, absence handling) is the job of the probes in [`crate::probe`].
#[async_trait]
pub trait Page: Send + Sync {
    /// All `<button>` controls in document order
    async fn buttons(&self) -> Result<Vec<Control>>;

    /// Text content of the first element matching a CSS selector
    async fn text_of(&self, selector: &str) -> Result<Option<String>>;

    /// First element whose trimmed, uppercased text equals `marker`,
    /// resolved to its enclosing wallet button
    async fn installed_wallet(&self, marker: &str, name_selector: &str)
        -> Result<Option<WalletOption>>;

    /// Whether the element at `selector` exists and contains `needle`
    async fn contains_text(&self, selector: &str, needle: &str) -> Result<bool>;

    /// Physically activate a control once
    async fn activate(&self, control: &Control) -> Result<()>;

    /// Current location path
    async fn current_path(&self) -> Result<String>;

    /// Whether the document has finished loading
    async fn ready(&self) -> Result<bool>;

    /// Reload the page, destroying its execution context
    async fn reload(&self) -> Result<()>;
}

/// Effect applied to a [`MockPage`] when a control is activated
#[derive(Debug, Clone)]
pub enum MockReaction {
    /// Add a button that stays hidden for `after_lookups` button scans
    Reveal {
        text: String,
        enabled: bool,
        after_lookups: usize,
    },
    /// Enable every button whose text contains the given text
    Enable(String),
    /// Change the current path
    Navigate(String),
}

#[derive(Debug, Clone)]
struct MockButton {
    text: String,
    enabled: bool,
    hidden_for: usize,
}

#[derive(Default)]
struct MockPageState {
    buttons: Vec<MockButton>,
    texts: HashMap<String, String>,
    wallet: Option<WalletOption>,
    path: String,
    ready: bool,
    fail_reads: bool,
    reactions: Vec<(String, MockReaction)>,
    activations: Vec<String>,
    reloads: Vec<Instant>,
    calls: Vec<String>,
}

/// Scripted page for testing
///
/// Records every activation, reload and read so tests can assert on what
/// an agent did and in which order.
pub struct MockPage {
    state: Mutex<MockPageState>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockPageState {
                path: "/".to_string(),
                ready: true,
                ..Default::default()
            }),
            clock: None,
        }
    }

    /// Timestamp reloads with this clock instead of real time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_button(self, text: &str, enabled: bool) -> Self {
        self.lock().buttons.push(MockButton {
            text: text.to_string(),
            enabled,
            hidden_for: 0,
        });
        self
    }

    pub fn with_text(self, selector: &str, text: &str) -> Self {
        self.set_text(selector, Some(text));
        self
    }

    pub fn with_path(self, path: &str) -> Self {
        self.set_path(path);
        self
    }

    /// Add an installed wallet entry; its button joins the button list
    pub fn with_installed_wallet(self, name: Option<&str>) -> Self {
        {
            let mut state = self.lock();
            let text = format!("{} INSTALLED", name.unwrap_or("Wallet"));
            let control = Control::new(state.buttons.len(), text.clone(), true);
            state.buttons.push(MockButton {
                text,
                enabled: true,
                hidden_for: 0,
            });
            state.wallet = Some(WalletOption {
                control,
                name: name.map(str::to_string),
            });
        }
        self
    }

    /// React when a control whose text contains `trigger` is activated
    pub fn on_activate(self, trigger: &str, reaction: MockReaction) -> Self {
        self.lock()
            .reactions
            .push((trigger.to_lowercase(), reaction));
        self
    }

    /// Make every read fail like a dead driver connection
    pub fn with_failing_reads(self) -> Self {
        self.lock().fail_reads = true;
        self
    }

    pub fn set_path(&self, path: &str) {
        self.lock().path = path.to_string();
    }

    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    pub fn set_text(&self, selector: &str, text: Option<&str>) {
        let mut state = self.lock();
        match text {
            Some(text) => state.texts.insert(selector.to_string(), text.to_string()),
            None => state.texts.remove(selector),
        };
    }

    pub fn remove_button(&self, text: &str) {
        let needle = text.to_lowercase();
        self.lock()
            .buttons
            .retain(|b| !b.text.to_lowercase().contains(&needle));
    }

    /// Texts of activated controls, in order
    pub fn activations(&self) -> Vec<String> {
        self.lock().activations.clone()
    }

    pub fn activation_count(&self, text: &str) -> usize {
        let needle = text.to_lowercase();
        self.lock()
            .activations
            .iter()
            .filter(|a| a.to_lowercase().contains(&needle))
            .count()
    }

    /// When each reload happened
    pub fn reloads(&self) -> Vec<Instant> {
        self.lock().reloads.clone()
    }

    /// Every trait method called, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockPageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self, call: &str) -> Result<MutexGuard<'_, MockPageState>> {
        let mut state = self.lock();
        state.calls.push(call.to_string());
        if state.fail_reads {
            return Err(WardenError::Browser(format!("mock read failed: {}", call)));
        }
        Ok(state)
    }

    fn now(&self) -> Instant {
        match &self.clock {
            Some(clock) => clock.now(),
            None => Instant::now(),
        }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn buttons(&self) -> Result<Vec<Control>> {
        let mut state = self.read("buttons")?;
        let visible: Vec<Control> = state
            .buttons
            .iter()
            .filter(|b| b.hidden_for == 0)
            .enumerate()
            .map(|(index, b)| Control::new(index, b.text.clone(), b.enabled))
            .collect();
        for button in state.buttons.iter_mut().filter(|b| b.hidden_for > 0) {
            button.hidden_for -= 1;
        }
        Ok(visible)
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let state = self.read("text_of")?;
        Ok(state.texts.get(selector).cloned())
    }

    async fn installed_wallet(
        &self,
        _marker: &str,
        _name_selector: &str,
    ) -> Result<Option<WalletOption>> {
        let state = self.read("installed_wallet")?;
        Ok(state.wallet.clone())
    }

    async fn contains_text(&self, selector: &str, needle: &str) -> Result<bool> {
        let state = self.read("contains_text")?;
        Ok(state
            .texts
            .get(selector)
            .map(|text| text.contains(needle))
            .unwrap_or(false))
    }

    async fn activate(&self, control: &Control) -> Result<()> {
        let mut state = self.lock();
        state.calls.push("activate".to_string());
        state.activations.push(control.text.clone());

        let text = control.text.to_lowercase();
        let reactions: Vec<MockReaction> = state
            .reactions
            .iter()
            .filter(|(trigger, _)| text.contains(trigger.as_str()))
            .map(|(_, reaction)| reaction.clone())
            .collect();

        for reaction in reactions {
            match reaction {
                MockReaction::Reveal {
                    text,
                    enabled,
                    after_lookups,
                } => state.buttons.push(MockButton {
                    text,
                    enabled,
                    hidden_for: after_lookups,
                }),
                MockReaction::Enable(target) => {
                    let target = target.to_lowercase();
                    for button in state
                        .buttons
                        .iter_mut()
                        .filter(|b| b.text.to_lowercase().contains(&target))
                    {
                        button.enabled = true;
                    }
                }
                MockReaction::Navigate(path) => state.path = path,
            }
        }
        Ok(())
    }

    async fn current_path(&self) -> Result<String> {
        let state = self.read("current_path")?;
        Ok(state.path.clone())
    }

    async fn ready(&self) -> Result<bool> {
        let state = self.read("ready")?;
        Ok(state.ready)
    }

    async fn reload(&self) -> Result<()> {
        let now = self.now();
        let mut state = self.lock();
        state.calls.push("reload".to_string());
        state.reloads.push(now);
        Ok(())
    }
}
