//! [`Page`] implementation over a DevTools tab
//!
//! Every read is a small script evaluated in the page. Scripts return JSON
//! strings so the result crosses the protocol as a single primitive value.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use warden_agent::Page;
use warden_core::{Control, Result, WalletOption, WardenError};

use crate::browser::BrowserSession;

const BUTTONS_SCRIPT: &str = r#"
(() => JSON.stringify(Array.from(document.querySelectorAll('button')).map((b, index) => ({
    index,
    text: (b.innerText || b.textContent || '').trim(),
    enabled: !b.disabled,
}))))()
"#;

/// Quote a value as a JavaScript string literal
fn js_str(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn parse_json<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    match value {
        Value::String(json) => Ok(serde_json::from_str(&json)?),
        other => Err(WardenError::Browser(format!(
            "Unexpected {} result: {}",
            what, other
        ))),
    }
}

/// A [`Page`] backed by a live browser tab
pub struct CdpPage {
    session: Arc<BrowserSession>,
}

impl CdpPage {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn buttons(&self) -> Result<Vec<Control>> {
        let value = self.session.evaluate_script(BUTTONS_SCRIPT).await?;
        parse_json(value, "button scan")
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                return JSON.stringify(el ? (el.textContent || '').trim() : null);
            }})()"#,
            sel = js_str(selector)?
        );
        let value = self.session.evaluate_script(&script).await?;
        parse_json(value, "text lookup")
    }

    async fn installed_wallet(
        &self,
        marker: &str,
        name_selector: &str,
    ) -> Result<Option<WalletOption>> {
        let script = format!(
            r#"(() => {{
                const marker = {marker};
                const hit = Array.from(document.querySelectorAll('*')).find(
                    el => (el.textContent || '').trim().toUpperCase() === marker
                );
                if (!hit) return JSON.stringify(null);
                const button = hit.closest('button[type="button"]');
                if (!button) return JSON.stringify(null);
                const index = Array.from(document.querySelectorAll('button')).indexOf(button);
                const nameEl = button.querySelector({name});
                const name = nameEl ? (nameEl.textContent || '').trim() : '';
                return JSON.stringify({{
                    control: {{
                        index,
                        text: (button.innerText || button.textContent || '').trim(),
                        enabled: !button.disabled,
                    }},
                    name: name.length > 0 ? name : null,
                }});
            }})()"#,
            marker = js_str(&marker.to_uppercase())?,
            name = js_str(name_selector)?
        );
        let value = self.session.evaluate_script(&script).await?;
        parse_json(value, "wallet lookup")
    }

    async fn contains_text(&self, selector: &str, needle: &str) -> Result<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                return JSON.stringify(!!el && (el.textContent || '').includes({needle}));
            }})()"#,
            sel = js_str(selector)?,
            needle = js_str(needle)?
        );
        let value = self.session.evaluate_script(&script).await?;
        parse_json(value, "text match")
    }

    /// Click the button at `control.index`
    ///
    /// The button's text is checked first so a re-render between lookup and
    /// click cannot redirect the click to a different control.
    async fn activate(&self, control: &Control) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const b = document.querySelectorAll('button')[{index}];
                if (!b) return JSON.stringify('missing');
                if ((b.innerText || b.textContent || '').trim() !== {text}) {{
                    return JSON.stringify('moved');
                }}
                b.click();
                return JSON.stringify('clicked');
            }})()"#,
            index = control.index,
            text = js_str(&control.text)?
        );
        let value = self.session.evaluate_script(&script).await?;
        let status: String = parse_json(value, "click")?;
        debug!("Click on '{}' (#{}): {}", control.text, control.index, status);

        match status.as_str() {
            "clicked" => Ok(()),
            _ => Err(WardenError::StructureMissing(format!(
                "button '{}' no longer at index {}",
                control.text, control.index
            ))),
        }
    }

    async fn current_path(&self) -> Result<String> {
        let value = self
            .session
            .evaluate_script("JSON.stringify(window.location.pathname)")
            .await?;
        parse_json(value, "location")
    }

    async fn ready(&self) -> Result<bool> {
        let value = self
            .session
            .evaluate_script("JSON.stringify(document.readyState === 'complete')")
            .await?;
        parse_json(value, "readiness")
    }

    async fn reload(&self) -> Result<()> {
        // Deferred so the evaluation returns before the context is torn down
        self.session
            .evaluate_script("setTimeout(() => window.location.reload(), 0); true")
            .await?;
        Ok(())
    }
}
