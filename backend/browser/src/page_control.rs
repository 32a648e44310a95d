//! Page Control Actions
//!
//! Navigation, typing and script evaluation inside the active tab.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cdp_client::CdpClient;

#[derive(Clone)]
pub struct PageControl {
    client: Arc<CdpClient>,
}

impl PageControl {
    pub fn new(client: Arc<CdpClient>) -> Self {
        Self { client }
    }

    /// Turns on the protocol domains the session relies on.
    pub async fn enable(&self) -> Result<()> {
        for domain in ["Page.enable", "Runtime.enable", "Network.enable"] {
            self.client.send_command(domain, json!({})).await?;
        }
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        info!(url = %url, "Navigating browser tab");
        let reply = self
            .client
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(error) = reply["errorText"].as_str() {
            bail!("Navigation to {url} failed: {error}");
        }
        Ok(())
    }

    /// Focuses the first element matching `selector` and inserts `text` as if typed.
    pub async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let focus = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
            js_string(selector)
        );
        if self.evaluate(&focus).await? != Value::Bool(true) {
            bail!("No element matches {selector}");
        }
        debug!(selector, chars = text.chars().count(), "Typing into element");
        self.client
            .send_command("Input.insertText", json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn press_enter(&self) -> Result<()> {
        for kind in ["keyDown", "keyUp"] {
            let mut params = json!({
                "type": kind,
                "key": "Enter",
                "code": "Enter",
                "windowsVirtualKeyCode": 13,
            });
            if kind == "keyDown" {
                params["text"] = json!("\r");
            }
            self.client.send_command("Input.dispatchKeyEvent", params).await?;
        }
        Ok(())
    }

    /// Evaluates an expression in the page, awaiting promises, and returns its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        debug!(len = expression.len(), "Evaluating script");
        let reply = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        script_value(reply)
    }
}

/// Renders `s` as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn script_value(mut reply: Value) -> Result<Value> {
    if let Some(details) = reply.get("exceptionDetails") {
        let message = details["exception"]["description"]
            .as_str()
            .or_else(|| details["text"].as_str())
            .unwrap_or("unknown exception");
        bail!("Script threw: {message}");
    }
    Ok(reply["result"]["value"].take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"input[name="user[email]"]"#), r#""input[name=\"user[email]\"]""#);
    }

    #[test]
    fn script_value_unwraps_result() {
        let reply = json!({"result": {"type": "number", "value": 201}});
        assert_eq!(script_value(reply).unwrap(), json!(201));
    }

    #[test]
    fn script_value_without_value_is_null() {
        let reply = json!({"result": {"type": "undefined"}});
        assert_eq!(script_value(reply).unwrap(), Value::Null);
    }

    #[test]
    fn script_exception_becomes_error() {
        let reply = json!({
            "result": {"type": "object"},
            "exceptionDetails": {"text": "Uncaught", "exception": {"description": "TypeError: x is null"}}
        });
        let err = script_value(reply).unwrap_err();
        assert!(err.to_string().contains("TypeError: x is null"));
    }
}
