//! Chromiumoxide-backed browser runtime.
//!
//! Implements [`BrowserRuntime`](crate::browser::BrowserRuntime) and
//! [`PageSession`](crate::browser::PageSession) on top of the `chromiumoxide`
//! crate: every `open` launches a dedicated local Chromium, spawns its CDP
//! handler task, and hands back a session whose `close` tears the whole
//! process down again. Sessions are deliberately not pooled; the pipeline is
//! one page load per invocation.

use std::sync::Mutex;

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    page::Page as ChromiumPage,
};
use futures_util::StreamExt;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;

use crate::browser::{BrowserRuntime, LaunchSpec, PageSession, SessionError};

const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Launches one Chromium process per session.
#[derive(Debug, Default)]
pub struct ChromiumRuntime;

impl ChromiumRuntime {
    pub fn new() -> Self {
        Self
    }
}

struct SessionState {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// A single page in a dedicated Chromium process.
pub struct ChromiumSession {
    page: ChromiumPage,
    state: Mutex<Option<SessionState>>,
}

#[async_trait]
impl BrowserRuntime for ChromiumRuntime {
    type Session = ChromiumSession;

    async fn open(&self, spec: &LaunchSpec) -> Result<ChromiumSession, SessionError> {
        let config = build_config(spec)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|err| SessionError::Launch(err.to_string()))?;
        let handler = spawn_handler(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                drop(browser);
                return Err(SessionError::Launch(err.to_string()));
            }
        };

        Ok(ChromiumSession {
            page,
            state: Mutex::new(Some(SessionState { browser, handler })),
        })
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map_err(|err| SessionError::Navigation(err.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|err| SessionError::Navigation(err.to_string()))?;
        Ok(())
    }

    async fn content_height(&self) -> Result<i64, SessionError> {
        let result = self
            .page
            .evaluate(HEIGHT_SCRIPT)
            .await
            .map_err(|err| SessionError::Script(err.to_string()))?;

        result
            .value()
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| SessionError::Script("height script returned no number".to_string()))
    }

    async fn scroll_to_bottom(&self) -> Result<(), SessionError> {
        self.page
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(|err| SessionError::Script(err.to_string()))?;
        Ok(())
    }

    async fn content(&self) -> Result<String, SessionError> {
        self.page
            .content()
            .await
            .map_err(|err| SessionError::Content(err.to_string()))
    }

    async fn close(&self) -> Result<(), SessionError> {
        let state = {
            let mut guard = self
                .state
                .lock()
                .map_err(|_| SessionError::Close("session state lock poisoned".to_string()))?;
            guard.take()
        };

        // Idempotent: a second close is a no-op.
        if let Some(state) = state {
            state.handler.abort();
            drop(state.browser);
        }
        Ok(())
    }
}

fn build_config(spec: &LaunchSpec) -> Result<BrowserConfig, SessionError> {
    let mut builder = BrowserConfig::builder();

    if let Some(path) = &spec.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    let builder = builder.args(spec.args.clone());

    let builder = if spec.headless {
        builder
    } else {
        builder.with_head()
    };

    builder.build().map_err(SessionError::Launch)
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                eprintln!("chromiumoxide handler error: {err}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn build_config_accepts_explicit_executable() {
        let spec = LaunchSpec {
            chrome_executable: Some(PathBuf::from("/opt/chrome/chrome")),
            headless: true,
            args: vec!["--no-sandbox".to_string()],
        };
        build_config(&spec).expect("config should build without probing the binary");
    }

    #[test]
    fn scripts_match_the_stabilization_contract() {
        // The stabilizer's height-equality check depends on both scripts
        // addressing document.body.
        assert!(HEIGHT_SCRIPT.contains("scrollHeight"));
        assert!(SCROLL_SCRIPT.contains("scrollTo"));
    }
}
