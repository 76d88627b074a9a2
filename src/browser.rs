//! Browser launch planning and the page-session contract.
//!
//! This module turns the environment-adaptation flags from the configuration
//! into a concrete launch specification, and defines the small capability set
//! the Page Stabilizer requires from a browser engine. Any engine that can
//! navigate, evaluate two scripts, serialize its DOM, and close itself is
//! substitutable here.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CheckerConfig;

/// Error surfaced by a browser session. Any variant aborts the whole
/// stabilization pass; there is no retry at this layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("failed to retrieve page markup: {0}")]
    Content(String),
    #[error("failed to close browser session: {0}")]
    Close(String),
}

/// Concrete launch parameters resolved from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// Resolve the configuration's environment-adaptation flags into an
    /// argument list. These flags exist for containerized environments, not
    /// as algorithmic choices, which is why they stay configurable.
    pub fn from_config(config: &CheckerConfig) -> Self {
        let mut args = Vec::new();
        if config.disable_gpu {
            args.push("--disable-gpu".to_string());
        }
        if config.no_sandbox {
            args.push("--no-sandbox".to_string());
        }
        if config.disable_dev_shm {
            args.push("--disable-dev-shm-usage".to_string());
        }
        args.extend(config.extra_browser_args.iter().cloned());

        LaunchSpec {
            chrome_executable: config.chrome_executable.clone(),
            headless: config.headless,
            args,
        }
    }
}

/// Capability contract the Stabilizer requires from a browser session.
///
/// One session maps to one page load; sessions are never reused across
/// invocations.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to an absolute URL and wait for initial document readiness.
    /// Malformed URLs are a caller error, not handled here.
    async fn goto(&self, url: &str) -> Result<(), SessionError>;

    /// Current scrollable content height of the document.
    async fn content_height(&self) -> Result<i64, SessionError>;

    /// Scroll to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), SessionError>;

    /// Fully rendered markup.
    async fn content(&self) -> Result<String, SessionError>;

    /// Release the session. Must be called on every exit path.
    async fn close(&self) -> Result<(), SessionError>;
}

#[async_trait]
impl<S: PageSession> PageSession for Arc<S> {
    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        (**self).goto(url).await
    }

    async fn content_height(&self) -> Result<i64, SessionError> {
        (**self).content_height().await
    }

    async fn scroll_to_bottom(&self) -> Result<(), SessionError> {
        (**self).scroll_to_bottom().await
    }

    async fn content(&self) -> Result<String, SessionError> {
        (**self).content().await
    }

    async fn close(&self) -> Result<(), SessionError> {
        (**self).close().await
    }
}

/// Opens fresh [`PageSession`]s from a launch specification.
#[async_trait]
pub trait BrowserRuntime: Send + Sync {
    type Session: PageSession;

    async fn open(&self, spec: &LaunchSpec) -> Result<Self::Session, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_spec_carries_container_flags_by_default() {
        let spec = LaunchSpec::from_config(&CheckerConfig::default());
        assert!(spec.headless);
        assert!(spec.chrome_executable.is_none());
        assert_eq!(
            spec.args,
            vec![
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ]
        );
    }

    #[test]
    fn launch_spec_honours_disabled_flags_and_extras() {
        let mut config = CheckerConfig::default();
        config.disable_gpu = false;
        config.no_sandbox = false;
        config.disable_dev_shm = false;
        config.headless = false;
        config.chrome_executable = Some(PathBuf::from("/usr/bin/chromium"));
        config.extra_browser_args = vec!["--lang=ja".to_string()];

        let spec = LaunchSpec::from_config(&config);
        assert!(!spec.headless);
        assert_eq!(
            spec.chrome_executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
        assert_eq!(spec.args, vec!["--lang=ja".to_string()]);
    }
}
