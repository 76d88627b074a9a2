//! Page Stabilizer: drive a page to a stable, fully-rendered state.
//!
//! Pages that lazily load content as the user scrolls only reach their final
//! DOM after repeated scroll-to-bottom commands. The stabilizer scrolls,
//! pauses for a settle interval, and re-reads the scrollable content height
//! until two consecutive reads agree. Infinite-scroll pages never agree, so
//! the loop is bounded by a round budget and a wall-clock deadline; hitting
//! either returns the partial page with a non-settled outcome instead of
//! hanging.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{self, Instant};

use crate::browser::{BrowserRuntime, LaunchSpec, PageSession, SessionError};
use crate::config::CheckerConfig;
use crate::logging::CheckerLogger;

/// How the stabilization loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleOutcome {
    /// Two consecutive height reads, separated by the settle delay, agreed.
    Settled,
    /// The round budget ran out first; the page was still growing.
    RoundBudgetExhausted,
    /// The wall-clock deadline passed first.
    DeadlineExpired,
}

impl SettleOutcome {
    pub fn is_settled(self) -> bool {
        matches!(self, SettleOutcome::Settled)
    }
}

/// The stabilized DOM serialization. Produced once per invocation, immutable
/// thereafter, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    /// Scroll rounds performed before snapshotting.
    pub rounds: u32,
    pub outcome: SettleOutcome,
}

/// Browser-layer failure during stabilization. Fatal for the invocation;
/// retrying the whole fetch is the caller's decision.
#[derive(Debug, Error)]
pub enum StabilizeError {
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Drives a [`BrowserRuntime`] through the scroll-stabilization loop.
pub struct Stabilizer<R: BrowserRuntime> {
    runtime: R,
    spec: LaunchSpec,
    settle_delay: Duration,
    max_rounds: u32,
    deadline: Duration,
    logger: Arc<CheckerLogger>,
}

impl<R: BrowserRuntime> Stabilizer<R> {
    pub fn new(config: &CheckerConfig, runtime: R, logger: Arc<CheckerLogger>) -> Self {
        Self {
            runtime,
            spec: LaunchSpec::from_config(config),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            max_rounds: config.max_scroll_rounds,
            deadline: Duration::from_millis(config.stabilize_timeout_ms),
            logger,
        }
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Load `url`, expand its lazily-loaded content, and snapshot the markup.
    ///
    /// The session is closed on every exit path; on failure the first error
    /// wins and the close result is discarded.
    pub async fn fetch(&self, url: &str) -> Result<RenderedPage, StabilizeError> {
        let session = self.runtime.open(&self.spec).await?;
        let result = self.drive(&session, url).await;
        let close_result = session.close().await;

        let page = result?;
        close_result?;
        Ok(page)
    }

    async fn drive(
        &self,
        session: &R::Session,
        url: &str,
    ) -> Result<RenderedPage, StabilizeError> {
        self.logger
            .info(format!("Loading {url}"), Some("stabilize"), None);
        session.goto(url).await?;

        let started = Instant::now();
        let mut last_height = session.content_height().await?;
        let mut rounds = 0u32;

        let outcome = loop {
            if rounds >= self.max_rounds {
                self.logger.info(
                    format!("Round budget of {} exhausted; accepting partial page", rounds),
                    Some("stabilize"),
                    None,
                );
                break SettleOutcome::RoundBudgetExhausted;
            }
            if started.elapsed() >= self.deadline {
                self.logger.info(
                    "Stabilization deadline expired; accepting partial page",
                    Some("stabilize"),
                    None,
                );
                break SettleOutcome::DeadlineExpired;
            }

            session.scroll_to_bottom().await?;
            time::sleep(self.settle_delay).await;

            let height = session.content_height().await?;
            rounds += 1;

            if height == last_height {
                break SettleOutcome::Settled;
            }
            self.logger.debug(
                format!("content height grew {last_height} -> {height}"),
                Some("stabilize"),
                None,
            );
            last_height = height;
        };

        let html = session.content().await?;
        self.logger.info(
            format!(
                "Snapshot after {} round(s), {} bytes of markup",
                rounds,
                html.len()
            ),
            Some("stabilize"),
            None,
        );

        Ok(RenderedPage {
            html,
            rounds,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Session double replaying a scripted sequence of height reads.
    #[derive(Default)]
    struct ScriptedSession {
        heights: Mutex<VecDeque<i64>>,
        html: String,
        fail_goto: bool,
        fail_height: bool,
        height_reads: AtomicUsize,
        scrolls: AtomicUsize,
        closes: AtomicUsize,
    }

    impl ScriptedSession {
        fn with_heights(heights: &[i64]) -> Self {
            ScriptedSession {
                heights: Mutex::new(heights.iter().copied().collect()),
                html: "<html><body><img src=\"hero.png\"></body></html>".to_string(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PageSession for ScriptedSession {
        async fn goto(&self, _url: &str) -> Result<(), SessionError> {
            if self.fail_goto {
                return Err(SessionError::Navigation("net::ERR_FAILED".to_string()));
            }
            Ok(())
        }

        async fn content_height(&self) -> Result<i64, SessionError> {
            if self.fail_height {
                return Err(SessionError::Script("context destroyed".to_string()));
            }
            self.height_reads.fetch_add(1, Ordering::SeqCst);
            let mut heights = self.heights.lock().unwrap();
            let front = *heights.front().expect("scripted heights exhausted");
            if heights.len() > 1 {
                heights.pop_front();
            }
            Ok(front)
        }

        async fn scroll_to_bottom(&self) -> Result<(), SessionError> {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn content(&self) -> Result<String, SessionError> {
            Ok(self.html.clone())
        }

        async fn close(&self) -> Result<(), SessionError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ScriptedRuntime {
        session: Arc<ScriptedSession>,
    }

    #[async_trait]
    impl BrowserRuntime for ScriptedRuntime {
        type Session = Arc<ScriptedSession>;

        async fn open(&self, _spec: &LaunchSpec) -> Result<Arc<ScriptedSession>, SessionError> {
            Ok(Arc::clone(&self.session))
        }
    }

    fn fast_config() -> CheckerConfig {
        let mut config = CheckerConfig::default();
        config.settle_delay_ms = 0;
        config
    }

    fn stabilizer_for(
        config: &CheckerConfig,
        session: Arc<ScriptedSession>,
    ) -> Stabilizer<ScriptedRuntime> {
        Stabilizer::new(
            config,
            ScriptedRuntime { session },
            Arc::new(CheckerLogger::new(Verbosity::Minimal)),
        )
    }

    #[tokio::test]
    async fn settles_with_exactly_k_plus_one_height_reads() {
        // Heights become constant after two scrolls.
        let session = Arc::new(ScriptedSession::with_heights(&[100, 150, 150]));
        let stabilizer = stabilizer_for(&fast_config(), Arc::clone(&session));

        let page = stabilizer.fetch("https://example.com/").await.expect("fetch");

        assert_eq!(page.outcome, SettleOutcome::Settled);
        assert_eq!(page.rounds, 2);
        assert_eq!(session.height_reads.load(Ordering::SeqCst), 3);
        assert_eq!(session.scrolls.load(Ordering::SeqCst), 2);
        assert_eq!(session.closes.load(Ordering::SeqCst), 1);
        assert!(page.html.contains("hero.png"));
    }

    #[tokio::test]
    async fn static_page_settles_in_a_single_round() {
        let session = Arc::new(ScriptedSession::with_heights(&[720]));
        let stabilizer = stabilizer_for(&fast_config(), Arc::clone(&session));

        let page = stabilizer.fetch("https://example.com/").await.expect("fetch");

        assert_eq!(page.outcome, SettleOutcome::Settled);
        assert_eq!(page.rounds, 1);
        assert_eq!(session.height_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unbounded_growth_hits_the_round_budget() {
        // Strictly increasing heights never settle; the scripted queue keeps
        // its last value so every read differs from the previous one until
        // the budget trips.
        let heights: Vec<i64> = (0..200).map(|n| 100 + n * 10).collect();
        let session = Arc::new(ScriptedSession::with_heights(&heights));
        let mut config = fast_config();
        config.max_scroll_rounds = 5;
        let stabilizer = stabilizer_for(&config, Arc::clone(&session));

        let page = stabilizer.fetch("https://example.com/feed").await.expect("fetch");

        assert_eq!(page.outcome, SettleOutcome::RoundBudgetExhausted);
        assert_eq!(page.rounds, 5);
        assert_eq!(session.scrolls.load(Ordering::SeqCst), 5);
        // Partial markup is still returned.
        assert!(!page.html.is_empty());
        assert_eq!(session.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wall_clock_deadline_accepts_partial_page() {
        let heights: Vec<i64> = (0..200).map(|n| 100 + n * 10).collect();
        let session = Arc::new(ScriptedSession::with_heights(&heights));
        let mut config = fast_config();
        config.stabilize_timeout_ms = 0;
        let stabilizer = stabilizer_for(&config, Arc::clone(&session));

        let page = stabilizer.fetch("https://example.com/feed").await.expect("fetch");

        assert_eq!(page.outcome, SettleOutcome::DeadlineExpired);
        assert_eq!(page.rounds, 0);
        assert!(!page.html.is_empty());
    }

    #[tokio::test]
    async fn session_is_closed_when_navigation_fails() {
        let session = Arc::new(ScriptedSession {
            fail_goto: true,
            ..ScriptedSession::with_heights(&[100])
        });
        let stabilizer = stabilizer_for(&fast_config(), Arc::clone(&session));

        let err = stabilizer
            .fetch("https://example.invalid/")
            .await
            .expect_err("navigation should fail");

        assert!(matches!(
            err,
            StabilizeError::Session(SessionError::Navigation(_))
        ));
        assert_eq!(session.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_is_closed_when_a_height_read_fails_mid_loop() {
        let session = Arc::new(ScriptedSession {
            fail_height: true,
            ..ScriptedSession::with_heights(&[100])
        });
        let stabilizer = stabilizer_for(&fast_config(), Arc::clone(&session));

        let err = stabilizer
            .fetch("https://example.com/")
            .await
            .expect_err("height read should fail");

        assert!(matches!(
            err,
            StabilizeError::Session(SessionError::Script(_))
        ));
        assert_eq!(session.closes.load(Ordering::SeqCst), 1);
    }
}
