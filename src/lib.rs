//! altscan: scroll-stabilized page snapshots and LLM-assisted inventory of
//! non-text content for WCAG 1.1.1 review.
//!
//! The pipeline has two hard parts, each behind a substitutable seam:
//!
//! - the [`stabilize`] module drives a [`browser::PageSession`] until a
//!   lazily-loading page stops growing, bounded by a round budget and a
//!   wall-clock deadline;
//! - the [`extract`] module recovers validated findings from raw model
//!   output, repairing near-miss JSON before parsing.
//!
//! [`checker::NonTextChecker`] composes them with prompt assembly and the
//! completion client; the `altscan` binary is a thin shell on top.

pub mod browser;
pub mod catalog;
pub mod checker;
pub mod config;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod stabilize;
pub mod types;

pub use checker::{CheckerError, NonTextChecker};
pub use config::{CheckerConfig, TemplateVariant};
pub use extract::{ExtractionFailure, extract_findings, repair_json};
pub use stabilize::{RenderedPage, SettleOutcome, Stabilizer};
pub use types::{CheckReport, ExtractionReport, NonTextFinding};
