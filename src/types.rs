//! Data model for extracted non-text content findings.
//!
//! Field names on the wire (`wcagJudgment`, `successTechniques`, the
//! `"Non-text Contents"` envelope key) are part of the contract with callers
//! and with the prompt templates; the Rust names stay idiomatic via serde
//! renames.

use serde::{Deserialize, Serialize};

use crate::metrics::CheckerMetrics;
use crate::stabilize::SettleOutcome;

/// Well-known top-level key binding the findings sequence.
pub const FINDINGS_KEY: &str = "Non-text Contents";

/// Six mutually exclusive accessibility-role classifications for a non-text
/// element, mirroring WCAG 1.1.1's sufficient-technique situations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Situation {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Situation {
    pub const ALL: [Situation; 6] = [
        Situation::A,
        Situation::B,
        Situation::C,
        Situation::D,
        Situation::E,
        Situation::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Situation::A => "A",
            Situation::B => "B",
            Situation::C => "C",
            Situation::D => "D",
            Situation::E => "E",
            Situation::F => "F",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "A" => Some(Situation::A),
            "B" => Some(Situation::B),
            "C" => Some(Situation::C),
            "D" => Some(Situation::D),
            "E" => Some(Situation::E),
            "F" => Some(Situation::F),
            _ => None,
        }
    }
}

/// The model's pass/fail call for a finding. `OK`/`NG` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WcagJudgment {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NG")]
    Ng,
}

impl WcagJudgment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "OK" => Some(WcagJudgment::Ok),
            "NG" => Some(WcagJudgment::Ng),
            _ => None,
        }
    }
}

/// One extracted non-text content element.
///
/// `xpath` and `description` are always required; the remaining fields are
/// populated only by the classified template variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonTextFinding {
    pub xpath: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub situation: Option<Situation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "wcagJudgment", skip_serializing_if = "Option::is_none")]
    pub wcag_judgment: Option<WcagJudgment>,
    #[serde(rename = "judgmentReason", skip_serializing_if = "Option::is_none")]
    pub judgment_reason: Option<String>,
    #[serde(rename = "successTechniques", skip_serializing_if = "Option::is_none")]
    pub success_techniques: Option<Vec<String>>,
}

impl NonTextFinding {
    /// Minimal finding, as produced by the plain template.
    pub fn new(xpath: impl Into<String>, description: impl Into<String>) -> Self {
        NonTextFinding {
            xpath: xpath.into(),
            description: description.into(),
            situation: None,
            reason: None,
            wcag_judgment: None,
            judgment_reason: None,
            success_techniques: None,
        }
    }
}

/// Validated top-level envelope: the well-known key bound to an ordered
/// sequence of findings. An empty sequence is a successful zero-finding
/// result, not a failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionReport {
    #[serde(rename = "Non-text Contents")]
    pub findings: Vec<NonTextFinding>,
}

impl ExtractionReport {
    pub fn new(findings: Vec<NonTextFinding>) -> Self {
        ExtractionReport { findings }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }
}

/// How the snapshot that fed the model was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSummary {
    /// Size of the rendered markup before truncation.
    pub html_bytes: usize,
    /// Whether the prompt content was cut to the configured budget.
    pub truncated: bool,
    pub rounds: u32,
    pub outcome: SettleOutcome,
}

/// Everything one checker invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    pub url: String,
    pub page: PageSummary,
    pub report: ExtractionReport,
    pub metrics: CheckerMetrics,
}
