//! Response Extractor: recover validated findings from raw model output.
//!
//! Models are instructed to answer with JSON only, but the instruction is
//! advisory: responses arrive wrapped in prose, fenced, single-quoted, or
//! with double-escaped newlines. The extractor locates the outermost brace
//! span, runs it through a lossy repair pass, parses, and validates the shape
//! against the active template variant. Every failure mode is a typed result;
//! nothing escapes this boundary as an unhandled error.

use serde_json::Value;
use thiserror::Error;

use crate::config::TemplateVariant;
use crate::types::{ExtractionReport, FINDINGS_KEY, NonTextFinding, Situation, WcagJudgment};

/// Terminal extraction failures. No step is retried; the whole pass is
/// single-shot and stateless across calls.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    /// The response contains no `{...}` span at all.
    #[error("response contains no JSON payload")]
    NoPayloadFound,
    /// A payload span was found but does not parse even after repair. Carries
    /// the exact candidate that was attempted, for diagnostics.
    #[error("payload does not parse as JSON: {source}")]
    MalformedPayload {
        candidate: String,
        #[source]
        source: serde_json::Error,
    },
    /// Parsed data lacks the required envelope or per-element fields.
    #[error("payload shape invalid: {0}")]
    ShapeValidation(String),
}

/// Slice the candidate payload: everything from the first `{` through the
/// last `}` inclusive. Returns `None` when either brace is missing or they
/// cross.
pub fn locate_payload(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Lossy repair for near-miss JSON emitted by a generative model.
///
/// Two substitutions, then a trim:
/// - every single quote becomes a double quote, recovering responses that
///   used Python-style string delimiters;
/// - every literal two-character `\n` escape becomes a real newline,
///   recovering double-escaped content.
///
/// Neither substitution is surgical: a string value that legitimately
/// contains an apostrophe ("user's image") is corrupted, and a `\n` escape
/// inside a value becomes a control character that strict parsing rejects.
/// Recoverability of malformed output is favoured over full fidelity; see
/// the unit tests for the documented trade-offs.
pub fn repair_json(candidate: &str) -> String {
    candidate
        .replace('\'', "\"")
        .replace("\\n", "\n")
        .trim()
        .to_string()
}

/// Turn a raw model response into a validated [`ExtractionReport`].
///
/// A structurally valid but empty findings array is a successful zero-finding
/// result, distinct from every failure kind.
pub fn extract_findings(
    raw: &str,
    variant: TemplateVariant,
) -> Result<ExtractionReport, ExtractionFailure> {
    let candidate = locate_payload(raw).ok_or(ExtractionFailure::NoPayloadFound)?;
    let repaired = repair_json(candidate);

    let value: Value = match serde_json::from_str(&repaired) {
        Ok(value) => value,
        Err(source) => {
            return Err(ExtractionFailure::MalformedPayload {
                candidate: repaired,
                source,
            });
        }
    };

    validate_shape(&value, variant)
}

fn validate_shape(
    value: &Value,
    variant: TemplateVariant,
) -> Result<ExtractionReport, ExtractionFailure> {
    let object = value
        .as_object()
        .ok_or_else(|| shape("top-level value is not an object"))?;

    let entries = object
        .get(FINDINGS_KEY)
        .ok_or_else(|| shape(format!("missing \"{FINDINGS_KEY}\" key")))?
        .as_array()
        .ok_or_else(|| shape(format!("\"{FINDINGS_KEY}\" is not an array")))?;

    let findings = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| finding_from_value(index, entry, variant))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExtractionReport::new(findings))
}

fn finding_from_value(
    index: usize,
    value: &Value,
    variant: TemplateVariant,
) -> Result<NonTextFinding, ExtractionFailure> {
    let object = value
        .as_object()
        .ok_or_else(|| shape(format!("finding {index} is not an object")))?;

    let xpath = object
        .get("xpath")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| shape(format!("finding {index} is missing a non-empty \"xpath\"")))?
        .to_string();

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| shape(format!("finding {index} is missing \"description\"")))?
        .to_string();

    let situation = match object.get("situation").and_then(Value::as_str) {
        Some(code) => Some(Situation::parse(code).ok_or_else(|| {
            shape(format!("finding {index} has unknown situation {code:?}"))
        })?),
        None => None,
    };

    if variant == TemplateVariant::Classified && situation.is_none() {
        return Err(shape(format!(
            "finding {index} must carry exactly one situation category"
        )));
    }

    let wcag_judgment = match object.get("wcagJudgment").and_then(Value::as_str) {
        Some(raw) => Some(WcagJudgment::parse(raw).ok_or_else(|| {
            shape(format!(
                "finding {index} has judgment {raw:?}; expected \"OK\" or \"NG\""
            ))
        })?),
        None => None,
    };

    let success_techniques = match object.get("successTechniques") {
        Some(Value::Array(items)) => {
            let ids = items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        shape(format!(
                            "finding {index} has a non-string success technique"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(ids)
        }
        Some(_) => {
            return Err(shape(format!(
                "finding {index} has a non-array \"successTechniques\""
            )));
        }
        None => None,
    };

    Ok(NonTextFinding {
        xpath,
        description,
        situation,
        reason: string_field(object, "reason"),
        wcag_judgment,
        judgment_reason: string_field(object, "judgmentReason"),
        success_techniques,
    })
}

fn string_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn shape(message: impl Into<String>) -> ExtractionFailure {
    ExtractionFailure::ShapeValidation(message.into())
}
