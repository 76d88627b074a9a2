//! Prompt assembly for the extraction request.
//!
//! A pure formatting step: bind the (truncated) rendered markup, a fixed
//! instruction template, and a worked example into one text payload. The
//! templates insist on JSON-only, double-quoted output because the extractor
//! treats deviations as recoverable but imperfect; the template's job is to
//! minimise how often recovery is needed.

use crate::catalog::SITUATION_CATALOG;
use crate::config::TemplateVariant;

/// Worked example embedded in the plain template.
pub const PLAIN_FORMAT_EXAMPLE: &str = r#"{
  "Non-text Contents": [
    {
      "xpath": "//main//figure[contains(@class, 'hero')]//img",
      "description": "Main visual image on the landing page"
    },
    {
      "xpath": "//form//input[@type='image']",
      "description": "Image button that submits the form"
    }
  ]
}"#;

/// Worked example embedded in the classified template.
pub const CLASSIFIED_FORMAT_EXAMPLE: &str = r#"{
  "Non-text Contents": [
    {
      "xpath": "//main//figure[contains(@class, 'hero')]//img",
      "description": "Main visual image on the landing page",
      "situation": "A",
      "reason": "A short label fully conveys the image's purpose",
      "wcagJudgment": "NG",
      "judgmentReason": "The img element carries no alt attribute",
      "successTechniques": ["H37"]
    }
  ]
}"#;

/// Cut `html` to at most `max_len` bytes, backing off to the nearest UTF-8
/// character boundary. Returns the slice and whether anything was cut.
///
/// This is a crude token-budget proxy: it can split an element's markup
/// mid-tag, and the extractor must tolerate responses that simply omit
/// truncated elements.
pub fn truncate_html(html: &str, max_len: usize) -> (&str, bool) {
    if html.len() <= max_len {
        return (html, false);
    }
    let mut cut = max_len;
    while cut > 0 && !html.is_char_boundary(cut) {
        cut -= 1;
    }
    (&html[..cut], true)
}

/// Assemble the full extraction prompt for the chosen template variant.
pub fn build_extraction_prompt(html: &str, variant: TemplateVariant) -> String {
    match variant {
        TemplateVariant::Plain => build_plain_prompt(html),
        TemplateVariant::Classified => build_classified_prompt(html),
    }
}

fn build_plain_prompt(html: &str) -> String {
    format!(
        "# You are a web accessibility testing professional. Your task: extract every \
         non-text content element (image, video, audio) in the page below that WCAG 1.1.1 \
         treats as requiring a text alternative.\n\
         # Work through the body of the target HTML from top to bottom, area by area, and \
         emit one entry per individual element (one image, one video, one audio clip), \
         locating each with an XPath expression.\n\
         # Respond with valid JSON only, following the format example. No explanatory \
         prose. No code fences.\n\
         # Use double quotes (\") exclusively. Never use single quotes (').\n\
         \n\
         Format example###\n\
         {PLAIN_FORMAT_EXAMPLE}\n\
         \n\
         Target html###\n\
         {html}"
    )
}

fn build_classified_prompt(html: &str) -> String {
    format!(
        "# You are a web accessibility testing professional. Your task: extract every \
         non-text content element (image, video, audio) in the page below that WCAG 1.1.1 \
         treats as requiring a text alternative, and classify each one.\n\
         # Work through the body of the target HTML from top to bottom, area by area, and \
         emit one entry per individual element, locating each with an XPath expression.\n\
         # Assign each element exactly one situation category from the catalog below and \
         justify the assignment in the \"reason\" field. Categories are mutually \
         exclusive.\n\
         # Judge each element against its category's requirement: \"wcagJudgment\" is \
         \"OK\" or \"NG\", with the reasoning in \"judgmentReason\". List the catalog \
         technique identifiers that apply in \"successTechniques\".\n\
         # Respond with valid JSON only, following the format example. No explanatory \
         prose. No code fences.\n\
         # Use double quotes (\") exclusively. Never use single quotes (').\n\
         \n\
         Situation catalog###\n\
         {catalog}\n\
         Format example###\n\
         {CLASSIFIED_FORMAT_EXAMPLE}\n\
         \n\
         Target html###\n\
         {html}",
        catalog = render_situation_catalog(),
    )
}

fn render_situation_catalog() -> String {
    let mut rendered = String::new();
    for rule in SITUATION_CATALOG {
        rendered.push_str(&format!(
            "Situation {}: {}\n  Justification rule: {}\n",
            rule.situation.as_str(),
            rule.label,
            rule.justification
        ));
        for technique in rule.techniques {
            rendered.push_str(&format!("  - {}: {}\n", technique.id, technique.summary));
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_html_is_left_untouched() {
        let html = "<html><body></body></html>";
        let (out, truncated) = truncate_html(html, 200_000);
        assert_eq!(out, html);
        assert!(!truncated);
    }

    #[test]
    fn truncation_is_a_hard_byte_cap() {
        let html = "a".repeat(300);
        let (out, truncated) = truncate_html(&html, 100);
        assert!(truncated);
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn truncation_never_splits_a_multibyte_character() {
        // Each of these characters is three bytes in UTF-8.
        let html = "画像と動画の一覧".repeat(50);
        let (out, truncated) = truncate_html(&html, 100);
        assert!(truncated);
        assert!(out.len() <= 100);
        assert!(html.is_char_boundary(out.len()));
        // Still a valid prefix.
        assert!(html.starts_with(out));
    }

    #[test]
    fn exact_length_input_is_not_marked_truncated() {
        let html = "x".repeat(64);
        let (out, truncated) = truncate_html(&html, 64);
        assert_eq!(out.len(), 64);
        assert!(!truncated);
    }

    #[test]
    fn plain_prompt_embeds_html_and_mandates_double_quotes() {
        let prompt = build_extraction_prompt("<img src=\"x.png\">", TemplateVariant::Plain);
        assert!(prompt.contains("Target html###"));
        assert!(prompt.contains("<img src=\"x.png\">"));
        assert!(prompt.contains("Never use single quotes"));
        assert!(prompt.contains("valid JSON only"));
        assert!(prompt.contains(PLAIN_FORMAT_EXAMPLE));
        // The taxonomy belongs to the classified variant only.
        assert!(!prompt.contains("Situation catalog###"));
    }

    #[test]
    fn classified_prompt_renders_the_full_catalog() {
        let prompt = build_extraction_prompt("<video></video>", TemplateVariant::Classified);
        assert!(prompt.contains("Situation catalog###"));
        for code in ["Situation A", "Situation B", "Situation C", "Situation D", "Situation E", "Situation F"] {
            assert!(prompt.contains(code), "missing {code}");
        }
        assert!(prompt.contains("H37:"));
        assert!(prompt.contains("G144:"));
        assert!(prompt.contains(CLASSIFIED_FORMAT_EXAMPLE));
    }
}
