//! Fixed classification scheme for non-text content.
//!
//! The six situations mirror the sufficient-technique situations of WCAG
//! 1.1.1: each carries a justification rule the model must satisfy when it
//! assigns the category, plus the named success techniques that count as
//! supporting evidence. The catalog is rendered verbatim into the classified
//! prompt template; [`is_known_technique`] lets callers check cited
//! identifiers against it.

use crate::types::Situation;

/// A named, catalog-referenced implementation pattern that satisfies a
/// situation's accessibility requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Technique {
    pub id: &'static str,
    pub summary: &'static str,
}

/// One situation category with its justification rule and techniques.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SituationRule {
    pub situation: Situation,
    pub label: &'static str,
    /// What the model must establish before assigning this category.
    pub justification: &'static str,
    pub techniques: &'static [Technique],
}

/// The full catalog, in category order A through F. Categories are mutually
/// exclusive: a decorative element cannot simultaneously be a control.
pub const SITUATION_CATALOG: &[SituationRule] = &[
    SituationRule {
        situation: Situation::A,
        label: "A short text alternative can serve the equivalent purpose",
        justification: "State the purpose the non-text content serves and why a short \
                        alternative conveys it fully.",
        techniques: &[
            Technique {
                id: "H37",
                summary: "Use alt attributes on img elements",
            },
            Technique {
                id: "ARIA6",
                summary: "Use aria-label to provide an invisible label",
            },
            Technique {
                id: "ARIA10",
                summary: "Use aria-labelledby to name the content from visible text",
            },
            Technique {
                id: "G196",
                summary: "Provide one alternative for a group covering all items in the group",
            },
            Technique {
                id: "H86",
                summary: "Provide text alternatives for ASCII art, emoticons, and leetspeak",
            },
        ],
    },
    SituationRule {
        situation: Situation::B,
        label: "A short text alternative cannot serve the equivalent purpose",
        justification: "Explain why the content (chart, diagram, complex graphic) needs a \
                        long description in addition to a short label.",
        techniques: &[
            Technique {
                id: "G95",
                summary: "Short alternative plus a long description elsewhere",
            },
            Technique {
                id: "G74",
                summary: "Long description in text near the content, referenced from the \
                          short alternative",
            },
            Technique {
                id: "G73",
                summary: "Long description in another location with a programmatic link",
            },
            Technique {
                id: "ARIA15",
                summary: "Use aria-describedby to point at the descriptive text",
            },
        ],
    },
    SituationRule {
        situation: Situation::C,
        label: "The non-text content is a control or accepts user input",
        justification: "Identify the action the control performs; its name must describe \
                        that purpose.",
        techniques: &[
            Technique {
                id: "H36",
                summary: "Use alt attributes on images used as submit buttons",
            },
            Technique {
                id: "H24",
                summary: "Provide alt attributes on area elements of image maps",
            },
            Technique {
                id: "H44",
                summary: "Associate text labels with form controls via label elements",
            },
            Technique {
                id: "ARIA9",
                summary: "Concatenate a label from several text nodes with aria-labelledby",
            },
        ],
    },
    SituationRule {
        situation: Situation::D,
        label: "Time-based media, a live feed, a test, or a sensory experience",
        justification: "Name the kind of media or experience; a descriptive identification \
                        is required even where a full alternative is impossible.",
        techniques: &[
            Technique {
                id: "G68",
                summary: "Provide a short descriptive label identifying the content",
            },
            Technique {
                id: "G100",
                summary: "Provide the accepted or descriptive name of the content",
            },
        ],
    },
    SituationRule {
        situation: Situation::E,
        label: "The non-text content is a CAPTCHA",
        justification: "Confirm the content exists to tell humans from software; both a \
                        purpose description and an alternative modality are required.",
        techniques: &[
            Technique {
                id: "G143",
                summary: "Text alternative describing the purpose of the CAPTCHA",
            },
            Technique {
                id: "G144",
                summary: "Offer a second CAPTCHA in a different sensory modality",
            },
        ],
    },
    SituationRule {
        situation: Situation::F,
        label: "Decoration, formatting, or invisible content",
        justification: "Establish that the content conveys no information and can be \
                        ignored by assistive technology.",
        techniques: &[
            Technique {
                id: "H67",
                summary: "Empty alt attribute and no title on purely decorative img elements",
            },
            Technique {
                id: "C9",
                summary: "Include decorative images via CSS backgrounds instead of markup",
            },
        ],
    },
];

/// Look up the rule for a situation code.
pub fn rule_for(situation: Situation) -> &'static SituationRule {
    SITUATION_CATALOG
        .iter()
        .find(|rule| rule.situation == situation)
        .expect("catalog covers every situation variant")
}

/// Whether an identifier names a technique anywhere in the catalog.
pub fn is_known_technique(id: &str) -> bool {
    SITUATION_CATALOG
        .iter()
        .flat_map(|rule| rule.techniques)
        .any(|technique| technique.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_all_six_situations_in_order() {
        let codes: Vec<&str> = SITUATION_CATALOG
            .iter()
            .map(|rule| rule.situation.as_str())
            .collect();
        assert_eq!(codes, vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn every_situation_carries_techniques_and_a_justification_rule() {
        for rule in SITUATION_CATALOG {
            assert!(!rule.techniques.is_empty(), "{} has no techniques", rule.situation.as_str());
            assert!(!rule.justification.trim().is_empty());
        }
    }

    #[test]
    fn rule_lookup_matches_the_requested_situation() {
        for situation in Situation::ALL {
            assert_eq!(rule_for(situation).situation, situation);
        }
    }

    #[test]
    fn technique_lookup_distinguishes_known_ids() {
        assert!(is_known_technique("H37"));
        assert!(is_known_technique("G144"));
        assert!(!is_known_technique("H999"));
    }
}
