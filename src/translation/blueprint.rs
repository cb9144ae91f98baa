/*!
 * Translation blueprint model.
 *
 * The blueprint is the structured brief synthesized once per job (plot summary,
 * character voice rules, cultural notes, authoritative glossary) and reused as
 * context for every per-line translation call. It is immutable after assembly
 * and serializes to a flat brief text with a stable section order.
 */

use serde::{Deserialize, Serialize};

use crate::providers::ModelTier;

/// How a glossary term is carried into the target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationType {
    /// Phonetic carry-over of the source term
    Transliteration,
    /// Literal translation of the term's meaning
    DirectTranslation,
    /// Mix of transliteration and translation
    Hybrid,
    /// Established target-language usage for the term
    CommonUsage,
    /// Free adaptation for cultural fit
    Adaptation,
}

/// A glossary entry of the blueprint.
///
/// User-supplied terms are sacrosanct: their `proposed_translation` always
/// carries the user's value, regardless of what the model proposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryTerm {
    /// Source-language term
    pub term: String,

    /// What the term means in the source material
    #[serde(default)]
    pub definition: String,

    /// Target-language translation to use for every occurrence
    #[serde(default)]
    pub proposed_translation: String,

    /// Strategy behind the proposed translation
    #[serde(default = "default_translation_type")]
    pub translation_type: TranslationType,

    /// Why this rendering was chosen
    #[serde(default)]
    pub justification: String,

    /// Rejected candidate translations, best first
    #[serde(default)]
    pub alternatives: Vec<String>,
}

fn default_translation_type() -> TranslationType {
    TranslationType::DirectTranslation
}

/// Voice profile for one recurring character
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfile {
    /// Character or persona name
    pub persona_name: String,

    /// Register and mannerisms of the character's speech
    #[serde(default)]
    pub speaking_style: String,

    /// Rule every translated line of this character must respect
    #[serde(default)]
    pub voice_consistency_rule: String,
}

/// The structured brief consumed by every per-line translation call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationBlueprint {
    /// Plot and theme summary of the source material
    #[serde(default)]
    pub summary: String,

    /// Salient points the translation must not lose
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Voice profiles for recurring characters
    #[serde(default)]
    pub character_profiles: Vec<CharacterProfile>,

    /// Cultural adaptation notes
    #[serde(default)]
    pub cultural_nuances: Vec<String>,

    /// Authoritative term glossary. Deliberately not defaulted: a blueprint
    /// without a glossary field is invalid and must fail assembly.
    pub glossary: Vec<GlossaryTerm>,
}

/// A user-supplied term/translation pair from the submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGlossaryEntry {
    /// Source-language term
    pub term: String,
    /// Translation the user mandates for the term
    pub translation: String,
}

/// Keyword extracted in the first blueprint pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Extracted term
    pub term: String,
    /// Model's reading of what the term means
    #[serde(default)]
    pub definition: String,
}

/// A keyword with its candidate target-language translations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedKeyword {
    /// Source term
    pub term: String,
    /// Exactly three candidate translations, best first
    #[serde(default)]
    pub translations: Vec<String>,
}

/// Per-line tier assignment produced by the triage call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageClassification {
    /// Sequence number of the classified line
    pub line_id: usize,
    /// Assigned quality tier
    pub tier: ModelTier,
}

impl TranslationBlueprint {
    /// Enforce the sacrosanct-glossary invariant.
    ///
    /// Every user-supplied term present in the glossary is overwritten with the
    /// user's translation; user terms the model dropped are appended. The
    /// prompt already asks for this, but the model is not trusted to comply.
    pub fn apply_user_glossary(&mut self, user_glossary: &[UserGlossaryEntry]) {
        for user_entry in user_glossary {
            let existing = self
                .glossary
                .iter_mut()
                .find(|term| term.term.eq_ignore_ascii_case(&user_entry.term));

            match existing {
                Some(term) => {
                    term.proposed_translation = user_entry.translation.clone();
                }
                None => {
                    self.glossary.push(GlossaryTerm {
                        term: user_entry.term.clone(),
                        definition: String::new(),
                        proposed_translation: user_entry.translation.clone(),
                        translation_type: TranslationType::CommonUsage,
                        justification: "Supplied by the user".to_string(),
                        alternatives: Vec::new(),
                    });
                }
            }
        }
    }

    /// Serialize the blueprint to the flat brief text.
    ///
    /// Section order is fixed so the brief is byte-stable across calls for the
    /// same job: summary and key points, character profiles, glossary, then
    /// cultural nuances (omitted entirely when empty).
    pub fn to_brief(&self) -> String {
        let mut brief = String::new();

        brief.push_str("## Plot & Theme Summary\n");
        brief.push_str(&self.summary);
        brief.push('\n');
        for point in &self.key_points {
            brief.push_str(&format!("- {point}\n"));
        }

        brief.push_str("\n## Character Voice Profiles\n");
        if self.character_profiles.is_empty() {
            brief.push_str("(none identified)\n");
        }
        for profile in &self.character_profiles {
            brief.push_str(&format!(
                "- {}: {} | voice rule: {}\n",
                profile.persona_name, profile.speaking_style, profile.voice_consistency_rule
            ));
        }

        brief.push_str("\n## Sacrosanct Glossary\n");
        if self.glossary.is_empty() {
            brief.push_str("(empty)\n");
        }
        for term in &self.glossary {
            brief.push_str(&format!(
                "- \"{}\" => \"{}\" [{:?}] {}\n",
                term.term, term.proposed_translation, term.translation_type, term.definition
            ));
        }

        if !self.cultural_nuances.is_empty() {
            brief.push_str("\n## Cultural Nuances\n");
            for nuance in &self.cultural_nuances {
                brief.push_str(&format!("- {nuance}\n"));
            }
        }

        brief
    }
}
