/*!
 * Prompt templates for the translation pipeline.
 *
 * One template per AI call shape: keyword extraction, keyword grounding,
 * blueprint assembly, batch triage, and per-line translation. Structured
 * templates instruct the model to return only JSON matching the expected
 * schema; the per-line template demands the bare translated line.
 */

use crate::subtitle_processor::SubtitleLine;
use crate::translation::blueprint::{GroundedKeyword, KeywordEntry, UserGlossaryEntry};

/// Keyword extraction over the full script (fast tier)
pub const KEYWORD_EXTRACTION: &str = r#"You are a terminology analyst preparing a subtitle script for translation.

Read the full script below and extract culturally or narratively significant terms:
proper nouns, recurring objects, in-world jargon, honorifics, and idioms that must
be translated consistently.

Return ONLY a JSON array. Each element: {"term": string, "definition": string}.
An empty array is a valid answer when the script has no such terms.

## Script
{script}"#;

/// Candidate translation grounding per keyword (fast tier)
pub const KEYWORD_GROUNDING: &str = r#"You are a bilingual lexicographer.

For each term below, propose exactly 3 candidate translations into the target
language, ordered from most to least suitable for subtitles.

Return ONLY a JSON array. Each element: {"term": string, "translations": [string, string, string]}.

## Terms
{terms}"#;

/// Blueprint assembly from the grounded terms and user glossary (deep tier)
pub const BLUEPRINT_ASSEMBLY: &str = r#"You are the lead localization director for a subtitle translation project.

Build a translation blueprint for the script below. Desired tone: {tone}.

The blueprint must be a single JSON object with exactly these fields:
- "summary": plot and theme summary (string)
- "keyPoints": salient points the translation must preserve (array of strings)
- "characterProfiles": array of {"personaName", "speakingStyle", "voiceConsistencyRule"}
- "culturalNuances": adaptation notes (array of strings, may be empty)
- "glossary": array of {"term", "definition", "proposedTranslation", "translationType",
  "justification", "alternatives"} where "translationType" is one of
  "Transliteration", "DirectTranslation", "Hybrid", "CommonUsage", "Adaptation"

Candidate translations from earlier analysis:
{grounded_terms}

USER GLOSSARY - these translations are mandated by the user and MUST appear in the
glossary with the user's translation, unchanged:
{user_glossary}

Return ONLY the JSON object.

## Script
{script}"#;

/// Per-batch complexity triage (fast tier)
pub const BATCH_TRIAGE: &str = r#"You are routing subtitle lines between two translation models.

Classify each line below by linguistic complexity:
- "deep": idiom, slang, wordplay, emotional or cultural nuance
- "fast": simple declarative dialogue

Return ONLY a JSON array. Each element: {"lineId": number, "tier": "fast" | "deep"}.

## Lines
{lines}"#;

/// Single-line translation with brief and retrieved context
pub const LINE_TRANSLATION: &str = r#"You are an expert subtitle translator. Desired tone: {tone}.

Follow the brief below. Glossary translations are mandatory.

{brief}

## Semantically related lines from this script
{context}

## Line to translate
{line}

Respond with ONLY the translated line. No quotes, no numbering, no commentary."#;

/// Render the keyword extraction prompt
pub fn keyword_extraction(script: &str) -> String {
    KEYWORD_EXTRACTION.replace("{script}", script)
}

/// Render the grounding prompt for the extracted keywords
pub fn keyword_grounding(keywords: &[KeywordEntry]) -> String {
    let terms = keywords
        .iter()
        .map(|k| format!("- {} ({})", k.term, k.definition))
        .collect::<Vec<_>>()
        .join("\n");

    KEYWORD_GROUNDING.replace("{terms}", &terms)
}

/// Render the blueprint assembly prompt
pub fn blueprint_assembly(
    script: &str,
    tone: &str,
    grounded: &[GroundedKeyword],
    user_glossary: &[UserGlossaryEntry],
) -> String {
    let grounded_terms = if grounded.is_empty() {
        "(none)".to_string()
    } else {
        grounded
            .iter()
            .map(|g| format!("- {}: {}", g.term, g.translations.join(" / ")))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let user_terms = if user_glossary.is_empty() {
        "(none)".to_string()
    } else {
        user_glossary
            .iter()
            .map(|u| format!("- \"{}\" => \"{}\"", u.term, u.translation))
            .collect::<Vec<_>>()
            .join("\n")
    };

    BLUEPRINT_ASSEMBLY
        .replace("{tone}", tone)
        .replace("{grounded_terms}", &grounded_terms)
        .replace("{user_glossary}", &user_terms)
        .replace("{script}", script)
}

/// Render the triage prompt for one batch of lines
pub fn batch_triage(batch: &[SubtitleLine]) -> String {
    let lines = batch
        .iter()
        .map(|line| format!("{}: {}", line.seq_num, line.text))
        .collect::<Vec<_>>()
        .join("\n");

    BATCH_TRIAGE.replace("{lines}", &lines)
}

/// Render the per-line translation prompt
pub fn line_translation(brief: &str, context: &str, line: &SubtitleLine, tone: &str) -> String {
    LINE_TRANSLATION
        .replace("{tone}", tone)
        .replace("{brief}", brief)
        .replace("{context}", context)
        .replace("{line}", &line.text)
}
