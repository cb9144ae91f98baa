/*!
 * Subtitle parsing and rendering.
 *
 * Converts raw subtitle text to and from an ordered sequence of line records.
 * Parsing is tolerant by contract: structurally valid SRT input is parsed with
 * full fidelity, while malformed input degrades to naive line-splitting with
 * zeroed timestamps. Parsing never fails, it only loses fidelity.
 */

use std::fmt;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

// SRT timestamp line: HH:MM:SS,mmm --> HH:MM:SS,mmm
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{3})")
        .unwrap()
});

// Inline markup: HTML-style tags (<i>, <font ...>) and ASS override blocks ({\an8})
static MARKUP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>|\{[^}]*\}").unwrap());

/// A single parsed subtitle line
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLine {
    /// Sequence number (source-provided, or 1-based position in degraded mode)
    pub seq_num: usize,

    /// Start time in ms
    pub start_time_ms: u64,

    /// End time in ms
    pub end_time_ms: u64,

    /// Display duration in seconds, clamped to zero
    pub duration_secs: f64,

    /// Subtitle text with inline markup stripped
    pub text: String,
}

impl SubtitleLine {
    /// Create a new subtitle line, deriving the duration from the time range
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        let duration_secs = (end_time_ms.saturating_sub(start_time_ms)) as f64 / 1000.0;
        SubtitleLine {
            seq_num,
            start_time_ms,
            end_time_ms,
            duration_secs,
            text,
        }
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

/// A subtitle line paired with its translation
#[derive(Debug, Clone)]
pub struct TranslatedLine {
    /// The source line this translation belongs to
    pub line: SubtitleLine,

    /// Translated text for the line
    pub translated_text: String,
}

impl TranslatedLine {
    /// Pair a source line with its translated text
    pub fn new(line: SubtitleLine, translated_text: String) -> Self {
        TranslatedLine {
            line,
            translated_text,
        }
    }
}

impl fmt::Display for TranslatedLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.line.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            SubtitleLine::format_timestamp(self.line.start_time_ms),
            SubtitleLine::format_timestamp(self.line.end_time_ms)
        )?;
        writeln!(f, "{}", self.translated_text)?;
        writeln!(f)
    }
}

/// Ordered collection of subtitle lines for one job
#[derive(Debug, Default)]
pub struct SubtitleCollection {
    /// Parsed lines in display order
    pub lines: Vec<SubtitleLine>,

    /// Whether structural parsing failed and the naive fallback was used
    pub degraded: bool,
}

impl SubtitleCollection {
    /// Parse subtitle content into an ordered sequence of lines.
    ///
    /// Attempts structured SRT parsing first. If no structurally valid entry is
    /// found, every non-empty newline-delimited segment becomes one line with
    /// zero timestamps and a 1-based positional sequence number.
    pub fn parse(content: &str) -> Self {
        let lines = Self::parse_srt(content);

        if !lines.is_empty() {
            debug!("Parsed {} subtitle lines structurally", lines.len());
            return SubtitleCollection {
                lines,
                degraded: false,
            };
        }

        warn!("Structural subtitle parse failed, falling back to line splitting");
        let fallback: Vec<SubtitleLine> = content
            .lines()
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .enumerate()
            .map(|(idx, segment)| SubtitleLine::new(idx + 1, 0, 0, strip_markup(segment)))
            .collect();

        SubtitleCollection {
            lines: fallback,
            degraded: true,
        }
    }

    /// Render translated lines back to SRT text.
    ///
    /// Sequence numbers and timestamps round-trip exactly for input that
    /// parsed structurally; only the text is substituted.
    pub fn render(translated: &[TranslatedLine]) -> String {
        let mut output = String::new();
        for entry in translated {
            output.push_str(&entry.to_string());
        }
        output
    }

    /// Concatenated source text of every line, one per row
    pub fn full_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse strict SRT blocks; returns an empty vec when nothing parses
    fn parse_srt(content: &str) -> Vec<SubtitleLine> {
        let mut entries = Vec::new();

        let mut current_seq: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut flush =
            |seq: &mut Option<usize>, times: &mut Option<(u64, u64)>, text: &mut String| {
                if let (Some(seq_num), Some((start_ms, end_ms))) = (seq.take(), times.take()) {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        entries.push(SubtitleLine::new(
                            seq_num,
                            start_ms,
                            end_ms,
                            strip_markup(trimmed),
                        ));
                    }
                }
                text.clear();
            };

        for raw_line in content.lines() {
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                flush(&mut current_seq, &mut current_times, &mut current_text);
                continue;
            }

            // Sequence number opens a new block
            if current_seq.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq = Some(num);
                    continue;
                }
            }

            // Timestamp row follows the sequence number
            if current_seq.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    let start_ms = capture_to_ms(&caps, 1);
                    let end_ms = capture_to_ms(&caps, 5);
                    current_times = Some((start_ms, end_ms));
                    continue;
                }
            }

            // Everything else inside a block is subtitle text
            if current_seq.is_some() && current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            }
        }

        flush(&mut current_seq, &mut current_times, &mut current_text);

        entries
    }
}

/// Strip inline markup tags from subtitle text
fn strip_markup(text: &str) -> String {
    MARKUP_REGEX.replace_all(text, "").trim().to_string()
}

/// Convert four consecutive regex captures (H, M, S, ms) to milliseconds
fn capture_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
    let part = |idx: usize| -> u64 {
        caps.get(idx)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0))
    };

    (part(start_idx) * 3600 + part(start_idx + 1) * 60 + part(start_idx + 2)) * 1000
        + part(start_idx + 3)
}
