/*!
 * Unit tests for subtitle parsing and rendering.
 */

use kalque::subtitle_processor::{SubtitleCollection, TranslatedLine};

use crate::common::{numbered_srt, THREE_LINE_SRT};

#[test]
fn test_parse_withStructuralInput_shouldRoundTripExactly() {
    let collection = SubtitleCollection::parse(THREE_LINE_SRT);
    assert!(!collection.degraded);

    let translated: Vec<TranslatedLine> = collection
        .lines
        .iter()
        .cloned()
        .map(|line| TranslatedLine::new(line.clone(), format!("XX {}", line.text)))
        .collect();

    let rendered = SubtitleCollection::render(&translated);
    let reparsed = SubtitleCollection::parse(&rendered);

    assert_eq!(reparsed.lines.len(), collection.lines.len());
    for (original, round_tripped) in collection.lines.iter().zip(reparsed.lines.iter()) {
        assert_eq!(original.seq_num, round_tripped.seq_num);
        assert_eq!(original.start_time_ms, round_tripped.start_time_ms);
        assert_eq!(original.end_time_ms, round_tripped.end_time_ms);
        // Text differs only by the translation substitution
        assert_eq!(round_tripped.text, format!("XX {}", original.text));
    }
}

#[test]
fn test_parse_withLargeInput_shouldKeepEveryLine() {
    let srt = numbered_srt(200);
    let collection = SubtitleCollection::parse(&srt);

    assert!(!collection.degraded);
    assert_eq!(collection.lines.len(), 200);
    assert_eq!(collection.lines[199].seq_num, 200);
}

#[test]
fn test_parse_withMalformedInputs_shouldNeverFailAndClampDurations() {
    let malformed_inputs = [
        "",
        "complete nonsense",
        "1\nnot a timestamp\ntext",
        "99\n00:00:99,999 --> zz:00:00,000\nbroken",
        "\n\n\n",
        "a\nb\nc\nd",
        "1\n00:00:05,000 --> 00:00:01,000\nnegative duration\n",
    ];

    for input in malformed_inputs {
        let collection = SubtitleCollection::parse(input);
        for line in &collection.lines {
            assert!(
                line.duration_secs >= 0.0,
                "duration must be non-negative for input {input:?}"
            );
        }
    }
}

#[test]
fn test_parse_withDegradedInput_shouldNumberLinesByPosition() {
    let collection = SubtitleCollection::parse("first\nsecond\n\nthird");

    assert!(collection.degraded);
    let seq_nums: Vec<usize> = collection.lines.iter().map(|l| l.seq_num).collect();
    assert_eq!(seq_nums, vec![1, 2, 3]);
    assert!(collection.lines.iter().all(|l| l.start_time_ms == 0));
}

#[test]
fn test_parse_withMultilineTextBlocks_shouldJoinWithNewline() {
    let srt = "1\n00:00:01,000 --> 00:00:02,000\nfirst row\nsecond row\n\n";
    let collection = SubtitleCollection::parse(srt);

    assert_eq!(collection.lines.len(), 1);
    assert_eq!(collection.lines[0].text, "first row\nsecond row");
}

#[test]
fn test_parse_withNonContiguousSeqNums_shouldPreserveSourceNumbers() {
    let srt = "10\n00:00:01,000 --> 00:00:02,000\nten\n\n20\n00:00:03,000 --> 00:00:04,000\ntwenty\n\n";
    let collection = SubtitleCollection::parse(srt);

    assert_eq!(collection.lines[0].seq_num, 10);
    assert_eq!(collection.lines[1].seq_num, 20);
}
