/*!
 * Common test utilities shared across the test suite.
 */


use std::time::Duration;

use kalque::events::{ProgressEvent, Subscription};

/// Collect events from a subscription until the terminal one arrives
pub async fn drain_until_terminal(sub: &mut Subscription) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), sub.recv())
            .await
            .expect("timed out waiting for a pipeline event")
            .expect("event bus closed before a terminal event arrived");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// A small, structurally valid three-line SRT fixture
pub const THREE_LINE_SRT: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello there.\n\n2\n00:00:04,000 --> 00:00:06,000\nGeneral Kenobi!\n\n3\n00:00:07,000 --> 00:00:09,000\nYou are a bold one.\n";

/// Build a structurally valid SRT with `count` numbered lines
pub fn numbered_srt(count: usize) -> String {
    let mut out = String::new();
    for i in 1..=count {
        let start = (i as u64 - 1) * 2000;
        let end = start + 1500;
        out.push_str(&format!(
            "{}\n{} --> {}\nLine number {}\n\n",
            i,
            kalque::subtitle_processor::SubtitleLine::format_timestamp(start),
            kalque::subtitle_processor::SubtitleLine::format_timestamp(end),
            i
        ));
    }
    out
}
