//! Streaming chunk classifier.
//!
//! Consumes raw text fragments from the generator and re-segments them into
//! typed [`AnswerEvent`]s. Two marker syntaxes are recognized inline within
//! plain text: `<cited>N</cited>` citations and triple-backtick code fences.
//! Fragment boundaries carry no meaning, so a marker may be split across any
//! number of fragments; candidate buffers persist between fragments until the
//! marker either completes or can no longer match.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::events::AnswerEvent;

const CITATION_OPEN_MARKER: &str = "<cited>";
const CITATION_CLOSE_MARKER: &str = "</cited>";
const CODE_FENCE_MARKER: &str = "```";

/// Character-level state machine turning raw generated text into events.
///
/// Exactly one of {plain text, citation candidate, code candidate} is active
/// at a time; the two non-active buffers are empty outside of transitions.
#[derive(Debug, Default)]
pub struct ChunkClassifier {
    text_buffer: String,
    citation_buffer: String,
    code_buffer: String,
    in_citation: bool,
    in_code_block: bool,
}

impl ChunkClassifier {
    /// Feed one fragment through the state machine, returning the events it
    /// completes.
    ///
    /// The plain-text buffer is flushed at the end of every fragment so the
    /// client sees text promptly; candidate buffers persist since a marker
    /// may straddle fragments.
    pub fn push_fragment(&mut self, fragment: &str) -> Vec<AnswerEvent> {
        let mut events = Vec::new();
        for ch in fragment.chars() {
            if self.in_code_block {
                self.push_code_char(ch, &mut events);
            } else if self.in_citation {
                self.push_citation_char(ch, &mut events);
            } else {
                self.push_text_char(ch, &mut events);
            }
        }
        self.flush_text_buffer(&mut events);
        events
    }

    /// Flush whatever is pending at end of input.
    ///
    /// A pending code candidate is emitted as a code block, else a pending
    /// citation candidate is emitted as raw text. The plain-text buffer needs
    /// no handling here: it is flushed at the end of every fragment, and end
    /// of input is only observed between fragments.
    pub fn finish(mut self) -> Option<AnswerEvent> {
        if !self.code_buffer.is_empty() {
            Some(AnswerEvent::CodeBlock(std::mem::take(&mut self.code_buffer)))
        } else if !self.citation_buffer.is_empty() {
            Some(AnswerEvent::Text(std::mem::take(&mut self.citation_buffer)))
        } else {
            None
        }
    }

    /// Drive the classifier between channels until the fragment channel
    /// closes or the request is cancelled, then flush.
    ///
    /// The event sender is dropped on return, which closes the event channel.
    pub async fn run(
        mut self,
        cancel: CancellationToken,
        mut fragments: mpsc::Receiver<String>,
        events: mpsc::Sender<AnswerEvent>,
    ) {
        loop {
            tokio::select! {
                fragment = fragments.recv() => match fragment {
                    Some(fragment) => {
                        for event in self.push_fragment(&fragment) {
                            if events.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    None => break,
                },
                _ = cancel.cancelled() => break,
            }
        }

        if let Some(event) = self.finish() {
            let _ = events.send(event).await;
        }
    }

    fn push_text_char(&mut self, ch: char, events: &mut Vec<AnswerEvent>) {
        match ch {
            '`' => {
                self.flush_text_buffer(events);
                self.code_buffer.push(ch);
                self.in_code_block = true;
            }
            '<' => {
                self.flush_text_buffer(events);
                self.citation_buffer.push(ch);
                self.in_citation = true;
            }
            _ => self.text_buffer.push(ch),
        }
    }

    fn push_code_char(&mut self, ch: char, events: &mut Vec<AnswerEvent>) {
        self.code_buffer.push(ch);
        if self.code_buffer.len() < 4 {
            // Still inside the opening fence; any non-backtick is a false alarm.
            if ch != '`' {
                self.drain_code_candidate();
            }
        } else if self.code_buffer.ends_with(CODE_FENCE_MARKER) {
            events.push(AnswerEvent::CodeBlock(std::mem::take(&mut self.code_buffer)));
            self.in_code_block = false;
        } else if !(CODE_FENCE_MARKER.starts_with(self.code_buffer.as_str())
            || self.code_buffer.starts_with(CODE_FENCE_MARKER))
        {
            self.drain_code_candidate();
        }
    }

    fn push_citation_char(&mut self, ch: char, events: &mut Vec<AnswerEvent>) {
        self.citation_buffer.push(ch);
        if self.citation_buffer.ends_with(CITATION_CLOSE_MARKER) {
            events.push(citation_event(std::mem::take(&mut self.citation_buffer)));
            self.in_citation = false;
        } else if !(CITATION_OPEN_MARKER.starts_with(self.citation_buffer.as_str())
            || self.citation_buffer.starts_with(CITATION_OPEN_MARKER))
        {
            self.drain_citation_candidate();
        }
    }

    // False-alarm candidates drain verbatim into the text buffer; the drained
    // characters are not re-scanned for new markers.
    fn drain_code_candidate(&mut self) {
        let drained = std::mem::take(&mut self.code_buffer);
        self.text_buffer.push_str(&drained);
        self.in_code_block = false;
    }

    fn drain_citation_candidate(&mut self) {
        let drained = std::mem::take(&mut self.citation_buffer);
        self.text_buffer.push_str(&drained);
        self.in_citation = false;
    }

    fn flush_text_buffer(&mut self, events: &mut Vec<AnswerEvent>) {
        if !self.text_buffer.is_empty() {
            events.push(AnswerEvent::Text(std::mem::take(&mut self.text_buffer)));
        }
    }
}

/// Build the event for a completed citation marker.
///
/// A payload that does not parse as a non-negative integer degrades to a
/// plain text event rather than failing the stream.
fn citation_event(buffer: String) -> AnswerEvent {
    let content = buffer.strip_suffix(CITATION_CLOSE_MARKER).unwrap_or(&buffer);
    let content = content.strip_prefix(CITATION_OPEN_MARKER).unwrap_or(content);
    let content = content.trim();

    match content.parse::<u32>() {
        Ok(number) => AnswerEvent::Citation(number),
        Err(_) => {
            warn!(
                payload = content,
                "invalid citation number between citation marker tags"
            );
            AnswerEvent::Text(content.to_string())
        }
    }
}
