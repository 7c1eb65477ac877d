//! Incremental splitter for the two-section answer layout.
//!
//! Every role is prompted to answer in two sections: a short headline under a
//! heading token, followed by a marker heading that opens the full body.
//!
//! ```text
//! ## 💡 One-Liner          <- headline token
//! Short claim.
//!
//! ## 📝 Full Argument      <- marker
//! Long reasoning ...
//! ```
//!
//! Chunks arrive at arbitrary boundaries, so the marker is searched in the
//! cumulative buffer rather than in each chunk. Only the tail window that
//! could hold a marker straddling the previous end is re-scanned.
//!
//! ## States
//!
//! | State          | Entered by                       | `feed` behaviour           |
//! |----------------|----------------------------------|----------------------------|
//! | `Accumulating` | construction                     | buffer + marker search     |
//! | `Split`        | first buffer containing marker   | append to full body        |
//! | `Finalized`    | `finalize()`                     | ignored                    |

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Rough upper bound of UTF-8 bytes a single generated token expands to.
const BYTES_PER_TOKEN: usize = 4;

/// Heading tokens that delimit the two sections of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLayout {
    /// Heading that precedes the headline text (stripped from the headline).
    pub headline_token: String,
    /// Heading that starts the full body. Must be non-empty.
    pub marker: String,
}

impl SectionLayout {
    pub fn new(headline_token: impl Into<String>, marker: impl Into<String>) -> Self {
        let layout = Self {
            headline_token: headline_token.into(),
            marker: marker.into(),
        };
        debug_assert!(!layout.marker.is_empty(), "section marker must be non-empty");
        layout
    }
}

/// Lifecycle of a parser instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParserState {
    /// Marker not seen yet; every chunk is searched.
    Accumulating,
    /// Marker seen; headline is fixed and chunks extend the full body.
    Split,
    /// Stream ended. Terminal.
    Finalized,
}

impl std::fmt::Display for ParserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulating => write!(f, "accumulating"),
            Self::Split => write!(f, "split"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

/// The two sections extracted from one role's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    /// Empty when the marker never appeared.
    pub headline: String,
    pub full_body: String,
}

/// Splits a chunked text stream into headline and full body.
///
/// Owned by exactly one generation task for the lifetime of one stream.
#[derive(Debug)]
pub struct SectionStreamParser {
    layout: SectionLayout,
    state: ParserState,
    buffer: String,
    headline: String,
    full_body: String,
    marker_found: bool,
    /// Expected ceiling for `buffer`, derived from the backend output cap.
    byte_bound: Option<usize>,
    bound_exceeded: bool,
}

impl SectionStreamParser {
    /// Parser with no declared output bound.
    pub fn new(layout: SectionLayout) -> Self {
        Self {
            layout,
            state: ParserState::Accumulating,
            buffer: String::new(),
            headline: String::new(),
            full_body: String::new(),
            marker_found: false,
            byte_bound: None,
            bound_exceeded: false,
        }
    }

    /// Parser whose buffer growth is bounded by the backend's output cap.
    ///
    /// The buffer holds the whole generation, so its size is bounded by
    /// `max_output_tokens`. The bound pre-sizes the buffer and is logged once
    /// if a backend overshoots it; content is never truncated.
    pub fn bounded(layout: SectionLayout, max_output_tokens: u32) -> Self {
        let bound = (max_output_tokens as usize).saturating_mul(BYTES_PER_TOKEN);
        let mut parser = Self::new(layout);
        parser.buffer.reserve(bound);
        parser.byte_bound = Some(bound);
        parser
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Whether the marker has been seen. Monotonic.
    pub fn headline_found(&self) -> bool {
        self.marker_found
    }

    /// Headline text; empty until the marker is found.
    pub fn headline(&self) -> &str {
        &self.headline
    }

    /// Full body. Only complete after `finalize`.
    pub fn full_body(&self) -> &str {
        &self.full_body
    }

    /// Consume one chunk.
    ///
    /// Returns `Some(headline)` on exactly one call: the first whose cumulative
    /// buffer contains the marker. Every other call returns `None`.
    pub fn feed(&mut self, chunk: &str) -> Option<&str> {
        match self.state {
            ParserState::Finalized => {
                warn!(
                    chunk_len = chunk.len(),
                    "chunk fed to finalized section parser; ignored"
                );
                None
            }
            ParserState::Split => {
                self.append(chunk);
                self.full_body.push_str(chunk);
                None
            }
            ParserState::Accumulating => {
                let search_from = self.tail_window_start();
                self.append(chunk);

                let offset = self.buffer[search_from..].find(self.layout.marker.as_str())?;
                let marker_at = search_from + offset;
                let body_at = marker_at + self.layout.marker.len();

                self.headline =
                    extract_headline(&self.buffer[..marker_at], &self.layout.headline_token);
                self.full_body = self.buffer[body_at..].to_string();
                self.marker_found = true;
                self.state = ParserState::Split;

                debug!(
                    marker_at,
                    headline_len = self.headline.len(),
                    "section marker found"
                );
                Some(self.headline.as_str())
            }
        }
    }

    /// Close the stream.
    ///
    /// With a marker, the full body is whitespace-trimmed. Without one, the whole
    /// buffer becomes the full body verbatim and the headline stays empty, so no
    /// content is dropped. Calling twice is a no-op.
    pub fn finalize(&mut self) {
        match self.state {
            ParserState::Finalized => {}
            ParserState::Split => {
                self.full_body = self.full_body.trim().to_string();
                self.state = ParserState::Finalized;
            }
            ParserState::Accumulating => {
                debug!(
                    buffered = self.buffer.len(),
                    "section marker never appeared; using whole output as full body"
                );
                self.full_body = self.buffer.clone();
                self.state = ParserState::Finalized;
            }
        }
    }

    /// Finalize (if needed) and take the extracted sections.
    pub fn into_sections(mut self) -> Sections {
        self.finalize();
        Sections {
            headline: self.headline,
            full_body: self.full_body,
        }
    }

    /// First byte offset where a marker straddling the current end could begin.
    fn tail_window_start(&self) -> usize {
        let overlap = self.layout.marker.len().saturating_sub(1);
        let mut start = self.buffer.len().saturating_sub(overlap);
        while !self.buffer.is_char_boundary(start) {
            start -= 1;
        }
        start
    }

    fn append(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        if let Some(bound) = self.byte_bound {
            if !self.bound_exceeded && self.buffer.len() > bound {
                self.bound_exceeded = true;
                warn!(
                    bound,
                    buffered = self.buffer.len(),
                    "generation exceeded its declared output bound"
                );
            }
        }
    }
}

/// Text after the last headline token (or the whole region), trimmed.
fn extract_headline(region: &str, token: &str) -> String {
    let text = if token.is_empty() {
        region
    } else {
        match region.rfind(token) {
            Some(at) => &region[at + token.len()..],
            None => region,
        }
    };
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> SectionLayout {
        SectionLayout::new("## One-Liner", "## Full Argument")
    }

    #[test]
    fn scenario_two_chunks() {
        let mut parser = SectionStreamParser::new(layout());
        assert_eq!(parser.feed("## One-Liner\nShort claim.\n\n"), None);
        assert_eq!(
            parser.feed("## Full Argument\nLong reasoning."),
            Some("Short claim.")
        );
        parser.finalize();
        assert_eq!(parser.headline(), "Short claim.");
        assert_eq!(parser.full_body(), "Long reasoning.");
    }

    #[test]
    fn marker_split_across_chunks_is_detected() {
        let mut parser = SectionStreamParser::new(layout());
        assert!(parser.feed("## One-Liner\nA.\n## Full").is_none());
        assert!(parser.feed(" Arg").is_none());
        assert_eq!(parser.feed("ument\nBody"), Some("A."));
        assert_eq!(parser.state(), ParserState::Split);
    }

    #[test]
    fn discovery_is_reported_once() {
        let mut parser = SectionStreamParser::new(layout());
        assert!(parser.feed("x ## Full Argument y").is_some());
        assert!(parser.feed(" ## Full Argument again").is_none());
        parser.finalize();
        assert_eq!(parser.full_body(), "y ## Full Argument again");
    }

    #[test]
    fn missing_marker_falls_back_to_whole_buffer() {
        let mut parser = SectionStreamParser::new(layout());
        parser.feed("  no structure ");
        parser.feed("at all\n");
        parser.finalize();
        assert_eq!(parser.headline(), "");
        assert_eq!(parser.full_body(), "  no structure at all\n");
        assert!(!parser.headline_found());
    }

    #[test]
    fn headline_without_token_uses_whole_region() {
        let mut parser = SectionStreamParser::new(SectionLayout::new("## One-Liner", "## X"));
        assert_eq!(parser.feed("abc## X\nhi"), Some("abc"));
        let sections = parser.into_sections();
        assert_eq!(sections.full_body, "hi");
    }

    #[test]
    fn headline_uses_text_after_last_token() {
        let mut parser = SectionStreamParser::new(layout());
        let found = parser
            .feed("## One-Liner draft ## One-Liner\n final \n## Full Argument")
            .map(str::to_string);
        assert_eq!(found.as_deref(), Some("final"));
    }

    #[test]
    fn feed_after_finalize_is_ignored() {
        let mut parser = SectionStreamParser::new(layout());
        parser.feed("## Full Argument body");
        parser.finalize();
        assert!(parser.feed("late").is_none());
        assert_eq!(parser.full_body(), "body");
        assert_eq!(parser.state(), ParserState::Finalized);
    }

    #[test]
    fn finalize_twice_is_noop() {
        let mut parser = SectionStreamParser::new(layout());
        parser.feed("## Full Argument\n body \n");
        parser.finalize();
        parser.finalize();
        assert_eq!(parser.full_body(), "body");
    }

    #[test]
    fn empty_chunks_are_harmless() {
        let mut parser = SectionStreamParser::new(layout());
        assert!(parser.feed("").is_none());
        assert!(parser.feed("## Full Argument").is_some());
        assert!(parser.feed("").is_none());
    }

    #[test]
    fn tail_window_respects_char_boundaries() {
        let mut parser =
            SectionStreamParser::new(SectionLayout::new("## 💡 One-Liner", "## 📝 Full Argument"));
        assert!(parser.feed("## 💡 One-Liner\n观点很短\n## 📝").is_none());
        assert_eq!(parser.feed(" Full Argument\n长论证"), Some("观点很短"));
        assert_eq!(parser.into_sections().full_body, "长论证");
    }

    #[test]
    fn bounded_parser_keeps_overflowing_content() {
        let mut parser = SectionStreamParser::bounded(layout(), 1);
        parser.feed("0123456789");
        parser.finalize();
        assert_eq!(parser.full_body(), "0123456789");
    }
}
