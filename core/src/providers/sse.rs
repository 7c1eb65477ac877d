//! Incremental server-sent-events decoder.
//!
//! Network reads split events (and UTF-8 sequences) at arbitrary byte offsets.
//! Bytes are held until a full line is available, so a multi-byte character is
//! never decoded in halves.

/// Accumulates raw bytes and yields the `data:` payload of each complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns payloads of events completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.line(&line[..line.len() - 1], &mut events);
        }
        events
    }

    /// Flush at end of stream: a trailing unterminated line and any event
    /// missing its blank-line terminator are still delivered.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.line(&line, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn line(&mut self, raw: &[u8], events: &mut Vec<String>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            self.dispatch(events);
            return;
        }
        let line = String::from_utf8_lossy(raw);
        if let Some(value) = line.strip_prefix("data:") {
            // A single leading space after the colon is part of the framing.
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data.push(value.to_string());
        }
        // `event:`, `id:`, `retry:` and `:` comments carry nothing we use.
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}
