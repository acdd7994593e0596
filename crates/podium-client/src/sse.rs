//! Incremental decoder for `text/event-stream` frames.
//!
//! Pure byte-in, event-out state machine so the framing can be tested
//! without a network. Chunk boundaries may fall anywhere, including
//! mid-line.

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name from the `event:` field; `message` when absent.
    pub name: String,
    /// Concatenated `data:` lines.
    pub data: String,
}

/// Incremental `text/event-stream` decoder.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: String,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event the chunk completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if let Some(event) = self.flush() {
                    events.push(event);
                }
            } else {
                self.field(line);
            }
        }
        events
    }

    fn field(&mut self, line: &str) {
        if line.starts_with(':') {
            // Comment line, commonly used as keep-alive padding.
            return;
        }
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match name {
            "event" => self.event_name = Some(value.to_owned()),
            "data" => self.data_lines.push(value.to_owned()),
            // `id` and `retry` are not used by this client.
            _ => {}
        }
    }

    fn flush(&mut self) -> Option<SseEvent> {
        if self.event_name.is_none() && self.data_lines.is_empty() {
            return None;
        }
        let name = self.event_name.take().unwrap_or_else(|| "message".to_owned());
        let data = std::mem::take(&mut self.data_lines).join("\n");
        Some(SseEvent { name, data })
    }
}
