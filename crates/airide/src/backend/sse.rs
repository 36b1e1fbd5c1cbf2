//! Minimal `text/event-stream` decoder.
//!
//! Only `data:` fields matter to the instruction stream. Comment lines
//! (starting with `:`) are keep-alives; `event`, `id` and `retry` fields
//! are ignored.

/// Incremental decoder: feed it raw chunks, get back complete event payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the data of every event it completes.
    ///
    /// Chunks may split lines (and UTF-8 sequences) anywhere.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        events
    }

    /// Check if a partial event is buffered.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || !self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"testo\":\"ciao\"}\n\n");
        assert_eq!(events, vec![r#"{"testo":"ciao"}"#]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_comments_are_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": waiting for GPS update\n\n: GPS tracking...\n\ndata: x\n\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").is_empty());
        assert!(decoder.push(b"ta: hel").is_empty());
        assert!(decoder.push(b"lo\n").is_empty());
        assert!(decoder.has_pending());
        assert_eq!(decoder.push(b"\n"), vec!["hello"]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let payload = "data: Percorso completato 🎉\n\n".as_bytes();
        let split = payload.len() - 4;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&payload[..split]).is_empty());
        assert_eq!(decoder.push(&payload[split..]), vec!["Percorso completato 🎉"]);
    }

    #[test]
    fn test_crlf_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: step\r\ndata: a\r\ndata: b\r\n\r\n");
        assert_eq!(events, vec!["a\nb"]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: 1\n\ndata: 2\n\ndata: 3");
        assert_eq!(events, vec!["1", "2"]);
        assert!(decoder.has_pending());
    }
}
