use thiserror::Error;

/// Longest line accepted before the stream is treated as broken
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SseError {
    #[error("event stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Incremental `text/event-stream` decoder. Feed it body chunks as they
/// arrive; complete messages come out once their terminating blank line is
/// seen. Chunk boundaries may fall anywhere, including inside a UTF-8
/// sequence or between the CR and LF of a line ending.
#[derive(Debug)]
pub struct SseDecoder {
    buf: Vec<u8>,
    max_line: usize,
    /// Last line ended in a CR at the end of a chunk; a leading LF belongs to it
    skip_lf: bool,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
            skip_lf: false,
            event: None,
            data: Vec::new(),
            id: None,
        }
    }

    /// Lines end in LF, CRLF or a lone CR.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseMessage>, SseError> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        loop {
            if self.skip_lf && !self.buf.is_empty() {
                if self.buf[0] == b'\n' {
                    self.buf.remove(0);
                }
                self.skip_lf = false;
            }

            let Some(pos) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') else {
                break;
            };

            let mut consumed = pos + 1;
            if self.buf[pos] == b'\r' {
                match self.buf.get(pos + 1) {
                    Some(b'\n') => consumed += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }

            let raw: Vec<u8> = self.buf.drain(..consumed).take(pos).collect();
            if raw.len() > self.max_line {
                return Err(SseError::LineTooLong { limit: self.max_line });
            }
            let line = String::from_utf8_lossy(&raw);
            if let Some(message) = self.process_line(&line) {
                out.push(message);
            }
        }

        if self.buf.len() > self.max_line {
            return Err(SseError::LineTooLong { limit: self.max_line });
        }
        Ok(out)
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            // retry and unknown fields are ignored
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseMessage {
            event,
            data,
            id: self.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_messages_on_blank_lines() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].data, "{\"a\":1}");
        assert_eq!(out[1].data, "{\"b\":2}");
    }

    #[test]
    fn handles_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: progress\r\nda").unwrap().is_empty());
        assert!(decoder.feed(b"ta: hello\r\n").unwrap().is_empty());
        let out = decoder.feed(b"\r\n").unwrap();
        assert_eq!(
            out,
            vec![SseMessage {
                event: Some("progress".to_string()),
                data: "hello".to_string(),
                id: None,
            }]
        );
    }

    #[test]
    fn joins_multiline_data_and_keeps_last_id() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b"id: 7\ndata: one\ndata: two\n\n: keepalive\n\ndata: three\n\n").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].data, "one\ntwo");
        assert_eq!(out[0].id.as_deref(), Some("7"));
        assert_eq!(out[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn survives_split_utf8() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: café\n\n".as_bytes();
        let (a, b) = bytes.split_at(10);
        assert!(decoder.feed(a).unwrap().is_empty());
        assert_eq!(decoder.feed(b).unwrap()[0].data, "café");
    }

    #[test]
    fn lone_cr_ends_lines() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b"data: one\r\rdata: two\r").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, "one");

        // LF after a chunk-final CR is the same line ending, not a blank line
        assert!(decoder.feed(b"\ndata: three\r").unwrap().is_empty());
        let out = decoder.feed(b"\r").unwrap();
        assert_eq!(out[0].data, "two\nthree");
    }

    #[test]
    fn unterminated_line_is_bounded() {
        let mut decoder = SseDecoder::with_max_line(16);
        assert!(decoder.feed(b"data: 0123456789").unwrap().is_empty());
        assert_eq!(
            decoder.feed(b"abcdef").unwrap_err(),
            SseError::LineTooLong { limit: 16 }
        );

        let mut decoder = SseDecoder::with_max_line(16);
        assert!(decoder.feed(b"data: 0123456789abcdef\n").is_err());
    }
}
