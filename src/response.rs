//! Response emission and per-request context

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use serde_json::Value;
use crate::Result;

/// Where a command's JSON result goes
pub trait ResponseEmitter {
    /// Write one JSON document to the caller and mark the response sent
    fn emit(&mut self, document: &Value) -> Result<()>;

    fn is_sent(&self) -> bool;
}

/// Writes a `Content-Type` header block followed by styled JSON to a stream
pub struct StreamEmitter<W: Write> {
    out: W,
    with_header: bool,
    sent: bool,
}

impl<W: Write> StreamEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, with_header: true, sent: false }
    }

    /// Emit only the JSON body (CLI use)
    pub fn body_only(out: W) -> Self {
        Self { out, with_header: false, sent: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResponseEmitter for StreamEmitter<W> {
    fn emit(&mut self, document: &Value) -> Result<()> {
        let mut body = serde_json::to_string_pretty(document)?;
        body.push('\n');

        if self.with_header {
            let header = format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                body.len()
            );
            if let Err(e) = self.out.write_all(header.as_bytes()) {
                tracing::error!("Error writing response header: {}", e);
            }
        }

        self.out.write_all(body.as_bytes())?;
        self.out.flush()?;
        self.sent = true;
        Ok(())
    }

    fn is_sent(&self) -> bool {
        self.sent
    }
}

/// Keeps the emitted document for a transport that frames it itself
#[derive(Debug, Default)]
pub struct CapturedEmitter {
    document: Option<Value>,
}

impl CapturedEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Option<Value> {
        self.document.take()
    }
}

impl ResponseEmitter for CapturedEmitter {
    fn emit(&mut self, document: &Value) -> Result<()> {
        self.document = Some(document.clone());
        Ok(())
    }

    fn is_sent(&self) -> bool {
        self.document.is_some()
    }
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// State for one inbound command: its id, log span and output channel
pub struct RequestContext<'a> {
    pub request_id: u64,
    pub span: tracing::Span,
    emitter: &'a mut dyn ResponseEmitter,
}

impl<'a> RequestContext<'a> {
    pub fn new(emitter: &'a mut dyn ResponseEmitter) -> Self {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!("annotation", request_id);
        Self { request_id, span, emitter }
    }

    pub fn emit(&mut self, document: &Value) -> Result<()> {
        self.emitter.emit(document)
    }

    pub fn is_sent(&self) -> bool {
        self.emitter.is_sent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_emitter_writes_header_then_body() {
        let mut emitter = StreamEmitter::new(Vec::new());
        assert!(!emitter.is_sent());

        emitter.emit(&json!({"success": true})).unwrap();
        assert!(emitter.is_sent());

        let text = String::from_utf8(emitter.into_inner()).unwrap();
        let (header, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(header.starts_with("Content-Type: application/json"));
        assert!(header.contains(&format!("Content-Length: {}", body.len())));
        assert_eq!(serde_json::from_str::<Value>(body).unwrap(), json!({"success": true}));
    }

    #[test]
    fn test_body_only_is_plain_json() {
        let mut emitter = StreamEmitter::body_only(Vec::new());
        emitter.emit(&json!([1, 2])).unwrap();
        let text = String::from_utf8(emitter.into_inner()).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_context_ids_are_unique() {
        let mut a = CapturedEmitter::new();
        let mut b = CapturedEmitter::new();
        let first = RequestContext::new(&mut a).request_id;
        let second = RequestContext::new(&mut b).request_id;
        assert_ne!(first, second);
    }

    #[test]
    fn test_captured_emitter() {
        let mut captured = CapturedEmitter::new();
        {
            let mut ctx = RequestContext::new(&mut captured);
            ctx.emit(&json!({"x": 1})).unwrap();
            assert!(ctx.is_sent());
        }
        assert_eq!(captured.take(), Some(json!({"x": 1})));
        assert!(!captured.is_sent());
    }
}
