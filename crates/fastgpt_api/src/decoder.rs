use serde_json::Value;

use crate::events::DeltaEvent;

const EVENT_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for the line-framed chat-completion byte stream.
///
/// Chunks are appended to an internal byte buffer and split on newline
/// boundaries; the trailing (possibly incomplete) fragment is retained
/// until the next [`feed`](Self::feed) or flushed by
/// [`finish`](Self::finish). The buffer holds raw bytes, not text: a
/// multibyte UTF-8 sequence split across chunks stays intact because
/// 0x0A never occurs inside one. Malformed lines are dropped, never
/// fatal.
#[derive(Debug, Default)]
pub struct DeltaFrameDecoder {
    buffer: Vec<u8>,
}

impl DeltaFrameDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete lines.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DeltaEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(split) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(0..=split).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);

            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush any residual buffered text as a final line once the source
    /// signals completion. The same non-fatal rules apply.
    pub fn finish(&mut self) -> Vec<DeltaEvent> {
        let residual = std::mem::take(&mut self.buffer);
        let residual = String::from_utf8_lossy(&residual);
        decode_line(&residual).into_iter().collect()
    }

    /// Decode a complete payload string in one shot.
    pub fn parse_lines(input: &str) -> Vec<DeltaEvent> {
        let mut decoder = Self::default();
        let mut events = decoder.feed(input.as_bytes());
        events.extend(decoder.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn decode_line(line: &str) -> Option<DeltaEvent> {
    let payload = line.trim().strip_prefix(EVENT_PREFIX)?.trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    let outer = serde_json::from_str::<Value>(payload).ok()?;
    let value = unwrap_proxy_envelope(outer)?;
    map_event(&value)
}

/// The proxy sometimes re-wraps an upstream payload as a single
/// string-valued `data` field; unwrap exactly one level. An unparsable
/// inner string leaves the outer object in force.
fn unwrap_proxy_envelope(value: Value) -> Option<Value> {
    let Some(inner) = value.get("data").and_then(Value::as_str) else {
        return Some(value);
    };

    if inner.trim() == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<Value>(inner) {
        Ok(unwrapped) => Some(unwrapped),
        Err(_) => Some(value),
    }
}

fn map_event(value: &Value) -> Option<DeltaEvent> {
    let delta = value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"));

    let content = delta
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let reasoning = delta
        .and_then(|delta| delta.get("reasoning_content"))
        .and_then(Value::as_str)
        .unwrap_or("");

    if content.is_empty() && reasoning.is_empty() {
        return None;
    }

    Some(DeltaEvent {
        content: content.to_owned(),
        reasoning: reasoning.to_owned(),
    })
}
