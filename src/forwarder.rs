use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::{debug, error, warn};
use serde::Deserialize;
use std::fmt::Display;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSchema {
    Chat,
    Legacy,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<EventChoice>,
}

#[derive(Deserialize)]
struct EventChoice {
    #[serde(default)]
    delta: Option<EventDelta>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct EventDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChunkSchema {
    fn fragment(self, event: StreamEvent) -> Option<String> {
        let choice = event.choices.into_iter().next()?;
        match self {
            ChunkSchema::Chat => choice.delta.and_then(|delta| delta.content),
            ChunkSchema::Legacy => choice.text,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Fragment(String),
    Done,
    Skip,
}

pub fn parse_line(line: &str, schema: ChunkSchema) -> LineOutcome {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return LineOutcome::Skip;
    }

    let message = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    if message == DONE_SENTINEL {
        return LineOutcome::Done;
    }

    match serde_json::from_str::<StreamEvent>(message) {
        Ok(event) if event.choices.is_empty() => {
            warn!("Stream message without choices: {}", message);
            LineOutcome::Skip
        }
        Ok(event) => match schema.fragment(event) {
            Some(fragment) if !fragment.is_empty() => LineOutcome::Fragment(fragment),
            _ => LineOutcome::Skip,
        },
        Err(e) => {
            warn!("Could not JSON parse stream message {:?}: {}", message, e);
            LineOutcome::Skip
        }
    }
}

// Lines are split on raw bytes before decoding, so a multi-byte character cut
// by a chunk boundary survives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        lines
    }

    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

// Ends on the sentinel, on upstream close, or on an upstream error.
pub fn forward<S, E>(upstream: S, schema: ChunkSchema) -> impl Stream<Item = Bytes>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    stream! {
        let mut upstream = upstream;
        let mut lines = LineBuffer::default();

        'relay: loop {
            let chunk = match upstream.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    error!("Upstream stream failed: {}", e);
                    break;
                }
                None => {
                    if let Some(rest) = lines.finish() {
                        if let LineOutcome::Fragment(fragment) = parse_line(&rest, schema) {
                            yield Bytes::from(fragment);
                        }
                    }
                    debug!("Upstream closed without sentinel");
                    break;
                }
            };

            for line in lines.push(&chunk) {
                match parse_line(&line, schema) {
                    LineOutcome::Fragment(fragment) => {
                        yield Bytes::from(fragment);
                    }
                    LineOutcome::Done => break 'relay,
                    LineOutcome::Skip => {}
                }
            }
        }
    }
}
