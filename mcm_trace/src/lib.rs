//! Recorded input sessions for the MCM input bridge.
//!
//! A session is a list of timestamped [`TraceEvent`]s: engine button and
//! thumbstick events, polled controller frames, menu open/close and plain
//! ticks. Sessions are stored either as JSON (hand-written fixtures) or as a
//! capture file:
//!
//! ```text
//! "MCMT" u16 revision
//! u32 len | MessagePack Hello
//! u32 len | u64 time_ms | MessagePack TraceEvent   (repeated)
//! ```
//!
//! All integers are big-endian; `len` counts the bytes after itself.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use bytes::{Buf, BufMut};
use log::debug;
use mcm_input::{ButtonEvent, ControllerSnapshot, ThumbstickEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leading bytes of every capture file.
pub const CAPTURE_MAGIC: [u8; 4] = *b"MCMT";

pub const CAPTURE_REVISION: u16 = 2;

/// Capture file extension.
pub const CAPTURE_EXTENSION: &str = "mcmt";

const FILE_HEADER_LEN: usize = CAPTURE_MAGIC.len() + 2;
const TIME_LEN: usize = 8;

/// First record of every capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub protocol: String,
    pub producer: String,
    pub build: Option<String>,
}

impl Hello {
    pub fn new(producer: impl Into<String>, build: Option<String>) -> Self {
        Self {
            protocol: "MCMTrace".to_string(),
            producer: producer.into(),
            build,
        }
    }
}

/// One hardware poll. A missing hand means the runtime reported no device
/// for that role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerFrame {
    #[serde(default)]
    pub left: Option<ControllerSnapshot>,
    #[serde(default)]
    pub right: Option<ControllerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    MenuOpened,
    MenuClosed,
    /// A frame with no new input.
    Tick,
    Controller(ControllerFrame),
    Button(ButtonEvent),
    Thumbstick(ThumbstickEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Milliseconds since the session started.
    pub time_ms: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("not a capture file")]
    NotACapture,
    #[error("capture revision {0} is not supported")]
    UnsupportedRevision(u16),
    #[error("record at byte {offset} needs {needed} bytes, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("record of {0} bytes is too large")]
    RecordTooLarge(usize),
    #[error("record decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("record encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("trace json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("capture io error: {0}")]
    Io(#[from] std::io::Error),
}

fn put_record(out: &mut Vec<u8>, time_ms: Option<u64>, body: &[u8]) -> Result<(), CaptureError> {
    let len = body.len() + if time_ms.is_some() { TIME_LEN } else { 0 };
    let len = u32::try_from(len).map_err(|_| CaptureError::RecordTooLarge(len))?;
    out.put_u32(len);
    if let Some(time_ms) = time_ms {
        out.put_u64(time_ms);
    }
    out.put_slice(body);
    Ok(())
}

/// Encodes one entry as a capture record.
pub fn encode_record(entry: &TraceEntry) -> Result<Vec<u8>, CaptureError> {
    let body = rmp_serde::to_vec_named(&entry.event)?;
    let mut out = Vec::with_capacity(4 + TIME_LEN + body.len());
    put_record(&mut out, Some(entry.time_ms), &body)?;
    Ok(out)
}

/// Reads records off a capture body, tracking the byte offset for errors.
struct RecordReader<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> RecordReader<'a> {
    fn take(&mut self, needed: usize) -> Result<&'a [u8], CaptureError> {
        if self.input.remaining() < needed {
            return Err(CaptureError::Truncated {
                offset: self.offset,
                needed,
                available: self.input.remaining(),
            });
        }
        let (head, tail) = self.input.split_at(needed);
        self.input = tail;
        self.offset += needed;
        Ok(head)
    }

    fn next_record(&mut self) -> Result<&'a [u8], CaptureError> {
        let mut len = self.take(4)?;
        let len = len.get_u32() as usize;
        self.take(len)
    }

    fn next_entry(&mut self) -> Result<TraceEntry, CaptureError> {
        let mut record = self.next_record()?;
        if record.len() < TIME_LEN {
            return Err(CaptureError::Truncated {
                offset: self.offset - record.len(),
                needed: TIME_LEN,
                available: record.len(),
            });
        }
        let time_ms = record.get_u64();
        let event = rmp_serde::from_slice(record)?;
        Ok(TraceEntry { time_ms, event })
    }
}

/// A decoded capture file.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub hello: Hello,
    pub entries: Vec<TraceEntry>,
}

pub fn decode_capture(bytes: &[u8]) -> Result<Capture, CaptureError> {
    if bytes.len() < FILE_HEADER_LEN || bytes[..CAPTURE_MAGIC.len()] != CAPTURE_MAGIC {
        return Err(CaptureError::NotACapture);
    }
    let mut revision = &bytes[CAPTURE_MAGIC.len()..FILE_HEADER_LEN];
    let revision = revision.get_u16();
    if revision != CAPTURE_REVISION {
        return Err(CaptureError::UnsupportedRevision(revision));
    }

    let mut reader = RecordReader {
        input: &bytes[FILE_HEADER_LEN..],
        offset: FILE_HEADER_LEN,
    };
    let hello: Hello = rmp_serde::from_slice(reader.next_record()?)?;
    let mut entries = Vec::new();
    while reader.input.has_remaining() {
        entries.push(reader.next_entry()?);
    }
    debug!(
        "decoded {} capture entries from {}",
        entries.len(),
        hello.producer
    );
    Ok(Capture { hello, entries })
}

/// Loads a session from disk; `.mcmt` files are captures, anything else is
/// read as a JSON list of entries.
pub fn load_trace(path: &Path) -> Result<Vec<TraceEntry>, CaptureError> {
    let bytes = std::fs::read(path)?;
    let is_capture = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(CAPTURE_EXTENSION))
        .unwrap_or(false);
    if is_capture {
        Ok(decode_capture(&bytes)?.entries)
    } else {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Receives every input event the handler sees.
pub trait TraceSink {
    fn record(&mut self, now: Instant, event: &TraceEvent) -> Result<(), CaptureError>;
}

fn millis_since(origin: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(origin).as_millis() as u64
}

/// Writes a capture to any `Write`.
#[derive(Debug)]
pub struct CaptureWriter<W: Write> {
    out: W,
    origin: Instant,
    entries: usize,
}

impl<W: Write> CaptureWriter<W> {
    /// Writes the file header and the hello record immediately.
    pub fn new(mut out: W, origin: Instant, hello: &Hello) -> Result<Self, CaptureError> {
        let mut head = Vec::with_capacity(FILE_HEADER_LEN + 64);
        head.put_slice(&CAPTURE_MAGIC);
        head.put_u16(CAPTURE_REVISION);
        put_record(&mut head, None, &rmp_serde::to_vec_named(hello)?)?;
        out.write_all(&head)?;
        Ok(Self {
            out,
            origin,
            entries: 0,
        })
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn finish(mut self) -> Result<W, CaptureError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> TraceSink for CaptureWriter<W> {
    fn record(&mut self, now: Instant, event: &TraceEvent) -> Result<(), CaptureError> {
        let entry = TraceEntry {
            time_ms: millis_since(self.origin, now),
            event: event.clone(),
        };
        self.out.write_all(&encode_record(&entry)?)?;
        self.entries += 1;
        Ok(())
    }
}

/// Keeps recorded entries in memory.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    origin: Instant,
    pub entries: Vec<TraceEntry>,
}

impl TraceRecorder {
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            entries: Vec::new(),
        }
    }
}

impl TraceSink for TraceRecorder {
    fn record(&mut self, now: Instant, event: &TraceEvent) -> Result<(), CaptureError> {
        self.entries.push(TraceEntry {
            time_ms: millis_since(self.origin, now),
            event: event.clone(),
        });
        Ok(())
    }
}
