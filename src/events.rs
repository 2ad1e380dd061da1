//! SecuritySpy `++eventStream` listener.
//!
//! The stream body is plain text, one event per line:
//!
//! ```text
//! 20210504123456 10592 3 TRIGGER_M 128
//! 20210504123502 10593 3 FILE /Volumes/Video/Garden/2021-05-04/12-34-56 Garden M.m4v
//! ```
//!
//! Fields are the timestamp, a sequence number, the camera number (`X` for
//! server wide events), the event type and, for motion triggers, the reason
//! bitmask. Multipart boundaries and keep-alive lines are mixed in and do not
//! start with a numeric timestamp.

use crate::error::{Error, Result};
use crate::models::TriggerType;
use crate::store::DeviceStore;
use crate::transport::{EventByteStream, Transport};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SERVER_WIDE_CAMERA: &str = "X";
/// Shortest accepted timestamp token. Epoch milliseconds have 13 digits,
/// `YYYYMMDDhhmmss` stamps have 14.
const MIN_TIMESTAMP_DIGITS: usize = 13;
/// A partial line longer than this many chunks is dropped.
const MAX_LINE_CHUNKS: usize = 64;
const MIN_LINE_LIMIT: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `TRIGGER_M`
    MotionTriggered(TriggerType),
    /// `FILE`: a recording was written, the motion episode is over
    FileWritten,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraEvent {
    pub timestamp: String,
    pub camera_id: String,
    pub kind: EventKind,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LineError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("invalid trigger bitmask {0:?}")]
    InvalidBitmask(String),

    #[error("unknown trigger code {0}")]
    UnknownTrigger(u32),
}

/// Decodes one line of the event stream.
///
/// `Ok(None)` is returned for noise lines and for server wide events.
pub fn parse_event_line(line: &str) -> std::result::Result<Option<CameraEvent>, LineError> {
    let mut fields = line.split_whitespace();

    let timestamp = match fields.next() {
        Some(token)
            if token.len() >= MIN_TIMESTAMP_DIGITS && token.bytes().all(|b| b.is_ascii_digit()) =>
        {
            token
        }
        _ => return Ok(None),
    };
    let _sequence = fields.next().ok_or(LineError::MissingField("sequence"))?;
    let camera_id = fields.next().ok_or(LineError::MissingField("camera"))?;
    let event_type = fields.next().ok_or(LineError::MissingField("event type"))?;

    if camera_id == SERVER_WIDE_CAMERA {
        return Ok(None);
    }

    let kind = match event_type {
        "TRIGGER_M" => {
            let raw = fields.next().ok_or(LineError::MissingField("trigger bitmask"))?;
            let code: u32 = raw
                .parse()
                .map_err(|_| LineError::InvalidBitmask(raw.to_string()))?;
            let trigger = TriggerType::from_code(code).ok_or(LineError::UnknownTrigger(code))?;
            EventKind::MotionTriggered(trigger)
        }
        "FILE" => EventKind::FileWritten,
        other => EventKind::Other(other.to_string()),
    };

    Ok(Some(CameraEvent {
        timestamp: timestamp.to_string(),
        camera_id: camera_id.to_string(),
        kind,
    }))
}

/// Reassembles newline terminated lines from arbitrarily split chunks.
///
/// A partial line that grows past the limit is dropped along with the rest
/// of it up to the next newline.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    max_len: usize,
    discarding: bool,
}

impl LineDecoder {
    /// `capacity` is the expected chunk size. The line limit is derived
    /// from it.
    pub fn with_capacity(capacity: usize) -> Self {
        LineDecoder {
            buffer: Vec::with_capacity(capacity),
            scanned: 0,
            max_len: capacity.saturating_mul(MAX_LINE_CHUNKS).max(MIN_LINE_LIMIT),
            discarding: false,
        }
    }

    /// Appends a chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            if self.discarding {
                self.discarding = false;
            } else {
                lines.push(decode_line(&self.buffer[start..end]));
            }
            start = end + 1;
            self.scanned = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_len {
            warn!(
                "[Events] Dropping {} bytes without a line break",
                self.buffer.len()
            );
            self.buffer.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        lines
    }

    /// Returns the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || raw.is_empty() {
            return None;
        }
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Handle to the background task reading the event stream
pub struct EventListener {
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl EventListener {
    /// Spawns the listener on the current tokio runtime.
    pub fn spawn(
        transport: Transport,
        store: Arc<DeviceStore>,
        idle_timeout: Option<Duration>,
        buffer_capacity: usize,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            transport,
            store,
            cancel.clone(),
            idle_timeout,
            buffer_capacity,
        ));
        EventListener { cancel, task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels the task and waits for it to exit. Returns the error the
    /// task ended with if it had already died on its own.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                error!("[Events] Listener task failed: {}", e);
                Ok(())
            }
        }
    }
}

async fn run(
    transport: Transport,
    store: Arc<DeviceStore>,
    cancel: CancellationToken,
    idle_timeout: Option<Duration>,
    buffer_capacity: usize,
) -> Result<()> {
    let mut stream = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        opened = transport.open_event_stream() => match opened {
            Ok(stream) => stream,
            Err(e) => {
                error!("[Events] Failed to open event stream: {}", e);
                return Err(e);
            }
        },
    };
    info!("[Events] Listening for camera events");

    let mut decoder = LineDecoder::with_capacity(buffer_capacity);
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                info!("[Events] Listener stopped");
                return Ok(());
            }
            next = next_chunk(&mut stream, idle_timeout) => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                error!("[Events] Event stream failed: {}", e);
                return Err(e);
            }
            None => {
                if let Some(line) = decoder.finish() {
                    handle_line(&store, &line);
                }
                warn!("[Events] Event stream closed by server, listener exiting");
                return Err(Error::ListenerStreamClosed);
            }
        };

        for line in decoder.push(&chunk) {
            if cancel.is_cancelled() {
                info!("[Events] Listener stopped");
                return Ok(());
            }
            handle_line(&store, &line);
        }
    }
}

async fn next_chunk(
    stream: &mut EventByteStream,
    idle_timeout: Option<Duration>,
) -> Option<Result<bytes::Bytes>> {
    match idle_timeout {
        None => stream.next().await,
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(next) => next,
            Err(_) => Some(Err(Error::ListenerIdle(limit))),
        },
    }
}

fn handle_line(store: &DeviceStore, line: &str) {
    let event = match parse_event_line(line) {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(e) => {
            warn!("[Events] Skipping malformed event {:?}: {}", line, e);
            return;
        }
    };

    match store.apply_event(&event) {
        Ok(true) => match &event.kind {
            EventKind::MotionTriggered(trigger) => {
                info!("[Events] Motion on camera {} ({})", event.camera_id, trigger)
            }
            _ => debug!("[Events] Motion ended on camera {}", event.camera_id),
        },
        Ok(false) => {}
        Err(e) => warn!("[Events] Ignoring event: {}", e),
    }
}
