//! STOMP 1.2 frame encoding and decoding.
//!
//! A frame is `COMMAND\n(header:value\n)*\nbody\0`. Header names and values
//! are escaped on every frame except `CONNECT` and `CONNECTED`. A WebSocket
//! message may carry several frames or only heart-beat EOLs.

use std::fmt;
use std::time::Duration;

use campus_common::PresenceError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("frame is not terminated")]
    MissingTerminator,

    #[error("invalid header line: {0}")]
    InvalidHeader(String),

    #[error("invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    #[error("invalid content-length: {0}")]
    BadContentLength(String),
}

impl From<FrameError> for PresenceError {
    fn from(err: FrameError) -> Self {
        PresenceError::Frame(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // client
    Connect,
    Subscribe,
    Unsubscribe,
    Send,
    Disconnect,
    // server
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn parse(line: &str) -> Result<Self, FrameError> {
        match line {
            "CONNECT" | "STOMP" => Ok(Command::Connect),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "SEND" => Ok(Command::Send),
            "DISCONNECT" => Ok(Command::Disconnect),
            "CONNECTED" => Ok(Command::Connected),
            "MESSAGE" => Ok(Command::Message),
            "RECEIPT" => Ok(Command::Receipt),
            "ERROR" => Ok(Command::Error),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A single STOMP frame. Headers keep their wire order; lookups return the
/// first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body. Sets `content-type`; `content-length` is added
    /// on encode.
    pub fn json_body(mut self, body: impl Into<String>) -> Self {
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = body.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if name == "content-length" {
                continue;
            }
            push_header_part(&mut out, name, escape);
            out.push(':');
            push_header_part(&mut out, value, escape);
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

fn push_header_part(out: &mut String, part: &str, escape: bool) {
    if !escape {
        out.push_str(part);
        return;
    }
    for c in part.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode every frame in one WebSocket text message. Leading EOLs between
/// frames are heart-beats and are skipped; a message made only of EOLs
/// yields no frames.
pub fn decode_frames(text: &str) -> Result<Vec<Frame>, FrameError> {
    let mut frames = Vec::new();
    let mut rest = text;
    loop {
        rest = rest.trim_start_matches(|c: char| c == '\n' || c == '\r');
        if rest.is_empty() {
            return Ok(frames);
        }
        let (frame, remaining) = decode_one(rest)?;
        frames.push(frame);
        rest = remaining;
    }
}

fn decode_one(input: &str) -> Result<(Frame, &str), FrameError> {
    let mut pos = 0;
    let mut command: Option<Command> = None;
    let mut headers = Vec::new();

    let body_start = loop {
        let nl = input[pos..]
            .find('\n')
            .ok_or(FrameError::MissingTerminator)?
            + pos;
        let line = input[pos..nl].trim_end_matches('\r');
        pos = nl + 1;

        match command {
            None => command = Some(Command::parse(line)?),
            Some(cmd) => {
                if line.is_empty() {
                    break pos;
                }
                let (name, value) = line
                    .split_once(':')
                    .ok_or_else(|| FrameError::InvalidHeader(line.to_string()))?;
                if cmd.escapes_headers() {
                    headers.push((unescape(name)?, unescape(value)?));
                } else {
                    headers.push((name.to_string(), value.to_string()));
                }
            }
        }
    };

    let command = command.ok_or(FrameError::MissingTerminator)?;
    let remaining = &input[body_start..];

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .map(|(_, v)| v.as_str());

    let (body, after) = match content_length {
        Some(raw) => {
            let len: usize = raw
                .trim()
                .parse()
                .map_err(|_| FrameError::BadContentLength(raw.to_string()))?;
            let body = remaining
                .get(..len)
                .ok_or_else(|| FrameError::BadContentLength(raw.to_string()))?;
            let after = remaining
                .get(len..)
                .and_then(|tail| tail.strip_prefix('\0'))
                .ok_or(FrameError::MissingTerminator)?;
            (body, after)
        }
        None => {
            let nul = remaining.find('\0').ok_or(FrameError::MissingTerminator)?;
            (&remaining[..nul], &remaining[nul + 1..])
        }
    };

    Ok((
        Frame {
            command,
            headers,
            body: body.to_string(),
        },
        after,
    ))
}

// ---------------------------------------------------------------------------
// Heart-beat negotiation
// ---------------------------------------------------------------------------

/// Negotiated heart-beat periods. Zero means disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    /// How often we must send something.
    pub outgoing: Duration,
    /// How often the broker promised to send something.
    pub incoming: Duration,
}

impl HeartBeat {
    /// Combine our `(cx, cy)` offer with the broker's `heart-beat: sx,sy`
    /// header.
    pub fn negotiate(client_out_ms: u64, client_in_ms: u64, server: Option<&str>) -> Self {
        let (server_out_ms, server_in_ms) = server
            .and_then(|raw| raw.split_once(','))
            .and_then(|(sx, sy)| Some((sx.trim().parse().ok()?, sy.trim().parse().ok()?)))
            .unwrap_or((0u64, 0u64));

        let pick = |ours: u64, theirs: u64| {
            if ours == 0 || theirs == 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(ours.max(theirs))
            }
        };

        Self {
            outgoing: pick(client_out_ms, server_in_ms),
            incoming: pick(client_in_ms, server_out_ms),
        }
    }
}
