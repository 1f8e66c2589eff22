//! Line protocol spoken with the host-side chat relay over the serial port.

use core::fmt::Write as _;

use heapless::String;

use crate::{
    notify::{ChannelId, UserId, NOTIFY_TEXT_MAX},
    responder::{InboundMessage, INBOUND_CONTENT_MAX},
};

pub const BRIDGE_LINE_MAX: usize = 320;
pub const NOTIFY_LINE_MAX: usize = NOTIFY_TEXT_MAX + 40;

pub type NotifyLine = String<NOTIFY_LINE_MAX>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeCommand {
    LinkUp(UserId),
    LinkDown,
    Message(InboundMessage),
    Time(u64),
}

pub enum LineReadEvent<'a> {
    None,
    Complete(&'a [u8]),
    Overflow,
}

/// Assembles CR/LF terminated lines. A line longer than `N` is dropped
/// whole, reported once as `Overflow`.
pub struct SerialLineReader<const N: usize> {
    line_buf: [u8; N],
    line_len: usize,
    overflowed: bool,
}

impl<const N: usize> SerialLineReader<N> {
    pub const fn new() -> Self {
        Self {
            line_buf: [0; N],
            line_len: 0,
            overflowed: false,
        }
    }

    pub fn push_byte(&mut self, byte: u8) -> LineReadEvent<'_> {
        if byte == b'\r' || byte == b'\n' {
            if self.overflowed {
                self.overflowed = false;
                return LineReadEvent::None;
            }
            if self.line_len == 0 {
                return LineReadEvent::None;
            }
            let complete_len = self.line_len;
            self.line_len = 0;
            return LineReadEvent::Complete(&self.line_buf[..complete_len]);
        }

        if self.overflowed {
            return LineReadEvent::None;
        }

        if self.line_len < N {
            self.line_buf[self.line_len] = byte;
            self.line_len += 1;
            return LineReadEvent::None;
        }

        self.line_len = 0;
        self.overflowed = true;
        LineReadEvent::Overflow
    }
}

impl<const N: usize> Default for SerialLineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_bridge_line(line: &[u8]) -> Option<BridgeCommand> {
    let line = trim_ascii_whitespace(line);
    let (verb, rest) = split_token(line);
    match verb {
        b"LINK" => {
            let (state, rest) = split_token(rest);
            match state {
                b"UP" => {
                    let (user, rest) = parse_u64_token(rest)?;
                    rest.is_empty().then_some(BridgeCommand::LinkUp(UserId(user)))
                }
                b"DOWN" if rest.is_empty() => Some(BridgeCommand::LinkDown),
                _ => None,
            }
        }
        b"TIME" => {
            let (epoch, rest) = parse_u64_token(rest)?;
            rest.is_empty().then_some(BridgeCommand::Time(epoch))
        }
        b"MSG" => parse_message(rest).map(BridgeCommand::Message),
        _ => None,
    }
}

fn parse_message(rest: &[u8]) -> Option<InboundMessage> {
    let (channel, rest) = parse_u64_token(rest)?;
    let (author, rest) = parse_u64_token(rest)?;
    let (dm, content) = split_token(rest);
    let is_direct_message = match dm {
        b"0" => false,
        b"1" => true,
        _ => return None,
    };

    let content = core::str::from_utf8(content).ok()?;
    let mut owned = String::<INBOUND_CONTENT_MAX>::new();
    owned.push_str(content).ok()?;
    Some(InboundMessage {
        channel: ChannelId(channel),
        author: UserId(author),
        content: owned,
        is_direct_message,
    })
}

/// `NOTIFY <channel> <text>\r\n`. Line breaks inside the text become spaces
/// so one notification is always one line.
pub fn format_notify_line(channel: ChannelId, text: &str) -> NotifyLine {
    let mut line = NotifyLine::new();
    let _ = write!(line, "NOTIFY {} ", channel.0);
    for ch in text.chars() {
        let ch = if ch == '\r' || ch == '\n' { ' ' } else { ch };
        if line.len() + ch.len_utf8() + 2 > NOTIFY_LINE_MAX {
            break;
        }
        let _ = line.push(ch);
    }
    let _ = line.push_str("\r\n");
    line
}

fn trim_ascii_whitespace(line: &[u8]) -> &[u8] {
    let mut start = 0usize;
    let mut end = line.len();
    while start < end && line[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && line[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    &line[start..end]
}

/// First whitespace-delimited token and the rest with its single separator
/// removed. Content after the separator is kept verbatim.
fn split_token(line: &[u8]) -> (&[u8], &[u8]) {
    match line.iter().position(|byte| *byte == b' ') {
        Some(idx) => (&line[..idx], &line[idx + 1..]),
        None => (line, &line[line.len()..]),
    }
}

fn parse_u64_token(line: &[u8]) -> Option<(u64, &[u8])> {
    let (token, rest) = split_token(line);
    if token.is_empty() {
        return None;
    }
    let mut value = 0u64;
    for byte in token {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value
            .checked_mul(10)?
            .checked_add(u64::from(byte - b'0'))?;
    }
    Some((value, rest))
}
