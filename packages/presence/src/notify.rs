use core::fmt::Debug;

use heapless::String;

use crate::error::NotifyError;

pub const NOTIFY_TEXT_MAX: usize = 192;
pub const PRESENT_GLYPH: &str = "🟢";
pub const ABSENT_GLYPH: &str = "🔴";

pub type NotifyText = String<NOTIFY_TEXT_MAX>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

/// Remote chat notification capability.
pub trait NotifierOps {
    type Error: Debug;

    fn connection_state(&self) -> ConnectionState;
    fn send(&mut self, channel: ChannelId, text: &str) -> Result<MessageId, Self::Error>;
}

/// Picks an index in `0..len`. `len` is never zero.
pub trait MessagePicker {
    fn choose(&mut self, len: usize) -> usize;
}

/// Always picks the same slot, wrapped into range.
#[derive(Clone, Copy, Debug)]
pub struct FixedPicker(pub usize);

impl MessagePicker for FixedPicker {
    fn choose(&mut self, len: usize) -> usize {
        self.0 % len
    }
}

#[derive(Clone, Copy, Debug)]
pub struct XorShiftPicker {
    state: u32,
}

impl XorShiftPicker {
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl MessagePicker for XorShiftPicker {
    fn choose(&mut self, len: usize) -> usize {
        self.next_u32() as usize % len
    }
}

/// Picks one message from `pool`. An empty pool yields an empty body.
pub fn pick<'a, P: MessagePicker>(pool: &[&'a str], picker: &mut P) -> &'a str {
    if pool.is_empty() {
        return "";
    }
    pool.get(picker.choose(pool.len()))
        .copied()
        .unwrap_or(pool[0])
}

/// `"<glyph> <body>"`, cut at a char boundary if it does not fit.
pub fn compose(glyph: &str, body: &str) -> NotifyText {
    let mut text = NotifyText::new();
    push_truncated(&mut text, glyph);
    if !glyph.is_empty() && !body.is_empty() {
        push_truncated(&mut text, " ");
    }
    push_truncated(&mut text, body);
    text
}

pub(crate) fn push_truncated<const N: usize>(text: &mut String<N>, tail: &str) -> bool {
    for ch in tail.chars() {
        if text.push(ch).is_err() {
            return false;
        }
    }
    true
}

/// Sends unless the collaborator is disconnected. Never retries.
pub fn send_best_effort<N: NotifierOps>(
    notifier: &mut N,
    channel: ChannelId,
    text: &str,
) -> Result<MessageId, NotifyError<N::Error>> {
    if notifier.connection_state() != ConnectionState::Connected {
        log::warn!("notifier not connected, dropping: {text}");
        return Err(NotifyError::Unavailable);
    }

    match notifier.send(channel, text) {
        Ok(id) => {
            log::info!("notification sent as #{}", id.0);
            Ok(id)
        }
        Err(err) => {
            log::error!("notification send failed: {err:?}");
            Err(NotifyError::Send(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_joins_glyph_and_body() {
        assert_eq!(compose(PRESENT_GLYPH, "Už jo.").as_str(), "🟢 Už jo.");
        assert_eq!(compose("", "plain").as_str(), "plain");
    }

    #[test]
    fn compose_truncates_on_char_boundary() {
        let mut body = std::string::String::new();
        for _ in 0..200 {
            body.push('ž');
        }
        let text = compose(ABSENT_GLYPH, &body);
        assert!(text.len() <= NOTIFY_TEXT_MAX);
        assert!(text.starts_with("🔴 ž"));
        assert!(text.ends_with('ž'));
    }

    #[test]
    fn xorshift_stays_in_range_and_varies() {
        let mut picker = XorShiftPicker::new(0);
        let mut seen = [false; 8];
        for _ in 0..200 {
            let idx = picker.choose(8);
            assert!(idx < 8);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn pick_handles_empty_pool() {
        assert_eq!(pick(&[], &mut FixedPicker(3)), "");
        assert_eq!(pick(&["a", "b"], &mut FixedPicker(3)), "b");
    }
}
