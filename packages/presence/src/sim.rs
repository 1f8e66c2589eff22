//! In-memory backends for every capability, for host tests and replay tools.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::Vec;

use crate::{
    feedback::{IndicatorOps, Level, Rgb, TimeOps},
    notify::{ChannelId, ConnectionState, MessageId, NotifierOps, NotifyText},
    sampler::TouchSensorOps,
};

pub const SIM_LOG_CAP: usize = 512;
pub const SIM_OUTBOX_CAP: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimFault;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicatorCall {
    SetPixel(Rgb),
    Refresh,
    Clear,
}

/// Single-pixel strip: `set_pixel` writes a buffer, `refresh` latches it,
/// `clear` blanks buffer and output.
#[derive(Debug, Default)]
pub struct SimIndicator {
    calls: Vec<IndicatorCall, SIM_LOG_CAP>,
    shown: Vec<Rgb, SIM_LOG_CAP>,
    buffer: Option<Rgb>,
    lit: Option<Rgb>,
    fail_remaining: u32,
}

impl SimIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` driver calls fail without effect.
    pub fn fail_next(&mut self, count: u32) {
        self.fail_remaining = count;
    }

    pub fn calls(&self) -> &[IndicatorCall] {
        &self.calls
    }

    /// Every colour latched by `refresh`, in order.
    pub fn shown(&self) -> &[Rgb] {
        &self.shown
    }

    pub fn times_shown(&self, color: Rgb) -> usize {
        self.shown.iter().filter(|shown| **shown == color).count()
    }

    pub fn lit(&self) -> Option<Rgb> {
        self.lit
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.shown.clear();
    }

    fn record(&mut self, call: IndicatorCall) -> Result<(), SimFault> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(SimFault);
        }
        let _ = self.calls.push(call);
        Ok(())
    }
}

impl IndicatorOps for SimIndicator {
    type Error = SimFault;

    fn set_pixel(&mut self, color: Rgb) -> Result<(), Self::Error> {
        self.record(IndicatorCall::SetPixel(color))?;
        self.buffer = Some(color);
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), Self::Error> {
        self.record(IndicatorCall::Refresh)?;
        self.lit = self.buffer;
        if let Some(color) = self.lit {
            let _ = self.shown.push(color);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.record(IndicatorCall::Clear)?;
        self.buffer = None;
        self.lit = None;
        Ok(())
    }
}

/// Solenoid stand-in that counts rising edges.
#[derive(Debug)]
pub struct SimActuator {
    level: Level,
    pulses: u32,
    levels: Vec<Level, SIM_LOG_CAP>,
}

impl SimActuator {
    pub fn new() -> Self {
        Self {
            level: Level::Low,
            pulses: 0,
            levels: Vec::new(),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    fn drive(&mut self, level: Level) {
        if self.level == Level::Low && level == Level::High {
            self.pulses += 1;
        }
        self.level = level;
        let _ = self.levels.push(level);
    }
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for SimActuator {
    type Error = Infallible;
}

impl OutputPin for SimActuator {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(Level::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(Level::High);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SimNotifier {
    state: ConnectionState,
    sent: Vec<(ChannelId, NotifyText), SIM_OUTBOX_CAP>,
    attempts: u32,
    reject_sends: bool,
}

impl SimNotifier {
    pub fn connected() -> Self {
        Self {
            state: ConnectionState::Connected,
            ..Self::default()
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Makes every following `send` fail after being counted.
    pub fn reject_sends(&mut self, reject: bool) {
        self.reject_sends = reject;
    }

    /// Number of `send` calls, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn sent(&self) -> &[(ChannelId, NotifyText)] {
        &self.sent
    }

    pub fn last_text(&self) -> Option<&str> {
        self.sent.last().map(|(_, text)| text.as_str())
    }
}

impl NotifierOps for SimNotifier {
    type Error = SimFault;

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn send(&mut self, channel: ChannelId, text: &str) -> Result<MessageId, Self::Error> {
        self.attempts += 1;
        if self.reject_sends {
            return Err(SimFault);
        }
        let mut owned = NotifyText::new();
        owned.push_str(text).map_err(|_| SimFault)?;
        self.sent.push((channel, owned)).map_err(|_| SimFault)?;
        Ok(MessageId(self.attempts))
    }
}

/// Clock that only moves when someone holds on it.
#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualClock {
    now_ms: u64,
}

impl VirtualClock {
    pub const fn new(start_ms: u64) -> Self {
        Self { now_ms: start_ms }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms = self.now_ms.saturating_add(ms);
    }
}

impl TimeOps for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    async fn hold_ms(&mut self, ms: u32) {
        self.advance(ms as u64);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptedSensorFault {
    Driver,
    Exhausted,
}

/// Replays a fixed list of readings; `None` entries are driver failures.
#[derive(Clone, Debug)]
pub struct ScriptedSensor<'a> {
    readings: &'a [Option<u16>],
    cursor: usize,
}

impl<'a> ScriptedSensor<'a> {
    pub fn new(readings: &'a [Option<u16>]) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }
}

impl TouchSensorOps for ScriptedSensor<'_> {
    type Error = ScriptedSensorFault;

    fn read_raw_touch(&mut self) -> Result<u16, Self::Error> {
        let reading = self
            .readings
            .get(self.cursor)
            .ok_or(ScriptedSensorFault::Exhausted)?;
        self.cursor += 1;
        reading.ok_or(ScriptedSensorFault::Driver)
    }
}
