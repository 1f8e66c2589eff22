use core::fmt::Debug;

use embedded_hal::digital::OutputPin;

use crate::error::DriverCommandError;

pub const BLINK_COUNT: usize = 2;
pub const BLINK_ON_MS: u32 = 100;
pub const BLINK_OFF_MS: u32 = 100;
pub const DOUBLE_BLINK_LEN: usize = BLINK_COUNT * 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// One indicator or actuator action. Produced by the orchestrator and the
/// knock sequence, consumed immediately by [`FeedbackRig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackStep {
    /// Clear, set the pixel, refresh.
    Show(Rgb),
    Clear,
    Hold { ms: u32 },
    Actuate(Level),
}

/// Addressable LED capability. `clear` also blanks the physical output.
pub trait IndicatorOps {
    type Error: Debug;

    fn set_pixel(&mut self, color: Rgb) -> Result<(), Self::Error>;
    fn refresh(&mut self) -> Result<(), Self::Error>;
    fn clear(&mut self) -> Result<(), Self::Error>;
}

/// Monotonic millisecond clock plus the ability to wait on it.
#[allow(async_fn_in_trait)]
pub trait TimeOps {
    fn now_ms(&self) -> u64;
    async fn hold_ms(&mut self, ms: u32);
}

pub const fn double_blink(color: Rgb) -> [FeedbackStep; DOUBLE_BLINK_LEN] {
    let blink = [
        FeedbackStep::Show(color),
        FeedbackStep::Hold { ms: BLINK_ON_MS },
        FeedbackStep::Clear,
        FeedbackStep::Hold { ms: BLINK_OFF_MS },
    ];
    [
        blink[0], blink[1], blink[2], blink[3], blink[0], blink[1], blink[2], blink[3],
    ]
}

/// Indicator and actuator owned together: whoever holds the rig is the only
/// writer of both.
pub struct FeedbackRig<I, A> {
    indicator: I,
    actuator: A,
}

impl<I, A> FeedbackRig<I, A>
where
    I: IndicatorOps,
    A: OutputPin,
{
    pub fn new(indicator: I, actuator: A) -> Self {
        Self {
            indicator,
            actuator,
        }
    }

    /// Applies a non-waiting step. `Hold` is a no-op here.
    pub fn apply(
        &mut self,
        step: FeedbackStep,
    ) -> Result<(), DriverCommandError<I::Error, A::Error>> {
        match step {
            FeedbackStep::Show(color) => self.show(color).map_err(DriverCommandError::Indicator),
            FeedbackStep::Clear => self.indicator.clear().map_err(DriverCommandError::Indicator),
            FeedbackStep::Hold { .. } => Ok(()),
            FeedbackStep::Actuate(Level::High) => {
                self.actuator.set_high().map_err(DriverCommandError::Actuator)
            }
            FeedbackStep::Actuate(Level::Low) => {
                self.actuator.set_low().map_err(DriverCommandError::Actuator)
            }
        }
    }

    fn show(&mut self, color: Rgb) -> Result<(), I::Error> {
        self.indicator.clear()?;
        self.indicator.set_pixel(color)?;
        self.indicator.refresh()
    }

    /// Runs one step to completion. Driver failures are logged and reported
    /// as `false`; the caller keeps going.
    pub async fn run_step<T: TimeOps>(&mut self, step: FeedbackStep, time: &mut T) -> bool {
        if let FeedbackStep::Hold { ms } = step {
            time.hold_ms(ms).await;
            return true;
        }

        match self.apply(step) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("feedback step {step:?} failed: {err:?}");
                false
            }
        }
    }

    /// Plays steps strictly in order. Returns the number of failed steps.
    pub async fn play<T, It>(&mut self, steps: It, time: &mut T) -> usize
    where
        T: TimeOps,
        It: IntoIterator<Item = FeedbackStep>,
    {
        let mut failures = 0;
        for step in steps {
            if !self.run_step(step, time).await {
                failures += 1;
            }
        }
        failures
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut I {
        &mut self.indicator
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}
