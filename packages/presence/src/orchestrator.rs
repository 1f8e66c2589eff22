use embedded_hal::digital::OutputPin;

use crate::{
    config::{NotifyConfig, PresenceConfig},
    debounce::TransitionEvent,
    error::NotifyError,
    feedback::{double_blink, FeedbackRig, FeedbackStep, IndicatorOps, Rgb, TimeOps},
    notify::{
        compose, pick, send_best_effort, ChannelId, MessageId, MessagePicker, NotifierOps,
        ABSENT_GLYPH, PRESENT_GLYPH,
    },
    sampler::Presence,
    visibility::VisibilityTimer,
};

pub const SETTLE_MS: u32 = 100;
pub const VISIBILITY_LEAD_MS: u32 = 200;
pub const VISIBILITY_COLOR: Rgb = Rgb::WHITE;

/// Turns committed transitions into LED feedback and a chat notification,
/// and owns the visibility cue's timer.
pub struct Orchestrator {
    channel: ChannelId,
    present_messages: &'static [&'static str],
    absent_messages: &'static [&'static str],
    visibility: VisibilityTimer,
}

impl Orchestrator {
    pub fn new(presence: &PresenceConfig, notify: &NotifyConfig) -> Self {
        Self {
            channel: notify.channel_id,
            present_messages: notify.present_messages,
            absent_messages: notify.absent_messages,
            visibility: VisibilityTimer::new(presence.visibility_duration_ms()),
        }
    }

    pub fn visibility(&self) -> &VisibilityTimer {
        &self.visibility
    }

    /// Plays the feedback for `event`, then notifies. Indicator feedback
    /// never depends on the notification outcome.
    pub async fn on_transition<I, A, N, P, T>(
        &mut self,
        event: TransitionEvent,
        rig: &mut FeedbackRig<I, A>,
        notifier: &mut N,
        picker: &mut P,
        time: &mut T,
    ) -> Result<MessageId, NotifyError<N::Error>>
    where
        I: IndicatorOps,
        A: OutputPin,
        N: NotifierOps,
        P: MessagePicker,
        T: TimeOps,
    {
        self.visibility_off(rig);
        rig.run_step(FeedbackStep::Hold { ms: SETTLE_MS }, time).await;

        let (glyph, pool) = match event.new_state {
            Presence::Present => {
                rig.play(double_blink(Rgb::GREEN), time).await;
                (PRESENT_GLYPH, self.present_messages)
            }
            Presence::Absent => {
                rig.play(double_blink(Rgb::RED), time).await;
                rig.run_step(FeedbackStep::Hold { ms: VISIBILITY_LEAD_MS }, time).await;
                self.visibility_on(rig, time.now_ms());
                (ABSENT_GLYPH, self.absent_messages)
            }
        };

        let text = compose(glyph, pick(pool, picker));
        send_best_effort(notifier, self.channel, &text)
    }

    pub fn visibility_due(&self, now_ms: u64) -> bool {
        self.visibility.is_expired(now_ms)
    }

    /// Switches the visibility cue off once its time is up. Returns whether
    /// it did so on this call.
    pub fn age_visibility<I, A>(&mut self, now_ms: u64, rig: &mut FeedbackRig<I, A>) -> bool
    where
        I: IndicatorOps,
        A: OutputPin,
    {
        if !self.visibility.is_expired(now_ms) {
            return false;
        }
        log::info!("visibility LED off after {} ms", self.visibility.duration_ms());
        self.visibility_off(rig);
        true
    }

    fn visibility_on<I, A>(&mut self, rig: &mut FeedbackRig<I, A>, now_ms: u64)
    where
        I: IndicatorOps,
        A: OutputPin,
    {
        if let Err(err) = rig.apply(FeedbackStep::Show(VISIBILITY_COLOR)) {
            log::warn!("visibility LED on failed: {err:?}");
        }
        self.visibility.start(now_ms);
    }

    /// Forces the cue dark whether or not the timer was running.
    fn visibility_off<I, A>(&mut self, rig: &mut FeedbackRig<I, A>)
    where
        I: IndicatorOps,
        A: OutputPin,
    {
        self.visibility.cancel();
        if let Err(err) = rig.apply(FeedbackStep::Clear) {
            log::warn!("visibility LED off failed: {err:?}");
        }
    }
}
