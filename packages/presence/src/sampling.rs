use embedded_hal::digital::OutputPin;

use crate::{
    config::KeybotConfig,
    debounce::{Debouncer, TransitionEvent},
    error::{NotifyError, SensorReadError},
    feedback::{FeedbackRig, IndicatorOps, TimeOps},
    notify::{MessagePicker, NotifierOps},
    orchestrator::Orchestrator,
    sampler::{Presence, TouchSampler, TouchSensorOps},
};

/// Result of the lock-free half of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation<E> {
    pub sample: Result<Presence, SensorReadError<E>>,
    pub transition: Option<TransitionEvent>,
}

/// Schedules each tick one period after the previous tick finished. A tick
/// that overruns moves the schedule back; missed periods are never replayed,
/// so every period credited to the debouncer is a period of real time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickPacer {
    period_ms: u32,
    due_ms: u64,
}

impl TickPacer {
    pub const fn new(period_ms: u32, start_ms: u64) -> Self {
        Self {
            period_ms,
            due_ms: start_ms,
        }
    }

    pub fn due_ms(&self) -> u64 {
        self.due_ms
    }

    pub fn wait_ms(&self, now_ms: u64) -> u64 {
        self.due_ms.saturating_sub(now_ms)
    }

    /// Call once the tick's work, feedback included, is over.
    pub fn finish(&mut self, now_ms: u64) {
        self.due_ms = now_ms.saturating_add(u64::from(self.period_ms));
    }
}

/// One sampling period: sample, debounce, then feedback and visibility
/// aging. Split in two so the caller only needs the feedback rig when
/// something has to be shown. Commit feedback waits in `pending` until the
/// caller gets the rig; a newer commit replaces an unplayed one.
pub struct SamplingLoop<S> {
    sampler: TouchSampler<S>,
    debouncer: Debouncer,
    orchestrator: Orchestrator,
    pending: Option<TransitionEvent>,
    period_ms: u32,
    ticks: u32,
}

impl<S: TouchSensorOps> SamplingLoop<S> {
    pub fn new(sensor: S, config: &KeybotConfig) -> Self {
        Self {
            sampler: TouchSampler::new(sensor, config.presence.touch_threshold),
            debouncer: Debouncer::from_config(&config.presence),
            orchestrator: Orchestrator::new(&config.presence, &config.notify),
            pending: None,
            period_ms: config.presence.sample_period_ms,
            ticks: 0,
        }
    }

    /// Samples and debounces. A failed read leaves the debouncer untouched.
    pub fn observe(&mut self) -> Observation<S::Error> {
        self.ticks = self.ticks.wrapping_add(1);
        let sample = self.sampler.sample();
        let transition = match &sample {
            Ok(momentary) => self.debouncer.tick(*momentary, self.period_ms),
            Err(err) => {
                log::warn!("touch read failed on tick {}: {err:?}", self.ticks);
                None
            }
        };

        if let Some(event) = transition {
            log::info!("Key: {}", event.new_state.label());
            if let Some(stale) = self.pending.replace(event) {
                log::info!(
                    "feedback for {} superseded before it could play",
                    stale.new_state.label()
                );
            }
        }
        Observation { sample, transition }
    }

    pub fn pending(&self) -> Option<TransitionEvent> {
        self.pending
    }

    pub fn needs_rig(&self, now_ms: u64) -> bool {
        self.pending.is_some() || self.orchestrator.visibility_due(now_ms)
    }

    /// Plays pending commit feedback, if any, then ages the visibility cue.
    pub async fn react<I, A, N, P, T>(
        &mut self,
        rig: &mut FeedbackRig<I, A>,
        notifier: &mut N,
        picker: &mut P,
        time: &mut T,
    ) -> Option<Result<(), NotifyError<N::Error>>>
    where
        I: IndicatorOps,
        A: OutputPin,
        N: NotifierOps,
        P: MessagePicker,
        T: TimeOps,
    {
        let notified = match self.pending.take() {
            Some(event) => Some(
                self.orchestrator
                    .on_transition(event, rig, notifier, picker, time)
                    .await
                    .map(|_| ()),
            ),
            None => None,
        };
        self.orchestrator.age_visibility(time.now_ms(), rig);
        notified
    }

    /// Full tick with the rig already at hand.
    pub async fn tick<I, A, N, P, T>(
        &mut self,
        rig: &mut FeedbackRig<I, A>,
        notifier: &mut N,
        picker: &mut P,
        time: &mut T,
    ) -> Observation<S::Error>
    where
        I: IndicatorOps,
        A: OutputPin,
        N: NotifierOps,
        P: MessagePicker,
        T: TimeOps,
    {
        let observation = self.observe();
        if self.needs_rig(time.now_ms()) {
            let _ = self.react(rig, notifier, picker, time).await;
        }
        observation
    }

    pub fn committed(&self) -> Presence {
        self.debouncer.committed()
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::{
        feedback::Rgb,
        notify::FixedPicker,
        sim::{
            ScriptedSensor, ScriptedSensorFault, SimActuator, SimIndicator, SimNotifier,
            VirtualClock,
        },
    };

    fn sampling(readings: &[Option<u16>]) -> SamplingLoop<ScriptedSensor<'_>> {
        SamplingLoop::new(ScriptedSensor::new(readings), &KeybotConfig::REFERENCE)
    }

    #[test]
    fn sensor_failure_neither_resets_nor_advances_dwell() {
        let readings = [Some(400), Some(400), None, Some(400)];
        let mut sampling = sampling(&readings);

        sampling.observe();
        sampling.observe();
        let failed = sampling.observe();
        assert_eq!(failed.sample, Err(SensorReadError(ScriptedSensorFault::Driver)));
        assert_eq!(failed.transition, None);
        assert_eq!(sampling.debouncer().accumulator().detected_ms, 200);

        sampling.observe();
        assert_eq!(sampling.debouncer().accumulator().detected_ms, 300);
        assert_eq!(sampling.ticks(), 4);
    }

    #[test]
    fn quiet_tick_does_not_need_rig() {
        let readings = [Some(420)];
        let mut sampling = sampling(&readings);
        sampling.observe();
        assert!(!sampling.needs_rig(0));
    }

    #[test]
    fn overrun_pushes_the_schedule_back_instead_of_bursting() {
        let mut pacer = TickPacer::new(100, 0);
        assert_eq!(pacer.wait_ms(0), 0);

        pacer.finish(5);
        assert_eq!(pacer.due_ms(), 105);

        // Commit feedback held the loop for 700 ms.
        pacer.finish(805);
        assert_eq!(pacer.wait_ms(805), 100);
        assert_eq!(pacer.wait_ms(850), 55);
        assert_eq!(pacer.wait_ms(2_000), 0);
    }

    #[test]
    fn busy_rig_defers_feedback_while_debouncing_continues() {
        let mut readings = [Some(400); 15];
        readings[10..].fill(Some(420));
        let mut sampling = sampling(&readings);

        for _ in 0..10 {
            sampling.observe();
        }
        assert_eq!(sampling.committed(), Presence::Present);
        assert!(sampling.needs_rig(0));

        for _ in 0..5 {
            sampling.observe();
        }
        assert_eq!(sampling.debouncer().accumulator().not_detected_ms, 500);
        assert!(sampling.pending().is_some());

        let mut rig = FeedbackRig::new(SimIndicator::new(), SimActuator::new());
        let mut notifier = SimNotifier::connected();
        let mut clock = VirtualClock::new(0);
        let notified = block_on(sampling.react(
            &mut rig,
            &mut notifier,
            &mut FixedPicker(0),
            &mut clock,
        ));

        assert_eq!(notified, Some(Ok(())));
        assert_eq!(rig.indicator().times_shown(Rgb::GREEN), 2);
        assert_eq!(sampling.pending(), None);
        assert!(!sampling.needs_rig(clock.now_ms()));
    }

    #[test]
    fn newer_commit_replaces_unplayed_feedback() {
        let mut readings = [Some(400); 20];
        readings[10..].fill(Some(420));
        let mut sampling = sampling(&readings);

        let commits = (0..20)
            .filter(|_| sampling.observe().transition.is_some())
            .count();
        assert_eq!(commits, 2);

        let mut rig = FeedbackRig::new(SimIndicator::new(), SimActuator::new());
        let mut notifier = SimNotifier::connected();
        let mut clock = VirtualClock::new(0);
        block_on(sampling.react(
            &mut rig,
            &mut notifier,
            &mut FixedPicker(0),
            &mut clock,
        ));

        assert_eq!(rig.indicator().times_shown(Rgb::GREEN), 0);
        assert_eq!(rig.indicator().times_shown(Rgb::RED), 2);
        assert_eq!(notifier.sent().len(), 1);
        assert!(sampling.orchestrator().visibility().is_active());
    }

    #[test]
    fn tick_plays_feedback_on_commit() {
        let readings = [Some(400); 10];
        let mut sampling = sampling(&readings);
        let mut rig = FeedbackRig::new(SimIndicator::new(), SimActuator::new());
        let mut notifier = SimNotifier::connected();
        let mut clock = VirtualClock::new(0);

        let mut commits = 0;
        for _ in 0..10 {
            let observation = block_on(sampling.tick(
                &mut rig,
                &mut notifier,
                &mut FixedPicker(0),
                &mut clock,
            ));
            commits += usize::from(observation.transition.is_some());
        }

        assert_eq!(commits, 1);
        assert_eq!(sampling.committed(), Presence::Present);
        assert_eq!(rig.indicator().times_shown(Rgb::GREEN), 2);
        assert_eq!(notifier.sent().len(), 1);
    }
}
