use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::{
    config::KnockConfig,
    feedback::{double_blink, FeedbackStep, Level, Rgb, DOUBLE_BLINK_LEN},
};

/// Knock time credited per blink+pulse round, whatever the pulses took.
pub const KNOCK_CREDIT_S: u32 = 3;
pub const KNOCK_SETTLE_MS: u32 = 250;
pub const KNOCK_REST_MS: u32 = 200;
pub const KNOCK_COLOR: Rgb = Rgb::BLUE;

const BLINK_PHASE_LEN: usize = DOUBLE_BLINK_LEN + 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KnockPhase {
    #[default]
    Blinking,
    Pulsing,
    Waiting,
    Done,
}

#[derive(Clone, Copy, Debug)]
enum KnockEvent {
    Advance,
}

#[derive(Default)]
struct DispatchContext {
    step: Option<FeedbackStep>,
}

/// The remote "knock": rounds of a blue double blink followed by solenoid
/// pulses, until the configured knock time is used up.
///
/// Yields one [`FeedbackStep`] per `advance`, so the caller decides how time
/// passes.
pub struct KnockSequence {
    machine: statig::blocking::StateMachine<KnockHsm>,
}

impl KnockSequence {
    pub fn new(config: &KnockConfig) -> Self {
        Self {
            machine: KnockHsm::new(*config).state_machine(),
        }
    }

    pub fn advance(&mut self) -> Option<FeedbackStep> {
        // Phase changes that emit nothing (empty rounds, finishing) are
        // followed through until a step or the end.
        for _ in 0..4 {
            let mut context = DispatchContext::default();
            self.machine
                .handle_with_context(&KnockEvent::Advance, &mut context);
            if context.step.is_some() {
                return context.step;
            }
            if self.is_done() {
                return None;
            }
        }
        None
    }

    pub fn phase(&self) -> KnockPhase {
        self.machine.inner().phase
    }

    pub fn knocked_s(&self) -> u32 {
        self.machine.inner().knocked_s
    }

    pub fn is_done(&self) -> bool {
        self.phase() == KnockPhase::Done
    }
}

impl Iterator for KnockSequence {
    type Item = FeedbackStep;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

struct KnockHsm {
    config: KnockConfig,
    cursor: usize,
    knocked_s: u32,
    phase: KnockPhase,
}

impl KnockHsm {
    fn new(config: KnockConfig) -> Self {
        Self {
            config,
            cursor: 0,
            knocked_s: 0,
            phase: KnockPhase::Blinking,
        }
    }

    fn blink_step(cursor: usize) -> FeedbackStep {
        let blink = double_blink(KNOCK_COLOR);
        blink
            .get(cursor)
            .copied()
            .unwrap_or(FeedbackStep::Hold {
                ms: KNOCK_SETTLE_MS,
            })
    }

    fn pulse_step(&self, cursor: usize) -> FeedbackStep {
        match cursor % 4 {
            0 => FeedbackStep::Actuate(Level::High),
            2 => FeedbackStep::Actuate(Level::Low),
            _ => FeedbackStep::Hold {
                ms: self.config.pulse_delay_ms,
            },
        }
    }
}

#[state_machine(initial = "State::blinking()")]
impl KnockHsm {
    #[state]
    fn blinking(&mut self, context: &mut DispatchContext, event: &KnockEvent) -> Outcome<State> {
        let KnockEvent::Advance = event;
        if self.cursor == 0 && self.knocked_s >= self.config.total_s {
            self.phase = KnockPhase::Done;
            return Transition(State::done());
        }

        self.phase = KnockPhase::Blinking;
        context.step = Some(Self::blink_step(self.cursor));
        self.cursor += 1;
        if self.cursor < BLINK_PHASE_LEN {
            return Handled;
        }
        self.cursor = 0;
        Transition(State::pulsing())
    }

    #[state]
    fn pulsing(&mut self, context: &mut DispatchContext, event: &KnockEvent) -> Outcome<State> {
        let KnockEvent::Advance = event;
        self.phase = KnockPhase::Pulsing;
        let total = usize::from(self.config.pulse_count) * 4;
        if self.cursor < total {
            context.step = Some(self.pulse_step(self.cursor));
            self.cursor += 1;
        }
        if self.cursor < total {
            return Handled;
        }
        self.cursor = 0;
        self.knocked_s = self.knocked_s.saturating_add(KNOCK_CREDIT_S);
        Transition(State::waiting())
    }

    #[state]
    fn waiting(&mut self, context: &mut DispatchContext, event: &KnockEvent) -> Outcome<State> {
        let KnockEvent::Advance = event;
        self.phase = KnockPhase::Waiting;
        context.step = Some(FeedbackStep::Hold { ms: KNOCK_REST_MS });
        Transition(State::blinking())
    }

    #[state]
    fn done(&mut self, context: &mut DispatchContext, event: &KnockEvent) -> Outcome<State> {
        let _ = (context, event);
        self.phase = KnockPhase::Done;
        Handled
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    fn config(pulse_count: u8, total_s: u32) -> KnockConfig {
        KnockConfig {
            pulse_count,
            pulse_delay_ms: 120,
            total_s,
        }
    }

    fn held_ms(steps: &[FeedbackStep]) -> u32 {
        steps
            .iter()
            .map(|step| match step {
                FeedbackStep::Hold { ms } => *ms,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn one_round_blinks_then_pulses_then_rests() {
        let steps: Vec<_> = KnockSequence::new(&config(2, 3)).collect();

        assert_eq!(&steps[..8], &double_blink(Rgb::BLUE)[..]);
        assert_eq!(steps[8], FeedbackStep::Hold { ms: 250 });
        assert_eq!(
            &steps[9..17],
            &[
                FeedbackStep::Actuate(Level::High),
                FeedbackStep::Hold { ms: 120 },
                FeedbackStep::Actuate(Level::Low),
                FeedbackStep::Hold { ms: 120 },
                FeedbackStep::Actuate(Level::High),
                FeedbackStep::Hold { ms: 120 },
                FeedbackStep::Actuate(Level::Low),
                FeedbackStep::Hold { ms: 120 },
            ]
        );
        assert_eq!(steps[17], FeedbackStep::Hold { ms: 200 });
        assert_eq!(steps.len(), 18);
    }

    #[test]
    fn rounds_cover_total_knock_time() {
        let mut sequence = KnockSequence::new(&config(3, 10));
        let steps: Vec<_> = sequence.by_ref().collect();

        let rounds = steps
            .iter()
            .filter(|step| **step == FeedbackStep::Hold { ms: KNOCK_REST_MS })
            .count();
        assert_eq!(rounds, 4);
        assert_eq!(sequence.knocked_s(), 12);
        assert!(sequence.is_done());

        let highs = steps
            .iter()
            .filter(|step| **step == FeedbackStep::Actuate(Level::High))
            .count();
        assert_eq!(highs, 12);
        assert_eq!(held_ms(&steps), 4 * (400 + 250 + 3 * 240 + 200));
    }

    #[test]
    fn zero_total_time_knocks_nothing() {
        let mut sequence = KnockSequence::new(&config(3, 0));
        assert_eq!(sequence.advance(), None);
        assert_eq!(sequence.phase(), KnockPhase::Done);
    }

    #[test]
    fn zero_pulses_still_blinks_each_round() {
        let steps: Vec<_> = KnockSequence::new(&config(0, 6)).collect();
        assert_eq!(steps.len(), 2 * (BLINK_PHASE_LEN + 1));
        assert!(!steps
            .iter()
            .any(|step| matches!(step, FeedbackStep::Actuate(_))));
    }

    #[test]
    fn phases_are_reported_in_order() {
        let mut sequence = KnockSequence::new(&config(1, 3));
        let mut phases = Vec::new();
        while sequence.advance().is_some() {
            if phases.last() != Some(&sequence.phase()) {
                phases.push(sequence.phase());
            }
        }
        phases.push(sequence.phase());

        assert_eq!(
            phases,
            [
                KnockPhase::Blinking,
                KnockPhase::Pulsing,
                KnockPhase::Waiting,
                KnockPhase::Done
            ]
        );
    }
}
