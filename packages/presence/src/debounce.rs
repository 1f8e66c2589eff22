use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::{config::PresenceConfig, sampler::Presence};

/// Continuous time spent in each momentary state since the last reset.
///
/// At most one counter is non-zero: a sample that agrees with the committed
/// state, or a commit, clears both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DwellAccumulator {
    pub detected_ms: u32,
    pub not_detected_ms: u32,
}

impl DwellAccumulator {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn add(&mut self, momentary: Presence, elapsed_ms: u32) -> u32 {
        let counter = match momentary {
            Presence::Present => &mut self.detected_ms,
            Presence::Absent => &mut self.not_detected_ms,
        };
        *counter = counter.saturating_add(elapsed_ms);
        *counter
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionEvent {
    pub new_state: Presence,
}

#[derive(Clone, Copy, Debug)]
enum DwellHsmEvent {
    Sample { momentary: Presence, elapsed_ms: u32 },
}

#[derive(Default)]
struct DispatchContext {
    transition: Option<TransitionEvent>,
}

/// Strict continuous-dwell debounce over momentary presence samples.
pub struct Debouncer {
    machine: statig::blocking::StateMachine<DwellHsm>,
}

impl Debouncer {
    pub fn new(dwell_threshold_ms: u32) -> Self {
        Self {
            machine: DwellHsm::new(dwell_threshold_ms).state_machine(),
        }
    }

    pub fn from_config(config: &PresenceConfig) -> Self {
        Self::new(config.dwell_threshold_ms())
    }

    /// Feeds one momentary sample covering `elapsed_ms`; returns the commit
    /// event when the opposite state has now held for the dwell threshold.
    pub fn tick(&mut self, momentary: Presence, elapsed_ms: u32) -> Option<TransitionEvent> {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(
            &DwellHsmEvent::Sample {
                momentary,
                elapsed_ms,
            },
            &mut context,
        );
        context.transition
    }

    pub fn committed(&self) -> Presence {
        self.machine.inner().committed
    }

    pub fn accumulator(&self) -> DwellAccumulator {
        self.machine.inner().accumulator
    }

    pub fn dwell_threshold_ms(&self) -> u32 {
        self.machine.inner().dwell_threshold_ms
    }
}

struct DwellHsm {
    dwell_threshold_ms: u32,
    committed: Presence,
    accumulator: DwellAccumulator,
}

impl DwellHsm {
    fn new(dwell_threshold_ms: u32) -> Self {
        Self {
            dwell_threshold_ms,
            committed: Presence::Absent,
            accumulator: DwellAccumulator::default(),
        }
    }

    /// Returns true when `momentary` was committed by this sample.
    fn accumulate(
        &mut self,
        context: &mut DispatchContext,
        momentary: Presence,
        elapsed_ms: u32,
    ) -> bool {
        if self.accumulator.add(momentary, elapsed_ms) < self.dwell_threshold_ms {
            return false;
        }

        self.committed = momentary;
        self.accumulator.reset();
        context.transition = Some(TransitionEvent {
            new_state: momentary,
        });
        true
    }
}

#[state_machine(initial = "State::absent()")]
impl DwellHsm {
    #[state]
    fn absent(&mut self, context: &mut DispatchContext, event: &DwellHsmEvent) -> Outcome<State> {
        let DwellHsmEvent::Sample {
            momentary,
            elapsed_ms,
        } = *event;
        match momentary {
            Presence::Absent => {
                self.accumulator.reset();
                Handled
            }
            Presence::Present => {
                if self.accumulate(context, momentary, elapsed_ms) {
                    Transition(State::present())
                } else {
                    Handled
                }
            }
        }
    }

    #[state]
    fn present(&mut self, context: &mut DispatchContext, event: &DwellHsmEvent) -> Outcome<State> {
        let DwellHsmEvent::Sample {
            momentary,
            elapsed_ms,
        } = *event;
        match momentary {
            Presence::Present => {
                self.accumulator.reset();
                Handled
            }
            Presence::Absent => {
                if self.accumulate(context, momentary, elapsed_ms) {
                    Transition(State::absent())
                } else {
                    Handled
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    const TICK_MS: u32 = 100;

    fn feed(debouncer: &mut Debouncer, samples: &[Presence]) -> Vec<(usize, Presence)> {
        samples
            .iter()
            .enumerate()
            .filter_map(|(idx, momentary)| {
                debouncer
                    .tick(*momentary, TICK_MS)
                    .map(|event| (idx, event.new_state))
            })
            .collect()
    }

    fn repeat(state: Presence, count: usize) -> impl Iterator<Item = Presence> {
        core::iter::repeat(state).take(count)
    }

    #[test]
    fn starts_absent_with_empty_accumulator() {
        let debouncer = Debouncer::new(1_000);
        assert_eq!(debouncer.committed(), Presence::Absent);
        assert_eq!(debouncer.accumulator(), DwellAccumulator::default());
    }

    #[test]
    fn commits_after_exactly_dwell_threshold() {
        let mut debouncer = Debouncer::new(1_000);
        let samples: Vec<_> = repeat(Presence::Present, 10).collect();

        assert_eq!(feed(&mut debouncer, &samples), [(9, Presence::Present)]);
        assert_eq!(debouncer.committed(), Presence::Present);
        assert_eq!(debouncer.accumulator(), DwellAccumulator::default());
    }

    #[test]
    fn single_flip_resets_pending_dwell() {
        let mut debouncer = Debouncer::new(1_000);
        let samples: Vec<_> = repeat(Presence::Present, 9)
            .chain(repeat(Presence::Absent, 1))
            .chain(repeat(Presence::Present, 9))
            .collect();

        assert!(feed(&mut debouncer, &samples).is_empty());
        assert_eq!(debouncer.committed(), Presence::Absent);
        assert_eq!(debouncer.accumulator().detected_ms, 900);

        assert_eq!(
            debouncer
                .tick(Presence::Present, TICK_MS)
                .map(|event| event.new_state),
            Some(Presence::Present)
        );
    }

    #[test]
    fn steady_samples_never_emit() {
        let mut debouncer = Debouncer::new(1_000);
        for _ in 0..100 {
            assert_eq!(debouncer.tick(Presence::Absent, TICK_MS), None);
            assert_eq!(debouncer.committed(), Presence::Absent);
        }
    }

    #[test]
    fn release_is_debounced_symmetrically() {
        let mut debouncer = Debouncer::new(2_000);
        let samples: Vec<_> = repeat(Presence::Present, 20)
            .chain(repeat(Presence::Absent, 19))
            .chain(repeat(Presence::Present, 1))
            .chain(repeat(Presence::Absent, 20))
            .collect();

        assert_eq!(
            feed(&mut debouncer, &samples),
            [(19, Presence::Present), (59, Presence::Absent)]
        );
    }

    #[test]
    fn at_most_one_counter_is_ever_non_zero() {
        let mut debouncer = Debouncer::new(300);
        let pattern = [true, true, false, true, false, false, false, true, true, true, true];
        for detected in pattern.iter().cycle().take(200) {
            debouncer.tick(Presence::from_detected(*detected), TICK_MS);
            let acc = debouncer.accumulator();
            assert!(acc.detected_ms == 0 || acc.not_detected_ms == 0, "{acc:?}");
        }
    }

    /// Reference model: commit when the last `needed` samples all disagree
    /// with the committed state and agree with each other, counted from the
    /// last commit.
    fn reference_commits(samples: &[bool], needed: usize) -> Vec<usize> {
        let mut committed = false;
        let mut run = 0usize;
        let mut commits = Vec::new();
        for (idx, sample) in samples.iter().enumerate() {
            if *sample == committed {
                run = 0;
                continue;
            }
            run += 1;
            if run >= needed {
                committed = *sample;
                run = 0;
                commits.push(idx);
            }
        }
        commits
    }

    #[test]
    fn matches_reference_model_for_all_short_sequences() {
        const LEN: usize = 12;
        for needed in 1..=4usize {
            for bits in 0u32..(1 << LEN) {
                let samples: Vec<bool> = (0..LEN).map(|i| bits & (1 << i) != 0).collect();
                let mut debouncer = Debouncer::new(needed as u32 * TICK_MS);
                let actual: Vec<usize> = samples
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, detected)| {
                        debouncer
                            .tick(Presence::from_detected(*detected), TICK_MS)
                            .map(|_| idx)
                    })
                    .collect();
                assert_eq!(
                    actual,
                    reference_commits(&samples, needed),
                    "needed={needed} bits={bits:#b}"
                );
            }
        }
    }
}
