#![no_std]

#[cfg(test)]
extern crate std;

pub mod bridge;
pub mod config;
pub mod debounce;
pub mod error;
pub mod feedback;
pub mod knock;
pub mod notify;
pub mod orchestrator;
pub mod responder;
pub mod sampler;
pub mod sampling;
pub mod sim;
pub mod visibility;

pub use bridge::{format_notify_line, parse_bridge_line, BridgeCommand, SerialLineReader};
pub use config::{BoardConfig, KeybotConfig, KnockConfig, NotifyConfig, PresenceConfig};
pub use debounce::{Debouncer, DwellAccumulator, TransitionEvent};
pub use error::{DriverCommandError, NotifyError, SensorReadError};
pub use feedback::{FeedbackRig, FeedbackStep, IndicatorOps, Level, Rgb, TimeOps};
pub use knock::{KnockPhase, KnockSequence};
pub use notify::{
    ChannelId, ConnectionState, MessageId, MessagePicker, NotifierOps, NotifyText, UserId,
    XorShiftPicker,
};
pub use orchestrator::Orchestrator;
pub use responder::{CommandResponder, CommandVerdict, InboundMessage};
pub use sampler::{Presence, TouchSampler, TouchSensorOps};
pub use sampling::{Observation, SamplingLoop, TickPacer};
pub use visibility::VisibilityTimer;
