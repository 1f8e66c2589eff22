use core::fmt::Write as _;

use embedded_hal::digital::OutputPin;
use heapless::String;

use crate::{
    config::{KnockConfig, NotifyConfig},
    error::NotifyError,
    feedback::{FeedbackRig, IndicatorOps, TimeOps},
    knock::KnockSequence,
    notify::{send_best_effort, ChannelId, MessageId, NotifierOps, NotifyText, UserId},
};

pub const INBOUND_CONTENT_MAX: usize = 256;
pub const KNOCK_ACK_TEXT: &str = "✊ knocking... if anyone's there, I'll get his attention";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: ChannelId,
    pub author: UserId,
    pub content: String<INBOUND_CONTENT_MAX>,
    pub is_direct_message: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandVerdict {
    Knock,
    WrongChannel,
    SelfAuthored,
    NoTrigger,
}

/// Decides which inbound messages are knock requests and runs the knock.
pub struct CommandResponder {
    channel: ChannelId,
    triggers: &'static [&'static str],
    knock: KnockConfig,
    self_user: Option<UserId>,
}

impl CommandResponder {
    pub fn new(knock: &KnockConfig, notify: &NotifyConfig) -> Self {
        Self {
            channel: notify.channel_id,
            triggers: notify.triggers,
            knock: *knock,
            self_user: None,
        }
    }

    pub fn classify(&self, message: &InboundMessage) -> CommandVerdict {
        if message.channel != self.channel {
            return CommandVerdict::WrongChannel;
        }
        if self.self_user == Some(message.author) {
            return CommandVerdict::SelfAuthored;
        }
        let content = message.content.as_str();
        if self
            .triggers
            .iter()
            .any(|trigger| !trigger.is_empty() && content.contains(trigger))
        {
            CommandVerdict::Knock
        } else {
            CommandVerdict::NoTrigger
        }
    }

    /// Records the link identity and posts the "connected" line.
    pub fn announce_connected<N: NotifierOps>(
        &mut self,
        user: UserId,
        notifier: &mut N,
    ) -> Result<MessageId, NotifyError<N::Error>> {
        self.self_user = Some(user);
        let mut text = NotifyText::new();
        let _ = write!(text, "📡 <@{}> is connected", user.0);
        send_best_effort(notifier, self.channel, &text)
    }

    /// Handles one inbound message. Returns the verdict; a knock has fully
    /// run by the time this returns.
    pub async fn on_command<I, A, N, T>(
        &mut self,
        message: &InboundMessage,
        rig: &mut FeedbackRig<I, A>,
        notifier: &mut N,
        time: &mut T,
    ) -> CommandVerdict
    where
        I: IndicatorOps,
        A: OutputPin,
        N: NotifierOps,
        T: TimeOps,
    {
        let verdict = self.classify(message);
        match verdict {
            CommandVerdict::Knock => {
                let via = if message.is_direct_message { "direct message" } else { "channel" };
                log::info!("knock requested by {} via {via}", message.author.0);
                self.knock(rig, notifier, time).await;
            }
            other => log::debug!("inbound message ignored: {other:?}"),
        }
        verdict
    }

    /// Acknowledge, run the whole knock, then report completion. Send
    /// failures never cut the knock short.
    pub async fn knock<I, A, N, T>(
        &mut self,
        rig: &mut FeedbackRig<I, A>,
        notifier: &mut N,
        time: &mut T,
    ) -> usize
    where
        I: IndicatorOps,
        A: OutputPin,
        N: NotifierOps,
        T: TimeOps,
    {
        let _ = send_best_effort(notifier, self.channel, KNOCK_ACK_TEXT);

        let started_ms = time.now_ms();
        let failures = rig.play(KnockSequence::new(&self.knock), time).await;
        log::info!(
            "knock finished after {} ms with {failures} failed steps",
            time.now_ms().saturating_sub(started_ms)
        );

        let mut text = NotifyText::new();
        let _ = write!(
            text,
            "🫡 knocked for {} seconds, when the key is hung, I'll let you know",
            self.knock.total_s
        );
        let _ = send_best_effort(notifier, self.channel, &text);
        failures
    }
}
