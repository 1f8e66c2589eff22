use crate::notify::ChannelId;

pub const DEFAULT_TRIGGERS: &[&str] = &["knock", "klop", "<@1110502089848782858>"];

pub const DEFAULT_PRESENT_MESSAGES: &[&str] = &[
    "jsem na ataku 🙋",
    "Jsme tu:)",
    "Už jo.",
    "mam klice",
    "už jo🌼",
    "ahoj, já jsem tu!)",
    "jsem tu kdyztak ✌️",
    "Už by tam měl být @someone.",
    "jojo 🙌",
    "Ano ✌️",
    "jsme tu 🌱",
    "už som tu",
];

pub const DEFAULT_ABSENT_MESSAGES: &[&str] = &[
    "uz ne 😦",
    "ne bohuzel 😬",
    "akorat odchazime",
    "dnes už asi ne ))",
    "ted jsem odesel",
    "Před chvíli jsme odešli:/",
    "asi ne",
    "práve som odišiel",
];

/// Pin wiring the firmware was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub touch_gpio: u8,
    pub led_gpio: u8,
    pub led_count: u8,
    pub solenoid_gpio: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Raw readings strictly below this value count as "key detected".
    pub touch_threshold: u16,
    pub dwell_threshold_s: u32,
    pub sample_period_ms: u32,
    pub visibility_duration_s: u32,
}

impl PresenceConfig {
    pub const fn dwell_threshold_ms(&self) -> u32 {
        self.dwell_threshold_s.saturating_mul(1_000)
    }

    pub const fn visibility_duration_ms(&self) -> u64 {
        self.visibility_duration_s as u64 * 1_000
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnockConfig {
    pub pulse_count: u8,
    pub pulse_delay_ms: u32,
    pub total_s: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyConfig {
    pub channel_id: ChannelId,
    pub triggers: &'static [&'static str],
    pub present_messages: &'static [&'static str],
    pub absent_messages: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeybotConfig {
    pub board: BoardConfig,
    pub presence: PresenceConfig,
    pub knock: KnockConfig,
    pub notify: NotifyConfig,
}

impl KeybotConfig {
    /// Values of the hallway build: one WS2812 on GPIO25, the touch
    /// pad on T0 (GPIO4) and the solenoid driver on GPIO26.
    pub const REFERENCE: Self = Self {
        board: BoardConfig {
            touch_gpio: 4,
            led_gpio: 25,
            led_count: 1,
            solenoid_gpio: 26,
        },
        presence: PresenceConfig {
            touch_threshold: 410,
            dwell_threshold_s: 1,
            sample_period_ms: 100,
            visibility_duration_s: 15,
        },
        knock: KnockConfig {
            pulse_count: 3,
            pulse_delay_ms: 120,
            total_s: 15,
        },
        notify: NotifyConfig {
            channel_id: ChannelId(0),
            triggers: DEFAULT_TRIGGERS,
            present_messages: DEFAULT_PRESENT_MESSAGES,
            absent_messages: DEFAULT_ABSENT_MESSAGES,
        },
    };
}

impl Default for KeybotConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}
