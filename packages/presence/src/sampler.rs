use core::fmt::Debug;

use crate::error::SensorReadError;

/// Raw capacitive reading source.
pub trait TouchSensorOps {
    type Error: Debug;

    fn read_raw_touch(&mut self) -> Result<u16, Self::Error>;
}

/// Whether the key hangs on the sensor.
///
/// Used both for the single-tick momentary reading and for the debounced
/// committed state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Presence {
    #[default]
    Absent,
    Present,
}

impl Presence {
    pub const fn from_detected(detected: bool) -> Self {
        if detected {
            Self::Present
        } else {
            Self::Absent
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "not present",
        }
    }
}

pub struct TouchSampler<S> {
    sensor: S,
    threshold: u16,
    last_reading: Option<u16>,
}

impl<S: TouchSensorOps> TouchSampler<S> {
    pub fn new(sensor: S, threshold: u16) -> Self {
        Self {
            sensor,
            threshold,
            last_reading: None,
        }
    }

    /// Reads the sensor once and classifies the reading against the threshold.
    ///
    /// A failed read leaves `last_reading` untouched.
    pub fn sample(&mut self) -> Result<Presence, SensorReadError<S::Error>> {
        let raw = self.sensor.read_raw_touch().map_err(SensorReadError)?;
        self.last_reading = Some(raw);
        Ok(classify(raw, self.threshold))
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn last_reading(&self) -> Option<u16> {
        self.last_reading
    }
}

/// A key on the nail lowers the pad's reading.
pub const fn classify(raw: u16, threshold: u16) -> Presence {
    Presence::from_detected(raw < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Readings<'a> {
        values: &'a [Result<u16, ()>],
        cursor: usize,
    }

    impl TouchSensorOps for Readings<'_> {
        type Error = ();

        fn read_raw_touch(&mut self) -> Result<u16, Self::Error> {
            let value = self.values[self.cursor];
            self.cursor += 1;
            value
        }
    }

    #[test]
    fn readings_below_threshold_are_present() {
        assert_eq!(classify(409, 410), Presence::Present);
        assert_eq!(classify(410, 410), Presence::Absent);
        assert_eq!(classify(0, 410), Presence::Present);
        assert_eq!(classify(u16::MAX, 410), Presence::Absent);
    }

    #[test]
    fn read_failure_is_reported_and_keeps_last_reading() {
        let values = [Ok(400), Err(()), Ok(420)];
        let mut sampler = TouchSampler::new(
            Readings {
                values: &values,
                cursor: 0,
            },
            410,
        );

        assert_eq!(sampler.sample(), Ok(Presence::Present));
        assert_eq!(sampler.last_reading(), Some(400));
        assert_eq!(sampler.sample(), Err(SensorReadError(())));
        assert_eq!(sampler.last_reading(), Some(400));
        assert_eq!(sampler.sample(), Ok(Presence::Absent));
        assert_eq!(sampler.last_reading(), Some(420));
    }
}
