/// The touch sensor capability failed to produce a reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorReadError<E>(pub E);

/// An indicator or actuator command was rejected by its driver.
///
/// The effect is never verified; callers log and move on to the next step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverCommandError<I, A> {
    Indicator(I),
    Actuator(A),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyError<E> {
    /// Collaborator reports it is not connected; nothing was sent.
    Unavailable,
    /// Collaborator accepted the call but failed to deliver.
    Send(E),
}

impl<E> From<E> for NotifyError<E> {
    fn from(value: E) -> Self {
        Self::Send(value)
    }
}
