use chrono::{DateTime, Utc};

/// Contract every persisted domain event satisfies.
///
/// An event is a fact that already happened; it is never edited, only
/// superseded by later facts. The schema version lets old payloads stay
/// readable when an event's shape evolves.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted name, e.g. "registration.offering.student_registered".
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Business time: when the fact took effect, not when it was stored.
    fn occurred_at(&self) -> DateTime<Utc>;
}
