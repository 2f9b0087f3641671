//! Seat-count projection.
//!
//! One record per course offering with its capacity and enrolled counter,
//! derived from offering events. The counter mirrors the aggregate's: it
//! moves on registration and withdrawal only, never on outcomes.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use acadledger_core::AggregateId;
use acadledger_events::EventEnvelope;
use acadledger_registration::{OfferingEvent, OfferingId};

use crate::projections::ProjectionApplyError;
use crate::read_model::ReadStore;

const AGGREGATE_TYPE: &str = "registration.offering";

/// Read model: live seat availability for one offering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferingSeats {
    pub offering_id: OfferingId,
    pub course_code: String,
    pub section: String,
    pub capacity: u32,
    pub enrolled: u32,
}

impl OfferingSeats {
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }
}

/// Projects offering events into per-offering seat counts.
#[derive(Debug)]
pub struct OfferingSeatsProjection<S>
where
    S: ReadStore<OfferingId, OfferingSeats>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> OfferingSeatsProjection<S>
where
    S: ReadStore<OfferingId, OfferingSeats>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, offering_id: OfferingId) -> Option<OfferingSeats> {
        self.store.get(&offering_id)
    }

    pub fn list(&self) -> Vec<OfferingSeats> {
        self.store.list()
    }

    fn cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn advance_cursor(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    /// Apply one envelope. Envelopes for other aggregate types are ignored;
    /// replays at or below the cursor are skipped.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionApplyError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(ProjectionApplyError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(ProjectionApplyError::NonMonotonicSequence { last, found: seq });
        }

        let ev: OfferingEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionApplyError::Deserialize(e.to_string()))?;

        match ev {
            OfferingEvent::OfferingOpened(e) => {
                self.store.upsert(
                    e.offering_id,
                    OfferingSeats {
                        offering_id: e.offering_id,
                        course_code: e.course_code,
                        section: e.section,
                        capacity: e.capacity,
                        enrolled: 0,
                    },
                );
            }
            OfferingEvent::StudentRegistered(e) => {
                if let Some(mut seats) = self.store.get(&e.offering_id) {
                    seats.enrolled += 1;
                    self.store.upsert(e.offering_id, seats);
                }
            }
            OfferingEvent::StudentDropped(e) => {
                if let Some(mut seats) = self.store.get(&e.offering_id) {
                    seats.enrolled = seats.enrolled.saturating_sub(1);
                    self.store.upsert(e.offering_id, seats);
                }
            }
            // Completing or failing a course does not release the seat.
            OfferingEvent::EnrollmentCompleted(_) | OfferingEvent::EnrollmentFailed(_) => {}
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    /// Drop everything and replay the given history into a clean store.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionApplyError> {
        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use acadledger_catalog::SemesterWindow;
    use acadledger_core::{CourseId, SemesterId, StudentId};
    use acadledger_registration::{OfferingOpened, StudentDropped, StudentRegistered};
    use chrono::{NaiveDate, Utc};
    use std::sync::Arc;

    fn envelope(offering_id: OfferingId, seq: u64, event: OfferingEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            offering_id.0,
            AGGREGATE_TYPE,
            seq,
            serde_json::to_value(&event).unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn opened(offering_id: OfferingId, capacity: u32) -> OfferingEvent {
        OfferingEvent::OfferingOpened(OfferingOpened {
            offering_id,
            course_id: CourseId::new(),
            course_code: "CS101".to_string(),
            semester_id: SemesterId::new(),
            section: "A".to_string(),
            capacity,
            window: SemesterWindow {
                registration_start: date(2024, 8, 1),
                registration_end: date(2024, 8, 20),
                add_drop_deadline: date(2024, 9, 10),
            },
            occurred_at: Utc::now(),
        })
    }

    fn projection() -> OfferingSeatsProjection<Arc<InMemoryReadStore<OfferingId, OfferingSeats>>> {
        OfferingSeatsProjection::new(Arc::new(InMemoryReadStore::new()))
    }

    #[test]
    fn register_and_drop_move_the_counter() {
        let proj = projection();
        let offering_id = OfferingId::new(AggregateId::new());
        let student = StudentId::new();

        proj.apply_envelope(&envelope(offering_id, 1, opened(offering_id, 30)))
            .unwrap();
        proj.apply_envelope(&envelope(
            offering_id,
            2,
            OfferingEvent::StudentRegistered(StudentRegistered {
                offering_id,
                student_id: student,
                on: date(2024, 8, 15),
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        let seats = proj.get(offering_id).unwrap();
        assert_eq!(seats.enrolled, 1);
        assert_eq!(seats.available(), 29);

        proj.apply_envelope(&envelope(
            offering_id,
            3,
            OfferingEvent::StudentDropped(StudentDropped {
                offering_id,
                student_id: student,
                on: date(2024, 9, 1),
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        assert_eq!(proj.get(offering_id).unwrap().enrolled, 0);
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let proj = projection();
        let offering_id = OfferingId::new(AggregateId::new());
        let student = StudentId::new();

        proj.apply_envelope(&envelope(offering_id, 1, opened(offering_id, 30)))
            .unwrap();
        let registered = envelope(
            offering_id,
            2,
            OfferingEvent::StudentRegistered(StudentRegistered {
                offering_id,
                student_id: student,
                on: date(2024, 8, 15),
                occurred_at: Utc::now(),
            }),
        );

        proj.apply_envelope(&registered).unwrap();
        proj.apply_envelope(&registered).unwrap();

        assert_eq!(proj.get(offering_id).unwrap().enrolled, 1);
    }

    #[test]
    fn sequence_gap_is_an_error() {
        let proj = projection();
        let offering_id = OfferingId::new(AggregateId::new());

        proj.apply_envelope(&envelope(offering_id, 1, opened(offering_id, 30)))
            .unwrap();

        let err = proj
            .apply_envelope(&envelope(
                offering_id,
                3,
                OfferingEvent::StudentRegistered(StudentRegistered {
                    offering_id,
                    student_id: StudentId::new(),
                    on: date(2024, 8, 15),
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            ProjectionApplyError::NonMonotonicSequence { last: 1, found: 3 }
        ));
    }
}
