//! Student transcript projection.
//!
//! One row per (student, enrollment attempt), derived from offering events.
//! The prerequisite gate reads a student's completed rows from here, and the
//! registrar derives program progress from them.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use acadledger_core::{AggregateId, CourseId, Grade, StudentId};
use acadledger_events::EventEnvelope;
use acadledger_registration::{CompletedCourse, EnrollmentStatus, OfferingEvent, OfferingId};

use crate::projections::ProjectionApplyError;
use crate::read_model::ReadStore;

const AGGREGATE_TYPE: &str = "registration.offering";

/// One transcript row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub offering_id: OfferingId,
    pub course_id: CourseId,
    pub course_code: String,
    pub status: EnrollmentStatus,
    pub grade: Option<Grade>,
    pub credits_earned: Option<u32>,
}

/// Offering metadata captured from `OfferingOpened`, used to label later rows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OfferingInfo {
    course_id: CourseId,
    course_code: String,
}

/// Projects offering events into per-student transcripts.
#[derive(Debug)]
pub struct StudentTranscriptProjection<S>
where
    S: ReadStore<StudentId, Vec<TranscriptEntry>>,
{
    store: S,
    offerings: RwLock<HashMap<OfferingId, OfferingInfo>>,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> StudentTranscriptProjection<S>
where
    S: ReadStore<StudentId, Vec<TranscriptEntry>>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            offerings: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Full transcript for a student, in enrollment order.
    pub fn transcript(&self, student_id: StudentId) -> Vec<TranscriptEntry> {
        self.store.get(&student_id).unwrap_or_default()
    }

    /// Completed rows shaped for the prerequisite gate.
    pub fn completed_courses(&self, student_id: StudentId) -> Vec<CompletedCourse> {
        self.transcript(student_id)
            .into_iter()
            .filter(|e| e.status == EnrollmentStatus::Completed)
            .map(|e| CompletedCourse {
                course_id: e.course_id,
                grade: e.grade,
            })
            .collect()
    }

    /// Completed rows with their credit figures, for progress derivation.
    pub fn completed_entries(&self, student_id: StudentId) -> Vec<TranscriptEntry> {
        self.transcript(student_id)
            .into_iter()
            .filter(|e| e.status == EnrollmentStatus::Completed)
            .collect()
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

    fn offering_info(&self, offering_id: OfferingId) -> Option<OfferingInfo> {
        self.offerings
            .read()
            .ok()
            .and_then(|m| m.get(&offering_id).cloned())
    }

    /// Update the most recent row for (student, offering) that is still in
    /// `Registered` state.
    fn update_open_row(
        &self,
        student_id: StudentId,
        offering_id: OfferingId,
        update: impl FnOnce(&mut TranscriptEntry),
    ) {
        let mut rows = self.store.get(&student_id).unwrap_or_default();
        if let Some(row) = rows
            .iter_mut()
            .rev()
            .find(|r| r.offering_id == offering_id && r.status == EnrollmentStatus::Registered)
        {
            update(row);
            self.store.upsert(student_id, rows);
        }
    }

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
                if let Ok(mut offerings) = self.offerings.write() {
                    offerings.insert(
                        e.offering_id,
                        OfferingInfo {
                            course_id: e.course_id,
                            course_code: e.course_code,
                        },
                    );
                }
            }
            OfferingEvent::StudentRegistered(e) => {
                let info = match self.offering_info(e.offering_id) {
                    Some(info) => info,
                    None => return Ok(()),
                };
                let mut rows = self.store.get(&e.student_id).unwrap_or_default();
                rows.push(TranscriptEntry {
                    offering_id: e.offering_id,
                    course_id: info.course_id,
                    course_code: info.course_code,
                    status: EnrollmentStatus::Registered,
                    grade: None,
                    credits_earned: None,
                });
                self.store.upsert(e.student_id, rows);
            }
            OfferingEvent::StudentDropped(e) => {
                self.update_open_row(e.student_id, e.offering_id, |row| {
                    row.status = EnrollmentStatus::Withdrawn;
                    row.grade = Some(Grade::W);
                });
            }
            OfferingEvent::EnrollmentCompleted(e) => {
                self.update_open_row(e.student_id, e.offering_id, |row| {
                    row.status = EnrollmentStatus::Completed;
                    row.grade = Some(e.grade);
                    row.credits_earned = e.credits_earned;
                });
            }
            OfferingEvent::EnrollmentFailed(e) => {
                self.update_open_row(e.student_id, e.offering_id, |row| {
                    row.status = EnrollmentStatus::Failed;
                    row.grade = Some(e.grade);
                    row.credits_earned = Some(0);
                });
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    /// Clear all transcripts and replay the history in stream order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionApplyError> {
        self.store.clear();
        if let Ok(mut offerings) = self.offerings.write() {
            offerings.clear();
        }
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
