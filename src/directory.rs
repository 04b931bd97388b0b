//! JSON snapshot of the teacher and session directories.
//!
//! The directories themselves are owned elsewhere; this module turns an exported snapshot into a
//! [`Ledger`], replaying any recorded placements through the ledger so seeded state obeys the
//! same rules as live confirmations.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::workflows::supervision::{
    Exam, ExamId, Ledger, LedgerError, Session, SessionId, SessionPlan, Subject, SubjectId,
    Teacher, TeacherId, TimeSlot,
};

#[derive(Debug)]
pub enum DirectoryError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Ledger(LedgerError),
    Seed {
        teacher_id: TeacherId,
        session_id: SessionId,
        source: LedgerError,
    },
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::Io(err) => write!(f, "failed to read directory snapshot: {}", err),
            DirectoryError::Json(err) => write!(f, "invalid directory snapshot: {}", err),
            DirectoryError::Ledger(err) => write!(f, "directory rejected by ledger: {}", err),
            DirectoryError::Seed {
                teacher_id,
                session_id,
                source,
            } => write!(
                f,
                "could not seed assignment of {} to {}: {}",
                teacher_id, session_id, source
            ),
        }
    }
}

impl std::error::Error for DirectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DirectoryError::Io(err) => Some(err),
            DirectoryError::Json(err) => Some(err),
            DirectoryError::Ledger(err) => Some(err),
            DirectoryError::Seed { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for DirectoryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<LedgerError> for DirectoryError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub teachers: Vec<TeacherRecord>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeacherRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
    #[serde(default)]
    pub quota: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamRecord {
    pub id: u64,
    pub subject: SubjectRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub id: u64,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    pub start: NaiveTime,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub end: Option<NaiveTime>,
    #[serde(default)]
    pub exams: Vec<ExamRecord>,
    #[serde(default)]
    pub required: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentRecord {
    pub teacher: u64,
    pub session: u64,
}

impl DirectorySnapshot {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Build a ledger, giving `default_quota` to teachers without one, then replay the recorded
    /// assignments in file order.
    pub fn into_ledger(self, default_quota: Option<u32>) -> Result<Ledger, DirectoryError> {
        let teachers = self.teachers.into_iter().map(|record| {
            Teacher::new(
                TeacherId(record.id),
                record.name,
                record.subjects.into_iter().map(Subject::from).collect(),
                record.quota.or(default_quota),
            )
        });

        let sessions = self.sessions.into_iter().map(|record| {
            let plan = SessionPlan::new(
                SessionId(record.id),
                TimeSlot::new(record.date, record.start, record.end),
                record
                    .exams
                    .into_iter()
                    .map(|exam| Exam {
                        id: ExamId(exam.id),
                        subject: exam.subject.into(),
                    })
                    .collect(),
            );
            Session::new(plan, record.required)
        });

        let ledger = Ledger::new(teachers, sessions)?;

        for record in &self.assignments {
            let teacher_id = TeacherId(record.teacher);
            let session_id = SessionId(record.session);
            ledger
                .confirm_assignment(teacher_id, session_id)
                .map_err(|source| DirectoryError::Seed {
                    teacher_id,
                    session_id,
                    source,
                })?;
        }

        info!(
            teachers = ledger.teacher_ids().len(),
            sessions = ledger.session_ids().len(),
            seeded = self.assignments.len(),
            "directory snapshot loaded"
        );
        Ok(ledger)
    }
}

impl From<SubjectRecord> for Subject {
    fn from(record: SubjectRecord) -> Self {
        Subject {
            id: record.id.map(SubjectId),
            name: record.name,
        }
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|err| format!("failed to parse '{raw}' as HH:MM ({err})"))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
        serde::de::Error::custom(format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
    })
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_time(&value).map_err(serde::de::Error::custom))
        .transpose()
}
