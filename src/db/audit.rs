//! Per-request audit trail.
//!
//! Notes are never stored in the clear: the row carries a SHA-256 of the
//! note text, and the serialized request is stored with the note redacted.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{open_database, open_memory_database, AuditError};
use crate::models::{AnalysisResponse, ClinicalNoteRequest, ProcessingStatus};

const REDACTED_NOTE: &str = "[redacted]";

/// One row of the audit log.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditRecord {
    pub request_id: String,
    pub input_hash: String,
    pub input_type: String,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    pub processing_time_ms: Option<u64>,
    pub model_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub response_json: Option<String>,
}

impl AuditRecord {
    /// Stored response, when the analysis completed.
    pub fn response(&self) -> Result<Option<AnalysisResponse>, AuditError> {
        self.response_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(AuditError::from)
    }
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let conn = open_database(path)?;
        tracing::info!(path = %path.display(), "Audit log opened");
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, AuditError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    /// Insert a `processing` row for a new request.
    pub fn record_started(&self, request_id: &str, request: &ClinicalNoteRequest) -> Result<(), AuditError> {
        let now = Utc::now();
        let redacted = ClinicalNoteRequest {
            clinical_note: REDACTED_NOTE.to_string(),
            input_type: request.input_type,
        };
        self.conn.execute(
            "INSERT INTO analysis_audit
                (request_id, input_hash, input_type, status, request_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                request_id,
                hash_input(&request.clinical_note),
                request.input_type.as_str(),
                ProcessingStatus::Processing.as_str(),
                serde_json::to_string(&redacted)?,
                now,
            ],
        )?;
        tracing::debug!(request_id, "Audit record started");
        Ok(())
    }

    pub fn record_completed(&self, request_id: &str, response: &AnalysisResponse) -> Result<(), AuditError> {
        let updated = self.conn.execute(
            "UPDATE analysis_audit
             SET status = ?2, response_json = ?3, processing_time_ms = ?4,
                 model_version = ?5, updated_at = ?6
             WHERE request_id = ?1",
            params![
                request_id,
                ProcessingStatus::Completed.as_str(),
                serde_json::to_string(response)?,
                response.processing_time_ms as i64,
                response.model_version,
                Utc::now(),
            ],
        )?;
        if updated == 0 {
            return Err(AuditError::NotFound(request_id.to_string()));
        }
        Ok(())
    }

    pub fn record_failed(&self, request_id: &str, error: &str) -> Result<(), AuditError> {
        let updated = self.conn.execute(
            "UPDATE analysis_audit SET status = ?2, error_message = ?3, updated_at = ?4
             WHERE request_id = ?1",
            params![request_id, ProcessingStatus::Failed.as_str(), error, Utc::now()],
        )?;
        if updated == 0 {
            return Err(AuditError::NotFound(request_id.to_string()));
        }
        tracing::debug!(request_id, "Audit record failed");
        Ok(())
    }

    pub fn get(&self, request_id: &str) -> Result<AuditRecord, AuditError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM analysis_audit WHERE request_id = ?1"),
                params![request_id],
                read_record,
            )
            .optional()?;

        let (record, status) = row.ok_or_else(|| AuditError::NotFound(request_id.to_string()))?;
        with_status(record, status)
    }

    /// Most recent records first, at most `limit` of them.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, AuditError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM analysis_audit
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], read_record)?;
        let records = rows
            .map(|row| {
                let (record, status) = row?;
                with_status(record, status)
            })
            .collect::<Result<Vec<_>, AuditError>>();
        records
    }

    pub fn count_by_status(&self, status: ProcessingStatus) -> Result<i64, AuditError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM analysis_audit WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Row counts per processing status.
    pub fn status_counts(&self) -> Result<AuditCounts, AuditError> {
        Ok(AuditCounts {
            pending: self.count_by_status(ProcessingStatus::Pending)?,
            processing: self.count_by_status(ProcessingStatus::Processing)?,
            completed: self.count_by_status(ProcessingStatus::Completed)?,
            failed: self.count_by_status(ProcessingStatus::Failed)?,
        })
    }
}

/// Audit rows per status.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct AuditCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl AuditCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

const RECORD_COLUMNS: &str = "request_id, input_hash, input_type, status, error_message, \
    processing_time_ms, model_version, created_at, updated_at, response_json";

/// Status is returned raw so an unknown value surfaces as `InvalidStatus`
/// rather than a rusqlite conversion error.
fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(AuditRecord, String)> {
    Ok((
        AuditRecord {
            request_id: row.get(0)?,
            input_hash: row.get(1)?,
            input_type: row.get(2)?,
            status: ProcessingStatus::Pending,
            error_message: row.get(4)?,
            processing_time_ms: row.get::<_, Option<i64>>(5)?.map(|ms| ms.max(0) as u64),
            model_version: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            response_json: row.get(9)?,
        },
        row.get(3)?,
    ))
}

fn with_status(mut record: AuditRecord, status: String) -> Result<AuditRecord, AuditError> {
    record.status = ProcessingStatus::parse(&status).ok_or(AuditError::InvalidStatus(status))?;
    Ok(record)
}

/// Hex SHA-256 of the note text.
pub fn hash_input(note: &str) -> String {
    format!("{:x}", Sha256::digest(note.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBundle;
    use crate::pipeline::ClinicalPipeline;

    const NOTE: &str = "45 year old female with fever, productive cough and pleuritic chest pain \
        for 3 days. Temp 38.9, HR 104, RR 22, SpO2 93%.";

    #[test]
    fn hash_is_stable_hex() {
        let h = hash_input("abc");
        assert_eq!(h, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(h, hash_input("abc"));
    }

    #[test]
    fn started_record_is_processing_and_redacted() {
        let log = AuditLog::in_memory().unwrap();
        log.record_started("req_aaaaaaaaaaaa", &ClinicalNoteRequest::text(NOTE)).unwrap();

        let record = log.get("req_aaaaaaaaaaaa").unwrap();
        assert_eq!(record.status, ProcessingStatus::Processing);
        assert_eq!(record.input_hash, hash_input(NOTE));
        assert_eq!(record.input_type, "text");
        assert!(record.response().unwrap().is_none());

        let stored: String = log
            .conn
            .query_row(
                "SELECT request_json FROM analysis_audit WHERE request_id = 'req_aaaaaaaaaaaa'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!stored.contains("productive cough"));
        assert!(stored.contains(REDACTED_NOTE));
    }

    #[test]
    fn completed_record_keeps_response() {
        let log = AuditLog::in_memory().unwrap();
        let request = ClinicalNoteRequest::text(NOTE);
        log.record_started("req_bbbbbbbbbbbb", &request).unwrap();

        let pipeline = ClinicalPipeline::new(KnowledgeBundle::bundled().unwrap());
        let response = pipeline.analyze_with_id("req_bbbbbbbbbbbb", &request).unwrap();
        log.record_completed("req_bbbbbbbbbbbb", &response).unwrap();

        let record = log.get("req_bbbbbbbbbbbb").unwrap();
        assert_eq!(record.status, ProcessingStatus::Completed);
        assert_eq!(record.model_version.as_deref(), Some(response.model_version.as_str()));
        assert_eq!(record.processing_time_ms, Some(response.processing_time_ms));
        assert!(record.updated_at >= record.created_at);
        let stored = record.response().unwrap().unwrap();
        assert_eq!(stored.request_id, "req_bbbbbbbbbbbb");
        assert_eq!(stored.differential_diagnoses.len(), response.differential_diagnoses.len());
    }

    #[test]
    fn failed_record_carries_error() {
        let log = AuditLog::in_memory().unwrap();
        log.record_started("req_cccccccccccc", &ClinicalNoteRequest::text(NOTE)).unwrap();
        log.record_failed("req_cccccccccccc", "LLM unavailable").unwrap();

        let record = log.get("req_cccccccccccc").unwrap();
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("LLM unavailable"));
        assert_eq!(log.count_by_status(ProcessingStatus::Failed).unwrap(), 1);
        assert_eq!(log.count_by_status(ProcessingStatus::Completed).unwrap(), 0);
    }

    #[test]
    fn unknown_request_is_not_found() {
        let log = AuditLog::in_memory().unwrap();
        assert!(matches!(log.get("req_missing"), Err(AuditError::NotFound(_))));
        assert!(matches!(
            log.record_failed("req_missing", "x"),
            Err(AuditError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_request_id_is_rejected() {
        let log = AuditLog::in_memory().unwrap();
        let request = ClinicalNoteRequest::text(NOTE);
        log.record_started("req_dddddddddddd", &request).unwrap();
        assert!(matches!(
            log.record_started("req_dddddddddddd", &request),
            Err(AuditError::Sqlite(_))
        ));
    }

    #[test]
    fn file_backed_log_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        {
            let log = AuditLog::open(&path).unwrap();
            log.record_started("req_eeeeeeeeeeee", &ClinicalNoteRequest::text(NOTE)).unwrap();
        }
        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.get("req_eeeeeeeeeeee").unwrap().status, ProcessingStatus::Processing);
    }

    #[test]
    fn recent_lists_newest_first_and_respects_limit() {
        let log = AuditLog::in_memory().unwrap();
        let request = ClinicalNoteRequest::text(NOTE);
        for id in ["req_000000000001", "req_000000000002", "req_000000000003"] {
            log.record_started(id, &request).unwrap();
        }
        log.record_failed("req_000000000002", "timeout").unwrap();

        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].request_id, "req_000000000003");
        assert_eq!(recent[1].request_id, "req_000000000002");
        assert_eq!(recent[1].status, ProcessingStatus::Failed);

        assert_eq!(log.recent(100).unwrap().len(), 3);
        assert!(AuditLog::in_memory().unwrap().recent(10).unwrap().is_empty());
    }

    #[test]
    fn status_counts_cover_every_row() {
        let log = AuditLog::in_memory().unwrap();
        let request = ClinicalNoteRequest::text(NOTE);
        log.record_started("req_000000000011", &request).unwrap();
        log.record_started("req_000000000012", &request).unwrap();
        log.record_failed("req_000000000012", "boom").unwrap();

        let counts = log.status_counts().unwrap();
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.completed, 0);
        assert_eq!(counts.total(), 2);
    }
}
