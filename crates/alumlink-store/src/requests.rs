use rusqlite::params;

use alumlink_shared::{RequestId, RequestStatus, UserId};

use crate::database::Database;
use crate::error::{map_insert_err, Result, StoreError};
use crate::models::{parse_enum, parse_timestamp, parse_uuid, MentorshipRequest};

impl Database {
    pub fn insert_request(&self, request: &MentorshipRequest) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO requests (id, sender_id, sender_name, mentor_id, mentor_name,
                                       message, mode, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    request.id.to_string(),
                    request.sender_id.to_string(),
                    request.sender_name,
                    request.mentor_id.to_string(),
                    request.mentor_name,
                    request.message,
                    request.mode.as_str(),
                    request.status.as_str(),
                    request.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    pub fn get_request(&self, id: RequestId) -> Result<MentorshipRequest> {
        self.conn()
            .query_row(
                "SELECT id, sender_id, sender_name, mentor_id, mentor_name,
                        message, mode, status, created_at
                 FROM requests WHERE id = ?1",
                params![id.to_string()],
                row_to_request,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Conditionally transition a request's status.
    ///
    /// The `WHERE status = expected` clause re-checks the state at write time,
    /// so of two racing transitions exactly one observes an affected row.
    /// Returns `true` when this call won the transition.
    pub fn set_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        target: RequestStatus,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE requests SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![target.as_str(), id.to_string(), expected.as_str()],
        )?;
        Ok(affected > 0)
    }

    pub fn request_exists(&self, id: RequestId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM requests WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list_requests_for_sender(&self, sender_id: UserId) -> Result<Vec<MentorshipRequest>> {
        self.list_requests_by("sender_id", sender_id)
    }

    pub fn list_requests_for_mentor(&self, mentor_id: UserId) -> Result<Vec<MentorshipRequest>> {
        self.list_requests_by("mentor_id", mentor_id)
    }

    fn list_requests_by(&self, column: &str, user_id: UserId) -> Result<Vec<MentorshipRequest>> {
        let sql = format!(
            "SELECT id, sender_id, sender_name, mentor_id, mentor_name,
                    message, mode, status, created_at
             FROM requests WHERE {column} = ?1
             ORDER BY created_at DESC, id ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_request)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<MentorshipRequest> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let mentor_str: String = row.get(3)?;
    let mode_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let ts_str: String = row.get(8)?;

    Ok(MentorshipRequest {
        id: RequestId(parse_uuid(0, &id_str)?),
        sender_id: UserId(parse_uuid(1, &sender_str)?),
        sender_name: row.get(2)?,
        mentor_id: UserId(parse_uuid(3, &mentor_str)?),
        mentor_name: row.get(4)?,
        message: row.get(5)?,
        mode: parse_enum(6, &mode_str)?,
        status: parse_enum(7, &status_str)?,
        created_at: parse_timestamp(8, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alumlink_shared::ConnectionMode;
    use chrono::Utc;

    fn sample() -> MentorshipRequest {
        MentorshipRequest {
            id: RequestId::new(),
            sender_id: UserId::new(),
            sender_name: "Student".to_string(),
            mentor_id: UserId::new(),
            mentor_name: "Mentor".to_string(),
            message: "Could you mentor me?".to_string(),
            mode: ConnectionMode::Chat,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let request = sample();
        db.insert_request(&request).unwrap();

        let loaded = db.get_request(request.id).unwrap();
        assert_eq!(loaded, request.clone());
    }

    #[test]
    fn conditional_transition_wins_once() {
        let db = Database::open_in_memory().unwrap();
        let request = sample();
        db.insert_request(&request).unwrap();

        let first =
            db.set_request_status(request.id, RequestStatus::Pending, RequestStatus::Accepted);
        assert!(first.unwrap());

        // The state was re-checked at write time, so the second transition
        // observes zero affected rows.
        let second =
            db.set_request_status(request.id, RequestStatus::Pending, RequestStatus::Rejected);
        assert!(!second.unwrap());

        let loaded = db.get_request(request.id).unwrap();
        assert_eq!(loaded.status, RequestStatus::Accepted);
    }

    #[test]
    fn list_dispatch_by_side() {
        let db = Database::open_in_memory().unwrap();
        let request = sample();
        db.insert_request(&request).unwrap();

        let as_sender = db.list_requests_for_sender(request.sender_id).unwrap();
        assert_eq!(as_sender.len(), 1);

        let as_mentor = db.list_requests_for_mentor(request.mentor_id).unwrap();
        assert_eq!(as_mentor.len(), 1);

        let stranger = db.list_requests_for_sender(request.mentor_id).unwrap();
        assert!(stranger.is_empty());
    }
}
