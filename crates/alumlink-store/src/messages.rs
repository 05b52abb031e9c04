use chrono::Utc;
use rusqlite::params;

use alumlink_shared::{MessageId, RequestId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{parse_timestamp, parse_uuid, Message};

impl Database {
    /// Append a message to a channel.
    ///
    /// The commit timestamp and sequence number are assigned here, not by the
    /// caller: the caller's clock never participates in message ordering.
    /// Fails with [`StoreError::NotFound`] when no request exists under the
    /// channel key.
    pub fn append_message(
        &self,
        id: MessageId,
        channel_id: RequestId,
        sender_id: UserId,
        body: &str,
    ) -> Result<Message> {
        if !self.request_exists(channel_id)? {
            return Err(StoreError::NotFound);
        }

        let created_at = Utc::now();
        self.conn().execute(
            "INSERT INTO messages (id, channel_id, sender_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                channel_id.to_string(),
                sender_id.to_string(),
                body,
                created_at.to_rfc3339(),
            ],
        )?;
        let seq = self.conn().last_insert_rowid();

        Ok(Message {
            seq,
            id,
            channel_id,
            sender_id,
            body: body.to_string(),
            created_at,
        })
    }

    /// Messages of a channel with `seq > after`, in commit order.
    ///
    /// `after = 0` returns the full history (sequences start at 1).
    pub fn get_messages_after(&self, channel_id: RequestId, after: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT seq, id, channel_id, sender_id, body, created_at
             FROM messages
             WHERE channel_id = ?1 AND seq > ?2
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![channel_id.to_string(), after], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(1)?;
    let channel_str: String = row.get(2)?;
    let sender_str: String = row.get(3)?;
    let ts_str: String = row.get(5)?;

    Ok(Message {
        seq: row.get(0)?,
        id: MessageId(parse_uuid(1, &id_str)?),
        channel_id: RequestId(parse_uuid(2, &channel_str)?),
        sender_id: UserId(parse_uuid(3, &sender_str)?),
        body: row.get(4)?,
        created_at: parse_timestamp(5, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alumlink_shared::{ConnectionMode, RequestStatus};
    use crate::models::MentorshipRequest;

    fn seed_channel(db: &Database) -> RequestId {
        let request = MentorshipRequest {
            id: RequestId::new(),
            sender_id: UserId::new(),
            sender_name: "Student".to_string(),
            mentor_id: UserId::new(),
            mentor_name: "Mentor".to_string(),
            message: "hello".to_string(),
            mode: ConnectionMode::VideoCall,
            status: RequestStatus::Accepted,
            created_at: Utc::now(),
        };
        db.insert_request(&request).unwrap();
        request.id
    }

    #[test]
    fn sequences_are_monotonic_per_store() {
        let db = Database::open_in_memory().unwrap();
        let channel = seed_channel(&db);
        let sender = UserId::new();

        let first = db
            .append_message(MessageId::new(), channel, sender, "hi")
            .unwrap();
        let second = db
            .append_message(MessageId::new(), channel, sender, "hello")
            .unwrap();
        assert!(second.seq > first.seq);

        let all = db.get_messages_after(channel, 0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].body, "hi");
        assert_eq!(all[1].body, "hello");

        let tail = db.get_messages_after(channel, first.seq).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].body, "hello");
    }

    #[test]
    fn append_to_unknown_channel_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .append_message(MessageId::new(), RequestId::new(), UserId::new(), "hi")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
