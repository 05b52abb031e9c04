//! Mentorship request lifecycle.
//!
//! States: `Pending` (initial) -> `Accepted` | `Rejected`, both terminal.
//! The transition is decided at write time by a conditional update keyed on
//! the stored status, so of two racing `decide` calls exactly one wins and
//! the loser surfaces a state conflict.

use chrono::Utc;
use tracing::info;

use alumlink_shared::{ConnectionMode, Decision, RequestId, RequestStatus, Role, UserId};
use alumlink_store::{Database, MentorshipRequest};

use crate::error::{EngineError, Result, ValidationError};
use crate::store::ChangeEvent;
use crate::subscription::{spawn_snapshot_watch, Subscription};
use crate::views::RequestView;
use crate::Engine;

impl Engine {
    /// Create a new pending request from `sender_id` to `mentor_id`.
    pub async fn create_request(
        &self,
        sender_id: UserId,
        mentor_id: UserId,
        message: impl Into<String>,
        mode: ConnectionMode,
    ) -> Result<RequestView> {
        if sender_id == mentor_id {
            return Err(ValidationError::SelfRequest.into());
        }

        let (sender, mentor) = self
            .store()
            .with_db(|db| Ok((db.get_profile(sender_id)?, db.get_profile(mentor_id)?)))?;
        if mentor.role != Role::Alumni {
            return Err(ValidationError::NotAMentor.into());
        }

        let request = MentorshipRequest {
            id: RequestId::new(),
            sender_id,
            sender_name: sender.display_name,
            mentor_id,
            mentor_name: mentor.display_name,
            message: message.into(),
            mode,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        self.store().with_db(|db| db.insert_request(&request))?;

        info!(
            request_id = %request.id,
            sender = %sender_id,
            mentor = %mentor_id,
            "mentorship request created"
        );
        self.store().publish(ChangeEvent::RequestChanged {
            sender_id,
            mentor_id,
        });
        Ok(RequestView::from(request))
    }

    /// Accept or reject a pending request.  Only the request's mentor may
    /// decide, and only once.
    pub async fn decide(
        &self,
        request_id: RequestId,
        acting_mentor_id: UserId,
        decision: Decision,
    ) -> Result<RequestView> {
        let request = self.store().with_db(|db| db.get_request(request_id))?;

        if request.mentor_id != acting_mentor_id {
            return Err(EngineError::NotAuthorized(format!(
                "user {acting_mentor_id} is not the mentor of request {request_id}"
            )));
        }
        if request.status.is_terminal() {
            return Err(EngineError::StateConflict(format!(
                "request {request_id} is already {}",
                request.status
            )));
        }

        let target = decision.target_status();
        let won = self.store().with_db(|db| {
            let won = db.set_request_status(request_id, RequestStatus::Pending, target)?;
            if won && decision == Decision::Accept {
                // One accepted request = one agreed mentoring session.
                db.increment_session_count(request.mentor_id)?;
            }
            Ok(won)
        })?;
        if !won {
            // Lost the race: someone else decided between our read and write.
            return Err(EngineError::StateConflict(format!(
                "request {request_id} was already decided"
            )));
        }

        info!(request_id = %request_id, status = %target, "mentorship request decided");
        self.store().publish(ChangeEvent::RequestChanged {
            sender_id: request.sender_id,
            mentor_id: request.mentor_id,
        });
        if decision == Decision::Accept {
            self.store().publish(ChangeEvent::ProfileChanged {
                user_id: request.mentor_id,
            });
        }

        let updated = self.store().with_db(|db| db.get_request(request_id))?;
        Ok(RequestView::from(updated))
    }

    /// One-shot listing, dispatched by role: mentors see requests addressed
    /// to them, everyone else sees requests they sent.
    pub async fn list_requests(&self, user_id: UserId, role: Role) -> Result<Vec<RequestView>> {
        let rows = self
            .store()
            .with_db(move |db| list_for(db, user_id, role))?;
        Ok(rows)
    }

    /// Live variant of [`Engine::list_requests`]: an initial snapshot, then a
    /// full re-delivered result set whenever a request in scope changes.
    pub fn subscribe_requests(&self, user_id: UserId, role: Role) -> Subscription<Vec<RequestView>> {
        spawn_snapshot_watch(
            self.store(),
            self.config(),
            move |event| match event {
                ChangeEvent::RequestChanged {
                    sender_id,
                    mentor_id,
                } => match role {
                    Role::Alumni => *mentor_id == user_id,
                    Role::Student => *sender_id == user_id,
                },
                _ => false,
            },
            move |db| list_for(db, user_id, role),
        )
    }
}

fn list_for(db: &mut Database, user_id: UserId, role: Role) -> alumlink_store::Result<Vec<RequestView>> {
    let rows = match role {
        Role::Alumni => db.list_requests_for_mentor(user_id)?,
        Role::Student => db.list_requests_for_sender(user_id)?,
    };
    Ok(rows.into_iter().map(RequestView::from).collect())
}
