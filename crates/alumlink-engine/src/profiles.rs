//! Profile onboarding and owner-gated updates.
//!
//! Rating and session counters are never writable through this module; they
//! change only via the rating aggregator and the request lifecycle.

use chrono::Utc;
use tracing::info;

use alumlink_shared::{Role, UserId};
use alumlink_store::Profile;

use crate::error::{EngineError, Result};
use crate::store::ChangeEvent;
use crate::views::ProfileView;
use crate::Engine;

/// Onboarding input for a new profile.  Stats start zeroed.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub affiliation: String,
    pub bio: String,
    pub experience_years: u32,
}

/// Owner-editable fields; `None` leaves the current value in place.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub affiliation: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<u32>,
}

impl Engine {
    /// Create a profile for a freshly onboarded user.
    pub async fn create_profile(&self, new: NewProfile) -> Result<ProfileView> {
        let profile = Profile {
            user_id: new.user_id,
            display_name: new.display_name,
            role: new.role,
            affiliation: new.affiliation,
            bio: new.bio,
            experience_years: new.experience_years,
            rating_total: 0.0,
            rating_count: 0,
            session_count: 0,
            created_at: Utc::now(),
        };
        self.store().with_db(|db| db.insert_profile(&profile))?;

        info!(user = %profile.user_id, role = %profile.role, "profile created");
        self.store().publish(ChangeEvent::ProfileChanged {
            user_id: profile.user_id,
        });
        Ok(ProfileView::from(profile))
    }

    pub async fn get_profile(&self, user_id: UserId) -> Result<ProfileView> {
        let profile = self.store().with_db(|db| db.get_profile(user_id))?;
        Ok(ProfileView::from(profile))
    }

    /// Apply a patch to a profile.  Only the owner may edit.
    pub async fn update_profile(
        &self,
        acting_user: UserId,
        user_id: UserId,
        patch: ProfilePatch,
    ) -> Result<ProfileView> {
        if acting_user != user_id {
            return Err(EngineError::NotAuthorized(format!(
                "user {acting_user} cannot edit profile {user_id}"
            )));
        }

        let updated = self.store().with_db(move |db| {
            let current = db.get_profile(user_id)?;
            let display_name = patch.display_name.unwrap_or(current.display_name);
            let affiliation = patch.affiliation.unwrap_or(current.affiliation);
            let bio = patch.bio.unwrap_or(current.bio);
            let experience_years = patch.experience_years.unwrap_or(current.experience_years);
            db.update_profile_fields(user_id, &display_name, &affiliation, &bio, experience_years)?;
            db.get_profile(user_id)
        })?;

        info!(user = %user_id, "profile updated");
        self.store()
            .publish(ChangeEvent::ProfileChanged { user_id });
        Ok(ProfileView::from(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{engine, seed_profile};

    #[tokio::test]
    async fn duplicate_onboarding_is_a_state_conflict() {
        let engine = engine();
        let user = seed_profile(&engine, "Ada", Role::Alumni).await;

        let err = engine
            .create_profile(NewProfile {
                user_id: user,
                display_name: "Ada again".to_string(),
                role: Role::Alumni,
                affiliation: String::new(),
                bio: String::new(),
                experience_years: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StateConflict(_)));
    }

    #[tokio::test]
    async fn only_the_owner_may_edit() {
        let engine = engine();
        let owner = seed_profile(&engine, "Ada", Role::Alumni).await;
        let other = seed_profile(&engine, "Eve", Role::Student).await;

        let err = engine
            .update_profile(
                other,
                owner,
                ProfilePatch {
                    bio: Some("hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAuthorized(_)));

        let updated = engine
            .update_profile(
                owner,
                owner,
                ProfilePatch {
                    bio: Some("Happy to mentor".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio, "Happy to mentor");
        // Unpatched fields survive.
        assert_eq!(updated.display_name, "Ada");
    }

    #[tokio::test]
    async fn patch_cannot_touch_the_counters() {
        let engine = engine();
        let mentor = seed_profile(&engine, "Mia", Role::Alumni).await;
        let rater = seed_profile(&engine, "Sam", Role::Student).await;

        engine.rate(mentor, rater, 5).await.unwrap();
        let before = engine.get_profile(mentor).await.unwrap();

        engine
            .update_profile(
                mentor,
                mentor,
                ProfilePatch {
                    display_name: Some("Mia R.".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = engine.get_profile(mentor).await.unwrap();
        assert_eq!(after.stats, before.stats);
    }
}
