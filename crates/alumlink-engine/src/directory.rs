//! Alumni directory.
//!
//! The viewer is always excluded from their own directory listing, and the
//! optional search filter matches name or affiliation case-insensitively.

use alumlink_shared::UserId;

use crate::error::Result;
use crate::store::ChangeEvent;
use crate::subscription::{spawn_snapshot_watch, Subscription};
use crate::views::MentorCard;
use crate::Engine;

impl Engine {
    /// Alumni mentors visible to `viewer_id`, optionally filtered.
    pub async fn list_mentors(
        &self,
        viewer_id: UserId,
        search: Option<&str>,
    ) -> Result<Vec<MentorCard>> {
        let rows = self.store().with_db(|db| db.list_alumni(viewer_id))?;
        let needle = search.map(str::to_lowercase);
        Ok(rows
            .into_iter()
            .filter(|p| match &needle {
                None => true,
                Some(n) => {
                    p.display_name.to_lowercase().contains(n)
                        || p.affiliation.to_lowercase().contains(n)
                }
            })
            .map(MentorCard::from)
            .collect())
    }

    /// Live directory: re-delivered whenever any profile changes, so rating
    /// and session updates reach listeners through the same delivery
    /// contract as the feed.
    pub fn subscribe_mentors(&self, viewer_id: UserId) -> Subscription<Vec<MentorCard>> {
        spawn_snapshot_watch(
            self.store(),
            self.config(),
            |event| matches!(event, ChangeEvent::ProfileChanged { .. }),
            move |db| {
                let rows = db.list_alumni(viewer_id)?;
                Ok(rows.into_iter().map(MentorCard::from).collect())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use alumlink_shared::Role;

    use crate::testutil::{engine, seed_profile};

    #[tokio::test]
    async fn the_viewer_is_hidden_from_their_own_directory() {
        let engine = engine();
        let viewer = seed_profile(&engine, "Mia", Role::Alumni).await;
        let other = seed_profile(&engine, "Ada", Role::Alumni).await;
        seed_profile(&engine, "Sam", Role::Student).await;

        let cards = engine.list_mentors(viewer, None).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].user_id, other);
    }

    #[tokio::test]
    async fn search_matches_name_or_affiliation() {
        let engine = engine();
        let viewer = seed_profile(&engine, "Sam", Role::Student).await;
        seed_profile(&engine, "Ada Lovelace", Role::Alumni).await;
        seed_profile(&engine, "Grace Hopper", Role::Alumni).await;

        let by_name = engine.list_mentors(viewer, Some("grace")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].display_name, "Grace Hopper");

        // Both seeded mentors share the same affiliation.
        let by_affiliation = engine.list_mentors(viewer, Some("acme")).await.unwrap();
        assert_eq!(by_affiliation.len(), 2);

        let none = engine.list_mentors(viewer, Some("nowhere")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn directory_subscription_sees_rating_updates() {
        let engine = engine();
        let viewer = seed_profile(&engine, "Sam", Role::Student).await;
        let mentor = seed_profile(&engine, "Mia", Role::Alumni).await;

        let mut sub = engine.subscribe_mentors(viewer);
        let initial = sub.recv().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].stats.rating_count, 0);

        engine.rate(mentor, viewer, 5).await.unwrap();
        let after_rating = sub.recv().await.unwrap().unwrap();
        assert_eq!(after_rating[0].stats.rating, 5.0);
        assert_eq!(after_rating[0].stats.rating_count, 1);
    }
}
