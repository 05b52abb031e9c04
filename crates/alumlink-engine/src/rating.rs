//! Mentor rating aggregator.
//!
//! The store keeps the full-precision running total and count; folding a new
//! rating in is a single accumulate statement at the store's serialization
//! point, so concurrent submissions can never lose an update.  Rounding to
//! one decimal happens only when a view is built.

use tracing::info;

use alumlink_shared::constants::{MAX_RATING_STARS, MIN_RATING_STARS};
use alumlink_shared::{Role, UserId};

use crate::error::{Result, ValidationError};
use crate::store::ChangeEvent;
use crate::views::StatsView;
use crate::Engine;

impl Engine {
    /// Fold one rating into a mentor's stats and return the updated view.
    ///
    /// There is no per-rater de-duplication: every call counts as one vote.
    /// A one-rating-per-rater policy would hang a unique (mentor, rater)
    /// index off this same accumulate.
    pub async fn rate(
        &self,
        mentor_id: UserId,
        rater_id: UserId,
        stars: u8,
    ) -> Result<StatsView> {
        if !(MIN_RATING_STARS..=MAX_RATING_STARS).contains(&stars) {
            return Err(ValidationError::InvalidRating(stars).into());
        }

        let mentor = self.store().with_db(|db| db.get_profile(mentor_id))?;
        if mentor.role != Role::Alumni {
            return Err(ValidationError::NotAMentor.into());
        }

        let updated = self.store().with_db(|db| {
            db.apply_rating(mentor_id, stars)?;
            db.get_profile(mentor_id)
        })?;

        info!(mentor = %mentor_id, rater = %rater_id, stars, "mentor rated");
        self.store()
            .publish(ChangeEvent::ProfileChanged { user_id: mentor_id });
        Ok(StatsView::from_profile(&updated))
    }
}
