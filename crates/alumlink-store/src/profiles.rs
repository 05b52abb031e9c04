use rusqlite::params;

use alumlink_shared::{Role, UserId};

use crate::database::Database;
use crate::error::{map_insert_err, Result, StoreError};
use crate::models::{parse_enum, parse_timestamp, parse_uuid, Profile};

impl Database {
    /// Insert a new profile.  Fails with [`StoreError::AlreadyExists`] if the
    /// user id is already taken.
    pub fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO profiles (user_id, display_name, role, affiliation, bio,
                                       experience_years, rating_total, rating_count,
                                       session_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    profile.user_id.to_string(),
                    profile.display_name,
                    profile.role.as_str(),
                    profile.affiliation,
                    profile.bio,
                    profile.experience_years,
                    profile.rating_total,
                    profile.rating_count,
                    profile.session_count,
                    profile.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    pub fn get_profile(&self, user_id: UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                "SELECT user_id, display_name, role, affiliation, bio, experience_years,
                        rating_total, rating_count, session_count, created_at
                 FROM profiles WHERE user_id = ?1",
                params![user_id.to_string()],
                row_to_profile,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Overwrite the owner-editable fields of a profile.  Rating and session
    /// counters are deliberately untouched; they change only through
    /// [`Database::apply_rating`] and [`Database::increment_session_count`].
    pub fn update_profile_fields(
        &self,
        user_id: UserId,
        display_name: &str,
        affiliation: &str,
        bio: &str,
        experience_years: u32,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles
             SET display_name = ?1, affiliation = ?2, bio = ?3, experience_years = ?4
             WHERE user_id = ?5",
            params![
                display_name,
                affiliation,
                bio,
                experience_years,
                user_id.to_string()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// All alumni profiles except the viewer's own, ordered by display name.
    pub fn list_alumni(&self, exclude: UserId) -> Result<Vec<Profile>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, display_name, role, affiliation, bio, experience_years,
                    rating_total, rating_count, session_count, created_at
             FROM profiles
             WHERE role = ?1 AND user_id != ?2
             ORDER BY display_name ASC",
        )?;

        let rows = stmt.query_map(
            params![Role::Alumni.as_str(), exclude.to_string()],
            row_to_profile,
        )?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    /// Fold one rating into a mentor's stats as a single atomic accumulate.
    ///
    /// The statement adds to the full-precision running total and bumps the
    /// count in place, so two concurrent ratings can never lose an update.
    /// Returns the post-update `(rating_total, rating_count)`.
    pub fn apply_rating(&self, user_id: UserId, stars: u8) -> Result<(f64, i64)> {
        let affected = self.conn().execute(
            "UPDATE profiles
             SET rating_total = rating_total + ?1, rating_count = rating_count + 1
             WHERE user_id = ?2",
            params![f64::from(stars), user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.conn()
            .query_row(
                "SELECT rating_total, rating_count FROM profiles WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(StoreError::Sqlite)
    }

    pub fn increment_session_count(&self, user_id: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET session_count = session_count + 1 WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let user_id_str: String = row.get(0)?;
    let role_str: String = row.get(2)?;
    let ts_str: String = row.get(9)?;

    Ok(Profile {
        user_id: UserId(parse_uuid(0, &user_id_str)?),
        display_name: row.get(1)?,
        role: parse_enum(2, &role_str)?,
        affiliation: row.get(3)?,
        bio: row.get(4)?,
        experience_years: row.get(5)?,
        rating_total: row.get(6)?,
        rating_count: row.get(7)?,
        session_count: row.get(8)?,
        created_at: parse_timestamp(9, &ts_str)?,
    })
}
