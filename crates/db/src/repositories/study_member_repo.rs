//! Repository for the `study_members` table.

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::study_member::{AddStudyMember, StudyMember, StudyMemberInfo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, study_id, user_id, can_manage, created_at, updated_at";

/// Provides membership operations for studies.
pub struct StudyMemberRepo;

impl StudyMemberRepo {
    /// Add a user to a study, or update their `can_manage` flag if they
    /// are already a member.
    pub async fn add(
        pool: &PgPool,
        study_id: DbId,
        input: &AddStudyMember,
    ) -> Result<StudyMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO study_members (study_id, user_id, can_manage)
             VALUES ($1, $2, COALESCE($3, false))
             ON CONFLICT (study_id, user_id)
             DO UPDATE SET can_manage = COALESCE($3, study_members.can_manage)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StudyMember>(&query)
            .bind(study_id)
            .bind(input.user_id)
            .bind(input.can_manage)
            .fetch_one(pool)
            .await
    }

    /// Remove a user from a study. Returns `true` if a membership existed.
    pub async fn remove(pool: &PgPool, study_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM study_members WHERE study_id = $1 AND user_id = $2")
            .bind(study_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Look up a single membership.
    pub async fn find(
        pool: &PgPool,
        study_id: DbId,
        user_id: DbId,
    ) -> Result<Option<StudyMember>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM study_members WHERE study_id = $1 AND user_id = $2");
        sqlx::query_as::<_, StudyMember>(&query)
            .bind(study_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List a study's members with usernames, managers first.
    pub async fn list_for_study(
        pool: &PgPool,
        study_id: DbId,
    ) -> Result<Vec<StudyMemberInfo>, sqlx::Error> {
        sqlx::query_as::<_, StudyMemberInfo>(
            "SELECT m.id, m.study_id, m.user_id, u.username, m.can_manage, m.created_at
             FROM study_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.study_id = $1
             ORDER BY m.can_manage DESC, u.username ASC",
        )
        .bind(study_id)
        .fetch_all(pool)
        .await
    }
}
