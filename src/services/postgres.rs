use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core::repository::{MatchRepository, SkillRepository, StoreError, UserRepository};
use crate::models::{
    MatchRecord, MatchingSnapshot, NewMatchRecord, NewSkillListing, NewUser, SkillDirection, SkillListing, User,
    UserId, UserPair,
};

const MATCH_COLUMNS: &str = "id, user1_id, user2_id, user1_offers, user1_wants, user2_offers, \
     user2_wants, match_percentage, is_double_swap, status, created_at";

const SKILL_COLUMNS: &str =
    "id, user_id, skill_name, skill_type, proficiency_level, description, created_at";

/// PostgreSQL-backed store for users, skills and matches
///
/// The `matches` table carries a unique index on
/// `(LEAST(user1_id, user2_id), GREATEST(user1_id, user2_id))`, so concurrent
/// matcher runs cannot create two records for the same pair.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn skill_from_row(row: &PgRow) -> Result<SkillListing, StoreError> {
    let skill_type: String = row.try_get("skill_type")?;
    let direction = skill_type
        .parse::<SkillDirection>()
        .map_err(|e| StoreError::InvalidInput(e.to_string()))?;

    Ok(SkillListing {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        skill_name: row.try_get("skill_name")?,
        direction,
        proficiency: row.try_get("proficiency_level")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<MatchRecord, StoreError> {
    Ok(MatchRecord {
        id: row.try_get("id")?,
        user1_id: row.try_get("user1_id")?,
        user2_id: row.try_get("user2_id")?,
        user1_offers: row.try_get("user1_offers")?,
        user1_wants: row.try_get("user1_wants")?,
        user2_offers: row.try_get("user2_offers")?,
        user2_wants: row.try_get("user2_wants")?,
        match_percentage: row.try_get("match_percentage")?,
        is_double_swap: row.try_get("is_double_swap")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl SkillRepository for PostgresClient {
    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1) AS found")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("found")?)
    }

    async fn list_skills(
        &self,
        user_id: UserId,
        direction: SkillDirection,
    ) -> Result<Vec<SkillListing>, StoreError> {
        let query = format!(
            "SELECT {} FROM skills WHERE user_id = $1 AND skill_type = $2 ORDER BY id",
            SKILL_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(direction.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(skill_from_row).collect()
    }

    async fn list_all_users(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM users WHERE id <> $1 ORDER BY id")
            .bind(excluding)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<UserId, _>("id").map_err(StoreError::from))
            .collect()
    }

    /// Reads users and listings inside one REPEATABLE READ transaction so the
    /// matcher never sees a half-applied skill change.
    async fn load_snapshot(&self, user_id: UserId) -> Result<Option<MatchingSnapshot>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query("SELECT id FROM users ORDER BY id")
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get::<UserId, _>("id"))
            .collect::<Result<Vec<_>, _>>()?;

        let query = format!("SELECT {} FROM skills ORDER BY id", SKILL_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let skills = rows
            .iter()
            .map(skill_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MatchingSnapshot::assemble(user_id, &users, skills))
    }

    async fn insert_skill(&self, skill: NewSkillListing) -> Result<SkillListing, StoreError> {
        let query = format!(
            r#"
            INSERT INTO skills (user_id, skill_name, skill_type, proficiency_level, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SKILL_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(skill.user_id)
            .bind(&skill.skill_name)
            .bind(skill.direction.as_str())
            .bind(&skill.proficiency)
            .bind(&skill.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::NotFound(format!("user {}", skill.user_id))
                } else {
                    StoreError::from(e)
                }
            })?;

        skill_from_row(&row)
    }

    async fn delete_skill(&self, skill_id: i64, owner: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT user_id FROM skills WHERE id = $1")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let skill_owner: UserId = row.try_get("user_id")?;
        if skill_owner != owner {
            return Err(StoreError::Conflict(format!(
                "skill {} is not owned by user {}",
                skill_id, owner
            )));
        }

        let result = sqlx::query("DELETE FROM skills WHERE id = $1 AND user_id = $2")
            .bind(skill_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MatchRepository for PostgresClient {
    async fn find_by_unordered_pair(
        &self,
        pair: UserPair,
    ) -> Result<Option<MatchRecord>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE LEAST(user1_id, user2_id) = $1 AND GREATEST(user1_id, user2_id) = $2
            "#,
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    /// Uses INSERT ... ON CONFLICT DO NOTHING against the unordered pair index;
    /// no row comes back when the pair is already taken.
    async fn insert(&self, record: NewMatchRecord) -> Result<Option<MatchRecord>, StoreError> {
        let query = format!(
            r#"
            INSERT INTO matches (
                user1_id, user2_id, user1_offers, user1_wants, user2_offers, user2_wants,
                match_percentage, is_double_swap
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(record.user1_id)
            .bind(record.user2_id)
            .bind(&record.user1_offers)
            .bind(&record.user1_wants)
            .bind(&record.user2_offers)
            .bind(&record.user2_wants)
            .bind(record.match_percentage)
            .bind(record.is_double_swap)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE user1_id = $1 OR user2_id = $1
            ORDER BY match_percentage DESC, id ASC
            LIMIT $2
            "#,
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(match_from_row).collect()
    }
}

#[async_trait]
impl UserRepository for PostgresClient {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, bio)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, bio, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!(
                    "username {} or email {} already registered",
                    user.username, user.email
                ))
            } else {
                StoreError::from(e)
            }
        })?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            bio: row.try_get("bio")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
