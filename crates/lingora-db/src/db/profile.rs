use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingora_core::models::{
    CertificationEntry, EducationEntry, LearningLanguage, ProficiencyLevel, ProfileRecord,
    ProfileUpdate,
};
use lingora_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Columns selected for every profile read, in `ProfileRow` field order.
const PROFILE_COLUMNS: &str = "id, owner_id, handle, display_name, bio, location, \
     native_language, interface_language, timezone, learning_languages, \
     proficiency_level, avatar_key, avatar_url, education, certifications, \
     discoverable, show_location, show_activity, search_vector, \
     last_updated_by, last_activity_at, created_at, updated_at";

/// Persistence seam for profile records.
///
/// All merge operations read the current row, apply the change in Rust, and
/// write the whole record back inside a row-locked transaction, so two
/// concurrent writers to the same owner serialize instead of interleaving.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the profile for an owner, if one exists.
    async fn fetch(&self, owner_id: &str) -> Result<Option<ProfileRecord>, AppError>;

    /// Read the profile for an owner, creating an empty one first if this is
    /// the owner's first access. Safe under concurrent first access.
    async fn fetch_or_create(&self, owner_id: &str) -> Result<ProfileRecord, AppError>;

    /// Merge a partial update into the owner's record and persist it together
    /// with the recomputed derived fields. Returns the updated record.
    async fn apply_update(
        &self,
        owner_id: &str,
        update: &ProfileUpdate,
        actor: &str,
    ) -> Result<ProfileRecord, AppError>;

    /// Point the record at a newly uploaded avatar blob. Returns the updated
    /// record and the key the record referenced before this commit.
    async fn set_avatar(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
    ) -> Result<(ProfileRecord, Option<String>), AppError>;

    /// The avatar key currently referenced by the owner's record, if any.
    async fn current_avatar_key(&self, owner_id: &str) -> Result<Option<String>, AppError>;

    /// Clear the avatar reference if (and only if) it still points at `key`.
    /// Returns the updated record, or `None` when nothing matched.
    async fn clear_avatar(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<ProfileRecord>, AppError>;

    /// Clear a certification's document reference matching `key`. Returns the
    /// updated record, or `None` when no certification referenced the key.
    async fn clear_document_reference(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<ProfileRecord>, AppError>;
}

/// Postgres-backed profile store.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

/// Raw row shape; JSONB sections decode into typed lists in `into_record`.
#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    owner_id: String,
    handle: Option<String>,
    display_name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    native_language: Option<String>,
    interface_language: Option<String>,
    timezone: Option<String>,
    learning_languages: serde_json::Value,
    proficiency_level: Option<ProficiencyLevel>,
    avatar_key: Option<String>,
    avatar_url: Option<String>,
    education: serde_json::Value,
    certifications: serde_json::Value,
    discoverable: bool,
    show_location: bool,
    show_activity: bool,
    search_vector: String,
    last_updated_by: Option<String>,
    last_activity_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_record(self) -> Result<ProfileRecord, AppError> {
        let learning_languages: Vec<LearningLanguage> =
            serde_json::from_value(self.learning_languages)?;
        let education: Vec<EducationEntry> = serde_json::from_value(self.education)?;
        let certifications: Vec<CertificationEntry> = serde_json::from_value(self.certifications)?;

        Ok(ProfileRecord {
            id: self.id,
            owner_id: self.owner_id,
            handle: self.handle,
            display_name: self.display_name,
            bio: self.bio,
            location: self.location,
            native_language: self.native_language,
            interface_language: self.interface_language,
            timezone: self.timezone,
            learning_languages,
            proficiency_level: self.proficiency_level,
            avatar_key: self.avatar_key,
            avatar_url: self.avatar_url,
            education,
            certifications,
            discoverable: self.discoverable,
            show_location: self.show_location,
            show_activity: self.show_activity,
            search_vector: self.search_vector,
            last_updated_by: self.last_updated_by,
            last_activity_at: self.last_activity_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Human-readable field name for a unique-constraint violation.
fn conflict_field_for_constraint(constraint: &str) -> &'static str {
    match constraint {
        "profiles_handle_key" => "handle",
        "profiles_owner_id_key" => "owner id",
        _ => "field",
    }
}

/// Translate database errors into the application taxonomy.
///
/// Unique violations become `Conflict` naming the offending field;
/// serialization failures and deadlocks become the retryable
/// `ConflictOnCommit`. Everything else stays a database error.
fn map_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(code) = db_err.code() {
            match code.as_ref() {
                "23505" => {
                    let field = db_err
                        .constraint()
                        .map(conflict_field_for_constraint)
                        .unwrap_or("field");
                    return AppError::Conflict {
                        field: field.to_string(),
                    };
                }
                "40001" | "40P01" => return AppError::ConflictOnCommit,
                _ => {}
            }
        }
    }
    AppError::from(e)
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock and read the owner's row inside an open transaction.
    async fn select_for_update(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM profiles WHERE owner_id = $1 FOR UPDATE",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, ProfileRow>(&query)
            .bind(owner_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_error)?;

        row.map(ProfileRow::into_record).transpose()
    }

    /// Write every mutable column of the record back to its row.
    async fn persist(
        tx: &mut Transaction<'_, Postgres>,
        record: &ProfileRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE profiles SET
                handle = $1,
                display_name = $2,
                bio = $3,
                location = $4,
                native_language = $5,
                interface_language = $6,
                timezone = $7,
                learning_languages = $8,
                proficiency_level = $9,
                avatar_key = $10,
                avatar_url = $11,
                education = $12,
                certifications = $13,
                discoverable = $14,
                show_location = $15,
                show_activity = $16,
                search_vector = $17,
                last_updated_by = $18,
                last_activity_at = $19,
                updated_at = $20
            WHERE owner_id = $21
            "#,
        )
        .bind(&record.handle)
        .bind(&record.display_name)
        .bind(&record.bio)
        .bind(&record.location)
        .bind(&record.native_language)
        .bind(&record.interface_language)
        .bind(&record.timezone)
        .bind(serde_json::to_value(&record.learning_languages)?)
        .bind(record.proficiency_level)
        .bind(&record.avatar_key)
        .bind(&record.avatar_url)
        .bind(serde_json::to_value(&record.education)?)
        .bind(serde_json::to_value(&record.certifications)?)
        .bind(record.discoverable)
        .bind(record.show_location)
        .bind(record.show_activity)
        .bind(&record.search_vector)
        .bind(&record.last_updated_by)
        .bind(record.last_activity_at)
        .bind(record.updated_at)
        .bind(&record.owner_id)
        .execute(&mut **tx)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    /// Insert an empty record for a first-time owner. Returns `None` when a
    /// concurrent request created the row first.
    async fn insert_new(&self, owner_id: &str) -> Result<Option<ProfileRecord>, AppError> {
        let record = ProfileRecord::new(owner_id);

        let query = format!(
            r#"
            INSERT INTO profiles (
                id, owner_id, handle, display_name, bio, location,
                native_language, interface_language, timezone,
                learning_languages, proficiency_level, avatar_key, avatar_url,
                education, certifications, discoverable, show_location,
                show_activity, search_vector, last_updated_by,
                last_activity_at, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            ON CONFLICT (owner_id) DO NOTHING
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, ProfileRow>(&query)
            .bind(record.id)
            .bind(&record.owner_id)
            .bind(&record.handle)
            .bind(&record.display_name)
            .bind(&record.bio)
            .bind(&record.location)
            .bind(&record.native_language)
            .bind(&record.interface_language)
            .bind(&record.timezone)
            .bind(serde_json::to_value(&record.learning_languages)?)
            .bind(record.proficiency_level)
            .bind(&record.avatar_key)
            .bind(&record.avatar_url)
            .bind(serde_json::to_value(&record.education)?)
            .bind(serde_json::to_value(&record.certifications)?)
            .bind(record.discoverable)
            .bind(record.show_location)
            .bind(record.show_activity)
            .bind(&record.search_vector)
            .bind(&record.last_updated_by)
            .bind(record.last_activity_at)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(ProfileRow::into_record).transpose()
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "select"))]
    async fn fetch(&self, owner_id: &str) -> Result<Option<ProfileRecord>, AppError> {
        let query = format!("SELECT {} FROM profiles WHERE owner_id = $1", PROFILE_COLUMNS);
        let row = sqlx::query_as::<Postgres, ProfileRow>(&query)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(ProfileRow::into_record).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "insert"))]
    async fn fetch_or_create(&self, owner_id: &str) -> Result<ProfileRecord, AppError> {
        if let Some(record) = self.fetch(owner_id).await? {
            return Ok(record);
        }

        if let Some(record) = self.insert_new(owner_id).await? {
            tracing::info!(owner_id = %owner_id, "Created profile on first access");
            return Ok(record);
        }

        // A concurrent request inserted the row between our fetch and insert.
        self.fetch(owner_id).await?.ok_or_else(|| {
            AppError::Internal(format!("profile for owner {} vanished after insert", owner_id))
        })
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "profiles", db.operation = "update"))]
    async fn apply_update(
        &self,
        owner_id: &str,
        update: &ProfileUpdate,
        actor: &str,
    ) -> Result<ProfileRecord, AppError> {
        self.fetch_or_create(owner_id).await?;

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut record = Self::select_for_update(&mut tx, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile for owner {}", owner_id)))?;

        update.apply_to(&mut record);
        record.recompute_search_vector();
        record.mark_updated(actor);

        Self::persist(&mut tx, &record).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "update", avatar.key = %key))]
    async fn set_avatar(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
    ) -> Result<(ProfileRecord, Option<String>), AppError> {
        self.fetch_or_create(owner_id).await?;

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut record = Self::select_for_update(&mut tx, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile for owner {}", owner_id)))?;

        let previous_key = record.avatar_key.clone();
        record.avatar_key = Some(key.to_string());
        record.avatar_url = Some(url.to_string());
        record.mark_updated(owner_id);

        Self::persist(&mut tx, &record).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok((record, previous_key))
    }

    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "select"))]
    async fn current_avatar_key(&self, owner_id: &str) -> Result<Option<String>, AppError> {
        let key: Option<Option<String>> =
            sqlx::query_scalar("SELECT avatar_key FROM profiles WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(key.flatten())
    }

    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "update", avatar.key = %key))]
    async fn clear_avatar(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let record = Self::select_for_update(&mut tx, owner_id).await?;
        let mut record = match record {
            Some(record) if record.avatar_key.as_deref() == Some(key) => record,
            _ => {
                tx.rollback().await.ok();
                return Ok(None);
            }
        };

        record.avatar_key = None;
        record.avatar_url = None;
        record.mark_updated(owner_id);

        Self::persist(&mut tx, &record).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(Some(record))
    }

    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "update", document.key = %key))]
    async fn clear_document_reference(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let record = Self::select_for_update(&mut tx, owner_id).await?;
        let mut record = match record {
            Some(record) => record,
            None => {
                tx.rollback().await.ok();
                return Ok(None);
            }
        };

        let now = Utc::now();
        let mut matched = false;
        for cert in &mut record.certifications {
            if cert.document_key.as_deref() == Some(key) {
                cert.document_key = None;
                cert.updated_at = now;
                matched = true;
            }
        }

        if !matched {
            tx.rollback().await.ok();
            return Ok(None);
        }

        record.mark_updated(owner_id);

        Self::persist(&mut tx, &record).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(Some(record))
    }
}
