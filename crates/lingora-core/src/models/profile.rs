use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Language proficiency level (CEFR-aligned bands plus native)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "proficiency_level", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Beginner,
    Elementary,
    Intermediate,
    UpperIntermediate,
    Advanced,
    Native,
}

/// A language the user is learning, with their self-assessed level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearningLanguage {
    pub language: String,
    pub level: ProficiencyLevel,
}

/// One education history entry. Stored inside the profile record's
/// `education` JSONB column; entries keep their own identity and timestamps
/// across wholesale list replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub id: Uuid,
    pub institution: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One certification entry. `document_key` optionally references an uploaded
/// credential blob in object storage; clearing that reference happens through
/// the file-deletion endpoint, never by the blob store itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificationEntry {
    pub id: Uuid,
    pub name: String,
    pub issuer: Option<String>,
    pub issued_at: Option<NaiveDate>,
    pub document_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of file reference a profile record can hold. Named in the
/// file-deletion route to select which reference gets cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Avatar,
    Document,
}

/// The authoritative profile document, one per owner.
///
/// `search_vector`, `last_updated_by` and `last_activity_at` are derived or
/// audit fields: they are recomputed on every write and never set directly by
/// a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub native_language: Option<String>,
    pub interface_language: Option<String>,
    pub timezone: Option<String>,
    pub learning_languages: Vec<LearningLanguage>,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub avatar_key: Option<String>,
    pub avatar_url: Option<String>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub discoverable: bool,
    pub show_location: bool,
    pub show_activity: bool,
    pub search_vector: String,
    pub last_updated_by: Option<String>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Empty profile for an owner seen for the first time. Profiles are
    /// created lazily on first read or first update.
    pub fn new(owner_id: &str) -> Self {
        let now = Utc::now();
        ProfileRecord {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            handle: None,
            display_name: None,
            bio: None,
            location: None,
            native_language: None,
            interface_language: None,
            timezone: None,
            learning_languages: Vec::new(),
            proficiency_level: None,
            avatar_key: None,
            avatar_url: None,
            education: Vec::new(),
            certifications: Vec::new(),
            discoverable: true,
            show_location: true,
            show_activity: true,
            search_vector: String::new(),
            last_updated_by: None,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild the derived search text from the current field values.
    /// Lowercased, whitespace-joined; callers must invoke this after any
    /// mutation of searchable fields.
    pub fn recompute_search_vector(&mut self) {
        let mut parts: Vec<String> = Vec::new();

        let scalars = [
            self.display_name.as_deref(),
            self.handle.as_deref(),
            self.bio.as_deref(),
            self.location.as_deref(),
            self.native_language.as_deref(),
        ];
        parts.extend(scalars.iter().flatten().map(|s| s.to_lowercase()));

        parts.extend(
            self.learning_languages
                .iter()
                .map(|l| l.language.to_lowercase()),
        );
        for entry in &self.education {
            parts.push(entry.institution.to_lowercase());
            if let Some(degree) = &entry.degree {
                parts.push(degree.to_lowercase());
            }
            if let Some(field) = &entry.field_of_study {
                parts.push(field.to_lowercase());
            }
        }
        for cert in &self.certifications {
            parts.push(cert.name.to_lowercase());
            if let Some(issuer) = &cert.issuer {
                parts.push(issuer.to_lowercase());
            }
        }

        self.search_vector = parts
            .iter()
            .flat_map(|p| p.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
    }

    /// Stamp the audit fields for a write performed by `actor`.
    pub fn mark_updated(&mut self, actor: &str) {
        let now = Utc::now();
        self.last_updated_by = Some(actor.to_string());
        self.last_activity_at = now;
        self.updated_at = now;
    }
}

/// Privacy flags as exposed on the profile view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub discoverable: bool,
    pub show_location: bool,
    pub show_activity: bool,
}

/// Serialized profile snapshot returned to API callers and stored in the
/// cache. Derived/audit internals (search vector, storage key, updating
/// actor) stay out of the view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub owner_id: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub native_language: Option<String>,
    pub interface_language: Option<String>,
    pub timezone: Option<String>,
    pub learning_languages: Vec<LearningLanguage>,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub avatar_url: Option<String>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub privacy: PrivacySettings,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ProfileRecord> for ProfileView {
    fn from(record: &ProfileRecord) -> Self {
        ProfileView {
            owner_id: record.owner_id.clone(),
            handle: record.handle.clone(),
            display_name: record.display_name.clone(),
            bio: record.bio.clone(),
            location: record.location.clone(),
            native_language: record.native_language.clone(),
            interface_language: record.interface_language.clone(),
            timezone: record.timezone.clone(),
            learning_languages: record.learning_languages.clone(),
            proficiency_level: record.proficiency_level,
            avatar_url: record.avatar_url.clone(),
            education: record.education.clone(),
            certifications: record.certifications.clone(),
            privacy: PrivacySettings {
                discoverable: record.discoverable,
                show_location: record.show_location,
                show_activity: record.show_activity,
            },
            last_activity_at: record.last_activity_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<ProfileRecord> for ProfileView {
    fn from(record: ProfileRecord) -> Self {
        ProfileView::from(&record)
    }
}
