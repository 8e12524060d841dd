use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::profile::{
    CertificationEntry, EducationEntry, LearningLanguage, ProficiencyLevel, ProfileRecord,
};

/// Handles are lowercase alphanumerics plus underscore.
fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    let valid = handle
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("handle_charset")
            .with_message("Handle may only contain lowercase letters, digits and underscores".into()))
    }
}

/// Request DTO for personal scalar fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfoUpdate {
    #[serde(default)]
    #[validate(length(max = 100, message = "Display name must be at most 100 characters"))]
    pub display_name: Option<String>,
    #[serde(default)]
    #[validate(
        length(
            min = 3,
            max = 32,
            message = "Handle must be between 3 and 32 characters"
        ),
        custom(function = validate_handle)
    )]
    pub handle: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(length(max = 120, message = "Location must be at most 120 characters"))]
    pub location: Option<String>,
}

/// Request DTO for one learning-language entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LearningLanguageInput {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Language must be between 1 and 64 characters"
    ))]
    pub language: String,
    pub level: ProficiencyLevel,
}

/// Request DTO for one education entry. Entries carrying the id of an
/// existing entry keep that entry's identity and creation time through a
/// list replacement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntryInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(
        min = 1,
        max = 200,
        message = "Institution must be between 1 and 200 characters"
    ))]
    pub institution: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Degree must be at most 200 characters"))]
    pub degree: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Field of study must be at most 200 characters"))]
    pub field_of_study: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1900, max = 2100, message = "Start year out of range"))]
    pub start_year: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 1900, max = 2100, message = "End year out of range"))]
    pub end_year: Option<i32>,
}

/// Request DTO for one certification entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CertificationEntryInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(
        min = 1,
        max = 200,
        message = "Certification name must be between 1 and 200 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Issuer must be at most 200 characters"))]
    pub issuer: Option<String>,
    #[serde(default)]
    pub issued_at: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 1024, message = "Document key must be at most 1024 characters"))]
    pub document_key: Option<String>,
}

/// Request DTO for professional fields. List fields replace the stored list
/// wholesale when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalInfoUpdate {
    #[serde(default)]
    #[validate(length(max = 64, message = "Native language must be at most 64 characters"))]
    pub native_language: Option<String>,
    #[serde(default)]
    pub proficiency_level: Option<ProficiencyLevel>,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 learning languages"), nested)]
    pub learning_languages: Option<Vec<LearningLanguageInput>>,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 education entries"), nested)]
    pub education: Option<Vec<EducationEntryInput>>,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 certification entries"), nested)]
    pub certifications: Option<Vec<CertificationEntryInput>>,
}

/// Request DTO for interface preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(default)]
    #[validate(length(max = 64, message = "Interface language must be at most 64 characters"))]
    pub interface_language: Option<String>,
    #[serde(default)]
    #[validate(length(max = 64, message = "Timezone must be at most 64 characters"))]
    pub timezone: Option<String>,
}

/// Request DTO for privacy flags
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyUpdate {
    #[serde(default)]
    pub discoverable: Option<bool>,
    #[serde(default)]
    pub show_location: Option<bool>,
    #[serde(default)]
    pub show_activity: Option<bool>,
}

/// Partial profile update, grouped by domain area so the merge is exhaustive
/// over a fixed field set rather than keyed off runtime payload inspection.
///
/// Merge semantics: a field that is present overwrites the stored value
/// (present-but-empty text clears it); an absent field leaves the stored
/// value untouched. List fields are replaced as a whole, never merged
/// per entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    #[validate(nested)]
    pub personal: Option<PersonalInfoUpdate>,
    #[serde(default)]
    #[validate(nested)]
    pub professional: Option<ProfessionalInfoUpdate>,
    #[serde(default)]
    #[validate(nested)]
    pub preferences: Option<PreferencesUpdate>,
    #[serde(default)]
    pub privacy: Option<PrivacyUpdate>,
}

/// Normalize a submitted text field: trimmed value, empty clears the field.
fn merge_text(target: &mut Option<String>, submitted: &Option<String>) {
    if let Some(value) = submitted {
        let trimmed = value.trim();
        *target = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.personal.is_none()
            && self.professional.is_none()
            && self.preferences.is_none()
            && self.privacy.is_none()
    }

    /// Merge this update into `record`. Fields absent from the payload are
    /// left untouched; list fields present in the payload replace the stored
    /// list wholesale, preserving identity and creation time for entries
    /// resubmitted with their existing id.
    ///
    /// Derived and audit fields are not touched here; the store recomputes
    /// them after the merge.
    pub fn apply_to(&self, record: &mut ProfileRecord) {
        if let Some(personal) = &self.personal {
            merge_text(&mut record.display_name, &personal.display_name);
            merge_text(&mut record.handle, &personal.handle);
            merge_text(&mut record.bio, &personal.bio);
            merge_text(&mut record.location, &personal.location);
        }

        if let Some(professional) = &self.professional {
            merge_text(&mut record.native_language, &professional.native_language);
            if let Some(level) = professional.proficiency_level {
                record.proficiency_level = Some(level);
            }
            if let Some(languages) = &professional.learning_languages {
                record.learning_languages = languages
                    .iter()
                    .map(|l| LearningLanguage {
                        language: l.language.trim().to_string(),
                        level: l.level,
                    })
                    .collect();
            }
            if let Some(education) = &professional.education {
                record.education = replace_education(&record.education, education);
            }
            if let Some(certifications) = &professional.certifications {
                record.certifications =
                    replace_certifications(&record.certifications, certifications);
            }
        }

        if let Some(preferences) = &self.preferences {
            merge_text(
                &mut record.interface_language,
                &preferences.interface_language,
            );
            merge_text(&mut record.timezone, &preferences.timezone);
        }

        if let Some(privacy) = &self.privacy {
            if let Some(discoverable) = privacy.discoverable {
                record.discoverable = discoverable;
            }
            if let Some(show_location) = privacy.show_location {
                record.show_location = show_location;
            }
            if let Some(show_activity) = privacy.show_activity {
                record.show_activity = show_activity;
            }
        }
    }
}

fn replace_education(existing: &[EducationEntry], submitted: &[EducationEntryInput]) -> Vec<EducationEntry> {
    let now = Utc::now();
    submitted
        .iter()
        .map(|input| {
            let prior = input
                .id
                .and_then(|id| existing.iter().find(|e| e.id == id));
            EducationEntry {
                id: prior.map(|e| e.id).unwrap_or_else(Uuid::new_v4),
                institution: input.institution.trim().to_string(),
                degree: input.degree.as_ref().map(|s| s.trim().to_string()),
                field_of_study: input.field_of_study.as_ref().map(|s| s.trim().to_string()),
                start_year: input.start_year,
                end_year: input.end_year,
                created_at: prior.map(|e| e.created_at).unwrap_or(now),
                updated_at: now,
            }
        })
        .collect()
}

fn replace_certifications(
    existing: &[CertificationEntry],
    submitted: &[CertificationEntryInput],
) -> Vec<CertificationEntry> {
    let now = Utc::now();
    submitted
        .iter()
        .map(|input| {
            let prior = input
                .id
                .and_then(|id| existing.iter().find(|e| e.id == id));
            CertificationEntry {
                id: prior.map(|e| e.id).unwrap_or_else(Uuid::new_v4),
                name: input.name.trim().to_string(),
                issuer: input.issuer.as_ref().map(|s| s.trim().to_string()),
                issued_at: input.issued_at,
                // A resubmitted entry without a document key keeps the stored
                // reference; dropping it goes through the file-delete endpoint.
                document_key: input
                    .document_key
                    .clone()
                    .or_else(|| prior.and_then(|e| e.document_key.clone())),
                created_at: prior.map(|e| e.created_at).unwrap_or(now),
                updated_at: now,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn personal(display_name: Option<&str>, bio: Option<&str>) -> ProfileUpdate {
        ProfileUpdate {
            personal: Some(PersonalInfoUpdate {
                display_name: display_name.map(String::from),
                bio: bio.map(String::from),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_fields_are_untouched() {
        let mut record = ProfileRecord::new("user-1");
        record.display_name = Some("Ana".to_string());
        record.bio = Some("Learning German".to_string());

        personal(None, Some("New bio")).apply_to(&mut record);

        assert_eq!(record.display_name.as_deref(), Some("Ana"));
        assert_eq!(record.bio.as_deref(), Some("New bio"));
    }

    #[test]
    fn test_disjoint_updates_both_persist() {
        let mut record = ProfileRecord::new("user-1");

        let set_bio = personal(None, Some("polyglot in training"));
        let set_location = ProfileUpdate {
            personal: Some(PersonalInfoUpdate {
                location: Some("Berlin".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        set_bio.apply_to(&mut record);
        set_location.apply_to(&mut record);

        assert_eq!(record.bio.as_deref(), Some("polyglot in training"));
        assert_eq!(record.location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_empty_string_clears_field() {
        let mut record = ProfileRecord::new("user-1");
        record.bio = Some("old bio".to_string());

        personal(None, Some("  ")).apply_to(&mut record);

        assert!(record.bio.is_none());
    }

    #[test]
    fn test_list_replacement_is_wholesale() {
        let mut record = ProfileRecord::new("user-1");
        let first = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                education: Some(vec![
                    EducationEntryInput {
                        id: None,
                        institution: "Universidad de Chile".to_string(),
                        degree: None,
                        field_of_study: None,
                        start_year: Some(2015),
                        end_year: Some(2019),
                    },
                    EducationEntryInput {
                        id: None,
                        institution: "Goethe-Institut".to_string(),
                        degree: None,
                        field_of_study: None,
                        start_year: None,
                        end_year: None,
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        first.apply_to(&mut record);
        assert_eq!(record.education.len(), 2);

        let second = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                education: Some(vec![EducationEntryInput {
                    id: None,
                    institution: "Alliance Française".to_string(),
                    degree: None,
                    field_of_study: None,
                    start_year: None,
                    end_year: None,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        second.apply_to(&mut record);

        assert_eq!(record.education.len(), 1);
        assert_eq!(record.education[0].institution, "Alliance Française");
    }

    #[test]
    fn test_resubmitted_entry_keeps_identity() {
        let mut record = ProfileRecord::new("user-1");
        let first = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                education: Some(vec![EducationEntryInput {
                    id: None,
                    institution: "Universidad de Chile".to_string(),
                    degree: None,
                    field_of_study: None,
                    start_year: None,
                    end_year: None,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        first.apply_to(&mut record);
        let original = record.education[0].clone();

        let second = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                education: Some(vec![EducationEntryInput {
                    id: Some(original.id),
                    institution: "Universidad de Chile".to_string(),
                    degree: Some("Magíster".to_string()),
                    field_of_study: None,
                    start_year: None,
                    end_year: None,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        second.apply_to(&mut record);

        assert_eq!(record.education[0].id, original.id);
        assert_eq!(record.education[0].created_at, original.created_at);
        assert_eq!(record.education[0].degree.as_deref(), Some("Magíster"));
    }

    #[test]
    fn test_resubmitted_certification_keeps_document_reference() {
        let mut record = ProfileRecord::new("user-1");
        let first = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                certifications: Some(vec![CertificationEntryInput {
                    id: None,
                    name: "DELE C1".to_string(),
                    issuer: None,
                    issued_at: None,
                    document_key: Some("documents/abc/cert.pdf".to_string()),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        first.apply_to(&mut record);
        let id = record.certifications[0].id;

        let second = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                certifications: Some(vec![CertificationEntryInput {
                    id: Some(id),
                    name: "DELE C1".to_string(),
                    issuer: Some("Instituto Cervantes".to_string()),
                    issued_at: None,
                    document_key: None,
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        second.apply_to(&mut record);

        assert_eq!(
            record.certifications[0].document_key.as_deref(),
            Some("documents/abc/cert.pdf")
        );
    }

    #[test]
    fn test_privacy_flags_merge_individually() {
        let mut record = ProfileRecord::new("user-1");
        assert!(record.discoverable);

        let update = ProfileUpdate {
            privacy: Some(PrivacyUpdate {
                discoverable: Some(false),
                show_location: None,
                show_activity: None,
            }),
            ..Default::default()
        };
        update.apply_to(&mut record);

        assert!(!record.discoverable);
        assert!(record.show_location);
        assert!(record.show_activity);
    }

    #[test]
    fn test_handle_charset_is_validated() {
        let update = ProfileUpdate {
            personal: Some(PersonalInfoUpdate {
                handle: Some("Ana!Maria".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ProfileUpdate {
            personal: Some(PersonalInfoUpdate {
                handle: Some("ana_maria92".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_list_cap_is_enforced() {
        let over_cap: Vec<LearningLanguageInput> = (0..21)
            .map(|i| LearningLanguageInput {
                language: format!("lang-{}", i),
                level: ProficiencyLevel::Beginner,
            })
            .collect();
        let update = ProfileUpdate {
            professional: Some(ProfessionalInfoUpdate {
                learning_languages: Some(over_cap),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_empty_update_is_detected() {
        assert!(ProfileUpdate::default().is_empty());
        assert!(!personal(Some("Ana"), None).is_empty());
    }
}
