//! Per-entity write rules
//!
//! An [`EntitySchema`] says which fields a new document must carry, which
//! fields the gateway writes itself on create, how the document id is chosen
//! and which field (if any) records the last update.

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use unigate_core::{Document, EntityType};

use crate::{RepositoryError, RepositoryResult};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// How a new document gets its `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Keep the caller's id, otherwise the store assigns a UUID
    Store,
    /// Keep the caller's id, otherwise `<unix-millis>-<9 base36 chars>`
    Timestamped,
    /// Always `<email>-<unix-millis>`
    EmailTimestamped,
}

/// Value of a server-managed field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Managed {
    /// Current time as an RFC 3339 string with millisecond precision
    Now,
    Text(&'static str),
    Int(i64),
}

impl Managed {
    fn value(&self) -> Value {
        match self {
            Managed::Now => Value::String(now_iso()),
            Managed::Text(s) => Value::String((*s).to_string()),
            Managed::Int(i) => Value::from(*i),
        }
    }
}

/// Write rules for one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    pub entity: EntityType,
    pub required: &'static [&'static str],
    /// Fields overwritten on create whatever the caller sent
    pub managed: &'static [(&'static str, Managed)],
    /// Required fields that must also look like an email address
    pub email_fields: &'static [&'static str],
    pub id_strategy: IdStrategy,
    /// Refreshed on every update
    pub updated_at: Option<&'static str>,
}

impl EntitySchema {
    pub fn for_entity(entity: EntityType) -> Self {
        let base = EntitySchema {
            entity,
            required: &[],
            managed: &[],
            email_fields: &[],
            id_strategy: IdStrategy::Store,
            updated_at: None,
        };

        match entity {
            EntityType::Job => EntitySchema {
                required: &[
                    "title",
                    "description",
                    "companyName",
                    "location",
                    "jobType",
                    "contactEmail",
                ],
                managed: &[
                    ("status", Managed::Text("active")),
                    ("postedDate", Managed::Now),
                    ("views", Managed::Int(0)),
                ],
                ..base
            },
            EntityType::Application => EntitySchema {
                required: &["jobId", "applicantName", "applicantEmail", "applicantPhone"],
                managed: &[
                    ("applicationDate", Managed::Now),
                    ("status", Managed::Text("submitted")),
                ],
                email_fields: &["applicantEmail"],
                ..base
            },
            EntityType::Event => EntitySchema {
                required: &["title", "date"],
                id_strategy: IdStrategy::Timestamped,
                ..base
            },
            EntityType::RentalItem => EntitySchema {
                required: &["name", "category", "price"],
                managed: &[("createdAt", Managed::Now), ("updatedAt", Managed::Now)],
                updated_at: Some("updatedAt"),
                ..base
            },
            EntityType::FoodItem => EntitySchema {
                required: &["restaurantId", "name"],
                ..base
            },
            EntityType::Restaurant | EntityType::Product => EntitySchema {
                required: &["name"],
                ..base
            },
            EntityType::User => EntitySchema {
                required: &["email"],
                ..base
            },
            EntityType::HousingProperty => EntitySchema {
                required: &["email"],
                id_strategy: IdStrategy::EmailTimestamped,
                ..base
            },
        }
    }

    /// Check the id, required fields and email formats.
    ///
    /// Every missing field is named in one error. A caller-supplied id must
    /// be a non-blank string.
    pub fn validate(&self, document: &Document) -> RepositoryResult<()> {
        match document.get("id") {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) if !id.trim().is_empty() => {}
            Some(_) => {
                return Err(RepositoryError::validation(
                    "id must be a non-empty string",
                ))
            }
        }

        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|field| !document.has_value(field))
            .collect();

        if !missing.is_empty() {
            return Err(RepositoryError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        for field in self.email_fields {
            let valid = document.get_str(field).map(is_valid_email).unwrap_or(false);
            if !valid {
                return Err(RepositoryError::validation(format!(
                    "Invalid {} format",
                    field
                )));
            }
        }

        Ok(())
    }

    /// Validate, then stamp managed fields and the id
    pub fn prepare_create(&self, mut document: Document) -> RepositoryResult<Document> {
        document.strip_system_fields();
        self.validate(&document)?;

        for (field, managed) in self.managed {
            document.insert(*field, managed.value());
        }

        if let Some(id) = self.generated_id(&document) {
            document.set_id(id);
        }

        Ok(document)
    }

    /// Id this schema assigns to a new document, `None` when the caller's id
    /// stands or the store picks one
    pub fn generated_id(&self, document: &Document) -> Option<String> {
        match self.id_strategy {
            IdStrategy::Store => None,
            IdStrategy::Timestamped => document.id().is_none().then(timestamped_id),
            IdStrategy::EmailTimestamped => Some(format!(
                "{}-{}",
                document.get_str("email").unwrap_or_default(),
                Utc::now().timestamp_millis()
            )),
        }
    }

    /// Refresh the update timestamp, if this entity keeps one
    pub fn touch(&self, document: &mut Document) {
        if let Some(field) = self.updated_at {
            document.insert(field, now_iso());
        }
    }
}

/// `<unix-millis>-<9 random base36 chars>`
pub fn timestamped_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Loose `something@something.tld` check
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"))
        .is_match(email)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn test_validate_names_every_missing_field() {
        let schema = EntitySchema::for_entity(EntityType::Job);
        let err = schema
            .validate(&doc(json!({"title": "Barista", "description": "", "location": null})))
            .unwrap_err();

        let message = err.to_string();
        for field in ["description", "companyName", "location", "jobType", "contactEmail"] {
            assert!(message.contains(field), "{} not in {}", field, message);
        }
        assert!(!message.contains("title"));
    }

    #[test]
    fn test_zero_counts_as_present() {
        let schema = EntitySchema::for_entity(EntityType::RentalItem);
        assert!(schema
            .validate(&doc(json!({"name": "Tent", "category": "camping", "price": 0})))
            .is_ok());
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("ann@example.com"));
        assert!(!is_valid_email("ann@example"));
        assert!(!is_valid_email("not an email"));

        let schema = EntitySchema::for_entity(EntityType::Application);
        let err = schema
            .validate(&doc(json!({
                "jobId": "j1",
                "applicantName": "Ann",
                "applicantEmail": "ann",
                "applicantPhone": "555"
            })))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid applicantEmail format");
    }

    #[test]
    fn test_job_managed_fields_overwrite_input() {
        let schema = EntitySchema::for_entity(EntityType::Job);
        let job = schema
            .prepare_create(doc(json!({
                "title": "Barista",
                "description": "Coffee",
                "companyName": "Beans",
                "location": "Berlin",
                "jobType": "part-time",
                "contactEmail": "hr@beans.example",
                "status": "closed",
                "views": 99,
                "_etag": "forged"
            })))
            .unwrap();

        assert_eq!(job.get_str("status"), Some("active"));
        assert_eq!(job.get("views"), Some(&json!(0)));
        assert!(job.has_value("postedDate"));
        assert!(job.etag().is_none());
        assert!(job.id().is_none());
    }

    #[test]
    fn test_timestamped_id_shape() {
        let id = timestamped_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_event_keeps_caller_id() {
        let schema = EntitySchema::for_entity(EntityType::Event);
        let event = schema
            .prepare_create(doc(json!({"id": "launch", "title": "Launch", "date": "2026-01-01"})))
            .unwrap();
        assert_eq!(event.id(), Some("launch"));
    }

    #[test]
    fn test_housing_property_id() {
        let schema = EntitySchema::for_entity(EntityType::HousingProperty);
        let property = schema
            .prepare_create(doc(json!({"email": "ann@example.com", "rooms": 2})))
            .unwrap();
        assert!(property.id().unwrap().starts_with("ann@example.com-"));
    }

    #[test]
    fn test_touch_only_with_updated_at() {
        let mut item = doc(json!({"name": "Tent"}));
        EntitySchema::for_entity(EntityType::RentalItem).touch(&mut item);
        assert!(item.has_value("updatedAt"));

        let mut job = doc(json!({"title": "Barista"}));
        EntitySchema::for_entity(EntityType::Job).touch(&mut job);
        assert!(!job.contains("updatedAt"));
    }

    #[test]
    fn test_id_must_be_non_blank_string() {
        let schema = EntitySchema::for_entity(EntityType::Event);
        for id in [json!(42), json!("  "), json!({"v": 1})] {
            let err = schema
                .validate(&doc(json!({"id": id, "title": "Launch", "date": "2026-01-01"})))
                .unwrap_err();
            assert!(matches!(err, RepositoryError::Validation(_)));
        }

        assert!(schema
            .validate(&doc(json!({"id": null, "title": "Launch", "date": "2026-01-01"})))
            .is_ok());
    }

    #[test]
    fn test_generated_id_by_strategy() {
        let event = doc(json!({"title": "Launch"}));
        assert!(EntitySchema::for_entity(EntityType::Event)
            .generated_id(&event)
            .is_some());
        assert!(EntitySchema::for_entity(EntityType::Event)
            .generated_id(&doc(json!({"id": "launch"})))
            .is_none());
        assert!(EntitySchema::for_entity(EntityType::Job)
            .generated_id(&event)
            .is_none());
    }
}
