//! Entity types and partition key policy
//!
//! Every entity type lives in its own container, and every container is bound
//! to exactly one partition key path for its whole lifetime. The mapping is a
//! static table: partition key choice decides how the store routes point reads
//! and queries, so it must never be inferred at runtime.

use crate::document::Document;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named domain kind stored in its own container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Job,
    Application,
    Event,
    RentalItem,
    FoodItem,
    Restaurant,
    User,
    Product,
    HousingProperty,
}

impl EntityType {
    /// All entity types, in startup provisioning order
    pub const ALL: [EntityType; 9] = [
        EntityType::User,
        EntityType::Product,
        EntityType::Event,
        EntityType::HousingProperty,
        EntityType::Job,
        EntityType::Application,
        EntityType::RentalItem,
        EntityType::Restaurant,
        EntityType::FoodItem,
    ];

    /// Name of the container holding documents of this type
    pub fn container_name(&self) -> &'static str {
        match self {
            EntityType::Job => "Jobs",
            EntityType::Application => "Applications",
            EntityType::Event => "Events",
            EntityType::RentalItem => "RentalItems",
            EntityType::FoodItem => "FoodItems",
            EntityType::Restaurant => "Restaurants",
            EntityType::User => "Users",
            EntityType::Product => "Products",
            EntityType::HousingProperty => "HousingProperty",
        }
    }

    /// Human readable singular name, used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityType::Job => "Job",
            EntityType::Application => "Application",
            EntityType::Event => "Event",
            EntityType::RentalItem => "Rental item",
            EntityType::FoodItem => "Food item",
            EntityType::Restaurant => "Restaurant",
            EntityType::User => "User",
            EntityType::Product => "Product",
            EntityType::HousingProperty => "Housing property",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container_name())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    /// Accepts either the container name (`Jobs`) or the type name in any
    /// case (`job`, `RentalItem`, `rental_item`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        EntityType::ALL
            .iter()
            .copied()
            .find(|entity| {
                let type_name = format!("{:?}", entity).to_ascii_lowercase();
                normalized == type_name
                    || normalized == entity.container_name().to_ascii_lowercase()
            })
            .ok_or_else(|| CoreError::UnknownEntityType(s.to_string()))
    }
}

/// A partition key path rooted at the document, e.g. `/location`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionKeyPath(String);

impl PartitionKeyPath {
    /// Parse a single-segment path
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidPartitionKeyPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let field = path
            .strip_prefix('/')
            .ok_or_else(|| invalid("path must start with '/'"))?;
        if field.is_empty() {
            return Err(invalid("path must name a field"));
        }
        if field.contains('/') {
            return Err(invalid("nested paths are not supported"));
        }
        if !crate::query::is_valid_field_name(field) {
            return Err(invalid("field name must be an identifier"));
        }

        Ok(Self(path.to_string()))
    }

    /// The document field this path points at (`location` for `/location`)
    pub fn field(&self) -> &str {
        &self.0[1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this container is partitioned by its own document id
    pub fn is_id(&self) -> bool {
        self.field() == "id"
    }
}

impl Default for PartitionKeyPath {
    fn default() -> Self {
        Self("/id".to_string())
    }
}

impl fmt::Display for PartitionKeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PartitionKeyPath {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PartitionKeyPath> for String {
    fn from(path: PartitionKeyPath) -> Self {
        path.0
    }
}

/// Static mapping from entity type to partition key path
pub struct PartitionKeyPolicy;

impl PartitionKeyPolicy {
    /// Partition key path for an entity type
    pub fn resolve(entity: EntityType) -> PartitionKeyPath {
        let path = match entity {
            EntityType::Job => "/location",
            EntityType::Application => "/applicantEmail",
            EntityType::RentalItem => "/category",
            EntityType::User | EntityType::HousingProperty => "/email",
            EntityType::Event | EntityType::FoodItem | EntityType::Restaurant | EntityType::Product => {
                return PartitionKeyPath::default();
            }
        };
        PartitionKeyPath(path.to_string())
    }

    /// Partition key path for an entity type given by name
    pub fn resolve_name(name: &str) -> Result<PartitionKeyPath> {
        let entity = name.parse::<EntityType>()?;
        Ok(Self::resolve(entity))
    }

    /// Partition key value of a document of the given type
    pub fn value_of(entity: EntityType, document: &Document) -> Option<String> {
        document.partition_key_value(&Self::resolve(entity))
    }
}
