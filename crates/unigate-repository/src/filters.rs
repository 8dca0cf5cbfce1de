//! List filters
//!
//! Each filter is the typed form of a list endpoint's query string. Blank
//! values are treated as absent, so neither `?search=` nor `?minPrice=`
//! filters anything.

use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use unigate_core::{EntityType, Pagination, Predicate};

use crate::RepositoryResult;

/// A set of optional criteria that maps onto query predicates
pub trait EntityFilter {
    /// Entity type the filter applies to
    fn entity(&self) -> EntityType;

    /// Predicates in a fixed order
    fn predicates(&self) -> Vec<Predicate>;

    /// Page to return, `None` for every match
    fn pagination(&self) -> RepositoryResult<Option<Pagination>> {
        Ok(None)
    }
}

/// Numbers arrive as text in a query string and natively in JSON
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Native(T),
        Text(String),
    }

    match Option::<Raw<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Native(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid number '{}': {}", text, e))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Missing page or limit fall back to page 1, limit 10; zero is rejected
fn page_or_default(page: Option<u32>, limit: Option<u32>) -> RepositoryResult<Pagination> {
    Ok(Pagination::new(
        page.unwrap_or(1),
        limit.unwrap_or(Pagination::DEFAULT_LIMIT),
    )?)
}

/// `GET /api/jobs`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<u32>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub company_name: Option<String>,
    /// Substring of the title
    pub search: Option<String>,
}

impl EntityFilter for JobFilter {
    fn entity(&self) -> EntityType {
        EntityType::Job
    }

    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(location) = non_empty(&self.location) {
            predicates.push(Predicate::contains("location", location));
        }
        if let Some(job_type) = non_empty(&self.job_type) {
            predicates.push(Predicate::exact("jobType", job_type));
        }
        if let Some(company) = non_empty(&self.company_name) {
            predicates.push(Predicate::exact("companyName", company));
        }
        if let Some(search) = non_empty(&self.search) {
            predicates.push(Predicate::contains("title", search));
        }
        predicates
    }

    fn pagination(&self) -> RepositoryResult<Option<Pagination>> {
        page_or_default(self.page, self.limit).map(Some)
    }
}

/// `GET /api/applications`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<u32>,
    pub applicant_email: Option<String>,
    pub job_id: Option<String>,
}

impl EntityFilter for ApplicationFilter {
    fn entity(&self) -> EntityType {
        EntityType::Application
    }

    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(email) = non_empty(&self.applicant_email) {
            predicates.push(Predicate::exact("applicantEmail", email));
        }
        if let Some(job_id) = non_empty(&self.job_id) {
            predicates.push(Predicate::exact("jobId", job_id));
        }
        predicates
    }

    fn pagination(&self) -> RepositoryResult<Option<Pagination>> {
        page_or_default(self.page, self.limit).map(Some)
    }
}

/// `GET /api/rentals/filter/:category`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalFilter {
    /// Taken from the path, never from the query string
    #[serde(skip)]
    pub category: String,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<f64>,
    /// Minimum rating
    #[serde(default, deserialize_with = "blank_as_none")]
    pub ratings: Option<f64>,
    pub rental_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<u32>,
}

impl RentalFilter {
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

impl EntityFilter for RentalFilter {
    fn entity(&self) -> EntityType {
        EntityType::RentalItem
    }

    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::exact("category", self.category.as_str())];
        if let Some(search) = non_empty(&self.search) {
            predicates.push(Predicate::contains("name", search));
        }
        if let Some(min) = self.min_price {
            predicates.push(Predicate::min("price", min));
        }
        if let Some(max) = self.max_price {
            predicates.push(Predicate::max("price", max));
        }
        if let Some(ratings) = self.ratings {
            predicates.push(Predicate::min("ratings", ratings));
        }
        if let Some(rental_type) = non_empty(&self.rental_type) {
            predicates.push(Predicate::exact("rentalType", rental_type));
        }
        predicates
    }

    fn pagination(&self) -> RepositoryResult<Option<Pagination>> {
        match self.limit {
            Some(limit) => Ok(Some(Pagination::first(limit)?)),
            None => Ok(None),
        }
    }
}

/// Food items of one restaurant
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemFilter {
    pub restaurant_id: String,
}

impl EntityFilter for FoodItemFilter {
    fn entity(&self) -> EntityType {
        EntityType::FoodItem
    }

    fn predicates(&self) -> Vec<Predicate> {
        vec![Predicate::exact("restaurantId", self.restaurant_id.as_str())]
    }
}

/// Every document of a type, unpaginated
#[derive(Debug, Clone, Copy)]
pub struct AllOf(pub EntityType);

impl EntityFilter for AllOf {
    fn entity(&self) -> EntityType {
        self.0
    }

    fn predicates(&self) -> Vec<Predicate> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RepositoryError;

    #[test]
    fn test_job_filter_mapping() {
        let filter = JobFilter {
            location: Some("Ber".to_string()),
            job_type: Some("full-time".to_string()),
            company_name: Some("".to_string()),
            search: Some("engineer".to_string()),
            ..Default::default()
        };

        assert_eq!(
            filter.predicates(),
            vec![
                Predicate::contains("location", "Ber"),
                Predicate::exact("jobType", "full-time"),
                Predicate::contains("title", "engineer"),
            ]
        );
        let page = filter.pagination().unwrap().unwrap();
        assert_eq!((page.page(), page.limit()), (1, 10));
    }

    #[test]
    fn test_zero_page_is_rejected() {
        let filter = JobFilter {
            page: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            filter.pagination(),
            Err(RepositoryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_rental_filter_mapping() {
        let filter = RentalFilter {
            search: Some("Drill".to_string()),
            min_price: Some(0.0),
            max_price: Some(25.0),
            ratings: Some(4.0),
            limit: Some(5),
            ..Default::default()
        }
        .in_category("tools");

        assert_eq!(
            filter.predicates(),
            vec![
                Predicate::exact("category", "tools"),
                Predicate::contains("name", "Drill"),
                Predicate::min("price", 0.0),
                Predicate::max("price", 25.0),
                Predicate::min("ratings", 4.0),
            ]
        );
        let page = filter.pagination().unwrap().unwrap();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 5);
    }

    #[test]
    fn test_rental_filter_without_limit_is_unpaginated() {
        let filter = RentalFilter::default().in_category("bikes");
        assert!(filter.pagination().unwrap().is_none());
    }

    #[test]
    fn test_filter_from_query_string() {
        let filter: ApplicationFilter =
            serde_json::from_str(r#"{"applicantEmail": "ann@example.com", "page": 2}"#).unwrap();
        assert_eq!(
            filter.predicates(),
            vec![Predicate::exact("applicantEmail", "ann@example.com")]
        );
        assert_eq!(filter.pagination().unwrap().unwrap().offset(), 10);
    }

    #[test]
    fn test_blank_numbers_are_absent() {
        let filter: JobFilter = serde_json::from_str(r#"{"page": "", "limit": " "}"#).unwrap();
        let page = filter.pagination().unwrap().unwrap();
        assert_eq!((page.page(), page.limit()), (1, 10));

        let rentals: RentalFilter =
            serde_json::from_str(r#"{"search": "", "minPrice": "", "maxPrice": "", "ratings": ""}"#)
                .unwrap();
        assert_eq!(
            rentals.in_category("tools").predicates(),
            vec![Predicate::exact("category", "tools")]
        );
    }

    #[test]
    fn test_numbers_as_text() {
        let filter: RentalFilter =
            serde_json::from_str(r#"{"maxPrice": "19.5", "limit": "3"}"#).unwrap();
        assert_eq!(filter.max_price, Some(19.5));
        assert_eq!(filter.limit, Some(3));

        assert!(serde_json::from_str::<JobFilter>(r#"{"page": "abc"}"#).is_err());
    }
}
