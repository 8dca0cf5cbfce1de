//! Parameterized query builder
//!
//! Renders document-SQL text such as
//!
//! ```text
//! SELECT * FROM c WHERE CONTAINS(LOWER(c.location), LOWER(@p0)) AND c.jobType = @p1 OFFSET @offset LIMIT @limit
//! ```
//!
//! Parameter `@pN` belongs to the N-th predicate. Pagination is always
//! rendered last so filters apply before paging.

use super::is_valid_field_name;
use super::predicate::{Pagination, Predicate, RangeBound};
use crate::entity::EntityType;
use crate::error::{CoreError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// A named parameter bound into a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: Value,
}

impl QueryParameter {
    fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What a query projects
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "field", rename_all = "snake_case")]
pub enum Selection {
    /// Whole documents
    All,
    /// Distinct values of one field, each returned as `{ field: value }`
    Distinct(String),
}

/// An immutable, fully rendered query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    entity: EntityType,
    selection: Selection,
    predicates: Vec<Predicate>,
    pagination: Option<Pagination>,
    text: String,
    parameters: Vec<QueryParameter>,
}

impl QuerySpec {
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// Rendered query text; contains parameter names, never values
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }
}

/// Composes a `QuerySpec` from optional predicates and pagination
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    entity: EntityType,
    selection: Selection,
    predicates: Vec<Predicate>,
    pagination: Option<Pagination>,
}

impl QueryBuilder {
    pub fn new(entity: EntityType) -> Self {
        Self {
            entity,
            selection: Selection::All,
            predicates: Vec::new(),
            pagination: None,
        }
    }

    /// Start a query returning the distinct values of `field`
    pub fn distinct(entity: EntityType, field: impl Into<String>) -> Self {
        Self {
            selection: Selection::Distinct(field.into()),
            ..Self::new(entity)
        }
    }

    /// Add one predicate; predicates are ANDed in insertion order
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add an optional predicate, skipping `None`
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn paginate(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }

    /// Render the query in one pass
    pub fn build(self) -> Result<QuerySpec> {
        let mut text = String::with_capacity(64);
        let mut parameters = Vec::with_capacity(self.predicates.len() + 2);

        match &self.selection {
            Selection::All => text.push_str("SELECT * FROM c"),
            Selection::Distinct(field) => {
                check_field(field)?;
                let _ = write!(text, "SELECT DISTINCT c.{} FROM c", field);
            }
        }

        for (index, predicate) in self.predicates.iter().enumerate() {
            let field = predicate.field();
            check_field(field)?;

            text.push_str(if index == 0 { " WHERE " } else { " AND " });
            let name = format!("@p{}", index);
            match predicate {
                Predicate::Exact { .. } => {
                    let _ = write!(text, "c.{} = {}", field, name);
                }
                Predicate::Contains { .. } => {
                    let _ = write!(text, "CONTAINS(LOWER(c.{}), LOWER({}))", field, name);
                }
                Predicate::Range { bound, value, .. } => {
                    if !value.is_finite() {
                        return Err(CoreError::InvalidField(format!(
                            "range bound on '{}' must be a finite number",
                            field
                        )));
                    }
                    let op = match bound {
                        RangeBound::Min => ">=",
                        RangeBound::Max => "<=",
                    };
                    let _ = write!(text, "c.{} {} {}", field, op, name);
                }
            }
            parameters.push(QueryParameter::new(name, predicate.parameter_value()));
        }

        if let Some(pagination) = self.pagination {
            text.push_str(" OFFSET @offset LIMIT @limit");
            parameters.push(QueryParameter::new("@offset", pagination.offset()));
            parameters.push(QueryParameter::new("@limit", pagination.limit()));
        }

        log::debug!("Built query for {}: {}", self.entity, text);

        Ok(QuerySpec {
            entity: self.entity,
            selection: self.selection,
            predicates: self.predicates,
            pagination: self.pagination,
            text,
            parameters,
        })
    }
}

fn check_field(field: &str) -> Result<()> {
    if is_valid_field_name(field) {
        Ok(())
    } else {
        Err(CoreError::InvalidField(field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job_query(location: Option<&str>, job_type: Option<&str>) -> QueryBuilder {
        QueryBuilder::new(EntityType::Job)
            .filter_opt(location.map(|l| Predicate::contains("location", l)))
            .filter_opt(job_type.map(|t| Predicate::exact("jobType", t)))
    }

    #[test]
    fn test_no_predicates_selects_all() {
        let spec = QueryBuilder::new(EntityType::Event).build().unwrap();
        assert_eq!(spec.text(), "SELECT * FROM c");
        assert!(spec.parameters().is_empty());
    }

    #[test]
    fn test_predicates_rendered_in_order() {
        let spec = job_query(Some("Oslo"), Some("full-time"))
            .paginate(Some(Pagination::new(2, 10).unwrap()))
            .build()
            .unwrap();

        assert_eq!(
            spec.text(),
            "SELECT * FROM c WHERE CONTAINS(LOWER(c.location), LOWER(@p0)) \
             AND c.jobType = @p1 OFFSET @offset LIMIT @limit"
        );
        let names: Vec<_> = spec.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@p0", "@p1", "@offset", "@limit"]);
        assert_eq!(spec.parameters()[0].value, json!("Oslo"));
        assert_eq!(spec.parameters()[2].value, json!(10));
        assert_eq!(spec.parameters()[3].value, json!(10));
    }

    #[test]
    fn test_skipped_predicates_do_not_leave_gaps() {
        let spec = job_query(None, Some("contract")).build().unwrap();
        assert_eq!(spec.text(), "SELECT * FROM c WHERE c.jobType = @p0");
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = job_query(Some("Oslo"), Some("full-time")).build().unwrap();
        let second = job_query(Some("Oslo"), Some("full-time")).build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_values_never_appear_in_text() {
        let hostile = "x') OR 1=1 --";
        let spec = QueryBuilder::new(EntityType::RentalItem)
            .filter(Predicate::exact("category", hostile))
            .filter(Predicate::contains("name", hostile))
            .build()
            .unwrap();

        assert!(!spec.text().contains(hostile));
        assert!(!spec.text().contains("1=1"));
        assert_eq!(spec.parameters()[0].value, json!(hostile));
        assert_eq!(spec.parameters()[1].value, json!(hostile));
    }

    #[test]
    fn test_range_bounds() {
        let spec = QueryBuilder::new(EntityType::RentalItem)
            .filter(Predicate::min("price", 10.0))
            .filter(Predicate::max("price", 99.5))
            .build()
            .unwrap();
        assert_eq!(
            spec.text(),
            "SELECT * FROM c WHERE c.price >= @p0 AND c.price <= @p1"
        );
        assert_eq!(spec.parameters()[1].value, json!(99.5));
    }

    #[test]
    fn test_pagination_comes_last() {
        let spec = QueryBuilder::new(EntityType::Job)
            .paginate(Some(Pagination::new(3, 5).unwrap()))
            .filter(Predicate::exact("jobType", "remote"))
            .build()
            .unwrap();
        assert!(spec.text().ends_with("OFFSET @offset LIMIT @limit"));
        assert_eq!(spec.parameters()[1].value, json!(10));
    }

    #[test]
    fn test_invalid_field_rejected() {
        let err = QueryBuilder::new(EntityType::Job)
            .filter(Predicate::exact("title = '' OR 1=1", "x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidField(_)));
    }

    #[test]
    fn test_non_finite_range_rejected() {
        let err = QueryBuilder::new(EntityType::RentalItem)
            .filter(Predicate::min("price", f64::NAN))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidField(_)));
    }

    #[test]
    fn test_distinct_selection() {
        let spec = QueryBuilder::distinct(EntityType::RentalItem, "category")
            .build()
            .unwrap();
        assert_eq!(spec.text(), "SELECT DISTINCT c.category FROM c");
        assert_eq!(spec.selection(), &Selection::Distinct("category".to_string()));
    }
}
