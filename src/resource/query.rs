//! Query Builder
//!
//! Turns a page request, a [`FilterSet`] and free-text search into the
//! canonical query parameters of `GET /api/resources`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// UI placeholder meaning "no filter"
pub const ALL_SENTINEL: &str = "all";

/// Filters understood by the resource listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Location,
    Department,
    ParentDepartment,
    CostMin,
    CostMax,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::Location,
        FilterKey::Department,
        FilterKey::ParentDepartment,
        FilterKey::CostMin,
        FilterKey::CostMax,
    ];

    /// Query parameter name
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Department => "department",
            Self::ParentDepartment => "parent_department",
            Self::CostMin => "cost_min",
            Self::CostMax => "cost_max",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for FilterKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "location" => Ok(Self::Location),
            "department" => Ok(Self::Department),
            "parent_department" => Ok(Self::ParentDepartment),
            "cost_min" => Ok(Self::CostMin),
            "cost_max" => Ok(Self::CostMax),
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}

/// Whether a filter value means "no constraint"
pub fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(ALL_SENTINEL)
}

/// Optional constraints applied to a resource listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    values: BTreeMap<FilterKey, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a filter; returns whether the stored value changed
    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.values.get(&key) == Some(&value) {
            return false;
        }
        self.values.insert(key, value);
        true
    }

    /// Remove a filter; returns whether anything was removed
    pub fn remove(&mut self, key: FilterKey) -> bool {
        self.values.remove(&key).is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.values.is_empty();
        self.values.clear();
        changed
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Filters that will actually constrain the query
    pub fn active(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values
            .iter()
            .filter(|(_, v)| !is_unset(v))
            .map(|(k, v)| (*k, v.trim()))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }
}

/// Requested page and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// Canonical, ordered query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `page=1&limit=10&...`, form-urlencoded
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }
}

/// Build the listing query.
///
/// `page` and `limit` are always present; `search` only when non-blank;
/// filters only when neither blank nor the `all` sentinel. Values are sent
/// trimmed, in a fixed order, so clearing a filter and never setting it build
/// the same query.
pub fn build_query(base: PageRequest, filters: &FilterSet, search: &str) -> QueryParams {
    let mut params = vec![
        ("page", base.page.to_string()),
        ("limit", base.limit.to_string()),
    ];

    let search = search.trim();
    if !search.is_empty() {
        params.push(("search", search.to_string()));
    }

    for (key, value) in filters.active() {
        params.push((key.as_param(), value.to_string()));
    }

    QueryParams(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_includes_page_and_limit() {
        let query = build_query(PageRequest { page: 3, limit: 25 }, &FilterSet::new(), "");
        assert_eq!(query.to_query_string(), "page=3&limit=25");
    }

    #[test]
    fn test_omits_blank_and_sentinel_values() {
        let filters = FilterSet::new()
            .with(FilterKey::Location, "all")
            .with(FilterKey::Department, "  ")
            .with(FilterKey::CostMin, "100")
            .with(FilterKey::ParentDepartment, "ALL");
        let query = build_query(PageRequest::default(), &filters, "   ");
        assert_eq!(query.to_query_string(), "page=1&limit=10&cost_min=100");
    }

    #[test]
    fn test_search_is_trimmed_and_encoded() {
        let query = build_query(PageRequest::default(), &FilterSet::new(), "  dell laptop ");
        assert_eq!(query.get("search"), Some("dell laptop"));
        assert_eq!(
            query.to_query_string(),
            "page=1&limit=10&search=dell+laptop"
        );
    }

    #[test]
    fn test_filter_order_is_canonical() {
        let a = FilterSet::new()
            .with(FilterKey::CostMax, "900")
            .with(FilterKey::Location, "Lab 2");
        let b = FilterSet::new()
            .with(FilterKey::Location, "Lab 2")
            .with(FilterKey::CostMax, "900");
        assert_eq!(
            build_query(PageRequest::default(), &a, ""),
            build_query(PageRequest::default(), &b, "")
        );
    }

    #[test]
    fn test_set_reports_changes() {
        let mut filters = FilterSet::new();
        assert!(filters.set(FilterKey::Department, "Physics"));
        assert!(!filters.set(FilterKey::Department, "Physics"));
        assert!(filters.remove(FilterKey::Department));
        assert!(!filters.clear());
    }

    #[test]
    fn test_filter_key_parsing() {
        assert_eq!("parent-department".parse::<FilterKey>(), Ok(FilterKey::ParentDepartment));
        assert_eq!("COST_MIN".parse::<FilterKey>(), Ok(FilterKey::CostMin));
        assert!("colour".parse::<FilterKey>().is_err());
    }
}
