//! Resource data model
//!
//! Typed records for what the backend returns, plus the form input used to
//! create and update resources. Numeric fields are normalized on the way in
//! so nothing downstream ever sees a NaN cost.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::api::{ApiError, ApiResult};

/// An inventoried physical asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sl_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub service_tag: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub identification_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub procurement_date: String,
    /// Finite and non-negative, or `None` when the stored value is unusable
    #[serde(default, deserialize_with = "deserialize_cost")]
    pub cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub department: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_department: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Resource {
    /// Procurement date without the time part (`2024-03-01T00:00:00` -> `2024-03-01`)
    pub fn procurement_day(&self) -> &str {
        self.procurement_date
            .split('T')
            .next()
            .unwrap_or(&self.procurement_date)
    }

    /// Form fields pre-filled from this resource, for editing
    pub fn to_fields(&self) -> ResourceFields {
        ResourceFields {
            sl_no: self.sl_no.clone(),
            description: self.description.clone(),
            service_tag: self.service_tag.clone(),
            identification_number: self.identification_number.clone(),
            procurement_date: self.procurement_day().to_string(),
            cost: self.cost.map(|c| c.to_string()).unwrap_or_default(),
            location: self.location.clone(),
            department: self.department.clone(),
            parent_department: self.parent_department.clone(),
        }
    }
}

/// Backend text fields are sometimes numbers (spreadsheet imports) or null
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Accepts numbers, numeric strings and null; anything unusable becomes `None`
fn deserialize_cost<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let cost = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(cost.filter(|c| c.is_finite() && *c >= 0.0).map(|c| c + 0.0))
}

/// Parse user-entered cost from its leading numeric part (`"12abc"` -> `12`).
///
/// Input with no numeric prefix, a non-finite value or a negative value is
/// recorded as `0` and logged at warn level.
pub fn parse_cost(input: &str) -> f64 {
    let parsed = numeric_prefix(input.trim()).and_then(|p| p.parse::<f64>().ok());
    match parsed {
        // `+ 0.0` folds negative zero into zero
        Some(v) if v.is_finite() && v >= 0.0 => v + 0.0,
        _ => {
            if !input.trim().is_empty() {
                tracing::warn!("Cost '{}' is not a usable amount, recording 0", input);
            }
            0.0
        }
    }
}

/// Longest prefix of `s` shaped like a decimal number (sign, digits, fraction, exponent)
fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut i = 0;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when followed by at least one digit
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    Some(&s[..i])
}

/// Create/update form input, as typed by a user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceFields {
    pub sl_no: String,
    pub description: String,
    pub service_tag: String,
    pub identification_number: String,
    pub procurement_date: String,
    pub cost: String,
    pub location: String,
    pub department: String,
    pub parent_department: String,
}

impl ResourceFields {
    /// Local checks run before any network call
    pub fn validate(&self) -> ApiResult<()> {
        if self.description.trim().is_empty() {
            return Err(ApiError::Validation("Description is required".to_string()));
        }
        Ok(())
    }

    /// JSON body for create/update, with `cost` converted by [`parse_cost`]
    pub fn to_payload(&self) -> Value {
        json!({
            "sl_no": self.sl_no.trim(),
            "description": self.description.trim(),
            "service_tag": self.service_tag.trim(),
            "identification_number": self.identification_number.trim(),
            "procurement_date": self.procurement_date.trim(),
            "cost": parse_cost(&self.cost),
            "location": self.location.trim(),
            "department": self.department.trim(),
            "parent_department": self.parent_department.trim(),
        })
    }
}

/// Server-reported pagination of a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            total: 0,
            pages: 0,
        }
    }
}

/// One page of a resource listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourcePage {
    #[serde(default)]
    pub resources: Vec<Resource>,
    pub pagination: Pagination,
}

/// Distinct values offered by the filter pickers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub departments: Vec<String>,
    pub parent_departments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cost() {
        assert_eq!(parse_cost("1500.50"), 1500.5);
        assert_eq!(parse_cost("  42 "), 42.0);
        assert_eq!(parse_cost("12abc"), 12.0);
        assert_eq!(parse_cost(".5"), 0.5);
        assert_eq!(parse_cost("3."), 3.0);
        assert_eq!(parse_cost("1e3"), 1000.0);
        assert_eq!(parse_cost("2e"), 2.0);
    }

    #[test]
    fn test_parse_cost_coerces_unusable_input_to_zero() {
        assert_eq!(parse_cost("abc"), 0.0);
        assert_eq!(parse_cost(""), 0.0);
        assert_eq!(parse_cost("."), 0.0);
        assert_eq!(parse_cost("-20"), 0.0);
        assert_eq!(parse_cost("Infinity"), 0.0);
        assert_eq!(parse_cost("1e999"), 0.0);
    }

    #[test]
    fn test_negative_zero_cost_is_plain_zero() {
        for input in ["-0", "-0.00", "-0e5"] {
            let cost = parse_cost(input);
            assert_eq!(cost, 0.0);
            assert!(cost.is_sign_positive(), "{} parsed to {}", input, cost);
        }
        assert_eq!(
            ResourceFields {
                description: "Scope".to_string(),
                cost: "-0".to_string(),
                ..Default::default()
            }
            .to_payload()["cost"]
            .to_string(),
            "0.0"
        );
        let resource: Resource = serde_json::from_value(json!({"_id": "r", "cost": -0.0})).unwrap();
        assert!(resource.cost.unwrap().is_sign_positive());
    }

    #[test]
    fn test_resource_cost_normalization() {
        let resource: Resource = serde_json::from_value(json!({
            "_id": "r1",
            "description": "Projector",
            "cost": "250.75",
            "sl_no": 17
        }))
        .unwrap();
        assert_eq!(resource.cost, Some(250.75));
        assert_eq!(resource.sl_no, "17");

        for bad in [json!("n/a"), json!(null), json!(-1), json!("NaN"), json!("inf")] {
            let resource: Resource =
                serde_json::from_value(json!({"_id": "r2", "cost": bad})).unwrap();
            assert_eq!(resource.cost, None);
        }
    }

    #[test]
    fn test_missing_fields_default() {
        let resource: Resource = serde_json::from_value(json!({"_id": "r3"})).unwrap();
        assert_eq!(resource.description, "");
        assert_eq!(resource.cost, None);
        assert!(resource.created_at.is_none());
    }

    #[test]
    fn test_fields_validation_and_payload() {
        let mut fields = ResourceFields {
            description: "  ".to_string(),
            cost: "abc".to_string(),
            ..Default::default()
        };
        assert!(matches!(fields.validate(), Err(ApiError::Validation(_))));

        fields.description = "Oscilloscope".to_string();
        assert!(fields.validate().is_ok());
        assert_eq!(fields.to_payload()["cost"], json!(0.0));
    }

    #[test]
    fn test_to_fields_strips_time() {
        let resource = Resource {
            procurement_date: "2023-07-14T00:00:00".to_string(),
            cost: Some(99.5),
            ..Default::default()
        };
        let fields = resource.to_fields();
        assert_eq!(fields.procurement_date, "2023-07-14");
        assert_eq!(fields.cost, "99.5");
    }
}
