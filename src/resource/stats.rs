//! Stats Normalizer
//!
//! Aggregate statistics come from the backend as loosely shaped JSON in which
//! empty groups produce `null` averages and divisions by zero. Everything is
//! funneled through [`to_finite_number`] so the typed result can be formatted
//! as currency without guarding each field.

use serde::Serialize;
use serde_json::Value;

/// Normalization default: a numeric leaf that is missing, null, non-numeric
/// or non-finite reads as `0`.
pub fn to_finite_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => finite_or_zero(n.as_f64().unwrap_or(0.0)),
        _ => 0.0,
    }
}

/// `value` if finite, else `0`
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn number_at(value: &Value, key: &str) -> f64 {
    value.get(key).map(to_finite_number).unwrap_or(0.0)
}

/// Group label; the backend uses Mongo's `_id` for the grouping key
fn label_of(value: &Value) -> String {
    match value.get("_id").or_else(|| value.get("name")) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "Unassigned".to_string(),
    }
}

fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostStatistics {
    pub average_cost: f64,
    pub min_cost: f64,
    pub max_cost: f64,
}

/// Resource count for one group (department, parent department, location)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub label: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCost {
    pub label: String,
    pub total_cost: f64,
    pub count: f64,
    pub valid_cost_count: f64,
}

/// Dashboard aggregates with every numeric field finite
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_resources: f64,
    pub total_cost: f64,
    pub valid_cost_count: f64,
    pub excluded_from_cost: f64,
    /// Resources added in the last week
    pub recent_additions: f64,
    pub cost_statistics: CostStatistics,
    pub department_stats: Vec<GroupCount>,
    pub parent_department_stats: Vec<GroupCount>,
    pub location_stats: Vec<GroupCount>,
    pub department_cost_stats: Vec<GroupCost>,
}

impl DashboardStats {
    /// Share of resources that carry a usable cost, rounded to a whole percent
    pub fn cost_coverage_percent(&self) -> u32 {
        if self.total_resources <= 0.0 {
            return 0;
        }
        let percent = (self.valid_cost_count / self.total_resources * 100.0).round();
        percent.clamp(0.0, 100.0) as u32
    }

    /// Every numeric field, for checks and exports
    pub fn numeric_fields(&self) -> Vec<f64> {
        let mut out = vec![
            self.total_resources,
            self.total_cost,
            self.recent_additions,
            self.valid_cost_count,
            self.excluded_from_cost,
            self.cost_statistics.average_cost,
            self.cost_statistics.min_cost,
            self.cost_statistics.max_cost,
        ];
        for group in self
            .department_stats
            .iter()
            .chain(&self.parent_department_stats)
            .chain(&self.location_stats)
        {
            out.push(group.count);
        }
        for group in &self.department_cost_stats {
            out.extend([group.total_cost, group.count, group.valid_cost_count]);
        }
        out
    }
}

fn group_counts(raw: &Value, key: &str) -> Vec<GroupCount> {
    array_at(raw, key)
        .iter()
        .map(|g| GroupCount {
            label: label_of(g),
            count: number_at(g, "count"),
        })
        .collect()
}

/// Sanitize a raw statistics payload (the `data` member of the stats response)
pub fn sanitize_stats(raw: &Value) -> DashboardStats {
    let cost_stats = raw.get("cost_statistics").unwrap_or(&Value::Null);

    DashboardStats {
        total_resources: number_at(raw, "total_resources"),
        total_cost: number_at(raw, "total_cost"),
        valid_cost_count: number_at(raw, "valid_cost_count"),
        excluded_from_cost: number_at(raw, "excluded_from_cost"),
        recent_additions: number_at(raw, "recent_additions"),
        cost_statistics: CostStatistics {
            average_cost: number_at(cost_stats, "average_cost"),
            min_cost: number_at(cost_stats, "min_cost"),
            max_cost: number_at(cost_stats, "max_cost"),
        },
        department_stats: group_counts(raw, "department_stats"),
        parent_department_stats: group_counts(raw, "parent_department_stats"),
        location_stats: group_counts(raw, "location_stats"),
        department_cost_stats: array_at(raw, "department_cost_stats")
            .iter()
            .map(|g| GroupCost {
                label: label_of(g),
                total_cost: number_at(g, "total_cost"),
                count: number_at(g, "count"),
                valid_cost_count: number_at(g, "valid_cost_count"),
            })
            .collect(),
    }
}
