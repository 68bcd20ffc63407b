//! Sort + paginate for already-fetched record lists.
//!
//! Listing endpoints accept `sort`, `order`, `offset`, and `count` query
//! parameters and pass their serialized rows through [`shape`] before
//! responding.

use std::cmp::Ordering;

use serde::Deserialize;
use thiserror::Error;

use crate::error::{ApiError, ValidationErrors};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Order of sorting does not exist.")]
    UnsupportedOrder(String),
}

impl From<ShapeError> for ApiError {
    fn from(err: ShapeError) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add("order", err.to_string());
        ApiError::Validation(errors)
    }
}

/// Raw query parameters. `offset` and `count` stay strings on purpose: a
/// supplied but non-numeric value disables truncation instead of failing
/// the request.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapeParams {
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_order")]
    pub order: String,
    pub offset: Option<String>,
    pub count: Option<String>,
}

fn default_sort() -> String {
    "createdAt".to_string()
}

fn default_order() -> String {
    "desc".to_string()
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            sort: default_sort(),
            order: default_order(),
            offset: None,
            count: None,
        }
    }
}

impl ShapeParams {
    /// `[offset, offset+count)` window, or None when a supplied value does
    /// not parse, which turns truncation off entirely.
    fn window(&self) -> Option<(usize, usize)> {
        let offset = match &self.offset {
            None => 0,
            Some(raw) => raw.trim().parse::<i64>().ok()?.max(0) as usize,
        };
        let count = match &self.count {
            None => 9,
            Some(raw) => raw.trim().parse::<i64>().ok()?.max(0) as usize,
        };
        Some((offset, count))
    }
}

#[derive(Clone, Copy)]
enum FieldKind {
    Text,
    Number,
}

fn field_str<'a>(record: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(|v| v.as_str())
}

fn field_num(record: &serde_json::Value, field: &str) -> Option<f64> {
    record.get(field).and_then(|v| v.as_f64())
}

/// Sorts and truncates `data`, returning a new ordered list.
///
/// The comparator is type-sensed from the first record's sort field: a
/// three-way lexical comparison for strings, numeric comparison for numbers.
/// A missing field or any other JSON type leaves the order untouched, which
/// is what sorting by an absent column should do.
pub fn shape(
    params: &ShapeParams,
    mut data: Vec<serde_json::Value>,
) -> Result<Vec<serde_json::Value>, ShapeError> {
    if data.is_empty() {
        return Ok(data);
    }

    let descending = match params.order.as_str() {
        "asc" => false,
        "desc" => true,
        other => return Err(ShapeError::UnsupportedOrder(other.to_string())),
    };

    let kind = match data[0].get(&params.sort) {
        Some(serde_json::Value::String(_)) => Some(FieldKind::Text),
        Some(serde_json::Value::Number(_)) => Some(FieldKind::Number),
        _ => None,
    };

    if let Some(kind) = kind {
        let field = params.sort.as_str();
        data.sort_by(|a, b| {
            let ordering = match kind {
                FieldKind::Text => field_str(a, field).cmp(&field_str(b, field)),
                FieldKind::Number => field_num(a, field)
                    .partial_cmp(&field_num(b, field))
                    .unwrap_or(Ordering::Equal),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    if let Some((offset, count)) = params.window() {
        data = data.into_iter().skip(offset).take(count).collect();
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers() -> Vec<serde_json::Value> {
        vec![json!({"v": 3}), json!({"v": 1}), json!({"v": 2})]
    }

    fn params(sort: &str, order: &str) -> ShapeParams {
        ShapeParams {
            sort: sort.into(),
            order: order.into(),
            ..ShapeParams::default()
        }
    }

    fn values(data: &[serde_json::Value], field: &str) -> Vec<i64> {
        data.iter().map(|r| r[field].as_i64().unwrap()).collect()
    }

    #[test]
    fn sorts_numbers_ascending() {
        let shaped = shape(&params("v", "asc"), numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![1, 2, 3]);
    }

    #[test]
    fn sorts_numbers_descending() {
        let shaped = shape(&params("v", "desc"), numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![3, 2, 1]);
    }

    #[test]
    fn windows_after_sorting() {
        let mut p = params("v", "asc");
        p.offset = Some("1".into());
        p.count = Some("1".into());
        let shaped = shape(&p, numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![2]);
    }

    #[test]
    fn sorts_strings_with_three_way_comparison() {
        let data = vec![
            json!({"name": "banana"}),
            json!({"name": "apple"}),
            json!({"name": "cherry"}),
        ];
        let shaped = shape(&params("name", "asc"), data).unwrap();
        let names: Vec<&str> = shaped.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn unsupported_order_is_an_error() {
        let err = shape(&params("v", "sideways"), numbers()).unwrap_err();
        assert_eq!(err, ShapeError::UnsupportedOrder("sideways".into()));
    }

    #[test]
    fn empty_list_passes_through_without_order_validation() {
        let shaped = shape(&params("v", "sideways"), vec![]).unwrap();
        assert!(shaped.is_empty());
    }

    #[test]
    fn missing_sort_field_leaves_order_untouched() {
        let shaped = shape(&params("absent", "asc"), numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![3, 1, 2]);
    }

    #[test]
    fn non_numeric_offset_disables_truncation() {
        let mut p = params("v", "asc");
        p.offset = Some("abc".into());
        p.count = Some("1".into());
        let shaped = shape(&p, numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![1, 2, 3]);
    }

    #[test]
    fn non_numeric_count_disables_truncation() {
        let mut p = params("v", "desc");
        p.count = Some("lots".into());
        let shaped = shape(&p, numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![3, 2, 1]);
    }

    #[test]
    fn default_count_is_nine() {
        let data: Vec<_> = (0..12).map(|v| json!({"v": v})).collect();
        let shaped = shape(&params("v", "asc"), data).unwrap();
        assert_eq!(shaped.len(), 9);
        assert_eq!(values(&shaped, "v"), (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn offset_past_the_end_yields_empty() {
        let mut p = params("v", "asc");
        p.offset = Some("10".into());
        let shaped = shape(&p, numbers()).unwrap();
        assert!(shaped.is_empty());
    }

    #[test]
    fn negative_offset_clamps_to_zero() {
        let mut p = params("v", "asc");
        p.offset = Some("-3".into());
        p.count = Some("2".into());
        let shaped = shape(&p, numbers()).unwrap();
        assert_eq!(values(&shaped, "v"), vec![1, 2]);
    }

    #[test]
    fn shape_error_renders_as_validation() {
        let api: ApiError = ShapeError::UnsupportedOrder("x".into()).into();
        assert!(matches!(api, ApiError::Validation(_)));
    }
}
