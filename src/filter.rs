use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Record, Value},
    sampler::RollResult,
};

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid digit regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Index,
    Price,
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Lte,
    #[default]
    Eq,
    Gt,
    Gte,
}

impl Comparison {
    fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Lte => left <= right,
            Comparison::Eq => left == right,
            Comparison::Gt => left > right,
            Comparison::Gte => left >= right,
        }
    }
}

/// One typed predicate over a mapped field name. Specs with a missing
/// field, type, or value are vacuous and always match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub field: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub negate: bool,
}

impl FilterSpec {
    pub fn new(field: &str, kind: FieldType, comparison: Comparison, value: Value) -> Self {
        Self {
            field: field.to_string(),
            kind: Some(kind),
            comparison: Some(comparison),
            value: Some(value),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn is_vacuous(&self) -> bool {
        let no_value = match &self.value {
            None => true,
            Some(v) => !v.is_number() && !v.is_truthy(),
        };
        self.field.is_empty() || self.kind.is_none() || no_value
    }

    /// A missing or empty field value fails the filter before negation.
    pub fn matches(&self, record: &Record) -> bool {
        if self.is_vacuous() {
            return true;
        }
        let (Some(kind), Some(expected)) = (self.kind, self.value.as_ref()) else {
            return true;
        };
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        if !actual.is_number() && !actual.is_truthy() {
            return false;
        }

        let matched = match kind {
            FieldType::Index | FieldType::Price => {
                let left = match kind {
                    FieldType::Price => Some(parse_price(actual)),
                    _ => parse_int(actual),
                };
                match (left, parse_int(expected)) {
                    (Some(l), Some(r)) => self.comparison.unwrap_or_default().holds(l, r),
                    _ => false,
                }
            }
            FieldType::Text => actual
                .as_display()
                .to_lowercase()
                .contains(&expected.as_display().to_lowercase()),
        };
        if self.negate { !matched } else { matched }
    }
}

/// A record counts only when some non-identifier field holds a truthy value.
/// Any field whose lowercased name contains `id`, and the positional field
/// `0`, is ignored.
pub fn is_non_trivial(record: &Record) -> bool {
    record.iter().any(|(key, value)| {
        value.is_truthy() && key != "0" && !key.to_lowercase().contains("id")
    })
}

pub fn evaluate(record: &Record, specs: &[FilterSpec]) -> bool {
    is_non_trivial(record) && specs.iter().all(|spec| spec.matches(record))
}

pub fn filter_pool(pool: &[RollResult], specs: &[FilterSpec]) -> Vec<RollResult> {
    pool.iter()
        .filter(|candidate| evaluate(&candidate.record, specs))
        .cloned()
        .collect()
}

/// Numbers pass through, `free` is zero, otherwise the first digit run.
pub fn parse_price(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Null => 0.0,
        Value::String(s) => {
            if s.eq_ignore_ascii_case("free") {
                return 0.0;
            }
            DIGIT_RUN
                .find(s)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        }
    }
}

/// Base-10 leading-integer parse: leading whitespace, an optional sign, then
/// digits up to the first non-digit. `None` when no digits lead.
pub fn parse_int(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(f64::trunc),
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim_start();
            let (sign, rest) = match trimmed.as_bytes().first() {
                Some(b'-') => (-1.0, &trimmed[1..]),
                Some(b'+') => (1.0, &trimmed[1..]),
                _ => (1.0, trimmed),
            };
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .map_or(rest, |end| &rest[..end]);
            if digits.is_empty() {
                return None;
            }
            digits.parse::<f64>().ok().map(|n| sign * n)
        }
    }
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterSpec>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

/// Parses `[!][index:|price:|text:]<field> <op> <value>`. `contains` implies
/// a text filter; a bare numeric operator implies `index`.
pub fn parse_filter(filter: &str) -> Result<FilterSpec> {
    let mut trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }
    let negate = match trimmed.strip_prefix('!') {
        Some(rest) => {
            trimmed = rest.trim_start();
            true
        }
        None => false,
    };
    let mut declared = None;
    if let Some((prefix, rest)) = trimmed.split_once(':') {
        let kind = match prefix.trim().to_ascii_lowercase().as_str() {
            "index" => Some(FieldType::Index),
            "price" => Some(FieldType::Price),
            "text" => Some(FieldType::Text),
            _ => None,
        };
        if kind.is_some() {
            declared = kind;
            trimmed = rest.trim_start();
        }
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(idx) = lowered.find(" contains ") {
        let (left, right_with_space) = trimmed.split_at(idx);
        let right = right_with_space[" contains ".len()..].trim();
        return build(left, declared.unwrap_or(FieldType::Text), Comparison::Eq, right, negate);
    }

    for needle in ["<=", ">=", "==", "<", ">", "="] {
        if let Some(idx) = trimmed.find(needle) {
            let comparison = match needle {
                "<" => Comparison::Lt,
                "<=" => Comparison::Lte,
                "=" | "==" => Comparison::Eq,
                ">" => Comparison::Gt,
                ">=" => Comparison::Gte,
                _ => unreachable!(),
            };
            let left = &trimmed[..idx];
            let right = trimmed[idx + needle.len()..].trim();
            return build(
                left,
                declared.unwrap_or(FieldType::Index),
                comparison,
                right,
                negate,
            );
        }
    }

    Err(anyhow!("Failed to parse filter expression '{}'", filter.trim()))
}

fn build(
    field: &str,
    kind: FieldType,
    comparison: Comparison,
    raw_value: &str,
    negate: bool,
) -> Result<FilterSpec> {
    let field = unquote(field.trim());
    if field.is_empty() {
        return Err(anyhow!("Filter expression is missing a field name"));
    }
    let raw_value = unquote(raw_value);
    let value = match kind {
        FieldType::Text => Value::String(raw_value.to_string()),
        FieldType::Index | FieldType::Price => match raw_value.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(raw_value.to_string()),
        },
    };
    Ok(FilterSpec {
        field: field.to_string(),
        kind: Some(kind),
        comparison: Some(comparison),
        value: Some(value),
        negate,
    })
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}
