use anyhow::{anyhow, Result};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{map, opt, recognize};
use nom::sequence::{pair, tuple};
use nom::IResult;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Number of leading rows the upload service keeps as a preview
pub const PREVIEW_ROWS: usize = 10;

/// A single cell of a preview row.
///
/// A key missing from a row is "undefined" and is represented by the
/// absence of the entry, not by `Null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Scalar::Null),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(Scalar::Number)
                .ok_or_else(|| anyhow!("Number '{}' is out of range", n)),
            Value::String(s) => Ok(Scalar::String(s.clone())),
            _ => Err(anyhow!("Unsupported cell value: {}", value)),
        }
    }

    /// Infer a scalar from raw CSV text: numbers become `Number`, the rest stay text.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return Scalar::Number(n);
                }
            }
        }
        Scalar::String(text.to_string())
    }

    /// Numeric coercion with leading-prefix semantics.
    ///
    /// Strings are parsed from their longest numeric prefix (`"3kg"` is 3).
    /// Null, booleans, unparseable text and NaN yield `None`.
    pub fn to_number(&self) -> Option<f64> {
        let n = match self {
            Scalar::Number(n) => *n,
            Scalar::String(s) => parse_leading_float(s)?,
            Scalar::Null | Scalar::Bool(_) => return None,
        };
        if n.is_nan() {
            None
        } else {
            Some(n)
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::String(s) => !s.is_empty(),
        }
    }

    pub fn is_empty_string(&self) -> bool {
        matches!(self, Scalar::String(s) if s.is_empty())
    }

    /// Text shown in a preview table cell; null renders blank
    pub fn cell_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", format_number(*n)),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// `Infinity` with an optional sign
fn infinity(input: &str) -> IResult<&str, f64> {
    map(pair(opt(one_of("+-")), tag("Infinity")), |(sign, _)| {
        if sign == Some('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    })(input)
}

/// `12`, `12.`, `12.5` or `.5`
fn mantissa(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ))(input)
}

/// An exponent only counts when digits follow the `e`
fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

fn decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((opt(one_of("+-")), mantissa, opt(exponent))))(input)
}

/// Parse the longest float prefix of `text`, after leading whitespace and BOM.
fn parse_leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if let Ok((_, value)) = infinity(s) {
        return Some(value);
    }
    let (_, literal) = decimal(s).ok()?;
    literal.parse().ok()
}

pub type Row = HashMap<String, Scalar>;

/// Bounded, immutable snapshot of the first rows of an uploaded dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularPreview {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl TabularPreview {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Create a preview from a JSON array of row objects.
    ///
    /// `columns` fixes the column order; when `None` it is taken from the
    /// keys of the rows in order of first appearance.
    pub fn from_json(value: &Value, columns: Option<Vec<String>>) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Preview data must be a JSON array of objects"))?;

        let mut seen = Vec::new();
        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in preview array must be objects"))?;

            let mut row = Row::with_capacity(obj.len());
            for (key, val) in obj {
                let cell = Scalar::from_json(val)
                    .map_err(|e| anyhow!("Field '{}': {}", key, e))?;
                if !seen.contains(key) {
                    seen.push(key.clone());
                }
                row.insert(key.clone(), cell);
            }
            rows.push(row);
        }

        Ok(Self {
            columns: columns.unwrap_or(seen),
            rows,
        })
    }

    /// Build a preview from header and string records, keeping at most `limit` rows
    pub fn from_records(headers: &[String], records: &[Vec<String>], limit: usize) -> Self {
        let rows = records
            .iter()
            .take(limit)
            .map(|record| {
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, cell)| (h.clone(), Scalar::from_text(cell)))
                    .collect()
            })
            .collect();

        Self {
            columns: headers.to_vec(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c == key)
    }
}
