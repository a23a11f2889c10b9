//! Run-directory naming templates.
//!
//! A template such as `bccFe_temp_T{T}_B{B}` names the parameters encoded in a
//! directory name. It compiles into an anchored regular expression in which
//! every `{field}` captures a non-empty run of characters other than `/`;
//! the literal text between placeholders must match exactly.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use uppout_core::{Result, UppoutError};

const FIELD_PATTERN: &str = r"\{([A-Za-z_][A-Za-z0-9_]*)\}";
const INT_PATTERN: &str = r"^-?\d+$";
const FLOAT_PATTERN: &str = r"^-?(?:\d+\.\d*|\d*\.\d+|\d+)(?:[eE][+-]?\d+)?$";

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FIELD_PATTERN).unwrap())
}

fn int_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(INT_PATTERN).unwrap())
}

fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FLOAT_PATTERN).unwrap())
}

// ============================================================================
// Parameter Values
// ============================================================================

/// A parameter value captured from a directory name.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Integer if the text is all digits (with an optional minus sign), else
    /// float if it reads as a decimal number, else the text itself.
    pub fn coerce(raw: &str) -> Self {
        if int_regex().is_match(raw) {
            // Out-of-range integers fall through to the float rule.
            if let Ok(value) = raw.parse() {
                return ParamValue::Int(value);
            }
        }
        if float_regex().is_match(raw) {
            if let Ok(value) = raw.parse() {
                return ParamValue::Float(value);
            }
        }
        ParamValue::Text(raw.to_string())
    }

    /// Numeric value of `Int` and `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    /// Sort order used for aggregated rows: numbers compare by value and come
    /// before text, text compares lexically.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ParamValue::Int(a), ParamValue::Int(b)) => a.cmp(b),
            (ParamValue::Text(a), ParamValue::Text(b)) => a.cmp(b),
            (ParamValue::Text(_), _) => Ordering::Greater,
            (_, ParamValue::Text(_)) => Ordering::Less,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

// ============================================================================
// Template
// ============================================================================

/// A compiled run-name template.
#[derive(Debug, Clone)]
pub struct RunNameTemplate {
    source: String,
    pattern: Regex,
    fields: Vec<String>,
}

impl RunNameTemplate {
    /// Compile a template. Fails with `InvalidTemplate` when it has no
    /// placeholder or repeats one.
    pub fn new(template: &str) -> Result<Self> {
        let mut fields: Vec<String> = Vec::new();
        let mut pattern = String::from("^");
        let mut last_end = 0;

        for caps in field_regex().captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if fields.iter().any(|f| f == name.as_str()) {
                return Err(UppoutError::InvalidTemplate(format!(
                    "placeholder {{{}}} appears more than once in \"{template}\"",
                    name.as_str()
                )));
            }
            pattern.push_str(&regex::escape(&template[last_end..whole.start()]));
            pattern.push_str(&format!("(?P<{}>[^/]+)", name.as_str()));
            fields.push(name.as_str().to_string());
            last_end = whole.end();
        }

        if fields.is_empty() {
            return Err(UppoutError::InvalidTemplate(format!(
                "\"{template}\" has no {{field}} placeholder"
            )));
        }
        pattern.push_str(&regex::escape(&template[last_end..]));
        pattern.push('$');

        let pattern =
            Regex::new(&pattern).map_err(|e| UppoutError::InvalidTemplate(e.to_string()))?;
        Ok(Self {
            source: template.to_string(),
            pattern,
            fields,
        })
    }

    /// Placeholder names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Coerced parameter values, in field order, if `name` matches in full.
    pub fn match_name(&self, name: &str) -> Option<Vec<ParamValue>> {
        let caps = self.pattern.captures(name)?;
        self.fields
            .iter()
            .map(|field| caps.name(field).map(|m| ParamValue::coerce(m.as_str())))
            .collect()
    }
}

impl FromStr for RunNameTemplate {
    type Err = UppoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for RunNameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
