use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::variable::VariableValue;

/// Characters escaped by `encodeURIComponent`: everything but
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How a variable's values are rendered into a template string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpolationFormat {
    Csv,
    Distributed,
    DoubleQuote,
    Glob,
    Json,
    Lucene,
    PercentEncode,
    Pipe,
    /// Regex alternation; also the `prometheus` format.
    Regex,
    Raw,
    SingleQuote,
    SqlString,
    Text,
    QueryParam,
}

/// Error for parsing an InterpolationFormat from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormatError(pub String);

impl std::fmt::Display for UnknownFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown interpolation format: {}", self.0)
    }
}

impl std::error::Error for UnknownFormatError {}

impl FromStr for InterpolationFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "distributed" => Ok(Self::Distributed),
            "doublequote" => Ok(Self::DoubleQuote),
            "glob" => Ok(Self::Glob),
            "json" => Ok(Self::Json),
            "lucene" => Ok(Self::Lucene),
            "percentencode" => Ok(Self::PercentEncode),
            "pipe" => Ok(Self::Pipe),
            "regex" | "prometheus" => Ok(Self::Regex),
            "raw" => Ok(Self::Raw),
            "singlequote" => Ok(Self::SingleQuote),
            "sqlstring" => Ok(Self::SqlString),
            "text" => Ok(Self::Text),
            "queryparam" => Ok(Self::QueryParam),
            _ => Err(UnknownFormatError(s.to_string())),
        }
    }
}

impl InterpolationFormat {
    /// Format used when none (or an unknown one) is requested.
    ///
    /// Arrays render as a regex alternation, scalars pass through.
    pub fn default_for(value: &VariableValue) -> Self {
        if value.is_multiple() {
            Self::Regex
        } else {
            Self::Raw
        }
    }

    /// Resolve an optional format name against a value.
    pub fn resolve(format: Option<&str>, value: &VariableValue) -> Self {
        format
            .and_then(|f| f.parse().ok())
            .unwrap_or_else(|| Self::default_for(value))
    }
}

/// Render `value` for variable `name`, using `format` or the default for the
/// value's shape. A scalar behaves as a one-element list.
pub fn interpolate(value: &VariableValue, name: &str, format: Option<&str>) -> String {
    let format = InterpolationFormat::resolve(format, value);
    format_values(&value.values(), name, format)
}

/// Render a list of values in the given format.
pub fn format_values(values: &[&str], name: &str, format: InterpolationFormat) -> String {
    match format {
        InterpolationFormat::Csv | InterpolationFormat::Raw => values.join(","),
        InterpolationFormat::Distributed => values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if i == 0 {
                    v.to_string()
                } else {
                    format!("{}={}", name, v)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
        InterpolationFormat::DoubleQuote => wrap_each(values, "\"", "\"").join(","),
        InterpolationFormat::SingleQuote => wrap_each(values, "'", "'").join(","),
        InterpolationFormat::SqlString => values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(","),
        InterpolationFormat::Glob => format!("{{{}}}", values.join(",")),
        InterpolationFormat::Json => {
            serde_json::to_string(values).unwrap_or_else(|_| String::from("[]"))
        }
        InterpolationFormat::Lucene => {
            format!("({})", wrap_each(values, "\"", "\"").join(" OR "))
        }
        InterpolationFormat::PercentEncode => encode_uri_component(&values.join(",")),
        InterpolationFormat::Pipe => values.join("|"),
        InterpolationFormat::Regex => format!(
            "({})",
            values
                .iter()
                .map(|v| escape_regex(v))
                .collect::<Vec<_>>()
                .join("|")
        ),
        InterpolationFormat::Text => values.join(" + "),
        InterpolationFormat::QueryParam => values
            .iter()
            .map(|v| format!("{}={}", name, encode_uri_component(v)))
            .collect::<Vec<_>>()
            .join("&"),
    }
}

fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

fn wrap_each(values: &[&str], open: &str, close: &str) -> Vec<String> {
    values
        .iter()
        .map(|v| format!("{}{}{}", open, v, close))
        .collect()
}

/// Backslash-escape the characters `-/\^$*+?.()|[]{}`.
pub fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(
            c,
            '-' | '/' | '\\' | '^' | '$' | '*' | '+' | '?' | '.' | '(' | ')' | '|' | '[' | ']'
                | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
