use std::ops::Range;

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// `$name`, `${name}`, `${name:format}` and `${name.prop}` / `${name.prop:format}`.
static VARIABLE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\w+)|\$\{(\w+)(?:\.([^:^\}]+))?(?::([^\}]+))?\}")
        .expect("valid variable token pattern")
});

/// A variable reference found in a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableToken {
    pub name: String,
    /// Explicit format after `:`, braced syntax only.
    pub format: Option<String>,
    /// Property path after `.`; captured, not interpreted.
    pub property: Option<String>,
    /// Byte range of the whole token in the scanned text.
    pub span: Range<usize>,
}

/// Scan `text` for variable tokens, in order of appearance.
pub fn tokenize(text: &str) -> Vec<VariableToken> {
    VARIABLE_TOKEN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1).or_else(|| caps.get(2))?;
            Some(VariableToken {
                name: name.as_str().to_string(),
                property: caps.get(3).map(|m| m.as_str().to_string()),
                format: caps.get(4).map(|m| m.as_str().to_string()),
                span: whole.range(),
            })
        })
        .collect()
}

/// Names of the variables referenced by `text`, deduplicated, in order of
/// first occurrence.
pub fn parse_variables(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if !names.contains(&token.name) {
            names.push(token.name);
        }
    }
    names
}

/// Like [`parse_variables`], paired with the explicit format of each variable.
///
/// Names keep their first-occurrence position. When a variable appears
/// several times, the format of its last occurrence is reported.
pub fn parse_variables_and_format(text: &str) -> Vec<(String, Option<String>)> {
    let mut entries: Vec<(String, Option<String>)> = Vec::new();
    for token in tokenize(text) {
        match entries.iter_mut().find(|(name, _)| *name == token.name) {
            Some(entry) => entry.1 = token.format,
            None => entries.push((token.name, token.format)),
        }
    }
    entries
}
