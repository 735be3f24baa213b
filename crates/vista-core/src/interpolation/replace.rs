use crate::variable::{VariableStateMap, VariableValue};

use super::format::interpolate;
use super::parse::{parse_variables, tokenize, VariableToken};

/// Replace every `$name` / `${name...}` token of `name` in `text`.
///
/// A token's own `:format` wins over `format`.
pub fn replace_variable(
    text: &str,
    name: &str,
    value: &VariableValue,
    format: Option<&str>,
) -> String {
    replace_tokens(text, |token| {
        (token.name == name)
            .then(|| interpolate(value, name, token.format.as_deref().or(format)))
    })
}

/// Resolve every variable referenced in `text` against `states`.
///
/// Variables missing from `states` keep their token. A variable whose value
/// is null renders as an empty string. Longer names are substituted first.
pub fn replace_variables(text: &str, states: &VariableStateMap) -> String {
    let mut names = parse_variables(text);
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));

    let mut result = text.to_string();
    for name in names {
        let Some(state) = states.get(&name) else {
            continue;
        };
        result = match &state.value {
            Some(value) => replace_variable(&result, &name, value, None),
            None => replace_tokens(&result, |token| (token.name == name).then(String::new)),
        };
    }
    result
}

/// Rebuild `text`, swapping each token for the replacement `f` returns.
fn replace_tokens<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&VariableToken) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for token in tokenize(text) {
        if let Some(replacement) = f(&token) {
            out.push_str(&text[cursor..token.span.start]);
            out.push_str(&replacement);
            cursor = token.span.end;
        }
    }
    out.push_str(&text[cursor..]);
    out
}
