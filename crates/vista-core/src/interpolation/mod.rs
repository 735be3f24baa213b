//! Template variable interpolation: tokenize, resolve, format.

mod format;
mod parse;
mod replace;

pub use format::{escape_regex, format_values, interpolate, InterpolationFormat, UnknownFormatError};
pub use parse::{parse_variables, parse_variables_and_format, tokenize, VariableToken};
pub use replace::{replace_variable, replace_variables};
