//! Human-readable rendering of values inside failure messages.

use serde_json::Value;

/// Nesting below which objects and arrays collapse to `[Object]` / `[Array]`.
const DEPTH: usize = 2;
/// Width past which an object or array is spread over several lines.
const BREAK_LENGTH: usize = 128;
/// Innermost levels that may still be combined onto a single line.
const COMPACT: usize = 3;
const MAX_ARRAY_LENGTH: usize = 100;
/// Strings up to this length are never split.
const MIN_LINE_WIDTH: usize = 16;

pub(crate) fn inspect(value: &Value) -> String {
    Inspector::default().render(value, 0)
}

#[derive(Default)]
struct Inspector {
    indentation: usize,
    /// Depth of the most recently expanded object or array.
    current_depth: usize,
}

impl Inspector {
    fn render(&mut self, value: &Value, depth: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            Value::String(text) => self.string(text),
            Value::Array(items) if items.is_empty() => "[]".to_string(),
            Value::Object(fields) if fields.is_empty() => "{}".to_string(),
            Value::Array(_) if depth > DEPTH => "[Array]".to_string(),
            Value::Object(_) if depth > DEPTH => "[Object]".to_string(),
            Value::Array(items) => {
                self.current_depth = depth;
                let mut output: Vec<String> = items
                    .iter()
                    .take(MAX_ARRAY_LENGTH)
                    .map(|item| self.child(item, depth))
                    .collect();
                let hidden = items.len().saturating_sub(MAX_ARRAY_LENGTH);
                if hidden > 0 {
                    let plural = if hidden == 1 { "" } else { "s" };
                    output.push(format!("... {hidden} more item{plural}"));
                }

                let entries = output.len();
                if entries > 6 {
                    let numeric = items.iter().take(MAX_ARRAY_LENGTH).all(Value::is_number);
                    output = self.group(output, hidden > 0, numeric);
                }
                self.reduce(output, entries, depth, "[", "]")
            }
            Value::Object(fields) => {
                self.current_depth = depth;
                let output: Vec<String> = fields
                    .iter()
                    .map(|(key, value)| {
                        let rendered = self.child(value, depth);
                        format!("{}: {rendered}", field_name(key))
                    })
                    .collect();
                let entries = output.len();
                self.reduce(output, entries, depth, "{", "}")
            }
        }
    }

    fn child(&mut self, value: &Value, depth: usize) -> String {
        self.indentation += 2;
        let rendered = self.render(value, depth + 1);
        self.indentation -= 2;
        rendered
    }

    /// Long strings are split after each newline and joined with ` +`.
    fn string(&self, text: &str) -> String {
        let length = text.chars().count();
        let limit = BREAK_LENGTH.saturating_sub(self.indentation + 4);
        if length <= MIN_LINE_WIDTH || length <= limit || !text.contains('\n') {
            return quote(text);
        }
        let separator = format!(" +\n{}", " ".repeat(self.indentation + 2));
        let lines: Vec<String> = text.split_inclusive('\n').map(quote).collect();
        lines.join(&separator)
    }

    /// Lays short entries of a long array out in aligned columns.
    fn group(&self, output: Vec<String>, truncated: bool, numeric: bool) -> Vec<String> {
        const SEPARATOR_SPACE: usize = 2;
        let data_len = output.len() - usize::from(truncated);
        let lengths: Vec<usize> = output[..data_len]
            .iter()
            .map(|entry| entry.chars().count())
            .collect();
        let total_length: usize = lengths.iter().map(|len| len + SEPARATOR_SPACE).sum();
        let max_length = lengths.iter().copied().max().unwrap_or_default();
        let actual_max = max_length + SEPARATOR_SPACE;

        let fits = actual_max * 3 + self.indentation < BREAK_LENGTH;
        let spread = total_length as f64 / actual_max as f64;
        if !fits || (spread <= 5.0 && max_length > 6) {
            return output;
        }

        let average_bias = (actual_max as f64 - total_length as f64 / output.len() as f64).sqrt();
        let biased_max = (actual_max as f64 - 3.0 - average_bias).max(1.0);
        let columns = ((2.5 * biased_max * data_len as f64).sqrt() / biased_max).round() as usize;
        let columns = columns
            .min(BREAK_LENGTH.saturating_sub(self.indentation) / actual_max)
            .min(COMPACT * 4)
            .min(15);
        if columns <= 1 {
            return output;
        }

        let column_widths: Vec<usize> = (0..columns)
            .map(|column| {
                let widest = lengths.iter().skip(column).step_by(columns).max();
                widest.copied().unwrap_or_default() + SEPARATOR_SPACE
            })
            .collect();

        let mut rows = Vec::with_capacity(data_len / columns + 2);
        for row_start in (0..data_len).step_by(columns) {
            let row_end = (row_start + columns).min(data_len);
            let mut row = String::new();
            for index in row_start..row_end {
                let width = column_widths[index - row_start];
                let cell = &output[index];
                if index + 1 < row_end {
                    let cell = format!("{cell}, ");
                    if numeric {
                        row.push_str(&format!("{cell:>width$}"));
                    } else {
                        row.push_str(&format!("{cell:<width$}"));
                    }
                } else if numeric {
                    let width = width - SEPARATOR_SPACE;
                    row.push_str(&format!("{cell:>width$}"));
                } else {
                    row.push_str(cell);
                }
            }
            rows.push(row);
        }
        if truncated {
            rows.extend(output.last().cloned());
        }
        rows
    }

    fn reduce(
        &self,
        output: Vec<String>,
        entries: usize,
        depth: usize,
        open: &str,
        close: &str,
    ) -> String {
        if self.current_depth - depth < COMPACT && entries == output.len() {
            let start = output.len() + self.indentation + open.len() + 10;
            if below_break_length(&output, start) {
                let joined = output.join(", ");
                if !joined.contains('\n') {
                    return format!("{open} {joined} {close}");
                }
            }
        }
        let indentation = format!("\n{}", " ".repeat(self.indentation));
        let joined = output.join(&format!(",{indentation}  "));
        format!("{open}{indentation}  {joined}{indentation}{close}")
    }
}

fn below_break_length(output: &[String], start: usize) -> bool {
    let mut total = output.len() + start;
    if total + output.len() > BREAK_LENGTH {
        return false;
    }
    for entry in output {
        total += entry.chars().count();
        if total > BREAK_LENGTH {
            return false;
        }
    }
    true
}

/// Single-quoted unless the text itself holds a single quote, in which case
/// double quotes or backticks are tried first.
pub(crate) fn quote(text: &str) -> String {
    let delimiter = if !text.contains('\'') {
        '\''
    } else if !text.contains('"') {
        '"'
    } else if !text.contains('`') && !text.contains("${") {
        '`'
    } else {
        '\''
    };

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(delimiter);
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

fn field_name(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Path and values of the first place two values differ.
pub(crate) fn first_difference(expected: &Value, actual: &Value) -> Option<String> {
    difference_at("$", expected, actual)
}

fn difference_at(path: &str, expected: &Value, actual: &Value) -> Option<String> {
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => {
            for (key, value) in want {
                let child = format!("{path}.{key}");
                match got.get(key) {
                    Some(other) => {
                        if let Some(diff) = difference_at(&child, value, other) {
                            return Some(diff);
                        }
                    }
                    None => return Some(format!("{child}: missing, expected {}", inspect(value))),
                }
            }
            got.keys()
                .find(|key| !want.contains_key(*key))
                .map(|key| format!("{path}.{key}: unexpected {}", inspect(&got[key.as_str()])))
        }
        (Value::Array(want), Value::Array(got)) => {
            for (index, (value, other)) in want.iter().zip(got).enumerate() {
                if let Some(diff) = difference_at(&format!("{path}[{index}]"), value, other) {
                    return Some(diff);
                }
            }
            (want.len() != got.len())
                .then(|| format!("{path}: length {} != {}", want.len(), got.len()))
        }
        _ if expected == actual => None,
        _ => Some(format!("{path}: {} != {}", inspect(expected), inspect(actual))),
    }
}
