//! Step condition expressions
//!
//! A condition is a small template over environment variables:
//!
//! ```text
//! ${RUN_TESTS}            -> value of RUN_TESTS, or "" when unset
//! ${RUN_TESTS:-true}      -> value of RUN_TESTS, or "true" when unset
//! release-${CHANNEL:-ga}  -> literal text and references may be mixed
//! ```
//!
//! The expanded string is trimmed and interpreted with a fixed truthy set:
//! `true`, `1`, `yes` (case-insensitive). Everything else, including the empty
//! string, is false.
//!
//! Parsing is separate from evaluation so that every condition of a release can
//! be validated before the first step runs.

use std::fmt;

use crate::core::environment::Environment;

/// Values that evaluate to `true` (compared case-insensitively)
pub const TRUTHY_VALUES: [&str; 3] = ["true", "1", "yes"];

/// A parse failure in a condition expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSyntaxError {
  /// The full expression that failed to parse
  pub expression: String,
  /// Byte offset where the problem was detected
  pub position: usize,
  /// What went wrong
  pub reason: String,
}

impl ConditionSyntaxError {
  fn new(expression: &str, position: usize, reason: impl Into<String>) -> Self {
    Self {
      expression: expression.to_string(),
      position,
      reason: reason.into(),
    }
  }
}

impl fmt::Display for ConditionSyntaxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} at offset {} in `{}`",
      self.reason, self.position, self.expression
    )
  }
}

impl std::error::Error for ConditionSyntaxError {}

/// One piece of a parsed condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Text copied verbatim
  Literal(String),
  /// `${name}` or `${name:-default}`
  Variable { name: String, default: Option<String> },
}

/// A parsed, validated condition expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
  source: String,
  segments: Vec<Segment>,
}

impl Condition {
  /// Parse an expression, rejecting malformed references
  pub fn parse(expression: &str) -> Result<Self, ConditionSyntaxError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = expression.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
      match ch {
        '$' if matches!(chars.peek(), Some((_, '{'))) => {
          chars.next();
          if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
          }

          let body_start = pos + 2;
          let mut body_end = None;
          for (inner_pos, inner) in chars.by_ref() {
            match inner {
              '}' => {
                body_end = Some(inner_pos);
                break;
              }
              '$' | '{' => {
                return Err(ConditionSyntaxError::new(
                  expression,
                  inner_pos,
                  "nested references are not supported",
                ));
              }
              _ => {}
            }
          }

          let body_end = body_end.ok_or_else(|| ConditionSyntaxError::new(expression, pos, "unterminated `${`"))?;
          segments.push(parse_reference(expression, body_start, &expression[body_start..body_end])?);
        }
        '{' | '}' => {
          return Err(ConditionSyntaxError::new(
            expression,
            pos,
            format!("unexpected `{}` outside a reference", ch),
          ));
        }
        _ => literal.push(ch),
      }
    }

    if !literal.is_empty() {
      segments.push(Segment::Literal(literal));
    }

    Ok(Self {
      source: expression.to_string(),
      segments,
    })
  }

  /// The expression as written in the configuration
  pub fn source(&self) -> &str {
    &self.source
  }

  /// Parsed segments, in order
  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Names of all referenced variables
  pub fn variables(&self) -> impl Iterator<Item = &str> {
    self.segments.iter().filter_map(|s| match s {
      Segment::Variable { name, .. } => Some(name.as_str()),
      Segment::Literal(_) => None,
    })
  }

  /// Substitute variables: set value, else default, else empty string
  pub fn expand(&self, env: &Environment) -> String {
    let mut out = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => out.push_str(text),
        Segment::Variable { name, default } => match env.get(name) {
          Some(value) => out.push_str(value),
          None => {
            if let Some(default) = default {
              out.push_str(default);
            }
          }
        },
      }
    }
    out
  }

  /// Expand and interpret the result as a boolean
  pub fn evaluate(&self, env: &Environment) -> bool {
    is_truthy(&self.expand(env))
  }
}

/// Parse and evaluate in one go
pub fn evaluate(expression: &str, env: &Environment) -> Result<bool, ConditionSyntaxError> {
  Ok(Condition::parse(expression)?.evaluate(env))
}

/// Interpret a resolved string with the fixed truthy set
pub fn is_truthy(value: &str) -> bool {
  let value = value.trim();
  TRUTHY_VALUES.iter().any(|t| value.eq_ignore_ascii_case(t))
}

fn parse_reference(expression: &str, offset: usize, body: &str) -> Result<Segment, ConditionSyntaxError> {
  let (name, default) = match body.find(':') {
    Some(idx) => {
      let rest = &body[idx + 1..];
      match rest.strip_prefix('-') {
        Some(default) => (&body[..idx], Some(default.to_string())),
        None => {
          return Err(ConditionSyntaxError::new(
            expression,
            offset + idx,
            "only the `:-` default operator is supported",
          ));
        }
      }
    }
    None => (body, None),
  };

  if name.is_empty() {
    return Err(ConditionSyntaxError::new(expression, offset, "empty variable name"));
  }

  let mut name_chars = name.chars();
  let valid_start = name_chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
  if !valid_start || !name_chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(ConditionSyntaxError::new(
      expression,
      offset,
      format!("invalid variable name `{}`", name),
    ));
  }

  Ok(Segment::Variable {
    name: name.to_string(),
    default,
  })
}
