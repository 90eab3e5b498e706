//! Command templates with `{value}` and `{channel}` placeholders.
//!
//! Braces are doubled to appear literally (`{{` and `}}`). Any other placeholder name parses
//! but can never be rendered.

use thiserror::Error;

use crate::{command::SupplyCommand, error::BuildError, format::format_fixed};

const VALUE: &str = "value";
const CHANNEL: &str = "channel";

/// A template string whose braces don't balance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateSyntaxError {
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at byte {0}")]
    Unmatched(usize),
    #[error("'{{' inside placeholder at byte {0}")]
    Nested(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value,
    Channel,
    Unknown(String),
}

/// A parsed, immutable command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateSyntaxError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateSyntaxError::Unmatched(pos)),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((inner, '{')) => return Err(TemplateSyntaxError::Nested(inner)),
                            Some((_, ch)) => name.push(ch),
                            None => return Err(TemplateSyntaxError::Unclosed(pos)),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(core::mem::take(&mut literal)));
                    }
                    segments.push(match name.as_str() {
                        VALUE => Segment::Value,
                        CHANNEL => Segment::Channel,
                        _ => Segment::Unknown(name),
                    });
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_owned(),
            segments,
        })
    }

    /// The template as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn needs_value(&self) -> bool {
        self.segments.contains(&Segment::Value)
    }

    pub fn needs_channel(&self) -> bool {
        self.segments.contains(&Segment::Channel)
    }

    /// Substitute the placeholders.
    ///
    /// Missing arguments are reported before unknown placeholders. Arguments the template
    /// doesn't use are ignored.
    pub fn render(
        &self,
        command: SupplyCommand,
        value: Option<f64>,
        channel: Option<u32>,
        precision: usize,
    ) -> Result<String, BuildError> {
        let value = match (self.needs_value(), value) {
            (false, _) => None,
            (true, None) => return Err(BuildError::MissingValue(command)),
            (true, Some(v)) => Some(
                format_fixed(v, precision).ok_or(BuildError::InvalidValue { command, value: v })?,
            ),
        };
        let channel = match (self.needs_channel(), channel) {
            (false, _) => None,
            (true, None) => return Err(BuildError::MissingChannel(command)),
            (true, Some(ch)) => Some(ch.to_string()),
        };

        let mut line = String::with_capacity(self.source.len() + 8);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Value => line.push_str(value.as_deref().unwrap_or_default()),
                Segment::Channel => line.push_str(channel.as_deref().unwrap_or_default()),
                Segment::Unknown(name) => {
                    return Err(BuildError::Template {
                        command,
                        reason: format!("unresolved placeholder '{{{name}}}'"),
                    });
                }
            }
        }
        Ok(line)
    }
}
