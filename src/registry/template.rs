use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Template with `{param}` placeholders, e.g. "scene.{scene}"
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Template parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("unclosed '{{' in '{0}'")]
    UnclosedPlaceholder(String),
    #[error("empty placeholder in '{0}'")]
    EmptyPlaceholder(String),
    #[error("unmatched '}}' in '{0}'")]
    StrayBrace(String),
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed || name.contains('{') {
                        return Err(TemplateError::UnclosedPlaceholder(source.to_string()));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder(source.to_string()));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                }
                '}' => return Err(TemplateError::StrayBrace(source.to_string())),
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes trimmed parameter values; unknown placeholders render empty
    pub fn render(&self, parameters: &HashMap<String, String>) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.as_str(),
                Segment::Placeholder(name) => {
                    parameters.get(name).map(|v| v.trim()).unwrap_or_default()
                }
            })
            .collect()
    }

}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
