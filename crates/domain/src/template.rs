use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of placeholders a `MessageTemplate` may reference.
/// In template text a token is written as `[token_name]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Title,
    DueDate,
    DueTime,
    CreatedDate,
    CreatedTime,
    OrganizationName,
    MinistryName,
    AssigneeName,
    ResourceType,
}

impl Token {
    pub const ALL: [Token; 9] = [
        Token::Title,
        Token::DueDate,
        Token::DueTime,
        Token::CreatedDate,
        Token::CreatedTime,
        Token::OrganizationName,
        Token::MinistryName,
        Token::AssigneeName,
        Token::ResourceType,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Token::Title => "title",
            Token::DueDate => "due_date",
            Token::DueTime => "due_time",
            Token::CreatedDate => "created_date",
            Token::CreatedTime => "created_time",
            Token::OrganizationName => "organization_name",
            Token::MinistryName => "ministry_name",
            Token::AssigneeName => "assignee_name",
            Token::ResourceType => "resource_type",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

pub type TemplateContext = HashMap<Token, String>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageTemplate {
    pub title: String,
    pub body: String,
}

impl MessageTemplate {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Placeholders used in title or body that are not part of the `Token` registry
    pub fn unknown_tokens(&self) -> Vec<String> {
        placeholders(&self.title)
            .into_iter()
            .chain(placeholders(&self.body))
            .filter(|name| Token::from_name(name).is_none())
            .unique()
            .map(String::from)
            .collect()
    }
}

/// Replaces every known token that has a value in `context`. Anything else
/// is left verbatim in the output.
pub fn render(template: &MessageTemplate, context: &TemplateContext) -> MessageTemplate {
    MessageTemplate {
        title: render_text(&template.title, context),
        body: render_text(&template.body, context),
    }
}

fn render_text(text: &str, context: &TemplateContext) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(|c: char| c == ']' || c == '[') {
            Some(end) if after.as_bytes()[end] == b']' => {
                let name = &after[..end];
                match Token::from_name(name).and_then(|t| context.get(&t)) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('[');
                        out.push_str(name);
                        out.push(']');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn placeholders(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        match after.find(|c: char| c == ']' || c == '[') {
            Some(end) if after.as_bytes()[end] == b']' => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            _ => rest = after,
        }
    }
    names
}
