//! Template engine for migration files.
//!
//! Supports the subset of Go `text/template` syntax migration files use:
//!
//! ```text
//! {{.Env}}            field lookup
//! {{ .Env }}          spaces inside the delimiters are ignored
//! {{- .Env -}}        trim whitespace before / after the action
//! {{/* comment */}}   dropped from the output
//! ```
//!
//! Anything else between `{{` and `}}` is a syntax error.

use std::collections::BTreeMap;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt},
    sequence::{delimited, preceded, terminated},
};

use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Field { name: String, line: usize },
}

#[derive(Debug, PartialEq, Eq)]
enum ActionBody<'a> {
    Field(&'a str),
    Comment,
}

#[derive(Debug, PartialEq, Eq)]
struct Action<'a> {
    trim_left: bool,
    body: ActionBody<'a>,
    trim_right: bool,
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template text.
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let mut nodes = Vec::new();
        let mut rest = src;
        let mut trim_next = false;

        while !rest.is_empty() {
            let Some(start) = rest.find("{{") else {
                push_text(&mut nodes, rest, trim_next, false);
                break;
            };

            let (text, action_src) = rest.split_at(start);
            let line = line_of(src, src.len() - action_src.len());

            let (after, action) = match parse_action(action_src) {
                Ok(parsed) => parsed,
                Err(_) => return Err(syntax_error(action_src, line)),
            };

            // A trim marker only reaches the text between this action and the previous one.
            push_text(&mut nodes, text, trim_next, action.trim_left);
            if let ActionBody::Field(name) = action.body {
                nodes.push(Node::Field {
                    name: name.to_string(),
                    line,
                });
            }

            trim_next = action.trim_right;
            rest = after;
        }

        Ok(Self { nodes })
    }

    /// Substitute variables. Unknown variables are an error.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field { name, line } => {
                    let value = vars.get(name).ok_or_else(|| TemplateError::MissingVariable {
                        line: *line,
                        name: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool, trim_end: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    let text = if trim_end { text.trim_end() } else { text };
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn line_of(src: &str, offset: usize) -> usize {
    src[..offset].matches('\n').count() + 1
}

fn syntax_error(action_src: &str, line: usize) -> TemplateError {
    let message = match action_src.find("}}") {
        None => "unclosed action".to_string(),
        Some(end) => format!(
            "unsupported action \"{}\", expected {{{{.Name}}}}",
            &action_src[..end + 2]
        ),
    };
    TemplateError::Syntax { line, message }
}

/// `{{` [`-` ws] ws* body [ws `-`] ws* `}}`
fn parse_action(input: &str) -> IResult<&str, Action<'_>> {
    let (input, _) = tag("{{")(input)?;
    let (input, trim_left) = map(opt(terminated(char('-'), multispace1)), |o| o.is_some())(input)?;
    let (input, _) = multispace0(input)?;
    let (input, body) = alt((parse_comment, parse_field))(input)?;
    let (input, trim_right) = map(opt(preceded(multispace1, char('-'))), |o| o.is_some())(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("}}")(input)?;

    Ok((
        input,
        Action {
            trim_left,
            body,
            trim_right,
        },
    ))
}

/// `.Name`
fn parse_field(input: &str) -> IResult<&str, ActionBody<'_>> {
    map(
        preceded(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        ),
        ActionBody::Field,
    )(input)
}

/// `/* ... */`
fn parse_comment(input: &str) -> IResult<&str, ActionBody<'_>> {
    map(delimited(tag("/*"), take_until("*/"), tag("*/")), |_| {
        ActionBody::Comment
    })(input)
}
