//! Prompt template parsing and rendering.
//!
//! Templates are literal text with `{{variable}}` placeholders and
//! `{{#each path}}...{{/each}}` loops over array bindings. Variables are
//! dotted paths into a `serde_json::Value` binding object; `.` names the
//! current element inside a loop.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::multispace0,
    combinator::map,
    multi::many0,
    sequence::{delimited, preceded, terminated},
    IResult,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    Variable(String),
    EachLoop {
        path: String,
        body: Vec<TemplateSegment>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptError {
    Malformed(String),
    UnboundVariable(String),
    NotAList(String),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "malformed prompt template: {}", detail),
            Self::UnboundVariable(name) => write!(f, "unbound template variable: {}", name),
            Self::NotAList(name) => write!(f, "template loop over non-array binding: {}", name),
        }
    }
}

impl std::error::Error for PromptError {}

fn parse_variable(input: &str) -> IResult<&str, TemplateSegment> {
    let var_parser = delimited(
        tag("{{"),
        preceded(multispace0, terminated(take_until("}}"), multispace0)),
        tag("}}"),
    );
    map(var_parser, |var: &str| {
        TemplateSegment::Variable(var.trim().to_string())
    })(input)
}

fn parse_each_loop(input: &str) -> IResult<&str, TemplateSegment> {
    let (input, _) = tag("{{")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("#each")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, path) = take_until("}}")(input)?;
    let (input, _) = tag("}}")(input)?;
    let (input, body) = take_until("{{/each}}")(input)?;
    let (input, _) = tag("{{/each}}")(input)?;

    let (_, body_segments) = parse_segments(body)?;
    Ok((
        input,
        TemplateSegment::EachLoop {
            path: path.trim().to_string(),
            body: body_segments,
        },
    ))
}

fn parse_text(input: &str) -> IResult<&str, TemplateSegment> {
    if input.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeUntil,
        )));
    }
    match take_until::<_, _, nom::error::Error<&str>>("{{")(input) {
        Ok((_, "")) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeUntil,
        ))),
        Ok((rest, text)) => Ok((rest, TemplateSegment::Text(text.to_string()))),
        // no opener left: the remainder is all literal text
        Err(_) => Ok(("", TemplateSegment::Text(input.to_string()))),
    }
}

fn parse_segments(input: &str) -> IResult<&str, Vec<TemplateSegment>> {
    many0(alt((parse_each_loop, parse_variable, parse_text)))(input)
}

fn lookup<'a>(bindings: &'a Value, path: &str) -> Option<&'a Value> {
    if path == "." {
        return Some(bindings);
    }
    let mut current = bindings;
    for part in path.split('.').map(str::trim).filter(|p| !p.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<TemplateSegment>,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self, PromptError> {
        let (rest, segments) =
            parse_segments(source).map_err(|e| PromptError::Malformed(e.to_string()))?;
        if !rest.is_empty() {
            return Err(PromptError::Malformed(format!(
                "unparsed trailing input: {:?}",
                rest
            )));
        }
        Ok(Self { segments })
    }

    /// The built-in tool-calling template used by the request pipeline.
    pub fn builtin() -> Self {
        static BUILTIN: Lazy<PromptTemplate> = Lazy::new(|| {
            PromptTemplate::parse(DEFAULT_TEMPLATE).expect("built-in prompt template is well-formed")
        });
        BUILTIN.clone()
    }

    pub fn render(&self, bindings: &Value) -> Result<String, PromptError> {
        let mut out = String::new();
        render_segments(&self.segments, bindings, &mut out)?;
        Ok(out)
    }

    /// Bind the standard pipeline variables and render.
    pub fn render_request(&self, query: &str, snippets: &[String]) -> Result<String, PromptError> {
        self.render(&json!({
            "user_query": query,
            "snippets": snippets,
        }))
    }
}

fn render_segments(
    segments: &[TemplateSegment],
    bindings: &Value,
    out: &mut String,
) -> Result<(), PromptError> {
    for segment in segments {
        match segment {
            TemplateSegment::Text(text) => out.push_str(text),
            TemplateSegment::Variable(name) => {
                let value = lookup(bindings, name)
                    .ok_or_else(|| PromptError::UnboundVariable(name.clone()))?;
                out.push_str(&stringify(value));
            }
            TemplateSegment::EachLoop { path, body } => {
                let value =
                    lookup(bindings, path).ok_or_else(|| PromptError::UnboundVariable(path.clone()))?;
                let items = value
                    .as_array()
                    .ok_or_else(|| PromptError::NotAList(path.clone()))?;
                for item in items {
                    render_segments(body, item, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Mirrors the record shapes the schema actually accepts; drift here shows
/// up as validation failures downstream, not errors.
const DEFAULT_TEMPLATE: &str = r#"You are an assistant that converts a user request into one configuration record as JSON.

Record shapes:

1) cluster
   - short_name { "name": string }
   - frequency { "value": number, "unit": "MHz" }
   - cores_per_cluster: 1 | 2 | 4 | 8 | 16

2) chiplet
   - short_name { "name": string }
   - axi_bus { "width": integer, "frequency": integer }
   - ethernet_interface { "mode": "simulated" | "native" }
   - ucie_interface { "mode": "host" | "endpoint" }
   Optional: cpu_cluster, power_parameters

Rules:
- Output ONLY one JSON object, no prose, no comments.

Schema context:
{{#each snippets}}---
{{.}}
{{/each}}
User request:
"""{{user_query}}"""

Return exactly one JSON object.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_variable_and_loop() {
        let template = "Hello {{user.name}}! {{#each hobbies}}* {{.}}{{/each}}";
        let parsed = PromptTemplate::parse(template).unwrap();
        assert_eq!(
            parsed.segments,
            vec![
                TemplateSegment::Text("Hello ".to_string()),
                TemplateSegment::Variable("user.name".to_string()),
                TemplateSegment::Text("! ".to_string()),
                TemplateSegment::EachLoop {
                    path: "hobbies".to_string(),
                    body: vec![
                        TemplateSegment::Text("* ".to_string()),
                        TemplateSegment::Variable(".".to_string()),
                    ],
                },
            ]
        );
    }

    #[test]
    fn trailing_text_is_kept() {
        let parsed = PromptTemplate::parse("a {{x}} b").unwrap();
        let out = parsed.render(&json!({ "x": 1 })).unwrap();
        assert_eq!(out, "a 1 b");
    }

    #[test]
    fn renders_nested_paths_and_loops() {
        let parsed = PromptTemplate::parse("{{user.name}}: {{#each items}}[{{.}}]{{/each}}").unwrap();
        let out = parsed
            .render(&json!({ "user": { "name": "amr" }, "items": ["a", "b"] }))
            .unwrap();
        assert_eq!(out, "amr: [a][b]");
    }

    #[test]
    fn unbound_variable_is_an_error() {
        let parsed = PromptTemplate::parse("{{missing}}").unwrap();
        assert_eq!(
            parsed.render(&json!({})),
            Err(PromptError::UnboundVariable("missing".to_string()))
        );
    }

    #[test]
    fn loop_over_non_array_is_an_error() {
        let parsed = PromptTemplate::parse("{{#each x}}{{.}}{{/each}}").unwrap();
        assert_eq!(
            parsed.render(&json!({ "x": 3 })),
            Err(PromptError::NotAList("x".to_string()))
        );
    }

    #[test]
    fn builtin_template_renders_query_and_snippets() {
        let prompt = PromptTemplate::builtin()
            .render_request(
                "Create a CPU cluster named C1.",
                &["cluster: short_name, frequency".to_string()],
            )
            .unwrap();
        assert!(prompt.contains("Create a CPU cluster named C1."));
        assert!(prompt.contains("cluster: short_name, frequency"));
        assert!(prompt.contains("Output ONLY one JSON object"));
    }
}
