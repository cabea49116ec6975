//! `say_hello`: a greeting in English or Korean.

use crate::define_tool;
use crate::error::ToolResult;
use crate::protocol::Tool;
use crate::tools::registry::{ToolContext, ToolHandler, ToolOutput, parse_arguments};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_LANGUAGE: &str = "ko";
const DEFAULT_NAME: &str = "친구";

#[derive(Debug, Default, Deserialize)]
pub struct GreetingArgs {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

pub struct GreetingTool;

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Build the greeting for a language code. Unknown codes get a casual form.
pub fn greet(name: &str, language: &str) -> String {
    match language {
        "ko" => format!("안녕하세요, {}님! 👋", name),
        "en" => format!("Hello, {}! 👋", name),
        _ => format!("ㅎㅇ {}! 👋", name),
    }
}

#[async_trait]
impl ToolHandler for GreetingTool {
    fn definition(&self) -> Tool {
        define_tool! {
            name: "say_hello",
            description: "Say hello in English (en) or Korean (ko)",
            schema: {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "the name to greet (optional)" },
                    "language": {
                        "type": "string",
                        "description": "greeting language: 'en' for English, 'ko' for Korean (default: 'ko')"
                    }
                }
            }
        }
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: GreetingArgs = parse_arguments(arguments)?;
        let language = non_empty(args.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let name = non_empty(args.name).unwrap_or_else(|| DEFAULT_NAME.to_string());

        let greeting = greet(&name, &language);

        Ok(ToolOutput::new(greeting.clone())
            .with("greeting", greeting)
            .with("name", name)
            .with("language", language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    async fn run(arguments: Value) -> ToolOutput {
        let ctx = ToolContext::detached(Arc::from(Vec::<Tool>::new()));
        GreetingTool.execute(arguments, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_default_language_and_name() {
        let out = run(Value::Null).await;
        assert_eq!(out.content, "안녕하세요, 친구님! 👋");
        assert_eq!(out.metadata["greeting"], "안녕하세요, 친구님! 👋");
        assert_eq!(out.metadata["language"], "ko");
        assert_eq!(out.metadata["name"], "친구");

        let out = run(json!({})).await;
        assert_eq!(out.content, "안녕하세요, 친구님! 👋");
    }

    #[tokio::test]
    async fn test_english_without_name_keeps_default_name() {
        let out = run(json!({"language": "en"})).await;
        assert_eq!(out.content, "Hello, 친구! 👋");
        assert_eq!(out.metadata["name"], "친구");
    }

    #[tokio::test]
    async fn test_named_english() {
        let out = run(json!({"name": "John", "language": "en"})).await;
        assert_eq!(out.content, "Hello, John! 👋");
        assert_eq!(out.metadata["greeting"], "Hello, John! 👋");
    }

    #[tokio::test]
    async fn test_korean() {
        let out = run(json!({"name": "철수", "language": "ko"})).await;
        assert_eq!(out.content, "안녕하세요, 철수님! 👋");

        let out = run(json!({"language": "ko"})).await;
        assert_eq!(out.content, "안녕하세요, 친구님! 👋");
        assert_eq!(out.metadata["name"], "친구");
    }

    #[tokio::test]
    async fn test_unknown_language_is_casual() {
        let out = run(json!({"name": "Sam", "language": "fr"})).await;
        assert_eq!(out.content, "ㅎㅇ Sam! 👋");
        assert_eq!(out.metadata["language"], "fr");
    }
}
