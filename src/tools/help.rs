//! `help`: describes the registered tools.

use crate::define_tool;
use crate::error::ToolResult;
use crate::protocol::Tool;
use crate::tools::registry::{ToolContext, ToolHandler, ToolOutput, parse_arguments};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const HELP_TOOL_NAME: &str = "help";

#[derive(Debug, Default, Deserialize)]
pub struct HelpArgs {
    #[serde(default)]
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Calculator,
    Text,
    Other,
}

impl Category {
    fn of(name: &str) -> Self {
        match name {
            "add" | "subtract" | "multiply" | "divide" => Self::Calculator,
            "to_upper" | "to_lower" | "reverse" => Self::Text,
            _ => Self::Other,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::Calculator => "## 🧮 Calculator",
            Self::Text => "## 📝 Text",
            Self::Other => "## 🛠️ Other",
        }
    }
}

pub struct HelpTool;

fn describe(tool: &Tool) -> String {
    let mut out = format!("🔧 **{}**\n", tool.name);
    if let Some(description) = &tool.description {
        out.push_str(&format!("Description: {}\n", description));
    }
    out
}

/// Overview of every tool except `help`, grouped by category.
pub fn overview(catalog: &[Tool]) -> String {
    let mut out = String::from("# MCP Lambda Gateway\n\nThis server provides the following tools:\n\n");

    let listed: Vec<&Tool> = catalog.iter().filter(|t| t.name != HELP_TOOL_NAME).collect();

    for category in [Category::Calculator, Category::Text, Category::Other] {
        let tools: Vec<&&Tool> = listed
            .iter()
            .filter(|t| Category::of(&t.name) == category)
            .collect();
        if tools.is_empty() {
            continue;
        }

        out.push_str(category.heading());
        out.push('\n');
        for tool in tools {
            out.push_str(&format!(
                "- **{}**: {}\n",
                tool.name,
                tool.description.as_deref().unwrap_or_default()
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!("\n{} tools available.\n", listed.len()));
    out.push_str("\nPass tool_name to see details for a single tool.");
    out
}

#[async_trait]
impl ToolHandler for HelpTool {
    fn definition(&self) -> Tool {
        define_tool! {
            name: HELP_TOOL_NAME,
            description: "Explain what this server can do",
            schema: {
                "type": "object",
                "properties": {
                    "tool_name": {
                        "type": "string",
                        "description": "Optional: specific tool name to get details about"
                    }
                }
            }
        }
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: HelpArgs = parse_arguments(arguments)?;

        let text = match args.tool_name.filter(|n| !n.is_empty()) {
            Some(name) => match ctx.catalog.iter().find(|t| t.name == name) {
                Some(tool) => describe(tool),
                None => format!("Tool '{}' not found.\n", name),
            },
            None => overview(&ctx.catalog),
        };

        Ok(ToolOutput::new(text.clone()).with("result", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::calculator::ArithmeticTool;
    use crate::tools::greeting::GreetingTool;
    use crate::tools::text::TextTool;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        let mut catalog: Vec<Tool> = ArithmeticTool::all().iter().map(|t| t.definition()).collect();
        catalog.extend(TextTool::all().iter().map(|t| t.definition()));
        catalog.push(GreetingTool.definition());
        catalog.push(HelpTool.definition());
        ToolContext::detached(Arc::from(catalog))
    }

    #[test]
    fn test_overview_layout() {
        let catalog = [
            define_tool! { name: "add", description: "Add numbers", schema: {} },
            define_tool! { name: "say_hello", description: "Greet", schema: {} },
            HelpTool.definition(),
        ];

        assert_eq!(
            overview(&catalog),
            "# MCP Lambda Gateway\n\nThis server provides the following tools:\n\n\
             ## 🧮 Calculator\n- **add**: Add numbers\n\n\
             ## 🛠️ Other\n- **say_hello**: Greet\n\n\
             \n2 tools available.\n\
             \nPass tool_name to see details for a single tool."
        );
        assert_eq!(describe(&catalog[0]), "🔧 **add**\nDescription: Add numbers\n");
    }

    #[tokio::test]
    async fn test_overview_groups_and_counts() {
        let out = HelpTool.execute(json!({}), &ctx()).await.unwrap();
        assert!(out.content.contains("## 🧮 Calculator"));
        assert!(out.content.contains("## 📝 Text"));
        assert!(out.content.contains("- **say_hello**"));
        assert!(!out.content.contains("- **help**"));
        assert!(out.content.contains("8 tools available."));
        assert_eq!(out.metadata["result"], json!(out.content));

        let calc = out.content.find("Calculator").unwrap();
        let text = out.content.find("## 📝 Text").unwrap();
        assert!(calc < text);
    }

    #[tokio::test]
    async fn test_single_tool() {
        let out = HelpTool
            .execute(json!({"tool_name": "add"}), &ctx())
            .await
            .unwrap();
        assert!(out.content.starts_with("🔧 **add**"));
        assert!(out.content.contains("Add two numbers"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let out = HelpTool
            .execute(json!({"tool_name": "nonexistent"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out.content, "Tool 'nonexistent' not found.\n");
    }
}
