//! String manipulation tools.

use crate::define_tool;
use crate::error::ToolResult;
use crate::protocol::Tool;
use crate::tools::registry::{ToolContext, ToolHandler, ToolOutput, parse_arguments};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct TextArgs {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperation {
    Upper,
    Lower,
    Reverse,
}

pub struct TextTool {
    op: TextOperation,
}

impl TextTool {
    pub fn new(op: TextOperation) -> Self {
        Self { op }
    }

    pub fn all() -> [Self; 3] {
        [
            Self::new(TextOperation::Upper),
            Self::new(TextOperation::Lower),
            Self::new(TextOperation::Reverse),
        ]
    }
}

#[async_trait]
impl ToolHandler for TextTool {
    fn definition(&self) -> Tool {
        let (name, description, field) = match self.op {
            TextOperation::Upper => ("to_upper", "Convert text to uppercase", "the text to convert"),
            TextOperation::Lower => ("to_lower", "Convert text to lowercase", "the text to convert"),
            TextOperation::Reverse => ("reverse", "Reverse the characters of a text", "the text to reverse"),
        };

        define_tool! {
            name: name,
            description: description,
            schema: {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": field }
                },
                "required": ["text"]
            }
        }
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: TextArgs = parse_arguments(arguments)?;

        let (content, result) = match self.op {
            TextOperation::Upper => {
                let result = args.text.to_uppercase();
                (format!("Result: {}", result), result)
            }
            TextOperation::Lower => {
                let result = args.text.to_lowercase();
                (format!("Result: {}", result), result)
            }
            TextOperation::Reverse => {
                let result: String = args.text.chars().rev().collect();
                (format!("Original: {} → Reversed: {}", args.text, result), result)
            }
        };

        Ok(ToolOutput::new(content).with("result", result))
    }
}
