//! Arithmetic tools.

use crate::define_tool;
use crate::error::{ToolError, ToolResult};
use crate::protocol::Tool;
use crate::tools::registry::{ToolContext, ToolHandler, ToolOutput, parse_arguments};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Number, Value};

#[derive(Debug, Deserialize)]
pub struct BinaryArgs {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "/",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Add => "Add two numbers",
            Self::Subtract => "Subtract the second number from the first",
            Self::Multiply => "Multiply two numbers",
            Self::Divide => "Divide the first number by the second",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> ToolResult<f64> {
        let result = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => {
                if b == 0.0 {
                    return Err(ToolError::ExecutionFailed("division by zero".into()));
                }
                a / b
            }
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(ToolError::ExecutionFailed(format!(
                "{} overflowed",
                self.name()
            )))
        }
    }
}

/// One of the four binary arithmetic tools.
pub struct ArithmeticTool {
    op: Operation,
}

impl ArithmeticTool {
    pub fn new(op: Operation) -> Self {
        Self { op }
    }

    pub fn all() -> [Self; 4] {
        [
            Self::new(Operation::Add),
            Self::new(Operation::Subtract),
            Self::new(Operation::Multiply),
            Self::new(Operation::Divide),
        ]
    }
}

#[async_trait]
impl ToolHandler for ArithmeticTool {
    fn definition(&self) -> Tool {
        define_tool! {
            name: self.op.name(),
            description: self.op.description(),
            schema: {
                "type": "object",
                "properties": {
                    "a": { "type": "number", "description": "the first number" },
                    "b": { "type": "number", "description": "the second number" }
                },
                "required": ["a", "b"]
            }
        }
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: BinaryArgs = parse_arguments(arguments)?;
        let result = self.op.apply(args.a, args.b)?;

        Ok(ToolOutput::new(format!(
            "{} {} {} = {}",
            format_number(args.a),
            self.op.symbol(),
            format_number(args.b),
            format_number(result)
        ))
        .with("result", number_value(result)))
    }
}

/// Render integral values without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// JSON number, integral when the value is exactly integral.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
