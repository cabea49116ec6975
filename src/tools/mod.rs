//! MCP tool definitions and registry.

pub mod calculator;
pub mod greeting;
pub mod help;
pub mod registry;
pub mod text;

pub use calculator::{ArithmeticTool, Operation};
pub use greeting::GreetingTool;
pub use help::HelpTool;
pub use registry::{ToolContext, ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};
pub use text::{TextOperation, TextTool};

use crate::error::ToolResult;

/// Create and register all tools.
pub fn create_registry() -> ToolResult<ToolRegistry> {
    let mut builder = ToolRegistry::builder();

    // Calculator tools
    for tool in ArithmeticTool::all() {
        builder.register(tool)?;
    }

    // String tools
    for tool in TextTool::all() {
        builder.register(tool)?;
    }

    builder.register(GreetingTool)?.register(HelpTool)?;

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_registry() {
        let registry = create_registry().unwrap();
        let names: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "add", "subtract", "multiply", "divide", "to_upper", "to_lower", "reverse",
                "say_hello", "help"
            ]
        );
    }
}
