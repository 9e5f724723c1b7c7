use crate::error::{BuildError, Result};
use std::fmt;

/// Split a shell-like options string into arguments, honoring quotes.
pub fn tokenize(options: &str) -> Result<Vec<String>> {
    shlex::split(options).ok_or_else(|| BuildError::InvalidBuildOptions(options.to_string()))
}

/// A fully assembled tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Program followed by its arguments.
    pub fn tokens(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match shlex::try_join(self.tokens()) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => f.write_str(&self.tokens().join(" ")),
        }
    }
}

/// Puts the tool path in front of the tokenized options.
pub struct CommandLineBuilder {
    tool_path: String,
}

impl CommandLineBuilder {
    /// Fails fast when no tool path is configured.
    pub fn new(tool_path: &str) -> Result<Self> {
        let tool_path = tool_path.trim();
        if tool_path.is_empty() {
            return Err(BuildError::ToolPathNotConfigured);
        }
        Ok(Self {
            tool_path: tool_path.to_string(),
        })
    }

    pub fn build(&self, options: &str, extra_args: &[String]) -> Result<CommandLine> {
        let mut args = tokenize(options)?;
        args.extend(extra_args.iter().cloned());
        Ok(CommandLine {
            program: self.tool_path.clone(),
            args,
        })
    }
}
