//! Command registry and line tokenizer.

use std::sync::Arc;

use vtty_types::{Result, VttyError};

use crate::command::CommandDescriptor;

/// Bound commands in insertion order, keyed by unique name.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. Fails if the name is already bound.
    pub fn bind(&mut self, descriptor: CommandDescriptor) -> Result<()> {
        if self.contains(descriptor.name()) {
            return Err(VttyError::DuplicateCommand(descriptor.name().to_string()));
        }
        self.commands.push(Arc::new(descriptor));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<CommandDescriptor>> {
        let pos = self.commands.iter().position(|d| d.name() == name)?;
        Some(self.commands.remove(pos))
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.iter().find(|d| d.name() == name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.iter().any(|d| d.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Split a command line into arguments.
///
/// Whitespace separates arguments outside quotes. `'...'` and `"..."` group
/// text and are stripped; inside one kind of quote the other is literal. A
/// closing quote always ends the argument, so `""` yields an empty one, and
/// an opening quote after unquoted text starts a new argument. An
/// unterminated quote runs to the end of the line.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                tokens.push(std::mem::take(&mut current));
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            (None, c) => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
