//! Grammar and command types for slash commands.

use serde::Serialize;

/// How many arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// `/close`: any trailing text disqualifies the line.
    None,
    /// `/add-collaborator [@user...]`
    Optional,
    /// `/kind <value...>`
    Required,
}

impl Arity {
    pub fn accepts(self, arg_count: usize) -> bool {
        match self {
            Arity::None => arg_count == 0,
            Arity::Optional => true,
            Arity::Required => arg_count > 0,
        }
    }
}

/// One recognised command name, e.g. `remove-kind`, written without the slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPattern {
    pub name: String,
    pub arity: Arity,
}

impl CommandPattern {
    pub fn new(name: impl Into<String>, arity: Arity) -> Self {
        CommandPattern {
            name: name.into().to_ascii_lowercase(),
            arity,
        }
    }
}

/// The set of commands a plugin listens for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grammar {
    patterns: Vec<CommandPattern>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern; later duplicates of a name are ignored.
    pub fn with(mut self, name: impl Into<String>, arity: Arity) -> Self {
        let pattern = CommandPattern::new(name, arity);
        if self.lookup(&pattern.name).is_none() {
            self.patterns.push(pattern);
        }
        self
    }

    /// Case-insensitive lookup by command name.
    pub fn lookup(&self, name: &str) -> Option<&CommandPattern> {
        self.patterns
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn patterns(&self) -> &[CommandPattern] {
        &self.patterns
    }
}

/// A command recognised in comment text.
///
/// `/remove-kind bug` parses to verb `remove`, qualifier `kind`, args `["bug"]`.
/// Verb and qualifier are lowercase; args are the verbatim tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub verb: String,
    pub qualifier: Option<String>,
    pub args: Vec<String>,
}

impl Command {
    /// The command name as written in the grammar (`verb-qualifier`).
    pub fn name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}-{}", self.verb, q),
            None => self.verb.clone(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_accepts() {
        assert!(Arity::None.accepts(0));
        assert!(!Arity::None.accepts(1));
        assert!(Arity::Optional.accepts(0));
        assert!(Arity::Optional.accepts(3));
        assert!(!Arity::Required.accepts(0));
        assert!(Arity::Required.accepts(1));
    }

    #[test]
    fn grammar_lookup_is_case_insensitive() {
        let grammar = Grammar::new().with("Remove-Kind", Arity::Required);
        assert!(grammar.lookup("remove-kind").is_some());
        assert!(grammar.lookup("REMOVE-KIND").is_some());
        assert!(grammar.lookup("remove").is_none());
    }

    #[test]
    fn duplicate_pattern_keeps_first() {
        let grammar = Grammar::new()
            .with("close", Arity::None)
            .with("close", Arity::Required);
        assert_eq!(grammar.patterns().len(), 1);
        assert_eq!(grammar.lookup("close").unwrap().arity, Arity::None);
    }

    #[test]
    fn command_name_joins_qualifier() {
        let cmd = Command {
            verb: "add".to_string(),
            qualifier: Some("collaborator".to_string()),
            args: vec![],
        };
        assert_eq!(cmd.name(), "add-collaborator");
        assert!(cmd.is("Add-Collaborator"));
    }
}
