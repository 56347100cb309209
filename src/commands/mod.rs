//! Slash-command parsing for comment text.
//!
//! Plugins describe the commands they accept as a [`Grammar`]; the parser
//! turns a comment into every matching [`Command`], one per line.
//!
//! # Example
//!
//! ```
//! use chatops_hook::commands::{parse_commands, Arity, Grammar};
//!
//! let grammar = Grammar::new().with("reopen", Arity::None);
//! assert_eq!(parse_commands("/reopen", &grammar)[0].verb, "reopen");
//! assert!(parse_commands("no commands here", &grammar).is_empty());
//! ```

mod parser;
mod types;

pub use parser::parse_commands;
pub use types::{Arity, Command, CommandPattern, Grammar};
