//! Parser for slash commands in comment text.
//!
//! Pure: no I/O, no API calls. Everything a plugin needs to act on is in the
//! returned [`Command`] list.

use super::types::{Command, Grammar};

/// Extracts every command in `text` that matches `grammar`.
///
/// # Parsing Rules
///
/// - One command per line; the line (after trimming) must start with `/`
/// - The command name is the first token and matches case-insensitively
/// - Remaining whitespace-separated tokens are the arguments
/// - A line whose argument count does not fit the pattern's arity is ignored
/// - Commands are returned in the order they appear
///
/// # Examples
///
/// ```
/// use chatops_hook::commands::{parse_commands, Arity, Grammar};
///
/// let grammar = Grammar::new()
///     .with("close", Arity::None)
///     .with("add-collaborator", Arity::Optional);
///
/// let cmds = parse_commands("LGTM!\n/add-collaborator alice @bob\n/close", &grammar);
/// assert_eq!(cmds.len(), 2);
/// assert_eq!(cmds[0].verb, "add");
/// assert_eq!(cmds[0].qualifier.as_deref(), Some("collaborator"));
/// assert_eq!(cmds[0].args, vec!["alice", "@bob"]);
/// assert_eq!(cmds[1].name(), "close");
///
/// // Text that only mentions a command is not one.
/// assert!(parse_commands("please /close this", &grammar).is_empty());
/// ```
pub fn parse_commands(text: &str, grammar: &Grammar) -> Vec<Command> {
    text.lines()
        .filter_map(|line| parse_line(line, grammar))
        .collect()
}

/// Parses a single line, returning `None` unless it is a command in `grammar`.
fn parse_line(line: &str, grammar: &Grammar) -> Option<Command> {
    let body = line.trim().strip_prefix('/')?;
    let (name, rest) = split_first_word(body);
    if name.is_empty() {
        return None;
    }

    let pattern = grammar.lookup(name)?;
    let args: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
    if !pattern.arity.accepts(args.len()) {
        return None;
    }

    let (verb, qualifier) = split_name(&pattern.name);
    Some(Command {
        verb: verb.to_string(),
        qualifier: qualifier.map(str::to_string),
        args,
    })
}

/// Splits `remove-kind` into (`remove`, `Some("kind")`).
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once('-') {
        Some((verb, qualifier)) if !qualifier.is_empty() => (verb, Some(qualifier)),
        _ => (name.trim_end_matches('-'), None),
    }
}

/// Splits text at the first whitespace, returning (word, rest).
/// If no whitespace, returns (text, "").
fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(|c: char| c.is_whitespace()) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Arity;
    use proptest::prelude::*;

    fn label_grammar() -> Grammar {
        Grammar::new()
            .with("kind", Arity::Required)
            .with("remove-kind", Arity::Required)
            .with("close", Arity::None)
            .with("add-collaborator", Arity::Optional)
    }

    #[test]
    fn parses_required_argument() {
        let cmds = parse_commands("/kind bug", &label_grammar());
        assert_eq!(
            cmds,
            vec![Command {
                verb: "kind".to_string(),
                qualifier: None,
                args: vec!["bug".to_string()],
            }]
        );
    }

    #[test]
    fn qualifier_split_at_first_dash() {
        let cmds = parse_commands("/remove-kind bug feature", &label_grammar());
        assert_eq!(cmds[0].verb, "remove");
        assert_eq!(cmds[0].qualifier.as_deref(), Some("kind"));
        assert_eq!(cmds[0].args, vec!["bug", "feature"]);
    }

    #[test]
    fn names_match_case_insensitively() {
        let cmds = parse_commands("/CLOSE", &label_grammar());
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].verb, "close");
    }

    #[test]
    fn arguments_keep_their_case() {
        let cmds = parse_commands("/add-collaborator @Alice", &label_grammar());
        assert_eq!(cmds[0].args, vec!["@Alice"]);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let cmds = parse_commands("   /close   \r\n\t/kind   bug  ", &label_grammar());
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1].args, vec!["bug"]);
    }

    #[test]
    fn no_argument_form_rejects_trailing_text() {
        assert!(parse_commands("/close now please", &label_grammar()).is_empty());
    }

    #[test]
    fn required_argument_missing_is_not_a_command() {
        assert!(parse_commands("/kind", &label_grammar()).is_empty());
    }

    #[test]
    fn optional_arguments_may_be_absent() {
        let cmds = parse_commands("/add-collaborator", &label_grammar());
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].args.is_empty());
    }

    #[test]
    fn all_matching_lines_are_returned_in_order() {
        let text = "/kind bug\nsome prose\n/close\n/kind feature";
        let names: Vec<_> = parse_commands(text, &label_grammar())
            .iter()
            .map(|c| c.args.first().cloned().unwrap_or_else(|| c.name()))
            .collect();
        assert_eq!(names, vec!["bug", "close", "feature"]);
    }

    #[test]
    fn unknown_commands_and_mid_line_slashes_are_skipped() {
        let text = "/lgtm\nsee /kind bug\nhttps://example.com/close";
        assert!(parse_commands(text, &label_grammar()).is_empty());
    }

    #[test]
    fn prefix_of_a_name_does_not_match() {
        assert!(parse_commands("/closed", &label_grammar()).is_empty());
        assert!(parse_commands("/kinds bug", &label_grammar()).is_empty());
    }

    #[test]
    fn bare_slash_is_not_a_command() {
        assert!(parse_commands("/\n/ close", &label_grammar()).is_empty());
    }

    #[test]
    fn split_name_variants() {
        assert_eq!(split_name("close"), ("close", None));
        assert_eq!(split_name("check-pr"), ("check", Some("pr")));
        assert_eq!(split_name("a-b-c"), ("a", Some("b-c")));
    }

    proptest! {
        #[test]
        fn arbitrary_text_never_panics(text: String) {
            let _ = parse_commands(&text, &label_grammar());
        }

        /// Text with no line starting with `/` yields nothing.
        #[test]
        fn no_command_shaped_lines_parse_empty(
            lines in prop::collection::vec("[a-zA-Z0-9 ,.!?@#-]{0,40}", 0..8)
        ) {
            let text = lines.join("\n");
            prop_assume!(text.lines().all(|l| !l.trim_start().starts_with('/')));
            prop_assert!(parse_commands(&text, &label_grammar()).is_empty());
        }

        #[test]
        fn parsed_verbs_are_lowercase(
            name in prop::sample::select(vec!["kind", "remove-kind", "close", "add-collaborator"]),
            upper in any::<bool>(),
        ) {
            let written = if upper { name.to_ascii_uppercase() } else { name.to_string() };
            let line = if name == "close" || name == "add-collaborator" {
                format!("/{written}")
            } else {
                format!("/{written} x")
            };
            let cmds = parse_commands(&line, &label_grammar());
            prop_assert_eq!(cmds.len(), 1);
            prop_assert_eq!(cmds[0].name(), name);
        }
    }
}
