//! Comment formatting shared by the plugins.

use crate::webhooks::Comment;

const ABOUT_THIS_BOT: &str = "Instructions for interacting with me using comments are available \
at the `/plugin-help` endpoint of this hook.";

/// A reply addressed to `to`, with a collapsed footer explaining how to use
/// the bot.
pub fn format_response(to: &str, message: &str, reason: &str) -> String {
    format!(
        "@{to}: {message}\n\n<details>\n\n{reason}\n\n{ABOUT_THIS_BOT}\n</details>"
    )
}

/// A reply to a specific comment: quotes its body and links to it.
pub fn format_quoted_response(comment: &Comment, message: &str) -> String {
    let quoted = comment
        .body
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let reason = format!("In response to [this]({}):\n\n{quoted}", comment.html_url);
    format_response(&comment.author, message, &reason)
}

/// `a, b and c` style list of code-quoted values.
pub fn code_list<S: AsRef<str>>(values: &[S]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("`{}`", v.as_ref())).collect();
    match quoted.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}
