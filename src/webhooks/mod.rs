//! Webhook validation and decoding.
//!
//! - [`signature`]: HMAC-SHA256 check of the raw body
//! - [`events`]: the typed [`Event`] union plugins consume
//! - [`parser`]: payload decoding keyed by `X-GitHub-Event`

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{
    Comment, Event, EventKind, IssueAction, IssueEvent, NoteAction, NoteEvent, PullRequestAction,
    PullRequestEvent, PushEvent, ReviewAction, ReviewEvent, ReviewState, StatusEvent, StatusState,
};
pub use parser::{ParseError, parse_webhook};
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
};
