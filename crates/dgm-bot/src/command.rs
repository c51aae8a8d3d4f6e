//! Parsing prefixed chat messages into commands.

/// A recognized bot command with its raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show a show by its site id.
    Id(String),
    Search(String),
    Next,
    /// Select a result by its number in the list.
    Select(String),
    Tracks,
    /// `members`, or its alias `lineup`.
    Lineup,
    Help,
}

/// Parse `text` if it starts with `prefix` and names a known command.
///
/// The remainder after the prefix is split on whitespace; the first token
/// is the command and the rest, joined by single spaces, its argument.
/// Returns `None` for unprefixed text and unknown commands.
pub fn parse(prefix: &str, text: &str) -> Option<Command> {
    let rest = text.strip_prefix(prefix)?;

    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?;
    let arg = tokens.collect::<Vec<_>>().join(" ");

    let command = match name {
        "id" => Command::Id(arg),
        "search" => Command::Search(arg),
        "next" => Command::Next,
        "select" => Command::Select(arg),
        "tracks" => Command::Tracks,
        "members" | "lineup" => Command::Lineup,
        "help" => Command::Help,
        _ => return None,
    };
    Some(command)
}
