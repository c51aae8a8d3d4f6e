//! Building embeds for results, shows, setlists and lineups.

use dgm_core::model::{Member, Show, Track};

use crate::reply::Embed;
use crate::session::Session;

/// Descriptions are cut at the first word boundary past this many
/// characters.
pub const DESCRIPTION_LIMIT: usize = 180;

const STAR: &str = "\u{2b50}";

/// One page of search results.
pub fn results_page(session: &Session) -> Embed {
    let title = format!(
        "Shows matching '{}' ({}/{})",
        session.query(),
        session.page() + 1,
        session.page_count()
    );

    let lines: Vec<String> = session
        .current_page()
        .map(|(index, show)| {
            format!(
                "[{}] **{}, {}** - {}",
                index, show.venue, show.location, show.date_friendly
            )
        })
        .collect();

    let total = session.total();
    Embed::new(title)
        .description(lines.join("\n"))
        .footer(format!(
            "{} {}",
            total,
            if total == 1 { "match" } else { "matches" }
        ))
}

/// A search that matched nothing.
pub fn no_results(query: &str) -> Embed {
    Embed::new(format!("No shows matching '{query}'"))
        .description("Try a venue, a city or a date such as \"12 Jun 1995\".")
}

/// Full details of one show.
pub fn show_detail(show: &Show, base_url: &str) -> Embed {
    let mut embed = Embed::new(show.title()).url(format!("{}{}", base_url, show.dgm_id));

    if let Some(description) = show.description.as_deref() {
        embed = embed.description(truncate_description(description));
    }
    if let Some(cover) = show.cover.as_deref() {
        embed = embed.thumbnail(cover);
    }

    embed = embed.field("Date", show.date_friendly.as_str());
    if let Some(rating) = show.quality_rating {
        embed = embed.field("Quality Rating", stars(rating));
    }
    if let Some(source) = show.source.as_deref() {
        embed = embed.field("Source", source);
    }
    embed.field("Has Download", if show.has_download { "Yes" } else { "No" })
}

/// The setlist of a show.
pub fn tracklist(show: &Show, tracks: &[Track]) -> Embed {
    let lines: Vec<String> = tracks
        .iter()
        .map(|track| {
            format!(
                "**{}.** {}  **[{}]**",
                track.number,
                track.name,
                format_length(track.length_secs)
            )
        })
        .collect();

    Embed::new(format!("{} - Setlist", show.title())).description(lines.join("\n"))
}

/// The lineup of a show.
pub fn lineup(show: &Show, members: &[Member]) -> Embed {
    let lines: Vec<String> = members
        .iter()
        .map(|member| format!("**{}**: {}", member.name, member.instrument_list()))
        .collect();

    Embed::new(format!("{} - Lineup", show.title())).description(lines.join("\n"))
}

/// The static command reference.
pub fn help(prefix: &str) -> Embed {
    let commands = [
        ("search <query>", "Search for shows"),
        ("next", "View next page of results"),
        ("select <num>", "Select result with this number"),
        ("tracks", "See tracks for selected show"),
        ("lineup", "See lineup for selected show"),
        ("members", "Alias for lineup"),
        ("id <num>", "Select show with this DGM ID"),
    ];

    let lines: Vec<String> = commands
        .iter()
        .map(|(usage, what)| format!("**{prefix}{usage}** - {what}"))
        .collect();

    Embed::new("Help").description(lines.join("\n"))
}

/// Whole words up to [`DESCRIPTION_LIMIT`] characters, with `...` when
/// anything was cut.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }

    let mut out = String::new();
    let mut len = 0;
    for word in text.split(' ') {
        if len >= DESCRIPTION_LIMIT {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
            len += 1;
        }
        out.push_str(word);
        len += word.chars().count();
    }

    out.push_str("...");
    out
}

/// `mm:ss`, or `--:--` when the length is unknown.
pub fn format_length(secs: Option<u32>) -> String {
    match secs {
        Some(secs) => format!("{:02}:{:02}", secs / 60, secs % 60),
        None => "--:--".to_string(),
    }
}

pub fn stars(rating: u8) -> String {
    STAR.repeat(usize::from(rating))
}

/// Plain-text rendering for terminals.
pub fn render_text(embed: &Embed) -> String {
    let mut out = format!("== {} ==", embed.title);
    if let Some(url) = &embed.url {
        out.push('\n');
        out.push_str(url);
    }
    if let Some(description) = &embed.description {
        out.push('\n');
        out.push_str(&description.replace("**", ""));
    }
    for field in &embed.fields {
        out.push('\n');
        out.push_str(&field.name);
        out.push_str(": ");
        out.push_str(&field.value);
    }
    if let Some(footer) = &embed.footer {
        out.push('\n');
        out.push_str(footer);
    }
    out
}
