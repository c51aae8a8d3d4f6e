//! Turning a raw show page into a [`NewShow`].
//!
//! Extraction is pure: it reads one document and produces at most one
//! show with its lineup and setlist. Instrument rows are resolved later,
//! when the catalog writes the show.

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use dgm_core::model::{DgmId, NewMember, NewShow, NewTrack};

use crate::error::{ExtractError, ExtractResult};

/// Body marker the site serves for ids without a show.
pub const NOT_FOUND_MARKER: &str = "<h1>404 :(</h1>";

/// One copy of this image is shown per quality point.
pub const RATING_ICON: &str = "https://www.dgmlive.com/img/assets/albums//audio-rating-white.png";

/// Download button image; present only when audio can be downloaded.
pub const DOWNLOAD_ICON: &str = "https://www.dgmlive.com/img/assets/albums/download-black.png";

/// Lineup entries link to a biography under this prefix.
pub const BIOGRAPHY_PREFIX: &str = "https://www.dgmlive.com/biographies/";

/// Date format of the date box, e.g. `12 Jun 1995`.
const DATE_FORMAT: &str = "%d %b %Y";

/// Result of extracting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Show(Box<NewShow>),

    /// The page carries the not-found marker.
    NotFound,
}

/// Page extractor with its selectors compiled once.
#[derive(Debug)]
pub struct Extractor {
    date_box: Selector,
    part_left: Selector,
    part_right: Selector,
    content_past: Selector,
    content_block: Selector,
    anchor: Selector,
    with_src: Selector,
    with_href: Selector,
    description: Selector,
    audio_source: Selector,
    album_cover: Selector,
    image: Selector,
    span: Selector,
    track_row: Selector,
    track_number: Selector,
    track_title: Selector,
    track_length: Selector,
    biography: Regex,
}

impl Extractor {
    pub fn new() -> ExtractResult<Self> {
        let biography = Regex::new(&regex::escape(BIOGRAPHY_PREFIX)).map_err(|e| {
            ExtractError::Selector {
                selector: BIOGRAPHY_PREFIX,
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            date_box: selector(".date-box")?,
            part_left: selector(".part-left")?,
            part_right: selector(".part-right")?,
            content_past: selector(".content-past")?,
            content_block: selector(r#"[class="content col-xs-7 col-xs-7"]"#)?,
            anchor: selector("a")?,
            with_src: selector("[src]")?,
            with_href: selector("[href]")?,
            description: selector("#description")?,
            audio_source: selector("#audio-source")?,
            album_cover: selector(".album-cover")?,
            image: selector("img")?,
            span: selector("span")?,
            track_row: selector(".album-content-line")?,
            track_number: selector(".track-number")?,
            track_title: selector(".track-title")?,
            track_length: selector(r#"[class="col-sm-2 hide-on-mobile"]"#)?,
            biography,
        })
    }

    /// Extract the show page stored for `dgm_id`.
    ///
    /// Returns [`Extraction::NotFound`] for the site's not-found page. Any
    /// missing required element, unparseable date or malformed track
    /// length fails the whole page.
    pub fn extract(&self, dgm_id: DgmId, raw: &str) -> ExtractResult<Extraction> {
        if raw.contains(NOT_FOUND_MARKER) {
            return Ok(Extraction::NotFound);
        }

        let doc = Html::parse_document(raw);

        let (date, date_friendly) = self.date(&doc)?;
        let (venue, location) = self.venue(&doc)?;

        let mut show = NewShow::new(dgm_id, venue, location, date, date_friendly);

        let (rating, has_download) = self.icons(&doc);
        show.quality_rating = (rating > 0).then_some(rating);
        show.has_download = has_download;
        show.description = self.description(&doc);
        show.source = self.audio_source(&doc);
        show.cover = self.cover(&doc);
        show.members = self.members(&doc)?;
        show.tracks = self.tracks(&doc)?;

        Ok(Extraction::Show(Box::new(show)))
    }

    fn date(&self, doc: &Html) -> ExtractResult<(NaiveDate, String)> {
        let date_box = doc
            .select(&self.date_box)
            .next()
            .ok_or(ExtractError::MissingElement(".date-box"))?;

        let day = date_box
            .select(&self.part_left)
            .next()
            .and_then(element_string)
            .ok_or(ExtractError::MissingElement(".date-box .part-left"))?;

        let right = date_box
            .select(&self.part_right)
            .next()
            .ok_or(ExtractError::MissingElement(".date-box .part-right"))?;
        let month =
            child_string(right, 1).ok_or(ExtractError::MissingElement(".part-right month"))?;
        let year = child_string(right, 3).ok_or(ExtractError::MissingElement(".part-right year"))?;

        let friendly = format!("{} {} {}", day.trim(), month.trim(), year.trim());
        let date = NaiveDate::parse_from_str(&friendly, DATE_FORMAT).map_err(|source| {
            ExtractError::InvalidDate {
                value: friendly.clone(),
                source,
            }
        })?;

        Ok((date, friendly))
    }

    fn venue(&self, doc: &Html) -> ExtractResult<(String, String)> {
        let block = doc
            .select(&self.content_past)
            .next()
            .or_else(|| doc.select(&self.content_block).next())
            .ok_or(ExtractError::MissingElement(".content-past"))?;

        let link = block
            .select(&self.anchor)
            .next()
            .ok_or(ExtractError::MissingElement(".content-past a"))?;

        let venue = child_string(link, 1).ok_or(ExtractError::MissingElement("venue"))?;
        let location = child_string(link, 3).ok_or(ExtractError::MissingElement("location"))?;

        Ok((venue.trim().to_string(), location.trim().to_string()))
    }

    /// Count rating icons and look for the download button in one pass.
    fn icons(&self, doc: &Html) -> (u8, bool) {
        let mut rating: u8 = 0;
        let mut has_download = false;

        for element in doc.select(&self.with_src) {
            match element.value().attr("src") {
                Some(RATING_ICON) => rating = rating.saturating_add(1),
                Some(DOWNLOAD_ICON) => has_download = true,
                _ => {}
            }
        }

        (rating, has_download)
    }

    fn description(&self, doc: &Html) -> Option<String> {
        let node = doc.select(&self.description).next()?;

        let text = match element_string(node).filter(|s| !s.is_empty()) {
            Some(text) => text,
            // Mixed content: keep the pieces that are plain strings.
            None => node
                .children()
                .filter_map(|child| match child.value().as_text() {
                    Some(text) => Some(text.to_string()),
                    None => ElementRef::wrap(child).and_then(element_string),
                })
                .collect(),
        };

        non_empty(&text)
    }

    fn audio_source(&self, doc: &Html) -> Option<String> {
        let node = doc.select(&self.audio_source).next()?;
        child_string(node, 1).and_then(|s| non_empty(&s))
    }

    fn cover(&self, doc: &Html) -> Option<String> {
        doc.select(&self.album_cover)
            .next()?
            .select(&self.image)
            .next()?
            .value()
            .attr("src")
            .map(str::to_string)
    }

    fn members(&self, doc: &Html) -> ExtractResult<Vec<NewMember>> {
        let mut seen: Vec<String> = Vec::new();
        let mut members = Vec::new();

        for link in doc.select(&self.with_href) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !self.biography.is_match(href) {
                continue;
            }

            // The same biography link can appear more than once per page.
            let markup = link.html();
            if seen.contains(&markup) {
                continue;
            }
            seen.push(markup);

            let name = link
                .select(&self.span)
                .next()
                .and_then(element_string)
                .ok_or(ExtractError::MissingElement("biography link span"))?
                .replace('-', "")
                .trim()
                .to_string();

            let instruments = child_string(link, 1)
                .ok_or(ExtractError::MissingElement("biography link instruments"))?;
            let instruments = instruments
                .split(", ")
                .map(str::trim)
                .filter(|s| !s.is_empty());

            members.push(NewMember::new(name, instruments));
        }

        Ok(members)
    }

    fn tracks(&self, doc: &Html) -> ExtractResult<Vec<NewTrack>> {
        let mut tracks = Vec::new();

        for row in doc.select(&self.track_row) {
            let number = row
                .select(&self.track_number)
                .next()
                .and_then(element_string)
                .ok_or(ExtractError::MissingElement(".track-number"))?;

            let title = row
                .select(&self.track_title)
                .next()
                .and_then(|title| child_string(title, 0))
                .ok_or(ExtractError::MissingElement(".track-title"))?;

            let length = row
                .select(&self.track_length)
                .next()
                .and_then(element_string)
                .ok_or(ExtractError::MissingElement("track length"))?;

            tracks.push(NewTrack::new(
                number.trim(),
                title.trim(),
                parse_track_length(length.trim())?,
            ));
        }

        Ok(tracks)
    }
}

/// Extract a single page with a freshly built [`Extractor`].
pub fn extract(dgm_id: DgmId, raw: &str) -> ExtractResult<Extraction> {
    Extractor::new()?.extract(dgm_id, raw)
}

/// Parse a `minutes:seconds` track length; `--` means unknown.
pub fn parse_track_length(text: &str) -> ExtractResult<Option<u32>> {
    if text == "--" {
        return Ok(None);
    }

    let invalid = || ExtractError::InvalidTrackLength(text.to_string());
    let (minutes, seconds) = text.split_once(':').ok_or_else(invalid)?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    let seconds: u32 = seconds.parse().map_err(|_| invalid())?;

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .map(Some)
        .ok_or_else(invalid)
}

fn selector(css: &'static str) -> ExtractResult<Selector> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css,
        message: format!("{e:?}"),
    })
}

/// The text of an element that wraps exactly one string, looking through
/// single-child wrappers. `None` for empty or mixed content.
fn element_string(element: ElementRef<'_>) -> Option<String> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }

    if let Some(text) = only.value().as_text() {
        return Some(text.to_string());
    }
    ElementRef::wrap(only).and_then(element_string)
}

/// The string of the `index`th child node, counting text nodes.
fn child_string(parent: ElementRef<'_>, index: usize) -> Option<String> {
    let node = parent.children().nth(index)?;

    if let Some(text) = node.value().as_text() {
        return Some(text.to_string());
    }
    ElementRef::wrap(node).and_then(element_string)
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = include_str!("../tests/fixtures/show.html");

    fn extract_page(raw: &str) -> ExtractResult<Extraction> {
        Extractor::new().unwrap().extract(DgmId::new(1234), raw)
    }

    fn show(raw: &str) -> NewShow {
        match extract_page(raw).unwrap() {
            Extraction::Show(show) => *show,
            Extraction::NotFound => panic!("expected a show"),
        }
    }

    #[test]
    fn test_parse_track_length() {
        assert_eq!(parse_track_length("--").unwrap(), None);
        assert_eq!(parse_track_length("04:32").unwrap(), Some(272));
        assert_eq!(parse_track_length("0:07").unwrap(), Some(7));
        assert_eq!(parse_track_length("61:00").unwrap(), Some(3660));
    }

    #[test]
    fn test_parse_track_length_rejects_other_shapes() {
        for bad in ["", "4m32", "04:", ":32", "1:02:03", "-", "99999999:00"] {
            assert!(
                matches!(
                    parse_track_length(bad),
                    Err(ExtractError::InvalidTrackLength(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_not_found_marker() {
        let raw = "<html><body><h1>404 :(</h1><p>Nothing here</p></body></html>";
        assert_eq!(extract_page(raw).unwrap(), Extraction::NotFound);
    }

    #[test]
    fn test_extract_show_fields() {
        let show = show(PAGE);

        assert_eq!(show.dgm_id, DgmId::new(1234));
        assert_eq!(show.venue, "Royal Albert Hall");
        assert_eq!(show.location, "London, England");
        assert_eq!(show.date, NaiveDate::from_ymd_opt(1995, 6, 12).unwrap());
        assert_eq!(show.date_friendly, "12 Jun 1995");
        assert_eq!(show.quality_rating, Some(3));
        assert!(show.has_download);
        assert_eq!(show.source.as_deref(), Some("Soundboard"));
        assert_eq!(
            show.cover.as_deref(),
            Some("https://www.dgmlive.com/img/covers/1234.jpg")
        );
    }

    #[test]
    fn test_extract_mixed_description() {
        let show = show(PAGE);
        assert_eq!(
            show.description.as_deref(),
            Some("The first of three nights at the Hall. Soundboard recording, complete.")
        );
    }

    #[test]
    fn test_extract_members() {
        let show = show(PAGE);

        let names: Vec<&str> = show.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Robert Fripp", "Adrian Belew", "Tony Levin"]);
        assert_eq!(show.members[0].instruments, vec!["Guitar", "Soundscapes"]);
        assert_eq!(show.members[2].instruments, vec!["Bass", "Stick"]);
    }

    #[test]
    fn test_extract_tracks_in_page_order() {
        let show = show(PAGE);

        let tracks: Vec<(&str, &str, Option<u32>)> = show
            .tracks
            .iter()
            .map(|t| (t.number.as_str(), t.name.as_str(), t.length_secs))
            .collect();
        assert_eq!(
            tracks,
            vec![
                ("1", "VROOOM", Some(312)),
                ("2", "Frame by Frame", Some(272)),
                ("2a", "Thela Hun Ginjeet", None),
            ]
        );
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = Extractor::new().unwrap();
        let first = extractor.extract(DgmId::new(1234), PAGE).unwrap();
        let second = extractor.extract(DgmId::new(1234), PAGE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_content_block_fallback() {
        let raw = PAGE.replace(
            r#"<div class="content-past">"#,
            r#"<div class="content col-xs-7 col-xs-7">"#,
        );
        let show = show(&raw);
        assert_eq!(show.venue, "Royal Albert Hall");
    }

    #[test]
    fn test_optional_parts_absent() {
        let raw = r#"<html><body>
            <div class="date-box"><div class="part-left">3</div>
              <div class="part-right"> <span>Mar</span> <span>2003</span> </div></div>
            <div class="content-past"><a href="/x"> <b>Zenith</b> <i>Paris, France</i> </a></div>
            <div id="description">   </div>
        </body></html>"#;
        let show = show(raw);

        assert_eq!(show.date_friendly, "3 Mar 2003");
        assert_eq!(show.venue, "Zenith");
        assert_eq!(show.quality_rating, None);
        assert_eq!(show.description, None);
        assert_eq!(show.source, None);
        assert_eq!(show.cover, None);
        assert!(!show.has_download);
        assert!(show.members.is_empty());
        assert!(show.tracks.is_empty());
    }

    #[test]
    fn test_missing_date_box_fails() {
        let raw = PAGE.replace("date-box", "date-gone");
        assert!(matches!(
            extract_page(&raw),
            Err(ExtractError::MissingElement(".date-box"))
        ));
    }

    #[test]
    fn test_missing_venue_block_fails() {
        let raw = PAGE.replace("content-past", "content-future");
        assert!(matches!(
            extract_page(&raw),
            Err(ExtractError::MissingElement(_))
        ));
    }

    #[test]
    fn test_bad_month_fails() {
        let raw = PAGE.replace(">Jun<", ">Smarch<");
        assert!(matches!(
            extract_page(&raw),
            Err(ExtractError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_member_without_instruments_fails() {
        let raw = PAGE.replace("</span>Guitar, Vocals</a>", "</span></a>");
        assert!(matches!(
            extract_page(&raw),
            Err(ExtractError::MissingElement("biography link instruments"))
        ));
    }

    #[test]
    fn test_overflowing_track_length_fails_the_page() {
        let raw = PAGE.replace(">04:32<", ">99999999:00<");
        assert!(matches!(
            extract_page(&raw),
            Err(ExtractError::InvalidTrackLength(_))
        ));
    }

    #[test]
    fn test_bad_track_length_fails() {
        let raw = PAGE.replace(">04:32<", ">4m32<");
        assert!(matches!(
            extract_page(&raw),
            Err(ExtractError::InvalidTrackLength(_))
        ));
    }
}
