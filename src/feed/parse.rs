// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::error::FeedError;

/// Channel-level data and items of a parsed feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    /// Empty when the feed names no author
    pub author: String,
    pub items: Vec<FeedItem>,
}

/// A single feed entry, as loosely as the feed provides it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    /// Stable identifier (`<guid>`, falling back to the enclosure url)
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
    /// Links in document order, enclosure first
    pub links: Vec<Link>,
}

/// A link attached to a feed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub media_type: Option<String>,
    pub href: String,
}

impl Link {
    /// True when the primary component of the media type is `audio`
    pub fn is_audio(&self) -> bool {
        self.media_type
            .as_deref()
            .and_then(|mime| mime.split('/').next())
            .is_some_and(|primary| primary.trim().eq_ignore_ascii_case("audio"))
    }
}

impl FeedItem {
    /// The first audio link of the item, if any
    pub fn audio_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.is_audio())
            .map(|link| link.href.as_str())
    }
}

/// Parse RSS or Atom feed XML bytes into a [`Feed`]
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Feed, FeedError> {
    match rss::Channel::read_from(xml_bytes) {
        Ok(channel) => Ok(parse_channel(&channel)),
        Err(rss::Error::InvalidStartTag) => match atom_syndication::Feed::read_from(xml_bytes) {
            Ok(feed) => Ok(parse_atom_feed(&feed)),
            Err(atom_syndication::Error::InvalidStartTag) => Err(FeedError::UnknownFormat),
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

fn parse_channel(channel: &rss::Channel) -> Feed {
    let author = channel
        .itunes_ext()
        .and_then(|ext| ext.author().map(String::from))
        .or_else(|| channel.managing_editor().map(String::from))
        .or_else(|| {
            channel
                .dublin_core_ext()
                .and_then(|dc| dc.creators().first().cloned())
        })
        .unwrap_or_default();

    Feed {
        title: channel.title().to_string(),
        author,
        items: channel.items().iter().map(parse_item).collect(),
    }
}

fn parse_item(item: &rss::Item) -> FeedItem {
    let mut links = Vec::new();
    if let Some(enclosure) = item.enclosure() {
        links.push(Link {
            media_type: Some(enclosure.mime_type().to_string()).filter(|s| !s.is_empty()),
            href: enclosure.url().to_string(),
        });
    }
    if let Some(link) = item.link() {
        links.push(Link {
            media_type: None,
            href: link.to_string(),
        });
    }

    let id = item
        .guid()
        .map(|g| g.value().trim().to_string())
        .filter(|g| !g.is_empty())
        .or_else(|| item.enclosure().map(|e| e.url().to_string()));

    let published_at = item
        .pub_date()
        .and_then(parse_pub_date)
        .map(|dt| dt.date_naive())
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().iter().find_map(|d| parse_dc_date(d)))
        });

    let description = item
        .description()
        .map(String::from)
        .or_else(|| item.itunes_ext().and_then(|ext| ext.summary().map(String::from)));

    FeedItem {
        id,
        title: item.title().map(String::from),
        description,
        published_at,
        links,
    }
}

fn parse_atom_feed(feed: &atom_syndication::Feed) -> Feed {
    Feed {
        title: feed.title().as_str().trim().to_string(),
        author: feed
            .authors()
            .first()
            .map(|person| person.name().trim().to_string())
            .unwrap_or_default(),
        items: feed.entries().iter().map(parse_entry).collect(),
    }
}

fn parse_entry(entry: &atom_syndication::Entry) -> FeedItem {
    let links: Vec<Link> = entry
        .links()
        .iter()
        .map(|link| Link {
            media_type: link.mime_type().map(String::from).filter(|s| !s.is_empty()),
            href: link.href().to_string(),
        })
        .collect();

    let id = Some(entry.id().trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| {
            links
                .iter()
                .find(|link| link.is_audio())
                .map(|link| link.href.clone())
        });

    // A missing <updated> comes back as the epoch
    let published_at = entry
        .published()
        .or_else(|| Some(entry.updated()).filter(|dt| dt.timestamp() != 0))
        .map(|dt| dt.date_naive());

    let description = entry
        .summary()
        .map(|text| text.as_str().to_string())
        .or_else(|| entry.content().and_then(|c| c.value().map(String::from)));

    FeedItem {
        id,
        title: Some(entry.title().as_str().trim().to_string()).filter(|t| !t.is_empty()),
        description,
        published_at,
        links,
    }
}

/// Parse an RSS `pubDate`, tolerating the common deviations from RFC 2822
fn parse_pub_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        return Some(dt);
    }

    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    formats
        .iter()
        .find_map(|format| DateTime::parse_from_str(date_str, format).ok())
}

/// Parse a Dublin Core `dc:date` (W3C-DTF: full timestamp or bare date)
fn parse_dc_date(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();
    DateTime::parse_from_rfc3339(date_str)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok())
}
