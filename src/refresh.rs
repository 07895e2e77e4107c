// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::feed::{Feed, fetch_feed};
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::store::{EpisodeFields, Podcast, Store};

/// Counts of what a refresh did to the stored episodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub inserted: usize,
    pub updated: usize,
    /// Feed items without an id or title
    pub skipped: usize,
}

/// Fetch a podcast's feed and bring its stored metadata and episodes up to date
pub async fn refresh_podcast<C: HttpClient>(
    store: &Store,
    client: &C,
    podcast: &Podcast,
    reporter: &SharedProgressReporter,
) -> Result<RefreshSummary, FeedError> {
    reporter.report(ProgressEvent::RefreshStarting {
        podcast: podcast.label().to_string(),
        url: podcast.url.clone(),
    });
    info!(id = podcast.id, url = %podcast.url, "refreshing podcast");

    let feed = fetch_feed(client, &podcast.url).await?;
    reconcile_feed(store, podcast.id, &feed, reporter)
}

/// Write a parsed feed into the store for `podcast_id`.
///
/// Items are upserted in document order by `(podcast_id, guid)`. Episodes that
/// have vanished from the feed stay in the store, and a download location is
/// never touched.
pub fn reconcile_feed(
    store: &Store,
    podcast_id: i64,
    feed: &Feed,
    reporter: &SharedProgressReporter,
) -> Result<RefreshSummary, FeedError> {
    store.update_podcast_meta(podcast_id, &feed.title, &feed.author)?;

    // Only decides whether we report an insert or an update.
    let mut known_guids = store.episode_guids(podcast_id)?;
    let mut summary = RefreshSummary::default();

    for (index, item) in feed.items.iter().enumerate() {
        let (Some(guid), Some(title)) = (item.id.as_deref(), item.title.as_deref()) else {
            let reason = format!("item {} has no id or no title", index + 1);
            warn!(podcast_id, "{reason}, skipping");
            reporter.report(ProgressEvent::ItemSkipped {
                podcast: feed.title.clone(),
                reason,
            });
            summary.skipped += 1;
            continue;
        };

        let fields = EpisodeFields {
            title: title.to_string(),
            description: item.description.clone().unwrap_or_default(),
            published_at: item.published_at,
            source_url: item.audio_url().map(String::from),
        };

        if fields.source_url.is_none() {
            debug!(podcast_id, guid, "item has no audio link");
        }

        store.upsert_episode(podcast_id, guid, &fields)?;

        if known_guids.contains(guid) {
            summary.updated += 1;
            reporter.report(ProgressEvent::EpisodeUpdated {
                podcast: feed.title.clone(),
                title: fields.title,
            });
        } else {
            summary.inserted += 1;
            info!(podcast_id, guid, "Insert {}: {}", feed.title, fields.title);
            reporter.report(ProgressEvent::EpisodeInserted {
                podcast: feed.title.clone(),
                title: fields.title,
            });
            known_guids.insert(guid.to_string());
        }
    }

    reporter.report(ProgressEvent::RefreshCompleted {
        podcast: feed.title.clone(),
        inserted: summary.inserted,
        updated: summary.updated,
        skipped: summary.skipped,
    });

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedItem, Link};
    use crate::http::mock::MockHttpClient;
    use crate::progress::NoopReporter;
    use crate::progress::recording::RecordingReporter;
    use chrono::NaiveDate;

    fn item(guid: &str, title: &str) -> FeedItem {
        FeedItem {
            id: Some(guid.to_string()),
            title: Some(title.to_string()),
            description: Some(format!("About {title}")),
            published_at: NaiveDate::from_ymd_opt(2024, 3, 9),
            links: vec![Link {
                media_type: Some("audio/mpeg".to_string()),
                href: format!("http://example.com/{guid}.mp3"),
            }],
        }
    }

    fn feed(items: Vec<FeedItem>) -> Feed {
        Feed {
            title: "Test Show".to_string(),
            author: "A. Host".to_string(),
            items,
        }
    }

    #[test]
    fn reconcile_updates_meta_and_inserts_items() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();

        let summary = reconcile_feed(
            &store,
            id,
            &feed(vec![item("ep1", "Episode One")]),
            &NoopReporter::shared(),
        )
        .unwrap();

        assert_eq!(summary.inserted, 1);
        let podcast = store.get_podcast(id).unwrap();
        assert_eq!(podcast.name, "Test Show");
        assert_eq!(podcast.author, "A. Host");

        let episodes = store.list_episodes(id).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].guid, "ep1");
        assert_eq!(episodes[0].description, "About Episode One");
        assert_eq!(
            episodes[0].source_url.as_deref(),
            Some("http://example.com/ep1.mp3")
        );
        assert!(episodes[0].local_path.is_none());
    }

    #[test]
    fn reconcile_twice_keeps_episode_count() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();
        let doc = feed(vec![item("ep1", "One"), item("ep2", "Two")]);
        let reporter = NoopReporter::shared();

        reconcile_feed(&store, id, &doc, &reporter).unwrap();
        let second = reconcile_feed(&store, id, &doc, &reporter).unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.list_episodes(id).unwrap().len(), 2);
    }

    #[test]
    fn reconcile_never_prunes_vanished_items() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();
        let reporter = NoopReporter::shared();

        reconcile_feed(&store, id, &feed(vec![item("old", "Old")]), &reporter).unwrap();
        reconcile_feed(&store, id, &feed(vec![item("new", "New")]), &reporter).unwrap();

        let guids = store.episode_guids(id).unwrap();
        assert!(guids.contains("old"));
        assert!(guids.contains("new"));
    }

    #[test]
    fn reconcile_skips_items_without_id_or_title() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();

        let mut no_title = item("ep2", "x");
        no_title.title = None;
        let mut no_id = item("ep3", "Three");
        no_id.id = None;

        let reporter = RecordingReporter::shared();
        let shared: SharedProgressReporter = reporter.clone();
        let summary = reconcile_feed(
            &store,
            id,
            &feed(vec![item("ep1", "One"), no_title, no_id, item("ep4", "Four")]),
            &shared,
        )
        .unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(store.list_episodes(id).unwrap().len(), 2);
        assert_eq!(
            reporter
                .events()
                .iter()
                .filter(|e| matches!(e, ProgressEvent::ItemSkipped { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn item_without_audio_link_is_still_stored() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();

        let mut video = item("ep1", "Video");
        video.links[0].media_type = Some("video/mp4".to_string());

        reconcile_feed(&store, id, &feed(vec![video]), &NoopReporter::shared()).unwrap();

        let episodes = store.list_episodes(id).unwrap();
        assert_eq!(episodes.len(), 1);
        assert!(episodes[0].source_url.is_none());
    }

    #[test]
    fn items_are_stored_in_document_order() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();

        reconcile_feed(
            &store,
            id,
            &feed(vec![item("c", "C"), item("a", "A"), item("b", "B")]),
            &NoopReporter::shared(),
        )
        .unwrap();

        let guids: Vec<_> = store
            .list_episodes(id)
            .unwrap()
            .into_iter()
            .map(|e| e.guid)
            .collect();
        assert_eq!(guids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn refresh_podcast_fetches_from_podcast_url() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();
        let podcast = store.get_podcast(id).unwrap();

        let xml = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Remote Show</title>
    <description>D</description>
    <item>
      <title>Remote Episode</title>
      <guid>r1</guid>
      <enclosure url="http://example.com/r1.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;
        let client = MockHttpClient::new().with_body("http://example.com/feed.xml", xml);

        let summary = refresh_podcast(&store, &client, &podcast, &NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(store.get_podcast(id).unwrap().name, "Remote Show");
    }

    #[tokio::test]
    async fn refresh_podcast_propagates_parse_failure() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();
        let podcast = store.get_podcast(id).unwrap();
        let client = MockHttpClient::new().with_body("http://example.com/feed.xml", "nope");

        let result = refresh_podcast(&store, &client, &podcast, &NoopReporter::shared()).await;

        assert!(matches!(result, Err(FeedError::ParseFailed(_))));
        assert!(store.get_podcast(id).unwrap().name.is_empty());
    }
}
