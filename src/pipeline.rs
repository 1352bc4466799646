//! Search → video details → channel details enrichment.
//!
//! The three calls run strictly in sequence: each one is keyed by ids
//! taken from the previous response. Any dispatch failure aborts the whole
//! query; a partially enriched result is never returned.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{EnrichedRecord, GroupDetail, ItemDetail, SearchHit};
use crate::youtube::YoutubeApi;

/// Records produced for one query and the quota units its calls cost.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub records: Vec<EnrichedRecord>,
    pub units_consumed: u64,
}

/// Run the enrichment pipeline for `query`.
///
/// Output order follows the `videos.list` response, not the search order.
/// `units_consumed` counts only this query's calls, so overlapping queries
/// on a shared dispatcher do not see each other's charges.
pub async fn enrich(api: &YoutubeApi, query: &str) -> Result<Enrichment> {
    let search = api.search_list(query).await?;
    let mut units = search.units;
    let hits = search.items;
    let video_ids = collect_video_ids(&hits);
    info!(query, hits = hits.len(), videos = video_ids.len(), "search completed");

    if video_ids.is_empty() {
        return Ok(Enrichment {
            records: Vec::new(),
            units_consumed: units,
        });
    }

    let videos = api.videos_list(&video_ids).await?;
    units += videos.units;
    let details = videos.items;
    if details.is_empty() {
        debug!(query, "video details returned no items");
        return Ok(Enrichment {
            records: Vec::new(),
            units_consumed: units,
        });
    }

    let channel_ids = collect_channel_ids(&details, &hits);
    let channels = if channel_ids.is_empty() {
        Vec::new()
    } else {
        let page = api.channels_list(&channel_ids).await?;
        units += page.units;
        page.items
    };
    debug!(
        query,
        details = details.len(),
        channels_requested = channel_ids.len(),
        channels_returned = channels.len(),
        units,
        "detail calls completed"
    );

    Ok(Enrichment {
        records: join_records(hits, details, channels),
        units_consumed: units,
    })
}

/// Video ids in search order, skipping non-video rows and repeats.
pub fn collect_video_ids(hits: &[SearchHit]) -> Vec<String> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter_map(|h| h.video_id())
        .filter(|id| seen.insert(*id))
        .map(|id| id.to_string())
        .collect()
}

/// Deduplicated channel ids, first-seen order. A detail without a channel
/// id falls back to the matching search hit's.
pub fn collect_channel_ids(details: &[ItemDetail], hits: &[SearchHit]) -> Vec<String> {
    let hit_channels: HashMap<&str, &str> = hits
        .iter()
        .filter_map(|h| Some((h.video_id()?, h.snippet.channel_id.as_deref()?)))
        .collect();

    let mut seen = HashSet::new();
    details
        .iter()
        .filter_map(|d| {
            d.snippet
                .channel_id
                .as_deref()
                .or_else(|| hit_channels.get(d.id.as_str()).copied())
        })
        .filter(|id| seen.insert(*id))
        .map(|id| id.to_string())
        .collect()
}

/// Join details with their search hit and channel, in detail order.
pub fn join_records(
    hits: Vec<SearchHit>,
    details: Vec<ItemDetail>,
    channels: Vec<GroupDetail>,
) -> Vec<EnrichedRecord> {
    let mut hits_by_id: HashMap<String, SearchHit> = HashMap::with_capacity(hits.len());
    for hit in hits {
        if let Some(id) = hit.id.video_id.clone() {
            hits_by_id.entry(id).or_insert(hit);
        }
    }

    let mut channels_by_id: HashMap<String, GroupDetail> = HashMap::with_capacity(channels.len());
    for channel in channels {
        channels_by_id.entry(channel.id.clone()).or_insert(channel);
    }

    details
        .into_iter()
        .map(|detail| {
            let search_snippet = hits_by_id
                .get(&detail.id)
                .map(|h| h.snippet.clone())
                .unwrap_or_default();
            let snippet = detail.snippet.merged_over(search_snippet);

            let channel_id = snippet.channel_id.clone().unwrap_or_default();
            let channel = channels_by_id
                .get(&channel_id)
                .cloned()
                .unwrap_or_else(|| GroupDetail::placeholder(channel_id));

            EnrichedRecord {
                id: detail.id,
                snippet,
                statistics: detail.statistics,
                content_details: detail.content_details,
                channel,
            }
        })
        .collect()
}
