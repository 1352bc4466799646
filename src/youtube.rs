//! Typed wrappers over the three YouTube list endpoints.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::endpoint::Resource;
use crate::error::{DispatchError, Result};
use crate::models::{GroupDetail, ItemDetail, ListResponse, SearchHit};

/// Decoded items of one list call and the quota units that call was charged.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub units: u64,
}

pub struct YoutubeApi {
    dispatcher: Arc<Dispatcher>,
    page_size: u32,
}

impl YoutubeApi {
    pub fn new(dispatcher: Arc<Dispatcher>, page_size: u32) -> Self {
        Self {
            dispatcher,
            page_size,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn search_list(&self, query: &str) -> Result<Page<SearchHit>> {
        let params = params(&[
            ("part", "snippet"),
            ("q", query),
            ("type", "video"),
            ("maxResults", &self.page_size.to_string()),
        ]);
        self.list(Resource::Search, &params).await
    }

    pub async fn videos_list(&self, ids: &[String]) -> Result<Page<ItemDetail>> {
        let params = params(&[
            ("part", "snippet,statistics,contentDetails"),
            ("id", &ids.join(",")),
        ]);
        self.list(Resource::Videos, &params).await
    }

    pub async fn channels_list(&self, ids: &[String]) -> Result<Page<GroupDetail>> {
        let params = params(&[("part", "statistics"), ("id", &ids.join(","))]);
        self.list(Resource::Channels, &params).await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        params: &[(String, String)],
    ) -> Result<Page<T>> {
        let body = self.dispatcher.dispatch(resource, params).await?;
        Ok(Page {
            items: decode_items(resource, body)?,
            units: resource.quota_cost(),
        })
    }
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn decode_items<T: DeserializeOwned>(resource: Resource, body: Value) -> Result<Vec<T>> {
    serde_json::from_value::<ListResponse<T>>(body)
        .map(|list| list.items)
        .map_err(|e| DispatchError::MalformedResponse(format!("{}: {}", resource.path(), e)))
}
