//! Index aliases

use crate::client::{Client, PerformRequestOptions};
use crate::error::Result;
use crate::services::{require, AcknowledgedResponse, ParamsBuilder};
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One entry of an `_aliases` actions list
#[derive(Debug, Clone, PartialEq)]
pub enum AliasAction {
    Add {
        index: String,
        alias: String,
        filter: Option<Value>,
        routing: Option<String>,
        index_routing: Option<String>,
        search_routing: Option<String>,
    },
    Remove {
        index: String,
        alias: String,
    },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Add {
            index: index.into(),
            alias: alias.into(),
            filter: None,
            routing: None,
            index_routing: None,
            search_routing: None,
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }

    /// Attach a filter query; ignored on remove actions
    pub fn filter(mut self, query: Value) -> Self {
        if let AliasAction::Add { filter, .. } = &mut self {
            *filter = Some(query);
        }
        self
    }

    /// Attach a routing value; ignored on remove actions
    pub fn routing(mut self, value: impl Into<String>) -> Self {
        if let AliasAction::Add { routing, .. } = &mut self {
            *routing = Some(value.into());
        }
        self
    }

    pub fn source(&self) -> Value {
        match self {
            AliasAction::Add {
                index,
                alias,
                filter,
                routing,
                index_routing,
                search_routing,
            } => {
                let mut body = Map::new();
                body.insert("index".into(), json!(index));
                body.insert("alias".into(), json!(alias));
                if let Some(filter) = filter {
                    body.insert("filter".into(), filter.clone());
                }
                if let Some(routing) = routing {
                    body.insert("routing".into(), json!(routing));
                }
                if let Some(routing) = index_routing {
                    body.insert("index_routing".into(), json!(routing));
                }
                if let Some(routing) = search_routing {
                    body.insert("search_routing".into(), json!(routing));
                }
                json!({ "add": body })
            }
            AliasAction::Remove { index, alias } => {
                json!({ "remove": { "index": index, "alias": alias } })
            }
        }
    }
}

/// Builder for `POST /_aliases`
pub struct AliasService {
    client: Client,
    actions: Vec<AliasAction>,
    timeout: Option<String>,
    master_timeout: Option<String>,
    pretty: bool,
}

impl AliasService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            actions: Vec::new(),
            timeout: None,
            master_timeout: None,
            pretty: false,
        }
    }

    pub fn add(self, index: impl Into<String>, alias: impl Into<String>) -> Self {
        self.action(AliasAction::add(index, alias))
    }

    pub fn add_with_filter(
        self,
        index: impl Into<String>,
        alias: impl Into<String>,
        filter: Value,
    ) -> Self {
        self.action(AliasAction::add(index, alias).filter(filter))
    }

    pub fn remove(self, index: impl Into<String>, alias: impl Into<String>) -> Self {
        self.action(AliasAction::remove(index, alias))
    }

    pub fn action(mut self, action: AliasAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn master_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.master_timeout = Some(timeout.into());
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Actions", self.actions.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let params = ParamsBuilder::new()
            .opt("timeout", self.timeout.as_ref())
            .opt("master_timeout", self.master_timeout.as_ref())
            .pretty(self.pretty)
            .build();
        Ok(("/_aliases".to_string(), params))
    }

    pub fn body(&self) -> Value {
        let actions: Vec<Value> = self.actions.iter().map(AliasAction::source).collect();
        json!({ "actions": actions })
    }

    pub async fn do_request(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let body = self.body();
        self.client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(body),
            )
            .await
    }
}

/// Aliases grouped by index, as returned by `GET /_aliases`
#[derive(Debug, Clone, Default)]
pub struct AliasesResult {
    pub indices: BTreeMap<String, IndexAliases>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexAliases {
    pub aliases: Vec<String>,
}

impl IndexAliases {
    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a == name)
    }
}

impl AliasesResult {
    /// Names of indices carrying the alias
    pub fn indices_by_alias(&self, alias: &str) -> Vec<String> {
        self.indices
            .iter()
            .filter(|(_, aliases)| aliases.has_alias(alias))
            .map(|(index, _)| index.clone())
            .collect()
    }

    fn from_value(value: BTreeMap<String, RawIndexAliases>) -> Self {
        let indices = value
            .into_iter()
            .map(|(index, raw)| {
                let aliases = raw.aliases.into_keys().collect();
                (index, IndexAliases { aliases })
            })
            .collect();
        Self { indices }
    }
}

#[derive(Deserialize)]
struct RawIndexAliases {
    #[serde(default)]
    aliases: BTreeMap<String, Value>,
}

/// Builder for `GET /{indices}/_aliases`
pub struct AliasesService {
    client: Client,
    indices: Vec<String>,
    pretty: bool,
}

impl AliasesService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.indices.is_empty() {
            "/_aliases".to_string()
        } else {
            expand(
                "/{index}/_aliases",
                &[("index", &join_list(&self.indices))],
            )?
        };
        Ok((path, ParamsBuilder::new().pretty(self.pretty).build()))
    }

    pub async fn do_request(self) -> Result<AliasesResult> {
        let (path, params) = self.build_url()?;
        let raw: BTreeMap<String, RawIndexAliases> = self
            .client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await?;
        Ok(AliasesResult::from_value(raw))
    }
}

impl Client {
    /// Add or remove aliases
    pub fn alias(&self) -> AliasService {
        AliasService::new(self.clone())
    }

    /// List aliases
    pub fn aliases(&self) -> AliasesService {
        AliasesService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;

    #[test]
    fn test_alias_actions_body() {
        let svc = test_client()
            .alias()
            .add("twitter-2024", "twitter")
            .add_with_filter("twitter-2024", "user-kimchy", json!({"term": {"user": "kimchy"}}))
            .action(AliasAction::add("x", "y").routing("1"))
            .remove("twitter-2023", "twitter");
        assert!(svc.validate().is_ok());
        assert_eq!(
            svc.body(),
            json!({"actions": [
                {"add": {"index": "twitter-2024", "alias": "twitter"}},
                {"add": {"index": "twitter-2024", "alias": "user-kimchy", "filter": {"term": {"user": "kimchy"}}}},
                {"add": {"index": "x", "alias": "y", "routing": "1"}},
                {"remove": {"index": "twitter-2023", "alias": "twitter"}}
            ]})
        );
    }

    #[test]
    fn test_alias_requires_actions() {
        assert!(test_client().alias().validate().is_err());
    }

    #[test]
    fn test_aliases_result() {
        let raw: BTreeMap<String, RawIndexAliases> = serde_json::from_value(json!({
            "twitter-1": {"aliases": {"twitter": {}, "tweets": {}}},
            "twitter-2": {"aliases": {"twitter": {}}},
            "other": {"aliases": {}}
        }))
        .unwrap();
        let res = AliasesResult::from_value(raw);
        assert_eq!(res.indices_by_alias("twitter"), vec!["twitter-1", "twitter-2"]);
        assert!(res.indices["twitter-1"].has_alias("tweets"));
        assert!(!res.indices["other"].has_alias("twitter"));
    }

    #[test]
    fn test_aliases_url() {
        let client = test_client();
        assert_eq!(client.aliases().build_url().unwrap().0, "/_aliases");
        assert_eq!(client.aliases().index("a").build_url().unwrap().0, "/a/_aliases");
    }
}
