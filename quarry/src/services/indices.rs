//! Index administration: create, delete, exists, get, open/close,
//! refresh, flush, mappings and settings

use crate::client::{Client, PerformRequestOptions};
use crate::error::Result;
use crate::services::{require, AcknowledgedResponse, ParamsBuilder, ShardsInfo};
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// How index expressions resolve against missing or closed indices
#[derive(Debug, Clone, Default)]
pub struct IndicesOptions {
    pub ignore_unavailable: Option<bool>,
    pub allow_no_indices: Option<bool>,
    /// `open`, `closed`, `none` or `all`
    pub expand_wildcards: Option<String>,
}

impl IndicesOptions {
    fn apply(&self, params: ParamsBuilder) -> ParamsBuilder {
        params
            .opt("ignore_unavailable", self.ignore_unavailable)
            .opt("allow_no_indices", self.allow_no_indices)
            .opt("expand_wildcards", self.expand_wildcards.as_ref())
    }
}

/// Builder for `PUT /{index}`
pub struct IndicesCreateService {
    client: Client,
    index: String,
    body: Option<Value>,
    timeout: Option<String>,
    master_timeout: Option<String>,
    wait_for_active_shards: Option<String>,
    pretty: bool,
}

impl IndicesCreateService {
    pub fn new(client: Client, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
            body: None,
            timeout: None,
            master_timeout: None,
            wait_for_active_shards: None,
            pretty: false,
        }
    }

    /// Settings, mappings and aliases for the new index
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
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

    pub fn wait_for_active_shards(mut self, shards: impl ToString) -> Self {
        self.wait_for_active_shards = Some(shards.to_string());
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Index", self.index.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand("/{index}", &[("index", &self.index)])?;
        let params = ParamsBuilder::new()
            .opt("timeout", self.timeout.as_ref())
            .opt("master_timeout", self.master_timeout.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let mut opts = PerformRequestOptions::new(Method::PUT, path).params(params);
        if let Some(body) = self.body {
            opts = opts.body(body);
        }
        self.client.send_json(opts).await
    }
}

/// Builder for `DELETE /{indices}`
pub struct IndicesDeleteService {
    client: Client,
    indices: Vec<String>,
    timeout: Option<String>,
    master_timeout: Option<String>,
    pretty: bool,
}

impl IndicesDeleteService {
    pub fn new(client: Client, indices: Vec<String>) -> Self {
        Self {
            client,
            indices,
            timeout: None,
            master_timeout: None,
            pretty: false,
        }
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
        require(&[("Index", self.indices.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand("/{index}", &[("index", &join_list(&self.indices))])?;
        let params = ParamsBuilder::new()
            .opt("timeout", self.timeout.as_ref())
            .opt("master_timeout", self.master_timeout.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::DELETE, path).params(params))
            .await
    }
}

/// Builder for `HEAD /{indices}`
pub struct IndicesExistsService {
    client: Client,
    indices: Vec<String>,
    local: Option<bool>,
    options: IndicesOptions,
    pretty: bool,
}

impl IndicesExistsService {
    pub fn new(client: Client, indices: Vec<String>) -> Self {
        Self {
            client,
            indices,
            local: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Index", self.indices.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand("/{index}", &[("index", &join_list(&self.indices))])?;
        let params = self
            .options
            .apply(ParamsBuilder::new().opt("local", self.local))
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    /// `true` on 200, `false` on 404
    pub async fn do_request(self) -> Result<bool> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let res = self
            .client
            .perform_request(
                PerformRequestOptions::new(Method::HEAD, path)
                    .params(params)
                    .ignore_errors(&[404]),
            )
            .await?;
        Ok(res.status_code == 200)
    }
}

/// One index as returned by `GET /{index}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicesGetResponse {
    #[serde(default)]
    pub aliases: HashMap<String, Value>,
    #[serde(default)]
    pub mappings: HashMap<String, Value>,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
    pub warmers: Option<Value>,
}

/// Builder for `GET /{indices}/{features}`
pub struct IndicesGetService {
    client: Client,
    indices: Vec<String>,
    features: Vec<String>,
    local: Option<bool>,
    flat_settings: Option<bool>,
    human: Option<bool>,
    options: IndicesOptions,
    pretty: bool,
}

impl IndicesGetService {
    pub fn new(client: Client, indices: Vec<String>) -> Self {
        Self {
            client,
            indices,
            features: Vec::new(),
            local: None,
            flat_settings: None,
            human: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    /// `_settings`, `_mappings` or `_aliases`
    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn human(mut self, human: bool) -> Self {
        self.human = Some(human);
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let indices = if self.indices.is_empty() {
            "_all".to_string()
        } else {
            join_list(&self.indices)
        };
        let path = if self.features.is_empty() {
            expand("/{index}", &[("index", &indices)])?
        } else {
            expand(
                "/{index}/{feature}",
                &[("index", &indices), ("feature", &join_list(&self.features))],
            )?
        };
        let params = self
            .options
            .apply(
                ParamsBuilder::new()
                    .opt("local", self.local)
                    .opt("flat_settings", self.flat_settings)
                    .opt("human", self.human),
            )
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<HashMap<String, IndicesGetResponse>> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

/// Builder for `POST /{index}/_open` and `POST /{index}/_close`
pub struct IndicesOpenCloseService {
    client: Client,
    index: String,
    action: &'static str,
    timeout: Option<String>,
    master_timeout: Option<String>,
    options: IndicesOptions,
    pretty: bool,
}

impl IndicesOpenCloseService {
    fn new(client: Client, index: String, action: &'static str) -> Self {
        Self {
            client,
            index,
            action,
            timeout: None,
            master_timeout: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn master_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.master_timeout = Some(timeout.into());
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Index", self.index.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = format!("{}/{}", expand("/{index}", &[("index", &self.index)])?, self.action);
        let params = self
            .options
            .apply(
                ParamsBuilder::new()
                    .opt("timeout", self.timeout.as_ref())
                    .opt("master_timeout", self.master_timeout.as_ref()),
            )
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::POST, path).params(params))
            .await
    }
}

/// Shard summary returned by refresh and flush
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardsResponse {
    #[serde(rename = "_shards", default)]
    pub shards: ShardsInfo,
}

/// Builder for `POST /{indices}/_refresh` and `POST /{indices}/_flush`
pub struct IndicesMaintenanceService {
    client: Client,
    indices: Vec<String>,
    action: &'static str,
    force: Option<bool>,
    wait_if_ongoing: Option<bool>,
    options: IndicesOptions,
    pretty: bool,
}

impl IndicesMaintenanceService {
    fn new(client: Client, indices: Vec<String>, action: &'static str) -> Self {
        Self {
            client,
            indices,
            action,
            force: None,
            wait_if_ongoing: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    /// Flush even if not needed (flush only)
    pub fn force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }

    /// Block while another flush runs (flush only)
    pub fn wait_if_ongoing(mut self, wait: bool) -> Self {
        self.wait_if_ongoing = Some(wait);
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.indices.is_empty() {
            format!("/{}", self.action)
        } else {
            format!(
                "{}/{}",
                expand("/{index}", &[("index", &join_list(&self.indices))])?,
                self.action
            )
        };
        let params = self
            .options
            .apply(
                ParamsBuilder::new()
                    .opt("force", self.force)
                    .opt("wait_if_ongoing", self.wait_if_ongoing),
            )
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<ShardsResponse> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::POST, path).params(params))
            .await
    }
}

/// Builder for `PUT /{indices}/_mapping/{type}`
pub struct PutMappingService {
    client: Client,
    indices: Vec<String>,
    typ: String,
    body: Option<Value>,
    update_all_types: Option<bool>,
    timeout: Option<String>,
    master_timeout: Option<String>,
    options: IndicesOptions,
    pretty: bool,
}

impl PutMappingService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            typ: String::new(),
            body: None,
            update_all_types: None,
            timeout: None,
            master_timeout: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = typ.into();
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn update_all_types(mut self, update: bool) -> Self {
        self.update_all_types = Some(update);
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

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Type", self.typ.is_empty()), ("BodyJson", self.body.is_none())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.indices.is_empty() {
            expand("/_mapping/{type}", &[("type", &self.typ)])?
        } else {
            expand(
                "/{index}/_mapping/{type}",
                &[("index", &join_list(&self.indices)), ("type", &self.typ)],
            )?
        };
        let params = self
            .options
            .apply(
                ParamsBuilder::new()
                    .opt("update_all_types", self.update_all_types)
                    .opt("timeout", self.timeout.as_ref())
                    .opt("master_timeout", self.master_timeout.as_ref()),
            )
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let mut opts = PerformRequestOptions::new(Method::PUT, path).params(params);
        if let Some(body) = self.body {
            opts = opts.body(body);
        }
        self.client.send_json(opts).await
    }
}

/// Builder for `GET /{indices}/_mapping/{types}`
pub struct GetMappingService {
    client: Client,
    indices: Vec<String>,
    types: Vec<String>,
    local: Option<bool>,
    options: IndicesOptions,
    pretty: bool,
}

impl GetMappingService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            types: Vec::new(),
            local: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.types.push(typ.into());
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let indices = if self.indices.is_empty() {
            "_all".to_string()
        } else {
            join_list(&self.indices)
        };
        let path = if self.types.is_empty() {
            expand("/{index}/_mapping", &[("index", &indices)])?
        } else {
            expand(
                "/{index}/_mapping/{type}",
                &[("index", &indices), ("type", &join_list(&self.types))],
            )?
        };
        let params = self
            .options
            .apply(ParamsBuilder::new().opt("local", self.local))
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    /// Mappings keyed by index name
    pub async fn do_request(self) -> Result<HashMap<String, Value>> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

/// Builder for `PUT /{indices}/_settings`
pub struct PutSettingsService {
    client: Client,
    indices: Vec<String>,
    body: Option<Value>,
    flat_settings: Option<bool>,
    preserve_existing: Option<bool>,
    master_timeout: Option<String>,
    options: IndicesOptions,
    pretty: bool,
}

impl PutSettingsService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            body: None,
            flat_settings: None,
            preserve_existing: None,
            master_timeout: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn preserve_existing(mut self, preserve: bool) -> Self {
        self.preserve_existing = Some(preserve);
        self
    }

    pub fn master_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.master_timeout = Some(timeout.into());
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("BodyJson", self.body.is_none())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.indices.is_empty() {
            "/_settings".to_string()
        } else {
            expand(
                "/{index}/_settings",
                &[("index", &join_list(&self.indices))],
            )?
        };
        let params = self
            .options
            .apply(
                ParamsBuilder::new()
                    .opt("flat_settings", self.flat_settings)
                    .opt("preserve_existing", self.preserve_existing)
                    .opt("master_timeout", self.master_timeout.as_ref()),
            )
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let mut opts = PerformRequestOptions::new(Method::PUT, path).params(params);
        if let Some(body) = self.body {
            opts = opts.body(body);
        }
        self.client.send_json(opts).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub settings: Value,
}

/// Builder for `GET /{indices}/_settings/{names}`
pub struct GetSettingsService {
    client: Client,
    indices: Vec<String>,
    names: Vec<String>,
    local: Option<bool>,
    flat_settings: Option<bool>,
    options: IndicesOptions,
    pretty: bool,
}

impl GetSettingsService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            names: Vec::new(),
            local: None,
            flat_settings: None,
            options: IndicesOptions::default(),
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    /// Setting name filter, e.g. `index.number_of_*`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let indices = if self.indices.is_empty() {
            "_all".to_string()
        } else {
            join_list(&self.indices)
        };
        let path = if self.names.is_empty() {
            expand("/{index}/_settings", &[("index", &indices)])?
        } else {
            expand(
                "/{index}/_settings/{name}",
                &[("index", &indices), ("name", &join_list(&self.names))],
            )?
        };
        let params = self
            .options
            .apply(
                ParamsBuilder::new()
                    .opt("local", self.local)
                    .opt("flat_settings", self.flat_settings),
            )
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<HashMap<String, IndexSettings>> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

impl Client {
    pub fn create_index(&self, index: impl Into<String>) -> IndicesCreateService {
        IndicesCreateService::new(self.clone(), index)
    }

    pub fn delete_index<S: Into<String>>(
        &self,
        indices: impl IntoIterator<Item = S>,
    ) -> IndicesDeleteService {
        IndicesDeleteService::new(self.clone(), indices.into_iter().map(Into::into).collect())
    }

    pub fn index_exists<S: Into<String>>(
        &self,
        indices: impl IntoIterator<Item = S>,
    ) -> IndicesExistsService {
        IndicesExistsService::new(self.clone(), indices.into_iter().map(Into::into).collect())
    }

    pub fn get_index<S: Into<String>>(&self, indices: impl IntoIterator<Item = S>) -> IndicesGetService {
        IndicesGetService::new(self.clone(), indices.into_iter().map(Into::into).collect())
    }

    pub fn open_index(&self, index: impl Into<String>) -> IndicesOpenCloseService {
        IndicesOpenCloseService::new(self.clone(), index.into(), "_open")
    }

    pub fn close_index(&self, index: impl Into<String>) -> IndicesOpenCloseService {
        IndicesOpenCloseService::new(self.clone(), index.into(), "_close")
    }

    /// Refresh the given indices, or all indices when empty
    pub fn refresh<S: Into<String>>(&self, indices: impl IntoIterator<Item = S>) -> IndicesMaintenanceService {
        IndicesMaintenanceService::new(
            self.clone(),
            indices.into_iter().map(Into::into).collect(),
            "_refresh",
        )
    }

    /// Flush the given indices, or all indices when empty
    pub fn flush<S: Into<String>>(&self, indices: impl IntoIterator<Item = S>) -> IndicesMaintenanceService {
        IndicesMaintenanceService::new(
            self.clone(),
            indices.into_iter().map(Into::into).collect(),
            "_flush",
        )
    }

    pub fn put_mapping(&self) -> PutMappingService {
        PutMappingService::new(self.clone())
    }

    pub fn get_mapping(&self) -> GetMappingService {
        GetMappingService::new(self.clone())
    }

    pub fn put_settings(&self) -> PutSettingsService {
        PutSettingsService::new(self.clone())
    }

    pub fn get_settings(&self) -> GetSettingsService {
        GetSettingsService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_create_url_and_validation() {
        let client = test_client();
        let (path, params) = client
            .create_index("twitter")
            .timeout("30s")
            .wait_for_active_shards(2)
            .build_url()
            .unwrap();
        assert_eq!(path, "/twitter");
        assert_eq!(params["wait_for_active_shards"], "2");

        let err = client.create_index("").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("Index")));
    }

    #[test]
    fn test_delete_and_exists_urls() {
        let client = test_client();
        let (path, _) = client.delete_index(["a", "b"]).build_url().unwrap();
        assert_eq!(path, "/a,b");
        assert!(client.delete_index(Vec::<String>::new()).validate().is_err());

        let (path, params) = client
            .index_exists(["logs-*"])
            .indices_options(IndicesOptions {
                expand_wildcards: Some("open".into()),
                ..Default::default()
            })
            .build_url()
            .unwrap();
        assert_eq!(path, "/logs-*");
        assert_eq!(params["expand_wildcards"], "open");
    }

    #[test]
    fn test_get_index_url() {
        let client = test_client();
        assert_eq!(client.get_index(Vec::<String>::new()).build_url().unwrap().0, "/_all");
        let (path, _) = client
            .get_index(["twitter"])
            .feature("_settings")
            .feature("_mappings")
            .build_url()
            .unwrap();
        assert_eq!(path, "/twitter/_settings,_mappings");
    }

    #[test]
    fn test_open_close_refresh_flush_urls() {
        let client = test_client();
        assert_eq!(client.open_index("t").build_url().unwrap().0, "/t/_open");
        assert_eq!(client.close_index("t").build_url().unwrap().0, "/t/_close");
        assert_eq!(
            client.refresh(Vec::<String>::new()).build_url().unwrap().0,
            "/_refresh"
        );
        let (path, params) = client.flush(["a", "b"]).force(true).build_url().unwrap();
        assert_eq!(path, "/a,b/_flush");
        assert_eq!(params["force"], "true");
    }

    #[test]
    fn test_mapping_urls() {
        let client = test_client();
        let svc = client
            .put_mapping()
            .index("twitter")
            .typ("tweet")
            .body(json!({"properties": {"message": {"type": "text"}}}));
        assert!(svc.validate().is_ok());
        assert_eq!(svc.build_url().unwrap().0, "/twitter/_mapping/tweet");

        let err = client.put_mapping().validate().unwrap_err();
        assert!(err.to_string().contains("[Type, BodyJson]"));

        assert_eq!(client.get_mapping().build_url().unwrap().0, "/_all/_mapping");
        assert_eq!(
            client.get_mapping().index("a").typ("t").build_url().unwrap().0,
            "/a/_mapping/t"
        );
    }

    #[test]
    fn test_settings_urls() {
        let client = test_client();
        assert_eq!(client.put_settings().build_url().unwrap().0, "/_settings");
        assert!(client.put_settings().validate().is_err());
        let (path, _) = client
            .get_settings()
            .index("twitter")
            .name("index.number_of_*")
            .build_url()
            .unwrap();
        assert_eq!(path, "/twitter/_settings/index.number_of_*");
    }
}
