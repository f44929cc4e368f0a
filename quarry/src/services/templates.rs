//! Index templates

use crate::client::{Client, PerformRequestOptions};
use crate::error::Result;
use crate::services::{require, AcknowledgedResponse, ParamsBuilder};
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Builder for `PUT /_template/{name}`
pub struct IndexPutTemplateService {
    client: Client,
    name: String,
    body: Option<Value>,
    create: Option<bool>,
    order: Option<i32>,
    timeout: Option<String>,
    master_timeout: Option<String>,
    flat_settings: Option<bool>,
    pretty: bool,
}

impl IndexPutTemplateService {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            body: None,
            create: None,
            order: None,
            timeout: None,
            master_timeout: None,
            flat_settings: None,
            pretty: false,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Fail instead of replacing an existing template
    pub fn create(mut self, create: bool) -> Self {
        self.create = Some(create);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
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

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Id", self.name.is_empty()), ("BodyJson", self.body.is_none())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand("/_template/{name}", &[("name", &self.name)])?;
        let params = ParamsBuilder::new()
            .opt("create", self.create)
            .opt("order", self.order)
            .opt("timeout", self.timeout.as_ref())
            .opt("master_timeout", self.master_timeout.as_ref())
            .opt("flat_settings", self.flat_settings)
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

/// A stored index template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexTemplate {
    #[serde(default)]
    pub order: i32,
    pub version: Option<i64>,
    #[serde(default)]
    pub index_patterns: Vec<String>,
    /// Pre-6.0 single pattern
    pub template: Option<String>,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
    #[serde(default)]
    pub mappings: HashMap<String, Value>,
    #[serde(default)]
    pub aliases: HashMap<String, Value>,
}

/// Builder for `GET /_template/{names}`
pub struct IndexGetTemplateService {
    client: Client,
    names: Vec<String>,
    local: Option<bool>,
    flat_settings: Option<bool>,
    pretty: bool,
}

impl IndexGetTemplateService {
    pub fn new(client: Client, names: Vec<String>) -> Self {
        Self {
            client,
            names,
            local: None,
            flat_settings: None,
            pretty: false,
        }
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.names.is_empty() {
            "/_template".to_string()
        } else {
            expand("/_template/{name}", &[("name", &join_list(&self.names))])?
        };
        let params = ParamsBuilder::new()
            .opt("local", self.local)
            .opt("flat_settings", self.flat_settings)
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<HashMap<String, IndexTemplate>> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

/// Builder for `DELETE /_template/{name}` and `HEAD /_template/{name}`
pub struct IndexTemplateService {
    client: Client,
    name: String,
    timeout: Option<String>,
    master_timeout: Option<String>,
    pretty: bool,
}

impl IndexTemplateService {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
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
        require(&[("Id", self.name.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand("/_template/{name}", &[("name", &self.name)])?;
        let params = ParamsBuilder::new()
            .opt("timeout", self.timeout.as_ref())
            .opt("master_timeout", self.master_timeout.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn delete(self) -> Result<AcknowledgedResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::DELETE, path).params(params))
            .await
    }

    /// `true` on 200, `false` on 404
    pub async fn exists(self) -> Result<bool> {
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

impl Client {
    pub fn put_template(&self, name: impl Into<String>) -> IndexPutTemplateService {
        IndexPutTemplateService::new(self.clone(), name)
    }

    pub fn get_template<S: Into<String>>(
        &self,
        names: impl IntoIterator<Item = S>,
    ) -> IndexGetTemplateService {
        IndexGetTemplateService::new(self.clone(), names.into_iter().map(Into::into).collect())
    }

    pub async fn delete_template(&self, name: impl Into<String>) -> Result<AcknowledgedResponse> {
        IndexTemplateService::new(self.clone(), name).delete().await
    }

    pub async fn template_exists(&self, name: impl Into<String>) -> Result<bool> {
        IndexTemplateService::new(self.clone(), name).exists().await
    }

    /// Builder for template deletion or existence checks with extra options
    pub fn template(&self, name: impl Into<String>) -> IndexTemplateService {
        IndexTemplateService::new(self.clone(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use serde_json::json;

    #[test]
    fn test_put_template_url() {
        let svc = test_client()
            .put_template("logs")
            .create(true)
            .order(5)
            .body(json!({"index_patterns": ["logs-*"]}));
        assert!(svc.validate().is_ok());
        let (path, params) = svc.build_url().unwrap();
        assert_eq!(path, "/_template/logs");
        assert_eq!(params["create"], "true");
        assert_eq!(params["order"], "5");
    }

    #[test]
    fn test_put_template_requires_body() {
        let err = test_client().put_template("logs").validate().unwrap_err();
        assert!(err.to_string().contains("BodyJson"));
    }

    #[test]
    fn test_get_template_url() {
        let client = test_client();
        assert_eq!(client.get_template(Vec::<String>::new()).build_url().unwrap().0, "/_template");
        assert_eq!(
            client.get_template(["a", "b"]).build_url().unwrap().0,
            "/_template/a,b"
        );
    }

    #[test]
    fn test_decode_template() {
        let res: HashMap<String, IndexTemplate> = serde_json::from_value(json!({
            "logs": {"order": 1, "index_patterns": ["logs-*"], "settings": {"index": {"number_of_shards": "1"}}, "mappings": {}, "aliases": {}}
        }))
        .unwrap();
        assert_eq!(res["logs"].order, 1);
        assert_eq!(res["logs"].index_patterns, vec!["logs-*"]);
    }
}
