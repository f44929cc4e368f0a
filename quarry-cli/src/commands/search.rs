use anyhow::Result;
use quarry::dsl::{MatchAllQuery, QueryStringQuery};
use quarry::Client;
use serde_json::json;

/// Print each hit as one JSON line on stdout, a summary on stderr
pub async fn run_search(client: &Client, index: &str, query: Option<&str>, size: u64) -> Result<()> {
    let svc = client.search([index]).size(size);
    let svc = match query {
        Some(q) => svc.query(QueryStringQuery::new(q)),
        None => svc.query(MatchAllQuery::new()),
    };
    let res = svc.do_request().await?;

    for hit in &res.hits.hits {
        let line = json!({
            "_index": hit.index,
            "_id": hit.id,
            "_score": hit.score,
            "_source": hit.source,
        });
        println!("{}", serde_json::to_string(&line)?);
    }
    eprintln!(
        "{} of {} hits in {}ms",
        res.hits.hits.len(),
        res.total_hits(),
        res.took
    );

    Ok(())
}

pub async fn run_count(client: &Client, index: &str, query: Option<&str>) -> Result<()> {
    let mut svc = client.count([index]);
    if let Some(q) = query {
        svc = svc.query(QueryStringQuery::new(q));
    }
    let count = svc.do_request().await?;
    println!("{}", count);
    Ok(())
}
