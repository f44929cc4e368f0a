use anyhow::Result;
use quarry::Client;
use serde_json::{json, Map, Value};

pub async fn run_create_index(
    client: &Client,
    name: &str,
    shards: Option<u32>,
    replicas: Option<u32>,
) -> Result<()> {
    let mut settings = Map::new();
    if let Some(shards) = shards {
        settings.insert("number_of_shards".into(), json!(shards));
    }
    if let Some(replicas) = replicas {
        settings.insert("number_of_replicas".into(), json!(replicas));
    }

    let mut svc = client.create_index(name);
    if !settings.is_empty() {
        svc = svc.body(json!({ "settings": Value::Object(settings) }));
    }
    let res = svc.do_request().await?;

    if res.acknowledged {
        println!("Created index {}", name);
    } else {
        println!("Index {} created, but not yet acknowledged by all nodes", name);
    }
    Ok(())
}

pub async fn run_delete_index(client: &Client, name: &str) -> Result<()> {
    let res = client.delete_index([name]).do_request().await?;
    if !res.acknowledged {
        anyhow::bail!("Deleting {} was not acknowledged", name);
    }
    println!("Deleted index {}", name);
    Ok(())
}

pub async fn run_index_exists(client: &Client, name: &str) -> Result<()> {
    let exists = client.index_exists([name]).do_request().await?;
    println!("{}", exists);
    if !exists {
        anyhow::bail!("index {} does not exist", name);
    }
    Ok(())
}

pub async fn run_refresh(client: &Client, name: &str) -> Result<()> {
    let res = client.refresh([name]).do_request().await?;
    println!(
        "Refreshed {}: {}/{} shards",
        name, res.shards.successful, res.shards.total
    );
    Ok(())
}
