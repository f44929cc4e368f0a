use anyhow::{Context, Result};
use quarry::{Client, ClientConfig};

/// Print name, cluster and version of the first configured node
pub async fn run_ping(client: &Client, config: &ClientConfig) -> Result<()> {
    let url = config
        .urls
        .first()
        .context("no URL configured")?;
    let (info, status) = client.ping(url.clone()).do_request().await?;

    println!("URL:       {}", url);
    println!("Status:    {}", status);
    println!("Name:      {}", info.name);
    println!("Cluster:   {}", info.cluster_name);
    println!("Version:   {}", info.version.number);
    if !info.version.lucene_version.is_empty() {
        println!("Lucene:    {}", info.version.lucene_version);
    }

    Ok(())
}

/// Print cluster health, optionally waiting for a status first
pub async fn run_health(client: &Client, wait_for: Option<&str>, timeout: &str) -> Result<()> {
    let mut svc = client.cluster_health();
    if let Some(status) = wait_for {
        svc = svc.wait_for_status(status).timeout(timeout);
    }
    let health = svc.do_request().await?;

    println!("Cluster Health");
    println!("==============");
    println!("Cluster:      {}", health.cluster_name);
    println!("Status:       {}", health.status);
    println!("Nodes:        {} ({} data)", health.number_of_nodes, health.number_of_data_nodes);
    println!(
        "Shards:       {} active, {} primary",
        health.active_shards, health.active_primary_shards
    );
    println!(
        "              {} relocating, {} initializing, {} unassigned",
        health.relocating_shards, health.initializing_shards, health.unassigned_shards
    );
    println!("Active:       {:.1}%", health.active_shards_percent_as_number);

    if health.timed_out {
        anyhow::bail!(
            "timed out after {} waiting for status {}",
            timeout,
            wait_for.unwrap_or("?")
        );
    }

    Ok(())
}

/// Sniff and print every pooled connection
pub async fn run_nodes(client: &Client, config: &ClientConfig) -> Result<()> {
    client
        .sniff(config.sniffer_timeout())
        .await
        .context("sniffing cluster")?;

    let conns = client.conns();
    println!("{:<24} {:<32} {:<6}", "NODE", "URL", "STATE");
    println!("{}", "-".repeat(64));
    for conn in &conns {
        let state = if conn.is_dead() { "dead" } else { "alive" };
        println!("{:<24} {:<32} {:<6}", conn.node_id(), conn.url(), state);
    }
    println!();
    println!("{} connection(s)", conns.len());

    Ok(())
}
