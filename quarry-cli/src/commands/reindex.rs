use anyhow::Result;
use quarry::Client;

pub async fn run_reindex(client: &Client, source: &str, dest: &str, wait: bool) -> Result<()> {
    let res = client
        .reindex()
        .source_index(source)
        .destination_index(dest)
        .wait_for_completion(wait)
        .do_request()
        .await?;

    if let Some(task) = res.task {
        println!("Reindex started as task {}", task);
        return Ok(());
    }

    println!("Reindex completed:");
    println!("  Total:      {}", res.total);
    println!("  Created:    {}", res.created);
    println!("  Updated:    {}", res.updated);
    println!("  Conflicts:  {}", res.version_conflicts);
    println!("  Batches:    {}", res.batches);
    println!("  Time:       {}ms", res.took);
    if !res.failures.is_empty() {
        anyhow::bail!("{} document(s) failed", res.failures.len());
    }

    Ok(())
}
