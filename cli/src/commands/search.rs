use anyhow::Result;
use hubfetch_core::{model_dir, CancelToken, Config, HubClient, HubError, HuggingFaceHub, Messages, ModelSummary, Msg};
use std::path::Path;

pub async fn execute(config: &Config, messages: &Messages, cancel: CancelToken, query: &str) -> Result<()> {
    tracing::debug!(endpoint = %config.hub.endpoint, query, limit = config.hub.search_limit, "Searching");

    let hub = HuggingFaceHub::new(&config.hub.endpoint)?;
    let search = cancel.run_until_cancelled(hub.search(query, config.hub.search_limit));
    let results = match search.await {
        Ok(results) => results,
        Err(HubError::Cancelled) => {
            println!("{}", messages.get(Msg::ExitMessage));
            return Ok(());
        }
        Err(e) => {
            println!("{}", messages.render(Msg::SearchError, &[("error", &e)]));
            return Ok(());
        }
    };

    if results.is_empty() {
        println!("{}", messages.render(Msg::ModelNotFound, &[("query", &query)]));
        return Ok(());
    }

    print!("{}", render_table(&results, &config.download.directory));
    println!("\nRun `hubfetch pull <model>` to download a model.");

    Ok(())
}

/// One row per result. `LOCAL` marks models that already have a directory
/// under `root`.
fn render_table(results: &[ModelSummary], root: &Path) -> String {
    let mut table = format!("{:<50} {:>12} {:>8}  {}\n", "MODEL", "DOWNLOADS", "LIKES", "LOCAL");
    table.push_str(&"-".repeat(79));
    table.push('\n');

    for model in results {
        let local = if model_dir(root, &model.id).is_dir() { "yes" } else { "-" };
        table.push_str(&format!(
            "{:<50} {:>12} {:>8}  {}\n",
            model.id,
            format_number(model.downloads),
            model.likes,
            local
        ));
    }
    table
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
