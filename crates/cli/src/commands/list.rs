//! `list` command implementation.

use dispatcher::list_valid_destinations;
use tracing::info;

use super::{load_config, open_store};
use crate::cli::ListArgs;
use crate::error::Result;

/// Execute the `list` command
pub async fn run_list(args: &ListArgs) -> Result<()> {
    let config = load_config(&args.config, args.store.as_ref())?;
    let (source, gateway) = open_store(&config);

    let valid = list_valid_destinations(&source, &gateway).await?;
    let ids = valid.collect().await;
    info!(
        store = %config.store.path.display(),
        valid = ids.len(),
        "Destinations listed"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&ids)?;
        println!("{json}");
    } else {
        for id in &ids {
            println!("{id}");
        }
    }
    Ok(())
}
