use std::sync::Arc;

use anyhow::Result;
use common::{config::AppConfig, logging};
use gh_client::RestGithubClient;
use surveyor::Surveyor;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;
    let client = Arc::new(RestGithubClient::new(
        &config.github.api_url,
        &config.github.token,
        &config.github.user_agent,
        config.survey.page_size,
    )?);

    let surveyor = Surveyor::new(config, client);
    let outcome = surveyor.run().await?;
    info!(
        total = outcome.total_repos,
        interesting = outcome.interesting_repos,
        "survey finished"
    );
    println!("Done! Please run ./clone_interesting.sh to finish the job.");
    Ok(())
}
