use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use echostats::cli::{Cli, Command};
use echostats::store::{RecordStore, SqliteStore};
use echostats::{logging, report, sender, EchoServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref())?;

    match &cli.command {
        None => {
            let config = cli.config();
            let store = SqliteStore::open(&config.database)
                .with_context(|| format!("opening {}", config.database.display()))?;
            EchoServer::bind(config, Arc::new(store)).await?.run().await?;
        }
        Some(Command::Summary { json }) => {
            let store = SqliteStore::open(&cli.database)
                .with_context(|| format!("opening {}", cli.database.display()))?;
            let summaries = store.session_summaries().await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                println!("{}", report::render_table(&summaries));
            }
        }
        Some(Command::Send(args)) => {
            let (nonce, sent) = sender::send(args).await?;
            println!("sent {} packets with nonce {}", sent, nonce);
        }
    }

    Ok(())
}
