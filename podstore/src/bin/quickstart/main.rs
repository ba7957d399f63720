mod cli;

use clap::Parser;
use dotenvy::dotenv;
use futures::TryStreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use podstore::{
    memory::InMemoryStore,
    podcast::{Episode, Podcast},
    prelude::*,
};

use crate::cli::{Backend, QuickstartArgs};

#[tokio::main]
async fn main() -> DocumentStoreResult<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = QuickstartArgs::parse();
    let config = args.gateway_config();
    info!(backend = ?args.backend, database = %args.database_name, "starting quickstart");

    let result = match args.backend {
        Backend::Memory => run(StoreGateway::with_config(InMemoryStore::connector(), config)).await,
        #[cfg(feature = "mongodb")]
        Backend::Mongodb => {
            let connector = podstore::mongodb::MongoDbConnector::new(&args.mongodb_connection_url, &args.database_name)
                .with_connect_timeout(config.connect_timeout());

            run(StoreGateway::with_config(connector, config)).await
        }
    };

    if let Err(err) = &result {
        error!(error = %err, "quickstart failed");
    }

    result
}

async fn run<C: StoreConnector>(gateway: StoreGateway<C>) -> DocumentStoreResult<()> {
    gateway.connect().await?;

    let result = walkthrough(&gateway).await;
    gateway.disconnect().await?;

    result
}

async fn walkthrough<C: StoreConnector>(gateway: &StoreGateway<C>) -> DocumentStoreResult<()> {
    let podcasts = gateway.typed_collection::<Podcast>();
    let episodes = gateway.typed_collection::<Episode>();

    let podcast_id = podcasts
        .insert_one(
            &Podcast::new("The Polyglot Developer Podcast", "Nic Raboy")
                .with_tags(["development", "programming", "coding"]),
        )
        .await?;
    info!(id = %podcast_id, "inserted document into podcast collection");

    let episode_ids = episodes
        .insert_many(&[
            Episode::new(
                podcast_id,
                "GraphQL for API Development",
                "Learn about GraphQL from the co-creator of GraphQL, Lee Byron.",
                25,
            ),
            Episode::new(
                podcast_id,
                "Progressive Web Application Development",
                "Learn about PWA development with Tara Manicsic.",
                32,
            ),
        ])
        .await?;
    info!(count = episode_ids.len(), "inserted documents into episode collection");

    // Materialized: fine for small collections.
    let all = episodes.find_all(Filter::all()).await?;
    info!(episodes = ?all, "all episodes");

    // Streamed: one record at a time.
    let mut stream = episodes.find_stream(Filter::all()).await?;
    while let Some(episode) = stream.try_next().await? {
        info!(?episode, "streamed episode");
    }

    let podcast = podcasts.find_one(Filter::all()).await?;
    info!(?podcast, "first podcast");

    let filtered = episodes.find_all(Filter::eq("duration", 25)).await?;
    info!(episodes = ?filtered, "episodes lasting 25 minutes");

    let sorted = episodes
        .find_sorted(Filter::gt("duration", 22), "duration", SortDirection::Desc)
        .await?;
    info!(episodes = ?sorted, "episodes longer than 22 minutes, longest first");

    let updated = podcasts
        .update_one(Filter::id(podcast_id), Changes::new().set("author", "Nicolas Roby"))
        .await?;
    info!(modified = updated.modified_count, "updated documents");

    let replaced = podcasts
        .replace_one(
            Filter::eq("title", "The Polyglot Developer Podcast"),
            &Podcast::new("The Sudhakar Nandigam show", "Sudhakar N"),
        )
        .await?;
    info!(modified = replaced.modified_count, "replaced documents");

    let deleted = episodes.delete_one(Filter::eq("duration", 25)).await?;
    info!(deleted, "deleted documents");

    Ok(())
}
