#![allow(dead_code)]

use rstest::fixture;

use podstore::{
    gateway::StoreGateway,
    memory::{InMemoryConnector, InMemoryStore},
    podcast::{Episode, Podcast},
};
use bson::oid::ObjectId;

pub type MemoryGateway = StoreGateway<InMemoryConnector>;

#[fixture]
pub fn gateway() -> MemoryGateway {
    StoreGateway::new(InMemoryStore::connector())
}

#[fixture]
pub async fn connected_gateway() -> MemoryGateway {
    let gateway = StoreGateway::new(InMemoryStore::connector());
    gateway.connect().await.unwrap();
    gateway
}

pub fn polyglot_podcast() -> Podcast {
    Podcast::new("The Polyglot Developer Podcast", "Nic Raboy")
        .with_tags(["development", "programming", "coding"])
}

pub fn quickstart_episodes(podcast: ObjectId) -> Vec<Episode> {
    vec![
        Episode::new(
            podcast,
            "GraphQL for API Development",
            "Learn about GraphQL from the co-creator of GraphQL, Lee Byron.",
            25,
        ),
        Episode::new(
            podcast,
            "Progressive Web Application Development",
            "Learn about PWA development with Tara Manicsic.",
            32,
        ),
    ]
}
