//! The podcast data model.
//!
//! Podcasts live in the `podcasts` collection and episodes in `episodes`. An episode
//! points at its podcast through the podcast's identity. The store does not check
//! that reference; [`PodcastCatalog`](crate::catalog::PodcastCatalog) does.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use podstore_core::record::Record;

/// A podcast show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Podcast {
    /// Creates a podcast that has not been stored yet.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl Record for Podcast {
    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    fn collection_name() -> &'static str {
        "podcasts"
    }
}

/// A single episode of a [`Podcast`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Identity of the owning podcast.
    pub podcast: ObjectId,
    pub title: String,
    pub description: String,
    /// Length of the episode in minutes.
    pub duration: i32,
}

impl Episode {
    /// Creates an episode of `podcast` that has not been stored yet.
    pub fn new(
        podcast: ObjectId,
        title: impl Into<String>,
        description: impl Into<String>,
        duration: i32,
    ) -> Self {
        Self {
            id: None,
            podcast,
            title: title.into(),
            description: description.into(),
            duration,
        }
    }
}

impl Record for Episode {
    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    fn collection_name() -> &'static str {
        "episodes"
    }
}
