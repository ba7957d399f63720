//! Application-level access to podcasts and their episodes.

use bson::oid::ObjectId;
use tracing::debug;

use podstore_core::{
    backend::StoreConnector,
    collection::TypedCollection,
    error::DocumentStoreResult,
    gateway::StoreGateway,
    query::{Filter, SortDirection},
};

use crate::podcast::{Episode, Podcast};

/// Podcasts and episodes of one gateway, with the episode to podcast reference
/// checked on write.
///
/// ```ignore
/// let catalog = PodcastCatalog::new(&gateway);
/// let show = catalog.add_podcast(&Podcast::new("The Polyglot Developer Podcast", "Nic Raboy")).await?;
/// catalog.add_episodes(show, vec![first, second]).await?;
/// ```
pub struct PodcastCatalog<'a, C: StoreConnector> {
    podcasts: TypedCollection<'a, C, Podcast>,
    episodes: TypedCollection<'a, C, Episode>,
}

impl<'a, C: StoreConnector> PodcastCatalog<'a, C> {
    pub fn new(gateway: &'a StoreGateway<C>) -> Self {
        Self {
            podcasts: gateway.typed_collection::<Podcast>(),
            episodes: gateway.typed_collection::<Episode>(),
        }
    }

    pub fn podcasts(&self) -> &TypedCollection<'a, C, Podcast> {
        &self.podcasts
    }

    pub fn episodes(&self) -> &TypedCollection<'a, C, Episode> {
        &self.episodes
    }

    pub async fn add_podcast(&self, podcast: &Podcast) -> DocumentStoreResult<ObjectId> {
        self.podcasts.insert_one(podcast).await
    }

    /// Stores `episodes` under the podcast with identity `podcast_id`.
    ///
    /// Each episode's `podcast` field is set to `podcast_id` before it is written.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotFound`](podstore_core::error::DocumentStoreError::NotFound)
    /// without writing anything if no such podcast exists.
    pub async fn add_episodes(
        &self,
        podcast_id: ObjectId,
        mut episodes: Vec<Episode>,
    ) -> DocumentStoreResult<Vec<ObjectId>> {
        self.podcasts.get(podcast_id).await?;

        for episode in &mut episodes {
            episode.podcast = podcast_id;
        }

        let ids = self.episodes.insert_many(&episodes).await?;
        debug!(podcast = %podcast_id, count = ids.len(), "added episodes");

        Ok(ids)
    }

    /// Returns the episodes of a podcast, shortest first.
    pub async fn episodes_of(&self, podcast_id: ObjectId) -> DocumentStoreResult<Vec<Episode>> {
        self.episodes
            .find_sorted(Filter::eq("podcast", podcast_id), "duration", SortDirection::Asc)
            .await
    }

    /// Deletes a podcast and then each of its episodes.
    ///
    /// Returns the number of episodes deleted. Not atomic: a failure part way leaves
    /// the remaining episodes in place.
    pub async fn remove_podcast(&self, podcast_id: ObjectId) -> DocumentStoreResult<u64> {
        self.podcasts.delete_one(Filter::id(podcast_id)).await?;

        let mut deleted = 0;
        while self.episodes.delete_one(Filter::eq("podcast", podcast_id)).await? == 1 {
            deleted += 1;
        }

        Ok(deleted)
    }
}
