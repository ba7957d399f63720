//! The document store gateway: connection lifecycle and access to collections.
//!
//! A [`StoreGateway`] owns a [`StoreConnector`] and the connection it opens. It is either
//! disconnected or connected:
//!
//! - [`StoreGateway::connect`] moves it from disconnected to connected
//! - [`StoreGateway::disconnect`] moves it back and shuts the connection down
//! - every data operation on a [`Collection`] or [`TypedCollection`] fails with
//!   [`DocumentStoreError::NotConnected`] while disconnected
//!
//! Dropping a connected gateway drops its backend, which releases the driver's resources.
//!
//! # Example
//!
//! ```ignore
//! use podstore::{gateway::StoreGateway, memory::InMemoryStore};
//!
//! let gateway = StoreGateway::new(InMemoryStore::connector());
//! gateway.connect().await?;
//!
//! let podcasts = gateway.typed_collection::<Podcast>();
//! let id = podcasts.insert_one(&podcast).await?;
//!
//! gateway.disconnect().await?;
//! ```

use futures::{StreamExt, stream};
use mea::rwlock::RwLock;
use std::{future::Future, mem};
use tracing::{debug, info, warn};

use crate::{
    backend::{DocumentStream, StoreBackend, StoreConnector},
    collection::{Collection, TypedCollection},
    config::GatewayConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

/// Connection state of a gateway.
#[derive(Debug)]
pub enum ConnectionState<B> {
    /// No live connection. Data operations fail.
    Disconnected,
    /// A live connection to the store.
    Connected(B),
}

impl<B> ConnectionState<B> {
    /// Returns `true` if a connection is held.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Returns the live backend, or [`DocumentStoreError::NotConnected`].
    pub fn backend(&self) -> DocumentStoreResult<&B> {
        match self {
            ConnectionState::Connected(backend) => Ok(backend),
            ConnectionState::Disconnected => Err(DocumentStoreError::NotConnected),
        }
    }
}

/// Typed facade over one document store endpoint.
///
/// The gateway is `Send + Sync` when its connector is. Data operations share the
/// connection. Connecting and disconnecting wait for in-flight operations to finish.
pub struct StoreGateway<C: StoreConnector> {
    connector: C,
    config: GatewayConfig,
    pub(crate) state: RwLock<ConnectionState<C::Backend>>,
}

impl<C: StoreConnector> StoreGateway<C> {
    /// Creates a disconnected gateway with the default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, GatewayConfig::default())
    }

    /// Creates a disconnected gateway with the given configuration.
    pub fn with_config(connector: C, config: GatewayConfig) -> Self {
        Self {
            connector,
            config,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Returns the gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the connector this gateway opens connections with.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns `true` if the gateway currently holds a connection.
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.is_connected()
    }

    /// Opens a connection to the store.
    ///
    /// Connecting an already connected gateway does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Connection`] if the endpoint is unreachable, the
    /// credentials are rejected, or the connect deadline passes.
    pub async fn connect(&self) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;

        if state.is_connected() {
            debug!("gateway already connected");
            return Ok(());
        }

        let timeout = self.config.connect_timeout();
        let backend = match tokio::time::timeout(timeout, self.connector.connect()).await {
            Ok(Ok(backend)) => backend,
            Ok(Err(err)) => {
                warn!(error = %err, "failed to connect to document store");
                return Err(err);
            }
            Err(_) => {
                warn!(?timeout, "connecting to document store timed out");
                return Err(DocumentStoreError::Connection(format!("timed out after {timeout:?}")));
            }
        };

        *state = ConnectionState::Connected(backend);
        info!("connected to document store");

        Ok(())
    }

    /// Shuts the connection down.
    ///
    /// Disconnecting a disconnected gateway does nothing. The gateway is disconnected
    /// afterwards even if the backend reports a shutdown error.
    pub async fn disconnect(&self) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;

        match mem::replace(&mut *state, ConnectionState::Disconnected) {
            ConnectionState::Connected(backend) => {
                backend.shutdown().await?;
                info!("disconnected from document store");
                Ok(())
            }
            ConnectionState::Disconnected => Ok(()),
        }
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, C> {
        Collection::new(name.to_string(), self)
    }

    /// Gets a typed collection for the specified record type.
    ///
    /// The collection name is determined by the record type's `collection_name()` method.
    pub fn typed_collection<'a, R: Record>(&'a self) -> TypedCollection<'a, C, R> {
        TypedCollection::new(self.collection(R::collection_name()))
    }

    /// Runs a data operation under the configured operation deadline.
    ///
    /// On expiry the operation's future is dropped, abandoning the request.
    pub(crate) async fn bounded<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = DocumentStoreResult<T>>,
    ) -> DocumentStoreResult<T> {
        let Some(timeout) = self.config.operation_timeout() else {
            return future.await;
        };

        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, ?timeout, "operation abandoned after deadline");
                Err(DocumentStoreError::Timeout { operation, timeout })
            }
        }
    }

    /// Applies the operation deadline to each pull of a document stream.
    ///
    /// A pull that outlasts the deadline yields one `Timeout` error and ends the stream.
    pub(crate) fn bounded_stream(&self, operation: &'static str, documents: DocumentStream) -> DocumentStream {
        let Some(timeout) = self.config.operation_timeout() else {
            return documents;
        };

        stream::unfold(Some(documents), move |documents| async move {
            let mut documents = documents?;

            match tokio::time::timeout(timeout, documents.next()).await {
                Ok(Some(item)) => Some((item, Some(documents))),
                Ok(None) => None,
                Err(_) => {
                    warn!(operation, ?timeout, "stream abandoned after deadline");
                    Some((Err(DocumentStoreError::Timeout { operation, timeout }), None))
                }
            }
        })
        .boxed()
    }
}
