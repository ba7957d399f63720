use clap::{Parser, ValueEnum};

use podstore::config::{DEFAULT_CONNECT_TIMEOUT_SECS, GatewayConfig};

/// Document store the quickstart runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Process-local store, nothing to set up.
    Memory,
    /// A MongoDB deployment reached through `--mongodb-connection-url`.
    #[cfg(feature = "mongodb")]
    Mongodb,
}

/// Walks through inserting, reading, updating, replacing and deleting podcasts and episodes.
#[derive(Debug, Parser)]
#[command(name = "podstore-quickstart", version, about)]
pub struct QuickstartArgs {
    #[arg(env = "PODSTORE_BACKEND", long, value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// MongoDB connection string (`mongodb://` or `mongodb+srv://`).
    #[cfg_attr(not(feature = "mongodb"), allow(dead_code))]
    #[arg(env = "PODSTORE_MONGODB_CONNECTION_URL", long, default_value = "mongodb://localhost:27017")]
    pub mongodb_connection_url: String,

    #[arg(env = "PODSTORE_DATABASE_NAME", long, default_value = "quickstart")]
    pub database_name: String,

    #[arg(env = "PODSTORE_CONNECT_TIMEOUT_SECS", long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,

    /// Deadline for each store operation. Unbounded when not set.
    #[arg(env = "PODSTORE_OPERATION_TIMEOUT_SECS", long)]
    pub operation_timeout_secs: Option<u64>,
}

impl QuickstartArgs {
    pub fn gateway_config(&self) -> GatewayConfig {
        let builder = GatewayConfig::builder().with_connect_timeout_secs(self.connect_timeout_secs);

        match self.operation_timeout_secs {
            Some(secs) => builder.with_operation_timeout_secs(secs).build(),
            None => builder.build(),
        }
    }
}
