use std::net::SocketAddrV4;
use std::str::FromStr;
use std::time::Duration;
use derive_more::Display;

/// Which persistence backend the server talks to
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreBackend {
    #[display("postgres")]
    Postgres,
    #[display("memory")]
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            s => Err(format!("Invalid store backend: {s}")),
        }
    }
}

/// Server configs
#[derive(Debug)]
pub(crate) struct ServerConfig {
    pub addr: SocketAddrV4,
    pub store: StoreBackend,
    pub db_conn_str: String,
    /// connection pool size
    pub db_pool_size: usize,
    /// how long a request waits for a pooled connection
    pub db_timeout: Duration,
}

impl ServerConfig {
    pub fn new(
        addr: SocketAddrV4,
        store: StoreBackend,
        db_conn_str: String,
        db_pool_size: usize,
        db_timeout: Duration,
    ) -> Self {
        Self {
            addr,
            store,
            db_conn_str,
            db_pool_size,
            db_timeout,
        }
    }
}
