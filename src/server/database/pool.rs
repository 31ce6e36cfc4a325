use crate::server::database::connection::Connection;
use anyhow::{anyhow, Error};
use log::{error, info, warn};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;
use tokio_postgres::Client;

/// pause between attempts to replace a discarded connection
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// A client that can be handed out by a [`Pool`].
pub(crate) trait PooledClient: Send + 'static {
    /// a broken client is never handed out again, its slot gets a fresh one
    fn is_broken(&self) -> bool;
}

impl PooledClient for Client {
    fn is_broken(&self) -> bool {
        self.is_closed()
    }
}

type ConnectFuture<C> = Pin<Box<dyn Future<Output = Result<C, Error>> + Send>>;
type Connector<C> = Box<dyn Fn() -> ConnectFuture<C> + Send + Sync>;

pub(crate) struct CommonPool<C> {
    /// idle connections, handed out in a FIFO manner
    connections: Mutex<VecDeque<C>>,
    /// one permit per idle connection
    available: Semaphore,
    /// opens a replacement for a discarded connection
    connector: Option<Connector<C>>,
}

pub(crate) struct Pool<C>(Arc<CommonPool<C>>);

impl<C> Clone for Pool<C> {
    fn clone(&self) -> Pool<C> {
        Pool(self.0.clone())
    }
}

pub(crate) mod connect_util {
    use anyhow::Context;
    use log::error;
    use tokio_postgres::{Client, NoTls};

    pub async fn connect(conn_str: &str) -> Result<Client, anyhow::Error> {
        let (client, conn) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .context("failed to create connection")?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("connection returned error and aborted, {}", e);
            }
        });
        Ok(client)
    }
}

pub(crate) const DEFAULT_POOL_SIZE: usize = 10;

impl Pool<Client> {
    /// open `size` connections concurrently, fails if any of them can't be established.
    /// Connections that break later on are replaced with new ones to `conn_str`.
    pub async fn connect(conn_str: &str, size: usize) -> Result<Self, Error> {
        let mut set = JoinSet::new();
        for _ in 0..size {
            let str = conn_str.to_string();
            set.spawn(async move { connect_util::connect(str.as_str()).await });
        }
        let mut clients = Vec::with_capacity(size);
        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(client)) => {
                    info!("connection created");
                    clients.push(client);
                }
                Ok(Err(e)) => return Err(e),
                Err(e) => {
                    error!("join_next failed when joining, {}", e);
                    return Err(anyhow!(e));
                }
            };
        }
        let conn_str = conn_str.to_string();
        let pool = Self::with_connector(move || {
            let conn_str = conn_str.clone();
            async move { connect_util::connect(&conn_str).await }
        });
        Ok(pool.with_clients(clients))
    }
}

impl<C> Pool<C>
where
    C: PooledClient,
{
    /// create an empty pool that can't replace lost connections
    #[cfg(test)]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// create an empty pool, `connect` opens a replacement whenever a connection is discarded
    pub fn with_connector<F, Fut>(connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, Error>> + Send + 'static,
    {
        Self::build(Some(Box::new(move || -> ConnectFuture<C> { Box::pin(connect()) })))
    }

    fn build(connector: Option<Connector<C>>) -> Self {
        Self(Arc::new(CommonPool {
            connections: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
            connector,
        }))
    }

    pub fn with_clients(self, clients: impl IntoIterator<Item = C>) -> Self {
        for client in clients {
            self.release(client);
        }
        self
    }

    /// acquire a connection, bail out once `timeout` elapses.
    /// Idle connections found broken are discarded on the way.
    pub async fn acquire(&self, timeout: Duration) -> Option<Connection<C>> {
        let sleep = time::sleep(timeout);
        tokio::pin!(sleep);
        loop {
            let client = tokio::select! {
                permit = self.0.available.acquire() => {
                    // the permit is handed back by `release`
                    permit.ok()?.forget();
                    self.0.connections.lock().unwrap_or_else(PoisonError::into_inner).pop_front()?
                },
                _ = &mut sleep => {
                    error!("timed out to acquire a new connection from pool after {:?}", timeout);
                    return None;
                },
            };
            if client.is_broken() {
                self.discard(client);
                continue;
            }
            return Some(Connection::new(client, self.clone()));
        }
    }

    pub fn release(&self, client: C) {
        if client.is_broken() {
            self.discard(client);
            return;
        }
        self.0
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(client);
        self.0.available.add_permits(1);
    }

    /// Drop a client that must not be used again and fill its slot with a
    /// fresh connection in the background.
    pub fn discard(&self, client: C) {
        drop(client);
        if self.0.connector.is_none() {
            warn!("discarded a connection that can't be replaced, pool shrinks by one");
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.clone().replenish());
            }
            Err(_) => warn!("no runtime to replace a discarded connection, pool shrinks by one"),
        }
    }

    /// keep trying until a replacement connection is in the pool
    async fn replenish(self) {
        let Some(connect) = self.0.connector.as_ref() else {
            return;
        };
        loop {
            match connect().await {
                Ok(client) if !client.is_broken() => {
                    info!("replaced a discarded connection");
                    self.release(client);
                    return;
                }
                Ok(_) => error!("replacement connection is already closed, retrying in {:?}", RECONNECT_BACKOFF),
                Err(e) => error!("failed to replace a discarded connection, retrying in {:?}, {}", RECONNECT_BACKOFF, e),
            }
            time::sleep(RECONNECT_BACKOFF).await;
        }
    }

    /// number of idle connections
    pub fn idle(&self) -> usize {
        self.0.available.available_permits()
    }
}
