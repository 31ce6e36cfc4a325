use crate::server::database::pool::{Pool, PooledClient};

/// A client checked out of a [`Pool`]; goes back to the pool on drop.
pub(crate) struct Connection<C>
where
    C: PooledClient,
{
    client: Option<C>,
    pool: Pool<C>,
}

impl<C> Connection<C>
where
    C: PooledClient,
{
    pub fn new(client: C, pool: Pool<C>) -> Self {
        Self { client: Some(client), pool }
    }

    pub fn client(&self) -> &C {
        self.client
            .as_ref()
            .expect("client is present until taken out of the connection")
    }

    /// Take the client out so that dropping this connection does not return it.
    pub fn take_client(&mut self) -> Option<C> {
        self.client.take()
    }

    pub fn pool(&self) -> &Pool<C> {
        &self.pool
    }
}

impl<C> Drop for Connection<C>
where
    C: PooledClient,
{
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}
