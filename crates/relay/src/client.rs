//! Process-wide remote client, created on first use.

use {
    std::{future::Future, pin::Pin, sync::Arc},
    tokio::sync::OnceCell,
    tracing::info,
};

use crate::{
    bridge::AsyncBridge,
    error::{Error, Result},
    remote::RemoteClient,
};

type ClientFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn RemoteClient>>> + Send>>;
type ClientFactory = Box<dyn Fn() -> ClientFuture + Send + Sync>;

/// Lazily connected client shared by every job.
///
/// The factory runs at most once successfully; concurrent first callers wait
/// for the same connection. A failed attempt leaves the cell empty so a later
/// job can try again. Once established the client is never recreated.
pub struct SharedClient {
    cell: OnceCell<Arc<dyn RemoteClient>>,
    factory: ClientFactory,
}

impl SharedClient {
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn RemoteClient>>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(move || Box::pin(factory())),
        }
    }

    /// Wrap an already connected client.
    pub fn ready(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(client)),
            factory: Box::new(|| {
                Box::pin(async { Err(Error::message("client factory already consumed")) })
            }),
        }
    }

    /// The shared client, connecting it if this is the first use.
    pub async fn get(&self) -> Result<Arc<dyn RemoteClient>> {
        let client = self
            .cell
            .get_or_try_init(|| async {
                let client = (self.factory)().await?;
                info!("remote client connected");
                Ok::<_, Error>(client)
            })
            .await?;
        Ok(Arc::clone(client))
    }

    /// Bridge over the shared client.
    pub async fn bridge(&self) -> Result<AsyncBridge> {
        Ok(AsyncBridge::new(self.get().await?))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }
}
