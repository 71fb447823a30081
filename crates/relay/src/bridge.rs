//! Bounded request/response calls over the callback-based client.

use {
    std::{sync::Arc, time::Duration},
    tokio::sync::oneshot,
    tracing::{debug, warn},
};

use crate::{
    error::BridgeError,
    remote::{Chat, ChatId, FileId, Message, MessageId, RemoteClient, RemoteFile, Request, Response},
};

/// Turns the client's one-shot handlers into awaitable calls with a deadline.
///
/// Each call owns a fresh one-shot slot, so a late answer to a timed-out call
/// lands in a closed channel and is discarded. The remote operation itself is
/// never cancelled.
#[derive(Clone)]
pub struct AsyncBridge {
    client: Arc<dyn RemoteClient>,
}

impl AsyncBridge {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    /// Issue `request` and wait at most `timeout` for its response.
    ///
    /// `Response::Error` is returned as [`BridgeError::Remote`].
    pub async fn call(&self, request: Request, timeout: Duration) -> Result<Response, BridgeError> {
        let name = request.name();
        let (tx, rx) = oneshot::channel();
        self.client.send(
            request,
            Box::new(move |response| {
                if tx.send(response).is_err() {
                    debug!(request = name, "discarding late response");
                }
            }),
        );

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Response::Error { code, message })) => Err(BridgeError::Remote {
                request: name,
                code,
                message,
            }),
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BridgeError::Dropped { request: name }),
            Err(_) => {
                warn!(
                    request = name,
                    timeout_ms = timeout.as_millis() as u64,
                    "remote call timed out"
                );
                Err(BridgeError::Timeout {
                    request: name,
                    after: timeout,
                })
            },
        }
    }

    /// Fire-and-forget download kickoff.
    pub fn download_start(&self, file_id: FileId) {
        self.client.download_start(file_id);
    }

    pub async fn search_public_chat(
        &self,
        username: &str,
        timeout: Duration,
    ) -> Result<Chat, BridgeError> {
        match self
            .call(
                Request::SearchPublicChat {
                    username: username.to_string(),
                },
                timeout,
            )
            .await?
        {
            Response::Chat(chat) => Ok(chat),
            other => Err(unexpected("searchPublicChat", &other)),
        }
    }

    pub async fn get_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        timeout: Duration,
    ) -> Result<Message, BridgeError> {
        match self
            .call(
                Request::GetMessage {
                    chat_id,
                    message_id,
                },
                timeout,
            )
            .await?
        {
            Response::Message(message) => Ok(message),
            other => Err(unexpected("getMessage", &other)),
        }
    }

    pub async fn get_file(
        &self,
        file_id: FileId,
        timeout: Duration,
    ) -> Result<RemoteFile, BridgeError> {
        match self.call(Request::GetFile { file_id }, timeout).await? {
            Response::File(file) => Ok(file),
            other => Err(unexpected("getFile", &other)),
        }
    }
}

fn unexpected(request: &'static str, response: &Response) -> BridgeError {
    BridgeError::UnexpectedResponse {
        request,
        response: response.name(),
    }
}
