//! Outbound relay: copies one message, optionally with edited media, from a
//! source chat to a destination chat.
//!
//! The remote client is an external collaborator reached only through the
//! [`RemoteClient`] trait; [`AsyncBridge`] turns its callbacks into bounded
//! async calls. [`RelayPipeline`] drives a single [`RelayJob`] through
//! resolve, fetch, download, edit and send, and [`RelayService`] runs many
//! jobs concurrently over one [`SharedClient`].

pub mod bridge;
pub mod client;
pub mod destination;
pub mod error;
pub mod fetcher;
pub mod janitor;
pub mod job;
pub mod log;
pub mod outcome;
pub mod pipeline;
pub mod remote;
pub mod resolver;
pub mod service;

pub use {
    bridge::AsyncBridge,
    client::SharedClient,
    destination::{Destination, ResolveError, resolve_destination},
    error::{BridgeError, Error, ErrorKind, Result},
    fetcher::{FetchTimeout, FileFetcher},
    job::{JobInput, RelayJob, SourceRef},
    log::{JobLog, LogLevel, LogLine},
    outcome::{Fallback, PipelineOutcome, RelayReport},
    pipeline::{RelayPipeline, StepTimeouts},
    remote::{
        Chat, ChatId, FileId, InputMessageContent, LocalFile, Message, MessageContent, MessageId,
        PhotoSize, RemoteClient, RemoteFile, Request, Response, ResponseHandler,
    },
    resolver::{MediaDescriptor, resolve_media},
    service::{JobHandle, RelayService},
};
