//! Scripted stand-ins for the remote client and the transform tool.

#![allow(dead_code)]

use {
    async_trait::async_trait,
    courier_config::{CourierConfig, LogsConfig},
    courier_media::{
        Dimensions, FilterGraphBuilder, MediaEditor, MediaKind, MediaProbe, TransformReport,
        TransformRequest, TransformTool,
    },
    courier_relay::{
        AsyncBridge, Chat, ChatId, FileFetcher, FileId, InputMessageContent, JobInput, JobLog,
        LocalFile, Message, MessageContent, MessageId, PhotoSize, PipelineOutcome, RelayJob,
        RelayPipeline, RemoteClient, RemoteFile, Request, Response, ResponseHandler, StepTimeouts,
    },
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
        time::Duration,
    },
    tempfile::TempDir,
};

/// In-memory backend. Every answer is delivered from a spawned task.
#[derive(Default)]
pub struct ScriptedClient {
    chats: Mutex<HashMap<String, ChatId>>,
    messages: Mutex<HashMap<(ChatId, MessageId), MessageContent>>,
    files: Mutex<HashMap<FileId, PathBuf>>,
    send_error: Mutex<Option<(i32, String)>>,
    silent: Mutex<bool>,
    pub requests: Mutex<Vec<Request>>,
    pub downloads: Mutex<Vec<FileId>>,
    /// Whether each sent media file existed when the send was issued.
    pub sent_file_existed: Mutex<Vec<bool>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_chat(&self, username: &str, id: ChatId) {
        self.chats.lock().unwrap().insert(username.to_string(), id);
    }

    pub fn with_message(&self, chat_id: ChatId, message_id: MessageId, content: MessageContent) {
        self.messages
            .lock()
            .unwrap()
            .insert((chat_id, message_id), content);
    }

    /// Make `file_id` downloadable from `path`.
    pub fn with_file(&self, file_id: FileId, path: &Path) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id, path.to_path_buf());
    }

    pub fn fail_sends(&self, code: i32, message: &str) {
        *self.send_error.lock().unwrap() = Some((code, message.to_string()));
    }

    /// Stop answering anything.
    pub fn go_silent(&self) {
        *self.silent.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<(ChatId, InputMessageContent)> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::SendMessage { chat_id, content } => Some((chat_id, content)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.requests().iter().filter(|r| r.name() == name).count()
    }

    fn answer(&self, request: &Request) -> Response {
        match request {
            Request::SearchPublicChat { username } => {
                match self.chats.lock().unwrap().get(username) {
                    Some(id) => Response::Chat(Chat {
                        id: *id,
                        title: username.clone(),
                    }),
                    None => Response::Error {
                        code: 400,
                        message: "USERNAME_NOT_OCCUPIED".into(),
                    },
                }
            },
            Request::GetMessage {
                chat_id,
                message_id,
            } => match self.messages.lock().unwrap().get(&(*chat_id, *message_id)) {
                Some(content) => Response::Message(Message {
                    id: *message_id,
                    chat_id: *chat_id,
                    content: content.clone(),
                }),
                None => Response::Error {
                    code: 404,
                    message: "Message not found".into(),
                },
            },
            Request::GetFile { file_id } => {
                let started = self.downloads.lock().unwrap().contains(file_id);
                let local = match self.files.lock().unwrap().get(file_id) {
                    Some(path) if started => LocalFile {
                        path: path.to_string_lossy().into_owned(),
                        is_downloading_completed: true,
                    },
                    _ => LocalFile::default(),
                };
                Response::File(RemoteFile {
                    id: *file_id,
                    size: 1024,
                    local,
                })
            },
            Request::SendMessage { content, .. } => {
                if let Some(path) = content.path() {
                    self.sent_file_existed.lock().unwrap().push(path.exists());
                }
                match self.send_error.lock().unwrap().clone() {
                    Some((code, message)) => Response::Error { code, message },
                    None => Response::Message(Message {
                        id: 1,
                        chat_id: 0,
                        content: MessageContent::Other,
                    }),
                }
            },
        }
    }
}

impl RemoteClient for ScriptedClient {
    fn send(&self, request: Request, handler: ResponseHandler) {
        self.requests.lock().unwrap().push(request.clone());
        if *self.silent.lock().unwrap() {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                drop(handler);
            });
            return;
        }
        let response = self.answer(&request);
        tokio::spawn(async move { handler(response) });
    }

    fn download_start(&self, file_id: FileId) {
        self.downloads.lock().unwrap().push(file_id);
    }
}

/// Probe reporting a fixed frame size.
pub struct FixedProbe(pub Dimensions);

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn dimensions(&self, _path: &Path, _kind: MediaKind) -> courier_media::Result<Dimensions> {
        Ok(self.0)
    }
}

/// Transform tool that either writes a fake output or exits non-zero.
pub struct ScriptedTool {
    pub succeed: bool,
    pub requests: Mutex<Vec<TransformRequest>>,
}

impl ScriptedTool {
    pub fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TransformRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransformTool for ScriptedTool {
    async fn run(&self, request: &TransformRequest) -> courier_media::Result<TransformReport> {
        self.requests.lock().unwrap().push(request.clone());
        if self.succeed {
            std::fs::write(&request.output, b"edited")?;
            Ok(TransformReport {
                status: Some(0),
                success: true,
                transcript: "frame=  10 fps=0.0 q=-1.0 Lsize=1kB".into(),
            })
        } else {
            Ok(TransformReport {
                status: Some(1),
                success: false,
                transcript: "Error initializing filter 'crop'\nConversion failed!".into(),
            })
        }
    }
}

pub const SRC_CHAT: ChatId = -100_200;
pub const SRC_MSG: MessageId = 77;

/// One pipeline over a scripted client, with its own temp dirs.
pub struct Harness {
    pub client: Arc<ScriptedClient>,
    pub tool: Arc<ScriptedTool>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(tool_succeeds: bool) -> Self {
        Self {
            client: ScriptedClient::new(),
            tool: ScriptedTool::new(tool_succeeds),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Directory standing in for the remote client's download cache.
    pub fn cache_dir(&self) -> PathBuf {
        let dir = self.dir.path().join("cache");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn scratch_dir(&self) -> PathBuf {
        let dir = self.dir.path().join("scratch").join("job");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    /// Put a downloadable file in the cache and return its path.
    pub fn cached_file(&self, file_id: FileId, name: &str) -> PathBuf {
        let path = self.cache_dir().join(name);
        std::fs::write(&path, b"original media").unwrap();
        self.client.with_file(file_id, &path);
        path
    }

    pub fn editor(&self) -> MediaEditor {
        MediaEditor::new(
            FilterGraphBuilder::default(),
            Arc::new(FixedProbe(Dimensions::new(1280, 720).unwrap())),
            self.tool.clone(),
        )
    }

    pub fn pipeline(&self) -> RelayPipeline {
        let bridge = AsyncBridge::new(self.client.clone());
        let fetcher = FileFetcher::new(
            bridge.clone(),
            Duration::from_millis(250),
            Duration::from_secs(10),
        );
        RelayPipeline::new(bridge, fetcher, self.editor(), StepTimeouts::default())
    }

    pub fn config(&self) -> CourierConfig {
        let mut config = CourierConfig::default();
        config.relay.scratch_dir = Some(self.dir.path().join("scratch"));
        config.relay.log_dir = Some(self.log_dir());
        config
    }

    pub async fn run(&self, input: JobInput) -> PipelineOutcome {
        let job = RelayJob::from(input);
        let log = JobLog::new(job.id(), &self.log_dir(), &LogsConfig::default());
        self.pipeline().run(&job, &self.scratch_dir(), &log).await
    }
}

pub fn media_job(target: &str, caption: &str) -> JobInput {
    JobInput {
        job_id: Some("job-under-test".into()),
        src_chat_id: Some(SRC_CHAT),
        src_message_id: Some(SRC_MSG),
        target_identifier: target.into(),
        caption_text: caption.into(),
        ..JobInput::default()
    }
}

pub fn photo(sizes: &[(i32, u64)]) -> MessageContent {
    MessageContent::Photo {
        sizes: sizes
            .iter()
            .map(|(id, bytes)| PhotoSize {
                width: 100,
                height: 100,
                photo: RemoteFile::new(FileId(*id), *bytes),
            })
            .collect(),
        caption: String::new(),
    }
}

pub fn video(id: i32) -> MessageContent {
    MessageContent::Video {
        video: RemoteFile::new(FileId(id), 4096),
        caption: String::new(),
    }
}

pub fn regular_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}
