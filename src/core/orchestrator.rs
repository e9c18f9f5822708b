//! 会话编排器：主控循环
//!
//! 负责：建立 cmd/view/announcement 三通道，在后台任务中串行消费命令与内部事件
//! （课程加载完成、延时解析到期），驱动 SessionEngine 并在每次处理后投影 SessionView。
//!
//! 课程加载与延时解析都是带戳的单次异步完成：加载以 attempt 序号比对，
//! 延时解析以 TaskTicket 比对，过期的完成一律忽略。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, watch};

use crate::core::builder::create_session_builder;
use crate::core::{
    ContentError, RecoveryAction, RecoveryEngine, SessionError, SessionSupervisor, SessionView, ViewNotes,
    VoiceError,
};
use crate::curriculum::{Curriculum, CurriculumSource, Mode};
use crate::engine::{
    BroadcastObserver, Resolution, Response, SessionEngine, SessionPhase, SubmitOutcome, TaskAnnouncement,
    TaskTicket, TranscriptAction,
};

/// 从呈现层 / 语音层发往编排器的命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 开始学习（内容未就绪时会在到达后自动开始）
    Start,
    /// 对某个任务作答
    Respond { ticket: TaskTicket, response: Response },
    /// 语音转写结果；ticket 为采集开始时的任务票据
    Transcript { ticket: Option<TaskTicket>, text: String },
    /// 语音采集失败
    VoiceFailed(VoiceError),
    VoiceRestored,
    SetMode(Mode),
    /// 回到开始前状态，保留进度
    Stop,
    /// 清空进度
    Reset,
    /// 重新获取课程（仅在尚未加载成功时）
    Reload,
    Quit,
}

/// 后台任务回送的内部事件
#[derive(Debug)]
enum Internal {
    CurriculumLoaded {
        attempt: u64,
        result: Result<Curriculum, ContentError>,
    },
    Resume(TaskTicket),
}

struct SessionActor {
    engine: SessionEngine,
    source: Arc<dyn CurriculumSource>,
    recovery: RecoveryEngine,
    supervisor: SessionSupervisor,
    notes: ViewNotes,
    load_attempt: u64,
    view_tx: watch::Sender<SessionView>,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

impl SessionActor {
    fn publish(&self) {
        let _ = self.view_tx.send(SessionView::project(&self.engine, &self.notes));
    }

    /// 发起一次课程加载；之前未完成的加载随之过期
    fn load(&mut self) {
        self.load_attempt += 1;
        self.notes.content_loading = true;
        let attempt = self.load_attempt;
        let source = self.source.clone();
        let tx = self.internal_tx.clone();
        let cancel = self.supervisor.cancel_token();
        tracing::info!(attempt, source = %source.describe(), "Loading curriculum");
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = source.fetch() => {
                    let _ = tx.send(Internal::CurriculumLoaded { attempt, result });
                }
            }
        });
    }

    /// 安排延时解析：sleep 与取消 token 赛跑
    fn schedule(&mut self, ticket: TaskTicket, delay: Duration) {
        let token = self.supervisor.arm();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(ticket = %ticket, "Deferred resolution cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(Internal::Resume(ticket));
                }
            }
        });
    }

    fn apply_resolution(&mut self, resolution: Resolution) {
        if let Resolution::Terminal(message) = resolution {
            tracing::info!(message = %message, "Session reached the end of the curriculum");
        }
    }

    fn apply_submit(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Ignored => {}
            SubmitOutcome::Retry { verdict, .. } => {
                self.notes.feedback = verdict.feedback;
            }
            SubmitOutcome::Advanced {
                resume,
                delay,
                tier_raised,
            } => {
                self.notes.clear();
                self.notes.notice = tier_raised.map(|tier| format!("tier {tier} unlocked"));
                self.schedule(resume, delay);
            }
            SubmitOutcome::Regressed {
                resume,
                delay,
                diagnostic,
                verdict,
            } => {
                self.notes.feedback = verdict.feedback;
                self.notes.diagnostic = Some(diagnostic);
                self.schedule(resume, delay);
            }
        }
    }

    fn apply_error(&mut self, err: SessionError) {
        match self.recovery.handle(&err) {
            RecoveryAction::AwaitRetry => {
                if !self.notes.content_loading {
                    self.load();
                }
                self.notes.notice = Some("loading content".to_string());
            }
            action => {
                tracing::debug!(?action, "Recovery applied");
                self.notes.notice = Some(err.to_string());
            }
        }
    }

    /// 处理一条命令；返回 false 表示退出
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Start => {
                if !matches!(self.engine.phase(), SessionPhase::PreStart { .. }) {
                    tracing::debug!("Session already started");
                    return true;
                }
                self.notes.clear();
                match self.engine.start() {
                    Ok(resolution) => self.apply_resolution(resolution),
                    Err(e) => self.apply_error(e),
                }
            }
            Command::Respond { ticket, response } => {
                let outcome = self.engine.submit(&ticket, response);
                self.apply_submit(outcome);
            }
            Command::Transcript { ticket, text } => match self.engine.handle_transcript(ticket.as_ref(), &text) {
                TranscriptAction::Started(Ok(resolution)) => {
                    self.notes.clear();
                    self.apply_resolution(resolution);
                }
                TranscriptAction::Started(Err(e)) => self.apply_error(e),
                TranscriptAction::Stopped => {
                    self.supervisor.cancel_pending();
                    self.notes.clear();
                }
                TranscriptAction::Submitted(outcome) => self.apply_submit(outcome),
                TranscriptAction::Ignored => {}
            },
            Command::VoiceFailed(err) => {
                let message = format!("voice unavailable ({err}), tap or type instead");
                self.engine.voice_failed(err);
                self.notes.notice = Some(message);
            }
            Command::VoiceRestored => self.engine.voice_restored(),
            Command::SetMode(mode) => {
                if let Some(resolution) = self.engine.set_mode(mode) {
                    self.notes.clear();
                    self.apply_resolution(resolution);
                }
            }
            Command::Stop => {
                self.supervisor.cancel_pending();
                self.engine.stop();
                self.notes.clear();
            }
            Command::Reset => {
                self.supervisor.cancel_pending();
                self.engine.reset();
                self.notes.clear();
            }
            Command::Reload => {
                if self.engine.has_curriculum() {
                    tracing::debug!("Curriculum already loaded, reload ignored");
                } else {
                    self.load();
                }
            }
            Command::Quit => return false,
        }
        true
    }

    fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::CurriculumLoaded { attempt, result } => {
                if attempt != self.load_attempt {
                    tracing::debug!(attempt, current = self.load_attempt, "Stale curriculum load ignored");
                    return;
                }
                self.notes.content_loading = false;
                match result {
                    Ok(curriculum) => {
                        self.notes.notice = None;
                        if let Some(resolution) = self.engine.install_curriculum(curriculum) {
                            self.apply_resolution(resolution);
                        }
                    }
                    Err(e) => {
                        let err = SessionError::Content(e);
                        self.recovery.handle(&err);
                        self.notes.notice = Some(format!("{err}; start again to retry"));
                    }
                }
            }
            Internal::Resume(ticket) => {
                self.supervisor.settle();
                if let Some(resolution) = self.engine.resume(&ticket) {
                    self.notes.clear();
                    self.apply_resolution(resolution);
                }
            }
        }
    }
}

/// 启动会话运行时：返回命令发送端、视图接收端、任务播报接收端；
/// 后台任务立即开始加载课程，并消费命令直到 Quit 或发送端全部关闭。
pub fn spawn_session(
    mut engine: SessionEngine,
    source: Arc<dyn CurriculumSource>,
) -> (
    mpsc::UnboundedSender<Command>,
    watch::Receiver<SessionView>,
    broadcast::Receiver<TaskAnnouncement>,
) {
    // 三通道：呈现层 -> Core 命令；Core -> 呈现层 视图快照；Core -> 监听者 任务播报
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (announce_tx, announce_rx) = broadcast::channel::<TaskAnnouncement>(16);
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<Internal>();

    engine.subscribe(Arc::new(BroadcastObserver::new(announce_tx)));
    let (view_tx, view_rx) = watch::channel(SessionView::project(&engine, &ViewNotes::default()));

    let mut actor = SessionActor {
        engine,
        source,
        recovery: RecoveryEngine::new(),
        supervisor: SessionSupervisor::new(),
        notes: ViewNotes::default(),
        load_attempt: 0,
        view_tx,
        internal_tx,
    };

    tokio::spawn(async move {
        tracing::info!(session = %actor.engine.id(), "Session runtime started");
        actor.load();
        actor.publish();
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };  // cmd_tx 已全部关闭
                    if !actor.handle_command(cmd) {
                        break;
                    }
                }
                Some(event) = internal_rx.recv() => actor.handle_internal(event),
            }
            actor.publish();
        }
        actor.supervisor.shutdown();
        tracing::info!(session = %actor.engine.id(), "Session runtime stopped");
    });

    (cmd_tx, view_rx, announce_rx)
}

/// 按配置创建完整会话：加载配置、准备数据目录、装配引擎与课程来源并启动运行时
pub async fn create_session(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(
    mpsc::UnboundedSender<Command>,
    watch::Receiver<SessionView>,
    broadcast::Receiver<TaskAnnouncement>,
)> {
    let builder = create_session_builder(config_path);
    tokio::fs::create_dir_all(builder.data_dir())
        .await
        .with_context(|| format!("Failed to create data dir {}", builder.data_dir().display()))?;

    let engine = builder.build();
    let source = builder.build_source();
    tracing::info!(
        app = builder.config().app.name.as_deref().unwrap_or("maker"),
        session = %engine.id(),
        "Session created"
    );
    Ok(spawn_session(engine, source))
}
