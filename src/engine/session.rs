//! 会话引擎（门面）
//!
//! 组合存储适配器、解析器、选项构建、校验器与进度控制器，驱动
//! 初始化 → 解析任务 → 等待作答 → 校验 → 应用结果 → 解析下一任务 的生命周期。
//!
//! 引擎本身是同步的状态所有者：每个方法都执行到底、修改后立即持久化。
//! 延时与异步完成由运行时负责，引擎只通过 TaskTicket 判断回调是否过期。

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;

use crate::config::AppConfig;
use crate::core::{RecoveryAction, RecoveryEngine, SessionError, VoiceError};
use crate::curriculum::{Curriculum, Mode, TaskType};
use crate::engine::events::{emit, TaskAnnouncement, TaskObserver};
use crate::engine::options::build_options;
use crate::engine::progression::{Outcome, ProgressionController, DEFAULT_FAILURE_THRESHOLD};
use crate::engine::resolver::{resolve_active_task, Resolution};
use crate::engine::task::{ActiveTask, Response, TaskTicket, Verdict};
use crate::engine::validator::validate;
use crate::progress::{ProgressStore, SessionState};

/// 引擎参数
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub initial_mode: Mode,
    pub failure_threshold: u32,
    /// 成功后短暂展示再进入下一单元
    pub success_delay: Duration,
    /// 回退后的「放慢」停顿，始终不短于 success_delay
    pub regression_delay: Duration,
    /// 为 false 时整个会话只走点选 / 键入
    pub voice_enabled: bool,
    pub voice_lang: String,
    pub start_keyword: String,
    pub stop_keyword: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Discover,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_delay: Duration::from_millis(900),
            regression_delay: Duration::from_millis(2400),
            voice_enabled: true,
            voice_lang: "de-DE".to_string(),
            start_keyword: "start".to_string(),
            stop_keyword: "stop".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        let success_delay = Duration::from_millis(cfg.session.success_delay_ms);
        let regression_delay = Duration::from_millis(cfg.session.regression_delay_ms).max(success_delay);
        Self {
            initial_mode: cfg.session.initial_mode,
            failure_threshold: cfg.session.failure_threshold,
            success_delay,
            regression_delay,
            voice_enabled: cfg.voice.enabled,
            voice_lang: cfg.voice.lang.clone(),
            start_keyword: cfg.voice.start_keyword.trim().to_lowercase(),
            stop_keyword: cfg.voice.stop_keyword.trim().to_lowercase(),
        }
    }
}

/// 会话阶段
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// 尚未开始；start_requested 表示内容到达后应立即开始
    PreStart { start_requested: bool },
    /// 正在等待作答
    Awaiting(ActiveTask),
    /// 已安排延时解析（成功展示或回退停顿）
    Pending { ticket: TaskTicket, delay: Duration },
    /// 课程完成
    Complete(String),
}

/// 提交作答的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 票据过期或当前不在等待作答
    Ignored,
    /// 停留在当前单元
    Retry { verdict: Verdict, failures: u32 },
    /// 单元完成；delay 后以 resume 票据继续
    Advanced {
        resume: TaskTicket,
        delay: Duration,
        tier_raised: Option<u8>,
    },
    /// 连续失败回退；delay 后以 resume 票据继续
    Regressed {
        resume: TaskTicket,
        delay: Duration,
        diagnostic: String,
        verdict: Verdict,
    },
}

/// 语音转写的处理结果
#[derive(Debug)]
pub enum TranscriptAction {
    Started(Result<Resolution, SessionError>),
    Stopped,
    Submitted(SubmitOutcome),
    Ignored,
}

pub struct SessionEngine {
    id: String,
    config: SessionConfig,
    store: ProgressStore,
    progression: ProgressionController,
    recovery: RecoveryEngine,
    curriculum: Option<Arc<Curriculum>>,
    state: SessionState,
    phase: SessionPhase,
    generation: u64,
    rng: StdRng,
    observers: Vec<Arc<dyn TaskObserver>>,
    voice_available: bool,
    last_recovery: Option<RecoveryAction>,
}

impl SessionEngine {
    /// 创建引擎并恢复状态：存储中没有可用值时按首次运行创建默认状态并写入
    pub fn new(config: SessionConfig, store: ProgressStore, rng: StdRng) -> Self {
        let state = match store.load() {
            Some(state) => {
                tracing::info!(
                    module = state.progress.current_module_index,
                    unit = state.progress.current_unit_index,
                    tier = state.tier(),
                    "Progress restored"
                );
                state
            }
            None => {
                let state = SessionState {
                    mode: config.initial_mode,
                    ..SessionState::default()
                };
                store.save(&state);
                tracing::info!("First run, progress initialized");
                state
            }
        };
        let progression = ProgressionController::new(store.clone(), config.failure_threshold);
        let voice_available = config.voice_enabled;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            store,
            progression,
            recovery: RecoveryEngine::new(),
            curriculum: None,
            state,
            phase: SessionPhase::PreStart {
                start_requested: false,
            },
            generation: 0,
            rng,
            observers: Vec::new(),
            voice_available,
            last_recovery: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn unlock_tier(&self) -> u8 {
        self.state.tier()
    }

    pub fn voice_available(&self) -> bool {
        self.voice_available
    }

    /// 最近一次降级动作
    pub fn last_recovery(&self) -> Option<&RecoveryAction> {
        self.last_recovery.as_ref()
    }

    pub fn has_curriculum(&self) -> bool {
        self.curriculum.is_some()
    }

    pub fn curriculum(&self) -> Option<&Curriculum> {
        self.curriculum.as_deref()
    }

    pub fn active_task(&self) -> Option<&ActiveTask> {
        match &self.phase {
            SessionPhase::Awaiting(task) => Some(task),
            _ => None,
        }
    }

    /// 注册任务监听者
    pub fn subscribe(&mut self, observer: Arc<dyn TaskObserver>) {
        self.observers.push(observer);
    }

    /// 安装课程（一次会话只安装一次，已开始后再安装会被忽略）
    ///
    /// 若之前已请求开始，则立即开始并返回首个解析结果
    pub fn install_curriculum(&mut self, curriculum: Curriculum) -> Option<Resolution> {
        let start_requested = match self.phase {
            SessionPhase::PreStart { start_requested } => start_requested,
            _ => {
                tracing::warn!("Session already running, ignoring new curriculum");
                return None;
            }
        };
        tracing::info!(
            modules = curriculum.modules.len(),
            units = curriculum.unit_count(),
            "Curriculum installed"
        );
        self.curriculum = Some(Arc::new(curriculum));
        if start_requested {
            self.start().ok()
        } else {
            None
        }
    }

    /// 开始学习：没有课程时记住开始请求并返回 ContentNotLoaded
    pub fn start(&mut self) -> Result<Resolution, SessionError> {
        let Some(curriculum) = self.curriculum.clone() else {
            self.phase = SessionPhase::PreStart {
                start_requested: true,
            };
            tracing::info!("Start requested before content is available");
            return Err(SessionError::ContentNotLoaded);
        };
        self.progression.recompute_unlocks(&mut self.state, &curriculum);
        tracing::info!(session = %self.id, mode = %self.state.mode, "Session started");
        self.resolve()
    }

    /// 解析当前任务并播报；每次解析都签发新票据
    pub fn resolve(&mut self) -> Result<Resolution, SessionError> {
        let curriculum = self.curriculum.clone().ok_or(SessionError::ContentNotLoaded)?;
        self.generation += 1;
        let outcome = resolve_active_task(&curriculum, &mut self.state, self.generation);
        if outcome.state_changed {
            self.store.save(&self.state);
        }
        if let Some(detail) = outcome.malformed {
            self.last_recovery = Some(self.recovery.handle(&SessionError::MalformedUnit(detail)));
        }

        match outcome.resolution {
            Resolution::Task(mut task) => {
                if task.task_type == TaskType::Motor {
                    if let Some(module) = curriculum.module(self.state.progress.current_module_index) {
                        task.options =
                            build_options(
                            &module.units,
                            &task.unit_id,
                            &task.target_id,
                            &task.focus_word,
                            &mut self.rng,
                        );
                    }
                }
                let announcement = TaskAnnouncement::for_task(
                    &task,
                    self.state.mode,
                    self.state.tier(),
                    &self.config.voice_lang,
                );
                emit(&self.observers, &announcement);
                tracing::debug!(ticket = %task.ticket, task_type = %task.task_type, "Task presented");
                self.phase = SessionPhase::Awaiting(task.clone());
                Ok(Resolution::Task(task))
            }
            Resolution::Terminal(message) => {
                tracing::info!(session = %self.id, "Curriculum complete");
                self.phase = SessionPhase::Complete(message.clone());
                Ok(Resolution::Terminal(message))
            }
        }
    }

    /// 提交作答；票据与当前任务不一致时忽略
    pub fn submit(&mut self, ticket: &TaskTicket, response: Response) -> SubmitOutcome {
        let task = match &self.phase {
            SessionPhase::Awaiting(task) if task.ticket == *ticket => task.clone(),
            _ => {
                tracing::debug!(ticket = %ticket, "Stale or unexpected response ignored");
                return SubmitOutcome::Ignored;
            }
        };
        let Some(curriculum) = self.curriculum.clone() else {
            return SubmitOutcome::Ignored;
        };

        let verdict = validate(&task, &response);
        if verdict.accepted {
            match self.progression.on_accept(&mut self.state, &curriculum, &task) {
                Outcome::Advanced { tier_raised, .. } => {
                    let delay = self.config.success_delay;
                    SubmitOutcome::Advanced {
                        resume: self.defer(&task, delay),
                        delay,
                        tier_raised,
                    }
                }
                other => {
                    tracing::warn!(outcome = ?other, "Unexpected outcome for accepted response");
                    SubmitOutcome::Ignored
                }
            }
        } else {
            match self.progression.on_reject(&mut self.state, &task) {
                Outcome::Retry { failures } => SubmitOutcome::Retry { verdict, failures },
                Outcome::Regressed { diagnostic, .. } => {
                    let delay = self.config.regression_delay;
                    SubmitOutcome::Regressed {
                        resume: self.defer(&task, delay),
                        delay,
                        diagnostic,
                        verdict,
                    }
                }
                other => {
                    tracing::warn!(outcome = ?other, "Unexpected outcome for rejected response");
                    SubmitOutcome::Ignored
                }
            }
        }
    }

    fn defer(&mut self, task: &ActiveTask, delay: Duration) -> TaskTicket {
        self.generation += 1;
        let ticket = TaskTicket {
            generation: self.generation,
            unit_key: task.ticket.unit_key.clone(),
        };
        self.phase = SessionPhase::Pending {
            ticket: ticket.clone(),
            delay,
        };
        ticket
    }

    /// 延时回调触发：票据仍有效时解析下一任务，否则是空操作
    pub fn resume(&mut self, ticket: &TaskTicket) -> Option<Resolution> {
        match &self.phase {
            SessionPhase::Pending { ticket: pending, .. } if pending == ticket => self.resolve().ok(),
            _ => {
                tracing::debug!(ticket = %ticket, "Stale deferred resolution ignored");
                None
            }
        }
    }

    /// 处理语音转写：开始 / 停止关键词，或作为当前任务的文本作答
    pub fn handle_transcript(&mut self, ticket: Option<&TaskTicket>, transcript: &str) -> TranscriptAction {
        let normalized = transcript.trim().to_lowercase();
        if normalized.is_empty() {
            return TranscriptAction::Ignored;
        }

        match &self.phase {
            SessionPhase::PreStart { .. } if normalized == self.config.start_keyword => {
                TranscriptAction::Started(self.start())
            }
            SessionPhase::PreStart { .. } => TranscriptAction::Ignored,
            _ if normalized == self.config.stop_keyword => {
                self.stop();
                TranscriptAction::Stopped
            }
            SessionPhase::Awaiting(task) => match ticket {
                Some(ticket) if *ticket == task.ticket => {
                    TranscriptAction::Submitted(self.submit(ticket, Response::Text(transcript.to_string())))
                }
                _ => {
                    tracing::debug!("Transcript for a stale task ignored");
                    TranscriptAction::Ignored
                }
            },
            _ => TranscriptAction::Ignored,
        }
    }

    /// 语音采集失败：标记不可用，退回点选 / 键入作答
    pub fn voice_failed(&mut self, err: VoiceError) -> RecoveryAction {
        self.voice_available = false;
        let action = self.recovery.handle(&SessionError::Voice(err));
        self.last_recovery = Some(action.clone());
        action
    }

    /// 语音能力恢复（例如用户重新授权）
    pub fn voice_restored(&mut self) {
        if !self.config.voice_enabled {
            tracing::debug!("Voice disabled by configuration, staying on tap input");
            return;
        }
        self.voice_available = true;
    }

    /// 回到开始前状态，保留进度；所有未完成的回调随之失效
    pub fn stop(&mut self) {
        self.generation += 1;
        self.phase = SessionPhase::PreStart {
            start_requested: false,
        };
        tracing::info!(session = %self.id, "Session stopped");
    }

    /// 显式重置：清空存储并重建默认状态
    pub fn reset(&mut self) {
        self.store.clear();
        self.state = SessionState {
            mode: self.config.initial_mode,
            ..SessionState::default()
        };
        self.store.save(&self.state);
        self.stop();
        tracing::info!(session = %self.id, "Progress reset");
    }

    /// 切换教学模式；正在作答时按新模式重新解析当前单元
    pub fn set_mode(&mut self, mode: Mode) -> Option<Resolution> {
        if self.state.mode == mode {
            return None;
        }
        self.state.mode = mode;
        self.store.save(&self.state);
        tracing::info!(mode = %mode, "Mode changed");
        match self.phase {
            SessionPhase::Awaiting(_) => self.resolve().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{MemoryKvStore, DEFAULT_STATE_KEY};
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::Mutex;

    fn curriculum() -> Curriculum {
        Curriculum::from_value(json!({ "modules": [
            { "mod_id": "m1", "units": [
                { "unit_id": "apfel", "universal_core": { "focus_word": "Apfel" },
                  "mode_layer": { "discover": { "prompt": "Sag Apfel", "task_type": "vocal" },
                                  "maintain": { "prompt": "Tippe", "task_type": "motor", "target_id": "apfel" } } },
                { "unit_id": "birne", "universal_core": { "focus_word": "Birne" },
                  "mode_layer": { "discover": { "prompt": "Ist das eine Birne?", "task_type": "cognitive", "expected": true } } }
            ]},
            { "mod_id": "m2", "units": [
                { "unit_id": "kirsche", "universal_core": { "focus_word": "Kirsche" },
                  "mode_layer": { "discover": { "task_type": "motor_ar" } } }
            ]}
        ]}))
        .unwrap()
    }

    fn engine() -> (SessionEngine, ProgressStore) {
        let store = ProgressStore::new(Arc::new(MemoryKvStore::new()), DEFAULT_STATE_KEY);
        let engine = SessionEngine::new(SessionConfig::default(), store.clone(), StdRng::seed_from_u64(7));
        (engine, store)
    }

    fn expect_task(resolution: Option<Resolution>) -> ActiveTask {
        match resolution {
            Some(Resolution::Task(task)) => task,
            other => panic!("expected task, got {other:?}"),
        }
    }

    fn advance(engine: &mut SessionEngine, response: Response) -> ActiveTask {
        let ticket = engine.active_task().unwrap().ticket.clone();
        match engine.submit(&ticket, response) {
            SubmitOutcome::Advanced { resume, .. } => expect_task(engine.resume(&resume)),
            other => panic!("expected advance, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<TaskAnnouncement>>);

    impl TaskObserver for Recording {
        fn on_task(&self, announcement: &TaskAnnouncement) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(announcement.clone());
            Ok(())
        }
    }

    #[test]
    fn test_first_run_persists_defaults() {
        let (engine, store) = engine();
        assert_eq!(engine.state(), &SessionState::default());
        assert!(store.load().is_some());
    }

    #[test]
    fn test_start_without_curriculum_is_remembered() {
        let (mut engine, _) = engine();
        assert!(matches!(engine.start(), Err(SessionError::ContentNotLoaded)));
        assert_eq!(engine.phase(), &SessionPhase::PreStart { start_requested: true });

        let task = expect_task(engine.install_curriculum(curriculum()));
        assert_eq!(task.unit_id, "apfel");
        assert!(engine.active_task().is_some());
    }

    #[test]
    fn test_install_without_start_request_waits() {
        let (mut engine, _) = engine();
        assert!(engine.install_curriculum(curriculum()).is_none());
        assert!(engine.has_curriculum());
        assert!(matches!(engine.phase(), SessionPhase::PreStart { .. }));
    }

    #[test]
    fn test_full_walk_to_completion_with_announcements() {
        let (mut engine, store) = engine();
        let recording = Arc::new(Recording::default());
        engine.subscribe(recording.clone());
        engine.install_curriculum(curriculum());

        let first = expect_task(engine.start().ok());
        assert_eq!(first.task_type, TaskType::Vocal);
        let second = advance(&mut engine, "ich sehe einen apfel hier".into());
        assert_eq!(second.unit_id, "birne");
        let third = advance(&mut engine, true.into());
        assert_eq!(third.module_id, "m2");
        assert_eq!(engine.unlock_tier(), 3);

        let ticket = third.ticket.clone();
        let resume = match engine.submit(&ticket, true.into()) {
            SubmitOutcome::Advanced { resume, .. } => resume,
            other => panic!("expected advance, got {other:?}"),
        };
        assert!(matches!(engine.resume(&resume), Some(Resolution::Terminal(_))));
        assert!(matches!(engine.phase(), SessionPhase::Complete(_)));

        let announced: Vec<_> = recording.0.lock().unwrap().iter().map(|a| a.unit_id.clone()).collect();
        assert_eq!(announced, vec!["apfel", "birne", "kirsche"]);
        let saved = store.load().unwrap();
        assert_eq!(saved.progress.current_module_index, 1);
        assert!(saved.is_completed("m2:kirsche"));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        let task = expect_task(engine.start().ok());
        let stale = TaskTicket {
            generation: task.ticket.generation + 100,
            unit_key: task.ticket.unit_key.clone(),
        };
        assert_eq!(engine.submit(&stale, "apfel".into()), SubmitOutcome::Ignored);
        assert_eq!(engine.state().progress.current_unit_index, 0);
    }

    #[test]
    fn test_resume_after_stop_is_noop() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        let task = expect_task(engine.start().ok());
        let resume = match engine.submit(&task.ticket, "apfel".into()) {
            SubmitOutcome::Advanced { resume, .. } => resume,
            other => panic!("expected advance, got {other:?}"),
        };
        engine.stop();
        assert!(engine.resume(&resume).is_none());
        assert!(matches!(engine.phase(), SessionPhase::PreStart { .. }));
        // 进度保留
        assert_eq!(engine.state().progress.current_unit_index, 1);
    }

    #[test]
    fn test_scenario_b_regression_uses_longer_delay() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        expect_task(engine.start().ok());
        let second = advance(&mut engine, "Apfel".into());
        let key = second.ticket.unit_key.clone();

        for expected_failures in 1..=2 {
            let ticket = engine.active_task().unwrap().ticket.clone();
            match engine.submit(&ticket, false.into()) {
                SubmitOutcome::Retry { verdict, failures } => {
                    assert_eq!(failures, expected_failures);
                    assert_eq!(verdict.feedback.as_deref(), Some("look again"));
                }
                other => panic!("expected retry, got {other:?}"),
            }
        }
        let ticket = engine.active_task().unwrap().ticket.clone();
        match engine.submit(&ticket, false.into()) {
            SubmitOutcome::Regressed { delay, diagnostic, resume, .. } => {
                assert!(delay > engine.config().success_delay);
                assert!(diagnostic.contains("Birne"));
                let back = expect_task(engine.resume(&resume));
                assert_eq!(back.unit_id, "apfel");
            }
            other => panic!("expected regression, got {other:?}"),
        }
        assert_eq!(engine.state().failures(&key), 0);
        assert_eq!(engine.state().progress.current_unit_index, 0);
    }

    #[test]
    fn test_motor_task_gets_options() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        engine.set_mode(Mode::Maintain);
        let task = expect_task(engine.start().ok());
        assert_eq!(task.task_type, TaskType::Motor);
        assert_eq!(task.options.iter().filter(|o| o.id == "apfel").count(), 1);
        assert_eq!(task.options.len(), 2);
    }

    #[test]
    fn test_set_mode_re_resolves_active_unit() {
        let (mut engine, store) = engine();
        engine.install_curriculum(curriculum());
        let before = expect_task(engine.start().ok());
        let after = expect_task(engine.set_mode(Mode::Maintain));
        assert_eq!(after.unit_id, before.unit_id);
        assert_eq!(after.task_type, TaskType::Motor);
        assert_ne!(after.ticket, before.ticket);
        assert_eq!(store.load().unwrap().mode, Mode::Maintain);
    }

    #[test]
    fn test_transcript_start_submit_and_stop() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        assert!(matches!(engine.handle_transcript(None, "hallo"), TranscriptAction::Ignored));

        let task = match engine.handle_transcript(None, " Start ") {
            TranscriptAction::Started(Ok(Resolution::Task(task))) => task,
            other => panic!("expected start, got {other:?}"),
        };
        assert!(matches!(
            engine.handle_transcript(None, "apfel"),
            TranscriptAction::Ignored
        ));
        assert!(matches!(
            engine.handle_transcript(Some(&task.ticket), "ein Apfel"),
            TranscriptAction::Submitted(SubmitOutcome::Advanced { .. })
        ));
        assert!(matches!(engine.handle_transcript(None, "stop"), TranscriptAction::Stopped));
        assert!(matches!(engine.phase(), SessionPhase::PreStart { .. }));
    }

    #[test]
    fn test_voice_failure_falls_back_to_tap() {
        let (mut engine, _) = engine();
        assert_eq!(engine.voice_failed(VoiceError::NoSpeech), RecoveryAction::FallbackToTap);
        assert!(!engine.voice_available());
        engine.voice_restored();
        assert!(engine.voice_available());
    }

    #[test]
    fn test_reset_clears_progress() {
        let (mut engine, store) = engine();
        engine.install_curriculum(curriculum());
        expect_task(engine.start().ok());
        advance(&mut engine, "apfel".into());
        engine.reset();
        assert_eq!(engine.state().progress, Default::default());
        assert_eq!(store.load().unwrap().progress, Default::default());
        assert!(matches!(engine.phase(), SessionPhase::PreStart { .. }));
    }

    #[test]
    fn test_restored_progress_resumes_where_left() {
        let store = ProgressStore::new(Arc::new(MemoryKvStore::new()), DEFAULT_STATE_KEY);
        {
            let mut engine = SessionEngine::new(SessionConfig::default(), store.clone(), StdRng::seed_from_u64(1));
            engine.install_curriculum(curriculum());
            expect_task(engine.start().ok());
            advance(&mut engine, "apfel".into());
        }
        let mut engine = SessionEngine::new(SessionConfig::default(), store, StdRng::seed_from_u64(1));
        engine.install_curriculum(curriculum());
        let task = expect_task(engine.start().ok());
        assert_eq!(task.unit_id, "birne");
    }

    #[test]
    fn test_second_curriculum_ignored_while_running() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        expect_task(engine.start().ok());
        assert!(engine.install_curriculum(Curriculum::default()).is_none());
        assert_eq!(engine.curriculum().unwrap().modules.len(), 2);
    }

    #[test]
    fn test_unit_without_layers_uses_defaults() {
        let (mut engine, _) = engine();
        engine.install_curriculum(
            Curriculum::from_value(json!({ "modules": [{ "mod_id": "m1", "units": [{ "unit_id": "leer" }] }] }))
                .unwrap(),
        );
        let task = expect_task(engine.start().ok());
        assert_eq!(task.task_type, TaskType::Cognitive);
        assert_eq!(engine.last_recovery(), Some(&RecoveryAction::UseDefaults));
    }

    #[test]
    fn test_well_formed_unit_needs_no_recovery() {
        let (mut engine, _) = engine();
        engine.install_curriculum(curriculum());
        expect_task(engine.start().ok());
        assert_eq!(engine.last_recovery(), None);
    }

    #[test]
    fn test_voice_disabled_by_config() {
        let store = ProgressStore::new(Arc::new(MemoryKvStore::new()), DEFAULT_STATE_KEY);
        let config = SessionConfig {
            voice_enabled: false,
            ..SessionConfig::default()
        };
        let mut engine = SessionEngine::new(config, store, StdRng::seed_from_u64(1));
        assert!(!engine.voice_available());
        engine.voice_restored();
        assert!(!engine.voice_available());
    }

    #[test]
    fn test_announcement_carries_voice_lang() {
        let store = ProgressStore::new(Arc::new(MemoryKvStore::new()), DEFAULT_STATE_KEY);
        let config = SessionConfig {
            voice_lang: "en-GB".to_string(),
            ..SessionConfig::default()
        };
        let mut engine = SessionEngine::new(config, store, StdRng::seed_from_u64(1));
        let recording = Arc::new(Recording::default());
        engine.subscribe(recording.clone());
        engine.install_curriculum(curriculum());
        expect_task(engine.start().ok());
        assert_eq!(recording.0.lock().unwrap()[0].lang, "en-GB");
    }
}
