//! 输入处理
//!
//! 把终端里敲入的一行转换为 Command：控制词（start/stop/reset/reload/mode/quit）、
//! `:say <文本>` 模拟语音转写、`:nomic` / `:mic` 模拟语音不可用 / 恢复，
//! 其余内容按当前任务类型解释为作答（编号选项、是/否、文本）。

use tokio::sync::mpsc;

use crate::core::{Command, PhaseView, SessionView, VoiceError};
use crate::curriculum::{Mode, TaskType};
use crate::engine::Response;

/// 一行输入的解释结果
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    /// 提示用户（不发送命令）
    Hint(String),
    Help,
    Ignored,
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "y" | "yes" | "j" | "ja" | "true" | "1" => Some(true),
        "n" | "no" | "nein" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// 按当前视图解释一行输入
pub fn parse_line(line: &str, view: &SessionView) -> AppEvent {
    let input = line.trim();
    if input.is_empty() {
        return AppEvent::Ignored;
    }

    if let Some(text) = input.strip_prefix(":say") {
        let text = text.trim();
        if text.is_empty() {
            return AppEvent::Hint("usage: :say <words>".to_string());
        }
        return AppEvent::Command(Command::Transcript {
            ticket: view.active_task.as_ref().map(|t| t.ticket.clone()),
            text: text.to_string(),
        });
    }

    let lower = input.to_lowercase();
    match lower.as_str() {
        "quit" | "exit" | ":q" => return AppEvent::Command(Command::Quit),
        "start" => return AppEvent::Command(Command::Start),
        "stop" => return AppEvent::Command(Command::Stop),
        "reset" => return AppEvent::Command(Command::Reset),
        "reload" => return AppEvent::Command(Command::Reload),
        ":nomic" => return AppEvent::Command(Command::VoiceFailed(VoiceError::Unavailable)),
        ":mic" => return AppEvent::Command(Command::VoiceRestored),
        "help" | "?" => return AppEvent::Help,
        _ => {}
    }
    if let Some(mode) = lower.strip_prefix("mode ") {
        return match mode.trim().parse::<Mode>() {
            Ok(mode) => AppEvent::Command(Command::SetMode(mode)),
            Err(e) => AppEvent::Hint(e),
        };
    }

    let Some(task) = view.active_task.as_ref().filter(|_| view.phase == PhaseView::Awaiting) else {
        return AppEvent::Hint("type `start` to begin, `help` for commands".to_string());
    };

    let response = match &task.task_type {
        TaskType::Cognitive | TaskType::MotorAr => match parse_bool(input) {
            Some(answer) => Response::Bool(answer),
            None => return AppEvent::Hint("answer yes or no".to_string()),
        },
        TaskType::Motor => match input.parse::<usize>() {
            Ok(n) if (1..=task.options.len()).contains(&n) => Response::Text(task.options[n - 1].id.clone()),
            Ok(_) => return AppEvent::Hint(format!("pick 1-{}", task.options.len())),
            Err(_) => Response::Text(input.to_string()),
        },
        TaskType::Vocal | TaskType::Unknown(_) => Response::Text(input.to_string()),
    };
    AppEvent::Command(Command::Respond {
        ticket: task.ticket.clone(),
        response,
    })
}

/// 事件处理器：持有 cmd_tx，把解释出的命令发给编排器
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    /// 解释并发送；编排器已退出时返回 Err
    pub fn handle_line(&self, line: &str, view: &SessionView) -> anyhow::Result<AppEvent> {
        let event = parse_line(line, view);
        if let AppEvent::Command(cmd) = &event {
            self.cmd_tx
                .send(cmd.clone())
                .map_err(|_| anyhow::anyhow!("session runtime has stopped"))?;
        }
        Ok(event)
    }
}
