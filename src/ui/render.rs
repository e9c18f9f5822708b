//! 界面渲染
//!
//! 根据 SessionView 生成若干带语气的文本行：标题行显示阶段 / 模式 / 等级，
//! 主体为当前任务（焦点词、提示、选项），其后是反馈、诊断与提示信息。
//! draw 用 crossterm 按语气着色输出。

use std::io::Write;

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};

use crate::core::{PhaseView, SessionView};
use crate::curriculum::TaskType;

/// 行的语气，决定颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Title,
    Focus,
    Body,
    Option,
    Feedback,
    Diagnostic,
    Notice,
    Success,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Title => Color::Yellow,
            Tone::Focus => Color::Cyan,
            Tone::Body => Color::Reset,
            Tone::Option => Color::Blue,
            Tone::Feedback => Color::Red,
            Tone::Diagnostic => Color::Magenta,
            Tone::Notice => Color::DarkGrey,
            Tone::Success => Color::Green,
        }
    }
}

fn tier_bar(tier: u8) -> String {
    (0..crate::progress::MAX_TIER)
        .map(|i| if i < tier { '●' } else { '○' })
        .collect()
}

fn input_hint(task_type: &TaskType) -> &'static str {
    match task_type {
        TaskType::Vocal => "say it (:say <words>) or type it",
        TaskType::Motor => "pick a number",
        TaskType::Cognitive => "yes / no",
        TaskType::MotorAr => "show it, then type yes",
        TaskType::Unknown(_) => "type anything",
    }
}

/// 把视图展开为带语气的行
pub fn lines(view: &SessionView) -> Vec<(Tone, String)> {
    let phase = match view.phase {
        PhaseView::PreStart if view.content_loading => "loading",
        PhaseView::PreStart => "ready",
        PhaseView::Awaiting => "your turn",
        PhaseView::Pending => "…",
        PhaseView::Complete => "done",
    };
    let mic = if view.voice_available { "mic" } else { "no mic" };
    let mut out = vec![(
        Tone::Title,
        format!("Maker │ {phase} │ {} │ {} │ {mic}", view.mode, tier_bar(view.unlock_tier)),
    )];

    match view.phase {
        PhaseView::PreStart => {
            let hint = if view.start_requested {
                "starting as soon as the content is here"
            } else {
                "type `start` (or :say start) to begin"
            };
            out.push((Tone::Body, hint.to_string()));
        }
        PhaseView::Awaiting => {
            if let Some(task) = &view.active_task {
                out.push((Tone::Focus, format!("{}  {}", task.concept_glyph, task.focus_word)));
                out.push((Tone::Body, task.prompt.clone()));
                for (i, option) in task.options.iter().enumerate() {
                    out.push((Tone::Option, format!("  [{}] {}", i + 1, option.label)));
                }
                out.push((Tone::Notice, format!("({})", input_hint(&task.task_type))));
            }
        }
        PhaseView::Pending => {
            if view.diagnostic.is_none() {
                out.push((Tone::Success, "✓".to_string()));
            }
        }
        PhaseView::Complete => {
            let message = view.terminal_message.as_deref().unwrap_or("complete");
            out.push((Tone::Success, message.to_string()));
        }
    }

    if let Some(feedback) = &view.feedback {
        out.push((Tone::Feedback, feedback.clone()));
    }
    if let Some(diagnostic) = &view.diagnostic {
        out.push((Tone::Diagnostic, diagnostic.clone()));
    }
    if let Some(notice) = &view.notice {
        out.push((Tone::Notice, notice.clone()));
    }
    out
}

pub const HELP: &str = "commands: start │ stop │ reset │ reload │ mode <discover|transfer|maintain> │ \
:say <words> │ :nomic │ :mic │ quit";

/// 输出一帧
pub fn draw<W: Write>(out: &mut W, view: &SessionView) -> std::io::Result<()> {
    queue!(out, Print("\n"))?;
    for (tone, text) in lines(view) {
        if tone == Tone::Title || tone == Tone::Focus {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        queue!(
            out,
            SetForegroundColor(tone.color()),
            Print(text),
            ResetColor,
            SetAttribute(Attribute::Reset),
            Print("\n")
        )?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::Mode;
    use crate::engine::{ActiveTask, TaskOption, TaskTicket};

    fn motor_view() -> SessionView {
        SessionView {
            phase: PhaseView::Awaiting,
            mode: Mode::Transfer,
            unlock_tier: 2,
            feedback: Some("missed".to_string()),
            active_task: Some(ActiveTask {
                ticket: TaskTicket {
                    generation: 1,
                    unit_key: "obst:apfel".to_string(),
                },
                module_id: "obst".to_string(),
                unit_id: "apfel".to_string(),
                layer_mode: Some(Mode::Transfer),
                focus_word: "Apfel".to_string(),
                concept_glyph: "🍎".to_string(),
                prompt: "Tippe auf den Apfel.".to_string(),
                task_type: TaskType::Motor,
                target_id: "apfel".to_string(),
                expected: true,
                options: vec![
                    TaskOption { id: "apfel".to_string(), label: "Apfel".to_string() },
                    TaskOption { id: "birne".to_string(), label: "Birne".to_string() },
                ],
            }),
            ..SessionView::default()
        }
    }

    #[test]
    fn test_title_shows_mode_and_tier() {
        let out = lines(&motor_view());
        assert_eq!(out[0].0, Tone::Title);
        assert!(out[0].1.contains("transfer"));
        assert!(out[0].1.contains("●●○"));
    }

    #[test]
    fn test_motor_lists_numbered_options_and_feedback() {
        let out = lines(&motor_view());
        let options: Vec<_> = out.iter().filter(|(t, _)| *t == Tone::Option).collect();
        assert_eq!(options.len(), 2);
        assert!(options[1].1.contains("[2] Birne"));
        assert!(out.iter().any(|(t, s)| *t == Tone::Feedback && s == "missed"));
    }

    #[test]
    fn test_pre_start_waiting_for_content() {
        let view = SessionView {
            start_requested: true,
            content_loading: true,
            ..SessionView::default()
        };
        let out = lines(&view);
        assert!(out[0].1.contains("loading"));
        assert!(out[1].1.contains("as soon as"));
    }

    #[test]
    fn test_draw_writes_every_line() {
        let mut buf: Vec<u8> = Vec::new();
        draw(&mut buf, &motor_view()).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("Tippe auf den Apfel."));
        assert!(text.contains("[1] Apfel"));
    }
}
