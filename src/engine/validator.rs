//! 作答校验：按任务类型分派
//!
//! | 类型 | 接受条件 | 失败反馈 |
//! |---|---|---|
//! | vocal | 小写去空白后的转写包含小写焦点词 | `say: «焦点词»` |
//! | motor | 小写作答等于小写目标 id | `missed` |
//! | cognitive | 布尔作答与期望值完全相等 | `look again` |
//! | motor_ar | 布尔 true | `show it, then confirm` |
//! | 其他 | 永不接受 | `invalid` |
//!
//! 任何输入都只会得到结构化的拒绝，不会 panic。

use crate::curriculum::TaskType;
use crate::engine::task::{ActiveTask, Response, Verdict};

pub const FEEDBACK_MISSED: &str = "missed";
pub const FEEDBACK_LOOK_AGAIN: &str = "look again";
pub const FEEDBACK_SHOW_AND_CONFIRM: &str = "show it, then confirm";
pub const FEEDBACK_INVALID: &str = "invalid";

pub fn vocal_feedback(focus_word: &str) -> String {
    format!("say: «{focus_word}»")
}

pub fn validate(task: &ActiveTask, response: &Response) -> Verdict {
    match &task.task_type {
        TaskType::Vocal => {
            let heard = match response {
                Response::Text(text) => text.trim().to_lowercase(),
                Response::Bool(_) => return Verdict::reject(vocal_feedback(&task.focus_word)),
            };
            if heard.contains(&task.focus_word.to_lowercase()) {
                Verdict::accept()
            } else {
                Verdict::reject(vocal_feedback(&task.focus_word))
            }
        }
        TaskType::Motor => match response {
            Response::Text(picked)
                if picked.trim().to_lowercase() == task.target_id.trim().to_lowercase() =>
            {
                Verdict::accept()
            }
            _ => Verdict::reject(FEEDBACK_MISSED),
        },
        TaskType::Cognitive => match response {
            Response::Bool(answer) if *answer == task.expected => Verdict::accept(),
            _ => Verdict::reject(FEEDBACK_LOOK_AGAIN),
        },
        TaskType::MotorAr => match response {
            Response::Bool(true) => Verdict::accept(),
            _ => Verdict::reject(FEEDBACK_SHOW_AND_CONFIRM),
        },
        TaskType::Unknown(raw) => {
            tracing::debug!(task_type = %raw, "Unknown task type, rejecting response");
            Verdict::reject(FEEDBACK_INVALID)
        }
    }
}
