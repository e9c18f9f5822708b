//! 会话监管：生命周期与延时解析的取消
//!
//! 持有会话级 CancellationToken（退出时取消全部后台任务）；每次安排延时解析时签出一个子 token，
//! 新的安排、停止或重置都会取消上一个。

use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct SessionSupervisor {
    /// 退出时触发
    cancel_token: CancellationToken,
    /// 当前挂起的延时解析
    pending: Option<CancellationToken>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            pending: None,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 安排新的延时解析：取消上一个并返回新的子 token
    pub fn arm(&mut self) -> CancellationToken {
        self.cancel_pending();
        let token = self.cancel_token.child_token();
        self.pending = Some(token.clone());
        token
    }

    /// 延时解析已触发，不再需要取消
    pub fn settle(&mut self) {
        self.pending = None;
    }

    pub fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 会话结束：取消所有子任务
    pub fn shutdown(&mut self) {
        self.pending = None;
        self.cancel_token.cancel();
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
