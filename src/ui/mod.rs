//! 终端呈现层：crossterm 着色，主循环（app）、输入解释（event）、渲染（render）

pub mod app;
pub mod event;
pub mod render;

pub use app::run_app;
pub use event::{parse_line, AppEvent, EventHandler};
pub use render::draw;
