// ==========================================
// 挤压报价系统 - 应用层
// ==========================================
// 职责: 组装组件, 命令行入口的命令分发
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use commands::{caller_from_env, dispatch, Command};
pub use state::{get_default_db_path, AppState};
