// ==========================================
// 挤压报价系统 - 命令行主入口
// ==========================================
// 用法: quote-engine <命令> [JSON请求 | -]
// 请求省略或为 "-" 时从 stdin 读取
// stdout 只输出 JSON 响应, 日志写入 stderr
// ==========================================

use std::io::Read;

use anyhow::{anyhow, Context};
use extrusion_quote::app::{caller_from_env, dispatch, get_default_db_path, AppState, Command};
use extrusion_quote::logging;

fn usage() -> String {
    format!(
        "用法: quote-engine <命令> [JSON请求 | -]\n命令: {}",
        Command::names().join(", ")
    )
}

fn read_payload(command: Command, arg: Option<&String>) -> anyhow::Result<String> {
    match arg {
        Some(text) if text != "-" => Ok(text.clone()),
        _ if !command.takes_payload() => Ok(String::new()),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("读取stdin失败")?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(name) = args.first() else {
        eprintln!("{}", usage());
        std::process::exit(2);
    };
    let command = Command::parse(name).ok_or_else(|| anyhow!("未知命令: {}\n{}", name, usage()))?;
    let payload = read_payload(command, args.get(1))?;

    let db_path = get_default_db_path();
    tracing::info!(version = extrusion_quote::VERSION, db_path = %db_path, "{}", extrusion_quote::APP_NAME);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let caller = caller_from_env();

    match dispatch(&state, &caller, command, &payload).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            tracing::warn!(code = err.code(), error = %err, "命令执行失败");
            println!("{}", serde_json::to_string_pretty(&err.to_response())?);
            std::process::exit(1);
        }
    }
}
