use crate::domain::ports::Viewer;
use crate::utils::error::{MapError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::{Child, Command};

/// 以作業系統預設程式開啟 HTML
#[derive(Debug, Clone, Default)]
pub struct SystemViewer;

/// 依序嘗試各個啟動指令，回傳第一個成功啟動的程序
fn spawn_first(commands: Vec<std::process::Command>) -> Result<Child> {
    let mut last_error = None;
    for command in commands {
        let program = command.get_program().to_string_lossy().into_owned();
        match Command::from(command).spawn() {
            Ok(child) => {
                tracing::debug!("Viewer launched with {}", program);
                return Ok(child);
            }
            Err(e) => {
                tracing::debug!("Launcher {} unavailable: {}", program, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e.into()),
        None => Err(MapError::configuration(
            "no system viewer is available on this platform",
        )),
    }
}

#[async_trait]
impl Viewer for SystemViewer {
    async fn show(&self, path: &Path) -> Result<()> {
        tracing::info!("🗺️ Opening {}", path.display());
        let mut child = spawn_first(open::commands(path))?;

        // Ctrl-C 視為正常結束
        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if !status.success() {
                    tracing::warn!("⚠️ Viewer exited with {}; open {} manually", status, path.display());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, closing viewer");
                if let Err(e) = child.kill().await {
                    tracing::debug!("Viewer already gone: {}", e);
                }
            }
        }
        Ok(())
    }
}
