use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 触发关闭的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT / Ctrl+C
    Interrupt,

    /// 程序内部触发，或信号监听安装失败
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Term => "SIGTERM",
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Manual => "manual",
        })
    }
}

/// 把进程信号转成关闭事件，广播给监控循环和 HTTP 服务
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl SignalHandler {
    pub fn new() -> (Self, broadcast::Receiver<ShutdownSignal>) {
        let (tx, rx) = broadcast::channel(4);
        (Self { shutdown_tx: tx }, rx)
    }

    /// 后台等待第一个系统信号并广播
    ///
    /// 无法安装信号监听时立即广播 `Manual`，避免进程无法正常退出。
    pub fn listen(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            match os_signal().await {
                Ok(signal) => {
                    info!("Received {}, shutting down", signal);
                    self.trigger(signal);
                }
                Err(e) => {
                    error!("Failed to install signal handler: {}", e);
                    self.trigger(ShutdownSignal::Manual);
                }
            }
        })
    }

    pub fn trigger(&self, signal: ShutdownSignal) {
        // 没有订阅者说明已经没有需要通知的任务
        let _ = self.shutdown_tx.send(signal);
    }

    pub fn trigger_shutdown(&self) {
        info!("Manual shutdown triggered");
        self.trigger(ShutdownSignal::Manual);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(unix)]
async fn os_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => ShutdownSignal::Term,
        _ = sigint.recv() => ShutdownSignal::Interrupt,
    })
}

#[cfg(not(unix))]
async fn os_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
