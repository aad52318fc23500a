//! Cooperative shutdown
//!
//! The read loop owns no signal state of its own. It is handed a
//! [`ShutdownToken`] and checks it before every blocking read. A
//! [`ShutdownController`] cancels the token when the process receives a
//! termination signal:
//!
//! - Unix: `SIGINT`, `SIGTERM`, `SIGHUP`
//! - Windows: Ctrl-C, Ctrl-Break, console close, logoff, system shutdown
//!
//! Signals are consumed by the listener, so the process is not killed
//! outright and the loop gets to unwind and release its resources. A read
//! already in flight is not interrupted; shutdown latency is bounded by the
//! source's read timeout.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

/// Cancellation token shared between the signal listener and the loop
///
/// Starts out running. `cancel` flips it exactly once.
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    running: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// New token in the running state
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether shutdown has been requested
    pub fn is_cancelled(&self) -> bool {
        !self.is_running()
    }

    /// Request shutdown
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn cancel(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns termination signals into token cancellation
#[derive(Clone, Debug, Default)]
pub struct ShutdownController {
    token: ShutdownToken,
}

impl ShutdownController {
    /// Controller with a fresh token and no signal listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller with a signal listener already running
    ///
    /// Returns once the handlers are registered, so a signal delivered
    /// right after this call is not missed.
    pub fn install() -> io::Result<Self> {
        let controller = Self::new();
        controller.spawn_listener()?;
        Ok(controller)
    }

    /// Token to hand to the read loop
    pub fn token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// Handle one termination request
    ///
    /// Repeated requests collapse into the first one. Returns `true` if this
    /// call started the shutdown.
    pub fn trigger(&self, reason: &str) -> bool {
        let first = self.token.cancel();
        if first {
            info!(reason, "Shutdown requested");
        } else {
            debug!(reason, "Shutdown already in progress");
        }
        first
    }

    fn spawn_listener(&self) -> io::Result<()> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<io::Result<()>>();
        let controller = self.clone();

        std::thread::Builder::new()
            .name("signal-listener".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let mut signals = match platform::Signals::register() {
                        Ok(signals) => signals,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));

                    while let Some(reason) = signals.recv().await {
                        controller.trigger(reason);
                    }
                });
            })?;

        ready_rx
            .recv()
            .map_err(|_| io::Error::other("signal listener exited during setup"))?
    }
}

#[cfg(unix)]
mod platform {
    use std::io;

    use tokio::signal::unix::{signal, Signal, SignalKind};

    pub(super) struct Signals {
        interrupt: Signal,
        terminate: Signal,
        hangup: Signal,
    }

    impl Signals {
        pub(super) fn register() -> io::Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
            })
        }

        pub(super) async fn recv(&mut self) -> Option<&'static str> {
            tokio::select! {
                Some(()) = self.interrupt.recv() => Some("SIGINT"),
                Some(()) = self.terminate.recv() => Some("SIGTERM"),
                Some(()) = self.hangup.recv() => Some("SIGHUP"),
                else => None,
            }
        }
    }
}

#[cfg(windows)]
mod platform {
    use std::io;

    use tokio::signal::windows::{
        ctrl_break, ctrl_c, ctrl_close, ctrl_logoff, ctrl_shutdown, CtrlBreak, CtrlC, CtrlClose,
        CtrlLogoff, CtrlShutdown,
    };

    pub(super) struct Signals {
        ctrl_c: CtrlC,
        ctrl_break: CtrlBreak,
        close: CtrlClose,
        logoff: CtrlLogoff,
        shutdown: CtrlShutdown,
    }

    impl Signals {
        pub(super) fn register() -> io::Result<Self> {
            Ok(Self {
                ctrl_c: ctrl_c()?,
                ctrl_break: ctrl_break()?,
                close: ctrl_close()?,
                logoff: ctrl_logoff()?,
                shutdown: ctrl_shutdown()?,
            })
        }

        pub(super) async fn recv(&mut self) -> Option<&'static str> {
            tokio::select! {
                Some(()) = self.ctrl_c.recv() => Some("CTRL_C"),
                Some(()) = self.ctrl_break.recv() => Some("CTRL_BREAK"),
                Some(()) = self.close.recv() => Some("CTRL_CLOSE"),
                Some(()) = self.logoff.recv() => Some("CTRL_LOGOFF"),
                Some(()) = self.shutdown.recv() => Some("CTRL_SHUTDOWN"),
                else => None,
            }
        }
    }
}
