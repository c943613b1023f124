//! Resume signals for Pause gates.

use tokio::sync::watch;

/// Host-side handle that lifts a pause.
#[derive(Debug)]
pub struct ResumeController {
    tx: watch::Sender<bool>,
}

/// Gate-side receiver awaiting the resume.
#[derive(Clone, Debug)]
pub struct ResumeSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked controller/signal pair.
pub fn resume_pair() -> (ResumeController, ResumeSignal) {
    let (tx, rx) = watch::channel(false);
    (ResumeController { tx }, ResumeSignal { rx })
}

impl ResumeController {
    /// Satisfy the pause condition.
    pub fn resume(&self) {
        let _ = self.tx.send(true);
    }
}

impl ResumeSignal {
    /// Whether the condition is already satisfied.
    pub fn is_resumed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the condition is satisfied. Returns `false` if the
    /// controller was dropped without resuming.
    pub async fn wait(&mut self) -> bool {
        loop {
            if *self.rx.borrow() {
                return true;
            }
            if self.rx.changed().await.is_err() {
                return false;
            }
        }
    }
}
