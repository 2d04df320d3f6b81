use std::future::pending;

use tokio::sync::watch;

/// Create a connected cancellation pair.
///
/// Firing the [`Trigger`] resolves every clone of the [`Signal`]. Dropping
/// the trigger without firing it leaves the signals pending forever, so a
/// caller that never cancels does not have to keep the trigger alive.
pub fn pair() -> (Trigger, Signal) {
    let (tx, rx) = watch::channel(false);

    (Trigger { tx }, Signal { rx: Some(rx) })
}

/// The firing half of a cancellation pair. Single use.
#[derive(Debug)]
pub struct Trigger {
    tx: watch::Sender<bool>,
}

impl Trigger {
    /// Fire the trigger, resolving all associated signals immediately.
    pub fn cancel(self) {
        // send only fails when no receiver is left, in which case there
        // is nobody to notify anyway.
        let _ = self.tx.send(true);
    }
}

/// The observing half of a cancellation pair.
///
/// Cheap to clone; all clones resolve once the trigger fires.
#[derive(Clone, Debug)]
pub struct Signal {
    rx: Option<watch::Receiver<bool>>,
}

impl Signal {
    /// A signal that never fires, for callers without cancellation.
    pub const fn noop() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow(),
            None => false,
        }
    }

    /// Wait until the trigger fires. Pends forever on a noop signal or
    /// when the trigger was dropped without firing.
    pub async fn cancelled(&mut self) {
        let Some(rx) = &mut self.rx else {
            return pending().await;
        };

        loop {
            if *rx.borrow() {
                return;
            }

            if rx.changed().await.is_err() {
                return pending().await;
            }
        }
    }
}
