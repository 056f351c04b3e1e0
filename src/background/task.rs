// background/task.rs
//
// Worker thread spawning and ordered worker -> consumer delivery.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Message delivered from a worker to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent<P, T> {
    Progress(P),
    Finished(T),
    /// The operation panicked; no `Finished` follows
    Panicked(String),
}

impl<P, T> TaskEvent<P, T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Progress(_))
    }
}

/// Worker-side handle for reporting progress. Sending never blocks.
pub struct ProgressSink<P, T> {
    tx: Sender<TaskEvent<P, T>>,
}

impl<P, T> ProgressSink<P, T> {
    /// Queue a progress message. Returns `false` once the consumer is gone.
    pub fn send(&self, progress: P) -> bool {
        self.tx.send(TaskEvent::Progress(progress)).is_ok()
    }
}

/// Consumer-side handle of a running operation
pub struct BackgroundTask<P, T> {
    name: String,
    rx: Receiver<TaskEvent<P, T>>,
    finished: bool,
}

/// Run `op` on a new named worker thread.
///
/// Progress sent through the sink and the final result arrive on the returned
/// handle in the order the worker produced them. Dropping the handle detaches
/// the worker; it runs to completion and its remaining messages are discarded.
pub fn run_in_background<P, T, F>(name: impl Into<String>, op: F) -> std::io::Result<BackgroundTask<P, T>>
where
    P: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&ProgressSink<P, T>) -> T + Send + 'static,
{
    let name = name.into();
    let (tx, rx) = channel::unbounded();
    let sink = ProgressSink { tx };
    let thread_name = name.clone();

    thread::Builder::new().name(name.clone()).spawn(move || {
        let event = match panic::catch_unwind(AssertUnwindSafe(|| op(&sink))) {
            Ok(result) => TaskEvent::Finished(result),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Background task '{}' panicked: {}", thread_name, message);
                TaskEvent::Panicked(message)
            }
        };

        if sink.tx.send(event).is_err() {
            log::debug!("Background task '{}' finished after its consumer went away", thread_name);
        }
    })?;

    log::debug!("Started background task '{}'", name);
    Ok(BackgroundTask {
        name,
        rx,
        finished: false,
    })
}

impl<P, T> BackgroundTask<P, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the terminal message has been handed out
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next queued message, without waiting
    pub fn try_next(&mut self) -> Option<TaskEvent<P, T>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.lost()),
        }
    }

    /// Next queued message, waiting at most `timeout`
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<TaskEvent<P, T>> {
        if self.finished {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.lost()),
        }
    }

    /// Every message queued so far, in production order
    pub fn drain(&mut self) -> Vec<TaskEvent<P, T>> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    fn observe(&mut self, event: TaskEvent<P, T>) -> TaskEvent<P, T> {
        if event.is_terminal() {
            self.finished = true;
        }
        event
    }

    fn lost(&mut self) -> TaskEvent<P, T> {
        self.finished = true;
        TaskEvent::Panicked(format!("worker '{}' exited without a result", self.name))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
