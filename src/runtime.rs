//! Runs [`RoomCommand`]s against the backend on a tokio runtime and feeds the
//! results back as [`RoomEvent`]s.
//!
//! Requests are never cancelled. Timers (the one-second ticker and the
//! deadline) are aborted when the dispatcher is dropped, and a result that
//! arrives after the receiver is gone is discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::ExamBackend;
use crate::room::{RoomCommand, RoomEvent};

pub struct Dispatcher {
    backend: Arc<dyn ExamBackend>,
    handle: Handle,
    events: UnboundedSender<RoomEvent>,
    timers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ExamBackend>, handle: Handle) -> (Self, UnboundedReceiver<RoomEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            backend,
            handle,
            events,
            timers: Vec::new(),
        };
        (dispatcher, rx)
    }

    /// Emits [`RoomEvent::Tick`] once per second.
    pub fn start_ticker(&mut self) {
        let tx = self.events.clone();
        let task = self.handle.spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(RoomEvent::Tick).is_err() {
                    break;
                }
            }
        });
        self.timers.push(task);
    }

    pub fn dispatch_all(&mut self, commands: impl IntoIterator<Item = RoomCommand>) {
        for command in commands {
            self.dispatch(command);
        }
    }

    pub fn dispatch(&mut self, command: RoomCommand) {
        debug!(?command, "dispatching");
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        match command {
            RoomCommand::StartSession { task_id } => {
                self.handle.spawn(async move {
                    let result = backend.start_session(task_id).await;
                    let _ = tx.send(RoomEvent::SessionStarted(result));
                });
            }
            RoomCommand::PersistAnswer(job) => {
                self.handle.spawn(async move {
                    let result = backend.save_answer(&job).await;
                    let _ = tx.send(RoomEvent::AnswerSaved {
                        question_id: job.question_id,
                        revision: job.revision,
                        result,
                    });
                });
            }
            RoomCommand::FetchStatus { submission_id } => {
                self.handle.spawn(async move {
                    let result = backend.fetch_status(submission_id).await;
                    let _ = tx.send(RoomEvent::StatusFetched(result));
                });
            }
            RoomCommand::CompleteSection {
                submission_id,
                section,
            } => {
                self.handle.spawn(async move {
                    let result = backend.complete_section(submission_id, section).await;
                    let _ = tx.send(RoomEvent::SectionCompleted(result));
                });
            }
            RoomCommand::SwitchSection {
                submission_id,
                section,
            } => {
                self.handle.spawn(async move {
                    let result = backend.switch_section(submission_id, section).await;
                    let _ = tx.send(RoomEvent::SectionSwitched(result));
                });
            }
            RoomCommand::FinalSubmit(request) => {
                self.handle.spawn(async move {
                    let result = backend.final_submit(&request).await;
                    let _ = tx.send(RoomEvent::SubmitFinished(result));
                });
            }
            RoomCommand::ScheduleDeadline(delay) => {
                let task = self.handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(RoomEvent::DeadlineReached);
                });
                self.timers.push(task);
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}
