// src/session/driver.rs
//! The single recurring task that keeps a session in step with its page.

use crate::core::script::ScriptConverter;
use crate::session::host::{HostDocument, InputEvent};
use crate::session::{EventDisposition, Session};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A user input forwarded to the driver, with an optional channel for the verdict
/// on whether the host should still see it.
#[derive(Debug)]
pub struct DriverEvent {
    pub input: InputEvent,
    pub reply: Option<oneshot::Sender<EventDisposition>>,
}

impl DriverEvent {
    pub fn new(input: InputEvent) -> (Self, oneshot::Receiver<EventDisposition>) {
        let (tx, rx) = oneshot::channel();
        (Self { input, reply: Some(tx) }, rx)
    }

    pub fn fire_and_forget(input: InputEvent) -> Self {
        Self { input, reply: None }
    }
}

/// Owns a session and its page, and interleaves polling with input handling.
/// Everything runs on the caller's task; callbacks never cross threads.
pub struct SessionDriver<H, S> {
    session: Session<S>,
    host: H,
    events: mpsc::UnboundedReceiver<DriverEvent>,
}

impl<H: HostDocument, S: ScriptConverter> SessionDriver<H, S> {
    /// Returns the driver and the sender inputs should be pushed through.
    pub fn new(session: Session<S>, host: H) -> (Self, mpsc::UnboundedSender<DriverEvent>) {
        let (tx, events) = mpsc::unbounded_channel();
        (Self { session, host, events }, tx)
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<S> {
        &mut self.session
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Polls until `shutdown` fires or every event sender is gone. Can be called
    /// again afterwards to restart polling with the same session.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.session.config().poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.session.config().poll_interval_ms, "Session driver started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        debug!("All event senders dropped");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.session.tick(&self.host);
                }
            }
        }

        info!(state = %self.session.state(), "Session driver stopped");
    }

    fn handle(&mut self, event: DriverEvent) {
        let disposition = self.session.handle_event(&self.host, &event.input);
        if let Some(reply) = event.reply {
            // The sender may have stopped waiting
            let _ = reply.send(disposition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::core::hook::HookResult;
    use crate::session::tests::quiz_page;
    use crate::session::SessionState;
    use std::time::Duration;

    fn fast_config() -> SessionConfig {
        SessionConfig { poll_interval_ms: 5, ..SessionConfig::default() }
    }

    #[tokio::test]
    async fn polls_into_session_and_answers_events() {
        let page = quiz_page();
        let mut session = Session::new(fast_config());
        session.submit.register(|_, _| Ok(HookResult::Veto));
        let (mut driver, events) = SessionDriver::new(session, page.doc.clone());
        let shutdown = CancellationToken::new();

        let client = async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            page.type_answer("一個");
            let (event, reply) = DriverEvent::new(InputEvent::key("Enter"));
            events.send(event).unwrap();
            let disposition = reply.await.unwrap();
            shutdown.cancel();
            disposition
        };
        let ((), disposition) = tokio::join!(driver.run(shutdown.clone()), client);

        assert_eq!(disposition, EventDisposition::Suppress);
        assert_eq!(driver.session().state(), SessionState::AwaitingAnswer);
    }

    #[tokio::test]
    async fn stops_when_senders_are_gone() {
        let page = quiz_page();
        let session = Session::new(fast_config());
        let (mut driver, events) = SessionDriver::new(session, page.doc.clone());
        events.send(DriverEvent::fire_and_forget(InputEvent::key("a"))).unwrap();
        drop(events);

        tokio::time::timeout(Duration::from_secs(1), driver.run(CancellationToken::new()))
            .await
            .expect("driver should stop on its own");
    }
}
