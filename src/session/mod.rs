// src/session/mod.rs
//! The quiz session state machine.
//!
//! ```text
//! NotInSession -> Initializing -> AwaitingAnswer <-> AwaitingConfirmation
//!                      ^                |                     |
//!                      +---- handles went stale --------------+
//! any state -> NotInSession when the page leaves the session
//! ```
//!
//! The session is driven from outside: [`Session::tick`] runs the boundary and
//! discovery checks, [`Session::handle_event`] reacts to user input. Both read
//! the page through a [`HostDocument`] passed in per call; element handles are
//! cached for one session at most and re-validated on every tick.

pub mod driver;
pub mod host;
pub mod memory;

use crate::config::SessionConfig;
use crate::core::hook::{Dispatch, Hook, HookContext, HookError};
use crate::core::matcher::Verdict;
use crate::core::script::{is_valid_answer, normalize_answer, KanaConverter, ScriptConverter};
use crate::core::types::{QuestionHints, SubmissionPayload};
use host::{ElementHandle, ElementRole, HostDocument, InputEvent};
use std::fmt;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    NotInSession,
    Initializing,
    AwaitingAnswer,
    AwaitingConfirmation,
}

impl SessionState {
    /// The edges of the state graph. Staying put is not a transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (NotInSession, Initializing)
                | (Initializing, AwaitingAnswer)
                | (AwaitingAnswer, AwaitingConfirmation)
                | (AwaitingConfirmation, AwaitingAnswer)
                | (AwaitingAnswer | AwaitingConfirmation, Initializing)
                | (Initializing | AwaitingAnswer | AwaitingConfirmation, NotInSession)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotInSession => write!(f, "not in session"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::AwaitingAnswer => write!(f, "awaiting answer"),
            SessionState::AwaitingConfirmation => write!(f, "awaiting confirmation"),
        }
    }
}

/// Context of the lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Ended,
}

impl HookContext for SessionEvent {}

/// Whether the host should still see the triggering event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Propagate,
    Suppress,
}

/// What happened to the last dispatched submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub answer: String,
    pub question: QuestionHints,
    pub outcome: Result<Dispatch<Verdict>, HookError>,
}

impl SubmitReport {
    /// Allowed through, but a subscriber could not resolve it safely.
    pub fn is_flagged(&self) -> bool {
        matches!(&self.outcome, Ok(d) if d.results().contains(&Verdict::AmbiguousTwin))
    }

    pub fn is_vetoed(&self) -> bool {
        matches!(&self.outcome, Ok(d) if !d.is_allowed())
    }
}

/// Handles of one fully discovered page. Only ever built whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Handles {
    answer_input: ElementHandle,
    /// Derived: the answer input's container.
    answer_box: ElementHandle,
    question_box: ElementHandle,
    primary: ElementHandle,
    secondary: ElementHandle,
    parts_of_speech: ElementHandle,
    submit: ElementHandle,
}

impl Handles {
    fn all(&self) -> [ElementHandle; 7] {
        [
            self.answer_input,
            self.answer_box,
            self.question_box,
            self.primary,
            self.secondary,
            self.parts_of_speech,
            self.submit,
        ]
    }
}

pub struct Session<S = KanaConverter> {
    config: SessionConfig,
    converter: S,
    state: SessionState,
    handles: Option<Handles>,
    started: bool,
    /// The question shown when the last answer went through.
    confirmed_question: Option<QuestionHints>,
    last_report: Option<SubmitReport>,
    pub session_start: Hook<SessionEvent>,
    pub session_end: Hook<SessionEvent>,
    pub submit: Hook<SubmissionPayload, Verdict>,
}

impl Session<KanaConverter> {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_converter(config, KanaConverter::new())
    }
}

impl<S: ScriptConverter> Session<S> {
    pub fn with_converter(config: SessionConfig, converter: S) -> Self {
        Self {
            config,
            converter,
            state: SessionState::NotInSession,
            handles: None,
            started: false,
            confirmed_question: None,
            last_report: None,
            session_start: Hook::new("session_start"),
            session_end: Hook::new("session_end"),
            submit: Hook::new("submit"),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once every required element has been found.
    pub fn in_session(&self) -> bool {
        matches!(self.state, SessionState::AwaitingAnswer | SessionState::AwaitingConfirmation)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn last_report(&self) -> Option<&SubmitReport> {
        self.last_report.as_ref()
    }

    /// One round of boundary detection and element discovery. Makes at most one
    /// state transition per call.
    pub fn tick(&mut self, host: &impl HostDocument) -> SessionState {
        let on_session_page = host.url().ends_with(&self.config.session_url_suffix);

        match (self.state, on_session_page) {
            (SessionState::NotInSession, false) => {}
            (_, false) => self.end_session(),
            (SessionState::NotInSession, true) => self.transition(SessionState::Initializing),
            (SessionState::Initializing, true) => self.discover(host),
            (SessionState::AwaitingAnswer | SessionState::AwaitingConfirmation, true) => {
                if !self.handles_alive(host) {
                    debug!("Page re-rendered, rediscovering elements");
                    self.handles = None;
                    self.transition(SessionState::Initializing);
                } else if self.state == SessionState::AwaitingConfirmation
                    && self.question_changed(host)
                {
                    debug!("Host moved to the next question");
                    self.confirmed_question = None;
                    self.transition(SessionState::AwaitingAnswer);
                }
            }
        }

        self.state
    }

    /// Reacts to user input. Only the confirm key, the submit control and the
    /// retry key are observed, and only while in session.
    pub fn handle_event(
        &mut self,
        host: &impl HostDocument,
        event: &InputEvent,
    ) -> EventDisposition {
        if !self.in_session() {
            return EventDisposition::Propagate;
        }

        let is_confirm = matches!(event, InputEvent::Key(k) if *k == self.config.confirm_key);
        let is_retry = matches!(event, InputEvent::Key(k) if *k == self.config.retry_key);

        match (self.state, event) {
            (SessionState::AwaitingAnswer, InputEvent::SubmitActivated) => self.submit_answer(host),
            (SessionState::AwaitingAnswer, _) if is_confirm => self.submit_answer(host),
            (SessionState::AwaitingConfirmation, _) if is_retry => {
                info!("Answer ignored, awaiting a new one");
                self.confirmed_question = None;
                self.transition(SessionState::AwaitingAnswer);
                EventDisposition::Propagate
            }
            _ => EventDisposition::Propagate,
        }
    }

    fn submit_answer(&mut self, host: &impl HostDocument) -> EventDisposition {
        let Some((raw_answer, question)) = self.read_question(host) else {
            debug!("Elements went stale before submit, rediscovering");
            self.handles = None;
            self.transition(SessionState::Initializing);
            return EventDisposition::Propagate;
        };

        let answer = normalize_answer(&raw_answer, &self.converter);
        if !is_valid_answer(&answer, &self.converter) {
            debug!(raw = %raw_answer, "Dropping answer with invalid characters");
            return EventDisposition::Propagate;
        }

        let payload = SubmissionPayload::new(answer, question);
        let outcome = self.submit.dispatch(&payload);

        let disposition = match &outcome {
            Ok(Dispatch::Allowed(verdicts)) => {
                debug!(answer = %payload.answer, ?verdicts, "Submission allowed");
                EventDisposition::Propagate
            }
            Ok(vetoed) => {
                info!(answer = %payload.answer, verdicts = ?vetoed.results(), "Submission vetoed");
                EventDisposition::Suppress
            }
            Err(err) => {
                warn!(error = %err, "Submit hook failed, letting the answer through");
                EventDisposition::Propagate
            }
        };

        if disposition == EventDisposition::Propagate {
            self.confirmed_question = Some(payload.question.clone());
            self.transition(SessionState::AwaitingConfirmation);
        }

        self.last_report = Some(SubmitReport {
            answer: payload.answer,
            question: payload.question,
            outcome,
        });
        disposition
    }

    /// Reads the answer and the question hints through the cached handles.
    /// `None` if any of them has gone stale.
    fn read_question(&self, host: &impl HostDocument) -> Option<(String, QuestionHints)> {
        let handles = self.handles?;
        let answer = host.value(handles.answer_input)?;
        let primary = host.text(handles.primary)?;
        let secondary = QuestionHints::split_secondary(&host.text(handles.secondary)?);

        let item_locator = self.config.locators.item_locator();
        let parts_of_speech = host
            .resolve_within(handles.parts_of_speech, &item_locator)?
            .into_iter()
            .map(|item| host.text(item))
            .collect::<Option<Vec<String>>>()?;

        Some((answer, QuestionHints::new(primary, secondary, parts_of_speech)))
    }

    /// Resolves every required element. State advances only if all of them,
    /// plus the answer container, resolve in the same pass.
    fn discover(&mut self, host: &impl HostDocument) {
        let locators = &self.config.locators;
        let mut missing = Vec::new();
        let mut resolve = |role: ElementRole| {
            let handle = host.resolve(&locators.locator(role));
            if handle.is_none() {
                missing.push(role);
            }
            handle
        };

        let found = (
            resolve(ElementRole::AnswerInput),
            resolve(ElementRole::QuestionBox),
            resolve(ElementRole::PrimaryMeaning),
            resolve(ElementRole::SecondaryMeanings),
            resolve(ElementRole::PartsOfSpeech),
            resolve(ElementRole::SubmitControl),
        );

        let handles = match found {
            (
                Some(answer_input),
                Some(question_box),
                Some(primary),
                Some(secondary),
                Some(parts_of_speech),
                Some(submit),
            ) => {
                host.parent(answer_input).map(|answer_box| Handles {
                    answer_input,
                    answer_box,
                    question_box,
                    primary,
                    secondary,
                    parts_of_speech,
                    submit,
                })
            }
            _ => None,
        };

        match handles {
            Some(handles) => {
                self.handles = Some(handles);
                self.transition(SessionState::AwaitingAnswer);
                if !self.started {
                    self.started = true;
                    run_lifecycle(&mut self.session_start, SessionEvent::Started);
                }
            }
            None => trace!(?missing, "Elements not ready"),
        }
    }

    fn handles_alive(&self, host: &impl HostDocument) -> bool {
        self.handles
            .is_some_and(|handles| handles.all().into_iter().all(|h| host.is_alive(h)))
    }

    /// Compares the whole question, since cards can share a primary meaning.
    fn question_changed(&self, host: &impl HostDocument) -> bool {
        match self.read_question(host) {
            Some((_, current)) => self.confirmed_question.as_ref() != Some(&current),
            None => false,
        }
    }

    fn end_session(&mut self) {
        self.handles = None;
        self.confirmed_question = None;
        self.last_report = None;
        self.transition(SessionState::NotInSession);
        if self.started {
            self.started = false;
            run_lifecycle(&mut self.session_end, SessionEvent::Ended);
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "Refusing undefined transition");
            return;
        }
        info!(from = %self.state, to = %next, "Session state changed");
        self.state = next;
    }
}

fn run_lifecycle(hook: &mut Hook<SessionEvent>, event: SessionEvent) {
    if let Err(err) = hook.dispatch(&event) {
        warn!(?event, error = %err, "Lifecycle hook failed");
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("handles", &self.handles)
            .field("submit", &self.submit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests;
