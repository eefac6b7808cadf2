use super::*;
use crate::core::hook::HookResult;
use crate::session::memory::MemoryDocument;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) const SESSION_URL: &str = "https://www.kaniwani.com/reviews/session";

/// A review page laid out like the real one, built from the default locators.
pub(crate) struct QuizPage {
    pub doc: MemoryDocument,
    pub answer: ElementHandle,
    pub primary: ElementHandle,
    pub secondary: ElementHandle,
    pub parts_of_speech: ElementHandle,
}

pub(crate) fn quiz_page() -> QuizPage {
    let doc = MemoryDocument::new(SESSION_URL);
    let page = render(doc);
    page.show("One Thing", "", &["noun"]);
    page
}

fn render(doc: MemoryDocument) -> QuizPage {
    let question_box = doc.insert("div.lltPfd", None, "");
    let primary = doc.insert("div[data-question-primary]", Some(question_box), "");
    let secondary = doc.insert("div[data-question-secondary]", Some(question_box), "");
    let parts_of_speech = doc.insert("ul.hyPboY", Some(question_box), "");
    let answer_box = doc.insert("div.answer", None, "");
    let answer = doc.insert("#answer", Some(answer_box), "");
    doc.insert(r#"button[aria-label="Submit answer"]"#, Some(answer_box), "");
    QuizPage { doc, answer, primary, secondary, parts_of_speech }
}

impl QuizPage {
    pub fn show(&self, primary: &str, secondary: &str, parts_of_speech: &[&str]) {
        self.doc.set_text(self.primary, primary);
        self.doc.set_text(self.secondary, secondary);
        self.doc.remove_all("li > span");
        for tag in parts_of_speech {
            self.doc.insert("li > span", Some(self.parts_of_speech), *tag);
        }
        self.doc.set_value(self.answer, "");
    }

    pub fn type_answer(&self, text: &str) {
        self.doc.set_value(self.answer, text);
    }

    /// Throws the question area away and renders a fresh one.
    pub fn rerender(self) -> QuizPage {
        self.doc.clear();
        render(self.doc)
    }
}

/// One poll notices the session page, the next finds the elements.
pub(crate) fn enter(session: &mut Session, page: &QuizPage) {
    assert_eq!(session.tick(&page.doc), SessionState::Initializing);
    assert_eq!(session.tick(&page.doc), SessionState::AwaitingAnswer);
}

fn recording_session() -> (Session, Rc<RefCell<Vec<SubmissionPayload>>>) {
    let mut session = Session::new(SessionConfig::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    session.submit.register(move |payload: &SubmissionPayload, _| {
        log.borrow_mut()
            .push(SubmissionPayload::new(payload.answer.clone(), payload.question.clone()));
        Ok(HookResult::Continue(Verdict::NoSynonymData))
    });
    (session, seen)
}

#[test]
fn stays_out_of_session_on_other_pages() {
    let page = quiz_page();
    page.doc.set_url("https://www.kaniwani.com/dashboard");
    let mut session = Session::new(SessionConfig::default());
    assert_eq!(session.tick(&page.doc), SessionState::NotInSession);
}

#[test]
fn waits_until_every_element_exists() {
    let doc = MemoryDocument::new(SESSION_URL);
    let question_box = doc.insert("div.lltPfd", None, "");
    doc.insert("div[data-question-primary]", Some(question_box), "One Thing");
    let mut session = Session::new(SessionConfig::default());

    assert_eq!(session.tick(&doc), SessionState::Initializing);
    assert!(!session.in_session());
    assert_eq!(session.tick(&doc), SessionState::Initializing);

    doc.clear();
    let page = render(doc);
    assert_eq!(session.tick(&page.doc), SessionState::AwaitingAnswer);
    assert!(session.in_session());
}

#[test]
fn answer_without_container_is_not_enough() {
    let page = quiz_page();
    page.doc.remove_all("div.answer");
    let orphan = page.doc.insert("#answer", None, "");
    page.doc.insert(r#"button[aria-label="Submit answer"]"#, None, "");
    let mut session = Session::new(SessionConfig::default());

    assert_eq!(session.tick(&page.doc), SessionState::Initializing);
    assert_eq!(session.tick(&page.doc), SessionState::Initializing);
    assert!(page.doc.is_alive(orphan));
}

#[test]
fn submit_dispatches_normalized_payload() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    page.show("Up", "Above, Over", &["Noun", "Suffix"]);
    page.type_answer("kan");

    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::key("Enter")),
        EventDisposition::Propagate
    );
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].answer, "かん");
    assert_eq!(
        seen[0].question,
        QuestionHints {
            primary: "Up".into(),
            secondary: vec!["Above".into(), "Over".into()],
            parts_of_speech: vec!["noun".into(), "suffix".into()],
        }
    );
}

#[test]
fn invalid_input_is_dropped_silently() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("abc123");

    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::key("Enter")),
        EventDisposition::Propagate
    );
    assert_eq!(session.state(), SessionState::AwaitingAnswer);
    assert!(seen.borrow().is_empty());
    assert!(session.last_report().is_none());
}

#[test]
fn veto_keeps_awaiting_answer() {
    let mut session = Session::new(SessionConfig::default());
    session.submit.register(|_, _| Ok(HookResult::Veto));
    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("一個");

    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::SubmitActivated),
        EventDisposition::Suppress
    );
    assert_eq!(session.state(), SessionState::AwaitingAnswer);
}

#[test]
fn cancellation_suppresses_like_a_veto() {
    let mut session = Session::new(SessionConfig::default());
    session.submit.register(|payload: &SubmissionPayload, _| {
        payload.cancel();
        Ok(HookResult::Continue(Verdict::NoSynonymData))
    });
    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("ひとつ");

    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::key("Enter")),
        EventDisposition::Suppress
    );
    assert_eq!(session.state(), SessionState::AwaitingAnswer);
}

#[test]
fn both_triggers_dispatch_once_per_answer() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("ひとつ");

    session.handle_event(&page.doc, &InputEvent::key("Enter"));
    session.handle_event(&page.doc, &InputEvent::SubmitActivated);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn retry_key_rearms_without_dispatch() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("ひとつ");
    session.handle_event(&page.doc, &InputEvent::key("Enter"));

    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::key("Backspace")),
        EventDisposition::Propagate
    );
    assert_eq!(session.state(), SessionState::AwaitingAnswer);
    assert_eq!(seen.borrow().len(), 1);

    session.handle_event(&page.doc, &InputEvent::key("Enter"));
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn next_question_rearms() {
    let (mut session, _) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("ひとつ");
    session.handle_event(&page.doc, &InputEvent::key("Enter"));

    assert_eq!(session.tick(&page.doc), SessionState::AwaitingConfirmation);
    page.show("Up", "", &["noun"]);
    assert_eq!(session.tick(&page.doc), SessionState::AwaitingAnswer);
}

#[test]
fn next_card_with_same_primary_rearms() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    page.show("Up", "", &["noun"]);
    page.type_answer("うえ");
    session.handle_event(&page.doc, &InputEvent::key("Enter"));
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);

    page.show("Up", "Above", &["noun"]);
    assert_eq!(session.tick(&page.doc), SessionState::AwaitingAnswer);

    page.type_answer("じょうほう");
    session.handle_event(&page.doc, &InputEvent::key("Enter"));
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(seen.borrow()[1].question.secondary, vec!["Above"]);
}

#[test]
fn rerender_triggers_rediscovery() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    enter(&mut session, &page);
    let old_primary = page.primary;

    let page = page.rerender();
    page.show("Up", "", &["noun"]);
    assert!(!page.doc.is_alive(old_primary));

    // Input before the next poll finds the stale handles and does not dispatch.
    page.type_answer("うえ");
    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::key("Enter")),
        EventDisposition::Propagate
    );
    assert_eq!(session.state(), SessionState::Initializing);
    assert!(seen.borrow().is_empty());

    assert_eq!(session.tick(&page.doc), SessionState::AwaitingAnswer);
    session.handle_event(&page.doc, &InputEvent::key("Enter"));
    assert_eq!(seen.borrow()[0].question.primary, "Up");
}

#[test]
fn leaving_the_page_clears_caches_but_keeps_hooks() {
    let mut session = Session::new(SessionConfig::default());
    let starts = Rc::new(RefCell::new(0));
    let ends = Rc::new(RefCell::new(0));
    let counter = starts.clone();
    session.session_start.register(move |_, _| {
        *counter.borrow_mut() += 1;
        Ok(HookResult::Continue(()))
    });
    let counter = ends.clone();
    session.session_end.register(move |_, _| {
        *counter.borrow_mut() += 1;
        Ok(HookResult::Continue(()))
    });
    session.submit.register(|_, _| Ok(HookResult::Continue(Verdict::Accept)));

    let page = quiz_page();
    enter(&mut session, &page);
    page.type_answer("ひとつ");
    session.handle_event(&page.doc, &InputEvent::key("Enter"));
    assert!(session.last_report().is_some());

    page.doc.set_url("https://www.kaniwani.com/dashboard");
    assert_eq!(session.tick(&page.doc), SessionState::NotInSession);
    assert!(session.last_report().is_none());
    assert_eq!(*ends.borrow(), 1);

    page.doc.set_url(SESSION_URL);
    assert_eq!(session.tick(&page.doc), SessionState::Initializing);
    assert_eq!(session.tick(&page.doc), SessionState::AwaitingAnswer);
    assert_eq!(*starts.borrow(), 2);
    assert_eq!(session.submit.len(), 1);
    assert_eq!(session.session_start.len(), 1);
}

#[test]
fn events_outside_a_session_are_ignored() {
    let (mut session, seen) = recording_session();
    let page = quiz_page();
    page.type_answer("ひとつ");
    assert_eq!(
        session.handle_event(&page.doc, &InputEvent::key("Enter")),
        EventDisposition::Propagate
    );
    assert_eq!(session.state(), SessionState::NotInSession);
    assert!(seen.borrow().is_empty());
}

/// Drives a session through a fixed pseudo-random mix of page changes and inputs
/// and checks every observed state change against the transition graph. Also
/// checks that whenever the session reports being in session, every required
/// element is present.
#[test]
fn every_observed_transition_is_an_edge() {
    let mut session = Session::new(SessionConfig::default());
    let verdicts = Rc::new(RefCell::new(0u32));
    let counter = verdicts.clone();
    session.submit.register(move |_, _| {
        let mut n = counter.borrow_mut();
        *n += 1;
        Ok(if *n % 3 == 0 { HookResult::Veto } else { HookResult::Continue(Verdict::Accept) })
    });

    let mut page = quiz_page();
    let mut previous = session.state();
    let mut seed: u32 = 0x2545_f491;

    for _ in 0..2000 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;

        match seed % 9 {
            0 => page.doc.set_url("https://www.kaniwani.com/dashboard"),
            1 => page.doc.set_url(SESSION_URL),
            2 => page = page.rerender(),
            3 => page.doc.remove_all("ul.hyPboY"),
            4 => page.show(if seed % 2 == 0 { "Up" } else { "One Thing" }, "", &["noun"]),
            5 => page.type_answer(if seed % 2 == 0 { "ひとつ" } else { "xyz" }),
            6 => {
                session.handle_event(&page.doc, &InputEvent::key("Enter"));
            }
            7 => {
                session.handle_event(&page.doc, &InputEvent::key("Backspace"));
            }
            _ => {
                session.tick(&page.doc);
            }
        }

        let current = session.state();
        if current != previous {
            assert!(previous.can_transition_to(current), "{previous} -> {current}");
        }
        if current == SessionState::AwaitingAnswer && seed % 9 == 8 {
            for role in ElementRole::ALL {
                let locator = session.config().locators.locator(role);
                assert!(
                    page.doc.resolve(&locator).is_some(),
                    "{role:?} missing while awaiting answer"
                );
            }
        }
        previous = current;
    }
}

#[test]
fn confirmation_is_only_reachable_from_awaiting_answer() {
    use SessionState::*;
    for from in [NotInSession, Initializing, AwaitingConfirmation] {
        assert!(!from.can_transition_to(AwaitingConfirmation));
    }
    assert!(AwaitingAnswer.can_transition_to(AwaitingConfirmation));
    assert!(!NotInSession.can_transition_to(AwaitingAnswer));
}
