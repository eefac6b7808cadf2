//! quiz-simulator: a terminal stand-in for the KaniWani review page, with the
//! synonym checker attached the same way it is on the real page.

use anyhow::{Context, Result};
use checker_core::config::{parse_log_level, Config};
use checker_core::controller::{install, populate, StoreSlot};
use checker_core::core::script::{normalize_answer, KanaConverter};
use checker_core::session::driver::{DriverEvent, SessionDriver};
use checker_core::session::host::{ElementHandle, InputEvent};
use checker_core::session::memory::MemoryDocument;
use checker_core::session::{EventDisposition, Session};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute};
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const HOME: &str = "https://www.kaniwani.com";
const CONFIG_FILE: &str = "synonym-checker.toml";

struct Question {
    primary: &'static str,
    secondary: &'static str,
    parts_of_speech: &'static [&'static str],
    answers: &'static [&'static str],
}

const QUESTIONS: &[Question] = &[
    Question {
        primary: "One Thing",
        secondary: "",
        parts_of_speech: &["Noun", "Numeral"],
        answers: &["一つ", "ひとつ"],
    },
    Question {
        primary: "Person",
        secondary: "",
        parts_of_speech: &["Noun"],
        answers: &["人", "ひと"],
    },
    Question {
        primary: "Up",
        secondary: "Above",
        parts_of_speech: &["Noun", "No Adjective"],
        answers: &["上", "うえ"],
    },
    Question {
        primary: "Big",
        secondary: "Large",
        parts_of_speech: &["I Adjective"],
        answers: &["大きい", "おおきい"],
    },
];

/// The part of the page the simulator draws and edits.
struct Page {
    doc: MemoryDocument,
    primary: ElementHandle,
    secondary: ElementHandle,
    parts_of_speech: ElementHandle,
    answer: ElementHandle,
    item_locator: String,
}

impl Page {
    fn render(doc: MemoryDocument, config: &Config) -> Self {
        let locators = &config.session.locators;
        let question_box = doc.insert(&locators.question_box, None, "");
        let primary = doc.insert(&locators.primary_meaning, Some(question_box), "");
        let secondary = doc.insert(&locators.secondary_meanings, Some(question_box), "");
        let parts_of_speech = doc.insert(&locators.parts_of_speech, Some(question_box), "");
        let answer_box = doc.insert("form", None, "");
        let answer = doc.insert(&locators.answer_input, Some(answer_box), "");
        doc.insert(&locators.submit_control, Some(answer_box), "");
        Self {
            doc,
            primary,
            secondary,
            parts_of_speech,
            answer,
            item_locator: locators.parts_of_speech_item.clone(),
        }
    }

    fn show(&self, question: &Question) {
        self.doc.set_text(self.primary, question.primary);
        self.doc.set_text(self.secondary, question.secondary);
        self.doc.remove_all(&self.item_locator);
        for tag in question.parts_of_speech {
            self.doc.insert(&self.item_locator, Some(self.parts_of_speech), *tag);
        }
        self.doc.set_value(self.answer, "");
    }
}

/// What the page itself shows after an answer went through.
#[derive(Clone, Copy)]
enum Status {
    Typing,
    Blocked,
    Correct,
    Incorrect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load(&PathBuf::from(CONFIG_FILE))
        .with_context(|| format!("reading {CONFIG_FILE}"))?;
    let _guard = init_logging(&config)?;

    let doc = MemoryDocument::new(format!("{HOME}{}", config.session.session_url_suffix));
    let page = Page::render(doc.clone(), &config);

    let slot = StoreSlot::default();
    let mut session = Session::new(config.session.clone());
    install(&mut session, slot.clone());
    let (mut driver, events) = SessionDriver::new(session, doc);

    let shutdown = CancellationToken::new();
    terminal::enable_raw_mode()?;
    let input = {
        let shutdown = shutdown.clone();
        let poll = config.session.poll_interval();
        std::thread::spawn(move || {
            let result = quiz(&page, &events, poll);
            page.doc.set_url(format!("{HOME}/dashboard"));
            // Let the driver see the page change before stopping it
            std::thread::sleep(poll * 3);
            shutdown.cancel();
            result
        })
    };

    tokio::join!(driver.run(shutdown.clone()), populate(&slot, &config.data));
    terminal::disable_raw_mode()?;

    match input.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("input thread panicked"),
    }
    info!(state = %driver.session().state(), "Simulator finished");
    Ok(())
}

fn init_logging(config: &Config) -> Result<WorkerGuard> {
    let dir = PathBuf::from("target");
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(&dir, "quiz-simulator.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::builder()
        .with_default_directive(parse_log_level(&config.log.level).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(guard)
}

/// Runs the review loop on the calling thread until Esc or Ctrl-C.
fn quiz(page: &Page, events: &UnboundedSender<DriverEvent>, poll: Duration) -> Result<()> {
    let mut index = 0;
    let mut typed = String::new();
    let mut status = Status::Typing;
    page.show(&QUESTIONS[index]);

    loop {
        draw(&QUESTIONS[index], &typed, &status)?;
        if !event::poll(poll)? {
            continue;
        }
        let Event::Key(KeyEvent { code, modifiers, kind: KeyEventKind::Press, .. }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Esc => break,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Enter => match status {
                Status::Correct | Status::Incorrect => {
                    index = (index + 1) % QUESTIONS.len();
                    typed.clear();
                    status = Status::Typing;
                    page.show(&QUESTIONS[index]);
                }
                Status::Typing | Status::Blocked => {
                    status = match send(events, InputEvent::key("Enter")) {
                        Some(EventDisposition::Suppress) => Status::Blocked,
                        _ if is_correct(&QUESTIONS[index], &typed) => Status::Correct,
                        _ => Status::Incorrect,
                    };
                }
            },
            KeyCode::Backspace => match status {
                Status::Correct => {}
                Status::Incorrect => {
                    send(events, InputEvent::key("Backspace"));
                    status = Status::Typing;
                }
                Status::Typing | Status::Blocked => {
                    typed.pop();
                    page.doc.set_value(page.answer, typed.clone());
                }
            },
            KeyCode::Char(c) if matches!(status, Status::Typing | Status::Blocked) => {
                typed.push(c);
                status = Status::Typing;
                page.doc.set_value(page.answer, typed.clone());
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_correct(question: &Question, typed: &str) -> bool {
    let answer = normalize_answer(typed, &KanaConverter::new());
    question.answers.contains(&answer.as_str())
}

/// Forwards an input and waits for the checker's disposition. `None` once the
/// driver has gone away.
fn send(events: &UnboundedSender<DriverEvent>, input: InputEvent) -> Option<EventDisposition> {
    let (event, reply) = DriverEvent::new(input);
    events.send(event).ok()?;
    reply.blocking_recv().ok()
}

fn draw(question: &Question, typed: &str, status: &Status) -> Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    write!(out, "KaniWani review simulator (Esc to quit)\r\n\r\n")?;
    write!(out, "  {}", question.primary)?;
    if !question.secondary.is_empty() {
        write!(out, "  [{}]", question.secondary)?;
    }
    write!(out, "\r\n  {}\r\n\r\n", question.parts_of_speech.join(", "))?;
    write!(out, "> {typed}\r\n\r\n")?;
    let line = match status {
        Status::Typing => "",
        Status::Blocked => "Not the word we're looking for, try another synonym.",
        Status::Correct => "Correct! Enter for the next question.",
        Status::Incorrect => "Incorrect. Backspace to retry, Enter to continue.",
    };
    write!(out, "{line}\r\n")?;
    out.flush()?;
    Ok(())
}
