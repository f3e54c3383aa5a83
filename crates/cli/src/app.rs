//! # Chat Window State
//!
//! This module defines the state of the chat window and how key presses
//! change it. Answering happens in [`crate::chat`]; this module only queues
//! questions and records the results.

use crossterm::event::KeyCode;

const WELCOME: &str = "Q&A Data\nType your question and press Enter.\nType 'q' to quit.";
const READY_STATUS: &str = "<Enter> ask | 'q' or <Esc> quit | <PgUp>/<PgDn> scroll";

/// Lines moved per PageUp/PageDown.
pub const SCROLL_STEP: u16 = 5;

/// The core state for the chat window.
pub struct App {
    /// `true` while the main loop should keep running.
    pub running: bool,
    /// Everything shown in the transcript, one entry per logical line.
    pub transcript: Vec<String>,
    /// The text currently in the input box.
    pub input_text: String,
    /// A message to display in the status bar.
    pub status: String,
    /// A submitted question waiting to be answered after the next redraw.
    pub pending_question: Option<String>,
    /// How many lines the transcript is scrolled up from the bottom.
    pub scroll_back: u16,
}

impl App {
    pub fn new(document_count: usize) -> Self {
        let mut transcript: Vec<String> = WELCOME.lines().map(str::to_string).collect();
        transcript.push(String::new());
        let status = if document_count == 0 {
            "The index is empty. Run `tablerag index` first.".to_string()
        } else {
            READY_STATUS.to_string()
        };
        Self {
            running: true,
            transcript,
            input_text: String::new(),
            status,
            pending_question: None,
            scroll_back: 0,
        }
    }

    /// Sets the `running` flag to false to exit the main loop.
    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_busy(&self) -> bool {
        self.pending_question.is_some()
    }

    /// Applies one key press. Input is ignored while a question is pending.
    pub fn handle_key(&mut self, key: KeyCode) {
        if self.is_busy() {
            return;
        }
        match key {
            KeyCode::Esc => self.quit(),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input_text.pop();
            }
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(SCROLL_STEP),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP),
            KeyCode::Char(c) => self.input_text.push(c),
            _ => {}
        }
    }

    /// Queues the typed question; a lone `q` quits instead.
    fn submit(&mut self) {
        let question = self.input_text.trim().to_string();
        self.input_text.clear();

        if question.is_empty() {
            return;
        }
        if question.eq_ignore_ascii_case("q") {
            self.quit();
            return;
        }

        self.status = "Thinking...".to_string();
        self.pending_question = Some(question);
    }

    /// The queued question, if any. The app stays busy until
    /// [`App::record_answer`] or [`App::record_error`] is called.
    pub fn queued_question(&self) -> Option<String> {
        self.pending_question.clone()
    }

    pub fn record_answer(&mut self, question: &str, answer: &str) {
        self.transcript.push(format!("You: {question}"));
        self.transcript
            .extend(format!("Answer: {answer}").lines().map(str::to_string));
        self.transcript.push(String::new());
        self.finish();
    }

    pub fn record_error(&mut self, question: &str, error: &str) {
        self.transcript.push(format!("You: {question}"));
        self.transcript.push(format!("Error: {error}"));
        self.transcript.push(String::new());
        self.finish();
    }

    fn finish(&mut self) {
        self.pending_question = None;
        self.scroll_back = 0;
        self.status = READY_STATUS.to_string();
    }
}
