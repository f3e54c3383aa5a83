//! # Chat Loop
//!
//! Runs the terminal window: draw, answer a queued question if there is one,
//! then wait for the next key press. A question is answered only after the
//! window has been redrawn with the "thinking" status.

use crate::app::App;
use crate::ui::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io;
use std::time::Duration;
use tablerag::Retriever;
use tracing::{error, info};

/// Runs the chat window until the user quits, then hands the retriever back.
pub async fn run(mut retriever: Retriever, document_count: usize) -> Result<Retriever> {
    let mut app = App::new(document_count);

    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &mut retriever).await;

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result?;
    Ok(retriever)
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    retriever: &mut Retriever,
) -> Result<()> {
    while app.running {
        terminal.draw(|frame| ui(frame, app))?;

        if let Some(question) = app.queued_question() {
            info!("Question: {question}");
            match retriever.answer(&question).await {
                Ok(answer) => {
                    info!(source = ?answer.source, "Answered question");
                    app.record_answer(&question, &answer.text);
                }
                Err(e) => {
                    error!("Failed to answer '{question}': {e}");
                    app.record_error(&question, &e.to_string());
                }
            }
            continue;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                app.handle_key(key.code);
            }
        }
    }
    Ok(())
}
