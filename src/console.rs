use std::fmt;
use std::time::Duration;

use colored::Colorize;
use dialoguer::{console::Term, theme::ColorfulTheme, Input};
use error_stack::{IntoReport, ResultExt};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug)]
pub struct ConsoleError;

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Console error")
    }
}

impl std::error::Error for ConsoleError {}

pub type ConsoleResult<T> = error_stack::Result<T, ConsoleError>;

/// Terminal presentation for a run. Nothing here is part of the pipeline
/// contract; clearing in particular is a capability the user can switch off.
#[derive(Debug, Clone)]
pub struct Console {
    clear_screen: bool,
}

impl Console {
    pub fn new(clear_screen: bool) -> Self {
        Self { clear_screen }
    }

    pub fn clear(&self) {
        if self.clear_screen {
            let _ = Term::stdout().clear_screen();
        }
    }

    pub fn input(&self, prompt_text: String) -> ConsoleResult<String> {
        let colorful_theme = &ColorfulTheme::default();
        let mut input = Input::with_theme(colorful_theme);
        let dialog: String = input
            .with_prompt(&prompt_text)
            .interact_text()
            .into_report()
            .change_context(ConsoleError)?;

        Ok(dialog)
    }

    /// `<index>/<total> | <title> | <status>`
    pub fn progress(&self, index: usize, total: usize, title: &str, status: &str) {
        println!(
            "{}",
            format!("{}/{} | {} | {}", index, total, title, status).magenta()
        );
    }

    pub fn success(&self, message: &str) {
        println!("{}", message.green());
    }

    pub fn failure(&self, message: &str) {
        println!("{}", message.red());
    }

    pub fn warning(&self, message: &str) {
        println!("{}", message.yellow());
    }

    pub fn info(&self, message: &str) {
        println!("{}", message);
    }

    pub fn spinner(&self, message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}
