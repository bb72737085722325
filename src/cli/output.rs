//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Counsel CLI.

use crate::types::{PhaseResult, ResultKind, RunStatus};
use owo_colors::OwoColorize;
use tokio::sync::watch;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the name and version line
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "Counsel".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   Counsel v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a progress line: percentage and phase label
    pub fn progress(&self, percent: u8, label: &str) {
        if self.colored {
            println!(
                "  {} {}",
                format!("[{:>3}%]", percent).dimmed(),
                label.bright_white()
            );
        } else {
            println!("  [{:>3}%] {}", percent, label);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print one run result with its heading
    pub fn result(&self, result: &PhaseResult) {
        let title = match &result.perspective {
            Some(perspective) => format!("{} ({})", result.agent, perspective),
            None => result.agent.clone(),
        };
        let tag = result_tag(result.kind);

        if self.colored {
            println!(
                "\n  {} {} {}",
                format!("[{}]", tag).magenta(),
                title.cyan().bold(),
                result.timestamp.dimmed()
            );
        } else {
            println!("\n  [{}] {} {}", tag, title, result.timestamp);
        }

        for line in result.content.lines() {
            println!("    {}", line);
        }
    }

    /// Print the final status: every result, then the sources
    pub fn run_report(&self, status: &RunStatus) {
        self.header("Results");
        for result in &status.results {
            self.result(result);
        }

        if !status.sources.is_empty() {
            self.subheader(&format!("Sources ({})", status.sources.len()));
            for source in &status.sources {
                self.list_item(source);
            }
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

fn result_tag(kind: ResultKind) -> &'static str {
    match kind {
        ResultKind::Summary => "summary",
        ResultKind::Research => "research",
        ResultKind::Counsel => "counsel",
        ResultKind::Voting => "voting",
        ResultKind::Synthesis => "synthesis",
    }
}

/// Print a progress line for each distinct progress/label pair until the
/// watched run reaches its terminal state. Returns the last pair printed.
pub async fn follow_progress(
    output: Output,
    mut updates: watch::Receiver<RunStatus>,
) -> Option<(u8, String)> {
    let mut last: Option<(u8, String)> = None;
    while updates.changed().await.is_ok() {
        let (progress, label, finished) = {
            let status = updates.borrow_and_update();
            (
                status.progress,
                status.current_phase.clone(),
                status.run_id.is_some() && !status.is_running,
            )
        };
        if last.as_ref() != Some(&(progress, label.clone())) {
            output.progress(progress, &label);
            last = Some((progress, label));
        }
        if finished {
            break;
        }
    }
    last
}
