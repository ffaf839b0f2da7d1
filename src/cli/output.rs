//! Terminal output for the Study Bot CLI
//!
//! Every line is rendered by a pure function first, so the plain
//! (`--no-color`) form can be asserted in tests, then printed.

use owo_colors::OwoColorize;
use std::io::{self, Write};

const COLUMN_WIDTH: usize = 28;

/// Marker shown in front of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Info,
    Warn,
    Error,
    Skipped,
}

impl Status {
    fn plain(self) -> &'static str {
        match self {
            Status::Ok => "[OK]",
            Status::Info => "[INFO]",
            Status::Warn => "[WARN]",
            Status::Error => "[ERROR]",
            Status::Skipped => "[SKIPPED]",
        }
    }

    fn colored(self, message: &str) -> String {
        match self {
            Status::Ok => format!("{} {}", "✓".green().bold(), message.green()),
            Status::Info => format!("{} {}", "•".blue(), message),
            Status::Warn => format!("{} {}", "⚠".yellow().bold(), message.yellow()),
            Status::Error => format!("{} {}", "✗".red().bold(), message.red()),
            Status::Skipped => format!("{} {}", "○".yellow(), message.dimmed()),
        }
    }
}

/// Coloured or plain terminal output, chosen once per process
#[derive(Debug, Clone, Copy)]
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
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    fn status(&self, status: Status, message: &str) -> String {
        if self.colored {
            format!("  {}", status.colored(message))
        } else {
            format!("  {} {}", status.plain(), message)
        }
    }

    fn render_banner(&self) -> String {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        let tagline = "AI study assistant with memory";
        if self.colored {
            format!(
                "\n   {} {}\n   {}\n",
                "📚 Study Bot".bright_cyan().bold(),
                version.dimmed(),
                tagline.bright_white()
            )
        } else {
            format!("\n   Study Bot {}\n   {}\n", version, tagline)
        }
    }

    fn render_created(&self, kind: &str, path: &str) -> String {
        if self.colored {
            format!(
                "  {} {} {}",
                "✓".green().bold(),
                kind.dimmed(),
                path.bright_white()
            )
        } else {
            format!("  [CREATED] {} {}", kind, path)
        }
    }

    fn render_section(&self, title: &str, top_level: bool) -> String {
        match (self.colored, top_level) {
            (true, true) => format!("\n  {}", title.bright_white().bold().underline()),
            (true, false) => format!("\n  {}", title.cyan().bold()),
            (false, true) => format!("\n  === {} ===", title),
            (false, false) => format!("\n  --- {} ---", title),
        }
    }

    fn render_kv(&self, key: &str, value: &str) -> String {
        if self.colored {
            format!("    {}: {}", key.dimmed(), value.bright_white())
        } else {
            format!("    {}: {}", key, value)
        }
    }

    fn render_speaker(&self, who: &str, text: &str) -> String {
        let label = format!("{}:", who);
        if self.colored {
            format!("{} {}", label.bright_green().bold(), text)
        } else {
            format!("{} {}", label, text)
        }
    }

    /// Print the startup banner with the crate version
    pub fn banner(&self) {
        println!("{}", self.render_banner());
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.status(Status::Ok, message));
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.status(Status::Info, message));
    }

    pub fn warning(&self, message: &str) {
        println!("{}", self.status(Status::Warn, message));
    }

    /// Errors go to stderr so piped output stays clean
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.status(Status::Error, message));
    }

    /// Report a scaffolded file, e.g. `created("file", "studybot.toml")`
    pub fn created(&self, kind: &str, path: &str) {
        println!("{}", self.render_created(kind, path));
    }

    pub fn created_dir(&self, path: &str) {
        self.created("directory", path);
    }

    pub fn skipped(&self, path: &str, reason: &str) {
        println!(
            "{}",
            self.status(Status::Skipped, &format!("{} ({})", path, reason))
        );
    }

    pub fn header(&self, title: &str) {
        println!("{}", self.render_section(title, true));
    }

    pub fn subheader(&self, title: &str) {
        println!("{}", self.render_section(title, false));
    }

    pub fn kv(&self, key: &str, value: &str) {
        println!("{}", self.render_kv(key, value));
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a shell command the user can copy
    pub fn command(&self, cmd: &str) {
        let line = format!("$ {}", cmd);
        if self.colored {
            println!("     {}", line.bright_cyan());
        } else {
            println!("     {}", line);
        }
    }

    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print an input label and flush, leaving the cursor on the same line
    pub fn prompt(&self, label: &str) {
        let label = format!("{}:", label);
        if self.colored {
            print!("{} ", label.bright_cyan().bold());
        } else {
            print!("{} ", label);
        }
        io::stdout().flush().ok();
    }

    /// Print one line of a conversation, e.g. `Bot: ...`
    pub fn speaker(&self, who: &str, text: &str) {
        println!("{}", self.render_speaker(who, text));
    }

    pub fn table_header(&self, columns: &[&str]) {
        let header = pad_columns(columns);
        let rule_width = columns.len() * (COLUMN_WIDTH + 1);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(rule_width).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(rule_width));
        }
    }

    pub fn table_row(&self, values: &[&str]) {
        println!("    {}", pad_columns(values));
    }

    pub fn newline(&self) {
        println!();
    }
}

fn pad_columns(cells: &[&str]) -> String {
    cells
        .iter()
        .map(|cell| format!("{:<width$}", cell, width = COLUMN_WIDTH))
        .collect::<Vec<_>>()
        .join(" ")
}
