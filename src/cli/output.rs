//! Colored output helpers for the CLI

use owo_colors::OwoColorize;

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
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Mr Buffet banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "Mr Buffet".bright_green().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   Mr Buffet v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    pub fn header(&self, message: &str) {
        if self.colored {
            println!("{}", message.bright_white().bold());
        } else {
            println!("{}", message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "→".dimmed(), message.dimmed());
        } else {
            println!("  [HINT] {}", message);
        }
    }

    /// Print an assistant reply in a chat session
    pub fn assistant(&self, message: &str) {
        if self.colored {
            println!("{} {}", "buffet>".bright_green().bold(), message);
        } else {
            println!("buffet> {}", message);
        }
    }

    /// Print the user prompt marker (no newline)
    pub fn user_prompt(&self, user_name: &str) {
        use std::io::Write;
        if self.colored {
            print!("{} ", format!("{}>", user_name).bright_cyan().bold());
        } else {
            print!("{}> ", user_name);
        }
        let _ = std::io::stdout().flush();
    }
}
