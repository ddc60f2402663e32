//! Terminal output for the admissions-server CLI
//!
//! Every line has a colored form and a plain `[TAG]` form for logs and
//! terminals without color support.

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

    /// Honors `--no-color` and the `NO_COLOR` convention
    pub fn from_flags(no_color: bool) -> Self {
        if no_color || std::env::var_os("NO_COLOR").is_some() {
            Self::no_color()
        } else {
            Self::new()
        }
    }

    /// Picks the colored or plain rendering of a line.
    fn emit(&self, colored: impl FnOnce() -> String, plain: impl FnOnce() -> String) {
        let line = if self.colored { colored() } else { plain() };
        println!("{}", line);
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        self.emit(
            || {
                format!(
                    "\n   {} {}\n   {}\n",
                    "Admissions Server".bright_white().bold(),
                    version.dimmed(),
                    "offers · fees · reconciliation".cyan()
                )
            },
            || format!("\n   Admissions Server {}\n", version),
        );
    }

    pub fn success(&self, message: &str) {
        self.emit(
            || format!("  {} {}", "✓".green().bold(), message.green()),
            || format!("  [OK] {}", message),
        );
    }

    pub fn info(&self, message: &str) {
        self.emit(
            || format!("  {} {}", "•".blue(), message),
            || format!("  [INFO] {}", message),
        );
    }

    pub fn warning(&self, message: &str) {
        self.emit(
            || format!("  {} {}", "!".yellow().bold(), message.yellow()),
            || format!("  [WARN] {}", message),
        );
    }

    /// Errors go to stderr.
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "x".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// A file or directory written by `init`.
    pub fn created(&self, kind: &str, path: &str) {
        self.emit(
            || format!("  {} {:<9} {}", "+".green().bold(), kind.dimmed(), path.bright_white()),
            || format!("  [CREATED] {} {}", kind, path),
        );
    }

    pub fn skipped(&self, path: &str, reason: &str) {
        self.emit(
            || format!("  {} {} {}", "-".yellow(), path.dimmed(), format!("({})", reason).yellow()),
            || format!("  [SKIPPED] {} ({})", path, reason),
        );
    }

    pub fn header(&self, title: &str) {
        self.emit(
            || format!("\n  {}", title.bright_white().bold().underline()),
            || format!("\n  == {} ==", title),
        );
    }

    pub fn kv(&self, key: &str, value: &str) {
        self.emit(
            || format!("    {:<18} {}", key.dimmed(), value.bright_white()),
            || format!("    {:<18} {}", key, value),
        );
    }

    pub fn hint(&self, message: &str) {
        self.emit(
            || format!("\n  {}", message.dimmed().italic()),
            || format!("\n  [TIP] {}", message),
        );
    }

    /// A shell command the user can copy.
    pub fn command(&self, cmd: &str) {
        self.emit(
            || format!("     {}", format!("$ {}", cmd).bright_cyan()),
            || format!("     $ {}", cmd),
        );
    }

    /// Fixed-width table; cells wider than the column are not truncated.
    pub fn table(&self, columns: &[&str], rows: &[Vec<String>]) {
        let header = table_row(columns.iter().copied());
        let rule = "-".repeat(columns.len() * (CELL_WIDTH + 1));
        self.emit(
            || format!("    {}\n    {}", header.bright_white().bold(), rule.dimmed()),
            || format!("    {}\n    {}", header, rule),
        );

        for row in rows {
            println!("    {}", table_row(row.iter().map(String::as_str)));
        }
    }
}

const CELL_WIDTH: usize = 22;

fn table_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(|c| format!("{:<width$}", c, width = CELL_WIDTH))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_constructors() {
        assert!(Output::new().colored);
        assert!(Output::default().colored);
        assert!(!Output::no_color().colored);
        assert!(!Output::from_flags(true).colored);
    }

    #[test]
    fn test_output_methods_no_panic() {
        for output in [Output::no_color(), Output::new()] {
            output.banner();
            output.success("test success");
            output.info("test info");
            output.warning("test warning");
            output.error("test error");
            output.created("file", "admissions.toml");
            output.skipped("data", "already exists");
            output.header("Test Header");
            output.kv("key", "value");
            output.hint("hint message");
            output.command("admissions-server");
            output.table(
                &["Email", "Role"],
                &[vec!["a@example.edu".into(), "admin".into()]],
            );
            output.table(&[], &[]);
        }
    }
}
