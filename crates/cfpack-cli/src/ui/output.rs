//! Console [`Reporter`] implementation.
//!
//! Progress lines go to stdout, problems to stderr. Quiet mode keeps only
//! failures, warnings and errors.

use std::io::Write;

use cfpack_core::Reporter;
use crossterm::style::Stylize;

use super::Theme;

#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
    quiet: bool,
}

impl Output {
    /// Console reporter; `quiet` hides everything but problems.
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
        }
    }

    /// Styled content ignores width specifiers, so pad before styling.
    fn pad(&self, item: &str) -> String {
        format!("{item:<width$}", width = self.theme.item_width)
    }

    fn line(&self, icon: &str, color: crossterm::style::Color, item: &str, detail: &str) {
        println!(
            "  {} {} {detail}",
            icon.with(color),
            self.pad(item).with(self.theme.colors.item)
        );
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", title.bold().with(self.theme.colors.header));
    }

    fn downloading(&self, platform: &str, current: u64, total: Option<u64>) {
        if self.quiet || current != 0 {
            return;
        }
        let size = total.map_or_else(|| "unknown size".to_string(), format_size);
        let detail = format!("downloading {}", size.with(self.theme.colors.secondary));
        self.line(self.theme.icons.active, self.theme.colors.secondary, platform, &detail);
    }

    fn done(&self, item: &str, detail: &str) {
        if self.quiet {
            return;
        }
        self.line(self.theme.icons.success, self.theme.colors.success, item, detail);
    }

    fn failed(&self, item: &str, reason: &str) {
        eprintln!(
            "  {} {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            self.pad(item).with(self.theme.colors.item),
            reason.with(self.theme.colors.error)
        );
    }

    fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        println!("  {} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
    }

    fn success(&self, msg: &str) {
        if self.quiet {
            return;
        }
        println!("{} {msg}", self.theme.icons.success.with(self.theme.colors.success));
    }

    fn warning(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
        std::io::stderr().flush().ok();
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        if self.quiet {
            return;
        }
        let noun = if count == 1 { "package" } else { "packages" };
        println!();
        println!(
            "{} {count} {noun} {action} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            format!("in {elapsed_secs:.1}s").with(self.theme.colors.secondary)
        );
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
