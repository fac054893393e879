//! Section headers for each stage of a command.

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStyle {
    Primary,
    Success,
    Warning,
}

impl SectionStyle {
    /// `Success` when every load balancer or policy went through, else `Warning`.
    pub fn for_outcome(clean: bool) -> Self {
        if clean {
            SectionStyle::Success
        } else {
            SectionStyle::Warning
        }
    }

    fn colorize(&self, text: &str) -> String {
        match self {
            SectionStyle::Primary => text.cyan().bold().to_string(),
            SectionStyle::Success => text.green().bold().to_string(),
            SectionStyle::Warning => text.yellow().bold().to_string(),
        }
    }
}

/// Prints a section title, with the object it is about dimmed beside it.
pub fn print_section_header(title: &str, subject: Option<&str>, style: SectionStyle) {
    match subject {
        Some(subject) => println!("{} {}", style.colorize(title), subject.bright_black()),
        None => println!("{}", style.colorize(title)),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_for_outcome() {
        assert_eq!(SectionStyle::for_outcome(true), SectionStyle::Success);
        assert_eq!(SectionStyle::for_outcome(false), SectionStyle::Warning);
    }
}
