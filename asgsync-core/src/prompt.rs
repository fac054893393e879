//! Interactive prompts over an abstract console.

use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::path_utils::{expand_tilde, is_readable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Question,
    Success,
    Failure,
}

/// Where prompts are shown and answers come from.
pub trait Console {
    /// Shows `prompt` and reads one line, `None` once input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn show(&mut self, tone: Tone, message: &str);

    /// Shows a list the user picks from by number, starting at 1.
    fn show_choices(&mut self, title: &str, choices: &[String]);
}

fn answer(console: &mut dyn Console, prompt: &str) -> Result<String> {
    console
        .read_line(prompt)?
        .map(|line| line.trim().to_string())
        .ok_or(Error::InputClosed)
}

pub fn ask_str(console: &mut dyn Console, prompt: &str) -> Result<String> {
    answer(console, prompt)
}

/// Asks until the answer is an integer, inside `allowed` when given.
pub fn ask_integer(
    console: &mut dyn Console,
    prompt: &str,
    allowed: Option<RangeInclusive<i64>>,
) -> Result<i64> {
    loop {
        match answer(console, prompt)?.parse::<i64>() {
            Ok(value) => match &allowed {
                Some(range) if !range.contains(&value) => {
                    console.show(Tone::Failure, "Answer not in range");
                }
                _ => return Ok(value),
            },
            Err(_) => console.show(Tone::Failure, "Value must be a number"),
        }
    }
}

pub fn ask_yes_no(console: &mut dyn Console, prompt: &str) -> Result<bool> {
    loop {
        match answer(console, prompt)?.to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => console.show(Tone::Failure, "Answer not valid"),
        }
    }
}

/// Asks until the answer matches one of `allowed`, ignoring case.
/// Returns the matching entry of `allowed`.
pub fn ask_choice(console: &mut dyn Console, prompt: &str, allowed: &[&str]) -> Result<String> {
    loop {
        let reply = answer(console, prompt)?;
        if let Some(choice) = allowed.iter().find(|a| a.eq_ignore_ascii_case(&reply)) {
            return Ok(choice.to_string());
        }
        console.show(Tone::Failure, "Answer not valid");
    }
}

/// Asks for a path until it names a readable file. The path is returned as typed.
pub fn ask_file(console: &mut dyn Console, prompt: &str) -> Result<String> {
    loop {
        let path = answer(console, prompt)?;
        if is_readable(&expand_tilde(&path)) {
            return Ok(path);
        }
        console.show(
            Tone::Failure,
            &format!("Unable to open file {} for reading, please try again", path),
        );
    }
}

/// Extra entry appended after the listed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extra {
    CreateNew,
    Done,
}

impl Extra {
    fn label(self) -> &'static str {
        match self {
            Extra::CreateNew => "Create new",
            Extra::Done => "Done",
        }
    }
}

/// Lets the user pick one of `items` (`(name, id)` pairs) by number.
///
/// Returns the chosen id, or `None` when the extra entry was picked.
pub fn select(
    console: &mut dyn Console,
    what: &str,
    items: &[(String, String)],
    extra: Option<Extra>,
) -> Result<Option<String>> {
    let mut labels: Vec<String> = items
        .iter()
        .map(|(name, id)| format!("{} ({})", name, id))
        .collect();
    if let Some(extra) = extra {
        labels.push(extra.label().to_string());
    }
    if labels.is_empty() {
        return Err(Error::Validation(format!("no {} available to select", what)));
    }

    console.show_choices(what, &labels);
    let picked = ask_integer(
        console,
        &format!("Select {}: ", what),
        Some(1..=labels.len() as i64),
    )?;

    Ok(items
        .get((picked - 1) as usize)
        .map(|(_, id)| id.clone()))
}
