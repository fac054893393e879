//! Console backed by the terminal.

use std::io::{self, BufRead, Write};

use asgsync_core::{Console, Tone};
use owo_colors::OwoColorize;

use crate::formatting::{print_choice_table, print_tone};

pub struct StdinConsole;

impl Console for StdinConsole {
    fn read_line(&mut self, prompt: &str) -> asgsync_core::Result<Option<String>> {
        print!("{}", prompt.magenta().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn show(&mut self, tone: Tone, message: &str) {
        print_tone(tone, message);
    }

    fn show_choices(&mut self, title: &str, choices: &[String]) {
        print_choice_table(title, choices);
    }
}
