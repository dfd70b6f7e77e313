//! Interactive prompts for values not supplied on the command line
//!
//! The original workflow is prompt-driven: source folder, API key, then the
//! resume choice. Flags and environment variables take precedence; these
//! prompts only fill the gaps.

use crate::config::ResumeMode;
use crossterm::style::Stylize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Read one trimmed line after printing a styled prompt
fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{} ", prompt.to_string().cyan().bold())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prompt for the source folder until a non-empty path is given
pub fn prompt_source_dir() -> io::Result<PathBuf> {
    loop {
        let answer = prompt_line("Enter the path to the folder containing your documents:")?;
        if !answer.is_empty() {
            return Ok(PathBuf::from(answer));
        }
    }
}

/// Prompt for the API key; empty input means none was provided
pub fn prompt_api_key() -> io::Result<Option<String>> {
    let answer = prompt_line("Please enter your OpenRouter API key:")?;
    Ok((!answer.is_empty()).then_some(answer))
}

/// Prompt for the resume choice
pub fn prompt_resume_mode() -> io::Result<ResumeMode> {
    loop {
        let answer = prompt_line(
            "Resume from a previous run? [f]resh / [j]ournal / [p]lan file (default: fresh):",
        )?;
        match answer.to_lowercase().as_str() {
            "" | "f" | "fresh" => return Ok(ResumeMode::Fresh),
            "j" | "journal" => return Ok(ResumeMode::Journal),
            "p" | "plan" => return Ok(ResumeMode::Plan),
            _ => {
                let mut stdout = io::stdout();
                writeln!(stdout, "{}", "Please answer f, j or p.".yellow())?;
            }
        }
    }
}

/// Prompt for the plan file path when resume mode is `plan`
pub fn prompt_plan_file() -> io::Result<PathBuf> {
    loop {
        let answer = prompt_line("Enter the path to the plan file:")?;
        if !answer.is_empty() {
            return Ok(PathBuf::from(answer));
        }
    }
}
