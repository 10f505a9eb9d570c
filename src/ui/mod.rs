//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and user input handling

use std::io::{self, BufRead, Write};

use crate::cli::orchestration::{Confirmation, ReleasePreview};
use crate::error::Result;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_manual_push_instruction, display_release_report,
    display_release_summary, display_status, display_success, display_warning,
};

/// Ask a y/N question on the terminal; only "y" or "yes" confirm
pub fn confirm_action(prompt: &str) -> Result<bool> {
    print!("\n{} (y/N): ", prompt);
    io::stdout().flush()?;

    read_confirmation(&mut io::stdin().lock())
}

fn read_confirmation<R: BufRead>(input: &mut R) -> Result<bool> {
    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Prints the release summary and asks on the terminal
pub struct ConsoleConfirmation;

impl Confirmation for ConsoleConfirmation {
    fn present(&self, preview: &ReleasePreview) {
        display_release_summary(preview);
    }

    fn confirm(&self, preview: &ReleasePreview) -> Result<bool> {
        confirm_action(&format!("Release {}?", preview.next))
    }
}
