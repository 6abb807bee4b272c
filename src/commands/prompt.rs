// src/commands/prompt.rs
//! Interactive world selection

use super::format_bytes;
use anyhow::{bail, Result};
use std::io::{self, BufRead, IsTerminal, Write};
use worldpack::{WorldCandidate, WorldChoice};

/// Whether the operator can be asked anything
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Print the candidate menu: 0 keeps the live world, 1..N are staged worlds
pub fn print_world_menu(candidates: &[WorldCandidate], has_live_world: bool) {
    let keep = if has_live_world {
        "Keep the existing world"
    } else {
        "Keep the existing world (none present)"
    };
    println!("  0: {}", keep);
    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "  {}: {} [{}] ({})",
            i + 1,
            candidate.file_name,
            candidate.display_name(),
            format_bytes(candidate.size)
        );
    }
}

/// Ask which world to use until a valid number is entered
pub fn choose_world(candidates: &[WorldCandidate], has_live_world: bool) -> Result<WorldChoice> {
    println!("Select a world:");
    print_world_menu(candidates, has_live_world);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "Choice [0-{}]: ", candidates.len())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            bail!("no world selected");
        }
        match line.trim().parse::<usize>() {
            Ok(n) if n <= candidates.len() => return Ok(WorldChoice::from_menu(n)),
            _ => println!("Enter a number between 0 and {}", candidates.len()),
        }
    }
}
