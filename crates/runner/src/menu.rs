//! Interactive startup menu (PRD-1).
//!
//! The one place in the workspace where stdout is an operator surface
//! rather than a log. Range and single choices echo a preview and require
//! an explicit confirmation before any session is opened; a declined
//! confirmation falls back to the menu. EOF on stdin is treated as exit.
//!
//! Parsing is split into pure functions so the loop itself stays trivial.

use std::io::{self, BufRead, Write};

use retake_core::selection::Selection;
use retake_engine::RunSummary;

// ---------------------------------------------------------------------------
// Choice parsing
// ---------------------------------------------------------------------------

/// Top-level menu entries, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    All,
    Range,
    Single,
    Resume,
    Exit,
}

/// Parse a menu line into a choice.
pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    match input.trim() {
        "1" => Some(MenuChoice::All),
        "2" => Some(MenuChoice::Range),
        "3" => Some(MenuChoice::Single),
        "4" => Some(MenuChoice::Resume),
        "5" => Some(MenuChoice::Exit),
        _ => None,
    }
}

/// Parse a 1-based scene position.
pub fn parse_scene_number(input: &str) -> Option<u32> {
    input.trim().parse().ok().filter(|n: &u32| *n > 0)
}

/// `y`/`yes`, any case. Everything else declines.
pub fn parse_confirmation(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ---------------------------------------------------------------------------
// Interactive loop
// ---------------------------------------------------------------------------

/// Prompt the operator until they pick a runnable selection or exit.
///
/// Returns `Ok(None)` on an explicit exit or EOF. Resume is offered but
/// re-prompts when no checkpoint exists; bounds here are a courtesy check
/// only, the engine re-validates before opening sessions.
pub fn prompt_selection(
    total_scenes: u32,
    checkpoint_available: bool,
) -> io::Result<Option<Selection>> {
    loop {
        print_menu(total_scenes, checkpoint_available);
        let Some(line) = prompt("Choice: ")? else {
            return Ok(None);
        };
        let Some(choice) = parse_choice(&line) else {
            println!("Enter a number between 1 and 5.");
            continue;
        };

        match choice {
            MenuChoice::All => return Ok(Some(Selection::All)),
            MenuChoice::Exit => return Ok(None),
            MenuChoice::Resume => {
                if checkpoint_available {
                    return Ok(Some(Selection::Resume));
                }
                println!("No checkpoint found; pick a range to start fresh.");
            }
            MenuChoice::Single => {
                let Some(line) = prompt(&format!("Scene position (1-{total_scenes}): "))? else {
                    return Ok(None);
                };
                let Some(scene) = parse_scene_number(&line) else {
                    println!("Scene positions are whole numbers starting at 1.");
                    continue;
                };
                if scene > total_scenes {
                    println!("Position {scene} is beyond the {total_scenes} loaded scenes.");
                    continue;
                }
                println!("About to process scene {scene} only.");
                match confirm()? {
                    None => return Ok(None),
                    Some(true) => return Ok(Some(Selection::Single { scene })),
                    Some(false) => {}
                }
            }
            MenuChoice::Range => {
                let Some(line) = prompt(&format!("First scene position (1-{total_scenes}): "))?
                else {
                    return Ok(None);
                };
                let Some(start) = parse_scene_number(&line) else {
                    println!("Scene positions are whole numbers starting at 1.");
                    continue;
                };
                let Some(line) = prompt(&format!("Last scene position ({start}-{total_scenes}): "))?
                else {
                    return Ok(None);
                };
                let Some(end) = parse_scene_number(&line) else {
                    println!("Scene positions are whole numbers starting at 1.");
                    continue;
                };
                if start > end || end > total_scenes {
                    println!(
                        "Range {start}-{end} does not fit the {total_scenes} loaded scenes."
                    );
                    continue;
                }
                println!(
                    "About to process scenes {start} through {end} ({} scenes).",
                    end - start + 1
                );
                match confirm()? {
                    None => return Ok(None),
                    Some(true) => return Ok(Some(Selection::Range { start, end })),
                    Some(false) => {}
                }
            }
        }
    }
}

/// Show the end-of-run summary block to the operator.
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", summary.render());
}

// ---- private helpers ----

fn print_menu(total_scenes: u32, checkpoint_available: bool) {
    println!();
    println!("Scene production -- {total_scenes} scenes loaded");
    println!("  1) Process all scenes");
    println!("  2) Process a range of scenes");
    println!("  3) Process a single scene");
    if checkpoint_available {
        println!("  4) Resume from checkpoint");
    } else {
        println!("  4) Resume from checkpoint (none found)");
    }
    println!("  5) Exit");
}

/// Print an inline prompt and read one trimmed line; `None` on EOF.
fn prompt(text: &str) -> io::Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn confirm() -> io::Result<Option<bool>> {
    Ok(prompt("Continue? [y/N] ")?.map(|line| parse_confirmation(&line)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
