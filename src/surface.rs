//! Terminal rendering surface - command parsing and snapshot formatting.

use clap::{CommandFactory, Parser, Subcommand};
use macro_buddy::core::{ProductCard, Snapshot};
use std::fmt::Write;

/// One line typed at the prompt.
#[derive(Debug, Parser)]
#[command(
    name = "macro-buddy",
    no_binary_name = true,
    disable_version_flag = true,
    subcommand_value_name = "COMMAND",
    subcommand_help_heading = "Commands"
)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: Command,
}

/// A parsed command. Card numbers are typed 1-based and stored as 0-based indices.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Search products by name
    #[command(visible_alias = "s")]
    Search {
        /// Search term
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Look up a barcode
    Scan {
        /// Barcode digits
        code: String,
    },
    /// Open or close the scanner
    Scanner,
    /// Toggle favorite for a card
    Fav {
        /// Card number as shown in the list
        #[arg(value_name = "N", value_parser = parse_card)]
        card: usize,
    },
    /// Log 100 g of a card
    Add {
        /// Card number as shown in the list
        #[arg(value_name = "N", value_parser = parse_card)]
        card: usize,
    },
    /// Switch between results and favorites
    #[command(visible_alias = "favorites")]
    Favs,
    /// Reset today's totals
    Reset,
    /// Exit
    #[command(visible_aliases = ["exit", "q"])]
    Quit,
}

fn parse_card(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("`{raw}` is not a card number, cards start at 1")),
    }
}

/// Parses one line of user input. Blank lines yield `Ok(None)`. `help` and unknown or
/// malformed commands come back as a [`clap::Error`] whose `Display` is the text to show.
pub fn parse_command(line: &str) -> Result<Option<Command>, clap::Error> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    ReplLine::try_parse_from(line.split_whitespace()).map(|parsed| Some(parsed.command))
}

/// Help text listing all commands.
#[must_use]
pub fn help() -> String {
    ReplLine::command().render_help().to_string()
}

/// Creates a text-based progress bar like: `[████████░░] 80.0%`
#[must_use]
pub fn format_progress_bar(fraction: f64, bar_length: usize) -> String {
    let clamped = fraction.clamp(0.0, 1.0);

    // clamped ∈ [0, 1] and bar_length is small, so the product fits in usize.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = (clamped * bar_length as f64).round() as usize;
    let empty = bar_length.saturating_sub(filled);

    format!(
        "[{}{}] {:.1}%",
        "█".repeat(filled),
        "░".repeat(empty),
        fraction * 100.0
    )
}

fn format_card(out: &mut String, index: usize, card: &ProductCard) {
    let m = card.display_macros;
    let star = if card.is_favorite { "★" } else { "☆" };
    // write! is infallible when writing to String
    let _ = writeln!(
        out,
        "{:>2}. {star} {} ({})\n      {:.0} kcal | {:.0}g Prot | {:.0}g Carb | {:.0}g Fett",
        index + 1,
        card.product.name,
        card.product.brand,
        m.calories,
        m.protein,
        m.carbs,
        m.fat
    );
}

/// Formats a snapshot for the terminal.
#[must_use]
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let title = if snapshot.viewing_favorites {
        "Favoriten"
    } else {
        "Suchergebnisse"
    };
    let _ = writeln!(out, "── {title} ──");
    if snapshot.scanner_active {
        let _ = writeln!(out, "📷 Scanner aktiv, `scan <code>` eingeben");
    }
    if snapshot.loading {
        let _ = writeln!(out, "Lädt…");
    }
    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "❌ {error}");
    }
    for (i, card) in snapshot.displayed_products.iter().enumerate() {
        format_card(&mut out, i, card);
    }
    if let Some(note) = &snapshot.notification {
        let _ = writeln!(out, "✅ {note}");
    }

    let d = &snapshot.daily;
    let _ = writeln!(out, "── Heute ({}) ──", d.date.format("%d.%m.%Y"));
    for (label, total, goal, progress) in [
        ("kcal", d.totals.calories, d.goals.calories, d.progress.calories),
        ("Prot", d.totals.protein, d.goals.protein, d.progress.protein),
        ("Carb", d.totals.carbs, d.goals.carbs, d.progress.carbs),
        ("Fett", d.totals.fat, d.goals.fat, d.progress.fat),
    ] {
        let _ = writeln!(
            out,
            "  {label} {total:>6.0}/{goal:<6.0} {}",
            format_progress_bar(progress, 10)
        );
    }
    out
}
