//! Free-text shopping-list parsing.
//!
//! Lists arrive as comma- or newline-separated lines like `2 lb ground beef`.
//! The token after the quantity is consumed as a unit only when it parses as
//! a known unit alias; otherwise it belongs to the name, so `6 eggs` keeps
//! its full name instead of losing "egg" to a bogus unit match.

use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use crate::base::{types::ShoppingItem, units::Unit};

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<qty>\d+(?:\.\d+)?)\s*(?P<rest>.+?)\s*$").expect("line regex is valid")
});

/// Parse a typed shopping list into items.
///
/// Unparseable lines are dropped silently; the sender sees what made it into
/// the itemized reply.
#[instrument(skip_all)]
pub fn parse_text(body: &str) -> Vec<ShoppingItem> {
    body.split([',', '\n']).filter_map(parse_line).collect()
}

/// Parse one `<qty> [unit] <name>` line.
fn parse_line(line: &str) -> Option<ShoppingItem> {
    let captures = LINE_RE.captures(line)?;
    let quantity: f64 = captures["qty"].parse().ok()?;
    let rest = captures["rest"].trim();

    // Take the leading token as a unit only when it actually is one.
    let (unit, name) = match rest.split_once(char::is_whitespace) {
        Some((first, tail)) => match Unit::parse(first) {
            Some(unit) => (Some(unit), tail.trim()),
            None => (None, rest),
        },
        None => (None, rest),
    };

    // Units can also be glued onto the quantity tail, e.g. "2.5kg rice" has
    // already been split by the regex; "kg rice" lands here as rest.
    let name = name.trim().to_lowercase();

    if name.len() < 2 || quantity <= 0.0 {
        return None;
    }

    let unit = unit.unwrap_or_else(|| infer_unit(&name));

    Some(ShoppingItem { name, quantity, unit })
}

/// Guess a unit from the item name when none was given.
fn infer_unit(name: &str) -> Unit {
    if name.contains("egg") {
        return Unit::Each;
    }

    if ["milk", "soda", "water", "juice", "beer"].iter().any(|w| name.contains(w)) {
        return Unit::Liter;
    }

    Unit::Lb
}
