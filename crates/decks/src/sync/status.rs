//! Rotating status lines for progress events

const STATUS_LINES: &[&str] = &[
    "Shuffling the archives",
    "Consulting the Archons",
    "Forging keys",
    "Counting æmber",
    "Polishing creature cards",
    "Opening the vault",
];

/// Status line for the `n`th progress step
pub fn status_text(n: usize) -> &'static str {
    STATUS_LINES[n % STATUS_LINES.len()]
}
