//! Statistical field-separator detection.
//!
//! Real tabular data has a stable separator count per row; arbitrary prose
//! does not. Candidates are ranked by average per-line occurrence count,
//! ties broken in favour of the candidate whose count is identical on every
//! sampled line.

const CANDIDATES: [char; 4] = [';', '\t', ',', '|'];
const SAMPLE_LINES: usize = 10;
pub const DEFAULT_DELIMITER: char = ';';

pub fn detect_delimiter(text: &str) -> char {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();

    if sample.is_empty() {
        return DEFAULT_DELIMITER;
    }

    let mut scored: Vec<(char, f64, bool)> = Vec::with_capacity(CANDIDATES.len());
    for candidate in CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| line.chars().filter(|c| *c == candidate).count())
            .collect();
        let total: usize = counts.iter().sum();
        if total == 0 {
            continue;
        }
        let average = total as f64 / counts.len() as f64;
        let consistent = counts.windows(2).all(|pair| pair[0] == pair[1]);
        scored.push((candidate, average, consistent));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.2.cmp(&a.2))
    });

    scored
        .first()
        .map(|(candidate, _, _)| *candidate)
        .unwrap_or(DEFAULT_DELIMITER)
}
