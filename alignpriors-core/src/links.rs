//! Alignment link parsing.
//!
//! One line per sentence pair, whitespace-separated `i-j` tokens with
//! 0-based source and target positions. Alignment files are machine
//! generated, so anything malformed or out of bounds indicates a pipeline
//! bug upstream and is fatal, never clamped or skipped.

use crate::errors::{PriorsError, Result};

/// Parse one line of `i-j` pairs. Empty lines yield no links.
pub fn parse_links(line: &str, lineno: usize) -> Result<Vec<(u32, u32)>> {
    let mut links = Vec::new();
    for token in line.split_whitespace() {
        let pair = token
            .split_once('-')
            .filter(|(i, j)| !i.is_empty() && !j.contains('-'))
            .and_then(|(i, j)| Some((i.parse::<u32>().ok()?, j.parse::<u32>().ok()?)));
        match pair {
            Some(link) => links.push(link),
            None => return Err(PriorsError::format(lineno, token)),
        }
    }
    Ok(links)
}

/// Validate every link against the sentence lengths.
pub fn check_bounds(
    links: &[(u32, u32)],
    src_len: usize,
    trg_len: usize,
    lineno: usize,
) -> Result<()> {
    for &(i, j) in links {
        if i as usize >= src_len || j as usize >= trg_len {
            return Err(PriorsError::Bounds { line: lineno, i, j });
        }
    }
    Ok(())
}
