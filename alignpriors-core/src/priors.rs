//! Aggregation of alignment statistics into count tables.
//!
//! One pass over paired sentence and alignment-link streams produces five
//! tables at once: lexical co-occurrence, forward and reverse HMM jump
//! histograms, and source and target fertility histograms. The tables are
//! mutually consistent because they always derive from the same pass.

use std::io::BufRead;

use hashbrown::HashMap;

use crate::errors::{PriorsError, Result};
use crate::links::{check_bounds, parse_links};
use crate::stream::next_line;
use crate::types::Count;

/// The five count tables plus the number of sentence pairs observed.
#[derive(Debug, Default, Clone)]
pub struct CountTables {
    /// (source token, target token) -> weight
    pub lex: HashMap<(String, String), Count>,
    /// forward jump displacement -> weight
    pub hmm_fwd: HashMap<i64, Count>,
    /// reverse jump displacement -> weight
    pub hmm_rev: HashMap<i64, Count>,
    /// (source token, fertility) -> weight
    pub fert_fwd: HashMap<(String, usize), Count>,
    /// (target token, fertility) -> weight
    pub fert_rev: HashMap<(String, usize), Count>,
    pub n_sentences: usize,
}

/// Streaming accumulator over sentence pairs.
///
/// [`calculate_priors`] drives it in lock-step over four files; the
/// joint-corpus path feeds it one split line at a time instead.
#[derive(Debug, Default)]
pub struct PriorsAggregator {
    tables: CountTables,
    lineno: usize,
}

impl PriorsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one sentence pair with its forward and reverse alignment
    /// lines. Any out-of-bounds link aborts with the 1-based line number
    /// and the offending pair; partial state is not usable afterwards.
    pub fn observe(
        &mut self,
        src_sent: &str,
        trg_sent: &str,
        fwd_line: &str,
        rev_line: &str,
    ) -> Result<()> {
        self.lineno += 1;
        let lineno = self.lineno;

        let src_tokens: Vec<&str> = src_sent.split_whitespace().collect();
        let trg_tokens: Vec<&str> = trg_sent.split_whitespace().collect();
        let fwd_links = parse_links(fwd_line, lineno)?;
        let rev_links = parse_links(rev_line, lineno)?;
        check_bounds(&fwd_links, src_tokens.len(), trg_tokens.len(), lineno)?;
        check_bounds(&rev_links, src_tokens.len(), trg_tokens.len(), lineno)?;

        let tables = &mut self.tables;

        // Lexical co-occurrence from the forward direction.
        for &(i, j) in &fwd_links {
            let key = (
                src_tokens[i as usize].to_string(),
                trg_tokens[j as usize].to_string(),
            );
            *tables.lex.entry(key).or_insert(0.0) += 1.0;
        }

        // Forward jumps: walk the links ordered by target position and
        // record the source displacement whenever the target position
        // advances, plus one close-out jump past the sentence end.
        let mut by_target = fwd_links.clone();
        by_target.sort_by_key(|&(_, j)| j);
        let mut last_i: i64 = -1;
        let mut last_j: i64 = -1;
        for &(i, j) in &by_target {
            if i64::from(j) != last_j {
                *tables.hmm_fwd.entry(i64::from(i) - last_i).or_insert(0.0) += 1.0;
            }
            last_i = i64::from(i);
            last_j = i64::from(j);
        }
        *tables
            .hmm_fwd
            .entry(src_tokens.len() as i64 - last_i)
            .or_insert(0.0) += 1.0;

        // Reverse jumps, symmetrically over source positions.
        let mut by_source = rev_links.clone();
        by_source.sort_by_key(|&(i, _)| i);
        let mut last_i: i64 = -1;
        let mut last_j: i64 = -1;
        for &(i, j) in &by_source {
            if i64::from(i) != last_i {
                *tables.hmm_rev.entry(i64::from(j) - last_j).or_insert(0.0) += 1.0;
            }
            last_i = i64::from(i);
            last_j = i64::from(j);
        }
        *tables
            .hmm_rev
            .entry(trg_tokens.len() as i64 - last_j)
            .or_insert(0.0) += 1.0;

        // Fertilities: how many links each source (resp. target) position
        // carries, keyed by the word at that position.
        let mut fwd_fert: HashMap<u32, usize> = HashMap::new();
        for &(i, _) in &fwd_links {
            *fwd_fert.entry(i).or_insert(0) += 1;
        }
        for (i, fert) in fwd_fert {
            let key = (src_tokens[i as usize].to_string(), fert);
            *tables.fert_fwd.entry(key).or_insert(0.0) += 1.0;
        }
        let mut rev_fert: HashMap<u32, usize> = HashMap::new();
        for &(_, j) in &rev_links {
            *rev_fert.entry(j).or_insert(0) += 1;
        }
        for (j, fert) in rev_fert {
            let key = (trg_tokens[j as usize].to_string(), fert);
            *tables.fert_rev.entry(key).or_insert(0.0) += 1.0;
        }

        tables.n_sentences += 1;
        Ok(())
    }

    pub fn finish(self) -> CountTables {
        self.tables
    }
}

/// Aggregate counts from four line-aligned streams.
///
/// All four must have the same number of lines; a stream ending before the
/// others is a fatal mismatch, reported with the line at which it happened.
pub fn calculate_priors<S, T, F, R>(
    mut src: S,
    mut trg: T,
    mut fwd: F,
    mut rev: R,
) -> Result<CountTables>
where
    S: BufRead,
    T: BufRead,
    F: BufRead,
    R: BufRead,
{
    let mut aggregator = PriorsAggregator::new();
    let mut lineno = 0;
    loop {
        lineno += 1;
        let src_line = next_line(&mut src)?;
        let trg_line = next_line(&mut trg)?;
        let fwd_line = next_line(&mut fwd)?;
        let rev_line = next_line(&mut rev)?;
        match (src_line, trg_line, fwd_line, rev_line) {
            (None, None, None, None) => break,
            (Some(s), Some(t), Some(f), Some(r)) => {
                aggregator.observe(&s, &t, &f, &r)?;
            }
            (src_line, trg_line, fwd_line, rev_line) => {
                let state = |l: &Option<String>| if l.is_some() { "open" } else { "ended" };
                return Err(PriorsError::input_shape(
                    lineno,
                    format!(
                        "input streams have different lengths \
                         (source {}, target {}, forward {}, reverse {})",
                        state(&src_line),
                        state(&trg_line),
                        state(&fwd_line),
                        state(&rev_line),
                    ),
                ));
            }
        }
    }
    Ok(aggregator.finish())
}

/// Aggregate counts from a `source ||| target` joint corpus and two
/// alignment streams, with the same lock-step length requirement.
pub fn calculate_priors_joint<J, F, R>(mut joint: J, mut fwd: F, mut rev: R) -> Result<CountTables>
where
    J: BufRead,
    F: BufRead,
    R: BufRead,
{
    let mut aggregator = PriorsAggregator::new();
    let mut lineno = 0;
    loop {
        lineno += 1;
        let joint_line = next_line(&mut joint)?;
        let fwd_line = next_line(&mut fwd)?;
        let rev_line = next_line(&mut rev)?;
        match (joint_line, fwd_line, rev_line) {
            (None, None, None) => break,
            (Some(j), Some(f), Some(r)) => {
                let (src, trg) = crate::text::split_joint_line(&j, lineno)?;
                aggregator.observe(src, trg, &f, &r)?;
            }
            (joint_line, fwd_line, rev_line) => {
                let state = |l: &Option<String>| if l.is_some() { "open" } else { "ended" };
                return Err(PriorsError::input_shape(
                    lineno,
                    format!(
                        "input streams have different lengths \
                         (joint {}, forward {}, reverse {})",
                        state(&joint_line),
                        state(&fwd_line),
                        state(&rev_line),
                    ),
                ));
            }
        }
    }
    Ok(aggregator.finish())
}
