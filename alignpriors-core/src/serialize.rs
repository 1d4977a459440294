//! Priors file formats.
//!
//! Two serializations of the same statistics:
//!
//! * a token-keyed, tab-separated text format meant to be portable and
//!   hand-editable, with one tagged record per line (`LEX`, `FERF`, `FERR`,
//!   `HMMF`, `HMMR`);
//! * an index-resolved numeric format consumed by the sampler, with a
//!   seven-field header followed by five fixed-order blocks of id-keyed
//!   records.
//!
//! Both writers emit each block sorted by key, so output is byte-identical
//! across runs on the same input.

use std::io::{BufRead, Write};

use hashbrown::HashMap;

use crate::errors::{PriorsError, Result};
use crate::priors::CountTables;
use crate::stream::next_line;
use crate::types::{Count, Token, NULL_LITERAL};
use crate::vocab::Vocabulary;

/// Parsed contents of a token-keyed priors file.
///
/// Lexical and fertility records keep their file order including
/// duplicates; duplicates accumulate during index resolution. Jump records
/// are keyed directly since a jump can only appear once per block.
#[derive(Debug, Default, Clone)]
pub struct Priors {
    pub lex: Vec<(String, String, Count)>,
    pub hmm_fwd: HashMap<i64, Count>,
    pub hmm_rev: HashMap<i64, Count>,
    pub fert_fwd: Vec<(String, usize, Count)>,
    pub fert_rev: Vec<(String, usize, Count)>,
}

/// How many token-keyed entries survived index resolution.
///
/// Dropped entries are an informational condition, not an error: a priors
/// file may legitimately cover words that a particular corpus never uses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexedStats {
    pub lex_used: usize,
    pub lex_total: usize,
    pub fert_fwd_used: usize,
    pub fert_fwd_total: usize,
    pub fert_rev_used: usize,
    pub fert_rev_total: usize,
}

/// Write count tables in the token-keyed text format.
pub fn write_priors<W: Write>(writer: &mut W, tables: &CountTables) -> std::io::Result<()> {
    let mut lex: Vec<_> = tables.lex.iter().collect();
    lex.sort_by(|a, b| a.0.cmp(b.0));
    for ((src, trg), alpha) in lex {
        writeln!(writer, "LEX\t{}\t{}\t{}", src, trg, alpha)?;
    }

    let mut fert_fwd: Vec<_> = tables.fert_fwd.iter().collect();
    fert_fwd.sort_by(|a, b| a.0.cmp(b.0));
    for ((src, fert), alpha) in fert_fwd {
        writeln!(writer, "FERF\t{}\t{}\t{}", src, fert, alpha)?;
    }

    let mut fert_rev: Vec<_> = tables.fert_rev.iter().collect();
    fert_rev.sort_by(|a, b| a.0.cmp(b.0));
    for ((trg, fert), alpha) in fert_rev {
        writeln!(writer, "FERR\t{}\t{}\t{}", trg, fert, alpha)?;
    }

    let mut hmm_fwd: Vec<_> = tables.hmm_fwd.iter().collect();
    hmm_fwd.sort_by_key(|(&jump, _)| jump);
    for (jump, alpha) in hmm_fwd {
        writeln!(writer, "HMMF\t{}\t{}", jump, alpha)?;
    }

    let mut hmm_rev: Vec<_> = tables.hmm_rev.iter().collect();
    hmm_rev.sort_by_key(|(&jump, _)| jump);
    for (jump, alpha) in hmm_rev {
        writeln!(writer, "HMMR\t{}\t{}", jump, alpha)?;
    }

    Ok(())
}

/// Parse the token-keyed text format.
///
/// Each line must carry a known tag with the exact field count for that
/// tag, and its last field must parse as a number; anything else is fatal
/// with the line number and content.
pub fn read_priors<R: BufRead>(mut reader: R) -> Result<Priors> {
    let mut priors = Priors::default();
    let mut lineno = 0;
    while let Some(line) = next_line(&mut reader)? {
        lineno += 1;
        let fields: Vec<&str> = line.split('\t').collect();
        let alpha: Count = match fields.last().and_then(|s| s.parse().ok()) {
            Some(alpha) => alpha,
            None => {
                return Err(PriorsError::format(
                    lineno,
                    format!("alpha value {:?} is not numeric", fields.last().unwrap_or(&"")),
                ))
            }
        };
        match fields.as_slice() {
            ["LEX", src, trg, _] => {
                priors.lex.push((src.to_string(), trg.to_string(), alpha));
            }
            ["HMMF", jump, _] => {
                let jump = parse_int(jump, lineno)?;
                priors.hmm_fwd.insert(jump, alpha);
            }
            ["HMMR", jump, _] => {
                let jump = parse_int(jump, lineno)?;
                priors.hmm_rev.insert(jump, alpha);
            }
            ["FERF", src, fert, _] => {
                let fert = parse_int(fert, lineno)? as usize;
                priors.fert_fwd.push((src.to_string(), fert, alpha));
            }
            ["FERR", trg, fert, _] => {
                let fert = parse_int(fert, lineno)? as usize;
                priors.fert_rev.push((trg.to_string(), fert, alpha));
            }
            _ => return Err(PriorsError::format(lineno, line)),
        }
    }
    Ok(priors)
}

fn parse_int(field: &str, lineno: usize) -> Result<i64> {
    field
        .parse()
        .map_err(|_| PriorsError::format(lineno, format!("value {:?} is not an integer", field)))
}

/// Resolve tokens against the vocabularies and write the numeric format
/// read by the sampler.
///
/// The literal `<NULL>` resolves to index 0 in lexical records. Entries
/// whose token is missing from its vocabulary are dropped, not errors;
/// entries whose keys collide after stemming accumulate.
pub fn write_indexed_priors<W: Write>(
    writer: &mut W,
    priors: &Priors,
    src_vocab: &Vocabulary,
    trg_vocab: &Vocabulary,
) -> Result<IndexedStats> {
    let mut lex_indexed: HashMap<(Token, Token), Count> = HashMap::new();
    for (src, trg, alpha) in &priors.lex {
        let e = if src == NULL_LITERAL {
            Some(0)
        } else {
            src_vocab.sampler_id(src)
        };
        let f = if trg == NULL_LITERAL {
            Some(0)
        } else {
            trg_vocab.sampler_id(trg)
        };
        if let (Some(e), Some(f)) = (e, f) {
            *lex_indexed.entry((e, f)).or_insert(0.0) += alpha;
        }
    }

    let mut fert_fwd_indexed: HashMap<(Token, usize), Count> = HashMap::new();
    for (src, fert, alpha) in &priors.fert_fwd {
        if let Some(e) = src_vocab.sampler_id(src) {
            *fert_fwd_indexed.entry((e, *fert)).or_insert(0.0) += alpha;
        }
    }
    let mut fert_rev_indexed: HashMap<(Token, usize), Count> = HashMap::new();
    for (trg, fert, alpha) in &priors.fert_rev {
        if let Some(f) = trg_vocab.sampler_id(trg) {
            *fert_rev_indexed.entry((f, *fert)).or_insert(0.0) += alpha;
        }
    }

    let stats = IndexedStats {
        lex_used: lex_indexed.len(),
        lex_total: priors.lex.len(),
        fert_fwd_used: fert_fwd_indexed.len(),
        fert_fwd_total: priors.fert_fwd.len(),
        fert_rev_used: fert_rev_indexed.len(),
        fert_rev_total: priors.fert_rev.len(),
    };
    log::info!(
        "{} (of {}) pairs of lexical priors used",
        stats.lex_used,
        stats.lex_total
    );

    // Vocabulary sizes include the NULL slot at index 0.
    writeln!(
        writer,
        "{} {} {} {} {} {} {}",
        src_vocab.len() + 1,
        trg_vocab.len() + 1,
        lex_indexed.len(),
        priors.hmm_fwd.len(),
        priors.hmm_rev.len(),
        fert_fwd_indexed.len(),
        fert_rev_indexed.len(),
    )?;

    let mut lex: Vec<_> = lex_indexed.into_iter().collect();
    lex.sort_by_key(|&(key, _)| key);
    for ((e, f), alpha) in lex {
        writeln!(writer, "{} {} {}", e, f, alpha)?;
    }

    let mut hmm_fwd: Vec<_> = priors.hmm_fwd.iter().collect();
    hmm_fwd.sort_by_key(|(&jump, _)| jump);
    for (jump, alpha) in hmm_fwd {
        writeln!(writer, "{} {}", jump, alpha)?;
    }

    let mut hmm_rev: Vec<_> = priors.hmm_rev.iter().collect();
    hmm_rev.sort_by_key(|(&jump, _)| jump);
    for (jump, alpha) in hmm_rev {
        writeln!(writer, "{} {}", jump, alpha)?;
    }

    let mut fert_fwd: Vec<_> = fert_fwd_indexed.into_iter().collect();
    fert_fwd.sort_by_key(|&(key, _)| key);
    for ((e, fert), alpha) in fert_fwd {
        writeln!(writer, "{} {} {}", e, fert, alpha)?;
    }

    let mut fert_rev: Vec<_> = fert_rev_indexed.into_iter().collect();
    fert_rev.sort_by_key(|&(key, _)| key);
    for ((f, fert), alpha) in fert_rev {
        writeln!(writer, "{} {} {}", f, fert, alpha)?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priors::PriorsAggregator;

    fn sample_tables() -> CountTables {
        let mut agg = PriorsAggregator::new();
        agg.observe("a b c", "x y", "0-0 1-1 2-1", "0-0 2-1").unwrap();
        agg.observe("a b", "y x", "0-1 1-0", "0-1 1-0").unwrap();
        agg.finish()
    }

    #[test]
    fn text_format_is_sorted_and_tagged() {
        let tables = sample_tables();
        let mut out = Vec::new();
        write_priors(&mut out, &tables).unwrap();
        let text = String::from_utf8(out).unwrap();

        let tags: Vec<&str> = text
            .lines()
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        // block order is fixed, blocks are contiguous
        let mut deduped = tags.clone();
        deduped.dedup();
        assert_eq!(deduped, vec!["LEX", "FERF", "FERR", "HMMF", "HMMR"]);

        // lexical block sorted by (source, target)
        let lex_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("LEX")).collect();
        let mut sorted = lex_lines.clone();
        sorted.sort();
        assert_eq!(lex_lines, sorted);
        assert!(text.contains("LEX\ta\tx\t2\n"));
        assert!(text.contains("LEX\tc\ty\t1\n"));
    }

    #[test]
    fn round_trip_preserves_every_entry() {
        let tables = sample_tables();
        let mut out = Vec::new();
        write_priors(&mut out, &tables).unwrap();
        let priors = read_priors(out.as_slice()).unwrap();

        assert_eq!(priors.lex.len(), tables.lex.len());
        for (src, trg, alpha) in &priors.lex {
            assert_eq!(tables.lex[&(src.clone(), trg.clone())], *alpha);
        }
        assert_eq!(priors.fert_fwd.len(), tables.fert_fwd.len());
        for (src, fert, alpha) in &priors.fert_fwd {
            assert_eq!(tables.fert_fwd[&(src.clone(), *fert)], *alpha);
        }
        assert_eq!(priors.fert_rev.len(), tables.fert_rev.len());
        assert_eq!(priors.hmm_fwd, tables.hmm_fwd);
        assert_eq!(priors.hmm_rev, tables.hmm_rev);
    }

    #[test]
    fn serialization_is_deterministic() {
        let tables = sample_tables();
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_priors(&mut first, &tables).unwrap();
        write_priors(&mut second, &tables.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_tag_and_bad_alpha_are_fatal() {
        let err = read_priors("LEX\ta\tx\t1\nBOGUS\t3\t1\n".as_bytes()).unwrap_err();
        match err {
            PriorsError::Format { line, content } => {
                assert_eq!(line, 2);
                assert!(content.contains("BOGUS"));
            }
            other => panic!("expected Format error, got {:?}", other),
        }

        // wrong field count for a known tag
        assert!(read_priors("LEX\ta\t1\n".as_bytes()).is_err());

        let err = read_priors("HMMF\t2\tmany\n".as_bytes()).unwrap_err();
        match err {
            PriorsError::Format { line, content } => {
                assert_eq!(line, 1);
                assert!(content.contains("many"));
            }
            other => panic!("expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn indexed_output_resolves_null_and_drops_oov() {
        let mut src_vocab = Vocabulary::new();
        let mut trg_vocab = Vocabulary::new();
        for w in ["a", "b"] {
            src_vocab.intern(w);
        }
        for w in ["x", "y"] {
            trg_vocab.intern(w);
        }

        let text = "LEX\t<NULL>\tx\t2\n\
                    LEX\ta\tx\t3\n\
                    LEX\tunseen\tx\t1\n\
                    FERF\ta\t1\t4\n\
                    FERF\tunseen\t2\t1\n\
                    FERR\ty\t1\t5\n\
                    HMMF\t1\t6\n\
                    HMMR\t-1\t7\n";
        let priors = read_priors(text.as_bytes()).unwrap();

        let mut out = Vec::new();
        let stats =
            write_indexed_priors(&mut out, &priors, &src_vocab, &trg_vocab).unwrap();
        assert_eq!(stats.lex_used, 2);
        assert_eq!(stats.lex_total, 3);
        assert_eq!(stats.fert_fwd_used, 1);
        assert_eq!(stats.fert_fwd_total, 2);
        assert_eq!(stats.fert_rev_used, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // header: voc sizes with NULL slot, then the five block sizes
        assert_eq!(lines[0], "3 3 2 1 1 1 1");
        // lexical block, sorted: <NULL>->0, "a"->1, "x"->1
        assert_eq!(lines[1], "0 1 2");
        assert_eq!(lines[2], "1 1 3");
        assert_eq!(lines[3], "1 6"); // HMMF
        assert_eq!(lines[4], "-1 7"); // HMMR
        assert_eq!(lines[5], "1 1 4"); // FERF
        assert_eq!(lines[6], "2 1 5"); // FERR
    }

    #[test]
    fn stemming_collisions_accumulate() {
        let mut src_vocab = Vocabulary::with_affixes(true, 3, 0);
        let mut trg_vocab = Vocabulary::new();
        src_vocab.intern("walking"); // stored as "wal"
        trg_vocab.intern("x");

        let text = "LEX\twalking\tx\t1\nLEX\twalked\tx\t2\n";
        let priors = read_priors(text.as_bytes()).unwrap();
        let mut out = Vec::new();
        let stats =
            write_indexed_priors(&mut out, &priors, &src_vocab, &trg_vocab).unwrap();
        assert_eq!(stats.lex_total, 2);
        assert_eq!(stats.lex_used, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|l| l == "1 1 3"));
    }

    #[test]
    fn indexed_entries_are_a_subset_of_text_entries() {
        let tables = sample_tables();
        let mut text = Vec::new();
        write_priors(&mut text, &tables).unwrap();
        let priors = read_priors(text.as_slice()).unwrap();

        // full vocabulary: equality
        let mut src_vocab = Vocabulary::new();
        let mut trg_vocab = Vocabulary::new();
        for w in ["a", "b", "c"] {
            src_vocab.intern(w);
        }
        for w in ["x", "y"] {
            trg_vocab.intern(w);
        }
        let mut out = Vec::new();
        let stats =
            write_indexed_priors(&mut out, &priors, &src_vocab, &trg_vocab).unwrap();
        assert_eq!(stats.lex_used, stats.lex_total);

        // vocabulary missing "c": strictly fewer entries
        let mut small_vocab = Vocabulary::new();
        for w in ["a", "b"] {
            small_vocab.intern(w);
        }
        let mut out = Vec::new();
        let stats =
            write_indexed_priors(&mut out, &priors, &small_vocab, &trg_vocab).unwrap();
        assert!(stats.lex_used < stats.lex_total);
    }
}
