//! Sentence encoding for the sampler.
//!
//! The sampler consumes an indexed corpus: a header line with the sentence
//! count and vocabulary size, then one line per sentence holding its length
//! followed by 0-based token ids. The sampler shifts every id by +1 on load
//! to make room for NULL at index 0, so neither the ids nor the header size
//! written here include the NULL slot.

use std::io::{self, BufRead, Write};

use crate::errors::{PriorsError, Result};
use crate::stream::next_line;
use crate::types::{Token, MAX_SENT_LEN};
use crate::vocab::Vocabulary;

/// Read a corpus line by line, interning every token into `vocab`.
/// Empty lines become empty sentences. Single pass, nothing retained
/// beyond the id sequences.
pub fn read_text<R: BufRead>(mut reader: R, vocab: &mut Vocabulary) -> Result<Vec<Vec<Token>>> {
    let mut sentences = Vec::new();
    let mut lineno = 0;
    while let Some(line) = next_line(&mut reader)? {
        lineno += 1;
        let mut tokens = Vec::new();
        for word in line.split_whitespace() {
            tokens.push(vocab.intern(word));
        }
        if tokens.len() > MAX_SENT_LEN {
            return Err(PriorsError::input_shape(
                lineno,
                format!("sentence too long: {} > {}", tokens.len(), MAX_SENT_LEN),
            ));
        }
        sentences.push(tokens);
    }
    Ok(sentences)
}

/// Write the indexed corpus format consumed by the sampler.
pub fn write_text<W: Write>(
    writer: &mut W,
    sentences: &[Vec<Token>],
    voc_size: usize,
) -> io::Result<()> {
    writeln!(writer, "{} {}", sentences.len(), voc_size)?;
    for sentence in sentences {
        write!(writer, "{}", sentence.len())?;
        for &token in sentence {
            write!(writer, " {}", token)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Split one `source ||| target` line of a fast_align style joint corpus.
/// Exactly one separator is required and neither side may be empty.
pub fn split_joint_line(line: &str, lineno: usize) -> Result<(&str, &str)> {
    let trimmed = line.trim();
    let fields: Vec<&str> = trimmed.split(" ||| ").collect();
    match fields.as_slice() {
        [src, trg] if !src.is_empty() && !trg.is_empty() => Ok((*src, *trg)),
        _ => Err(PriorsError::input_shape(
            lineno,
            "line does not contain a single ||| separator, or sentence(s) are empty",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_then_write_indexed_corpus() {
        let corpus = "the cat sat\nthe dog\n\nsat\n";
        let mut vocab = Vocabulary::new();
        let sentences = read_text(corpus.as_bytes(), &mut vocab).unwrap();

        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], vec![0, 1, 2]);
        assert_eq!(sentences[1], vec![0, 3]);
        assert!(sentences[2].is_empty());
        assert_eq!(sentences[3], vec![2]);
        assert_eq!(vocab.len(), 4);

        let mut out = Vec::new();
        write_text(&mut out, &sentences, vocab.len()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "4 4\n3 0 1 2\n2 0 3\n0\n1 2\n"
        );
    }

    #[test]
    fn joint_line_requires_single_separator() {
        assert_eq!(
            split_joint_line("le chat ||| the cat", 1).unwrap(),
            ("le chat", "the cat")
        );
        assert!(split_joint_line("no separator here", 1).is_err());
        assert!(split_joint_line("a ||| b ||| c", 1).is_err());
        assert!(split_joint_line(" ||| b", 1).is_err());

        match split_joint_line("broken", 7) {
            Err(PriorsError::InputShape { line, .. }) => assert_eq!(line, 7),
            other => panic!("expected InputShape error, got {:?}", other),
        }
    }
}
