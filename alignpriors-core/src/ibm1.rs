//! IBM1 translation-table estimation.
//!
//! Counts are accumulated into a temporary map and materialized once into
//! a compressed sparse row matrix of P(target | source). Rows of source
//! words that were never observed stay all-zero; they are deliberately not
//! smoothed to uniform, so a zero row always means "never seen".

use std::io::{self, BufRead, Write};

use hashbrown::HashMap;

use crate::errors::{PriorsError, Result};
use crate::links::{check_bounds, parse_links};
use crate::stream::next_line;
use crate::types::{Count, Token};
use crate::vocab::Vocabulary;

/// Row-major sparse matrix with binary-searched column access.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<Token>,
    values: Vec<Count>,
}

impl CsrMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn n_nonzero(&self) -> usize {
        self.values.len()
    }

    /// 0.0 for absent cells and out-of-range indices.
    pub fn get(&self, row: Token, col: Token) -> Count {
        let row = row as usize;
        if row >= self.n_rows {
            return 0.0;
        }
        let cols = &self.indices[self.indptr[row]..self.indptr[row + 1]];
        match cols.binary_search(&col) {
            Ok(at) => self.values[self.indptr[row] + at],
            Err(_) => 0.0,
        }
    }

    /// Nonzero cells in row-major order.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Token, Token, Count)> + '_ {
        (0..self.n_rows).flat_map(move |row| {
            (self.indptr[row]..self.indptr[row + 1])
                .map(move |at| (row as Token, self.indices[at], self.values[at]))
        })
    }

    /// Sum of one row, 0.0 for empty rows.
    pub fn row_sum(&self, row: Token) -> Count {
        let row = row as usize;
        if row >= self.n_rows {
            return 0.0;
        }
        self.values[self.indptr[row]..self.indptr[row + 1]]
            .iter()
            .sum()
    }
}

/// Accumulates raw co-occurrence counts and per-row totals, then
/// materializes the row-normalized probability matrix in one pass.
#[derive(Debug)]
pub struct CountsBuilder {
    counts: HashMap<(Token, Token), Count>,
    totals: Vec<Count>,
    n_cols: usize,
}

impl CountsBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        CountsBuilder {
            counts: HashMap::new(),
            totals: vec![0.0; n_rows],
            n_cols,
        }
    }

    pub fn add(&mut self, row: Token, col: Token, weight: Count) {
        *self.counts.entry((row, col)).or_insert(0.0) += weight;
        self.totals[row as usize] += weight;
    }

    /// Divide each cell by its row total. Rows with zero total have no
    /// cells, so they come out all-zero rather than uniform.
    pub fn normalize(self) -> CsrMatrix {
        let n_rows = self.totals.len();
        let mut cells: Vec<((Token, Token), Count)> = self.counts.into_iter().collect();
        cells.sort_by_key(|&(key, _)| key);

        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::with_capacity(cells.len());
        let mut values = Vec::with_capacity(cells.len());
        indptr.push(0);
        let mut row = 0;
        for ((r, c), count) in cells {
            while row < r as usize {
                indptr.push(indices.len());
                row += 1;
            }
            indices.push(c);
            values.push(count / self.totals[r as usize]);
        }
        while indptr.len() <= n_rows {
            indptr.push(indices.len());
        }

        CsrMatrix {
            n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            values,
        }
    }
}

/// Accumulate lexical co-occurrence counts from encoded sentence pairs and
/// one alignment-link stream.
///
/// With `reverse` set, the roles swap: rows are target ids and columns are
/// source ids, estimating P(source | target) from the reverse links. The
/// link pairs themselves stay in (source, target) orientation either way.
pub fn compute_counts<A: BufRead>(
    src_sents: &[Vec<Token>],
    trg_sents: &[Vec<Token>],
    mut links: A,
    n_src_types: usize,
    n_trg_types: usize,
    reverse: bool,
) -> Result<CountsBuilder> {
    if src_sents.len() != trg_sents.len() {
        return Err(PriorsError::input_shape(
            src_sents.len().min(trg_sents.len()) + 1,
            format!(
                "number of sentences differ in input files ({} vs {})",
                src_sents.len(),
                trg_sents.len()
            ),
        ));
    }
    let mut builder = if reverse {
        CountsBuilder::new(n_trg_types, n_src_types)
    } else {
        CountsBuilder::new(n_src_types, n_trg_types)
    };
    for (at, (src, trg)) in src_sents.iter().zip(trg_sents).enumerate() {
        let lineno = at + 1;
        let line = next_line(&mut links)?.ok_or_else(|| {
            PriorsError::input_shape(lineno, "alignment file ended before the corpus")
        })?;
        let pairs = parse_links(&line, lineno)?;
        check_bounds(&pairs, src.len(), trg.len(), lineno)?;
        for (i, j) in pairs {
            let e = src[i as usize];
            let f = trg[j as usize];
            if reverse {
                builder.add(f, e, 1.0);
            } else {
                builder.add(e, f, 1.0);
            }
        }
    }
    if next_line(&mut links)?.is_some() {
        return Err(PriorsError::input_shape(
            src_sents.len() + 1,
            "alignment file is longer than the corpus",
        ));
    }
    Ok(builder)
}

/// Row-normalized translation table P(target word | source word) together
/// with the vocabularies that define its indices.
#[derive(Debug, Clone)]
pub struct Ibm1 {
    p: CsrMatrix,
    voc_s: Vocabulary,
    voc_t: Vocabulary,
}

impl Ibm1 {
    pub fn new(p: CsrMatrix, voc_s: Vocabulary, voc_t: Vocabulary) -> Self {
        Ibm1 { p, voc_s, voc_t }
    }

    pub fn table(&self) -> &CsrMatrix {
        &self.p
    }

    /// P(target | source) by surface form; 0.0 when either word is unknown.
    pub fn probability(&self, src: &str, trg: &str) -> Count {
        match (self.voc_s.lookup(src), self.voc_t.lookup(trg)) {
            (Some(e), Some(f)) => self.p.get(e, f),
            _ => 0.0,
        }
    }

    /// P(target | source) by pre-resolved 0-based ids.
    pub fn probability_ids(&self, src: Token, trg: Token) -> Count {
        self.p.get(src, trg)
    }

    /// Phrase score P(T|S) = (prod over t of sum over s of p(s,t)) / |S|.
    /// An empty source phrase scores 0.0; an empty target phrase leaves
    /// the product at 1, giving 1/|S|.
    pub fn estimate(&self, src: &[&str], trg: &[&str]) -> Count {
        if src.is_empty() {
            return 0.0;
        }
        let mut product: Count = 1.0;
        for t in trg {
            let sum: Count = src.iter().map(|s| self.probability(s, t)).sum();
            product *= sum;
        }
        product / src.len() as Count
    }

    /// [`estimate`](Self::estimate) raised to 1/|T|, so longer target
    /// phrases are not penalized. Returned unchanged for an empty T.
    pub fn estimate_normalized(&self, src: &[&str], trg: &[&str]) -> Count {
        let est = self.estimate(src, trg);
        if trg.is_empty() {
            est
        } else {
            est.powf(1.0 / trg.len() as Count)
        }
    }

    /// Write every nonzero cell as `source <tab> target <tab> probability`.
    pub fn dump<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (e, f, p) in self.p.iter_nonzero() {
            if let (Some(src), Some(trg)) = (self.voc_s.word(e), self.voc_t.word(f)) {
                writeln!(writer, "{}\t{}\t{}", src, trg, p)?;
            }
        }
        Ok(())
    }
}
