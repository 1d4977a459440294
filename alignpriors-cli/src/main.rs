use std::io::{BufWriter, Write};

use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;

use alignpriors_core::stream::{open_text, OutputSink};
use alignpriors_core::{
    calculate_priors, calculate_priors_joint, compute_counts, read_priors, read_text,
    write_indexed_priors, write_priors, write_text, CountTables, Ibm1, PriorsError, Vocabulary,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Prepare inputs and priors for a word-alignment sampler")]
struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate alignments into a token-keyed priors file
    Priors(PriorsArgs),
    /// Resolve a priors file against the corpora for the sampler
    Index(IndexArgs),
    /// Encode corpora into the sampler's indexed sentence format
    Encode(EncodeArgs),
    /// Estimate IBM1 translation tables from alignments
    Model(ModelArgs),
}

/// Lowercasing and affix stemming options, shared by every command that
/// builds a vocabulary.
#[derive(Args, Debug, Clone)]
struct StemmingArgs {
    /// Do not lowercase input text
    #[arg(long = "no-lowercase", action = ArgAction::SetFalse)]
    lowercase: bool,
    /// Length of prefix for stemming (source)
    #[arg(long = "source-prefix", default_value_t = 0, value_name = "N")]
    source_prefix_len: usize,
    /// Length of suffix for stemming (source)
    #[arg(long = "source-suffix", default_value_t = 0, value_name = "N")]
    source_suffix_len: usize,
    /// Length of prefix for stemming (target)
    #[arg(long = "target-prefix", default_value_t = 0, value_name = "N")]
    target_prefix_len: usize,
    /// Length of suffix for stemming (target)
    #[arg(long = "target-suffix", default_value_t = 0, value_name = "N")]
    target_suffix_len: usize,
}

impl StemmingArgs {
    fn source_vocabulary(&self) -> Vocabulary {
        Vocabulary::with_affixes(self.lowercase, self.source_prefix_len, self.source_suffix_len)
    }

    fn target_vocabulary(&self) -> Vocabulary {
        Vocabulary::with_affixes(self.lowercase, self.target_prefix_len, self.target_suffix_len)
    }
}

#[derive(Args, Debug)]
struct PriorsArgs {
    /// Source text file
    #[arg(short = 's', long = "source", value_name = "filename")]
    source: Option<String>,
    /// Target text file
    #[arg(short = 't', long = "target", value_name = "filename")]
    target: Option<String>,
    /// fast_align style ||| separated file
    #[arg(short = 'i', long = "input", value_name = "filename", conflicts_with_all = ["source", "target"])]
    joint: Option<String>,
    /// Forward alignments file
    #[arg(short = 'f', long = "forward", value_name = "filename")]
    forward: String,
    /// Reverse alignments file
    #[arg(short = 'r', long = "reverse", value_name = "filename")]
    reverse: String,
    /// File to write priors to
    #[arg(short = 'p', long = "priors", value_name = "filename", default_value = "-")]
    priors: String,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Token-keyed priors file
    #[arg(short = 'p', long = "priors", value_name = "filename")]
    priors: String,
    /// Source text file
    #[arg(short = 's', long = "source", value_name = "filename")]
    source: String,
    /// Target text file
    #[arg(short = 't', long = "target", value_name = "filename")]
    target: String,
    /// File to write index-resolved priors to
    #[arg(short = 'o', long = "output", value_name = "filename", default_value = "-")]
    output: String,
    #[command(flatten)]
    stemming: StemmingArgs,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Source text file
    #[arg(short = 's', long = "source", value_name = "filename")]
    source: String,
    /// Target text file
    #[arg(short = 't', long = "target", value_name = "filename")]
    target: String,
    /// File to write the encoded source corpus to
    #[arg(long = "source-output", value_name = "filename")]
    source_output: String,
    /// File to write the encoded target corpus to
    #[arg(long = "target-output", value_name = "filename")]
    target_output: String,
    #[command(flatten)]
    stemming: StemmingArgs,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Source text file
    #[arg(short = 's', long = "source", value_name = "filename")]
    source: String,
    /// Target text file
    #[arg(short = 't', long = "target", value_name = "filename")]
    target: String,
    /// Forward alignments file
    #[arg(long = "forward-links", value_name = "filename")]
    forward_links: Option<String>,
    /// Reverse alignments file
    #[arg(long = "reverse-links", value_name = "filename")]
    reverse_links: Option<String>,
    /// Filename to write forward direction probabilities to
    #[arg(short = 'f', long = "forward-probabilities", value_name = "filename")]
    probabilities_fwd: Option<String>,
    /// Filename to write reverse direction probabilities to
    #[arg(short = 'r', long = "reverse-probabilities", value_name = "filename")]
    probabilities_rev: Option<String>,
    #[command(flatten)]
    stemming: StemmingArgs,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    builder.filter_level(level);
    let _ = builder.try_init();
}

/// Write through a buffered, atomically committed sink.
fn write_output<F>(path: &str, write: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut BufWriter<&mut OutputSink>) -> Result<(), Box<dyn std::error::Error>>,
{
    let mut sink = OutputSink::create(path)?;
    {
        let mut writer = BufWriter::new(&mut sink);
        write(&mut writer)?;
        writer.flush()?;
    }
    sink.commit()?;
    Ok(())
}

fn run_priors(args: PriorsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let fwd = open_text(&args.forward)?;
    let rev = open_text(&args.reverse)?;
    let tables: CountTables = match (&args.joint, &args.source, &args.target) {
        (Some(joint), _, _) => calculate_priors_joint(open_text(joint)?, fwd, rev)?,
        (None, Some(source), Some(target)) => {
            calculate_priors(open_text(source)?, open_text(target)?, fwd, rev)?
        }
        _ => return Err("need to specify either -s and -t, or -i".into()),
    };
    log::info!("aggregated statistics over {} sentences", tables.n_sentences);
    write_output(&args.priors, |w| {
        write_priors(w, &tables)?;
        Ok(())
    })
}

fn run_index(args: IndexArgs) -> Result<(), Box<dyn std::error::Error>> {
    let priors = read_priors(open_text(&args.priors)?)?;

    let mut src_vocab = args.stemming.source_vocabulary();
    let mut trg_vocab = args.stemming.target_vocabulary();
    let src_sents = read_text(open_text(&args.source)?, &mut src_vocab)?;
    let trg_sents = read_text(open_text(&args.target)?, &mut trg_vocab)?;
    check_sentence_counts(src_sents.len(), trg_sents.len())?;

    write_output(&args.output, |w| {
        write_indexed_priors(w, &priors, &src_vocab, &trg_vocab)?;
        Ok(())
    })
}

fn run_encode(args: EncodeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut src_vocab = args.stemming.source_vocabulary();
    let mut trg_vocab = args.stemming.target_vocabulary();

    log::info!("reading source text from {}...", args.source);
    let src_sents = read_text(open_text(&args.source)?, &mut src_vocab)?;
    log::info!("reading target text from {}...", args.target);
    let trg_sents = read_text(open_text(&args.target)?, &mut trg_vocab)?;
    check_sentence_counts(src_sents.len(), trg_sents.len())?;
    log::info!("prepared {} sentences for alignment", src_sents.len());

    write_output(&args.source_output, |w| {
        write_text(w, &src_sents, src_vocab.len())?;
        Ok(())
    })?;
    write_output(&args.target_output, |w| {
        write_text(w, &trg_sents, trg_vocab.len())?;
        Ok(())
    })
}

fn run_model(args: ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.probabilities_fwd.is_none() && args.probabilities_rev.is_none() {
        return Err("no file to save probabilities (-f/-r), will do nothing".into());
    }

    let mut src_vocab = args.stemming.source_vocabulary();
    let mut trg_vocab = args.stemming.target_vocabulary();
    let src_sents = read_text(open_text(&args.source)?, &mut src_vocab)?;
    let trg_sents = read_text(open_text(&args.target)?, &mut trg_vocab)?;
    check_sentence_counts(src_sents.len(), trg_sents.len())?;

    if let Some(out) = &args.probabilities_fwd {
        let links_path = args
            .forward_links
            .as_ref()
            .ok_or("--forward-links is required with -f")?;
        let builder = compute_counts(
            &src_sents,
            &trg_sents,
            open_text(links_path)?,
            src_vocab.len(),
            trg_vocab.len(),
            false,
        )?;
        let model = Ibm1::new(builder.normalize(), src_vocab.clone(), trg_vocab.clone());
        log::info!(
            "forward model: {} nonzero entries",
            model.table().n_nonzero()
        );
        write_output(out, |w| {
            model.dump(w)?;
            Ok(())
        })?;
    }

    if let Some(out) = &args.probabilities_rev {
        let links_path = args
            .reverse_links
            .as_ref()
            .ok_or("--reverse-links is required with -r")?;
        let builder = compute_counts(
            &src_sents,
            &trg_sents,
            open_text(links_path)?,
            src_vocab.len(),
            trg_vocab.len(),
            true,
        )?;
        let model = Ibm1::new(builder.normalize(), trg_vocab.clone(), src_vocab.clone());
        log::info!(
            "reverse model: {} nonzero entries",
            model.table().n_nonzero()
        );
        write_output(out, |w| {
            model.dump(w)?;
            Ok(())
        })?;
    }

    Ok(())
}

fn check_sentence_counts(n_src: usize, n_trg: usize) -> Result<(), PriorsError> {
    if n_src != n_trg {
        return Err(PriorsError::InputShape {
            line: n_src.min(n_trg) + 1,
            msg: format!(
                "number of sentences differ in input files ({} vs {})",
                n_src, n_trg
            ),
        });
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Priors(args) => run_priors(args),
        Command::Index(args) => run_index(args),
        Command::Encode(args) => run_encode(args),
        Command::Model(args) => run_model(args),
    }
}
