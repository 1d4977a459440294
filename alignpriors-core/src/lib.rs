pub mod types;
pub mod errors;
pub mod stream;
pub mod vocab;
pub mod text;
pub mod links;
pub mod priors;
pub mod serialize;
pub mod ibm1;

pub use errors::{PriorsError, Result};
pub use ibm1::{compute_counts, CountsBuilder, CsrMatrix, Ibm1};
pub use priors::{calculate_priors, calculate_priors_joint, CountTables, PriorsAggregator};
pub use serialize::{read_priors, write_indexed_priors, write_priors, IndexedStats, Priors};
pub use text::{read_text, split_joint_line, write_text};
pub use vocab::Vocabulary;
