use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a sample table stream to a file
    Generate {
        /// Output file
        file: PathBuf,

        /// Number of rows to generate
        #[arg(short, long, default_value_t = 1_000)]
        rows: usize,

        /// Store NULL in the name column of every third row
        #[arg(long)]
        null_strings: bool,
    },

    /// Print the schema, row count and checksum of a table stream
    Inspect {
        /// Table stream file
        file: PathBuf,
    },

    /// Print the rows of a table stream
    Dump {
        /// Table stream file
        file: PathBuf,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run a scan plan over a table stream
    Scan {
        /// Table stream file
        file: PathBuf,

        /// Scan plan node as JSON, or @path to read it from a file
        #[arg(short, long)]
        plan: String,

        /// Statement parameter, in order (integer, float or string)
        #[arg(long = "param")]
        params: Vec<String>,
    },
}
