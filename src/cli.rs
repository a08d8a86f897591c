use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "oss-issues")]
#[command(about = "Rank a Maven project's dependencies by import usage and report their open issues")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "PATH", global = true)]
    pub m2: Option<PathBuf>,

    /// Remote repository to download missing artifacts from (repeatable).
    #[arg(long = "remote", value_name = "URL", global = true)]
    pub remotes: Vec<String>,

    #[arg(long, global = true)]
    pub offline: bool,

    #[arg(long, value_name = "FILE", global = true)]
    pub chrome: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// pom.xml of the project, or its directory.
    #[arg(long, value_name = "FILE")]
    pub pom: Option<PathBuf>,

    /// Analyze every module of a multi-module build.
    #[arg(long)]
    pub reactor: bool,

    /// Collect resolution and parse failures instead of stopping at the first one.
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Report {
        #[command(flatten)]
        project: ProjectArgs,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[arg(short = 'j', long, value_name = "N", default_value_t = 4)]
        jobs: usize,

        #[arg(long)]
        include_unused: bool,

        #[arg(long)]
        no_scrape: bool,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    Usage {
        #[command(flatten)]
        project: ProjectArgs,
    },
    Imports {
        #[arg(value_name = "DIR", required = true)]
        roots: Vec<PathBuf>,
    },
    Site {
        #[arg(value_name = "GROUP:ARTIFACT:VERSION")]
        coordinate: String,
    },
    Scrape {
        system: String,
        url: String,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
