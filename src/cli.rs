//! Command-line definition
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use opinion_core::{Category, ResultType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ev-opinion-search",
    version,
    about = "Search Reddit opinions on electric vehicles and break them down by sentiment",
    long_about = "Queries a Solr core of pre-labelled r/electricvehicles posts and comments, \
                  widens phrase searches that come back short, offers spelling corrections, \
                  and summarizes VADER and TextBlob sentiment and subjectivity per result set."
)]
pub struct Cli {
    /// Search keywords
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Which documents to search
    #[arg(short = 't', long = "type", value_enum, default_value = "comments")]
    pub result_type: ResultKind,

    /// Match the keywords as an exact phrase
    #[arg(short, long)]
    pub exact: bool,

    /// Earliest posting date (YYYY-MM-DD), inclusive
    #[arg(long, value_name = "DATE", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Latest posting date (YYYY-MM-DD), inclusive
    #[arg(long, value_name = "DATE", requires = "from")]
    pub to: Option<NaiveDate>,

    /// Number of results (defaults to the configured value)
    #[arg(short = 'n', long)]
    pub rows: Option<usize>,

    /// Config file path (defaults to ./ev-opinion-search.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sentiment model to break results down by
    #[arg(short, long)]
    pub model: Option<String>,

    /// Only list documents in this bucket of the selected model
    #[arg(long, requires = "model")]
    pub category: Option<Category>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write a static HTML dashboard page
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Never ask whether to apply a spelling suggestion
    #[arg(long)]
    pub no_prompt: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Posts,
    Comments,
    Both,
}

impl From<ResultKind> for ResultType {
    fn from(kind: ResultKind) -> Self {
        match kind {
            ResultKind::Posts => ResultType::PostsOnly,
            ResultKind::Comments => ResultType::CommentsOnly,
            ResultKind::Both => ResultType::PostsAndComments,
        }
    }
}

impl Cli {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}
