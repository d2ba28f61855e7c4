//! Command-line interface definition

use crate::assets::{AssetKind, Ownership};
use crate::commands::ClassifyRequest;
use crate::config::ScanOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Discover and classify an organization's internet-facing assets
#[derive(Parser, Debug)]
#[command(name = "inq")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file (default: $INQ_CONFIG, then the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Skip DNS and RDAP lookups when creating assets
    #[arg(long, global = true)]
    pub offline: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search OSINT sources for assets related to the owned ones
    Scan {
        #[command(flatten)]
        database: DatabaseArg,
        #[command(flatten)]
        options: ScanArgs,
    },
    /// Print asset counts per kind
    Status {
        #[command(flatten)]
        database: DatabaseArg,
        /// Count explicit classifications only
        #[arg(short, long)]
        strong: bool,
    },
    /// Manually classify assets as accepted, unmarked or rejected
    Classify {
        #[command(flatten)]
        database: DatabaseArg,
        #[command(flatten)]
        targets: ClassifyArgs,
    },
    /// Export the database as JSON
    Dump {
        #[command(flatten)]
        database: DatabaseArg,
        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        json: Option<PathBuf>,
        /// Include rejected assets
        #[arg(short, long)]
        all: bool,
    },
    /// Write the owned-asset hierarchy as a JSON tree
    Visualize {
        #[command(flatten)]
        database: DatabaseArg,
        /// Report file (default: report.json next to the database)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Command {
    pub fn database(&self) -> Option<&PathBuf> {
        match self {
            Command::Scan { database, .. }
            | Command::Status { database, .. }
            | Command::Classify { database, .. }
            | Command::Dump { database, .. }
            | Command::Visualize { database, .. } => database.path.as_ref(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArg {
    /// Intelligence database; created if missing (default: <root_folder>/inquisitor.db)
    #[arg(value_name = "DATABASE")]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Google API developer key
    #[arg(long, value_name = "KEY")]
    pub google_dev_key: Option<String>,
    /// Google Custom Search engine id
    #[arg(long, value_name = "ID")]
    pub google_cse_id: Option<String>,
    /// Pages fetched per Google query
    #[arg(long, value_name = "PAGES")]
    pub google_limit: Option<u32>,
    /// Shodan API key
    #[arg(long, value_name = "KEY")]
    pub shodan_api_key: Option<String>,
    /// Pages fetched per Shodan query
    #[arg(long, value_name = "PAGES")]
    pub shodan_limit: Option<u32>,
    /// Assets transformed concurrently
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
}

impl From<&ScanArgs> for ScanOverrides {
    fn from(args: &ScanArgs) -> Self {
        ScanOverrides {
            google_dev_key: args.google_dev_key.clone(),
            google_cse_id: args.google_cse_id.clone(),
            google_page_limit: args.google_limit,
            shodan_api_key: args.shodan_api_key.clone(),
            shodan_page_limit: args.shodan_limit,
            workers: args.workers,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClassifyArgs {
    #[arg(long, visible_alias = "ar", num_args = 1.., value_name = "REGISTRANT")]
    pub accept_registrant: Vec<String>,
    #[arg(long, visible_alias = "ur", num_args = 1.., value_name = "REGISTRANT")]
    pub unmark_registrant: Vec<String>,
    #[arg(long, visible_alias = "rr", num_args = 1.., value_name = "REGISTRANT")]
    pub reject_registrant: Vec<String>,

    #[arg(long, visible_alias = "ab", num_args = 1.., value_name = "BLOCK")]
    pub accept_block: Vec<String>,
    #[arg(long, visible_alias = "ub", num_args = 1.., value_name = "BLOCK")]
    pub unmark_block: Vec<String>,
    #[arg(long, visible_alias = "rb", num_args = 1.., value_name = "BLOCK")]
    pub reject_block: Vec<String>,

    #[arg(long, visible_alias = "ah", num_args = 1.., value_name = "HOST")]
    pub accept_host: Vec<String>,
    #[arg(long, visible_alias = "uh", num_args = 1.., value_name = "HOST")]
    pub unmark_host: Vec<String>,
    #[arg(long, visible_alias = "rh", num_args = 1.., value_name = "HOST")]
    pub reject_host: Vec<String>,

    #[arg(long, visible_alias = "ae", num_args = 1.., value_name = "EMAIL")]
    pub accept_email: Vec<String>,
    #[arg(long, visible_alias = "ue", num_args = 1.., value_name = "EMAIL")]
    pub unmark_email: Vec<String>,
    #[arg(long, visible_alias = "re", num_args = 1.., value_name = "EMAIL")]
    pub reject_email: Vec<String>,

    #[arg(long, visible_alias = "al", num_args = 1.., value_name = "LINKEDIN")]
    pub accept_linkedin: Vec<String>,
    #[arg(long, visible_alias = "ul", num_args = 1.., value_name = "LINKEDIN")]
    pub unmark_linkedin: Vec<String>,
    #[arg(long, visible_alias = "rl", num_args = 1.., value_name = "LINKEDIN")]
    pub reject_linkedin: Vec<String>,
}

impl ClassifyArgs {
    pub fn to_request(&self) -> ClassifyRequest {
        let buckets = [
            (AssetKind::Registrant, Ownership::Accepted, &self.accept_registrant),
            (AssetKind::Registrant, Ownership::Unknown, &self.unmark_registrant),
            (AssetKind::Registrant, Ownership::Rejected, &self.reject_registrant),
            (AssetKind::Block, Ownership::Accepted, &self.accept_block),
            (AssetKind::Block, Ownership::Unknown, &self.unmark_block),
            (AssetKind::Block, Ownership::Rejected, &self.reject_block),
            (AssetKind::Host, Ownership::Accepted, &self.accept_host),
            (AssetKind::Host, Ownership::Unknown, &self.unmark_host),
            (AssetKind::Host, Ownership::Rejected, &self.reject_host),
            (AssetKind::Email, Ownership::Accepted, &self.accept_email),
            (AssetKind::Email, Ownership::Unknown, &self.unmark_email),
            (AssetKind::Email, Ownership::Rejected, &self.reject_email),
            (AssetKind::LinkedIn, Ownership::Accepted, &self.accept_linkedin),
            (AssetKind::LinkedIn, Ownership::Unknown, &self.unmark_linkedin),
            (AssetKind::LinkedIn, Ownership::Rejected, &self.reject_linkedin),
        ];

        let mut request = ClassifyRequest::new();
        for (kind, ownership, values) in buckets {
            request.add(kind, ownership, values);
        }
        request
    }
}
