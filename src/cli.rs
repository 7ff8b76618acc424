//! Command-line argument parsing for text2sql.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Answer natural-language questions with read-only SQL over SQLite.
#[derive(Parser, Debug)]
#[command(name = "text2sql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config and TEXT2SQL_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// LLM provider: openai, ollama or mock
    #[arg(long, global = true, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Write logs to the log file instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Answer one question and print the JSON response
    Ask {
        /// The question, in plain language
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Extra context for the model
        #[arg(short, long, value_name = "TEXT")]
        assumptions: Option<String>,

        /// Row limit for the generated query
        #[arg(short, long, value_name = "N")]
        limit: Option<i64>,
    },

    /// Run a read-only SQL statement and print the rows as JSON
    Query {
        /// A single SELECT statement
        #[arg(value_name = "SQL")]
        sql: String,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies flag values over file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(db) = &self.db {
            config.database.path = db.clone();
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
        }
        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}
