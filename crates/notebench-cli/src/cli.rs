use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "notebench")]
#[command(about = "Benchmark notes backends and report the results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a load scenario against a backend and write its result CSVs
    Run {
        /// Base URL of the backend under test
        #[arg(long)]
        url: String,

        /// Scenario JSON file; the built-in notes scenario when omitted
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Concurrent virtual users (overrides the scenario default)
        #[arg(long)]
        users: Option<u32>,

        /// Users spawned per second during ramp-up
        #[arg(long)]
        spawn_rate: Option<f64>,

        /// Run duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Directory the result CSVs are written to
        #[arg(long)]
        out: PathBuf,

        /// Docker container of the backend, for resource sampling
        #[arg(long, requires = "db_container")]
        benchmark_container: Option<String>,

        /// Docker container of the database, for resource sampling
        #[arg(long, requires = "benchmark_container")]
        db_container: Option<String>,
    },

    /// Discover runs under a results root and produce the report artifacts
    Report {
        /// Results root to scan for run directories
        #[arg(long)]
        root: PathBuf,

        /// Skip regenerating the README
        #[arg(long)]
        no_readme: bool,

        /// Skip writing the JSON data document
        #[arg(long)]
        no_json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_parses_with_overrides() {
        let cli = Cli::try_parse_from([
            "notebench",
            "run",
            "--url",
            "http://localhost:8000",
            "--users",
            "100",
            "--duration",
            "30",
            "--out",
            "results/rust/axum",
        ])
        .expect("parse");
        match cli.command {
            Commands::Run {
                url,
                users,
                duration,
                out,
                scenario,
                ..
            } => {
                assert_eq!(url, "http://localhost:8000");
                assert_eq!(users, Some(100));
                assert_eq!(duration, Some(30));
                assert_eq!(out, PathBuf::from("results/rust/axum"));
                assert!(scenario.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn container_flags_must_come_in_pairs() {
        let result = Cli::try_parse_from([
            "notebench",
            "run",
            "--url",
            "http://localhost:8000",
            "--out",
            "results",
            "--benchmark-container",
            "backend",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn report_parses_artifact_switches() {
        let cli = Cli::try_parse_from(["notebench", "report", "--root", "results", "--no-readme"])
            .expect("parse");
        match cli.command {
            Commands::Report {
                root,
                no_readme,
                no_json,
            } => {
                assert_eq!(root, PathBuf::from("results"));
                assert!(no_readme);
                assert!(!no_json);
            }
            _ => panic!("expected report"),
        }
    }
}
