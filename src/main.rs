use anyhow::Result;
use clap::{Parser, Subcommand};
use employee_search::commands::{
    SearchArgs, ask, build_index, init_config, search_employees, show_config, show_status,
};

#[derive(Parser)]
#[command(name = "employee-search")]
#[command(about = "Index employee records into a vector store and answer natural-language queries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize or inspect the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build (or rebuild) the vector index from the employee data file
    Build {
        /// Override the employee data file path
        #[arg(long)]
        data_file: Option<String>,
    },
    /// Search the index and print ranked matches
    Search {
        /// Natural-language search query
        query: String,
        /// Maximum number of results
        #[arg(long)]
        k: Option<usize>,
        /// Minimum similarity score for inclusion
        #[arg(long)]
        score_threshold: Option<f32>,
        /// Restrict to documents for a specific skill
        #[arg(long)]
        skill: Option<String>,
        /// Restrict to documents for a specific project
        #[arg(long)]
        project: Option<String>,
        /// Restrict to a document kind (profile, skill, or project)
        #[arg(long)]
        kind: Option<String>,
        /// Restrict to an availability status
        #[arg(long)]
        availability: Option<String>,
    },
    /// Retrieve matching employees and generate a natural-language answer
    Ask {
        /// Natural-language request
        query: String,
    },
    /// Show index and embedding-service status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                init_config()?;
            }
        }
        Commands::Build { data_file } => {
            build_index(data_file).await?;
        }
        Commands::Search {
            query,
            k,
            score_threshold,
            skill,
            project,
            kind,
            availability,
        } => {
            let args = SearchArgs {
                k,
                score_threshold,
                skill,
                project,
                kind,
                availability,
            };
            search_employees(&query, args).await?;
        }
        Commands::Ask { query } => {
            ask(&query).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["employee-search", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn search_command_with_query() {
        let cli = Cli::try_parse_from(["employee-search", "search", "Python developer"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search { query, k, .. } = parsed.command {
                assert_eq!(query, "Python developer");
                assert_eq!(k, None);
            }
        }
    }

    #[test]
    fn search_command_with_overrides() {
        let cli = Cli::try_parse_from([
            "employee-search",
            "search",
            "Python developer",
            "--k",
            "3",
            "--score-threshold",
            "0.5",
            "--skill",
            "Python",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search {
                k,
                score_threshold,
                skill,
                ..
            } = parsed.command
            {
                assert_eq!(k, Some(3));
                assert_eq!(score_threshold, Some(0.5));
                assert_eq!(skill, Some("Python".to_string()));
            }
        }
    }

    #[test]
    fn build_command_with_data_file() {
        let cli = Cli::try_parse_from(["employee-search", "build", "--data-file", "staff.json"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Build { data_file } = parsed.command {
                assert_eq!(data_file, Some("staff.json".to_string()));
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["employee-search", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["employee-search", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["employee-search", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
