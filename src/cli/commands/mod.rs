//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod name;
pub mod post;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a ref, fetch files and emit build names
    Run {
        /// Repository identifier(s), separated by commas or newlines
        #[arg(long, env = "INPUT_REPOSITORY")]
        repository: Option<String>,

        /// Branch, tag, pull request ref or changelist to resolve
        #[arg(long = "ref", env = "INPUT_REF")]
        reference: Option<String>,

        /// Source provider (github, gitlab, bitbucket, perforce)
        #[arg(long, env = "INPUT_PROVIDER")]
        provider: Option<String>,

        /// Files to fetch, as `path|ENV;path!|ENV` (`!` marks a required file)
        #[arg(long, env = "INPUT_FILES")]
        files: Option<String>,

        /// Run number appended to the ref in the build name
        #[arg(long, env = "GITHUB_RUN_NUMBER", default_value = "")]
        run_number: String,

        /// Name the build after the current time instead of the commit time
        #[arg(long)]
        use_current_time: bool,

        /// Where to keep the state for the post phase
        #[arg(long, env = "PEW_STATE_FILE")]
        state_file: Option<PathBuf>,
    },

    /// Clean up credentials acquired by a previous run
    Post {
        /// State file written by the run phase
        #[arg(long, env = "PEW_STATE_FILE")]
        state_file: Option<PathBuf>,
    },

    /// Generate build names without contacting any provider
    Name {
        /// Ref the build is for
        #[arg(long = "ref")]
        reference: String,

        /// Resolved commit id
        #[arg(long)]
        commit: String,

        /// Build timestamp (RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Run number appended to the ref
        #[arg(long, env = "GITHUB_RUN_NUMBER", default_value = "")]
        run_number: String,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Run {
                repository,
                reference,
                provider,
                files,
                run_number,
                use_current_time,
                state_file,
            } => {
                let options = run::RunOptions {
                    repository,
                    reference,
                    provider,
                    files,
                    run_number,
                    use_current_time,
                    state_file,
                };
                run::execute(options).await
            }
            Self::Post { state_file } => post::execute(state_file).await,
            Self::Name {
                reference,
                commit,
                date,
                run_number,
            } => name::execute(&reference, &commit, date.as_deref(), &run_number),
        }
    }
}
