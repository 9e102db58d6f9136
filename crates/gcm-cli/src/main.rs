use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "gcm", version, about = "Group content unpublished-visibility filter")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the filter against a fixture and print the resulting where expression.
    Explain {
        /// Fixture file with groups, relations, users and rows. Defaults to
        /// `fixture_file` from the config.
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Path to gcm.yaml
        #[arg(long, short = 'c', env = "GCM_CONFIG")]
        config: Option<PathBuf>,

        /// Current user id (0 = anonymous)
        #[arg(long, default_value_t = 0)]
        user: u64,

        /// Positional view arguments, in order
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Position of the group id among the view arguments
        #[arg(long, default_value_t = 0)]
        gid_position: usize,

        /// Plugin id of the group argument binding
        #[arg(long, default_value = "group_id")]
        gid_plugin: String,

        /// Do not bind a group argument at all
        #[arg(long, default_value_t = false)]
        no_gid: bool,

        /// SELECT statement to inject the expression into
        #[arg(long)]
        sql: Option<String>,

        /// List which fixture rows the user can see
        #[arg(long, default_value_t = false)]
        rows: bool,

        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Validate a config file and, optionally, a fixture.
    Check {
        /// Path to gcm.yaml
        #[arg(long, short = 'c', env = "GCM_CONFIG")]
        config: Option<PathBuf>,

        /// Fixture file to check against the config
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Explain {
            fixture,
            config,
            user,
            args,
            gid_position,
            gid_plugin,
            no_gid,
            sql,
            rows,
            json,
        } => {
            let options = commands::explain::ExplainOptions {
                fixture,
                config,
                user,
                args,
                gid: (!no_gid).then_some((gid_plugin, gid_position)),
                sql,
                rows,
                json,
            };
            commands::explain::run(&options)?
        }

        Command::Check { config, fixture } => {
            commands::check::run(config.as_deref(), fixture.as_deref())?
        }
    }

    Ok(())
}
