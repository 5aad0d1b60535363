mod commands;

use crate::commands::operation::OperationSubcommand;
use crate::commands::project::GlobalOpts;
use crate::commands::relations::{DescribeArgs, RenameArgs};
use crate::commands::run::RunArgs;
use crate::commands::{
    handle_debug, handle_describe, handle_ls, handle_operation, handle_rename, handle_run,
};
use clap::{Parser, Subcommand};
use common::error::DsfError;
use common::types::relation::ResourceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dsf", about = "Build SQL models as streams and pipelines")]
pub struct Cli {
    #[arg(
        long = "config-path",
        short = 'c',
        help = "path to the project directory",
        global = true
    )]
    pub config_path: Option<PathBuf>,
    #[arg(long, short = 't', help = "target from profiles.yml", global = true)]
    pub target: Option<String>,
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Show the resolved configuration and test the connection
    Debug,
    /// Build models
    Run(RunArgs),
    /// Load seed files
    Seed(RunArgs),
    /// Run tests
    Test(RunArgs),
    /// Seeds, then models, then tests
    Build(RunArgs),
    /// List streams on the account
    Ls,
    /// Print the schema of a stream
    Describe(DescribeArgs),
    /// Rename a stream and its pipeline
    Rename(RenameArgs),
    /// Maintenance operations
    #[command(subcommand)]
    RunOperation(OperationSubcommand),
}

fn run_cmd(func: Result<(), DsfError>) {
    if let Err(e) = func {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    logging::init_cli_logger();
    let cli = Cli::parse();
    let opts = GlobalOpts {
        config_path: cli.config_path,
        target: cli.target,
    };

    match &cli.command {
        Cmd::Debug => run_cmd(handle_debug(&opts)),
        Cmd::Run(args) => run_cmd(handle_run(&[ResourceKind::Table], args, &opts)),
        Cmd::Seed(args) => run_cmd(handle_run(&[ResourceKind::Seed], args, &opts)),
        Cmd::Test(args) => run_cmd(handle_run(&[ResourceKind::Test], args, &opts)),
        Cmd::Build(args) => run_cmd(handle_run(&ResourceKind::ALL, args, &opts)),
        Cmd::Ls => run_cmd(handle_ls(&opts)),
        Cmd::Describe(args) => run_cmd(handle_describe(args, &opts)),
        Cmd::Rename(args) => run_cmd(handle_rename(args, &opts)),
        Cmd::RunOperation(operation) => run_cmd(handle_operation(operation, &opts)),
    }
}
