use std::process;
use std::sync::Arc;

use anyhow::Result;
use tracing::error;

use cfystrap::cli::{self, Commands};
use cfystrap::executor::{CommandExecutor, RealCommandExecutor};

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    cfystrap::init_logging(args.command.log_level())?;

    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor);
    let result = match &args.command {
        Commands::Bootstrap(opts) => cfystrap::run_bootstrap(opts, executor),
        Commands::Validate(opts) => cfystrap::run_validate(opts),
        Commands::Completions(opts) => cfystrap::run_completions(opts),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
