//! Calculator CLI
//!
//! ```bash
//! calc calculate "3+[1+2+3/3]*5+6/((2+1)*2-3)" --mode decompose
//! calc calculate "7*[2+18/3]-9+(4*5-2)" --mode distributed --format json
//! calc serve --port 8000
//! ```

use agent_analytics_calculator::{run, Cli};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    // With --log-dir the SDK installs its own JSON subscriber
    if cli.log_dir.is_none() {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::WARN.into()),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let exit_code = run(cli);
    std::process::exit(exit_code.into());
}
