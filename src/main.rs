use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webstart::{config::Config, middleware, server};

fn main() -> ExitCode {
  // A missing .env is fine; flags and the real environment still apply
  let _ = dotenvy::dotenv();

  let config = match Config::try_parse() {
    Ok(config) => config,
    Err(err) => {
      // --help and --version print to stdout and succeed
      let _ = err.print();
      return if err.use_stderr() {
        ExitCode::FAILURE
      } else {
        ExitCode::SUCCESS
      };
    }
  };

  let default_filter = if config.dev {
    "webstart=debug,tower_http=debug"
  } else {
    "webstart=info,tower_http=info"
  };
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  if config.dev {
    middleware::install_panic_hook();
  }

  // Tasks abandoned at the shutdown deadline must not hold the process open
  match server::block_on_detached(server::run(config)).and_then(|served| served) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!(error = %err, "startup failed");
      eprintln!("{err}");
      ExitCode::FAILURE
    }
  }
}
