// src/main.rs

use dtm::errors::DtmError;
use dtm::{cli, exit_code, logging, resolve_settings, run, EXIT_INTERRUPTED};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("dtm error: {err:?}");
            let code = match err.downcast_ref::<DtmError>() {
                Some(DtmError::Interrupted { .. }) => EXIT_INTERRUPTED,
                _ => 1,
            };
            std::process::exit(code);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let settings = resolve_settings(&args)?;
    logging::init_logging(args.log_level, settings.log_file.as_deref())?;

    let code = match run(args, settings).await? {
        Some(report) => exit_code(&report),
        None => 0,
    };
    Ok(code)
}
