use m3udl_core::logging;

mod cli;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; never let it stop a download.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable: {:#}", err);
    }

    let status = match cli::run_from_args().await {
        Ok(status) => status,
        Err(err) => {
            eprintln!("m3udl error: {:#}", err);
            cli::ExitStatus::Failure
        }
    };
    std::process::exit(status.code());
}
