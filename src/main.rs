use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match storefront_client::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
