mod cli;
mod infra;
mod routes;
mod server;

use movement::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
