mod cli;
mod infra;
mod routes;
mod server;
mod simulate;

use program_allocation::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
