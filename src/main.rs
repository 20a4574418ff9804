use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use bookshelf::config::{get_variable, get_variable_or};
use bookshelf::db::{memory::MemoryDb, Db, PgDb};
use bookshelf::environment::Environment;
use bookshelf::routes::{self, admin::TerminationFunctionWrapper};
use bookshelf::urls::Urls;
use log::{info, initialize_logger};

/// Connection string selecting in-process storage instead of Postgres.
const MEMORY_CONNECTION_STRING: &str = "memory:";

const DEFAULT_BOOKS_PATH: &str = "books";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("BOOKSHELF_PORT").parse()?;
    let admin_port: u16 = get_variable("BOOKSHELF_ADMIN_PORT").parse()?;

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    let connection_string = get_variable("BOOKSHELF_DB_CONNECTION_STRING");
    let db: Arc<dyn Db + Send + Sync> = if connection_string == MEMORY_CONNECTION_STRING {
        info!(logger, "Keeping books in memory...");
        Arc::new(MemoryDb::new())
    } else {
        info!(logger, "Creating database pool...");
        let pool = sqlx::PgPool::connect(&connection_string).await?;
        Arc::new(PgDb::new(pool))
    };

    let urls = Arc::new(Urls::new(
        get_variable("BOOKSHELF_BASE_URL"),
        get_variable_or("BOOKSHELF_BOOKS_PATH", DEFAULT_BOOKS_PATH),
    )?);

    let environment = Environment::new(logger.clone(), db, urls);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate: TerminationFunctionWrapper<'static> = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // the receiver only goes away once shutdown has begun
            termination_sender.send(()).await.ok();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();
        let routes = routes::make_routes(environment.clone());

        let (_, main_server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async move {
                should_terminate.await;
            })?;

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async move {
                should_terminate.await;
            })?;

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
