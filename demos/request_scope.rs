//! Example: one scope per request, with logging
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example request_scope --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example request_scope --features logging-pretty
//! ```

use service_container::{provides, Container, DiError, Dispose, Result, Service};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

trait Repository: Dispose {
    fn find_user(&self, id: u32) -> String;
}

trait RequestHandler: Send + Sync {
    fn handle(&self, id: u32) -> String;
}

struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, message: &str) {
        println!("  [App] {message}");
    }
}

impl Service for StdoutLogger {
    type Dependencies = ();

    fn create(_: ()) -> Result<Self> {
        Ok(StdoutLogger)
    }
}

static CONNECTIONS: AtomicU32 = AtomicU32::new(1);

struct SqlRepository {
    connection: u32,
    logger: Arc<dyn Logger>,
}

impl Repository for SqlRepository {
    fn find_user(&self, id: u32) -> String {
        self.logger
            .log(&format!("connection {} loading user {id}", self.connection));
        format!("user-{id}")
    }
}

impl Dispose for SqlRepository {
    fn dispose(&self) {
        self.logger
            .log(&format!("connection {} returned to pool", self.connection));
    }
}

impl Service for SqlRepository {
    type Dependencies = Arc<dyn Logger>;

    fn create(logger: Arc<dyn Logger>) -> Result<Self> {
        let connection = CONNECTIONS.fetch_add(1, Ordering::SeqCst);
        logger.log(&format!("opening connection {connection}"));
        Ok(SqlRepository { connection, logger })
    }
}

struct UserHandler {
    repository: Arc<dyn Repository>,
}

impl RequestHandler for UserHandler {
    fn handle(&self, id: u32) -> String {
        self.repository.find_user(id)
    }
}

impl Service for UserHandler {
    type Dependencies = Arc<dyn Repository>;

    fn create(repository: Arc<dyn Repository>) -> Result<Self> {
        Ok(UserHandler { repository })
    }
}

provides!(StdoutLogger: dyn Logger);
provides!(SqlRepository: dyn Repository);
provides!(UserHandler: dyn RequestHandler);

fn main() -> Result<()> {
    // Uses JSON if logging-json is enabled, pretty if logging-pretty is enabled
    service_container::logging::init();

    println!("=== Request Scope Demo ===\n");

    // Registration only records descriptors (logs: "Registering service")
    let container = Container::new();
    container.register_singleton::<dyn Logger>(|b| b.implementation::<StdoutLogger>())?;
    container.register_scoped::<dyn Repository>(|b| {
        b.implementation::<SqlRepository>().disposable()
    })?;
    container.register_transient::<dyn RequestHandler>(|b| b.implementation::<UserHandler>())?;

    // Catch missing registrations and cycles before serving anything
    container.validate()?;
    container.lock();

    for request in 1..=2 {
        println!("\n--- request {request} ---");

        // Each request gets its own repository; both handlers share it
        container.scoped(|scope| -> Result<()> {
            let first = scope.resolve::<dyn RequestHandler>()?;
            let second = scope.resolve::<dyn RequestHandler>()?;
            println!("  {}", first.handle(request * 10));
            println!("  {}", second.handle(request * 10 + 1));
            Ok(())
        })?;
    }

    // Scoped services need a scope (logs: "Scoped service resolved without an active scope")
    match container.resolve::<dyn Repository>() {
        Err(DiError::NoActiveScope { type_name }) => {
            println!("\n{type_name} cannot be resolved outside a request");
        }
        other => println!("\nunexpected: {:?}", other.map(|_| ())),
    }

    // Registration after lock() is rejected
    let late = container.register_singleton::<u32>(|b| b.instance(Arc::new(7)));
    assert!(matches!(late, Err(DiError::Locked)));

    println!("\n=== Demo Complete ===");
    Ok(())
}
