//! Example: Composing a Widget Service with Bondkit
//!
//! Three independently versioned packages contribute to one application:
//! - a storage package bonds `database`
//! - a logging package bonds `logger`
//! - a payments package bonds `payments/stripe` (only when installed)
//!
//! Run with `PAYMENTS=1` to see the checkout route mount.

use bondkit::prelude::*;
use serde_json::{json, Value};

// =============================================================================
// Providers contributed by packages
// =============================================================================

/// Logger package: prefixes every line with the service name.
#[derive(Debug)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str, context: &Value) {
        println!("[widgets] {:?} {} {}", level, message, context);
    }
}

trait PaymentGateway: Send + Sync {
    fn charge(&self, cents: u64) -> String;
}

struct StripeGateway;

impl PaymentGateway for StripeGateway {
    fn charge(&self, cents: u64) -> String {
        format!("ch_{}", cents)
    }
}

const PAYMENTS: MultiBondKey<dyn PaymentGateway> = MultiBondKey::new("payments");

// =============================================================================
// Widget resource
// =============================================================================

fn widgets(registry: &Registry) -> ResourceModule {
    let descriptor = ResourceDescriptor::new(
        "Widget",
        "widgets",
        ObjectSchema::new()
            .required("title", FieldKind::String)
            .optional("price", FieldKind::Integer),
    );

    let routes = vec![
        RouteDefinition::get("/widgets", "query"),
        RouteDefinition::post("/widgets", "create").with_middleware("auth"),
        RouteDefinition::get("/widgets/:id", "read"),
        RouteDefinition::patch("/widgets/:id", "update").with_middleware("auth"),
        RouteDefinition::delete("/widgets/:id", "delete").with_middleware("auth"),
        RouteDefinition::post("/widgets/:id/checkout", "checkout")
            .with_middleware("auth")
            .requires_bond(types::PAYMENTS),
    ];

    let registry = registry.clone();
    ResourceModule::new(descriptor, routes).handler(
        "checkout",
        handler_fn(move |_req: Request| {
            let registry = registry.clone();
            async move {
                let gateway = registry.require_named(&PAYMENTS, "stripe").map_err(KitError::from)?;
                Ok::<_, KitError>(Some(Response::ok(json!({ "charge": gateway.charge(1999) }))))
            }
        }),
    )
}

fn auth() -> Arc<dyn Middleware> {
    middleware_fn(|req: Request| async move {
        if req.headers.contains_key("authorization") {
            return Ok(ControlFlow::Continue(req));
        }
        Ok(ControlFlow::Break(Response::error(
            StatusCode::UNAUTHORIZED,
            "errors.unauthorized",
            "Unauthorized",
            &[],
        )))
    })
}

async fn call(table: &RouteTable, request: Request) -> KitResult<()> {
    let label = format!("{} {}", request.method, request.path);
    match table.dispatch(request).await? {
        Some(response) => println!("{:<28} -> {} {}", label, response.status, response.body),
        None => println!("{:<28} -> no route", label),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> KitResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Bondkit Widget Service ===\n");

    let registry = Registry::global().clone();
    registry.bond(&keys::DATABASE, Arc::new(MemoryStorage::new()));
    registry.bond(&keys::LOGGER, Arc::new(ConsoleLogger));
    if std::env::var_os("PAYMENTS").is_some() {
        registry.bond_named(&PAYMENTS, "stripe", Arc::new(StripeGateway));
    }
    println!("Bonded: {:?}\n", registry.bonded_types());

    let table = Application::builder(registry.clone())
        .config(EngineConfig::new().with_name("widgets").with_default_limit(20).verbose())
        .middleware("auth", auth())
        .resource(widgets(&registry))
        .build()?;

    println!("Routes:");
    for (method, path) in table.listing() {
        println!("  {:<7} {}", method, path);
    }
    println!();

    let authed = |method: Method, path: &str| {
        Request::new(method, path).with_header("authorization", "Bearer demo")
    };

    call(&table, authed(Method::POST, "/widgets").with_body(json!({}))).await?;
    call(&table, Request::new(Method::POST, "/widgets").with_body(json!({ "title": "x" }))).await?;
    call(&table, authed(Method::POST, "/widgets").with_body(json!({ "title": "Sprocket", "price": 1999 }))).await?;
    call(&table, authed(Method::POST, "/widgets").with_body(json!({ "title": "Flange", "price": 450 }))).await?;
    call(
        &table,
        Request::new(Method::GET, "/widgets")
            .with_body(json!({ "order_by": [{ "field": "price" }], "select": ["title", "price"] })),
    )
    .await?;
    call(&table, authed(Method::DELETE, "/widgets/nonexistent")).await?;
    call(&table, authed(Method::POST, "/widgets/w1/checkout")).await?;

    println!("\n=== Done ===");
    Ok(())
}
