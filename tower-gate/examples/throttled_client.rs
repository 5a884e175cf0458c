use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use gate_limit::LimiterConfig;
use http::Request;
use tokio::time::Instant;
use tokio::time::sleep;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower_gate::GateError;
use tower_gate::ServiceBuilderExt;

#[tokio::main]
async fn main() {
    // 1. Setup: 4 requests per second, status polls are free
    let config = LimiterConfig::new(4, Duration::from_secs(1))
        .with_exclusions(["/servers/*/status", "/network/"]);

    // 2. Define a "client" service standing in for a real HTTP client
    let client = ServiceBuilder::new()
        .throttle(config.into())
        .service_fn(|req: Request<()>| async move {
            sleep(Duration::from_millis(5)).await;
            Ok::<_, tower::BoxError>(format!("200 OK {}", req.uri()))
        });

    println!("🚀 Sending 10 requests plus 5 status polls through a 4/s throttle...\n");

    let start = Instant::now();
    let mut tasks = Vec::new();
    for i in 0..15 {
        let svc = client.clone();
        let path = if i % 3 == 0 {
            format!("/servers/{i}/status")
        } else {
            format!("/doodles/{i}")
        };
        tasks.push(tokio::spawn(async move {
            let req = Request::get(path).body(()).unwrap();
            let fut: Pin<Box<dyn Future<Output = Result<String, tower::BoxError>> + Send>> =
                Box::pin(svc.oneshot(req));
            match fut.await {
                Ok(resp) => println!("[{:>5.2?}] ✅ {resp}", start.elapsed()),
                Err(e) => match e.downcast_ref::<GateError>() {
                    Some(gate_err) => println!("[{i:03}] ❌ Gate Rejected: {gate_err}"),
                    None => println!("[{i:03}] 💥 Upstream Error: {e}"),
                },
            }
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    println!("\n🏁 All requests dispatched.");
}
