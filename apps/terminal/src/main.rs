//! # Bistro Terminal
//!
//! Runs one terminal session against the in-memory collaborators.
//!
//! ## Usage
//! ```text
//! bistro-terminal          read one Command (JSON) per stdin line,
//!                          answer one Response (JSON) per stdout line
//! bistro-terminal demo     run a scripted session and print each step
//! ```
//!
//! Logs go to stderr. Set `RUST_LOG` to change the filter.

mod seed;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bistro_core::{CheckoutForm, DeliveryAddress, OrderType, SelectedAddon};
use bistro_engine::{Command, EngineConfig, OrderEngine, Response, Services, SessionContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = EngineConfig::load_or_default(None);
    let session = SessionContext::generate(config.terminal_id());
    info!(
        terminal = %config.terminal.name,
        terminal_id = %session.terminal_id,
        session_id = %session.session_id,
        "Starting terminal session"
    );

    let backend = Arc::new(seed::demo_backend());
    let engine = OrderEngine::new(&config, Services::from_shared(backend), session);

    let mut status = engine.subscribe_session();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow().clone();
            if !current.is_active() {
                warn!(status = ?current, "Session ended, operator must sign in again");
            }
        }
    });

    match std::env::args().nth(1).as_deref() {
        Some("demo") => run_demo(&engine).await?,
        _ => run_stdin(&engine).await?,
    }

    info!("Terminal session finished");
    Ok(())
}

/// Initializes tracing to stderr so stdout carries only responses.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bistro=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_stdin(engine: &OrderEngine) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Command>(line) {
            Ok(command) => engine.handle(command).await,
            Err(err) => {
                warn!(error = %err, "Unreadable command");
                Response::unreadable_command(err.to_string())
            }
        };
        println!("{}", serde_json::to_string(&response)?);
    }

    Ok(())
}

async fn run_demo(engine: &OrderEngine) -> Result<(), Box<dyn std::error::Error>> {
    let order_id = match step(engine, Command::StartOrder {
        order_type: Some(OrderType::Delivery),
    })
    .await?
    {
        Response::Order(order) => order.id,
        _ => return Ok(()),
    };

    let script = vec![
        Command::AddLine {
            order_id: order_id.clone(),
            item_id: "burger".to_string(),
            qty: 2,
            addons: vec![
                SelectedAddon::new("medium", "burger-doneness", 1),
                SelectedAddon::new("cheese", "burger-extras", 1),
            ],
        },
        Command::AddLine {
            order_id: order_id.clone(),
            item_id: "fries".to_string(),
            qty: 1,
            addons: vec![],
        },
        // Rejected: the burger needs a doneness.
        Command::AddLine {
            order_id: order_id.clone(),
            item_id: "burger".to_string(),
            qty: 1,
            addons: vec![],
        },
        Command::SetDeliveryCity {
            order_id: order_id.clone(),
            city_id: "downtown".to_string(),
        },
        Command::ApplyPromo {
            order_id: order_id.clone(),
            code: "save10".to_string(),
        },
        Command::CompleteOrder {
            order_id: order_id.clone(),
            form: CheckoutForm {
                payment_method: Some("online".to_string()),
                customer_name: Some("Walk-in".to_string()),
                address: DeliveryAddress {
                    state_id: Some("capital".to_string()),
                    city_id: Some("downtown".to_string()),
                    block_id: Some("block-4".to_string()),
                    street: "Harbor Rd 8".to_string(),
                    apartment: "3".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
        },
        Command::ListTables,
    ];

    for command in script {
        step(engine, command).await?;
    }

    Ok(())
}

async fn step(engine: &OrderEngine, command: Command) -> Result<Response, serde_json::Error> {
    println!("> {}", serde_json::to_string(&command)?);
    let response = engine.handle(command).await;
    println!("< {}", serde_json::to_string_pretty(&response)?);
    Ok(response)
}
