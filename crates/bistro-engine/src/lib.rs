//! # bistro-engine: Order Orchestration for Bistro POS
//!
//! Drives the order lifecycle of one terminal session against the
//! authoritative backend: opening tabs, editing lines, promos, table
//! occupancy and checkout.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Engine Architecture                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  OrderEngine (Facade)                            │  │
//! │  │                                                                  │  │
//! │  │  execute(Command) → Response                                     │  │
//! │  │  Hands every fresh snapshot back to the registry                 │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │   ┌──────────────┬────────────┼─────────────┬──────────────┐           │
//! │   ▼              ▼            ▼             ▼              ▼            │
//! │ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────┐   │
//! │ │ Registry │ │  Editor  │ │  Promo   │ │  Tables  │ │  Checkout    │   │
//! │ │          │ │          │ │  Engine  │ │          │ │  Coordinator │   │
//! │ └────┬─────┘ └────┬─────┘ └────┬─────┘ └────┬─────┘ └──────┬───────┘   │
//! │      └────────────┴────────────┼────────────┴──────────────┘           │
//! │                                ▼                                        │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Gateway: session check → timeout → error mapping → reprice      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               ▼                                         │
//! │   OrderBackend · Catalog · Promos · Geography · Payments · Printer     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - `OrderEngine` facade and command dispatch
//! - [`registry`] - Open orders and the current order view
//! - [`editor`] - Line add / quantity / remove
//! - [`promo`] - Promo apply / remove
//! - [`tables`] - Table assignment and release
//! - [`checkout`] - Order completion and side effects
//! - [`gateway`] - Collaborator calls and repricing
//! - [`backend`] / [`services`] - Collaborator traits
//! - [`memory`] - In-memory collaborators for demos and tests
//! - [`session`] - Session identity and invalidation signal
//! - [`command`] - Command / Response envelopes
//! - [`config`] - Engine configuration
//! - [`error`] - Engine error types

pub mod backend;
pub mod checkout;
pub mod command;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod promo;
pub mod registry;
pub mod services;
pub mod session;
pub mod tables;

pub use backend::{BackendError, BackendResult, OrderBackend};
pub use checkout::{CheckoutOutcome, SideEffect, SideEffectFailure};
pub use command::{Command, ErrorCode, ErrorPayload, Response};
pub use config::EngineConfig;
pub use engine::OrderEngine;
pub use error::{Conflict, EngineError, EngineResult};
pub use memory::InMemoryBackend;
pub use services::{CatalogService, GeographyService, PaymentService, PrintService, PromoDirectory, Services};
pub use session::{SessionContext, SessionGuard, SessionStatus};
