//! # Collaborator Services
//!
//! Narrow traits for everything the engine reads or triggers outside the
//! order backend. Implementations live with the host application; the
//! in-memory reference implementation is in [`crate::memory`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use bistro_core::{Block, CatalogItem, City, GeoState, Order, OrderSnapshot, PaymentLink, PaymentMethod, Promo};

use crate::backend::{BackendResult, OrderBackend};

/// Catalog lookups.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches an item with its add-on groups.
    async fn fetch_item(&self, item_id: &str) -> BackendResult<CatalogItem>;
}

/// Promo code lookups.
#[async_trait]
pub trait PromoDirectory: Send + Sync {
    /// Finds a promo by its normalized code.
    async fn find_promo(&self, code: &str) -> BackendResult<Option<Promo>>;
}

/// Delivery geography.
#[async_trait]
pub trait GeographyService: Send + Sync {
    async fn fetch_state(&self, state_id: &str) -> BackendResult<GeoState>;

    async fn fetch_city(&self, city_id: &str) -> BackendResult<City>;

    async fn fetch_block(&self, block_id: &str) -> BackendResult<Block>;
}

/// Payment methods and online payment links.
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn list_methods(&self) -> BackendResult<Vec<PaymentMethod>>;

    /// Requests a link the customer follows to pay a completed order.
    async fn create_payment_link(
        &self,
        order: &Order,
        method: &PaymentMethod,
    ) -> BackendResult<PaymentLink>;
}

/// Ticket printing.
#[async_trait]
pub trait PrintService: Send + Sync {
    async fn print_order(&self, snapshot: &OrderSnapshot) -> BackendResult<()>;
}

/// Names a collaborator in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Orders,
    Catalog,
    Promos,
    Geography,
    Payments,
    Printer,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Orders => write!(f, "order service"),
            Service::Catalog => write!(f, "catalog service"),
            Service::Promos => write!(f, "promo directory"),
            Service::Geography => write!(f, "geography service"),
            Service::Payments => write!(f, "payment service"),
            Service::Printer => write!(f, "print service"),
        }
    }
}

/// The full set of collaborators an engine is wired to.
#[derive(Clone)]
pub struct Services {
    pub orders: Arc<dyn OrderBackend>,
    pub catalog: Arc<dyn CatalogService>,
    pub promos: Arc<dyn PromoDirectory>,
    pub geography: Arc<dyn GeographyService>,
    pub payments: Arc<dyn PaymentService>,
    pub printer: Arc<dyn PrintService>,
}

impl Services {
    /// Wires every collaborator to one object implementing all of them.
    pub fn from_shared<T>(backend: Arc<T>) -> Self
    where
        T: OrderBackend
            + CatalogService
            + PromoDirectory
            + GeographyService
            + PaymentService
            + PrintService
            + 'static,
    {
        Services {
            orders: backend.clone(),
            catalog: backend.clone(),
            promos: backend.clone(),
            geography: backend.clone(),
            payments: backend.clone(),
            printer: backend,
        }
    }
}
