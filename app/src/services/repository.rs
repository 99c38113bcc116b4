use std::sync::Arc;

use attrdi::{decorator, service, Component};
use serde::Serialize;

pub trait Repository<T>: Send + Sync {
    fn all(&self) -> Vec<T>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: u32,
    pub total_cents: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub name: String,
}

#[service(lifetime = Singleton)]
#[derive(Component)]
#[component(implements(dyn Repository<Order>))]
pub struct OrderRepository;

impl Repository<Order> for OrderRepository {
    fn all(&self) -> Vec<Order> {
        vec![
            Order { id: 1, total_cents: 1_250 },
            Order { id: 2, total_cents: 9_900 },
        ]
    }
}

#[service(lifetime = Singleton)]
#[derive(Component)]
#[component(implements(dyn Repository<Customer>))]
pub struct CustomerRepository;

impl Repository<Customer> for CustomerRepository {
    fn all(&self) -> Vec<Customer> {
        vec![Customer { name: "Ada".into() }, Customer { name: "Grace".into() }]
    }
}

/// Logs every read of any repository
#[decorator(contract = dyn Repository<T>, open_generics_as_wildcard)]
#[derive(Component)]
#[component(implements(dyn Repository<T>))]
pub struct LoggedRepository<T> {
    #[inject]
    inner: Arc<dyn Repository<T>>,
}

impl<T: Send + Sync + 'static> Repository<T> for LoggedRepository<T> {
    fn all(&self) -> Vec<T> {
        let rows = self.inner.all();
        tracing::info!(rows = rows.len(), entity = std::any::type_name::<T>(), "Repository read");
        rows
    }
}

attrdi::close_generic!(LoggedRepository<Order>, LoggedRepository<Customer>);
