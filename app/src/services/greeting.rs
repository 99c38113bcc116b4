use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use attrdi::{decorator, service, Component, Options};

use super::settings::GreetingOptions;
use crate::features::Features;

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[service(lifetime = Singleton, options = GreetingOptions)]
#[derive(Component)]
#[component(implements(dyn Greeter))]
pub struct ConfiguredGreeter {
    #[inject]
    options: Arc<Options<GreetingOptions>>,
}

impl Greeter for ConfiguredGreeter {
    fn greet(&self, name: &str) -> String {
        format!("{}, {}", self.options.salutation, name)
    }
}

#[service(key = "formal")]
#[derive(Component)]
#[component(implements(dyn Greeter))]
pub struct FormalGreeter;

impl Greeter for FormalGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Good day, {}", name)
    }
}

#[service(key = "casual")]
#[derive(Component)]
#[component(implements(dyn Greeter))]
pub struct CasualGreeter;

impl Greeter for CasualGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hey {}", name)
    }
}

#[service(key = "beta-emoji", feature = Features::BETA)]
#[derive(Component)]
#[component(implements(dyn Greeter))]
pub struct EmojiGreeter;

impl Greeter for EmojiGreeter {
    fn greet(&self, name: &str) -> String {
        format!("👋 {}", name)
    }
}

/// Appends the configured punctuation to every unkeyed greeting
#[decorator(order = 1)]
#[derive(Component)]
#[component(implements(dyn Greeter))]
pub struct Punctuated {
    #[inject]
    inner: Arc<dyn Greeter>,
    #[inject]
    options: Arc<Options<GreetingOptions>>,
}

impl Greeter for Punctuated {
    fn greet(&self, name: &str) -> String {
        format!("{}{}", self.inner.greet(name), self.options.punctuation)
    }
}

/// Counts greetings of every keyed greeter
#[decorator(key = "*", order = 2, feature = Features::AUDIT)]
#[derive(Component)]
#[component(implements(dyn Greeter))]
pub struct CountingGreeter {
    #[inject]
    inner: Arc<dyn Greeter>,
    count: AtomicUsize,
}

impl Greeter for CountingGreeter {
    fn greet(&self, name: &str) -> String {
        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(count, "Greeting");
        self.inner.greet(name)
    }
}
