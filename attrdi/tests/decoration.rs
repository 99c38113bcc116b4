use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use attrdi::{
    decorator, service, Component, Configuration, DecoratorDeclaration, Error, Manifest, ServiceCollection,
    ServiceDeclaration, ServiceProvider, TypeRef,
};
use pretty_assertions::assert_eq;

pub trait Message: Send + Sync {
    fn text(&self) -> String;
}

#[service(key = "test2")]
#[derive(Component)]
#[component(implements(dyn Message))]
pub struct Hello;

impl Message for Hello {
    fn text(&self) -> String {
        "hello".into()
    }
}

// Declared before the lower order on purpose
#[decorator(key = "test2", order = 2)]
#[derive(Component)]
#[component(implements(dyn Message))]
pub struct Exclaim {
    #[inject]
    inner: Arc<dyn Message>,
}

impl Message for Exclaim {
    fn text(&self) -> String {
        format!("{}!", self.inner.text())
    }
}

#[decorator(key = "test2", order = 1)]
#[derive(Component)]
#[component(implements(dyn Message))]
pub struct Shout {
    #[inject]
    inner: Arc<dyn Message>,
}

impl Message for Shout {
    fn text(&self) -> String {
        self.inner.text().to_uppercase()
    }
}

#[service(lifetime = Singleton)]
#[derive(Component)]
pub struct Mailbox {
    #[inject(key = "test2")]
    message: Arc<dyn Message>,
}

#[service(lifetime = Singleton)]
#[decorator(contract = Counter)]
#[derive(Component)]
pub struct Counter {
    #[inject]
    inner: Option<Arc<Counter>>,
    hits: AtomicUsize,
}

impl Counter {
    fn hit(&self) -> usize {
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[service]
#[derive(Component)]
#[component(implements(dyn Clock))]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        1
    }
}

#[decorator]
#[derive(Component)]
#[component(implements(dyn Clock))]
pub struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> u64 {
        42
    }
}

#[derive(Component)]
pub struct Unattached;

fn provider() -> ServiceProvider {
    ServiceCollection::new()
        .add_attribute_based_di(&Configuration::empty(), |_| {}, &[module_path!()])
        .unwrap()
        .build()
}

#[test]
fn decorators_chain_by_ascending_order() {
    let provider = provider();
    let message = provider.get_required_keyed::<dyn Message>("test2").unwrap();
    assert_eq!(message.text(), "HELLO!");
}

#[test]
fn keyed_dependencies_receive_the_decorated_service() {
    let provider = provider();
    let mailbox = provider.get_required::<Mailbox>().unwrap();
    assert_eq!(mailbox.message.text(), "HELLO!");
}

#[test]
fn self_decoration_does_not_build_the_original() {
    let provider = provider();
    let counter = provider.get_required::<Counter>().unwrap();
    assert!(counter.inner.is_none());

    // still a singleton after decoration
    assert_eq!(counter.hit(), 1);
    assert_eq!(provider.get_required::<Counter>().unwrap().hit(), 2);
}

#[test]
fn decorator_without_inner_parameter_replaces_the_service() {
    let provider = provider();
    assert_eq!(provider.get_required::<dyn Clock>().unwrap().now(), 42);
}

#[test]
fn decorated_descriptor_reports_the_decorator_type() {
    let provider = provider();
    let descriptor = provider
        .descriptors()
        .iter()
        .find(|descriptor| descriptor.service_type() == &TypeRef::of::<dyn Clock>())
        .unwrap();
    assert_eq!(descriptor.implementation_type(), Some(&TypeRef::of::<FrozenClock>()));
}

#[test]
fn strict_decoration_rejects_unmatched_decorators() {
    let manifest = Manifest::new()
        .with_service(ServiceDeclaration::of::<Hello>())
        .with_decorator(DecoratorDeclaration::of::<Exclaim>().key("missing"));

    let error = ServiceCollection::new()
        .add_attribute_based_di(
            &Configuration::empty(),
            |options| {
                options.use_manifest(manifest.clone()).strict_decoration(true);
            },
            &[],
        )
        .unwrap_err();
    assert!(matches!(error, Error::Decoration { .. }), "{error}");

    let lenient = ServiceCollection::new()
        .add_attribute_based_di(
            &Configuration::empty(),
            |options| {
                options.use_manifest(manifest);
            },
            &[],
        )
        .unwrap()
        .build();
    assert_eq!(lenient.get_required::<dyn Message>().unwrap().text(), "hello");
}

#[test]
fn decorator_without_contract_is_a_configuration_error() {
    let manifest = Manifest::new().with_decorator(DecoratorDeclaration::of::<Unattached>());

    let error = ServiceCollection::new()
        .add_attribute_based_di(
            &Configuration::empty(),
            |options| {
                options.use_manifest(manifest);
            },
            &[],
        )
        .unwrap_err();
    assert!(matches!(error, Error::Configuration { .. }), "{error}");
}

#[test]
fn later_passes_decorate_earlier_registrations() {
    let mut summary = ServiceCollection::new()
        .add_attribute_based_di(
            &Configuration::empty(),
            |options| {
                options.use_manifest(Manifest::new().with_service(ServiceDeclaration::of::<Hello>()));
            },
            &[],
        )
        .unwrap();

    let mut options = attrdi::DiOptions::new();
    options.use_manifest(Manifest::new().with_decorator(DecoratorDeclaration::of::<Shout>()));
    summary.scan(&Configuration::empty(), &options, &[]).unwrap();

    let provider = summary.build();
    assert_eq!(provider.get_required::<dyn Message>().unwrap().text(), "HELLO");
}
