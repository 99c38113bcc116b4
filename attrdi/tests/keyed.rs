use std::sync::Arc;

use attrdi::{decorator, service, Component, Configuration, ServiceCollection, ServiceProvider};
use pretty_assertions::assert_eq;

pub trait Original: Send + Sync {
    fn describe(&self) -> String;
}

#[service(key = "test-original1")]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct OriginalService1;

impl Original for OriginalService1 {
    fn describe(&self) -> String {
        "original1".into()
    }
}

#[service(key = "test-original2", lifetime = Singleton)]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct OriginalService2;

impl Original for OriginalService2 {
    fn describe(&self) -> String {
        "original2".into()
    }
}

#[service(key = "other")]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct OtherService;

impl Original for OtherService {
    fn describe(&self) -> String {
        "other".into()
    }
}

#[service]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct UnkeyedService;

impl Original for UnkeyedService {
    fn describe(&self) -> String {
        "unkeyed".into()
    }
}

#[decorator(key = "test-*")]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct WildcardDecorator {
    #[inject]
    inner: Arc<dyn Original>,
}

impl Original for WildcardDecorator {
    fn describe(&self) -> String {
        format!("wildcard({})", self.inner.describe())
    }
}

#[decorator(key = "test-original2", order = 2)]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct ExactDecorator {
    #[inject]
    inner: Arc<dyn Original>,
}

impl Original for ExactDecorator {
    fn describe(&self) -> String {
        format!("exact({})", self.inner.describe())
    }
}

#[decorator(order = 3)]
#[derive(Component)]
#[component(implements(dyn Original))]
pub struct UnkeyedDecorator {
    #[inject]
    inner: Arc<dyn Original>,
}

impl Original for UnkeyedDecorator {
    fn describe(&self) -> String {
        format!("unkeyed({})", self.inner.describe())
    }
}

fn provider() -> ServiceProvider {
    ServiceCollection::new()
        .add_attribute_based_di(&Configuration::empty(), |_| {}, &[module_path!()])
        .unwrap()
        .build()
}

#[test]
fn wildcard_key_decorates_matching_registrations() {
    let provider = provider();
    let first = provider.get_required_keyed::<dyn Original>("test-original1").unwrap();
    assert_eq!(first.describe(), "wildcard(original1)");
}

#[test]
fn decorators_on_the_same_key_apply_in_order() {
    let provider = provider();
    let second = provider.get_required_keyed::<dyn Original>("test-original2").unwrap();
    assert_eq!(second.describe(), "exact(wildcard(original2))");
}

#[test]
fn non_matching_keys_are_left_alone() {
    let provider = provider();
    let other = provider.get_required_keyed::<dyn Original>("other").unwrap();
    assert_eq!(other.describe(), "other");
}

#[test]
fn unkeyed_decorator_skips_keyed_registrations() {
    let provider = provider();
    assert_eq!(provider.get_required::<dyn Original>().unwrap().describe(), "unkeyed(unkeyed)");
    assert_eq!(
        provider.get_all::<dyn Original>().unwrap().len(),
        1,
        "keyed registrations are not part of the unkeyed set"
    );
}

#[test]
fn decorated_registrations_keep_their_lifetime() {
    let provider = provider();
    let a = provider.get_required_keyed::<dyn Original>("test-original2").unwrap();
    let b = provider.get_required_keyed::<dyn Original>("test-original2").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let c = provider.get_required_keyed::<dyn Original>("test-original1").unwrap();
    let d = provider.get_required_keyed::<dyn Original>("test-original1").unwrap();
    assert!(!Arc::ptr_eq(&c, &d));
}

#[test]
fn graph_records_keyed_decoration() {
    let provider = provider();
    let contract = attrdi::TypeRef::of::<dyn Original>();
    let nodes = provider.graph().services_of(&contract);

    let decorators_of = |key: Option<&str>| -> Vec<String> {
        nodes
            .iter()
            .find(|node| node.key() == key)
            .map(|node| node.decorators().iter().map(|d| d.short_name()).collect())
            .unwrap_or_default()
    };

    assert_eq!(decorators_of(Some("test-original1")), vec!["WildcardDecorator".to_string()]);
    assert_eq!(
        decorators_of(Some("test-original2")),
        vec!["WildcardDecorator".to_string(), "ExactDecorator".to_string()]
    );
    assert!(decorators_of(Some("other")).is_empty());
    assert_eq!(decorators_of(None), vec!["UnkeyedDecorator".to_string()]);
}
