use std::sync::Arc;

use attrdi::{Component, Configuration, Lifetime, Manifest, ServiceCollection, TypeRef};
use pretty_assertions::assert_eq;

pub trait Mailer: Send + Sync {
    fn send(&self) -> String;
}

pub mod billing {
    use attrdi::{service, Component};

    #[service]
    #[derive(Component)]
    pub struct Invoices;
}

pub mod mail {
    use std::sync::Arc;

    use attrdi::{service, Component};

    use super::Mailer;

    #[service]
    #[derive(Component)]
    #[component(implements(dyn Mailer))]
    pub struct SmtpMailer;

    impl Mailer for SmtpMailer {
        fn send(&self) -> String {
            "smtp".into()
        }
    }

    #[derive(Component)]
    #[component(implements(dyn Mailer))]
    pub struct QueueMailer;

    impl Mailer for QueueMailer {
        fn send(&self) -> String {
            "queue".into()
        }
    }

    #[derive(Component)]
    #[component(implements(dyn Mailer))]
    pub struct RetryingMailer {
        #[inject]
        inner: Arc<dyn Mailer>,
    }

    impl Mailer for RetryingMailer {
        fn send(&self) -> String {
            format!("retry({})", self.inner.send())
        }
    }
}

pub mod overrides {
    use attrdi::{service, Component};

    use super::Mailer;

    #[service]
    #[derive(Component)]
    #[component(implements(dyn Mailer))]
    pub struct NullMailer;

    impl Mailer for NullMailer {
        fn send(&self) -> String {
            "null".into()
        }
    }
}

#[test]
fn filters_select_modules() {
    let provider = ServiceCollection::new()
        .add_attribute_based_di(&Configuration::empty(), |_| {}, &["manifest::bill*"])
        .unwrap()
        .build();

    assert!(provider.get::<billing::Invoices>().unwrap().is_some());
    assert!(provider.get::<dyn Mailer>().unwrap().is_none());
}

#[test]
fn later_filters_win_single_resolution() {
    let provider = ServiceCollection::new()
        .add_attribute_based_di(&Configuration::empty(), |_| {}, &["manifest::mail", "manifest::overrides"])
        .unwrap()
        .build();

    assert_eq!(provider.get_required::<dyn Mailer>().unwrap().send(), "null");
    let all: Vec<String> = provider
        .get_all::<dyn Mailer>()
        .unwrap()
        .iter()
        .map(|mailer| mailer.send())
        .collect();
    assert_eq!(all, vec!["smtp".to_string(), "null".to_string()]);
}

#[test]
fn configuration_declares_services_and_decorators() {
    let configuration = Configuration::from_toml_str(
        r#"
        [[registrations.services]]
        implementation = "QueueMailer"
        contract = "dyn Mailer"
        lifetime = "Singleton"
        key = "queue"

        [[registrations.decorators]]
        implementation = "RetryingMailer"
        key = "queue"
        "#,
    )
    .unwrap();

    let mut manifest = Manifest::discover();
    manifest.extend_from_configuration(&configuration, "registrations").unwrap();

    let provider = ServiceCollection::new()
        .add_attribute_based_di(
            &configuration,
            |options| {
                options.use_manifest(manifest);
            },
            &["manifest::mail"],
        )
        .unwrap()
        .build();

    let queue = provider.get_required_keyed::<dyn Mailer>("queue").unwrap();
    assert_eq!(queue.send(), "retry(queue)");
    assert!(Arc::ptr_eq(
        &queue,
        &provider.get_required_keyed::<dyn Mailer>("queue").unwrap()
    ));
    assert_eq!(provider.get_required::<dyn Mailer>().unwrap().send(), "smtp");

    let node = provider
        .graph()
        .services_of(&TypeRef::of::<dyn Mailer>())
        .iter()
        .find(|node| node.key() == Some("queue"))
        .unwrap();
    assert_eq!(node.lifetime(), Some(Lifetime::Singleton));
    assert_eq!(node.implementation_type(), Some(&TypeRef::of::<mail::QueueMailer>()));
}

#[test]
fn graph_serializes_by_contract() {
    let provider = ServiceCollection::new()
        .add_attribute_based_di(&Configuration::empty(), |_| {}, &["manifest::mail"])
        .unwrap()
        .build();

    let json = serde_json::to_value(provider.graph()).unwrap();
    let mailers = json["dyn Mailer"].as_array().unwrap();
    assert_eq!(mailers.len(), 1);
    assert_eq!(mailers[0]["implementation_type"], "SmtpMailer");
    assert_eq!(mailers[0]["lifetime"], "Transient");
}

#[test]
fn components_are_discovered_by_name() {
    let manifest = Manifest::discover();
    assert!(manifest.component_named("RetryingMailer").is_some());
    assert!(manifest.component_named("manifest::mail::QueueMailer").is_some());
    assert_eq!(
        manifest
            .component_named("Invoices")
            .map(|component| component.type_ref().clone()),
        Some(<billing::Invoices as Component>::component().type_ref().clone())
    );
}
