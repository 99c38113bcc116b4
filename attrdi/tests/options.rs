use std::sync::Arc;

use attrdi::{service, Component, Configuration, Options, ServiceCollection, ServiceConfiguration, ServiceProvider};
use pretty_assertions::assert_eq;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestOptions {
    pub option1: String,
    pub retries: u32,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            option1: "test123".into(),
            retries: 3,
        }
    }
}

impl ServiceConfiguration for TestOptions {
    const CONFIGURATION_PATH: Option<&'static str> = Some("AppSettings:Test");
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnboundOptions {
    pub option1: String,
}

impl Default for UnboundOptions {
    fn default() -> Self {
        Self {
            option1: "test123".into(),
        }
    }
}

impl ServiceConfiguration for UnboundOptions {
    const CONFIGURATION_PATH: Option<&'static str> = None;
}

#[service(options = TestOptions)]
#[derive(Component)]
pub struct OptionsConsumer {
    #[inject]
    options: Arc<Options<TestOptions>>,
}

#[service(options = TestOptions, key = "second")]
#[derive(Component)]
pub struct SecondConsumer {
    #[inject]
    options: Arc<Options<TestOptions>>,
}

#[service(options = UnboundOptions)]
#[derive(Component)]
pub struct UnboundConsumer {
    #[inject]
    options: Arc<Options<UnboundOptions>>,
}

fn provider(configuration: &Configuration) -> ServiceProvider {
    ServiceCollection::new()
        .add_attribute_based_di(configuration, |_| {}, &[module_path!()])
        .unwrap()
        .build()
}

#[test]
fn options_bind_from_their_section() {
    let configuration = Configuration::from_json_str(
        r#"{ "AppSettings": { "Test": { "option1": "test12345" } } }"#,
    )
    .unwrap();
    let provider = provider(&configuration);

    let consumer = provider.get_required::<OptionsConsumer>().unwrap();
    assert_eq!(consumer.options.option1, "test12345");
    assert_eq!(consumer.options.retries, 3);
}

#[test]
fn options_are_registered_once_per_type() {
    let provider = provider(&Configuration::empty());
    assert_eq!(provider.get_all::<Options<TestOptions>>().unwrap().len(), 1);

    let first = provider.get_required::<OptionsConsumer>().unwrap();
    let second = provider.get_required_keyed::<SecondConsumer>("second").unwrap();
    assert!(Arc::ptr_eq(&first.options, &second.options));
}

#[test]
fn missing_section_uses_defaults() {
    let provider = provider(&Configuration::empty());
    let consumer = provider.get_required::<OptionsConsumer>().unwrap();
    assert_eq!(consumer.options.option1, "test123");
}

#[test]
fn options_without_a_path_use_defaults() {
    let configuration = Configuration::from_json_str(r#"{ "option1": "ignored" }"#).unwrap();
    let provider = provider(&configuration);

    let consumer = provider.get_required::<UnboundConsumer>().unwrap();
    assert_eq!(consumer.options.value().option1, "test123");
}
