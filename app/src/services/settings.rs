use attrdi::ServiceConfiguration;
use serde::Deserialize;

/// `[Greeting]` section of `appsettings.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GreetingOptions {
    pub salutation: String,
    pub punctuation: String,
}

impl Default for GreetingOptions {
    fn default() -> Self {
        Self {
            salutation: "Hello".into(),
            punctuation: "!".into(),
        }
    }
}

impl ServiceConfiguration for GreetingOptions {
    const CONFIGURATION_PATH: Option<&'static str> = Some("Greeting");
}
