//! Source loading integration tests
//!
//! - FIRST and MERGE load strategies
//! - Imports and descriptor defaults layered over sources
//! - Default classpath sources derived from the qualified name
//! - Source resolution failures

mod common;

use common::Fixture;
use rcprops::{
    Config, Error, LoadType, Loader, MethodDescriptor, PropertyStore, ResourcesPathResolver,
    Result,
};
use std::sync::Arc;
use url::Url;

// =============================================================================
// Load Strategies
// =============================================================================

#[test]
fn test_first_uses_first_readable_source() {
    let fx = Fixture::new();
    fx.write("second.properties", "name=second\nonly.second=yes\n");
    fx.write("third.properties", "name=third\n");

    let config = fx
        .builder("app::Config")
        .source(fx.spec("missing.properties"))
        .source(fx.spec("second.properties"))
        .source(fx.spec("third.properties"))
        .build()
        .unwrap();

    assert_eq!(config.get_property("name").unwrap().as_deref(), Some("second"));
    assert_eq!(config.get_property("only.second").unwrap().as_deref(), Some("yes"));
}

#[test]
fn test_merge_gives_earlier_sources_priority() {
    let fx = Fixture::new();
    fx.write("user.properties", "name=user\n");
    fx.write("system.properties", "name=system\nsystem.only=1\n");

    let config = fx
        .builder("app::Config")
        .source(fx.spec("user.properties"))
        .source(fx.spec("missing.properties"))
        .source(fx.spec("system.properties"))
        .load_type(LoadType::Merge)
        .build()
        .unwrap();

    assert_eq!(config.get_property("name").unwrap().as_deref(), Some("user"));
    assert_eq!(config.get_property("system.only").unwrap().as_deref(), Some("1"));
}

#[test]
fn test_no_readable_source_yields_empty_store() {
    let fx = Fixture::new();

    let config = fx
        .builder("app::Config")
        .source(fx.spec("nope.properties"))
        .build()
        .unwrap();

    assert!(config.property_names().is_empty());
}

#[test]
fn test_malformed_source_content_fails_build() {
    let fx = Fixture::new();
    fx.write("broken.json", "{ not json");

    let result = fx.builder("app::Config").source(fx.spec("broken.json")).build();

    assert!(result.is_err());
}

// =============================================================================
// Imports and Defaults
// =============================================================================

#[test]
fn test_imports_override_sources_and_first_import_wins() {
    let fx = Fixture::new();
    fx.write("app.properties", "a=file\nb=file\nc=file\n");

    let first: PropertyStore = [("a", "first")].into_iter().collect();
    let second: PropertyStore = [("a", "second"), ("b", "second")].into_iter().collect();

    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .import(first)
        .import(second)
        .build()
        .unwrap();

    assert_eq!(config.get_property("a").unwrap().as_deref(), Some("first"));
    assert_eq!(config.get_property("b").unwrap().as_deref(), Some("second"));
    assert_eq!(config.get_property("c").unwrap().as_deref(), Some("file"));
}

#[test]
fn test_defaults_only_fill_gaps() {
    let fx = Fixture::new();
    fx.write("app.properties", "port=9090\n");

    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .with_descriptor(MethodDescriptor::of::<u16>().key("port").default_value("80"))
        .with_descriptor(MethodDescriptor::string().key("host").default_value("localhost"))
        .build()
        .unwrap();

    assert_eq!(config.get_by_key::<u16>("port").unwrap(), Some(9090));
    assert_eq!(config.get_by_key::<String>("host").unwrap().as_deref(), Some("localhost"));
}

#[test]
fn test_default_keys_are_expanded_against_imports() {
    let fx = Fixture::new();
    let imports: PropertyStore = [("env", "prod")].into_iter().collect();

    let config = fx
        .builder("app::Config")
        .import(imports)
        .with_descriptor(MethodDescriptor::string().key("${env}.url").default_value("https://prod"))
        .build()
        .unwrap();

    assert_eq!(config.get_property("prod.url").unwrap().as_deref(), Some("https://prod"));
}

#[test]
fn test_grouped_descriptor_key() {
    let fx = Fixture::new();
    fx.write("app.properties", "server.port=7000\n");

    let method = MethodDescriptor::of::<u32>().in_group("server").key("port");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .with_descriptor(method.clone())
        .build()
        .unwrap();

    assert_eq!(config.get::<u32>(&method).unwrap(), Some(7000));
    assert_eq!(config.get_by_key::<u32>("server.port").unwrap(), Some(7000));
}

// =============================================================================
// Source Resolution
// =============================================================================

#[test]
fn test_default_sources_from_qualified_name() {
    let fx = Fixture::new();
    fx.write("my_app/Server.properties", "port=1234\n");

    let config = fx.builder("my_app::Server").build().unwrap();

    assert_eq!(config.get_property("port").unwrap().as_deref(), Some("1234"));
    assert_eq!(config.coordinator().sources().len(), 1);
}

#[cfg(feature = "json")]
#[test]
fn test_json_default_source_outranks_properties() {
    let fx = Fixture::new();
    fx.write("my_app/Server.properties", "origin=properties\n");
    fx.write("my_app/Server.json", r#"{"origin": "json"}"#);

    let config = fx.builder("my_app::Server").build().unwrap();

    assert_eq!(config.get_property("origin").unwrap().as_deref(), Some("json"));
}

#[test]
fn test_classpath_spec_with_variables() {
    let fx = Fixture::new();
    fx.write("conf/dev.properties", "mode=dev\n");

    let config = fx
        .builder("app::Config")
        .system_property("profile", "dev")
        .source("classpath:conf/${profile}.properties")
        .build()
        .unwrap();

    assert_eq!(config.get_property("mode").unwrap().as_deref(), Some("dev"));
}

#[test]
fn test_malformed_spec_fails_build() {
    let fx = Fixture::new();

    let result = fx.builder("app::Config").source("not a url").build();

    assert!(matches!(result, Err(Error::MalformedSource { .. })));
}

#[test]
fn test_resources_without_resolver() {
    let fx = Fixture::new();

    let result = fx.builder("app::Config").source("resources:app.properties").build();

    assert!(matches!(result, Err(Error::ResolverNotSet)));
}

#[test]
fn test_resources_resolver() {
    let fx = Fixture::new();
    fx.write("real/app.properties", "found=true\n");
    let base = fx.path("real");
    let resolver: Arc<dyn ResourcesPathResolver> = Arc::new(move |path: &str| {
        Some(common::file_spec(&base.join(path)))
    });

    let config = fx
        .builder("app::Config")
        .resources_resolver(resolver)
        .source("resources:app.properties")
        .build()
        .unwrap();

    assert_eq!(config.get_property("found").unwrap().as_deref(), Some("true"));
}

#[test]
fn test_unreadable_scheme_is_skipped() {
    let fx = Fixture::new();
    fx.write("fallback.properties", "from=fallback\n");

    let config = fx
        .builder("app::Config")
        .source("http://config.invalid/app.properties")
        .source(fx.spec("fallback.properties"))
        .build()
        .unwrap();

    assert_eq!(config.get_property("from").unwrap().as_deref(), Some("fallback"));
}

// =============================================================================
// Custom Loaders
// =============================================================================

struct KeyListLoader;

impl Loader for KeyListLoader {
    fn accept(&self, url: &Url) -> bool {
        url.path().ends_with(".keys")
    }

    fn load(&self, content: &str) -> Result<PropertyStore> {
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| (line.trim(), "true"))
            .collect())
    }

    fn default_spec(&self, _prefix: &str) -> Option<String> {
        None
    }
}

#[test]
fn test_custom_loader() {
    let fx = Fixture::new();
    fx.write("flags.keys", "alpha\nbeta\n");

    let config = fx
        .builder("app::Config")
        .register_loader(Arc::new(KeyListLoader))
        .source(fx.spec("flags.keys"))
        .build()
        .unwrap();

    assert_eq!(config.get_property("alpha").unwrap().as_deref(), Some("true"));
    assert_eq!(config.get_property("beta").unwrap().as_deref(), Some("true"));
}

#[test]
fn test_schema_type() {
    use rcprops::{ConfigSchema, descriptors};
    use std::collections::HashMap;

    struct Limits;

    impl ConfigSchema for Limits {
        fn descriptors() -> HashMap<String, MethodDescriptor> {
            descriptors! {
                "max.connections" => MethodDescriptor::of::<u32>().default_value("64"),
            }
        }

        fn qualified_name() -> String {
            "limits::Limits".into()
        }

        fn load_type() -> LoadType {
            LoadType::Merge
        }
    }

    let config = Config::from_schema::<Limits>().unwrap();

    assert_eq!(config.coordinator().load_type(), LoadType::Merge);
    assert_eq!(config.get_by_key::<u32>("max.connections").unwrap(), Some(64));
}
