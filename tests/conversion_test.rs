//! Typed reads through the full stack
//!
//! - `${...}` expansion in keys and values
//! - Arrays, collections and custom tokenizers
//! - Types registered through `FromStr`
//! - Custom converters

mod common;

use common::Fixture;
use rcprops::{
    Config, Converter, ConverterRef, Environment, Error, MethodDescriptor, PropertyValue, Result,
    TargetType, Tokenizer, TokenizerRef, Value,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Weak};

fn config_from(fx: &Fixture, content: &str) -> Config {
    fx.write("app.properties", content);
    fx.builder("app::Config")
        .source(fx.spec("app.properties"))
        .build()
        .unwrap()
}

// =============================================================================
// Expansion
// =============================================================================

#[test]
fn test_expansion_precedence() {
    let fx = Fixture::new();
    fx.write("app.properties", "name=from-file\nuser=${name}\nhome=${HOME_DIR}\nprofile=${mode}\n");

    let config = Config::builder("app::Config")
        .environment(
            Environment::empty()
                .with_var("name", "from-env")
                .with_var("HOME_DIR", "/home/test")
                .with_var("mode", "env-mode")
                .with_system_property("mode", "sys-mode"),
        )
        .source(fx.spec("app.properties"))
        .build()
        .unwrap();

    let read = |key: &str| {
        config
            .get::<String>(&MethodDescriptor::string().key(key))
            .unwrap()
            .unwrap()
    };
    assert_eq!(read("user"), "from-file");
    assert_eq!(read("home"), "/home/test");
    assert_eq!(read("profile"), "sys-mode");
}

#[test]
fn test_backslashes_survive_expansion() {
    let fx = Fixture::new();
    let config = config_from(&fx, "dir=C:\\\\Users\\\\${user}\nuser=test\n");

    let dir: Option<String> = config.get(&MethodDescriptor::string().key("dir")).unwrap();
    assert_eq!(dir.as_deref(), Some("C:\\Users\\test"));
}

#[test]
fn test_raw_property_is_not_expanded() {
    let fx = Fixture::new();
    let config = config_from(&fx, "greeting=hello ${who}\nwho=world\n");

    assert_eq!(
        config.get_property("greeting").unwrap().as_deref(),
        Some("hello ${who}")
    );
}

#[test]
fn test_cyclic_references_stay_literal() {
    let fx = Fixture::new();
    let config = config_from(&fx, "loop=a${loop}\na=${b}${b}\nb=${a}${a}\n");

    let value: Option<String> = config.get(&MethodDescriptor::string().key("loop")).unwrap();
    assert_eq!(value.as_deref(), Some("a${loop}"));

    let value: Option<String> = config.get(&MethodDescriptor::string().key("a")).unwrap();
    assert_eq!(value.as_deref(), Some("${a}${a}${a}${a}"));
}

// =============================================================================
// Arrays and Collections
// =============================================================================

#[test]
fn test_array_and_empty_array() {
    let fx = Fixture::new();
    let config = config_from(&fx, "numbers=1, 2, 3\nnone=\n");
    let numbers = MethodDescriptor::new(TargetType::array(TargetType::of::<i32>())).key("numbers");
    let none = MethodDescriptor::new(TargetType::array(TargetType::of::<i32>())).key("none");

    assert_eq!(config.get::<Vec<i32>>(&numbers).unwrap(), Some(vec![1, 2, 3]));
    assert_eq!(config.get::<Vec<i32>>(&none).unwrap(), Some(Vec::new()));
}

#[test]
fn test_sorted_set_of_strings() {
    let fx = Fixture::new();
    let config = config_from(&fx, "tags=b;a;c;a\n");
    let tags = MethodDescriptor::new(TargetType::sorted_set(TargetType::string()))
        .key("tags")
        .separator(";");

    let tags: Vec<String> = config.get(&tags).unwrap().unwrap();
    assert_eq!(tags, ["a", "b", "c"]);
}

#[test]
fn test_type_level_separator() {
    let fx = Fixture::new();
    let config = config_from(&fx, "hosts=a|b\n");
    let hosts = MethodDescriptor::new(TargetType::list(TargetType::string()))
        .key("hosts")
        .type_separator("|");

    let hosts: Vec<String> = config.get(&hosts).unwrap().unwrap();
    assert_eq!(hosts, ["a", "b"]);
}

#[derive(Default)]
struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

#[test]
fn test_custom_tokenizer() {
    let fx = Fixture::new();
    let config = config_from(&fx, "ports=80   443\t8080\n");
    let ports = MethodDescriptor::new(TargetType::array(TargetType::of::<u16>()))
        .key("ports")
        .tokenizer(TokenizerRef::of::<WhitespaceTokenizer>());

    assert_eq!(config.get::<Vec<u16>>(&ports).unwrap(), Some(vec![80, 443, 8080]));
}

#[test]
fn test_separator_and_tokenizer_on_same_level_fail() {
    let fx = Fixture::new();
    let config = config_from(&fx, "x=a,b\n");
    let method = MethodDescriptor::new(TargetType::array(TargetType::string()))
        .key("x")
        .separator(",")
        .tokenizer(TokenizerRef::of::<WhitespaceTokenizer>());

    assert!(matches!(
        config.value(&method),
        Err(Error::AmbiguousTokenizer { .. })
    ));
}

// =============================================================================
// Registered Types and Converters
// =============================================================================

#[derive(Debug, PartialEq)]
struct Version {
    major: u32,
    minor: u32,
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or("missing '.'")?;
        Ok(Self {
            major: major.parse().map_err(|_| "bad major")?,
            minor: minor.parse().map_err(|_| "bad minor")?,
        })
    }
}

#[test]
fn test_from_str_type() {
    let fx = Fixture::new();
    fx.write("app.properties", "version=2.7\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .register_types(|types| {
            types.register_from_str::<Version>();
        })
        .build()
        .unwrap();

    let version: Arc<Version> = config
        .get(&MethodDescriptor::of::<Version>().key("version"))
        .unwrap()
        .unwrap();
    assert_eq!(*version, Version { major: 2, minor: 7 });
}

#[test]
fn test_unconvertible_value() {
    let fx = Fixture::new();
    let config = config_from(&fx, "port=eighty\n");

    let err = config
        .get::<u16>(&MethodDescriptor::of::<u16>().key("port"))
        .unwrap_err();
    assert!(err.is_conversion_error());
}

#[test]
fn test_path_value() {
    let fx = Fixture::new();
    let config = config_from(&fx, "log=/var/log/${name}.log\nname=app\n");

    let path: Option<PathBuf> = config.get(&MethodDescriptor::new(TargetType::Path).key("log")).unwrap();
    assert_eq!(path, Some(PathBuf::from("/var/log/app.log")));
}

#[derive(Default)]
struct Doubler;

impl Converter for Doubler {
    fn convert(&self, _method: &MethodDescriptor, raw: &PropertyValue) -> Result<Option<Value>> {
        let Some(text) = raw.as_text() else {
            return Ok(None);
        };
        let n: i64 = text.parse().map_err(|_| Error::Parse(format!("'{text}' is not a number")))?;
        Ok(Some(Value::Int(n * 2)))
    }
}

#[test]
fn test_custom_converter_and_cache_key() {
    let fx = Fixture::new();
    let config = config_from(&fx, "n=21\n");
    let plain = MethodDescriptor::of::<i64>().key("n");
    let doubled = MethodDescriptor::of::<i64>()
        .key("n")
        .converter(ConverterRef::of::<Doubler>());

    assert_eq!(config.get::<i64>(&plain).unwrap(), Some(21));
    assert_eq!(config.get::<i64>(&doubled).unwrap(), Some(42));
    assert_eq!(config.coordinator().cached_values(), 2);
}

// =============================================================================
// Result Cache
// =============================================================================

#[test]
fn test_cached_values_respect_separator() {
    let fx = Fixture::new();
    let config = config_from(&fx, "hosts=a,b;c\n");
    let by_comma = MethodDescriptor::new(TargetType::array(TargetType::string())).key("hosts");
    let by_semicolon = by_comma.clone().separator(";");

    let first: Vec<String> = config.get(&by_comma).unwrap().unwrap();
    let second: Vec<String> = config.get(&by_semicolon).unwrap().unwrap();

    assert_eq!(first, ["a", "b;c"]);
    assert_eq!(second, ["a,b", "c"]);
    assert_eq!(config.coordinator().cached_values(), 2);
}

#[test]
fn test_cached_values_respect_expansion_flag() {
    let fx = Fixture::new();
    let config = config_from(&fx, "x=${y}\ny=Y\n");
    let expanded = MethodDescriptor::string().key("x");
    let raw = expanded.clone().no_variable_expansion();

    assert_eq!(config.get::<String>(&expanded).unwrap().as_deref(), Some("Y"));
    assert_eq!(config.get::<String>(&raw).unwrap().as_deref(), Some("${y}"));
}

/// Records every conversion back into the configuration
struct Auditing(Weak<Config>);

impl Converter for Auditing {
    fn convert(&self, _method: &MethodDescriptor, raw: &PropertyValue) -> Result<Option<Value>> {
        if let Some(config) = self.0.upgrade() {
            config.set_property("audit.last", raw.as_text().unwrap_or_default())?;
        }
        Ok(raw.as_text().map(|text| Value::Str(text.to_uppercase())))
    }
}

#[test]
fn test_converter_may_use_the_configuration() {
    let fx = Fixture::new();
    let config = Arc::new(config_from(&fx, "name=app\n"));
    let weak = Arc::downgrade(&config);
    let method = MethodDescriptor::string()
        .key("name")
        .converter(ConverterRef::new("auditing", move || {
            Ok(Box::new(Auditing(weak.clone())) as Box<dyn Converter>)
        }));

    assert_eq!(config.get::<String>(&method).unwrap().as_deref(), Some("APP"));
    assert_eq!(config.get_property("audit.last").unwrap().as_deref(), Some("app"));
    // The store changed while converting, so the result was not cached
    assert_eq!(config.coordinator().cached_values(), 0);
}
