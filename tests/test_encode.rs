use std::time::Duration;

use env_loadr::{marshal, unmarshal, Encoder, Env, Extractor, Reader};

#[derive(Env, Debug, Default, PartialEq)]
pub struct Database {
    #[env(default = "postgres://localhost/app")]
    pub url: String,
    pub password: Option<String>,
}

#[derive(Env, Debug, Default, PartialEq)]
pub struct Config {
    #[env("PORT,noprefix", default = 8080)]
    pub port: u16,
    pub debug: bool,
    pub greeting: String,
    pub timeout: Duration,
    pub database: Database,
    #[env("-")]
    pub skipped: String,
}

fn source() -> &'static str {
    "PORT=9090\n\
     DEBUG=true\n\
     GREETING=\"it's \\\"quoted\\\"\"\n\
     TIMEOUT=1m 30s\n\
     DATABASE_URL=postgres://db/app\n\
     DATABASE_PASSWORD='p#ss'\n"
}

#[test]
fn test_round_trip() {
    let mut config = Config::default();
    unmarshal(source(), &mut config).unwrap();

    assert_eq!(config.greeting, "it's \"quoted\"");
    assert_eq!(config.timeout, Duration::from_secs(90));
    assert_eq!(config.database.password.as_deref(), Some("p#ss"));

    let encoded = marshal(&config).unwrap();
    let original = Reader::from_text(source()).into_map().unwrap();
    let reencoded = Reader::from_text(encoded.as_str()).into_map().unwrap();
    assert_eq!(reencoded, original);

    let mut decoded = Config::default();
    unmarshal(&encoded, &mut decoded).unwrap();
    assert_eq!(decoded, config);
}

#[test]
fn test_template_uses_defaults() {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(&Config::default()).unwrap();

    let out = String::from_utf8(encoder.into_inner()).unwrap();
    assert_eq!(
        out,
        "PORT=8080\nDEBUG=\nGREETING=\nTIMEOUT=\nDATABASE_URL=postgres://localhost/app\nDATABASE_PASSWORD=\n"
    );
}

#[test]
fn test_take_values_falls_back_to_default() {
    let mut encoder = Encoder::new(Vec::new())
        .take_values(true)
        .export_prefix(true)
        .quote_values(false);
    encoder.encode(&Config::default()).unwrap();

    let out = String::from_utf8(encoder.into_inner()).unwrap();
    assert!(out.contains("export DATABASE_URL=postgres://localhost/app\n"));
    assert!(out.contains("export DATABASE_PASSWORD=\n"));
    assert!(out.contains("export PORT=8080\n"));
    assert!(out.contains("export DEBUG=\n"));
    assert!(out.contains("export TIMEOUT=\n"));
}

#[test]
fn test_zero_port_takes_default() {
    let config = Config {
        greeting: "hi".to_string(),
        ..Config::default()
    };

    let encoded = marshal(&config).unwrap();
    assert!(encoded.starts_with("PORT=8080\n"));
    assert!(encoded.contains("GREETING=hi\n"));

    let map = Extractor::new().extract(&config).unwrap();
    assert_eq!(map.get("PORT").unwrap().as_str(), "8080");
    assert_eq!(map.get("TIMEOUT").unwrap().as_str(), "");

    let mut decoded = Config::default();
    unmarshal(&encoded, &mut decoded).unwrap();
    assert_eq!(decoded.port, 8080);
}

#[test]
fn test_multiline_value_round_trip() {
    let config = Config {
        port: 1,
        greeting: "hello\nPORT=6666".to_string(),
        ..Config::default()
    };

    let encoded = marshal(&config).unwrap();
    let map = Reader::from_text(encoded.as_str()).into_map().unwrap();
    assert_eq!(map.get("PORT").unwrap().as_str(), "1");

    let mut decoded = Config::default();
    unmarshal(&encoded, &mut decoded).unwrap();
    assert_eq!(decoded.greeting, "hello\nPORT=6666");
    assert_eq!(decoded.port, 1);
}

#[test]
fn test_extract() {
    let mut config = Config::default();
    unmarshal(source(), &mut config).unwrap();

    let map = Extractor::new().extract(&config).unwrap();
    assert_eq!(map.len(), 6);
    assert_eq!(map.get("DATABASE_URL").unwrap().as_str(), "postgres://db/app");
    assert_eq!(map.get("DEBUG").unwrap().as_str(), "true");
    assert!(!map.contains_key("SKIPPED"));
}
