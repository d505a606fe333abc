//! Console encoder: the regular pattern output followed by the record's
//! key-value pairs as ` key=value`, with credential-bearing keys masked.

use log::{
    Record,
    kv::{Error, Key, Value, VisitSource},
};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::encode::{Color, Encode, Style, Write};
use serde::Deserialize;

const DEFAULT_PATTERN: &str = "{d} {l} {t} {m}";

/// Keys whose values never reach the console verbatim.
const DEFAULT_REDACTED_KEYS: &[&str] = &["refresh_token", "access_token", "authorization"];

const REDACTED: &str = "<REDACTED>";

#[derive(Debug, Deserialize)]
pub struct KvConsoleEncoderConfig {
    pub pattern: Option<String>,
    /// Keys masked in addition to the built-in credential keys.
    #[serde(default)]
    pub redact: Vec<String>,
}

#[derive(Debug)]
pub struct KvConsoleEncoder {
    pattern: PatternEncoder,
    redacted_keys: Vec<String>,
}

impl KvConsoleEncoder {
    pub fn new(pattern: &str) -> Self {
        Self::with_redacted_keys(pattern, &[])
    }

    pub fn with_redacted_keys(pattern: &str, extra: &[String]) -> Self {
        let redacted_keys = DEFAULT_REDACTED_KEYS
            .iter()
            .map(|k| k.to_string())
            .chain(extra.iter().cloned())
            .collect();

        Self {
            pattern: PatternEncoder::new(pattern),
            redacted_keys,
        }
    }

    fn is_redacted(&self, key: &str) -> bool {
        self.redacted_keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}

impl Encode for KvConsoleEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        self.pattern.encode(w, record)?;

        let mut pairs = PairCollector::default();
        if let Err(e) = record.key_values().visit(&mut pairs) {
            pairs.0.push(("kv_error".to_string(), e.to_string()));
        }

        for (key, value) in &pairs.0 {
            w.set_style(Style::new().text(Color::Cyan))?;
            write!(w, " {}=", key)?;
            w.set_style(&Style::default())?;

            if self.is_redacted(key) {
                w.write_all(REDACTED.as_bytes())?;
            } else {
                w.write_all(value.as_bytes())?;
            }
        }

        w.write_all(b"\n")?;
        Ok(())
    }
}

/// Renders pairs up front so write errors surface from `encode` directly.
#[derive(Default)]
struct PairCollector(Vec<(String, String)>);

impl<'kvs> VisitSource<'kvs> for PairCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), Error> {
        self.0.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

pub struct KvConsoleEncoderDeserializer;

impl log4rs::config::Deserialize for KvConsoleEncoderDeserializer {
    type Trait = dyn Encode;
    type Config = KvConsoleEncoderConfig;

    fn deserialize(
        &self,
        config: KvConsoleEncoderConfig,
        _: &log4rs::config::Deserializers,
    ) -> anyhow::Result<Box<dyn Encode>> {
        let pattern = config.pattern.as_deref().unwrap_or(DEFAULT_PATTERN);
        Ok(Box::new(KvConsoleEncoder::with_redacted_keys(pattern, &config.redact)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log4rs::encode::writer::simple::SimpleWriter;

    fn encode(encoder: &KvConsoleEncoder, record: &Record) -> String {
        let mut buf = Vec::new();
        encoder.encode(&mut SimpleWriter(&mut buf), record).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn appends_key_values() {
        let kvs: &[(&str, u32)] = &[("attempt", 3)];
        let output = encode(
            &KvConsoleEncoder::new("{m}"),
            &Record::builder()
                .args(format_args!("Waking up vehicle"))
                .key_values(&kvs)
                .build(),
        );
        assert_eq!(output, "Waking up vehicle attempt=3\n");
    }

    #[test]
    fn redacts_secret_keys() {
        let kvs: &[(&str, &str)] = &[("refresh_token", "super-secret"), ("vehicle_id", "42")];
        let output = encode(
            &KvConsoleEncoder::new("{m}"),
            &Record::builder()
                .args(format_args!("Refreshing"))
                .key_values(&kvs)
                .build(),
        );
        assert_eq!(output, "Refreshing refresh_token=<REDACTED> vehicle_id=42\n");
    }

    #[test]
    fn configured_keys_are_redacted_too() {
        let kvs: &[(&str, &str)] = &[("vin", "5YJ3E1EA7KF000000")];
        let encoder = KvConsoleEncoder::with_redacted_keys("{m}", &["VIN".to_string()]);
        let output = encode(
            &encoder,
            &Record::builder()
                .args(format_args!("Vehicle data"))
                .key_values(&kvs)
                .build(),
        );
        assert_eq!(output, "Vehicle data vin=<REDACTED>\n");
    }
}
