//! SQL column types understood by the stream-processing service.
//!
//! Types are parsed from (and rendered back to) the exact spelling the API
//! returns, e.g. `DECIMAL(10, 2)`, `TIMESTAMP(3) WITH LOCAL TIME ZONE` or
//! `ARRAY<STRING> NOT NULL`. Parsing is case-sensitive because the API only
//! ever returns upper-case type names.
//!
//! Several spellings describe the same type (`STRING` is `VARCHAR(2147483647)`,
//! `DEC` and `NUMERIC` are `DECIMAL`, ...). Equality and hashing go through
//! [`FieldType::canonical`], so two synonymous types compare equal while still
//! rendering the way they were written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Length the service assigns to the unbounded `STRING` and `BYTES` types.
pub const MAX_LENGTH: u32 = 2_147_483_647;

const DEFAULT_PRECISION: u32 = 10;
const DEFAULT_SCALE: u32 = 0;

#[derive(Debug, Clone)]
pub enum FieldType {
    Char(u32),
    Varchar(u32),
    String,
    Binary(u32),
    Varbinary(u32),
    Bytes,
    Decimal { precision: u32, scale: u32 },
    Dec { precision: u32, scale: u32 },
    Numeric { precision: u32, scale: u32 },
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Date,
    Time(u32),
    Timestamp { precision: u32, timezone: bool },
    TimestampLocal(u32),
    /// `ARRAY<T>`
    Array(Box<FieldType>),
    /// `T ARRAY`
    TArray(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    Boolean,
    Interval,
    Multiset,
    NotNull(Box<FieldType>),
    PrimaryKey(Box<FieldType>),
}

#[derive(Debug, Error)]
#[error("type '{0}' not recognized")]
pub struct UnknownFieldType(pub String);

impl FieldType {
    /// Parse a type string, returning `None` when it is not a known type.
    pub fn parse(raw: &str) -> Option<FieldType> {
        let parsers: [fn(&str) -> Option<FieldType>; 8] = [
            Self::parse_not_null,
            Self::parse_string_type,
            Self::parse_binary_type,
            Self::parse_numeric_type,
            Self::parse_datetime_type,
            Self::parse_compound_type,
            Self::parse_keyword_type,
            Self::parse_primary_key,
        ];
        parsers.iter().find_map(|parse| parse(raw))
    }

    fn parse_not_null(raw: &str) -> Option<FieldType> {
        let inner = raw.strip_suffix(" NOT NULL")?;
        Some(FieldType::NotNull(Box::new(FieldType::parse(inner)?)))
    }

    fn parse_primary_key(raw: &str) -> Option<FieldType> {
        let inner = raw.strip_suffix(" PRIMARY KEY")?;
        Some(FieldType::PrimaryKey(Box::new(FieldType::parse(inner)?)))
    }

    fn parse_string_type(raw: &str) -> Option<FieldType> {
        if let Some(len) = sized(raw, "CHAR") {
            return Some(FieldType::Char(len));
        }
        if let Some(len) = sized(raw, "VARCHAR") {
            return Some(FieldType::Varchar(len));
        }
        (raw == "STRING").then_some(FieldType::String)
    }

    fn parse_binary_type(raw: &str) -> Option<FieldType> {
        if let Some(len) = sized(raw, "BINARY") {
            return Some(FieldType::Binary(len));
        }
        if let Some(len) = sized(raw, "VARBINARY") {
            return Some(FieldType::Varbinary(len));
        }
        (raw == "BYTES").then_some(FieldType::Bytes)
    }

    fn parse_numeric_type(raw: &str) -> Option<FieldType> {
        for keyword in ["DECIMAL", "DEC", "NUMERIC"] {
            let Some(rest) = raw.strip_prefix(keyword) else {
                continue;
            };
            let (precision, scale) = if rest.is_empty() {
                (DEFAULT_PRECISION, DEFAULT_SCALE)
            } else {
                let args = rest.strip_prefix('(')?.strip_suffix(')')?;
                match args.split_once(", ") {
                    Some((p, s)) => (digits(p)?, digits(s)?),
                    None => (digits(args)?, DEFAULT_SCALE),
                }
            };
            return match keyword {
                "DECIMAL" => Some(FieldType::Decimal { precision, scale }),
                "DEC" => Some(FieldType::Dec { precision, scale }),
                _ => Some(FieldType::Numeric { precision, scale }),
            };
        }
        match raw {
            "TINYINT" => Some(FieldType::TinyInt),
            "SMALLINT" => Some(FieldType::SmallInt),
            "INT" => Some(FieldType::Int),
            "BIGINT" => Some(FieldType::BigInt),
            "FLOAT" => Some(FieldType::Float),
            "DOUBLE" => Some(FieldType::Double),
            _ => None,
        }
    }

    fn parse_datetime_type(raw: &str) -> Option<FieldType> {
        if raw == "DATE" {
            return Some(FieldType::Date);
        }
        if let Some(precision) = sized(raw, "TIME") {
            return Some(FieldType::Time(precision));
        }
        if let Some(precision) = sized(raw, "TIMESTAMP_LTZ") {
            return Some(FieldType::TimestampLocal(precision));
        }
        let (head, zone) = raw.split_at(raw.find(')')? + 1);
        let precision = sized(head, "TIMESTAMP")?;
        match zone {
            "" | " WITHOUT TIME ZONE" => Some(FieldType::Timestamp {
                precision,
                timezone: false,
            }),
            " WITH TIME ZONE" => Some(FieldType::Timestamp {
                precision,
                timezone: true,
            }),
            " WITH LOCAL TIME ZONE" => Some(FieldType::TimestampLocal(precision)),
            _ => None,
        }
    }

    fn parse_compound_type(raw: &str) -> Option<FieldType> {
        if let Some(inner) = raw
            .strip_prefix("ARRAY<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            if let Some(t) = FieldType::parse(inner) {
                return Some(FieldType::Array(Box::new(t)));
            }
        }
        if let Some(inner) = raw.strip_suffix(" ARRAY") {
            if let Some(t) = FieldType::parse(inner) {
                return Some(FieldType::TArray(Box::new(t)));
            }
        }
        let body = raw.strip_prefix("MAP<")?.strip_suffix('>')?;
        // nested maps contain ", " too, so try every split point
        body.match_indices(", ").find_map(|(idx, _)| {
            let key = FieldType::parse(&body[..idx])?;
            let value = FieldType::parse(&body[idx + 2..])?;
            Some(FieldType::Map(Box::new(key), Box::new(value)))
        })
    }

    fn parse_keyword_type(raw: &str) -> Option<FieldType> {
        match raw {
            "BOOLEAN" => Some(FieldType::Boolean),
            "INTERVAL" => Some(FieldType::Interval),
            "MULTISET" => Some(FieldType::Multiset),
            _ => None,
        }
    }

    /// Collapse synonyms onto a single spelling.
    pub fn canonical(&self) -> FieldType {
        match self {
            FieldType::String => FieldType::Varchar(MAX_LENGTH),
            FieldType::Bytes => FieldType::Varbinary(MAX_LENGTH),
            FieldType::Dec { precision, scale } | FieldType::Numeric { precision, scale } => {
                FieldType::Decimal {
                    precision: *precision,
                    scale: *scale,
                }
            }
            FieldType::Double => FieldType::Float,
            FieldType::TimestampLocal(precision) => FieldType::Timestamp {
                precision: *precision,
                timezone: true,
            },
            FieldType::Array(inner) | FieldType::TArray(inner) => {
                FieldType::Array(Box::new(inner.canonical()))
            }
            FieldType::Map(k, v) => FieldType::Map(Box::new(k.canonical()), Box::new(v.canonical())),
            FieldType::NotNull(inner) => FieldType::NotNull(Box::new(inner.canonical())),
            FieldType::PrimaryKey(inner) => FieldType::PrimaryKey(Box::new(inner.canonical())),
            other => other.clone(),
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self, FieldType::PrimaryKey(_))
    }

    pub fn is_not_null(&self) -> bool {
        match self {
            FieldType::NotNull(_) => true,
            FieldType::PrimaryKey(inner) => inner.is_not_null(),
            _ => false,
        }
    }

    /// The type with any `PRIMARY KEY` marker removed.
    pub fn without_primary_key(&self) -> FieldType {
        match self {
            FieldType::PrimaryKey(inner) => inner.without_primary_key(),
            other => other.clone(),
        }
    }

    pub fn not_null(self) -> FieldType {
        if self.is_not_null() {
            self
        } else {
            FieldType::NotNull(Box::new(self))
        }
    }
}

fn digits(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// `NAME(<n>)`.
fn sized(raw: &str, name: &str) -> Option<u32> {
    digits(raw.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')?)
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Char(len) => write!(f, "CHAR({len})"),
            FieldType::Varchar(len) => write!(f, "VARCHAR({len})"),
            FieldType::String => f.write_str("STRING"),
            FieldType::Binary(len) => write!(f, "BINARY({len})"),
            FieldType::Varbinary(len) => write!(f, "VARBINARY({len})"),
            FieldType::Bytes => f.write_str("BYTES"),
            FieldType::Decimal { precision, scale } => write!(f, "DECIMAL({precision}, {scale})"),
            FieldType::Dec { precision, scale } => write!(f, "DEC({precision}, {scale})"),
            FieldType::Numeric { precision, scale } => write!(f, "NUMERIC({precision}, {scale})"),
            FieldType::TinyInt => f.write_str("TINYINT"),
            FieldType::SmallInt => f.write_str("SMALLINT"),
            FieldType::Int => f.write_str("INT"),
            FieldType::BigInt => f.write_str("BIGINT"),
            FieldType::Float => f.write_str("FLOAT"),
            FieldType::Double => f.write_str("DOUBLE"),
            FieldType::Date => f.write_str("DATE"),
            FieldType::Time(precision) => write!(f, "TIME({precision})"),
            FieldType::Timestamp {
                precision,
                timezone,
            } => {
                let clause = if *timezone { "WITH" } else { "WITHOUT" };
                write!(f, "TIMESTAMP({precision}) {clause} TIME ZONE")
            }
            FieldType::TimestampLocal(precision) => write!(f, "TIMESTAMP_LTZ({precision})"),
            FieldType::Array(inner) => write!(f, "ARRAY<{inner}>"),
            FieldType::TArray(inner) => write!(f, "{inner} ARRAY"),
            FieldType::Map(k, v) => write!(f, "MAP<{k}, {v}>"),
            FieldType::Boolean => f.write_str("BOOLEAN"),
            FieldType::Interval => f.write_str("INTERVAL"),
            FieldType::Multiset => f.write_str("MULTISET"),
            FieldType::NotNull(inner) => write!(f, "{inner} NOT NULL"),
            FieldType::PrimaryKey(inner) => write!(f, "{inner} PRIMARY KEY"),
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        self.canonical().to_string() == other.canonical().to_string()
    }
}

impl Eq for FieldType {}

impl Hash for FieldType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().to_string().hash(state);
    }
}

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::parse(s).ok_or_else(|| UnknownFieldType(s.to_string()))
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Option<FieldType> {
        FieldType::parse(raw)
    }

    #[test]
    fn concrete_types_from_str() {
        assert_eq!(parse("CHAR(15)"), Some(FieldType::Char(15)));
        assert_eq!(parse("CHAR()"), None);
        assert_eq!(parse("Char(10)"), None);
        assert_eq!(
            parse("TIMESTAMP(15) WITH TIME ZONE"),
            Some(FieldType::Timestamp {
                precision: 15,
                timezone: true
            })
        );
        assert_eq!(
            parse("TIMESTAMP(3) WITH LOCAL TIME ZONE"),
            Some(FieldType::TimestampLocal(3))
        );
    }

    #[test]
    fn dispatch_picks_the_right_variant() {
        assert_eq!(
            parse("DECIMAL"),
            Some(FieldType::Decimal {
                precision: 10,
                scale: 0
            })
        );
        assert_eq!(parse("STRING"), Some(FieldType::String));
        assert_eq!(
            parse("ARRAY<CHAR(1)>"),
            Some(FieldType::Array(Box::new(FieldType::Char(1))))
        );
        assert_eq!(parse("VARBINAR"), None);
        assert_eq!(
            parse("TIMESTAMP(3)"),
            Some(FieldType::Timestamp {
                precision: 3,
                timezone: false
            })
        );
    }

    #[test]
    fn decimal_defaults_are_equal() {
        let a = parse("DECIMAL").unwrap();
        let b = parse("DECIMAL(10)").unwrap();
        let c = parse("DECIMAL(10, 0)").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, a);
    }

    #[test]
    fn synonyms_compare_equal() {
        let decimal = |precision, scale| FieldType::Decimal { precision, scale };
        let numeric = |precision, scale| FieldType::Numeric { precision, scale };
        let dec = |precision, scale| FieldType::Dec { precision, scale };

        assert_eq!(decimal(10, 0), dec(10, 0));
        assert_eq!(numeric(15, 3), decimal(15, 3));
        assert_ne!(decimal(5, 1), numeric(3, 1));

        assert_eq!(FieldType::Varbinary(MAX_LENGTH), FieldType::Bytes);
        assert_ne!(FieldType::Varbinary(100), FieldType::Bytes);
        assert_eq!(FieldType::Varchar(MAX_LENGTH), FieldType::String);
        assert_eq!(FieldType::Float, FieldType::Double);

        let arr = |t: FieldType| FieldType::Array(Box::new(t));
        let tarr = |t: FieldType| FieldType::TArray(Box::new(t));
        assert_eq!(arr(decimal(10, 0)), tarr(decimal(10, 0)));
        assert_ne!(arr(decimal(10, 0)), tarr(FieldType::String));
        assert_eq!(arr(decimal(10, 0)), tarr(numeric(10, 0)));

        assert_eq!(
            FieldType::NotNull(Box::new(arr(dec(10, 0)))),
            FieldType::NotNull(Box::new(tarr(decimal(10, 0))))
        );
        assert_ne!(
            FieldType::NotNull(Box::new(arr(FieldType::String))),
            FieldType::NotNull(Box::new(arr(FieldType::Boolean)))
        );
        assert_ne!(FieldType::NotNull(Box::new(arr(FieldType::Bytes))), FieldType::Bytes);
    }

    #[test]
    fn local_timestamp_matches_with_time_zone_only() {
        let ltz = FieldType::TimestampLocal(3);
        assert_eq!(parse("TIMESTAMP(3) WITH TIME ZONE").unwrap(), ltz);
        assert_ne!(parse("TIMESTAMP(3) WITHOUT TIME ZONE").unwrap(), ltz);
    }

    #[test]
    fn modifiers_nest_and_render_back() {
        for raw in [
            "BIGINT NOT NULL",
            "STRING PRIMARY KEY",
            "INT NOT NULL PRIMARY KEY",
            "MAP<STRING, MAP<INT, BOOLEAN>>",
            "DECIMAL(12, 4) ARRAY",
        ] {
            let parsed = parse(raw).unwrap_or_else(|| panic!("{raw} should parse"));
            assert_eq!(parsed.to_string(), raw);
        }
    }

    #[test]
    fn primary_key_marker_can_be_stripped() {
        let t = parse("INT NOT NULL PRIMARY KEY").unwrap();
        assert!(t.is_primary_key());
        assert!(t.is_not_null());
        assert_eq!(t.without_primary_key().to_string(), "INT NOT NULL");
    }

    #[test]
    fn serde_uses_the_type_string() {
        let t: FieldType = serde_json::from_str("\"DOUBLE\"").unwrap();
        assert_eq!(t, FieldType::Double);
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"DOUBLE\"");
        assert!(serde_json::from_str::<FieldType>("\"double\"").is_err());
    }
}
