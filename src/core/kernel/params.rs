//! Request parameters and required-field validation.
//!
//! Parameters keep insertion order and are serialized exactly once; the
//! resulting string is what gets signed and sent. Parameters built from a
//! request struct come out sorted by key.

use crate::core::errors::ExchangeError;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

/// Conversion into the exact string form placed on the wire.
pub trait ToParam {
    fn to_param(&self) -> String;
}

impl ToParam for str {
    fn to_param(&self) -> String {
        self.to_string()
    }
}

impl ToParam for String {
    fn to_param(&self) -> String {
        self.clone()
    }
}

impl<T: ToParam + ?Sized> ToParam for &T {
    fn to_param(&self) -> String {
        (**self).to_param()
    }
}

impl ToParam for bool {
    fn to_param(&self) -> String {
        String::from(if *self { "true" } else { "false" })
    }
}

impl ToParam for Decimal {
    fn to_param(&self) -> String {
        self.to_string()
    }
}

macro_rules! display_param {
    ($($ty:ty),+) => {
        $(impl ToParam for $ty {
            fn to_param(&self) -> String {
                self.to_string()
            }
        })+
    };
}

display_param!(u8, u16, u32, u64, usize, i32, i64);

/// Ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl ToParam) {
        self.pairs.push((key.to_string(), value.to_param()));
    }

    /// Push only when the value is present; `None` is omitted entirely.
    pub fn push_opt<V: ToParam>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl ToParam) -> Self {
        self.push(key, value);
        self
    }

    #[must_use]
    pub fn with_opt<V: ToParam>(mut self, key: &str, value: Option<V>) -> Self {
        self.push_opt(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// A key counts as present only with a non-empty value.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Url-form-encode the parameters in insertion order.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// Build parameters from a serde-serializable request struct.
    ///
    /// Null fields are skipped, booleans become `"true"`/`"false"`, strings
    /// are taken verbatim and nested arrays or objects are JSON-encoded.
    /// Keys are emitted in alphabetical order, not field order.
    pub fn from_serializable<T: Serialize + ?Sized>(request: &T) -> Result<Self, ExchangeError> {
        let value = serde_json::to_value(request)?;
        let Value::Object(map) = value else {
            return Err(ExchangeError::Serialization(
                "request parameters must serialize to an object".to_string(),
            ));
        };

        let mut params = Self::new();
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::String(s) => params.pairs.push((key, s)),
                Value::Bool(b) => params.push(&key, b),
                Value::Number(n) => params.pairs.push((key, n.to_string())),
                nested @ (Value::Array(_) | Value::Object(_)) => {
                    params.pairs.push((key, serde_json::to_string(&nested)?));
                }
            }
        }
        Ok(params)
    }

    /// [`Params::from_serializable`] followed by [`validate_required`].
    pub fn validated<T: Serialize + ?Sized>(
        request: &T,
        required: &[&str],
    ) -> Result<Self, ExchangeError> {
        let params = Self::from_serializable(request)?;
        validate_required(&params, required)?;
        Ok(params)
    }

    /// The parameters as a flat JSON object of strings, the shape batch
    /// endpoints expect for each entry.
    pub fn to_json_object(&self) -> Value {
        Value::Object(
            self.pairs
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Fail with a validation error naming every required key that is absent.
pub fn validate_required(params: &Params, required: &[&str]) -> Result<(), ExchangeError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !params.contains(name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExchangeError::missing_fields(missing))
    }
}

/// Fail unless at least one of `alternatives` is present.
pub fn require_one_of(params: &Params, alternatives: &[&str]) -> Result<(), ExchangeError> {
    if alternatives.iter().any(|name| params.contains(name)) {
        Ok(())
    } else {
        Err(ExchangeError::missing_fields([alternatives.join("/")]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        a: Option<u32>,
        b: Option<u32>,
        reduce_only: Option<bool>,
        price: Option<Decimal>,
    }

    #[test]
    fn undefined_values_are_omitted() {
        let params = Params::from_serializable(&Sample {
            a: Some(1),
            b: None,
            reduce_only: None,
            price: None,
        })
        .unwrap();

        assert_eq!(params.to_query_string(), "a=1");
        assert!(params.get("b").is_none());
    }

    #[test]
    fn booleans_serialize_as_literal_strings() {
        let params = Params::from_serializable(&Sample {
            a: None,
            b: None,
            reduce_only: Some(true),
            price: Some(Decimal::from_str("0.10").unwrap()),
        })
        .unwrap();

        assert_eq!(params.get("reduceOnly"), Some("true"));
        assert_eq!(params.get("price"), Some("0.10"));
        assert_eq!(Params::new().with("flag", false).to_query_string(), "flag=false");
    }

    #[test]
    fn builder_keeps_insertion_order() {
        let params = Params::new()
            .with("symbol", "BTCUSDT")
            .with_opt("limit", None::<u32>)
            .with("side", "BUY");
        assert_eq!(params.to_query_string(), "symbol=BTCUSDT&side=BUY");
    }

    #[test]
    fn struct_fields_come_out_sorted_by_key() {
        let params = Params::from_serializable(&Sample {
            a: Some(2),
            b: Some(1),
            reduce_only: Some(false),
            price: Some(Decimal::ONE),
        })
        .unwrap();
        assert_eq!(
            params.to_query_string(),
            "a=2&b=1&price=1&reduceOnly=false"
        );
    }

    #[test]
    fn nested_values_are_json_encoded() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Batch {
            batch_orders: Vec<std::collections::BTreeMap<&'static str, &'static str>>,
        }

        let mut order = std::collections::BTreeMap::new();
        order.insert("symbol", "BTCUSDT");
        let params = Params::from_serializable(&Batch {
            batch_orders: vec![order],
        })
        .unwrap();

        assert_eq!(params.get("batchOrders"), Some(r#"[{"symbol":"BTCUSDT"}]"#));
        assert_eq!(
            params.to_query_string(),
            "batchOrders=%5B%7B%22symbol%22%3A%22BTCUSDT%22%7D%5D"
        );
    }

    #[test]
    fn validation_names_all_missing_fields() {
        let params = Params::new().with("symbol", "BTCUSDT").with("side", "");
        let err = validate_required(&params, &["symbol", "side", "quantity"]).unwrap_err();
        match err {
            ExchangeError::Validation { fields } => assert_eq!(fields, vec!["side", "quantity"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn one_of_accepts_any_alternative() {
        let params = Params::new().with("origClientOrderId", "abc");
        assert!(require_one_of(&params, &["orderId", "origClientOrderId"]).is_ok());
        assert!(require_one_of(&Params::new(), &["orderId", "origClientOrderId"]).is_err());
    }
}
