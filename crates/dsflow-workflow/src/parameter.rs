//! Typed task parameters.
//!
//! A parameter is a `(name, direction, type, value)` record. The wire type is
//! either given explicitly through [`DataType::convert`] or inferred from the
//! host value: booleans become `BOOLEAN`, integers `INTEGER`, floats `FLOAT`,
//! strings `VARCHAR` and a missing value an empty `VARCHAR`. Lists and maps
//! carry no implicit type and must be wrapped explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// Closed set of wire types understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Varchar,
    Long,
    Integer,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    Boolean,
    List,
    File,
}

/// Whether a parameter flows into or out of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

/// A host value before type inference.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamValue {
    /// Absent value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Value already wrapped in an explicit wire type.
    Typed(TypedValue),
    /// Structured value (list or map) with no implicit wire type.
    Json(Value),
}

impl ParamValue {
    /// Infers the wire type of this value.
    ///
    /// Fails for structured values that were not wrapped explicitly.
    pub fn infer(self) -> Result<TypedValue> {
        let data_type = match self {
            Self::Typed(typed) => return Ok(typed),
            Self::Json(value) => {
                return Err(Error::parameter(format!(
                    "Can not infer parameter type for value {value}, wrap it in an explicit data type"
                )));
            }
            Self::Bool(_) => DataType::Boolean,
            Self::Int(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::Str(_) | Self::Null => DataType::Varchar,
        };

        data_type.convert(self)
    }

    /// Returns the value as plain JSON, without any conversion.
    pub fn to_raw_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Int(value) => Value::from(*value),
            Self::Float(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
            Self::Str(value) => Value::String(value.clone()),
            Self::Typed(typed) => typed.value.clone(),
            Self::Json(value) => value.clone(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(value) => value.is_empty(),
            _ => false,
        }
    }
}

macro_rules! impl_from_param {
    ($variant:ident: $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::$variant($conv(value))
                }
            }
        )+
    };
}

impl_from_param!(Bool: bool => std::convert::identity);
impl_from_param!(Int: i8 => i64::from, i16 => i64::from, i32 => i64::from, i64 => std::convert::identity, u8 => i64::from, u16 => i64::from, u32 => i64::from);
impl_from_param!(Float: f32 => f64::from, f64 => std::convert::identity);
impl_from_param!(Str: String => std::convert::identity, &str => str::to_owned);

impl From<TypedValue> for ParamValue {
    fn from(value: TypedValue) -> Self {
        Self::Typed(value)
    }
}

impl<T> From<Option<T>> for ParamValue
where
    T: Into<ParamValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(value) => Self::Int(value),
                None => Self::Float(number.as_f64().unwrap_or_default()),
            },
            Value::String(value) => Self::Str(value),
            structured => Self::Json(structured),
        }
    }
}

/// A value wrapped in an explicit wire type.
///
/// Two typed values are equal when both the type and the converted value
/// are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: Value,
}

impl DataType {
    /// Wraps `raw` in this type, converting it to the type's wire form.
    ///
    /// A missing value or an empty string always converts to `""`.
    pub fn convert(self, raw: impl Into<ParamValue>) -> Result<TypedValue> {
        let raw = match raw.into() {
            ParamValue::Typed(typed) => ParamValue::from(typed.value),
            raw => raw,
        };

        let value = if raw.is_blank() {
            Value::String(String::new())
        } else {
            match self {
                Self::Integer => Value::from(self.to_integer(&raw)?),
                Self::Float => {
                    let value = self.to_float(&raw)?;
                    Number::from_f64(value)
                        .map(Value::Number)
                        .ok_or_else(|| self.mismatch(&raw))?
                }
                Self::Boolean => Value::Bool(self.to_boolean(&raw)?),
                _ => Value::String(to_text(&raw)),
            }
        };

        Ok(TypedValue {
            data_type: self,
            value,
        })
    }

    fn mismatch(self, raw: &ParamValue) -> Error {
        Error::parameter(format!(
            "Can not convert value {} to parameter type {self}",
            raw.to_raw_json()
        ))
    }

    fn to_integer(self, raw: &ParamValue) -> Result<i64> {
        match raw {
            ParamValue::Int(value) => Ok(*value),
            ParamValue::Bool(value) => Ok(i64::from(*value)),
            ParamValue::Float(value) if value.is_finite() => Ok(value.trunc() as i64),
            ParamValue::Str(value) => value.trim().parse().map_err(|_| self.mismatch(raw)),
            _ => Err(self.mismatch(raw)),
        }
    }

    fn to_float(self, raw: &ParamValue) -> Result<f64> {
        match raw {
            ParamValue::Float(value) => Ok(*value),
            ParamValue::Int(value) => Ok(*value as f64),
            ParamValue::Bool(value) => Ok(f64::from(u8::from(*value))),
            ParamValue::Str(value) => value.trim().parse().map_err(|_| self.mismatch(raw)),
            _ => Err(self.mismatch(raw)),
        }
    }

    fn to_boolean(self, raw: &ParamValue) -> Result<bool> {
        match raw {
            ParamValue::Bool(value) => Ok(*value),
            ParamValue::Int(value) => Ok(*value != 0),
            ParamValue::Float(value) => Ok(*value != 0.0),
            ParamValue::Str(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.mismatch(raw)),
            },
            _ => Err(self.mismatch(raw)),
        }
    }
}

fn to_text(raw: &ParamValue) -> String {
    match raw {
        ParamValue::Null => String::new(),
        ParamValue::Bool(value) => value.to_string(),
        ParamValue::Int(value) => value.to_string(),
        ParamValue::Float(value) => format!("{value:?}"),
        ParamValue::Str(value) => value.clone(),
        ParamValue::Typed(typed) => typed.value.to_string(),
        ParamValue::Json(value) => value.to_string(),
    }
}

/// Serialized parameter record as expected by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub prop: String,
    pub direct: Direction,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: Value,
}

impl Parameter {
    /// Builds a record by inferring the type of `value`.
    pub fn new(
        prop: impl Into<String>,
        direct: Direction,
        value: impl Into<ParamValue>,
    ) -> Result<Self> {
        let typed = value.into().infer()?;
        Ok(Self {
            prop: prop.into(),
            direct,
            data_type: typed.data_type,
            value: typed.value,
        })
    }
}

/// Insertion-ordered parameter map.
///
/// Inserting an existing key overwrites the value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Serializes every entry with the given direction.
    pub fn to_parameters(&self, direction: Direction) -> Result<Vec<Parameter>> {
        self.iter()
            .map(|(name, value)| Parameter::new(name, direction, value.clone()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ParamMap
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Converts `(name, value)` pairs into parameter records, preserving order.
pub fn convert_params<I, K, V>(params: I, direction: Direction) -> Result<Vec<Parameter>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    params
        .into_iter()
        .map(|(name, value)| Parameter::new(name, direction, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_convert_params_preserves_order() {
        let params = convert_params([("a", ParamValue::from(1)), ("b", true.into())], Direction::In)
            .expect("convert");

        let value = serde_json::to_value(&params).expect("encode");
        assert_eq!(
            value,
            json!([
                {"prop": "a", "direct": "IN", "type": "INTEGER", "value": 1},
                {"prop": "b", "direct": "IN", "type": "BOOLEAN", "value": true},
            ])
        );
    }

    #[test]
    fn test_inference_table() {
        let cases = [
            (ParamValue::from(7), DataType::Integer, json!(7)),
            (ParamValue::from(1.5), DataType::Float, json!(1.5)),
            (ParamValue::from("abc"), DataType::Varchar, json!("abc")),
            (ParamValue::from(false), DataType::Boolean, json!(false)),
            (ParamValue::Null, DataType::Varchar, json!("")),
        ];

        for (raw, data_type, value) in cases {
            let typed = raw.infer().expect("infer");
            assert_eq!(typed.data_type, data_type);
            assert_eq!(typed.value, value);
        }
    }

    #[test]
    fn test_inferred_value_round_trips() {
        let values = [
            ParamValue::from(5),
            ParamValue::from(0.25),
            ParamValue::from("text"),
            ParamValue::from(true),
            ParamValue::Null,
        ];

        for raw in values {
            let inferred = raw.clone().infer().expect("infer");
            let wrapped = inferred.data_type.convert(raw).expect("convert");
            assert_eq!(wrapped, inferred);
        }
    }

    #[test]
    fn test_structured_values_need_explicit_type() {
        let error = ParamValue::from(json!([1, 2]))
            .infer()
            .expect_err("lists have no implicit type");
        assert_eq!(error.kind(), ErrorKind::Parameter);
        assert!(error.to_string().contains("Can not infer parameter type"));

        let error = Parameter::new("m", Direction::In, json!({"k": "v"}))
            .expect_err("maps have no implicit type");
        assert_eq!(error.kind(), ErrorKind::Parameter);

        let typed = DataType::List.convert(json!([1, 2])).expect("explicit list");
        assert_eq!(typed.value, json!("[1,2]"));
    }

    #[test]
    fn test_explicit_conversions() {
        assert_eq!(
            DataType::Integer.convert("123").expect("int").value,
            json!(123)
        );
        assert_eq!(DataType::Long.convert(123).expect("long").value, json!("123"));
        assert_eq!(
            DataType::Float.convert("1.25").expect("float").value,
            json!(1.25)
        );
        assert_eq!(
            DataType::Double.convert(1.0).expect("double").value,
            json!("1.0")
        );
        assert_eq!(
            DataType::Boolean.convert("TRUE").expect("bool").value,
            json!(true)
        );
        assert_eq!(
            DataType::Date.convert("2022-01-01").expect("date").value,
            json!("2022-01-01")
        );
        assert_eq!(DataType::File.convert(ParamValue::Null).expect("file").value, json!(""));
        assert_eq!(DataType::Integer.convert("").expect("blank").value, json!(""));
    }

    #[test]
    fn test_bad_explicit_conversion_fails() {
        let error = DataType::Integer
            .convert("twelve")
            .expect_err("not a number");
        assert_eq!(error.kind(), ErrorKind::Parameter);
        assert!(DataType::Boolean.convert("maybe").is_err());
    }

    #[test]
    fn test_typed_equality() {
        let a = DataType::Varchar.convert("x").expect("varchar");
        let b = DataType::Varchar.convert("x").expect("varchar");
        let c = DataType::Long.convert("x").expect("long");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(
            DataType::Varchar.convert(ParamValue::Null).expect("null"),
            DataType::Varchar.convert("").expect("empty")
        );
    }

    #[test]
    fn test_typed_value_is_not_reinferred() {
        let typed = DataType::Long.convert(10).expect("long");
        let parameter = Parameter::new("n", Direction::Out, typed).expect("param");
        assert_eq!(parameter.data_type, DataType::Long);
        assert_eq!(parameter.value, json!("10"));
    }

    #[test]
    fn test_param_map_overwrites_in_place() {
        let mut map = ParamMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", "one");

        let names: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&ParamValue::from("one")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::Timestamp.to_string(), "TIMESTAMP");
        assert_eq!("varchar".parse::<DataType>(), Ok(DataType::Varchar));
        assert_eq!(Direction::Out.as_ref(), "OUT");
    }
}
