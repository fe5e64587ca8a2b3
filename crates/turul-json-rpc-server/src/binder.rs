//! Parameter binding: matches the params of a call against one candidate's
//! formal parameter list and coerces each argument to its formal type.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::descriptor::{IntWidth, MethodDescriptor, ParamType};
use crate::request::RequestParams;
use crate::service::Arguments;

/// Largest integer an f64 holds exactly.
const MAX_EXACT_FLOAT_INT: i128 = 1 << 53;

/// Coercion cost of a value that needed no conversion
pub const EXACT: u32 = 0;
/// Coercion cost of a numeric conversion (integer to float, integral float to integer)
pub const NUMERIC_CONVERSION: u32 = 1;
/// Coercion cost of landing in an untyped (`any`) slot
pub const UNTYPED: u32 = 2;

/// Why a candidate cannot take the supplied params
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("expected {expected} positional parameters, got {found}")]
    Arity { expected: String, found: usize },

    #[error("missing parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' expects {expected}, got {found}")]
    Type {
        name: String,
        expected: String,
        found: &'static str,
    },

    #[error("{0} parameters required but none were supplied")]
    NoParams(usize),
}

/// Arguments bound for one candidate, plus how well they fit
#[derive(Debug, Clone)]
pub struct Binding {
    pub arguments: Arguments,
    /// Named arguments the candidate has no parameter for
    pub unused: usize,
    /// Parameters filled from their default value
    pub defaulted: usize,
    /// Sum of per-argument coercion costs
    pub coercions: u32,
}

impl Binding {
    fn empty() -> Self {
        Self {
            arguments: Arguments::default(),
            unused: 0,
            defaulted: 0,
            coercions: EXACT,
        }
    }

    /// Ranking key; smaller is a better fit
    pub fn rank(&self) -> (usize, usize, u32) {
        (self.unused, self.defaulted, self.coercions)
    }
}

/// Bind `params` to `method`'s formal parameters.
pub fn bind(method: &MethodDescriptor, params: Option<&RequestParams>) -> Result<Binding, BindError> {
    match params {
        None if method.arity() == 0 => Ok(Binding::empty()),
        None => Err(BindError::NoParams(method.arity())),
        Some(RequestParams::Array(values)) => bind_positional(method, values),
        Some(RequestParams::Object(map)) => bind_named(method, map),
    }
}

fn bind_positional(method: &MethodDescriptor, values: &[Value]) -> Result<Binding, BindError> {
    let required = method.required_arity();
    let max = method.arity();
    if values.len() < required || values.len() > max {
        let expected = if required == max {
            max.to_string()
        } else {
            format!("{}..={}", required, max)
        };
        return Err(BindError::Arity {
            expected,
            found: values.len(),
        });
    }

    let mut binding = Binding::empty();
    for (index, param) in method.params.iter().enumerate() {
        let value = match values.get(index) {
            Some(raw) => {
                let (value, cost) = coerce(raw, &param.ty).ok_or_else(|| BindError::Type {
                    name: param.name.clone(),
                    expected: param.ty.to_string(),
                    found: json_kind(raw),
                })?;
                binding.coercions += cost;
                value
            }
            None => {
                binding.defaulted += 1;
                param
                    .default
                    .clone()
                    .ok_or_else(|| BindError::Missing(param.name.clone()))?
            }
        };
        binding.arguments.push(param.name.clone(), value);
    }
    Ok(binding)
}

fn bind_named(
    method: &MethodDescriptor,
    supplied: &HashMap<String, Value>,
) -> Result<Binding, BindError> {
    let mut binding = Binding::empty();
    binding.unused = supplied
        .keys()
        .filter(|key| !method.params.iter().any(|p| &p.name == *key))
        .count();
    for param in &method.params {
        let value = match supplied.get(&param.name) {
            Some(raw) => {
                let (value, cost) = coerce(raw, &param.ty).ok_or_else(|| BindError::Type {
                    name: param.name.clone(),
                    expected: param.ty.to_string(),
                    found: json_kind(raw),
                })?;
                binding.coercions += cost;
                value
            }
            None => match &param.default {
                Some(default) => {
                    binding.defaulted += 1;
                    default.clone()
                }
                None => return Err(BindError::Missing(param.name.clone())),
            },
        };
        binding.arguments.push(param.name.clone(), value);
    }
    Ok(binding)
}

/// Coerce `value` to `ty`.
///
/// Returns the converted value and its cost, or `None` when the value does
/// not fit without loss.
pub fn coerce(value: &Value, ty: &ParamType) -> Option<(Value, u32)> {
    match (ty, value) {
        (ParamType::Any, _) => Some((value.clone(), UNTYPED)),
        (ParamType::Nullable(_), Value::Null) => Some((Value::Null, EXACT)),
        (ParamType::Nullable(inner), _) => coerce(value, inner),
        (_, Value::Null) => None,
        (ParamType::Bool, Value::Bool(_)) => Some((value.clone(), EXACT)),
        (ParamType::Integer(width), Value::Number(n)) => coerce_integer(n, *width),
        (ParamType::Float, Value::Number(n)) => coerce_float(n),
        (ParamType::String, Value::String(_)) => Some((value.clone(), EXACT)),
        (ParamType::Enum(names), Value::String(s)) => names
            .iter()
            .any(|name| name == s)
            .then(|| (value.clone(), EXACT)),
        (ParamType::Array(item), Value::Array(values)) => {
            let mut cost = EXACT;
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                let (converted, c) = coerce(v, item)?;
                cost += c;
                out.push(converted);
            }
            Some((Value::Array(out), cost))
        }
        (ParamType::Object, Value::Object(_)) => Some((value.clone(), EXACT)),
        (ParamType::Struct(shape), _) => shape.accepts(value).then(|| (value.clone(), EXACT)),
        (ParamType::Map(item), Value::Object(entries)) => {
            let mut cost = EXACT;
            let mut out = Map::with_capacity(entries.len());
            for (key, v) in entries {
                let (converted, c) = coerce(v, item)?;
                cost += c;
                out.insert(key.clone(), converted);
            }
            Some((Value::Object(out), cost))
        }
        _ => None,
    }
}

fn coerce_integer(n: &Number, width: IntWidth) -> Option<(Value, u32)> {
    if let Some(i) = n.as_i64() {
        return width.contains(i as i128).then(|| (Value::from(i), EXACT));
    }
    if let Some(u) = n.as_u64() {
        return width.contains(u as i128).then(|| (Value::from(u), EXACT));
    }
    let f = n.as_f64()?;
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    let (min, max) = width.bounds();
    // `max + 1` is a power of two and therefore exact as f64.
    if f < min as f64 || f >= (max + 1) as f64 {
        return None;
    }
    let converted = if width.is_unsigned() {
        Value::from(f as u64)
    } else {
        Value::from(f as i64)
    };
    Some((converted, NUMERIC_CONVERSION))
}

fn coerce_float(n: &Number) -> Option<(Value, u32)> {
    let exact_int = n
        .as_i64()
        .map(|i| i as i128)
        .or_else(|| n.as_u64().map(|u| u as i128));
    match exact_int {
        Some(i) if i.abs() <= MAX_EXACT_FLOAT_INT => {
            Some((Value::from(i as f64), NUMERIC_CONVERSION))
        }
        Some(_) => None,
        None => Some((Value::Number(n.clone()), EXACT)),
    }
}

/// Short JSON type name used in mismatch messages
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamDescriptor, RpcType};
    use serde::Deserialize;
    use serde_json::json;

    fn method(params: Vec<ParamDescriptor>) -> MethodDescriptor {
        let mut method = MethodDescriptor::new("m");
        method.params = params;
        method
    }

    fn int(name: &str) -> ParamDescriptor {
        ParamDescriptor::new(name, i32::param_type())
    }

    fn positional(values: Vec<Value>) -> RequestParams {
        RequestParams::Array(values)
    }

    fn named(value: Value) -> RequestParams {
        let Value::Object(map) = value else {
            panic!("named params must be an object");
        };
        RequestParams::Object(map.into_iter().collect::<HashMap<_, _>>())
    }

    #[test]
    fn test_positional_exact_arity() {
        let m = method(vec![int("a"), int("b")]);
        let binding = bind(&m, Some(&positional(vec![json!(2), json!(3)]))).unwrap();

        assert_eq!(binding.arguments.values(), &[json!(2), json!(3)]);
        assert_eq!(binding.rank(), (0, 0, EXACT));
    }

    #[test]
    fn test_positional_arity_mismatch() {
        let m = method(vec![int("a"), int("b")]);
        let err = bind(&m, Some(&positional(vec![json!(2)]))).unwrap_err();
        assert_eq!(
            err,
            BindError::Arity {
                expected: "2".to_string(),
                found: 1
            }
        );

        let err = bind(&m, Some(&positional(vec![json!(1), json!(2), json!(3)]))).unwrap_err();
        assert!(matches!(err, BindError::Arity { found: 3, .. }));
    }

    #[test]
    fn test_positional_trailing_defaults() {
        let m = method(vec![
            int("a"),
            ParamDescriptor::new("b", i32::param_type()).with_default(json!(10)),
        ]);
        let binding = bind(&m, Some(&positional(vec![json!(1)]))).unwrap();

        assert_eq!(binding.arguments.values(), &[json!(1), json!(10)]);
        assert_eq!(binding.defaulted, 1);
    }

    #[test]
    fn test_named_ignores_extra_keys() {
        let m = method(vec![int("a"), int("b")]);
        let binding = bind(&m, Some(&named(json!({"b": 2, "a": 1, "c": 3})))).unwrap();

        assert_eq!(binding.arguments.values(), &[json!(1), json!(2)]);
        assert_eq!(binding.arguments.named::<i32>("b").unwrap(), 2);
        assert_eq!(binding.unused, 1);
        assert_eq!(binding.rank(), (1, 0, EXACT));
    }

    #[test]
    fn test_named_missing_parameter() {
        let m = method(vec![int("a"), int("b")]);
        let err = bind(&m, Some(&named(json!({"a": 1})))).unwrap_err();
        assert_eq!(err, BindError::Missing("b".to_string()));
    }

    #[test]
    fn test_absent_params_only_fit_zero_arity() {
        assert!(bind(&method(vec![]), None).is_ok());
        assert_eq!(
            bind(&method(vec![int("a")]), None).unwrap_err(),
            BindError::NoParams(1)
        );
    }

    #[test]
    fn test_null_only_fits_nullable_targets() {
        assert!(coerce(&json!(null), &ParamType::String).is_none());
        assert_eq!(
            coerce(&json!(null), &Option::<String>::param_type()),
            Some((Value::Null, EXACT))
        );
        assert_eq!(coerce(&json!(null), &ParamType::Any), Some((Value::Null, UNTYPED)));
    }

    #[test]
    fn test_integer_range_and_truncation() {
        assert!(coerce(&json!(300), &u8::param_type()).is_none());
        assert!(coerce(&json!(-1), &u32::param_type()).is_none());
        assert!(coerce(&json!(2.5), &i64::param_type()).is_none());
        assert_eq!(
            coerce(&json!(4.0), &i64::param_type()),
            Some((json!(4), NUMERIC_CONVERSION))
        );
        assert_eq!(
            coerce(&json!(u64::MAX), &u64::param_type()),
            Some((json!(u64::MAX), EXACT))
        );
        assert!(coerce(&json!(1e20), &i64::param_type()).is_none());
    }

    #[test]
    fn test_float_targets() {
        assert_eq!(coerce(&json!(1.5), &ParamType::Float), Some((json!(1.5), EXACT)));
        assert_eq!(
            coerce(&json!(2), &ParamType::Float),
            Some((json!(2.0), NUMERIC_CONVERSION))
        );
        assert!(coerce(&json!(i64::MAX), &ParamType::Float).is_none());
    }

    #[test]
    fn test_text_and_booleans() {
        let colors = ParamType::enumeration(["red", "green"]);
        assert!(coerce(&json!("red"), &colors).is_some());
        assert!(coerce(&json!("blue"), &colors).is_none());
        assert!(coerce(&json!(true), &ParamType::String).is_none());
        assert!(coerce(&json!("true"), &ParamType::Bool).is_none());
        assert!(coerce(&json!(1), &ParamType::Bool).is_none());
    }

    #[test]
    fn test_composite_targets_are_recursive() {
        let ints = Vec::<i64>::param_type();
        assert_eq!(
            coerce(&json!([1, 2.0, 3]), &ints),
            Some((json!([1, 2, 3]), NUMERIC_CONVERSION))
        );
        assert!(coerce(&json!([1, "two"]), &ints).is_none());

        let scores = HashMap::<String, f64>::param_type();
        assert_eq!(
            coerce(&json!({"a": 1.5}), &scores),
            Some((json!({"a": 1.5}), EXACT))
        );
        assert!(coerce(&json!({"a": "x"}), &scores).is_none());
        assert!(coerce(&json!([1]), &ParamType::Object).is_none());
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Point {
        x: f64,
        y: f64,
    }

    #[test]
    fn test_struct_targets_check_shape() {
        let point = ParamType::structure::<Point>();
        assert_eq!(
            coerce(&json!({"x": 1, "y": 2.5}), &point),
            Some((json!({"x": 1, "y": 2.5}), EXACT))
        );
        assert!(coerce(&json!({"r": 2}), &point).is_none());
        assert!(coerce(&json!({"x": "left", "y": 0}), &point).is_none());
        assert!(coerce(&json!(null), &point).is_none());

        let m = method(vec![ParamDescriptor::new("p", point)]);
        let err = bind(&m, Some(&positional(vec![json!({"r": 2})]))).unwrap_err();
        assert!(matches!(err, BindError::Type { found: "object", .. }));
    }

    #[test]
    fn test_type_mismatch_reports_parameter() {
        let m = method(vec![int("count")]);
        let err = bind(&m, Some(&positional(vec![json!("three")]))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "parameter 'count' expects i32, got string"
        );
    }
}
