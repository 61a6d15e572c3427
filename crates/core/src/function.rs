//! Registered functions and their declared parameters.

mod error;

use std::fmt::{self, Debug, Display};
use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value, json};

pub use error::{Error as FunctionError, ErrorKind as FunctionErrorKind};

/// The result of calling a registered function.
pub type FunctionResult = Result<Value, FunctionError>;

type Callable = Box<dyn Fn(&Arguments) -> FunctionResult + Send + Sync>;

/// The type a parameter value is expected to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// A signed or unsigned integer.
    Integer,
    /// Any number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A string.
    String,
    /// Any JSON value.
    Json,
}

impl ParamType {
    /// Returns `true` if `value` satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::String => value.is_string(),
            ParamType::Json => true,
        }
    }

    /// Parses a piece of text typed by a human or produced by a model.
    pub fn parse(&self, text: &str) -> Result<Value, String> {
        let text = text.trim();
        match self {
            ParamType::Integer => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|err| format!("`{text}` is not an integer: {err}")),
            ParamType::Number => text
                .parse::<f64>()
                .ok()
                .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
                .ok_or_else(|| format!("`{text}` is not a finite number")),
            ParamType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" => Ok(Value::Bool(true)),
                "false" | "no" | "n" => Ok(Value::Bool(false)),
                _ => Err(format!("`{text}` is not a boolean")),
            },
            ParamType::String => Ok(Value::String(text.to_owned())),
            ParamType::Json => serde_json::from_str(text)
                .map_err(|err| format!("`{text}` is not valid JSON: {err}")),
        }
    }

    /// Returns the JSON schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::String => "string",
            ParamType::Json => "json",
        }
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared parameter of a function.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    name: String,
    ty: ParamType,
    default: Option<Value>,
    description: Option<String>,
}

impl Param {
    /// Creates a parameter without a default value.
    #[inline]
    pub fn required<S: Into<String>>(name: S, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            description: None,
        }
    }

    /// Creates a parameter with a default value.
    #[inline]
    pub fn with_default<S: Into<String>, V: Into<Value>>(
        name: S,
        ty: ParamType,
        default: V,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default.into()),
            description: None,
        }
    }

    /// Attaches a description, shown to whoever supplies the value.
    #[inline]
    pub fn described<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the parameter name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the expected type.
    #[inline]
    pub fn ty(&self) -> ParamType {
        self.ty
    }

    /// Returns the default value, if declared.
    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the description, if any.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A registered callable and its declared parameter list.
///
/// The callable is treated as an opaque, possibly side-effecting function.
/// It is called in-process, at most once per turn.
pub struct FunctionSpec {
    name: String,
    description: String,
    params: Vec<Param>,
    callable: Callable,
}

impl FunctionSpec {
    /// Creates a function with no parameters.
    pub fn new<S, F>(name: S, callable: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Arguments) -> FunctionResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            params: vec![],
            callable: Box::new(callable),
        }
    }

    /// Sets the description of the function.
    #[inline]
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Declares a parameter. Parameters are resolved in declaration order.
    #[inline]
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Returns the function name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the function description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared parameters.
    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Looks up a declared parameter by name.
    #[inline]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Returns the name of the first parameter declared more than once.
    pub(crate) fn duplicate_param(&self) -> Option<&str> {
        self.params.iter().enumerate().find_map(|(idx, param)| {
            self.params[..idx]
                .iter()
                .any(|p| p.name == param.name)
                .then_some(param.name.as_str())
        })
    }

    /// Returns a JSON schema describing the parameters.
    pub fn parameter_schema(&self) -> Value {
        let mut properties = Map::with_capacity(self.params.len());
        let mut required = vec![];
        for param in &self.params {
            let mut property = Map::new();
            if param.ty != ParamType::Json {
                property.insert("type".to_owned(), json!(param.ty.as_str()));
            }
            if let Some(description) = &param.description {
                property.insert("description".to_owned(), json!(description));
            }
            if let Some(default) = &param.default {
                property.insert("default".to_owned(), default.clone());
            } else {
                required.push(json!(param.name));
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Calls the function with fully bound arguments.
    ///
    /// A panic inside the callable is reported as an error instead of
    /// unwinding into the chat.
    pub fn call(&self, arguments: &Arguments) -> FunctionResult {
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| (self.callable)(arguments)));
        match result {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                Err(FunctionError::panicked().with_reason(reason))
            }
        }
    }
}

impl Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Fully bound arguments handed to a function, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, Value)>,
}

impl Arguments {
    pub(crate) fn from_pairs(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// Returns the value bound to `name`.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    /// Returns the value bound to `name` as an `i64`.
    #[inline]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Returns the value bound to `name` as an `f64`.
    #[inline]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Returns the value bound to `name` as a `bool`.
    #[inline]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Returns the value bound to `name` as a string slice.
    #[inline]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Renders `name=value` pairs separated by commas.
impl Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.values.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_accept() {
        assert_eq!(ParamType::Integer.parse(" 5\n"), Ok(json!(5)));
        assert!(ParamType::Integer.parse("abc").is_err());
        assert!(ParamType::Integer.parse("1.5").is_err());
        assert_eq!(ParamType::Number.parse("1.5"), Ok(json!(1.5)));
        assert!(ParamType::Number.parse("NaN").is_err());
        assert_eq!(ParamType::Boolean.parse("Yes"), Ok(json!(true)));
        assert_eq!(ParamType::String.parse("abc"), Ok(json!("abc")));
        assert_eq!(ParamType::Json.parse("[1, 2]"), Ok(json!([1, 2])));

        assert!(ParamType::Integer.accepts(&json!(5)));
        assert!(!ParamType::Integer.accepts(&json!("5")));
        assert!(!ParamType::Integer.accepts(&json!(5.5)));
        assert!(ParamType::Number.accepts(&json!(5)));
        assert!(!ParamType::String.accepts(&json!(5)));
        assert!(ParamType::Json.accepts(&Value::Null));
    }

    #[test]
    fn test_parameter_schema() {
        let spec = FunctionSpec::new("add", |_| Ok(Value::Null))
            .with_param(Param::required("a", ParamType::Integer).described("lhs"))
            .with_param(Param::with_default("b", ParamType::Integer, 1))
            .with_param(Param::required("extra", ParamType::Json));
        assert_eq!(
            spec.parameter_schema(),
            json!({
                "type": "object",
                "properties": {
                    "a": { "type": "integer", "description": "lhs" },
                    "b": { "type": "integer", "default": 1 },
                    "extra": {},
                },
                "required": ["a", "extra"],
            })
        );
        assert_eq!(spec.duplicate_param(), None);

        let spec = spec.with_param(Param::required("a", ParamType::String));
        assert_eq!(spec.duplicate_param(), Some("a"));
    }

    #[test]
    fn test_call_catches_panic() {
        let spec = FunctionSpec::new("boom", |_| panic!("kaboom"));
        let err = spec.call(&Arguments::default()).unwrap_err();
        assert_eq!(err.kind(), FunctionErrorKind::Panicked);
        assert_eq!(err.reason(), "kaboom");
    }

    #[test]
    fn test_arguments_display() {
        let args = Arguments::from_pairs(vec![
            ("n".to_owned(), json!(5)),
            ("s".to_owned(), json!("x")),
            ("r".to_owned(), json!(0.5)),
            ("b".to_owned(), json!(true)),
        ]);
        assert_eq!(args.to_string(), r#"n=5, s="x", r=0.5, b=true"#);
        assert_eq!(args.len(), 4);
        assert_eq!(args.get_i64("n"), Some(5));
        assert_eq!(args.get_str("s"), Some("x"));
        assert_eq!(args.get_f64("r"), Some(0.5));
        assert_eq!(args.get_f64("n"), Some(5.0));
        assert_eq!(args.get_bool("b"), Some(true));
        assert_eq!(args.get_bool("s"), None);
        assert_eq!(args.get("missing"), None);
    }
}
