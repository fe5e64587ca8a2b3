//! Method descriptors: the registration-time description of what a service
//! method accepts and returns.

use std::any::{self, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Width of an integer parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    /// Inclusive bounds of the width
    pub fn bounds(self) -> (i128, i128) {
        match self {
            IntWidth::I8 => (i8::MIN as i128, i8::MAX as i128),
            IntWidth::I16 => (i16::MIN as i128, i16::MAX as i128),
            IntWidth::I32 => (i32::MIN as i128, i32::MAX as i128),
            IntWidth::I64 => (i64::MIN as i128, i64::MAX as i128),
            IntWidth::U8 => (0, u8::MAX as i128),
            IntWidth::U16 => (0, u16::MAX as i128),
            IntWidth::U32 => (0, u32::MAX as i128),
            IntWidth::U64 => (0, u64::MAX as i128),
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            IntWidth::U8 | IntWidth::U16 | IntWidth::U32 | IntWidth::U64
        )
    }

    pub fn contains(self, n: i128) -> bool {
        let (min, max) = self.bounds();
        (min..=max).contains(&n)
    }

    fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
        }
    }
}

/// Formal type of a parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Any JSON value, including `null`
    Any,
    Bool,
    Integer(IntWidth),
    Float,
    String,
    /// Text matching one of the listed names
    Enum(Vec<String>),
    Array(Box<ParamType>),
    /// Any JSON object
    Object,
    /// Value that must deserialize into one Rust type
    Struct(StructShape),
    /// Object whose values all share one type
    Map(Box<ParamType>),
    /// `null` or the inner type
    Nullable(Box<ParamType>),
}

impl ParamType {
    pub fn array(item: ParamType) -> Self {
        ParamType::Array(Box::new(item))
    }

    pub fn map(value: ParamType) -> Self {
        ParamType::Map(Box::new(value))
    }

    pub fn nullable(inner: ParamType) -> Self {
        match inner {
            ParamType::Nullable(_) | ParamType::Any => inner,
            other => ParamType::Nullable(Box::new(other)),
        }
    }

    /// Target checked against the fields of `T` while candidates are compared
    pub fn structure<T: DeserializeOwned + 'static>() -> Self {
        ParamType::Struct(StructShape::of::<T>())
    }

    pub fn enumeration<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamType::Enum(names.into_iter().map(Into::into).collect())
    }

    /// Whether `null` is an acceptable value
    pub fn accepts_null(&self) -> bool {
        matches!(self, ParamType::Any | ParamType::Nullable(_))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "any"),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Integer(width) => write!(f, "{}", width.name()),
            ParamType::Float => write!(f, "f64"),
            ParamType::String => write!(f, "string"),
            ParamType::Enum(names) => write!(f, "enum{{{}}}", names.join("|")),
            ParamType::Array(item) => write!(f, "array<{}>", item),
            ParamType::Object => write!(f, "object"),
            ParamType::Struct(shape) => write!(f, "{}", shape.name),
            ParamType::Map(value) => write!(f, "map<string, {}>", value),
            ParamType::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}

/// Structural check for a deserializable Rust type.
///
/// Shapes compare equal when they describe the same type.
#[derive(Clone, Copy)]
pub struct StructShape {
    type_id: TypeId,
    name: &'static str,
    check: fn(&Value) -> bool,
}

impl StructShape {
    pub fn of<T: DeserializeOwned + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(any::type_name::<T>()),
            check: |value| T::deserialize(value).is_ok(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `value` deserializes into the described type
    pub fn accepts(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for StructShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructShape").field(&self.name).finish()
    }
}

impl PartialEq for StructShape {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for StructShape {}

impl Hash for StructShape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

// `app::geo::Point` -> `Point`; generic names are kept whole.
fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

/// Rust types with a known parameter type
pub trait RpcType {
    fn param_type() -> ParamType;
}

macro_rules! rpc_integer {
    ($($ty:ty => $width:ident),* $(,)?) => {
        $(
            impl RpcType for $ty {
                fn param_type() -> ParamType {
                    ParamType::Integer(IntWidth::$width)
                }
            }
        )*
    };
}

rpc_integer!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
);

impl RpcType for bool {
    fn param_type() -> ParamType {
        ParamType::Bool
    }
}

impl RpcType for f64 {
    fn param_type() -> ParamType {
        ParamType::Float
    }
}

impl RpcType for String {
    fn param_type() -> ParamType {
        ParamType::String
    }
}

impl RpcType for Value {
    fn param_type() -> ParamType {
        ParamType::Any
    }
}

impl RpcType for serde_json::Map<String, Value> {
    fn param_type() -> ParamType {
        ParamType::Object
    }
}

impl<T: RpcType> RpcType for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::array(T::param_type())
    }
}

impl<T: RpcType> RpcType for Option<T> {
    fn param_type() -> ParamType {
        ParamType::nullable(T::param_type())
    }
}

impl<T: RpcType> RpcType for HashMap<String, T> {
    fn param_type() -> ParamType {
        ParamType::map(T::param_type())
    }
}

impl<T: RpcType> RpcType for BTreeMap<String, T> {
    fn param_type() -> ParamType {
        ParamType::map(T::param_type())
    }
}

/// One formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub ty: ParamType,
    /// Used when the caller omits the parameter
    pub default: Option<Value>,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Describes one invocable method. Several descriptors may share a name.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    /// `None` for methods that produce no value
    pub returns: Option<ParamType>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of leading parameters a positional call must supply.
    ///
    /// Only a trailing run of defaulted parameters may be omitted.
    pub fn required_arity(&self) -> usize {
        self.params
            .iter()
            .rposition(|p| p.default.is_none())
            .map_or(0, |last| last + 1)
    }

    /// Whether two descriptors accept exactly the same parameter types
    pub fn same_signature(&self, other: &MethodDescriptor) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}

impl AsRef<MethodDescriptor> for MethodDescriptor {
    fn as_ref(&self) -> &MethodDescriptor {
        self
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
            if param.default.is_some() {
                write!(f, " = ..")?;
            }
        }
        write!(f, ")")?;
        if let Some(returns) = &self.returns {
            write!(f, " -> {}", returns)?;
        }
        Ok(())
    }
}

/// Public view of an interface: its name and method table
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    /// Methods with the given name, in declaration order
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDescriptor> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}
