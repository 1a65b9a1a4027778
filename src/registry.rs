use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BoxError;
use crate::record::type_of;
use crate::value::Value;

/// Converts a raw value into the destination, which is guaranteed to be of
/// the registered type
pub type UnmarshalFn = Box<dyn Fn(&Value, &mut dyn Any) -> Result<(), BoxError> + Send + Sync>;

pub type MarshalFn = Box<dyn Fn(&dyn Any) -> Result<String, BoxError> + Send + Sync>;

/// Reports whether a value is the zero value of its type
pub type ZeroFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// Types that parse themselves from a raw value
pub trait UnmarshalEnv {
    fn unmarshal_env(&mut self, value: &Value) -> Result<(), BoxError>;
}

/// Types that format themselves as a raw value
pub trait MarshalEnv {
    fn marshal_env(&self) -> Result<String, BoxError>;
}

/// Conversions between raw values and field types, keyed by type
///
/// [`Registry::default`] knows about the scalar types of the standard
/// library, [`Registry::new`] starts out empty. Values are converted with
/// these rules:
///
/// - an empty value leaves a field unchanged,
/// - `Option<T>` fields are set to `Some` when a value is present,
/// - bools accept 1, t, T, TRUE, true, True and their false counterparts,
/// - durations use human readable notation like `1h 30m` or `250ms`.
///
/// Types with a zero check (numbers, strings, `None`, a zero duration) are
/// encoded as their tag's default when they hold their zero value.
///
/// Records with a registered conversion are treated as a single value and
/// are not traversed.
pub struct Registry {
    unmarshalers: HashMap<TypeId, UnmarshalFn>,
    marshalers: HashMap<TypeId, MarshalFn>,
    zero_checks: HashMap<TypeId, ZeroFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            unmarshalers: HashMap::new(),
            marshalers: HashMap::new(),
            zero_checks: HashMap::new(),
        }
    }

    pub fn register_unmarshal<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Any,
        F: Fn(&Value, &mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let unmarshal: UnmarshalFn = Box::new(move |value: &Value, dest: &mut dyn Any| {
            match dest.downcast_mut::<T>() {
                Some(dest) => f(value, dest),
                None => Err(type_mismatch::<T>()),
            }
        });
        self.unmarshalers.insert(TypeId::of::<T>(), unmarshal);
        self
    }

    pub fn register_marshal<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        let marshal: MarshalFn = Box::new(move |src: &dyn Any| match src.downcast_ref::<T>() {
            Some(src) => f(src),
            None => Err(type_mismatch::<T>()),
        });
        self.marshalers.insert(TypeId::of::<T>(), marshal);
        self
    }

    pub fn register_zero_check<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let is_zero: ZeroFn =
            Box::new(move |src: &dyn Any| src.downcast_ref::<T>().is_some_and(&f));
        self.zero_checks.insert(TypeId::of::<T>(), is_zero);
        self
    }

    /// Treats `T::default()` as the zero value of `T`
    pub fn register_zero<T>(&mut self) -> &mut Self
    where
        T: Any + Default + PartialEq,
    {
        self.register_zero_check::<T, _>(|v| *v == T::default())
    }

    /// Registers `T` and `Option<T>` with a parse and a format function.
    /// `None` is the zero value of `Option<T>`.
    pub fn register_with<T, P, F>(&mut self, parse: P, format: F) -> &mut Self
    where
        T: Any,
        P: Fn(&Value) -> Result<T, BoxError> + Clone + Send + Sync + 'static,
        F: Fn(&T) -> String + Clone + Send + Sync + 'static,
    {
        let parse_opt = parse.clone();
        let format_opt = format.clone();

        self.register_unmarshal::<T, _>(move |value, dest| {
            if !value.is_empty() {
                *dest = parse(value)?;
            }
            Ok(())
        })
        .register_marshal::<T, _>(move |src| Ok(format(src)))
        .register_unmarshal::<Option<T>, _>(move |value, dest| {
            if !value.is_empty() {
                *dest = Some(parse_opt(value)?);
            }
            Ok(())
        })
        .register_marshal::<Option<T>, _>(move |src| {
            Ok(src.as_ref().map(&format_opt).unwrap_or_default())
        })
        .register_zero_check::<Option<T>, _>(Option::is_none)
    }

    /// Registers `T` and `Option<T>` using their [`FromStr`] and
    /// [`Display`](fmt::Display) implementations
    pub fn register_from_str<T>(&mut self) -> &mut Self
    where
        T: FromStr + fmt::Display + Any,
        T::Err: Into<BoxError>,
    {
        self.register_with::<T, _, _>(|value| value.parse().map_err(Into::into), |v| v.to_string())
    }

    /// Registers a type that converts itself. Unlike the other conversions
    /// the type also receives empty values.
    pub fn register_env<T>(&mut self) -> &mut Self
    where
        T: UnmarshalEnv + MarshalEnv + Any,
    {
        self.register_unmarshal::<T, _>(|value, dest| dest.unmarshal_env(value))
            .register_marshal::<T, _>(|src| src.marshal_env())
    }

    pub fn can_unmarshal(&self, type_id: TypeId) -> bool {
        self.unmarshalers.contains_key(&type_id)
    }

    pub fn can_marshal(&self, type_id: TypeId) -> bool {
        self.marshalers.contains_key(&type_id)
    }

    pub fn unmarshaler(&self, type_id: TypeId) -> Option<&UnmarshalFn> {
        self.unmarshalers.get(&type_id)
    }

    pub fn marshaler(&self, type_id: TypeId) -> Option<&MarshalFn> {
        self.marshalers.get(&type_id)
    }

    /// Types without a zero check are never zero
    pub fn is_zero(&self, src: &dyn Any) -> bool {
        self.zero_checks
            .get(&type_of(src))
            .is_some_and(|is_zero| is_zero(src))
    }
}

fn type_mismatch<T>() -> BoxError {
    format!("value is not a `{}`", std::any::type_name::<T>()).into()
}

macro_rules! register_from_str {
    ($registry:expr, $($ty:ty),+ $(,)?) => {
        $( $registry.register_from_str::<$ty>(); )+
    };
}

macro_rules! register_zero {
    ($registry:expr, $($ty:ty),+ $(,)?) => {
        $( $registry.register_zero::<$ty>(); )+
    };
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::new();
        register_from_str!(
            registry, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
            char, String, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6,
            Value,
        );
        registry
            .register_with(|v| Ok(v.try_bool()?), |v: &bool| v.to_string())
            .register_with(
                |v| Ok(v.duration()?),
                |v: &Duration| humantime::format_duration(*v).to_string(),
            )
            .register_with(
                |v| Ok(PathBuf::from(v.as_str())),
                |v: &PathBuf| v.display().to_string(),
            );
        register_zero!(
            registry, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
            char, bool, String, PathBuf, Duration, Value,
        );
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("unmarshalers", &self.unmarshalers.len())
            .field("marshalers", &self.marshalers.len())
            .field("zero_checks", &self.zero_checks.len())
            .finish()
    }
}
