/// Marks types as leaf values so they can be used as fields of a
/// `#[derive(Env)]` struct.
///
/// A leaf is never traversed, its conversion from and to text must be
/// registered with a [`Registry`](crate::Registry).
///
/// ```rust
/// use env_loadr::{leaf_type, Registry};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Level(u8);
///
/// leaf_type!(Level);
///
/// let mut registry = Registry::default();
/// registry.register_with(
///     |v| Ok(Level(v.parse()?)),
///     |level: &Level| level.0.to_string(),
/// );
/// ```
#[macro_export]
macro_rules! leaf_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::EnvValue for $ty {
                fn env_ref(&self) -> $crate::ValueRef<'_> {
                    $crate::ValueRef::Leaf(self)
                }

                fn env_mut(&mut self) -> $crate::ValueMut<'_> {
                    $crate::ValueMut::Leaf(self)
                }
            }
        )+
    };
}
