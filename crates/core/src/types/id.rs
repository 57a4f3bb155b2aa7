//! Newtype IDs for type-safe document references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different document types. IDs are strings of
//! the form `<prefix><sequence>` (e.g. `c1`, `p12`), matching the durable file
//! format.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `PREFIX` constant and `from_sequence()` for allocating new IDs
/// - `coerce()` for normalizing untrusted input into the canonical key
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use cartwire_core::define_id;
/// define_id!(OrderId, "o");
/// define_id!(InvoiceId, "i");
///
/// let order_id = OrderId::from_sequence(1);
/// assert_eq!(order_id.as_str(), "o1");
///
/// // These are different types, so this won't compile:
/// // let _: InvoiceId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix shared by every ID of this type.
            pub const PREFIX: &'static str = $prefix;

            /// Wrap an existing ID string as-is.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Build the ID for the given sequence number (`<prefix><n>`).
            #[must_use]
            pub fn from_sequence(n: usize) -> Self {
                Self(format!("{}{}", Self::PREFIX, n))
            }

            /// Coerce arbitrary input into the canonical string key.
            ///
            /// Surrounding whitespace is dropped, so `" c1 "` and `"c1"` name
            /// the same document. Numbers are formatted with `Display`.
            #[must_use]
            pub fn coerce(raw: impl ::core::fmt::Display) -> Self {
                Self(raw.to_string().trim().to_owned())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(CartId, "c");
define_id!(ProductId, "p");
