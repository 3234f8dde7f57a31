//! Newtype IDs for type-safe row references.
//!
//! Every table in the hosted backend uses a server-generated UUID primary key.
//! The `define_id!` macro creates wrappers that keep a medicine id from being
//! passed where a consultation id is expected.

/// Macro to define a type-safe UUID wrapper.
///
/// Creates a newtype wrapper around [`uuid::Uuid`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_uuid()`, `random()`
/// - `Display` and `FromStr` using the hyphenated form
///
/// # Example
///
/// ```rust
/// # use siddha_clinic_core::define_id;
/// define_id!(MedicineId);
/// define_id!(ServiceId);
///
/// let medicine = MedicineId::random();
/// let parsed: MedicineId = medicine.to_string().parse().unwrap();
/// assert_eq!(medicine, parsed);
///
/// // These are different types, so this won't compile:
/// // let _: ServiceId = medicine;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random (v4) id.
            #[must_use]
            pub fn random() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProfileId);
define_id!(SettingsId);
define_id!(MedicineId);
define_id!(ConsultationId);
define_id!(InquiryId);
define_id!(ServiceId);
define_id!(ContentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id: MedicineId = "7c9e6679-7425-40de-944b-e07fc1f90ae7".parse().unwrap();
        assert_eq!(id.to_string(), "7c9e6679-7425-40de-944b-e07fc1f90ae7");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<ConsultationId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = ServiceId::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: ServiceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
