//! Status enums for clinic records.
//!
//! Statuses are stored as free text in the backend, so each enum has a closed
//! set of known values plus an `Other` fallback. Unknown values survive a
//! round-trip unchanged and render with the default badge instead of failing.

use serde::{Deserialize, Serialize};

/// Visual style of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeVariant {
    #[default]
    Default,
    Secondary,
    Outline,
    Destructive,
}

impl BadgeVariant {
    /// Stable lowercase name, used as a CSS modifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Secondary => "secondary",
            Self::Outline => "outline",
            Self::Destructive => "destructive",
        }
    }
}

/// Defines a text-backed status enum with an `Other(String)` fallback.
macro_rules! closed_status {
    (
        $(#[$meta:meta])*
        $name:ident (default $default:ident) {
            $($variant:ident => $text:literal, $badge:ident;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A value outside the known set, preserved verbatim.
            Other(String),
        }

        impl $name {
            /// Every known status, in display order.
            pub const KNOWN: &'static [Self] = &[$(Self::$variant),+];

            /// The stored text of this status.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Other(s) => s.as_str(),
                }
            }

            /// Badge style; unknown values get the default badge.
            #[must_use]
            pub const fn badge(&self) -> BadgeVariant {
                match self {
                    $(Self::$variant => BadgeVariant::$badge,)+
                    Self::Other(_) => BadgeVariant::Default,
                }
            }

            /// True when the value is one of the known statuses.
            #[must_use]
            pub const fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($text => Self::$variant,)+
                    _ => Self::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> Self {
                match status {
                    $name::Other(s) => s,
                    known => known.as_str().to_owned(),
                }
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(s.to_owned()))
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_status! {
    /// Lifecycle of a consultation request.
    ConsultationStatus (default New) {
        New => "New", Default;
        Contacted => "Contacted", Secondary;
        Completed => "Completed", Outline;
        Cancelled => "Cancelled", Destructive;
    }
}

closed_status! {
    /// Lifecycle of a medicine inquiry.
    InquiryStatus (default New) {
        New => "New", Default;
        Replied => "Replied", Secondary;
        Closed => "Closed", Outline;
    }
}

closed_status! {
    /// Stock availability of a catalog medicine.
    StockStatus (default Available) {
        Available => "Available", Default;
        Limited => "Limited", Secondary;
        OutOfStock => "Out of Stock", Destructive;
    }
}

/// Role granted to an identity in the `user_roles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    /// Full access to the back-office.
    Admin,
    /// Reserved for staff accounts; no back-office access.
    Moderator,
    /// Default role for self-registered accounts.
    User,
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Moderator => write!(f, "moderator"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values_round_trip() {
        let status: ConsultationStatus = serde_json::from_str("\"Contacted\"").unwrap();
        assert_eq!(status, ConsultationStatus::Contacted);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"Contacted\"");
    }

    #[test]
    fn test_unknown_value_preserved() {
        let status: InquiryStatus = serde_json::from_str("\"Escalated\"").unwrap();
        assert_eq!(status, InquiryStatus::Other("Escalated".to_string()));
        assert!(!status.is_known());
        assert_eq!(status.badge(), BadgeVariant::Default);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"Escalated\"");
    }

    #[test]
    fn test_badges() {
        assert_eq!(ConsultationStatus::New.badge(), BadgeVariant::Default);
        assert_eq!(ConsultationStatus::Contacted.badge(), BadgeVariant::Secondary);
        assert_eq!(ConsultationStatus::Completed.badge(), BadgeVariant::Outline);
        assert_eq!(
            ConsultationStatus::Cancelled.badge(),
            BadgeVariant::Destructive
        );
        assert_eq!(StockStatus::OutOfStock.badge(), BadgeVariant::Destructive);
        assert_eq!(StockStatus::Limited.badge(), BadgeVariant::Secondary);
    }

    #[test]
    fn test_stock_text_has_spaces() {
        assert_eq!(StockStatus::OutOfStock.to_string(), "Out of Stock");
        assert_eq!(
            "Out of Stock".parse::<StockStatus>().unwrap(),
            StockStatus::OutOfStock
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ConsultationStatus::default(), ConsultationStatus::New);
        assert_eq!(InquiryStatus::default(), InquiryStatus::New);
        assert_eq!(StockStatus::default(), StockStatus::Available);
    }

    #[test]
    fn test_known_lists() {
        assert_eq!(ConsultationStatus::KNOWN.len(), 4);
        assert_eq!(InquiryStatus::KNOWN.len(), 3);
        assert_eq!(StockStatus::KNOWN.len(), 3);
    }

    #[test]
    fn test_app_role() {
        assert_eq!("admin".parse::<AppRole>().unwrap(), AppRole::Admin);
        assert!("root".parse::<AppRole>().is_err());
        assert_eq!(AppRole::Moderator.to_string(), "moderator");
    }
}
