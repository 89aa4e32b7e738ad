//! Visitor and invite status enums
//!
//! Both are stored as lowercase snake_case text. Parsing an unknown value
//! yields [`AppError::InvalidStatus`], which is how the transition engine
//! rejects illegal targets before touching storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

use crate::error::AppError;

/// Behaviour shared by every status enum that flows through the lifecycle engine
pub trait LifecycleStatus:
    Copy + Eq + std::fmt::Debug + std::fmt::Display + std::str::FromStr<Err = AppError> + Send + Sync
{
    /// Entity kind used in logs and error messages
    const KIND: &'static str;

    fn as_str(&self) -> &'static str;
    fn is_checked_in(&self) -> bool;
    fn is_checked_out(&self) -> bool;

    /// Every accepted value, in declaration order
    fn all() -> &'static [Self];
}

macro_rules! text_status {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl LifecycleStatus for $ty {
            const KIND: &'static str = $kind;

            fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }

            fn is_checked_in(&self) -> bool {
                matches!(self, $ty::CheckedIn)
            }

            fn is_checked_out(&self) -> bool {
                matches!(self, $ty::CheckedOut)
            }

            fn all() -> &'static [Self] {
                &[$($ty::$variant),+]
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => {
                        let allowed: Vec<&str> = vec![$($text),+];
                        Err(AppError::InvalidStatus(format!(
                            "'{}' is not a valid {} status (expected one of: {})",
                            other,
                            $kind,
                            allowed.join(", ")
                        )))
                    }
                }
            }
        }

        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: AppError| e.to_string().into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

/// Visitor lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisitorStatus {
    Pending,
    Created,
    Approved,
    CheckedIn,
    CheckedOut,
    Rejected,
    Revisit,
}

text_status!(VisitorStatus, "visitor", {
    Pending => "pending",
    Created => "created",
    Approved => "approved",
    CheckedIn => "checked_in",
    CheckedOut => "checked_out",
    Rejected => "rejected",
    Revisit => "revisit",
});

/// Invite lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Created,
    Reinvited,
    Pending,
    Approved,
    CheckedIn,
    CheckedOut,
    Rejected,
}

text_status!(InviteStatus, "invite", {
    Created => "created",
    Reinvited => "reinvited",
    Pending => "pending",
    Approved => "approved",
    CheckedIn => "checked_in",
    CheckedOut => "checked_out",
    Rejected => "rejected",
});

/// Field writes produced by one applied status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
    pub status: S,
    /// Written only when the entity had no check-in yet
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    /// Visitor only: clear `is_active`
    pub deactivate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_visitor_status_parses_back_from_its_text() {
        for status in VisitorStatus::all() {
            assert_eq!(status.as_str().parse::<VisitorStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(" Checked_In ".parse::<InviteStatus>().unwrap(), InviteStatus::CheckedIn);
    }

    #[test]
    fn revisit_is_not_an_invite_status() {
        let err = "revisit".parse::<InviteStatus>().unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(_)));
        assert!(err.to_string().contains("reinvited"));
    }

    #[test]
    fn reinvited_is_not_a_visitor_status() {
        assert!(matches!(
            "reinvited".parse::<VisitorStatus>(),
            Err(AppError::InvalidStatus(_))
        ));
    }

    #[test]
    fn serde_uses_snake_case_text() {
        let json = serde_json::to_string(&VisitorStatus::CheckedOut).unwrap();
        assert_eq!(json, "\"checked_out\"");
    }
}
