//! Data models for Biblio

/// Implements sqlx text encoding for a status enum with `as_str`/`FromStr`
macro_rules! text_enum_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub(crate) use text_enum_sqlx;

pub mod book;
pub mod charge;
pub mod customer;
pub mod response;
pub mod stock;
pub mod transaction;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use charge::Charge;
pub use customer::Customer;
pub use response::{
    ApiResponse, ListQuery, ListResponse, MessageResponse, PageRequest, Paginated, PaginationMeta,
};
pub use stock::{BookStock, StockStatus};
pub use transaction::{BookTransaction, TransactionDetails, TransactionStatus};
pub use user::{Role, User, UserClaims};
