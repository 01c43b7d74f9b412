//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain entities that are already `Serialize + ToSchema` are returned
//! as-is; only request bodies, query strings and envelopes live here.

pub mod common_dto;
pub mod ticket_dto;
pub mod transaction_dto;
pub mod waitlist_dto;

pub use common_dto::*;
pub use ticket_dto::*;
pub use transaction_dto::*;
pub use waitlist_dto::*;
