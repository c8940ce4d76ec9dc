//! ebay-rest
//!
//! One facade over every eBay REST API. Calls are routed through a shared
//! dispatcher that picks the OAuth flow, keeps each application inside its
//! published call limits and turns offset/limit endpoints into lazy paged
//! sequences. The operation table is regenerated from eBay's OpenAPI
//! contracts by the `ebay-codegen` binary.

pub mod auth;
pub mod clock;
pub mod codegen;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod generated;
pub mod governor;
pub mod multiton;
pub mod operations;
pub mod paging;
pub mod signing;
pub mod transport;

pub use auth::{AuthFlow, StaticTokenProvider, TokenProvider};
pub use config::{ApiSettings, Settings};
pub use error::{Error, ErrorCode, Result};
pub use facade::{EbayApi, EbayApiBuilder};
pub use operations::{OperationDescriptor, Params};
pub use paging::Paged;
