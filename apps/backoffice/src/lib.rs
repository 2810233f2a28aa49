//! # Meridian Back Office
//!
//! Coupon and sale services for the Meridian POS back office.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Back Office Application                             │
//! │                                                                         │
//! │  caller (HTTP handler, CLI, seed)                                       │
//! │       │   raw requests: NewCoupon, SalePatch, ReportQuery, ...          │
//! │       ▼                                                                 │
//! │  services::{CouponService, SaleService}                                 │
//! │       │   validate (meridian-core) → store call under a deadline        │
//! │       ▼                                                                 │
//! │  store::{CouponStore, SaleStore}   ◄── implemented for Database         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  meridian-db repositories → SQLite                                      │
//! │                                                                         │
//! │  Failures surface as ServiceError → ErrorBody { status, code, ... }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is global: the database handle and the operation deadline
//! are handed to each service when it is built.

pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::{ErrorBody, ErrorCode, ServiceError, ServiceResult};
pub use services::{CouponService, SaleService};
pub use store::{CouponStore, SaleStore};
