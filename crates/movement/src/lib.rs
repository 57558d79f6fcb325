//! Membership, program intake, and member recovery workflows for the movement platform.
//!
//! The crate is organised the way requests flow: [`workflows`] hold the services and axum
//! routers, [`store`] implements their repository traits on SQLite, and [`storage`] /
//! [`notify`] wrap the two outbound collaborators (document storage and transactional email).

pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod paging;
pub mod settings;
pub mod storage;
pub mod store;
pub mod telemetry;
#[cfg(test)]
pub(crate) mod testing;
pub mod validation;
pub mod workflows;
