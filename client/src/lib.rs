pub mod config;
pub mod oar;
pub mod query;
pub mod service;
pub mod types;

pub use config::{ServiceConfig, BASE_URL_ENV, MAX_LIMIT};
pub use oar::OarClient;
pub use query::TestQuery;
pub use service::{ClientError, ClientResult, ErrorBody, ResultsService};
pub use types::{Analysis, Outcome, Resolution, Test, TestQueryResult, TestRecord};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::oar::*;
    pub use crate::query::*;
    pub use crate::service::*;
    pub use crate::types::*;
}
