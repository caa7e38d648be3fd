// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod builder;
pub mod campaign;
pub mod checker;
pub mod compat;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod reporting;
pub mod session;
pub mod taxonomy;
pub mod validate;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::builder::{build_link, field_hints, BuiltLink, FieldHint, LinkRequest, MissingField, MissingFields};
pub use crate::campaign::{compose_campaign_name, CampaignFields};
pub use crate::checker::{check_url, CheckOutcome, ParamStatus, UtmReport};
pub use crate::compat::compatible_channels;
pub use crate::normalize::normalize_token;
pub use crate::session::SessionContext;
pub use crate::validate::is_valid_url;
