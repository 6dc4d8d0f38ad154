pub mod compile;
pub mod executor;
pub mod fields;
pub mod plan;
pub mod post_filter;

pub use compile::{CompiledFilter, CompiledFilters, compile_filters};
pub use executor::{execute_compiled, execute_query, plan_query};
pub use fields::{ConferenceField, FilterField, SessionField};
pub use plan::{Operator, RawFilter, StoreQuery};
pub use post_filter::{SecondaryFilter, execute_two_inequality, split_secondary};
