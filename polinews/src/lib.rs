// Library interface for the polinews engine
// The binary and the integration tests import modules from here

pub mod aggregator;
pub mod analysis;
pub mod article;
pub mod bias;
pub mod credibility;
pub mod dedup;
pub mod digest;
pub mod error;
pub mod lexicon;
pub mod providers;
pub mod reference;
pub mod report;
pub mod text;

pub use aggregator::{AggregateRequest, AggregationOutcome, Aggregator, AggregatorSettings};
pub use analysis::BiasEngine;
pub use article::Article;
pub use error::{AggregateError, ProviderUnavailable, UnavailableReason};
