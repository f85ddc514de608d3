//! Category classification.
//!
//! An ordered rule table maps each item stack to exactly one category label
//! (possibly the `uncategorized` sentinel). Classification is pure; rule
//! changes only take effect at an explicit [`Classifier::reload`].

pub mod classifier;
pub mod predicate;
pub mod table;

pub use classifier::Classifier;
pub use predicate::Predicate;
pub use table::{CategoryRule, RuleSet, RuleTable};
