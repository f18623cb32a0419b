//! Rule evaluation engine: scopes, predicates, conditions and the
//! init / check / finish state machine that ties them together.

mod condition;
mod evaluate;
mod predicate;
mod scope;

pub use crate::types::{ConditionEvent, ConditionEvents, Outcome};
pub use condition::{
    be, each, not, And, Condition, ConditionExt, Described, FnCondition, Not, Or,
    PredicateCondition,
};
pub use evaluate::{evaluate, EMPTY_SCOPE_MESSAGE};
pub(crate) use evaluate::run;
pub use predicate::{annotated_with, annotated_with_matching, declared_in, in_package, DescribedPredicate};
pub use scope::{Scope, ScopeElement};
