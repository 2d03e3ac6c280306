//! Route-topology validator.
//!
//! Validation runs in two independent phases over the member list of one
//! relation:
//!
//! 1. [`PTv2Checker::check_roles_order_and_type`] looks at roles, member
//!    types and tags without any geometry.
//! 2. [`PTv2Checker::find_gaps`] walks the way members in relation order and
//!    checks that each one connects to the previous one.
//!
//! Both phases report every individual problem to the sink while they scan
//! and return the accumulated [`RouteError`] flags.

mod gaps;
mod roles;

use crate::models::RouteError;
use crate::sink::RouteSink;

pub use gaps::MemberStatus;

/// Checks one relation at a time and writes error features to `writer`.
///
/// The checker holds no state between calls, so checking the same relation
/// twice gives the same result.
pub struct PTv2Checker<'w, S: RouteSink + ?Sized> {
    writer: &'w mut S,
}

impl<'w, S: RouteSink + ?Sized> PTv2Checker<'w, S> {
    pub fn new(writer: &'w mut S) -> Self {
        Self { writer }
    }

    fn flag_if(condition: bool, flag: RouteError) -> RouteError {
        if condition {
            flag
        } else {
            RouteError::CLEAN
        }
    }
}
