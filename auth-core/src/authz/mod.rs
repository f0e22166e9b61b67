//! Authorization strategies.
//!
//! `RoleResolver` decides from scope roles owned by the credential store.
//! `GroupResolver` decides from directory group claims carried by the
//! credential. The two are independent and never share data.

mod group;
mod role;

pub use group::GroupResolver;
pub use role::RoleResolver;
