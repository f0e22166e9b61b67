pub mod account;
pub mod authorization;
pub mod authz_group;
pub mod credential;
pub mod role;

pub use account::{Account, AccountProfile};
pub use authorization::{AuthType, AuthorizationRequest, AuthorizationType, ScopeLevel};
pub use authz_group::AuthzGroupSet;
pub use credential::{AuthResponse, Credential, RefreshEntry};
pub use role::{Role, Scope, ScopeRoleAssignment};
