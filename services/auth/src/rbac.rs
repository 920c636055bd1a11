//! RBAC queries over a loaded role/permission closure
//!
//! An `AccessProfile` is the projection of the RBAC graph for one user:
//! their role codes plus the set-union of those roles' permission codes.
//! The queries here are pure and side-effect-free; the closure is loaded
//! once (at login, or from token claims) and attached to the session.
//!
//! There is no permission inheritance and there are no negative
//! permissions: a code is granted iff at least one role carries it.

use std::collections::HashSet;

use crate::catalog::{PermissionCode, RoleCode, UnknownCode};
use crate::error::{AuthError, AuthResult};

/// One user's role/permission closure
#[derive(Debug, Clone, Default)]
pub struct AccessProfile {
    roles: HashSet<RoleCode>,
    permissions: HashSet<PermissionCode>,
}

impl AccessProfile {
    /// Build a profile from roles and their (already unioned) permissions
    pub fn new(
        roles: impl IntoIterator<Item = RoleCode>,
        permissions: impl IntoIterator<Item = PermissionCode>,
    ) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Parse a profile from the string codes carried in token claims
    ///
    /// Codes are validated against the seeded catalog; a token carrying a
    /// code outside the catalog is treated as invalid.
    pub fn from_codes(roles: &[String], permissions: &[String]) -> Result<Self, UnknownCode> {
        let roles = roles
            .iter()
            .map(|r| r.parse())
            .collect::<Result<HashSet<_>, _>>()?;
        let permissions = permissions
            .iter()
            .map(|p| p.parse())
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { roles, permissions })
    }

    /// True iff the permission is reachable through at least one role
    pub fn has_permission(&self, code: PermissionCode) -> bool {
        self.permissions.contains(&code)
    }

    /// Direct role membership test
    pub fn has_role(&self, code: RoleCode) -> bool {
        self.roles.contains(&code)
    }

    /// Enforce a permission; `PermissionDenied` when unmet
    pub fn require_permission(&self, code: PermissionCode) -> AuthResult<()> {
        if self.has_permission(code) {
            Ok(())
        } else {
            tracing::warn!("permission denied: {}", code);
            Err(AuthError::PermissionDenied)
        }
    }

    /// Enforce a role; `PermissionDenied` when unmet
    pub fn require_role(&self, code: RoleCode) -> AuthResult<()> {
        if self.has_role(code) {
            Ok(())
        } else {
            tracing::warn!("role requirement unmet: {}", code);
            Err(AuthError::PermissionDenied)
        }
    }

    /// Role codes as wire strings, for token claims
    pub fn role_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.roles.iter().map(|r| r.to_string()).collect();
        codes.sort();
        codes
    }

    /// Permission codes as wire strings, for token claims
    pub fn permission_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.permissions.iter().map(|p| p.to_string()).collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_grants;

    fn profile_for(role: RoleCode) -> AccessProfile {
        AccessProfile::new([role], default_grants(role))
    }

    #[test]
    fn super_admin_reaches_config_management() {
        let admin = profile_for(RoleCode::SuperAdmin);
        assert!(admin.has_permission(PermissionCode::SystemConfigManage));
        assert!(admin.has_role(RoleCode::SuperAdmin));
    }

    #[test]
    fn normal_user_cannot_delete_strategies() {
        let normal = profile_for(RoleCode::Normal);
        assert!(normal.has_permission(PermissionCode::StrategyView));
        assert!(!normal.has_permission(PermissionCode::StrategyDelete));
    }

    #[test]
    fn no_roles_means_no_permissions() {
        let empty = AccessProfile::default();
        for code in PermissionCode::ALL {
            assert!(!empty.has_permission(code));
        }
        assert!(empty.require_permission(PermissionCode::StockDataView).is_err());
    }

    #[test]
    fn union_over_multiple_roles() {
        let grants = default_grants(RoleCode::Guest)
            .into_iter()
            .chain(default_grants(RoleCode::Normal));
        let profile = AccessProfile::new([RoleCode::Guest, RoleCode::Normal], grants);
        assert!(profile.has_permission(PermissionCode::TradeView));
        assert!(!profile.has_permission(PermissionCode::TradeLive));
    }

    #[test]
    fn claims_codes_round_trip() {
        let profile = profile_for(RoleCode::Premium);
        let restored =
            AccessProfile::from_codes(&profile.role_codes(), &profile.permission_codes()).unwrap();
        assert!(restored.has_role(RoleCode::Premium));
        assert!(restored.has_permission(PermissionCode::TradeLive));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let result = AccessProfile::from_codes(&["root".to_string()], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn require_role_enforces_membership() {
        let normal = profile_for(RoleCode::Normal);
        assert!(normal.require_role(RoleCode::Normal).is_ok());
        assert!(normal.require_role(RoleCode::Admin).is_err());
    }
}
