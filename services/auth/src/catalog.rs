//! Seeded role and permission catalog
//!
//! Role and permission codes are closed enumerations rather than free-form
//! strings, so a typo in a handler or a grant is a compile error instead of
//! a silently-missing permission. The seeder writes the catalog from these
//! enums and startup verifies the store still matches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in role codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCode {
    SuperAdmin,
    Admin,
    Premium,
    Normal,
    Guest,
}

impl RoleCode {
    pub const ALL: [RoleCode; 5] = [
        RoleCode::SuperAdmin,
        RoleCode::Admin,
        RoleCode::Premium,
        RoleCode::Normal,
        RoleCode::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCode::SuperAdmin => "super_admin",
            RoleCode::Admin => "admin",
            RoleCode::Premium => "premium",
            RoleCode::Normal => "normal",
            RoleCode::Guest => "guest",
        }
    }

    /// Display name and description used by the seeder
    pub fn seed_info(&self) -> (&'static str, &'static str) {
        match self {
            RoleCode::SuperAdmin => ("Super Administrator", "Holds every permission"),
            RoleCode::Admin => ("Administrator", "Manages users and configuration"),
            RoleCode::Premium => ("Premium User", "Paid tier with advanced features"),
            RoleCode::Normal => ("Normal User", "Free tier with basic features"),
            RoleCode::Guest => ("Guest", "Read-only access to public content"),
        }
    }

    /// Whether the role is protected from deletion
    pub fn is_system(&self) -> bool {
        matches!(self, RoleCode::SuperAdmin | RoleCode::Admin)
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleCode::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

/// Resource families the permission catalog is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Data,
    Strategy,
    Trade,
    RnnModel,
    System,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Data => "data",
            ResourceType::Strategy => "strategy",
            ResourceType::Trade => "trade",
            ResourceType::RnnModel => "rnn-model",
            ResourceType::System => "system",
        }
    }
}

/// The fixed permission catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionCode {
    StockDataView,
    StockDataDownload,
    FundDataView,
    FundDataDownload,
    FundDataAnalyze,
    StrategyView,
    StrategyCreate,
    StrategyEdit,
    StrategyDelete,
    StrategyRun,
    TradeView,
    TradeSimulate,
    TradeLive,
    RnnModelView,
    RnnModelTrain,
    RnnModelPredict,
    SystemUserManage,
    SystemRoleManage,
    SystemConfigManage,
    SystemLogView,
}

impl PermissionCode {
    pub const ALL: [PermissionCode; 20] = [
        PermissionCode::StockDataView,
        PermissionCode::StockDataDownload,
        PermissionCode::FundDataView,
        PermissionCode::FundDataDownload,
        PermissionCode::FundDataAnalyze,
        PermissionCode::StrategyView,
        PermissionCode::StrategyCreate,
        PermissionCode::StrategyEdit,
        PermissionCode::StrategyDelete,
        PermissionCode::StrategyRun,
        PermissionCode::TradeView,
        PermissionCode::TradeSimulate,
        PermissionCode::TradeLive,
        PermissionCode::RnnModelView,
        PermissionCode::RnnModelTrain,
        PermissionCode::RnnModelPredict,
        PermissionCode::SystemUserManage,
        PermissionCode::SystemRoleManage,
        PermissionCode::SystemConfigManage,
        PermissionCode::SystemLogView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCode::StockDataView => "stock.data.view",
            PermissionCode::StockDataDownload => "stock.data.download",
            PermissionCode::FundDataView => "fund.data.view",
            PermissionCode::FundDataDownload => "fund.data.download",
            PermissionCode::FundDataAnalyze => "fund.data.analyze",
            PermissionCode::StrategyView => "strategy.view",
            PermissionCode::StrategyCreate => "strategy.create",
            PermissionCode::StrategyEdit => "strategy.edit",
            PermissionCode::StrategyDelete => "strategy.delete",
            PermissionCode::StrategyRun => "strategy.run",
            PermissionCode::TradeView => "trade.view",
            PermissionCode::TradeSimulate => "trade.simulate",
            PermissionCode::TradeLive => "trade.live",
            PermissionCode::RnnModelView => "rnn.model.view",
            PermissionCode::RnnModelTrain => "rnn.model.train",
            PermissionCode::RnnModelPredict => "rnn.model.predict",
            PermissionCode::SystemUserManage => "system.user.manage",
            PermissionCode::SystemRoleManage => "system.role.manage",
            PermissionCode::SystemConfigManage => "system.config.manage",
            PermissionCode::SystemLogView => "system.log.view",
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            PermissionCode::StockDataView
            | PermissionCode::StockDataDownload
            | PermissionCode::FundDataView
            | PermissionCode::FundDataDownload
            | PermissionCode::FundDataAnalyze => ResourceType::Data,
            PermissionCode::StrategyView
            | PermissionCode::StrategyCreate
            | PermissionCode::StrategyEdit
            | PermissionCode::StrategyDelete
            | PermissionCode::StrategyRun => ResourceType::Strategy,
            PermissionCode::TradeView | PermissionCode::TradeSimulate | PermissionCode::TradeLive => {
                ResourceType::Trade
            }
            PermissionCode::RnnModelView
            | PermissionCode::RnnModelTrain
            | PermissionCode::RnnModelPredict => ResourceType::RnnModel,
            PermissionCode::SystemUserManage
            | PermissionCode::SystemRoleManage
            | PermissionCode::SystemConfigManage
            | PermissionCode::SystemLogView => ResourceType::System,
        }
    }

    /// Display name used by the seeder
    pub fn seed_name(&self) -> &'static str {
        match self {
            PermissionCode::StockDataView => "View stock data",
            PermissionCode::StockDataDownload => "Download stock data",
            PermissionCode::FundDataView => "View fund data",
            PermissionCode::FundDataDownload => "Download fund data",
            PermissionCode::FundDataAnalyze => "Analyze fund data",
            PermissionCode::StrategyView => "View strategies",
            PermissionCode::StrategyCreate => "Create strategies",
            PermissionCode::StrategyEdit => "Edit strategies",
            PermissionCode::StrategyDelete => "Delete strategies",
            PermissionCode::StrategyRun => "Run strategies",
            PermissionCode::TradeView => "View trade records",
            PermissionCode::TradeSimulate => "Simulated trading",
            PermissionCode::TradeLive => "Live trading",
            PermissionCode::RnnModelView => "View models",
            PermissionCode::RnnModelTrain => "Train models",
            PermissionCode::RnnModelPredict => "Run predictions",
            PermissionCode::SystemUserManage => "Manage users",
            PermissionCode::SystemRoleManage => "Manage roles",
            PermissionCode::SystemConfigManage => "Manage configuration",
            PermissionCode::SystemLogView => "View logs",
        }
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionCode::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

/// A code string that is not part of the seeded catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown catalog code: {0}")]
pub struct UnknownCode(pub String);

/// Default permission grants per role, matching the deployment seed
pub fn default_grants(role: RoleCode) -> Vec<PermissionCode> {
    match role {
        RoleCode::SuperAdmin => PermissionCode::ALL.to_vec(),
        RoleCode::Admin => PermissionCode::ALL
            .into_iter()
            .filter(|p| *p != PermissionCode::SystemConfigManage)
            .collect(),
        RoleCode::Premium => PermissionCode::ALL
            .into_iter()
            .filter(|p| p.resource_type() != ResourceType::System)
            .collect(),
        RoleCode::Normal => vec![
            PermissionCode::StockDataView,
            PermissionCode::FundDataView,
            PermissionCode::StrategyView,
            PermissionCode::TradeView,
            PermissionCode::RnnModelView,
        ],
        RoleCode::Guest => vec![PermissionCode::StockDataView],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        for role in RoleCode::ALL {
            assert_eq!(role.as_str().parse::<RoleCode>().unwrap(), role);
        }
        assert!("root".parse::<RoleCode>().is_err());
    }

    #[test]
    fn permission_codes_round_trip() {
        for perm in PermissionCode::ALL {
            assert_eq!(perm.as_str().parse::<PermissionCode>().unwrap(), perm);
        }
        assert!("strategy.describe".parse::<PermissionCode>().is_err());
    }

    #[test]
    fn super_admin_holds_everything() {
        let grants = default_grants(RoleCode::SuperAdmin);
        assert_eq!(grants.len(), PermissionCode::ALL.len());
    }

    #[test]
    fn admin_misses_only_config_management() {
        let grants = default_grants(RoleCode::Admin);
        assert_eq!(grants.len(), PermissionCode::ALL.len() - 1);
        assert!(!grants.contains(&PermissionCode::SystemConfigManage));
        assert!(grants.contains(&PermissionCode::SystemUserManage));
    }

    #[test]
    fn premium_has_no_system_permissions() {
        let grants = default_grants(RoleCode::Premium);
        assert!(
            grants
                .iter()
                .all(|p| p.resource_type() != ResourceType::System)
        );
        assert!(grants.contains(&PermissionCode::TradeLive));
    }

    #[test]
    fn normal_is_view_only() {
        let grants = default_grants(RoleCode::Normal);
        assert_eq!(grants.len(), 5);
        assert!(!grants.contains(&PermissionCode::StrategyDelete));
    }

    #[test]
    fn guest_sees_stock_data_only() {
        assert_eq!(
            default_grants(RoleCode::Guest),
            vec![PermissionCode::StockDataView]
        );
    }

    #[test]
    fn system_flag_covers_admin_roles_only() {
        assert!(RoleCode::SuperAdmin.is_system());
        assert!(RoleCode::Admin.is_system());
        assert!(!RoleCode::Premium.is_system());
        assert!(!RoleCode::Normal.is_system());
        assert!(!RoleCode::Guest.is_system());
    }
}
