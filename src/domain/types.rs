// ==========================================
// 挤压报价系统 - 领域类型定义
// ==========================================
// 职责: 角色、报价状态、模具类型、修订状态机
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 调用方角色 (Role)
// ==========================================
// 只作为二元门禁使用: admin/estimator 可改报价, 仅 admin 可改模具参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,     // 管理员
    Estimator, // 估价员
    Viewer,    // 只读
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Role {
    /// 从字符串解析角色（未知角色按只读处理）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "estimator" => Role::Estimator,
            _ => Role::Viewer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Estimator => "estimator",
            Role::Viewer => "viewer",
        }
    }

    /// 是否允许创建/重算报价
    pub fn can_mutate_quotes(&self) -> bool {
        matches!(self, Role::Admin | Role::Estimator)
    }

    /// 是否允许修改管理类数据（模具参数、材料价格）
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

// ==========================================
// Caller - 调用方身份
// ==========================================
// 由外部身份提供方给出, 本系统不做用户管理
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

// ==========================================
// 报价状态 (Quote Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft, // 草稿
    Sent,  // 已发送
    Won,   // 赢单
    Lost,  // 丢单
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl QuoteStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sent" => QuoteStatus::Sent,
            "won" => QuoteStatus::Won,
            "lost" => QuoteStatus::Lost,
            _ => QuoteStatus::Draft, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Won => "won",
            QuoteStatus::Lost => "lost",
        }
    }
}

// ==========================================
// 模具类型 (Die Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DieType {
    Solid,  // 实心
    Hollow, // 空心
    Coex,   // 共挤
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DieType::Solid => write!(f, "solid"),
            DieType::Hollow => write!(f, "hollow"),
            DieType::Coex => write!(f, "coex"),
        }
    }
}

// ==========================================
// 修订状态机 (Revision State)
// ==========================================
// NoCurrent:      无当前修订（降级成功但插入失败后的不一致状态，需要对账修复）
// Transitioning:  重算进行中（持有该报价的咨询锁）
// CurrentSettled: 恰好一条当前修订
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevisionState {
    NoCurrent,
    Transitioning,
    CurrentSettled,
}

impl fmt::Display for RevisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionState::NoCurrent => write!(f, "NO_CURRENT"),
            RevisionState::Transitioning => write!(f, "TRANSITIONING"),
            RevisionState::CurrentSettled => write!(f, "CURRENT_SETTLED"),
        }
    }
}

impl RevisionState {
    /// 根据当前修订数量推导静态状态
    ///
    /// 数据库部分唯一索引保证 current_count <= 1
    pub fn from_current_count(current_count: usize) -> Self {
        if current_count == 0 {
            RevisionState::NoCurrent
        } else {
            RevisionState::CurrentSettled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_gates() {
        assert!(Role::Admin.can_mutate_quotes());
        assert!(Role::Estimator.can_mutate_quotes());
        assert!(!Role::Viewer.can_mutate_quotes());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Estimator.is_admin());
    }

    #[test]
    fn test_role_from_str_defaults_to_viewer() {
        assert_eq!(Role::from_str("ADMIN"), Role::Admin);
        assert_eq!(Role::from_str(" estimator "), Role::Estimator);
        assert_eq!(Role::from_str("sales"), Role::Viewer);
    }

    #[test]
    fn test_revision_state_from_count() {
        assert_eq!(RevisionState::from_current_count(0), RevisionState::NoCurrent);
        assert_eq!(RevisionState::from_current_count(1), RevisionState::CurrentSettled);
    }
}
