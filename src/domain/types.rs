// ==========================================
// 制造订单执行引擎 - 领域类型定义
// ==========================================
// 工序状态机: PENDING/QUEUED -> RUNNING -> COMPLETE, PENDING/QUEUED -> SKIPPED
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工序状态 (Operation Status)
// ==========================================
// 初始: PENDING; 终态: COMPLETE / SKIPPED
// 红线: 终态工序不可再变更 (notes 追加除外)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,  // 待开工
    Queued,   // 已排队
    Running,  // 执行中
    Complete, // 已完工
    Skipped,  // 已跳过
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OperationStatus {
    /// 从数据库字符串解析状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(OperationStatus::Pending),
            "QUEUED" => Some(OperationStatus::Queued),
            "RUNNING" => Some(OperationStatus::Running),
            "COMPLETE" => Some(OperationStatus::Complete),
            "SKIPPED" => Some(OperationStatus::Skipped),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::Queued => "QUEUED",
            OperationStatus::Running => "RUNNING",
            OperationStatus::Complete => "COMPLETE",
            OperationStatus::Skipped => "SKIPPED",
        }
    }

    /// 判断是否为终态 (COMPLETE / SKIPPED)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Complete | OperationStatus::Skipped)
    }

    /// 判断是否允许开工 (start 前置状态)
    pub fn can_start(&self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::Queued)
    }

    /// 判断是否允许跳过 (skip 前置状态,与 start 相同)
    pub fn can_skip(&self) -> bool {
        self.can_start()
    }
}

// ==========================================
// 工单状态 (Order Status)
// ==========================================
// 红线: 派生值,只能由状态派生函数写入,任何转换不得直接设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Released,   // 已下达 (全部工序待开工)
    InProgress, // 执行中
    Complete,   // 已完工 (全部工序终态)
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderStatus {
    /// 从数据库字符串解析状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RELEASED" => Some(OrderStatus::Released),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "COMPLETE" => Some(OrderStatus::Complete),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Released => "RELEASED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Complete => "COMPLETE",
        }
    }
}

// ==========================================
// 转换动作 (Transition Action)
// ==========================================
// 用途: 执行日志 action_type 与错误信息中的动作标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionAction {
    Start,    // 开工
    Complete, // 完工
    Skip,     // 跳过
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TransitionAction {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Start => "START",
            TransitionAction::Complete => "COMPLETE",
            TransitionAction::Skip => "SKIP",
        }
    }
}
