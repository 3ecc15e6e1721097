// ==========================================
// 制造订单执行引擎 - API层
// ==========================================
// 职责: 对外业务接口 (传输无关),请求/响应 DTO 定义
// ==========================================

pub mod error;
pub mod execution_api;

pub use error::{ApiError, ApiResult};
pub use execution_api::ExecutionApi;

use crate::domain::order::Operation;
use crate::domain::types::OrderStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// 请求 DTO
// ==========================================

/// 开工请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartOperationRequest {
    /// 资源代码 (可选; 提供时做冲突校验并绑定)
    pub resource_code: Option<String>,
    /// 操作人
    pub operator: Option<String>,
    /// 追加备注
    pub notes: Option<String>,
}

/// 完工请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOperationRequest {
    /// 完工数量 (>= 0)
    pub quantity_completed: f64,
    /// 报废数量 (>= 0,默认 0)
    #[serde(default)]
    pub quantity_scrapped: f64,
    /// 实际时长覆盖值 (分钟; 不提供则按 now - actual_start 派生)
    pub actual_duration_min: Option<i64>,
    /// 操作人
    pub operator: Option<String>,
    /// 追加备注
    pub notes: Option<String>,
}

/// 跳过请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipOperationRequest {
    /// 跳过原因 (必填,最短长度见 MIN_SKIP_REASON_LEN)
    pub reason: String,
    /// 操作人
    pub operator: Option<String>,
}

// ==========================================
// 响应 DTO
// ==========================================

/// 工单摘要 (每个返回工序的响应都附带)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub order_code: String,
    /// 派生状态
    pub status: OrderStatus,
    /// 当前工序顺序号 (执行中工序优先,否则下一道开放工序)
    pub current_seq_no: Option<i32>,
}

/// 转换响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
    /// 转换后的工序
    pub operation: Operation,
    /// 所属工单摘要
    pub order: OrderSummary,
    /// 下一道开放工序 (完工/跳过响应; 最后一道工序终态后为 None)
    pub next_operation: Option<Operation>,
}
