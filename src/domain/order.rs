// ==========================================
// 制造订单执行引擎 - 工单/工序领域模型
// ==========================================
// 所有权: 工单独占其工序; 工序通过 resource_code 弱引用资源
// 对齐: db.rs 中 work_order / work_order_operation / resource 表
// ==========================================

use crate::domain::types::{OperationStatus, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 跳过原因在 notes 中的标记前缀
pub const SKIP_NOTE_PREFIX: &str = "SKIPPED:";

// ==========================================
// WorkOrder - 制造工单
// ==========================================
// 红线: status 为派生值,仅由转换事务内的派生函数写入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub order_id: String,                    // 工单ID
    pub order_code: String,                  // 工单号 (业务编码,唯一)
    pub status: OrderStatus,                 // 派生状态
    pub started_at: Option<DateTime<Utc>>,   // 首次进入 IN_PROGRESS 时间
    pub completed_at: Option<DateTime<Utc>>, // 进入 COMPLETE 时间
    pub created_at: DateTime<Utc>,           // 记录创建时间
    pub updated_at: DateTime<Utc>,           // 记录更新时间
}

// ==========================================
// Operation - 工序 (工单路由的一个步骤)
// ==========================================
// seq_no 在同一工单内唯一 (UNIQUE(order_id, seq_no)),重复为数据完整性错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    // ===== 主键与归属 =====
    pub operation_id: String, // 工序ID
    pub order_id: String,     // 所属工单 (FK)

    // ===== 路由信息 =====
    pub seq_no: i32,            // 执行顺序号 (工单内唯一,全序)
    pub op_name: String,        // 工序名称 (印刷/清洗/装配/检验/包装...)
    pub stage_tag: Option<String>, // 物料消耗阶段标签 (BOM 协作方提供,本引擎不解释)

    // ===== 执行状态 =====
    pub status: OperationStatus,      // 工序状态
    pub resource_code: Option<String>, // 资源弱引用 (机台/工位代码,不拥有其生命周期)
    pub operator: Option<String>,      // 操作人

    // ===== 时间字段 =====
    pub planned_duration_min: Option<i64>, // 计划时长 (分钟)
    pub actual_start: Option<DateTime<Utc>>, // 实际开工时间
    pub actual_end: Option<DateTime<Utc>>,   // 实际完工时间
    pub actual_duration_min: Option<i64>,    // 实际时长 (完工时派生,可由调用方覆盖)

    // ===== 完工数量 =====
    pub quantity_completed: Option<f64>, // 完工数量 (>= 0)
    pub quantity_scrapped: Option<f64>,  // 报废数量 (>= 0,默认 0)

    // ===== 备注 =====
    pub notes: Option<String>, // 自由文本; 跳过原因以 SKIPPED: 前缀追加

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl Operation {
    /// 判断是否为终态工序
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 计划完工时间 (actual_start + planned_duration; 无计划时长则视为开放区间)
    pub fn planned_end(&self) -> Option<DateTime<Utc>> {
        match (self.actual_start, self.planned_duration_min) {
            (Some(start), Some(minutes)) => Some(start + chrono::Duration::minutes(minutes)),
            _ => None,
        }
    }

    /// 追加一行备注 (已有内容以换行分隔)
    pub fn appended_notes(&self, line: &str) -> String {
        match &self.notes {
            Some(existing) if !existing.trim().is_empty() => format!("{}\n{}", existing, line),
            _ => line.to_string(),
        }
    }
}

// ==========================================
// Resource - 资源 (机台/工位/台架)
// ==========================================
// 生命周期由外部资产协作方管理,本引擎只读 (校验分配与冲突)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,           // 资源ID
    pub resource_code: String,         // 资源代码 (唯一)
    pub resource_name: Option<String>, // 资源名称
}

// ==========================================
// ExecutionLog - 工序执行日志
// ==========================================
// 用途: 每次成功转换追加一条,可解释性审计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub log_id: String,              // 日志ID (UUID)
    pub order_id: String,            // 工单ID
    pub operation_id: String,        // 工序ID
    pub action_type: String,         // 动作类型 (START/COMPLETE/SKIP)
    pub actor: String,               // 操作人/系统标识
    pub payload_json: Option<String>, // 动作参数快照 (JSON)
    pub detail: Option<String>,      // 可读描述
    pub action_ts: DateTime<Utc>,    // 动作时间
}
