// ==========================================
// 制造订单执行引擎 - API层错误类型
// ==========================================
// 职责: 定义对外错误分类,转换仓储层错误为调用方可处理的错误
// 红线: 所有错误原样上抛,本引擎不做静默重试;
//       ResourceConflict / MaterialShortage 是操作员可恢复的预期情况,
//       不是系统故障
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
///
/// 每个变体即机器可读的错误种类 (kind),Display 为人读信息
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    /// 工单/工序不存在,或工序不属于给定工单
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 状态前置条件违反 (如对已完工工序再次开工)
    #[error("无效的状态转换: 工序状态={status}, 动作={action}")]
    InvalidTransition { status: String, action: String },

    /// 顺序约束违反 (前驱工序未完工/未跳过)
    #[error("顺序约束违反: 工序 seq={seq_no} 的前驱 seq={blocking_seq_no} 尚未完成")]
    SequenceViolation { seq_no: i32, blocking_seq_no: i32 },

    /// 资源时段冲突 (重复预订)
    #[error("资源冲突: 资源 {resource_code} 已被工序 {conflicting_operation_id} 占用")]
    ResourceConflict {
        resource_code: String,
        conflicting_operation_id: String,
    },

    /// 物料不足 (物料闸口拒绝)
    #[error("物料不足: order_id={order_id}, stage_tag={stage_tag}")]
    MaterialShortage { order_id: String, stage_tag: String },

    /// 输入校验失败 (缺少跳过原因/数量为负等)
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 机器可读的错误种类标识
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ApiError::SequenceViolation { .. } => "SEQUENCE_VIOLATION",
            ApiError::ResourceConflict { .. } => "RESOURCE_CONFLICT",
            ApiError::MaterialShortage { .. } => "MATERIAL_SHORTAGE",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将仓储层的技术错误转换为调用方可处理的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::ValidationError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::LockError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
