// ==========================================
// 制造订单执行引擎 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问,工序台账的唯一事实层
// 红线: 业务规则不在仓储层,仓储只提供守卫式写入与快照读取
// ==========================================

pub mod error;
pub mod execution_log_repo;
pub mod operation_repo;
pub mod order_repo;
pub mod resource_repo;

// 重导出核心类型
pub use error::{RepositoryError, RepositoryResult};
pub use execution_log_repo::ExecutionLogRepository;
pub use operation_repo::{OperationRepository, TransitionOutcome};
pub use order_repo::WorkOrderRepository;
pub use resource_repo::ResourceRepository;
