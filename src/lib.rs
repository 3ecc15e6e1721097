// ==========================================
// 制造订单执行引擎 - 核心库
// ==========================================
// 系统定位: 工序执行状态机 + 资源冲突控制 + 工单状态派生
// 边界: 工单/客户 CRUD、认证、报表、界面均为外部协作方,
//       本库只负责有状态机与并发安全要求的执行核心
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OperationStatus, OrderStatus, TransitionAction};

// 领域实体
pub use domain::{derive_order_status, ExecutionLog, Operation, Resource, WorkOrder};

// 引擎
pub use engine::{InMemoryMaterialGate, MaterialGate, ResourceAllocator, Sequencer, UnlimitedMaterialGate};

// API
pub use api::{
    ApiError, ApiResult, CompleteOperationRequest, ExecutionApi, OrderSummary,
    SkipOperationRequest, StartOperationRequest, TransitionResponse,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "制造订单执行引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
