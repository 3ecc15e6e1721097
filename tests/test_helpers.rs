#![allow(dead_code)]
// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、执行接口装配、测试数据生成
// ==========================================

use chrono::Utc;
use mfg_exec_engine::db;
use mfg_exec_engine::domain::order::{Operation, Resource, WorkOrder};
use mfg_exec_engine::domain::types::{OperationStatus, OrderStatus};
use mfg_exec_engine::engine::{MaterialGate, ResourceAllocator, UnlimitedMaterialGate};
use mfg_exec_engine::repository::{
    ExecutionLogRepository, OperationRepository, ResourceRepository, WorkOrderRepository,
};
use mfg_exec_engine::ExecutionApi;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试环境 (执行接口 + 各仓储)
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub api: Arc<ExecutionApi>,
    pub order_repo: Arc<WorkOrderRepository>,
    pub op_repo: Arc<OperationRepository>,
    pub resource_repo: Arc<ResourceRepository>,
    pub log_repo: Arc<ExecutionLogRepository>,
}

/// 创建测试环境 (指定物料闸口实现)
pub fn setup_env_with_gate(gate: Arc<dyn MaterialGate>) -> TestEnv {
    let (temp_file, db_path) = create_test_db().unwrap();

    let conn = Arc::new(Mutex::new(db::open_sqlite_connection(&db_path).unwrap()));
    let order_repo = Arc::new(WorkOrderRepository::new(conn.clone()));
    let op_repo = Arc::new(OperationRepository::new(conn.clone()));
    let resource_repo = Arc::new(ResourceRepository::new(conn.clone()));
    let log_repo = Arc::new(ExecutionLogRepository::new(conn.clone()));
    let allocator = Arc::new(ResourceAllocator::new(op_repo.clone()));

    let api = Arc::new(ExecutionApi::new(
        order_repo.clone(),
        op_repo.clone(),
        resource_repo.clone(),
        log_repo.clone(),
        allocator,
        gate,
    ));

    TestEnv {
        _temp_file: temp_file,
        db_path,
        api,
        order_repo,
        op_repo,
        resource_repo,
        log_repo,
    }
}

/// 创建测试环境 (无限物料闸口)
pub fn setup_env() -> TestEnv {
    setup_env_with_gate(Arc::new(UnlimitedMaterialGate))
}

/// 写入一张工单 (RELEASED)
pub fn seed_order(env: &TestEnv, order_id: &str, order_code: &str) {
    let now = Utc::now();
    env.order_repo
        .create(&WorkOrder {
            order_id: order_id.to_string(),
            order_code: order_code.to_string(),
            status: OrderStatus::Released,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
}

/// 写入一道工序
pub fn seed_operation(
    env: &TestEnv,
    order_id: &str,
    operation_id: &str,
    seq_no: i32,
    status: OperationStatus,
    stage_tag: Option<&str>,
    planned_duration_min: Option<i64>,
) {
    let now = Utc::now();
    env.op_repo
        .create(&Operation {
            operation_id: operation_id.to_string(),
            order_id: order_id.to_string(),
            seq_no,
            op_name: format!("工序{}", seq_no),
            stage_tag: stage_tag.map(|s| s.to_string()),
            status,
            resource_code: None,
            operator: None,
            planned_duration_min,
            actual_start: None,
            actual_end: None,
            actual_duration_min: None,
            quantity_completed: None,
            quantity_scrapped: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
}

/// 写入一个资源
pub fn seed_resource(env: &TestEnv, resource_code: &str) {
    env.resource_repo
        .create(&Resource {
            resource_id: format!("RES-{}", resource_code),
            resource_code: resource_code.to_string(),
            resource_name: Some(format!("机台 {}", resource_code)),
        })
        .unwrap();
}

/// 写入标准三工序工单 (seq 10/20/30,全部 PENDING)
///
/// 工序ID约定: "{order_id}-OP{seq}"
pub fn seed_standard_order(env: &TestEnv, order_id: &str, order_code: &str) {
    seed_order(env, order_id, order_code);
    for seq in [10, 20, 30] {
        seed_operation(
            env,
            order_id,
            &format!("{}-OP{}", order_id, seq),
            seq,
            OperationStatus::Pending,
            None,
            Some(60),
        );
    }
}
