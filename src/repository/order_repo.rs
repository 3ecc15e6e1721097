// ==========================================
// 制造订单执行引擎 - 工单仓储
// ==========================================
// 职责: work_order 表的数据访问
// 说明: 工单的创建/删除属外部数据管理,本引擎仅在工单下达与测试场景写入
// ==========================================

use crate::domain::order::WorkOrder;
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// WorkOrderRepository - 工单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
    /// 创建新的 WorkOrderRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建工单 (下达入口/测试夹具)
    pub fn create(&self, order: &WorkOrder) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO work_order (
                order_id, order_code, status, started_at, completed_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &order.order_id,
                &order.order_code,
                order.status.to_db_str(),
                order.started_at.map(|dt| dt.to_rfc3339()),
                order.completed_at.map(|dt| dt.to_rfc3339()),
                order.created_at.to_rfc3339(),
                order.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(order.order_id.clone())
    }

    /// 按 order_id 查询工单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT order_id, order_code, status, started_at, completed_at,
                      created_at, updated_at
               FROM work_order
               WHERE order_id = ?"#,
            params![order_id],
            map_row,
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// 映射数据库行到 WorkOrder 对象
pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<WorkOrder> {
    let status_str: String = row.get(2)?;
    Ok(WorkOrder {
        order_id: row.get(0)?,
        order_code: row.get(1)?,
        // 损坏的状态字符串不得静默降级为 RELEASED
        status: OrderStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知的工单状态: {}", status_str).into(),
            )
        })?,
        started_at: parse_ts(row.get::<_, Option<String>>(3)?),
        completed_at: parse_ts(row.get::<_, Option<String>>(4)?),
        created_at: parse_ts(Some(row.get::<_, String>(5)?)).unwrap_or_else(Utc::now),
        updated_at: parse_ts(Some(row.get::<_, String>(6)?)).unwrap_or_else(Utc::now),
    })
}

/// 解析 RFC3339 文本时间戳
pub(crate) fn parse_ts(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
