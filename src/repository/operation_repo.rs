// ==========================================
// 制造订单执行引擎 - 工序台账仓储
// ==========================================
// 职责: work_order_operation 表的数据访问,工序状态的唯一事实层
// 并发控制: 状态转换使用条件更新 (WHERE status IN ...) 作为守卫,
//           同一工序的并发转换恰有一个生效,落空方得到 0 行
// 读一致性: 工单状态派生在同一事务内读取转换后的工序快照,
//           外部观察者看到的工单状态必然对应某个有效快照
// ==========================================

use crate::domain::order::{Operation, WorkOrder};
use crate::domain::status::derive_order_status;
use crate::domain::types::{OperationStatus, OrderStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

/// 转换事务的结果 (转换后的工序与工单快照)
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// 转换后的工序
    pub operation: Operation,
    /// 转换后的工单 (状态已重新派生)
    pub order: WorkOrder,
    /// 工单状态是否因本次转换发生变化
    pub order_status_changed: bool,
}

// ==========================================
// OperationRepository - 工序台账仓储
// ==========================================
pub struct OperationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OperationRepository {
    /// 创建新的 OperationRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建工序 (工单下达时批量写入/测试夹具)
    ///
    /// 同一工单内 seq_no 重复由 UNIQUE(order_id, seq_no) 拒绝,
    /// 上抛 UniqueConstraintViolation。
    pub fn create(&self, op: &Operation) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO work_order_operation (
                operation_id, order_id, seq_no, op_name, stage_tag, status,
                resource_code, operator, planned_duration_min,
                actual_start, actual_end, actual_duration_min,
                quantity_completed, quantity_scrapped, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &op.operation_id,
                &op.order_id,
                &op.seq_no,
                &op.op_name,
                &op.stage_tag,
                op.status.to_db_str(),
                &op.resource_code,
                &op.operator,
                &op.planned_duration_min,
                op.actual_start.map(|dt| dt.to_rfc3339()),
                op.actual_end.map(|dt| dt.to_rfc3339()),
                &op.actual_duration_min,
                &op.quantity_completed,
                &op.quantity_scrapped,
                &op.notes,
                op.created_at.to_rfc3339(),
                op.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(op.operation_id.clone())
    }

    /// 按工单与工序ID查询 (归属校验: 工序不属于该工单时返回 None)
    pub fn find_by_id(
        &self,
        order_id: &str,
        operation_id: &str,
    ) -> RepositoryResult<Option<Operation>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE operation_id = ? AND order_id = ?", SELECT_OPERATION),
            params![operation_id, order_id],
            map_row,
        ) {
            Ok(op) => Ok(Some(op)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询工单的全部工序 (按 seq_no 升序)
    pub fn list_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Operation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE order_id = ? ORDER BY seq_no ASC",
            SELECT_OPERATION
        ))?;

        let ops = stmt
            .query_map(params![order_id], map_row)?
            .collect::<Result<Vec<Operation>, _>>()?;

        Ok(ops)
    }

    /// 查询工单内执行中的工序
    pub fn find_running_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Operation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE order_id = ? AND status = 'RUNNING' ORDER BY seq_no ASC",
            SELECT_OPERATION
        ))?;

        let ops = stmt
            .query_map(params![order_id], map_row)?
            .collect::<Result<Vec<Operation>, _>>()?;

        Ok(ops)
    }

    /// 查询绑定某资源且执行中的工序 (跨工单,资源冲突扫描用)
    pub fn find_running_by_resource(
        &self,
        resource_code: &str,
    ) -> RepositoryResult<Vec<Operation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE resource_code = ? AND status = 'RUNNING'",
            SELECT_OPERATION
        ))?;

        let ops = stmt
            .query_map(params![resource_code], map_row)?
            .collect::<Result<Vec<Operation>, _>>()?;

        Ok(ops)
    }

    /// 开工转换 (条件更新 + 工单状态重派生,单事务)
    ///
    /// 守卫: status IN (PENDING, QUEUED)。守卫落空返回 Ok(None),
    /// 事务回滚,工序与工单均不变 (失败即 no-op)。
    pub fn apply_start(
        &self,
        order_id: &str,
        operation_id: &str,
        now: DateTime<Utc>,
        resource_code: Option<&str>,
        operator: Option<&str>,
        new_notes: Option<&str>,
    ) -> RepositoryResult<Option<TransitionOutcome>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE work_order_operation
               SET status = 'RUNNING',
                   resource_code = COALESCE(?, resource_code),
                   operator = COALESCE(?, operator),
                   actual_start = ?,
                   notes = COALESCE(?, notes),
                   updated_at = ?
               WHERE operation_id = ? AND order_id = ?
                 AND status IN ('PENDING', 'QUEUED')"#,
            params![
                resource_code,
                operator,
                now.to_rfc3339(),
                new_notes,
                now.to_rfc3339(),
                operation_id,
                order_id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        let outcome = finalize_transition(&tx, order_id, operation_id, now)?;
        tx.commit()?;
        Ok(Some(outcome))
    }

    /// 完工转换 (条件更新 + 工单状态重派生,单事务)
    ///
    /// 守卫: status = RUNNING。actual_duration_min 由调用方给出
    /// (覆盖值或 now - actual_start 的派生值)。
    #[allow(clippy::too_many_arguments)]
    pub fn apply_complete(
        &self,
        order_id: &str,
        operation_id: &str,
        now: DateTime<Utc>,
        actual_duration_min: i64,
        quantity_completed: f64,
        quantity_scrapped: f64,
        new_notes: Option<&str>,
    ) -> RepositoryResult<Option<TransitionOutcome>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE work_order_operation
               SET status = 'COMPLETE',
                   actual_end = ?,
                   actual_duration_min = ?,
                   quantity_completed = ?,
                   quantity_scrapped = ?,
                   notes = COALESCE(?, notes),
                   updated_at = ?
               WHERE operation_id = ? AND order_id = ?
                 AND status = 'RUNNING'"#,
            params![
                now.to_rfc3339(),
                actual_duration_min,
                quantity_completed,
                quantity_scrapped,
                new_notes,
                now.to_rfc3339(),
                operation_id,
                order_id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        let outcome = finalize_transition(&tx, order_id, operation_id, now)?;
        tx.commit()?;
        Ok(Some(outcome))
    }

    /// 跳过转换 (条件更新 + 工单状态重派生,单事务)
    ///
    /// 守卫: status IN (PENDING, QUEUED)。跳过原因由调用方
    /// 以 SKIPPED: 前缀追加进 new_notes。
    pub fn apply_skip(
        &self,
        order_id: &str,
        operation_id: &str,
        now: DateTime<Utc>,
        new_notes: &str,
    ) -> RepositoryResult<Option<TransitionOutcome>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE work_order_operation
               SET status = 'SKIPPED',
                   notes = ?,
                   updated_at = ?
               WHERE operation_id = ? AND order_id = ?
                 AND status IN ('PENDING', 'QUEUED')"#,
            params![new_notes, now.to_rfc3339(), operation_id, order_id],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        let outcome = finalize_transition(&tx, order_id, operation_id, now)?;
        tx.commit()?;
        Ok(Some(outcome))
    }
}

// ==========================================
// 事务内收尾: 重派生工单状态 + 读取转换后快照
// ==========================================
fn finalize_transition(
    tx: &Transaction,
    order_id: &str,
    operation_id: &str,
    now: DateTime<Utc>,
) -> RepositoryResult<TransitionOutcome> {
    // 1. 读取转换后的同胞工序状态快照
    let mut stmt = tx.prepare("SELECT status FROM work_order_operation WHERE order_id = ?")?;
    let statuses = stmt
        .query_map(params![order_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<String>, _>>()?;
    drop(stmt);

    let statuses: Vec<OperationStatus> = statuses
        .iter()
        .map(|s| {
            OperationStatus::from_db_str(s).ok_or_else(|| {
                RepositoryError::ValidationError(format!("未知的工序状态: {}", s))
            })
        })
        .collect::<RepositoryResult<Vec<_>>>()?;

    // 2. 读取工单当前存储状态
    let order = tx.query_row(
        r#"SELECT order_id, order_code, status, started_at, completed_at,
                  created_at, updated_at
           FROM work_order WHERE order_id = ?"#,
        params![order_id],
        order_repo::map_row,
    )?;

    // 3. 派生并按变化检测写回 (时间戳副作用只在状态实际变化时应用)
    let derived = derive_order_status(&statuses, order.status);
    let changed = derived != order.status;

    if changed {
        let started_at = match (derived, order.started_at) {
            (OrderStatus::InProgress | OrderStatus::Complete, None) => Some(now),
            (_, existing) => existing,
        };
        let completed_at = match derived {
            OrderStatus::Complete => order.completed_at.or(Some(now)),
            _ => None,
        };

        tx.execute(
            r#"UPDATE work_order
               SET status = ?, started_at = ?, completed_at = ?, updated_at = ?
               WHERE order_id = ?"#,
            params![
                derived.to_db_str(),
                started_at.map(|dt| dt.to_rfc3339()),
                completed_at.map(|dt| dt.to_rfc3339()),
                now.to_rfc3339(),
                order_id,
            ],
        )?;
    }

    // 4. 读取转换后的工序与工单
    let operation = tx.query_row(
        &format!("{} WHERE operation_id = ?", SELECT_OPERATION),
        params![operation_id],
        map_row,
    )?;
    let order = tx.query_row(
        r#"SELECT order_id, order_code, status, started_at, completed_at,
                  created_at, updated_at
           FROM work_order WHERE order_id = ?"#,
        params![order_id],
        order_repo::map_row,
    )?;

    Ok(TransitionOutcome {
        operation,
        order,
        order_status_changed: changed,
    })
}

/// 工序查询列清单 (与 map_row 列序一致)
const SELECT_OPERATION: &str = r#"SELECT operation_id, order_id, seq_no, op_name, stage_tag, status,
           resource_code, operator, planned_duration_min,
           actual_start, actual_end, actual_duration_min,
           quantity_completed, quantity_scrapped, notes,
           created_at, updated_at
    FROM work_order_operation"#;

/// 映射数据库行到 Operation 对象
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Operation> {
    let status_str: String = row.get(5)?;
    Ok(Operation {
        operation_id: row.get(0)?,
        order_id: row.get(1)?,
        seq_no: row.get(2)?,
        op_name: row.get(3)?,
        stage_tag: row.get(4)?,
        // 损坏的状态字符串不得静默降级,否则终态行会被当作可开工
        status: OperationStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                format!("未知的工序状态: {}", status_str).into(),
            )
        })?,
        resource_code: row.get(6)?,
        operator: row.get(7)?,
        planned_duration_min: row.get(8)?,
        actual_start: order_repo::parse_ts(row.get::<_, Option<String>>(9)?),
        actual_end: order_repo::parse_ts(row.get::<_, Option<String>>(10)?),
        actual_duration_min: row.get(11)?,
        quantity_completed: row.get(12)?,
        quantity_scrapped: row.get(13)?,
        notes: row.get(14)?,
        created_at: order_repo::parse_ts(Some(row.get::<_, String>(15)?))
            .unwrap_or_else(Utc::now),
        updated_at: order_repo::parse_ts(Some(row.get::<_, String>(16)?))
            .unwrap_or_else(Utc::now),
    })
}
