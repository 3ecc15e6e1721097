// ==========================================
// 制造订单执行引擎 - 执行日志仓储
// ==========================================
// 职责: execution_log 表的追加与查询
// 红线: 日志写入失败不得阻断转换,由调用方降级为 warn
// ==========================================

use crate::domain::order::ExecutionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo::parse_ts;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ExecutionLogRepository - 执行日志仓储
// ==========================================
pub struct ExecutionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExecutionLogRepository {
    /// 创建新的 ExecutionLogRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条执行日志
    pub fn insert(&self, log: &ExecutionLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO execution_log (
                log_id, order_id, operation_id, action_type, actor,
                payload_json, detail, action_ts
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &log.log_id,
                &log.order_id,
                &log.operation_id,
                &log.action_type,
                &log.actor,
                &log.payload_json,
                &log.detail,
                log.action_ts.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// 查询某工序的执行日志 (按时间升序)
    pub fn find_by_operation(&self, operation_id: &str) -> RepositoryResult<Vec<ExecutionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT log_id, order_id, operation_id, action_type, actor,
                      payload_json, detail, action_ts
               FROM execution_log
               WHERE operation_id = ?
               ORDER BY action_ts ASC"#,
        )?;

        let logs = stmt
            .query_map(params![operation_id], |row| {
                Ok(ExecutionLog {
                    log_id: row.get(0)?,
                    order_id: row.get(1)?,
                    operation_id: row.get(2)?,
                    action_type: row.get(3)?,
                    actor: row.get(4)?,
                    payload_json: row.get(5)?,
                    detail: row.get(6)?,
                    action_ts: parse_ts(Some(row.get::<_, String>(7)?))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<Result<Vec<ExecutionLog>, _>>()?;

        Ok(logs)
    }
}
