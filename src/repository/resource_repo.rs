// ==========================================
// 制造订单执行引擎 - 资源仓储
// ==========================================
// 职责: resource 表的数据访问 (只读为主)
// 说明: 资源的生命周期由外部资产协作方管理,
//       本引擎只在校验分配时解析 resource_code
// ==========================================

use crate::domain::order::Resource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ResourceRepository - 资源仓储
// ==========================================
pub struct ResourceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceRepository {
    /// 创建新的 ResourceRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建资源 (外部资产同步入口/测试夹具)
    pub fn create(&self, resource: &Resource) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO resource (resource_id, resource_code, resource_name)
               VALUES (?, ?, ?)"#,
            params![
                &resource.resource_id,
                &resource.resource_code,
                &resource.resource_name,
            ],
        )?;

        Ok(resource.resource_id.clone())
    }

    /// 按资源代码查询
    pub fn find_by_code(&self, resource_code: &str) -> RepositoryResult<Option<Resource>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT resource_id, resource_code, resource_name
               FROM resource WHERE resource_code = ?"#,
            params![resource_code],
            |row| {
                Ok(Resource {
                    resource_id: row.get(0)?,
                    resource_code: row.get(1)?,
                    resource_name: row.get(2)?,
                })
            },
        ) {
            Ok(resource) => Ok(Some(resource)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
