use rusqlite::params;

use super::*;
use crate::types::AlertSubscription;

impl TwinDb {
    /// Insert a subscription. Neither contact is required at write time;
    /// a row with both absent is accepted and never dispatched to.
    pub fn insert_subscription(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO alert_subs (email, phone, created_at) VALUES (?1, ?2, ?3)",
            params![email, phone, now_timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All subscriptions, oldest first.
    pub fn list_subscriptions(&self) -> Result<Vec<AlertSubscription>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, phone, created_at FROM alert_subs ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AlertSubscription {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    phone: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
