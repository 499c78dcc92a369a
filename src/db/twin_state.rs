use rusqlite::params;

use super::*;
use crate::types::TwinStateRecord;

impl TwinDb {
    /// Append one twin-state row. Rows are never updated or deleted; the
    /// single INSERT runs in its own transaction so a cycle either persists
    /// completely or not at all.
    pub fn append_twin_state(&self, record: &TwinStateRecord) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO twin_state (t, u_mm, v_mmph, p_kpa, r_mm, fs_hat, risk_prob, risk_class)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.t,
                    record.u_mm,
                    record.v_mmph,
                    record.p_kpa,
                    record.r_mm,
                    record.fs_hat,
                    record.risk_prob,
                    record.risk_class,
                ],
            )?;
            Ok(())
        })
    }

    /// Most recent twin-state rows, newest first.
    pub fn latest_twin_states(&self, limit: usize) -> Result<Vec<TwinStateRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT t, u_mm, v_mmph, p_kpa, r_mm, fs_hat, risk_prob, risk_class
             FROM twin_state ORDER BY t DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(TwinStateRecord {
                    t: row.get(0)?,
                    u_mm: row.get(1)?,
                    v_mmph: row.get(2)?,
                    p_kpa: row.get(3)?,
                    r_mm: row.get(4)?,
                    fs_hat: row.get(5)?,
                    risk_prob: row.get(6)?,
                    risk_class: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
