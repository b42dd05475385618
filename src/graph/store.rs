//! Typed reads and merge-by-key writes against the graph tables.

use rusqlite::{params, params_from_iter, Transaction};

use crate::db::Db;
use crate::graph::{Fact, FactFilter, FactRecord, METRIC_LABEL};
use crate::{Result, FinbotError};

const FACT_PATH_SQL: &str = "\
    FROM years y \
    JOIN has_metric hm ON hm.year_id = y.year_id \
    JOIN metrics m ON m.metric_id = hm.metric_id \
    JOIN has_value hv ON hv.metric_id = m.metric_id \
    JOIN value_nodes v ON v.value_id = hv.value_id";

/// All Year node values, ascending.
pub async fn year_values(db: &Db) -> Result<Vec<String>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT value FROM years ORDER BY value")?;
        let years = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(years)
    })
    .await
}

/// Facts matching `filter`, ordered by year then metric name, at most `limit` rows.
pub async fn query_facts(db: &Db, filter: &FactFilter, limit: usize) -> Result<Vec<Fact>> {
    let (clause, mut bound) = filter.to_sql();
    bound.push(rusqlite::types::Value::Integer(
        i64::try_from(limit).map_err(|_| FinbotError::InvalidInput(format!("row limit too large: {}", limit)))?,
    ));
    let sql = format!(
        "SELECT y.value, m.name, v.amount {} WHERE {} ORDER BY y.value ASC, m.name ASC LIMIT ?",
        FACT_PATH_SQL, clause
    );

    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok(Fact {
                year: row.get(0)?,
                node_type: METRIC_LABEL.to_string(),
                metric: row.get(1)?,
                value: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}

/// Number of (year, metric, value) paths in the graph.
pub async fn count_facts(db: &Db) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) {}", FACT_PATH_SQL);
    let count: i64 = db
        .with_connection(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
        .await?;
    Ok(count as usize)
}

/// Merge one triple into the graph; existing nodes and edges are reused.
pub async fn upsert_fact(db: &Db, record: &FactRecord) -> Result<()> {
    let record = record.clone();
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        merge_fact(&tx, &record)?;
        tx.commit()?;
        Ok(())
    })
    .await
}

/// Merge within an open transaction, so a loader can batch one row's cells.
pub(crate) fn merge_fact(tx: &Transaction<'_>, record: &FactRecord) -> Result<()> {
    tx.execute(
        "INSERT INTO years (value) VALUES (?1) ON CONFLICT(value) DO NOTHING",
        params![record.year],
    )?;
    tx.execute(
        "INSERT INTO metrics (name, amount) VALUES (?1, ?2) ON CONFLICT(name, amount) DO NOTHING",
        params![record.metric, record.value],
    )?;
    tx.execute(
        "INSERT INTO value_nodes (amount) VALUES (?1) ON CONFLICT(amount) DO NOTHING",
        params![record.value],
    )?;

    let year_id: i64 = tx.query_row(
        "SELECT year_id FROM years WHERE value = ?1",
        params![record.year],
        |row| row.get(0),
    )?;
    let metric_id: i64 = tx.query_row(
        "SELECT metric_id FROM metrics WHERE name = ?1 AND amount = ?2",
        params![record.metric, record.value],
        |row| row.get(0),
    )?;
    let value_id: i64 = tx.query_row(
        "SELECT value_id FROM value_nodes WHERE amount = ?1",
        params![record.value],
        |row| row.get(0),
    )?;

    tx.execute(
        "INSERT INTO has_metric (year_id, metric_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
        params![year_id, metric_id],
    )?;
    tx.execute(
        "INSERT INTO has_value (metric_id, value_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
        params![metric_id, value_id],
    )?;

    log::trace!("Merged [{}] {} = {}", record.year, record.metric, record.value);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testutil::{migrated_db, seed};
    use super::*;

    #[tokio::test]
    async fn test_year_values_sorted_and_unique() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2021", "Revenue", 3.0), ("2019", "Revenue", 1.0), ("2021", "Fuel Cost", 9.0)]).await;

        assert_eq!(year_values(&db).await.unwrap(), vec!["2019", "2021"]);
    }

    #[tokio::test]
    async fn test_query_facts_order_and_type() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[
            ("2020", "Revenue", 20.0),
            ("2019", "Revenue", 10.0),
            ("2019", "Fuel Cost", 5.0),
        ]).await;

        let facts = query_facts(&db, &FactFilter::True, 100).await.unwrap();
        let rendered: Vec<String> = facts.iter().map(Fact::render).collect();
        assert_eq!(
            rendered,
            vec![
                "[2019] Metric | Fuel Cost → 5",
                "[2019] Metric | Revenue → 10",
                "[2020] Metric | Revenue → 20",
            ]
        );
    }

    #[tokio::test]
    async fn test_query_facts_filter_and_limit() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[
            ("2019", "Fuel Cost", 100.0),
            ("2020", "Fuel Cost", 150.0),
            ("2020", "Revenue", 999.0),
        ]).await;

        let fuel = FactFilter::MetricContains("FUEL".into());
        let facts = query_facts(&db, &fuel, 100).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.metric == "Fuel Cost"));

        let capped = query_facts(&db, &FactFilter::True, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].year, "2019");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (db, _temp) = migrated_db().await;
        let facts = [("2019", "Fuel Cost", 100.0), ("2020", "Fuel Cost", 150.0)];
        seed(&db, &facts).await;
        seed(&db, &facts).await;

        assert_eq!(count_facts(&db).await.unwrap(), 2);
        let metric_nodes: i64 = db
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM metrics", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(metric_nodes, 2);
    }

    #[tokio::test]
    async fn test_same_name_and_amount_share_metric_node() {
        let (db, _temp) = migrated_db().await;
        seed(&db, &[("2019", "Load Factor", 80.0), ("2020", "Load Factor", 80.0)]).await;

        let (metrics, values): (i64, i64) = db
            .with_connection(|conn| {
                let m = conn.query_row("SELECT COUNT(*) FROM metrics", [], |r| r.get(0))?;
                let v = conn.query_row("SELECT COUNT(*) FROM value_nodes", [], |r| r.get(0))?;
                Ok((m, v))
            })
            .await
            .unwrap();
        assert_eq!((metrics, values), (1, 1));
        // Both years still reach the value through the shared node
        assert_eq!(count_facts(&db).await.unwrap(), 2);
    }
}
