//! Append-only price series.
//!
//! "Latest" is the row with the greatest `created_at` for an asset, found
//! with a max-per-key subquery joined back to the table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;

use super::database::model::{encode_time, PriceRow, TotalRow};
use super::database::schema::assets;
use super::store::{db_err, SqliteStore};
use crate::domain::{AssetId, HistoryInterval, PricePoint};
use crate::error::Result;
use crate::port::{AssetTable, Table};

const LATEST_PER_ASSET: &str = "\
    SELECT a.asset_id, a.created_at, a.price FROM assets a \
    JOIN (SELECT asset_id, MAX(created_at) AS created_at FROM assets GROUP BY asset_id) latest \
      ON a.asset_id = latest.asset_id AND a.created_at = latest.created_at \
    ORDER BY a.created_at DESC";

const LATEST_PER_BUCKET: &str = "\
    SELECT a.asset_id, a.created_at, a.price FROM assets a \
    JOIN (SELECT MAX(created_at) AS created_at FROM assets \
          WHERE asset_id = ?1 AND created_at >= ?2 \
          GROUP BY strftime(?3, created_at)) bucket \
      ON a.created_at = bucket.created_at \
    WHERE a.asset_id = ?1 \
    ORDER BY a.created_at DESC";

const PRUNE_BEFORE: &str = "\
    DELETE FROM assets WHERE created_at < ?1 \
      AND created_at < (SELECT MAX(b.created_at) FROM assets b WHERE b.asset_id = assets.asset_id)";

fn decode_all(rows: Vec<PriceRow>) -> Result<Vec<PricePoint>> {
    rows.into_iter().map(PricePoint::try_from).collect()
}

impl Table<PricePoint> for SqliteStore {
    async fn find(&self, key: &AssetId) -> Result<Option<PricePoint>> {
        let mut conn = self.conn()?;
        let row: Option<PriceRow> = assets::table
            .filter(assets::asset_id.eq(key.as_str()))
            .order(assets::created_at.desc())
            .select(PriceRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        row.map(PricePoint::try_from).transpose()
    }

    async fn insert(&self, row: &PricePoint) -> Result<PricePoint> {
        let mut conn = self.conn()?;
        diesel::insert_into(assets::table)
            .values(PriceRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(row.clone())
    }

    async fn delete(&self, key: &AssetId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(assets::table.filter(assets::asset_id.eq(key.as_str())))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(deleted > 0)
    }

    async fn load_all(&self) -> Result<Vec<PricePoint>> {
        let mut conn = self.conn()?;
        let rows: Vec<PriceRow> = diesel::sql_query(LATEST_PER_ASSET)
            .load(&mut conn)
            .map_err(db_err)?;
        decode_all(rows)
    }
}

impl AssetTable for SqliteStore {
    async fn history(
        &self,
        asset_id: &AssetId,
        interval: HistoryInterval,
        since: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let mut conn = self.conn()?;
        let rows: Vec<PriceRow> = diesel::sql_query(LATEST_PER_BUCKET)
            .bind::<Text, _>(asset_id.as_str())
            .bind::<Text, _>(encode_time(&since))
            .bind::<Text, _>(interval.bucket_format())
            .load(&mut conn)
            .map_err(db_err)?;
        decode_all(rows)
    }

    async fn total_purchased(&self, asset_id: &AssetId) -> Result<i64> {
        let mut conn = self.conn()?;
        let row: TotalRow = diesel::sql_query(
            "SELECT CAST(COALESCE(SUM(quantity), 0) AS BIGINT) AS total FROM positions WHERE asset_id = ?1",
        )
        .bind::<Text, _>(asset_id.as_str())
        .get_result(&mut conn)
        .map_err(db_err)?;
        Ok(row.total)
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.conn()?;
        diesel::sql_query(PRUNE_BEFORE)
            .bind::<Text, _>(encode_time(&cutoff))
            .execute(&mut conn)
            .map_err(db_err)
    }
}
