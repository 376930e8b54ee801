use std::future::Future;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::{
    db::{
        connection::Database,
        helpers::{parse_datetime, to_i64, to_usize},
        models::StoredAttendance,
    },
    error::PersistError,
    export::{DocumentId, DocumentStore},
    models::AttendanceSnapshot,
};

fn write_document(
    conn: &Connection,
    collection: &str,
    key: &str,
    document: &Value,
) -> Result<()> {
    let Some(fields) = document.as_object() else {
        bail!("document for {collection}/{key} is not a JSON object");
    };
    let date = fields
        .get("date")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let body = serde_json::to_string(document).context("failed to encode document")?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO attendance_documents (collection, id, date, document, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT (collection, id) DO UPDATE SET
             date = excluded.date,
             document = excluded.document,
             updated_at = excluded.updated_at",
        params![collection, key, date, body, now],
    )
    .with_context(|| format!("failed to upsert {collection}/{key}"))?;
    Ok(())
}

fn row_to_stored(row: &Row) -> Result<StoredAttendance> {
    let collection: String = row.get("collection")?;
    let body: String = row.get("document")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let document: Value = serde_json::from_str(&body).context("stored document is not JSON")?;
    let saved_by = document
        .get("savedBy")
        .and_then(Value::as_str)
        .map(str::to_string);
    let snapshot: AttendanceSnapshot =
        serde_json::from_value(document).context("stored document is not a snapshot")?;

    Ok(StoredAttendance {
        collection,
        snapshot,
        saved_by,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn get_attendance(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<StoredAttendance>> {
        let collection = collection.to_string();
        let key = key.to_string();
        let stored = self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT collection, document, created_at, updated_at
                 FROM attendance_documents
                 WHERE collection = ?1 AND id = ?2",
            )?;

            let stored = stmt
                .query_row(params![collection, key], |row| Ok(row_to_stored(row)))
                .optional()?
                .transpose()?;
            Ok(stored)
        })
        .await?;
        Ok(stored)
    }

    /// Saved rosters, newest first. Keys are ISO instants, so text order is time order.
    pub async fn list_attendance(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<StoredAttendance>> {
        let collection = collection.to_string();
        let limit = to_i64(limit)?;
        let stored = self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT collection, document, created_at, updated_at
                 FROM attendance_documents
                 WHERE collection = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![collection, limit])?;
            let mut stored = Vec::new();
            while let Some(row) = rows.next()? {
                stored.push(row_to_stored(row)?);
            }
            Ok(stored)
        })
        .await?;
        Ok(stored)
    }

    pub async fn count_attendance(&self, collection: &str) -> Result<usize> {
        let collection = collection.to_string();
        let count = self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attendance_documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            to_usize(count, "count")
        })
        .await?;
        Ok(count)
    }
}

impl DocumentStore for Database {
    fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> impl Future<Output = Result<DocumentId, PersistError>> + Send {
        let db = self.clone();
        let id = DocumentId {
            collection: collection.to_string(),
            key: key.to_string(),
        };

        async move {
            let target = id.clone();
            db.execute(move |conn| {
                write_document(conn, &target.collection, &target.key, &document)
            })
            .await?;
            Ok(id)
        }
    }
}
