use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::error::BillingError;

/// A file received from a multipart form, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Metadata kept next to each stored object.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlobInfo {
    pub blob_key: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub created_on: DateTime<Utc>,
}

fn object_path(key: Uuid) -> String {
    format!("bills/{key}")
}

/// Write the object first, then its metadata row. A failed metadata insert
/// leaves an unreferenced object behind, never a dangling row.
#[tracing::instrument(skip(pool, blobs, file), fields(filename = %file.filename, size = file.data.len()), err)]
pub async fn put(
    pool: &PgPool,
    blobs: &opendal::Operator,
    file: UploadedFile,
) -> Result<BlobInfo, BillingError> {
    let key = Uuid::new_v4();
    let size = i64::try_from(file.data.len()).unwrap_or(i64::MAX);

    blobs.write(&object_path(key), file.data).await?;

    let info = sqlx::query_as::<_, BlobInfo>(
        r"
        INSERT INTO blob_info (blob_key, filename, content_type, size)
        VALUES ($1, $2, $3, $4)
        RETURNING blob_key, filename, content_type, size, created_on
        ",
    )
    .bind(key)
    .bind(&file.filename)
    .bind(&file.content_type)
    .bind(size)
    .fetch_one(pool)
    .await?;

    Ok(info)
}

pub async fn stat(pool: &PgPool, key: Uuid) -> Result<BlobInfo, BillingError> {
    sqlx::query_as::<_, BlobInfo>(
        r"
        SELECT blob_key, filename, content_type, size, created_on
        FROM blob_info WHERE blob_key = $1
        ",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("blob"))
}

pub async fn read(blobs: &opendal::Operator, key: Uuid) -> Result<Bytes, BillingError> {
    let buf = blobs.read(&object_path(key)).await?;
    Ok(buf.to_bytes())
}

/// `Content-Disposition` value for downloading a stored file.
pub fn attachment_header(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_is_namespaced() {
        let key = Uuid::nil();
        assert_eq!(
            object_path(key),
            "bills/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn attachment_header_quotes_filename() {
        assert_eq!(
            attachment_header("invoice march.pdf"),
            "attachment; filename=\"invoice march.pdf\""
        );
    }

    #[test]
    fn attachment_header_strips_quotes_and_newlines() {
        assert_eq!(
            attachment_header("a\"b\r\nc.pdf"),
            "attachment; filename=\"a_b__c.pdf\""
        );
    }

    #[tokio::test]
    async fn read_returns_written_bytes() {
        let op = opendal::Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        let key = Uuid::new_v4();
        op.write(&object_path(key), Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();

        let data = read(&op, key).await.unwrap();
        assert_eq!(&data[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn read_missing_object_is_blob_error() {
        let op = opendal::Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        let err = read(&op, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BillingError::Blob(ref e) if e.kind() == opendal::ErrorKind::NotFound));
    }
}
