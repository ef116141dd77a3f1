//! QR codes, scan counting and dashboard queries
//!
//! Every query except the redirect lookup is scoped by owner `user_id`.

use chrono::{DateTime, Utc};
use shared::models::{DashboardStats, QrCode, QrCodeUpdate};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewQrCode, ScanInfo};

/// Number of codes shown on the dashboard
pub const RECENT_LIMIT: i64 = 5;

const QR_COLUMNS: &str = "id, user_id, title, google_business_url, short_code, scan_count,
    fg_color, bg_color, logo_url, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct QrCodeRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    google_business_url: String,
    short_code: String,
    scan_count: i64,
    fg_color: Option<String>,
    bg_color: Option<String>,
    logo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QrCodeRow> for QrCode {
    fn from(row: QrCodeRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            google_business_url: row.google_business_url,
            short_code: row.short_code,
            scan_count: row.scan_count,
            fg_color: row.fg_color,
            bg_color: row.bg_color,
            logo_url: row.logo_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<QrCode>, sqlx::Error> {
    let rows: Vec<QrCodeRow> = sqlx::query_as(&format!(
        "SELECT {QR_COLUMNS} FROM qr_codes WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Returns `None` if the short code collides with an existing one
pub async fn create(pool: &PgPool, qr: &NewQrCode) -> Result<Option<QrCode>, sqlx::Error> {
    let row: Option<QrCodeRow> = sqlx::query_as(&format!(
        "INSERT INTO qr_codes (id, user_id, title, google_business_url, short_code,
            fg_color, bg_color, logo_url)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (short_code) DO NOTHING
         RETURNING {QR_COLUMNS}"
    ))
    .bind(qr.id)
    .bind(qr.user_id)
    .bind(&qr.title)
    .bind(&qr.google_business_url)
    .bind(&qr.short_code)
    .bind(&qr.style.fg_color)
    .bind(&qr.style.bg_color)
    .bind(&qr.style.logo_url)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Patch a code owned by `user_id`; an empty string clears a style field
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    update: &QrCodeUpdate,
) -> Result<Option<QrCode>, sqlx::Error> {
    let row: Option<QrCodeRow> = sqlx::query_as(&format!(
        "UPDATE qr_codes SET
            title = COALESCE($3, title),
            google_business_url = COALESCE($4, google_business_url),
            fg_color = NULLIF(COALESCE($5, fg_color), ''),
            bg_color = NULLIF(COALESCE($6, bg_color), ''),
            logo_url = NULLIF(COALESCE($7, logo_url), ''),
            updated_at = now()
         WHERE id = $1 AND user_id = $2
         RETURNING {QR_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(&update.title)
    .bind(&update.google_business_url)
    .bind(&update.fg_color)
    .bind(&update.bg_color)
    .bind(&update.logo_url)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM qr_codes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn dashboard(pool: &PgPool, user_id: Uuid) -> Result<DashboardStats, sqlx::Error> {
    let (total_codes, total_scans): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(scan_count), 0)::BIGINT FROM qr_codes WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let recent: Vec<QrCodeRow> = sqlx::query_as(&format!(
        "SELECT {QR_COLUMNS} FROM qr_codes WHERE user_id = $1
         ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(DashboardStats {
        total_codes,
        total_scans,
        recent: recent.into_iter().map(Into::into).collect(),
    })
}

/// Increment the scan counter and record an analytics row in one transaction.
///
/// Returns the destination URL, or `None` (nothing written) for an unknown code.
pub async fn record_scan(
    pool: &PgPool,
    short_code: &str,
    scan: &ScanInfo,
) -> Result<Option<String>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let target: Option<(Uuid, String)> = sqlx::query_as(
        "UPDATE qr_codes SET scan_count = scan_count + 1
         WHERE short_code = $1
         RETURNING id, google_business_url",
    )
    .bind(short_code)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((qr_code_id, destination)) = target else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("INSERT INTO analytics (qr_code_id, user_agent, referrer) VALUES ($1, $2, $3)")
        .bind(qr_code_id)
        .bind(&scan.user_agent)
        .bind(&scan.referrer)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::profiles;
    use shared::models::QrStyle;

    async fn seed(pool: &PgPool, short_code: &str) -> (Uuid, QrCode) {
        let user_id = Uuid::new_v4();
        profiles::ensure(pool, user_id, "pg@example.com").await.unwrap();
        let qr = create(
            pool,
            &NewQrCode {
                id: Uuid::new_v4(),
                user_id,
                title: "Front desk".into(),
                google_business_url: "https://g.page/r/front-desk/review".into(),
                short_code: short_code.into(),
                style: QrStyle {
                    fg_color: Some("#112233".into()),
                    bg_color: None,
                    logo_url: None,
                },
            },
        )
        .await
        .unwrap()
        .unwrap();
        (user_id, qr)
    }

    async fn analytics_rows(pool: &PgPool, qr_code_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM analytics WHERE qr_code_id = $1")
            .bind(qr_code_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL with Postgres server"]
    async fn concurrent_scans_are_all_counted(pool: PgPool) {
        let (user_id, qr) = seed(&pool, "scan0001").await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let scan = ScanInfo {
                    user_agent: Some("pg-test".into()),
                    referrer: None,
                };
                record_scan(&pool, "scan0001", &scan).await
            }));
        }
        for handle in handles {
            let destination = handle.await.unwrap().unwrap();
            assert_eq!(destination.as_deref(), Some("https://g.page/r/front-desk/review"));
        }

        let stats = dashboard(&pool, user_id).await.unwrap();
        assert_eq!(stats.total_codes, 1);
        assert_eq!(stats.total_scans, 10);
        assert_eq!(analytics_rows(&pool, qr.id).await, 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL with Postgres server"]
    async fn unknown_code_writes_nothing(pool: PgPool) {
        let (user_id, qr) = seed(&pool, "scan0002").await;

        let destination = record_scan(&pool, "zzzz9999", &ScanInfo::default()).await.unwrap();
        assert_eq!(destination, None);

        assert_eq!(dashboard(&pool, user_id).await.unwrap().total_scans, 0);
        assert_eq!(analytics_rows(&pool, qr.id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL with Postgres server"]
    async fn duplicate_short_code_is_none(pool: PgPool) {
        let (user_id, _) = seed(&pool, "dup00001").await;
        let again = create(
            &pool,
            &NewQrCode {
                id: Uuid::new_v4(),
                user_id,
                title: "Other".into(),
                google_business_url: "https://g.page/r/other/review".into(),
                short_code: "dup00001".into(),
                style: QrStyle::default(),
            },
        )
        .await
        .unwrap();
        assert!(again.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL with Postgres server"]
    async fn update_clears_empty_fields_and_is_owner_scoped(pool: PgPool) {
        let (user_id, qr) = seed(&pool, "upd00001").await;

        let patch = QrCodeUpdate {
            title: Some("Lobby".into()),
            fg_color: Some(String::new()),
            bg_color: Some("#ffffff".into()),
            ..QrCodeUpdate::default()
        };
        let updated = update(&pool, user_id, qr.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "Lobby");
        assert_eq!(updated.google_business_url, qr.google_business_url);
        assert_eq!(updated.fg_color, None);
        assert_eq!(updated.bg_color.as_deref(), Some("#ffffff"));

        assert!(update(&pool, Uuid::new_v4(), qr.id, &patch).await.unwrap().is_none());
        assert!(!delete(&pool, Uuid::new_v4(), qr.id).await.unwrap());
        assert!(delete(&pool, user_id, qr.id).await.unwrap());
        assert!(list_by_user(&pool, user_id).await.unwrap().is_empty());
    }
}
