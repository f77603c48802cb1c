//! Audit log repository
//!
//! The audit sink is fire-and-forget from the core's perspective: a failed
//! audit write is logged and must never block or roll back a posting.

use sqlx::PgPool;
use uuid::Uuid;

/// One audit record emitted for a ledger mutation
///
/// `payload` carries the structured detail of the mutation (amounts,
/// references, row counts) as JSON next to the human-readable description.
#[derive(Debug, Clone)]
pub struct AuditEvent<'a> {
    pub action: &'a str,
    pub content_type: &'a str,
    pub object_id: String,
    pub description: String,
    pub payload: serde_json::Value,
    pub actor: &'a str,
}

async fn insert(pool: &PgPool, event: &AuditEvent<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, action, content_type, object_id, description, payload, actor)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.action)
    .bind(event.content_type)
    .bind(&event.object_id)
    .bind(&event.description)
    .bind(&event.payload)
    .bind(event.actor)
    .execute(pool)
    .await?;

    Ok(())
}

/// Emit an audit record, swallowing (but logging) any failure
pub async fn emit(pool: &PgPool, event: AuditEvent<'_>) {
    if let Err(e) = insert(pool, &event).await {
        tracing::warn!(
            action = event.action,
            content_type = event.content_type,
            object_id = %event.object_id,
            error = %e,
            "Audit sink write failed; continuing"
        );
    }
}
