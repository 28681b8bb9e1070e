//! Credential store: OAuth connect, lookup, and disconnect
//!
//! One active credential per user. Disconnecting deactivates the row
//! instead of deleting it, keeping the connection history auditable.

use base64::Engine;
use rand::Rng;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

use crate::config::NetworkConfig;
use crate::db::Database;
use crate::error::{DbError, PostlineError, Result};
use crate::network::SocialNetwork;
use crate::types::Credential;

/// Authorization states older than this are rejected and purged
const STATE_TTL_SECS: i64 = 600;

pub struct CredentialStore {
    db: Arc<Database>,
    network: Arc<dyn SocialNetwork>,
    config: NetworkConfig,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>, network: Arc<dyn SocialNetwork>, config: NetworkConfig) -> Self {
        Self {
            db,
            network,
            config,
        }
    }

    /// Build the external authorization URL with a fresh opaque state token.
    ///
    /// The state is stored for later validation; no external call is made.
    pub async fn begin_authorization(&self, user_id: &str) -> Result<String> {
        let state = generate_state();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO oauth_states (state, user_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&state)
        .bind(user_id)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        // The state is URL-safe base64 and goes in verbatim; the callback
        // hands it back exactly as stored
        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.config.authorize_url,
            percent_encode(&self.config.client_id),
            percent_encode(&self.config.redirect_uri),
            percent_encode(&self.config.scope),
            state,
        ))
    }

    /// Exchange the one-time code, fetch the profile, and persist the
    /// credential as the user's single active row.
    ///
    /// Exchange and profile fetch must both succeed or nothing is written.
    pub async fn complete_authorization(
        &self,
        user_id: &str,
        code: &str,
        state: &str,
    ) -> Result<Credential> {
        let now = chrono::Utc::now().timestamp();
        self.consume_state(user_id, state, now).await?;

        let token = self.network.exchange_code(code).await?;
        let profile = self.network.fetch_profile(&token.access_token).await?;

        let credential = Credential {
            id: None,
            user_id: user_id.to_string(),
            external_id: profile.id,
            access_token: token.access_token,
            scope: token.scope,
            expires_at: now + token.expires_in,
            is_active: true,
            display_name: profile.display_name,
            picture_url: profile.picture_url,
            connected_at: now,
            disconnected_at: None,
        };

        // Deactivate-then-insert in one transaction keeps the one-active-row
        // invariant across reconnects
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::query(
            r#"
            UPDATE credentials SET is_active = 0, disconnected_at = ?
            WHERE user_id = ? AND is_active = 1
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?;

        let row = sqlx::query(
            r#"
            INSERT INTO credentials (
                user_id, external_id, access_token, scope, expires_at,
                is_active, display_name, picture_url, connected_at, disconnected_at
            )
            VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, NULL)
            RETURNING id
            "#,
        )
        .bind(&credential.user_id)
        .bind(&credential.external_id)
        .bind(&credential.access_token)
        .bind(&credential.scope)
        .bind(credential.expires_at)
        .bind(&credential.display_name)
        .bind(&credential.picture_url)
        .bind(credential.connected_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?;

        tx.commit().await.map_err(DbError::SqlxError)?;

        Ok(Credential {
            id: Some(row.get("id")),
            ..credential
        })
    }

    /// Return the user's single active credential, if any
    pub async fn get_active_credential(&self, user_id: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM credentials
            WHERE user_id = ? AND is_active = 1
            ORDER BY connected_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| row_to_credential(&r)))
    }

    /// Deactivate the user's active credential. Idempotent.
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE credentials SET is_active = 0, disconnected_at = ?
            WHERE user_id = ? AND is_active = 1
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Drop authorization states past their TTL
    pub async fn purge_expired_states(&self, now: i64) -> Result<()> {
        sqlx::query("DELETE FROM oauth_states WHERE created_at <= ?")
            .bind(now - STATE_TTL_SECS)
            .execute(self.db.pool())
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Atomically consume a pending state row. The DELETE .. RETURNING keeps
    /// two concurrent completions from both accepting the same state.
    async fn consume_state(&self, user_id: &str, state: &str, now: i64) -> Result<()> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM oauth_states
            WHERE state = ? AND user_id = ? AND created_at > ?
            RETURNING state
            "#,
        )
        .bind(state)
        .bind(user_id)
        .bind(now - STATE_TTL_SECS)
        .fetch_optional(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        if row.is_none() {
            return Err(PostlineError::InvalidInput(
                "unknown or expired authorization state".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random opaque state for CSRF protection
fn generate_state() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn percent_encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}

fn row_to_credential(r: &SqliteRow) -> Credential {
    Credential {
        id: Some(r.get("id")),
        user_id: r.get("user_id"),
        external_id: r.get("external_id"),
        access_token: r.get("access_token"),
        scope: r.get("scope"),
        expires_at: r.get("expires_at"),
        is_active: r.get::<i64, _>("is_active") != 0,
        display_name: r.get("display_name"),
        picture_url: r.get("picture_url"),
        connected_at: r.get("connected_at"),
        disconnected_at: r.get("disconnected_at"),
    }
}
