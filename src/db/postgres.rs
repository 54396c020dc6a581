// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{PresetPreview, Store};
use crate::error::StoreError;
use crate::models::{
    Account, Balance, ImageGeneration, MusicGeneration, NewAccount, NewImageGeneration,
    NewMusicGeneration, NewTransaction, Page, SettleOutcome, Settlement, Transaction,
    TransactionState,
};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, nombre, creditos, creditos_usados, \
     is_active, is_verified, stripe_customer_id, google_id, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, user_id, nombre_producto, descripcion_producto, marca, estilo, \
     imagen_generada_path, prompt_generado, copy_facebook, hashtags_facebook, copy_instagram, \
     hashtags_instagram, estado, error_mensaje, tiempo_procesamiento_ms, created_at, completed_at";

const MUSIC_COLUMNS: &str = "id, user_id, titulo, descripcion, duracion_segundos, es_instrumental, \
     genero, mood, idioma_letra, prompt_openai, prompt_musicgpt, music_style, lyrics_theme, \
     audio_path, audio_url, musicgpt_conversion_id, estado, error_mensaje, \
     tiempo_procesamiento_ms, created_at, completed_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, stripe_checkout_session_id, creditos, \
     monto_mxn_centavos, monto_usd_centavos, estado, descripcion, created_at, completed_at";

/// Postgres-backed store. Queries are built at runtime so the crate compiles
/// without a live database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(r: &PgRow) -> Account {
    Account {
        id: r.get("id"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        display_name: r.get("nombre"),
        credits_available: r.get("creditos"),
        credits_used: r.get("creditos_usados"),
        is_active: r.get("is_active"),
        is_verified: r.get("is_verified"),
        payment_customer_id: r.get("stripe_customer_id"),
        identity_provider_id: r.get("google_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn hashtags(r: &PgRow, column: &str) -> Option<Vec<String>> {
    r.get::<Option<Json<Vec<String>>>, _>(column).map(|Json(tags)| tags)
}

fn image_from_row(r: &PgRow) -> Result<ImageGeneration, StoreError> {
    Ok(ImageGeneration {
        id: r.get("id"),
        account_id: r.get("user_id"),
        product_name: r.get("nombre_producto"),
        product_description: r.get("descripcion_producto"),
        brand: r.get("marca"),
        preset_id: r.get("estilo"),
        image_path: r.get("imagen_generada_path"),
        generated_prompt: r.get("prompt_generado"),
        facebook_copy: r.get("copy_facebook"),
        facebook_hashtags: hashtags(r, "hashtags_facebook"),
        instagram_copy: r.get("copy_instagram"),
        instagram_hashtags: hashtags(r, "hashtags_instagram"),
        state: r.get::<String, _>("estado").parse()?,
        error_message: r.get("error_mensaje"),
        processing_ms: r.get("tiempo_procesamiento_ms"),
        created_at: r.get("created_at"),
        completed_at: r.get("completed_at"),
    })
}

fn music_from_row(r: &PgRow) -> Result<MusicGeneration, StoreError> {
    Ok(MusicGeneration {
        id: r.get("id"),
        account_id: r.get("user_id"),
        title: r.get("titulo"),
        brief: r.get("descripcion"),
        duration_secs: r.get("duracion_segundos"),
        instrumental: r.get("es_instrumental"),
        genre: r.get("genero"),
        mood: r.get("mood"),
        lyrics_language: r.get("idioma_letra"),
        text_prompt: r.get("prompt_openai"),
        music_prompt: r.get("prompt_musicgpt"),
        music_style: r.get("music_style"),
        lyrics_theme: r.get("lyrics_theme"),
        audio_path: r.get("audio_path"),
        audio_url: r.get("audio_url"),
        conversion_id: r.get("musicgpt_conversion_id"),
        state: r.get::<String, _>("estado").parse()?,
        error_message: r.get("error_mensaje"),
        processing_ms: r.get("tiempo_procesamiento_ms"),
        created_at: r.get("created_at"),
        completed_at: r.get("completed_at"),
    })
}

fn transaction_from_row(r: &PgRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: r.get("id"),
        account_id: r.get("user_id"),
        checkout_session_id: r.get("stripe_checkout_session_id"),
        credits: r.get("creditos"),
        amount_mxn_cents: r.get("monto_mxn_centavos"),
        amount_usd_cents: r.get("monto_usd_centavos"),
        state: r.get::<String, _>("estado").parse()?,
        description: r.get("descripcion"),
        created_at: r.get("created_at"),
        completed_at: r.get("completed_at"),
    })
}

fn balance_from_row(r: &PgRow) -> Balance {
    Balance {
        credits_available: r.get("creditos"),
        credits_used: r.get("creditos_usados"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, password_hash, nombre, creditos)
             VALUES ($1, $2, $3, $4)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.display_name.as_deref())
        .bind(new.credits)
        .fetch_one(&self.pool)
        .await?;

        Ok(account_from_row(&row))
    }

    async fn account_by_id(&self, id: i32) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn update_display_name(&self, id: i32, name: Option<&str>) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET nombre = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(account_from_row)
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }

    async fn set_payment_customer(&self, id: i32, customer_id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET stripe_customer_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(customer_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn debit_credit(&self, account_id: i32) -> Result<Option<Balance>, StoreError> {
        let row = sqlx::query(
            r#"UPDATE users
               SET creditos = creditos - 1, creditos_usados = creditos_usados + 1, updated_at = NOW()
               WHERE id = $1 AND creditos >= 1
               RETURNING creditos, creditos_usados"#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(balance_from_row))
    }

    async fn refund_credit(&self, account_id: i32) -> Result<Balance, StoreError> {
        let row = sqlx::query(
            r#"UPDATE users
               SET creditos = creditos + 1,
                   creditos_usados = GREATEST(creditos_usados - 1, 0),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING creditos, creditos_usados"#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(balance_from_row)
            .ok_or_else(|| StoreError::NotFound(format!("account {account_id}")))
    }

    async fn create_image_generation(
        &self,
        new: NewImageGeneration,
    ) -> Result<ImageGeneration, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO generations
                 (user_id, nombre_producto, descripcion_producto, marca, estilo, estado)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(new.account_id)
        .bind(&new.product_name)
        .bind(new.product_description.as_deref())
        .bind(new.brand.as_deref())
        .bind(&new.preset_id)
        .bind(new.state.as_str())
        .fetch_one(&self.pool)
        .await?;

        image_from_row(&row)
    }

    async fn save_image_generation(&self, g: &ImageGeneration) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE generations
               SET imagen_generada_path = $1, prompt_generado = $2,
                   copy_facebook = $3, hashtags_facebook = $4,
                   copy_instagram = $5, hashtags_instagram = $6,
                   estado = $7, error_mensaje = $8, tiempo_procesamiento_ms = $9,
                   completed_at = $10
               WHERE id = $11"#,
        )
        .bind(g.image_path.as_deref())
        .bind(g.generated_prompt.as_deref())
        .bind(g.facebook_copy.as_deref())
        .bind(g.facebook_hashtags.as_ref().map(Json))
        .bind(g.instagram_copy.as_deref())
        .bind(g.instagram_hashtags.as_ref().map(Json))
        .bind(g.state.as_str())
        .bind(g.error_message.as_deref())
        .bind(g.processing_ms)
        .bind(g.completed_at)
        .bind(g.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn image_generation(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<Option<ImageGeneration>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {IMAGE_COLUMNS} FROM generations WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(image_from_row).transpose()
    }

    async fn list_image_generations(
        &self,
        account_id: i32,
        page: Page,
    ) -> Result<(Vec<ImageGeneration>, i64), StoreError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM generations WHERE user_id = $1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        let rows = sqlx::query(&format!(
            "SELECT {IMAGE_COLUMNS} FROM generations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(image_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    async fn preset_previews(&self) -> Result<Vec<PresetPreview>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT DISTINCT ON (estilo) estilo, imagen_generada_path
               FROM generations
               WHERE estado = 'completada' AND imagen_generada_path IS NOT NULL
               ORDER BY estilo, completed_at DESC NULLS LAST, id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PresetPreview {
                preset_id: r.get("estilo"),
                image_path: r.get("imagen_generada_path"),
            })
            .collect())
    }

    async fn create_music_generation(
        &self,
        new: NewMusicGeneration,
    ) -> Result<MusicGeneration, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO music_generations
                 (user_id, titulo, descripcion, duracion_segundos, es_instrumental,
                  genero, mood, idioma_letra, estado)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {MUSIC_COLUMNS}"
        ))
        .bind(new.account_id)
        .bind(&new.title)
        .bind(new.brief.as_deref())
        .bind(new.duration_secs)
        .bind(new.instrumental)
        .bind(new.genre.as_deref())
        .bind(new.mood.as_deref())
        .bind(&new.lyrics_language)
        .bind(new.state.as_str())
        .fetch_one(&self.pool)
        .await?;

        music_from_row(&row)
    }

    async fn save_music_generation(&self, g: &MusicGeneration) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE music_generations
               SET prompt_openai = $1, prompt_musicgpt = $2, music_style = $3,
                   lyrics_theme = $4, mood = $5, genero = $6,
                   audio_path = $7, audio_url = $8, musicgpt_conversion_id = $9,
                   estado = $10, error_mensaje = $11, tiempo_procesamiento_ms = $12,
                   completed_at = $13
               WHERE id = $14"#,
        )
        .bind(g.text_prompt.as_deref())
        .bind(g.music_prompt.as_deref())
        .bind(g.music_style.as_deref())
        .bind(g.lyrics_theme.as_deref())
        .bind(g.mood.as_deref())
        .bind(g.genre.as_deref())
        .bind(g.audio_path.as_deref())
        .bind(g.audio_url.as_deref())
        .bind(g.conversion_id.as_deref())
        .bind(g.state.as_str())
        .bind(g.error_message.as_deref())
        .bind(g.processing_ms)
        .bind(g.completed_at)
        .bind(g.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn music_generation(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<Option<MusicGeneration>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {MUSIC_COLUMNS} FROM music_generations WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(music_from_row).transpose()
    }

    async fn list_music_generations(
        &self,
        account_id: i32,
        page: Page,
    ) -> Result<Vec<MusicGeneration>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MUSIC_COLUMNS} FROM music_generations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(music_from_row).collect()
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transactions
                 (user_id, stripe_checkout_session_id, creditos, monto_mxn_centavos,
                  monto_usd_centavos, estado, descripcion)
             VALUES ($1, $2, $3, $4, $5, 'pendiente', $6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(new.account_id)
        .bind(&new.checkout_session_id)
        .bind(new.credits)
        .bind(new.amount_mxn_cents)
        .bind(new.amount_usd_cents)
        .bind(new.description.as_deref())
        .fetch_one(&self.pool)
        .await?;

        transaction_from_row(&row)
    }

    async fn transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE stripe_checkout_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn list_transactions(
        &self,
        account_id: i32,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn settle_transaction(
        &self,
        session_id: &str,
        settlement: Settlement,
    ) -> Result<SettleOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises duplicate deliveries of the same event.
        let row = sqlx::query(
            r#"SELECT id, estado FROM transactions
               WHERE stripe_checkout_session_id = $1
               FOR UPDATE"#,
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(SettleOutcome::UnknownSession);
        };

        let tx_id: i32 = row.get("id");
        let current: TransactionState = row.get::<String, _>("estado").parse()?;
        if current != TransactionState::Pending {
            return Ok(SettleOutcome::AlreadySettled(current));
        }

        let next = match settlement {
            Settlement::Paid {
                account_id,
                credits,
            } => {
                let credited = sqlx::query(
                    "UPDATE users SET creditos = creditos + $1, updated_at = NOW() WHERE id = $2",
                )
                .bind(credits)
                .bind(account_id)
                .execute(&mut *tx)
                .await?;

                if credited.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Ok(SettleOutcome::AccountMissing);
                }

                sqlx::query(
                    "UPDATE transactions SET estado = 'completada', completed_at = NOW() WHERE id = $1",
                )
                .bind(tx_id)
                .execute(&mut *tx)
                .await?;
                TransactionState::Completed
            }
            Settlement::Failed => {
                sqlx::query("UPDATE transactions SET estado = 'fallida' WHERE id = $1")
                    .bind(tx_id)
                    .execute(&mut *tx)
                    .await?;
                TransactionState::Failed
            }
        };

        tx.commit().await?;
        Ok(SettleOutcome::Applied(next))
    }
}
