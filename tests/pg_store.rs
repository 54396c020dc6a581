use viralpost::db::{PgStore, Store};
use viralpost::error::StoreError;
use viralpost::models::{
    ImageState, MusicState, NewAccount, NewImageGeneration, NewMusicGeneration, NewTransaction,
    Page, SettleOutcome, Settlement, TransactionState,
};

mod support;

fn new_account(email: &str, credits: i32) -> NewAccount {
    NewAccount {
        email: email.to_string(),
        password_hash: "$2b$04$not-a-real-hash".to_string(),
        display_name: None,
        credits,
    }
}

#[actix_web::test]
async fn accounts_and_atomic_debit() {
    let Some(db) = support::init_test_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());

    let account = store
        .create_account(new_account("pg@example.com", 1))
        .await
        .expect("create");
    let dup = store.create_account(new_account("pg@example.com", 1)).await;
    assert!(matches!(dup, Err(StoreError::Conflict(_))));

    let balance = store.debit_credit(account.id).await.unwrap().expect("debit");
    assert_eq!(balance.credits_available, 0);
    assert_eq!(balance.credits_used, 1);
    assert!(store.debit_credit(account.id).await.unwrap().is_none());

    let balance = store.refund_credit(account.id).await.unwrap();
    assert_eq!(balance.credits_available, 1);
    assert_eq!(balance.credits_used, 0);

    store
        .set_payment_customer(account.id, "cus_123")
        .await
        .unwrap();
    let loaded = store
        .account_by_email("pg@example.com")
        .await
        .unwrap()
        .expect("by email");
    assert_eq!(loaded.payment_customer_id.as_deref(), Some("cus_123"));
}

#[actix_web::test]
async fn generations_round_trip_state() {
    let Some(db) = support::init_test_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let account = store
        .create_account(new_account("gen@example.com", 5))
        .await
        .unwrap();

    let mut image = store
        .create_image_generation(NewImageGeneration {
            account_id: account.id,
            product_name: "Café".to_string(),
            product_description: None,
            brand: Some("Olla".to_string()),
            preset_id: "macro_explosion".to_string(),
            state: ImageState::Processing,
        })
        .await
        .unwrap();
    image.facebook_hashtags = Some(vec!["#cafe".to_string()]);
    image.image_path = Some("/imagenes/1_abcd.png".to_string());
    image.advance(ImageState::Completed).unwrap();
    store.save_image_generation(&image).await.unwrap();

    let loaded = store
        .image_generation(account.id, image.id)
        .await
        .unwrap()
        .expect("image");
    assert_eq!(loaded.state, ImageState::Completed);
    assert_eq!(loaded.facebook_hashtags, Some(vec!["#cafe".to_string()]));
    assert!(store.image_generation(account.id + 1, image.id).await.unwrap().is_none());

    let previews = store.preset_previews().await.unwrap();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].image_path, "/imagenes/1_abcd.png");

    let (page, total) = store
        .list_image_generations(account.id, Page::numbered(1, 10))
        .await
        .unwrap();
    assert_eq!((page.len(), total), (1, 1));

    let music = store
        .create_music_generation(NewMusicGeneration {
            account_id: account.id,
            title: "Jingle".to_string(),
            brief: Some("Jingle para café".to_string()),
            duration_secs: 30,
            instrumental: true,
            genre: None,
            mood: None,
            lyrics_language: "es-MX".to_string(),
            state: MusicState::GeneratingPrompt,
        })
        .await
        .unwrap();
    let listed = store
        .list_music_generations(account.id, Page { limit: 10, offset: 0 })
        .await
        .unwrap();
    assert_eq!(listed[0].id, music.id);
    assert_eq!(listed[0].state, MusicState::GeneratingPrompt);
}

#[actix_web::test]
async fn settlement_is_idempotent() {
    let Some(db) = support::init_test_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let account = store
        .create_account(new_account("tx@example.com", 0))
        .await
        .unwrap();

    let tx = NewTransaction {
        account_id: account.id,
        checkout_session_id: "cs_pg_1".to_string(),
        credits: 25,
        amount_mxn_cents: 35_000,
        amount_usd_cents: None,
        description: Some("Compra: 25 Créditos".to_string()),
    };
    store.create_transaction(tx.clone()).await.unwrap();
    assert!(matches!(
        store.create_transaction(tx).await,
        Err(StoreError::Conflict(_))
    ));

    let paid = Settlement::Paid {
        account_id: account.id,
        credits: 25,
    };
    assert_eq!(
        store.settle_transaction("cs_pg_1", paid).await.unwrap(),
        SettleOutcome::Applied(TransactionState::Completed)
    );
    assert_eq!(
        store.settle_transaction("cs_pg_1", paid).await.unwrap(),
        SettleOutcome::AlreadySettled(TransactionState::Completed)
    );
    assert_eq!(
        store.settle_transaction("cs_missing", paid).await.unwrap(),
        SettleOutcome::UnknownSession
    );

    let account = store.account_by_id(account.id).await.unwrap().unwrap();
    assert_eq!(account.credits_available, 25);

    let listed = store.list_transactions(account.id, 50).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].completed_at.is_some());
}
