// Integration tests for the multi-entity client workflows. They need a real
// Postgres behind DATABASE_URL and skip silently when none is configured.

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use onboardserver::catalog::Addon;
use onboardserver::clients::{insert_client_records, replace_client_addons, CreateClientRequest};
use onboardserver::config::AppConfig;
use onboardserver::files::FileRecord;
use onboardserver::shared::models::schema::{addons, client_addons, clients, files, team_members};
use onboardserver::shared::state::AppState;
use onboardserver::shared::utils::{create_conn, run_migrations, DbPool};

fn test_pool() -> Option<DbPool> {
    if std::env::var("DATABASE_URL").is_err() {
        println!("DATABASE_URL not set, skipping");
        return None;
    }
    let pool = create_conn().ok()?;
    run_migrations(&pool).ok()?;
    Some(pool)
}

fn seed_addon(conn: &mut PgConnection, name: &str) -> Uuid {
    let addon = Addon {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        created_at: Utc::now(),
    };
    diesel::insert_into(addons::table)
        .values(&addon)
        .execute(conn)
        .expect("seed addon");
    addon.id
}

fn request(email: &str) -> CreateClientRequest {
    CreateClientRequest {
        email: email.to_string(),
        company_name: "Acme".to_string(),
        phone: None,
        notes: None,
        subscription_id: None,
        addon_ids: vec![],
        team_member_emails: vec![],
    }
}

fn cleanup(conn: &mut PgConnection, client_id: Uuid) {
    diesel::delete(clients::table.find(client_id))
        .execute(conn)
        .ok();
}

#[test]
fn create_seeds_client_addon_and_member_rows() {
    let Some(pool) = test_pool() else { return };
    let mut conn = pool.get().unwrap();

    let a = seed_addon(&mut conn, "reporting");
    let b = seed_addon(&mut conn, "priority-support");

    let mut req = request(&format!("owner-{}@acme.test", Uuid::new_v4()));
    req.addon_ids = vec![a, b];
    req.team_member_emails = vec!["teammate@acme.test".to_string()];

    let client_id = insert_client_records(&mut conn, &req).expect("create client");

    let client_count: i64 = clients::table
        .filter(clients::id.eq(client_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(client_count, 1);

    let assoc_count: i64 = client_addons::table
        .filter(client_addons::client_id.eq(client_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(assoc_count, 2);

    let members: Vec<(String, String)> = team_members::table
        .filter(team_members::client_id.eq(client_id))
        .select((team_members::email, team_members::invitation_status))
        .load(&mut conn)
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].1, "pending");

    cleanup(&mut conn, client_id);
}

#[test]
fn addon_replacement_is_wholesale() {
    let Some(pool) = test_pool() else { return };
    let mut conn = pool.get().unwrap();

    let a = seed_addon(&mut conn, "addon-a");
    let b = seed_addon(&mut conn, "addon-b");
    let c = seed_addon(&mut conn, "addon-c");

    let mut req = request(&format!("owner-{}@acme.test", Uuid::new_v4()));
    req.addon_ids = vec![a, b];
    let client_id = insert_client_records(&mut conn, &req).expect("create client");

    replace_client_addons(&mut conn, client_id, &[c]).expect("replace addons");

    let remaining: Vec<Uuid> = client_addons::table
        .filter(client_addons::client_id.eq(client_id))
        .select(client_addons::addon_id)
        .load(&mut conn)
        .unwrap();
    assert_eq!(remaining, vec![c]);

    cleanup(&mut conn, client_id);
}

// Documents the non-atomic behavior: a failure on the team member step
// leaves the already inserted client and addon rows committed.
#[test]
fn partial_failure_keeps_earlier_writes() {
    let Some(pool) = test_pool() else { return };
    let mut conn = pool.get().unwrap();

    let a = seed_addon(&mut conn, "addon-x");
    let b = seed_addon(&mut conn, "addon-y");

    let email = format!("owner-{}@acme.test", Uuid::new_v4());
    let mut req = request(&email);
    req.addon_ids = vec![a, b];
    // The duplicate trips the per-client unique constraint on the second
    // member insert, after the client and addon writes have committed.
    req.team_member_emails = vec![
        "dup@acme.test".to_string(),
        "dup@acme.test".to_string(),
    ];

    let result = insert_client_records(&mut conn, &req);
    assert!(result.is_err());

    let client_id: Uuid = clients::table
        .filter(clients::email.eq(&email))
        .select(clients::id)
        .first(&mut conn)
        .expect("client row survives the failed member insert");

    let assoc_count: i64 = client_addons::table
        .filter(client_addons::client_id.eq(client_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(assoc_count, 2);

    let member_count: i64 = team_members::table
        .filter(team_members::client_id.eq(client_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(member_count, 1);

    cleanup(&mut conn, client_id);
}

// Storage-first deletion: when the storage object cannot be removed the
// metadata row must survive.
#[tokio::test]
async fn file_delete_keeps_row_when_storage_fails() {
    let Some(pool) = test_pool() else { return };
    let mut conn = pool.get().unwrap();

    let req = request(&format!("owner-{}@acme.test", Uuid::new_v4()));
    let client_id = insert_client_records(&mut conn, &req).expect("create client");

    let record = FileRecord {
        id: Uuid::new_v4(),
        client_id,
        file_name: "contract.pdf".to_string(),
        storage_key: format!("clients/{}/contract.pdf", client_id),
        category: Some("legal".to_string()),
        status: "pending".to_string(),
        verified_at: None,
        uploaded_at: Utc::now(),
    };
    diesel::insert_into(files::table)
        .values(&record)
        .execute(&mut conn)
        .unwrap();

    // No drive configured: storage removal fails before the row is touched.
    let state = AppState {
        drive: None,
        bucket_name: "onboard".to_string(),
        config: AppConfig::from_env().unwrap(),
        conn: pool.clone(),
        http: reqwest::Client::new(),
    };

    let result = onboardserver::files::delete_file_record(&state, record.id).await;
    assert!(result.is_err());

    let still_there: i64 = files::table
        .filter(files::id.eq(record.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(still_there, 1);

    cleanup(&mut conn, client_id);
}
