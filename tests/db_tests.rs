// tests for persistence, against an in-memory sqlite database

use allergyguard::{Db, NewUser, UserUpdate, hash_password, is_safe};

async fn test_db() -> Db {
    Db::connect("sqlite::memory:").await.unwrap()
}

fn sample_user(username: &str, allergy: Option<&str>) -> NewUser {
    NewUser {
        username: username.to_string(),
        password_hash: hash_password("hunter2").unwrap(),
        first_name: "Sam".to_string(),
        last_name: "Lee".to_string(),
        email: Some(format!("{username}@example.com")),
        phone: None,
        age: Some(30),
        allergy_trigger: allergy.map(|a| a.to_string()),
    }
}

#[tokio::test]
async fn test_user_lifecycle() {
    let db = test_db().await;

    let id = db.create_user(&sample_user("sam", Some("peanut"))).await.unwrap();
    assert!(id > 0);

    let by_name = db.user_by_username("sam").await.unwrap().unwrap();
    assert_eq!(by_name.user_id, id);
    assert_eq!(by_name.allergy_trigger.as_deref(), Some("peanut"));
    assert!(!by_name.created_at.is_empty());

    let by_id = db.user_by_id(id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "sam");

    assert_eq!(db.user_count().await.unwrap(), 1);
    assert!(db.user_by_username("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let db = test_db().await;

    db.create_user(&sample_user("sam", None)).await.unwrap();
    let duplicate = db.create_user(&sample_user("sam", None)).await;

    assert!(duplicate.is_err());
    assert_eq!(db.user_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_admin_update_and_delete() {
    let db = test_db().await;
    let id = db.create_user(&sample_user("sam", Some("peanut"))).await.unwrap();

    let update = UserUpdate {
        allergy_trigger: Some("soy".to_string()),
        age: Some(31),
        ..Default::default()
    };
    assert!(db.update_user(id, &update).await.unwrap());

    let user = db.user_by_id(id).await.unwrap().unwrap();
    assert_eq!(user.allergy_trigger.as_deref(), Some("soy"));
    assert_eq!(user.age, Some(31));
    // untouched fields survive a partial update
    assert_eq!(user.username, "sam");

    assert!(db.delete_user(id).await.unwrap());
    assert!(db.user_by_id(id).await.unwrap().is_none());
    assert!(!db.delete_user(id).await.unwrap());
}

#[tokio::test]
async fn test_delete_user_cascades_journal() {
    let db = test_db().await;
    let id = db.create_user(&sample_user("sam", None)).await.unwrap();

    db.add_journal_recipe(id, "Oatmeal", "oats, water", "boil")
        .await
        .unwrap();
    db.add_journal_product(id, "Rice cakes", Some("Corner shop"), "Safe", None)
        .await
        .unwrap();

    assert!(db.delete_user(id).await.unwrap());
    assert!(db.journal_recipes(id).await.unwrap().is_empty());
    assert!(db.journal_products(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_journal_entries_are_per_user() {
    let db = test_db().await;
    let sam = db.create_user(&sample_user("sam", None)).await.unwrap();
    let kim = db.create_user(&sample_user("kim", None)).await.unwrap();

    db.add_journal_recipe(sam, "Oatmeal", "oats, water", "boil")
        .await
        .unwrap();
    db.add_journal_product(kim, "Rice cakes", None, "Safe", Some("plain ones"))
        .await
        .unwrap();

    let sam_recipes = db.journal_recipes(sam).await.unwrap();
    assert_eq!(sam_recipes.len(), 1);
    assert_eq!(sam_recipes[0].title, "Oatmeal");
    assert!(!sam_recipes[0].date.is_empty());
    assert!(db.journal_recipes(kim).await.unwrap().is_empty());

    let kim_products = db.journal_products(kim).await.unwrap();
    assert_eq!(kim_products.len(), 1);
    assert_eq!(kim_products[0].name, "Rice cakes");
    assert_eq!(kim_products[0].status, "Safe");
    assert!(db.journal_products(sam).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_filtering_end_to_end() {
    let db = test_db().await;

    sqlx::query(
        "INSERT INTO recipes (title, contains_allergens) VALUES
         ('Peanut satay', 'peanut, soy'),
         ('Fruit salad', 'None'),
         ('Omelette', 'egg, dairy')",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let recipes = db.recipes().await.unwrap();
    let safe: Vec<_> = recipes
        .iter()
        .filter(|r| is_safe("peanut", r.contains_allergens.as_deref()))
        .map(|r| r.title.as_str())
        .collect();

    assert_eq!(safe, vec!["Fruit salad", "Omelette"]);
}

#[tokio::test]
async fn test_products_catalog() {
    let db = test_db().await;

    sqlx::query(
        "INSERT INTO products (name, shop, price, contains_allergens) VALUES
         ('Soy milk', 'GreenMart', 2.5, 'soy'),
         ('Oat bar', 'GreenMart', 1.0, 'None')",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let products = db.products().await.unwrap();
    assert_eq!(products.len(), 2);

    let safe: Vec<_> = products
        .iter()
        .filter(|p| is_safe("soy", p.contains_allergens.as_deref()))
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(safe, vec!["Oat bar"]);
}

#[tokio::test]
async fn test_contact_messages() {
    let db = test_db().await;

    db.add_contact_message("Sam", "sam@example.com", "Love the app")
        .await
        .unwrap();

    let messages = db.contact_messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].name, "Sam");
    assert_eq!(messages[0].message, "Love the app");
}

#[tokio::test]
async fn test_activity_log_never_fails() {
    let db = test_db().await;
    let id = db.create_user(&sample_user("sam", None)).await.unwrap();

    // logs for a real user, an unknown user, and no user at all
    db.log_activity(Some(id), "LOGIN", "User logged in successfully")
        .await;
    db.log_activity(Some(9999), "LOGIN", "ghost").await;
    db.log_activity(None, "SIGNUP", "no id yet").await;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_logs")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 3);

    let (username,): (String,) =
        sqlx::query_as("SELECT username FROM user_logs WHERE user_id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(username, "sam");
}
