// sqlite persistence - users, catalog, personal journal, contact inbox,
// and the activity log

use crate::Error;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, sqlite::SqlitePoolOptions};

pub struct Db {
    pool: SqlitePool,
}

/// A registered user. The stored credential is an argon2 hash, never
/// serialized into responses.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub allergy_trigger: Option<String>,
    pub created_at: String,
}

pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub allergy_trigger: Option<String>,
}

/// Partial update for the admin panel. Only set fields are written.
#[derive(Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub allergy_trigger: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.age.is_none()
            && self.allergy_trigger.is_none()
    }
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct CatalogRecipe {
    pub title: String,
    pub contains_allergens: Option<String>,
    pub image_placeholder: Option<String>,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct CatalogProduct {
    pub name: String,
    pub shop: String,
    pub price: f64,
    pub contains_allergens: Option<String>,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct JournalRecipe {
    pub title: String,
    pub ingredients: String,
    pub instructions: String,
    pub date: String,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct JournalProduct {
    pub name: String,
    pub shop: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub date: String,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: String,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        // an in-memory database exists per connection, so the pool must not
        // open a second one
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    // create all tables on first run
    async fn init_schema(&self) -> Result<(), Error> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                age INTEGER,
                allergy_trigger TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"#,
            r#"CREATE TABLE IF NOT EXISTS recipes (
                recipe_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                contains_allergens TEXT,
                image_placeholder TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS products (
                product_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                shop TEXT NOT NULL,
                price REAL NOT NULL,
                contains_allergens TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS personal_recipes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                ingredients TEXT NOT NULL,
                instructions TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"#,
            r#"CREATE TABLE IF NOT EXISTS personal_products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                product_name TEXT NOT NULL,
                shop TEXT,
                safety_status TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"#,
            r#"CREATE TABLE IF NOT EXISTS contact_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"#,
            r#"CREATE TABLE IF NOT EXISTS user_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                username TEXT NOT NULL,
                action_type TEXT NOT NULL,
                details TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"#,
        ];

        for sql in statements {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        Ok(())
    }

    // --- users ---

    pub async fn create_user(&self, user: &NewUser) -> Result<i64, Error> {
        let result = sqlx::query(
            r#"INSERT INTO users
               (username, password, first_name, last_name, email, phone, age, allergy_trigger)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.age)
        .bind(&user.allergy_trigger)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn user_count(&self) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    // callers must reject an empty update first; SET with no fields is not sql
    pub async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<bool, Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");

        if let Some(username) = &update.username {
            fields.push("username = ").push_bind_unseparated(username);
        }
        if let Some(hash) = &update.password_hash {
            fields.push("password = ").push_bind_unseparated(hash);
        }
        if let Some(first_name) = &update.first_name {
            fields
                .push("first_name = ")
                .push_bind_unseparated(first_name);
        }
        if let Some(last_name) = &update.last_name {
            fields.push("last_name = ").push_bind_unseparated(last_name);
        }
        if let Some(age) = update.age {
            fields.push("age = ").push_bind_unseparated(age);
        }
        if let Some(allergy) = &update.allergy_trigger {
            fields
                .push("allergy_trigger = ")
                .push_bind_unseparated(allergy);
        }

        builder.push(" WHERE user_id = ").push_bind(user_id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // journal entries and logs go with the user
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, Error> {
        sqlx::query("DELETE FROM user_logs WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM personal_recipes WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM personal_products WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // --- catalog ---

    pub async fn recipes(&self) -> Result<Vec<CatalogRecipe>, Error> {
        let recipes = sqlx::query_as::<_, CatalogRecipe>(
            "SELECT title, contains_allergens, image_placeholder FROM recipes",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(recipes)
    }

    pub async fn products(&self) -> Result<Vec<CatalogProduct>, Error> {
        let products = sqlx::query_as::<_, CatalogProduct>(
            "SELECT name, shop, price, contains_allergens FROM products",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    // --- personal journal ---

    pub async fn add_journal_recipe(
        &self,
        user_id: i64,
        title: &str,
        ingredients: &str,
        instructions: &str,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO personal_recipes (user_id, title, ingredients, instructions) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(title)
        .bind(ingredients)
        .bind(instructions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn journal_recipes(&self, user_id: i64) -> Result<Vec<JournalRecipe>, Error> {
        let entries = sqlx::query_as::<_, JournalRecipe>(
            r#"SELECT title, ingredients, instructions, date(created_at) AS date
               FROM personal_recipes WHERE user_id = ? ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn add_journal_product(
        &self,
        user_id: i64,
        name: &str,
        shop: Option<&str>,
        status: &str,
        notes: Option<&str>,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO personal_products (user_id, product_name, shop, safety_status, notes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(name)
        .bind(shop)
        .bind(status)
        .bind(notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn journal_products(&self, user_id: i64) -> Result<Vec<JournalProduct>, Error> {
        let entries = sqlx::query_as::<_, JournalProduct>(
            r#"SELECT product_name AS name, shop, safety_status AS status, notes,
                      date(created_at) AS date
               FROM personal_products WHERE user_id = ? ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    // --- contact inbox ---

    pub async fn add_contact_message(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), Error> {
        sqlx::query("INSERT INTO contact_messages (name, email, message) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(message)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn contact_messages(&self) -> Result<Vec<ContactMessage>, Error> {
        let messages = sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, message, created_at FROM contact_messages ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    // --- activity log ---

    /// Record a user action. Best-effort: a failed log write is warned about
    /// and never fails the request that triggered it.
    pub async fn log_activity(&self, user_id: Option<i64>, action: &str, details: &str) {
        let username = match user_id {
            Some(id) => match self.user_by_id(id).await {
                Ok(Some(user)) => user.username,
                _ => "Unknown".to_string(),
            },
            None => "Unknown".to_string(),
        };

        let result = sqlx::query(
            "INSERT INTO user_logs (user_id, username, action_type, details) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&username)
        .bind(action)
        .bind(details)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => tracing::debug!(%username, action, "logged activity"),
            Err(e) => tracing::warn!(error = %e, "failed to save activity log"),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
