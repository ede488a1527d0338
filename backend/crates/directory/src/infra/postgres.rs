//! PostgreSQL Repository Implementations

use chrono::NaiveDate;
use kernel::id::{CityId, UserId};
use sqlx::PgPool;

use crate::application::validator::{FieldErrors, MSG_EMAIL_TAKEN};
use crate::domain::entity::{
    city::City,
    user::{NewUser, User},
};
use crate::domain::repository::{CityRepository, UserRepository};
use crate::domain::value_object::{email::Email, user_password::UserPassword};
use crate::error::{DirectoryError, DirectoryResult};

/// Unique constraint on `users.email`
const USERS_EMAIL_KEY: &str = "users_email_key";

const USER_COLUMNS: &str = r#"
    id,
    first_name,
    last_name,
    other_name,
    email,
    password_hash,
    phone,
    birthday,
    is_admin,
    city_id,
    additional_info
"#;

/// PostgreSQL-backed directory repository
#[derive(Clone)]
pub struct PgDirectoryRepository {
    pool: PgPool,
}

impl PgDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique violation on the email column to a field conflict
fn map_write_error(err: sqlx::Error) -> DirectoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some(USERS_EMAIL_KEY) {
            let mut errors = FieldErrors::default();
            errors.push("email", MSG_EMAIL_TAKEN);
            return DirectoryError::FieldConflict(errors);
        }
    }
    DirectoryError::Database(err)
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgDirectoryRepository {
    async fn create(&self, user: NewUser) -> DirectoryResult<User> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (
                first_name,
                last_name,
                other_name,
                email,
                password_hash,
                phone,
                birthday,
                is_admin,
                city_id,
                additional_info
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.other_name)
        .bind(user.email.as_str())
        .bind(user.password.as_phc_string())
        .bind(&user.phone)
        .bind(user.birthday)
        .bind(user.is_admin)
        .bind(user.city.map(|city| city.value()))
        .bind(&user.additional_info)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(user.into_user(UserId::new(id)))
    }

    async fn find_by_id(&self, id: UserId) -> DirectoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn list_all(&self) -> DirectoryResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn email_taken(&self, email: &str, except: Option<UserId>) -> DirectoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except.map(|id| id.value()))
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn update(&self, user: &User) -> DirectoryResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                first_name = $2,
                last_name = $3,
                other_name = $4,
                email = $5,
                password_hash = $6,
                phone = $7,
                birthday = $8,
                is_admin = $9,
                city_id = $10,
                additional_info = $11
            WHERE id = $1
            "#,
        )
        .bind(user.id.value())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.other_name)
        .bind(user.email.as_str())
        .bind(user.password.as_phc_string())
        .bind(&user.phone)
        .bind(user.birthday)
        .bind(user.is_admin)
        .bind(user.city.map(|city| city.value()))
        .bind(&user.additional_info)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?
        .rows_affected();

        if updated == 0 {
            return Err(DirectoryError::UserNotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: UserId) -> DirectoryResult<bool> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// City Repository Implementation
// ============================================================================

impl CityRepository for PgDirectoryRepository {
    async fn create_city(&self, name: &str) -> DirectoryResult<City> {
        let id: i64 = sqlx::query_scalar("INSERT INTO cities (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(City {
            id: CityId::new(id),
            name: name.to_string(),
        })
    }

    async fn find_city(&self, id: CityId) -> DirectoryResult<Option<City>> {
        let row = sqlx::query_as::<_, CityRow>("SELECT id, name FROM cities WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CityRow::into_city))
    }

    async fn list_cities(&self) -> DirectoryResult<Vec<City>> {
        let rows = sqlx::query_as::<_, CityRow>("SELECT id, name FROM cities ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CityRow::into_city).collect())
    }

    async fn delete_city(&self, id: CityId) -> DirectoryResult<bool> {
        // users.city_id is ON DELETE SET NULL
        let deleted = sqlx::query("DELETE FROM cities WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    other_name: String,
    email: String,
    password_hash: String,
    phone: String,
    birthday: Option<NaiveDate>,
    is_admin: bool,
    city_id: Option<i64>,
    additional_info: String,
}

impl UserRow {
    fn into_user(self) -> DirectoryResult<User> {
        let password = UserPassword::from_phc_string(self.password_hash)
            .map_err(|e| DirectoryError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(User {
            id: UserId::new(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            other_name: self.other_name,
            email: Email::from_db(self.email),
            password,
            phone: self.phone,
            birthday: self.birthday,
            is_admin: self.is_admin,
            city: self.city_id.map(CityId::new),
            additional_info: self.additional_info,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CityRow {
    id: i64,
    name: String,
}

impl CityRow {
    fn into_city(self) -> City {
        City {
            id: CityId::new(self.id),
            name: self.name,
        }
    }
}
