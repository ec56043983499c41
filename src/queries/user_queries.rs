use sqlx::PgPool;

use crate::{
    database::{Fields, Record, repository},
    error::{AppError, Result},
    models::{NewUser, UpdateUserRequest, User},
};

pub async fn create_user(pool: &PgPool, user: &NewUser) -> Result<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, phone, password) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .fetch_one(pool)
    .await
    .map_err(duplicate_contact)
}

fn duplicate_contact(err: sqlx::Error) -> AppError {
    let err = AppError::from(err);
    if err.is_unique_violation() {
        AppError::Conflict("Email or phone already exists".to_string())
    } else {
        err
    }
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>> {
    repository::find_one::<User>(pool, &Fields::new().set("id", id)).await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
        .bind(phone)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Login identifier may be either the e-mail or the phone number.
pub async fn find_by_email_or_phone(pool: &PgPool, identifier: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = $1 OR phone = $1 ORDER BY id LIMIT 1",
    )
    .bind(identifier)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn update_user(pool: &PgPool, id: i32, update: &UpdateUserRequest) -> Result<User> {
    let updates = Fields::new()
        .set("username", update.username.clone())
        .set("email", update.email.clone())
        .set("phone", update.phone.clone())
        .set("profile_pic", update.profile_pic.clone());

    let mut query = repository::update_query(User::TABLE, &Fields::new().set("id", id), &updates);
    query
        .build_query_as::<User>()
        .fetch_optional(pool)
        .await
        .map_err(duplicate_contact)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
