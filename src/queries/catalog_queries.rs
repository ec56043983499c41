use sqlx::PgPool;

use crate::{
    database::{Fields, repository},
    error::Result,
    models::{Banner, Category},
};

pub async fn create_banner(
    pool: &PgPool,
    banner_name: &str,
    banner_mobile: Option<&str>,
    banner_priority: i32,
) -> Result<Banner> {
    let fields = Fields::new()
        .set("banner_name", banner_name)
        .set("banner_mobile", banner_mobile)
        .set("banner_priority", banner_priority);

    repository::create::<Banner>(pool, &fields).await
}

pub async fn list_banners(pool: &PgPool) -> Result<Vec<Banner>> {
    let banners = sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners ORDER BY banner_priority ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(banners)
}

pub async fn delete_banner(pool: &PgPool, id: i32) -> Result<Option<Banner>> {
    let banner = sqlx::query_as::<_, Banner>("DELETE FROM banners WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(banner)
}

pub async fn create_category(
    pool: &PgPool,
    cat_name: &str,
    cat_img: &str,
    cat_mobile_img: Option<&str>,
    cat_priority: i32,
) -> Result<Category> {
    let fields = Fields::new()
        .set("cat_name", cat_name)
        .set("cat_img", cat_img)
        .set("cat_mobile_img", cat_mobile_img)
        .set("cat_priority", cat_priority);

    repository::create::<Category>(pool, &fields).await
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories ORDER BY cat_priority ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

pub async fn delete_category(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category =
        sqlx::query_as::<_, Category>("DELETE FROM categories WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(category)
}
