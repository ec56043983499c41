use sqlx::PgPool;

use crate::{
    database::{Fields, repository},
    error::{AppError, Result},
    models::{
        AttributeKind, AttributeOption, AttributeOptionRequest, NewProduct, Product,
        ProductDetails, ProductImage, ProductListQuery, Review, ReviewImage, ReviewRow,
        TagOption, TagOptionRequest, UpdateProductQuery,
    },
};

// Products

pub async fn create_product(pool: &PgPool, product: &NewProduct) -> Result<Product> {
    let fields = Fields::new()
        .set("product_name", product.product_name.as_str())
        .set("url_name", product.url_name.as_str())
        .set("offer_price", product.offer_price)
        .set("price", product.price)
        .set("thumbnail", product.thumbnail.as_str())
        .set("description", product.description.as_str())
        .set("care_instructions", product.care_instructions.clone())
        .set("delivery_info", product.delivery_info.clone())
        .set("meta_title", product.meta_title.clone())
        .set("meta_keywords", product.meta_keywords.clone())
        .set("meta_desc", product.meta_desc.clone())
        .set("status", product.status)
        .set("priority", product.priority)
        .set("product_type", product.product_type.clone())
        .set("product_category", product.product_category.clone())
        .set("is_digital", product.is_digital);

    repository::create::<Product>(pool, &fields).await
}

pub async fn update_product(pool: &PgPool, update: &UpdateProductQuery) -> Result<Product> {
    let updates = Fields::new()
        .set("price", update.price)
        .set("offer_price", update.offer_price)
        .set("description", update.description.clone())
        .set("delivery_info", update.delivery_info.clone())
        .set("care_instructions", update.care_instructions.clone());

    repository::update::<Product>(pool, &Fields::new().set("id", update.product_id), &updates)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("Product not found".to_string()),
            other => other,
        })
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Product>> {
    repository::find_one::<Product>(pool, &Fields::new().set("id", id)).await
}

/// Exact-match filters; an absent or empty parameter does not filter.
pub fn list_filter(query: &ProductListQuery) -> Fields {
    let present = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

    let mut filter = Fields::new();
    if let Some(product_type) = present(&query.product_type) {
        filter = filter.set("product_type", product_type);
    }
    if let Some(name) = present(&query.search_name) {
        filter = filter.set("product_name", name);
    }
    if let Some(category) = present(&query.product_category_type) {
        filter = filter.set("product_category", category);
    }
    filter
}

pub async fn list_products(pool: &PgPool, query: &ProductListQuery) -> Result<Vec<Product>> {
    repository::find_all::<Product>(pool, &list_filter(query)).await
}

/// Deletes the product (dependent rows cascade) and returns every stored
/// file path that belonged to it.
pub async fn delete_product(pool: &PgPool, id: i32) -> Result<Vec<String>> {
    let mut tx = pool.begin().await?;

    let mut files: Vec<String> =
        sqlx::query_scalar("SELECT image FROM product_images WHERE product_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

    let review_files: Vec<String> = sqlx::query_scalar(
        "SELECT ri.image FROM product_review_images ri
         JOIN product_ratings r ON r.id = ri.product_rating_id
         WHERE r.product_id = $1",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;
    files.extend(review_files);

    let thumbnail: Option<Option<String>> =
        sqlx::query_scalar("DELETE FROM products WHERE id = $1 RETURNING thumbnail")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(product_delete_error)?;

    let Some(thumbnail) = thumbnail else {
        return Err(AppError::NotFound("Product not found".to_string()));
    };
    files.extend(thumbnail);

    tx.commit().await?;

    Ok(files)
}

/// Order lines keep their product, so a product that was ever ordered stays.
fn product_delete_error(err: sqlx::Error) -> AppError {
    let err = AppError::from(err);
    if err.is_foreign_key_violation() {
        AppError::Conflict("Product has orders and cannot be deleted".to_string())
    } else {
        err
    }
}

// Images

pub async fn add_product_image(
    pool: &PgPool,
    product_id: i32,
    image: &str,
    priority: i32,
) -> Result<ProductImage> {
    let fields = Fields::new()
        .set("product_id", product_id)
        .set("image", image)
        .set("status", "approved")
        .set("priority", priority);

    repository::create::<ProductImage>(pool, &fields).await
}

async fn approved_images(pool: &PgPool, product_id: i32) -> Result<Vec<ProductImage>> {
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images
         WHERE product_id = $1 AND status IN ('approved', 'active')
         ORDER BY priority ASC, id ASC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(images)
}

// Reviews

pub async fn create_review(
    pool: &PgPool,
    product_id: i32,
    user_name: &str,
    title: &str,
    review: &str,
    rating: i32,
    images: &[String],
) -> Result<Review> {
    let mut tx = pool.begin().await?;

    let created = sqlx::query_as::<_, Review>(
        "INSERT INTO product_ratings (product_id, user_name, title, review, rating, status)
         VALUES ($1, $2, $3, $4, $5, 'approved') RETURNING *",
    )
    .bind(product_id)
    .bind(user_name)
    .bind(title)
    .bind(review)
    .bind(rating)
    .fetch_one(&mut *tx)
    .await?;

    for image in images {
        sqlx::query_as::<_, ReviewImage>(
            "INSERT INTO product_review_images (product_rating_id, image) VALUES ($1, $2) RETURNING *",
        )
        .bind(created.id)
        .bind(image)
        .fetch_one(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(created)
}

const REVIEW_ROWS: &str = "SELECT r.id, r.product_id, r.user_name, r.title, r.review, r.rating, r.created_at,
        COALESCE(array_agg(ri.image ORDER BY ri.id) FILTER (WHERE ri.id IS NOT NULL), '{}') AS review_images
     FROM product_ratings r
     LEFT JOIN product_review_images ri ON ri.product_rating_id = r.id";

pub async fn reviews_for_product(pool: &PgPool, product_id: i32) -> Result<Vec<ReviewRow>> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "{} WHERE r.product_id = $1 GROUP BY r.id ORDER BY r.id",
        REVIEW_ROWS
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn all_reviews(pool: &PgPool) -> Result<Vec<ReviewRow>> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!("{} GROUP BY r.id ORDER BY r.id", REVIEW_ROWS))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

async fn ratings(pool: &PgPool, product_id: i32) -> Result<Vec<Review>> {
    repository::find_all::<Review>(pool, &Fields::new().set("product_id", product_id)).await
}

// Attribute options

pub async fn add_attribute_option(
    pool: &PgPool,
    kind: AttributeKind,
    request: &AttributeOptionRequest,
) -> Result<AttributeOption> {
    let fields = Fields::new()
        .set("product_id", request.product_id)
        .set("name", request.name.as_str())
        .set("status", request.status)
        .set("priority", request.priority.unwrap_or(0));

    repository::create_in::<AttributeOption>(pool, kind.table(), &fields).await
}

fn option_filter(product_id: Option<i32>) -> Fields {
    match product_id {
        Some(id) => Fields::new().set("product_id", id),
        None => Fields::new(),
    }
}

/// Stable sort of id-ordered rows, so ties keep submission order.
fn by_priority(mut options: Vec<AttributeOption>) -> Vec<AttributeOption> {
    options.sort_by_key(|option| option.priority);
    options
}

/// Options of one kind, `priority ASC, id ASC`. `None` lists every product's.
pub async fn attribute_options(
    pool: &PgPool,
    kind: AttributeKind,
    product_id: Option<i32>,
) -> Result<Vec<AttributeOption>> {
    let options =
        repository::find_all_in::<AttributeOption>(pool, kind.table(), &option_filter(product_id))
            .await?;

    Ok(by_priority(options))
}

// Tag options

pub async fn add_tag_option(pool: &PgPool, request: &TagOptionRequest) -> Result<TagOption> {
    let fields = Fields::new()
        .set("product_id", request.product_id)
        .set("name", request.name.clone())
        .set("tag", request.tag.clone())
        .set("priority", request.priority)
        .set("tag_optional", request.tag_optional.clone());

    repository::create::<TagOption>(pool, &fields).await
}

async fn tag_options(pool: &PgPool, product_id: i32) -> Result<Vec<TagOption>> {
    let options = sqlx::query_as::<_, TagOption>(
        "SELECT * FROM product_tag_options WHERE product_id = $1 ORDER BY priority ASC, id ASC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(options)
}

// Details

pub async fn product_details(pool: &PgPool, product_id: i32) -> Result<ProductDetails> {
    let product = find_by_id(pool, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(ProductDetails {
        product_images: approved_images(pool, product_id).await?,
        product_ratings: ratings(pool, product_id).await?,
        product_tag_options: tag_options(pool, product_id).await?,
        certificate_colors: attribute_options(pool, AttributeKind::CertificateColor, Some(product_id))
            .await?,
        frame_colors: attribute_options(pool, AttributeKind::FrameColor, Some(product_id)).await?,
        frame_size: attribute_options(pool, AttributeKind::FrameSize, Some(product_id)).await?,
        frame_thickness: attribute_options(pool, AttributeKind::FrameThickness, Some(product_id))
            .await?,
        product,
    })
}
