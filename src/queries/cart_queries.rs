use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::{
        AddToCartRequest, AttributeKind, CartDetailsResponse, CartLine, Product, TagChoice,
        TagSelection, validate_choice, validate_tags,
    },
    queries::product_queries,
};

/// Validates the chosen options against the product's own lists, then stores
/// the line and its tags together.
pub async fn add_to_cart(pool: &PgPool, request: &AddToCartRequest) -> Result<CartLine> {
    if request.session_id.trim().is_empty() {
        return Err(AppError::BadRequest("session_id is required".to_string()));
    }

    product_queries::find_by_id(pool, request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    for kind in AttributeKind::ALL {
        let offered = product_queries::attribute_options(pool, kind, Some(request.product_id)).await?;
        validate_choice(kind, request.choice(kind), &offered)?;
    }
    validate_tags(&request.tag_options)?;

    let mut tx = pool.begin().await?;

    let line = sqlx::query_as::<_, CartLine>(
        "INSERT INTO carts (session_id, product_id, certificate_color, frame_color, frame_size, frame_thickness)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&request.session_id)
    .bind(request.product_id)
    .bind(request.choice(AttributeKind::CertificateColor))
    .bind(request.choice(AttributeKind::FrameColor))
    .bind(request.choice(AttributeKind::FrameSize))
    .bind(request.choice(AttributeKind::FrameThickness))
    .fetch_one(&mut *tx)
    .await?;

    for tag in &request.tag_options {
        sqlx::query(
            "INSERT INTO tag_selections (product_id, cart_line_id, tag_name, tag_data)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(request.product_id)
        .bind(line.id)
        .bind(&tag.name)
        .bind(&tag.data)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Added product {} to cart of session {}",
        request.product_id,
        request.session_id
    );

    Ok(line)
}

pub async fn cart_details(pool: &PgPool, session_id: &str) -> Result<Vec<CartDetailsResponse>> {
    let lines = sqlx::query_as::<_, CartLine>(
        "SELECT * FROM carts WHERE session_id = $1 ORDER BY id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    if lines.is_empty() {
        return Err(AppError::EmptyCart(session_id.to_string()));
    }

    let line_ids: Vec<i32> = lines.iter().map(|l| l.id).collect();
    let product_ids: Vec<i32> = lines.iter().map(|l| l.product_id).collect();

    let products: HashMap<i32, Product> =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(&product_ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

    let mut tags: HashMap<i32, Vec<TagChoice>> = HashMap::new();
    let selections = sqlx::query_as::<_, TagSelection>(
        "SELECT * FROM tag_selections WHERE cart_line_id = ANY($1) ORDER BY id",
    )
    .bind(&line_ids)
    .fetch_all(pool)
    .await?;
    for selection in selections {
        if let Some(line_id) = selection.cart_line_id {
            tags.entry(line_id).or_default().push(TagChoice {
                name: selection.tag_name,
                data: selection.tag_data,
            });
        }
    }

    lines
        .into_iter()
        .map(|line| {
            let product = products.get(&line.product_id).ok_or_else(|| {
                AppError::NotFound(format!("Product {} not found", line.product_id))
            })?;

            Ok(CartDetailsResponse {
                cart_id: line.id,
                product_id: line.product_id,
                product_name: product.product_name.clone(),
                price: product.price,
                offer_price: product.offer_price,
                is_digital: product.is_digital,
                thumbnail: product.thumbnail.clone(),
                tags: tags.remove(&line.id).unwrap_or_default(),
                certificate_color: line.certificate_color,
                frame_color: line.frame_color,
                frame_size: line.frame_size,
                frame_thickness: line.frame_thickness,
            })
        })
        .collect()
}

/// Removes a cart line; its tag selections cascade with it.
pub async fn delete_cart_line(pool: &PgPool, cart_id: i32) -> Result<()> {
    let result = sqlx::query("DELETE FROM carts WHERE id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Cart item not found".to_string()));
    }

    Ok(())
}
