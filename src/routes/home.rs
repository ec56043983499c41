use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AddToCartRequest, AttributeKind, AttributeListQuery, AttributeOption, Banner,
        CartDetailsResponse, Category, CheckoutRequest, CheckoutResponse, CreateOrderQuery,
        CreateOrderResponse, MessageResponse, OrderDetailsResponse, Product, ProductDetails,
        ProductIdQuery, ProductListQuery, ReviewResponse, SessionQuery,
    },
    queries::{cart_queries, catalog_queries, order_queries, product_queries},
    services::payment_service::{GatewayOrderRequest, generate_receipt_id},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/banners/list/", get(list_banners))
        .route("/categories/list/", get(list_categories))
        .route("/products/list/", get(list_products))
        .route("/products/details/", get(product_details))
        .route("/products/reviews/", get(product_reviews))
        .route("/products/reviews/all/", get(all_reviews))
        .route("/products/{group}/{attribute}/list", get(list_attribute_options))
        .route("/product/add_to_cart/", post(add_to_cart))
        .route("/product/cart_details/{session_id}", get(cart_details))
        .route("/product/delete_cart/{cart_id}", delete(delete_cart_item))
        .route("/product/create/order/", post(create_gateway_order))
        .route("/product/verify/order/", post(verify_order))
        .route("/product/order/details/{txn_id}", get(order_details))
}

// Catalog

pub async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(catalog_queries::list_banners(&state.db).await?))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog_queries::list_categories(&state.db).await?))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(product_queries::list_products(&state.db, &query).await?))
}

pub async fn product_details(
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> Result<Json<ProductDetails>> {
    Ok(Json(
        product_queries::product_details(&state.db, query.product_id).await?,
    ))
}

pub async fn product_reviews(
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> Result<Json<Vec<ReviewResponse>>> {
    if product_queries::find_by_id(&state.db, query.product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let reviews = product_queries::reviews_for_product(&state.db, query.product_id).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

pub async fn all_reviews(State(state): State<AppState>) -> Result<Json<Vec<ReviewResponse>>> {
    let reviews = product_queries::all_reviews(&state.db).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

pub async fn list_attribute_options(
    State(state): State<AppState>,
    Path((group, attribute)): Path<(String, String)>,
    Query(query): Query<AttributeListQuery>,
) -> Result<Json<Vec<AttributeOption>>> {
    let kind = AttributeKind::from_segments(&group, &attribute)
        .ok_or_else(|| AppError::NotFound(format!("Unknown option list {}/{}", group, attribute)))?;

    Ok(Json(
        product_queries::attribute_options(&state.db, kind, query.product_id).await?,
    ))
}

// Cart

pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Json<MessageResponse>> {
    cart_queries::add_to_cart(&state.db, &payload).await?;

    Ok(Json(MessageResponse::new(
        "Product added in cart successfully",
    )))
}

pub async fn cart_details(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<CartDetailsResponse>>> {
    Ok(Json(cart_queries::cart_details(&state.db, &session_id).await?))
}

pub async fn delete_cart_item(
    State(state): State<AppState>,
    Path(cart_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    cart_queries::delete_cart_line(&state.db, cart_id).await?;

    Ok(Json(MessageResponse::new("Cart item deleted successfully")))
}

// Checkout

/// Amount in minor units (paise) for a whole-rupee total.
fn minor_units(total_amount: i64) -> Result<i64> {
    if total_amount <= 0 {
        return Err(AppError::BadRequest(
            "total_amount must be positive".to_string(),
        ));
    }
    total_amount
        .checked_mul(100)
        .ok_or_else(|| AppError::BadRequest("total_amount is too large".to_string()))
}

pub async fn create_gateway_order(
    State(state): State<AppState>,
    Query(query): Query<CreateOrderQuery>,
) -> Result<Json<CreateOrderResponse>> {
    let request = GatewayOrderRequest {
        amount: minor_units(query.total_amount)?,
        currency: state.config.razorpay.currency.clone(),
        receipt: generate_receipt_id(),
        payment_capture: 1,
    };

    let razorpay_order = state.gateway.create_order(&request).await?;
    tracing::info!("Created gateway order for receipt {}", request.receipt);

    Ok(Json(CreateOrderResponse {
        message: "Order created successfully".to_string(),
        razorpay_order,
    }))
}

pub async fn verify_order(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let outcome = state.checkout.checkout(&query.session_id, &payload).await?;

    let message = if outcome.replayed {
        "Order already placed for this payment"
    } else {
        "Order created successfully"
    };

    Ok(Json(CheckoutResponse {
        message: message.to_string(),
        order_id: outcome.order_id,
        replayed: outcome.replayed,
    }))
}

pub async fn order_details(
    State(state): State<AppState>,
    Path(txn_id): Path<String>,
) -> Result<Json<OrderDetailsResponse>> {
    let details = order_queries::order_details(
        &state.db,
        &txn_id,
        &state.config.media.image_url,
        &state.config.media.web_url,
    )
    .await?;

    Ok(Json(details))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_amount_is_in_paise() {
        assert_eq!(minor_units(1050).unwrap(), 105_000);
        assert!(minor_units(0).is_err());
        assert!(minor_units(-5).is_err());
        assert!(minor_units(i64::MAX).is_err());
    }
}
