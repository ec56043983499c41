use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{delete, get, post, put},
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AttributeKind, AttributeOption, AttributeOptionRequest, Banner, Category,
        MessageResponse, NewProduct, OrderListItem, OrderStatus, OrderStatusEntry, Product,
        ProductListQuery, TagOption, TagOptionRequest, UpdateOrderStatusRequest,
        UpdateProductQuery, UploadResponse,
    },
    queries::{catalog_queries, order_queries, product_queries},
    routes::form::{FormData, Upload},
    services::image_service::ImageFolder,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-banner/", post(upload_banner))
        .route("/banners/", get(list_banners))
        .route("/banners/{id}", delete(delete_banner))
        .route("/upload-category/", post(upload_category))
        .route("/categories/", get(list_categories))
        .route("/categories/{id}", delete(delete_category))
        .route("/products/add/", post(create_product))
        .route("/product/update/", put(update_product))
        .route("/products/list/", get(list_products))
        .route("/products/{id}", delete(delete_product))
        .route("/product/images/add/", post(add_product_image))
        .route("/products/reviews/", post(add_review))
        .route("/product/tag_option/add/", post(add_tag_option))
        .route("/{group}/{attribute}/add/", post(add_attribute_option))
        .route("/orders/", get(list_orders))
        .route("/orders/{id}/status", post(update_order_status))
}

async fn save(state: &AppState, folder: ImageFolder, upload: &Upload) -> Result<String> {
    state
        .images
        .save(folder, &upload.file_name, &upload.bytes)
        .await
}

// Banners

pub async fn upload_banner(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = FormData::read(multipart).await?;
    let priority = form.parsed::<i32>("banner_priority")?.unwrap_or(0);

    let desktop = save(&state, ImageFolder::Banners, form.required_file("file")?).await?;
    let mobile = match form.file("mobile_file") {
        Some(upload) => Some(save(&state, ImageFolder::Banners, upload).await?),
        None => None,
    };

    if let Err(e) =
        catalog_queries::create_banner(&state.db, &desktop, mobile.as_deref(), priority).await
    {
        let files: Vec<String> = std::iter::once(desktop).chain(mobile).collect();
        state.images.delete_all(&files).await;
        return Err(e);
    }

    Ok(Json(UploadResponse {
        message: "Banner uploaded successfully".to_string(),
        filename: desktop,
    }))
}

pub async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(catalog_queries::list_banners(&state.db).await?))
}

pub async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let banner = catalog_queries::delete_banner(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Banner not found".to_string()))?;

    let files: Vec<String> = std::iter::once(banner.banner_name)
        .chain(banner.banner_mobile)
        .collect();
    state.images.delete_all(&files).await;

    Ok(Json(MessageResponse::new("Banner deleted successfully")))
}

// Categories

pub async fn upload_category(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = FormData::read(multipart).await?;
    let name = form.required("cat_name")?.to_string();
    let priority = form.parsed::<i32>("cat_priority")?.unwrap_or(0);

    let image = save(&state, ImageFolder::Categories, form.required_file("file")?).await?;
    let mobile = match form.file("mobile_file") {
        Some(upload) => Some(save(&state, ImageFolder::Categories, upload).await?),
        None => None,
    };

    if let Err(e) =
        catalog_queries::create_category(&state.db, &name, &image, mobile.as_deref(), priority)
            .await
    {
        let files: Vec<String> = std::iter::once(image).chain(mobile).collect();
        state.images.delete_all(&files).await;
        return Err(e);
    }

    Ok(Json(UploadResponse {
        message: "Category uploaded successfully".to_string(),
        filename: image,
    }))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog_queries::list_categories(&state.db).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let category = catalog_queries::delete_category(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    let files: Vec<String> = std::iter::once(category.cat_img)
        .chain(category.cat_mobile_img)
        .collect();
    state.images.delete_all(&files).await;

    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

// Products

fn product_from_form(form: &FormData, thumbnail: String) -> Result<NewProduct> {
    let offer_price = form.parsed::<Decimal>("offer_price")?;
    let price = form.required_parsed::<Decimal>("price")?;
    if price < Decimal::ZERO || offer_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::BadRequest("Prices cannot be negative".to_string()));
    }

    let optional = |name: &str| form.text(name).map(str::to_string);

    Ok(NewProduct {
        product_name: form.required("product_name")?.to_string(),
        url_name: form.required("url_name")?.to_string(),
        offer_price,
        price,
        thumbnail,
        description: form.text("description").unwrap_or_default().to_string(),
        care_instructions: optional("care_instructions"),
        delivery_info: optional("delivery_info"),
        meta_title: optional("meta_title"),
        meta_keywords: optional("meta_keywords"),
        meta_desc: optional("meta_desc"),
        status: form.flag("product_status")?.unwrap_or(true),
        priority: form.parsed::<i32>("priority")?.unwrap_or(0),
        product_type: optional("product_type"),
        product_category: optional("product_category"),
        is_digital: form.flag("is_digital")?.unwrap_or(false),
    })
}

pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let form = FormData::read(multipart).await?;
    let upload = form.required_file("product_images")?;

    // Validate the fields before anything is written to disk.
    product_from_form(&form, String::new())?;

    let thumbnail = save(&state, ImageFolder::Products, upload).await?;
    let product = product_from_form(&form, thumbnail.clone())?;

    match product_queries::create_product(&state.db, &product).await {
        Ok(created) => {
            tracing::info!("Created product {} ({})", created.id, created.product_name);
            Ok(Json(created))
        }
        Err(e) => {
            state.images.delete_all(std::slice::from_ref(&thumbnail)).await;
            Err(e)
        }
    }
}

pub async fn update_product(
    State(state): State<AppState>,
    Query(query): Query<UpdateProductQuery>,
) -> Result<Json<MessageResponse>> {
    product_queries::update_product(&state.db, &query).await?;

    Ok(Json(MessageResponse::new(
        "Product details updated successfully",
    )))
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = product_queries::list_products(&state.db, &ProductListQuery::default()).await?;
    Ok(Json(products))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let files = product_queries::delete_product(&state.db, id).await?;
    state.images.delete_all(&files).await;

    tracing::info!("Deleted product {} and {} files", id, files.len());
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

async fn require_product(state: &AppState, product_id: i32) -> Result<Product> {
    product_queries::find_by_id(&state.db, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

pub async fn add_product_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>> {
    let form = FormData::read(multipart).await?;
    let product_id = form.required_parsed::<i32>("product_id")?;
    let priority = form.parsed::<i32>("priority")?.unwrap_or(0);
    let upload = form.required_file("image")?;

    require_product(&state, product_id).await?;

    let image = save(&state, ImageFolder::ProductBanners, upload).await?;
    if let Err(e) = product_queries::add_product_image(&state.db, product_id, &image, priority).await {
        state.images.delete_all(std::slice::from_ref(&image)).await;
        return Err(e);
    }

    Ok(Json(MessageResponse::new(
        "Product banner uploaded successfully",
    )))
}

pub async fn add_review(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>> {
    let form = FormData::read(multipart).await?;
    let product_id = form.required_parsed::<i32>("product_id")?;
    let user_name = form.required("user_name")?;
    let title = form.text("title").unwrap_or_default();
    let review = form.text("review").unwrap_or_default();
    let rating = form.required_parsed::<i32>("rating")?;

    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    require_product(&state, product_id).await?;

    let mut saved = Vec::new();
    for upload in form.files("files") {
        match save(&state, ImageFolder::Reviews, upload).await {
            Ok(path) => saved.push(path),
            Err(e) => {
                state.images.delete_all(&saved).await;
                return Err(e);
            }
        }
    }

    if let Err(e) =
        product_queries::create_review(&state.db, product_id, user_name, title, review, rating, &saved)
            .await
    {
        state.images.delete_all(&saved).await;
        return Err(e);
    }

    Ok(Json(MessageResponse::new("Review added successfully")))
}

pub async fn add_attribute_option(
    State(state): State<AppState>,
    Path((group, attribute)): Path<(String, String)>,
    Json(payload): Json<AttributeOptionRequest>,
) -> Result<Json<AttributeOption>> {
    let kind = AttributeKind::from_segments(&group, &attribute)
        .ok_or_else(|| AppError::NotFound(format!("Unknown option list {}/{}", group, attribute)))?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    require_product(&state, payload.product_id).await?;

    let option = product_queries::add_attribute_option(&state.db, kind, &payload).await?;
    tracing::info!(
        "{} '{}' added to product {}",
        kind.label(),
        option.name,
        option.product_id
    );

    Ok(Json(option))
}

pub async fn add_tag_option(
    State(state): State<AppState>,
    Json(payload): Json<TagOptionRequest>,
) -> Result<Json<TagOption>> {
    if let Some(extra) = &payload.tag_optional {
        if !extra.is_object() {
            return Err(AppError::BadRequest(
                "tag_optional must be a JSON object".to_string(),
            ));
        }
    }

    require_product(&state, payload.product_id).await?;

    Ok(Json(product_queries::add_tag_option(&state.db, &payload).await?))
}

// Orders

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<OrderListItem>>> {
    Ok(Json(order_queries::list_orders(&state.db).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderStatusEntry>> {
    if payload.order_status.trim().is_empty() {
        return Err(AppError::BadRequest("order_status is required".to_string()));
    }

    let next = OrderStatus::parse(&payload.order_status);
    let entry =
        order_queries::append_status(&state.db, id, &next, state.config.checkout.status_policy)
            .await?;

    Ok(Json(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_admin_handler_mounts() {
        let _router: Router<AppState> = router();
    }
}
