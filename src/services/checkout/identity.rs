use crate::{
    error::{AppError, Result},
    models::{CheckoutRequest, NewUser, User},
    services::checkout::CheckoutTx,
};

/// Finds the buyer by phone, then by e-mail, and creates an account when
/// neither matches. Holds the phone and e-mail locks until the transaction
/// ends, so checkouts from other sessions cannot race the insert.
///
/// New accounts get the phone number as their password. Buyers are expected
/// to reset it before logging in.
pub async fn resolve_or_create(
    tx: &mut dyn CheckoutTx,
    request: &CheckoutRequest,
    password_cost: u32,
) -> Result<User> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    tx.lock(&format!("phone:{}", request.phone)).await?;
    if let Some(email) = email {
        tx.lock(&format!("email:{}", email)).await?;
    }

    if let Some(user) = tx.find_user_by_phone(&request.phone).await? {
        return Ok(user);
    }

    if let Some(email) = email {
        if let Some(user) = tx.find_user_by_email(email).await? {
            tracing::info!("Checkout matched existing user {} by e-mail", user.id);
            return Ok(user);
        }
    }

    let password_hash = bcrypt::hash(&request.phone, password_cost)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = tx
        .insert_user(&NewUser {
            username: request.username.clone(),
            email: email.map(str::to_string),
            phone: Some(request.phone.clone()),
            password_hash,
        })
        .await?;

    tracing::info!("Created user {} during checkout", user.id);
    Ok(user)
}
